use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use dss_extract::extract::{ExtractionKind, IdentifierKind};

#[derive(Parser)]
#[command(name = "dss-extract")]
#[command(about = "Submit DataScope extraction jobs and fetch DataStream time series")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Service configuration JSON; builtin endpoints are used when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Seconds between status polls
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Give up after this many polls
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Give up after this many seconds of polling
    #[arg(long, global = true)]
    pub deadline: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one extraction job and print its result
    Extract {
        /// composite, technical-indicators, time-series or intraday-pricing
        #[arg(short, long)]
        kind: ExtractionKind,

        #[arg(short, long)]
        identifier: String,

        #[arg(long = "id-type", default_value = "isin")]
        id_type: IdentifierKind,

        /// Field to extract; repeat for several, order is kept
        #[arg(short, long = "field", required = true)]
        fields: Vec<String>,

        /// Extraction condition as KEY=VALUE, e.g. StartDate=2018-01-01
        #[arg(long = "condition", value_parser = parse_key_val)]
        conditions: Vec<(String, String)>,

        /// Write the result body here instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Composite extraction for several ISINs at once
    Composite {
        #[arg(required = true)]
        isins: Vec<String>,

        /// Override the default composite field list
        #[arg(short, long = "field")]
        fields: Vec<String>,

        /// Jobs in flight at the same time
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },

    /// Fetch a time series from the streaming service
    Stream {
        #[arg(short, long)]
        identifier: String,

        #[arg(long = "id-type", default_value = "isin")]
        id_type: IdentifierKind,

        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,

        /// Last day, YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,

        /// Export rows to this CSV file instead of printing them
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_extract_command() {
        let cli = Cli::try_parse_from([
            "dss-extract",
            "extract",
            "--kind",
            "time-series",
            "--identifier",
            "IBM.N",
            "--id-type",
            "ric",
            "--field",
            "Universal Close Price",
            "--field",
            "Trade Date",
            "--condition",
            "StartDate=2018-01-01",
            "--interval",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.interval, Some(2));
        match cli.command {
            Commands::Extract {
                kind,
                id_type,
                fields,
                conditions,
                ..
            } => {
                assert_eq!(kind, ExtractionKind::TimeSeries);
                assert_eq!(id_type, IdentifierKind::Ric);
                assert_eq!(fields, ["Universal Close Price", "Trade Date"]);
                assert_eq!(
                    conditions,
                    vec![("StartDate".to_string(), "2018-01-01".to_string())]
                );
            }
            _ => panic!("expected extract command"),
        }
    }

    #[test]
    fn rejects_condition_without_separator() {
        assert!(parse_key_val("StartDate").is_err());
        assert!(parse_key_val("=2018").is_err());
    }

    #[test]
    fn stream_dates_are_validated() {
        let result = Cli::try_parse_from([
            "dss-extract",
            "stream",
            "--identifier",
            "US4592001014",
            "--start",
            "2018-13-01",
            "--end",
            "2018-01-04",
        ]);
        assert!(result.is_err());
    }
}
