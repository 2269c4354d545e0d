use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{Context, Result};
use crate::stream::StreamResult;

const CSV_DATE_FORMAT: &str = "%Y-%m-%d";

/// Write a streaming result as one CSV row per sampled value.
pub fn save_stream_csv<P: AsRef<Path>>(result: &StreamResult, file_path: P) -> Result<usize> {
    let path = file_path.as_ref();
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV writer for {}", path.display()))?;

    writer.write_record(["date", "data_type", "symbol", "currency", "type", "value"])?;

    let mut rows = 0;
    for (series, date, value) in result.rows() {
        writer.write_record([
            date.format(CSV_DATE_FORMAT).to_string(),
            series.data_type.clone(),
            series.symbol.clone(),
            series.currency.clone(),
            series.value_type.to_string(),
            value.to_string(),
        ])?;
        rows += 1;
    }

    writer.flush()?;
    log::info!("wrote {} rows to {}", rows, path.display());
    Ok(rows)
}

/// Persist a completed extraction's raw body.
pub fn save_extraction_body<P: AsRef<Path>>(body: &[u8], file_path: P) -> Result<()> {
    let path = file_path.as_ref();
    ensure_parent(path)?;
    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create result file {}", path.display()))?;
    file.write_all(body)
        .with_context(|| format!("Failed to write result file {}", path.display()))?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Series;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::tempdir;

    fn sample() -> StreamResult {
        StreamResult {
            dates: vec![
                Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2018, 1, 2, 0, 0, 0).unwrap(),
            ],
            series: vec![Series {
                data_type: "P".to_string(),
                symbol: "US4592001014".to_string(),
                currency: "U$".to_string(),
                value_type: 10,
                values: vec![
                    Decimal::from_str("153.420").unwrap(),
                    Decimal::from_str("154.77").unwrap(),
                ],
            }],
        }
    }

    #[test]
    fn writes_one_row_per_value_with_exact_decimals() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exports/ibm.csv");

        let rows = save_stream_csv(&sample(), &path).unwrap();

        assert_eq!(rows, 2);
        let written = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "date,data_type,symbol,currency,type,value");
        assert_eq!(lines[1], "2018-01-01,P,US4592001014,U$,10,153.420");
        assert_eq!(lines[2], "2018-01-02,P,US4592001014,U$,10,154.77");
    }

    #[test]
    fn empty_result_writes_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let result = StreamResult {
            dates: Vec::new(),
            series: Vec::new(),
        };

        assert_eq!(save_stream_csv(&result, &path).unwrap(), 0);
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim_end(),
            "date,data_type,symbol,currency,type,value"
        );
    }

    #[test]
    fn saves_raw_extraction_body() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results/composite.json");

        save_extraction_body(br#"{"Contents":[]}"#, &path).unwrap();

        assert_eq!(fs::read(&path).unwrap(), br#"{"Contents":[]}"#);
    }
}
