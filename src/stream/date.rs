use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AppError, Result};

/// Number of leading epoch digits read as Unix seconds.
///
/// The service embeds millisecond values; keeping the first ten digits drops the
/// millisecond part by truncation, which is only correct for dates between 2001 and 2286.
// TODO: confirm the epoch unit against live service output and convert from
// milliseconds instead of truncating.
const EPOCH_DIGITS: usize = 10;

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^/?Date\(([0-9]+)([+-])([0-9]{2})([0-9]{2})\)/?$")
            .expect("date pattern compiles")
    })
}

/// A decoded `Date(<epoch>+<offset>)` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedDate {
    pub instant: DateTime<Utc>,
    /// Offset as written by the service. It is not applied to `instant`.
    pub offset: FixedOffset,
}

/// Decode a service date string into a UTC instant, discarding the offset.
pub fn decode(raw: &str) -> Result<DateTime<Utc>> {
    decode_parts(raw).map(|decoded| decoded.instant)
}

/// Decode a service date string, keeping the offset it carried.
pub fn decode_parts(raw: &str) -> Result<DecodedDate> {
    let malformed = || AppError::MalformedDate(raw.to_string());

    let captures = date_pattern().captures(raw.trim()).ok_or_else(malformed)?;

    let digits = &captures[1];
    let seconds: i64 = digits[..digits.len().min(EPOCH_DIGITS)]
        .parse()
        .map_err(|_| malformed())?;
    let instant = Utc.timestamp_opt(seconds, 0).single().ok_or_else(malformed)?;

    let hours: i32 = captures[3].parse().map_err(|_| malformed())?;
    let minutes: i32 = captures[4].parse().map_err(|_| malformed())?;
    let magnitude = hours * 3600 + minutes * 60;
    let offset_secs = if &captures[2] == "-" { -magnitude } else { magnitude };
    let offset = FixedOffset::east_opt(offset_secs).ok_or_else(malformed)?;

    Ok(DecodedDate { instant, offset })
}

/// Instant decoded from the service's epoch-wrapped date format during deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceDate(pub DateTime<Utc>);

impl ServiceDate {
    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for ServiceDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl<'de> Deserialize<'de> for ServiceDate {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        decode(&raw).map(ServiceDate).map_err(de::Error::custom)
    }
}

impl Serialize for ServiceDate {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_year_2018() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn decodes_millisecond_epoch_by_truncation() {
        assert_eq!(decode("Date(1514764800000+0000)").unwrap(), new_year_2018());
    }

    #[test]
    fn accepts_slash_wrapped_form() {
        assert_eq!(decode("/Date(1514764800000+0000)/").unwrap(), new_year_2018());
    }

    #[test]
    fn truncation_drops_sub_second_digits() {
        // 1514764800999 ms would round to the next second; truncation keeps the earlier one.
        assert_eq!(decode("Date(1514764800999+0000)").unwrap(), new_year_2018());
    }

    #[test]
    fn offset_is_parsed_but_not_applied() {
        let decoded = decode_parts("Date(1514764800000-0530)").unwrap();
        assert_eq!(decoded.instant, new_year_2018());
        assert_eq!(decoded.offset, FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap());
    }

    #[test]
    fn rejects_malformed_input() {
        for raw in ["Date(bogus)", "Date(1514764800000)", "2018-01-01", "", "Date(+0000)"] {
            let err = decode(raw).expect_err("decoding should fail");
            assert!(
                matches!(err, AppError::MalformedDate(ref value) if value == raw),
                "unexpected error for {raw:?}: {err}"
            );
        }
    }

    #[test]
    fn non_ascii_digits_are_malformed() {
        for raw in ["Date(1٥١٤٧٦٤٨٠٠٠+0000)", "Date(1514764800000+٠٠٠٠)"] {
            let err = decode(raw).expect_err("decoding should fail");
            assert!(
                matches!(err, AppError::MalformedDate(_)),
                "unexpected error for {raw:?}: {err}"
            );
        }
    }

    #[test]
    fn deserializes_inside_json() {
        let dates: Vec<ServiceDate> =
            serde_json::from_str(r#"["/Date(1514764800000+0000)/", "/Date(1514851200000+0000)/"]"#)
                .unwrap();
        assert_eq!(dates[0].instant(), new_year_2018());
        assert_eq!(dates[1].to_string(), "2018-01-02T00:00:00Z");
    }

    #[test]
    fn json_with_bad_date_is_an_error_not_a_panic() {
        let parsed = serde_json::from_str::<Vec<ServiceDate>>(r#"["Date(bogus)"]"#);
        assert!(parsed.is_err());
    }
}
