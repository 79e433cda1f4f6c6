//! Flexible timestamp parsing for control-plane payloads.
//!
//! Tenant timestamps arrive in three shapes: RFC3339, a bare
//! `YYYY-MM-DDTHH:MM:SS` layout (assumed UTC), and the literal string
//! `"null"`. A missing, null or `"null"` value decodes to `None`; downstream
//! code treats `None` as "not deleted".

use chrono::{DateTime, NaiveDateTime, ParseError, SecondsFormat, Utc};

const BARE_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";
const NULL_STRING: &str = "null";

pub fn parse_flexible(raw: &str) -> Result<Option<DateTime<Utc>>, ParseError> {
    if raw.is_empty() || raw == NULL_STRING {
        return Ok(None);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    let naive = NaiveDateTime::parse_from_str(raw, BARE_LAYOUT)?;
    Ok(Some(naive.and_utc()))
}

/// Serde adapter for `Option<DateTime<Utc>>` fields using the flexible
/// layouts. Use with `#[serde(with = "...", default)]`.
pub mod flexible {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse_flexible(&s).map_err(serde::de::Error::custom),
        }
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => {
                serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339() {
        let parsed = parse_flexible("2024-03-01T10:30:00Z").unwrap();
        assert_eq!(parsed, Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()));
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_flexible("2024-03-01T12:30:00+02:00").unwrap();
        assert_eq!(parsed, Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()));
    }

    #[test]
    fn parses_bare_layout_as_utc() {
        let parsed = parse_flexible("2024-03-01T10:30:00").unwrap();
        assert_eq!(parsed, Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()));
    }

    #[test]
    fn null_string_is_none() {
        assert_eq!(parse_flexible("null").unwrap(), None);
        assert_eq!(parse_flexible("").unwrap(), None);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_flexible("yesterday").is_err());
    }

    #[test]
    fn serde_round_trip() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "flexible", default)]
            at: Option<DateTime<Utc>>,
        }

        let w: Wrapper = serde_json::from_str(r#"{"at":"2024-03-01T10:30:00Z"}"#).unwrap();
        assert!(w.at.is_some());
        let w: Wrapper = serde_json::from_str(r#"{"at":"null"}"#).unwrap();
        assert!(w.at.is_none());
        let w: Wrapper = serde_json::from_str(r#"{"at":null}"#).unwrap();
        assert!(w.at.is_none());
        let w: Wrapper = serde_json::from_str(r#"{}"#).unwrap();
        assert!(w.at.is_none());
    }
}
