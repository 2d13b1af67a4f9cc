//! Result of a polling callback

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};

/// Longest cache timeout honoured, in seconds (one year)
const MAX_CACHE_TIMEOUT: u64 = 365 * 24 * 60 * 60;

/// What a module hands back to the host on each poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleResponse {
    pub full_text: String,
    pub color: String,
    /// The host should not poll again before this instant
    #[serde(serialize_with = "serialize_unix_seconds")]
    pub cached_until: DateTime<Utc>,
}

impl ModuleResponse {
    pub fn new(
        full_text: impl Into<String>,
        color: impl Into<String>,
        now: DateTime<Utc>,
        cache_timeout: u64,
    ) -> Self {
        ModuleResponse {
            full_text: full_text.into(),
            color: color.into(),
            cached_until: now + Duration::seconds(cache_timeout.min(MAX_CACHE_TIMEOUT) as i64),
        }
    }

    /// `cached_until` as fractional Unix seconds
    pub fn cached_until_secs(&self) -> f64 {
        self.cached_until.timestamp_millis() as f64 / 1000.0
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn serialize_unix_seconds<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(ts.timestamp_millis() as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cached_until_adds_timeout() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let resp = ModuleResponse::new("text", "#00ff00", now, 3);
        assert_eq!(resp.cached_until.timestamp(), 1_700_000_003);
    }

    #[test]
    fn test_json_shape() {
        let now = Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap();
        let resp = ModuleResponse::new("♪ Stopped", "#ff0000", now, 1);
        let value: serde_json::Value = serde_json::from_str(&resp.to_json().unwrap()).unwrap();
        assert_eq!(value["full_text"], "♪ Stopped");
        assert_eq!(value["color"], "#ff0000");
        assert_eq!(value["cached_until"].as_f64(), Some(1_700_000_001.5));
    }
}
