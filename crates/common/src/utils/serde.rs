//! Serde helpers for castkit's config and policy types

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// `*_ms` fields: a [`Duration`] stored as whole milliseconds.
///
/// Used by `RetryPolicy` (`initial_delay_ms`, `max_delay_ms`) and the API
/// timeout (`timeout_ms`).
pub mod duration_millis {
    use super::*;

    /// Whole milliseconds, saturating at `u64::MAX`.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    /// Whole milliseconds back into a [`Duration`].
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Timeout {
        #[serde(rename = "timeout_ms", with = "duration_millis")]
        timeout: Duration,
    }

    #[test]
    fn writes_whole_millis() {
        let json = serde_json::to_string(&Timeout { timeout: Duration::from_millis(1500) }).unwrap();
        assert_eq!(json, r#"{"timeout_ms":1500}"#);
    }

    #[test]
    fn reads_whole_millis() {
        let parsed: Timeout = serde_json::from_str(r#"{"timeout_ms":250}"#).unwrap();
        assert_eq!(parsed.timeout, Duration::from_millis(250));
    }

    #[test]
    fn sub_millisecond_part_is_dropped() {
        let json = serde_json::to_value(Timeout { timeout: Duration::from_micros(1999) }).unwrap();
        assert_eq!(json["timeout_ms"], 1);
    }

    #[test]
    fn huge_durations_saturate() {
        let json = serde_json::to_value(Timeout { timeout: Duration::MAX }).unwrap();
        assert_eq!(json["timeout_ms"], u64::MAX);
    }

    #[test]
    fn negative_millis_are_rejected() {
        assert!(serde_json::from_str::<Timeout>(r#"{"timeout_ms":-1}"#).is_err());
    }
}
