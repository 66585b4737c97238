//! Time helpers shared by the storage adapters.

use chrono::{DateTime, Utc};

/// UTC day (`YYYY-MM-DD`) of a nanosecond-since-epoch timestamp.
///
/// This is the partition date used by the `events` table and the
/// `merkle_roots` table, so every writer and reader must derive it the
/// same way.
pub fn utc_day(nanos: i64) -> String {
    DateTime::<Utc>::from_timestamp_nanos(nanos)
        .date_naive()
        .format("%Y-%m-%d")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_day() {
        assert_eq!(utc_day(0), "1970-01-01");
    }

    #[test]
    fn test_day_boundary() {
        let one_day_ns = 86_400_000_000_000i64;
        assert_eq!(utc_day(one_day_ns - 1), "1970-01-01");
        assert_eq!(utc_day(one_day_ns), "1970-01-02");
    }

    #[test]
    fn test_modern_timestamp() {
        // 2024-05-01T12:00:00Z
        assert_eq!(utc_day(1_714_564_800_000_000_000), "2024-05-01");
    }
}
