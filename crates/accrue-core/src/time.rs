// SPDX-FileCopyrightText: 2026 Accrue Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp text encoding.
//!
//! Stored timestamps use a fixed-width UTC form so that lexicographic order in
//! SQLite equals chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats a timestamp as fixed-width RFC 3339 with microseconds.
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses any RFC 3339 timestamp into UTC.
pub fn parse_ts(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_ts(&a), "2026-01-02T03:04:05.000000Z");
        assert_eq!(parse_ts(&format_ts(&a)).unwrap(), a);
    }

    proptest! {
        #[test]
        fn text_order_matches_time_order(a in 0i64..4_000_000_000_000, b in 0i64..4_000_000_000_000) {
            let ta = DateTime::<Utc>::from_timestamp_micros(a).unwrap();
            let tb = DateTime::<Utc>::from_timestamp_micros(b).unwrap();
            prop_assert_eq!(ta.cmp(&tb), format_ts(&ta).cmp(&format_ts(&tb)));
        }
    }
}
