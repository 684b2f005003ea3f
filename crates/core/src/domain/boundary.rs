// Daily Reset Boundary
// Fixed local hour in a fixed time zone (e.g. 18:00 Europe/London)

use crate::domain::error::{DomainError, Result};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyBoundary {
    time: NaiveTime,
    time_zone: Tz,
}

impl DailyBoundary {
    /// Create a boundary at `hour`:00 local time in `time_zone` (IANA name)
    pub fn new(hour: u32, time_zone: &str) -> Result<Self> {
        let time = NaiveTime::from_hms_opt(hour, 0, 0).ok_or_else(|| {
            DomainError::ValidationError(format!("Reset hour out of range: {}", hour))
        })?;
        let time_zone: Tz = time_zone.parse().map_err(|_| {
            DomainError::ValidationError(format!("Unknown time zone: {}", time_zone))
        })?;
        Ok(Self { time, time_zone })
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Most recent boundary instant at or before `now_millis` (epoch ms)
    pub fn most_recent(&self, now_millis: i64) -> i64 {
        let now = from_millis(now_millis);
        let today = now.with_timezone(&self.time_zone).date_naive();
        let candidate = self.instant_on(today);
        if candidate <= now {
            candidate.timestamp_millis()
        } else {
            let yesterday = today.pred_opt().unwrap_or(today);
            self.instant_on(yesterday).timestamp_millis()
        }
    }

    /// First boundary instant strictly after `now_millis` (epoch ms)
    pub fn next_after(&self, now_millis: i64) -> i64 {
        let now = from_millis(now_millis);
        let today = now.with_timezone(&self.time_zone).date_naive();
        let candidate = self.instant_on(today);
        if candidate > now {
            candidate.timestamp_millis()
        } else {
            let tomorrow = today.succ_opt().unwrap_or(today);
            self.instant_on(tomorrow).timestamp_millis()
        }
    }

    /// Boundary instant on a local calendar date
    ///
    /// Ambiguous local times (clocks going back) resolve to the earliest instant,
    /// skipped local times (clocks going forward) move one hour later.
    fn instant_on(&self, date: NaiveDate) -> DateTime<Utc> {
        let local = date.and_time(self.time);
        match self.time_zone.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            LocalResult::None => {
                let shifted = local + Duration::hours(1);
                self.time_zone
                    .from_local_datetime(&shifted)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|| Utc.from_utc_datetime(&local))
            }
        }
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(rfc3339: &str) -> i64 {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .timestamp_millis()
    }

    fn london() -> DailyBoundary {
        DailyBoundary::new(18, "Europe/London").unwrap()
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(DailyBoundary::new(24, "Europe/London").is_err());
        assert!(DailyBoundary::new(18, "Mars/Olympus").is_err());
    }

    #[test]
    fn test_most_recent_before_boundary_is_yesterday() {
        // Winter: London is UTC+0
        let now = millis("2024-01-10T12:00:00Z");
        assert_eq!(london().most_recent(now), millis("2024-01-09T18:00:00Z"));
    }

    #[test]
    fn test_most_recent_after_boundary_is_today() {
        // Summer: 18:00 BST is 17:00 UTC
        let now = millis("2024-07-10T17:30:00Z");
        assert_eq!(london().most_recent(now), millis("2024-07-10T17:00:00Z"));
    }

    #[test]
    fn test_boundary_instant_is_inclusive() {
        let now = millis("2024-07-10T17:00:00Z");
        assert_eq!(london().most_recent(now), now);
        assert_eq!(london().next_after(now), millis("2024-07-11T17:00:00Z"));
    }

    #[test]
    fn test_next_after() {
        let now = millis("2024-07-10T16:00:00Z");
        assert_eq!(london().next_after(now), millis("2024-07-10T17:00:00Z"));
    }

    #[test]
    fn test_skipped_local_time_moves_forward() {
        // 01:00 local does not exist on 2024-03-31 in London
        let boundary = DailyBoundary::new(1, "Europe/London").unwrap();
        let now = millis("2024-03-31T12:00:00Z");
        assert_eq!(boundary.most_recent(now), millis("2024-03-31T01:00:00Z"));
    }
}
