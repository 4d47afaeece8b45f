use std::cmp::{max, Reverse};

use chrono::{FixedOffset, NaiveDateTime};
use itertools::Itertools;

use crate::wake::{minutes_past, PhotoSubmission, WakeUpSettings};

/// A past photo together with how late it was taken
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub submission: PhotoSubmission,
    pub local_time: NaiveDateTime,
    pub minutes_late: i64,
}

impl HistoryEntry {
    pub fn is_late(&self) -> bool {
        self.minutes_late > 0
    }
}

/// Newest first. Photos taken before the target count as 0 minutes
/// late, and so does everything when there are no settings. Whether
/// the challenge is currently enabled doesn't matter for the past.
pub fn history(
    submissions: &[PhotoSubmission],
    settings: Option<&WakeUpSettings>,
    offset: FixedOffset,
) -> Vec<HistoryEntry> {
    submissions
        .iter()
        .sorted_by_key(|s| Reverse(s.timestamp))
        .map(|submission| {
            let local_time = submission.timestamp.with_timezone(&offset).naive_local();
            let minutes_late = settings
                .map(|settings| {
                    let target = settings.target_on(local_time.date());
                    max(0, minutes_past(local_time, target))
                })
                .unwrap_or(0);
            HistoryEntry {
                submission: submission.clone(),
                local_time,
                minutes_late,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn submission(d: u32, h: u32, m: u32) -> PhotoSubmission {
        PhotoSubmission {
            photo_url: format!("data:image/png;base64,{}{}{}", d, h, m),
            timestamp: Utc.with_ymd_and_hms(2024, 5, d, h, m, 0).unwrap(),
        }
    }

    #[test]
    fn test_history_order_and_minutes() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let settings = WakeUpSettings::new(7, 0, true).unwrap();
        let submissions = [
            submission(15, 7, 20),
            submission(17, 6, 45),
            submission(16, 9, 0),
        ];

        let entries = history(&submissions, Some(&settings), utc);
        let summary = entries
            .iter()
            .map(|e| (e.local_time.format("%d %H:%M").to_string(), e.minutes_late))
            .collect_vec();
        assert_eq!(
            summary,
            vec![
                ("17 06:45".to_string(), 0),
                ("16 09:00".to_string(), 120),
                ("15 07:20".to_string(), 20),
            ]
        );
        assert!(!entries[0].is_late());
        assert!(entries[1].is_late());
    }

    #[test]
    fn test_history_without_settings() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let entries = history(&[submission(15, 11, 0)], None, utc);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].minutes_late, 0);
        assert!(history(&[], None, utc).is_empty());
    }

    #[test]
    fn test_history_uses_local_time() {
        // 05:30 UTC is 07:30 at +2
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let disabled = WakeUpSettings::new(7, 0, false).unwrap();
        let entries = history(&[submission(15, 5, 30)], Some(&disabled), plus_two);
        assert_eq!(entries[0].minutes_late, 30);
    }
}
