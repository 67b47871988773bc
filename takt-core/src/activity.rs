use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// One performed-task note. `duration_seconds` stays empty while the entry is
/// the live one and is assigned when the next note supersedes it or the
/// session stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
}

/// Ordered performed-task notes of one tracking session.
///
/// Durations are cumulative floors: each closed entry gets the whole-second
/// elapsed total at the moment it was superseded, minus everything already
/// closed. Summing all durations therefore reproduces the floored session
/// total exactly, with no drift from per-entry truncation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityLog {
    entries: Vec<ActivityEntry>,
}

impl ActivityLog {
    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    fn closed_seconds(&self) -> i64 {
        self.entries.iter().filter_map(|e| e.duration_seconds).sum()
    }

    /// Appends a note at `now`, closing the previous one against the elapsed
    /// total. Blank text is a no-op; returns whether an entry was added.
    pub fn append(&mut self, text: &str, now: DateTime<Utc>, total_elapsed_ms: i64) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        self.close_last(total_elapsed_ms);
        self.entries.push(ActivityEntry {
            text: text.to_string(),
            timestamp: now,
            duration_seconds: None,
        });
        true
    }

    /// Assigns the still-open last entry its duration: the whole-second
    /// elapsed total minus everything already closed, never negative.
    pub fn close_last(&mut self, total_elapsed_ms: i64) {
        let closed = self.closed_seconds();
        if let Some(last) = self.entries.last_mut() {
            if last.duration_seconds.is_none() {
                last.duration_seconds = Some((total_elapsed_ms / 1000 - closed).max(0));
            }
        }
    }

    /// Live duration of the open entry at the given elapsed total, if any.
    pub fn open_duration_seconds(&self, total_elapsed_ms: i64) -> Option<i64> {
        match self.entries.last() {
            Some(last) if last.duration_seconds.is_none() => {
                Some((total_elapsed_ms / 1000 - self.closed_seconds()).max(0))
            }
            _ => None,
        }
    }

    /// Seconds accounted for by closed entries.
    pub fn total_logged_seconds(&self) -> i64 {
        self.closed_seconds()
    }

    /// Notes joined for the submission comment, oldest first.
    pub fn joined_comments(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.text.trim())
            .filter(|t| !t.is_empty())
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000 + ms).unwrap()
    }

    #[test]
    fn blank_notes_are_dropped() {
        let mut log = ActivityLog::default();
        assert!(!log.append("   ", at(0), 0));
        assert!(log.is_empty());
        assert!(log.append("  investigated login bug  ", at(0), 0));
        assert_eq!(log.entries()[0].text, "investigated login bug");
    }

    #[test]
    fn appending_closes_the_previous_entry() {
        let mut log = ActivityLog::default();
        log.append("first", at(0), 0);
        log.append("second", at(90_500), 90_500);

        assert_eq!(log.entries()[0].duration_seconds, Some(90));
        assert_eq!(log.entries()[1].duration_seconds, None);
        assert_eq!(log.open_duration_seconds(125_000), Some(35));
    }

    #[test]
    fn durations_telescope_to_the_floored_total() {
        let mut log = ActivityLog::default();
        log.append("a", at(0), 0);
        log.append("b", at(1_900), 1_900);
        log.append("c", at(3_800), 3_800);
        log.close_last(5_700);

        let durations: Vec<_> = log
            .entries()
            .iter()
            .map(|e| e.duration_seconds.unwrap())
            .collect();
        // 1.9s floors to 1, but the next close-out reclaims the remainder.
        assert_eq!(durations, vec![1, 2, 2]);
        assert_eq!(log.total_logged_seconds(), 5_700 / 1000);
    }

    #[test]
    fn close_out_never_goes_negative() {
        let mut log = ActivityLog::default();
        log.append("a", at(0), 0);
        log.close_last(4_000);
        log.append("b", at(4_000), 4_000);
        // Elapsed snapshot older than what is already closed.
        log.close_last(3_000);

        assert_eq!(log.entries()[1].duration_seconds, Some(0));
    }

    #[test]
    fn comments_join_trimmed_notes() {
        let mut log = ActivityLog::default();
        log.append("fixed parser", at(0), 0);
        log.append("reviewed tests", at(1_000), 1_000);
        assert_eq!(log.joined_comments(), "fixed parser reviewed tests");
    }
}
