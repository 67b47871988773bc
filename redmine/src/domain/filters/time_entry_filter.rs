use super::{RedmineFilter, PAGE_LIMIT};

/// Time entries of one user within an inclusive date range.
pub struct TimeEntryFilter {
    pub user_id: u32,
    pub from: chrono::NaiveDate,
    pub to: chrono::NaiveDate,
}

impl TimeEntryFilter {
    pub fn new(user_id: u32, from: chrono::NaiveDate, to: chrono::NaiveDate) -> Self {
        Self { user_id, from, to }
    }
}

impl RedmineFilter for TimeEntryFilter {
    fn as_redmine_query(&self) -> String {
        format!(
            "user_id={}&from={}&to={}&limit={}",
            self.user_id, self.from, self.to, PAGE_LIMIT
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn renders_iso_dates() {
        let filter = TimeEntryFilter::new(
            12,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
        );
        assert_eq!(
            filter.as_redmine_query(),
            "user_id=12&from=2024-03-01&to=2024-03-08&limit=100"
        );
    }
}
