mod issue_filter;
mod time_entry_filter;

pub use issue_filter::IssueFilter;
pub use time_entry_filter::TimeEntryFilter;

/// Maximum page size accepted by Redmine list endpoints.
pub const PAGE_LIMIT: usize = 100;

pub trait RedmineFilter {
    /// Renders the filter as a ready-to-append query string.
    fn as_redmine_query(&self) -> String;
}
