use crate::domain::RedmineFilter;

#[derive(Debug, Clone)]
pub struct RedmineUrl(String);

impl AsRef<str> for RedmineUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl RedmineUrl {
    /// Creates a new RedmineUrl from a server base URL, dropping any trailing slash.
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self(base.trim_end_matches('/').to_string())
    }

    /// Append the given path to the URL.
    pub fn append_path(&self, path: &str) -> Self {
        let trimmed_url = self.0.trim_end_matches('/');
        let trimmed_path = path.trim_start_matches('/');
        Self(format!("{}/{}", trimmed_url, trimmed_path))
    }

    pub fn with_filter(&self, filter: &impl RedmineFilter) -> Self {
        self.with_query(&filter.as_redmine_query())
    }

    pub fn with_query(&self, query: &str) -> Self {
        if self.0.contains('?') {
            Self(format!("{}&{}", self.0, query))
        } else {
            Self(format!("{}?{}", self.0, query))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_path_handles_slashes() {
        let url = RedmineUrl::new("https://redmine.example.com/");
        assert_eq!(
            url.append_path("/issues.json").as_ref(),
            "https://redmine.example.com/issues.json"
        );
        assert_eq!(
            url.append_path("issues.json").as_ref(),
            "https://redmine.example.com/issues.json"
        );
    }

    #[test]
    fn with_query_picks_separator() {
        let url = RedmineUrl::new("https://redmine.example.com").append_path("/projects.json");
        let first = url.with_query("limit=100");
        assert_eq!(
            first.as_ref(),
            "https://redmine.example.com/projects.json?limit=100"
        );
        let second = first.with_query("offset=100");
        assert_eq!(
            second.as_ref(),
            "https://redmine.example.com/projects.json?limit=100&offset=100"
        );
    }
}
