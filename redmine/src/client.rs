use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{
    domain::{
        CustomField, Issue, IssueFilter, IssueStatus, IssueStatusesEnvelope, IssuesPage,
        NewTimeEntry, Project, ProjectsPage, TimeEntriesPage, TimeEntry,
        TimeEntryActivitiesEnvelope, TimeEntryActivity, TimeEntryFilter, TimeEntryUpdate, User,
        UserEnvelope, PAGE_LIMIT,
    },
    RedmineUrl,
};

/// Header carrying the API key; the relay forwards it verbatim.
pub const API_KEY_HEADER: &str = "x-redmine-api-key";
/// Header telling the relay which Redmine server to forward to.
pub const UPSTREAM_URL_HEADER: &str = "x-redmine-url";

pub struct RedmineClient {
    http: reqwest::Client,
    base_url: RedmineUrl,
    api_key: String,
    relay_upstream: Option<String>,
}

impl RedmineClient {
    /// Client talking directly to a Redmine server.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: RedmineUrl::new(base_url),
            api_key: api_key.into(),
            relay_upstream: None,
        }
    }

    /// Client routed through a takt relay: requests target `<relay>/api/...`
    /// and name the real server in the `x-redmine-url` header.
    pub fn via_relay(
        relay_url: impl Into<String>,
        redmine_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: RedmineUrl::new(relay_url).append_path("/api"),
            api_key: api_key.into(),
            relay_upstream: Some(redmine_url.into()),
        }
    }

    fn request(&self, method: reqwest::Method, url: impl AsRef<str>) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .request(method, url.as_ref())
            .header(API_KEY_HEADER, &self.api_key);
        if let Some(upstream) = &self.relay_upstream {
            req = req.header(UPSTREAM_URL_HEADER, upstream);
        }
        req
    }

    async fn send<B: Serialize>(
        &self,
        method: reqwest::Method,
        url: impl AsRef<str>,
        body: Option<&B>,
    ) -> Result<reqwest::Response, RedmineFetchError> {
        let mut req = self.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| RedmineFetchError::ResponseError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        Ok(resp)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        url: impl AsRef<str>,
    ) -> Result<T, RedmineFetchError> {
        let resp = self.send::<()>(reqwest::Method::GET, url, None).await?;

        let resp_data = resp.json::<T>().await.map_err(|e| {
            RedmineFetchError::ParsingError(format!("Failed to parse response as JSON: {}", e))
        })?;

        Ok(resp_data)
    }

    async fn error_from_response(resp: reqwest::Response) -> RedmineFetchError {
        let status = resp.status();
        if status == 401 || status == 403 {
            return RedmineFetchError::Unauthorized;
        }

        let body = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<RedmineErrorBody>(&body) {
            Ok(parsed) if !parsed.errors.is_empty() => parsed.errors.join(", "),
            _ if !body.is_empty() => body,
            _ => format!("HTTP error {}", status.as_u16()),
        };

        RedmineFetchError::Upstream {
            status: status.as_u16(),
            message,
        }
    }

    /// `GET /users/current.json`, also used as the connection test.
    pub async fn current_user(&self) -> Result<User, RedmineFetchError> {
        let url = self.base_url.append_path("/users/current.json");
        let envelope: UserEnvelope = self.fetch(url).await?;

        Ok(envelope.user)
    }

    /// All visible projects, following `total_count` pagination in pages of 100.
    pub async fn projects(&self) -> Result<Vec<Project>, RedmineFetchError> {
        let mut all = Vec::new();
        let mut offset = 0;

        loop {
            let url = self
                .base_url
                .append_path("/projects.json")
                .with_query(&format!("limit={}&offset={}", PAGE_LIMIT, offset));
            let page: ProjectsPage = self.fetch(url).await?;

            let fetched = page.projects.len();
            all.extend(page.projects);

            if fetched < PAGE_LIMIT || all.len() >= page.total_count {
                break;
            }
            offset += PAGE_LIMIT;
            tracing::debug!(offset, total_count = page.total_count, "fetching next project page");
        }

        Ok(all)
    }

    pub async fn issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, RedmineFetchError> {
        let url = self.base_url.append_path("/issues.json").with_filter(filter);
        let page: IssuesPage = self.fetch(url).await?;

        Ok(page.issues)
    }

    pub async fn time_entries(
        &self,
        filter: &TimeEntryFilter,
    ) -> Result<Vec<TimeEntry>, RedmineFetchError> {
        let url = self
            .base_url
            .append_path("/time_entries.json")
            .with_filter(filter);
        let page: TimeEntriesPage = self.fetch(url).await?;

        Ok(page.time_entries)
    }

    pub async fn time_entry_activities(
        &self,
    ) -> Result<Vec<TimeEntryActivity>, RedmineFetchError> {
        let url = self
            .base_url
            .append_path("/enumerations/time_entry_activities.json");
        let envelope: TimeEntryActivitiesEnvelope = self.fetch(url).await?;

        Ok(envelope.time_entry_activities)
    }

    pub async fn issue_statuses(&self) -> Result<Vec<IssueStatus>, RedmineFetchError> {
        let url = self.base_url.append_path("/issue_statuses.json");
        let envelope: IssueStatusesEnvelope = self.fetch(url).await?;

        Ok(envelope.issue_statuses)
    }

    /// Creates a time entry. Redmine answers `201 Created`; the body is ignored.
    pub async fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<(), RedmineFetchError> {
        let url = self.base_url.append_path("/time_entries.json");
        self.send(
            reqwest::Method::POST,
            url,
            Some(&TimeEntryEnvelope { time_entry: entry }),
        )
        .await?;

        Ok(())
    }

    pub async fn update_time_entry(
        &self,
        id: u32,
        update: &TimeEntryUpdate,
    ) -> Result<(), RedmineFetchError> {
        let url = self
            .base_url
            .append_path(&format!("/time_entries/{}.json", id));
        self.send(
            reqwest::Method::PUT,
            url,
            Some(&TimeEntryUpdateEnvelope { time_entry: update }),
        )
        .await?;

        Ok(())
    }

    pub async fn delete_time_entry(&self, id: u32) -> Result<(), RedmineFetchError> {
        let url = self
            .base_url
            .append_path(&format!("/time_entries/{}.json", id));
        self.send::<()>(reqwest::Method::DELETE, url, None).await?;

        Ok(())
    }

    pub async fn update_issue_status(
        &self,
        issue_id: u32,
        status_id: u32,
    ) -> Result<(), RedmineFetchError> {
        let url = self.base_url.append_path(&format!("/issues/{}.json", issue_id));
        self.send(
            reqwest::Method::PUT,
            url,
            Some(&IssueUpdateEnvelope {
                issue: IssueStatusChange { status_id },
            }),
        )
        .await?;

        Ok(())
    }

    /// Custom fields usable on time entries. Redmine only exposes field
    /// definitions to admins, so they are inferred from the newest entry.
    pub async fn time_entry_custom_fields(&self) -> Result<Vec<CustomField>, RedmineFetchError> {
        let url = self
            .base_url
            .append_path("/time_entries.json")
            .with_query("limit=1&include=custom_fields");
        let page: TimeEntriesPage = self.fetch(url).await?;

        let fields = page
            .time_entries
            .into_iter()
            .next()
            .map(|entry| {
                entry
                    .custom_fields
                    .into_iter()
                    .map(|value| CustomField {
                        id: value.id,
                        name: value.name.unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(fields)
    }

    pub async fn detect_billable_field(&self) -> Result<Option<CustomField>, RedmineFetchError> {
        let fields = self.time_entry_custom_fields().await?;

        Ok(fields.into_iter().find(|field| field.looks_billable()))
    }
}

#[derive(Error, Debug)]
pub enum RedmineFetchError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Redmine rejected the request ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("ResponseError: {0}")]
    ResponseError(String),
    #[error("ParsingError: {0}")]
    ParsingError(String),
}

/// Redmine's standard validation error body, `{"errors": [...]}`.
#[derive(Debug, Deserialize)]
struct RedmineErrorBody {
    errors: Vec<String>,
}

#[derive(Serialize)]
struct TimeEntryEnvelope<'a> {
    time_entry: &'a NewTimeEntry,
}

#[derive(Serialize)]
struct TimeEntryUpdateEnvelope<'a> {
    time_entry: &'a TimeEntryUpdate,
}

#[derive(Serialize)]
struct IssueUpdateEnvelope {
    issue: IssueStatusChange,
}

#[derive(Serialize)]
struct IssueStatusChange {
    status_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CustomFieldValue;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> RedmineClient {
        RedmineClient::new(server.uri(), "secret-key")
    }

    #[tokio::test]
    async fn current_user_sends_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/current.json"))
            .and(header(API_KEY_HEADER, "secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": 5, "login": "jdoe", "firstname": "Jane", "lastname": "Doe"}
            })))
            .mount(&server)
            .await;

        let user = client_for(&server).current_user().await.unwrap();
        assert_eq!(user.id, 5);
        assert_eq!(user.display_name(), "Jane Doe");
    }

    #[tokio::test]
    async fn projects_follow_pagination() {
        let server = MockServer::start().await;
        let first_page: Vec<_> = (0..100)
            .map(|i| json!({"id": i, "name": format!("Project {}", i)}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/projects.json"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "projects": first_page,
                "total_count": 103
            })))
            .mount(&server)
            .await;
        let second_page: Vec<_> = (100..103)
            .map(|i| json!({"id": i, "name": format!("Project {}", i)}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/projects.json"))
            .and(query_param("offset", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "projects": second_page,
                "total_count": 103
            })))
            .mount(&server)
            .await;

        let projects = client_for(&server).projects().await.unwrap();
        assert_eq!(projects.len(), 103);
        assert_eq!(projects[102].name, "Project 102");
    }

    #[tokio::test]
    async fn unauthorized_status_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/current.json"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).current_user().await.unwrap_err();
        assert!(matches!(err, RedmineFetchError::Unauthorized));
    }

    #[tokio::test]
    async fn validation_errors_are_joined() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/time_entries.json"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "errors": ["Hours cannot be blank", "Activity is not included in the list"]
            })))
            .mount(&server)
            .await;

        let entry = NewTimeEntry {
            issue_id: 77,
            hours: 0.0,
            comments: String::new(),
            activity_id: None,
            spent_on: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            custom_fields: Vec::new(),
        };
        let err = client_for(&server).create_time_entry(&entry).await.unwrap_err();
        match err {
            RedmineFetchError::Upstream { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(
                    message,
                    "Hours cannot be blank, Activity is not included in the list"
                );
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn create_time_entry_wraps_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/time_entries.json"))
            .and(body_json(json!({
                "time_entry": {
                    "issue_id": 77,
                    "hours": 0.1,
                    "comments": "fixed flaky test",
                    "activity_id": 9,
                    "spent_on": "2024-03-08",
                    "custom_fields": [{"id": 3, "value": "1"}]
                }
            })))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let entry = NewTimeEntry {
            issue_id: 77,
            hours: 0.1,
            comments: "fixed flaky test".to_string(),
            activity_id: Some(9),
            spent_on: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            custom_fields: vec![CustomFieldValue::new(3, "1")],
        };
        client_for(&server).create_time_entry(&entry).await.unwrap();
    }

    #[tokio::test]
    async fn relay_mode_prefixes_api_and_names_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/current.json"))
            .and(header(UPSTREAM_URL_HEADER, "https://redmine.internal"))
            .and(header(API_KEY_HEADER, "secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": 1, "firstname": "Jane", "lastname": "Doe"}
            })))
            .mount(&server)
            .await;

        let client =
            RedmineClient::via_relay(server.uri(), "https://redmine.internal", "secret-key");
        let user = client.current_user().await.unwrap();
        assert_eq!(user.id, 1);
    }

    #[tokio::test]
    async fn billable_field_inferred_from_latest_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time_entries.json"))
            .and(query_param("include", "custom_fields"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "time_entries": [{
                    "id": 900,
                    "project": {"id": 1, "name": "Platform"},
                    "activity": {"id": 9, "name": "Development"},
                    "hours": 1.5,
                    "spent_on": "2024-03-08",
                    "custom_fields": [
                        {"id": 2, "name": "Sprint", "value": ""},
                        {"id": 3, "name": "Billable", "value": "1"}
                    ]
                }],
                "total_count": 1
            })))
            .mount(&server)
            .await;

        let billable = client_for(&server).detect_billable_field().await.unwrap();
        assert_eq!(
            billable,
            Some(CustomField {
                id: 3,
                name: "Billable".to_string()
            })
        );
    }
}
