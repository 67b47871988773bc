use chrono::NaiveDate;

use redmine::{CustomFieldValue, NewTimeEntry, RedmineClient, RedmineFetchError};

use crate::error::SessionError;
use crate::session::Session;
use crate::timer::TimerPhase;

/// Everything the stopped session knows that a time entry needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionBasis {
    pub issue_id: u32,
    pub subject: String,
    pub activity_id: Option<u32>,
    pub elapsed_seconds: i64,
    pub comments: String,
}

/// Converts tracked seconds to Redmine hours: round UP to the next 0.05
/// (three minutes), with 0.1 as the floor so even a seconds-long session
/// logs six minutes. Two decimals, since that is all Redmine keeps.
pub fn rounded_hours(elapsed_seconds: i64) -> f64 {
    let raw = elapsed_seconds as f64 / 3600.0;
    let stepped = (raw * 20.0).ceil() / 20.0;
    let clamped = stepped.max(0.1);
    (clamped * 100.0).round() / 100.0
}

/// The reviewed, user-editable submission. Built from a [`SubmissionBasis`]
/// and adjusted in the summary form before it goes out.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionDraft {
    pub issue_id: u32,
    pub hours: f64,
    pub comments: String,
    pub activity_id: Option<u32>,
    pub spent_on: NaiveDate,
    pub billable: bool,
    /// Custom field id carrying the billable flag, when the server has one.
    pub billable_field_id: Option<u32>,
    /// Issue status to set after logging, when the user picked one.
    pub status_change: Option<u32>,
}

impl SubmissionDraft {
    pub fn from_basis(basis: &SubmissionBasis, spent_on: NaiveDate) -> Self {
        Self {
            issue_id: basis.issue_id,
            hours: rounded_hours(basis.elapsed_seconds),
            comments: basis.comments.clone(),
            activity_id: basis.activity_id,
            spent_on,
            billable: true,
            billable_field_id: None,
            status_change: None,
        }
    }

    /// Wire payload. The billable flag becomes `"1"`/`"0"` on the configured
    /// custom field; without a field id it is omitted entirely.
    pub fn time_entry(&self) -> NewTimeEntry {
        let custom_fields = self
            .billable_field_id
            .map(|id| vec![CustomFieldValue::new(id, if self.billable { "1" } else { "0" })])
            .unwrap_or_default();

        NewTimeEntry {
            issue_id: self.issue_id,
            hours: self.hours,
            comments: self.comments.clone(),
            activity_id: self.activity_id,
            spent_on: self.spent_on,
            custom_fields,
        }
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Logged {
        hours: f64,
    },
    /// The time entry was created but the follow-up status change failed.
    /// The entry is NOT rolled back; the queue advanced normally.
    LoggedButStatusFailed {
        hours: f64,
        status_error: RedmineFetchError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Redmine(#[from] RedmineFetchError),
}

/// Logs the stopped session to Redmine, optionally moves the issue to a new
/// status, then advances the queue. If creating the entry fails the session
/// is left exactly as it was, stopped and resubmittable.
pub async fn submit(
    session: &mut Session,
    client: &RedmineClient,
    draft: &SubmissionDraft,
) -> Result<SubmitOutcome, SubmitError> {
    if session.phase() != TimerPhase::Stopped {
        return Err(SessionError::Invariant("stop the timer before submitting".into()).into());
    }

    client.create_time_entry(&draft.time_entry()).await?;
    tracing::info!(
        issue_id = draft.issue_id,
        hours = draft.hours,
        "logged time entry"
    );

    let status_error = match draft.status_change {
        Some(status_id) => client
            .update_issue_status(draft.issue_id, status_id)
            .await
            .err(),
        None => None,
    };

    session.advance_after_submit(draft.issue_id)?;

    match status_error {
        None => Ok(SubmitOutcome::Logged { hours: draft.hours }),
        Some(error) => {
            tracing::warn!(issue_id = draft.issue_id, %error, "status change failed after logging");
            Ok(SubmitOutcome::LoggedButStatusFailed {
                hours: draft.hours,
                status_error: error,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::StartOutcome;
    use crate::store::QueueStore;
    use crate::task::TaskDraft;
    use chrono::DateTime;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn hours_round_up_to_the_next_three_minutes() {
        assert_eq!(rounded_hours(0), 0.1);
        assert_eq!(rounded_hours(1), 0.1);
        assert_eq!(rounded_hours(108), 0.1);
        assert_eq!(rounded_hours(180), 0.1);
        assert_eq!(rounded_hours(360), 0.1);
        assert_eq!(rounded_hours(361), 0.15);
        assert_eq!(rounded_hours(900), 0.25);
        assert_eq!(rounded_hours(4_468), 1.25);
        assert_eq!(rounded_hours(5_401), 1.55);
        assert_eq!(rounded_hours(7_200), 2.0);
    }

    #[test]
    fn billable_flag_maps_onto_the_custom_field() {
        let basis = SubmissionBasis {
            issue_id: 77,
            subject: "Fix login".into(),
            activity_id: Some(9),
            elapsed_seconds: 4_468,
            comments: "triage fix".into(),
        };
        let spent_on = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let mut draft = SubmissionDraft::from_basis(&basis, spent_on);
        assert!(draft.billable);
        assert_eq!(draft.hours, 1.25);

        // No configured field: nothing is sent.
        assert!(draft.time_entry().custom_fields.is_empty());

        draft.billable_field_id = Some(14);
        assert_eq!(draft.time_entry().custom_fields[0].value, "1");

        draft.billable = false;
        assert_eq!(draft.time_entry().custom_fields[0].value, "0");
        assert_eq!(draft.time_entry().custom_fields[0].id, 14);
    }

    fn stopped_session(dir: &tempfile::TempDir, seconds: i64) -> Session {
        let clock = Arc::new(ManualClock::starting_at(
            DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        ));
        let mut session = Session::with_clock(QueueStore::at(dir.path()), clock.clone());
        let draft = TaskDraft {
            project_id: Some(1),
            project_name: "Platform".into(),
            issue_id: Some(77),
            subject: "Fix login".into(),
            activity_id: Some(9),
            ..TaskDraft::default()
        };
        let id = session.enqueue(draft).unwrap();
        assert!(matches!(
            session.start_task(id).unwrap(),
            StartOutcome::NeedsFirstNote { .. }
        ));
        session.provide_first_note("kickoff").unwrap();
        clock.advance_ms(seconds * 1000);
        session.stop().unwrap();
        session
    }

    #[tokio::test]
    async fn submit_logs_time_and_advances_the_queue() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/time_entries.json"))
            .and(body_partial_json(serde_json::json!({
                "time_entry": {
                    "issue_id": 77,
                    "hours": 1.25,
                    "comments": "kickoff",
                    "activity_id": 9,
                    "custom_fields": [{"id": 14, "value": "1"}],
                }
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/issues/77.json"))
            .and(body_partial_json(
                serde_json::json!({"issue": {"status_id": 3}}),
            ))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = stopped_session(&dir, 4_468);
        let basis = session.submission_basis().unwrap();
        let mut draft = SubmissionDraft::from_basis(&basis, session.today());
        draft.billable_field_id = Some(14);
        draft.status_change = Some(3);

        let client = RedmineClient::new(server.uri(), "secret");
        let outcome = submit(&mut session, &client, &draft).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Logged { hours } if hours == 1.25));
        assert!(session.tasks().is_empty());
        assert_eq!(session.phase(), TimerPhase::Idle);
    }

    #[tokio::test]
    async fn status_failure_still_advances_and_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/time_entries.json"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/issues/77.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = stopped_session(&dir, 60);
        let basis = session.submission_basis().unwrap();
        let mut draft = SubmissionDraft::from_basis(&basis, session.today());
        draft.status_change = Some(3);

        let client = RedmineClient::new(server.uri(), "secret");
        let outcome = submit(&mut session, &client, &draft).await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::LoggedButStatusFailed { .. }
        ));
        assert!(session.tasks().is_empty());
    }

    #[tokio::test]
    async fn failed_creation_leaves_the_session_stopped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/time_entries.json"))
            .respond_with(ResponseTemplate::new(422).set_body_json(
                serde_json::json!({"errors": ["Hours is invalid"]}),
            ))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = stopped_session(&dir, 60);
        let basis = session.submission_basis().unwrap();
        let draft = SubmissionDraft::from_basis(&basis, session.today());

        let client = RedmineClient::new(server.uri(), "secret");
        let err = submit(&mut session, &client, &draft).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Redmine(RedmineFetchError::Upstream { status: 422, .. })
        ));
        // Nothing advanced: the session can be resubmitted as-is.
        assert_eq!(session.phase(), TimerPhase::Stopped);
        assert_eq!(session.tasks().len(), 1);
        assert_eq!(session.submission_basis().unwrap().issue_id, 77);
    }

    #[tokio::test]
    async fn submit_refuses_a_running_session() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_at(
            DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        ));
        let mut session = Session::with_clock(QueueStore::at(dir.path()), clock.clone());
        let id = session
            .enqueue(TaskDraft {
                project_id: Some(1),
                project_name: "Platform".into(),
                issue_id: Some(77),
                subject: "Fix login".into(),
                ..TaskDraft::default()
            })
            .unwrap();
        session.start_task(id).unwrap();
        session.provide_first_note("go").unwrap();

        let draft = SubmissionDraft {
            issue_id: 77,
            hours: 0.1,
            comments: String::new(),
            activity_id: None,
            spent_on: session.today(),
            billable: true,
            billable_field_id: None,
            status_change: None,
        };
        let client = RedmineClient::new(server.uri(), "secret");
        let err = submit(&mut session, &client, &draft).await.unwrap_err();
        assert!(matches!(err, SubmitError::Session(SessionError::Invariant(_))));
    }
}
