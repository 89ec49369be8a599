/// Interview invitations attached to applications
///
/// Scheduling moves the application to `interview_scheduled` and remembers
/// where it came from. Cancelling puts it back. At most one live (not
/// cancelled) invitation exists per application.
use crate::{
    account::User,
    board::applications::{fetch_application, ApplicationStatus, JobApplication},
    db::{parse_column, parse_optional_timestamp, parse_timestamp, timestamp},
    error::{is_unique_violation, BoardError, BoardResult, FieldError},
    ids::{ApplicationId, InterviewId},
    metrics,
    notify::{NotificationEvent, Notifier},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

text_enum! {
    pub enum InterviewType ("interview type") {
        InPerson => "in_person",
        Video => "video",
        Phone => "phone",
    }
}

text_enum! {
    pub enum InterviewStatus ("interview status") {
        Pending => "pending",
        Accepted => "accepted",
        Declined => "declined",
        Rescheduled => "rescheduled",
    }
}

impl InterviewStatus {
    /// Still waiting on the applicant
    pub fn awaits_response(&self) -> bool {
        matches!(self, InterviewStatus::Pending | InterviewStatus::Rescheduled)
    }
}

text_enum! {
    pub enum InterviewResponse ("interview response") {
        Accept => "accept",
        Decline => "decline",
    }
}

const INTERVIEW_COLUMNS: &str = "id, application_id, scheduled_at, duration_minutes, interview_type, \
    location, meeting_link, notes, status, cancelled_at, cancel_reason, created_at, updated_at";

#[derive(Debug, Clone, Serialize)]
pub struct InterviewInvitation {
    pub id: InterviewId,
    pub application_id: ApplicationId,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub interview_type: InterviewType,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
    pub notes: Option<String>,
    pub status: InterviewStatus,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewInvitation {
    fn from_row(row: &SqliteRow) -> BoardResult<Self> {
        Ok(InterviewInvitation {
            id: InterviewId(row.try_get("id")?),
            application_id: ApplicationId(row.try_get("application_id")?),
            scheduled_at: parse_timestamp(row, "scheduled_at")?,
            duration_minutes: row.try_get("duration_minutes")?,
            interview_type: parse_column(row, "interview_type")?,
            location: row.try_get("location")?,
            meeting_link: row.try_get("meeting_link")?,
            notes: row.try_get("notes")?,
            status: parse_column(row, "status")?,
            cancelled_at: parse_optional_timestamp(row, "cancelled_at")?,
            cancel_reason: row.try_get("cancel_reason")?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }
}

fn default_duration() -> i64 {
    60
}

/// Schedule input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InterviewDetails {
    pub scheduled_at: DateTime<Utc>,
    #[serde(default = "default_duration")]
    #[validate(range(min = 15, max = 480, message = "must be between 15 and 480 minutes"))]
    pub duration_minutes: i64,
    pub interview_type: InterviewType,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub meeting_link: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl InterviewDetails {
    pub fn check(&self, now: DateTime<Utc>) -> BoardResult<()> {
        let mut fields = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => match BoardError::from(errors) {
                BoardError::InvalidFields(fields) => fields,
                other => return Err(other),
            },
        };

        if self.scheduled_at <= now {
            fields.push(FieldError::new("scheduled_at", "must be in the future"));
        }
        fields.extend(required_for_type(
            self.interview_type,
            self.location.as_deref(),
            self.meeting_link.as_deref(),
        ));

        if fields.is_empty() {
            Ok(())
        } else {
            fields.sort_by(|a, b| a.field.cmp(&b.field));
            Err(BoardError::InvalidFields(fields))
        }
    }
}

/// In person needs a place, video needs a link
fn required_for_type(
    interview_type: InterviewType,
    location: Option<&str>,
    meeting_link: Option<&str>,
) -> Option<FieldError> {
    let blank = |v: Option<&str>| v.map(|s| s.trim().is_empty()).unwrap_or(true);
    match interview_type {
        InterviewType::InPerson if blank(location) => Some(FieldError::new(
            "location",
            "is required for in-person interviews",
        )),
        InterviewType::Video if blank(meeting_link) => Some(FieldError::new(
            "meeting_link",
            "is required for video interviews",
        )),
        _ => None,
    }
}

/// Reschedule input; omitted fields keep their current value
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RescheduleRequest {
    pub scheduled_at: DateTime<Utc>,
    #[validate(range(min = 15, max = 480, message = "must be between 15 and 480 minutes"))]
    pub duration_minutes: Option<i64>,
    #[validate(length(max = 500))]
    pub location: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub meeting_link: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

async fn fetch_interview<'e, E>(executor: E, id: InterviewId) -> BoardResult<InterviewInvitation>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        "SELECT {} FROM interview_invitations WHERE id = ?",
        INTERVIEW_COLUMNS
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| BoardError::NotFound(format!("Interview {} not found", id)))?;

    InterviewInvitation::from_row(&row)
}

#[derive(Clone)]
pub struct InterviewManager {
    db: SqlitePool,
    notifier: Arc<Notifier>,
}

impl InterviewManager {
    pub fn new(db: SqlitePool, notifier: Arc<Notifier>) -> Self {
        Self { db, notifier }
    }

    /// Invite the applicant; the application must be pending or under review
    pub async fn schedule(
        &self,
        employer: &User,
        application_id: ApplicationId,
        details: InterviewDetails,
    ) -> BoardResult<InterviewInvitation> {
        let application = fetch_application(&self.db, application_id).await?;
        require_owner(employer, &application)?;
        details.check(Utc::now())?;
        let now = timestamp(Utc::now());

        let mut tx = self.db.begin().await?;
        let moved = sqlx::query(
            r#"
            UPDATE job_applications
            SET previous_status = status, status = 'interview_scheduled', updated_at = ?
            WHERE id = ? AND status IN ('pending', 'under_review')
            "#,
        )
        .bind(&now)
        .bind(application_id)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() == 0 {
            tx.rollback().await?;
            let current = fetch_application(&self.db, application_id).await?;
            return Err(BoardError::invalid_transition(
                "application",
                current.status,
                "interview_scheduled",
            ));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO interview_invitations
            (application_id, scheduled_at, duration_minutes, interview_type, location, meeting_link,
             notes, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(application_id)
        .bind(timestamp(details.scheduled_at))
        .bind(details.duration_minutes)
        .bind(details.interview_type.as_str())
        .bind(&details.location)
        .bind(&details.meeting_link)
        .bind(&details.notes)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await;

        let interview_id = match inserted {
            Ok(result) => InterviewId(result.last_insert_rowid()),
            Err(e) => {
                tx.rollback().await?;
                if is_unique_violation(&e) {
                    return Err(BoardError::Conflict(
                        "This application already has a live interview".to_string(),
                    ));
                }
                return Err(e.into());
            }
        };
        tx.commit().await?;

        metrics::record_application("interview_scheduled");
        info!(interview_id = %interview_id, application_id = %application_id, "interview scheduled");

        let interview = fetch_interview(&self.db, interview_id).await?;
        self.notifier
            .notify_user(
                application.applicant_id,
                &NotificationEvent::InterviewScheduled {
                    interview_id,
                    application_id,
                    job_title: application.job_title.clone(),
                    scheduled_at: interview.scheduled_at,
                    interview_type: interview.interview_type,
                    rescheduled: false,
                },
            )
            .await;

        Ok(interview)
    }

    /// Cancel a live interview and restore the application's prior status
    pub async fn cancel(
        &self,
        employer: &User,
        id: InterviewId,
        reason: Option<String>,
    ) -> BoardResult<InterviewInvitation> {
        let interview = fetch_interview(&self.db, id).await?;
        let application = fetch_application(&self.db, interview.application_id).await?;
        require_owner(employer, &application)?;
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let now = timestamp(Utc::now());

        let mut tx = self.db.begin().await?;
        let cancelled = sqlx::query(
            r#"
            UPDATE interview_invitations
            SET cancelled_at = ?, cancel_reason = ?, updated_at = ?
            WHERE id = ? AND cancelled_at IS NULL
            "#,
        )
        .bind(&now)
        .bind(&reason)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if cancelled.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(BoardError::invalid_transition("interview", "cancelled", "cancelled"));
        }

        let reverted = sqlx::query(
            r#"
            UPDATE job_applications
            SET status = COALESCE(previous_status, 'under_review'), previous_status = NULL, updated_at = ?
            WHERE id = ? AND status = 'interview_scheduled'
            "#,
        )
        .bind(&now)
        .bind(interview.application_id)
        .execute(&mut *tx)
        .await?;

        if reverted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(BoardError::invalid_transition(
                "application",
                application.status,
                application
                    .previous_status
                    .unwrap_or(ApplicationStatus::UnderReview),
            ));
        }
        tx.commit().await?;

        info!(interview_id = %id, application_id = %interview.application_id, "interview cancelled");

        self.notifier
            .notify_user(
                application.applicant_id,
                &NotificationEvent::InterviewCancelled {
                    interview_id: id,
                    application_id: interview.application_id,
                    job_title: application.job_title.clone(),
                    reason,
                },
            )
            .await;

        fetch_interview(&self.db, id).await
    }

    /// Move a live interview; the applicant has to respond again
    pub async fn reschedule(
        &self,
        employer: &User,
        id: InterviewId,
        request: RescheduleRequest,
    ) -> BoardResult<InterviewInvitation> {
        request.validate()?;
        let interview = fetch_interview(&self.db, id).await?;
        let application = fetch_application(&self.db, interview.application_id).await?;
        require_owner(employer, &application)?;
        if interview.is_cancelled() {
            return Err(BoardError::invalid_transition("interview", "cancelled", "rescheduled"));
        }
        require_scheduled(&application, "rescheduled")?;
        if request.scheduled_at <= Utc::now() {
            return Err(BoardError::invalid_field("scheduled_at", "must be in the future"));
        }

        let location = request.location.clone().or_else(|| interview.location.clone());
        let meeting_link = request
            .meeting_link
            .clone()
            .or_else(|| interview.meeting_link.clone());
        if let Some(err) = required_for_type(
            interview.interview_type,
            location.as_deref(),
            meeting_link.as_deref(),
        ) {
            return Err(BoardError::InvalidFields(vec![err]));
        }

        let result = sqlx::query(
            r#"
            UPDATE interview_invitations
            SET scheduled_at = ?, duration_minutes = ?, location = ?, meeting_link = ?,
                notes = COALESCE(?, notes), status = 'rescheduled', updated_at = ?
            WHERE id = ? AND cancelled_at IS NULL
              AND application_id IN (SELECT id FROM job_applications WHERE status = 'interview_scheduled')
            "#,
        )
        .bind(timestamp(request.scheduled_at))
        .bind(request.duration_minutes.unwrap_or(interview.duration_minutes))
        .bind(&location)
        .bind(&meeting_link)
        .bind(&request.notes)
        .bind(timestamp(Utc::now()))
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BoardError::invalid_transition("interview", "cancelled", "rescheduled"));
        }

        info!(interview_id = %id, "interview rescheduled");
        let updated = fetch_interview(&self.db, id).await?;

        self.notifier
            .notify_user(
                application.applicant_id,
                &NotificationEvent::InterviewScheduled {
                    interview_id: id,
                    application_id: interview.application_id,
                    job_title: application.job_title.clone(),
                    scheduled_at: updated.scheduled_at,
                    interview_type: updated.interview_type,
                    rescheduled: true,
                },
            )
            .await;

        Ok(updated)
    }

    /// Applicant accepts or declines
    pub async fn respond(
        &self,
        applicant: &User,
        id: InterviewId,
        response: InterviewResponse,
    ) -> BoardResult<InterviewInvitation> {
        let interview = fetch_interview(&self.db, id).await?;
        let application = fetch_application(&self.db, interview.application_id).await?;
        if application.applicant_id != applicant.id {
            return Err(BoardError::NotFound(format!("Interview {} not found", id)));
        }

        let next = match response {
            InterviewResponse::Accept => InterviewStatus::Accepted,
            InterviewResponse::Decline => InterviewStatus::Declined,
        };

        let from = if interview.is_cancelled() {
            "cancelled".to_string()
        } else {
            interview.status.to_string()
        };
        if interview.is_cancelled() || !interview.status.awaits_response() {
            return Err(BoardError::invalid_transition("interview", from, next));
        }
        require_scheduled(&application, next.as_str())?;

        let result = sqlx::query(
            r#"
            UPDATE interview_invitations
            SET status = ?, updated_at = ?
            WHERE id = ? AND status IN ('pending', 'rescheduled') AND cancelled_at IS NULL
              AND application_id IN (SELECT id FROM job_applications WHERE status = 'interview_scheduled')
            "#,
        )
        .bind(next.as_str())
        .bind(timestamp(Utc::now()))
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BoardError::invalid_transition("interview", from, next));
        }

        info!(interview_id = %id, response = %response, "interview response recorded");

        self.notifier
            .notify_user(
                application.job_owner_id,
                &NotificationEvent::InterviewResponded {
                    interview_id: id,
                    application_id: application.id,
                    job_title: application.job_title.clone(),
                    applicant_name: application.applicant_name.clone(),
                    accepted: next == InterviewStatus::Accepted,
                },
            )
            .await;

        fetch_interview(&self.db, id).await
    }

    /// Every invitation of an application, cancelled ones included, oldest first
    pub async fn list_for_application(
        &self,
        viewer: &User,
        application_id: ApplicationId,
    ) -> BoardResult<Vec<InterviewInvitation>> {
        let application = fetch_application(&self.db, application_id).await?;
        if !application.is_visible_to(viewer) {
            return Err(BoardError::NotFound(format!(
                "Application {} not found",
                application_id
            )));
        }

        let query = format!(
            "SELECT {} FROM interview_invitations WHERE application_id = ? ORDER BY created_at, id",
            INTERVIEW_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(application_id)
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(InterviewInvitation::from_row).collect()
    }

    pub async fn get(&self, viewer: &User, id: InterviewId) -> BoardResult<InterviewInvitation> {
        let interview = fetch_interview(&self.db, id).await?;
        let application = fetch_application(&self.db, interview.application_id).await?;
        if !application.is_visible_to(viewer) {
            return Err(BoardError::NotFound(format!("Interview {} not found", id)));
        }
        Ok(interview)
    }
}

fn require_owner(employer: &User, application: &JobApplication) -> BoardResult<()> {
    if application.job_owner_id != employer.id {
        return Err(BoardError::Authorization(
            "Only the job owner can manage interviews".to_string(),
        ));
    }
    Ok(())
}

/// Invitations only move while their application waits on the interview
fn require_scheduled(application: &JobApplication, to: &str) -> BoardResult<()> {
    if application.status != ApplicationStatus::InterviewScheduled {
        return Err(BoardError::invalid_transition(
            "interview",
            format!("application {}", application.status),
            to,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::UserRole;
    use crate::board::applications::{ApplicationDraft, StatusUpdate};
    use crate::test_support::TestContext;
    use chrono::Duration;

    fn details(interview_type: InterviewType) -> InterviewDetails {
        InterviewDetails {
            scheduled_at: Utc::now() + Duration::days(3),
            duration_minutes: 45,
            interview_type,
            location: None,
            meeting_link: None,
            notes: None,
        }
    }

    struct Fixture {
        t: TestContext,
        employer: User,
        seeker: User,
        application: JobApplication,
    }

    async fn fixture() -> Fixture {
        let t = TestContext::new().await;
        let employer = t.user(UserRole::Employer).await;
        let seeker = t.user(UserRole::JobSeeker).await;
        let job = t.approved_job(&employer, "Rust engineer").await;
        let application = t
            .ctx
            .applications
            .apply(&seeker, job.id, ApplicationDraft::default())
            .await
            .unwrap();
        Fixture {
            t,
            employer,
            seeker,
            application,
        }
    }

    async fn status_of(t: &TestContext, id: ApplicationId) -> (ApplicationStatus, Option<ApplicationStatus>) {
        let app = fetch_application(&t.ctx.db, id).await.unwrap();
        (app.status, app.previous_status)
    }

    #[test]
    fn test_type_specific_fields() {
        let now = Utc::now();
        let err = details(InterviewType::Video).check(now).unwrap_err();
        match err {
            BoardError::InvalidFields(fields) => assert_eq!(fields[0].field, "meeting_link"),
            other => panic!("unexpected error: {other}"),
        }

        let err = details(InterviewType::InPerson).check(now).unwrap_err();
        assert!(matches!(err, BoardError::InvalidFields(ref f) if f[0].field == "location"));

        assert!(details(InterviewType::Phone).check(now).is_ok());

        let mut past = details(InterviewType::Phone);
        past.scheduled_at = now - Duration::hours(1);
        assert!(past.check(now).is_err());
    }

    #[tokio::test]
    async fn test_schedule_then_cancel_restores_status() {
        let f = fixture().await;
        f.t.ctx
            .applications
            .update_status(
                &f.employer,
                f.application.id,
                StatusUpdate {
                    status: ApplicationStatus::UnderReview,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let interview = f
            .t
            .ctx
            .interviews
            .schedule(&f.employer, f.application.id, details(InterviewType::Phone))
            .await
            .unwrap();
        assert_eq!(interview.status, InterviewStatus::Pending);
        assert_eq!(
            status_of(&f.t, f.application.id).await,
            (
                ApplicationStatus::InterviewScheduled,
                Some(ApplicationStatus::UnderReview)
            )
        );

        // One live interview at a time
        assert!(matches!(
            f.t.ctx
                .interviews
                .schedule(&f.employer, f.application.id, details(InterviewType::Phone))
                .await,
            Err(BoardError::InvalidTransition { .. })
        ));

        let cancelled = f
            .t
            .ctx
            .interviews
            .cancel(&f.employer, interview.id, Some("Position filled".into()))
            .await
            .unwrap();
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.cancel_reason.as_deref(), Some("Position filled"));
        assert_eq!(
            status_of(&f.t, f.application.id).await,
            (ApplicationStatus::UnderReview, None)
        );

        assert!(matches!(
            f.t.ctx.interviews.cancel(&f.employer, interview.id, None).await,
            Err(BoardError::InvalidTransition { .. })
        ));

        // The cancelled invitation no longer blocks a new one
        f.t.ctx
            .interviews
            .schedule(&f.employer, f.application.id, details(InterviewType::Phone))
            .await
            .unwrap();
        let all = f
            .t
            .ctx
            .interviews
            .list_for_application(&f.seeker, f.application.id)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_from_pending_goes_back_to_pending() {
        let f = fixture().await;
        let interview = f
            .t
            .ctx
            .interviews
            .schedule(&f.employer, f.application.id, details(InterviewType::Phone))
            .await
            .unwrap();
        f.t.ctx
            .interviews
            .cancel(&f.employer, interview.id, None)
            .await
            .unwrap();
        assert_eq!(
            status_of(&f.t, f.application.id).await.0,
            ApplicationStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_respond_and_reschedule() {
        let f = fixture().await;
        let interview = f
            .t
            .ctx
            .interviews
            .schedule(&f.employer, f.application.id, details(InterviewType::Phone))
            .await
            .unwrap();

        // Only the applicant responds
        assert!(matches!(
            f.t.ctx
                .interviews
                .respond(&f.employer, interview.id, InterviewResponse::Accept)
                .await,
            Err(BoardError::NotFound(_))
        ));

        let accepted = f
            .t
            .ctx
            .interviews
            .respond(&f.seeker, interview.id, InterviewResponse::Accept)
            .await
            .unwrap();
        assert_eq!(accepted.status, InterviewStatus::Accepted);
        assert!(matches!(
            f.t.ctx
                .interviews
                .respond(&f.seeker, interview.id, InterviewResponse::Decline)
                .await,
            Err(BoardError::InvalidTransition { .. })
        ));

        let moved = f
            .t
            .ctx
            .interviews
            .reschedule(
                &f.employer,
                interview.id,
                RescheduleRequest {
                    scheduled_at: Utc::now() + Duration::days(5),
                    duration_minutes: None,
                    location: None,
                    meeting_link: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.status, InterviewStatus::Rescheduled);
        assert_eq!(moved.duration_minutes, 45);

        let declined = f
            .t
            .ctx
            .interviews
            .respond(&f.seeker, interview.id, InterviewResponse::Decline)
            .await
            .unwrap();
        assert_eq!(declined.status, InterviewStatus::Declined);

        let employer_notes: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND kind = 'interview_responded'",
        )
        .bind(f.employer.id)
        .fetch_one(&f.t.ctx.db)
        .await
        .unwrap();
        assert_eq!(employer_notes, 2);
    }

    #[tokio::test]
    async fn test_rejection_closes_live_interview() {
        let f = fixture().await;
        let interview = f
            .t
            .ctx
            .interviews
            .schedule(&f.employer, f.application.id, details(InterviewType::Phone))
            .await
            .unwrap();

        f.t.ctx
            .applications
            .update_status(
                &f.employer,
                f.application.id,
                StatusUpdate {
                    status: ApplicationStatus::Rejected,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let closed = fetch_interview(&f.t.ctx.db, interview.id).await.unwrap();
        assert!(closed.is_cancelled());

        assert!(matches!(
            f.t.ctx
                .interviews
                .reschedule(
                    &f.employer,
                    interview.id,
                    RescheduleRequest {
                        scheduled_at: Utc::now() + Duration::days(5),
                        duration_minutes: None,
                        location: None,
                        meeting_link: None,
                        notes: None,
                    },
                )
                .await,
            Err(BoardError::InvalidTransition { .. })
        ));
        assert!(matches!(
            f.t.ctx
                .interviews
                .respond(&f.seeker, interview.id, InterviewResponse::Accept)
                .await,
            Err(BoardError::InvalidTransition { .. })
        ));
        assert!(matches!(
            f.t.ctx.interviews.cancel(&f.employer, interview.id, None).await,
            Err(BoardError::InvalidTransition { .. })
        ));
        assert_eq!(
            status_of(&f.t, f.application.id).await.0,
            ApplicationStatus::Rejected
        );

        let rescheduled: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND kind = 'interview_scheduled'",
        )
        .bind(f.seeker.id)
        .fetch_one(&f.t.ctx.db)
        .await
        .unwrap();
        assert_eq!(rescheduled, 1);
    }

    #[tokio::test]
    async fn test_only_owner_schedules() {
        let f = fixture().await;
        let stranger = f.t.user(UserRole::Employer).await;
        assert!(matches!(
            f.t.ctx
                .interviews
                .schedule(&stranger, f.application.id, details(InterviewType::Phone))
                .await,
            Err(BoardError::Authorization(_))
        ));
        assert_eq!(
            status_of(&f.t, f.application.id).await.0,
            ApplicationStatus::Pending
        );
    }
}
