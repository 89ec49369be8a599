/// Job applications
///
/// One application per (job, applicant), guaranteed by a UNIQUE constraint.
/// Status changes follow [`ApplicationStatus::can_transition_to`]; moving
/// into `interview_scheduled` only happens through interview scheduling.
use crate::{
    account::{User, UserRole},
    board::jobs::fetch_job,
    db::{parse_column, parse_optional_column, parse_timestamp, timestamp},
    error::{is_unique_violation, BoardError, BoardResult},
    ids::{ApplicationId, JobId, UserId},
    metrics,
    notify::{NotificationEvent, Notifier},
    pagination::{Page, PageParams},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

text_enum! {
    pub enum ApplicationStatus ("application status") {
        Pending => "pending",
        UnderReview => "under_review",
        InterviewScheduled => "interview_scheduled",
        Hired => "hired",
        Rejected => "rejected",
    }
}

impl ApplicationStatus {
    /// The application transition table
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;

        matches!(
            (self, next),
            (Pending, UnderReview)
                | (Pending, InterviewScheduled)
                | (Pending, Rejected)
                | (UnderReview, InterviewScheduled)
                | (UnderReview, Rejected)
                | (InterviewScheduled, Hired)
                | (InterviewScheduled, Rejected)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Hired | ApplicationStatus::Rejected)
    }
}

pub(crate) const APPLICATION_SELECT: &str = r#"
    SELECT a.id, a.job_id, a.applicant_id, a.cover_letter, a.resume_path, a.status,
           a.previous_status, a.employer_notes, a.created_at, a.updated_at,
           j.title AS job_title, j.owner_id AS job_owner_id, u.name AS applicant_name
    FROM job_applications a
    JOIN jobs j ON j.id = a.job_id
    JOIN users u ON u.id = a.applicant_id
"#;

/// An application together with the job and applicant names it is shown with
#[derive(Debug, Clone, Serialize)]
pub struct JobApplication {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub applicant_id: UserId,
    pub cover_letter: Option<String>,
    pub resume_path: Option<String>,
    pub status: ApplicationStatus,
    pub previous_status: Option<ApplicationStatus>,
    pub employer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub job_title: String,
    pub job_owner_id: UserId,
    pub applicant_name: String,
}

impl JobApplication {
    fn from_row(row: &SqliteRow) -> BoardResult<Self> {
        Ok(JobApplication {
            id: ApplicationId(row.try_get("id")?),
            job_id: JobId(row.try_get("job_id")?),
            applicant_id: UserId(row.try_get("applicant_id")?),
            cover_letter: row.try_get("cover_letter")?,
            resume_path: row.try_get("resume_path")?,
            status: parse_column(row, "status")?,
            previous_status: parse_optional_column(row, "previous_status")?,
            employer_notes: row.try_get("employer_notes")?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
            job_title: row.try_get("job_title")?,
            job_owner_id: UserId(row.try_get("job_owner_id")?),
            applicant_name: row.try_get("applicant_name")?,
        })
    }

    /// Applicant, job owner or staff
    pub fn is_visible_to(&self, viewer: &User) -> bool {
        viewer.id == self.applicant_id || viewer.id == self.job_owner_id || viewer.is_staff()
    }
}

/// Apply input
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ApplicationDraft {
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub cover_letter: Option<String>,
    /// Storage key of an uploaded resume; defaults to the profile resume
    pub resume_path: Option<String>,
}

/// Employer status change input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
}

pub(crate) async fn fetch_application<'e, E>(executor: E, id: ApplicationId) -> BoardResult<JobApplication>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("{} WHERE a.id = ?", APPLICATION_SELECT);
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| BoardError::NotFound(format!("Application {} not found", id)))?;

    JobApplication::from_row(&row)
}

/// Application service
#[derive(Clone)]
pub struct ApplicationManager {
    db: SqlitePool,
    notifier: Arc<Notifier>,
}

impl ApplicationManager {
    pub fn new(db: SqlitePool, notifier: Arc<Notifier>) -> Self {
        Self { db, notifier }
    }

    /// Apply to a publicly visible job
    pub async fn apply(
        &self,
        applicant: &User,
        job_id: JobId,
        draft: ApplicationDraft,
    ) -> BoardResult<JobApplication> {
        if applicant.role != UserRole::JobSeeker {
            return Err(BoardError::Authorization(
                "Only job seekers can apply".to_string(),
            ));
        }
        draft.validate()?;

        let job = fetch_job(&self.db, job_id).await?;
        if !job.is_publicly_visible(Utc::now()) {
            return Err(BoardError::NotFound(format!("Job {} not found", job_id)));
        }

        // Only for a friendlier message; the UNIQUE constraint is the guarantee
        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM job_applications WHERE job_id = ? AND applicant_id = ?",
        )
        .bind(job_id)
        .bind(applicant.id)
        .fetch_optional(&self.db)
        .await?;
        if existing.is_some() {
            return Err(already_applied());
        }

        let resume_path = draft
            .resume_path
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| applicant.resume_path.clone());
        let now = timestamp(Utc::now());

        let result = sqlx::query(
            r#"
            INSERT INTO job_applications
            (job_id, applicant_id, cover_letter, resume_path, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(job_id)
        .bind(applicant.id)
        .bind(&draft.cover_letter)
        .bind(&resume_path)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                already_applied()
            } else {
                BoardError::Database(e)
            }
        })?;

        let application = fetch_application(&self.db, ApplicationId(result.last_insert_rowid())).await?;
        metrics::record_application("submitted");
        info!(application_id = %application.id, job_id = %job_id, applicant_id = %applicant.id, "application submitted");

        self.notifier
            .notify_user(
                job.owner_id,
                &NotificationEvent::ApplicationReceived {
                    application_id: application.id,
                    job_id,
                    job_title: job.title.clone(),
                    applicant_name: applicant.name.clone(),
                },
            )
            .await;

        Ok(application)
    }

    /// Applicant withdraws a still-pending application
    pub async fn withdraw(&self, applicant: &User, id: ApplicationId) -> BoardResult<()> {
        let application = fetch_application(&self.db, id).await?;
        if application.applicant_id != applicant.id {
            return Err(BoardError::NotFound(format!("Application {} not found", id)));
        }

        let result = sqlx::query("DELETE FROM job_applications WHERE id = ? AND status = 'pending'")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BoardError::invalid_transition(
                "application",
                application.status,
                "withdrawn",
            ));
        }

        metrics::record_application("withdrawn");
        info!(application_id = %id, "application withdrawn");
        Ok(())
    }

    /// Job owner moves an application along the transition table
    pub async fn update_status(
        &self,
        employer: &User,
        id: ApplicationId,
        update: StatusUpdate,
    ) -> BoardResult<JobApplication> {
        update.validate()?;
        let application = fetch_application(&self.db, id).await?;
        if application.job_owner_id != employer.id {
            return Err(BoardError::Authorization(
                "Only the job owner can change application status".to_string(),
            ));
        }
        if update.status == ApplicationStatus::InterviewScheduled {
            return Err(BoardError::invalid_field(
                "status",
                "schedule an interview to move an application to interview_scheduled",
            ));
        }
        if !application.status.can_transition_to(update.status) {
            return Err(BoardError::invalid_transition(
                "application",
                application.status,
                update.status,
            ));
        }

        let now = timestamp(Utc::now());
        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE job_applications
            SET status = ?, employer_notes = COALESCE(?, employer_notes), updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(update.status.as_str())
        .bind(&update.notes)
        .bind(&now)
        .bind(id)
        .bind(application.status.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            let current = fetch_application(&self.db, id).await?;
            return Err(BoardError::invalid_transition(
                "application",
                current.status,
                update.status,
            ));
        }

        // A finished application keeps no live interview
        if update.status.is_terminal() {
            sqlx::query(
                r#"
                UPDATE interview_invitations
                SET cancelled_at = ?, cancel_reason = COALESCE(cancel_reason, ?), updated_at = ?
                WHERE application_id = ? AND cancelled_at IS NULL
                "#,
            )
            .bind(&now)
            .bind(format!("application {}", update.status))
            .bind(&now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        metrics::record_application(update.status.as_str());
        info!(
            application_id = %id,
            from = %application.status,
            to = %update.status,
            "application status changed"
        );

        self.notifier
            .notify_user(
                application.applicant_id,
                &NotificationEvent::ApplicationStatusChanged {
                    application_id: id,
                    job_id: application.job_id,
                    job_title: application.job_title.clone(),
                    status: update.status,
                },
            )
            .await;

        fetch_application(&self.db, id).await
    }

    /// One application, for a party to it
    pub async fn get(&self, viewer: &User, id: ApplicationId) -> BoardResult<JobApplication> {
        let application = fetch_application(&self.db, id).await?;
        if !application.is_visible_to(viewer) {
            return Err(BoardError::NotFound(format!("Application {} not found", id)));
        }
        Ok(application)
    }

    pub async fn list_for_applicant(
        &self,
        applicant: &User,
        filter: ApplicationFilter,
        page: PageParams,
    ) -> BoardResult<Page<JobApplication>> {
        self.list("a.applicant_id", applicant.id.0, filter, page).await
    }

    /// Applications to one of the employer's jobs
    pub async fn list_for_job(
        &self,
        owner: &User,
        job_id: JobId,
        filter: ApplicationFilter,
        page: PageParams,
    ) -> BoardResult<Page<JobApplication>> {
        let job = fetch_job(&self.db, job_id).await?;
        if job.owner_id != owner.id {
            return Err(BoardError::Authorization(
                "Only the job owner can list its applications".to_string(),
            ));
        }
        self.list("a.job_id", job_id.0, filter, page).await
    }

    async fn list(
        &self,
        column: &'static str,
        value: i64,
        filter: ApplicationFilter,
        page: PageParams,
    ) -> BoardResult<Page<JobApplication>> {
        let status_clause = if filter.status.is_some() {
            " AND a.status = ?"
        } else {
            ""
        };

        let count_query = format!(
            "SELECT COUNT(*) FROM job_applications a WHERE {} = ?{}",
            column, status_clause
        );
        let mut count = sqlx::query_scalar(&count_query).bind(value);
        if let Some(status) = filter.status {
            count = count.bind(status.as_str());
        }
        let total: i64 = count.fetch_one(&self.db).await?;

        let select_query = format!(
            "{} WHERE {} = ?{} ORDER BY a.created_at DESC, a.id DESC LIMIT ? OFFSET ?",
            APPLICATION_SELECT, column, status_clause
        );
        let mut select = sqlx::query(&select_query).bind(value);
        if let Some(status) = filter.status {
            select = select.bind(status.as_str());
        }
        let rows = select
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.db)
            .await?;

        let data = rows
            .iter()
            .map(JobApplication::from_row)
            .collect::<BoardResult<Vec<_>>>()?;
        Ok(Page::new(data, page, total))
    }
}

fn already_applied() -> BoardError {
    BoardError::Conflict("You have already applied to this job".to_string())
}
