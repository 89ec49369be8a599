/// Job listings and their moderation state machine
///
/// A listing is created `pending`/`inactive`. Staff move it
/// `pending -> approved | rejected`; only an approved listing can be
/// `active`, which the `jobs` table also enforces with a CHECK constraint.
/// Moderator transitions use a conditional UPDATE and write their audit row
/// on the same transaction.
use crate::{
    account::{User, UserRole},
    admin::audit::{AuditAction, AuditActionType, AuditLog, NewAuditEntry},
    board::alerts::AlertManager,
    db::{parse_column, parse_optional_timestamp, parse_timestamp, timestamp},
    error::{BoardError, BoardResult, FieldError},
    ids::{EntityRef, JobId, UserId},
    metrics,
    notify::{NotificationEvent, Notifier},
    pagination::{Page, PageParams},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Executor, QueryBuilder, Row, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

text_enum! {
    pub enum JobType ("job type") {
        FullTime => "full_time",
        PartTime => "part_time",
        Contract => "contract",
        Internship => "internship",
        Temporary => "temporary",
    }
}

text_enum! {
    /// Owner-controlled listing status
    pub enum JobStatus ("job status") {
        Active => "active",
        Inactive => "inactive",
        Closed => "closed",
    }
}

text_enum! {
    /// Staff review status
    pub enum ModerationStatus ("moderation status") {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

text_enum! {
    pub enum JobSort ("sort order") {
        Newest => "newest",
        Oldest => "oldest",
        SalaryHigh => "salary_high",
        SalaryLow => "salary_low",
    }
}

impl Default for JobSort {
    fn default() -> Self {
        JobSort::Newest
    }
}

const JOB_COLUMNS: &str = "id, owner_id, title, description, location, job_type, remote, \
    salary_min, salary_max, deadline, status, moderation_status, moderation_reason, \
    moderated_by, moderated_at, created_at, updated_at, deleted_at";

/// A job listing
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub job_type: JobType,
    pub remote: bool,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub moderation_status: ModerationStatus,
    pub moderation_reason: Option<String>,
    pub moderated_by: Option<UserId>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Job {
    fn from_row(row: &SqliteRow) -> BoardResult<Self> {
        Ok(Job {
            id: JobId(row.try_get("id")?),
            owner_id: UserId(row.try_get("owner_id")?),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            location: row.try_get("location")?,
            job_type: parse_column(row, "job_type")?,
            remote: row.try_get("remote")?,
            salary_min: row.try_get("salary_min")?,
            salary_max: row.try_get("salary_max")?,
            deadline: parse_optional_timestamp(row, "deadline")?,
            status: parse_column(row, "status")?,
            moderation_status: parse_column(row, "moderation_status")?,
            moderation_reason: row.try_get("moderation_reason")?,
            moderated_by: row.try_get::<Option<i64>, _>("moderated_by")?.map(UserId),
            moderated_at: parse_optional_timestamp(row, "moderated_at")?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
            deleted_at: parse_optional_timestamp(row, "deleted_at")?,
        })
    }

    /// Approved, active, not deleted and not past its deadline
    pub fn is_publicly_visible(&self, now: DateTime<Utc>) -> bool {
        self.deleted_at.is_none()
            && self.moderation_status == ModerationStatus::Approved
            && self.status == JobStatus::Active
            && self.deadline.map(|d| d > now).unwrap_or(true)
    }

    /// `salary_max`, else `salary_min`
    pub fn best_salary(&self) -> Option<i64> {
        self.salary_max.or(self.salary_min)
    }
}

/// Employer-supplied listing content
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct JobDraft {
    #[validate(length(min = 3, max = 200, message = "must be between 3 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 20, max = 20000, message = "must be at least 20 characters"))]
    pub description: String,
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub location: String,
    pub job_type: JobType,
    #[serde(default)]
    pub remote: bool,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub salary_min: Option<i64>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub salary_max: Option<i64>,
    pub deadline: Option<DateTime<Utc>>,
}

impl JobDraft {
    /// Field checks plus the cross-field salary and deadline rules
    pub fn check(&self, now: DateTime<Utc>) -> BoardResult<()> {
        let mut fields = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => match BoardError::from(errors) {
                BoardError::InvalidFields(fields) => fields,
                other => return Err(other),
            },
        };

        if self.title.trim().len() < 3 {
            fields.push(FieldError::new("title", "must not be blank"));
        }
        if let (Some(min), Some(max)) = (self.salary_min, self.salary_max) {
            if min > max {
                fields.push(FieldError::new("salary_min", "must not exceed salary_max"));
            }
        }
        if let Some(deadline) = self.deadline {
            if deadline <= now {
                fields.push(FieldError::new("deadline", "must be in the future"));
            }
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(BoardError::InvalidFields(fields))
        }
    }
}

/// Public search parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSearch {
    /// Substring of title or description
    pub q: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub remote: Option<bool>,
    pub min_salary: Option<i64>,
    #[serde(default)]
    pub sort: JobSort,
}

/// Filters for the owner's list and the moderation queue
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListFilter {
    pub status: Option<JobStatus>,
    pub moderation_status: Option<ModerationStatus>,
    pub search: Option<String>,
}

/// Job listing service
#[derive(Clone)]
pub struct JobManager {
    db: SqlitePool,
    notifier: Arc<Notifier>,
    alerts: AlertManager,
}

impl JobManager {
    pub fn new(db: SqlitePool, notifier: Arc<Notifier>, alerts: AlertManager) -> Self {
        Self {
            db,
            notifier,
            alerts,
        }
    }

    /// Create a listing for review
    pub async fn create_job(&self, owner: &User, draft: JobDraft) -> BoardResult<Job> {
        if owner.role != UserRole::Employer {
            return Err(BoardError::Authorization(
                "Only employers can post jobs".to_string(),
            ));
        }
        let now = Utc::now();
        draft.check(now)?;

        let result = sqlx::query(
            r#"
            INSERT INTO jobs
            (owner_id, title, description, location, job_type, remote, salary_min, salary_max,
             deadline, status, moderation_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'inactive', 'pending', ?, ?)
            "#,
        )
        .bind(owner.id)
        .bind(draft.title.trim())
        .bind(draft.description.trim())
        .bind(draft.location.trim())
        .bind(draft.job_type.as_str())
        .bind(draft.remote)
        .bind(draft.salary_min)
        .bind(draft.salary_max)
        .bind(draft.deadline.map(timestamp))
        .bind(timestamp(now))
        .bind(timestamp(now))
        .execute(&self.db)
        .await?;

        let job_id = JobId(result.last_insert_rowid());
        info!(job_id = %job_id, owner_id = %owner.id, "job submitted for review");
        self.get_job(job_id).await
    }

    /// Edit listing content
    ///
    /// Editing a rejected listing resubmits it for review. Approved listings
    /// keep their approval.
    pub async fn update_job(&self, owner: &User, id: JobId, draft: JobDraft) -> BoardResult<Job> {
        let job = self.owned_job(owner, id).await?;
        if job.status == JobStatus::Closed {
            return Err(BoardError::invalid_transition("job", job.status, "edited"));
        }
        let now = Utc::now();
        draft.check(now)?;

        let resubmit = job.moderation_status == ModerationStatus::Rejected;
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET title = ?, description = ?, location = ?, job_type = ?, remote = ?,
                salary_min = ?, salary_max = ?, deadline = ?, updated_at = ?,
                moderation_status = CASE WHEN ? THEN 'pending' ELSE moderation_status END,
                moderation_reason = CASE WHEN ? THEN NULL ELSE moderation_reason END
            WHERE id = ? AND moderation_status = ? AND deleted_at IS NULL
            "#,
        )
        .bind(draft.title.trim())
        .bind(draft.description.trim())
        .bind(draft.location.trim())
        .bind(draft.job_type.as_str())
        .bind(draft.remote)
        .bind(draft.salary_min)
        .bind(draft.salary_max)
        .bind(draft.deadline.map(timestamp))
        .bind(timestamp(now))
        .bind(resubmit)
        .bind(resubmit)
        .bind(id)
        .bind(job.moderation_status.as_str())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.stale_transition(id, "edited").await);
        }
        if resubmit {
            info!(job_id = %id, "rejected job resubmitted for review");
        }

        self.get_job(id).await
    }

    /// Owner status change: `active` requires approval and `closed` is final
    pub async fn set_status(&self, owner: &User, id: JobId, status: JobStatus) -> BoardResult<Job> {
        let job = self.owned_job(owner, id).await?;
        if job.status == JobStatus::Closed && status != JobStatus::Closed {
            return Err(BoardError::invalid_transition("job", job.status, status));
        }
        if status == JobStatus::Active && job.moderation_status != ModerationStatus::Approved {
            return Err(BoardError::invalid_transition(
                "job",
                job.moderation_status,
                status,
            ));
        }

        let result = sqlx::query(
            r#"
            UPDATE jobs SET status = ?, updated_at = ?
            WHERE id = ? AND status = ? AND moderation_status = ? AND deleted_at IS NULL
            "#,
        )
        .bind(status.as_str())
        .bind(timestamp(Utc::now()))
        .bind(id)
        .bind(job.status.as_str())
        .bind(job.moderation_status.as_str())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.stale_transition(id, status).await);
        }

        info!(job_id = %id, from = %job.status, to = %status, "job status changed");
        self.get_job(id).await
    }

    /// Owner soft delete
    pub async fn delete_job(&self, owner: &User, id: JobId) -> BoardResult<()> {
        self.owned_job(owner, id).await?;

        sqlx::query("UPDATE jobs SET deleted_at = ?, status = 'closed', updated_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(timestamp(Utc::now()))
            .bind(timestamp(Utc::now()))
            .bind(id)
            .execute(&self.db)
            .await?;

        info!(job_id = %id, "job deleted by owner");
        Ok(())
    }

    pub async fn list_own_jobs(
        &self,
        owner: &User,
        filter: &JobListFilter,
        page: PageParams,
    ) -> BoardResult<Page<Job>> {
        self.list_jobs(Some(owner.id), filter, page).await
    }

    /// Staff review queue
    pub async fn moderation_queue(
        &self,
        filter: &JobListFilter,
        page: PageParams,
    ) -> BoardResult<Page<Job>> {
        self.list_jobs(None, filter, page).await
    }

    async fn list_jobs(
        &self,
        owner: Option<UserId>,
        filter: &JobListFilter,
        page: PageParams,
    ) -> BoardResult<Page<Job>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM jobs");
        push_list_filters(&mut count, owner, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM jobs", JOB_COLUMNS));
        push_list_filters(&mut select, owner, filter);
        // Review queue reads oldest first, owners see newest first
        select.push(if owner.is_none() {
            " ORDER BY created_at ASC, id ASC"
        } else {
            " ORDER BY created_at DESC, id DESC"
        });
        select
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select.build().fetch_all(&self.db).await?;
        let jobs = rows.iter().map(Job::from_row).collect::<BoardResult<Vec<_>>>()?;
        Ok(Page::new(jobs, page, total))
    }

    /// Public search over visible listings
    pub async fn search(&self, search: &JobSearch, page: PageParams) -> BoardResult<Page<Job>> {
        let now = timestamp(Utc::now());

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM jobs");
        push_search_filters(&mut count, search, &now);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM jobs", JOB_COLUMNS));
        push_search_filters(&mut select, search, &now);
        select.push(match search.sort {
            JobSort::Newest => " ORDER BY created_at DESC, id DESC",
            JobSort::Oldest => " ORDER BY created_at ASC, id ASC",
            JobSort::SalaryHigh => {
                " ORDER BY COALESCE(salary_max, salary_min) IS NULL, COALESCE(salary_max, salary_min) DESC, id DESC"
            }
            JobSort::SalaryLow => {
                " ORDER BY COALESCE(salary_min, salary_max) IS NULL, COALESCE(salary_min, salary_max) ASC, id DESC"
            }
        });
        select
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select.build().fetch_all(&self.db).await?;
        let jobs = rows.iter().map(Job::from_row).collect::<BoardResult<Vec<_>>>()?;
        Ok(Page::new(jobs, page, total))
    }

    /// A listing as seen by anonymous visitors
    pub async fn get_public_job(&self, id: JobId) -> BoardResult<Job> {
        let job = self.get_job(id).await?;
        if !job.is_publicly_visible(Utc::now()) {
            return Err(BoardError::NotFound(format!("Job {} not found", id)));
        }
        Ok(job)
    }

    /// Public view, widened for the owner and staff
    pub async fn get_job_for(&self, viewer: Option<&User>, id: JobId) -> BoardResult<Job> {
        let job = self.get_job(id).await?;
        let privileged = viewer
            .map(|user| user.is_staff() || user.id == job.owner_id)
            .unwrap_or(false);
        if privileged || job.is_publicly_visible(Utc::now()) {
            Ok(job)
        } else {
            Err(BoardError::NotFound(format!("Job {} not found", id)))
        }
    }

    /// Load a non-deleted listing regardless of visibility
    pub async fn get_job(&self, id: JobId) -> BoardResult<Job> {
        fetch_job(&self.db, id).await
    }

    async fn owned_job(&self, owner: &User, id: JobId) -> BoardResult<Job> {
        let job = self.get_job(id).await?;
        if job.owner_id != owner.id {
            return Err(BoardError::Authorization(
                "Only the job owner can do this".to_string(),
            ));
        }
        Ok(job)
    }

    /// Error for a conditional UPDATE that matched nothing
    async fn stale_transition(&self, id: JobId, to: impl std::fmt::Display) -> BoardError {
        match self.get_job(id).await {
            Ok(job) => BoardError::invalid_transition(
                "job",
                format!("{}/{}", job.moderation_status, job.status),
                to,
            ),
            Err(e) => e,
        }
    }

    /// `pending -> approved`; the listing goes live unless it was closed
    ///
    /// Notifies the owner and fans out matching job alerts after commit.
    pub async fn approve(&self, moderator: &User, id: JobId) -> BoardResult<Job> {
        require_staff(moderator)?;
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET moderation_status = 'approved',
                status = CASE WHEN status = 'closed' THEN 'closed' ELSE 'active' END,
                moderation_reason = NULL, moderated_by = ?, moderated_at = ?, updated_at = ?
            WHERE id = ? AND moderation_status = 'pending' AND deleted_at IS NULL
            "#,
        )
        .bind(moderator.id)
        .bind(timestamp(now))
        .bind(timestamp(now))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.review_conflict(id, ModerationStatus::Approved).await);
        }

        let entry = NewAuditEntry::new(
            moderator.id,
            AuditActionType::JobReview,
            AuditAction::Approve,
            EntityRef::Job(id),
        )
        .details(serde_json::json!({ "from": "pending", "to": "approved" }));
        AuditLog::record(&mut tx, &entry).await?;
        tx.commit().await?;

        metrics::record_moderation_action(AuditActionType::JobReview, AuditAction::Approve);
        info!(job_id = %id, moderator_id = %moderator.id, "job approved");

        let job = self.get_job(id).await?;
        self.notifier
            .notify_user(
                job.owner_id,
                &NotificationEvent::JobApproved {
                    job_id: job.id,
                    title: job.title.clone(),
                },
            )
            .await;

        if job.status != JobStatus::Active {
            return Ok(job);
        }
        match self.alerts.fan_out(&job).await {
            Ok(matched) => info!(job_id = %id, matched, "job alerts fanned out"),
            Err(e) => warn!(job_id = %id, error = %e, "job alert fan-out failed"),
        }

        Ok(job)
    }

    /// `pending -> rejected` with a mandatory reason
    pub async fn reject(&self, moderator: &User, id: JobId, reason: &str) -> BoardResult<Job> {
        require_staff(moderator)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(BoardError::invalid_field("reason", "must not be empty"));
        }
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET moderation_status = 'rejected', moderation_reason = ?,
                moderated_by = ?, moderated_at = ?, updated_at = ?
            WHERE id = ? AND moderation_status = 'pending' AND deleted_at IS NULL
            "#,
        )
        .bind(reason)
        .bind(moderator.id)
        .bind(timestamp(now))
        .bind(timestamp(now))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.review_conflict(id, ModerationStatus::Rejected).await);
        }

        let entry = NewAuditEntry::new(
            moderator.id,
            AuditActionType::JobReview,
            AuditAction::Reject,
            EntityRef::Job(id),
        )
        .reason(reason)
        .details(serde_json::json!({ "from": "pending", "to": "rejected" }));
        AuditLog::record(&mut tx, &entry).await?;
        tx.commit().await?;

        metrics::record_moderation_action(AuditActionType::JobReview, AuditAction::Reject);
        info!(job_id = %id, moderator_id = %moderator.id, "job rejected");

        let job = self.get_job(id).await?;
        self.notifier
            .notify_user(
                job.owner_id,
                &NotificationEvent::JobRejected {
                    job_id: job.id,
                    title: job.title.clone(),
                    reason: reason.to_string(),
                },
            )
            .await;

        Ok(job)
    }

    /// Manual re-edit of the review outcome from any state
    ///
    /// Leaving `approved` takes an active listing offline. No notification
    /// or alert fan-out.
    pub async fn override_moderation(
        &self,
        moderator: &User,
        id: JobId,
        moderation_status: ModerationStatus,
        reason: &str,
    ) -> BoardResult<Job> {
        require_staff(moderator)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(BoardError::invalid_field("reason", "must not be empty"));
        }
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let job = fetch_job(&mut *tx, id).await?;
        let status = if moderation_status != ModerationStatus::Approved
            && job.status == JobStatus::Active
        {
            JobStatus::Inactive
        } else {
            job.status
        };

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET moderation_status = ?, status = ?, moderation_reason = ?,
                moderated_by = ?, moderated_at = ?, updated_at = ?
            WHERE id = ? AND moderation_status = ? AND status = ? AND deleted_at IS NULL
            "#,
        )
        .bind(moderation_status.as_str())
        .bind(status.as_str())
        .bind(reason)
        .bind(moderator.id)
        .bind(timestamp(now))
        .bind(timestamp(now))
        .bind(id)
        .bind(job.moderation_status.as_str())
        .bind(job.status.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.review_conflict(id, moderation_status).await);
        }

        let entry = NewAuditEntry::new(
            moderator.id,
            AuditActionType::JobReview,
            AuditAction::Override,
            EntityRef::Job(id),
        )
        .reason(reason)
        .details(serde_json::json!({
            "from": job.moderation_status.as_str(),
            "to": moderation_status.as_str(),
            "status_from": job.status.as_str(),
            "status_to": status.as_str(),
        }));
        AuditLog::record(&mut tx, &entry).await?;
        tx.commit().await?;

        metrics::record_moderation_action(AuditActionType::JobReview, AuditAction::Override);
        info!(
            job_id = %id,
            moderator_id = %moderator.id,
            from = %job.moderation_status,
            to = %moderation_status,
            "job moderation overridden"
        );

        self.get_job(id).await
    }

    /// Staff soft delete
    pub async fn moderator_delete(&self, moderator: &User, id: JobId, reason: &str) -> BoardResult<()> {
        require_staff(moderator)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(BoardError::invalid_field("reason", "must not be empty"));
        }
        let now = timestamp(Utc::now());

        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            "UPDATE jobs SET deleted_at = ?, status = 'closed', updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(BoardError::NotFound(format!("Job {} not found", id)));
        }

        let entry = NewAuditEntry::new(
            moderator.id,
            AuditActionType::JobReview,
            AuditAction::Delete,
            EntityRef::Job(id),
        )
        .reason(reason);
        AuditLog::record(&mut tx, &entry).await?;
        tx.commit().await?;

        metrics::record_moderation_action(AuditActionType::JobReview, AuditAction::Delete);
        info!(job_id = %id, moderator_id = %moderator.id, "job deleted by moderator");
        Ok(())
    }

    async fn review_conflict(&self, id: JobId, to: ModerationStatus) -> BoardError {
        match self.get_job(id).await {
            Ok(job) => BoardError::invalid_transition("job", job.moderation_status, to),
            Err(e) => e,
        }
    }
}

fn require_staff(user: &User) -> BoardResult<()> {
    if !user.is_staff() {
        return Err(BoardError::Authorization("Moderator role required".to_string()));
    }
    Ok(())
}

pub(crate) async fn fetch_job<'e, E>(executor: E, id: JobId) -> BoardResult<Job>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!(
        "SELECT {} FROM jobs WHERE id = ? AND deleted_at IS NULL",
        JOB_COLUMNS
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| BoardError::NotFound(format!("Job {} not found", id)))?;

    Job::from_row(&row)
}

fn push_list_filters<'a>(
    qb: &mut QueryBuilder<'a, Sqlite>,
    owner: Option<UserId>,
    filter: &'a JobListFilter,
) {
    qb.push(" WHERE deleted_at IS NULL");
    if let Some(owner) = owner {
        qb.push(" AND owner_id = ").push_bind(owner);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(moderation_status) = filter.moderation_status {
        qb.push(" AND moderation_status = ")
            .push_bind(moderation_status.as_str());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND lower(title) LIKE ")
            .push_bind(format!("%{}%", search.to_lowercase()));
    }
}

fn push_search_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, search: &'a JobSearch, now: &'a str) {
    qb.push(" WHERE deleted_at IS NULL AND moderation_status = 'approved' AND status = 'active'");
    qb.push(" AND (deadline IS NULL OR deadline > ").push_bind(now).push(")");

    if let Some(q) = search.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", q.to_lowercase());
        qb.push(" AND (lower(title) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(description) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(location) = search.location.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND lower(location) LIKE ")
            .push_bind(format!("%{}%", location.to_lowercase()));
    }
    if let Some(job_type) = search.job_type {
        qb.push(" AND job_type = ").push_bind(job_type.as_str());
    }
    if let Some(remote) = search.remote {
        qb.push(" AND remote = ").push_bind(remote);
    }
    if let Some(min_salary) = search.min_salary {
        qb.push(" AND COALESCE(salary_max, salary_min) >= ")
            .push_bind(min_salary);
    }
}
