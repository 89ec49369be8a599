/// User reports and the moderation dashboard
///
/// Any authenticated user can report a job, a user or a message. Staff
/// resolve or dismiss pending reports; each review is audited.
use crate::{
    account::User,
    admin::audit::{AuditAction, AuditActionType, AuditLog, NewAuditEntry},
    db::{parse_column, parse_optional_timestamp, parse_timestamp, timestamp},
    error::{is_unique_violation, BoardError, BoardResult},
    ids::{EntityRef, ReportId, UserId},
    metrics,
    pagination::{Page, PageParams},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::BTreeMap;
use tracing::info;
use validator::Validate;

text_enum! {
    pub enum ReportCategory ("report category") {
        Spam => "spam",
        Fraud => "fraud",
        Inappropriate => "inappropriate",
        Harassment => "harassment",
        Misleading => "misleading",
        Other => "other",
    }
}

text_enum! {
    pub enum ReportStatus ("report status") {
        Pending => "pending",
        Resolved => "resolved",
        Dismissed => "dismissed",
    }
}

const REPORT_COLUMNS: &str = "id, reporter_id, target_kind, target_id, category, details, status, \
    reviewed_by, reviewed_at, resolution_note, created_at";

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: ReportId,
    pub reporter_id: UserId,
    pub target: EntityRef,
    pub category: ReportCategory,
    pub details: Option<String>,
    pub status: ReportStatus,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    fn from_row(row: &SqliteRow) -> BoardResult<Self> {
        let target_kind: String = row.try_get("target_kind")?;
        let reviewed_by: Option<i64> = row.try_get("reviewed_by")?;

        Ok(Report {
            id: ReportId(row.try_get("id")?),
            reporter_id: UserId(row.try_get("reporter_id")?),
            target: EntityRef::from_parts(&target_kind, row.try_get("target_id")?)?,
            category: parse_column(row, "category")?,
            details: row.try_get("details")?,
            status: parse_column(row, "status")?,
            reviewed_by: reviewed_by.map(UserId),
            reviewed_at: parse_optional_timestamp(row, "reviewed_at")?,
            resolution_note: row.try_get("resolution_note")?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }
}

/// Submission body: `{"target": {"kind": "job", "id": 5}, "category": "spam"}`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewReport {
    pub target: EntityRef,
    pub category: ReportCategory,
    #[validate(length(max = 2000))]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub target_kind: Option<String>,
}

/// Counters for the staff dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub pending_jobs: i64,
    pub active_jobs: i64,
    pub pending_reports: i64,
    pub users_by_status: BTreeMap<String, i64>,
    pub users_by_role: BTreeMap<String, i64>,
    pub applications_by_status: BTreeMap<String, i64>,
    pub applications_total: i64,
}

#[derive(Clone)]
pub struct ReportManager {
    db: SqlitePool,
}

impl ReportManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn submit(&self, reporter: &User, input: NewReport) -> BoardResult<Report> {
        input.validate()?;
        self.check_target(reporter, input.target).await?;

        let details = input
            .details
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let result = sqlx::query(
            r#"
            INSERT INTO reports (reporter_id, target_kind, target_id, category, details, status, created_at)
            VALUES (?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(reporter.id)
        .bind(input.target.kind())
        .bind(input.target.raw_id())
        .bind(input.category.as_str())
        .bind(&details)
        .bind(timestamp(Utc::now()))
        .execute(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BoardError::Conflict("You already have an open report for this".to_string())
            } else {
                BoardError::Database(e)
            }
        })?;

        let id = ReportId(result.last_insert_rowid());
        metrics::record_report_submitted(input.target.kind(), input.category.as_str());
        info!(report_id = %id, reporter_id = %reporter.id, target = %input.target, "report submitted");

        self.get(id).await
    }

    /// The target must exist; a message can only be reported by a party to it
    async fn check_target(&self, reporter: &User, target: EntityRef) -> BoardResult<()> {
        let exists: Option<i64> = match target {
            EntityRef::Job(id) => {
                sqlx::query_scalar("SELECT id FROM jobs WHERE id = ? AND deleted_at IS NULL")
                    .bind(id)
                    .fetch_optional(&self.db)
                    .await?
            }
            EntityRef::User(id) => {
                if id == reporter.id {
                    return Err(BoardError::Validation("Cannot report yourself".to_string()));
                }
                sqlx::query_scalar("SELECT id FROM users WHERE id = ? AND deleted_at IS NULL")
                    .bind(id)
                    .fetch_optional(&self.db)
                    .await?
            }
            EntityRef::Message(id) => {
                sqlx::query_scalar(
                    "SELECT id FROM messages WHERE id = ? AND (sender_id = ? OR receiver_id = ?)",
                )
                .bind(id)
                .bind(reporter.id)
                .bind(reporter.id)
                .fetch_optional(&self.db)
                .await?
            }
            other => {
                return Err(BoardError::Validation(format!(
                    "Cannot report a {}",
                    other.kind()
                )))
            }
        };

        if exists.is_none() {
            return Err(BoardError::NotFound(format!("{} not found", target)));
        }
        Ok(())
    }

    pub async fn resolve(&self, moderator: &User, id: ReportId, note: Option<String>) -> BoardResult<Report> {
        self.review(moderator, id, ReportStatus::Resolved, note).await
    }

    pub async fn dismiss(&self, moderator: &User, id: ReportId, note: Option<String>) -> BoardResult<Report> {
        self.review(moderator, id, ReportStatus::Dismissed, note).await
    }

    async fn review(
        &self,
        moderator: &User,
        id: ReportId,
        outcome: ReportStatus,
        note: Option<String>,
    ) -> BoardResult<Report> {
        if !moderator.is_staff() {
            return Err(BoardError::Authorization("Moderator role required".to_string()));
        }
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let action = match outcome {
            ReportStatus::Dismissed => AuditAction::Dismiss,
            _ => AuditAction::Resolve,
        };
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE reports SET status = ?, reviewed_by = ?, reviewed_at = ?, resolution_note = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(outcome.as_str())
        .bind(moderator.id)
        .bind(timestamp(now))
        .bind(&note)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            let current = self.get(id).await?;
            return Err(BoardError::invalid_transition("report", current.status, outcome));
        }

        let mut entry = NewAuditEntry::new(
            moderator.id,
            AuditActionType::ReportReview,
            action,
            EntityRef::Report(id),
        );
        if let Some(note) = &note {
            entry = entry.reason(note.clone());
        }
        AuditLog::record(&mut tx, &entry).await?;
        tx.commit().await?;

        metrics::record_moderation_action(AuditActionType::ReportReview, action);
        info!(report_id = %id, moderator_id = %moderator.id, outcome = %outcome, "report reviewed");

        self.get(id).await
    }

    /// Oldest first, so the queue is worked in arrival order
    pub async fn list(&self, filter: &ReportFilter, page: PageParams) -> BoardResult<Page<Report>> {
        fn apply_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ReportFilter) {
            builder.push(" WHERE 1 = 1");
            if let Some(status) = filter.status {
                builder.push(" AND status = ").push_bind(status.as_str());
            }
            if let Some(kind) = &filter.target_kind {
                builder.push(" AND target_kind = ").push_bind(kind.clone());
            }
        }

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM reports");
        apply_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM reports", REPORT_COLUMNS));
        apply_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at ASC, id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = select.build().fetch_all(&self.db).await?;

        let data = rows
            .iter()
            .map(Report::from_row)
            .collect::<BoardResult<Vec<_>>>()?;
        Ok(Page::new(data, page, total))
    }

    pub async fn get(&self, id: ReportId) -> BoardResult<Report> {
        let query = format!("SELECT {} FROM reports WHERE id = ?", REPORT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| BoardError::NotFound(format!("Report {} not found", id)))?;

        Report::from_row(&row)
    }

    pub async fn stats(&self) -> BoardResult<DashboardStats> {
        let pending_jobs: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE moderation_status = 'pending' AND deleted_at IS NULL",
        )
        .fetch_one(&self.db)
        .await?;
        let active_jobs: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM jobs WHERE status = 'active' AND deleted_at IS NULL",
        )
        .fetch_one(&self.db)
        .await?;
        let pending_reports: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE status = 'pending'")
                .fetch_one(&self.db)
                .await?;

        let users_by_status = self
            .grouped("SELECT status, COUNT(*) FROM users WHERE deleted_at IS NULL GROUP BY status")
            .await?;
        let users_by_role = self
            .grouped("SELECT role, COUNT(*) FROM users WHERE deleted_at IS NULL GROUP BY role")
            .await?;
        let applications_by_status = self
            .grouped("SELECT status, COUNT(*) FROM job_applications GROUP BY status")
            .await?;
        let applications_total = applications_by_status.values().sum();

        Ok(DashboardStats {
            pending_jobs,
            active_jobs,
            pending_reports,
            users_by_status,
            users_by_role,
            applications_by_status,
            applications_total,
        })
    }

    async fn grouped(&self, query: &str) -> BoardResult<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(query).fetch_all(&self.db).await?;
        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::UserRole;
    use crate::admin::audit::AuditFilter;
    use crate::board::messages::NewMessage;
    use crate::ids::{JobId, MessageId};
    use crate::test_support::TestContext;

    fn report(target: EntityRef) -> NewReport {
        NewReport {
            target,
            category: ReportCategory::Spam,
            details: Some("Looks like spam".into()),
        }
    }

    #[tokio::test]
    async fn test_one_open_report_per_target() {
        let t = TestContext::new().await;
        let employer = t.user(UserRole::Employer).await;
        let seeker = t.user(UserRole::JobSeeker).await;
        let moderator = t.user(UserRole::Moderator).await;
        let job = t.approved_job(&employer, "Rust engineer").await;

        let first = t
            .ctx
            .reports
            .submit(&seeker, report(EntityRef::Job(job.id)))
            .await
            .unwrap();
        assert_eq!(first.status, ReportStatus::Pending);

        assert!(matches!(
            t.ctx.reports.submit(&seeker, report(EntityRef::Job(job.id))).await,
            Err(BoardError::Conflict(_))
        ));

        // Once reviewed, the same reporter can report again
        t.ctx.reports.dismiss(&moderator, first.id, None).await.unwrap();
        t.ctx
            .reports
            .submit(&seeker, report(EntityRef::Job(job.id)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_target_must_exist() {
        let t = TestContext::new().await;
        let seeker = t.user(UserRole::JobSeeker).await;

        assert!(matches!(
            t.ctx.reports.submit(&seeker, report(EntityRef::Job(JobId(404)))).await,
            Err(BoardError::NotFound(_))
        ));
        assert!(matches!(
            t.ctx.reports.submit(&seeker, report(EntityRef::User(seeker.id))).await,
            Err(BoardError::Validation(_))
        ));
        assert!(matches!(
            t.ctx
                .reports
                .submit(&seeker, report(EntityRef::Message(MessageId(1))))
                .await,
            Err(BoardError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_message_report_by_receiver() {
        let t = TestContext::new().await;
        let sender = t.user(UserRole::Employer).await;
        let receiver = t.user(UserRole::JobSeeker).await;
        let bystander = t.user(UserRole::JobSeeker).await;
        let message = t
            .ctx
            .messages
            .send(&sender, receiver.id, NewMessage { body: "Buy now".into() })
            .await
            .unwrap();

        assert!(matches!(
            t.ctx
                .reports
                .submit(&bystander, report(EntityRef::Message(message.id)))
                .await,
            Err(BoardError::NotFound(_))
        ));
        t.ctx
            .reports
            .submit(&receiver, report(EntityRef::Message(message.id)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_review_is_audited_once() {
        let t = TestContext::new().await;
        let seeker = t.user(UserRole::JobSeeker).await;
        let employer = t.user(UserRole::Employer).await;
        let moderator = t.user(UserRole::Moderator).await;
        let submitted = t
            .ctx
            .reports
            .submit(&seeker, report(EntityRef::User(employer.id)))
            .await
            .unwrap();

        assert!(matches!(
            t.ctx.reports.resolve(&seeker, submitted.id, None).await,
            Err(BoardError::Authorization(_))
        ));

        let resolved = t
            .ctx
            .reports
            .resolve(&moderator, submitted.id, Some("Warned the user".into()))
            .await
            .unwrap();
        assert_eq!(resolved.status, ReportStatus::Resolved);
        assert_eq!(resolved.reviewed_by, Some(moderator.id));

        assert!(matches!(
            t.ctx.reports.dismiss(&moderator, submitted.id, None).await,
            Err(BoardError::InvalidTransition { .. })
        ));

        let audit = t
            .ctx
            .audit
            .list(
                &AuditFilter {
                    action_type: Some(AuditActionType::ReportReview),
                    ..Default::default()
                },
                PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(audit.total, 1);
        assert_eq!(audit.data[0].action, AuditAction::Resolve);
    }

    #[tokio::test]
    async fn test_list_and_stats() {
        let t = TestContext::new().await;
        let seeker = t.user(UserRole::JobSeeker).await;
        let employer = t.user(UserRole::Employer).await;
        let job = t.approved_job(&employer, "Rust engineer").await;
        t.ctx
            .jobs
            .create_job(&employer, crate::test_support::job_draft("Pending role"))
            .await
            .unwrap();
        t.ctx
            .reports
            .submit(&seeker, report(EntityRef::Job(job.id)))
            .await
            .unwrap();
        t.ctx
            .reports
            .submit(&seeker, report(EntityRef::User(employer.id)))
            .await
            .unwrap();

        let jobs_only = t
            .ctx
            .reports
            .list(
                &ReportFilter {
                    status: Some(ReportStatus::Pending),
                    target_kind: Some("job".into()),
                },
                PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(jobs_only.total, 1);

        let stats = t.ctx.reports.stats().await.unwrap();
        assert_eq!(stats.pending_reports, 2);
        assert_eq!(stats.pending_jobs, 1);
        assert_eq!(stats.active_jobs, 1);
        assert_eq!(stats.users_by_role.get("employer").copied(), Some(1));
        assert_eq!(stats.applications_total, 0);
    }
}
