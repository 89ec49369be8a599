/// Moderator activity log
///
/// Append-only. Rows are written with [`AuditLog::record`] on the caller's
/// transaction so a moderation change and its audit row commit together.
/// The table carries triggers that abort any UPDATE or DELETE.
use crate::{
    db::{parse_column, parse_timestamp, timestamp},
    error::{BoardError, BoardResult},
    ids::{AuditEntryId, EntityRef, UserId},
    pagination::{Page, PageParams},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

text_enum! {
    /// Area of moderator work an entry belongs to
    pub enum AuditActionType ("audit action type") {
        JobReview => "job_review",
        UserModeration => "user_moderation",
        ReportReview => "report_review",
    }
}

text_enum! {
    pub enum AuditAction ("audit action") {
        Approve => "approve",
        Reject => "reject",
        Override => "override",
        Delete => "delete",
        Ban => "ban",
        Suspend => "suspend",
        Warn => "warn",
        Unban => "unban",
        Resolve => "resolve",
        Dismiss => "dismiss",
    }
}

/// Entry to append
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub moderator_id: UserId,
    pub action_type: AuditActionType,
    pub action: AuditAction,
    pub target: EntityRef,
    pub reason: Option<String>,
    pub details: serde_json::Value,
}

impl NewAuditEntry {
    pub fn new(
        moderator_id: UserId,
        action_type: AuditActionType,
        action: AuditAction,
        target: EntityRef,
    ) -> Self {
        Self {
            moderator_id,
            action_type,
            action,
            target,
            reason: None,
            details: serde_json::json!({}),
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Stored audit row
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub moderator_id: UserId,
    pub action_type: AuditActionType,
    pub action: AuditAction,
    pub target: EntityRef,
    pub reason: Option<String>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    fn from_row(row: &SqliteRow) -> BoardResult<Self> {
        let target_kind: String = row.try_get("target_kind")?;
        let details: String = row.try_get("details")?;

        Ok(AuditEntry {
            id: AuditEntryId(row.try_get("id")?),
            moderator_id: UserId(row.try_get("moderator_id")?),
            action_type: parse_column(row, "action_type")?,
            action: parse_column(row, "action")?,
            target: EntityRef::from_parts(&target_kind, row.try_get("target_id")?)?,
            reason: row.try_get("reason")?,
            details: serde_json::from_str(&details)
                .map_err(|e| BoardError::Internal(format!("Invalid audit details: {}", e)))?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }
}

/// Query filters for the audit log
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub moderator_id: Option<UserId>,
    pub action_type: Option<AuditActionType>,
    pub action: Option<AuditAction>,
    pub target_kind: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Read side of the audit trail
#[derive(Clone)]
pub struct AuditLog {
    db: SqlitePool,
}

impl AuditLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append an entry on the caller's connection or transaction
    pub async fn record(
        conn: &mut SqliteConnection,
        entry: &NewAuditEntry,
    ) -> BoardResult<AuditEntryId> {
        let result = sqlx::query(
            r#"
            INSERT INTO moderator_actions
            (moderator_id, action_type, action, target_kind, target_id, reason, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.moderator_id)
        .bind(entry.action_type.as_str())
        .bind(entry.action.as_str())
        .bind(entry.target.kind())
        .bind(entry.target.raw_id())
        .bind(&entry.reason)
        .bind(entry.details.to_string())
        .bind(timestamp(Utc::now()))
        .execute(&mut *conn)
        .await?;

        Ok(AuditEntryId(result.last_insert_rowid()))
    }

    /// Newest first
    pub async fn list(&self, filter: &AuditFilter, page: PageParams) -> BoardResult<Page<AuditEntry>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM moderator_actions");
        push_audit_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Sqlite>::new(
            "SELECT id, moderator_id, action_type, action, target_kind, target_id, reason, details, created_at FROM moderator_actions",
        );
        push_audit_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select.build().fetch_all(&self.db).await?;
        let entries = rows
            .iter()
            .map(AuditEntry::from_row)
            .collect::<BoardResult<Vec<_>>>()?;

        Ok(Page::new(entries, page, total))
    }

    /// Every entry about one entity, oldest first
    pub async fn for_target(&self, target: EntityRef) -> BoardResult<Vec<AuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, moderator_id, action_type, action, target_kind, target_id, reason, details, created_at
            FROM moderator_actions
            WHERE target_kind = ? AND target_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(target.kind())
        .bind(target.raw_id())
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(AuditEntry::from_row).collect()
    }
}

fn push_audit_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a AuditFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(moderator_id) = filter.moderator_id {
        qb.push(" AND moderator_id = ").push_bind(moderator_id);
    }
    if let Some(action_type) = filter.action_type {
        qb.push(" AND action_type = ").push_bind(action_type.as_str());
    }
    if let Some(action) = filter.action {
        qb.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(kind) = &filter.target_kind {
        qb.push(" AND target_kind = ").push_bind(kind.as_str());
    }
    if let Some(from) = filter.from {
        qb.push(" AND created_at >= ").push_bind(timestamp(from));
    }
    if let Some(to) = filter.to {
        qb.push(" AND created_at <= ").push_bind(timestamp(to));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::UserRole;
    use crate::ids::JobId;
    use crate::test_support::TestContext;

    #[test]
    fn test_action_parsing() {
        assert_eq!(
            "job_review".parse::<AuditActionType>().unwrap(),
            AuditActionType::JobReview
        );
        assert_eq!("Dismiss".parse::<AuditAction>().unwrap(), AuditAction::Dismiss);
        assert!("erase".parse::<AuditAction>().is_err());
    }

    #[tokio::test]
    async fn test_record_commits_with_transaction() {
        let t = TestContext::new().await;
        let moderator = t.user(UserRole::Moderator).await;
        let audit = AuditLog::new(t.ctx.db.clone());

        let entry = NewAuditEntry::new(
            moderator.id,
            AuditActionType::JobReview,
            AuditAction::Reject,
            EntityRef::Job(JobId(7)),
        )
        .reason("Spam listing")
        .details(serde_json::json!({"from": "pending"}));

        // Rolled back: nothing recorded
        let mut tx = t.ctx.db.begin().await.unwrap();
        AuditLog::record(&mut tx, &entry).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(audit.list(&AuditFilter::default(), PageParams::default()).await.unwrap().total, 0);

        let mut tx = t.ctx.db.begin().await.unwrap();
        AuditLog::record(&mut tx, &entry).await.unwrap();
        tx.commit().await.unwrap();

        let entries = audit.for_target(EntityRef::Job(JobId(7))).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Reject);
        assert_eq!(entries[0].reason.as_deref(), Some("Spam listing"));
        assert_eq!(entries[0].details["from"], "pending");
    }

    #[tokio::test]
    async fn test_list_filters() {
        let t = TestContext::new().await;
        let first = t.user(UserRole::Moderator).await;
        let second = t.user(UserRole::Admin).await;
        let audit = AuditLog::new(t.ctx.db.clone());

        let mut conn = t.ctx.db.acquire().await.unwrap();
        for (moderator, action) in [
            (first.id, AuditAction::Approve),
            (first.id, AuditAction::Reject),
            (second.id, AuditAction::Approve),
        ] {
            let entry = NewAuditEntry::new(
                moderator,
                AuditActionType::JobReview,
                action,
                EntityRef::Job(JobId(1)),
            );
            AuditLog::record(&mut conn, &entry).await.unwrap();
        }
        drop(conn);

        let by_moderator = AuditFilter {
            moderator_id: Some(first.id),
            ..Default::default()
        };
        assert_eq!(audit.list(&by_moderator, PageParams::default()).await.unwrap().total, 2);

        let approvals = AuditFilter {
            action: Some(AuditAction::Approve),
            ..Default::default()
        };
        let page = audit.list(&approvals, PageParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.data[0].moderator_id, second.id);
    }
}
