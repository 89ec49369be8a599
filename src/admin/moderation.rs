/// Account moderation
///
/// Ban, suspend, warn, unban and delete. Every staff action writes one
/// `user_moderation` audit row in the same transaction as the change.
use crate::{
    account::{AccountManager, User, UserStatus},
    admin::audit::{AuditAction, AuditActionType, AuditLog, NewAuditEntry},
    db::timestamp,
    error::{BoardError, BoardResult},
    ids::{EntityRef, UserId},
    metrics,
    notify::{NotificationEvent, Notifier},
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

pub const MAX_SUSPENSION_DAYS: i64 = 365;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BanRequest {
    #[validate(length(max = 1000))]
    pub reason: String,
    /// Open-ended when absent
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SuspendRequest {
    #[validate(length(max = 1000))]
    pub reason: String,
    #[validate(range(min = 1, max = 365, message = "must be between 1 and 365 days"))]
    pub days: i64,
}

/// Reason-only body used by warn and delete
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReasonRequest {
    #[validate(length(max = 1000))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UnbanRequest {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

fn required_reason(reason: &str) -> BoardResult<String> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(BoardError::invalid_field("reason", "must not be empty"));
    }
    Ok(reason.to_string())
}

/// Staff operations on user accounts
#[derive(Clone)]
pub struct ModerationService {
    db: SqlitePool,
    accounts: AccountManager,
    notifier: Arc<Notifier>,
}

impl ModerationService {
    pub fn new(db: SqlitePool, accounts: AccountManager, notifier: Arc<Notifier>) -> Self {
        Self {
            db,
            accounts,
            notifier,
        }
    }

    async fn load_target(&self, moderator: &User, target_id: UserId) -> BoardResult<User> {
        let target = self.accounts.get_active_user(target_id).await?;
        if !moderator.can_moderate(&target) {
            return Err(BoardError::Authorization(format!(
                "Not allowed to moderate user {}",
                target_id
            )));
        }
        Ok(target)
    }

    /// Ban from active or suspended
    pub async fn ban(&self, moderator: &User, target_id: UserId, request: BanRequest) -> BoardResult<User> {
        request.validate()?;
        let reason = required_reason(&request.reason)?;
        let now = Utc::now();
        if let Some(until) = request.until {
            if until <= now {
                return Err(BoardError::invalid_field("until", "must be in the future"));
            }
        }
        let target = self.load_target(moderator, target_id).await?;

        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE users SET status = 'banned', ban_reason = ?, banned_until = ?, updated_at = ?
            WHERE id = ? AND status <> 'banned' AND deleted_at IS NULL
            "#,
        )
        .bind(&reason)
        .bind(request.until.map(timestamp))
        .bind(timestamp(now))
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(BoardError::invalid_transition("user", target.status, UserStatus::Banned));
        }

        let entry = NewAuditEntry::new(
            moderator.id,
            AuditActionType::UserModeration,
            AuditAction::Ban,
            EntityRef::User(target_id),
        )
        .reason(reason.clone())
        .details(serde_json::json!({
            "from": target.status.as_str(),
            "until": request.until.map(|u| u.to_rfc3339()),
        }));
        AuditLog::record(&mut tx, &entry).await?;
        tx.commit().await?;

        metrics::record_moderation_action(AuditActionType::UserModeration, AuditAction::Ban);
        info!(user_id = %target_id, moderator_id = %moderator.id, "user banned");

        self.notifier
            .notify_user(
                target_id,
                &NotificationEvent::AccountBanned {
                    reason,
                    until: request.until,
                    suspended: false,
                },
            )
            .await;

        self.accounts.get_user(target_id).await
    }

    /// Time-boxed ban of an active account
    pub async fn suspend(
        &self,
        moderator: &User,
        target_id: UserId,
        request: SuspendRequest,
    ) -> BoardResult<User> {
        request.validate()?;
        let reason = required_reason(&request.reason)?;
        let target = self.load_target(moderator, target_id).await?;
        let now = Utc::now();
        let until = now + Duration::days(request.days.clamp(1, MAX_SUSPENSION_DAYS));

        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE users SET status = 'suspended', ban_reason = ?, banned_until = ?, updated_at = ?
            WHERE id = ? AND status = 'active' AND deleted_at IS NULL
            "#,
        )
        .bind(&reason)
        .bind(timestamp(until))
        .bind(timestamp(now))
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(BoardError::invalid_transition(
                "user",
                target.status,
                UserStatus::Suspended,
            ));
        }

        let entry = NewAuditEntry::new(
            moderator.id,
            AuditActionType::UserModeration,
            AuditAction::Suspend,
            EntityRef::User(target_id),
        )
        .reason(reason.clone())
        .details(serde_json::json!({ "days": request.days, "until": until.to_rfc3339() }));
        AuditLog::record(&mut tx, &entry).await?;
        tx.commit().await?;

        metrics::record_moderation_action(AuditActionType::UserModeration, AuditAction::Suspend);
        info!(user_id = %target_id, moderator_id = %moderator.id, days = request.days, "user suspended");

        self.notifier
            .notify_user(
                target_id,
                &NotificationEvent::AccountBanned {
                    reason,
                    until: Some(until),
                    suspended: true,
                },
            )
            .await;

        self.accounts.get_user(target_id).await
    }

    pub async fn warn(&self, moderator: &User, target_id: UserId, request: ReasonRequest) -> BoardResult<User> {
        request.validate()?;
        let reason = required_reason(&request.reason)?;
        self.load_target(moderator, target_id).await?;

        let mut tx = self.db.begin().await?;
        let row = sqlx::query(
            r#"
            UPDATE users SET warning_count = warning_count + 1, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            RETURNING warning_count
            "#,
        )
        .bind(timestamp(Utc::now()))
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;

        let warning_count: i64 = match row {
            Some(row) => row.try_get("warning_count")?,
            None => {
                tx.rollback().await?;
                return Err(BoardError::NotFound(format!("User {} not found", target_id)));
            }
        };

        let entry = NewAuditEntry::new(
            moderator.id,
            AuditActionType::UserModeration,
            AuditAction::Warn,
            EntityRef::User(target_id),
        )
        .reason(reason.clone())
        .details(serde_json::json!({ "warning_count": warning_count }));
        AuditLog::record(&mut tx, &entry).await?;
        tx.commit().await?;

        metrics::record_moderation_action(AuditActionType::UserModeration, AuditAction::Warn);
        info!(user_id = %target_id, moderator_id = %moderator.id, warning_count, "user warned");

        self.notifier
            .notify_user(
                target_id,
                &NotificationEvent::AccountWarned {
                    reason,
                    warning_count,
                },
            )
            .await;

        self.accounts.get_user(target_id).await
    }

    /// Lift a ban or suspension
    pub async fn unban(&self, moderator: &User, target_id: UserId, request: UnbanRequest) -> BoardResult<User> {
        request.validate()?;
        let reason = request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let target = self.load_target(moderator, target_id).await?;

        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE users SET status = 'active', ban_reason = NULL, banned_until = NULL, updated_at = ?
            WHERE id = ? AND status IN ('banned', 'suspended') AND deleted_at IS NULL
            "#,
        )
        .bind(timestamp(Utc::now()))
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(BoardError::invalid_transition("user", target.status, UserStatus::Active));
        }

        let mut entry = NewAuditEntry::new(
            moderator.id,
            AuditActionType::UserModeration,
            AuditAction::Unban,
            EntityRef::User(target_id),
        )
        .details(serde_json::json!({ "from": target.status.as_str() }));
        if let Some(reason) = &reason {
            entry = entry.reason(reason.clone());
        }
        AuditLog::record(&mut tx, &entry).await?;
        tx.commit().await?;

        metrics::record_moderation_action(AuditActionType::UserModeration, AuditAction::Unban);
        info!(user_id = %target_id, moderator_id = %moderator.id, "user reinstated");

        self.notifier
            .notify_user(target_id, &NotificationEvent::AccountReinstated)
            .await;

        self.accounts.get_user(target_id).await
    }

    /// Soft delete; the user's active listings are closed with it
    pub async fn delete_user(&self, moderator: &User, target_id: UserId, request: ReasonRequest) -> BoardResult<()> {
        request.validate()?;
        let reason = required_reason(&request.reason)?;
        self.load_target(moderator, target_id).await?;
        let now = timestamp(Utc::now());

        let mut tx = self.db.begin().await?;
        let result = sqlx::query(
            "UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(BoardError::NotFound(format!("User {} not found", target_id)));
        }

        let closed = sqlx::query(
            "UPDATE jobs SET status = 'closed', updated_at = ? WHERE owner_id = ? AND status <> 'closed'",
        )
        .bind(&now)
        .bind(target_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let entry = NewAuditEntry::new(
            moderator.id,
            AuditActionType::UserModeration,
            AuditAction::Delete,
            EntityRef::User(target_id),
        )
        .reason(reason)
        .details(serde_json::json!({ "closed_jobs": closed }));
        AuditLog::record(&mut tx, &entry).await?;
        tx.commit().await?;

        metrics::record_moderation_action(AuditActionType::UserModeration, AuditAction::Delete);
        info!(user_id = %target_id, moderator_id = %moderator.id, closed_jobs = closed, "user deleted");
        Ok(())
    }

    /// Lift bans and suspensions whose end date has passed
    ///
    /// System action: logged, not audited.
    pub async fn expire_bans(&self, now: DateTime<Utc>) -> BoardResult<usize> {
        let expired: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM users
            WHERE status IN ('banned', 'suspended') AND banned_until IS NOT NULL
              AND banned_until <= ? AND deleted_at IS NULL
            "#,
        )
        .bind(timestamp(now))
        .fetch_all(&self.db)
        .await?;

        let mut lifted = 0;
        for id in expired {
            let user_id = UserId(id);
            let result = sqlx::query(
                r#"
                UPDATE users SET status = 'active', ban_reason = NULL, banned_until = NULL, updated_at = ?
                WHERE id = ? AND status IN ('banned', 'suspended') AND banned_until <= ?
                "#,
            )
            .bind(timestamp(Utc::now()))
            .bind(user_id)
            .bind(timestamp(now))
            .execute(&self.db)
            .await;

            match result {
                Ok(r) if r.rows_affected() > 0 => {
                    lifted += 1;
                    info!(user_id = %user_id, "ban expired, account reinstated");
                    self.notifier
                        .notify_user(user_id, &NotificationEvent::AccountReinstated)
                        .await;
                }
                Ok(_) => {}
                Err(e) => warn!(user_id = %user_id, error = %e, "failed to lift expired ban"),
            }
        }

        Ok(lifted)
    }
}
