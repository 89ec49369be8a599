/// Account manager implementation using runtime queries
use crate::{
    account::{
        password::{hash_password, verify_password},
        NewAccount, ProfilePatch, User, UserFilter, UserRole, USER_COLUMNS,
    },
    auth::issue_token,
    config::ServerConfig,
    db::timestamp,
    error::{is_unique_violation, BoardError, BoardResult},
    ids::UserId,
    notify::{NotificationEvent, Notifier, Recipient},
    pagination::{Page, PageParams},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

/// Issued on login
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Account manager service
#[derive(Clone)]
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    notifier: Arc<Notifier>,
}

impl AccountManager {
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>, notifier: Arc<Notifier>) -> Self {
        Self {
            db,
            config,
            notifier,
        }
    }

    /// Register a new account and send the welcome notification
    pub async fn create_account(&self, input: NewAccount) -> BoardResult<User> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        let role = if self.config.is_admin_email(&email) {
            UserRole::Admin
        } else if input.role.is_self_assignable() {
            input.role
        } else {
            return Err(BoardError::invalid_field(
                "role",
                "only employer and job_seeker accounts can be registered",
            ));
        };

        let password_hash = hash_password(&input.password)?;
        let now = timestamp(Utc::now());

        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, role, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'active', ?, ?)
            "#,
        )
        .bind(input.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(role.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BoardError::Conflict("Email already registered".to_string())
            } else {
                BoardError::Database(e)
            }
        })?;

        let user = self.get_user(UserId(result.last_insert_rowid())).await?;
        info!(user_id = %user.id, role = %user.role, "account created");

        self.notifier
            .dispatch(&Recipient::from(&user), &NotificationEvent::Welcome { role })
            .await;

        Ok(user)
    }

    /// Verify credentials and issue a bearer token
    pub async fn login(&self, email: &str, password: &str) -> BoardResult<Session> {
        let invalid = || BoardError::Authentication("Invalid email or password".to_string());

        let user = self
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(invalid)?;

        if user.is_deleted() || !verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }
        user.check_access(Utc::now())?;

        let (token, expires_at) = issue_token(&self.config.authentication, &user)?;
        Ok(Session {
            token,
            expires_at,
            user,
        })
    }

    /// Load a user by id, including soft-deleted accounts
    pub async fn get_user(&self, id: UserId) -> BoardResult<User> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| BoardError::NotFound(format!("User {} not found", id)))?;

        User::from_row(&row)
    }

    /// Load a user that has not been deleted
    pub async fn get_active_user(&self, id: UserId) -> BoardResult<User> {
        let user = self.get_user(id).await?;
        if user.is_deleted() {
            return Err(BoardError::NotFound(format!("User {} not found", id)));
        }
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> BoardResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(User::from_row).transpose()
    }

    /// Staff user listing
    pub async fn list_users(&self, filter: &UserFilter, page: PageParams) -> BoardResult<Page<User>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_user_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select.build().fetch_all(&self.db).await?;
        let users = rows.iter().map(User::from_row).collect::<BoardResult<Vec<_>>>()?;

        Ok(Page::new(users, page, total))
    }

    /// Apply a profile patch
    ///
    /// The first time the profile becomes complete it is stamped and the
    /// user receives `ProfileCompleted`.
    pub async fn update_profile(&self, id: UserId, patch: ProfilePatch) -> BoardResult<User> {
        patch.validate()?;

        let mut user = self.get_active_user(id).await?;
        if let Some(name) = patch.name {
            user.name = name.trim().to_string();
        }
        if let Some(headline) = patch.headline {
            user.headline = non_empty(headline);
        }
        if let Some(bio) = patch.bio {
            user.bio = non_empty(bio);
        }
        if let Some(location) = patch.location {
            user.location = non_empty(location);
        }
        if let Some(phone) = patch.phone {
            user.phone = non_empty(phone);
        }

        let now = Utc::now();
        let newly_completed = user.profile_completed_at.is_none() && user.profile_is_complete();
        if newly_completed {
            user.profile_completed_at = Some(now);
        }

        sqlx::query(
            r#"
            UPDATE users
            SET name = ?, headline = ?, bio = ?, location = ?, phone = ?,
                profile_completed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.name)
        .bind(&user.headline)
        .bind(&user.bio)
        .bind(&user.location)
        .bind(&user.phone)
        .bind(user.profile_completed_at.map(timestamp))
        .bind(timestamp(now))
        .bind(id)
        .execute(&self.db)
        .await?;
        user.updated_at = now;

        if newly_completed {
            info!(user_id = %id, "profile completed");
            self.notifier
                .dispatch(&Recipient::from(&user), &NotificationEvent::ProfileCompleted)
                .await;
        }

        Ok(user)
    }

    /// Record the storage key of an uploaded resume
    pub async fn set_resume(&self, id: UserId, key: &str) -> BoardResult<User> {
        self.set_file_column(id, "resume_path", key).await
    }

    /// Record the storage key of an uploaded profile photo
    pub async fn set_photo(&self, id: UserId, key: &str) -> BoardResult<User> {
        self.set_file_column(id, "photo_path", key).await
    }

    async fn set_file_column(&self, id: UserId, column: &'static str, key: &str) -> BoardResult<User> {
        let query = format!(
            "UPDATE users SET {} = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            column
        );
        let result = sqlx::query(&query)
            .bind(key)
            .bind(timestamp(Utc::now()))
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BoardError::NotFound(format!("User {} not found", id)));
        }

        self.get_user(id).await
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn push_user_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a UserFilter) {
    qb.push(" WHERE 1 = 1");
    if !filter.include_deleted {
        qb.push(" AND deleted_at IS NULL");
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        qb.push(" AND (lower(name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
