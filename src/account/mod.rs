/// Account management
///
/// Users, their role and moderation status, and the profile fields shown to
/// employers. Accounts are never hard-deleted.
mod manager;
pub mod password;

pub use manager::{AccountManager, Session};

use crate::db::{parse_column, parse_optional_timestamp, parse_timestamp};
use crate::error::{BoardError, BoardResult};
use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use validator::Validate;

text_enum! {
    /// Account role
    pub enum UserRole ("user role") {
        JobSeeker => "job_seeker",
        Employer => "employer",
        Moderator => "moderator",
        Admin => "admin",
    }
}

impl UserRole {
    /// Moderator or admin
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Moderator | UserRole::Admin)
    }

    /// Roles that may be chosen at registration
    pub fn is_self_assignable(&self) -> bool {
        matches!(self, UserRole::JobSeeker | UserRole::Employer)
    }

    fn rank(&self) -> u8 {
        match self {
            UserRole::JobSeeker | UserRole::Employer => 0,
            UserRole::Moderator => 1,
            UserRole::Admin => 2,
        }
    }
}

text_enum! {
    /// Account moderation status
    pub enum UserStatus ("user status") {
        Active => "active",
        Suspended => "suspended",
        Banned => "banned",
    }
}

/// Column list shared by every query that loads a [`User`]
pub(crate) const USER_COLUMNS: &str = "id, name, email, password_hash, role, status, \
    ban_reason, banned_until, warning_count, headline, bio, location, phone, \
    resume_path, photo_path, profile_completed_at, created_at, updated_at, deleted_at";

/// A registered account
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub ban_reason: Option<String>,
    pub banned_until: Option<DateTime<Utc>>,
    pub warning_count: i64,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub resume_path: Option<String>,
    pub photo_path: Option<String>,
    pub profile_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub(crate) fn from_row(row: &SqliteRow) -> BoardResult<Self> {
        Ok(User {
            id: UserId(row.try_get("id")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: parse_column(row, "role")?,
            status: parse_column(row, "status")?,
            ban_reason: row.try_get("ban_reason")?,
            banned_until: parse_optional_timestamp(row, "banned_until")?,
            warning_count: row.try_get("warning_count")?,
            headline: row.try_get("headline")?,
            bio: row.try_get("bio")?,
            location: row.try_get("location")?,
            phone: row.try_get("phone")?,
            resume_path: row.try_get("resume_path")?,
            photo_path: row.try_get("photo_path")?,
            profile_completed_at: parse_optional_timestamp(row, "profile_completed_at")?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
            deleted_at: parse_optional_timestamp(row, "deleted_at")?,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    /// Whether this user may ban, suspend, warn, unban or delete `target`
    ///
    /// Staff act on employers and job seekers, only admins act on
    /// moderators, and nobody acts on an admin or on their own account.
    pub fn can_moderate(&self, target: &User) -> bool {
        if !self.is_staff() || self.id == target.id || target.role == UserRole::Admin {
            return false;
        }
        self.role.rank() > target.role.rank()
    }

    /// Reject accounts that may not act right now
    ///
    /// A ban or suspension whose `banned_until` has passed no longer blocks,
    /// even before the background task clears it. Staff are not held back by
    /// a suspension.
    pub fn check_access(&self, now: DateTime<Utc>) -> BoardResult<()> {
        if self.is_deleted() {
            return Err(BoardError::Authentication("Account no longer exists".to_string()));
        }
        let expired = self.banned_until.map(|until| until <= now).unwrap_or(false);
        match self.status {
            UserStatus::Active => Ok(()),
            _ if expired => Ok(()),
            UserStatus::Banned => Err(BoardError::AccountBanned(
                self.ban_reason
                    .clone()
                    .unwrap_or_else(|| "No reason given".to_string()),
            )),
            UserStatus::Suspended if self.is_staff() => Ok(()),
            UserStatus::Suspended => Err(BoardError::AccountSuspended(match self.banned_until {
                Some(until) => format!("until {}", until.to_rfc3339()),
                None => "until further notice".to_string(),
            })),
        }
    }

    /// Name, headline, location and bio are all filled in
    pub fn profile_is_complete(&self) -> bool {
        [
            Some(self.name.as_str()),
            self.headline.as_deref(),
            self.location.as_deref(),
            self.bio.as_deref(),
        ]
        .iter()
        .all(|field| field.map(|v| !v.trim().is_empty()).unwrap_or(false))
    }
}

/// Registration input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAccount {
    #[validate(length(min = 1, max = 100, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be at least 8 characters"))]
    pub password: String,
    pub role: UserRole,
}

/// Partial profile update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfilePatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub headline: Option<String>,
    #[validate(length(max = 5000))]
    pub bio: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
}

/// Filters for the staff user list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    /// Substring of name or email
    pub search: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: UserId(id),
            name: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            role,
            status: UserStatus::Active,
            ban_reason: None,
            banned_until: None,
            warning_count: 0,
            headline: None,
            bio: None,
            location: None,
            phone: None,
            resume_path: None,
            photo_path: None,
            profile_completed_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("job_seeker".parse::<UserRole>().unwrap(), UserRole::JobSeeker);
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("owner".parse::<UserRole>().is_err());
        assert!(UserRole::Moderator.is_staff());
        assert!(!UserRole::Employer.is_staff());
    }

    #[test]
    fn test_moderation_hierarchy() {
        let admin = user(1, UserRole::Admin);
        let moderator = user(2, UserRole::Moderator);
        let other_moderator = user(3, UserRole::Moderator);
        let employer = user(4, UserRole::Employer);
        let seeker = user(5, UserRole::JobSeeker);

        assert!(moderator.can_moderate(&employer));
        assert!(moderator.can_moderate(&seeker));
        assert!(!moderator.can_moderate(&other_moderator));
        assert!(!moderator.can_moderate(&admin));
        assert!(admin.can_moderate(&moderator));
        assert!(!admin.can_moderate(&admin));
        assert!(!admin.can_moderate(&user(6, UserRole::Admin)));
        assert!(!employer.can_moderate(&seeker));
    }

    #[test]
    fn test_profile_completeness() {
        let mut u = user(1, UserRole::JobSeeker);
        assert!(!u.profile_is_complete());
        u.headline = Some("Rust developer".into());
        u.location = Some("Berlin".into());
        u.bio = Some("   ".into());
        assert!(!u.profile_is_complete());
        u.bio = Some("Ten years of backend work".into());
        assert!(u.profile_is_complete());
    }

    #[test]
    fn test_access_checks() {
        let now = Utc::now();
        let mut u = user(1, UserRole::JobSeeker);
        assert!(u.check_access(now).is_ok());

        u.status = UserStatus::Banned;
        u.ban_reason = Some("spam".into());
        assert!(matches!(u.check_access(now), Err(BoardError::AccountBanned(r)) if r == "spam"));

        u.banned_until = Some(now - chrono::Duration::minutes(1));
        assert!(u.check_access(now).is_ok());

        u.status = UserStatus::Suspended;
        u.banned_until = Some(now + chrono::Duration::days(3));
        assert!(matches!(u.check_access(now), Err(BoardError::AccountSuspended(_))));

        let mut moderator = user(2, UserRole::Moderator);
        moderator.status = UserStatus::Suspended;
        assert!(moderator.check_access(now).is_ok());

        u.deleted_at = Some(now);
        assert!(matches!(u.check_access(now), Err(BoardError::Authentication(_))));
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let mut u = user(1, UserRole::Employer);
        u.password_hash = "$argon2id$secret".into();
        let json = serde_json::to_string(&u).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"employer\""));
    }
}
