//! Shared fixtures for unit tests
use crate::{
    account::{password::hash_password, NewAccount, User, UserRole, USER_COLUMNS},
    board::{
        alerts::AlertDraft,
        jobs::{Job, JobDraft, JobType},
    },
    config::ServerConfig,
    context::AppContext,
    db::{self, timestamp},
    mailer::{testing::RecordingMailer, MailTransport},
    uploads::DiskStorage,
};
use chrono::Utc;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tempfile::TempDir;

static NEXT_USER: AtomicUsize = AtomicUsize::new(1);

pub(crate) struct TestContext {
    pub ctx: AppContext,
    /// The mail channel, unless the context was built with another one
    pub mailer: Arc<RecordingMailer>,
    _uploads: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::build(ServerConfig::development(), None).await
    }

    pub async fn with_admin_emails(admin_emails: Vec<String>) -> Self {
        let mut config = ServerConfig::development();
        config.authentication.admin_emails = admin_emails;
        Self::build(config, None).await
    }

    pub async fn with_mailer(mailer: Arc<dyn MailTransport>) -> Self {
        Self::build(ServerConfig::development(), Some(mailer)).await
    }

    async fn build(mut config: ServerConfig, mailer: Option<Arc<dyn MailTransport>>) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        config.storage.upload_directory = uploads.path().to_path_buf();
        config.rate_limit.enabled = false;

        let recorder = Arc::new(RecordingMailer::new());
        let transport: Arc<dyn MailTransport> =
            mailer.unwrap_or_else(|| recorder.clone() as Arc<dyn MailTransport>);
        let pool = db::memory_pool().await.unwrap();
        let storage = Arc::new(DiskStorage::new(uploads.path().to_path_buf()));

        Self {
            ctx: AppContext::from_parts(config, pool, transport, storage),
            mailer: recorder,
            _uploads: uploads,
        }
    }

    /// Insert an active user directly, without a welcome notification
    pub async fn user(&self, role: UserRole) -> User {
        let n = NEXT_USER.fetch_add(1, Ordering::Relaxed);
        let now = timestamp(Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, role, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'active', ?, ?)
            "#,
        )
        .bind(format!("{} {}", role.as_str(), n))
        .bind(format!("user{}@example.com", n))
        .bind(hash_password("password123").unwrap())
        .bind(role.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.ctx.db)
        .await
        .unwrap();

        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(result.last_insert_rowid())
            .fetch_one(&self.ctx.db)
            .await
            .unwrap();
        User::from_row(&row).unwrap()
    }

    pub async fn approved_job(&self, employer: &User, title: &str) -> Job {
        self.approved_job_from(employer, job_draft(title)).await
    }

    /// Create and approve through a fresh moderator
    pub async fn approved_job_from(&self, employer: &User, draft: JobDraft) -> Job {
        let moderator = self.user(UserRole::Moderator).await;
        let job = self.ctx.jobs.create_job(employer, draft).await.unwrap();
        self.ctx.jobs.approve(&moderator, job.id).await.unwrap()
    }
}

pub(crate) fn new_account(name: &str, email: &str, role: UserRole) -> NewAccount {
    NewAccount {
        name: name.to_string(),
        email: email.to_string(),
        password: "password123".to_string(),
        role,
    }
}

pub(crate) fn job_draft(title: &str) -> JobDraft {
    JobDraft {
        title: title.to_string(),
        description: "A permanent role on a friendly product team.".to_string(),
        location: "Lisbon".to_string(),
        job_type: JobType::FullTime,
        remote: false,
        salary_min: None,
        salary_max: None,
        deadline: None,
    }
}

pub(crate) fn alert_draft(keywords: &str) -> AlertDraft {
    AlertDraft {
        name: format!("{} jobs", keywords),
        keywords: Some(keywords.to_string()),
        location: None,
        job_type: None,
        min_salary: None,
        remote_only: false,
        frequency: crate::board::alerts::AlertFrequency::Immediate,
        method: crate::board::alerts::AlertMethod::Both,
        active: true,
    }
}
