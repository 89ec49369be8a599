/// Application context and dependency injection
use crate::{
    account::AccountManager,
    admin::{AuditLog, ModerationService, ReportManager},
    board::{AlertManager, ApplicationManager, InterviewManager, JobManager, MessageManager},
    config::ServerConfig,
    db,
    error::{BoardError, BoardResult},
    mailer::{MailTransport, SmtpMailer},
    notify::{NotificationStore, Notifier, PreferenceStore},
    rate_limit::RateLimiter,
    uploads::{DiskStorage, StorageBackend, UploadService},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub accounts: AccountManager,
    // Board
    pub jobs: JobManager,
    pub applications: ApplicationManager,
    pub interviews: InterviewManager,
    pub alerts: AlertManager,
    pub messages: MessageManager,
    // Moderation
    pub moderation: ModerationService,
    pub reports: ReportManager,
    pub audit: AuditLog,
    // Notifications
    pub notifier: Arc<Notifier>,
    pub notifications: NotificationStore,
    pub preferences: PreferenceStore,
    pub uploads: UploadService,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> BoardResult<Self> {
        config.validate()?;
        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let mailer: Arc<dyn MailTransport> = Arc::new(SmtpMailer::new(config.email.clone())?);
        let storage: Arc<dyn StorageBackend> =
            Arc::new(DiskStorage::new(config.storage.upload_directory.clone()));

        Ok(Self::from_parts(config, db, mailer, storage))
    }

    /// Wire the services over an existing pool, mail channel and upload store
    pub fn from_parts(
        config: ServerConfig,
        db: SqlitePool,
        mailer: Arc<dyn MailTransport>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        let config = Arc::new(config);
        let notifier = Arc::new(Notifier::new(
            db.clone(),
            mailer,
            config.service.public_url.clone(),
        ));

        let accounts = AccountManager::new(db.clone(), config.clone(), notifier.clone());
        let alerts = AlertManager::new(db.clone(), notifier.clone());
        let jobs = JobManager::new(db.clone(), notifier.clone(), alerts.clone());
        let applications = ApplicationManager::new(db.clone(), notifier.clone());
        let interviews = InterviewManager::new(db.clone(), notifier.clone());
        let messages = MessageManager::new(db.clone(), notifier.clone());
        let moderation = ModerationService::new(db.clone(), accounts.clone(), notifier.clone());
        let uploads = UploadService::new(storage, accounts.clone(), &config.storage);
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Self {
            reports: ReportManager::new(db.clone()),
            audit: AuditLog::new(db.clone()),
            notifications: NotificationStore::new(db.clone()),
            preferences: PreferenceStore::new(db.clone()),
            config,
            db,
            accounts,
            jobs,
            applications,
            interviews,
            alerts,
            messages,
            moderation,
            notifier,
            uploads,
            rate_limiter,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> BoardResult<()> {
        for dir in [&config.storage.data_directory, &config.storage.upload_directory] {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    BoardError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        if let Some(parent) = config.storage.database.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        Ok(())
    }

    /// Public base URL used in mail links
    pub fn public_url(&self) -> &str {
        &self.config.service.public_url
    }
}
