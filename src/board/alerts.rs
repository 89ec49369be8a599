/// Saved searches and the fan-out that runs when a listing is approved
///
/// Matching is attribute filtering, not scoring. Immediate alerts are
/// notified inline, daily and weekly alerts collect `alert_matches` rows
/// that the digest task sends later.
use crate::{
    account::{User, UserRole},
    board::jobs::{Job, JobType},
    db::{parse_column, parse_optional_column, parse_optional_timestamp, parse_timestamp, timestamp},
    error::{BoardError, BoardResult},
    ids::{AlertId, JobId, UserId},
    notify::{preferences::ChannelSet, DigestJob, NotificationEvent, Notifier, Recipient},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

text_enum! {
    pub enum AlertFrequency ("alert frequency") {
        Immediate => "immediate",
        Daily => "daily",
        Weekly => "weekly",
    }
}

impl AlertFrequency {
    /// Minimum time between two digests; `None` for immediate alerts
    pub fn period(&self) -> Option<Duration> {
        match self {
            AlertFrequency::Immediate => None,
            AlertFrequency::Daily => Some(Duration::days(1)),
            AlertFrequency::Weekly => Some(Duration::days(7)),
        }
    }
}

text_enum! {
    /// Delivery method chosen on the alert
    pub enum AlertMethod ("alert method") {
        Email => "email",
        Push => "push",
        Both => "both",
    }
}

impl AlertMethod {
    pub fn channels(&self) -> ChannelSet {
        match self {
            AlertMethod::Email => ChannelSet {
                mail: true,
                in_app: false,
            },
            AlertMethod::Push => ChannelSet {
                mail: false,
                in_app: true,
            },
            AlertMethod::Both => ChannelSet::BOTH,
        }
    }
}

const ALERT_COLUMNS: &str = "a.id, a.user_id, a.name, a.keywords, a.location, a.job_type, \
    a.min_salary, a.remote_only, a.frequency, a.method, a.active, a.last_sent_at, a.created_at";

/// A saved search
#[derive(Debug, Clone, Serialize)]
pub struct JobAlert {
    pub id: AlertId,
    pub user_id: UserId,
    pub name: String,
    pub keywords: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub min_salary: Option<i64>,
    pub remote_only: bool,
    pub frequency: AlertFrequency,
    pub method: AlertMethod,
    pub active: bool,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl JobAlert {
    fn from_row(row: &SqliteRow) -> BoardResult<Self> {
        Ok(JobAlert {
            id: AlertId(row.try_get("id")?),
            user_id: UserId(row.try_get("user_id")?),
            name: row.try_get("name")?,
            keywords: row.try_get("keywords")?,
            location: row.try_get("location")?,
            job_type: parse_optional_column(row, "job_type")?,
            min_salary: row.try_get("min_salary")?,
            remote_only: row.try_get("remote_only")?,
            frequency: parse_column(row, "frequency")?,
            method: parse_column(row, "method")?,
            active: row.try_get("active")?,
            last_sent_at: parse_optional_timestamp(row, "last_sent_at")?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }

    /// Whether `job` satisfies every criterion set on the alert
    pub fn matches(&self, job: &Job) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            match needle.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
                None => true,
            }
        }

        let salary_ok = match self.min_salary {
            Some(min) => job.best_salary().map(|s| s >= min).unwrap_or(false),
            None => true,
        };

        contains(&job.title, &self.keywords)
            && contains(&job.location, &self.location)
            && self.job_type.map(|t| t == job.job_type).unwrap_or(true)
            && (!self.remote_only || job.remote)
            && salary_ok
    }
}

/// Alert create/update input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AlertDraft {
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub name: String,
    #[validate(length(max = 200))]
    pub keywords: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub min_salary: Option<i64>,
    #[serde(default)]
    pub remote_only: bool,
    #[serde(default = "default_frequency")]
    pub frequency: AlertFrequency,
    #[serde(default = "default_method")]
    pub method: AlertMethod,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_frequency() -> AlertFrequency {
    AlertFrequency::Immediate
}

fn default_method() -> AlertMethod {
    AlertMethod::Both
}

fn default_active() -> bool {
    true
}

/// Alert service
#[derive(Clone)]
pub struct AlertManager {
    db: SqlitePool,
    notifier: Arc<Notifier>,
}

impl AlertManager {
    pub fn new(db: SqlitePool, notifier: Arc<Notifier>) -> Self {
        Self { db, notifier }
    }

    pub async fn create(&self, user: &User, draft: AlertDraft) -> BoardResult<JobAlert> {
        if user.role != UserRole::JobSeeker {
            return Err(BoardError::Authorization(
                "Only job seekers can save job alerts".to_string(),
            ));
        }
        draft.validate()?;

        let result = sqlx::query(
            r#"
            INSERT INTO job_alerts
            (user_id, name, keywords, location, job_type, min_salary, remote_only,
             frequency, method, active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id)
        .bind(draft.name.trim())
        .bind(trimmed(&draft.keywords))
        .bind(trimmed(&draft.location))
        .bind(draft.job_type.map(|t| t.as_str()))
        .bind(draft.min_salary)
        .bind(draft.remote_only)
        .bind(draft.frequency.as_str())
        .bind(draft.method.as_str())
        .bind(draft.active)
        .bind(timestamp(Utc::now()))
        .execute(&self.db)
        .await?;

        self.get(user, AlertId(result.last_insert_rowid())).await
    }

    pub async fn update(&self, user: &User, id: AlertId, draft: AlertDraft) -> BoardResult<JobAlert> {
        draft.validate()?;
        self.get(user, id).await?;

        sqlx::query(
            r#"
            UPDATE job_alerts
            SET name = ?, keywords = ?, location = ?, job_type = ?, min_salary = ?,
                remote_only = ?, frequency = ?, method = ?, active = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(draft.name.trim())
        .bind(trimmed(&draft.keywords))
        .bind(trimmed(&draft.location))
        .bind(draft.job_type.map(|t| t.as_str()))
        .bind(draft.min_salary)
        .bind(draft.remote_only)
        .bind(draft.frequency.as_str())
        .bind(draft.method.as_str())
        .bind(draft.active)
        .bind(id)
        .bind(user.id)
        .execute(&self.db)
        .await?;

        self.get(user, id).await
    }

    pub async fn delete(&self, user: &User, id: AlertId) -> BoardResult<()> {
        let result = sqlx::query("DELETE FROM job_alerts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user.id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BoardError::NotFound(format!("Alert {} not found", id)));
        }
        Ok(())
    }

    pub async fn list(&self, user: &User) -> BoardResult<Vec<JobAlert>> {
        let query = format!(
            "SELECT {} FROM job_alerts a WHERE a.user_id = ? ORDER BY a.created_at DESC, a.id DESC",
            ALERT_COLUMNS
        );
        let rows = sqlx::query(&query).bind(user.id).fetch_all(&self.db).await?;
        rows.iter().map(JobAlert::from_row).collect()
    }

    /// An alert owned by `user`; other users' alerts are reported as missing
    pub async fn get(&self, user: &User, id: AlertId) -> BoardResult<JobAlert> {
        let query = format!(
            "SELECT {} FROM job_alerts a WHERE a.id = ? AND a.user_id = ?",
            ALERT_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(user.id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| BoardError::NotFound(format!("Alert {} not found", id)))?;

        JobAlert::from_row(&row)
    }

    /// Active alerts whose owner may receive notifications, with the owner
    async fn deliverable_alerts(
        &self,
        frequency: Option<AlertFrequency>,
    ) -> BoardResult<Vec<(JobAlert, Recipient)>> {
        let mut query = format!(
            r#"
            SELECT {}, u.name AS user_name, u.email AS user_email
            FROM job_alerts a
            JOIN users u ON u.id = a.user_id
            WHERE a.active = 1 AND u.deleted_at IS NULL AND u.status <> 'banned'
            "#,
            ALERT_COLUMNS
        );
        if frequency.is_some() {
            query.push_str(" AND a.frequency = ?");
        }
        query.push_str(" ORDER BY a.id");

        let mut q = sqlx::query(&query);
        if let Some(frequency) = frequency {
            q = q.bind(frequency.as_str());
        }
        let rows = q.fetch_all(&self.db).await?;

        rows.iter()
            .map(|row| -> BoardResult<(JobAlert, Recipient)> {
                let alert = JobAlert::from_row(row)?;
                let recipient = Recipient {
                    user_id: alert.user_id,
                    name: row.try_get("user_name")?,
                    email: row.try_get("user_email")?,
                };
                Ok((alert, recipient))
            })
            .collect()
    }

    /// Match a newly approved listing against every deliverable alert
    ///
    /// Returns the number of alerts the match was delivered to. The listing
    /// owner's own alerts are skipped; a failing alert is logged and skipped.
    pub async fn fan_out(&self, job: &Job) -> BoardResult<usize> {
        let now = Utc::now();
        let mut matched = 0;

        for (alert, recipient) in self.deliverable_alerts(None).await? {
            if alert.user_id == job.owner_id || !alert.matches(job) {
                continue;
            }
            if let Err(e) = self.deliver_match(&alert, &recipient, job, now).await {
                warn!(alert_id = %alert.id, job_id = %job.id, error = %e, "alert match delivery failed");
                continue;
            }
            matched += 1;
        }

        Ok(matched)
    }

    async fn deliver_match(
        &self,
        alert: &JobAlert,
        recipient: &Recipient,
        job: &Job,
        now: DateTime<Utc>,
    ) -> BoardResult<()> {
        match alert.frequency {
            AlertFrequency::Immediate => {
                let event = NotificationEvent::JobAlertMatch {
                    alert_id: alert.id,
                    alert_name: alert.name.clone(),
                    job_id: job.id,
                    job_title: job.title.clone(),
                    location: job.location.clone(),
                };
                self.notifier
                    .dispatch_via(recipient, &event, alert.method.channels())
                    .await;

                sqlx::query("UPDATE job_alerts SET last_sent_at = ? WHERE id = ?")
                    .bind(timestamp(now))
                    .bind(alert.id)
                    .execute(&self.db)
                    .await?;
            }
            AlertFrequency::Daily | AlertFrequency::Weekly => {
                sqlx::query(
                    "INSERT OR IGNORE INTO alert_matches (alert_id, job_id, matched_at) VALUES (?, ?, ?)",
                )
                .bind(alert.id)
                .bind(job.id)
                .bind(timestamp(now))
                .execute(&self.db)
                .await?;
                debug!(alert_id = %alert.id, job_id = %job.id, "alert match queued for digest");
            }
        }
        Ok(())
    }

    /// Send one digest per due alert of `frequency`
    ///
    /// An alert is due when it has unsent matches and its last digest is
    /// older than the frequency's period. Returns the number of digests sent.
    pub async fn send_digests(&self, frequency: AlertFrequency, now: DateTime<Utc>) -> BoardResult<usize> {
        let period = match frequency.period() {
            Some(period) => period,
            None => return Ok(0),
        };
        let mut sent = 0;

        for (alert, recipient) in self.deliverable_alerts(Some(frequency)).await? {
            let due = alert
                .last_sent_at
                .map(|last| now - last >= period)
                .unwrap_or(true);
            if !due {
                continue;
            }

            // Listings taken offline since matching stay queued but unsent
            let rows = sqlx::query(
                r#"
                SELECT j.id, j.title, j.location
                FROM alert_matches m
                JOIN jobs j ON j.id = m.job_id
                WHERE m.alert_id = ? AND m.sent_at IS NULL
                  AND j.deleted_at IS NULL AND j.moderation_status = 'approved' AND j.status = 'active'
                  AND (j.deadline IS NULL OR j.deadline > ?)
                ORDER BY m.matched_at ASC
                "#,
            )
            .bind(alert.id)
            .bind(timestamp(now))
            .fetch_all(&self.db)
            .await?;
            if rows.is_empty() {
                continue;
            }

            let jobs = rows
                .iter()
                .map(|row| -> BoardResult<DigestJob> {
                    Ok(DigestJob {
                        job_id: JobId(row.try_get("id")?),
                        title: row.try_get("title")?,
                        location: row.try_get("location")?,
                    })
                })
                .collect::<BoardResult<Vec<_>>>()?;
            let job_ids: Vec<JobId> = jobs.iter().map(|job| job.job_id).collect();

            let event = NotificationEvent::JobAlertDigest {
                alert_id: alert.id,
                alert_name: alert.name.clone(),
                jobs,
            };
            self.notifier
                .dispatch_via(&recipient, &event, alert.method.channels())
                .await;

            let mut tx = self.db.begin().await?;
            for job_id in &job_ids {
                sqlx::query(
                    "UPDATE alert_matches SET sent_at = ? WHERE alert_id = ? AND job_id = ? AND sent_at IS NULL",
                )
                .bind(timestamp(now))
                .bind(alert.id)
                .bind(job_id)
                .execute(&mut *tx)
                .await?;
            }
            sqlx::query("UPDATE job_alerts SET last_sent_at = ? WHERE id = ?")
                .bind(timestamp(now))
                .bind(alert.id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            sent += 1;
        }

        if sent > 0 {
            info!(frequency = %frequency, sent, "alert digests sent");
        }
        Ok(sent)
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
