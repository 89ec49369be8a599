/// Notification dispatch
///
/// Every event goes out on two independent channels: an in-app record in
/// `notifications` and a mail through the [`MailTransport`]. Delivery is
/// best effort per channel. A failed channel is logged and counted but
/// never fails the operation that raised the event.
pub mod events;
pub mod preferences;
pub mod store;
pub mod templates;

pub use events::{DigestJob, EventKind, NotificationEvent};
pub use preferences::{ChannelSet, NotificationPreferences, PreferenceStore};
pub use store::{Notification, NotificationFilter, NotificationStore};

use crate::{account::User, ids::UserId, mailer::MailTransport, metrics};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::{debug, warn};

/// Who an event is addressed to
#[derive(Debug, Clone)]
pub struct Recipient {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&User> for Recipient {
    fn from(user: &User) -> Self {
        Recipient {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Result of one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum ChannelOutcome {
    Delivered,
    /// Not selected, or the channel is not configured
    Skipped,
    Failed(String),
}

impl ChannelOutcome {
    fn label(&self) -> &'static str {
        match self {
            ChannelOutcome::Delivered => "delivered",
            ChannelOutcome::Skipped => "skipped",
            ChannelOutcome::Failed(_) => "failed",
        }
    }
}

/// Per-channel outcome of a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub mail: ChannelOutcome,
    pub in_app: ChannelOutcome,
}

impl DispatchReport {
    pub fn skipped() -> Self {
        Self {
            mail: ChannelOutcome::Skipped,
            in_app: ChannelOutcome::Skipped,
        }
    }
}

/// Notification dispatcher
pub struct Notifier {
    db: SqlitePool,
    mailer: Arc<dyn MailTransport>,
    preferences: PreferenceStore,
    store: NotificationStore,
    base_url: String,
}

impl Notifier {
    pub fn new(db: SqlitePool, mailer: Arc<dyn MailTransport>, base_url: impl Into<String>) -> Self {
        Self {
            preferences: PreferenceStore::new(db.clone()),
            store: NotificationStore::new(db.clone()),
            db,
            mailer,
            base_url: base_url.into(),
        }
    }

    /// Dispatch on the channels the recipient chose for this event kind
    pub async fn dispatch(&self, recipient: &Recipient, event: &NotificationEvent) -> DispatchReport {
        let channels = match self
            .preferences
            .channels_for(recipient.user_id, event.kind())
            .await
        {
            Ok(channels) => channels,
            Err(e) => {
                warn!(user_id = %recipient.user_id, error = %e, "could not load notification preferences, using defaults");
                ChannelSet::default_for(event.kind())
            }
        };

        self.dispatch_via(recipient, event, channels).await
    }

    /// Dispatch on an explicit channel set
    pub async fn dispatch_via(
        &self,
        recipient: &Recipient,
        event: &NotificationEvent,
        channels: ChannelSet,
    ) -> DispatchReport {
        let kind = event.kind();

        // The record is written first so a mail failure cannot block it
        let in_app = if channels.in_app {
            match self.store.insert(recipient.user_id, &templates::in_app(event)).await {
                Ok(_) => ChannelOutcome::Delivered,
                Err(e) => {
                    warn!(user_id = %recipient.user_id, kind = %kind, error = %e, "in-app notification failed");
                    ChannelOutcome::Failed(e.to_string())
                }
            }
        } else {
            ChannelOutcome::Skipped
        };

        let mail = if !channels.mail {
            ChannelOutcome::Skipped
        } else if !self.mailer.is_configured() {
            debug!(user_id = %recipient.user_id, kind = %kind, "mail not configured, skipping");
            ChannelOutcome::Skipped
        } else {
            let sent = match templates::render_mail(event, recipient, &self.base_url) {
                Ok(message) => self.mailer.send(&recipient.email, &message).await,
                Err(e) => Err(e),
            };
            match sent {
                Ok(()) => ChannelOutcome::Delivered,
                Err(e) => {
                    warn!(user_id = %recipient.user_id, kind = %kind, error = %e, "mail notification failed");
                    ChannelOutcome::Failed(e.to_string())
                }
            }
        };

        metrics::record_notification("in_app", in_app.label());
        metrics::record_notification("mail", mail.label());

        DispatchReport { mail, in_app }
    }

    /// Dispatch to a user by id
    ///
    /// Deleted or unknown users are skipped.
    pub async fn notify_user(&self, user_id: UserId, event: &NotificationEvent) -> DispatchReport {
        let row = sqlx::query("SELECT name, email FROM users WHERE id = ? AND deleted_at IS NULL")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await;

        let recipient = match row {
            Ok(Some(row)) => match (row.try_get("name"), row.try_get("email")) {
                (Ok(name), Ok(email)) => Recipient {
                    user_id,
                    name,
                    email,
                },
                _ => {
                    warn!(user_id = %user_id, "could not read recipient, skipping notification");
                    return DispatchReport::skipped();
                }
            },
            Ok(None) => {
                debug!(user_id = %user_id, kind = %event.kind(), "recipient gone, skipping notification");
                return DispatchReport::skipped();
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "could not load recipient, skipping notification");
                return DispatchReport::skipped();
            }
        };

        self.dispatch(&recipient, event).await
    }
}
