/// Per-user channel selection for each event kind
use super::events::EventKind;
use crate::{
    db::parse_column,
    error::BoardResult,
    ids::UserId,
};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

/// Channels a single dispatch goes out on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSet {
    pub mail: bool,
    pub in_app: bool,
}

impl ChannelSet {
    pub const BOTH: ChannelSet = ChannelSet {
        mail: true,
        in_app: true,
    };

    /// Channels used when the user has not chosen
    ///
    /// Messages are read in the inbox, so they do not mail by default.
    pub fn default_for(kind: EventKind) -> Self {
        match kind {
            EventKind::NewMessage => ChannelSet {
                mail: false,
                in_app: true,
            },
            _ => ChannelSet::BOTH,
        }
    }
}

/// The resolved preference table of one user
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPreferences {
    pub user_id: UserId,
    pub channels: BTreeMap<String, ChannelSet>,
}

impl NotificationPreferences {
    pub fn channels_for(&self, kind: EventKind) -> ChannelSet {
        self.channels
            .get(kind.as_str())
            .copied()
            .unwrap_or_else(|| ChannelSet::default_for(kind))
    }
}

/// Persistence for `notification_preferences`
#[derive(Clone)]
pub struct PreferenceStore {
    db: SqlitePool,
}

impl PreferenceStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Every event kind with its effective channels
    pub async fn load(&self, user_id: UserId) -> BoardResult<NotificationPreferences> {
        let mut channels: BTreeMap<String, ChannelSet> = EventKind::ALL
            .iter()
            .map(|kind| (kind.as_str().to_string(), ChannelSet::default_for(*kind)))
            .collect();

        let rows = sqlx::query(
            "SELECT event_kind, mail, in_app FROM notification_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        for row in rows {
            let kind: EventKind = parse_column(&row, "event_kind")?;
            channels.insert(
                kind.as_str().to_string(),
                ChannelSet {
                    mail: row.try_get("mail")?,
                    in_app: row.try_get("in_app")?,
                },
            );
        }

        Ok(NotificationPreferences { user_id, channels })
    }

    /// Effective channels for one event kind
    pub async fn channels_for(&self, user_id: UserId, kind: EventKind) -> BoardResult<ChannelSet> {
        let row = sqlx::query(
            "SELECT mail, in_app FROM notification_preferences WHERE user_id = ? AND event_kind = ?",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(ChannelSet {
                mail: row.try_get("mail")?,
                in_app: row.try_get("in_app")?,
            }),
            None => Ok(ChannelSet::default_for(kind)),
        }
    }

    pub async fn set(&self, user_id: UserId, kind: EventKind, channels: ChannelSet) -> BoardResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_preferences (user_id, event_kind, mail, in_app)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id, event_kind) DO UPDATE SET mail = excluded.mail, in_app = excluded.in_app
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(channels.mail)
        .bind(channels.in_app)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
