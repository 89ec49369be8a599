/// Strongly typed entity identifiers and the tagged entity reference
use crate::error::{BoardError, BoardResult};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
                sqlx::Type,
            )]
            #[serde(transparent)]
            #[sqlx(transparent)]
            pub struct $name(pub i64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<i64> for $name {
                fn from(id: i64) -> Self {
                    Self(id)
                }
            }
        )+
    };
}

entity_id!(
    UserId,
    JobId,
    ApplicationId,
    InterviewId,
    ReportId,
    MessageId,
    AlertId,
    NotificationId,
    /// Row id in the moderator audit trail
    AuditEntryId,
);

/// Reference to any entity a report or audit entry can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Job(JobId),
    User(UserId),
    Application(ApplicationId),
    Report(ReportId),
    Message(MessageId),
}

impl EntityRef {
    pub fn kind(&self) -> &'static str {
        match self {
            EntityRef::Job(_) => "job",
            EntityRef::User(_) => "user",
            EntityRef::Application(_) => "application",
            EntityRef::Report(_) => "report",
            EntityRef::Message(_) => "message",
        }
    }

    pub fn raw_id(&self) -> i64 {
        match self {
            EntityRef::Job(id) => id.0,
            EntityRef::User(id) => id.0,
            EntityRef::Application(id) => id.0,
            EntityRef::Report(id) => id.0,
            EntityRef::Message(id) => id.0,
        }
    }

    /// Rebuild a reference from its stored `(kind, id)` columns
    pub fn from_parts(kind: &str, id: i64) -> BoardResult<Self> {
        match kind {
            "job" => Ok(EntityRef::Job(JobId(id))),
            "user" => Ok(EntityRef::User(UserId(id))),
            "application" => Ok(EntityRef::Application(ApplicationId(id))),
            "report" => Ok(EntityRef::Report(ReportId(id))),
            "message" => Ok(EntityRef::Message(MessageId(id))),
            other => Err(BoardError::Internal(format!("Unknown entity kind: {}", other))),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.raw_id())
    }
}
