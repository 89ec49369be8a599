/// Closed set of things a user can be notified about
use crate::{
    account::UserRole,
    board::{applications::ApplicationStatus, interviews::InterviewType},
    ids::{AlertId, ApplicationId, InterviewId, JobId, MessageId, UserId},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

text_enum! {
    /// Stable event identifier, used for preferences and stored notifications
    pub enum EventKind ("event kind") {
        Welcome => "welcome",
        ProfileCompleted => "profile_completed",
        JobApproved => "job_approved",
        JobRejected => "job_rejected",
        AccountBanned => "account_banned",
        AccountWarned => "account_warned",
        AccountReinstated => "account_reinstated",
        ApplicationReceived => "application_received",
        ApplicationStatusChanged => "application_status_changed",
        InterviewScheduled => "interview_scheduled",
        InterviewCancelled => "interview_cancelled",
        InterviewResponded => "interview_responded",
        JobAlertMatch => "job_alert_match",
        JobAlertDigest => "job_alert_digest",
        NewMessage => "new_message",
    }
}

/// One listing in a digest
#[derive(Debug, Clone, Serialize)]
pub struct DigestJob {
    pub job_id: JobId,
    pub title: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    Welcome {
        role: UserRole,
    },
    ProfileCompleted,
    JobApproved {
        job_id: JobId,
        title: String,
    },
    JobRejected {
        job_id: JobId,
        title: String,
        reason: String,
    },
    /// Ban or suspension; `until` is `None` for an open-ended ban
    AccountBanned {
        reason: String,
        until: Option<DateTime<Utc>>,
        suspended: bool,
    },
    AccountWarned {
        reason: String,
        warning_count: i64,
    },
    AccountReinstated,
    ApplicationReceived {
        application_id: ApplicationId,
        job_id: JobId,
        job_title: String,
        applicant_name: String,
    },
    ApplicationStatusChanged {
        application_id: ApplicationId,
        job_id: JobId,
        job_title: String,
        status: ApplicationStatus,
    },
    InterviewScheduled {
        interview_id: InterviewId,
        application_id: ApplicationId,
        job_title: String,
        scheduled_at: DateTime<Utc>,
        interview_type: InterviewType,
        rescheduled: bool,
    },
    InterviewCancelled {
        interview_id: InterviewId,
        application_id: ApplicationId,
        job_title: String,
        reason: Option<String>,
    },
    InterviewResponded {
        interview_id: InterviewId,
        application_id: ApplicationId,
        job_title: String,
        applicant_name: String,
        accepted: bool,
    },
    JobAlertMatch {
        alert_id: AlertId,
        alert_name: String,
        job_id: JobId,
        job_title: String,
        location: String,
    },
    JobAlertDigest {
        alert_id: AlertId,
        alert_name: String,
        jobs: Vec<DigestJob>,
    },
    NewMessage {
        message_id: MessageId,
        sender_id: UserId,
        sender_name: String,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            NotificationEvent::Welcome { .. } => EventKind::Welcome,
            NotificationEvent::ProfileCompleted => EventKind::ProfileCompleted,
            NotificationEvent::JobApproved { .. } => EventKind::JobApproved,
            NotificationEvent::JobRejected { .. } => EventKind::JobRejected,
            NotificationEvent::AccountBanned { .. } => EventKind::AccountBanned,
            NotificationEvent::AccountWarned { .. } => EventKind::AccountWarned,
            NotificationEvent::AccountReinstated => EventKind::AccountReinstated,
            NotificationEvent::ApplicationReceived { .. } => EventKind::ApplicationReceived,
            NotificationEvent::ApplicationStatusChanged { .. } => {
                EventKind::ApplicationStatusChanged
            }
            NotificationEvent::InterviewScheduled { .. } => EventKind::InterviewScheduled,
            NotificationEvent::InterviewCancelled { .. } => EventKind::InterviewCancelled,
            NotificationEvent::InterviewResponded { .. } => EventKind::InterviewResponded,
            NotificationEvent::JobAlertMatch { .. } => EventKind::JobAlertMatch,
            NotificationEvent::JobAlertDigest { .. } => EventKind::JobAlertDigest,
            NotificationEvent::NewMessage { .. } => EventKind::NewMessage,
        }
    }

    /// Ids a client needs to link the in-app record to its subject
    pub fn related_ids(&self) -> serde_json::Value {
        use serde_json::json;

        match self {
            NotificationEvent::Welcome { .. }
            | NotificationEvent::ProfileCompleted
            | NotificationEvent::AccountBanned { .. }
            | NotificationEvent::AccountWarned { .. }
            | NotificationEvent::AccountReinstated => json!({}),
            NotificationEvent::JobApproved { job_id, .. }
            | NotificationEvent::JobRejected { job_id, .. } => json!({ "job_id": job_id }),
            NotificationEvent::ApplicationReceived {
                application_id,
                job_id,
                ..
            }
            | NotificationEvent::ApplicationStatusChanged {
                application_id,
                job_id,
                ..
            } => json!({ "application_id": application_id, "job_id": job_id }),
            NotificationEvent::InterviewScheduled {
                interview_id,
                application_id,
                ..
            }
            | NotificationEvent::InterviewCancelled {
                interview_id,
                application_id,
                ..
            }
            | NotificationEvent::InterviewResponded {
                interview_id,
                application_id,
                ..
            } => json!({ "interview_id": interview_id, "application_id": application_id }),
            NotificationEvent::JobAlertMatch {
                alert_id, job_id, ..
            } => json!({ "alert_id": alert_id, "job_id": job_id }),
            NotificationEvent::JobAlertDigest { alert_id, jobs, .. } => json!({
                "alert_id": alert_id,
                "job_ids": jobs.iter().map(|j| j.job_id).collect::<Vec<_>>(),
            }),
            NotificationEvent::NewMessage {
                message_id,
                sender_id,
                ..
            } => json!({ "message_id": message_id, "sender_id": sender_id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings_are_stable() {
        let event = NotificationEvent::JobApproved {
            job_id: JobId(5),
            title: "Rust engineer".into(),
        };
        assert_eq!(event.kind().as_str(), "job_approved");
        assert_eq!(event.related_ids(), serde_json::json!({"job_id": 5}));
        assert_eq!(
            "interview_scheduled".parse::<EventKind>().unwrap(),
            EventKind::InterviewScheduled
        );
        assert_eq!(EventKind::ALL.len(), 15);
    }

    #[test]
    fn test_digest_related_ids() {
        let event = NotificationEvent::JobAlertDigest {
            alert_id: AlertId(3),
            alert_name: "Rust".into(),
            jobs: vec![
                DigestJob {
                    job_id: JobId(1),
                    title: "a".into(),
                    location: "x".into(),
                },
                DigestJob {
                    job_id: JobId(2),
                    title: "b".into(),
                    location: "y".into(),
                },
            ],
        };
        assert_eq!(
            event.related_ids(),
            serde_json::json!({"alert_id": 3, "job_ids": [1, 2]})
        );
    }
}
