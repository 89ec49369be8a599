/// Text for every event, as a mail and as an in-app record
use super::{events::EventKind, NotificationEvent, Recipient};
use crate::{
    error::{BoardError, BoardResult},
    mailer::{MailAction, MailMessage},
};
use chrono::{DateTime, Utc};

/// Database-record form of an event
#[derive(Debug, Clone, PartialEq)]
pub struct InAppRecord {
    pub kind: EventKind,
    pub message: String,
    pub related_ids: serde_json::Value,
}

fn when(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Render the mail for `event`
///
/// Fails when the recipient has no usable address.
pub fn render_mail(
    event: &NotificationEvent,
    recipient: &Recipient,
    base_url: &str,
) -> BoardResult<MailMessage> {
    if !recipient.email.contains('@') {
        return Err(BoardError::Delivery(format!(
            "User {} has no deliverable address",
            recipient.user_id
        )));
    }

    let base_url = base_url.trim_end_matches('/');
    let link = |label: &str, path: String| {
        Some(MailAction {
            label: label.to_string(),
            url: format!("{}{}", base_url, path),
        })
    };

    let (subject, lines, action) = match event {
        NotificationEvent::Welcome { role } => (
            "Welcome to the job board".to_string(),
            vec![format!(
                "Your {} account is ready.",
                role.as_str().replace('_', " ")
            )],
            link("Complete your profile", "/profile".to_string()),
        ),
        NotificationEvent::ProfileCompleted => (
            "Your profile is complete".to_string(),
            vec!["Employers can now see your full profile.".to_string()],
            None,
        ),
        NotificationEvent::JobApproved { job_id, title } => (
            "Your job listing was approved".to_string(),
            vec![format!("\"{}\" is now live.", title)],
            link("View listing", format!("/jobs/{}", job_id)),
        ),
        NotificationEvent::JobRejected {
            job_id,
            title,
            reason,
        } => (
            "Your job listing was not approved".to_string(),
            vec![
                format!("\"{}\" was rejected by a moderator.", title),
                format!("Reason: {}", reason),
                "Edit the listing to submit it for review again.".to_string(),
            ],
            link("Edit listing", format!("/employer/jobs/{}", job_id)),
        ),
        NotificationEvent::AccountBanned {
            reason,
            until,
            suspended,
        } => {
            let what = if *suspended { "suspended" } else { "banned" };
            let mut lines = vec![
                format!("Your account has been {}.", what),
                format!("Reason: {}", reason),
            ];
            match until {
                Some(until) => lines.push(format!("This lasts until {}.", when(until))),
                None => lines.push("This has no end date.".to_string()),
            }
            (format!("Your account has been {}", what), lines, None)
        }
        NotificationEvent::AccountWarned {
            reason,
            warning_count,
        } => (
            "A moderator has warned your account".to_string(),
            vec![
                format!("Reason: {}", reason),
                format!("This is warning number {}.", warning_count),
            ],
            None,
        ),
        NotificationEvent::AccountReinstated => (
            "Your account has been reinstated".to_string(),
            vec!["You have full access to your account again.".to_string()],
            None,
        ),
        NotificationEvent::ApplicationReceived {
            job_id,
            job_title,
            applicant_name,
            ..
        } => (
            format!("New application for {}", job_title),
            vec![format!("{} applied to \"{}\".", applicant_name, job_title)],
            link(
                "Review applications",
                format!("/employer/jobs/{}/applications", job_id),
            ),
        ),
        NotificationEvent::ApplicationStatusChanged {
            application_id,
            job_title,
            status,
            ..
        } => (
            format!("Update on your application for {}", job_title),
            vec![format!(
                "Your application is now: {}.",
                status.as_str().replace('_', " ")
            )],
            link("View application", format!("/applications/{}", application_id)),
        ),
        NotificationEvent::InterviewScheduled {
            application_id,
            job_title,
            scheduled_at,
            interview_type,
            rescheduled,
            ..
        } => {
            let subject = if *rescheduled {
                format!("Interview rescheduled: {}", job_title)
            } else {
                format!("Interview invitation: {}", job_title)
            };
            (
                subject,
                vec![format!(
                    "A {} interview is set for {}.",
                    interview_type.as_str().replace('_', " "),
                    when(scheduled_at)
                )],
                link("Respond", format!("/applications/{}", application_id)),
            )
        }
        NotificationEvent::InterviewCancelled {
            job_title, reason, ..
        } => {
            let mut lines = vec![format!("Your interview for \"{}\" was cancelled.", job_title)];
            if let Some(reason) = reason {
                lines.push(format!("Reason: {}", reason));
            }
            (format!("Interview cancelled: {}", job_title), lines, None)
        }
        NotificationEvent::InterviewResponded {
            application_id,
            job_title,
            applicant_name,
            accepted,
            ..
        } => {
            let verb = if *accepted { "accepted" } else { "declined" };
            (
                format!("Interview {} for {}", verb, job_title),
                vec![format!("{} {} the interview invitation.", applicant_name, verb)],
                link("View application", format!("/applications/{}", application_id)),
            )
        }
        NotificationEvent::JobAlertMatch {
            alert_name,
            job_id,
            job_title,
            location,
            ..
        } => (
            format!("New job matching \"{}\"", alert_name),
            vec![format!("{} in {}", job_title, location)],
            link("View listing", format!("/jobs/{}", job_id)),
        ),
        NotificationEvent::JobAlertDigest {
            alert_name, jobs, ..
        } => {
            let mut lines = vec![format!("{} new jobs match \"{}\":", jobs.len(), alert_name)];
            lines.extend(jobs.iter().map(|job| {
                format!(
                    "- {} in {} ({}/jobs/{})",
                    job.title, job.location, base_url, job.job_id
                )
            }));
            (format!("Your \"{}\" job digest", alert_name), lines, None)
        }
        NotificationEvent::NewMessage {
            sender_id,
            sender_name,
            ..
        } => (
            format!("New message from {}", sender_name),
            vec![format!("{} sent you a message.", sender_name)],
            link("Open conversation", format!("/messages/{}", sender_id)),
        ),
    };

    Ok(MailMessage {
        subject,
        greeting: format!("Hello {},", recipient.name),
        lines,
        action,
    })
}

/// Short single-line text for the in-app list
pub fn in_app(event: &NotificationEvent) -> InAppRecord {
    let message = match event {
        NotificationEvent::Welcome { .. } => "Welcome to the job board.".to_string(),
        NotificationEvent::ProfileCompleted => "Your profile is complete.".to_string(),
        NotificationEvent::JobApproved { title, .. } => {
            format!("Your job \"{}\" was approved and is live.", title)
        }
        NotificationEvent::JobRejected { title, reason, .. } => {
            format!("Your job \"{}\" was rejected: {}", title, reason)
        }
        NotificationEvent::AccountBanned {
            reason, suspended, ..
        } => {
            if *suspended {
                format!("Your account was suspended: {}", reason)
            } else {
                format!("Your account was banned: {}", reason)
            }
        }
        NotificationEvent::AccountWarned { reason, .. } => {
            format!("You received a warning: {}", reason)
        }
        NotificationEvent::AccountReinstated => "Your account has been reinstated.".to_string(),
        NotificationEvent::ApplicationReceived {
            job_title,
            applicant_name,
            ..
        } => format!("{} applied to \"{}\".", applicant_name, job_title),
        NotificationEvent::ApplicationStatusChanged {
            job_title, status, ..
        } => format!(
            "Your application for \"{}\" is now {}.",
            job_title,
            status.as_str().replace('_', " ")
        ),
        NotificationEvent::InterviewScheduled {
            job_title,
            scheduled_at,
            rescheduled,
            ..
        } => {
            if *rescheduled {
                format!(
                    "Your interview for \"{}\" moved to {}.",
                    job_title,
                    when(scheduled_at)
                )
            } else {
                format!(
                    "Interview for \"{}\" scheduled for {}.",
                    job_title,
                    when(scheduled_at)
                )
            }
        }
        NotificationEvent::InterviewCancelled { job_title, .. } => {
            format!("Your interview for \"{}\" was cancelled.", job_title)
        }
        NotificationEvent::InterviewResponded {
            job_title,
            applicant_name,
            accepted,
            ..
        } => format!(
            "{} {} the interview for \"{}\".",
            applicant_name,
            if *accepted { "accepted" } else { "declined" },
            job_title
        ),
        NotificationEvent::JobAlertMatch {
            alert_name,
            job_title,
            ..
        } => format!("New job for \"{}\": {}", alert_name, job_title),
        NotificationEvent::JobAlertDigest {
            alert_name, jobs, ..
        } => format!("{} new jobs match \"{}\".", jobs.len(), alert_name),
        NotificationEvent::NewMessage { sender_name, .. } => {
            format!("New message from {}.", sender_name)
        }
    };

    InAppRecord {
        kind: event.kind(),
        message,
        related_ids: event.related_ids(),
    }
}
