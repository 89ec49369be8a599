/// Moderation system
///
/// Account moderation, user reports and the append-only audit trail every
/// staff action is written to. Job review lives with the listings in
/// [`crate::board::jobs`] and records into the same trail.
pub mod audit;
pub mod moderation;
pub mod reports;

pub use audit::{AuditAction, AuditActionType, AuditEntry, AuditFilter, AuditLog};
pub use moderation::ModerationService;
pub use reports::{DashboardStats, Report, ReportManager, ReportStatus};
