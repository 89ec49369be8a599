/// Job board domain: listings, applications, interviews, alerts and messages
pub mod alerts;
pub mod applications;
pub mod interviews;
pub mod jobs;
pub mod messages;

pub use alerts::{AlertManager, JobAlert};
pub use applications::{ApplicationManager, ApplicationStatus, JobApplication};
pub use interviews::{InterviewInvitation, InterviewManager, InterviewType};
pub use jobs::{Job, JobManager, JobStatus, ModerationStatus};
pub use messages::{Message, MessageManager};
