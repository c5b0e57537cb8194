// Service exports
pub mod audit;
pub mod dispatcher;
pub mod jobs;
pub mod mailer;
pub mod router;
pub mod store;

pub use audit::{audit_builder, AuditIssue};
pub use dispatcher::{DispatchTarget, Dispatcher, RetryPolicy};
pub use jobs::{JobEvent, JobOutcome, JobReport, JobRunner, JobStatus};
pub use mailer::{HttpMailer, LogMailer, Mailer, SendError};
pub use router::{LeadRouter, RouteError};
pub use store::{BuilderDirectory, LeadStore, StoreError};
