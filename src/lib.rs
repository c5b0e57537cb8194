//! Stand Leads - lead distribution core for an exhibition stand builder marketplace
//!
//! Matches incoming quote requests to the stand builders serving the event
//! city, gates client contact details behind the builder's subscription plan,
//! and notifies matched builders with retrying delivery.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

// Re-export commonly used types
pub use crate::core::{can_access_details, redact, EventCatalog, Matcher};
pub use crate::models::{Builder, Lead, LeadStatus, LeadView, ScoringWeights, SubscriptionPlan};
pub use crate::services::{LeadRouter, RouteError};

use crate::config::{MailerKind, Settings};
use crate::services::{
    BuilderDirectory, Dispatcher, HttpMailer, JobRunner, LeadStore, LogMailer, Mailer, SendError,
};

/// Build the mailer selected in configuration
pub fn mailer_from_settings(settings: &Settings) -> Result<Arc<dyn Mailer>, SendError> {
    let mailer: Arc<dyn Mailer> = match settings.mailer.kind {
        MailerKind::Log => Arc::new(LogMailer),
        MailerKind::Http => Arc::new(HttpMailer::new(
            settings.mailer.endpoint.clone(),
            settings.mailer.api_key.clone(),
            settings.mailer.from.clone(),
            Duration::from_secs(settings.mailer.timeout_secs),
        )?),
    };

    Ok(mailer)
}

/// Wire a router over empty stores from configuration
pub fn router_from_settings(settings: &Settings, mailer: Arc<dyn Mailer>) -> LeadRouter {
    let matcher = Matcher::new(
        settings.matching.options(),
        ScoringWeights::from(&settings.scoring.weights),
        settings.matching.event_catalog(),
    );

    let dispatcher = Dispatcher::new(
        mailer,
        settings.dispatch.retry_policy(),
        settings.dispatch.app_url.clone(),
    );

    LeadRouter::new(
        Arc::new(LeadStore::new()),
        Arc::new(BuilderDirectory::new()),
        matcher,
        dispatcher,
        JobRunner::new(settings.jobs.max_parallel),
        chrono::Duration::hours(settings.jobs.stale_after_hours),
    )
}
