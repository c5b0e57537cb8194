use serde::{Deserialize, Serialize};

use crate::models::Builder;

/// Data-quality problems that keep a builder from receiving leads properly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditIssue {
    MissingContactEmail,
    NoServiceAreas,
    UnrecognizedPlan,
    ResponseRateOutOfRange,
    RatingOutOfRange,
}

impl AuditIssue {
    pub fn describe(&self) -> &'static str {
        match self {
            AuditIssue::MissingContactEmail => "missing contact email",
            AuditIssue::NoServiceAreas => "no service areas",
            AuditIssue::UnrecognizedPlan => "unrecognized subscription plan",
            AuditIssue::ResponseRateOutOfRange => "response rate outside 0..=1",
            AuditIssue::RatingOutOfRange => "rating outside 0..=5",
        }
    }
}

pub fn audit_builder(builder: &Builder) -> Vec<AuditIssue> {
    let mut issues = Vec::new();

    let has_email = builder
        .contact
        .email
        .as_deref()
        .map(str::trim)
        .is_some_and(|email| email.contains('@'));
    if !has_email {
        issues.push(AuditIssue::MissingContactEmail);
    }

    if builder.service_areas.iter().all(|area| area.trim().is_empty()) {
        issues.push(AuditIssue::NoServiceAreas);
    }

    if !builder.subscription_plan.is_recognized() {
        issues.push(AuditIssue::UnrecognizedPlan);
    }

    if !(0.0..=1.0).contains(&builder.response_rate) {
        issues.push(AuditIssue::ResponseRateOutOfRange);
    }

    if !(0.0..=5.0).contains(&builder.rating) {
        issues.push(AuditIssue::RatingOutOfRange);
    }

    issues
}

/// One-line summary used as a job outcome detail
pub fn summarize(issues: &[AuditIssue]) -> String {
    issues
        .iter()
        .map(AuditIssue::describe)
        .collect::<Vec<_>>()
        .join("; ")
}
