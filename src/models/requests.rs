use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::{Lead, LeadPriority, LeadStatus};

/// Quote request submitted from the public site
///
/// Older forms post `name`/`email`/`exhibitionName`/`message`; those are
/// accepted as aliases and normalized here so nothing downstream needs
/// fallback chains.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitLeadRequest {
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    #[serde(alias = "contactName", alias = "contactPerson", alias = "name")]
    pub client_name: String,
    #[validate(email)]
    #[serde(alias = "email", alias = "contactEmail")]
    pub client_email: String,
    #[serde(default, alias = "phone", alias = "contactPhone")]
    pub client_phone: Option<String>,
    #[serde(default, alias = "company")]
    pub company_name: Option<String>,
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    #[serde(alias = "exhibitionName", alias = "exhibition", alias = "tradeShowName")]
    pub event_name: String,
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 120), custom(function = "not_blank"))]
    #[serde(alias = "cityName")]
    pub city: String,
    #[validate(length(min = 1, max = 120), custom(function = "not_blank"))]
    #[serde(alias = "countryName")]
    pub country: String,
    #[serde(default, alias = "boothSize")]
    pub stand_size: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub estimated_value: Option<f64>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default, alias = "message", alias = "specialRequirements")]
    pub requirements: Option<String>,
    #[serde(default, alias = "urgency")]
    pub priority: Option<LeadPriority>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

impl SubmitLeadRequest {
    /// Priority given by the client, or derived from the timeline
    pub fn effective_priority(&self) -> LeadPriority {
        if let Some(priority) = self.priority {
            return priority;
        }

        match self.timeline.as_deref().map(str::to_lowercase) {
            Some(t) if t.contains("1-2 months") || t.contains("urgent") => LeadPriority::High,
            _ => LeadPriority::Medium,
        }
    }

    /// Build a fresh `new` lead from the request
    pub fn into_lead(self, id: String, submitted_at: DateTime<Utc>) -> Lead {
        let priority = self.effective_priority();
        let trimmed = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Lead {
            id,
            client_name: self.client_name.trim().to_string(),
            client_email: self.client_email.trim().to_string(),
            client_phone: trimmed(self.client_phone).unwrap_or_default(),
            company_name: trimmed(self.company_name).unwrap_or_default(),
            event_name: self.event_name.trim().to_string(),
            event_date: self.event_date,
            city: self.city.trim().to_string(),
            country: self.country.trim().to_string(),
            stand_size: trimmed(self.stand_size).unwrap_or_default(),
            budget: trimmed(self.budget).unwrap_or_default(),
            estimated_value: self.estimated_value,
            timeline: trimmed(self.timeline),
            requirements: trimmed(self.requirements),
            status: LeadStatus::New,
            submitted_at,
            matched_builder_ids: Vec::new(),
            priority,
            routed_at: None,
            rerouted: false,
        }
    }
}

/// Request to move a lead along its lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
}

/// Request to change a builder's subscription plan
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdatePlanRequest {
    #[validate(length(min = 1))]
    pub plan: String,
}

/// Request to toggle builder activation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveRequest {
    #[serde(alias = "is_active", rename = "isActive")]
    pub is_active: bool,
}
