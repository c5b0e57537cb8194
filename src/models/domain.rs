use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mask written in place of gated client fields
pub const MASK_TOKEN: &str = "••••••••";

/// Quote request submitted by a prospective client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub client_name: String,
    pub client_email: String,
    #[serde(default)]
    pub client_phone: String,
    #[serde(default)]
    pub company_name: String,
    pub event_name: String,
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub stand_size: String,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub estimated_value: Option<f64>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub status: LeadStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub matched_builder_ids: Vec<String>,
    #[serde(default)]
    pub priority: LeadPriority,
    #[serde(default)]
    pub routed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rerouted: bool,
}

impl Lead {
    /// "City, Country" label used in notifications
    pub fn location(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Sent,
    Responded,
    Closed,
}

impl LeadStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "new" => Some(Self::New),
            "sent" => Some(Self::Sent),
            "responded" => Some(Self::Responded),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Sent => "sent",
            Self::Responded => "responded",
            Self::Closed => "closed",
        }
    }

    /// Leads still waiting on a builder; these count against plan capacity
    pub fn is_open(&self) -> bool {
        matches!(self, Self::New | Self::Sent)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Builder subscription tier
///
/// The marketplace historically used two naming schemes for the same tiers
/// (`free/professional/enterprise` and `free/basic/growth/pro`). Both parse
/// into this enum; anything else is kept verbatim as `Unrecognized` so the
/// access policy can fall back to no access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Professional,
    Enterprise,
    Unrecognized(String),
}

impl SubscriptionPlan {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "free" => Self::Free,
            "professional" | "basic" => Self::Professional,
            "enterprise" | "growth" | "pro" => Self::Enterprise,
            _ => Self::Unrecognized(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Free => "free",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Ordering weight used when ranking equally scored builders
    pub fn rank(&self) -> u8 {
        match self {
            Self::Enterprise => 3,
            Self::Professional => 2,
            Self::Free => 1,
            Self::Unrecognized(_) => 0,
        }
    }
}

impl From<String> for SubscriptionPlan {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<SubscriptionPlan> for String {
    fn from(plan: SubscriptionPlan) -> Self {
        match plan {
            SubscriptionPlan::Unrecognized(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuilderContact {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Stand builder profile from the directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Builder {
    #[serde(default)]
    pub id: String,
    pub company_name: String,
    #[serde(default)]
    pub contact: BuilderContact,
    #[serde(default)]
    pub headquarters_city: String,
    #[serde(default)]
    pub headquarters_country: String,
    #[serde(default)]
    pub service_areas: Vec<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub subscription_plan: SubscriptionPlan,
    #[serde(default)]
    pub response_rate: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub average_project_value: Option<f64>,
}

fn default_true() -> bool {
    true
}

/// Builder-facing projection of a lead with client PII gated by plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadView {
    pub id: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub company_name: String,
    pub event_name: String,
    pub event_date: Option<NaiveDate>,
    pub city: String,
    pub country: String,
    pub stand_size: String,
    pub budget: String,
    pub requirements: Option<String>,
    pub status: LeadStatus,
    pub priority: LeadPriority,
    pub submitted_at: DateTime<Utc>,
    pub details_unlocked: bool,
}

/// Builder selected for a lead, with its routing score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub builder_id: String,
    pub company_name: String,
    pub match_score: f64,
    pub details_unlocked: bool,
}

/// Point weights for the routing score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub base: f64,
    pub specialization: f64,
    pub generalist: f64,
    pub verified: f64,
    pub premium: f64,
    pub rating: f64,
    pub idle: f64,
    pub light_load: f64,
    pub responsive: f64,
    pub budget_close: f64,
    pub budget_near: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 50.0,
            specialization: 20.0,
            generalist: 10.0,
            verified: 10.0,
            premium: 10.0,
            rating: 5.0,
            idle: 10.0,
            light_load: 5.0,
            responsive: 5.0,
            budget_close: 10.0,
            budget_near: 5.0,
        }
    }
}

/// Knobs for the matching pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    pub case_sensitive_cities: bool,
    pub max_builders_per_lead: usize,
    pub min_notify_score: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            case_sensitive_cities: false,
            max_builders_per_lead: 8,
            min_notify_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Sent,
    Failed,
}

/// Outcome of notifying one builder about one lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub builder_id: String,
    pub recipient: Option<String>,
    pub status: DispatchStatus,
    pub attempts: u32,
    pub details_unlocked: bool,
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn is_sent(&self) -> bool {
        self.status == DispatchStatus::Sent
    }
}

/// Notification that exhausted its retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub lead_id: String,
    pub builder_id: String,
    pub recipient: Option<String>,
    pub error: String,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}
