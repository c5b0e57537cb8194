use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::domain::{DispatchResult, LeadStatus, LeadView, ScoredCandidate};

/// What happened when a lead was routed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingOutcome {
    pub lead_id: String,
    pub status: LeadStatus,
    pub matched_builders: Vec<ScoredCandidate>,
    pub notifications_sent: usize,
    pub dispatches: Vec<DispatchResult>,
}

impl RoutingOutcome {
    pub fn failures(&self) -> usize {
        self.dispatches.iter().filter(|d| !d.is_sent()).count()
    }
}

/// Response for the quote submission endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitLeadResponse {
    pub lead_id: String,
    pub routing: RoutingOutcome,
}

/// Leads visible to one builder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderInboxResponse {
    pub builder_id: String,
    pub plan: String,
    pub details_unlocked: bool,
    pub leads: Vec<LeadView>,
}

/// Distribution figures for the admin overview
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingAnalytics {
    pub total_leads: usize,
    pub routed_leads: usize,
    pub total_assignments: usize,
    pub leads_by_status: BTreeMap<String, usize>,
    pub builder_utilization: BTreeMap<String, usize>,
    pub dead_letters: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
