use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::TransitionError;
use crate::models::{Builder, DeadLetter, Lead, LeadStatus, SubscriptionPlan};

/// Errors that can occur when reading or writing leads and builders
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Lead not found: {0}")]
    LeadNotFound(String),

    #[error("Builder not found: {0}")]
    BuilderNotFound(String),

    #[error("Lead already exists: {0}")]
    DuplicateLead(String),

    #[error("Invalid status change: {0}")]
    Transition(#[from] TransitionError),
}

/// In-process lead store
///
/// Holds quote requests and the dead-letter log of notifications that could
/// not be delivered. Leads are never removed; closing them is the archive.
#[derive(Debug, Default)]
pub struct LeadStore {
    leads: RwLock<HashMap<String, Lead>>,
    dead_letters: RwLock<Vec<DeadLetter>>,
}

impl LeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, lead: Lead) -> Result<(), StoreError> {
        let mut leads = self.leads.write().await;
        if leads.contains_key(&lead.id) {
            return Err(StoreError::DuplicateLead(lead.id));
        }

        tracing::debug!("Stored lead {} ({})", lead.id, lead.location());
        leads.insert(lead.id.clone(), lead);
        Ok(())
    }

    pub async fn get(&self, lead_id: &str) -> Result<Lead, StoreError> {
        self.leads
            .read()
            .await
            .get(lead_id)
            .cloned()
            .ok_or_else(|| StoreError::LeadNotFound(lead_id.to_string()))
    }

    /// Mutate a lead in place under the write lock
    ///
    /// The closure sees the stored lead; if it returns an error the lead is
    /// left exactly as it was.
    pub async fn update<F, T>(&self, lead_id: &str, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Lead) -> Result<T, StoreError>,
    {
        let mut leads = self.leads.write().await;
        let lead = leads
            .get_mut(lead_id)
            .ok_or_else(|| StoreError::LeadNotFound(lead_id.to_string()))?;

        let mut draft = lead.clone();
        let value = f(&mut draft)?;
        *lead = draft;
        Ok(value)
    }

    /// All leads, newest first
    pub async fn list(&self) -> Vec<Lead> {
        let mut leads: Vec<Lead> = self.leads.read().await.values().cloned().collect();
        leads.sort_by(|a, b| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        leads
    }

    /// Open leads (`new` or `sent`) currently assigned to each builder
    pub async fn open_lead_counts(&self) -> HashMap<String, usize> {
        let leads = self.leads.read().await;
        let mut counts: HashMap<String, usize> = HashMap::new();

        for lead in leads.values().filter(|lead| lead.status.is_open()) {
            for builder_id in &lead.matched_builder_ids {
                *counts.entry(builder_id.clone()).or_insert(0) += 1;
            }
        }

        counts
    }

    /// Leads matched to a builder, newest first
    pub async fn leads_for_builder(&self, builder_id: &str) -> Vec<Lead> {
        self.list()
            .await
            .into_iter()
            .filter(|lead| lead.matched_builder_ids.iter().any(|id| id == builder_id))
            .collect()
    }

    /// Sent leads routed before `cutoff` that were never re-routed
    pub async fn stale_leads(&self, cutoff: DateTime<Utc>) -> Vec<Lead> {
        self.list()
            .await
            .into_iter()
            .filter(|lead| {
                lead.status == LeadStatus::Sent
                    && !lead.rerouted
                    && lead.routed_at.unwrap_or(lead.submitted_at) < cutoff
            })
            .collect()
    }

    pub async fn record_dead_letter(&self, letter: DeadLetter) {
        tracing::warn!(
            "Dead letter for lead {} -> builder {} after {} attempts: {}",
            letter.lead_id,
            letter.builder_id,
            letter.attempts,
            letter.error
        );
        self.dead_letters.write().await.push(letter);
    }

    /// Drop the dead letters a later successful delivery has made moot
    pub async fn resolve_dead_letters(&self, lead_id: &str, builder_id: &str) -> usize {
        let mut letters = self.dead_letters.write().await;
        let before = letters.len();
        letters.retain(|l| !(l.lead_id == lead_id && l.builder_id == builder_id));

        let resolved = before - letters.len();
        if resolved > 0 {
            tracing::info!(
                "Resolved {} dead letters for lead {} -> builder {}",
                resolved,
                lead_id,
                builder_id
            );
        }
        resolved
    }

    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.leads.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.leads.read().await.is_empty()
    }
}

/// In-process builder directory, kept in insertion order
#[derive(Debug, Default)]
pub struct BuilderDirectory {
    builders: RwLock<Vec<Builder>>,
}

impl BuilderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builders(builders: Vec<Builder>) -> Self {
        Self {
            builders: RwLock::new(builders),
        }
    }

    /// Insert or replace a builder; returns `true` when it was new
    pub async fn upsert(&self, builder: Builder) -> bool {
        let mut builders = self.builders.write().await;
        match builders.iter_mut().find(|b| b.id == builder.id) {
            Some(existing) => {
                *existing = builder;
                false
            }
            None => {
                builders.push(builder);
                true
            }
        }
    }

    pub async fn get(&self, builder_id: &str) -> Result<Builder, StoreError> {
        self.builders
            .read()
            .await
            .iter()
            .find(|b| b.id == builder_id)
            .cloned()
            .ok_or_else(|| StoreError::BuilderNotFound(builder_id.to_string()))
    }

    pub async fn list(&self) -> Vec<Builder> {
        self.builders.read().await.clone()
    }

    pub async fn set_plan(
        &self,
        builder_id: &str,
        plan: SubscriptionPlan,
    ) -> Result<Builder, StoreError> {
        self.modify(builder_id, |builder| {
            if !plan.is_recognized() {
                tracing::warn!(
                    "Builder {} given unrecognized plan {:?}; lead details stay locked",
                    builder_id,
                    plan.as_str()
                );
            }
            builder.subscription_plan = plan;
        })
        .await
    }

    pub async fn set_active(&self, builder_id: &str, is_active: bool) -> Result<Builder, StoreError> {
        self.modify(builder_id, |builder| builder.is_active = is_active).await
    }

    async fn modify<F>(&self, builder_id: &str, f: F) -> Result<Builder, StoreError>
    where
        F: FnOnce(&mut Builder),
    {
        let mut builders = self.builders.write().await;
        let builder = builders
            .iter_mut()
            .find(|b| b.id == builder_id)
            .ok_or_else(|| StoreError::BuilderNotFound(builder_id.to_string()))?;

        f(builder);
        Ok(builder.clone())
    }

    pub async fn len(&self) -> usize {
        self.builders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.builders.read().await.is_empty()
    }
}
