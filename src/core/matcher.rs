use std::collections::HashMap;

use crate::core::{
    catalog::EventCatalog,
    filters::{matches_lead, specialization_hit, within_capacity},
    policy::can_access_details,
    scoring::calculate_match_score,
};
use crate::models::{Builder, Lead, MatchOptions, ScoredCandidate, ScoringWeights};

/// Result of the routing selection
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub candidates: Vec<ScoredCandidate>,
    pub total_builders: usize,
    /// Builders passing the area and specialization checks, before capacity,
    /// activation and score cut-offs
    pub matched: usize,
}

/// Lead-to-builder matching orchestrator
///
/// # Pipeline Stages
/// 1. Service area check on the lead's city
/// 2. Specialization check against the event name
/// 3. Activation and plan capacity
/// 4. Scoring, threshold and ranking
#[derive(Debug, Clone)]
pub struct Matcher {
    options: MatchOptions,
    weights: ScoringWeights,
    catalog: EventCatalog,
}

impl Matcher {
    pub fn new(options: MatchOptions, weights: ScoringWeights, catalog: EventCatalog) -> Self {
        Self {
            options,
            weights,
            catalog,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            MatchOptions::default(),
            ScoringWeights::default(),
            EventCatalog::builtin(),
        )
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    /// Stages 1 and 2 for a single builder
    pub fn is_match(&self, lead: &Lead, builder: &Builder) -> bool {
        matches_lead(builder, lead, &self.catalog, self.options.case_sensitive_cities)
    }

    /// IDs of builders matched to a lead, in input order
    ///
    /// Pure: an empty directory yields an empty list, never an error.
    pub fn match_builders(&self, lead: &Lead, builders: &[Builder]) -> Vec<String> {
        builders
            .iter()
            .filter(|builder| self.is_match(lead, builder))
            .map(|builder| builder.id.clone())
            .collect()
    }

    /// Select and rank the builders a lead should be distributed to
    ///
    /// `open_leads` maps builder IDs to their current open lead count; missing
    /// entries count as zero.
    pub fn select(
        &self,
        lead: &Lead,
        builders: &[Builder],
        open_leads: &HashMap<String, usize>,
    ) -> MatchResult {
        let total_builders = builders.len();
        let mut matched = 0;

        let mut ranked: Vec<(&Builder, f64)> = builders
            .iter()
            // Stages 1 & 2: area + specialization
            .filter(|builder| self.is_match(lead, builder))
            .inspect(|_| matched += 1)
            // Stage 3: activation + capacity
            .filter(|builder| builder.is_active)
            .filter(|builder| {
                within_capacity(builder, open_leads.get(&builder.id).copied().unwrap_or(0))
            })
            // Stage 4: scoring
            .filter_map(|builder| {
                let load = open_leads.get(&builder.id).copied().unwrap_or(0);
                let hit = specialization_hit(builder, &lead.event_name, &self.catalog).is_some();
                let score = calculate_match_score(builder, lead, load, hit, &self.weights);

                (score >= self.options.min_notify_score).then_some((builder, score))
            })
            .collect();

        // Score desc, then plan tier, then rating; stable for full ties
        ranked.sort_by(|(a, a_score), (b, b_score)| {
            b_score
                .partial_cmp(a_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.subscription_plan.rank().cmp(&a.subscription_plan.rank()))
                .then_with(|| {
                    b.rating
                        .partial_cmp(&a.rating)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
        });

        ranked.truncate(self.options.max_builders_per_lead);

        let candidates = ranked
            .into_iter()
            .map(|(builder, score)| ScoredCandidate {
                builder_id: builder.id.clone(),
                company_name: builder.company_name.clone(),
                match_score: score,
                details_unlocked: can_access_details(builder),
            })
            .collect();

        MatchResult {
            candidates,
            total_builders,
            matched,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_defaults()
    }
}
