use crate::models::{Builder, Lead, ScoringWeights, SubscriptionPlan};

/// Calculate a routing score (0-100) for a builder already matched to a lead
///
/// Scoring formula (default weights):
/// score = 50                              # base for any matched builder
///     + 20 explicit specialization fit   (or +10 for a generalist)
///     + 10 verified
///     + 10 enterprise plan
///     +  5 rating >= 4.5
///     + 10 no open leads                 (or +5 for at most two)
///     +  5 response rate >= 0.8
///     + 10 budget within 0.8..=1.2 of the builder's average project
///                                        (or +5 within 0.6..=1.5)
pub fn calculate_match_score(
    builder: &Builder,
    lead: &Lead,
    open_leads: usize,
    specialization_matched: bool,
    weights: &ScoringWeights,
) -> f64 {
    let mut score = weights.base;

    if specialization_matched {
        score += weights.specialization;
    } else if builder.specializations.is_empty() {
        score += weights.generalist;
    }

    if builder.verified {
        score += weights.verified;
    }

    if builder.subscription_plan == SubscriptionPlan::Enterprise {
        score += weights.premium;
    }

    if builder.rating >= 4.5 {
        score += weights.rating;
    }

    score += availability_points(open_leads, weights);

    if builder.response_rate >= 0.8 {
        score += weights.responsive;
    }

    score += budget_points(lead.estimated_value, builder.average_project_value, weights);

    score.clamp(0.0, 100.0)
}

#[inline]
fn availability_points(open_leads: usize, weights: &ScoringWeights) -> f64 {
    match open_leads {
        0 => weights.idle,
        1..=2 => weights.light_load,
        _ => 0.0,
    }
}

/// Closeness of the lead's budget to the builder's typical project
#[inline]
fn budget_points(estimated: Option<f64>, average: Option<f64>, weights: &ScoringWeights) -> f64 {
    let (Some(estimated), Some(average)) = (estimated, average) else {
        return 0.0;
    };
    if average <= 0.0 || estimated <= 0.0 {
        return 0.0;
    }

    let ratio = estimated / average;
    if (0.8..=1.2).contains(&ratio) {
        weights.budget_close
    } else if (0.6..=1.5).contains(&ratio) {
        weights.budget_near
    } else {
        0.0
    }
}
