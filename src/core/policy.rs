use crate::models::{Builder, Lead, LeadView, SubscriptionPlan, MASK_TOKEN};

/// Whether a plan unlocks client name, email and phone
///
/// | plan                        | details |
/// |-----------------------------|---------|
/// | free                        | no      |
/// | professional (basic)        | yes     |
/// | enterprise (growth, pro)    | yes     |
/// | anything else               | no      |
#[inline]
pub fn plan_unlocks_details(plan: &SubscriptionPlan) -> bool {
    matches!(plan, SubscriptionPlan::Professional | SubscriptionPlan::Enterprise)
}

/// Whether this builder may see a matched lead's PII
#[inline]
pub fn can_access_details(builder: &Builder) -> bool {
    plan_unlocks_details(&builder.subscription_plan)
}

/// Characters of the client's message shown without detail access
pub const REQUIREMENTS_PREVIEW_CHARS: usize = 100;

/// Project a lead into the view a builder is allowed to receive
///
/// Gated fields are replaced with a fixed-length mask regardless of their
/// original length, so nothing about the true value leaks. The free-text
/// requirements are scrubbed of the client's contact details and cut to a
/// short preview.
pub fn redact(lead: &Lead, allowed: bool) -> LeadView {
    let gate = |value: &str| {
        if allowed {
            value.to_string()
        } else {
            MASK_TOKEN.to_string()
        }
    };

    LeadView {
        id: lead.id.clone(),
        client_name: gate(&lead.client_name),
        client_email: gate(&lead.client_email),
        client_phone: gate(&lead.client_phone),
        company_name: lead.company_name.clone(),
        event_name: lead.event_name.clone(),
        event_date: lead.event_date,
        city: lead.city.clone(),
        country: lead.country.clone(),
        stand_size: lead.stand_size.clone(),
        budget: lead.budget.clone(),
        requirements: if allowed {
            lead.requirements.clone()
        } else {
            lead.requirements
                .as_deref()
                .map(|text| preview_requirements(text, lead))
        },
        status: lead.status,
        priority: lead.priority,
        submitted_at: lead.submitted_at,
        details_unlocked: allowed,
    }
}

fn preview_requirements(text: &str, lead: &Lead) -> String {
    let mut scrubbed = text.to_string();
    for secret in [&lead.client_email, &lead.client_phone, &lead.client_name] {
        let secret = secret.trim();
        if !secret.is_empty() {
            scrubbed = scrubbed.replace(secret, MASK_TOKEN);
        }
    }

    if scrubbed.chars().count() <= REQUIREMENTS_PREVIEW_CHARS {
        return scrubbed;
    }

    let mut preview: String = scrubbed.chars().take(REQUIREMENTS_PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}

/// Shortcut for `redact(lead, can_access_details(builder))`
pub fn view_for(lead: &Lead, builder: &Builder) -> LeadView {
    redact(lead, can_access_details(builder))
}

/// Open leads a builder may hold at once
pub fn max_open_leads(plan: &SubscriptionPlan) -> usize {
    match plan {
        SubscriptionPlan::Free => 5,
        SubscriptionPlan::Professional => 20,
        SubscriptionPlan::Enterprise => 100,
        SubscriptionPlan::Unrecognized(_) => 0,
    }
}
