use crate::core::{catalog::EventCatalog, policy::max_open_leads};
use crate::models::{Builder, Lead};

/// Check if a builder declares the lead's city as a service area
///
/// Stage 1 of the matching pipeline. With `case_sensitive` off, both sides are
/// trimmed and lowercased before comparing.
#[inline]
pub fn serves_city(builder: &Builder, city: &str, case_sensitive: bool) -> bool {
    let city = city.trim();
    if city.is_empty() {
        return false;
    }

    if case_sensitive {
        return builder.service_areas.iter().any(|area| area.trim() == city);
    }

    let city = city.to_lowercase();
    builder
        .service_areas
        .iter()
        .any(|area| area.trim().to_lowercase() == city)
}

/// First specialization that explicitly fits the event, if any
///
/// A specialization fits when it is a case-insensitive substring of the event
/// name, or equals an industry the catalogue resolves for that name.
pub fn specialization_hit<'a>(
    builder: &'a Builder,
    event_name: &str,
    catalog: &EventCatalog,
) -> Option<&'a str> {
    let event = event_name.to_lowercase();
    let industries = catalog.industries_for(event_name);

    builder
        .specializations
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .find(|tag| {
            let tag_lower = tag.to_lowercase();
            event.contains(&tag_lower)
                || industries.iter().any(|industry| industry.to_lowercase() == tag_lower)
        })
}

/// Stage 2: generalists (no specializations) fit every event
#[inline]
pub fn fits_specialization(builder: &Builder, event_name: &str, catalog: &EventCatalog) -> bool {
    builder.specializations.is_empty() || specialization_hit(builder, event_name, catalog).is_some()
}

/// Combined matching predicate used for `matchedBuilderIds`
#[inline]
pub fn matches_lead(
    builder: &Builder,
    lead: &Lead,
    catalog: &EventCatalog,
    case_sensitive_cities: bool,
) -> bool {
    serves_city(builder, &lead.city, case_sensitive_cities)
        && fits_specialization(builder, &lead.event_name, catalog)
}

/// Stage 3: builder can still take on another open lead under its plan
#[inline]
pub fn within_capacity(builder: &Builder, open_leads: usize) -> bool {
    open_leads < max_open_leads(&builder.subscription_plan)
}
