// Core algorithm exports
pub mod catalog;
pub mod filters;
pub mod lifecycle;
pub mod matcher;
pub mod policy;
pub mod scoring;
pub mod template;

pub use catalog::EventCatalog;
pub use filters::{fits_specialization, matches_lead, serves_city, specialization_hit, within_capacity};
pub use lifecycle::TransitionError;
pub use matcher::{MatchResult, Matcher};
pub use policy::{can_access_details, max_open_leads, plan_unlocks_details, redact, view_for};
pub use scoring::calculate_match_score;
pub use template::{render, EmailTemplate};
