// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Builder, BuilderContact, DeadLetter, DispatchResult, DispatchStatus, Lead, LeadPriority,
    LeadStatus, LeadView, MatchOptions, ScoredCandidate, ScoringWeights, SubscriptionPlan,
    MASK_TOKEN,
};
pub use requests::{SetActiveRequest, SubmitLeadRequest, UpdatePlanRequest, UpdateStatusRequest};
pub use responses::{
    BuilderInboxResponse, ErrorResponse, HealthResponse, RoutingAnalytics, RoutingOutcome,
    SubmitLeadResponse,
};
