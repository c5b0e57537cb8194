use chrono::{Duration, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::{can_access_details, view_for, EmailTemplate, Matcher};
use crate::models::{
    Builder, BuilderInboxResponse, DeadLetter, Lead, LeadStatus, LeadView, RoutingAnalytics,
    RoutingOutcome, SubmitLeadRequest,
};
use crate::services::audit::{audit_builder, summarize};
use crate::services::dispatcher::{DispatchTarget, Dispatcher};
use crate::services::jobs::{JobEvent, JobReport, JobRunner};
use crate::services::store::{BuilderDirectory, LeadStore, StoreError};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Lead {lead_id} is {status} and cannot be routed")]
    NotRoutable { lead_id: String, status: LeadStatus },

    #[error("Unknown lead status: {0}")]
    UnknownStatus(String),

    #[error("Lead {lead_id} was not distributed to builder {builder_id}")]
    NotAssigned { lead_id: String, builder_id: String },
}

/// Distributes leads to builders and keeps their lifecycle consistent
pub struct LeadRouter {
    leads: Arc<LeadStore>,
    builders: Arc<BuilderDirectory>,
    matcher: Matcher,
    dispatcher: Dispatcher,
    template: EmailTemplate,
    jobs: JobRunner,
    stale_after: Duration,
}

impl LeadRouter {
    pub fn new(
        leads: Arc<LeadStore>,
        builders: Arc<BuilderDirectory>,
        matcher: Matcher,
        dispatcher: Dispatcher,
        jobs: JobRunner,
        stale_after: Duration,
    ) -> Self {
        Self {
            leads,
            builders,
            matcher,
            dispatcher,
            template: EmailTemplate::lead_notification(),
            jobs,
            stale_after,
        }
    }

    pub fn leads(&self) -> &Arc<LeadStore> {
        &self.leads
    }

    pub fn builders(&self) -> &Arc<BuilderDirectory> {
        &self.builders
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Store a new quote request and route it straight away
    pub async fn submit(&self, request: SubmitLeadRequest) -> Result<RoutingOutcome, RouteError> {
        let lead = request.into_lead(uuid::Uuid::new_v4().to_string(), Utc::now());
        let lead_id = lead.id.clone();

        tracing::info!(
            "New lead {} for {} in {} ({:?} priority)",
            lead_id,
            lead.event_name,
            lead.location(),
            lead.priority
        );

        self.leads.insert(lead).await?;
        self.route(&lead_id).await
    }

    /// Match, record and notify builders for one lead
    ///
    /// Only builders that were actually notified are recorded on the lead, so
    /// a builder whose delivery failed is tried again on the next pass while
    /// builders notified earlier are not notified twice. The lead moves
    /// `new -> sent` once at least one notification goes out.
    pub async fn route(&self, lead_id: &str) -> Result<RoutingOutcome, RouteError> {
        let lead = self.leads.get(lead_id).await?;
        if !lead.status.is_open() {
            return Err(RouteError::NotRoutable {
                lead_id: lead.id,
                status: lead.status,
            });
        }

        let builders = self.builders.list().await;

        // The lead's own assignments must not count against its builders
        let mut load = self.leads.open_lead_counts().await;
        for builder_id in &lead.matched_builder_ids {
            if let Some(count) = load.get_mut(builder_id) {
                *count = count.saturating_sub(1);
            }
        }

        let result = self.matcher.select(&lead, &builders, &load);

        tracing::debug!(
            "Lead {}: {} of {} builders matched, {} selected",
            lead.id,
            result.matched,
            result.total_builders,
            result.candidates.len()
        );

        let already: HashSet<&str> = lead.matched_builder_ids.iter().map(String::as_str).collect();
        let targets: Vec<DispatchTarget<'_>> = result
            .candidates
            .iter()
            .filter(|candidate| !already.contains(candidate.builder_id.as_str()))
            .filter_map(|candidate| {
                builders
                    .iter()
                    .find(|b| b.id == candidate.builder_id)
                    .map(|builder| DispatchTarget {
                        builder,
                        match_score: candidate.match_score,
                    })
            })
            .collect();

        let dispatches = self.dispatcher.notify(&lead, &targets, &self.template).await;

        let notified: Vec<String> = dispatches
            .iter()
            .filter(|d| d.is_sent())
            .map(|d| d.builder_id.clone())
            .collect();

        for builder_id in &notified {
            self.leads.resolve_dead_letters(&lead.id, builder_id).await;
        }

        for failure in dispatches.iter().filter(|d| !d.is_sent()) {
            self.leads
                .record_dead_letter(DeadLetter {
                    lead_id: lead.id.clone(),
                    builder_id: failure.builder_id.clone(),
                    recipient: failure.recipient.clone(),
                    error: failure.error.clone().unwrap_or_default(),
                    attempts: failure.attempts,
                    failed_at: Utc::now(),
                })
                .await;
        }

        let notifications_sent = notified.len();

        let status = self
            .leads
            .update(lead_id, |stored| {
                for builder_id in notified {
                    if !stored.matched_builder_ids.contains(&builder_id) {
                        stored.matched_builder_ids.push(builder_id);
                    }
                }
                stored.routed_at = Some(Utc::now());

                if notifications_sent > 0 && stored.status == LeadStatus::New {
                    stored.advance(LeadStatus::Sent)?;
                }
                Ok(stored.status)
            })
            .await?;

        tracing::info!(
            "Routed lead {} to {} builders ({} notified, {} failed)",
            lead_id,
            result.candidates.len(),
            notifications_sent,
            dispatches.len() - notifications_sent
        );

        Ok(RoutingOutcome {
            lead_id: lead_id.to_string(),
            status,
            matched_builders: result.candidates,
            notifications_sent,
            dispatches,
        })
    }

    pub async fn update_status(&self, lead_id: &str, raw: &str) -> Result<Lead, RouteError> {
        let to = LeadStatus::parse(raw).ok_or_else(|| RouteError::UnknownStatus(raw.to_string()))?;

        let lead = self
            .leads
            .update(lead_id, |lead| {
                lead.advance(to)?;
                Ok(lead.clone())
            })
            .await?;

        tracing::info!("Lead {} is now {}", lead_id, lead.status);
        Ok(lead)
    }

    /// Leads matched to a builder, redacted to what the builder's plan allows
    pub async fn builder_inbox(&self, builder_id: &str) -> Result<BuilderInboxResponse, RouteError> {
        let builder = self.builders.get(builder_id).await?;
        let leads = self.leads.leads_for_builder(builder_id).await;
        let views: Vec<_> = leads.iter().map(|lead| view_for(lead, &builder)).collect();

        Ok(BuilderInboxResponse {
            builder_id: builder.id.clone(),
            plan: builder.subscription_plan.to_string(),
            details_unlocked: can_access_details(&builder),
            leads: views,
        })
    }

    /// One lead as a specific builder is allowed to see it
    pub async fn builder_lead_view(
        &self,
        builder_id: &str,
        lead_id: &str,
    ) -> Result<LeadView, RouteError> {
        let builder = self.builders.get(builder_id).await?;
        let lead = self.leads.get(lead_id).await?;

        if !lead.matched_builder_ids.iter().any(|id| id == builder_id) {
            return Err(RouteError::NotAssigned {
                lead_id: lead.id,
                builder_id: builder.id,
            });
        }

        Ok(view_for(&lead, &builder))
    }

    pub async fn analytics(&self) -> RoutingAnalytics {
        let leads = self.leads.list().await;
        let builders = self.builders.list().await;
        let load = self.leads.open_lead_counts().await;

        let mut leads_by_status = BTreeMap::new();
        for lead in &leads {
            *leads_by_status.entry(lead.status.to_string()).or_insert(0) += 1;
        }

        let builder_utilization = builders
            .iter()
            .map(|b| (b.id.clone(), load.get(&b.id).copied().unwrap_or(0)))
            .collect();

        RoutingAnalytics {
            total_leads: leads.len(),
            routed_leads: leads.iter().filter(|l| l.routed_at.is_some()).count(),
            total_assignments: leads.iter().map(|l| l.matched_builder_ids.len()).sum(),
            leads_by_status,
            builder_utilization,
            dead_letters: self.leads.dead_letters().await.len(),
        }
    }

    /// Check every builder record for data problems
    ///
    /// Builders with findings are reported as failed items.
    pub async fn audit_builders(&self, events: Option<UnboundedSender<JobEvent>>) -> JobReport {
        let items: Vec<(String, Builder)> = self
            .builders
            .list()
            .await
            .into_iter()
            .map(|builder| (builder.id.clone(), builder))
            .collect();

        self.jobs
            .run(
                "builder-audit",
                items,
                |builder: Builder| async move {
                    let issues = audit_builder(&builder);
                    if issues.is_empty() {
                        Ok("ok".to_string())
                    } else {
                        Err(summarize(&issues))
                    }
                },
                events,
            )
            .await
    }

    /// Route sent leads nobody responded to within the stale window again
    ///
    /// Each lead is re-routed at most once; it is flagged before the pass
    /// starts so a failed pass is not retried forever.
    pub async fn reroute_stale(
        self: &Arc<Self>,
        events: Option<UnboundedSender<JobEvent>>,
    ) -> JobReport {
        let cutoff = Utc::now() - self.stale_after;
        let stale = self.leads.stale_leads(cutoff).await;

        let mut items = Vec::with_capacity(stale.len());
        for lead in stale {
            let flagged = self
                .leads
                .update(&lead.id, |stored| {
                    stored.rerouted = true;
                    Ok(())
                })
                .await;

            match flagged {
                Ok(()) => items.push((lead.id.clone(), lead.id)),
                Err(e) => tracing::warn!("Skipping stale lead {}: {}", lead.id, e),
            }
        }

        let router = Arc::clone(self);
        self.jobs
            .run(
                "stale-reroute",
                items,
                move |lead_id: String| {
                    let router = Arc::clone(&router);
                    async move {
                        router
                            .route(&lead_id)
                            .await
                            .map(|outcome| {
                                format!("{} additional builders notified", outcome.notifications_sent)
                            })
                            .map_err(|e| e.to_string())
                    }
                },
                events,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BuilderContact, LeadPriority, SubscriptionPlan};
    use crate::services::dispatcher::RetryPolicy;
    use crate::services::mailer::{LogMailer, Mailer, SendError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration as StdDuration;

    struct DownMailer;

    #[async_trait]
    impl Mailer for DownMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), SendError> {
            Err(SendError::Rejected {
                status: 503,
                body: "down".to_string(),
            })
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    fn create_builder(id: &str, city: &str, plan: SubscriptionPlan) -> Builder {
        Builder {
            id: id.to_string(),
            company_name: format!("Builder {}", id),
            contact: BuilderContact {
                email: Some(format!("{}@builders.test", id)),
                phone: None,
            },
            headquarters_city: city.to_string(),
            headquarters_country: "Germany".to_string(),
            service_areas: vec![city.to_string()],
            specializations: vec![],
            subscription_plan: plan,
            response_rate: 0.5,
            is_active: true,
            verified: false,
            rating: 4.0,
            average_project_value: None,
        }
    }

    fn create_lead(id: &str, city: &str) -> Lead {
        Lead {
            id: id.to_string(),
            client_name: "Jane Client".to_string(),
            client_email: "jane@client.test".to_string(),
            client_phone: "+49 30 1234".to_string(),
            company_name: "Client GmbH".to_string(),
            event_name: "IFA".to_string(),
            event_date: None,
            city: city.to_string(),
            country: "Germany".to_string(),
            stand_size: "50 sqm".to_string(),
            budget: "€20,000".to_string(),
            estimated_value: Some(20000.0),
            timeline: None,
            requirements: None,
            status: LeadStatus::New,
            submitted_at: Utc::now(),
            matched_builder_ids: vec![],
            priority: LeadPriority::Medium,
            routed_at: None,
            rerouted: false,
        }
    }

    fn router_with(mailer: Arc<dyn Mailer>, builders: Vec<Builder>) -> Arc<LeadRouter> {
        let dispatcher = Dispatcher::new(
            mailer,
            RetryPolicy {
                max_attempts: 2,
                backoff: StdDuration::from_millis(1),
            },
            "https://stands.test".to_string(),
        );

        Arc::new(LeadRouter::new(
            Arc::new(LeadStore::new()),
            Arc::new(BuilderDirectory::with_builders(builders)),
            Matcher::with_defaults(),
            dispatcher,
            JobRunner::new(2),
            Duration::hours(48),
        ))
    }

    #[tokio::test]
    async fn test_route_marks_lead_sent() {
        let router = router_with(
            Arc::new(LogMailer),
            vec![
                create_builder("berlin", "Berlin", SubscriptionPlan::Free),
                create_builder("paris", "Paris", SubscriptionPlan::Enterprise),
            ],
        );
        router.leads().insert(create_lead("l1", "Berlin")).await.unwrap();

        let outcome = router.route("l1").await.unwrap();

        assert_eq!(outcome.status, LeadStatus::Sent);
        assert_eq!(outcome.notifications_sent, 1);
        assert_eq!(outcome.matched_builders.len(), 1);

        let lead = router.leads().get("l1").await.unwrap();
        assert_eq!(lead.matched_builder_ids, vec!["berlin"]);
        assert!(lead.routed_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_lead_new_and_dead_letters() {
        let router = router_with(
            Arc::new(DownMailer),
            vec![create_builder("berlin", "Berlin", SubscriptionPlan::Free)],
        );
        router.leads().insert(create_lead("l1", "Berlin")).await.unwrap();

        let outcome = router.route("l1").await.unwrap();

        assert_eq!(outcome.status, LeadStatus::New);
        assert_eq!(outcome.failures(), 1);

        let letters = router.leads().dead_letters().await;
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].builder_id, "berlin");
        assert_eq!(letters[0].attempts, 2);
    }

    /// Fails the first `failures` sends, then delivers
    struct FlakyMailer {
        failures: AtomicU32,
    }

    #[async_trait]
    impl Mailer for FlakyMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), SendError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(SendError::Rejected {
                    status: 503,
                    body: "down".to_string(),
                });
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_failed_builder_retried_on_next_route() {
        let router = router_with(
            Arc::new(FlakyMailer {
                failures: AtomicU32::new(2),
            }),
            vec![create_builder("b", "Berlin", SubscriptionPlan::Free)],
        );
        router.leads().insert(create_lead("l1", "Berlin")).await.unwrap();

        let first = router.route("l1").await.unwrap();
        assert_eq!(first.notifications_sent, 0);
        assert_eq!(first.status, LeadStatus::New);
        assert!(router.leads().get("l1").await.unwrap().matched_builder_ids.is_empty());
        assert_eq!(router.leads().dead_letters().await.len(), 1);

        let second = router.route("l1").await.unwrap();
        assert_eq!(second.notifications_sent, 1);
        assert_eq!(second.status, LeadStatus::Sent);

        let lead = router.leads().get("l1").await.unwrap();
        assert_eq!(lead.matched_builder_ids, vec!["b"]);
        assert!(router.leads().dead_letters().await.is_empty());
    }

    #[tokio::test]
    async fn test_second_route_does_not_renotify() {
        let router = router_with(
            Arc::new(LogMailer),
            vec![create_builder("berlin", "Berlin", SubscriptionPlan::Professional)],
        );
        router.leads().insert(create_lead("l1", "Berlin")).await.unwrap();

        router.route("l1").await.unwrap();
        let again = router.route("l1").await.unwrap();

        assert_eq!(again.notifications_sent, 0);
        assert_eq!(again.matched_builders.len(), 1);
        let lead = router.leads().get("l1").await.unwrap();
        assert_eq!(lead.matched_builder_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_lead_not_routable() {
        let router = router_with(Arc::new(LogMailer), vec![]);
        let mut lead = create_lead("l1", "Berlin");
        lead.status = LeadStatus::Closed;
        router.leads().insert(lead).await.unwrap();

        assert!(matches!(
            router.route("l1").await,
            Err(RouteError::NotRoutable { .. })
        ));
        assert!(matches!(
            router.update_status("l1", "sent").await,
            Err(RouteError::Store(StoreError::Transition(_)))
        ));
    }

    #[tokio::test]
    async fn test_update_status_unknown_value() {
        let router = router_with(Arc::new(LogMailer), vec![]);
        router.leads().insert(create_lead("l1", "Berlin")).await.unwrap();

        assert!(matches!(
            router.update_status("l1", "archived").await,
            Err(RouteError::UnknownStatus(_))
        ));
        assert!(matches!(
            router.update_status("l1", "closed").await,
            Err(RouteError::Store(StoreError::Transition(_)))
        ));
        let lead = router.update_status("l1", "sent").await.unwrap();
        assert_eq!(lead.status, LeadStatus::Sent);
    }

    #[tokio::test]
    async fn test_inbox_redacts_per_plan() {
        let router = router_with(
            Arc::new(LogMailer),
            vec![
                create_builder("free", "Berlin", SubscriptionPlan::Free),
                create_builder("pro", "Berlin", SubscriptionPlan::Professional),
            ],
        );
        router.leads().insert(create_lead("l1", "Berlin")).await.unwrap();
        router.route("l1").await.unwrap();

        let free = router.builder_inbox("free").await.unwrap();
        assert!(!free.details_unlocked);
        assert_ne!(free.leads[0].client_email, "jane@client.test");

        let pro = router.builder_inbox("pro").await.unwrap();
        assert!(pro.details_unlocked);
        assert_eq!(pro.leads[0].client_email, "jane@client.test");

        let view = router.builder_lead_view("free", "l1").await.unwrap();
        assert_eq!(view.client_phone, crate::models::MASK_TOKEN);
    }

    #[tokio::test]
    async fn test_lead_view_requires_assignment() {
        let router = router_with(
            Arc::new(LogMailer),
            vec![
                create_builder("berlin", "Berlin", SubscriptionPlan::Enterprise),
                create_builder("paris", "Paris", SubscriptionPlan::Enterprise),
            ],
        );
        router.leads().insert(create_lead("l1", "Berlin")).await.unwrap();
        router.route("l1").await.unwrap();

        assert!(matches!(
            router.builder_lead_view("paris", "l1").await,
            Err(RouteError::NotAssigned { .. })
        ));
    }

    #[tokio::test]
    async fn test_analytics_counts() {
        let router = router_with(
            Arc::new(LogMailer),
            vec![
                create_builder("a", "Berlin", SubscriptionPlan::Free),
                create_builder("b", "Munich", SubscriptionPlan::Free),
            ],
        );
        router.leads().insert(create_lead("l1", "Berlin")).await.unwrap();
        router.leads().insert(create_lead("l2", "Hamburg")).await.unwrap();
        router.route("l1").await.unwrap();

        let stats = router.analytics().await;
        assert_eq!(stats.total_leads, 2);
        assert_eq!(stats.routed_leads, 1);
        assert_eq!(stats.total_assignments, 1);
        assert_eq!(stats.leads_by_status.get("sent"), Some(&1));
        assert_eq!(stats.leads_by_status.get("new"), Some(&1));
        assert_eq!(stats.builder_utilization.get("a"), Some(&1));
        assert_eq!(stats.builder_utilization.get("b"), Some(&0));
    }

    #[tokio::test]
    async fn test_reroute_stale_runs_once() {
        let router = router_with(
            Arc::new(LogMailer),
            vec![create_builder("a", "Berlin", SubscriptionPlan::Free)],
        );
        let mut lead = create_lead("l1", "Berlin");
        lead.status = LeadStatus::Sent;
        lead.routed_at = Some(Utc::now() - Duration::hours(72));
        router.leads().insert(lead).await.unwrap();

        let report = router.reroute_stale(None).await;
        assert_eq!(report.total, 1);
        assert_eq!(report.completed, 1);
        assert!(router.leads().get("l1").await.unwrap().rerouted);

        let second = router.reroute_stale(None).await;
        assert_eq!(second.total, 0);
    }

    #[tokio::test]
    async fn test_audit_reports_problem_builders() {
        let mut broken = create_builder("broken", "Berlin", SubscriptionPlan::Free);
        broken.contact.email = None;
        let router = router_with(
            Arc::new(LogMailer),
            vec![create_builder("ok", "Berlin", SubscriptionPlan::Free), broken],
        );

        let report = router.audit_builders(None).await;
        assert_eq!(report.total, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.outcomes[1].item_id, "broken");
        assert!(report.outcomes[1].detail.contains("missing contact email"));
    }
}
