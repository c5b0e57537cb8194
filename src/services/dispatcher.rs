use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{policy::can_access_details, policy::redact, render, EmailTemplate};
use crate::models::{Builder, DispatchResult, DispatchStatus, Lead, LeadView};
use crate::services::mailer::{Mailer, SendError};

/// Delivery attempts per builder notification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff * 2u32.saturating_pow(attempt.saturating_sub(2))
    }
}

/// A matched builder about to be notified
#[derive(Debug, Clone, Copy)]
pub struct DispatchTarget<'a> {
    pub builder: &'a Builder,
    pub match_score: f64,
}

/// Sends lead notifications to builders
///
/// Merge fields always come from the builder's `LeadView`, never the raw lead,
/// so a free-plan builder's email cannot carry client contact details no
/// matter what the template asks for.
pub struct Dispatcher {
    mailer: Arc<dyn Mailer>,
    retry: RetryPolicy,
    app_url: String,
}

impl Dispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, retry: RetryPolicy, app_url: String) -> Self {
        Self {
            mailer,
            retry,
            app_url,
        }
    }

    /// Dashboard link for a lead
    pub fn lead_url(&self, lead_id: &str) -> String {
        format!(
            "{}/builder/dashboard?tab=leads&leadId={}",
            self.app_url.trim_end_matches('/'),
            urlencoding::encode(lead_id)
        )
    }

    /// Template fields for one builder
    pub fn merge_fields(
        &self,
        view: &LeadView,
        builder: &Builder,
        match_score: f64,
    ) -> BTreeMap<String, String> {
        let text_or = |value: &str, fallback: &str| {
            if value.trim().is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        };

        let mut fields = BTreeMap::new();
        fields.insert("builderName".to_string(), builder.company_name.clone());
        fields.insert("projectName".to_string(), view.event_name.clone());
        fields.insert("clientName".to_string(), view.client_name.clone());
        fields.insert("clientEmail".to_string(), view.client_email.clone());
        fields.insert("clientPhone".to_string(), text_or(&view.client_phone, "Not provided"));
        fields.insert("clientCompany".to_string(), text_or(&view.company_name, "Not specified"));
        fields.insert("location".to_string(), format!("{}, {}", view.city, view.country));
        fields.insert("budget".to_string(), text_or(&view.budget, "Not specified"));
        fields.insert(
            "eventDate".to_string(),
            view.event_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "TBD".to_string()),
        );
        fields.insert("standSize".to_string(), text_or(&view.stand_size, "Standard"));
        fields.insert("matchScore".to_string(), format!("{:.0}", match_score));
        fields.insert("leadUrl".to_string(), self.lead_url(&view.id));
        fields
    }

    /// Notify each target about the lead, in order
    ///
    /// Every target yields exactly one `DispatchResult`; failed sends are
    /// reported, not dropped.
    pub async fn notify(
        &self,
        lead: &Lead,
        targets: &[DispatchTarget<'_>],
        template: &EmailTemplate,
    ) -> Vec<DispatchResult> {
        let mut results = Vec::with_capacity(targets.len());

        for target in targets {
            let builder = target.builder;
            let allowed = can_access_details(builder);

            let recipient = builder
                .contact
                .email
                .as_deref()
                .map(str::trim)
                .filter(|email| !email.is_empty());

            let Some(recipient) = recipient else {
                tracing::warn!("Builder {} has no contact email, skipping lead {}", builder.id, lead.id);
                results.push(DispatchResult {
                    builder_id: builder.id.clone(),
                    recipient: None,
                    status: DispatchStatus::Failed,
                    attempts: 0,
                    details_unlocked: allowed,
                    error: Some("builder has no contact email".to_string()),
                });
                continue;
            };

            let view = redact(lead, allowed);
            let fields = self.merge_fields(&view, builder, target.match_score);
            let subject = render(&template.subject, &fields);
            let body = render(&template.content, &fields);

            let (outcome, attempts) = self.send_with_retry(recipient, &subject, &body).await;

            let result = match outcome {
                Ok(()) => {
                    tracing::info!(
                        "Notified builder {} about lead {} (details {})",
                        builder.id,
                        lead.id,
                        if allowed { "unlocked" } else { "masked" }
                    );
                    DispatchResult {
                        builder_id: builder.id.clone(),
                        recipient: Some(recipient.to_string()),
                        status: DispatchStatus::Sent,
                        attempts,
                        details_unlocked: allowed,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to notify builder {} about lead {} after {} attempts: {}",
                        builder.id,
                        lead.id,
                        attempts,
                        e
                    );
                    DispatchResult {
                        builder_id: builder.id.clone(),
                        recipient: Some(recipient.to_string()),
                        status: DispatchStatus::Failed,
                        attempts,
                        details_unlocked: allowed,
                        error: Some(e.to_string()),
                    }
                }
            };

            results.push(result);
        }

        results
    }

    async fn send_with_retry(&self, to: &str, subject: &str, body: &str) -> (Result<(), SendError>, u32) {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.mailer.send(to, subject, body).await {
                Ok(()) => return (Ok(()), attempt),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    attempt += 1;
                    let delay = self.retry.delay_before(attempt);
                    tracing::warn!("Send to {} failed ({}), retrying in {:?}", to, e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return (Err(e), attempt),
            }
        }
    }
}
