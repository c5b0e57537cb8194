use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outbound message template with `{{field}}` placeholders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: String,
    pub subject: String,
    pub content: String,
}

impl EmailTemplate {
    /// Default notice sent to builders when a new lead is routed to them
    pub fn lead_notification() -> Self {
        Self {
            id: "lead_notification".to_string(),
            subject: "New Exhibition Lead: {{projectName}} in {{location}}".to_string(),
            content: concat!(
                "Hello {{builderName}},\n\n",
                "A client is looking for a stand builder for {{projectName}}.\n\n",
                "Client: {{clientName}} ({{clientCompany}})\n",
                "Email: {{clientEmail}}\n",
                "Phone: {{clientPhone}}\n",
                "Location: {{location}}\n",
                "Event date: {{eventDate}}\n",
                "Stand size: {{standSize}}\n",
                "Budget: {{budget}}\n",
                "Match score: {{matchScore}}%\n\n",
                "View the lead: {{leadUrl}}\n",
            )
            .to_string(),
        }
    }
}

/// Replace every `{{key}}` with its field value
///
/// Whitespace inside the braces is ignored. Unknown keys and unterminated
/// placeholders are copied through untouched; substituted values are never
/// rescanned.
pub fn render(text: &str, fields: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match fields.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + end + 4]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
