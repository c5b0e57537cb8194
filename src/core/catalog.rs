/// Trade show keyword to industry lookup
///
/// Event names rarely spell out their industry ("CES 2025", "Gulfood"), so the
/// specialization check also consults this table. Keywords match whole words of
/// the event name, case-insensitively; multi-word keywords must appear as a
/// contiguous run.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    entries: Vec<(Vec<String>, String)>,
}

impl EventCatalog {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(keyword, industry)| (tokenize(keyword.as_ref()), industry.into()))
            .filter(|(tokens, _)| !tokens.is_empty())
            .collect();

        Self { entries }
    }

    /// Major international shows the marketplace sees most leads for
    pub fn builtin() -> Self {
        Self::new([
            ("CES", "Technology"),
            ("GITEX", "Technology"),
            ("MWC", "Telecommunications"),
            ("Mobile World Congress", "Telecommunications"),
            ("Hannover Messe", "Industrial"),
            ("IAA", "Automotive"),
            ("Automechanika", "Automotive"),
            ("Arab Health", "Healthcare"),
            ("Medica", "Healthcare"),
            ("Gulfood", "Food & Beverage"),
            ("SIAL", "Food & Beverage"),
            ("ISE", "Audio Visual"),
            ("EuroShop", "Retail"),
            ("Bauma", "Construction"),
        ])
    }

    /// Industries whose keyword appears in the event name
    pub fn industries_for(&self, event_name: &str) -> Vec<&str> {
        let words = tokenize(event_name);
        let mut found: Vec<&str> = Vec::new();

        for (keyword, industry) in &self.entries {
            let hit = words
                .windows(keyword.len())
                .any(|window| window == keyword.as_slice());
            if hit && !found.contains(&industry.as_str()) {
                found.push(industry);
            }
        }

        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}
