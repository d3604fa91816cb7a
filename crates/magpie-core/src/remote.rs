use std::sync::Arc;

/// Keyword and override lists driving [`RemoteClassifier`].
///
/// `Default` supplies the built-in lists; configuration may extend
/// `company_overrides` before the classifier is constructed.
#[derive(Debug, Clone)]
pub struct RemoteRules {
    /// Companies that hire remote-first; substring match on company name.
    pub company_overrides: Vec<String>,
    /// Phrases that settle the question on their own.
    pub strong_keywords: Vec<String>,
    /// Phrases that only count in combination; two distinct hits required.
    pub weak_keywords: Vec<String>,
    /// Tokens that mark a location field as remote.
    pub location_tokens: Vec<String>,
}

impl Default for RemoteRules {
    fn default() -> Self {
        Self {
            company_overrides: vec![
                "gitlab".to_string(),
                "automattic".to_string(),
                "zapier".to_string(),
                "buffer".to_string(),
            ],
            strong_keywords: vec![
                "100% remote".to_string(),
                "fully remote".to_string(),
                "distributed".to_string(),
                "work from anywhere".to_string(),
            ],
            weak_keywords: vec![
                "work from home".to_string(),
                "wfh".to_string(),
                "remote friendly".to_string(),
                "telecommute".to_string(),
                "virtual".to_string(),
            ],
            location_tokens: vec![
                "remote".to_string(),
                "anywhere".to_string(),
                "worldwide".to_string(),
                "global".to_string(),
                "distributed".to_string(),
            ],
        }
    }
}

impl RemoteRules {
    /// Appends extra company overrides from configuration.
    pub fn with_company_overrides<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.company_overrides.extend(extra.into_iter().map(Into::into));
        self
    }
}

// Signal weights for the confidence score. Tuned so that one strong
// signal dominates and weak signals need company or location support.
const WEIGHT_COMPANY: f64 = 1.0;
const WEIGHT_STRONG: f64 = 0.9;
const WEIGHT_WEAK: f64 = 0.3;
const WEIGHT_LOCATION: f64 = 0.6;
const WEIGHT_TITLE: f64 = 0.5;

/// Multi-signal remote/on-site classifier.
///
/// Signals are checked in a fixed priority order and the first definitive
/// one wins. Missing fields are treated as empty; classification never
/// fails. Cheap to clone, the rules are shared.
#[derive(Debug, Clone)]
pub struct RemoteClassifier {
    rules: Arc<RemoteRules>,
}

impl Default for RemoteClassifier {
    fn default() -> Self {
        Self::new(RemoteRules::default())
    }
}

impl RemoteClassifier {
    pub fn new(mut rules: RemoteRules) -> Self {
        // Lower-case every list once so classification is allocation-light.
        for list in [
            &mut rules.company_overrides,
            &mut rules.strong_keywords,
            &mut rules.weak_keywords,
            &mut rules.location_tokens,
        ] {
            for entry in list.iter_mut() {
                *entry = entry.to_lowercase();
            }
        }
        Self {
            rules: Arc::new(rules),
        }
    }

    /// Decides whether a posting is remote.
    pub fn is_remote(
        &self,
        title: &str,
        company: &str,
        description: &str,
        location: Option<&str>,
    ) -> bool {
        let title = title.to_lowercase();
        let company = company.to_lowercase();
        let location = location.unwrap_or_default().to_lowercase();
        let haystack = format!("{} {} {}", title, description.to_lowercase(), location);

        if self.matches_company(&company) {
            return true;
        }
        if self.rules.strong_keywords.iter().any(|k| haystack.contains(k.as_str())) {
            return true;
        }
        if self.weak_hits(&haystack) >= 2 {
            return true;
        }
        if self.rules.location_tokens.iter().any(|t| location.contains(t.as_str())) {
            return true;
        }
        if title.contains("remote") || title.contains("wfh") {
            return true;
        }
        false
    }

    /// Weighted confidence in [0, 1] from the same signals.
    pub fn confidence(
        &self,
        title: &str,
        company: &str,
        description: &str,
        location: Option<&str>,
    ) -> f64 {
        let title = title.to_lowercase();
        let company = company.to_lowercase();
        let location = location.unwrap_or_default().to_lowercase();
        let haystack = format!("{} {} {}", title, description.to_lowercase(), location);

        let mut score = 0.0;
        if self.matches_company(&company) {
            score += WEIGHT_COMPANY;
        }
        if self.rules.strong_keywords.iter().any(|k| haystack.contains(k.as_str())) {
            score += WEIGHT_STRONG;
        }
        score += WEIGHT_WEAK * self.weak_hits(&haystack) as f64;
        if self.rules.location_tokens.iter().any(|t| location.contains(t.as_str())) {
            score += WEIGHT_LOCATION;
        }
        if title.contains("remote") || title.contains("wfh") {
            score += WEIGHT_TITLE;
        }
        score.min(1.0)
    }

    fn matches_company(&self, company: &str) -> bool {
        !company.is_empty()
            && self
                .rules
                .company_overrides
                .iter()
                .any(|c| company.contains(c.as_str()))
    }

    fn weak_hits(&self, haystack: &str) -> usize {
        self.rules
            .weak_keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .count()
    }
}
