use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;

/// Job domain catalogue.
///
/// Declaration order is the tie-break order: when two domains score the
/// same, the one declared first wins. `Ord` follows declaration order so
/// per-domain maps iterate the same way.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Domain {
    #[serde(rename = "DevOps")]
    DevOps,
    #[serde(rename = "Cloud/AWS")]
    CloudAws,
    #[serde(rename = "Azure")]
    Azure,
    #[serde(rename = "GCP")]
    Gcp,
    #[serde(rename = "Java")]
    Java,
    #[serde(rename = "Python")]
    Python,
    #[serde(rename = "React")]
    React,
    #[serde(rename = "Full Stack")]
    FullStack,
    #[serde(rename = "Android")]
    Android,
    #[serde(rename = "iOS")]
    Ios,
    #[serde(rename = "Backend")]
    Backend,
    #[serde(rename = "Frontend")]
    Frontend,
    #[serde(rename = "Data/ML")]
    DataMl,
    #[serde(rename = "PowerBI")]
    PowerBi,
    #[serde(rename = "Tableau")]
    Tableau,
    #[serde(rename = "QA")]
    Qa,
    #[serde(rename = "PM")]
    Pm,
    #[serde(rename = "SAP")]
    Sap,
    #[serde(rename = "Security")]
    Security,
    #[serde(rename = "Other")]
    #[default]
    Other,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::DevOps => "DevOps",
            Domain::CloudAws => "Cloud/AWS",
            Domain::Azure => "Azure",
            Domain::Gcp => "GCP",
            Domain::Java => "Java",
            Domain::Python => "Python",
            Domain::React => "React",
            Domain::FullStack => "Full Stack",
            Domain::Android => "Android",
            Domain::Ios => "iOS",
            Domain::Backend => "Backend",
            Domain::Frontend => "Frontend",
            Domain::DataMl => "Data/ML",
            Domain::PowerBi => "PowerBI",
            Domain::Tableau => "Tableau",
            Domain::Qa => "QA",
            Domain::Pm => "PM",
            Domain::Sap => "SAP",
            Domain::Security => "Security",
            Domain::Other => "Other",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Domain {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CATALOGUE
            .iter()
            .map(|(domain, _)| *domain)
            .chain(std::iter::once(Domain::Other))
            .find(|domain| domain.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ScrapeError::Parse(format!("unknown domain: {s}")))
    }
}

/// Keyword catalogue, one entry per classifiable domain, in tie-break
/// order. `Other` has no keywords; it is the zero-score fallback.
const CATALOGUE: &[(Domain, &[&str])] = &[
    (
        Domain::DevOps,
        &[
            "devops",
            "dev ops",
            "infrastructure",
            "deployment",
            "ci/cd",
            "docker",
            "kubernetes",
            "k8s",
            "ansible",
            "terraform",
            "jenkins",
            "pipeline",
            "automation",
            "sre",
            "site reliability",
            "monitoring",
            "observability",
            "prometheus",
            "grafana",
            "helm",
            "microservices infrastructure",
        ],
    ),
    (
        Domain::CloudAws,
        &[
            "aws",
            "amazon web services",
            "ec2",
            "s3",
            "lambda",
            "cloudformation",
            "cloud architect",
            "cloud engineer",
            "aws devops",
            "aws developer",
            "serverless",
            "cloudwatch",
        ],
    ),
    (
        Domain::Azure,
        &[
            "azure",
            "microsoft azure",
            "azure devops",
            "azure architect",
            "azure developer",
            "azure cloud",
            "office 365",
            "power platform",
            "azure functions",
        ],
    ),
    (
        Domain::Gcp,
        &[
            "gcp",
            "google cloud",
            "google cloud platform",
            "gke",
            "cloud run",
            "bigquery",
            "gcp engineer",
            "gcp architect",
            "firebase",
        ],
    ),
    (
        Domain::Java,
        &[
            "java",
            "spring",
            "spring boot",
            "hibernate",
            "maven",
            "gradle",
            "jvm",
            "scala",
            "kotlin",
            "microservices java",
            "java developer",
            "java engineer",
        ],
    ),
    (
        Domain::Python,
        &[
            "python",
            "django",
            "flask",
            "fastapi",
            "pandas",
            "numpy",
            "python developer",
            "python engineer",
            "python backend",
            "pytest",
        ],
    ),
    (
        Domain::React,
        &[
            "react",
            "reactjs",
            "react.js",
            "next.js",
            "nextjs",
            "redux",
            "react native",
            "react developer",
            "react engineer",
            "frontend react",
        ],
    ),
    (
        Domain::FullStack,
        &[
            "full stack",
            "fullstack",
            "full-stack",
            "mern",
            "mean",
            "lamp",
            "javascript developer",
            "web developer",
            "frontend backend",
            "end to end developer",
        ],
    ),
    (
        Domain::Android,
        &[
            "android",
            "android developer",
            "kotlin android",
            "java android",
            "android engineer",
            "mobile android",
            "android app",
            "flutter",
            "react native",
        ],
    ),
    (
        Domain::Ios,
        &[
            "ios",
            "ios developer",
            "swift",
            "objective-c",
            "iphone",
            "ipad",
            "ios engineer",
            "mobile ios",
            "ios app development",
        ],
    ),
    (
        Domain::Backend,
        &[
            "backend",
            "back-end",
            "api",
            "server",
            "database",
            "sql",
            "microservices",
            "rest",
            "graphql",
            "node.js",
            "nodejs",
            "go",
            "rust",
            "c#",
            ".net",
            "ruby",
            "php",
            "backend developer",
            "server-side",
            "backend engineer",
        ],
    ),
    (
        Domain::Frontend,
        &[
            "frontend",
            "front-end",
            "vue",
            "vuejs",
            "angular",
            "angularjs",
            "javascript",
            "typescript",
            "html",
            "css",
            "scss",
            "sass",
            "ui",
            "user interface",
            "web developer",
            "frontend developer",
            "svelte",
            "ember",
            "webpack",
            "vite",
        ],
    ),
    (
        Domain::DataMl,
        &[
            "data scientist",
            "data science",
            "machine learning",
            "ml",
            "ai",
            "artificial intelligence",
            "data engineer",
            "data analyst",
            "python data",
            "tensorflow",
            "pytorch",
            "pandas",
            "numpy",
            "sql data",
            "etl",
            "data pipeline",
            "analytics",
            "big data",
            "spark",
            "hadoop",
            "kafka",
            "airflow",
            "snowflake",
        ],
    ),
    (
        Domain::PowerBi,
        &[
            "power bi",
            "powerbi",
            "power platform",
            "dax",
            "power query",
            "microsoft bi",
            "business intelligence",
            "data visualization",
            "reporting analyst",
        ],
    ),
    (
        Domain::Tableau,
        &[
            "tableau",
            "tableau developer",
            "data visualization",
            "dashboard",
            "analytics",
            "business intelligence",
            "tableau analyst",
        ],
    ),
    (
        Domain::Qa,
        &[
            "qa",
            "quality assurance",
            "test",
            "testing",
            "automation testing",
            "selenium",
            "cypress",
            "jest",
            "qa engineer",
            "test engineer",
            "quality engineer",
            "sdet",
            "test automation",
            "manual testing",
        ],
    ),
    (
        Domain::Pm,
        &[
            "product manager",
            "project manager",
            "program manager",
            "scrum master",
            "product owner",
            "agile",
            "pm",
            "product management",
            "project management",
            "technical program manager",
            "engineering manager",
        ],
    ),
    (
        Domain::Sap,
        &[
            "sap",
            "sap consultant",
            "sap developer",
            "sap analyst",
            "sap implementation",
            "sap fico",
            "sap mm",
            "sap sd",
            "sap hana",
            "sap s/4hana",
        ],
    ),
    (
        Domain::Security,
        &[
            "security",
            "cybersecurity",
            "information security",
            "security engineer",
            "security analyst",
            "penetration testing",
            "security architect",
            "devsecops",
        ],
    ),
];

/// Title weight relative to description occurrences.
const TITLE_WEIGHT: usize = 5;

/// Keyword-based domain classifier over the fixed catalogue.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainClassifier;

impl DomainClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Picks the best-scoring domain for a posting, `Other` when nothing
    /// matches.
    ///
    /// Score per domain is `5 × title occurrences + description
    /// occurrences`, case-insensitive substring counting. Ties resolve to
    /// the earlier catalogue entry via strictly-greater comparison.
    pub fn classify(&self, title: &str, description: &str) -> Domain {
        let title = title.to_lowercase();
        let description = description.to_lowercase();

        let mut best = Domain::Other;
        let mut best_score = 0usize;
        for (domain, keywords) in CATALOGUE {
            let score: usize = keywords
                .iter()
                .map(|k| TITLE_WEIGHT * title.matches(k).count() + description.matches(k).count())
                .sum();
            if score > best_score {
                best = *domain;
                best_score = score;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_keyword_outweighs_description() {
        let classifier = DomainClassifier::new();
        let domain = classifier.classify(
            "DevOps Engineer",
            "Some python scripting, mostly python tooling",
        );
        assert_eq!(domain, Domain::DevOps);
    }

    #[test]
    fn test_python_posting() {
        let classifier = DomainClassifier::new();
        let domain = classifier.classify(
            "Senior Python Developer",
            "Django and FastAPI experience required, pytest for testing",
        );
        assert_eq!(domain, Domain::Python);
    }

    #[test]
    fn test_no_match_defaults_to_other() {
        let classifier = DomainClassifier::new();
        assert_eq!(classifier.classify("Chief Happiness Officer", ""), Domain::Other);
    }

    #[test]
    fn test_empty_input_defaults_to_other() {
        let classifier = DomainClassifier::new();
        assert_eq!(classifier.classify("", ""), Domain::Other);
    }

    #[test]
    fn test_tie_resolves_to_earlier_catalogue_entry() {
        // "kotlin" scores for Java, "flutter" for Android; 5 points each.
        let classifier = DomainClassifier::new();
        assert_eq!(classifier.classify("Kotlin Flutter", ""), Domain::Java);
    }

    #[test]
    fn test_occurrences_count_not_presence() {
        // One title hit apiece, but the description repeats tableau.
        let classifier = DomainClassifier::new();
        let domain = classifier.classify(
            "Dashboard Analyst",
            "Tableau dashboards, tableau reporting, tableau server administration",
        );
        assert_eq!(domain, Domain::Tableau);
    }

    #[test]
    fn test_domain_serializes_with_display_name() {
        let json = serde_json::to_string(&Domain::CloudAws).unwrap();
        assert_eq!(json, r#""Cloud/AWS""#);
        let json = serde_json::to_string(&Domain::DataMl).unwrap();
        assert_eq!(json, r#""Data/ML""#);
    }

    #[test]
    fn test_domain_display_from_str_round_trip() {
        for (domain, _) in CATALOGUE {
            let parsed: Domain = domain.as_str().parse().unwrap();
            assert_eq!(parsed, *domain);
        }
        let parsed: Domain = "Other".parse().unwrap();
        assert_eq!(parsed, Domain::Other);
        assert!("Gardening".parse::<Domain>().is_err());
    }

    #[test]
    fn test_ord_follows_declaration_order() {
        assert!(Domain::DevOps < Domain::Backend);
        assert!(Domain::Security < Domain::Other);
    }
}
