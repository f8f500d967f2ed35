//! Ordered keyword classifier.
//!
//! Rules are evaluated top to bottom and the first rule with any keyword
//! contained in the lower-cased message wins. The order of the rule list is
//! its priority: moving a rule changes outcomes.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ComplianceError, ComplianceResult};

/// Compliance framework a record is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Framework {
    #[serde(rename = "PCI DSS")]
    PciDss,
    #[serde(rename = "GDPR")]
    Gdpr,
    #[serde(rename = "HIPAA")]
    Hipaa,
    #[serde(rename = "NIST-CSF")]
    NistCsf,
    #[serde(rename = "ISO27001")]
    Iso27001,
    #[serde(rename = "SOC2")]
    Soc2,
    #[serde(rename = "SOX")]
    Sox,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::PciDss => "PCI DSS",
            Framework::Gdpr => "GDPR",
            Framework::Hipaa => "HIPAA",
            Framework::NistCsf => "NIST-CSF",
            Framework::Iso27001 => "ISO27001",
            Framework::Soc2 => "SOC2",
            Framework::Sox => "SOX",
            Framework::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disposition assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationStatus {
    Verified,
    NeedsReview,
    Rejected,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Verified => f.write_str("Verified"),
            ValidationStatus::NeedsReview => f.write_str("NeedsReview"),
            ValidationStatus::Rejected => f.write_str("Rejected"),
        }
    }
}

/// Derived classification fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub framework: Framework,
    pub risk_score: u8,
    pub validated: ValidationStatus,
}

impl Classification {
    /// Outcome when no rule matches.
    pub const FALLBACK: Classification = Classification {
        framework: Framework::Unknown,
        risk_score: 50,
        validated: ValidationStatus::NeedsReview,
    };
}

/// One entry of the ordered rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub keywords: Vec<String>,
    pub framework: Framework,
    pub risk: u8,
    pub status: ValidationStatus,
}

impl ClassificationRule {
    fn new(keywords: &[&str], framework: Framework, risk: u8, status: ValidationStatus) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            framework,
            risk,
            status,
        }
    }

    /// `normalized` must already be lower-cased.
    fn matches(&self, normalized: &str) -> bool {
        self.keywords.iter().any(|k| normalized.contains(k.as_str()))
    }

    fn outcome(&self) -> Classification {
        Classification {
            framework: self.framework,
            risk_score: self.risk,
            validated: self.status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<ClassificationRule>,
}

/// Immutable, ordered rule list.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassificationRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl Classifier {
    /// Build a classifier from rules in priority order.
    pub fn new(rules: Vec<ClassificationRule>) -> ComplianceResult<Self> {
        let mut normalized = Vec::with_capacity(rules.len());
        for (idx, mut rule) in rules.into_iter().enumerate() {
            rule.keywords = rule
                .keywords
                .into_iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            if rule.keywords.is_empty() {
                return Err(ComplianceError::config(format!(
                    "classification rule #{} has no keywords",
                    idx + 1
                )));
            }
            if rule.risk > 100 {
                return Err(ComplianceError::config(format!(
                    "classification rule #{} has risk {} outside 0-100",
                    idx + 1,
                    rule.risk
                )));
            }
            normalized.push(rule);
        }
        Ok(Self { rules: normalized })
    }

    /// Parse a `[[rules]]` TOML document. File order is priority order.
    pub fn from_toml_str(content: &str) -> ComplianceResult<Self> {
        let file: RuleFile = toml::from_str(content)
            .map_err(|e| ComplianceError::config(format!("invalid rule file: {e}")))?;
        Self::new(file.rules)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ComplianceResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ComplianceError::io(format!("reading rules {}", path.display()), e))?;
        let classifier = Self::from_toml_str(&content)?;
        tracing::info!(
            "Loaded {} classification rules from {}",
            classifier.rules.len(),
            path.display()
        );
        Ok(classifier)
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn classify(&self, message: &str) -> Classification {
        let normalized = message.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&normalized))
            .map(ClassificationRule::outcome)
            .unwrap_or(Classification::FALLBACK)
    }
}

/// The built-in rule table.
pub fn default_rules() -> Vec<ClassificationRule> {
    use Framework::*;
    use ValidationStatus::*;

    vec![
        ClassificationRule::new(
            &["credit card", "card data", "cvv", "expiration date"],
            PciDss,
            90,
            Rejected,
        ),
        ClassificationRule::new(
            &["pii", "personal data", "name", "dob", "ssn", "aadhaar"],
            Gdpr,
            85,
            NeedsReview,
        ),
        ClassificationRule::new(
            &["health", "phi", "medical record", "patient"],
            Hipaa,
            95,
            Rejected,
        ),
        ClassificationRule::new(&["firewall", "disabled", "turned off"], NistCsf, 75, NeedsReview),
        ClassificationRule::new(&["login", "unauthorized", "failed"], Iso27001, 70, NeedsReview),
        ClassificationRule::new(&["login", "success"], Iso27001, 10, Verified),
        ClassificationRule::new(&["data breach", "data leak"], Gdpr, 98, Rejected),
        ClassificationRule::new(
            &["unpatched", "vulnerability", "exploit"],
            NistCsf,
            85,
            NeedsReview,
        ),
        ClassificationRule::new(
            &["unauthorized access", "privilege escalation"],
            Iso27001,
            90,
            Rejected,
        ),
        ClassificationRule::new(
            &["suspicious activity", "anomaly detected"],
            Soc2,
            65,
            NeedsReview,
        ),
        ClassificationRule::new(
            &["configuration change", "misconfiguration"],
            Iso27001,
            60,
            NeedsReview,
        ),
        ClassificationRule::new(&["network scan", "port scan"], NistCsf, 55, NeedsReview),
        ClassificationRule::new(&["malware", "ransomware", "trojan"], Hipaa, 90, Rejected),
        ClassificationRule::new(
            &["no encryption", "unencrypted", "plaintext password"],
            PciDss,
            95,
            Rejected,
        ),
        ClassificationRule::new(&["audit log deleted", "log tampering"], Sox, 99, Rejected),
    ]
}
