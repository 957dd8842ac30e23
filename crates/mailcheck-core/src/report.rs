//! Audit report: the collected profile plus the rule findings

use crate::profile::DomainProfile;
use crate::rules::RuleEngine;
use mailcheck_common::{Error, Finding, FindingStatus, Result};
use serde::Serialize;

/// Profile and findings of one audit run
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    #[serde(flatten)]
    pub profile: DomainProfile,
    #[serde(rename = "rule_results")]
    pub findings: Vec<Finding>,
}

impl AuditReport {
    /// Evaluate `engine` against `profile`
    pub fn new(profile: DomainProfile, engine: &RuleEngine) -> Self {
        let findings = engine.evaluate(&profile);
        Self { profile, findings }
    }

    /// Number of findings with `status`
    pub fn count(&self, status: FindingStatus) -> usize {
        self.findings.iter().filter(|f| f.status == status).count()
    }

    /// Pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Output(format!("Failed to serialize report: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::SpfRecord;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_json_shape() {
        let mut profile = DomainProfile::new("example.com");
        profile.spf_record = Some(SpfRecord::parse("v=spf1 +all"));

        let report = AuditReport::new(profile, &RuleEngine::new());
        let json: serde_json::Value =
            serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["domain"], "example.com");
        assert_eq!(json["spf_record"]["version"], "spf1");
        assert!(json.get("profile").is_none());

        let results = json["rule_results"].as_array().unwrap();
        assert_eq!(results[0]["rule_id"], 1);
        assert_eq!(results[2]["rule_id"], 3);
        assert_eq!(results[2]["status"], "fail");
        assert_eq!(results[2]["description"], "SPF record uses +all");
    }

    #[test]
    fn test_count_by_status() {
        let report = AuditReport::new(DomainProfile::new("example.com"), &RuleEngine::new());
        assert_eq!(report.count(FindingStatus::Fail), 2);
        assert_eq!(report.count(FindingStatus::Info), 2);
        assert_eq!(report.count(FindingStatus::Warn), 1);
        assert_eq!(report.count(FindingStatus::Pass), 0);
    }
}
