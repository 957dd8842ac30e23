//! Audit rules
//!
//! Each rule is a pure function of the [`DomainProfile`] returning at most one
//! finding. The engine runs enabled rules in a fixed order and collects their
//! findings, so evaluating the same profile twice yields the same list.

mod dkim;
mod dmarc;
mod dnssec;
mod mx;
mod spf;

pub use mx::{is_private_ip, PRIVATE_RANGES};

use crate::profile::DomainProfile;
use mailcheck_common::config::RulesConfig;
use mailcheck_common::{Finding, RuleId};
use std::fmt;
use tracing::{debug, warn};

/// Signature shared by every rule check
pub type CheckFn = fn(&DomainProfile) -> Option<Finding>;

/// A registered rule
#[derive(Clone)]
pub struct AuditRule {
    /// Stable identifier reported in findings
    pub id: RuleId,
    /// Short rule name
    pub name: &'static str,
    pub check: CheckFn,
    /// Whether the rule is evaluated
    pub enabled: bool,
}

impl AuditRule {
    fn new(id: RuleId, name: &'static str, check: CheckFn) -> Self {
        Self {
            id,
            name,
            check,
            enabled: true,
        }
    }
}

impl fmt::Debug for AuditRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditRule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Ordered set of audit rules
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<AuditRule>,
}

impl RuleEngine {
    /// Create an engine with every rule enabled
    pub fn new() -> Self {
        let mut engine = Self { rules: Vec::new() };
        engine.add_default_rules();
        engine
    }

    /// Create an engine with the configured rules disabled
    pub fn from_config(config: &RulesConfig) -> Self {
        let mut engine = Self::new();
        for id in &config.disabled {
            match RuleId::from_u8(*id) {
                Some(rule) => {
                    engine.set_rule_enabled(rule, false);
                }
                None => warn!("Ignoring unknown rule id {} in rules.disabled", id),
            }
        }
        engine
    }

    fn add_default_rules(&mut self) {
        self.rules = vec![
            // SPF
            AuditRule::new(RuleId::SpfPtrUsage, "spf_ptr_usage", spf::check_ptr_usage),
            AuditRule::new(RuleId::SpfIncludeLimit, "spf_include_limit", spf::check_include_limit),
            AuditRule::new(RuleId::SpfAllQualifier, "spf_all_qualifier", spf::check_all_qualifier),
            AuditRule::new(RuleId::SpfExists, "spf_exists", spf::check_exists),
            // DMARC
            AuditRule::new(RuleId::DmarcPolicy, "dmarc_policy", dmarc::check_policy),
            AuditRule::new(RuleId::DmarcExists, "dmarc_exists", dmarc::check_exists),
            // DKIM
            AuditRule::new(RuleId::DkimExists, "dkim_exists", dkim::check_exists),
            // DNSSEC
            AuditRule::new(RuleId::DnssecEnabled, "dnssec_enabled", dnssec::check_enabled),
            // MX
            AuditRule::new(RuleId::MxExists, "mx_exists", mx::check_exists),
            AuditRule::new(RuleId::MxHasAddresses, "mx_has_addresses", mx::check_has_addresses),
            AuditRule::new(RuleId::MxHasIpv6, "mx_has_ipv6", mx::check_has_ipv6),
            AuditRule::new(RuleId::MxRedundancy, "mx_redundancy", mx::check_redundancy),
            AuditRule::new(RuleId::MxCount, "mx_count", mx::check_count),
            AuditRule::new(RuleId::MxLocalhost, "mx_localhost", mx::check_localhost),
            AuditRule::new(RuleId::MxPrivateIp, "mx_private_ip", mx::check_private_ips),
        ];
    }

    /// Evaluate every enabled rule against `profile`
    pub fn evaluate(&self, profile: &DomainProfile) -> Vec<Finding> {
        let findings: Vec<Finding> = self
            .rules
            .iter()
            .filter(|rule| rule.enabled)
            .filter_map(|rule| (rule.check)(profile))
            .collect();

        debug!(
            "Evaluated {} rules for {}: {} findings",
            self.rules.iter().filter(|rule| rule.enabled).count(),
            profile.domain,
            findings.len()
        );
        findings
    }

    /// Get all rules in evaluation order
    pub fn rules(&self) -> &[AuditRule] {
        &self.rules
    }

    /// Enable or disable a rule
    pub fn set_rule_enabled(&mut self, id: RuleId, enabled: bool) -> bool {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.id == id) {
            rule.enabled = enabled;
            true
        } else {
            false
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::profile::DomainProfile;
    use crate::records::{AddressKind, MxRecord, ResolvedRecord, SpfRecord};

    pub fn profile() -> DomainProfile {
        DomainProfile::new("example.com")
    }

    pub fn with_spf(txt: &str) -> DomainProfile {
        let mut profile = profile();
        profile.spf_record = Some(SpfRecord::parse(txt));
        profile
    }

    pub fn host(name: &str, priority: u16, records: &[(AddressKind, &str)]) -> MxRecord {
        let mut mx = MxRecord::new(name, priority);
        mx.records = records
            .iter()
            .map(|(kind, value)| ResolvedRecord::new(*kind, *value))
            .collect();
        mx
    }

    pub fn with_mx(hosts: Vec<MxRecord>) -> DomainProfile {
        let mut profile = profile();
        profile.mx_records = Some(hosts);
        profile
    }
}
