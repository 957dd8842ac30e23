//! DNSSEC rules

use crate::profile::DomainProfile;
use mailcheck_common::{Finding, FindingStatus, RuleId};

pub(super) fn check_enabled(profile: &DomainProfile) -> Option<Finding> {
    let (status, message) = match &profile.dnssec_info {
        None => (
            FindingStatus::Info,
            "DNSSEC status could not be determined. DNSSEC adds an additional layer of security to DNS lookups.",
        ),
        Some(info) if info.enabled => (
            FindingStatus::Pass,
            "DNSSEC is enabled for this domain, providing additional security for DNS lookups.",
        ),
        Some(_) => (
            FindingStatus::Warn,
            "DNSSEC is not enabled for this domain. Consider enabling DNSSEC to protect against DNS spoofing attacks.",
        ),
    };

    Some(Finding::new(RuleId::DnssecEnabled, "DNSSEC enabled", status, message))
}
