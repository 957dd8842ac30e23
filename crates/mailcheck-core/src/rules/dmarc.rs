//! DMARC rules

use crate::profile::DomainProfile;
use crate::records::Disposition;
use mailcheck_common::{Finding, FindingStatus, RuleId};

pub(super) fn check_exists(profile: &DomainProfile) -> Option<Finding> {
    let finding = if profile.dmarc_record.is_none() {
        Finding::new(
            RuleId::DmarcExists,
            "DMARC record existence",
            FindingStatus::Fail,
            "No DMARC record was found for this domain. DMARC is essential for preventing email spoofing. Add a DMARC record with p=reject or at least p=quarantine.",
        )
    } else {
        Finding::new(
            RuleId::DmarcExists,
            "DMARC record existence",
            FindingStatus::Pass,
            "DMARC record exists for this domain.",
        )
    };
    Some(finding)
}

pub(super) fn check_policy(profile: &DomainProfile) -> Option<Finding> {
    let record = profile.dmarc_record.as_ref()?;
    let policy = match &profile.dmarc_policy {
        Some(policy) => policy.policy.clone(),
        None => record.policy().policy,
    };

    let finding = match policy {
        Disposition::Reject => Finding::new(
            RuleId::DmarcPolicy,
            "DMARC policy set to reject",
            FindingStatus::Pass,
            "DMARC policy is set to 'reject', which provides the strongest protection against email spoofing.",
        ),
        Disposition::Quarantine => Finding::new(
            RuleId::DmarcPolicy,
            "DMARC policy set to quarantine",
            FindingStatus::Warn,
            "DMARC policy is set to 'quarantine'. Consider upgrading to 'reject' for stronger protection once you've verified legitimate emails are passing authentication.",
        ),
        Disposition::None => Finding::new(
            RuleId::DmarcPolicy,
            "DMARC policy set to none",
            FindingStatus::Fail,
            "DMARC policy is set to 'none', which only monitors but doesn't protect against spoofing. Consider upgrading to 'quarantine' or ideally 'reject'.",
        ),
        Disposition::Unrecognized(_) => Finding::new(
            RuleId::DmarcPolicy,
            "DMARC policy not found or invalid",
            FindingStatus::Fail,
            "No valid DMARC policy (p tag) was found. Ensure your DMARC record includes a valid p=reject, p=quarantine, or p=none tag.",
        ),
    };
    Some(finding)
}
