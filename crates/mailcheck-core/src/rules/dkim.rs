//! DKIM rules

use crate::profile::DomainProfile;
use mailcheck_common::{Finding, FindingStatus, RuleId};

const DESCRIPTION: &str = "DKIM record existence";

pub(super) fn check_exists(profile: &DomainProfile) -> Option<Finding> {
    let Some(info) = &profile.dkim_info else {
        return Some(Finding::new(
            RuleId::DkimExists,
            DESCRIPTION,
            FindingStatus::Info,
            "DKIM status could not be determined. DKIM uses selectors that vary by email provider. Ensure DKIM is configured with your email service provider.",
        ));
    };

    let finding = if info.has_domain_key && info.response_code.is_success() {
        if info.has_selectors {
            Finding::new(
                RuleId::DkimExists,
                DESCRIPTION,
                FindingStatus::Pass,
                format!(
                    "DKIM records found for this domain with selectors: {}",
                    info.selectors.join(", ")
                ),
            )
        } else {
            Finding::new(
                RuleId::DkimExists,
                DESCRIPTION,
                FindingStatus::Warn,
                "Domain has _domainkey record but no common selectors were found. Ensure DKIM is properly configured with your email provider.",
            )
        }
    } else {
        Finding::new(
            RuleId::DkimExists,
            DESCRIPTION,
            FindingStatus::Fail,
            "No DKIM _domainkey record was found. DKIM helps prevent email spoofing. Configure DKIM with your email service provider.",
        )
    };
    Some(finding)
}
