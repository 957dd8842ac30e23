//! SPF rules

use crate::profile::DomainProfile;
use mailcheck_common::{Finding, FindingStatus, RuleId};

/// Include mechanisms allowed before the record is flagged
const MAX_INCLUDES: usize = 10;

pub(super) fn check_exists(profile: &DomainProfile) -> Option<Finding> {
    let finding = if profile.spf_record.is_none() {
        Finding::new(
            RuleId::SpfExists,
            "SPF record existence",
            FindingStatus::Fail,
            "No SPF record was found for this domain. SPF is important for preventing email spoofing. Add an SPF record to specify which servers are authorized to send email for your domain.",
        )
    } else {
        Finding::new(
            RuleId::SpfExists,
            "SPF record existence",
            FindingStatus::Pass,
            "SPF record exists for this domain.",
        )
    };
    Some(finding)
}

pub(super) fn check_ptr_usage(profile: &DomainProfile) -> Option<Finding> {
    let record = profile.spf_record.as_ref()?;

    // "ptr" itself also has the prefix
    if record.terms.iter().any(|term| term.starts_with("ptr")) {
        return Some(Finding::new(
            RuleId::SpfPtrUsage,
            "SPF record uses deprecated ptr: mechanism",
            FindingStatus::Warn,
            "The ptr: mechanism in SPF records is deprecated due to performance issues and should be avoided",
        ));
    }

    Some(Finding::new(
        RuleId::SpfPtrUsage,
        "SPF record doesn't use deprecated ptr: mechanism",
        FindingStatus::Pass,
        "No ptr: mechanism found in SPF record",
    ))
}

pub(super) fn check_include_limit(profile: &DomainProfile) -> Option<Finding> {
    let record = profile.spf_record.as_ref()?;
    let count = record.include_count();

    let finding = if count > MAX_INCLUDES {
        Finding::new(
            RuleId::SpfIncludeLimit,
            "SPF record has too many include mechanisms",
            FindingStatus::Fail,
            format!(
                "SPF record contains {} include mechanisms (limit is {}). Consider using SPF flattening to reduce lookup complexity.",
                count, MAX_INCLUDES
            ),
        )
    } else {
        Finding::new(
            RuleId::SpfIncludeLimit,
            "SPF record include count is acceptable",
            FindingStatus::Pass,
            format!(
                "SPF record contains {} include mechanisms (limit is {})",
                count, MAX_INCLUDES
            ),
        )
    };
    Some(finding)
}

enum AllQualifier {
    Restrictive,
    Permissive,
    Missing,
}

/// The first `all` term decides
fn all_qualifier(terms: &[String]) -> AllQualifier {
    for term in terms {
        match term.trim() {
            "-all" | "~all" => return AllQualifier::Restrictive,
            "+all" | "all" => return AllQualifier::Permissive,
            _ => {}
        }
    }
    AllQualifier::Missing
}

pub(super) fn check_all_qualifier(profile: &DomainProfile) -> Option<Finding> {
    let record = profile.spf_record.as_ref()?;

    let finding = match all_qualifier(&record.terms) {
        AllQualifier::Permissive => Finding::new(
            RuleId::SpfAllQualifier,
            "SPF record uses +all",
            FindingStatus::Fail,
            "SPF record uses +all which allows any server to send mail for your domain. Use -all or ~all instead.",
        ),
        AllQualifier::Restrictive => Finding::new(
            RuleId::SpfAllQualifier,
            "SPF record uses proper all qualifier",
            FindingStatus::Pass,
            "SPF record properly uses -all or ~all to restrict unauthorized senders.",
        ),
        AllQualifier::Missing => Finding::new(
            RuleId::SpfAllQualifier,
            "SPF record missing all mechanism",
            FindingStatus::Fail,
            "SPF record doesn't have an 'all' mechanism. Add -all or ~all at the end of your SPF record.",
        ),
    };
    Some(finding)
}
