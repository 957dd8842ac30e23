//! MX rules

use crate::profile::DomainProfile;
use crate::records::{AddressKind, MxRecord};
use ipnet::IpNet;
use mailcheck_common::{Finding, FindingStatus, RuleId};
use std::net::IpAddr;
use std::sync::OnceLock;

/// MX count above which the setup is flagged
const MAX_RECOMMENDED_MX: usize = 5;

/// Host names and literals that point a mail exchanger at the local machine
const LOCALHOST_PATTERNS: [&str; 4] = ["localhost", "127.0.0.1", "::1", "0.0.0.0"];

/// Private, loopback and link-local networks
pub const PRIVATE_RANGES: [&str; 7] = [
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "127.0.0.0/8",
    "169.254.0.0/16",
    "fc00::/7",
    "fe80::/10",
];

fn private_networks() -> &'static [IpNet] {
    static NETWORKS: OnceLock<Vec<IpNet>> = OnceLock::new();
    NETWORKS.get_or_init(|| {
        PRIVATE_RANGES
            .iter()
            .filter_map(|cidr| cidr.parse().ok())
            .collect()
    })
}

/// Whether `ip` falls in one of [`PRIVATE_RANGES`].
///
/// IPv4-mapped IPv6 addresses are checked as IPv4.
pub fn is_private_ip(ip: IpAddr) -> bool {
    let ip = ip.to_canonical();
    private_networks().iter().any(|net| net.contains(&ip))
}

pub(super) fn check_exists(profile: &DomainProfile) -> Option<Finding> {
    let count = profile.mx_records().len();
    let finding = if count == 0 {
        Finding::new(
            RuleId::MxExists,
            "MX record existence",
            FindingStatus::Warn,
            "No MX records found. If this domain is used for email, add MX records to specify mail servers.",
        )
    } else {
        Finding::new(
            RuleId::MxExists,
            "MX record existence",
            FindingStatus::Pass,
            format!("Found {} MX records for this domain.", count),
        )
    };
    Some(finding)
}

/// Hosts matching `predicate`, in MX order
fn hosts_where(records: &[MxRecord], predicate: impl Fn(&MxRecord) -> bool) -> Vec<&str> {
    records
        .iter()
        .filter(|mx| predicate(mx))
        .map(|mx| mx.host.as_str())
        .collect()
}

pub(super) fn check_has_addresses(profile: &DomainProfile) -> Option<Finding> {
    let records = non_empty(profile)?;
    let unresolved = hosts_where(records, |mx| mx.records.is_empty());

    let finding = if unresolved.is_empty() {
        Finding::new(
            RuleId::MxHasAddresses,
            "MX records have IP addresses",
            FindingStatus::Pass,
            "All MX records resolve to valid IP addresses.",
        )
    } else {
        Finding::new(
            RuleId::MxHasAddresses,
            "MX records have IP addresses",
            FindingStatus::Warn,
            format!(
                "The following MX hosts could not be resolved to IP addresses: {}",
                unresolved.join(", ")
            ),
        )
    };
    Some(finding)
}

pub(super) fn check_has_ipv6(profile: &DomainProfile) -> Option<Finding> {
    let records = non_empty(profile)?;
    let ipv4_only = hosts_where(records, |mx| !mx.has_ipv6());

    let finding = if ipv4_only.is_empty() {
        Finding::new(
            RuleId::MxHasIpv6,
            "MX records have IPv6 addresses",
            FindingStatus::Pass,
            "All MX records resolve to IPv6 addresses.",
        )
    } else {
        Finding::new(
            RuleId::MxHasIpv6,
            "MX records have IPv6 addresses",
            FindingStatus::Warn,
            format!(
                "The following MX hosts could not be resolved to IPv6 addresses: {}",
                ipv4_only.join(", ")
            ),
        )
    };
    Some(finding)
}

pub(super) fn check_redundancy(profile: &DomainProfile) -> Option<Finding> {
    let records = non_empty(profile)?;

    let finding = if records.len() == 1 {
        Finding::new(
            RuleId::MxRedundancy,
            "MX record redundancy",
            FindingStatus::Warn,
            "Only one MX record found. For better email reliability, consider adding at least one backup MX server.",
        )
    } else {
        Finding::new(
            RuleId::MxRedundancy,
            "MX record redundancy",
            FindingStatus::Pass,
            format!(
                "Found {} MX records, which provides redundancy for email delivery.",
                records.len()
            ),
        )
    };
    Some(finding)
}

pub(super) fn check_count(profile: &DomainProfile) -> Option<Finding> {
    let count = non_empty(profile)?.len();

    let finding = if count > MAX_RECOMMENDED_MX {
        Finding::new(
            RuleId::MxCount,
            "MX record count",
            FindingStatus::Warn,
            format!(
                "Found {} MX records, which is more than the recommended maximum of {}. Too many MX records may indicate a misconfiguration.",
                count, MAX_RECOMMENDED_MX
            ),
        )
    } else {
        Finding::new(
            RuleId::MxCount,
            "MX record count",
            FindingStatus::Pass,
            format!(
                "Found {} MX records, which is within the recommended range (1-{}).",
                count, MAX_RECOMMENDED_MX
            ),
        )
    };
    Some(finding)
}

fn points_to_localhost(mx: &MxRecord) -> bool {
    let host = mx.host.to_lowercase();
    LOCALHOST_PATTERNS.contains(&host.as_str())
        || mx
            .records
            .iter()
            .filter(|r| r.kind.is_address())
            .any(|r| LOCALHOST_PATTERNS.contains(&r.value.as_str()))
}

pub(super) fn check_localhost(profile: &DomainProfile) -> Option<Finding> {
    let records = non_empty(profile)?;
    let local = hosts_where(records, points_to_localhost);

    let finding = if local.is_empty() {
        Finding::new(
            RuleId::MxLocalhost,
            "MX localhost check",
            FindingStatus::Pass,
            "No MX records pointing to localhost found.",
        )
    } else {
        Finding::new(
            RuleId::MxLocalhost,
            "MX localhost check",
            FindingStatus::Fail,
            format!(
                "Found {} MX records pointing to localhost or loopback addresses: {}. This is a misconfiguration that will prevent email delivery.",
                local.len(),
                local.join(", ")
            ),
        )
    };
    Some(finding)
}

/// Private A/AAAA values of a host; unparseable values are skipped
fn private_addresses(mx: &MxRecord) -> Vec<&str> {
    mx.records
        .iter()
        .filter(|r| matches!(r.kind, AddressKind::A | AddressKind::Aaaa))
        .filter(|r| {
            r.value
                .parse::<IpAddr>()
                .map(is_private_ip)
                .unwrap_or(false)
        })
        .map(|r| r.value.as_str())
        .collect()
}

pub(super) fn check_private_ips(profile: &DomainProfile) -> Option<Finding> {
    let records = non_empty(profile)?;

    let details: Vec<String> = records
        .iter()
        .filter_map(|mx| {
            let private = private_addresses(mx);
            if private.is_empty() {
                None
            } else {
                Some(format!(
                    "{} resolves to private IPs: {}",
                    mx.host,
                    private.join(", ")
                ))
            }
        })
        .collect();

    let finding = if details.is_empty() {
        Finding::new(
            RuleId::MxPrivateIp,
            "MX private IP check",
            FindingStatus::Pass,
            "No MX records resolving to private IP addresses found.",
        )
    } else {
        Finding::new(
            RuleId::MxPrivateIp,
            "MX private IP check",
            FindingStatus::Fail,
            format!(
                "Found {} MX records resolving to private IP addresses. {}",
                details.len(),
                details.join("; ")
            ),
        )
    };
    Some(finding)
}

fn non_empty(profile: &DomainProfile) -> Option<&[MxRecord]> {
    let records = profile.mx_records();
    if records.is_empty() {
        None
    } else {
        Some(records)
    }
}
