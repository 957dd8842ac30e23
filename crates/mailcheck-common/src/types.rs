//! Common types for MailCheck

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Lookup category collected for a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Spf,
    Dmarc,
    Dkim,
    Dnssec,
    Mx,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Spf => "spf",
            Category::Dmarc => "dmarc",
            Category::Dkim => "dkim",
            Category::Dnssec => "dnssec",
            Category::Mx => "mx",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of a single rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    Pass,
    Warn,
    Fail,
    Info,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingStatus::Pass => "pass",
            FindingStatus::Warn => "warn",
            FindingStatus::Fail => "fail",
            FindingStatus::Info => "info",
        }
    }
}

impl fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable rule identifiers.
///
/// The numeric values are part of the output contract: historical runs are
/// diffed by identifier, so a value must never be reused or renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum RuleId {
    SpfPtrUsage = 1,
    SpfIncludeLimit = 2,
    SpfAllQualifier = 3,
    DmarcPolicy = 4,
    DmarcExists = 5,
    SpfExists = 6,
    DkimExists = 7,
    DnssecEnabled = 8,
    MxExists = 9,
    MxHasAddresses = 10,
    MxHasIpv6 = 11,
    MxRedundancy = 12,
    MxCount = 13,
    MxLocalhost = 14,
    MxPrivateIp = 15,
}

impl RuleId {
    pub const ALL: [RuleId; 15] = [
        RuleId::SpfPtrUsage,
        RuleId::SpfIncludeLimit,
        RuleId::SpfAllQualifier,
        RuleId::DmarcPolicy,
        RuleId::DmarcExists,
        RuleId::SpfExists,
        RuleId::DkimExists,
        RuleId::DnssecEnabled,
        RuleId::MxExists,
        RuleId::MxHasAddresses,
        RuleId::MxHasIpv6,
        RuleId::MxRedundancy,
        RuleId::MxCount,
        RuleId::MxLocalhost,
        RuleId::MxPrivateIp,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.as_u8() == id)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl Serialize for RuleId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

/// One rule verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule_id: RuleId,
    pub description: String,
    pub status: FindingStatus,
    pub message: String,
}

impl Finding {
    pub fn new(
        rule_id: RuleId,
        description: impl Into<String>,
        status: FindingStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id,
            description: description.into(),
            status,
            message: message.into(),
        }
    }
}
