//! DMARC (Domain-based Message Authentication, Reporting, and Conformance) record lookup
//!
//! Parsing is lenient: a malformed segment marks the record invalid but every
//! well-formed tag is still captured.

use super::rcode_error;
use crate::dns::{DnsResolver, QueryType};
use mailcheck_common::{Error, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

/// Default `pct` value
pub const DEFAULT_PERCENTAGE: u32 = 100;

/// Default `ri` value in seconds
pub const DEFAULT_REPORT_INTERVAL: u32 = 86400;

/// Parsed `_dmarc` TXT record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DmarcRecord {
    /// Complete TXT value
    pub raw: String,
    /// Value of the `v` tag
    pub version: String,
    /// Every well-formed tag
    pub tags: BTreeMap<String, String>,
    /// False when a segment lacks `=`, the version is not `DMARC1`, or `p` is missing
    pub valid: bool,
    /// Name the record was found at
    pub location: String,
}

/// Requested handling of failing mail (p= / sp=)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    None,
    Quarantine,
    Reject,
    /// Any other value, including an empty or missing tag
    Unrecognized(String),
}

impl Disposition {
    /// Interpret a tag value; matching is exact
    pub fn parse(value: &str) -> Self {
        match value {
            "none" => Disposition::None,
            "quarantine" => Disposition::Quarantine,
            "reject" => Disposition::Reject,
            other => Disposition::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Disposition::None => "none",
            Disposition::Quarantine => "quarantine",
            Disposition::Reject => "reject",
            Disposition::Unrecognized(value) => value,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Disposition {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Alignment mode for DKIM/SPF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentMode {
    /// Organizational domains must match
    #[default]
    Relaxed,
    /// Domains must match exactly
    Strict,
}

impl AlignmentMode {
    /// `r` or `s`; anything else keeps relaxed
    fn parse(value: &str) -> Self {
        match value {
            "s" => AlignmentMode::Strict,
            _ => AlignmentMode::Relaxed,
        }
    }
}

/// Policy view derived from a [`DmarcRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DmarcPolicy {
    /// p=
    pub policy: Disposition,
    /// sp=, defaulting to the domain policy
    pub subdomain_policy: Disposition,
    /// pct=
    pub percentage: u32,
    /// rf=
    pub report_format: Option<String>,
    /// ri= in seconds
    pub report_interval: u32,
    /// fo=
    pub failure_options: Option<String>,
    /// rua=
    pub aggregate_report_uris: Vec<String>,
    /// ruf=
    pub forensic_report_uris: Vec<String>,
    /// adkim=
    pub dkim_alignment: AlignmentMode,
    /// aspf=
    pub spf_alignment: AlignmentMode,
}

impl DmarcRecord {
    /// Whether a TXT value is a DMARC record
    pub fn matches(txt: &str) -> bool {
        txt.to_ascii_lowercase().starts_with("v=dmarc1")
    }

    /// Parse a TXT value found at `location`
    pub fn parse(raw: &str, location: &str) -> Self {
        let mut record = Self {
            raw: raw.to_string(),
            version: String::new(),
            tags: BTreeMap::new(),
            valid: true,
            location: location.to_string(),
        };

        for part in raw.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let Some((key, value)) = part.split_once('=') else {
                record.valid = false;
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            if key == "v" {
                record.version = value.to_string();
                if value != "DMARC1" {
                    record.valid = false;
                }
            }

            record.tags.insert(key.to_string(), value.to_string());
        }

        if !record.tags.contains_key("p") {
            record.valid = false;
        }

        record
    }

    /// First DMARC record among a set of TXT values
    pub fn select<'a>(txt: impl IntoIterator<Item = &'a str>, location: &str) -> Option<Self> {
        txt.into_iter()
            .find(|txt| Self::matches(txt))
            .map(|txt| Self::parse(txt, location))
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Derive the policy view, filling defaults for absent tags
    pub fn policy(&self) -> DmarcPolicy {
        let policy = Disposition::parse(self.tag("p").unwrap_or_default());
        let subdomain_policy = self
            .tag("sp")
            .map(Disposition::parse)
            .unwrap_or_else(|| policy.clone());

        DmarcPolicy {
            policy,
            subdomain_policy,
            percentage: parse_number(self.tag("pct"), DEFAULT_PERCENTAGE),
            report_format: self.tag("rf").map(str::to_string),
            report_interval: parse_number(self.tag("ri"), DEFAULT_REPORT_INTERVAL),
            failure_options: self.tag("fo").map(str::to_string),
            aggregate_report_uris: self.tag("rua").map(split_uris).unwrap_or_default(),
            forensic_report_uris: self.tag("ruf").map(split_uris).unwrap_or_default(),
            dkim_alignment: self
                .tag("adkim")
                .map(AlignmentMode::parse)
                .unwrap_or_default(),
            spf_alignment: self
                .tag("aspf")
                .map(AlignmentMode::parse)
                .unwrap_or_default(),
        }
    }
}

fn parse_number(value: Option<&str>, default: u32) -> u32 {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn split_uris(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|uri| !uri.is_empty())
        .map(str::to_string)
        .collect()
}

/// Last two labels of a domain with more than two labels
pub fn organizational_domain(domain: &str) -> Option<String> {
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() > 2 {
        Some(parts[parts.len() - 2..].join("."))
    } else {
        None
    }
}

/// Look up the DMARC record of `domain` on `nameserver`
pub async fn lookup_dmarc(
    resolver: &dyn DnsResolver,
    domain: &str,
    nameserver: &str,
) -> Result<DmarcRecord> {
    let location = format!("_dmarc.{}", domain);
    let answer = resolver
        .query(&location, QueryType::Txt, nameserver)
        .await?;
    if !answer.rcode.is_success() {
        return Err(rcode_error(answer.rcode));
    }

    DmarcRecord::select(answer.txt(), &location)
        .ok_or_else(|| Error::NotFound(format!("no DMARC record found for domain: {}", location)))
}

/// Look up the DMARC record with the system resolver as fallback.
///
/// When the system lookup fails too, the whole chain is retried on the
/// organizational domain.
pub fn lookup_dmarc_with_fallback<'a>(
    resolver: &'a dyn DnsResolver,
    domain: &'a str,
    nameserver: &'a str,
) -> Pin<Box<dyn Future<Output = Result<DmarcRecord>> + Send + 'a>> {
    Box::pin(async move {
        match lookup_dmarc(resolver, domain, nameserver).await {
            Ok(record) => return Ok(record),
            Err(e) => warn!("DMARC lookup for {} via {} failed: {}", domain, nameserver, e),
        }

        let location = format!("_dmarc.{}", domain);
        let txt = match resolver.system_txt(&location).await {
            Ok(txt) => txt,
            Err(e) => {
                if let Some(org_domain) = organizational_domain(domain) {
                    debug!("Retrying DMARC lookup on organizational domain {}", org_domain);
                    return lookup_dmarc_with_fallback(resolver, &org_domain, nameserver).await;
                }
                return Err(Error::Dns(format!("DMARC TXT lookup failed: {}", e)));
            }
        };

        DmarcRecord::select(txt.iter().map(String::as_str), &location).ok_or_else(|| {
            Error::NotFound(format!("no DMARC record found for domain: {}", location))
        })
    })
}
