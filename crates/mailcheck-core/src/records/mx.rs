//! MX lookup and mail host address resolution

use super::rcode_error;
use crate::dns::{strip_root, AnswerRecord, DnsResolver, QueryType};
use mailcheck_common::{Error, Result};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Kind of a record resolved for a mail host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AddressKind {
    A,
    Aaaa,
    Cname,
}

impl AddressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressKind::A => "A",
            AddressKind::Aaaa => "AAAA",
            AddressKind::Cname => "CNAME",
        }
    }

    /// A or AAAA
    pub fn is_address(&self) -> bool {
        matches!(self, AddressKind::A | AddressKind::Aaaa)
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address or alias record of a mail host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRecord {
    #[serde(rename = "type")]
    pub kind: AddressKind,
    /// IP address or CNAME target
    pub value: String,
}

impl ResolvedRecord {
    pub fn new(kind: AddressKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// One mail exchanger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MxRecord {
    /// Host name without the trailing root label
    pub host: String,
    /// Lower is preferred
    pub priority: u16,
    pub records: Vec<ResolvedRecord>,
}

impl MxRecord {
    pub fn new(host: &str, priority: u16) -> Self {
        Self {
            host: strip_root(host).to_string(),
            priority,
            records: Vec::new(),
        }
    }

    pub fn has_ipv6(&self) -> bool {
        self.records.iter().any(|r| r.kind == AddressKind::Aaaa)
    }
}

/// Look up MX records on `nameserver` and resolve each host.
///
/// The result is sorted by priority; hosts whose A query fails keep an empty
/// record list.
pub async fn lookup_mx(
    resolver: &dyn DnsResolver,
    domain: &str,
    nameserver: &str,
) -> Result<Vec<MxRecord>> {
    let answer = resolver.query(domain, QueryType::Mx, nameserver).await?;
    if !answer.rcode.is_success() {
        return Err(rcode_error(answer.rcode));
    }

    let mut records = Vec::new();
    for record in &answer.records {
        let AnswerRecord::Mx {
            preference,
            exchange,
        } = record
        else {
            continue;
        };

        let mut mx = MxRecord::new(exchange, *preference);
        match resolve_mx_host(resolver, &mx.host, nameserver).await {
            Ok(resolved) => mx.records = resolved,
            Err(e) => debug!("Could not resolve MX host {}: {}", mx.host, e),
        }
        records.push(mx);
    }

    records.sort_by_key(|mx| mx.priority);
    Ok(records)
}

/// Resolve CNAME, A and AAAA records of a mail host.
///
/// The CNAME and AAAA lookups are best effort; a failed A lookup fails the
/// whole resolution.
pub async fn resolve_mx_host(
    resolver: &dyn DnsResolver,
    host: &str,
    nameserver: &str,
) -> Result<Vec<ResolvedRecord>> {
    let mut records = Vec::new();

    if let Ok(answer) = resolver.query(host, QueryType::Cname, nameserver).await {
        if answer.rcode.is_success() {
            records.extend(answer.records.iter().filter_map(|r| match r {
                AnswerRecord::Cname(target) => {
                    Some(ResolvedRecord::new(AddressKind::Cname, strip_root(target)))
                }
                _ => None,
            }));
        }
    }

    let answer = resolver
        .query(host, QueryType::A, nameserver)
        .await
        .map_err(|e| Error::Dns(format!("A record query failed: {}", e)))?;
    if !answer.rcode.is_success() {
        return Err(rcode_error(answer.rcode));
    }
    records.extend(answer.records.iter().filter_map(|r| match r {
        AnswerRecord::A(ip) => Some(ResolvedRecord::new(AddressKind::A, ip.to_string())),
        _ => None,
    }));

    if let Ok(answer) = resolver.query(host, QueryType::Aaaa, nameserver).await {
        if answer.rcode.is_success() {
            records.extend(answer.records.iter().filter_map(|r| match r {
                AnswerRecord::Aaaa(ip) => {
                    Some(ResolvedRecord::new(AddressKind::Aaaa, ip.to_string()))
                }
                _ => None,
            }));
        }
    }

    Ok(records)
}

/// Look up MX records, falling back to the system resolver when the
/// nameserver lookup fails or returns no records.
///
/// Hosts from the fallback are not resolved.
pub async fn lookup_mx_with_fallback(
    resolver: &dyn DnsResolver,
    domain: &str,
    nameserver: &str,
) -> Result<Vec<MxRecord>> {
    match lookup_mx(resolver, domain, nameserver).await {
        Ok(records) if !records.is_empty() => return Ok(records),
        Ok(_) => debug!("No MX records for {} via {}", domain, nameserver),
        Err(e) => warn!("MX lookup for {} via {} failed: {}", domain, nameserver, e),
    }

    let mx = resolver
        .system_mx(domain)
        .await
        .map_err(|e| Error::Dns(format!("MX lookup failed: {}", e)))?;

    let mut records: Vec<MxRecord> = mx
        .iter()
        .map(|(priority, host)| MxRecord::new(host, *priority))
        .collect();
    records.sort_by_key(|mx| mx.priority);

    Ok(records)
}
