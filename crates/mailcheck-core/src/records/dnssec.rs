//! DNSSEC presence probe

use crate::dns::{AnswerRecord, DnsResolver, QueryType};
use chrono::{DateTime, TimeZone, Utc};
use mailcheck_common::Result;
use serde::Serialize;
use tracing::warn;

/// DNSSEC facts for a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnssecInfo {
    pub domain: String,
    /// DNSKEY or DS records are published
    pub enabled: bool,
    pub has_dnskey: bool,
    pub has_ds: bool,
    pub key_count: usize,
    /// Algorithm of each DNSKEY, in answer order
    pub algorithms: Vec<u8>,
    pub key_tags: Vec<u16>,
    /// Latest RRSIG expiration seen alongside the DNSKEY set
    pub last_signature_expiration: Option<DateTime<Utc>>,
}

impl DnssecInfo {
    fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            enabled: false,
            has_dnskey: false,
            has_ds: false,
            key_count: 0,
            algorithms: Vec::new(),
            key_tags: Vec::new(),
            last_signature_expiration: None,
        }
    }
}

/// Query DNSKEY and DS for `domain` on `nameserver`; a failure of either
/// query fails the probe
pub async fn check_dnssec(
    resolver: &dyn DnsResolver,
    domain: &str,
    nameserver: &str,
) -> Result<DnssecInfo> {
    let mut info = DnssecInfo::new(domain);

    let answer = resolver
        .query(domain, QueryType::Dnskey, nameserver)
        .await?;
    for record in &answer.records {
        match record {
            AnswerRecord::Dnskey {
                algorithm, key_tag, ..
            } => {
                info.has_dnskey = true;
                info.enabled = true;
                info.key_count += 1;
                info.algorithms.push(*algorithm);
                info.key_tags.push(*key_tag);
            }
            AnswerRecord::Rrsig { expiration, .. } => {
                let expiration = Utc.timestamp_opt(i64::from(*expiration), 0).single();
                if expiration > info.last_signature_expiration {
                    info.last_signature_expiration = expiration;
                }
            }
            _ => {}
        }
    }

    let answer = resolver.query(domain, QueryType::Ds, nameserver).await?;
    if !answer.records.is_empty() {
        info.has_ds = true;
        info.enabled = true;
    }

    Ok(info)
}

/// Probe on `nameserver`, repeating both queries on `secondary` on failure
pub async fn check_dnssec_with_fallback(
    resolver: &dyn DnsResolver,
    domain: &str,
    nameserver: &str,
    secondary: &str,
) -> Result<DnssecInfo> {
    match check_dnssec(resolver, domain, nameserver).await {
        Ok(info) => Ok(info),
        Err(e) => {
            warn!(
                "DNSSEC probe for {} via {} failed, retrying via {}: {}",
                domain, nameserver, secondary, e
            );
            check_dnssec(resolver, domain, secondary).await
        }
    }
}
