//! SPF (Sender Policy Framework) record lookup
//!
//! Only the published record is inspected: terms are kept verbatim and in
//! order so the rules can flag duplicates or malformed mechanisms. Macros and
//! `include:` targets are never expanded.

use super::rcode_error;
use crate::dns::{DnsResolver, QueryType};
use mailcheck_common::{Error, Result};
use serde::Serialize;
use tracing::{debug, warn};

/// Parsed `v=spf1` TXT record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpfRecord {
    /// Complete TXT value
    pub raw: String,
    /// Version from the first term, e.g. `spf1`
    pub version: String,
    /// Mechanisms and modifiers following the version
    pub terms: Vec<String>,
}

impl SpfRecord {
    /// Whether a TXT value is an SPF record
    pub fn matches(txt: &str) -> bool {
        txt.to_ascii_lowercase().starts_with("v=spf1")
    }

    /// Parse a TXT value already known to be an SPF record
    pub fn parse(txt: &str) -> Self {
        let mut terms = txt.split_whitespace().map(str::to_string);
        let first = terms.next().unwrap_or_default();
        let version = first.strip_prefix("v=").unwrap_or(&first).to_string();

        Self {
            raw: txt.to_string(),
            version,
            terms: terms.collect(),
        }
    }

    /// First SPF record among a set of TXT values
    pub fn select<'a>(txt: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        txt.into_iter()
            .find(|txt| Self::matches(txt))
            .map(Self::parse)
    }

    /// Whether the record includes `domain`
    pub fn has_include(&self, domain: &str) -> bool {
        let include = format!("include:{}", domain);
        self.terms
            .iter()
            .any(|term| *term == include || term.starts_with(&format!("{}/", include)))
    }

    /// Whether the record authorizes `ip` through an `ip4:` mechanism
    pub fn has_ip(&self, ip: &str) -> bool {
        let mechanism = format!("ip4:{}", ip);
        self.terms
            .iter()
            .any(|term| *term == mechanism || term.starts_with(&format!("{}/", mechanism)))
    }

    /// Number of `include:` mechanisms
    pub fn include_count(&self) -> usize {
        self.terms
            .iter()
            .filter(|term| term.starts_with("include:"))
            .count()
    }
}

/// Look up the SPF record of `domain` on `nameserver`
pub async fn lookup_spf(
    resolver: &dyn DnsResolver,
    domain: &str,
    nameserver: &str,
) -> Result<SpfRecord> {
    let answer = resolver.query(domain, QueryType::Txt, nameserver).await?;
    if !answer.rcode.is_success() {
        return Err(rcode_error(answer.rcode));
    }

    SpfRecord::select(answer.txt())
        .ok_or_else(|| Error::NotFound(format!("no SPF record found for domain: {}", domain)))
}

/// Look up the SPF record, retrying through the system resolver when the
/// nameserver lookup fails for any reason
pub async fn lookup_spf_with_fallback(
    resolver: &dyn DnsResolver,
    domain: &str,
    nameserver: &str,
) -> Result<SpfRecord> {
    match lookup_spf(resolver, domain, nameserver).await {
        Ok(record) => return Ok(record),
        Err(e) => warn!("SPF lookup for {} via {} failed: {}", domain, nameserver, e),
    }

    let txt = resolver
        .system_txt(domain)
        .await
        .map_err(|e| Error::Dns(format!("TXT lookup failed: {}", e)))?;
    debug!("System resolver returned {} TXT records for {}", txt.len(), domain);

    SpfRecord::select(txt.iter().map(String::as_str))
        .ok_or_else(|| Error::NotFound(format!("no SPF record found for domain: {}", domain)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::mock::MockResolver;
    use crate::dns::Rcode;
    use pretty_assertions::assert_eq;

    const NS: &str = "192.0.2.53:53";

    #[test]
    fn test_parse_spf_record() {
        let record = SpfRecord::parse("v=spf1 ip4:192.0.2.0/24 include:_spf.google.com ~all");
        assert_eq!(record.version, "spf1");
        assert_eq!(
            record.terms,
            vec!["ip4:192.0.2.0/24", "include:_spf.google.com", "~all"]
        );
        assert!(record.has_include("_spf.google.com"));
        assert!(!record.has_include("google.com"));
        assert!(record.has_ip("192.0.2.0"));
        assert_eq!(record.include_count(), 1);
    }

    #[test]
    fn test_parse_keeps_duplicate_and_malformed_terms() {
        let record = SpfRecord::parse("v=spf1  mx mx ptr:  -all");
        assert_eq!(record.terms, vec!["mx", "mx", "ptr:", "-all"]);
    }

    #[test]
    fn test_select_is_case_insensitive() {
        let txt = ["google-site-verification=abc", "V=SPF1 -all", "v=spf1 +all"];
        let record = SpfRecord::select(txt).unwrap();
        assert_eq!(record.raw, "V=SPF1 -all");
        assert_eq!(record.terms, vec!["-all"]);

        assert!(SpfRecord::select(["v=DMARC1; p=none"]).is_none());
    }

    #[tokio::test]
    async fn test_lookup_spf() {
        let resolver = MockResolver::new().with_txt(
            "example.com",
            &["some-verification=1", "v=spf1 include:_spf.example.net -all"],
        );

        let record = lookup_spf(&resolver, "example.com", NS).await.unwrap();
        assert_eq!(record.terms, vec!["include:_spf.example.net", "-all"]);
    }

    #[tokio::test]
    async fn test_lookup_spf_not_found() {
        let resolver = MockResolver::new().with_txt("example.com", &["not an spf record"]);
        let err = lookup_spf(&resolver, "example.com", NS).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_lookup_spf_rcode_failure() {
        let resolver =
            MockResolver::new().with_rcode("example.com", QueryType::Txt, Rcode::SERVFAIL);
        let err = lookup_spf(&resolver, "example.com", NS).await.unwrap_err();
        assert!(err.to_string().contains("SERVFAIL"));
    }

    #[tokio::test]
    async fn test_fallback_on_transport_error() {
        let resolver = MockResolver::new()
            .with_failing_nameserver(NS)
            .with_system_txt("example.com", &["v=spf1 mx -all"]);

        let record = lookup_spf_with_fallback(&resolver, "example.com", NS)
            .await
            .unwrap();
        assert_eq!(record.terms, vec!["mx", "-all"]);
    }

    #[tokio::test]
    async fn test_fallback_when_primary_has_no_record() {
        let resolver = MockResolver::new()
            .with_txt("example.com", &["unrelated"])
            .with_system_txt("example.com", &["v=spf1 -all"]);

        let record = lookup_spf_with_fallback(&resolver, "example.com", NS)
            .await
            .unwrap();
        assert_eq!(record.raw, "v=spf1 -all");
    }

    #[tokio::test]
    async fn test_fallback_exhausted() {
        let resolver = MockResolver::new().with_failing_nameserver(NS);
        let err = lookup_spf_with_fallback(&resolver, "example.com", NS)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("TXT lookup failed"));

        let resolver = MockResolver::new()
            .with_failing_nameserver(NS)
            .with_system_txt("example.com", &["unrelated"]);
        let err = lookup_spf_with_fallback(&resolver, "example.com", NS)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
