//! DKIM presence probe
//!
//! Signatures are never verified. The probe checks whether `_domainkey` exists
//! and which selectors from a fixed vocabulary publish a key.

use crate::dns::{DnsResolver, QueryType, Rcode};
use mailcheck_common::config::DEFAULT_DKIM_SELECTORS;
use mailcheck_common::Result;
use serde::Serialize;
use tracing::{debug, warn};

/// Result of a DKIM presence probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DkimInfo {
    /// Domain that was probed
    pub domain: String,
    /// `_domainkey.<domain>` answered NOERROR
    pub has_domain_key: bool,
    /// At least one selector was found
    pub has_selectors: bool,
    /// Discovered selectors, in probe order
    pub selectors: Vec<String>,
    /// Response code of the `_domainkey` query
    pub response_code: Rcode,
}

/// Probes a domain for DKIM selectors
#[derive(Debug, Clone)]
pub struct DkimProbe {
    selectors: Vec<String>,
}

impl Default for DkimProbe {
    fn default() -> Self {
        Self::new(DEFAULT_DKIM_SELECTORS)
    }
}

impl DkimProbe {
    /// Create a probe over `selectors`; repeated names are probed once
    pub fn new<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for selector in selectors {
            let selector = selector.into();
            if !selector.is_empty() && !unique.contains(&selector) {
                unique.push(selector);
            }
        }
        Self { selectors: unique }
    }

    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }

    /// Probe `domain` on `nameserver`.
    ///
    /// Only a failed `_domainkey` query is an error; a selector query that
    /// fails is skipped.
    pub async fn check(
        &self,
        resolver: &dyn DnsResolver,
        domain: &str,
        nameserver: &str,
    ) -> Result<DkimInfo> {
        let domain_key = format!("_domainkey.{}", domain);
        let answer = resolver
            .query(&domain_key, QueryType::Txt, nameserver)
            .await?;

        let mut info = DkimInfo {
            domain: domain.to_string(),
            has_domain_key: answer.rcode.is_success(),
            has_selectors: false,
            selectors: Vec::new(),
            response_code: answer.rcode,
        };

        for selector in &self.selectors {
            let name = format!("{}._domainkey.{}", selector, domain);
            match resolver.query(&name, QueryType::Txt, nameserver).await {
                Ok(answer) if answer.rcode.is_success() && !answer.records.is_empty() => {
                    debug!("Found DKIM selector {} for {}", selector, domain);
                    info.selectors.push(selector.clone());
                }
                Ok(_) => {}
                Err(e) => debug!("Skipping DKIM selector {}: {}", name, e),
            }
        }
        info.has_selectors = !info.selectors.is_empty();

        Ok(info)
    }

    /// Probe on `nameserver`, repeating the whole probe on `secondary` when
    /// the `_domainkey` query fails
    pub async fn check_with_fallback(
        &self,
        resolver: &dyn DnsResolver,
        domain: &str,
        nameserver: &str,
        secondary: &str,
    ) -> Result<DkimInfo> {
        match self.check(resolver, domain, nameserver).await {
            Ok(info) => Ok(info),
            Err(e) => {
                warn!(
                    "DKIM probe for {} via {} failed, retrying via {}: {}",
                    domain, nameserver, secondary, e
                );
                self.check(resolver, domain, secondary).await
            }
        }
    }
}
