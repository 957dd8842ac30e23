//! Domain profile collection
//!
//! The collector runs every category lookup concurrently and folds the
//! outcomes into one [`DomainProfile`]. A failing category is recorded in the
//! error map and never stops the others.

use crate::dns::{strip_root, DnsResolver};
use crate::records::{
    dkim::DkimProbe, dmarc, dnssec, mx, spf, DkimInfo, DmarcPolicy, DmarcRecord, DnssecInfo,
    MxRecord, SpfRecord,
};
use chrono::{DateTime, Utc};
use mailcheck_common::{Category, Config, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything collected about one domain
#[derive(Debug, Clone, Serialize)]
pub struct DomainProfile {
    pub domain: String,
    pub query_time: DateTime<Utc>,
    /// `None` when the MX lookup failed, empty when the domain has none
    pub mx_records: Option<Vec<MxRecord>>,
    pub spf_record: Option<SpfRecord>,
    pub dmarc_record: Option<DmarcRecord>,
    /// Derived from `dmarc_record`
    pub dmarc_policy: Option<DmarcPolicy>,
    pub dnssec_info: Option<DnssecInfo>,
    pub dkim_info: Option<DkimInfo>,
    /// Failure of each category that could not be collected
    pub errors: BTreeMap<Category, String>,
}

impl DomainProfile {
    /// Empty profile stamped with the current time
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            query_time: Utc::now(),
            mx_records: None,
            spf_record: None,
            dmarc_record: None,
            dmarc_policy: None,
            dnssec_info: None,
            dkim_info: None,
            errors: BTreeMap::new(),
        }
    }

    /// MX records, empty when none were collected
    pub fn mx_records(&self) -> &[MxRecord] {
        self.mx_records.as_deref().unwrap_or_default()
    }

    /// Store the DMARC record together with its derived policy
    pub fn set_dmarc_record(&mut self, record: DmarcRecord) {
        self.dmarc_policy = Some(record.policy());
        self.dmarc_record = Some(record);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error(&self, category: Category) -> Option<&str> {
        self.errors.get(&category).map(String::as_str)
    }

    fn record<T>(&mut self, category: Category, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("{} collection for {} failed: {}", category, self.domain, e);
                self.errors.insert(category, e.to_string());
                None
            }
        }
    }
}

/// Collects a [`DomainProfile`] through a resolver
pub struct Collector {
    resolver: Arc<dyn DnsResolver>,
    nameserver: String,
    secondary_nameserver: String,
    dkim: DkimProbe,
}

impl Collector {
    /// Collector querying `nameserver` with default fallback settings
    pub fn new(resolver: Arc<dyn DnsResolver>, nameserver: impl Into<String>) -> Self {
        let defaults = Config::default();
        Self {
            resolver,
            nameserver: nameserver.into(),
            secondary_nameserver: defaults.resolver.secondary_nameserver,
            dkim: DkimProbe::default(),
        }
    }

    /// Collector configured from the resolver and DKIM sections
    pub fn from_config(resolver: Arc<dyn DnsResolver>, config: &Config) -> Self {
        Self::new(resolver, config.resolver.nameserver.as_str())
            .with_secondary_nameserver(config.resolver.secondary_nameserver.as_str())
            .with_dkim_probe(DkimProbe::new(config.dkim.selectors.iter().cloned()))
    }

    /// Nameserver for the DKIM and DNSSEC retries
    pub fn with_secondary_nameserver(mut self, nameserver: impl Into<String>) -> Self {
        self.secondary_nameserver = nameserver.into();
        self
    }

    pub fn with_dkim_probe(mut self, probe: DkimProbe) -> Self {
        self.dkim = probe;
        self
    }

    pub fn nameserver(&self) -> &str {
        &self.nameserver
    }

    /// Run every category lookup for `domain`
    pub async fn collect(&self, domain: &str) -> DomainProfile {
        let domain = strip_root(domain.trim());
        let resolver = self.resolver.as_ref();
        let nameserver = self.nameserver.as_str();
        let secondary = self.secondary_nameserver.as_str();

        info!("Collecting DNS records for {} via {}", domain, nameserver);
        let mut profile = DomainProfile::new(domain);

        let (mx, spf, dmarc, dnssec, dkim) = tokio::join!(
            mx::lookup_mx_with_fallback(resolver, domain, nameserver),
            spf::lookup_spf_with_fallback(resolver, domain, nameserver),
            dmarc::lookup_dmarc_with_fallback(resolver, domain, nameserver),
            dnssec::check_dnssec_with_fallback(resolver, domain, nameserver, secondary),
            self.dkim
                .check_with_fallback(resolver, domain, nameserver, secondary),
        );

        profile.mx_records = profile.record(Category::Mx, mx);
        profile.spf_record = profile.record(Category::Spf, spf);
        if let Some(record) = profile.record(Category::Dmarc, dmarc) {
            profile.set_dmarc_record(record);
        }
        profile.dnssec_info = profile.record(Category::Dnssec, dnssec);
        profile.dkim_info = profile.record(Category::Dkim, dkim);

        info!(
            "Collected {} with {} failed categories",
            domain,
            profile.errors.len()
        );
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::mock::MockResolver;
    use crate::dns::{AnswerRecord, QueryType};
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    const NS: &str = "192.0.2.53:53";

    fn configured() -> MockResolver {
        MockResolver::new()
            .with_records(
                "example.com",
                QueryType::Mx,
                vec![AnswerRecord::Mx {
                    preference: 10,
                    exchange: "mx.example.com.".into(),
                }],
            )
            .with_records(
                "mx.example.com",
                QueryType::A,
                vec![AnswerRecord::A(Ipv4Addr::new(192, 0, 2, 25))],
            )
            .with_txt("example.com", &["v=spf1 mx -all"])
            .with_txt("_dmarc.example.com", &["v=DMARC1; p=reject; sp=none"])
            .with_records("_domainkey.example.com", QueryType::Txt, Vec::new())
            .with_txt("google._domainkey.example.com", &["v=DKIM1; p=abc"])
    }

    #[tokio::test]
    async fn test_collect_full_profile() {
        let collector = Collector::new(Arc::new(configured()), NS);
        let profile = collector.collect("example.com.").await;

        assert_eq!(profile.domain, "example.com");
        assert!(!profile.has_errors());
        assert_eq!(profile.mx_records().len(), 1);
        assert_eq!(profile.mx_records()[0].records[0].value, "192.0.2.25");
        assert_eq!(profile.spf_record.as_ref().unwrap().terms, vec!["mx", "-all"]);

        let policy = profile.dmarc_policy.as_ref().unwrap();
        assert_eq!(policy.policy.as_str(), "reject");
        assert_eq!(policy.subdomain_policy.as_str(), "none");

        assert_eq!(profile.dkim_info.as_ref().unwrap().selectors, vec!["google"]);
        assert!(!profile.dnssec_info.as_ref().unwrap().enabled);
    }

    #[tokio::test]
    async fn test_failed_categories_are_isolated() {
        let resolver = MockResolver::new()
            .with_failing_nameserver(NS)
            .with_failing_nameserver("8.8.4.4")
            .with_system_txt("example.com", &["v=spf1 -all"]);

        let profile = Collector::new(Arc::new(resolver), NS)
            .collect("example.com")
            .await;

        assert!(profile.spf_record.is_some());
        assert!(profile.error(Category::Spf).is_none());
        for category in [Category::Mx, Category::Dmarc, Category::Dnssec, Category::Dkim] {
            assert!(profile.error(category).is_some(), "{} should fail", category);
        }
        assert!(profile.mx_records.is_none());
        assert!(profile.mx_records().is_empty());
        assert!(profile.dmarc_policy.is_none());
    }

    #[tokio::test]
    async fn test_from_config_uses_selectors_and_secondary() {
        let mut config = Config::default();
        config.resolver.nameserver = NS.to_string();
        config.resolver.secondary_nameserver = "192.0.2.54:53".to_string();
        config.dkim.selectors = vec!["custom".to_string()];

        let resolver = Arc::new(
            MockResolver::new()
                .with_failing_nameserver(NS)
                .with_records("_domainkey.example.com", QueryType::Txt, Vec::new())
                .with_txt("custom._domainkey.example.com", &["v=DKIM1; p=abc"]),
        );
        let collector = Collector::from_config(resolver.clone(), &config);
        assert_eq!(collector.nameserver(), NS);

        let profile = collector.collect("example.com").await;
        assert_eq!(profile.dkim_info.unwrap().selectors, vec!["custom"]);
        assert!(resolver.queries_to("192.0.2.54:53") > 0);
    }

    #[test]
    fn test_profile_json_shape() {
        let mut profile = DomainProfile::new("example.com");
        profile.mx_records = Some(Vec::new());
        profile
            .errors
            .insert(Category::Dnssec, "DNS query failed: timeout".to_string());

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["domain"], "example.com");
        assert_eq!(json["mx_records"], serde_json::json!([]));
        assert_eq!(json["spf_record"], serde_json::Value::Null);
        assert_eq!(json["errors"]["dnssec"], "DNS query failed: timeout");
    }
}
