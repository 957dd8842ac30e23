//! MailCheck Core - DNS record collection and mail domain auditing
//!
//! This crate resolves the mail-related DNS records of a domain into a
//! [`DomainProfile`] and evaluates the audit rules against it.

pub mod dns;
pub mod profile;
pub mod records;
pub mod report;
pub mod rules;

pub use dns::{DnsResolver, NetworkResolver};
pub use profile::{Collector, DomainProfile};
pub use records::{DkimInfo, DkimProbe, DmarcPolicy, DmarcRecord, DnssecInfo, MxRecord, SpfRecord};
pub use report::AuditReport;
pub use rules::{AuditRule, RuleEngine};
