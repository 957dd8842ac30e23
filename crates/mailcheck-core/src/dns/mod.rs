//! Resolver contract used by the record parsers
//!
//! Parsers only see [`DnsAnswer`]s: a response code plus typed answer
//! records. Wire handling lives in [`client`], and the scripted resolver in
//! `mock` stands in for it under test.

pub mod client;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use mailcheck_common::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

pub use client::NetworkResolver;

/// Record types the collector queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Txt,
    Mx,
    A,
    Aaaa,
    Cname,
    Dnskey,
    Ds,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Txt => "TXT",
            QueryType::Mx => "MX",
            QueryType::A => "A",
            QueryType::Aaaa => "AAAA",
            QueryType::Cname => "CNAME",
            QueryType::Dnskey => "DNSKEY",
            QueryType::Ds => "DS",
        }
    }

    /// DNSSEC queries need a large EDNS buffer and the DO bit
    pub fn is_dnssec(&self) -> bool {
        matches!(self, QueryType::Dnskey | QueryType::Ds)
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DNS response code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rcode(u16);

impl Rcode {
    pub const NOERROR: Rcode = Rcode(0);
    pub const FORMERR: Rcode = Rcode(1);
    pub const SERVFAIL: Rcode = Rcode(2);
    pub const NXDOMAIN: Rcode = Rcode(3);
    pub const NOTIMP: Rcode = Rcode(4);
    pub const REFUSED: Rcode = Rcode(5);

    pub fn new(code: u16) -> Self {
        Rcode(code)
    }

    pub fn code(&self) -> u16 {
        self.0
    }

    pub fn is_success(&self) -> bool {
        *self == Rcode::NOERROR
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            0 => "NOERROR",
            1 => "FORMERR",
            2 => "SERVFAIL",
            3 => "NXDOMAIN",
            4 => "NOTIMP",
            5 => "REFUSED",
            6 => "YXDOMAIN",
            7 => "YXRRSET",
            8 => "NXRRSET",
            9 => "NOTAUTH",
            10 => "NOTZONE",
            16 => "BADSIG",
            17 => "BADKEY",
            18 => "BADTIME",
            other => return write!(f, "RCODE{}", other),
        };
        f.write_str(name)
    }
}

impl Serialize for Rcode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One answer record, decoded from the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerRecord {
    /// TXT record with its character strings joined
    Txt(String),
    Mx { preference: u16, exchange: String },
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(String),
    Dnskey { flags: u16, algorithm: u8, key_tag: u16 },
    Ds { key_tag: u16, algorithm: u8, digest_type: u8 },
    /// Signature record; `expiration` is in seconds since the epoch
    Rrsig { type_covered: u16, expiration: u32 },
    /// Any record type the parsers do not inspect
    Other(u16),
}

/// Response to a single query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsAnswer {
    pub rcode: Rcode,
    pub records: Vec<AnswerRecord>,
}

impl DnsAnswer {
    pub fn new(rcode: Rcode, records: Vec<AnswerRecord>) -> Self {
        Self { rcode, records }
    }

    /// Successful answer carrying `records`
    pub fn success(records: Vec<AnswerRecord>) -> Self {
        Self::new(Rcode::NOERROR, records)
    }

    /// TXT strings in answer order
    pub fn txt(&self) -> impl Iterator<Item = &str> {
        self.records.iter().filter_map(|record| match record {
            AnswerRecord::Txt(txt) => Some(txt.as_str()),
            _ => None,
        })
    }
}

/// DNS lookups needed by the record parsers
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Send one query to `nameserver`.
    ///
    /// Non-success response codes are returned inside the answer; only
    /// transport or protocol failures are errors.
    async fn query(&self, name: &str, query_type: QueryType, nameserver: &str)
        -> Result<DnsAnswer>;

    /// TXT lookup through the host's system resolver
    async fn system_txt(&self, name: &str) -> Result<Vec<String>>;

    /// MX lookup through the host's system resolver, as (preference, exchange)
    async fn system_mx(&self, name: &str) -> Result<Vec<(u16, String)>>;
}

/// Append the DNS port to a nameserver that lacks the `:53` suffix
pub fn normalize_nameserver(nameserver: &str) -> String {
    if nameserver.ends_with(":53") {
        nameserver.to_string()
    } else {
        format!("{}:53", nameserver)
    }
}

/// Socket address for a nameserver given as `ip`, `ip:port` or `[ipv6]:port`
pub fn nameserver_addr(nameserver: &str) -> Result<SocketAddr> {
    let nameserver = nameserver.trim();
    if let Ok(addr) = nameserver.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = nameserver.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, 53));
    }
    normalize_nameserver(nameserver)
        .parse()
        .map_err(|e| Error::Config(format!("Invalid nameserver {}: {}", nameserver, e)))
}

/// Drop the trailing root label from a domain name
pub fn strip_root(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_nameserver() {
        assert_eq!(normalize_nameserver("8.8.8.8"), "8.8.8.8:53");
        assert_eq!(normalize_nameserver("8.8.8.8:53"), "8.8.8.8:53");
    }

    #[test]
    fn test_nameserver_addr() {
        assert_eq!(
            nameserver_addr("8.8.8.8").unwrap(),
            "8.8.8.8:53".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            nameserver_addr("1.1.1.1:53").unwrap(),
            "1.1.1.1:53".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            nameserver_addr("2001:4860:4860::8888").unwrap(),
            "[2001:4860:4860::8888]:53".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            nameserver_addr("127.0.0.1:5353").unwrap().port(),
            5353
        );
        assert!(nameserver_addr("not a nameserver").is_err());
    }

    #[test]
    fn test_rcode_display() {
        assert_eq!(Rcode::NOERROR.to_string(), "NOERROR");
        assert_eq!(Rcode::NXDOMAIN.to_string(), "NXDOMAIN");
        assert_eq!(Rcode::new(23).to_string(), "RCODE23");
        assert!(Rcode::NOERROR.is_success());
        assert!(!Rcode::SERVFAIL.is_success());
    }

    #[test]
    fn test_answer_txt_filters_other_records() {
        let answer = DnsAnswer::success(vec![
            AnswerRecord::Cname("alias.example.com.".into()),
            AnswerRecord::Txt("v=spf1 -all".into()),
            AnswerRecord::Txt("google-site-verification=abc".into()),
        ]);
        let txt: Vec<&str> = answer.txt().collect();
        assert_eq!(txt, vec!["v=spf1 -all", "google-site-verification=abc"]);
    }

    #[test]
    fn test_strip_root() {
        assert_eq!(strip_root("mx.example.com."), "mx.example.com");
        assert_eq!(strip_root("mx.example.com"), "mx.example.com");
    }
}
