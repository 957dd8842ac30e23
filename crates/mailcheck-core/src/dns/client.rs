//! Network resolver backed by trust-dns
//!
//! Direct queries go over UDP to the requested nameserver so the response
//! code is visible to the parsers. The system fallbacks use a
//! `TokioAsyncResolver` built from the host configuration.

use super::{nameserver_addr, AnswerRecord, DnsAnswer, DnsResolver, QueryType, Rcode};
use async_trait::async_trait;
use mailcheck_common::{Error, Result};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::OnceCell;
use tracing::debug;
use trust_dns_proto::op::{Edns, Message, MessageType, OpCode, Query};
use trust_dns_proto::rr::dnssec::rdata::{DNSSECRData, DNSKEY};
use trust_dns_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use trust_dns_proto::udp::UdpClientStream;
use trust_dns_proto::xfer::{DnsExchange, DnsHandle, DnsRequest, DnsRequestOptions, FirstAnswer};
use trust_dns_proto::TokioTime;
use trust_dns_resolver::TokioAsyncResolver;

/// EDNS0 buffer advertised for DNSSEC queries
const DNSSEC_PAYLOAD_LEN: u16 = 4096;

/// EDNS0 buffer advertised for every other query
const DEFAULT_PAYLOAD_LEN: u16 = 1232;

/// Resolver that talks to real nameservers
#[derive(Default)]
pub struct NetworkResolver {
    system: OnceCell<TokioAsyncResolver>,
}

impl NetworkResolver {
    /// Create a new network resolver
    pub fn new() -> Self {
        Self::default()
    }

    async fn system_resolver(&self) -> Result<&TokioAsyncResolver> {
        self.system
            .get_or_try_init(|| async {
                TokioAsyncResolver::tokio_from_system_conf().map_err(|e| {
                    Error::Dns(format!("Failed to create system resolver: {}", e))
                })
            })
            .await
    }

    async fn exchange(&self, message: Message, addr: SocketAddr) -> Result<DnsAnswer> {
        let stream = UdpClientStream::<UdpSocket>::new(addr);
        let (mut exchange, background) = DnsExchange::connect::<_, _, TokioTime>(stream)
            .await
            .map_err(|e| Error::Dns(format!("Failed to connect to {}: {}", addr, e)))?;
        let background = tokio::spawn(background);

        let response = exchange
            .send(DnsRequest::new(message, DnsRequestOptions::default()))
            .first_answer()
            .await;
        background.abort();

        let response = response.map_err(|e| Error::Dns(e.to_string()))?;
        let rcode = Rcode::new(u16::from(response.response_code()));
        let records = response.answers().iter().map(convert_record).collect();

        Ok(DnsAnswer::new(rcode, records))
    }
}

#[async_trait]
impl DnsResolver for NetworkResolver {
    async fn query(
        &self,
        name: &str,
        query_type: QueryType,
        nameserver: &str,
    ) -> Result<DnsAnswer> {
        let addr = nameserver_addr(nameserver)?;
        let message = build_message(name, query_type)?;

        debug!("Querying {} {} via {}", name, query_type, addr);
        let answer = self.exchange(message, addr).await?;
        debug!(
            "{} {} via {}: {} with {} answers",
            name,
            query_type,
            addr,
            answer.rcode,
            answer.records.len()
        );

        Ok(answer)
    }

    async fn system_txt(&self, name: &str) -> Result<Vec<String>> {
        let resolver = self.system_resolver().await?;
        let lookup = resolver
            .txt_lookup(name)
            .await
            .map_err(|e| Error::Dns(e.to_string()))?;

        Ok(lookup
            .iter()
            .map(|record| {
                record
                    .txt_data()
                    .iter()
                    .map(|d| String::from_utf8_lossy(d))
                    .collect::<String>()
            })
            .collect())
    }

    async fn system_mx(&self, name: &str) -> Result<Vec<(u16, String)>> {
        let resolver = self.system_resolver().await?;
        let lookup = resolver
            .mx_lookup(name)
            .await
            .map_err(|e| Error::Dns(e.to_string()))?;

        Ok(lookup
            .iter()
            .map(|mx| (mx.preference(), mx.exchange().to_utf8()))
            .collect())
    }
}

fn record_type(query_type: QueryType) -> RecordType {
    match query_type {
        QueryType::Txt => RecordType::TXT,
        QueryType::Mx => RecordType::MX,
        QueryType::A => RecordType::A,
        QueryType::Aaaa => RecordType::AAAA,
        QueryType::Cname => RecordType::CNAME,
        QueryType::Dnskey => RecordType::DNSKEY,
        QueryType::Ds => RecordType::DS,
    }
}

/// Build a recursive query with EDNS0, setting the DO bit for DNSSEC types
fn build_message(name: &str, query_type: QueryType) -> Result<Message> {
    let fqdn = format!("{}.", super::strip_root(name));
    let name = Name::from_ascii(&fqdn)
        .map_err(|e| Error::Dns(format!("Invalid query name {}: {}", fqdn, e)))?;

    let mut query = Query::query(name, record_type(query_type));
    query.set_query_class(DNSClass::IN);

    let mut edns = Edns::new();
    edns.set_version(0);
    if query_type.is_dnssec() {
        edns.set_max_payload(DNSSEC_PAYLOAD_LEN);
        edns.set_dnssec_ok(true);
    } else {
        edns.set_max_payload(DEFAULT_PAYLOAD_LEN);
    }

    let mut message = Message::new();
    message
        .add_query(query)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.set_edns(edns);

    Ok(message)
}

fn convert_record(record: &Record) -> AnswerRecord {
    let other = AnswerRecord::Other(u16::from(record.record_type()));
    let Some(data) = record.data() else {
        return other;
    };

    match data {
        RData::TXT(txt) => AnswerRecord::Txt(
            txt.txt_data()
                .iter()
                .map(|d| String::from_utf8_lossy(d))
                .collect::<String>(),
        ),
        RData::MX(mx) => AnswerRecord::Mx {
            preference: mx.preference(),
            exchange: mx.exchange().to_utf8(),
        },
        RData::A(a) => AnswerRecord::A(a.0),
        RData::AAAA(aaaa) => AnswerRecord::Aaaa(aaaa.0),
        RData::CNAME(cname) => AnswerRecord::Cname(cname.0.to_utf8()),
        RData::DNSSEC(DNSSECRData::DNSKEY(key)) => match key_tag(key) {
            Some(key_tag) => AnswerRecord::Dnskey {
                flags: key.flags(),
                algorithm: u8::from(key.algorithm()),
                key_tag,
            },
            None => other,
        },
        RData::DNSSEC(DNSSECRData::DS(ds)) => AnswerRecord::Ds {
            key_tag: ds.key_tag(),
            algorithm: u8::from(ds.algorithm()),
            digest_type: u8::from(ds.digest_type()),
        },
        RData::DNSSEC(DNSSECRData::RRSIG(sig)) => AnswerRecord::Rrsig {
            type_covered: u16::from(sig.type_covered()),
            expiration: sig.sig_expiration(),
        },
        _ => other,
    }
}

/// RSA/MD5, whose key tag is read from the modulus
const ALGORITHM_RSAMD5: u8 = 1;

/// Key tag per RFC 4034 Appendix B
fn key_tag(key: &DNSKEY) -> Option<u16> {
    if u8::from(key.algorithm()) == ALGORITHM_RSAMD5 {
        // most significant 16 of the least significant 24 bits of the modulus
        let modulus = key.public_key();
        return match modulus.len() {
            len if len >= 3 => Some(u16::from_be_bytes([modulus[len - 3], modulus[len - 2]])),
            _ => Some(0),
        };
    }
    key.calculate_key_tag().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use trust_dns_proto::rr::dnssec::rdata::{DS, RRSIG};
    use trust_dns_proto::rr::dnssec::{Algorithm, DigestType};

    fn zone() -> Name {
        Name::from_ascii("example.com.").unwrap()
    }

    fn dnskey(algorithm: Algorithm, public_key: Vec<u8>) -> DNSKEY {
        DNSKEY::new(true, true, false, algorithm, public_key)
    }

    fn record(rdata: DNSSECRData) -> Record {
        Record::from_rdata(zone(), 3600, RData::DNSSEC(rdata))
    }

    /// Answer one query on a local socket with `answers`
    async fn serve_once(answers: Vec<Record>) -> String {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            let (len, peer) = socket.recv_from(&mut buf).await.unwrap();
            let request = Message::from_vec(&buf[..len]).unwrap();

            let mut response = Message::new();
            response
                .set_id(request.id())
                .set_message_type(MessageType::Response)
                .set_op_code(OpCode::Query)
                .set_recursion_desired(true)
                .set_recursion_available(true);
            response.add_queries(request.queries().to_vec());
            response.add_answers(answers);

            socket
                .send_to(&response.to_vec().unwrap(), peer)
                .await
                .unwrap();
        });

        addr.to_string()
    }

    #[tokio::test]
    async fn test_query_decodes_signed_dnskey_answer() {
        let key = dnskey(Algorithm::ECDSAP256SHA256, vec![0xAA, 0xBB]);
        let sig = RRSIG::new(
            RecordType::DNSKEY,
            Algorithm::ECDSAP256SHA256,
            2,
            3600,
            1_700_000_000,
            1_690_000_000,
            44745,
            zone(),
            vec![0xCC; 64],
        );
        let nameserver = serve_once(vec![
            record(DNSSECRData::DNSKEY(key)),
            record(DNSSECRData::RRSIG(sig)),
        ])
        .await;

        let answer = NetworkResolver::new()
            .query("example.com", QueryType::Dnskey, &nameserver)
            .await
            .unwrap();

        assert_eq!(answer.rcode, Rcode::NOERROR);
        assert_eq!(
            answer.records,
            vec![
                AnswerRecord::Dnskey {
                    flags: 257,
                    algorithm: 13,
                    key_tag: 44745,
                },
                AnswerRecord::Rrsig {
                    type_covered: 48,
                    expiration: 1_700_000_000,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_query_decodes_ds_answer() {
        let ds = DS::new(20326, Algorithm::RSASHA256, DigestType::SHA256, vec![0xDE; 32]);
        let nameserver = serve_once(vec![record(DNSSECRData::DS(ds))]).await;

        let answer = NetworkResolver::new()
            .query("example.com", QueryType::Ds, &nameserver)
            .await
            .unwrap();

        assert_eq!(
            answer.records,
            vec![AnswerRecord::Ds {
                key_tag: 20326,
                algorithm: 8,
                digest_type: 2,
            }]
        );
    }

    #[test]
    fn test_key_tag_checksum() {
        // 0x0101 + 0x0308 + 0xAABB
        let key = dnskey(Algorithm::RSASHA256, vec![0xAA, 0xBB]);
        assert_eq!(key_tag(&key), Some(0xAEC4));
    }

    #[test]
    fn test_key_tag_rsamd5_reads_modulus() {
        let modulus = vec![0x01, 0x00, 0x01, 0x12, 0x34, 0x56];
        let key = dnskey(Algorithm::from_u8(ALGORITHM_RSAMD5), modulus);
        assert_eq!(key_tag(&key), Some(0x1234));
    }

    #[test]
    fn test_convert_record_keeps_unhandled_types() {
        let record = Record::from_rdata(
            zone(),
            300,
            RData::NS(trust_dns_proto::rr::rdata::NS(zone())),
        );
        assert_eq!(convert_record(&record), AnswerRecord::Other(2));
    }

    #[test]
    fn test_build_message_sets_edns() {
        let message = build_message("example.com", QueryType::Dnskey).unwrap();
        let edns = message.extensions().as_ref().unwrap();
        assert_eq!(edns.max_payload(), DNSSEC_PAYLOAD_LEN);
        assert!(edns.dnssec_ok());
        assert!(message.recursion_desired());
        assert_eq!(message.queries()[0].query_type(), RecordType::DNSKEY);
        assert!(message.queries()[0].name().is_fqdn());
    }

    #[test]
    fn test_build_message_plain_query() {
        let message = build_message("_dmarc.example.com.", QueryType::Txt).unwrap();
        let edns = message.extensions().as_ref().unwrap();
        assert_eq!(edns.max_payload(), DEFAULT_PAYLOAD_LEN);
        assert!(!edns.dnssec_ok());
        assert_eq!(
            message.queries()[0].name().to_utf8(),
            "_dmarc.example.com."
        );
    }
}
