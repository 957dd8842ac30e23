//! Scripted resolver for tests

use super::{strip_root, AnswerRecord, DnsAnswer, DnsResolver, QueryType, Rcode};
use async_trait::async_trait;
use mailcheck_common::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

enum Scripted {
    Answer(DnsAnswer),
    Failure(String),
}

/// In-memory resolver answering from scripted responses.
///
/// Unscripted queries answer NXDOMAIN; unscripted system lookups fail.
#[derive(Default)]
pub struct MockResolver {
    answers: HashMap<(String, QueryType), Scripted>,
    failing_nameservers: HashSet<String>,
    system_txt: HashMap<String, Vec<String>>,
    system_mx: HashMap<String, Vec<(u16, String)>>,
    queries: Mutex<Vec<(String, QueryType, String)>>,
}

fn key(name: &str) -> String {
    strip_root(name).to_ascii_lowercase()
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, name: &str, query_type: QueryType, answer: DnsAnswer) -> Self {
        self.answers
            .insert((key(name), query_type), Scripted::Answer(answer));
        self
    }

    pub fn with_records(self, name: &str, query_type: QueryType, records: Vec<AnswerRecord>) -> Self {
        self.with_answer(name, query_type, DnsAnswer::success(records))
    }

    pub fn with_txt(self, name: &str, txt: &[&str]) -> Self {
        let records = txt.iter().map(|t| AnswerRecord::Txt(t.to_string())).collect();
        self.with_records(name, QueryType::Txt, records)
    }

    pub fn with_rcode(self, name: &str, query_type: QueryType, rcode: Rcode) -> Self {
        self.with_answer(name, query_type, DnsAnswer::new(rcode, Vec::new()))
    }

    pub fn with_failure(mut self, name: &str, query_type: QueryType) -> Self {
        self.answers.insert(
            (key(name), query_type),
            Scripted::Failure(format!("timed out querying {} {}", name, query_type)),
        );
        self
    }

    pub fn with_failing_nameserver(mut self, nameserver: &str) -> Self {
        self.failing_nameservers.insert(nameserver.to_string());
        self
    }

    pub fn with_system_txt(mut self, name: &str, txt: &[&str]) -> Self {
        self.system_txt
            .insert(key(name), txt.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn with_system_mx(mut self, name: &str, mx: &[(u16, &str)]) -> Self {
        self.system_mx.insert(
            key(name),
            mx.iter().map(|(p, h)| (*p, h.to_string())).collect(),
        );
        self
    }

    /// Every direct query issued so far, as (name, type, nameserver)
    pub fn queries(&self) -> Vec<(String, QueryType, String)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn queries_to(&self, nameserver: &str) -> usize {
        self.queries()
            .iter()
            .filter(|(_, _, ns)| ns == nameserver)
            .count()
    }
}

#[async_trait]
impl DnsResolver for MockResolver {
    async fn query(
        &self,
        name: &str,
        query_type: QueryType,
        nameserver: &str,
    ) -> Result<DnsAnswer> {
        self.queries
            .lock()
            .unwrap()
            .push((key(name), query_type, nameserver.to_string()));

        if self.failing_nameservers.contains(nameserver) {
            return Err(Error::Dns(format!("connection refused by {}", nameserver)));
        }

        match self.answers.get(&(key(name), query_type)) {
            Some(Scripted::Answer(answer)) => Ok(answer.clone()),
            Some(Scripted::Failure(reason)) => Err(Error::Dns(reason.clone())),
            None => Ok(DnsAnswer::new(Rcode::NXDOMAIN, Vec::new())),
        }
    }

    async fn system_txt(&self, name: &str) -> Result<Vec<String>> {
        self.system_txt
            .get(&key(name))
            .cloned()
            .ok_or_else(|| Error::Dns(format!("no record found for {}", name)))
    }

    async fn system_mx(&self, name: &str) -> Result<Vec<(u16, String)>> {
        self.system_mx
            .get(&key(name))
            .cloned()
            .ok_or_else(|| Error::Dns(format!("no record found for {}", name)))
    }
}
