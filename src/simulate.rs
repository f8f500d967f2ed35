//! Collector simulator: logs in as a collector and submits sample events.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Deserialize;

use crate::errors::{ComplianceError, ComplianceResult};
use crate::record::IngestRequest;

const MESSAGES: &[&str] = &[
    "User login success",
    "Firewall disabled on host 10.0.0.5",
    "Credit card info leaked",
    "Access to PII by unauthorized user",
    "Health record modified by guest",
    "Admin accessed security camera",
    "Medical data exported",
    "Root access granted to external IP",
];
const USERS: &[&str] = &["admin", "guest", "john.doe", "root"];
const SEVERITIES: &[&str] = &["low", "medium", "high", "critical"];
const SOURCES: &[&str] = &["SIEM", "Firewall", "Endpoint", "DLP"];

fn pick<R: Rng + ?Sized>(rng: &mut R, items: &[&str]) -> String {
    items.choose(rng).copied().unwrap_or_default().to_string()
}

/// Draw one random sample event.
pub fn sample_event<R: Rng + ?Sized>(rng: &mut R) -> IngestRequest {
    IngestRequest {
        message: pick(rng, MESSAGES),
        user: pick(rng, USERS),
        severity: pick(rng, SEVERITIES),
        access_role: Some("user".to_string()),
        source: pick(rng, SOURCES),
    }
}

#[derive(Deserialize)]
struct TokenBody {
    token: String,
}

pub struct Simulator {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl Simulator {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn login(&self, username: &str, password: &str) -> ComplianceResult<String> {
        let res = self
            .client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()?;
        if !res.status().is_success() {
            return Err(ComplianceError::auth(format!(
                "login rejected with status {}",
                res.status()
            )));
        }
        Ok(res.json::<TokenBody>()?.token)
    }

    /// Submit one event and return the server's JSON reply.
    pub fn send(&self, token: &str, event: &IngestRequest) -> ComplianceResult<serde_json::Value> {
        let res = self
            .client
            .post(format!("{}/api/logs/ingest", self.base_url))
            .bearer_auth(token)
            .json(event)
            .send()?;
        let status = res.status();
        let body: serde_json::Value = res.json()?;
        if !status.is_success() {
            return Err(ComplianceError::connectivity(
                "ingest",
                format!("status {status}: {body}"),
            ));
        }
        Ok(body)
    }

    /// Log in once, then submit `count` random events. Returns how many were accepted.
    pub fn run(&self, username: &str, password: &str, count: usize) -> ComplianceResult<usize> {
        let token = self.login(username, password)?;
        let mut rng = rand::rng();
        let mut accepted = 0;
        for _ in 0..count {
            let event = sample_event(&mut rng);
            match self.send(&token, &event) {
                Ok(reply) => {
                    accepted += 1;
                    tracing::info!("Log ingested: {reply}");
                }
                Err(e) => tracing::error!("Simulated ingest failed: {e}"),
            }
        }
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sample_events_pass_validation() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let event = sample_event(&mut rng);
            assert!(event.validate().is_ok());
            assert!(MESSAGES.contains(&event.message.as_str()));
            assert!(SOURCES.contains(&event.source.as_str()));
            assert_eq!(event.access_role.as_deref(), Some("user"));
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let sim = Simulator::new("http://localhost:5000/");
        assert_eq!(sim.base_url, "http://localhost:5000");
    }
}
