//! Traefik router hostname source.
//!
//! Polls `GET {api_url}/api/http/routers` and extracts every hostname
//! referenced in a ``Host(`…`)`` rule expression. Each hostname becomes
//! one desired record shaped by the source's configured defaults (the
//! record type and target come from configuration, since Traefik knows
//! nothing about where its entrypoint is reachable).

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use trafego_core::traits::HostnameSource;
use trafego_core::types::DesiredRecord;
use trafego_core::{EngineError, EngineResult};
use trafego_provider::{Record, RecordData, RecordKind};

use crate::config::SourceRecordDefaults;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The subset of a Traefik router object the source cares about.
#[derive(Debug, Deserialize)]
struct TraefikRouter {
    rule: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Matches one `Host(...)` argument list inside a rule expression.
fn host_clause_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"Host(?:SNI)?\(([^)]*)\)").expect("static regex is valid"))
}

/// Matches one backtick- or double-quoted hostname inside the list.
fn host_arg_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new("[`\"]([^`\"]+)[`\"]").expect("static regex is valid"))
}

/// Extract every hostname named by `Host(...)` clauses in a rule.
pub(crate) fn hostnames_in_rule(rule: &str) -> Vec<String> {
    let mut hostnames = Vec::new();
    for clause in host_clause_re().captures_iter(rule) {
        for arg in host_arg_re().captures_iter(&clause[1]) {
            let hostname = arg[1].trim().to_string();
            if !hostname.is_empty() && !hostnames.contains(&hostname) {
                hostnames.push(hostname);
            }
        }
    }
    hostnames
}

/// Polls a Traefik instance for routed hostnames.
pub struct TraefikSource {
    api_url: String,
    defaults: SourceRecordDefaults,
    client: reqwest::Client,
}

impl TraefikSource {
    #[must_use]
    pub fn new(api_url: String, defaults: SourceRecordDefaults) -> Self {
        #[allow(clippy::expect_used)]
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client: TLS backend unavailable");
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            defaults,
            client,
        }
    }

    fn record_for(&self, hostname: String) -> DesiredRecord {
        let data = match self.defaults.kind {
            RecordKind::Cname => RecordData::CNAME {
                target: self.defaults.content.clone(),
            },
            // Everything else is validated down to A at config time.
            _ => RecordData::A {
                address: self.defaults.content.clone(),
            },
        };

        let mut record = Record::new(hostname, self.defaults.ttl, data);
        record.proxied = self.defaults.proxied;
        DesiredRecord {
            record,
            provider_id: self.defaults.provider_id.clone(),
        }
    }
}

#[async_trait]
impl HostnameSource for TraefikSource {
    fn name(&self) -> &str {
        "traefik"
    }

    async fn snapshot(&self) -> EngineResult<Vec<DesiredRecord>> {
        let url = format!("{}/api/http/routers", self.api_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::ProviderUnreachable {
                provider_id: "traefik".to_string(),
                detail: e.to_string(),
            })?;

        let routers: Vec<TraefikRouter> =
            response
                .json()
                .await
                .map_err(|e| EngineError::SerializationError(format!(
                    "traefik source: invalid router payload: {e}"
                )))?;

        let mut records = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for router in routers {
            if router
                .status
                .as_deref()
                .is_some_and(|s| !s.eq_ignore_ascii_case("enabled"))
            {
                continue;
            }
            let Some(rule) = router.rule.as_deref() else {
                continue;
            };
            for hostname in hostnames_in_rule(rule) {
                if seen.insert(hostname.clone()) {
                    records.push(self.record_for(hostname));
                }
            }
        }

        log::debug!("traefik source: {} hostname(s) discovered", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_host_rule() {
        assert_eq!(
            hostnames_in_rule("Host(`app.example.com`)"),
            vec!["app.example.com"]
        );
    }

    #[test]
    fn host_with_path_prefix() {
        assert_eq!(
            hostnames_in_rule("Host(`api.example.com`) && PathPrefix(`/v1`)"),
            vec!["api.example.com"]
        );
    }

    #[test]
    fn multiple_hosts_in_one_clause() {
        assert_eq!(
            hostnames_in_rule("Host(`a.example.com`, `b.example.com`)"),
            vec!["a.example.com", "b.example.com"]
        );
    }

    #[test]
    fn multiple_clauses_or_combined() {
        assert_eq!(
            hostnames_in_rule("Host(`a.example.com`) || Host(`b.example.com`)"),
            vec!["a.example.com", "b.example.com"]
        );
    }

    #[test]
    fn hostsni_clause_matches() {
        assert_eq!(
            hostnames_in_rule("HostSNI(`tls.example.com`)"),
            vec!["tls.example.com"]
        );
    }

    #[test]
    fn double_quoted_v2_syntax() {
        assert_eq!(
            hostnames_in_rule(r#"Host("legacy.example.com")"#),
            vec!["legacy.example.com"]
        );
    }

    #[test]
    fn rule_without_host_yields_nothing() {
        assert!(hostnames_in_rule("PathPrefix(`/metrics`)").is_empty());
        assert!(hostnames_in_rule("").is_empty());
    }

    #[test]
    fn duplicate_hostnames_deduplicated() {
        assert_eq!(
            hostnames_in_rule("Host(`a.example.com`) || Host(`a.example.com`)"),
            vec!["a.example.com"]
        );
    }

    #[test]
    fn record_shape_follows_defaults() {
        let source = TraefikSource::new(
            "http://traefik:8080".to_string(),
            SourceRecordDefaults {
                kind: RecordKind::Cname,
                content: "edge.example.net".to_string(),
                ttl: 120,
                proxied: Some(true),
                provider_id: Some("cf-prod".to_string()),
            },
        );
        let desired = source.record_for("app.example.com".to_string());
        assert_eq!(desired.record.kind(), RecordKind::Cname);
        assert_eq!(desired.record.content(), "edge.example.net");
        assert_eq!(desired.record.ttl, 120);
        assert_eq!(desired.record.proxied, Some(true));
        assert_eq!(desired.provider_id.as_deref(), Some("cf-prod"));
    }
}
