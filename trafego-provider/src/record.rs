//! Canonical DNS record model and content fingerprint.
//!
//! Every record flowing through the engine: desired records from upstream
//! sources, records listed from a provider, rows in the managed store: is
//! normalized through [`canonicalize`] first, so that equality checks and
//! [`fingerprint`] digests are meaningful across all of them.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AdapterError, Result};

/// Marker token embedded in a record's provider-side comment to identify
/// records the engine owns, so ownership survives loss of the local
/// database on providers that support comments.
pub const OWNERSHIP_MARKER: &str = "trafego:owned";

/// Longest TTL accepted after canonicalization (7 days).
const TTL_MAX: u32 = 604_800;
/// Shortest non-sentinel TTL accepted after canonicalization.
const TTL_MIN: u32 = 30;

/// DNS record type identifier.
///
/// Serialized as uppercase strings (`"A"`, `"AAAA"`, `"CNAME"`, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Canonical name (alias) record.
    Cname,
    /// Text record.
    Txt,
    /// Mail exchange record.
    Mx,
    /// Service locator record.
    Srv,
    /// Certificate Authority Authorization record.
    Caa,
    /// Name server record.
    Ns,
}

impl RecordKind {
    /// Uppercase wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Txt => "TXT",
            Self::Mx => "MX",
            Self::Srv => "SRV",
            Self::Caa => "CAA",
            Self::Ns => "NS",
        }
    }

    /// Whether a CDN proxy flag is meaningful for this record type.
    #[must_use]
    pub fn admits_proxying(self) -> bool {
        matches!(self, Self::A | Self::Aaaa | Self::Cname)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "TXT" => Ok(Self::Txt),
            "MX" => Ok(Self::Mx),
            "SRV" => Ok(Self::Srv),
            "CAA" => Ok(Self::Caa),
            "NS" => Ok(Self::Ns),
            other => Err(AdapterError::invalid(
                "type",
                format!("unknown record type '{other}'"),
            )),
        }
    }
}

/// Type-safe representation of DNS record data.
///
/// Each variant carries the fields specific to that record type, so a
/// record cannot be constructed with, say, an MX priority on a TXT record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum RecordData {
    /// A record: maps a hostname to an IPv4 address.
    A { address: String },

    /// AAAA record: maps a hostname to an IPv6 address.
    AAAA { address: String },

    /// CNAME record: alias from one name to another.
    CNAME { target: String },

    /// TXT record: arbitrary text data.
    TXT { text: String },

    /// MX record: mail exchange server.
    MX { priority: u16, exchange: String },

    /// SRV record: service locator.
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },

    /// CAA record: Certificate Authority Authorization.
    CAA { flags: u8, tag: String, value: String },

    /// NS record: authoritative name server.
    NS { nameserver: String },
}

impl RecordData {
    /// Returns the [`RecordKind`] discriminant for this record data.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::A { .. } => RecordKind::A,
            Self::AAAA { .. } => RecordKind::Aaaa,
            Self::CNAME { .. } => RecordKind::Cname,
            Self::TXT { .. } => RecordKind::Txt,
            Self::MX { .. } => RecordKind::Mx,
            Self::SRV { .. } => RecordKind::Srv,
            Self::CAA { .. } => RecordKind::Caa,
            Self::NS { .. } => RecordKind::Ns,
        }
    }

    /// Returns the primary content value: the IP for A/AAAA, the target
    /// for CNAME/SRV, the exchange for MX. This is the `content` leg of
    /// the `(type, name, content)` identity key.
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::A { address } | Self::AAAA { address } => address,
            Self::CNAME { target } | Self::SRV { target, .. } => target,
            Self::TXT { text } => text,
            Self::MX { exchange, .. } => exchange,
            Self::CAA { value, .. } => value,
            Self::NS { nameserver } => nameserver,
        }
    }
}

/// A canonical DNS record.
///
/// `name` is a fully-qualified hostname: lowercase, A-labels, no trailing
/// dot. A `ttl` of `0` means "provider default"; `1` is preserved as-is
/// because at least one provider uses it to mean "automatic".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Fully-qualified hostname.
    pub name: String,
    /// Time to live in seconds. `0` = provider default, `1` = automatic.
    pub ttl: u32,
    /// Type-specific record data.
    #[serde(flatten)]
    pub data: RecordData,
    /// Whether CDN proxying is enabled, on providers that support it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    /// Free-form provider-side comment; the engine embeds the ownership
    /// marker here when the provider supports comments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Record {
    /// Convenience constructor with no proxy flag or comment.
    #[must_use]
    pub fn new(name: impl Into<String>, ttl: u32, data: RecordData) -> Self {
        Self {
            name: name.into(),
            ttl,
            data,
            proxied: None,
            comment: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.data.kind()
    }

    #[must_use]
    pub fn content(&self) -> &str {
        self.data.content()
    }

    /// The `(type, name)` key the reconciler indexes by.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey {
            kind: self.kind(),
            name: self.name.clone(),
        }
    }

    /// Whether the comment carries the engine's ownership marker.
    #[must_use]
    pub fn has_ownership_marker(&self) -> bool {
        self.comment
            .as_deref()
            .is_some_and(|c| c.contains(OWNERSHIP_MARKER))
    }
}

/// `(type, normalized name)`: the identity the reconciler keys its
/// desired / provider / managed maps by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub kind: RecordKind,
    pub name: String,
}

impl RecordKey {
    #[must_use]
    pub fn new(kind: RecordKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Normalize a hostname: lowercase, strip the trailing dot, convert IDN
/// labels to A-labels. Wildcard (`*.`) prefixes are preserved.
pub fn canonical_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('.').to_lowercase();
    if trimmed.is_empty() {
        return Err(AdapterError::invalid("name", "hostname must not be empty"));
    }

    // url::Host applies the full IDNA to-ASCII mapping but rejects the
    // wildcard and underscore labels DNS allows, so those are split off
    // before parsing and rejoined afterwards.
    let (prefix, parseable) = match trimmed.strip_prefix("*.") {
        Some(rest) => ("*.", rest),
        None => ("", trimmed.as_str()),
    };

    if parseable.is_empty() {
        return Err(AdapterError::invalid("name", "hostname must not be empty"));
    }

    if parseable
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_'))
    {
        return Ok(format!("{prefix}{parseable}"));
    }

    match url::Host::parse(parseable) {
        Ok(url::Host::Domain(ascii)) => Ok(format!("{prefix}{ascii}")),
        Ok(_) => Err(AdapterError::invalid(
            "name",
            format!("'{raw}' is an address literal, not a hostname"),
        )),
        Err(e) => Err(AdapterError::invalid(
            "name",
            format!("'{raw}' is not a valid hostname: {e}"),
        )),
    }
}

/// Clamp a TTL into the accepted range while preserving the `0`
/// (provider default) and `1` (automatic) sentinels round-trip.
#[must_use]
pub fn clamp_ttl(ttl: u32) -> u32 {
    match ttl {
        0 | 1 => ttl,
        t => t.clamp(TTL_MIN, TTL_MAX),
    }
}

/// Produce the canonical form of a record, validating type-conditional
/// fields along the way.
///
/// # Errors
///
/// Returns [`AdapterError::InvalidRecord`] naming the offending field.
pub fn canonicalize(record: Record) -> Result<Record> {
    let Record {
        name,
        ttl,
        data,
        proxied,
        comment,
    } = record;

    let name = canonical_name(&name)?;
    let ttl = clamp_ttl(ttl);

    let data = match data {
        RecordData::A { address } => {
            let addr: Ipv4Addr = address.trim().parse().map_err(|_| {
                AdapterError::invalid("content", format!("'{address}' is not an IPv4 address"))
            })?;
            RecordData::A {
                address: addr.to_string(),
            }
        }
        RecordData::AAAA { address } => {
            let addr: Ipv6Addr = address.trim().parse().map_err(|_| {
                AdapterError::invalid("content", format!("'{address}' is not an IPv6 address"))
            })?;
            RecordData::AAAA {
                address: addr.to_string(),
            }
        }
        RecordData::CNAME { target } => RecordData::CNAME {
            target: canonical_name(&target)
                .map_err(|_| AdapterError::invalid("content", "CNAME target is not a hostname"))?,
        },
        RecordData::NS { nameserver } => RecordData::NS {
            nameserver: canonical_name(&nameserver)
                .map_err(|_| AdapterError::invalid("content", "NS target is not a hostname"))?,
        },
        RecordData::MX { priority, exchange } => RecordData::MX {
            priority,
            exchange: canonical_name(&exchange)
                .map_err(|_| AdapterError::invalid("content", "MX exchange is not a hostname"))?,
        },
        RecordData::SRV {
            priority,
            weight,
            port,
            target,
        } => {
            // "." is the RFC 2782 "service not available" target.
            let target = if target.trim() == "." {
                ".".to_string()
            } else {
                canonical_name(&target).map_err(|_| {
                    AdapterError::invalid("content", "SRV target is not a hostname")
                })?
            };
            RecordData::SRV {
                priority,
                weight,
                port,
                target,
            }
        }
        RecordData::CAA { flags, tag, value } => {
            let tag = tag.to_lowercase();
            if !matches!(tag.as_str(), "issue" | "issuewild" | "iodef") {
                return Err(AdapterError::invalid(
                    "tag",
                    format!("CAA tag must be issue, issuewild, or iodef (got '{tag}')"),
                ));
            }
            if value.trim().is_empty() {
                return Err(AdapterError::invalid("content", "CAA value must not be empty"));
            }
            RecordData::CAA {
                flags,
                tag,
                value: value.trim().to_string(),
            }
        }
        RecordData::TXT { text } => {
            if text.is_empty() {
                return Err(AdapterError::invalid("content", "TXT value must not be empty"));
            }
            RecordData::TXT { text }
        }
    };

    // Drop the proxy flag where it has no meaning, so fingerprints of
    // equivalent records agree regardless of how the input spelled it.
    let proxied = if data.kind().admits_proxying() {
        proxied
    } else {
        None
    };

    Ok(Record {
        name,
        ttl,
        data,
        proxied,
        comment,
    })
}

/// Content fingerprint: hex-encoded SHA-256 over the canonical tuple.
///
/// The digest covers kind, name, content, TTL, the proxy flag (only where
/// meaningful and set), and every type-conditional field, joined with an
/// unprintable separator so no field value can collide with the framing.
/// Fingerprint equality means "same record, same content" for
/// reconciliation purposes.
#[must_use]
pub fn fingerprint(record: &Record) -> String {
    const SEP: &str = "\x1f";

    let mut hasher = Sha256::new();
    let mut push = |part: &str| {
        hasher.update(part.as_bytes());
        hasher.update(SEP.as_bytes());
    };

    push(record.kind().as_str());
    push(&record.name);
    push(record.content());
    push(&record.ttl.to_string());

    if record.kind().admits_proxying() {
        if let Some(p) = record.proxied {
            push(if p { "1" } else { "0" });
        }
    }

    match &record.data {
        RecordData::MX { priority, .. } => push(&priority.to_string()),
        RecordData::SRV {
            priority,
            weight,
            port,
            ..
        } => {
            push(&priority.to_string());
            push(&weight.to_string());
            push(&port.to_string());
        }
        RecordData::CAA { flags, tag, .. } => {
            push(&flags.to_string());
            push(tag);
        }
        _ => {}
    }

    hex::encode(hasher.finalize())
}

/// Structural equality for reconciliation: two records are the same when
/// their fingerprints agree (comments and other transient fields ignored).
#[must_use]
pub fn records_equal(a: &Record, b: &Record) -> bool {
    fingerprint(a) == fingerprint(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a_record(name: &str, address: &str, ttl: u32) -> Record {
        Record::new(
            name,
            ttl,
            RecordData::A {
                address: address.to_string(),
            },
        )
    }

    // ============ canonical_name ============

    #[test]
    fn name_lowercased_and_dot_stripped() {
        let got = canonical_name("App.Example.COM.").unwrap();
        assert_eq!(got, "app.example.com");
    }

    #[test]
    fn name_idn_to_a_labels() {
        let got = canonical_name("münchen.example.com").unwrap();
        assert_eq!(got, "xn--mnchen-3ya.example.com");
    }

    #[test]
    fn name_wildcard_preserved() {
        let got = canonical_name("*.Example.com").unwrap();
        assert_eq!(got, "*.example.com");
    }

    #[test]
    fn name_underscore_labels_allowed() {
        let got = canonical_name("_sip._tcp.example.com").unwrap();
        assert_eq!(got, "_sip._tcp.example.com");
    }

    #[test]
    fn name_empty_rejected() {
        let res = canonical_name("  ");
        assert!(
            matches!(&res, Err(AdapterError::InvalidRecord { field, .. }) if field == "name"),
            "unexpected result: {res:?}"
        );
    }

    // ============ clamp_ttl ============

    #[test]
    fn ttl_sentinels_preserved() {
        assert_eq!(clamp_ttl(0), 0);
        assert_eq!(clamp_ttl(1), 1);
    }

    #[test]
    fn ttl_clamped_low_and_high() {
        assert_eq!(clamp_ttl(5), 30);
        assert_eq!(clamp_ttl(10_000_000), 604_800);
        assert_eq!(clamp_ttl(300), 300);
    }

    // ============ canonicalize ============

    #[test]
    fn canonicalize_a_record() {
        let rec = canonicalize(a_record("App.Example.com.", "1.2.3.4", 300)).unwrap();
        assert_eq!(rec.name, "app.example.com");
        assert_eq!(rec.content(), "1.2.3.4");
        assert_eq!(rec.ttl, 300);
    }

    #[test]
    fn canonicalize_rejects_bad_ipv4() {
        let res = canonicalize(a_record("app.example.com", "999.1.1.1", 300));
        assert!(
            matches!(&res, Err(AdapterError::InvalidRecord { field, .. }) if field == "content"),
            "unexpected result: {res:?}"
        );
    }

    #[test]
    fn canonicalize_normalizes_ipv6_case() {
        let rec = canonicalize(Record::new(
            "v6.example.com",
            300,
            RecordData::AAAA {
                address: "2001:DB8:0:0::1".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(rec.content(), "2001:db8::1");
    }

    #[test]
    fn canonicalize_cname_target_normalized() {
        let rec = canonicalize(Record::new(
            "alias.example.com",
            0,
            RecordData::CNAME {
                target: "Svc.Example.NET.".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(rec.content(), "svc.example.net");
    }

    #[test]
    fn canonicalize_caa_tag_validated() {
        let res = canonicalize(Record::new(
            "example.com",
            300,
            RecordData::CAA {
                flags: 0,
                tag: "bogus".to_string(),
                value: "letsencrypt.org".to_string(),
            },
        ));
        assert!(
            matches!(&res, Err(AdapterError::InvalidRecord { field, .. }) if field == "tag"),
            "unexpected result: {res:?}"
        );
    }

    #[test]
    fn canonicalize_caa_tag_case_insensitive() {
        let rec = canonicalize(Record::new(
            "example.com",
            300,
            RecordData::CAA {
                flags: 128,
                tag: "ISSUE".to_string(),
                value: "letsencrypt.org".to_string(),
            },
        ))
        .unwrap();
        assert!(matches!(rec.data, RecordData::CAA { ref tag, .. } if tag == "issue"));
    }

    #[test]
    fn canonicalize_srv_dot_target() {
        let rec = canonicalize(Record::new(
            "_sip._tcp.example.com",
            300,
            RecordData::SRV {
                priority: 0,
                weight: 0,
                port: 0,
                target: ".".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(rec.content(), ".");
    }

    #[test]
    fn canonicalize_drops_proxied_on_txt() {
        let mut rec = Record::new(
            "example.com",
            300,
            RecordData::TXT {
                text: "hello".to_string(),
            },
        );
        rec.proxied = Some(true);
        let rec = canonicalize(rec).unwrap();
        assert_eq!(rec.proxied, None);
    }

    #[test]
    fn canonicalize_keeps_proxied_on_a() {
        let mut rec = a_record("app.example.com", "1.2.3.4", 1);
        rec.proxied = Some(true);
        let rec = canonicalize(rec).unwrap();
        assert_eq!(rec.proxied, Some(true));
        assert_eq!(rec.ttl, 1);
    }

    // ============ fingerprint ============

    #[test]
    fn fingerprint_stable_for_equal_records() {
        let a = canonicalize(a_record("app.example.com", "1.2.3.4", 300)).unwrap();
        let b = canonicalize(a_record("APP.example.com.", "1.2.3.4", 300)).unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert!(records_equal(&a, &b));
    }

    #[test]
    fn fingerprint_differs_on_content() {
        let a = canonicalize(a_record("app.example.com", "1.2.3.4", 300)).unwrap();
        let b = canonicalize(a_record("app.example.com", "5.6.7.8", 300)).unwrap();
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_differs_on_ttl() {
        let a = canonicalize(a_record("app.example.com", "1.2.3.4", 300)).unwrap();
        let b = canonicalize(a_record("app.example.com", "1.2.3.4", 600)).unwrap();
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_differs_on_proxied() {
        let mut a = a_record("app.example.com", "1.2.3.4", 300);
        a.proxied = Some(true);
        let mut b = a_record("app.example.com", "1.2.3.4", 300);
        b.proxied = Some(false);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_ignores_comment() {
        let a = a_record("app.example.com", "1.2.3.4", 300);
        let mut b = a.clone();
        b.comment = Some("trafego:owned".to_string());
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_covers_srv_fields() {
        let base = |weight| {
            Record::new(
                "_sip._tcp.example.com",
                300,
                RecordData::SRV {
                    priority: 10,
                    weight,
                    port: 5060,
                    target: "sip.example.com".to_string(),
                },
            )
        };
        assert_ne!(fingerprint(&base(10)), fingerprint(&base(20)));
    }

    #[test]
    fn fingerprint_idempotent_under_canonicalize() {
        let raw = a_record("App.Example.COM.", "1.2.3.4", 300);
        let once = canonicalize(raw).unwrap();
        let twice = canonicalize(once.clone()).unwrap();
        assert_eq!(fingerprint(&once), fingerprint(&twice));
    }

    // ============ ownership marker ============

    #[test]
    fn marker_detected_as_substring() {
        let mut rec = a_record("app.example.com", "1.2.3.4", 300);
        assert!(!rec.has_ownership_marker());
        rec.comment = Some("managed (trafego:owned)".to_string());
        assert!(rec.has_ownership_marker());
    }

    // ============ serde ============

    #[test]
    fn record_serde_round_trip() {
        let rec = Record {
            name: "mail.example.com".to_string(),
            ttl: 3600,
            data: RecordData::MX {
                priority: 10,
                exchange: "mx1.example.com".to_string(),
            },
            proxied: None,
            comment: Some("trafego:owned".to_string()),
        };
        let json = serde_json::to_string(&rec).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn record_kind_parse() {
        assert_eq!("aaaa".parse::<RecordKind>().unwrap(), RecordKind::Aaaa);
        assert!("LOC".parse::<RecordKind>().is_err());
    }
}
