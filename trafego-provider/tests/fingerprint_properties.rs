//! Property tests for the canonical record model.
//!
//! These pin down the invariants the reconciler depends on: the
//! fingerprint is a pure function of canonical content, and
//! canonicalization is idempotent and insensitive to the cosmetic
//! variation seen in real-world inputs (name case, trailing dots).

use proptest::prelude::*;

use trafego_provider::{canonicalize, fingerprint, Record, RecordData};

/// A hostname label: 1-10 lowercase-able alphanumeric chars.
fn label() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{1,10}"
}

/// A 2-4 label hostname with randomized case.
fn hostname() -> impl Strategy<Value = String> {
    prop::collection::vec(label(), 2..=4).prop_map(|labels| labels.join("."))
}

fn ipv4() -> impl Strategy<Value = String> {
    (0u8..=255, 0u8..=255, 0u8..=255, 0u8..=255)
        .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}"))
}

fn arb_record() -> impl Strategy<Value = Record> {
    (
        hostname(),
        0u32..=900_000,
        prop_oneof![
            ipv4().prop_map(|address| RecordData::A { address }),
            hostname().prop_map(|target| RecordData::CNAME { target }),
            "[ -~]{1,40}".prop_map(|text| RecordData::TXT { text }),
            (0u16..=65535, hostname())
                .prop_map(|(priority, exchange)| RecordData::MX { priority, exchange }),
            (0u16..=65535, 0u16..=65535, 0u16..=65535, hostname()).prop_map(
                |(priority, weight, port, target)| RecordData::SRV {
                    priority,
                    weight,
                    port,
                    target,
                }
            ),
        ],
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(name, ttl, data, proxied)| Record {
            name,
            ttl,
            data,
            proxied,
            comment: None,
        })
}

proptest! {
    /// canonicalize(canonicalize(r)) == canonicalize(r), and fingerprints agree.
    #[test]
    fn canonicalize_is_idempotent(record in arb_record()) {
        let once = canonicalize(record).unwrap();
        let twice = canonicalize(once.clone()).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(fingerprint(&once), fingerprint(&twice));
    }

    /// The fingerprint ignores name case and trailing dots.
    #[test]
    fn fingerprint_invariant_under_name_cosmetics(record in arb_record()) {
        let plain = canonicalize(record.clone()).unwrap();

        let mut shouted = record.clone();
        shouted.name = format!("{}.", shouted.name.to_uppercase());
        let shouted = canonicalize(shouted).unwrap();

        prop_assert_eq!(fingerprint(&plain), fingerprint(&shouted));
    }

    /// The fingerprint ignores the comment field entirely.
    #[test]
    fn fingerprint_ignores_comment(record in arb_record(), comment in "[ -~]{0,30}") {
        let bare = canonicalize(record.clone()).unwrap();
        let mut commented = record;
        commented.comment = Some(comment);
        let commented = canonicalize(commented).unwrap();
        prop_assert_eq!(fingerprint(&bare), fingerprint(&commented));
    }

    /// Canonical TTLs are always within range or a preserved sentinel.
    #[test]
    fn ttl_always_in_range(record in arb_record()) {
        let canon = canonicalize(record).unwrap();
        prop_assert!(
            canon.ttl == 0 || canon.ttl == 1 || (30..=604_800).contains(&canon.ttl),
            "ttl out of range: {}", canon.ttl
        );
    }

    /// Two canonical records are fingerprint-equal iff their reconciled
    /// content is equal (comment aside).
    #[test]
    fn fingerprint_equality_matches_content_equality(a in arb_record(), b in arb_record()) {
        let a = canonicalize(a).unwrap();
        let b = canonicalize(b).unwrap();
        let structurally_equal = {
            let mut a2 = a.clone();
            let mut b2 = b.clone();
            a2.comment = None;
            b2.comment = None;
            a2 == b2
        };
        prop_assert_eq!(fingerprint(&a) == fingerprint(&b), structurally_equal);
    }
}
