//! Registry persistence tests against a file-backed SQLite database.

mod helpers;

use chrono::Utc;

use chain_status::storage::UrlUpsert;
use chain_status::{Chain, Registry, TrustScore, Vendor};
use helpers::TestPki;

fn evaluated_upsert(pki: &TestPki, host: &str, served_for: &str) -> UrlUpsert {
    let chain = Chain::from_der(&pki.chain_for(&[served_for])).expect("chain parses");
    let policies = pki.policies();
    let now = Utc::now();
    let verdict = |vendor: Vendor| Some(policies.get(vendor).evaluate(&chain, host, now));
    UrlUpsert::from_verdicts(
        host.to_string(),
        true,
        verdict(Vendor::Firefox),
        verdict(Vendor::Chrome),
        verdict(Vendor::Edge),
        now.timestamp_millis(),
    )
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trust.db");
    let pki = TestPki::new();

    {
        let registry = Registry::open(&path).await.unwrap();
        registry
            .upsert(&evaluated_upsert(&pki, "example.com", "example.com"))
            .await
            .unwrap();
        registry
            .upsert(&UrlUpsert::not_evaluated(
                "down.example".to_string(),
                true,
                Utc::now().timestamp_millis(),
            ))
            .await
            .unwrap();
    }

    let registry = Registry::open(&path).await.unwrap();
    let records = registry.get_all().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].host, "down.example");
    assert_eq!(records[0].trust, TrustScore::NOT_EVALUATED);
    assert!(records[0].chain_edge.is_none());

    let stored = &records[1];
    assert_eq!(stored.host, "example.com");
    assert_eq!(stored.trust, TrustScore::TRUSTED);
    let firefox = stored.chain_firefox.as_ref().unwrap();
    assert!(firefox.authorized);
    assert_eq!(firefox.annotated_chain.len(), 2);
    assert_eq!(firefox.trust_anchor, Some(pki.root_fingerprint()));
}

#[tokio::test]
async fn test_upsert_replaces_row_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::open(&dir.path().join("trust.db")).await.unwrap();
    let pki = TestPki::new();

    let first = registry
        .upsert(&evaluated_upsert(&pki, "example.com", "other.example"))
        .await
        .unwrap();
    let mismatch = registry.get("example.com").await.unwrap().unwrap();
    assert_eq!(mismatch.trust, TrustScore::UNTRUSTED);

    let second = registry
        .upsert(&evaluated_upsert(&pki, "example.com", "example.com"))
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(registry.count().await.unwrap(), 1);

    let fixed = registry.get("example.com").await.unwrap().unwrap();
    assert_eq!(fixed.trust, TrustScore::TRUSTED);
    assert!(fixed.updated_at_ms >= mismatch.updated_at_ms);
}

#[tokio::test]
async fn test_delete_single_and_all() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::open(&dir.path().join("trust.db")).await.unwrap();
    let now = Utc::now().timestamp_millis();

    for host in ["a.example", "b.example", "c.example"] {
        registry
            .upsert(&UrlUpsert::not_evaluated(host.to_string(), true, now))
            .await
            .unwrap();
    }

    assert!(registry.delete("b.example").await.unwrap());
    assert!(!registry.delete("b.example").await.unwrap());
    assert!(registry.get("b.example").await.unwrap().is_none());

    assert_eq!(registry.delete_all().await.unwrap(), 2);
    assert_eq!(registry.delete_all().await.unwrap(), 0);
    assert!(registry.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_open_fails_for_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("trust.db");
    assert!(Registry::open(&path).await.is_err());
}
