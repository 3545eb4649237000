//! End-to-end verification tests over canned chains.
//!
//! Drives the orchestrator with an in-memory registry and a fake fetcher so
//! each scenario controls exactly which chain a host presents.

mod helpers;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use chain_status::verify::INVALID_INPUT;
use chain_status::{AddUrlRequest, InputValidationError, PolicyError, TrustScore, Vendor};
use helpers::{create_test_verifier, FakeFetcher, TestPki};

fn hosts(list: &[&str]) -> Vec<String> {
    list.iter().map(|h| h.to_string()).collect()
}

#[tokio::test]
async fn test_valid_chain_scores_three_everywhere() {
    let pki = TestPki::new();
    let fetcher = FakeFetcher::new(vec![("good.example.com", pki.chain_for(&["good.example.com"]))]);
    let verifier = create_test_verifier(&pki, fetcher, 4).await;

    let report = verifier
        .submit(&hosts(&["good.example.com"]), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.inserted, 1);
    assert!(!report.had_errors, "{:?}", report.failures);

    let record = verifier
        .registry()
        .get("good.example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.trust, TrustScore::TRUSTED);
    assert_eq!(record.trust_firefox, TrustScore::TRUSTED);
    assert_eq!(record.trust_chrome, TrustScore::TRUSTED);
    assert_eq!(record.trust_edge, TrustScore::TRUSTED);
    assert!(record.tls);

    let firefox = record.chain_firefox.unwrap();
    assert_eq!(firefox.vendor, Vendor::Firefox);
    assert!(firefox.authorized);
    assert_eq!(firefox.annotated_chain.len(), 2);
    assert_eq!(firefox.trust_anchor, Some(pki.root_fingerprint()));
    // The three vendors share one evaluation instant
    let chrome = record.chain_chrome.unwrap();
    let edge = record.chain_edge.unwrap();
    assert_eq!(firefox.evaluated_at, chrome.evaluated_at);
    assert_eq!(chrome.evaluated_at, edge.evaluated_at);
}

#[tokio::test]
async fn test_expired_leaf_scores_one_everywhere() {
    let pki = TestPki::new();
    let chain = pki.chain_with_validity(&["old.example.com"], -120, -10);
    let fetcher = FakeFetcher::new(vec![("old.example.com", chain)]);
    let verifier = create_test_verifier(&pki, fetcher, 4).await;

    let report = verifier
        .submit(&hosts(&["old.example.com"]), &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.had_errors);
    assert_eq!(report.failures[0].kind, "CERT_EXPIRED");

    let record = verifier
        .registry()
        .get("old.example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.trust, TrustScore::UNTRUSTED);
    for verdict in [&record.chain_firefox, &record.chain_chrome, &record.chain_edge] {
        let verdict = verdict.as_ref().unwrap();
        assert!(!verdict.authorized);
        assert_eq!(verdict.error_code, Some(PolicyError::CertExpired));
    }
}

#[tokio::test]
async fn test_expired_intermediate_scores_one_everywhere() {
    let pki = TestPki::new();
    let chain = pki.chain_with_expired_intermediate(&["stale.example.com"], 5);
    let fetcher = FakeFetcher::new(vec![("stale.example.com", chain)]);
    let verifier = create_test_verifier(&pki, fetcher, 4).await;

    let report = verifier
        .submit(&hosts(&["stale.example.com"]), &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.had_errors);
    assert_eq!(report.failures[0].kind, "CERT_EXPIRED");

    let record = verifier
        .registry()
        .get("stale.example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.trust, TrustScore::UNTRUSTED);
    for verdict in [&record.chain_firefox, &record.chain_chrome, &record.chain_edge] {
        let verdict = verdict.as_ref().unwrap();
        assert_eq!(verdict.error_code, Some(PolicyError::CertExpired));
        assert!(verdict.annotated_chain[0].failed_step.is_none());
        assert!(verdict.annotated_chain[1].failed_step.is_some());
    }
}

#[tokio::test]
async fn test_partial_failure_isolation() {
    let pki = TestPki::new();
    let good_chain = pki.chain_for(&["good.example.com"]);
    let fetcher = FakeFetcher::new(vec![
        ("good.example.com", good_chain.clone()),
        // Serves a certificate for a different name
        ("wrong.host.example", good_chain),
    ]);
    let verifier = create_test_verifier(&pki, fetcher, 4).await;

    let report = verifier
        .submit(
            &hosts(&["good.example.com", "doesnotexist.invalid", "wrong.host.example"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(report.inserted, 3);
    assert!(report.had_errors);

    let registry = verifier.registry();
    let good = registry.get("good.example.com").await.unwrap().unwrap();
    assert_eq!(good.trust, TrustScore::TRUSTED);

    let missing = registry.get("doesnotexist.invalid").await.unwrap().unwrap();
    assert_eq!(missing.trust, TrustScore::NOT_EVALUATED);
    assert_eq!(missing.trust_firefox, TrustScore::NOT_EVALUATED);
    assert_eq!(missing.trust_chrome, TrustScore::NOT_EVALUATED);
    assert_eq!(missing.trust_edge, TrustScore::NOT_EVALUATED);
    assert!(missing.chain_firefox.is_none());
    assert!(missing.chain_chrome.is_none());
    assert!(missing.chain_edge.is_none());

    let wrong = registry.get("wrong.host.example").await.unwrap().unwrap();
    assert_eq!(wrong.trust_firefox, TrustScore::UNTRUSTED);
    assert_eq!(wrong.trust_chrome, TrustScore::UNTRUSTED);
    assert_eq!(wrong.trust_edge, TrustScore::UNTRUSTED);
    assert_eq!(
        wrong.chain_edge.unwrap().error_code,
        Some(PolicyError::HostnameMismatch)
    );

    let mut kinds: Vec<&str> = report.failures.iter().map(|f| f.kind.as_str()).collect();
    kinds.sort();
    assert_eq!(kinds, vec!["HOSTNAME_MISMATCH", "UNREACHABLE"]);
}

#[tokio::test]
async fn test_duplicates_processed_once() {
    let pki = TestPki::new();
    let fetcher = FakeFetcher::new(vec![("example.com", pki.chain_for(&["example.com"]))]);
    let verifier = create_test_verifier(&pki, fetcher.clone(), 4).await;
    let cancel = CancellationToken::new();

    let report = verifier
        .submit(
            &hosts(&["Example.com", "example.com", "https://example.com/path", "example.com."]),
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(fetcher.calls(), 1);

    // Re-submission overwrites the existing row
    verifier.submit(&hosts(&["EXAMPLE.COM"]), &cancel).await.unwrap();
    assert_eq!(verifier.registry().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrency_bound_reached_not_exceeded() {
    let pki = TestPki::new();
    let chain = pki.chain_for(&["*.example.com"]);
    let names: Vec<String> = (0..20).map(|i| format!("h{i}.example.com")).collect();
    let fetcher = FakeFetcher::new(names.iter().map(|n| (n.as_str(), chain.clone())).collect())
        .with_delay(Duration::from_millis(50));
    let verifier = create_test_verifier(&pki, fetcher.clone(), 3).await;

    let report = verifier
        .submit(&names, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.inserted, 20);
    assert!(!report.had_errors, "{:?}", report.failures);
    // The bound is reached but never exceeded
    assert_eq!(fetcher.max_in_flight(), 3);
}

#[tokio::test]
async fn test_cancelled_before_start_stores_nothing() {
    let pki = TestPki::new();
    let fetcher = FakeFetcher::new(vec![("example.com", pki.chain_for(&["example.com"]))]);
    let verifier = create_test_verifier(&pki, fetcher.clone(), 4).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = verifier
        .submit(&hosts(&["example.com", "other.example"]), &cancel)
        .await
        .unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.cancelled, 2);
    assert_eq!(fetcher.calls(), 0);
    assert!(verifier.registry().get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_drops_in_flight_hosts() {
    let pki = TestPki::new();
    let fetcher = FakeFetcher::new(vec![("slow.example", pki.chain_for(&["slow.example"]))])
        .with_delay(Duration::from_secs(30));
    let verifier = create_test_verifier(&pki, fetcher, 4).await;
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        verifier.submit(&hosts(&["slow.example"]), &cancel),
    )
    .await
    .expect("cancellation should end the batch promptly")
    .unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.cancelled, 1);
    assert_eq!(verifier.registry().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_inputs_reported_without_fetching() {
    let pki = TestPki::new();
    let fetcher = FakeFetcher::new(vec![("example.com", pki.chain_for(&["example.com"]))]);
    let verifier = create_test_verifier(&pki, fetcher.clone(), 4).await;

    let report = verifier
        .submit(
            &hosts(&["ftp://example.com", "not a host", "example.com"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(report.inserted, 1);
    assert!(report.had_errors);
    assert_eq!(fetcher.calls(), 1);
    let invalid: Vec<&str> = report
        .failures
        .iter()
        .filter(|f| f.kind == INVALID_INPUT)
        .map(|f| f.input.as_str())
        .collect();
    assert_eq!(invalid, vec!["ftp://example.com", "not a host"]);
}

#[tokio::test]
async fn test_empty_submission_rejected() {
    let pki = TestPki::new();
    let verifier = create_test_verifier(&pki, FakeFetcher::default(), 4).await;
    let cancel = CancellationToken::new();

    assert_eq!(
        verifier.submit(&[], &cancel).await.unwrap_err(),
        InputValidationError::EmptySubmission
    );
    assert_eq!(
        verifier
            .add_url(AddUrlRequest::default(), &cancel)
            .await
            .unwrap_err(),
        InputValidationError::EmptySubmission
    );
    let only_comments = AddUrlRequest {
        host_or_url: None,
        hosts_or_urls_file: Some("# nothing here\n\n".to_string()),
    };
    assert_eq!(
        verifier.add_url(only_comments, &cancel).await.unwrap_err(),
        InputValidationError::EmptySubmission
    );
}

#[tokio::test]
async fn test_add_url_combines_host_and_file() {
    let pki = TestPki::new();
    let chain = pki.chain_for(&["a.example", "b.example", "c.example"]);
    let fetcher = FakeFetcher::new(vec![
        ("a.example", chain.clone()),
        ("b.example", chain.clone()),
        ("c.example", chain),
    ]);
    let verifier = create_test_verifier(&pki, fetcher, 4).await;

    let request = AddUrlRequest {
        host_or_url: Some("https://a.example/".to_string()),
        hosts_or_urls_file: Some("# batch\nb.example\n\nhttp://c.example\na.example\n".to_string()),
    };
    let report = verifier
        .add_url(request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.inserted, 3);
    assert!(!report.had_errors, "{:?}", report.failures);

    let c = verifier.registry().get("c.example").await.unwrap().unwrap();
    assert!(!c.tls);
}

#[tokio::test]
async fn test_unparseable_chain_is_handshake_failure() {
    let pki = TestPki::new();
    let fetcher = FakeFetcher::new(vec![("garbage.example", vec![vec![0x30, 0x03, 0x01, 0x02, 0x03]])]);
    let verifier = create_test_verifier(&pki, fetcher, 4).await;

    let report = verifier
        .submit(&hosts(&["garbage.example"]), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.failures[0].kind, "HANDSHAKE_FAILED");
    let record = verifier
        .registry()
        .get("garbage.example")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.trust, TrustScore::NOT_EVALUATED);
    assert!(record.chain_chrome.is_none());
}

#[tokio::test]
async fn test_delete_all_count_matches_records() {
    let pki = TestPki::new();
    let chain = pki.chain_for(&["*.example.com"]);
    let names = hosts(&["a.example.com", "b.example.com", "c.example.com", "d.example.com"]);
    let fetcher = FakeFetcher::new(names.iter().map(|n| (n.as_str(), chain.clone())).collect());
    let verifier = create_test_verifier(&pki, fetcher, 2).await;

    verifier
        .submit(&names, &CancellationToken::new())
        .await
        .unwrap();
    let before = verifier.registry().get_all().await.unwrap().len();
    assert_eq!(before, 4);

    let deleted = verifier.registry().delete_all().await.unwrap();
    assert_eq!(deleted as usize, before);
    assert!(verifier.registry().get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_trust_store_info_lists_roots() {
    let pki = TestPki::new();
    let verifier = create_test_verifier(&pki, FakeFetcher::default(), 4).await;

    for vendor in Vendor::ALL {
        let roots = verifier.trust_store_info(vendor);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].name, "Test Root CA");
        assert_eq!(roots[0].fingerprint, pki.root_fingerprint());
        assert!(roots[0].valid_from < roots[0].valid_to);
    }
}

#[tokio::test]
async fn test_records_serialize_with_read_contract_names() {
    let pki = TestPki::new();
    let fetcher = FakeFetcher::new(vec![("example.com", pki.chain_for(&["example.com"]))]);
    let verifier = create_test_verifier(&pki, fetcher, 4).await;
    verifier
        .submit(&hosts(&["example.com"]), &CancellationToken::new())
        .await
        .unwrap();

    let records = verifier.registry().get_all().await.unwrap();
    let json = serde_json::to_value(&records).unwrap();
    let record = &json[0];
    assert_eq!(record["host"], "example.com");
    assert_eq!(record["trust"], 3);
    assert_eq!(record["trustEdge"], 3);
    assert_eq!(record["chainFirefox"]["authorized"], true);
    assert!(record["chainChrome"]["certs"][0]["fingerprint"].is_string());
    assert!(record["chainChrome"]["certs"][0]["pem"]
        .as_str()
        .unwrap()
        .starts_with("-----BEGIN CERTIFICATE-----"));
}
