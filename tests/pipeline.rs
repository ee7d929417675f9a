use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use std::future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use summa_web3::auth::{self, SignatureVerifier};
use summa_web3::pipeline::{Pipeline, PipelineError, Stage};
use summa_web3::scraper::{ContentFetcher, FetchCause, FetchPolicy, HttpResponse, HttpTransport};
use summa_web3::storage::{Storage, SummaryStore};
use summa_web3::SummarizationEngine;

const URL: &str = "https://example.com/a";

enum Reply {
    Body(&'static str),
    Refused,
    Hang,
}

struct StubTransport {
    reply: Reply,
    calls: AtomicU32,
}

impl StubTransport {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn get(&self, _url: &str) -> Result<HttpResponse, FetchCause> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Body(body) => Ok(HttpResponse {
                status: 200,
                body: body.to_string(),
            }),
            Reply::Refused => Err(FetchCause::Connection("connection refused".into())),
            Reply::Hang => future::pending().await,
        }
    }
}

fn pipeline(reply: Reply) -> Pipeline<StubTransport> {
    let policy = FetchPolicy {
        max_retries: 3,
        retry_delay: Duration::from_millis(10),
    };
    Pipeline::new(
        SignatureVerifier::new(),
        ContentFetcher::new(StubTransport::new(reply), policy),
        Arc::new(SummarizationEngine::mock()),
    )
}

fn wallet(seed: u8) -> (String, String) {
    let key = SigningKey::from_slice(&[seed; 32]).unwrap();
    let address = auth::address_of(key.verifying_key());
    let signature = auth::sign_message(&key).unwrap();
    (address, signature)
}

#[tokio::test]
async fn signed_request_is_summarized_in_mock_mode() {
    let (address, signature) = wallet(0x21);
    let pipeline = pipeline(Reply::Body("S1. S2. S3. S4. S5."));

    let output = pipeline.run(&address, &signature, URL).await.unwrap();

    assert_eq!(output.summary_text, "S1. S3. S5.");
    assert_eq!(output.original_text, "S1. S2. S3. S4. S5.");
    assert_eq!(output.url, URL);
    assert_eq!(output.wallet_address, address);
}

#[tokio::test]
async fn wrong_wallet_is_rejected_before_fetching() {
    let (_, signature) = wallet(0x21);
    let (other, _) = wallet(0x22);
    let pipeline = pipeline(Reply::Body("S1. S2. S3. S4. S5."));

    let err = pipeline.run(&other, &signature, URL).await.unwrap_err();

    assert!(matches!(err, PipelineError::InvalidSignature(_)));
    assert_eq!(err.status_code(), 401);
    assert_eq!(err.stage(), Stage::Unverified);
}

#[tokio::test]
async fn malformed_signature_is_an_auth_error() {
    let (address, _) = wallet(0x21);
    let pipeline = pipeline(Reply::Body("text"));

    let err = pipeline.run(&address, "", URL).await.unwrap_err();
    assert!(matches!(err, PipelineError::Auth(_)));
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn unreachable_site_fails_after_three_attempts() {
    let (address, signature) = wallet(0x21);
    let pipeline = pipeline(Reply::Refused);

    let err = pipeline.run(&address, &signature, URL).await.unwrap_err();

    match &err {
        PipelineError::Fetch(fetch) => {
            assert_eq!(fetch.attempts, 3);
            assert!(fetch.is_retryable());
        }
        other => panic!("expected fetch error, got {:?}", other),
    }
    assert_eq!(err.stage(), Stage::Verified);
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn empty_page_fails_summarization() {
    let (address, signature) = wallet(0x21);
    let pipeline = pipeline(Reply::Body("<html><body><script>x()</script></body></html>"));

    let err = pipeline.run(&address, &signature, URL).await.unwrap_err();
    assert!(matches!(err, PipelineError::Summarization(_)));
    assert_eq!(err.stage(), Stage::Extracted);
}

#[tokio::test]
async fn successful_runs_are_persisted_and_failures_are_not() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::open(dir.path()).unwrap();
    let (address, signature) = wallet(0x31);

    let ok = pipeline(Reply::Body("S1. S2. S3. S4. S5."));
    let stored = ok
        .run_and_store(&storage, &address, &signature, URL)
        .await
        .unwrap();
    assert_eq!(stored.summary_content, "S1. S3. S5.");
    assert_eq!(stored.article_url, URL);

    let failing = pipeline(Reply::Refused);
    assert!(failing
        .run_and_store(&storage, &address, &signature, URL)
        .await
        .is_err());

    let history = storage.list_for_wallet(&address).await.unwrap();
    assert_eq!(history, vec![stored]);
}

#[tokio::test]
async fn abandoned_run_does_not_affect_others() {
    let (address, signature) = wallet(0x41);
    let hanging = Arc::new(pipeline(Reply::Hang));
    let healthy = Arc::new(pipeline(Reply::Body("A. B. C. D. E.")));

    let abandoned = {
        let hanging = hanging.clone();
        let (address, signature) = (address.clone(), signature.clone());
        tokio::spawn(async move {
            tokio::time::timeout(
                Duration::from_millis(50),
                hanging.run(&address, &signature, URL),
            )
            .await
        })
    };

    let mut runs = Vec::new();
    for _ in 0..5 {
        let healthy = healthy.clone();
        let (address, signature) = (address.clone(), signature.clone());
        runs.push(tokio::spawn(async move {
            healthy.run(&address, &signature, URL).await
        }));
    }

    for run in runs {
        let output = run.await.unwrap().unwrap();
        assert_eq!(output.summary_text, "A. C. E.");
    }
    assert!(abandoned.await.unwrap().is_err());
}

#[tokio::test]
async fn extract_only_still_requires_a_valid_signature() {
    let (address, signature) = wallet(0x51);
    let pipeline = pipeline(Reply::Body("<title>T</title><article>Body.</article>"));

    let content = pipeline.extract_only(&address, &signature, URL).await.unwrap();
    assert_eq!(content.title.as_deref(), Some("T"));
    assert_eq!(content.text, "Body.");

    let (other, _) = wallet(0x52);
    assert!(pipeline.extract_only(&other, &signature, URL).await.is_err());
}
