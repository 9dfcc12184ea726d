use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use digest_engine::{
    build_message, deliver, ApiSettings, AuthError, Credential, CredentialProvider,
    GmailApiMailer, MailAttachment, MailError, MailTransport, OutgoingMessage,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn draft(body: &str) -> OutgoingMessage {
    OutgoingMessage {
        from: "digest@example.com".into(),
        to: vec!["reader@example.com".into()],
        subject: "Daily digest".into(),
        body: body.into(),
        attachment: None,
    }
}

/// Records what it was asked to send; fails when `fail` is set.
struct FakeTransport {
    name: &'static str,
    limit: usize,
    fail: bool,
    sent: Mutex<Vec<String>>,
}

impl FakeTransport {
    fn new(name: &'static str, limit: usize, fail: bool) -> Self {
        Self {
            name,
            limit,
            fail,
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MailTransport for FakeTransport {
    fn name(&self) -> &str {
        self.name
    }

    fn max_body_len(&self) -> usize {
        self.limit
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message.body.clone());
        if self.fail {
            Err(MailError::Smtp("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[tokio::test]
async fn falls_back_and_truncates_the_original_body_per_transport() {
    digest_logging::initialize_for_tests();
    let body = format!("{}\n\n{}", "a".repeat(90), "b".repeat(100));
    let api = FakeTransport::new("gmail-api", 100, true);
    let smtp = FakeTransport::new("smtp", 150, false);

    let report = deliver(&[&api, &smtp], &draft(&body), 0.8).await;

    assert!(report.delivered());
    assert_eq!(report.transport.as_deref(), Some("smtp"));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "gmail-api");

    let first = api.sent.lock().unwrap()[0].clone();
    let second = smtp.sent.lock().unwrap()[0].clone();
    assert!(first.starts_with(&format!("{}\n\n[Content truncated", "a".repeat(90))));
    assert!(second.contains("Original content length: 192 characters"));
    let sent = report.sent.unwrap();
    assert!(sent.was_truncated);
    assert_eq!(sent.text, second);
}

#[tokio::test]
async fn short_body_is_sent_unchanged() {
    let smtp = FakeTransport::new("smtp", 25_000, false);
    let report = deliver(&[&smtp], &draft("Hello."), 0.8).await;
    assert_eq!(smtp.sent.lock().unwrap().as_slice(), ["Hello.".to_string()]);
    assert!(!report.sent.unwrap().was_truncated);
}

#[tokio::test]
async fn all_transports_failing_is_reported_not_raised() {
    let a = FakeTransport::new("a", 100, true);
    let b = FakeTransport::new("b", 100, true);
    let report = deliver(&[&a, &b], &draft("x"), 0.8).await;
    assert!(!report.delivered());
    assert_eq!(report.sent, None);
    assert_eq!(report.failures.len(), 2);
}

#[test]
fn message_renders_headers_and_plain_body() {
    let raw = build_message(&draft("hello world")).unwrap().formatted();
    let text = String::from_utf8(raw).unwrap();
    assert!(text.contains("Subject: Daily digest"));
    assert!(text.contains("To: reader@example.com"));
    assert!(text.contains("hello world"));
}

#[test]
fn message_with_attachment_is_multipart() {
    let mut message = draft("see attached");
    message.attachment = Some(MailAttachment {
        filename: "summary.mp3".into(),
        data: vec![0, 1, 2, 3],
    });
    let text = String::from_utf8(build_message(&message).unwrap().formatted()).unwrap();
    assert!(text.contains("multipart/mixed"));
    assert!(text.contains("summary.mp3"));
    assert!(text.contains("application/octet-stream"));
}

#[test]
fn invalid_addresses_are_rejected() {
    let mut message = draft("x");
    message.to = vec!["not an address".into()];
    assert!(matches!(
        build_message(&message),
        Err(MailError::Address { .. })
    ));
    message.to.clear();
    assert!(matches!(build_message(&message), Err(MailError::NoRecipients)));
}

struct StaticToken;

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn valid_credential(&self) -> Result<Credential, AuthError> {
        Ok(Credential {
            access_token: "tok".into(),
            expires_at: None,
        })
    }
}

#[tokio::test]
async fn gmail_api_posts_base64url_raw_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(|request: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            let raw = body["raw"].as_str().unwrap_or_default();
            let decoded = URL_SAFE.decode(raw).unwrap_or_default();
            if String::from_utf8_lossy(&decoded).contains("Subject: Daily digest") {
                ResponseTemplate::new(200).set_body_string(r#"{"id":"m1"}"#)
            } else {
                ResponseTemplate::new(400)
            }
        })
        .expect(1)
        .mount(&server)
        .await;

    let mailer = GmailApiMailer::new(
        Arc::new(StaticToken),
        server.uri(),
        20_000,
        &ApiSettings::default(),
    )
    .unwrap();
    mailer.send(&draft("hello")).await.unwrap();
}
