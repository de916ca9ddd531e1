use std::sync::{Arc, Mutex};
use std::time::Duration;

use pprovider::{
    ClientFactory, Completion, CredentialManager, CredentialResolver, HttpRequest, HttpTransport,
    InMemoryCredentialStore, Message, ProviderError, ProviderErrorKind, ProviderFuture,
    ProviderId, ProviderOperationHooks, SecretCipher, SecretString, StaticSystemCredentials,
};
use pcommon::UserId;
use serde_json::{Value, json};

#[derive(Debug)]
struct FakeTransport {
    response: Result<Value, ProviderError>,
    captured: Mutex<Option<HttpRequest>>,
}

impl FakeTransport {
    fn replying(response: Value) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(response),
            captured: Mutex::new(None),
        })
    }

    fn failing(error: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            response: Err(error),
            captured: Mutex::new(None),
        })
    }

    fn captured(&self) -> HttpRequest {
        self.captured
            .lock()
            .expect("capture lock")
            .clone()
            .expect("a request should have been sent")
    }
}

impl HttpTransport for FakeTransport {
    fn post_json<'a>(
        &'a self,
        request: HttpRequest,
    ) -> ProviderFuture<'a, Result<Value, ProviderError>> {
        Box::pin(async move {
            *self.captured.lock().expect("capture lock") = Some(request);
            self.response.clone()
        })
    }
}

#[derive(Debug, Default)]
struct RecordingHooks {
    events: Mutex<Vec<String>>,
}

impl ProviderOperationHooks for RecordingHooks {
    fn on_call_start(&self, provider: ProviderId, model: &str) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("start:{provider}:{model}"));
    }

    fn on_success(
        &self,
        provider: ProviderId,
        _model: &str,
        _elapsed: Duration,
        _completion: &Completion,
    ) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("success:{provider}"));
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        _model: &str,
        _elapsed: Duration,
        error: &ProviderError,
    ) {
        self.events
            .lock()
            .expect("events lock")
            .push(format!("failure:{provider}:{:?}", error.kind));
    }
}

struct Fixture {
    factory: ClientFactory,
    manager: CredentialManager,
}

fn fixture(transport: Arc<FakeTransport>, system: StaticSystemCredentials) -> Fixture {
    let store = Arc::new(InMemoryCredentialStore::new());
    let cipher =
        Arc::new(SecretCipher::from_key(&SecretCipher::generate_key()).expect("valid key"));
    let resolver = CredentialResolver::new(store.clone(), cipher.clone(), Arc::new(system));

    Fixture {
        factory: ClientFactory::new(resolver, transport),
        manager: CredentialManager::new(store, cipher),
    }
}

#[tokio::test]
async fn openai_call_uses_system_key_when_user_has_none() {
    let transport = FakeTransport::replying(json!({
        "choices": [{"message": {"role": "assistant", "content": "  Hello!  "}}]
    }));
    let fixture = fixture(
        transport.clone(),
        StaticSystemCredentials::new().with_key(ProviderId::OpenAi, "sk-system"),
    );

    let client = fixture
        .factory
        .create(&UserId::new("alice"), "openai_gpt-4")
        .await
        .expect("client should build");
    let completion = client
        .complete(&[Message::user("hi")])
        .await
        .expect("completion should succeed");

    assert_eq!(completion.text.as_deref(), Some("Hello!"));
    let sent = transport.captured();
    assert_eq!(sent.header("Authorization"), Some("Bearer sk-system"));
    assert_eq!(sent.body["model"], "gpt-4");
}

#[tokio::test]
async fn user_key_is_sent_instead_of_system_key() {
    let transport = FakeTransport::replying(json!({
        "type": "message",
        "content": [{"type": "text", "text": "Hi"}]
    }));
    let fixture = fixture(
        transport.clone(),
        StaticSystemCredentials::new().with_key(ProviderId::Anthropic, "ak-system"),
    );
    let user = UserId::new("alice");
    fixture
        .manager
        .set(&user, ProviderId::Anthropic, SecretString::new("ak-alice"))
        .await
        .expect("set should succeed");

    let client = fixture
        .factory
        .create(&user, "anthropic_claude-3-sonnet")
        .await
        .expect("client should build");
    client
        .complete(&[Message::user("hi")])
        .await
        .expect("completion should succeed");

    let sent = transport.captured();
    assert_eq!(sent.header("x-api-key"), Some("ak-alice"));
    assert_eq!(sent.body["max_tokens"], 1024);
}

#[tokio::test]
async fn google_request_targets_model_url() {
    let transport = FakeTransport::replying(json!({
        "candidates": [{"finishReason": "STOP", "content": {"parts": [{"text": "Bonjour"}]}}]
    }));
    let fixture = fixture(
        transport.clone(),
        StaticSystemCredentials::new().with_key(ProviderId::Google, "gk-system"),
    );

    let client = fixture
        .factory
        .create(&UserId::new("alice"), "google_gemini-pro")
        .await
        .expect("client should build");
    let completion = client
        .complete(&[
            Message::user("hi"),
            Message::assistant("A"),
            Message::assistant("B"),
            Message::user("again"),
        ])
        .await
        .expect("completion should succeed");

    assert_eq!(completion.text.as_deref(), Some("Bonjour"));
    let sent = transport.captured();
    assert!(sent.url.ends_with("/models/gemini-pro:generateContent"));
    assert_eq!(sent.body["contents"][1]["parts"][0]["text"], "A\nB");
    assert_eq!(sent.header("x-goog-api-key"), Some("gk-system"));
}

#[tokio::test]
async fn hooks_observe_success_and_failure() {
    let hooks = Arc::new(RecordingHooks::default());
    let system = StaticSystemCredentials::new().with_key(ProviderId::OpenAi, "sk");

    let ok = fixture(
        FakeTransport::replying(json!({"choices": [{"message": {"content": "ok"}}]})),
        system.clone(),
    );
    let ok_client = ok
        .factory
        .with_hooks(hooks.clone())
        .create(&UserId::new("alice"), "openai_gpt-4")
        .await
        .expect("client should build");
    ok_client
        .complete(&[Message::user("hi")])
        .await
        .expect("completion should succeed");

    let failing = fixture(
        FakeTransport::failing(ProviderError::rate_limited("slow down")),
        system,
    );
    let failing_client = failing
        .factory
        .with_hooks(hooks.clone())
        .create(&UserId::new("alice"), "openai_gpt-4")
        .await
        .expect("client should build");
    let error = failing_client
        .complete(&[Message::user("hi")])
        .await
        .expect_err("transport failure should surface");
    assert_eq!(error.kind, ProviderErrorKind::RateLimited);

    let events = hooks.events.lock().expect("events lock").clone();
    assert_eq!(
        events,
        vec![
            "start:openai:gpt-4".to_string(),
            "success:openai".to_string(),
            "start:openai:gpt-4".to_string(),
            "failure:openai:RateLimited".to_string(),
        ]
    );
}
