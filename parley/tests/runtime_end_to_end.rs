use std::sync::{Arc, Mutex};

use parley::{
    AppConfig, ChatErrorKind, HttpRequest, HttpTransport, ProviderError, ProviderFuture,
    ProviderId, Role, RuntimeBundle, RuntimeParts, SecretCipher, SecretString,
    StaticSystemCredentials, StoreConfig, TurnOutcome, UserId, build_runtime_with, turn,
};
use serde_json::{Value, json};

#[derive(Debug, Default)]
struct OpenAiEcho {
    requests: Mutex<Vec<HttpRequest>>,
}

impl OpenAiEcho {
    fn authorizations(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter_map(|request| request.header("Authorization").map(str::to_string))
            .collect()
    }
}

impl HttpTransport for OpenAiEcho {
    fn post_json<'a>(
        &'a self,
        request: HttpRequest,
    ) -> ProviderFuture<'a, Result<Value, ProviderError>> {
        Box::pin(async move {
            let turns = request.body["messages"]
                .as_array()
                .map(Vec::len)
                .unwrap_or_default();
            self.requests.lock().expect("requests lock").push(request);
            Ok(json!({
                "choices": [{ "message": { "role": "assistant", "content": format!("seen {turns}") } }]
            }))
        })
    }
}

fn temp_db(prefix: &str) -> std::path::PathBuf {
    let unique = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("parley-{prefix}-{unique}"))
        .join("parley.sqlite3")
}

fn runtime(key: &str, store: StoreConfig, transport: Arc<OpenAiEcho>) -> RuntimeBundle {
    let config = AppConfig::new(SecretString::new(key)).with_store(store);
    let parts = RuntimeParts::with_transport(transport).with_system_credentials(Arc::new(
        StaticSystemCredentials::new().with_key(ProviderId::OpenAi, "sk-system"),
    ));
    build_runtime_with(config, parts).expect("runtime should build")
}

#[tokio::test]
async fn sqlite_runtime_completes_turns_and_survives_restart() {
    let key = SecretCipher::generate_key();
    let path = temp_db("restart");
    let transport = Arc::new(OpenAiEcho::default());
    let user = UserId::new("alice");

    let conversation_id = {
        let runtime = runtime(
            &key,
            StoreConfig::Sqlite { path: path.clone() },
            Arc::clone(&transport),
        );
        let conversation = runtime
            .chat
            .create_conversation(&user, "openai_gpt-4", None)
            .await
            .expect("conversation should be created");
        assert_eq!(conversation.title, "Chat with OpenAI GPT-4");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let report = runtime
            .chat
            .run_turn(turn("alice", conversation.id.as_str(), "  hello  "))
            .await
            .expect("turn should run");
        match &report.outcome {
            TurnOutcome::Completed {
                assistant_message, ..
            } => assert_eq!(assistant_message.content, "seen 1"),
            other => panic!("expected completed turn, got {other:?}"),
        }

        let refreshed = runtime
            .chat
            .get_conversation(&user, &conversation.id)
            .await
            .expect("conversation should load")
            .conversation;
        assert!(refreshed.updated_at > conversation.updated_at);
        conversation.id
    };

    let runtime = runtime(&key, StoreConfig::Sqlite { path: path.clone() }, transport);
    let report = runtime
        .chat
        .run_turn(turn("alice", conversation_id.as_str(), "again"))
        .await
        .expect("turn should run");
    assert!(matches!(report.outcome, TurnOutcome::Completed { .. }));

    let detail = runtime
        .chat
        .get_conversation(&user, &conversation_id)
        .await
        .expect("conversation should load");
    let roles = detail
        .messages
        .iter()
        .map(|message| message.role)
        .collect::<Vec<_>>();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(detail.messages[0].content, "hello");
    assert_eq!(detail.messages[3].content, "seen 3");

    let _ = std::fs::remove_dir_all(path.parent().expect("parent dir"));
}

#[tokio::test]
async fn stored_user_key_is_preferred_over_system_key() {
    let transport = Arc::new(OpenAiEcho::default());
    let runtime = runtime(
        &SecretCipher::generate_key(),
        StoreConfig::InMemory,
        Arc::clone(&transport),
    );
    let user = UserId::new("alice");

    runtime
        .credentials
        .set(&user, ProviderId::OpenAi, SecretString::new("sk-alice"))
        .await
        .expect("key should be stored");
    let conversation = runtime
        .chat
        .create_conversation(&user, "openai_gpt-4", Some("Keys".to_string()))
        .await
        .expect("conversation should be created");

    runtime
        .chat
        .run_turn(turn("alice", conversation.id.as_str(), "hello"))
        .await
        .expect("turn should run");

    assert_eq!(transport.authorizations(), vec!["Bearer sk-alice"]);
}

#[tokio::test]
async fn undecryptable_user_key_falls_back_to_system_key() {
    let path = temp_db("rotated-key");
    let transport = Arc::new(OpenAiEcho::default());
    let user = UserId::new("alice");

    let conversation_id = {
        let runtime = runtime(
            &SecretCipher::generate_key(),
            StoreConfig::Sqlite { path: path.clone() },
            Arc::clone(&transport),
        );
        runtime
            .credentials
            .set(&user, ProviderId::OpenAi, SecretString::new("sk-alice"))
            .await
            .expect("key should be stored");
        runtime
            .chat
            .create_conversation(&user, "openai_gpt-4", None)
            .await
            .expect("conversation should be created")
            .id
    };

    let rotated = runtime(
        &SecretCipher::generate_key(),
        StoreConfig::Sqlite { path: path.clone() },
        Arc::clone(&transport),
    );
    let report = rotated
        .chat
        .run_turn(turn("alice", conversation_id.as_str(), "hello"))
        .await
        .expect("turn should run");

    assert!(matches!(report.outcome, TurnOutcome::Completed { .. }));
    assert_eq!(transport.authorizations(), vec!["Bearer sk-system"]);

    let _ = std::fs::remove_dir_all(path.parent().expect("parent dir"));
}

#[tokio::test]
async fn empty_message_is_rejected_before_anything_is_stored() {
    let transport = Arc::new(OpenAiEcho::default());
    let runtime = runtime(
        &SecretCipher::generate_key(),
        StoreConfig::InMemory,
        Arc::clone(&transport),
    );
    let user = UserId::new("alice");
    let conversation = runtime
        .chat
        .create_conversation(&user, "openai_gpt-4", None)
        .await
        .expect("conversation should be created");

    let error = runtime
        .chat
        .run_turn(turn("alice", conversation.id.as_str(), "   "))
        .await
        .expect_err("empty content should be rejected");

    assert_eq!(error.kind, ChatErrorKind::InvalidRequest);
    assert!(transport.authorizations().is_empty());
    let detail = runtime
        .chat
        .get_conversation(&user, &conversation.id)
        .await
        .expect("conversation should load");
    assert!(detail.messages.is_empty());
}
