//! Turn controller: one user question end-to-end.
//!
//! A turn appends the outgoing message and a typing placeholder, issues a
//! single request, and finishes by removing the placeholder and appending
//! exactly one incoming message (answer or localized error).

use tracing::info;

use crate::api::{format_answer, ChatAnswer, QaClient, QaError};
use crate::message::{MessageId, MessageKind, MessageStore, Role};

/// In-flight turn. Holds the placeholder id so completion can remove it.
#[derive(Debug, Clone, Copy)]
pub struct PendingTurn {
    pub typing_id: MessageId,
}

/// Starts a turn: appends the user's message (untrimmed) and the typing
/// placeholder. Returns `None` for blank input, leaving the store untouched.
pub fn begin(store: &mut MessageStore, user_text: &str) -> Option<PendingTurn> {
    if user_text.trim().is_empty() {
        return None;
    }

    store.append(MessageKind::Text(user_text.to_string()), Role::Outgoing);
    let typing_id = store.append(MessageKind::Typing, Role::Incoming);
    Some(PendingTurn { typing_id })
}

/// Finishes a turn. The placeholder is removed on every path before the
/// result message is appended.
pub fn complete(
    store: &mut MessageStore,
    pending: PendingTurn,
    result: Result<ChatAnswer, QaError>,
) {
    store.delete(pending.typing_id);

    let text = match result {
        Ok(answer) => format_answer(&answer),
        Err(err) => {
            info!(error = %err, "turn failed, showing fallback message");
            err.user_message()
        }
    };
    store.append(MessageKind::Text(text), Role::Incoming);
}

/// One whole turn against the backend. The TUI splits this into `begin` and
/// `complete` around a spawned request; the composed form is the directly
/// testable operation.
pub async fn submit(store: &mut MessageStore, client: &QaClient, user_text: &str) {
    let Some(pending) = begin(store, user_text) else {
        return;
    };
    let result = client.ask(user_text).await;
    complete(store, pending, result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Avatar;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn texts(store: &MessageStore) -> Vec<(Role, String)> {
        store
            .list()
            .iter()
            .filter_map(|m| match &m.kind {
                MessageKind::Text(t) => Some((m.role, t.clone())),
                MessageKind::Typing => None,
            })
            .collect()
    }

    #[test]
    fn blank_input_is_a_noop() {
        let mut store = MessageStore::new_with_greeting();
        assert!(begin(&mut store, "").is_none());
        assert!(begin(&mut store, "   \n\t").is_none());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn begin_appends_user_message_and_placeholder() {
        let mut store = MessageStore::new();
        let pending = begin(&mut store, "  余额查询  ").unwrap();

        let messages = store.list();
        assert_eq!(messages.len(), 2);
        // Untrimmed original text, right-aligned with the user avatar.
        assert_eq!(
            messages[0].kind,
            MessageKind::Text("  余额查询  ".to_string())
        );
        assert_eq!(messages[0].role, Role::Outgoing);
        assert_eq!(messages[0].avatar, Avatar::User);
        assert_eq!(messages[1].kind, MessageKind::Typing);
        assert_eq!(messages[1].role, Role::Incoming);
        assert_eq!(messages[1].id, pending.typing_id);
    }

    #[test]
    fn complete_replaces_placeholder_with_answer() {
        let mut store = MessageStore::new();
        let pending = begin(&mut store, "问题").unwrap();

        complete(
            &mut store,
            pending,
            Ok(ChatAnswer {
                answer: "A".into(),
                category: Some("C".into()),
                topic: Some("T".into()),
            }),
        );

        assert_eq!(store.typing_count(), 0);
        let texts = texts(&store);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[1], (Role::Incoming, "【C - T】\n\nA".to_string()));
    }

    #[test]
    fn complete_replaces_placeholder_with_error_text() {
        let mut store = MessageStore::new();
        let pending = begin(&mut store, "问题").unwrap();

        complete(
            &mut store,
            pending,
            Err(QaError::Request("network down".into())),
        );

        assert_eq!(store.typing_count(), 0);
        let texts = texts(&store);
        assert_eq!(texts[1].1, "错误：network down");
    }

    #[tokio::test]
    async fn submit_runs_one_whole_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"answer": "您好，可以在手机银行办理。"})),
            )
            .mount(&server)
            .await;

        let client = QaClient::new(&server.uri(), Duration::from_secs(30));
        let mut store = MessageStore::new_with_greeting();
        submit(&mut store, &client, "如何转账？").await;

        assert_eq!(store.typing_count(), 0);
        let texts = texts(&store);
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[1], (Role::Outgoing, "如何转账？".to_string()));
        assert_eq!(
            texts[2],
            (Role::Incoming, "您好，可以在手机银行办理。".to_string())
        );
    }

    #[tokio::test]
    async fn submit_cleans_up_after_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(serde_json::json!({"detail": "X"})),
            )
            .mount(&server)
            .await;

        let client = QaClient::new(&server.uri(), Duration::from_secs(30));
        let mut store = MessageStore::new();
        submit(&mut store, &client, "hi").await;

        assert_eq!(store.typing_count(), 0);
        let texts = texts(&store);
        assert_eq!(texts[1], (Role::Incoming, "X".to_string()));
    }
}
