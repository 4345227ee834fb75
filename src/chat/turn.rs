//! One conversational turn: context, prompt, completion, classification,
//! optional tool execution, reply.

use crate::chat::classifier::{classify, Classified};
use crate::chat::{context, prompt};
use crate::groq::{Completion, CompletionError};
use crate::state::Database;
use crate::tools::{self, ToolCommand, ToolContext};
use crate::types::*;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Why a turn produced no reply at all.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("AI Service unavailable: {0}")]
    Unavailable(#[from] CompletionError),
    #[error("failed to load account context: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Runs turns against the injected completion client and tool context.
#[derive(Clone)]
pub struct ChatService {
    db: Arc<Mutex<Database>>,
    completion: Arc<dyn Completion>,
    tools: ToolContext,
    assistant_name: String,
}

impl ChatService {
    pub fn new(
        db: Arc<Mutex<Database>>,
        completion: Arc<dyn Completion>,
        tools: ToolContext,
        assistant_name: impl Into<String>,
    ) -> Self {
        Self {
            db,
            completion,
            tools,
            assistant_name: assistant_name.into(),
        }
    }

    /// Handle one user message on behalf of `account_id`.
    ///
    /// History is supplied by the caller; nothing is kept between turns.
    pub async fn run_turn(
        &self,
        account_id: i64,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<ChatReply, ChatError> {
        let turn_id = Ulid::new();
        info!("Turn {} for account {} ({} prior messages)", turn_id, account_id, history.len());

        let system_prompt = {
            let db = self.db.lock().await;
            let ctx = context::build_account_context(&db, account_id)?;
            prompt::build_system_prompt(&self.assistant_name, &ctx)
        };

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(message));

        let raw = match self.completion.complete(&messages, false).await {
            Ok(raw) if raw.trim().is_empty() => {
                warn!("Turn {}: completion returned no content", turn_id);
                return Err(CompletionError::MalformedResponse("empty content".into()).into());
            }
            Ok(raw) => raw,
            Err(e) => {
                warn!("Turn {}: completion failed: {}", turn_id, e);
                return Err(e.into());
            }
        };

        let Classified::Tool(invocation) = classify(&raw) else {
            debug!("Turn {}: plain text reply", turn_id);
            return Ok(ChatReply {
                response: raw,
                tool_result: None,
            });
        };

        let command = match ToolCommand::parse(&invocation.tool, invocation.args) {
            Ok(command) => command,
            Err(e) => {
                debug!("Turn {}: not a usable tool call ({}), returning text", turn_id, e);
                return Ok(ChatReply {
                    response: raw,
                    tool_result: None,
                });
            }
        };

        info!("Turn {}: executing {}", turn_id, command.name());
        let result = tools::execute_tool(&self.tools, account_id, &command).await;
        Ok(ChatReply {
            response: format!("✓ {}", result.message),
            tool_result: Some(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::Messenger;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex as StdMutex;

    /// Replays canned replies and records every transcript it receives.
    struct ScriptedCompletion {
        replies: StdMutex<Vec<Result<String, CompletionError>>>,
        seen: StdMutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedCompletion {
        fn new(replies: Vec<Result<String, CompletionError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: StdMutex::new(replies),
                seen: StdMutex::new(Vec::new()),
            })
        }

        fn reply(text: &str) -> Arc<Self> {
            Self::new(vec![Ok(text.to_string())])
        }
    }

    #[async_trait]
    impl Completion for ScriptedCompletion {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _json_mode: bool,
        ) -> Result<String, CompletionError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies.lock().unwrap().remove(0)
        }
    }

    struct NoMessenger;

    #[async_trait]
    impl Messenger for NoMessenger {
        async fn send_email(&self, _: &SmtpCredentials, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
            anyhow::bail!("not in tests")
        }

        async fn send_whatsapp(&self, _: &str, _: &str, _: Option<&Path>) -> anyhow::Result<()> {
            anyhow::bail!("not in tests")
        }
    }

    fn service(completion: Arc<ScriptedCompletion>) -> (ChatService, i64) {
        let db = Database::open_memory().unwrap();
        let account = db.create_account("me@example.com", None).unwrap();
        for path in ["photos/a.jpg", "photos/b.jpg"] {
            db.insert_photo(
                account,
                &NewPhoto {
                    path,
                    filename: "x.jpg",
                    category: PhotoCategory::General,
                    is_sensitive: false,
                },
            )
            .unwrap();
        }
        let db = Arc::new(Mutex::new(db));
        let tools = ToolContext {
            db: db.clone(),
            messenger: Arc::new(NoMessenger),
            uploads_dir: PathBuf::from("/nonexistent"),
            default_sender: None,
        };
        (ChatService::new(db, completion, tools, "PersonaLens"), account)
    }

    #[tokio::test]
    async fn tool_reply_executes_list_photos() {
        let completion = ScriptedCompletion::reply(r#"{"tool":"list_photos","args":{}}"#);
        let (svc, account) = service(completion.clone());

        let reply = svc.run_turn(account, "show my photos", &[]).await.unwrap();
        assert_eq!(reply.response, "✓ Found 2 photo(s)");
        let result = reply.tool_result.unwrap();
        assert!(result.is_success());
        assert_eq!(result.extra["count"], serde_json::json!(2));

        let seen = completion.seen.lock().unwrap();
        let transcript = &seen[0];
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, ChatRole::System);
        assert!(transcript[0].content.contains("- Total Photos: 2"));
        assert_eq!(transcript[1], ChatMessage::user("show my photos"));
    }

    #[tokio::test]
    async fn plain_text_passes_through() {
        let (svc, account) = service(ScriptedCompletion::reply("Hello! How can I help?"));
        let reply = svc.run_turn(account, "hi", &[]).await.unwrap();
        assert_eq!(
            reply,
            ChatReply {
                response: "Hello! How can I help?".into(),
                tool_result: None,
            }
        );
    }

    #[tokio::test]
    async fn history_sits_between_system_and_new_message() {
        let completion = ScriptedCompletion::reply("ok");
        let (svc, account) = service(completion.clone());
        let history = vec![ChatMessage::user("earlier"), ChatMessage::assistant("noted")];

        svc.run_turn(account, "now", &history).await.unwrap();

        let seen = completion.seen.lock().unwrap();
        let roles: Vec<ChatRole> = seen[0].iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
        );
        assert_eq!(seen[0][1].content, "earlier");
        assert_eq!(seen[0][3].content, "now");
    }

    #[tokio::test]
    async fn unknown_tool_returns_raw_text() {
        let raw = r#"{"tool": "format_disk", "args": {}}"#;
        let (svc, account) = service(ScriptedCompletion::reply(raw));
        let reply = svc.run_turn(account, "wipe it", &[]).await.unwrap();
        assert_eq!(reply.response, raw);
        assert!(reply.tool_result.is_none());
    }

    #[tokio::test]
    async fn invalid_args_return_raw_text() {
        let raw = r#"{"tool": "delete_photo", "args": {"photo_id": "latest"}}"#;
        let (svc, account) = service(ScriptedCompletion::reply(raw));
        let reply = svc.run_turn(account, "delete it", &[]).await.unwrap();
        assert_eq!(reply.response, raw);
    }

    #[tokio::test]
    async fn tool_errors_are_replies_not_failures() {
        let (svc, account) = service(ScriptedCompletion::reply(
            r#"{"tool": "delete_photo", "args": {"photo_id": 999}}"#,
        ));
        let reply = svc.run_turn(account, "delete 999", &[]).await.unwrap();
        assert_eq!(reply.response, "✓ Photo 999 not found for this user.");
        assert_eq!(reply.tool_result.unwrap().status, ToolStatus::Error);
    }

    #[tokio::test]
    async fn completion_failures_make_the_turn_unavailable() {
        let (svc, account) = service(ScriptedCompletion::new(vec![Err(
            CompletionError::MissingCredentials,
        )]));
        let err = svc.run_turn(account, "hi", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Unavailable(CompletionError::MissingCredentials)));

        let (svc, account) = service(ScriptedCompletion::reply("   "));
        let err = svc.run_turn(account, "hi", &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Unavailable(_)));
    }
}
