use personalens::groq::{Completion, CompletionError, GroqClient};
use personalens::types::ChatMessage;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETIONS: &str = "/openai/v1/chat/completions";

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
}

fn transcript() -> Vec<ChatMessage> {
    vec![ChatMessage::system("You are PersonaLens."), ChatMessage::user("hi")]
}

#[tokio::test]
async fn sends_bearer_auth_model_and_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(header("authorization", "Bearer gsk_test"))
        .and(body_partial_json(json!({
            "model": "llama-3.3-70b-versatile",
            "max_tokens": 256,
            "messages": [
                {"role": "system", "content": "You are PersonaLens."},
                {"role": "user", "content": "hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hello!")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GroqClient::new(&server.uri(), "gsk_test", "llama-3.3-70b-versatile")
        .with_sampling(256, 0.2);
    let content = client.complete(&transcript(), false).await.unwrap();
    assert_eq!(content, "Hello!");
}

#[tokio::test]
async fn missing_key_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let client = GroqClient::new(&server.uri(), "", "llama-3.3-70b-versatile");
    let err = client.complete(&transcript(), false).await.unwrap_err();
    assert!(matches!(err, CompletionError::MissingCredentials));
}

#[tokio::test]
async fn api_errors_carry_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = GroqClient::new(&server.uri(), "gsk_test", "llama-3.3-70b-versatile");
    match client.complete(&transcript(), false).await.unwrap_err() {
        CompletionError::Api { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_choices_are_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = GroqClient::new(&server.uri(), "gsk_test", "llama-3.3-70b-versatile");
    let err = client.complete(&transcript(), false).await.unwrap_err();
    assert!(matches!(err, CompletionError::MalformedResponse(_)));
}

#[tokio::test]
async fn json_mode_requests_and_parses_objects() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(body_partial_json(json!({"response_format": {"type": "json_object"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(r#"{"merchant": "Cafe", "amount": 12.5}"#)))
        .mount(&server)
        .await;

    let client = GroqClient::new(&server.uri(), "gsk_test", "llama-3.3-70b-versatile");
    let value = client.complete_json(&transcript()).await.unwrap();
    assert_eq!(value, json!({"merchant": "Cafe", "amount": 12.5}));
}

#[tokio::test]
async fn json_mode_reports_unparseable_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("not json")))
        .mount(&server)
        .await;

    let client = GroqClient::new(&server.uri(), "gsk_test", "llama-3.3-70b-versatile");
    let err = client.complete_json(&transcript()).await.unwrap_err();
    assert!(matches!(err, CompletionError::Parse(_)));
}
