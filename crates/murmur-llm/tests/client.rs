//! Chat client tests against a mock endpoint

use murmur_llm::{ChatClient, ChatCompletion, ChatMessage, ClientConfig, LlmError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ChatClient {
    let config = ClientConfig::new("test-key").with_base_url(format!("{}/v1", server.uri()));
    ChatClient::new(config).unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn test_send_chat_request_returns_reply_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_json(json!({
            "model": "gpt-3.5-turbo",
            "messages": [{"role": "user", "content": "My name is John"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Nice to meet you, John!")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server)
        .send_chat_request("My name is John")
        .await
        .unwrap();
    assert_eq!(reply, "Nice to meet you, John!");
}

#[tokio::test]
async fn test_system_prompt_is_prepended() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
                {"role": "user", "content": "what's my name?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("John.")))
        .mount(&server)
        .await;

    let config = ClientConfig::new("test-key")
        .with_base_url(format!("{}/v1", server.uri()))
        .with_model("gpt-4o-mini")
        .with_system_prompt("Be brief.");
    let client = ChatClient::new(config).unwrap();

    let reply = client
        .complete(&[
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
            ChatMessage::user("what's my name?"),
        ])
        .await
        .unwrap();
    assert_eq!(reply, "John.");
}

#[tokio::test]
async fn test_error_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).send_chat_request("hello").await.unwrap_err();
    match err {
        LlmError::Api { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_choices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client(&server).send_chat_request("hello").await.unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse));
}

#[test]
fn test_empty_api_key_is_rejected() {
    let err = tokio_test::assert_err!(ChatClient::new(ClientConfig::new("  ")));
    assert!(matches!(err, LlmError::Config(_)));
}
