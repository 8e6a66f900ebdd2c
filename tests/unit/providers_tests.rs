/*!
 * Tests for provider clients against a mock HTTP server
 */

use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sqlchat::errors::{ProviderError, TranslationError};
use sqlchat::providers::anthropic::Anthropic;
use sqlchat::providers::ollama::Ollama;
use sqlchat::providers::openai::OpenAI;
use sqlchat::providers::{CompletionRequest, Provider};
use sqlchat::translation::{LlmTranslator, SqlTranslator};

fn openai_reply(content: &str) -> serde_json::Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 21, "completion_tokens": 9 }
    })
}

fn sql_request() -> CompletionRequest {
    CompletionRequest::new(
        "llama3-8b-8192",
        "You are an assistant that generates SQL queries.",
        "Generate a SQL query for: Show all students with marks over 80",
    )
}

#[tokio::test]
async fn test_openai_complete_withSuccessfulReply_shouldReturnTextAndUsage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer gsk-test"))
        .and(body_partial_json(json!({
            "model": "llama3-8b-8192",
            "messages": [
                { "role": "system", "content": "You are an assistant that generates SQL queries." },
                { "role": "user", "content": "Generate a SQL query for: Show all students with marks over 80" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply(
            "SELECT * FROM STUDENT WHERE MARKS > 80",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAI::new("gsk-test", server.uri(), 5).with_label("groq");
    let response = provider.complete(sql_request()).await.unwrap();

    assert_eq!(response.text, "SELECT * FROM STUDENT WHERE MARKS > 80");
    assert_eq!(response.prompt_tokens, Some(21));
    assert_eq!(response.completion_tokens, Some(9));
    assert_eq!(provider.name(), "groq");
}

#[tokio::test]
async fn test_openai_complete_withUnauthorized_shouldReturnAuthenticationError() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let provider = OpenAI::new("wrong", server.uri(), 5);
    let result = provider.complete(sql_request()).await;

    match result {
        Err(ProviderError::AuthenticationError(message)) => assert!(message.contains("invalid api key")),
        other => panic!("Expected authentication error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_complete_withTooManyRequests_shouldReturnRateLimitExceeded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let provider = OpenAI::new("gsk-test", server.uri(), 5);
    let result = provider.complete(sql_request()).await;

    assert!(matches!(result, Err(ProviderError::RateLimitExceeded(_))));
}

#[tokio::test]
async fn test_openai_complete_withServerError_shouldReturnApiError() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let provider = OpenAI::new("gsk-test", server.uri(), 5);
    let result = provider.complete(sql_request()).await;

    assert!(matches!(result, Err(ProviderError::ApiError { status_code: 503, .. })));
}

#[tokio::test]
async fn test_openai_complete_withMalformedBody_shouldReturnParseError() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let provider = OpenAI::new("gsk-test", server.uri(), 5);
    let result = provider.complete(sql_request()).await;

    assert!(matches!(result, Err(ProviderError::ParseError(_))));
}

#[tokio::test]
async fn test_openai_complete_withUnreachableServer_shouldReturnConnectionError() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let provider = OpenAI::new("gsk-test", uri, 5);
    let result = provider.complete(sql_request()).await;

    assert!(matches!(result, Err(ProviderError::ConnectionError(_))));
}

#[tokio::test]
async fn test_anthropic_complete_withSuccessfulReply_shouldJoinTextBlocks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-haiku-20240307",
            "system": "You are an assistant that generates SQL queries."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                { "type": "text", "text": "SELECT NAME FROM STUDENT " },
                { "type": "text", "text": "WHERE MARKS > 80" }
            ],
            "usage": { "input_tokens": 30, "output_tokens": 12 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Anthropic::new("sk-ant-test", server.uri(), 5);
    let request = CompletionRequest::new(
        "claude-3-haiku-20240307",
        "You are an assistant that generates SQL queries.",
        "Generate a SQL query for: names of good students",
    );
    let response = provider.complete(request).await.unwrap();

    assert_eq!(response.text, "SELECT NAME FROM STUDENT WHERE MARKS > 80");
    assert_eq!(response.prompt_tokens, Some(30));
    assert_eq!(response.completion_tokens, Some(12));
}

#[tokio::test]
async fn test_ollama_complete_withSuccessfulReply_shouldReturnMessageContent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "model": "llama3", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "message": { "role": "assistant", "content": "SELECT COUNT(*) FROM STUDENT" },
            "done": true,
            "eval_count": 7
        })))
        .mount(&server)
        .await;

    let provider = Ollama::from_url(server.uri(), 5);
    let request = CompletionRequest::new("llama3", "Write SQL.", "How many students?");
    let response = provider.complete(request).await.unwrap();

    assert_eq!(response.text, "SELECT COUNT(*) FROM STUDENT");
    assert_eq!(response.prompt_tokens, None);
    assert_eq!(response.completion_tokens, Some(7));
}

#[tokio::test]
async fn test_ollama_testConnection_shouldQueryVersion() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "0.3.12" })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Ollama::from_url(server.uri(), 5);
    assert!(provider.test_connection("llama3").await.is_ok());
}

#[tokio::test]
async fn test_llmTranslator_withGroqServer_shouldTrimGeneratedSql() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply(
            "\n  SELECT * FROM STUDENT WHERE MARKS > 80\n",
        )))
        .mount(&server)
        .await;

    let provider: Arc<dyn Provider> = Arc::new(OpenAI::new("gsk-test", server.uri(), 5).with_label("groq"));
    let translator = LlmTranslator::new(provider, "llama3-8b-8192");

    let sql = translator
        .translate_to_sql("Show all students with marks over 80")
        .await
        .unwrap();
    assert_eq!(sql, "SELECT * FROM STUDENT WHERE MARKS > 80");
}

#[tokio::test]
async fn test_llmTranslator_withBlankReply_shouldReturnEmptyResponse() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_reply("   ")))
        .mount(&server)
        .await;

    let provider: Arc<dyn Provider> = Arc::new(OpenAI::new("gsk-test", server.uri(), 5));
    let translator = LlmTranslator::new(provider, "gpt-4o-mini");

    let result = translator.translate_to_sql("anything").await;
    assert!(matches!(result, Err(TranslationError::EmptyResponse)));
}
