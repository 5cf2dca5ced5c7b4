//! Ollama backend against a mock HTTP server.

use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use llm_rewrite::{
    generate, generate_many, generate_streaming, rank, Backend, GenerationRequest, InvokeOptions,
    OllamaBackend, OllamaConfig, Operation, RankingRequest, RewriteError,
};

fn backend_for(server: &MockServer) -> OllamaBackend {
    let config = OllamaConfig::with_model("llama3.2")
        .endpoint(server.uri())
        .timeout(Duration::from_secs(5));
    OllamaBackend::new(config).unwrap()
}

#[tokio::test]
async fn test_generate_non_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "model": "llama3.2", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "response": "Corrected: She doesn't like apples.",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = GenerationRequest::new("she dont like apples", Operation::Grammar);
    let generation = generate(&backend, &request).await.unwrap();

    assert_eq!(generation.text, "She doesn't like apples.");
}

#[tokio::test]
async fn test_seed_sent_in_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "options": { "seed": 7 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "first" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "options": { "seed": 8 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "second" })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = GenerationRequest::new("text", Operation::Rephrase).with_seed(7);
    let results = generate_many(&backend, &request, 2).await;

    let texts: Vec<_> = results.iter().map(|r| r.as_ref().unwrap().text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second"]);
}

#[tokio::test]
async fn test_http_error_maps_to_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not found"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = GenerationRequest::new("text", Operation::Rephrase);
    let err = generate(&backend, &request).await.unwrap_err();

    assert_eq!(
        err,
        RewriteError::BackendTransport {
            status: 500,
            body: "model not found".to_string()
        }
    );
}

#[tokio::test]
async fn test_error_field_in_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "out of memory" })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend
        .complete("prompt", &InvokeOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err, RewriteError::InvalidResponse("out of memory".to_string()));
}

#[tokio::test]
async fn test_streaming_ndjson() {
    let server = MockServer::start().await;
    let body = [
        json!({ "response": "Simplified:", "done": false }).to_string(),
        json!({ "response": " The sky", "done": false }).to_string(),
        json!({ "response": " is blue.", "done": false }).to_string(),
        json!({ "response": "", "done": true }).to_string(),
    ]
    .join("\n")
        + "\n";

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = GenerationRequest::new("The firmament appears azure.", Operation::Simplify);
    let mut partials = Vec::new();
    let generation = generate_streaming(&backend, &request, |t| partials.push(t.to_string()))
        .await
        .unwrap();

    assert_eq!(
        partials,
        vec!["Simplified:", "Simplified: The sky", "Simplified: The sky is blue."]
    );
    assert_eq!(generation.text, "The sky is blue.");
}

#[tokio::test]
async fn test_system_prompt_uses_chat_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "messages": [{ "role": "system", "content": "You are an editor." }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "Polished text." },
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = OllamaConfig::with_model("llama3.2")
        .endpoint(server.uri())
        .system_prompt("You are an editor.");
    let backend = OllamaBackend::new(config).unwrap();
    let request = GenerationRequest::new("polish this", Operation::Formal);
    let generation = generate(&backend, &request).await.unwrap();

    assert_eq!(generation.text, "Polished text.");
}

#[tokio::test]
async fn test_rank_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "<think>B reads better.</think>\n[B, A]"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let request = RankingRequest::new(
        "Rewrite the text in a formal tone",
        vec!["hey there".to_string(), "Good afternoon.".to_string()],
    );
    let ranking = rank(&backend, &request).await.unwrap();

    assert_eq!(ranking.order, vec![1, 0]);
}

#[tokio::test]
async fn test_connection_refused() {
    let config = OllamaConfig::with_model("llama3.2")
        .endpoint("http://127.0.0.1:1")
        .timeout(Duration::from_secs(2));
    let backend = OllamaBackend::new(config).unwrap();
    let request = GenerationRequest::new("text", Operation::Rephrase);

    let err = generate(&backend, &request).await.unwrap_err();

    assert!(err.is_transport());
    match err {
        RewriteError::Connection { endpoint, .. } => assert_eq!(endpoint, "http://127.0.0.1:1"),
        other => panic!("Expected Connection, got {:?}", other),
    }
}
