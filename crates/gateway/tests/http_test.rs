use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::Engine;
use porter_controller::Orchestrator;
use porter_core::mocks::{MockSynthesizer, MockTranscriber, ScriptedLlm, ScriptedReply};
use porter_core::{GatewayError, Language};
use porter_gateway::{AppState, GatewayConfig, GatewayServer};
use porter_speech::SpeechQueueConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct Harness {
    llm: Arc<ScriptedLlm>,
    transcriber: Arc<MockTranscriber>,
    app: Router,
}

fn harness(replies: Vec<ScriptedReply>, expose_error_details: bool) -> Harness {
    let llm = Arc::new(ScriptedLlm::new(replies));
    let transcriber = Arc::new(MockTranscriber::new("Show berth status"));
    let orchestrator = Orchestrator::builder().with_llm(llm.clone()).build().unwrap();
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        synthesizer: Arc::new(MockSynthesizer::new(Duration::from_millis(20))),
        transcriber: transcriber.clone(),
        speech: SpeechQueueConfig::default(),
        expose_error_details,
    };
    let app = GatewayServer::new(GatewayConfig::default(), state).build_router();
    Harness {
        llm,
        transcriber,
        app,
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn ndjson(response: axum::response::Response) -> Vec<Value> {
    let body = body_bytes(response).await;
    String::from_utf8(body)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn stage_replies(answer: &str) -> Vec<ScriptedReply> {
    vec![
        ScriptedReply::json(json!({
            "visualContext": {"metrics": [], "charts": [], "anomalies": [], "timeframe": "today"},
            "userIntent": {
                "primaryQuestion": "How busy is Tuas?",
                "specificMetrics": [],
                "terminals": ["Tuas"],
                "timeframe": "today",
                "urgencyLevel": "medium"
            },
            "contextSummary": "Question about Tuas load."
        })),
        ScriptedReply::json(json!({
            "analysis": {"keyFindings": [], "trends": [], "issuesDetected": [], "benchmarkComparison": ""},
            "recommendations": {"immediate": [], "shortTerm": [], "longTerm": []},
            "suggestedNextSteps": []
        })),
        ScriptedReply::json(json!({
            "chatResponse": answer,
            "keyInsights": [],
            "nextSteps": [],
            "frontendIntent": {"action": "none", "parameters": {}, "confidence": 0.0},
            "language": "en"
        })),
    ]
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let h = harness(vec![], false);
    let response = h
        .app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

// =============================================================================
// Multi-stage mode
// =============================================================================

#[tokio::test]
async fn test_detailed_chat_returns_envelope() {
    let h = harness(stage_replies("Tuas is running at normal load."), false);
    let response = h
        .app
        .oneshot(post_json("/api/chat-detailed", json!({"message": "How busy is Tuas?"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["chatResponse"], "Tuas is running at normal load.");
    assert_eq!(body["language"], "en");
    assert!(body["metadata"].is_object());
    assert_eq!(h.llm.call_count(), 3);
}

#[tokio::test]
async fn test_detailed_chat_requires_message() {
    let h = harness(stage_replies("unused"), false);
    let response = h
        .app
        .oneshot(post_json("/api/chat-detailed", json!({"message": "  "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Message is required");
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_detailed_chat_rejects_unknown_role() {
    let h = harness(stage_replies("unused"), false);
    let response = h
        .app
        .oneshot(post_json(
            "/api/chat-detailed",
            json!({"message": "status", "userRole": "harbour_master"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_detailed_chat_abort_is_generic_500() {
    let h = harness(
        vec![ScriptedReply::Fail(GatewayError::transport("connection reset"))],
        false,
    );
    let response = h
        .app
        .oneshot(post_json("/api/chat-detailed", json!({"message": "status"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Failed to process detailed chat message");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_detailed_chat_abort_details_when_exposed() {
    let h = harness(
        vec![ScriptedReply::Fail(GatewayError::transport("connection reset"))],
        true,
    );
    let response = h
        .app
        .oneshot(post_json("/api/chat-detailed", json!({"message": "status"})))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert!(body["details"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_detailed_chat_usage() {
    let h = harness(vec![], false);
    let response = h
        .app
        .oneshot(
            Request::builder()
                .uri("/api/chat-detailed")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["usage"]["method"], "POST");
    assert_eq!(body["supportedLanguages"].as_array().unwrap().len(), 6);
}

// =============================================================================
// Streaming mode
// =============================================================================

#[tokio::test]
async fn test_stream_emits_text_events() {
    let h = harness(
        vec![ScriptedReply::fragments(["Tuas is ", "busy today."])],
        false,
    );
    let response = h
        .app
        .oneshot(post_json("/api/chat", json!({"message": "How is Tuas?"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    let events = ndjson(response).await;
    assert_eq!(
        events,
        vec![
            json!({"type": "text", "data": "Tuas is "}),
            json!({"type": "text", "data": "busy today."}),
        ]
    );
    assert_eq!(h.llm.call_count(), 1);
}

#[tokio::test]
async fn test_stream_connection_failure_is_500() {
    let h = harness(
        vec![ScriptedReply::Fail(GatewayError::transport("refused"))],
        false,
    );
    let response = h
        .app
        .oneshot(post_json("/api/chat", json!({"message": "hi"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_raw_stream_concatenates_chunks() {
    let h = harness(
        vec![ScriptedReply::fragments(["Crane 3 ", "is idle."])],
        false,
    );
    let response = h
        .app
        .oneshot(post_json("/api/chat/raw", json!({"message": "cranes?"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"Crane 3 is idle.");
}

#[tokio::test(start_paused = true)]
async fn test_spoken_answer_plays_sentences_in_order() {
    let h = harness(
        vec![ScriptedReply::fragments([
            "Berth 7 is busy. ",
            "Crane 3 is idle",
            ". Call the planner.",
        ])],
        false,
    );
    let response = h
        .app
        .oneshot(post_json("/api/chat/spoken", json!({"message": "status"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let events = ndjson(response).await;

    let text: String = events
        .iter()
        .filter(|e| e["type"] == "text")
        .map(|e| e["data"].as_str().unwrap())
        .collect();
    assert_eq!(text, "Berth 7 is busy. Crane 3 is idle. Call the planner.");

    let audio: Vec<&Value> = events.iter().filter(|e| e["type"] == "audio").collect();
    let sentences: Vec<&str> = audio.iter().map(|e| e["sentence"].as_str().unwrap()).collect();
    assert_eq!(
        sentences,
        vec!["Berth 7 is busy.", "Crane 3 is idle.", "Call the planner."]
    );
    let seqs: Vec<u64> = audio.iter().map(|e| e["seq"].as_u64().unwrap()).collect();
    assert_eq!(seqs, vec![0, 1, 2]);

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(audio[0]["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, MockSynthesizer::audio_for("Berth 7 is busy.").to_vec());

    assert_eq!(events.last().unwrap()["type"], "done");
}

// =============================================================================
// Voice
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_speak_streams_audio() {
    let h = harness(vec![], false);
    let response = h
        .app
        .oneshot(post_json(
            "/api/voice/speak",
            json!({"text": "Vessel arriving.", "language": "en"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(
        body_bytes(response).await,
        MockSynthesizer::audio_for("Vessel arriving.").to_vec()
    );
}

#[tokio::test]
async fn test_speak_requires_text() {
    let h = harness(vec![], false);
    let response = h
        .app
        .oneshot(post_json("/api/voice/speak", json!({"text": ""})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Text is required");
}

#[tokio::test]
async fn test_transcribe_passes_language() {
    let h = harness(vec![], false);
    let response = h
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/voice/transcribe?language=fr")
                .body(Body::from(vec![1u8; 64]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["text"], "Show berth status");
    assert_eq!(body["detectedLanguage"], "fr");
    assert_eq!(h.transcriber.calls(), vec![(64, Language::French)]);
}

#[tokio::test]
async fn test_transcribe_requires_audio() {
    let h = harness(vec![], false);
    let response = h
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/voice/transcribe")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Audio file is required");
}
