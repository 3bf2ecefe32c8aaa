//! End-to-end tests: HTTP gateway, orchestrator, speech queue and the real
//! provider clients talking to local stand-ins for the upstream APIs.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::Engine;
use porter_controller::Orchestrator;
use porter_core::config::AppConfig;
use porter_gateway::{AppState, GatewayConfig, GatewayServer};
use porter_model_gateway::create_client_from_config;
use porter_speech::{ElevenLabsSynthesizer, SpeechQueueConfig, WhisperTranscriber};
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

// =============================================================================
// Upstream stand-in
// =============================================================================

const ANSWER_FRAGMENTS: [&str; 3] = ["Berth 7 is busy. ", "Crane 3 is idle", ". Call the planner."];

#[derive(Clone, Default)]
struct Upstream {
    completions: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
    spoken: Arc<Mutex<Vec<(String, String)>>>,
}

fn stage_content(call: usize) -> Value {
    match call {
        0 => json!({
            "visualContext": {"metrics": [], "charts": [], "anomalies": [], "timeframe": "today"},
            "userIntent": {
                "primaryQuestion": "How busy is berth 7?",
                "specificMetrics": ["Berth Utilization"],
                "terminals": [],
                "timeframe": "today",
                "urgencyLevel": "medium"
            },
            "contextSummary": "Question about berth 7."
        }),
        1 => json!({
            "analysis": {"keyFindings": ["Berth 7 at 88%"], "trends": [], "issuesDetected": [], "benchmarkComparison": ""},
            "recommendations": {"immediate": [], "shortTerm": [], "longTerm": []},
            "suggestedNextSteps": []
        }),
        _ => json!({
            "chatResponse": "Berth 7 is at 88 percent, close to the warning level.",
            "keyInsights": ["Berth 7 at 88%"],
            "nextSteps": [{"id": 1, "action": "Show berth plan", "detail": "Open today's plan", "category": "report"}],
            "frontendIntent": {"action": "highlight_metric", "parameters": {"metric": "berth_utilization"}, "confidence": 1.4},
            "language": "en"
        }),
    }
}

async fn chat_completions(State(up): State<Upstream>, Json(body): Json<Value>) -> Response {
    up.bodies.lock().unwrap().push(body.clone());

    if body["stream"] == true {
        let mut sse = String::new();
        for part in ANSWER_FRAGMENTS {
            let chunk = json!({"choices": [{"delta": {"content": part}}]});
            sse.push_str(&format!("data: {}\n\n", chunk));
        }
        sse.push_str("data: [DONE]\n\n");
        return ([(header::CONTENT_TYPE, "text/event-stream")], sse).into_response();
    }

    let call = up.completions.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "choices": [{
            "message": {"role": "assistant", "content": stage_content(call).to_string()},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150}
    }))
    .into_response()
}

async fn text_to_speech(
    State(up): State<Upstream>,
    Path(voice): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let text = body["text"].as_str().unwrap_or_default().to_string();
    up.spoken.lock().unwrap().push((voice, text.clone()));
    let mut audio = b"ID3".to_vec();
    audio.extend_from_slice(text.as_bytes());
    ([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response()
}

async fn transcriptions() -> Json<Value> {
    Json(json!({"text": "今天港口的状态如何"}))
}

async fn serve_upstream(up: Upstream) -> String {
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/text-to-speech/:voice/stream", post(text_to_speech))
        .route("/v1/audio/transcriptions", post(transcriptions))
        .with_state(up);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}/v1", addr.port())
}

// =============================================================================
// Porter wired like main()
// =============================================================================

async fn porter(up: &Upstream) -> Router {
    let base = serve_upstream(up.clone()).await;

    let mut config = AppConfig::default();
    config.model_gateway.base_url = base.clone();
    config.model_gateway.api_key = Some(Secret::new("sk-test".to_string()));
    config.speech.synthesis_base_url = base.clone();
    config.speech.transcription_base_url = base;
    config.speech.api_key = Some(Secret::new("xi-test".to_string()));

    let llm = Arc::new(create_client_from_config(&config.model_gateway).unwrap());
    let orchestrator = Orchestrator::builder()
        .with_llm(llm)
        .with_pipeline_config(config.pipeline.clone())
        .build()
        .unwrap();

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        synthesizer: Arc::new(ElevenLabsSynthesizer::new(&config.speech).unwrap()),
        transcriber: Arc::new(
            WhisperTranscriber::new(&config.speech, config.model_gateway.api_key.clone()).unwrap(),
        ),
        speech: SpeechQueueConfig::from(&config.speech),
        expose_error_details: false,
    };
    GatewayServer::new(GatewayConfig::from(&config.server), state).build_router()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_detailed_chat_through_real_client() {
    let up = Upstream::default();
    let app = porter(&up).await;

    let response = app
        .oneshot(post_json(
            "/api/chat-detailed",
            json!({"message": "How busy is berth 7?", "userRole": "top_management"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(
        body["chatResponse"],
        "Berth 7 is at 88 percent, close to the warning level."
    );
    assert_eq!(body["nextSteps"][0]["id"], "1");
    assert_eq!(body["frontendIntent"]["confidence"], 1.0);
    assert_eq!(body["metadata"]["stagesInvoked"].as_array().unwrap().len(), 3);

    let bodies = up.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 3);
    assert!(bodies
        .iter()
        .all(|b| b["response_format"]["type"] == "json_object"));
}

#[tokio::test]
async fn test_spoken_chat_speaks_every_sentence_in_order() {
    let up = Upstream::default();
    let app = porter(&up).await;

    let response = app
        .oneshot(post_json(
            "/api/chat/spoken",
            json!({"message": "Status?", "language": "en"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = String::from_utf8(read_body(response).await).unwrap();
    let events: Vec<Value> = body
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let sentences: Vec<&str> = events
        .iter()
        .filter(|e| e["type"] == "audio")
        .map(|e| e["sentence"].as_str().unwrap())
        .collect();
    assert_eq!(
        sentences,
        vec!["Berth 7 is busy.", "Crane 3 is idle.", "Call the planner."]
    );

    let first_audio = events.iter().find(|e| e["type"] == "audio").unwrap();
    assert_eq!(first_audio["mimeType"], "audio/mpeg");
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(first_audio["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, b"ID3Berth 7 is busy.");
    assert_eq!(events.last().unwrap()["type"], "done");

    let bodies = up.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["stream"], true);
    assert_eq!(bodies[0]["max_tokens"], 600);

    let spoken = up.spoken.lock().unwrap();
    assert_eq!(spoken.len(), 3);
    assert!(spoken.iter().all(|(voice, _)| !voice.is_empty()));
}

#[tokio::test]
async fn test_transcription_detects_language_from_transcript() {
    let up = Upstream::default();
    let app = porter(&up).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/voice/transcribe?language=zh-CN")
                .body(Body::from(b"OggS\x00\x02fake-audio".to_vec()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_slice(&read_body(response).await).unwrap();
    assert_eq!(body["text"], "今天港口的状态如何");
    assert_eq!(body["detectedLanguage"], "zh-CN");
}
