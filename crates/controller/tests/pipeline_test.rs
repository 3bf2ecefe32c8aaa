use futures::StreamExt;
use porter_controller::Orchestrator;
use porter_core::config::PipelineConfig;
use porter_core::mocks::{ScriptedLlm, ScriptedReply};
use porter_core::text::word_count;
use porter_core::traits::ResponseFormat;
use porter_core::{
    AgentContext, DashboardSnapshot, Error, GatewayError, ImageRef, IntentAction, Language,
    StageName, UserRole,
};
use serde_json::json;
use std::sync::Arc;

fn orchestrator(llm: Arc<ScriptedLlm>) -> Orchestrator {
    Orchestrator::builder()
        .with_llm(llm)
        .with_pipeline_config(PipelineConfig::default())
        .build()
        .unwrap()
}

fn context() -> AgentContext {
    AgentContext::new(
        "Why is berth utilization so high at Tuas?",
        Language::English,
        UserRole::MiddleManagement,
    )
}

fn reader_reply() -> ScriptedReply {
    ScriptedReply::json(json!({
        "visualContext": {
            "metrics": [{"name": "Berth Utilization", "value": "91%", "trend": "up"}],
            "charts": [],
            "anomalies": ["Berth utilization above 85%"],
            "timeframe": "last 24h"
        },
        "userIntent": {
            "primaryQuestion": "Why is berth utilization high?",
            "specificMetrics": ["Berth Utilization"],
            "terminals": ["Tuas"],
            "timeframe": "last 24h",
            "urgencyLevel": "high"
        },
        "contextSummary": "Tuas berths are nearly full."
    }))
}

fn analyzer_reply() -> ScriptedReply {
    ScriptedReply::json(json!({
        "analysis": {
            "keyFindings": ["Utilization at 91%"],
            "trends": ["Rising for three days"],
            "issuesDetected": [{
                "category": "berth_congestion",
                "severity": "critical",
                "description": "Utilization above the critical threshold",
                "impact": "Vessel queue forming"
            }],
            "benchmarkComparison": "Above the 85% warning level"
        },
        "recommendations": {"immediate": ["Reassign berth windows"], "shortTerm": [], "longTerm": []},
        "suggestedNextSteps": []
    }))
}

fn consolidator_reply(answer: &str) -> ScriptedReply {
    ScriptedReply::json(json!({
        "chatResponse": answer,
        "keyInsights": ["Berth utilization is at 91%"],
        "nextSteps": [{"id": 1, "action": "Show berth schedule", "detail": "Open the berth plan", "category": "report"}],
        "frontendIntent": {"action": "highlight_metric", "parameters": {"metric": "berth_utilization"}, "confidence": 0.9},
        "language": "en"
    }))
}

#[tokio::test]
async fn test_stages_run_in_order_and_envelope_is_assembled() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        reader_reply(),
        analyzer_reply(),
        consolidator_reply("Tuas berths are at 91 percent. Reassign berth windows now."),
    ]));
    let response = orchestrator(llm.clone()).run(&context()).await.unwrap();

    assert_eq!(llm.call_count(), 3);
    assert_eq!(
        response.chat_response,
        "Tuas berths are at 91 percent. Reassign berth windows now."
    );
    assert_eq!(response.next_steps[0].id, "1");
    assert_eq!(response.frontend_intent.action, IntentAction::HighlightMetric);
    assert_eq!(response.language, Language::English);

    let metadata = response.metadata.unwrap();
    assert_eq!(
        metadata.stages_invoked,
        vec![StageName::ContextReader, StageName::Analyzer, StageName::Consolidator]
    );
    assert!(metadata.fallback_stages().is_empty());

    // Each stage sees the previous stage's output.
    let requests = llm.requests();
    assert!(requests[1].user_content.text.contains("Tuas berths are nearly full."));
    assert!(requests[2].user_content.text.contains("Reassign berth windows"));
    assert!(requests
        .iter()
        .all(|r| r.options.response_format == ResponseFormat::Json));
}

#[tokio::test]
async fn test_malformed_output_falls_back_at_every_stage() {
    let llm = Arc::new(ScriptedLlm::repeating(ScriptedReply::text("not json at all")));
    let ctx = context();
    let response = orchestrator(llm.clone()).run(&ctx).await.unwrap();

    assert_eq!(llm.call_count(), 3);
    assert_eq!(
        response.chat_response,
        format!(
            "I understand you're asking about: {}. Let me help you with that.",
            ctx.user_query
        )
    );
    assert_eq!(response.frontend_intent.action, IntentAction::None);
    assert_eq!(response.next_steps.len(), 1);

    let metadata = response.metadata.unwrap();
    assert_eq!(metadata.fallback_stages().len(), 3);

    // The analyzer still received the reader fallback.
    assert!(llm.requests()[1]
        .user_content
        .text
        .contains("User asked: Why is berth utilization so high at Tuas?"));
}

#[tokio::test]
async fn test_fallback_is_deterministic() {
    let ctx = context();
    let first = orchestrator(Arc::new(ScriptedLlm::repeating(ScriptedReply::text("{"))))
        .run(&ctx)
        .await
        .unwrap();
    let second = orchestrator(Arc::new(ScriptedLlm::repeating(ScriptedReply::Fail(
        GatewayError::invalid_output("refused"),
    ))))
    .run(&ctx)
    .await
    .unwrap();

    assert_eq!(first.chat_response, second.chat_response);
    assert_eq!(first.next_steps, second.next_steps);
    assert_eq!(first.key_insights, second.key_insights);
}

#[tokio::test]
async fn test_transport_failure_in_second_stage_aborts() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        reader_reply(),
        ScriptedReply::Fail(GatewayError::transport("connection reset").with_status(503)),
        consolidator_reply("should never be requested"),
    ]));
    let err = orchestrator(llm.clone()).run(&context()).await.unwrap_err();

    assert_eq!(llm.call_count(), 2);
    match err {
        Error::PipelineAborted { stage, source } => {
            assert_eq!(stage, StageName::Analyzer);
            assert_eq!(source.status, Some(503));
        }
        other => panic!("expected PipelineAborted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_aborts_like_transport() {
    let llm = Arc::new(ScriptedLlm::new(vec![ScriptedReply::Fail(GatewayError::timeout(
        "deadline elapsed",
    ))]));
    let err = orchestrator(llm.clone()).run(&context()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::PipelineAborted {
            stage: StageName::ContextReader,
            ..
        }
    ));
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_verbose_answer_is_cut_to_word_ceiling() {
    let verbose = "Berth seven is congested and vessels are waiting longer than planned. ".repeat(40);
    let llm = Arc::new(ScriptedLlm::new(vec![
        reader_reply(),
        analyzer_reply(),
        consolidator_reply(&verbose),
    ]));
    let response = orchestrator(llm).run(&context()).await.unwrap();

    assert!(word_count(&response.chat_response) <= 150);
    assert!(response.chat_response.ends_with('.'));
}

#[tokio::test]
async fn test_fallback_answer_for_long_query_respects_word_ceiling() {
    let query = "why are vessels at Tuas waiting longer than the berth plan allows ".repeat(20);
    let ctx = AgentContext::new(query, Language::English, UserRole::FrontlineOperations);
    let llm = Arc::new(ScriptedLlm::new(vec![
        reader_reply(),
        analyzer_reply(),
        ScriptedReply::text("The berths are full, sorry."),
    ]));
    let response = orchestrator(llm).run(&ctx).await.unwrap();

    assert!(response.chat_response.starts_with("I understand you're asking about:"));
    assert!(word_count(&response.chat_response) <= 150);
    let metadata = response.metadata.unwrap();
    assert_eq!(metadata.fallback_stages(), vec![StageName::Consolidator]);
}

#[tokio::test]
async fn test_image_only_reaches_context_reader() {
    let llm = Arc::new(ScriptedLlm::repeating(ScriptedReply::text("{}")));
    let ctx = context()
        .with_image(ImageRef::parse("data:image/png;base64,iVBORw0KGgo=").unwrap())
        .with_dashboard(DashboardSnapshot::default());
    orchestrator(llm.clone()).run(&ctx).await.unwrap();

    let requests = llm.requests();
    assert!(requests[0].user_content.image.is_some());
    assert!(requests[1].user_content.image.is_none());
    assert!(requests[2].user_content.image.is_none());
}

#[tokio::test]
async fn test_stream_mode_is_a_single_text_call() {
    let llm = Arc::new(ScriptedLlm::new(vec![ScriptedReply::fragments([
        "Tuas is ",
        "busy. ",
        "Queue is short.",
    ])]));
    let ctx = context().with_image(ImageRef::parse("https://example.com/shot.png").unwrap());
    let stream = orchestrator(llm.clone()).stream(&ctx).await.unwrap();
    let fragments: Vec<String> = stream.map(|r| r.unwrap()).collect().await;

    assert_eq!(fragments, vec!["Tuas is ", "busy. ", "Queue is short."]);
    assert_eq!(llm.call_count(), 1);
    let request = &llm.requests()[0];
    assert_eq!(request.options.response_format, ResponseFormat::Text);
    assert_eq!(request.options.max_tokens, 600);
    assert!(request.user_content.image.is_some());
}

#[tokio::test]
async fn test_stream_connection_failure_is_aborted() {
    let llm = Arc::new(ScriptedLlm::new(vec![ScriptedReply::Fail(GatewayError::transport(
        "refused",
    ))]));
    let err = match orchestrator(llm).stream(&context()).await {
        Ok(_) => panic!("expected failure"),
        Err(e) => e,
    };
    assert!(matches!(
        err,
        Error::PipelineAborted {
            stage: StageName::Streaming,
            ..
        }
    ));
}
