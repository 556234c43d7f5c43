use super::*;
use advisor_core::Outcome;
use advisor_proto::advisor_service_server::AdvisorService;
use tonic::{Code, Request};

async fn collect_stream(ctx: &TestContext, req: AdvisorRequest) -> Vec<std::result::Result<StreamAdviceResponse, tonic::Status>> {
    let stream = ctx
        .service
        .stream_advice(Request::new(req))
        .await
        .unwrap()
        .into_inner();
    stream.collect::<Vec<_>>().await
}

#[tokio::test]
async fn get_advice_returns_generated_text() {
    let ctx = context(ScriptedGenerator::new(&["Sunny, ", "bring sunglasses."]));

    let resp = ctx
        .service
        .get_advice(Request::new(request(&["Paris"])))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(resp.advice, "Sunny, bring sunglasses.");
    assert!(ctx.generator.last_prompt().contains(
        "City: Paris, Temp: 22.5°C, Condition: clear sky, Humidity: 40%, Wind: 3.2 m/s"
    ));
    assert_eq!(ctx.metrics.outcome_count(Outcome::Success), 1);
    assert_eq!(ctx.metrics.duration_samples(), 1);
}

#[tokio::test]
async fn get_advice_unknown_city_is_not_found() {
    let ctx = context(ScriptedGenerator::new(&["unused"]));

    let status = ctx
        .service
        .get_advice(Request::new(request(&["Atlantis", "Paris"])))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::NotFound);
    assert!(status.message().contains("Atlantis"));
    assert_eq!(ctx.generator.calls(), 0);
    assert_eq!(ctx.metrics.outcome_count(Outcome::Error), 1);
}

#[tokio::test]
async fn get_advice_weather_failure_is_unavailable() {
    let ctx = context(ScriptedGenerator::new(&["unused"]));

    let status = ctx
        .service
        .get_advice(Request::new(request(&["Paris", "Oslo"])))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unavailable);
    assert!(status.message().contains("Oslo"));
}

#[tokio::test]
async fn stream_advice_relays_chunks_and_terminal() {
    let ctx = context(ScriptedGenerator::new(&["Warm ", "day."]));

    let items = collect_stream(&ctx, request(&["Paris", "Atlantis"])).await;
    let chunks: Vec<StreamAdviceResponse> = items.into_iter().map(|i| i.unwrap()).collect();

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].chunk, "Warm ");
    assert_eq!(chunks[1].chunk, "day.");
    assert!(!chunks[0].is_complete && !chunks[1].is_complete);
    assert!(chunks[2].is_complete);
    assert!(chunks[2].chunk.is_empty());
    assert!(!ctx.generator.last_prompt().contains("Atlantis"));
    assert_eq!(ctx.metrics.outcome_count(Outcome::Success), 1);
}

#[tokio::test]
async fn stream_advice_all_failed_sends_diagnostic() {
    let ctx = context(ScriptedGenerator::new(&["unused"]));

    let items = collect_stream(&ctx, request(&["Atlantis", "Oslo"])).await;

    assert_eq!(items.len(), 1);
    let only = items.into_iter().next().unwrap().unwrap();
    assert!(only.is_complete);
    assert!(only
        .chunk
        .contains("Failed to get weather data for: Atlantis, Oslo (weather failed)"));
    assert_eq!(ctx.generator.calls(), 0);
}

#[tokio::test]
async fn stream_advice_generation_error_ends_with_status() {
    let ctx = context(ScriptedGenerator::failing(&["Partial"]));

    let items = collect_stream(&ctx, request(&["Paris"])).await;

    assert_eq!(items.len(), 2);
    let first = items[0].as_ref().unwrap();
    assert_eq!(first.chunk, "Partial");
    assert!(!first.is_complete);
    let status = items[1].as_ref().unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(ctx.metrics.outcome_count(Outcome::Error), 1);
}
