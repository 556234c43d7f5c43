use super::*;
use advisor_core::Outcome;
use tokio::time::{timeout, Duration};

#[tokio::test]
async fn test_stream_advice_over_grpc() {
    let ctx = context(ScriptedGenerator::new(&["Clear ", "skies ", "ahead."]));
    let (addr, _handle) = start_advisor_server(ctx.service.clone()).await;
    let mut client = new_client(addr).await;

    let mut stream = client
        .stream_advice(request(&["Paris"]))
        .await
        .unwrap()
        .into_inner();

    let received = timeout(Duration::from_secs(5), async {
        let mut chunks = Vec::new();
        while let Some(msg) = stream.message().await.unwrap() {
            chunks.push(msg);
        }
        chunks
    })
    .await
    .expect("timely stream");

    let text: String = received.iter().map(|c| c.chunk.as_str()).collect();
    assert_eq!(text, "Clear skies ahead.");
    assert_eq!(received.iter().filter(|c| c.is_complete).count(), 1);
    assert!(received.last().unwrap().is_complete);
    assert_eq!(ctx.metrics.outcome_count(Outcome::Success), 1);
}

#[tokio::test]
async fn test_get_advice_over_grpc_reports_city() {
    let ctx = context(ScriptedGenerator::new(&["unused"]));
    let (addr, _handle) = start_advisor_server(ctx.service.clone()).await;
    let mut client = new_client(addr).await;

    let status = client
        .get_advice(request(&["Atlantis"]))
        .await
        .unwrap_err();

    assert_eq!(status.code(), tonic::Code::NotFound);
    assert!(status.message().contains("lookup failed for Atlantis"));
}

#[tokio::test]
async fn test_stream_advice_empty_request() {
    let ctx = context(ScriptedGenerator::new(&["unused"]));
    let (addr, _handle) = start_advisor_server(ctx.service.clone()).await;
    let mut client = new_client(addr).await;

    let mut stream = client
        .stream_advice(AdvisorRequest { cities: vec![] })
        .await
        .unwrap()
        .into_inner();

    let first = stream.message().await.unwrap().expect("diagnostic chunk");
    assert!(first.is_complete);
    assert!(first.chunk.contains("Please check the city names and try again."));
    assert!(stream.message().await.unwrap().is_none());
    assert_eq!(ctx.generator.calls(), 0);
}
