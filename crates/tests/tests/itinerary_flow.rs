use std::sync::Arc;
use std::time::Duration;

use gotham_agents::ItineraryAgent;
use gotham_core::{Borough, BudgetTier, Slot, TripRequest};
use gotham_data::{generate_datasets, Store};
use gotham_llm::{ModelConfig, OllamaClient};
use gotham_observability::AppMetrics;
use gotham_tests::{closed_port, write_sources, ChatBehaviour, FakeOllama};
use tempfile::TempDir;

const NARRATED: &str = "Home Base: Midtown Grand, Manhattan, upscale
Day 1:
- Morning (9am-12pm): The Met, then coffee at Katz's Delicatessen
- Noon (12pm-3pm): Central Park picnic with Joe's Pizza
- Evening (6pm-9pm): Brooklyn Museum late hours, dinner at Di Fara
Day 2:
- Morning: Prospect Park loop
- Noon: Lunch at Di Fara
- Evening: Stroll back through Central Park
Packing list: umbrella, layers, comfortable shoes";

struct Fixture {
    _raw: TempDir,
    _out: TempDir,
    store: Store,
}

fn cleaned_store() -> Fixture {
    let raw = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let paths = write_sources(raw.path());
    let store = Store::csv(out.path());
    generate_datasets(&paths, None, &store).unwrap();

    Fixture {
        _raw: raw,
        _out: out,
        store,
    }
}

fn agent(
    store: Store,
    host: String,
    request_timeout: Duration,
) -> ItineraryAgent<Store, OllamaClient> {
    let client = OllamaClient::new(ModelConfig {
        host,
        model: "qwen2.5:1.5b".to_string(),
        connect_timeout: Duration::from_millis(500),
        request_timeout,
        ..ModelConfig::default()
    })
    .unwrap();

    ItineraryAgent::new(Arc::new(store), Arc::new(client), AppMetrics::shared())
}

fn two_day_request() -> TripRequest {
    let mut request = TripRequest::new(2);
    request.boroughs = vec![Borough::Manhattan, Borough::Brooklyn];
    request.budget = Some(BudgetTier::High);
    request
}

#[tokio::test]
async fn narrated_itinerary_flows_end_to_end() {
    let fixture = cleaned_store();
    let server = FakeOllama::start(ChatBehaviour::Reply(NARRATED.to_string())).await;
    let agent = agent(fixture.store.clone(), server.host(), Duration::from_secs(5));

    let outcome = agent.plan_trip(two_day_request()).await.unwrap();

    assert!(outcome.warning.is_none());
    assert!(outcome.itinerary.narrated);
    assert_eq!(outcome.plan.hotel.name, "Midtown Grand");
    assert_eq!(outcome.itinerary.home_base, "Midtown Grand, Manhattan, upscale");
    assert_eq!(outcome.itinerary.days.len(), 2);
    assert_eq!(outcome.itinerary.days[1].slots[1].slot, Slot::Noon);
    assert_eq!(outcome.itinerary.packing_list.len(), 3);

    let requests = server.chat_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["model"], "qwen2.5:1.5b");
    assert_eq!(requests[0]["stream"], false);
    let prompt = requests[0]["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("2-day itinerary"));
    assert!(prompt.contains("Home base: Midtown Grand (Manhattan)"));

    let snapshot = agent.metrics().snapshot();
    assert_eq!(snapshot.plans_total, 1);
    assert_eq!(snapshot.model_calls_total, 1);
    assert_eq!(snapshot.format_fallbacks_total, 0);
}

#[tokio::test]
async fn unparseable_reply_falls_back_to_draft_with_warning() {
    let fixture = cleaned_store();
    let server = FakeOllama::start(ChatBehaviour::Reply(
        "I'm sorry, I can only help with recipes today.".to_string(),
    ))
    .await;
    let agent = agent(fixture.store.clone(), server.host(), Duration::from_secs(5));

    let outcome = agent.plan_trip(two_day_request()).await.unwrap();

    let warning = outcome.warning.expect("fallback should carry a warning");
    assert!(warning.reason.contains("day 1"));
    assert!(!outcome.itinerary.narrated);
    assert_eq!(outcome.itinerary.days.len(), 2);
    assert!(outcome
        .itinerary
        .days
        .iter()
        .all(|day| day.slots.len() == 3));
    assert_eq!(agent.metrics().snapshot().format_fallbacks_total, 1);
}

#[tokio::test]
async fn stalled_model_times_out() {
    let fixture = cleaned_store();
    let server = FakeOllama::start(ChatBehaviour::Stall(Duration::from_secs(5))).await;
    let agent = agent(fixture.store.clone(), server.host(), Duration::from_millis(300));

    let err = agent.plan_trip(TripRequest::new(1)).await.unwrap_err();
    assert_eq!(err.kind(), "ModelTimeoutError");
    assert!(err.to_string().contains("300ms"));
    assert_eq!(agent.metrics().snapshot().model_failures_total, 1);
}

#[tokio::test]
async fn unreachable_endpoint_is_model_unavailable() {
    let fixture = cleaned_store();
    let addr = closed_port().await;
    let agent = agent(
        fixture.store.clone(),
        format!("http://{addr}"),
        Duration::from_secs(2),
    );

    let err = agent.plan_trip(TripRequest::new(1)).await.unwrap_err();
    assert_eq!(err.kind(), "ModelUnavailableError");

    let snapshot = agent.metrics().snapshot();
    assert_eq!(snapshot.model_failures_total, 1);
    assert_eq!(snapshot.format_fallbacks_total, 0);
}

#[tokio::test]
async fn missing_model_is_a_status_error() {
    let fixture = cleaned_store();
    let server = FakeOllama::start(ChatBehaviour::Status(
        404,
        "model \"qwen2.5:1.5b\" not found, try pulling it first".to_string(),
    ))
    .await;
    let agent = agent(fixture.store.clone(), server.host(), Duration::from_secs(5));

    let err = agent.plan_trip(TripRequest::new(1)).await.unwrap_err();
    assert_eq!(err.kind(), "ModelStatusError");
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn connectivity_check_lists_models() {
    let fixture = cleaned_store();
    let server = FakeOllama::start(ChatBehaviour::Reply(String::new())).await;
    let agent = agent(fixture.store.clone(), server.host(), Duration::from_secs(5));

    let report = agent.check_model(Duration::from_secs(2)).await.unwrap();
    assert_eq!(report.status, 200);
    assert_eq!(report.models, vec!["qwen2.5:1.5b", "llama3:latest"]);
    assert!(report.has_configured_model());
    assert!(server.chat_requests().is_empty());
}

#[tokio::test]
async fn planning_without_cleaned_data_asks_for_generation() {
    let out = tempfile::tempdir().unwrap();
    let server = FakeOllama::start(ChatBehaviour::Reply(NARRATED.to_string())).await;
    let agent = agent(Store::csv(out.path()), server.host(), Duration::from_secs(5));

    let err = agent.plan_trip(TripRequest::new(2)).await.unwrap_err();
    assert_eq!(err.kind(), "MissingDatasetError");
    assert!(server.chat_requests().is_empty());
}
