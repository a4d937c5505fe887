//! Integration tests for Patent Search
//!
//! These drive a [`SearchSession`] the way a search screen does: keystrokes
//! go into an [`InputHandle`], the debouncer commits, the dispatcher calls
//! the provider, and the session view settles. Timer-driven tests run on a
//! paused clock.

use patent_search::models::{Generation, Query, SEARCH_FAILED_MESSAGE};
use patent_search::providers::mock::make_record;
use patent_search::providers::{HttpTextProvider, MockProvider, MockResponse};
use patent_search::search::{
    Dispatcher, Notification, SearchSession, SessionState, SessionView, Settlement,
};
use patent_search::utils::HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;

const QUIET: Duration = Duration::from_millis(500);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn session_for(
    mock: &Arc<MockProvider>,
) -> (SearchSession<MockProvider>, mpsc::UnboundedReceiver<Notification>) {
    SearchSession::new(Dispatcher::new(Arc::clone(mock)).with_timeout(Duration::from_secs(10)))
}

/// Wait until the view satisfies `pred`, failing instead of hanging
async fn wait_until(
    view: &mut watch::Receiver<SessionView>,
    pred: impl FnMut(&SessionView) -> bool,
) -> SessionView {
    let settled = tokio::time::timeout(Duration::from_secs(120), view.wait_for(pred))
        .await
        .expect("view never reached the expected state")
        .expect("session dropped");
    (*settled).clone()
}

fn settled(view: &SessionView) -> bool {
    matches!(view.state, SessionState::Settled { .. })
}

fn titles(view: &SessionView) -> Vec<&str> {
    view.results.iter().map(|r| r.title.as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_typing_burst_searches_once_with_last_value() {
    let mock = Arc::new(MockProvider::new());
    mock.respond_to("solar", vec![make_record("1", "Solar cell")]);
    let (session, _rx) = session_for(&mock);
    let mut view = session.subscribe();
    let mut input = session.attach_input(QUIET);

    for text in ["s", "so", "sol", "sola", "solar"] {
        input.input(text);
        sleep(ms(120)).await;
    }

    let current = wait_until(&mut view, settled).await;
    assert_eq!(titles(&current), vec!["Solar cell"]);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(mock.calls(), vec!["solar"]);
}

#[tokio::test(start_paused = true)]
async fn test_solar_panel_end_to_end_keeps_provider_order() {
    let mock = Arc::new(MockProvider::new());
    mock.respond_to(
        "solar panel",
        vec![
            make_record("p-3", "Tracking mount"),
            make_record("p-1", "Thin-film cell"),
            make_record("p-2", "Inverter housing"),
        ],
    );
    let (session, _rx) = session_for(&mock);
    let mut view = session.subscribe();
    let mut input = session.attach_input(QUIET);

    input.input("solar panel");
    let current = wait_until(&mut view, settled).await;

    assert_eq!(
        titles(&current),
        vec!["Tracking mount", "Thin-film cell", "Inverter housing"]
    );
    assert_eq!(
        current.state,
        SessionState::Settled {
            generation: Generation(1),
            settlement: Settlement::Success
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_short_input_clears_without_searching() {
    let mock = Arc::new(MockProvider::new());
    mock.respond_to("solar", vec![make_record("1", "Solar cell")]);
    let (session, _rx) = session_for(&mock);
    let mut view = session.subscribe();
    let mut input = session.attach_input(QUIET);

    input.input("solar");
    wait_until(&mut view, settled).await;

    input.input(" s ");
    let cleared = wait_until(&mut view, |v| v.state == SessionState::Idle).await;
    assert!(cleared.results.is_empty());

    sleep(Duration::from_secs(2)).await;
    assert_eq!(mock.calls(), vec!["solar"]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_older_search_never_overwrites_newer() {
    let mock = Arc::new(MockProvider::new());
    mock.respond_with(
        "solar",
        MockResponse::records(vec![make_record("old", "Old answer")]).delay(ms(2000)),
    );
    mock.respond_with(
        "solar panel",
        MockResponse::records(vec![make_record("new", "New answer")]).delay(ms(100)),
    );
    let (session, _rx) = session_for(&mock);
    let mut view = session.subscribe();
    let mut input = session.attach_input(QUIET);

    input.input("solar");
    sleep(ms(600)).await;
    assert_eq!(
        session.snapshot().state,
        SessionState::Pending {
            generation: Generation(1)
        }
    );

    input.input("solar panel");
    let current = wait_until(&mut view, settled).await;
    assert_eq!(titles(&current), vec!["New answer"]);

    // well past the moment the older call answers
    sleep(Duration::from_secs(5)).await;
    let later = session.snapshot();
    assert_eq!(titles(&later), vec!["New answer"]);
    assert_eq!(
        later.state,
        SessionState::Settled {
            generation: Generation(2),
            settlement: Settlement::Success
        }
    );
    assert_eq!(mock.calls(), vec!["solar", "solar panel"]);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_empties_results_and_notifies_once() {
    let mock = Arc::new(MockProvider::new());
    mock.respond_to("solar", vec![make_record("1", "Solar cell")]);
    mock.respond_with("graphene", MockResponse::default().delay(Duration::from_secs(60)));
    let (session, mut rx) = session_for(&mock);
    let mut view = session.subscribe();
    let mut input = session.attach_input(QUIET);

    input.input("solar");
    let first = wait_until(&mut view, settled).await;
    assert_eq!(first.results.len(), 1);

    input.input("graphene");
    let failed = wait_until(&mut view, |v| {
        matches!(
            v.state,
            SessionState::Settled {
                settlement: Settlement::Failure,
                ..
            }
        )
    })
    .await;
    assert!(failed.results.is_empty());

    let note = rx.recv().await.unwrap();
    assert_eq!(note.message, SEARCH_FAILED_MESSAGE);
    assert_eq!(note.generation, Generation(2));
    sleep(Duration::from_secs(5)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_one_char_then_two_calls_provider_once() {
    let mock = Arc::new(MockProvider::new());
    mock.respond_to("ab", vec![make_record("1", "AB")]);
    let (session, _rx) = session_for(&mock);
    let mut view = session.subscribe();
    let mut input = session.attach_input(QUIET);

    input.input("a");
    sleep(ms(700)).await;
    input.input("ab");
    let current = wait_until(&mut view, settled).await;

    assert_eq!(titles(&current), vec!["AB"]);
    assert_eq!(mock.calls(), vec!["ab"]);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_input_before_commit_searches_nothing() {
    let mock = Arc::new(MockProvider::new());
    let (session, _rx) = session_for(&mock);
    let mut input = session.attach_input(QUIET);

    input.input("battery");
    sleep(ms(200)).await;
    drop(input);

    sleep(Duration::from_secs(3)).await;
    assert_eq!(mock.call_count(), 0);
    assert_eq!(session.snapshot(), SessionView::default());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_input_discards_in_flight_search() {
    let mock = Arc::new(MockProvider::new());
    mock.respond_with(
        "battery",
        MockResponse::records(vec![make_record("1", "Battery pack")]).delay(ms(1000)),
    );
    let (session, mut rx) = session_for(&mock);
    let mut input = session.attach_input(QUIET);

    input.input("battery");
    sleep(ms(700)).await;
    assert_eq!(mock.calls(), vec!["battery"]);
    drop(input);

    sleep(Duration::from_secs(3)).await;
    let view = session.snapshot();
    assert!(view.results.is_empty());
    assert!(!settled(&view));
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_session_filters_reach_provider_query() {
    let mock = Arc::new(MockProvider::new());
    let (session, _rx) = session_for(&mock);
    session.set_filters(patent_search::SearchFilters::new().jurisdiction("ep"));

    let query = session.query_for("wind turbine");
    assert_eq!(query.filters.jurisdiction.as_deref(), Some("EP"));

    let tagged = session.submit(query).await;
    tokio_test::assert_ok!(tagged.ok_or("superseded"));
    assert_eq!(mock.calls(), vec!["wind turbine"]);
}

#[tokio::test]
async fn test_http_provider_through_session() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(mockito::Matcher::UrlEncoded(
            "q".into(),
            "solar panel".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"results": [
                {"id": 3, "title": "Tracking mount", "applicationNumber": "US3"},
                {"id": 1, "title": "Thin-film <b>cell</b>", "status": "Granted"},
                {"id": 2, "snippet": "no title here"}
            ]}"#,
        )
        .create_async()
        .await;

    let endpoint = url::Url::parse(&format!("{}/search", server.url())).unwrap();
    let provider = Arc::new(HttpTextProvider::new(HttpClient::new().unwrap(), endpoint));
    let (session, _rx) = SearchSession::new(Dispatcher::new(provider));
    let mut view = session.subscribe();
    let mut input = session.attach_input(ms(20));

    input.input("solar panel");
    let current = wait_until(&mut view, settled).await;

    assert_eq!(
        titles(&current),
        vec!["Tracking mount", "Thin-film cell", "Untitled"]
    );
    assert_eq!(current.results[0].number, "US3");
    assert_eq!(current.results[2].description, "no title here");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_server_error_surfaces_generic_message() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", mockito::Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let endpoint = url::Url::parse(&server.url()).unwrap();
    let provider = Arc::new(HttpTextProvider::new(HttpClient::new().unwrap(), endpoint));
    let (session, mut rx) = SearchSession::new(Dispatcher::new(provider));

    let tagged = session.submit(Query::new("graphene")).await.unwrap();
    let failure = tagged.outcome.failure().unwrap();
    assert_eq!(failure.message, SEARCH_FAILED_MESSAGE);
    assert!(failure.detail.contains("503"));
    assert_eq!(rx.recv().await.unwrap().message, SEARCH_FAILED_MESSAGE);
}
