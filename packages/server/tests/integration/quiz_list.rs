use chrono::Duration;
use serde_json::Value;

use crate::common::{EventSeed, TestApp, routes};

fn item_for(body: &Value, event_id: i32) -> Value {
    body["data"]
        .as_array()
        .expect("response should contain 'data'")
        .iter()
        .find(|item| item["event_id"] == event_id)
        .cloned()
        .unwrap_or_else(|| panic!("event {event_id} missing from quiz list"))
}

#[tokio::test]
async fn requires_authentication() {
    let app = TestApp::spawn().await;
    let res = app.get_without_token(routes::QUIZZES).await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn open_event_offers_start() {
    let app = TestApp::spawn().await;
    let event_id = app.create_standard_event(EventSeed::default()).await;

    let res = app.get_with_token(routes::QUIZZES, &app.token("alice")).await;

    assert_eq!(res.status, 200, "{}", res.text);
    let item = item_for(&res.body, event_id);
    assert_eq!(item["call_to_action"], "start");
    assert_eq!(item["completed_rounds"], 0);
    assert_eq!(item["max_rounds"], 3);
    assert_eq!(item["percent_complete"], 0);
    assert!(item["active_session_id"].is_null());
    assert!(item["prize"].is_null());
}

#[tokio::test]
async fn started_session_offers_resume() {
    let app = TestApp::spawn().await;
    let event_id = app.create_standard_event(EventSeed::default()).await;
    let token = app.token("alice");
    let started = app.start_session(event_id, &token).await;

    let res = app.get_with_token(routes::QUIZZES, &token).await;

    let item = item_for(&res.body, event_id);
    assert_eq!(item["call_to_action"], "resume");
    assert_eq!(item["active_session_id"], started.session_id());

    // Progress is per user.
    let res = app.get_with_token(routes::QUIZZES, &app.token("bob")).await;
    assert_eq!(item_for(&res.body, event_id)["call_to_action"], "start");
}

#[tokio::test]
async fn completed_round_counts_towards_event_progress() {
    let app = TestApp::spawn().await;
    let event_id = app.create_standard_event(EventSeed::default()).await;
    let token = app.token("alice");
    app.play_round(event_id, &token, false).await;

    let res = app.get_with_token(routes::QUIZZES, &token).await;

    let item = item_for(&res.body, event_id);
    assert_eq!(item["call_to_action"], "start");
    assert_eq!(item["completed_rounds"], 1);
    assert_eq!(item["percent_complete"], 33);
}

#[tokio::test]
async fn all_rounds_played_shows_completed() {
    let app = TestApp::spawn().await;
    let event_id = app.create_standard_event(EventSeed::default()).await;
    let token = app.token("alice");
    for _ in 0..3 {
        app.play_round(event_id, &token, false).await;
    }

    let res = app.get_with_token(routes::QUIZZES, &token).await;

    let item = item_for(&res.body, event_id);
    assert_eq!(item["call_to_action"], "completed");
    assert_eq!(item["completed_rounds"], 3);
    assert_eq!(item["percent_complete"], 100);
}

#[tokio::test]
async fn window_decides_upcoming_and_expired() {
    let app = TestApp::spawn().await;
    let upcoming = app
        .create_standard_event(EventSeed {
            starts_in: Duration::days(2),
            ends_in: Duration::days(3),
            ..EventSeed::default()
        })
        .await;
    let expired = app
        .create_standard_event(EventSeed {
            starts_in: Duration::days(-5),
            ends_in: Duration::days(-4),
            ..EventSeed::default()
        })
        .await;

    let res = app.get_with_token(routes::QUIZZES, &app.token("alice")).await;

    assert_eq!(item_for(&res.body, upcoming)["call_to_action"], "upcoming");
    assert_eq!(item_for(&res.body, expired)["call_to_action"], "expired");
}

#[tokio::test]
async fn inactive_events_are_hidden_and_list_is_ordered_by_start() {
    let app = TestApp::spawn().await;
    let later = app
        .create_standard_event(EventSeed {
            starts_in: Duration::hours(-1),
            ..EventSeed::default()
        })
        .await;
    let earlier = app
        .create_standard_event(EventSeed {
            starts_in: Duration::days(-2),
            ..EventSeed::default()
        })
        .await;
    let hidden = app
        .create_standard_event(EventSeed {
            is_active: false,
            ..EventSeed::default()
        })
        .await;

    let res = app.get_with_token(routes::QUIZZES, &app.token("alice")).await;

    let ids: Vec<i64> = res.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["event_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![i64::from(earlier), i64::from(later)]);
    assert!(!ids.contains(&i64::from(hidden)));
}

#[tokio::test]
async fn health_reports_database() {
    let app = TestApp::spawn().await;
    let res = app.get_without_token(routes::HEALTH).await;
    assert_eq!(res.status, 200, "{}", res.text);
}
