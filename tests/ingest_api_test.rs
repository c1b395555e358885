mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::{Harness, ACCEPT_PASSWORD, ATTEMPT_PASSWORD, INGEST_SECRET};
use quiz_relay::routes;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

fn post_json(uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_reports_database() {
    let h = Harness::new().await;
    let app = routes::app(h.state.clone());

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn ingest_requires_the_shared_secret() {
    let h = Harness::new().await;
    let app = routes::app(h.state.clone());

    let (status, body) = send(
        &app,
        post_json(
            "/ingest",
            json!({ "email": "ops@example.com", "secret": "wrong", "url": "https://quiz.test/1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_secret");

    let req = Request::builder()
        .method("POST")
        .uri("/ingest")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request_body");

    assert!(h.state.ingest_service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn ingest_rejects_invalid_fields() {
    let h = Harness::new().await;
    let app = routes::app(h.state.clone());

    let (status, _) = send(
        &app,
        post_json(
            "/ingest",
            json!({ "email": "not-an-email", "secret": INGEST_SECRET, "url": "https://quiz.test/1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.state.ingest_service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn ingest_registers_and_starts_session() {
    let h = Harness::new().await;
    let app = routes::app(h.state.clone());

    let (status, body) = send(
        &app,
        post_json(
            "/ingest",
            json!({ "email": "ops@example.com", "secret": INGEST_SECRET, "url": "https://quiz.test/1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "quiz_session_started");
    assert_eq!(body["data"]["ingest"]["status"], "Running");
    assert_eq!(body["data"]["session"]["currentUrl"], "https://quiz.test/1");
    assert_eq!(body["data"]["session"]["status"], "waiting_for_answer");
    assert!(body["data"]["ingest"].get("secret").is_none());
    assert!(body["data"]["ingest"].get("raw").is_none());
    assert!(!body.to_string().contains(INGEST_SECRET));

    let (status, body) = send(&app, get("/ingest")).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["email"], "ops@example.com");
    assert!(listed[0].get("secret").is_none());
    assert!(listed[0].get("raw").is_none());
    assert!(!body.to_string().contains(INGEST_SECRET));

    let (status, body) = send(&app, get("/quiz/pending")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["url"], "https://quiz.test/1");
}

#[tokio::test]
async fn accept_validates_id_and_password() {
    let h = Harness::new().await;
    let app = routes::app(h.state.clone());
    let ingest = h.register("ops@example.com", "https://quiz.test/1").await;

    let (status, body) = send(
        &app,
        get("/ingest/notification-accept?id=abc&password=whatever"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id_parameter");

    let (status, _) = send(
        &app,
        get(&format!(
            "/ingest/notification-accept?id={}&password=wrong",
            ingest.id
        )),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        get(&format!(
            "/ingest/notification-accept?id={}&password={}",
            ingest.id, ACCEPT_PASSWORD
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "ingest_accepted");

    let (_, body) = send(&app, get("/ingest")).await;
    assert_eq!(body["data"][0]["status"], "Notification Accepted");

    let (status, _) = send(
        &app,
        get(&format!(
            "/ingest/notification-accept?id=9999&password={}",
            ACCEPT_PASSWORD
        )),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn answer_endpoint_drives_the_session() {
    let h = Harness::new().await;
    let app = routes::app(h.state.clone());
    let (_, session) = h.start("ops@example.com", "https://quiz.test/1").await;
    let uri = format!("/quiz/sessions/{}/answer", session.id);

    let (status, body) = send(
        &app,
        post_json(&uri, json!({ "answer": "x", "password": ATTEMPT_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "submit_url_required");

    let (status, _) = send(
        &app,
        post_json(
            &uri,
            json!({ "answer": "x", "submitUrl": h.submit_url(), "password": "nope" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(h.fake.submissions().is_empty());

    h.fake.script(json!({ "correct": true, "reason": "well done" }));
    let (status, body) = send(
        &app,
        post_json(
            &uri,
            json!({ "answer": { "value": 7 }, "submitUrl": h.submit_url(), "password": ATTEMPT_PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "answer_submitted");
    assert_eq!(body["data"]["correct"], true);
    assert_eq!(body["data"]["reason"], "well done");
    assert_eq!(h.fake.submissions(), vec![r#"{"value":7}"#.to_string()]);

    let (status, body) = send(&app, get("/quiz/sessions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["status"], "completed");

    let (status, body) = send(
        &app,
        get(&format!("/quiz/sessions/{}/attempts", session.id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["correct"], true);

    let (status, _) = send(
        &app,
        post_json(
            &uri,
            json!({ "answer": "again", "submitUrl": h.submit_url(), "password": ATTEMPT_PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        post_json(
            "/quiz/sessions/424242/answer",
            json!({ "answer": "x", "submitUrl": h.submit_url(), "password": ATTEMPT_PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn answer_endpoint_forwards_numbers_as_written() {
    let h = Harness::new().await;
    let app = routes::app(h.state.clone());
    let (_, session) = h.start("ops@example.com", "https://quiz.test/1").await;

    let answer = r#"{"n":1e2,"big":18446744073709551616,"f":1.50}"#;
    let body = format!(
        r#"{{"answer":{},"submitUrl":"{}","password":"{}"}}"#,
        answer,
        h.submit_url(),
        ATTEMPT_PASSWORD
    );
    let req = Request::builder()
        .method("POST")
        .uri(format!("/quiz/sessions/{}/answer", session.id))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    h.fake.script(json!({ "correct": true }));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.fake.submissions(), vec![answer.to_string()]);
}

#[tokio::test]
async fn upstream_failure_maps_to_bad_gateway() {
    let h = Harness::new().await;
    let app = routes::app(h.state.clone());
    let (_, session) = h.start("ops@example.com", "https://quiz.test/1").await;

    let (status, body) = send(
        &app,
        post_json(
            &format!("/quiz/sessions/{}/answer", session.id),
            json!({
                "answer": "x",
                "submitUrl": format!("{}/garbage", h.upstream),
                "password": ATTEMPT_PASSWORD
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("decode"));
}
