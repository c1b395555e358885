#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::{TimeZone, Utc};
use quiz_relay::{
    config::Config,
    database::pool::create_memory_pool,
    dto::ingest_dto::TaskRequest,
    models::{ingest::Ingest, quiz_session::QuizSession},
    utils::time::{Clock, ManualClock},
    AppState,
};
use serde_json::Value as JsonValue;
use tokio::net::TcpListener;

pub const INGEST_SECRET: &str = "ingest-secret";
pub const ACCEPT_PASSWORD: &str = "accept-pw";
pub const ATTEMPT_PASSWORD: &str = "attempt-pw";
pub const NTFY_TOPIC: &str = "quiz-alerts";

/// Stand-in for both the quiz submission endpoint and the push channel.
///
/// `POST /submit` records the raw body and answers with the next scripted
/// verdict (500 when the script is empty). `POST /garbage` answers with a
/// body that is not JSON. `POST /quiz-alerts` records the notification and
/// answers 500 for any message containing one of `fail_markers`.
#[derive(Clone, Default)]
pub struct FakeUpstream {
    pub verdicts: Arc<Mutex<VecDeque<JsonValue>>>,
    pub submissions: Arc<Mutex<Vec<String>>>,
    pub notifications: Arc<Mutex<Vec<String>>>,
    pub fail_markers: Arc<Mutex<Vec<String>>>,
}

impl FakeUpstream {
    pub fn script(&self, verdict: JsonValue) {
        self.verdicts.lock().unwrap().push_back(verdict);
    }

    pub fn fail_when_contains(&self, marker: &str) {
        self.fail_markers.lock().unwrap().push(marker.to_string());
    }

    pub fn submissions(&self) -> Vec<String> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().unwrap().clone()
    }
}

async fn submit(State(fake): State<FakeUpstream>, body: Bytes) -> Response {
    fake.submissions
        .lock()
        .unwrap()
        .push(String::from_utf8_lossy(&body).into_owned());
    let next = fake.verdicts.lock().unwrap().pop_front();
    match next {
        Some(verdict) => axum::Json(verdict).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "no verdict scripted").into_response(),
    }
}

async fn garbage() -> &'static str {
    "<html>definitely not a verdict</html>"
}

async fn notify(State(fake): State<FakeUpstream>, body: String) -> StatusCode {
    fake.notifications.lock().unwrap().push(body.clone());
    let failing = fake
        .fail_markers
        .lock()
        .unwrap()
        .iter()
        .any(|marker| body.contains(marker.as_str()));
    if failing {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

pub async fn spawn_upstream(fake: FakeUpstream) -> String {
    let app = Router::new()
        .route("/submit", post(submit))
        .route("/garbage", post(garbage))
        .route(&format!("/{}", NTFY_TOPIC), post(notify))
        .with_state(fake);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind upstream");
    let addr = listener.local_addr().expect("upstream addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("upstream server");
    });
    format!("http://{}", addr)
}

pub fn test_config(upstream: &str) -> Config {
    Config {
        server_address: "127.0.0.1:0".to_string(),
        database_url: "sqlite::memory:".to_string(),
        ingest_secret: INGEST_SECRET.to_string(),
        ingest_accept_password: ACCEPT_PASSWORD.to_string(),
        quiz_attempt_password: ATTEMPT_PASSWORD.to_string(),
        ntfy_base_url: upstream.to_string(),
        ntfy_topic: NTFY_TOPIC.to_string(),
        notify_interval: Duration::from_millis(20),
        public_dir: "./public".to_string(),
    }
}

pub struct Harness {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub upstream: String,
    pub fake: FakeUpstream,
}

impl Harness {
    pub async fn new() -> Self {
        let pool = create_memory_pool().await.expect("memory pool");
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
        ));
        let fake = FakeUpstream::default();
        let upstream = spawn_upstream(fake.clone()).await;
        let state =
            AppState::new(pool, test_config(&upstream), clock.clone()).expect("app state");
        Self {
            state,
            clock,
            upstream,
            fake,
        }
    }

    pub fn submit_url(&self) -> String {
        format!("{}/submit", self.upstream)
    }

    pub async fn register(&self, email: &str, url: &str) -> Ingest {
        self.state
            .ingest_service
            .register(&TaskRequest {
                email: email.to_string(),
                secret: INGEST_SECRET.to_string(),
                url: url.to_string(),
            })
            .await
            .expect("register ingest")
    }

    /// Register-then-start, the way `POST /ingest` does it.
    pub async fn start(&self, email: &str, url: &str) -> (Ingest, QuizSession) {
        let ingest = self.register(email, url).await;
        let session = self
            .state
            .quiz_service
            .start(&ingest, &ingest.url)
            .await
            .expect("start session");
        (ingest, session)
    }

    pub async fn pending_in_session(&self, session_id: i64) -> usize {
        let now = self.clock.now();
        self.state
            .quiz_service
            .list_attempts(session_id)
            .await
            .expect("list attempts")
            .iter()
            .filter(|a| a.is_pending(now))
            .count()
    }
}
