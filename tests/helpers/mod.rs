//! Test helper utilities for the integration suites

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tower::ServiceExt;
use uuid::Uuid;

use craft_content_gen::{
    app_state::AppState,
    config::Settings,
    routes,
    services::{
        providers::gemini::RemoteOptions,
        queue::InMemoryBroker,
        registry::ProviderRegistry,
        store::InMemoryResultStore,
        worker::{WorkerContext, WorkerOptions, WorkerPool},
    },
};

/// Response from POST /v1/jobs
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: String,
}

/// Response from GET /v1/jobs/{job_id}
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: String,
    pub provider: String,
    pub model_name_used: Option<String>,
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// An in-process service: router plus embedded workers over in-memory backends.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub broker: Arc<InMemoryBroker>,
    pub store: Arc<InMemoryResultStore>,
    pub pool: Option<WorkerPool>,
}

impl TestApp {
    pub async fn shutdown(self) {
        if let Some(pool) = self.pool {
            pool.shutdown().await;
        }
    }
}

pub fn fast_worker_options() -> WorkerOptions {
    WorkerOptions {
        poll_interval: Duration::from_millis(10),
        job_timeout: Duration::from_secs(5),
    }
}

/// Build a test app. `workers == 0` leaves the queue undrained.
pub fn spawn_app(settings: Settings, registry: ProviderRegistry, workers: usize) -> TestApp {
    let broker = Arc::new(InMemoryBroker::new());
    let store = Arc::new(InMemoryResultStore::new());
    let settings = Arc::new(settings);
    let registry = Arc::new(registry);

    let state = AppState::new(
        settings.clone(),
        registry.clone(),
        broker.clone(),
        store.clone(),
    );
    let pool = (workers > 0).then(|| {
        WorkerPool::spawn(
            workers,
            WorkerContext {
                broker: broker.clone(),
                store: store.clone(),
                registry,
                settings,
                options: fast_worker_options(),
            },
        )
    });

    TestApp {
        router: routes::router(state.clone(), None),
        state,
        broker,
        store,
        pool,
    }
}

/// Mock-mode app with the default registry and two workers.
pub fn spawn_mock_app() -> TestApp {
    let settings = Settings {
        mock_mode: true,
        ..Settings::default()
    };
    let registry = ProviderRegistry::with_defaults(reqwest::Client::new(), RemoteOptions::default());
    spawn_app(settings, registry, 2)
}

/// Drive one request through the router and decode the JSON body.
pub async fn send_json(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<&Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, json)
}

/// Poll the router until the job reaches a terminal status, recording every
/// status seen along the way.
pub async fn poll_until_terminal(
    router: &Router,
    job_id: Uuid,
    timeout: Duration,
) -> (JobStatusResponse, Vec<String>) {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut seen = Vec::new();

    loop {
        let (status, body) = send_json(router, "GET", &format!("/v1/jobs/{job_id}"), None, &[]).await;
        assert_eq!(status, StatusCode::OK, "status poll failed: {body}");
        let job: JobStatusResponse = serde_json::from_value(body).unwrap();

        if seen.last() != Some(&job.status) {
            seen.push(job.status.clone());
        }
        if job.status == "completed" || job.status == "failed" {
            return (job, seen);
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {job_id} still {} after {timeout:?}",
            job.status
        );
        sleep(Duration::from_millis(10)).await;
    }
}

/// Statuses must only move forward through queued -> processing -> terminal.
pub fn assert_monotonic(statuses: &[String]) {
    let rank = |s: &str| match s {
        "queued" => 0,
        "processing" => 1,
        "completed" | "failed" => 2,
        other => panic!("unknown status {other}"),
    };
    for pair in statuses.windows(2) {
        assert!(
            rank(&pair[0]) < rank(&pair[1]),
            "status went backwards: {statuses:?}"
        );
    }
}

/// Submit a job to a running server over HTTP
pub async fn submit_remote(
    client: &reqwest::Client,
    base_url: &str,
    body: &Value,
) -> Result<SubmitResponse, Box<dyn std::error::Error>> {
    let response = client
        .post(format!("{}/v1/jobs", base_url))
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if status != reqwest::StatusCode::ACCEPTED {
        let error_text = response.text().await?;
        return Err(format!("Submit failed with status {}: {}", status, error_text).into());
    }
    Ok(response.json::<SubmitResponse>().await?)
}

/// Poll a running server until the job is completed or failed (with timeout)
pub async fn poll_remote(
    client: &reqwest::Client,
    base_url: &str,
    job_id: Uuid,
    timeout_secs: u64,
) -> Result<JobStatusResponse, Box<dyn std::error::Error>> {
    let max_attempts = timeout_secs * 2; // Poll every 500ms

    for _ in 0..max_attempts {
        let response = client
            .get(format!("{}/v1/jobs/{}", base_url, job_id))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Status check failed: {}", error_text).into());
        }

        let job = response.json::<JobStatusResponse>().await?;
        match job.status.as_str() {
            "completed" | "failed" => return Ok(job),
            "queued" | "processing" => sleep(Duration::from_millis(500)).await,
            other => return Err(format!("Unknown job status: {}", other).into()),
        }
    }

    Err(format!("Job did not complete within {} seconds", timeout_secs).into())
}
