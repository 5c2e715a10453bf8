use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use flora_infra::{HealthCheck, HealthReport};
use flora_responder::app::{HEALTH_PATH, build_app};

struct FixedHealth(HealthReport);

#[async_trait]
impl HealthCheck for FixedHealth {
    async fn report(&self) -> HealthReport {
        self.0.clone()
    }
}

async fn get_health(report: HealthReport) -> (StatusCode, serde_json::Value) {
    let app = build_app(Arc::new(FixedHealth(report)));
    let response = app
        .oneshot(Request::get(HEALTH_PATH).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn healthy_dependencies_answer_200() {
    let report = HealthReport::from_checks::<String, String, String>(Ok(()), Ok(()), Ok(()));

    let (status, body) = get_health(report).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert_eq!(body["mongo"], "healthy");
}

#[tokio::test]
async fn failed_dependency_answers_500_with_report() {
    let report = HealthReport::from_checks::<String, String, String>(
        Ok(()),
        Ok(()),
        Err("connection refused".to_string()),
    );

    let (status, body) = get_health(report).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["rabbitmq"], "error: connection refused");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["code"], 500);
}

#[tokio::test]
async fn other_paths_are_not_served() {
    let app = build_app(Arc::new(FixedHealth(HealthReport::from_checks::<
        String,
        String,
        String,
    >(Ok(()), Ok(()), Ok(())))));

    let response = app
        .oneshot(Request::get("/floras").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
