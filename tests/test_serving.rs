//! Integration test: prediction server routes

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use hotel_reservation::optimizer::BoostParams;
use hotel_reservation::server::{create_router, AppState, CANONICAL_FEATURES, PREDICTION_FAILED};
use hotel_reservation::training::{
    BoostingType, EvaluationMetrics, LightGBMClassifier, LightGBMConfig, ModelArtifact,
};
use ndarray::{Array1, Array2};
use std::sync::Arc;
use tower::ServiceExt;

/// Model over the ten form features that predicts 1 when lead time exceeds 60
fn artifact(feature_names: Vec<String>) -> ModelArtifact {
    let n = 120;
    let x = Array2::from_shape_fn((n, 10), |(i, j)| match j {
        0 => (i % 101) as f64,
        3 | 4 => 1.0 + (i % 12) as f64,
        _ => (i % 3) as f64,
    });
    let y = Array1::from_shape_fn(n, |i| if (i % 101) > 60 { 1 } else { 0 });

    let mut classifier = LightGBMClassifier::new(
        LightGBMConfig::default()
            .with_n_estimators(30)
            .with_num_leaves(4)
            .with_min_child_samples(2),
    );
    classifier.fit(&x, &y).unwrap();

    ModelArtifact {
        feature_names,
        target_column: "booking_status".into(),
        classifier,
        best_params: BoostParams {
            n_estimators: 30,
            max_depth: 5,
            learning_rate: 0.1,
            num_leaves: 4,
            boosting_type: BoostingType::Gbdt,
        },
        cv_score: 1.0,
        metrics: EvaluationMetrics::default(),
        trained_at: Utc::now(),
    }
}

fn canonical_names() -> Vec<String> {
    CANONICAL_FEATURES.iter().map(|s| s.to_string()).collect()
}

fn app(model: ModelArtifact) -> axum::Router {
    create_router(Arc::new(AppState::new(model).unwrap()))
}

async fn post_form(app: axum::Router, body: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/result")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

const VALID: &str = "lead_time=50&no_of_special_request=1&avg_price_per_room=100.5&arrival_month=7\
&arrival_date=15&market_segment_type=4&no_of_week_nights=2&no_of_weekend_nights=1\
&type_of_meal_plan=0&room_type_reserved=0";

#[tokio::test]
async fn test_root_serves_form() {
    let response = app(artifact(canonical_names()))
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("<form action=\"/result\" method=\"post\">"));
    assert!(html.contains("name=\"no_of_special_request\""));
}

#[tokio::test]
async fn test_valid_submission_renders_prediction() {
    let (status, html) = post_form(app(artifact(canonical_names())), VALID).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Prediction: 0"), "{}", html);
    assert!(html.contains("Lead time: 50"));
    assert!(html.contains("Arrival month: 7"));
    assert!(html.contains("Arrival date: 15"));
}

#[tokio::test]
async fn test_reference_booking_renders_prediction() {
    let body = "lead_time=50&no_of_special_request=2&avg_price_per_room=100&arrival_month=6\
&arrival_date=15&market_segment_type=1&no_of_week_nights=2&no_of_weekend_nights=1\
&type_of_meal_plan=0&room_type_reserved=0";
    let (status, html) = post_form(app(artifact(canonical_names())), body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Prediction: 0"), "{}", html);
    assert!(html.contains("Lead time: 50"));
    assert!(html.contains("Arrival month: 6"));
    assert!(html.contains("Arrival date: 15"));
}

#[tokio::test]
async fn test_long_lead_time_flips_prediction() {
    let body = VALID.replace("lead_time=50", "lead_time=95");
    let (_, html) = post_form(app(artifact(canonical_names())), &body).await;
    assert!(html.contains("Prediction: 1"), "{}", html);
}

#[tokio::test]
async fn test_out_of_range_lead_time() {
    let body = VALID.replace("lead_time=50", "lead_time=150");
    let (status, html) = post_form(app(artifact(canonical_names())), &body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Lead time must be between 0 and 100 days"));
    assert!(!html.contains("Prediction:"));
}

#[tokio::test]
async fn test_non_numeric_price() {
    let body = VALID.replace("avg_price_per_room=100.5", "avg_price_per_room=abc");
    let (status, html) = post_form(app(artifact(canonical_names())), &body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Invalid input format"));
}

#[tokio::test]
async fn test_range_messages() {
    let cases = [
        ("no_of_special_request=1", "no_of_special_request=6", "Number of special requests must be between 0 and 5"),
        ("avg_price_per_room=100.5", "avg_price_per_room=250", "Average price per room must be between 0 and 200"),
        ("no_of_week_nights=2", "no_of_week_nights=9", "Number of week nights must be between 0 and 8"),
        ("no_of_weekend_nights=1", "no_of_weekend_nights=-1", "Number of weekend nights must be between 0 and 8"),
    ];
    for (from, to, message) in cases {
        let (_, html) = post_form(app(artifact(canonical_names())), &VALID.replace(from, to)).await;
        assert!(html.contains(message), "{} -> {}", to, html);
    }
}

#[tokio::test]
async fn test_missing_fields_use_defaults() {
    let (status, html) = post_form(app(artifact(canonical_names())), "lead_time=10").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Arrival month: 1"));
    assert!(html.contains("Arrival date: 1"));
}

#[tokio::test]
async fn test_unnamed_ten_feature_model_uses_canonical_order() {
    let names = (0..10).map(|i| format!("f{}", i)).collect();
    let body = VALID.replace("lead_time=50", "lead_time=95");
    let (_, html) = post_form(app(artifact(names)), &body).await;
    assert!(html.contains("Prediction: 1"), "{}", html);
}

#[tokio::test]
async fn test_model_failure_is_not_leaked() {
    // Names are form fields, but the classifier expects ten columns
    let model = artifact(vec!["lead_time".into(), "arrival_month".into()]);
    let (status, html) = post_form(app(model), VALID).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(PREDICTION_FAILED));
    assert!(!html.contains("feature"));
}

#[tokio::test]
async fn test_unknown_route_is_404_html() {
    let response = app(artifact(canonical_names()))
        .oneshot(Request::builder().uri("/predict").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
}

#[test]
fn test_unusable_model_fails_startup() {
    let names = vec!["lead_time".to_string(), "no_of_adults".to_string()];
    assert!(AppState::new(artifact(names)).is_err());
}
