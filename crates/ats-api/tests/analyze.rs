use axum::{body::Body, http::Request, http::StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn post_analyze(body: Value) -> (StatusCode, Value) {
    let app = ats_api::create_router(ats_api::test_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/analyze")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn analyze_scores_a_matching_candidate() {
    let (status, body) = post_analyze(json!({
        "resume": {
            "skills": ["Python", "PostgreSQL", "Docker"],
            "experience": [{
                "kind": "professional",
                "title": "Backend Engineer",
                "start": "2019-01",
                "end": "2025-01",
                "bullets": ["Built Python services handling 2k requests per second"]
            }],
            "projects": [{
                "name": "ETL",
                "description": "Python pipeline, cut runtime by 60%",
                "technologies": ["Python", "PostgreSQL"]
            }]
        },
        "job": {
            "title": "Backend Engineer",
            "must_have_skills": ["Python", "PostgreSQL"],
            "nice_to_have_skills": ["Docker"],
            "required_years": 5.0
        },
        "as_of": "2025-06-01",
        "narrative": true
    }))
    .await;

    assert_eq!(status, StatusCode::OK);

    let breakdown = &body["analysis"]["breakdown"];
    assert_eq!(breakdown["must_have_ratio"], 1.0);
    assert_eq!(breakdown["tier"], "senior");
    assert!(breakdown["final_score"].as_u64().unwrap() >= 95);

    let narrative = body["narrative"].as_str().unwrap();
    assert!(narrative.contains("Backend Engineer"));
}

#[tokio::test]
async fn analyze_accepts_ongoing_entries_and_month_names() {
    let (status, body) = post_analyze(json!({
        "resume": {
            "skills": ["Rust"],
            "experience": [{
                "kind": "professional",
                "start": "March 2023",
                "end": "present"
            }]
        },
        "job": { "must_have_skills": ["Rust"] },
        "as_of": "2025-03-01"
    }))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"]["experience"]["professional_years"], 2.0);
    // Narrative was not requested.
    assert!(body.get("narrative").is_none());
}

#[tokio::test]
async fn unparseable_date_returns_bad_request() {
    let (status, body) = post_analyze(json!({
        "resume": {
            "experience": [{ "kind": "professional", "start": "someday" }]
        },
        "job": {}
    }))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn inverted_date_range_returns_unprocessable() {
    let (status, body) = post_analyze(json!({
        "resume": {
            "experience": [{
                "kind": "professional",
                "start": "2024-06",
                "end": "2023-06"
            }]
        },
        "job": {}
    }))
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "unprocessable");
}
