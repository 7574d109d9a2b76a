//! Integration tests for per-client rate limiting.

use axum::http::StatusCode;

use tshop_integration_tests::TestApp;

#[tokio::test]
async fn test_burst_then_too_many_requests() {
    let mut app = TestApp::with_settings(&[("STOREFRONT_RATE_LIMIT_PER_MINUTE", "3")]);

    for _ in 0..3 {
        let response = app.get("/").await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_health_checks_are_not_limited() {
    let mut app = TestApp::with_settings(&[("STOREFRONT_RATE_LIMIT_PER_MINUTE", "1")]);

    app.get("/").await;
    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);

    for _ in 0..5 {
        let response = app.get("/health").await;
        assert_eq!(response.status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_forwarded_clients_have_separate_budgets() {
    let mut app = TestApp::with_settings(&[("STOREFRONT_RATE_LIMIT_PER_MINUTE", "1")]);

    let response = app
        .get_with_headers("/", &[("x-forwarded-for", "203.0.113.5")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let response = app
        .get_with_headers("/", &[("x-forwarded-for", "203.0.113.5")])
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);

    // Falls back to the peer address, which has its own budget.
    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
}
