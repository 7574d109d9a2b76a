//! Integration tests for catalog browsing: listing, filters, pagination,
//! product detail, and the ambient endpoints around them.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use tshop_integration_tests::TestApp;

/// Twelve products: ten in "Lacquers", two in "Metal Paints".
async fn stocked_app() -> (TestApp, i32, i32) {
    let app = TestApp::new();
    let lacquers = app.catalog.add_category("Lacquers").await;
    let metal = app.catalog.add_category("Metal Paints").await;

    for n in 1..=10 {
        app.catalog
            .add_product(&format!("Lacquer No {n}"), "10.00", Some(lacquers.id))
            .await;
    }
    app.catalog
        .add_product("Satin Black", "12.50", Some(metal.id))
        .await;
    app.catalog
        .add_product("Satin Silver", "13.00", Some(metal.id))
        .await;

    (app, lacquers.id.as_i32(), metal.id.as_i32())
}

fn result_count(n: u64) -> String {
    format!("class=\"result-count\">{n} products<")
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_listing_first_page() {
    let (mut app, _, _) = stocked_app().await;

    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains(&result_count(12)));
    assert!(response.body.contains("Page 1 of 2"));
    assert!(response.body.contains("Lacquer No 1<"));
    assert!(response.body.contains("Lacquer No 8<"));
    assert!(!response.body.contains("Lacquer No 9<"));
    assert!(response.body.contains("Metal Paints"));
}

#[tokio::test]
async fn test_listing_second_page() {
    let (mut app, _, _) = stocked_app().await;

    let response = app.get("/?page=2").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Page 2 of 2"));
    assert!(response.body.contains("Lacquer No 9<"));
    assert!(response.body.contains("Satin Silver"));
    assert!(!response.body.contains("Lacquer No 1<"));
}

#[tokio::test]
async fn test_listing_bad_page_values_fall_back() {
    let (mut app, _, _) = stocked_app().await;

    for uri in ["/?page=abc", "/?page=0", "/?page=-3"] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::OK, "{uri}");
        assert!(response.body.contains("Page 1 of 2"), "{uri}");
    }

    for uri in ["/?page=99", "/?page=99999999999999999999999"] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::OK, "{uri}");
        assert!(response.body.contains("Page 2 of 2"), "{uri}");
        assert!(response.body.contains("Satin Silver"), "{uri}");
    }
}

#[tokio::test]
async fn test_listing_text_search() {
    let (mut app, _, _) = stocked_app().await;

    let response = app.get("/?q=SATIN").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains(&result_count(2)));
    assert!(response.body.contains("Satin Black"));
    assert!(response.body.contains("Page 1 of 1"));
    assert!(!response.body.contains("Lacquer No 1<"));
}

#[tokio::test]
async fn test_listing_category_filter() {
    let (mut app, lacquers, metal) = stocked_app().await;

    let response = app.get(&format!("/?category={metal}")).await;
    assert!(response.body.contains(&result_count(2)));

    let response = app.get(&format!("/?category={lacquers}&q=No+1")).await;
    // "No 1" and "No 10"
    assert!(response.body.contains(&result_count(2)));
}

#[tokio::test]
async fn test_listing_ignores_malformed_category() {
    let (mut app, _, _) = stocked_app().await;

    for uri in ["/?category=paint", "/?category=0", "/?category="] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::OK, "{uri}");
        assert!(response.body.contains(&result_count(12)), "{uri}");
    }
}

#[tokio::test]
async fn test_listing_negative_category_matches_nothing() {
    let (mut app, _, _) = stocked_app().await;
    app.catalog.add_product("Thinner", "3.00", None).await;

    let response = app.get("/?category=-4").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains(&result_count(0)));
    assert!(!response.body.contains("Thinner"));
}

#[tokio::test]
async fn test_listing_strips_control_characters_from_query() {
    let (mut app, _, _) = stocked_app().await;

    let response = app.get("/?q=%00").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains(&result_count(12)));

    let response = app.get("/?q=sat%00in%09").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains(&result_count(2)));
}

#[tokio::test]
async fn test_listing_no_matches() {
    let (mut app, _, _) = stocked_app().await;

    let response = app.get("/?q=varnish").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("No products match your search."));
    assert!(response.body.contains("Page 1 of 1"));
}

#[tokio::test]
async fn test_listing_empty_catalog() {
    let mut app = TestApp::new();

    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains(&result_count(0)));
}

#[tokio::test]
async fn test_add_buttons_only_for_logged_in_users() {
    let (mut app, _, _) = stocked_app().await;

    let response = app.get("/").await;
    assert!(!response.body.contains("Add to cart"));

    app.signup_and_login("painter").await;
    let response = app.get("/").await;
    assert!(response.body.contains("Add to cart"));
    assert!(response.body.contains("painter"));
}

// =============================================================================
// Product Detail
// =============================================================================

#[tokio::test]
async fn test_product_detail() {
    let (mut app, _, _) = stocked_app().await;

    let response = app.get("/product/11/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Satin Black"));
    assert!(response.body.contains("$12.50"));
    assert!(response.body.contains("Metal Paints"));
}

#[tokio::test]
async fn test_product_detail_not_found() {
    let (mut app, _, _) = stocked_app().await;

    for uri in ["/product/999/", "/product/abc/", "/product/-1/"] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");
    }
}

// =============================================================================
// Ambient Endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new();

    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");

    let response = app.get("/health/ready").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_pages_carry_security_headers() {
    let mut app = TestApp::new();

    let response = app.get("/").await;
    assert_eq!(
        response.headers.get("cache-control").unwrap(),
        "no-store, max-age=0"
    );
    assert!(response.headers.contains_key("content-security-policy"));
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_request_ids_are_unique() {
    let mut app = TestApp::new();

    let response = app.get("/health").await;
    let first = response.headers.get("x-request-id").unwrap().clone();
    let response = app.get("/health").await;
    assert_ne!(response.headers.get("x-request-id").unwrap(), first);
}

#[tokio::test]
async fn test_static_files_are_cacheable() {
    let mut app = TestApp::new();

    let response = app.get("/static/css/main.css").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_ne!(
        response
            .headers
            .get("cache-control")
            .map(|v| v.to_str().unwrap()),
        Some("no-store, max-age=0")
    );
}
