mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use condiment_shop::{
    middleware::auth::{AuthUser, issue_token},
    payments::FakeGateway,
    routes::create_app,
};
use serde_json::Value;
use tower::ServiceExt;

fn bearer(app: &common::TestApp, user: &AuthUser) -> anyhow::Result<String> {
    let token = issue_token(&app.state.config.jwt_secret, user.user_id, user.is_admin)?;
    Ok(format!("Bearer {token}"))
}

fn get(uri: &str, auth: Option<&str>) -> anyhow::Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    Ok(builder.body(Body::empty())?)
}

fn post(uri: &str, auth: &str) -> anyhow::Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, auth)
        .body(Body::empty())?)
}

async fn json_body(response: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn location(response: &axum::response::Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn missing_token_redirects_to_login() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let router = create_app(app.state.clone());

    let response = router.oneshot(get("/api/cart", None)?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(location(&response), Some("/api/login"));
    Ok(())
}

#[tokio::test]
async fn empty_cart_checkout_redirects_to_cart_empty() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let user = common::shopper(&app.state).await?;
    let auth = bearer(&app, &user)?;
    let router = create_app(app.state.clone());

    let response = router
        .oneshot(post("/api/create-checkout-session", &auth)?)
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/api/cart-empty"));
    assert_eq!(app.gateway.checkout_call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn unknown_direction_is_bad_request() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let admin = common::admin(&app.state).await?;
    let user = common::shopper(&app.state).await?;
    let item = common::create_item(&app.state, &admin, "Plum Jam", 899, 5).await?;
    let auth = bearer(&app, &user)?;
    let router = create_app(app.state.clone());

    let uri = format!("/api/add-to-cart/{}/sideways", item.id);
    let response = router.oneshot(get(&uri, Some(&auth))?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn checkout_round_trip_over_http() -> anyhow::Result<()> {
    let app = common::setup_with(FakeGateway::auto_settling()).await?;
    let admin = common::admin(&app.state).await?;
    let user = common::shopper(&app.state).await?;
    let item = common::create_item(&app.state, &admin, "Cranberry Jam", 1050, 5).await?;
    let auth = bearer(&app, &user)?;
    let router = create_app(app.state.clone());

    for _ in 0..2 {
        let uri = format!("/api/add-to-cart/{}/increase", item.id);
        let response = router.clone().oneshot(get(&uri, Some(&auth))?).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = router
        .clone()
        .oneshot(post("/api/create-checkout-session", &auth)?)
        .await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response).expect("redirect target").to_string();
    let callback = target
        .strip_prefix("http://shop.test")
        .expect("success url on the public base");
    assert!(callback.starts_with("/api/success?session_id=cs_"));

    let response = router.clone().oneshot(get(callback, None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["message"], "Order placed");
    assert_eq!(body["data"]["order"]["total_amount"], 2100);

    let response = router.clone().oneshot(get(callback, None)?).await?;
    let body = json_body(response).await?;
    assert_eq!(body["message"], "Order already placed");

    let response = router.clone().oneshot(get("/api/orders", Some(&auth))?).await?;
    let body = json_body(response).await?;
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(1));

    let response = router.oneshot(get("/api/cart", Some(&auth))?).await?;
    let body = json_body(response).await?;
    assert_eq!(body["data"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn category_listing_filters_items() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let admin = common::admin(&app.state).await?;
    common::create_item(&app.state, &admin, "Maple Syrup", 1499, 5).await?;
    let router = create_app(app.state.clone());

    let response = router.clone().oneshot(get("/api/syrups", None)?).await?;
    let body = json_body(response).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let response = router.oneshot(get("/api/jams?page=1&per_page=5", None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn out_of_range_page_is_an_empty_listing() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let admin = common::admin(&app.state).await?;
    common::create_item(&app.state, &admin, "Birch Syrup", 1899, 5).await?;
    let router = create_app(app.state.clone());

    let uri = format!("/api/syrups?page={}&per_page=100", i64::MAX);
    let response = router.clone().oneshot(get(&uri, None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    let uri = format!("/api?page={}", i64::MAX);
    let response = router.oneshot(get(&uri, None)?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn catalog_answers_with_and_without_trailing_slash() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let admin = common::admin(&app.state).await?;
    common::create_item(&app.state, &admin, "Fig Jam", 799, 5).await?;
    let router = create_app(app.state.clone());

    for uri in ["/api", "/api/"] {
        let response = router.clone().oneshot(get(uri, None)?).await?;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let body = json_body(response).await?;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1), "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn unknown_path_is_json_not_found() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let router = create_app(app.state.clone());

    let response = router.oneshot(get("/nope", None)?).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
