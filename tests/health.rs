mod common;

use axum::extract::State;
use condiment_shop::routes::health::health_check;

#[tokio::test]
async fn health_check_reports_database_and_gateway() -> anyhow::Result<()> {
    let app = common::setup().await?;

    let response = health_check(State(app.state.clone())).await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.database, "ok");
    assert_eq!(data.payments, "fake");
    Ok(())
}
