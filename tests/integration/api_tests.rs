use super::*;
use serde_json::json;

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubSource::new("mekina", Behaviour::Listings(vec![]))]);

    let (status, body) = get_json(&app, "/health").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "carscout");
    Ok(())
}

#[tokio::test]
async fn test_missing_query_is_rejected() -> anyhow::Result<()> {
    let mekina = StubSource::new("mekina", Behaviour::Listings(sample_listings()));
    let app = create_test_app(vec![mekina.clone()]);

    for uri in ["/api/cars?platform=both", "/api/cars?query=", "/api/cars?query=%20%20"] {
        let (status, body) = get_json(&app, uri).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body, json!({"error": "Query parameter is required"}));
    }
    assert_eq!(mekina.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_cars_returns_plain_listing_array() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubSource::new("mekina", Behaviour::Listings(sample_listings()))]);

    let (status, body) = get_json(&app, "/api/cars?query=toyota&platform=mekina").await?;

    assert_eq!(status, StatusCode::OK);
    let listings = body.as_array().expect("array body");
    assert_eq!(listings.len(), 3);

    // every field present, even when empty
    let first = &listings[0];
    for field in ["title", "price", "link", "location", "image"] {
        assert!(first.get(field).is_some(), "missing {field}");
    }
    assert_eq!(first["location"], "Addis Ababa");
    assert_eq!(listings[1]["location"], "Bahir Dar");
    assert_eq!(listings[1]["image"], "");
    Ok(())
}

#[tokio::test]
async fn test_empty_result_is_empty_array() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubSource::new("mekina", Behaviour::Listings(vec![]))]);

    let (status, body) = get_json(&app, "/api/cars?query=lada").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
    Ok(())
}

#[tokio::test]
async fn test_both_with_unimplemented_jiji() -> anyhow::Result<()> {
    let app = create_test_app(vec![
        StubSource::new("mekina", Behaviour::Listings(sample_listings())),
        StubSource::new("jiji", Behaviour::Unimplemented),
    ]);

    let (status, body) = get_json(&app, "/api/cars?query=toyota&platform=both").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(3));

    let (status, body) = get_json(&app, "/api/search?query=toyota&platform=both").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sources"][0]["status"], "ok");
    assert_eq!(body["sources"][1]["source"], "jiji");
    assert_eq!(body["sources"][1]["status"], "unimplemented");
    Ok(())
}

#[tokio::test]
async fn test_all_sources_failing_is_generic_500() -> anyhow::Result<()> {
    let app = create_test_app(vec![
        StubSource::new("mekina", Behaviour::Fail),
        StubSource::new("jiji", Behaviour::Unimplemented),
    ]);

    let (status, body) = get_json(&app, "/api/cars?query=toyota").await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to fetch car listings"}));
    Ok(())
}

#[tokio::test]
async fn test_unknown_platform_is_rejected() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubSource::new("mekina", Behaviour::Listings(vec![]))]);

    let (status, body) = get_json(&app, "/api/cars?query=toyota&platform=olx").await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Unknown platform: olx"}));
    Ok(())
}

#[tokio::test]
async fn test_invalid_price_filter_is_rejected() -> anyhow::Result<()> {
    let mekina = StubSource::new("mekina", Behaviour::Listings(sample_listings()));
    let app = create_test_app(vec![mekina.clone()]);

    let (status, body) = get_json(&app, "/api/cars?query=toyota&minPrice=cheap").await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid price filter"}));
    assert_eq!(mekina.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_sources_catalogue() -> anyhow::Result<()> {
    let app = create_test_app(vec![
        StubSource::new("mekina", Behaviour::Listings(vec![])),
        StubSource::new("jiji", Behaviour::Unimplemented),
    ]);

    let (status, body) = get_json(&app, "/api/sources").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "mekina");
    assert_eq!(body[1]["strategy"], "unimplemented");
    Ok(())
}
