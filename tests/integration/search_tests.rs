use super::*;

#[tokio::test]
async fn test_repeated_query_scrapes_once() -> anyhow::Result<()> {
    let mekina = StubSource::new("mekina", Behaviour::Listings(sample_listings()));
    let jiji = StubSource::new("jiji", Behaviour::Unimplemented);
    let app = create_test_app(vec![mekina.clone(), jiji.clone()]);

    let (_, first) = get_json(&app, "/api/cars?query=Toyota&platform=both").await?;
    let (_, second) = get_json(&app, "/api/cars?query=toyota%20&platform=both").await?;

    assert_eq!(first, second);
    assert_eq!(mekina.calls(), 1);
    assert_eq!(jiji.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_identical_requests_share_one_scrape() -> anyhow::Result<()> {
    let mekina = StubSource::slow(
        "mekina",
        Behaviour::Listings(sample_listings()),
        Duration::from_millis(100),
    );
    let app = create_test_app(vec![mekina.clone()]);

    let requests = (0..10).map(|_| get_json(&app, "/api/cars?query=corolla"));
    let responses = futures::future::try_join_all(requests).await?;

    assert!(responses.iter().all(|(status, _)| *status == StatusCode::OK));
    assert_eq!(mekina.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_detailed_search_reports_cache_state() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubSource::new("mekina", Behaviour::Listings(sample_listings()))]);

    let (status, first) = get_json(&app, "/api/search?query=corolla").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["query"], "corolla");
    assert_eq!(first["cached"], false);
    assert_eq!(first["sources"][0]["count"], 3);
    assert!(first["fetched_at"].is_string());

    let (_, second) = get_json(&app, "/api/search?query=corolla").await?;
    assert_eq!(second["cached"], true);
    assert_eq!(second["fetched_at"], first["fetched_at"]);
    Ok(())
}

#[tokio::test]
async fn test_partial_failure_only_rescrapes_failed_source() -> anyhow::Result<()> {
    let mekina = StubSource::new("mekina", Behaviour::Fail);
    let jiji = StubSource::new("jiji", Behaviour::Listings(sample_listings()));
    let app = create_test_app(vec![mekina.clone(), jiji.clone()]);

    let (status, body) = get_json(&app, "/api/search?query=toyota").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sources"][0]["status"], "failed");
    assert!(body["sources"][0]["error"].is_string());
    assert_eq!(body["listings"].as_array().map(Vec::len), Some(3));

    let (status, body) = get_json(&app, "/api/cars?query=toyota").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(3));
    assert_eq!(mekina.calls(), 2);
    assert_eq!(jiji.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_brand_filter() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubSource::new("mekina", Behaviour::Listings(sample_listings()))]);

    let (_, body) = get_json(&app, "/api/cars?query=car&brand=Toyota").await?;
    let titles: Vec<&str> = body
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|l| l["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Toyota Corolla 2015", "Toyota Hilux"]);

    // case-sensitive
    let (_, body) = get_json(&app, "/api/cars?query=car&brand=toyota").await?;
    assert_eq!(body.as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn test_price_filter_drops_unpriced_listings() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubSource::new("mekina", Behaviour::Listings(sample_listings()))]);

    let (_, body) = get_json(&app, "/api/cars?query=car&minPrice=400000").await?;
    let listings = body.as_array().cloned().unwrap_or_default();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["title"], "Toyota Corolla 2015");

    let (_, body) = get_json(&app, "/api/cars?query=car&maxPrice=1000000").await?;
    // "Call for price" is gone once a bound is active
    assert_eq!(body.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_location_filter_sees_default_location() -> anyhow::Result<()> {
    let app = create_test_app(vec![StubSource::new("mekina", Behaviour::Listings(sample_listings()))]);

    let (_, body) = get_json(&app, "/api/cars?query=car&location=addis").await?;
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (_, body) = get_json(&app, "/api/cars?query=car&location=BAHIR").await?;
    assert_eq!(body[0]["title"], "Honda Civic 2012");
    Ok(())
}

#[tokio::test]
async fn test_filters_do_not_change_cache_key() -> anyhow::Result<()> {
    let mekina = StubSource::new("mekina", Behaviour::Listings(sample_listings()));
    let app = create_test_app(vec![mekina.clone()]);

    get_json(&app, "/api/cars?query=car").await?;
    get_json(&app, "/api/cars?query=car&brand=Honda").await?;
    get_json(&app, "/api/cars?query=car&minPrice=1&maxPrice=2").await?;

    assert_eq!(mekina.calls(), 1);
    Ok(())
}
