use super::*;
use carscout::config::SourceConfig;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESULTS_PAGE: &str = r#"
<html><body>
  <div class="relative">
    <div class="m-1">
      <a href="/cars/toyota-corolla-2015">
        <img src="/img/corolla.jpg">
        <p class="text-sm">Toyota Corolla 2015</p>
        <div class="flex flex-col justify-between bg-primary-main">ETB 1,250,000</div>
      </a>
    </div>
  </div>
</body></html>
"#;

fn app_for(sources: Vec<SourceConfig>) -> anyhow::Result<Router> {
    let mut config = get_test_config();
    config.sources = sources;
    config.validate()?;
    let search = SearchService::from_config(&config)?;
    Ok(create_router(AppState::new(search, config)))
}

#[tokio::test]
async fn test_static_source_scrapes_and_extracts() -> anyhow::Result<()> {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cars/search"))
        .and(query_param("q", "toyota corolla"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .expect(1)
        .mount(&site)
        .await;

    let app = app_for(vec![SourceConfig {
        name: "mekina".to_string(),
        display_name: Some("Mekina.net".to_string()),
        strategy: FetchStrategy::Static,
        search_url: Some(format!("{}/cars/search?q={{query}}", site.uri())),
        extractor: Some("mekina".to_string()),
        upstream_url: None,
    }])?;

    let (status, body) = get_json(&app, "/api/cars?query=toyota%20corolla").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "title": "Toyota Corolla 2015",
            "price": "ETB 1,250,000",
            "link": format!("{}/cars/toyota-corolla-2015", site.uri()),
            "location": "Addis Ababa",
            "image": format!("{}/img/corolla.jpg", site.uri()),
        }])
    );

    // served from cache, the mock expects a single hit
    get_json(&app, "/api/cars?query=Toyota%20Corolla").await?;
    Ok(())
}

#[tokio::test]
async fn test_upstream_source_forwards_to_worker() -> anyhow::Result<()> {
    let worker = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cars"))
        .and(query_param("platform", "mekina"))
        .and(query_param("query", "vitz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"title": "Toyota Vitz", "price": "ETB 1,100,000", "link": "https://www.mekina.net/cars/vitz", "location": "", "image": ""}
        ])))
        .mount(&worker)
        .await;

    let app = app_for(vec![SourceConfig {
        name: "mekina".to_string(),
        display_name: None,
        strategy: FetchStrategy::Upstream,
        search_url: None,
        extractor: None,
        upstream_url: Some(format!("{}/api/cars", worker.uri())),
    }])?;

    let (status, body) = get_json(&app, "/api/search?query=vitz&platform=mekina").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["listings"][0]["title"], "Toyota Vitz");
    assert_eq!(body["listings"][0]["location"], "Addis Ababa");
    assert_eq!(body["sources"][0]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn test_failing_worker_surfaces_as_500() -> anyhow::Result<()> {
    let worker = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&worker)
        .await;

    let app = app_for(vec![SourceConfig {
        name: "mekina".to_string(),
        display_name: None,
        strategy: FetchStrategy::Upstream,
        search_url: None,
        extractor: None,
        upstream_url: Some(format!("{}/api/cars", worker.uri())),
    }])?;

    let (status, body) = get_json(&app, "/api/cars?query=vitz").await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to fetch car listings"}));
    Ok(())
}
