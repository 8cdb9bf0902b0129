use mockito::Matcher;
use parley_tools::{ToolHandler, WeatherTool};

#[tokio::test]
async fn test_forecast_queries_open_meteo() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/forecast")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("latitude".into(), "52.52".into()),
            Matcher::UrlEncoded("longitude".into(), "13.41".into()),
            Matcher::UrlEncoded("current".into(), "temperature_2m".into()),
            Matcher::UrlEncoded("timezone".into(), "auto".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"current":{"temperature_2m":21.5},"current_units":{"temperature_2m":"°C"}}"#)
        .create_async()
        .await;

    let tool = WeatherTool::new(server.url());
    let forecast = tool.forecast(52.52, 13.41).await.unwrap();

    mock.assert_async().await;
    assert_eq!(forecast["current"]["temperature_2m"], 21.5);
}

#[tokio::test]
async fn test_upstream_failure_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/forecast")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let err = WeatherTool::new(server.url())
        .forecast(0.0, 0.0)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_out_of_range_coordinates_rejected_without_request() {
    let tool = WeatherTool::new("http://127.0.0.1:9");
    assert!(tool.forecast(91.0, 0.0).await.is_err());
    assert!(tool.forecast(0.0, -181.0).await.is_err());
}

#[test]
fn test_schema_requires_coordinates() {
    let tool = WeatherTool::default();
    let def = tool.definition();
    assert_eq!(def.name(), "get_weather");
    assert_eq!(
        def.function.parameters["required"],
        serde_json::json!(["latitude", "longitude"])
    );
}
