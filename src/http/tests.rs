use super::*;
use serde::Deserialize;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

#[derive(Debug, Deserialize)]
struct Echo {
    value: String,
}

fn server_url(server: &MockServer) -> Url {
    Url::parse(&server.uri()).expect("mock server uri is valid")
}

#[test]
fn endpoint_keeps_base_path() {
    let base = Url::parse("https://gateway.example.com/openai").expect("valid url");
    let url = endpoint(&base, "/v1/embeddings").expect("should build endpoint");
    assert_eq!(url.as_str(), "https://gateway.example.com/openai/v1/embeddings");

    let base = Url::parse("http://localhost:11434").expect("valid url");
    let url = endpoint(&base, "/api/chat").expect("should build endpoint");
    assert_eq!(url.as_str(), "http://localhost:11434/api/chat");
}

#[tokio::test(flavor = "multi_thread")]
async fn post_json_sends_body_and_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_json(json!({"question": "hola"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let agent = build_agent(Duration::from_secs(5));
    let url = endpoint(&server_url(&server), "/echo").expect("should build endpoint");

    let echo: Echo = post_json(&agent, &url, Some("sk-test"), &json!({"question": "hola"}))
        .expect("request should succeed");
    assert_eq!(echo.value, "ok");
}

#[tokio::test(flavor = "multi_thread")]
async fn status_codes_are_classified() {
    let server = MockServer::start().await;
    for (route, status) in [("/unauthorized", 401), ("/forbidden", 403), ("/limited", 429), ("/broken", 503)] {
        Mock::given(method("POST"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
    }

    let agent = build_agent(Duration::from_secs(5));
    let base = server_url(&server);
    let call = |route: &str| {
        let url = endpoint(&base, route).expect("should build endpoint");
        post_json::<_, Echo>(&agent, &url, None, &json!({}))
    };

    assert!(matches!(call("/unauthorized"), Err(ServiceError::Unauthorized(401))));
    assert!(matches!(call("/forbidden"), Err(ServiceError::Unauthorized(403))));
    assert!(matches!(call("/limited"), Err(ServiceError::RateLimited)));
    assert!(matches!(call("/broken"), Err(ServiceError::Status(503))));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_json_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let agent = build_agent(Duration::from_secs(5));
    let url = endpoint(&server_url(&server), "/echo").expect("should build endpoint");

    let result: Result<Echo, _> = post_json(&agent, &url, None, &json!({}));
    assert!(matches!(result, Err(ServiceError::MalformedResponse(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let agent = build_agent(Duration::from_millis(200));
    let url = endpoint(&server_url(&server), "/slow").expect("should build endpoint");

    assert!(matches!(get_text(&agent, &url, None), Err(ServiceError::Timeout)));
}

#[test]
fn unreachable_service_is_a_transport_error() {
    let agent = build_agent(Duration::from_secs(2));
    let url = Url::parse("http://127.0.0.1:1/api/tags").expect("valid url");

    let result = get_text(&agent, &url, None);
    assert!(
        matches!(result, Err(ServiceError::Transport(_)) | Err(ServiceError::Timeout)),
        "unexpected result: {:?}",
        result
    );
}
