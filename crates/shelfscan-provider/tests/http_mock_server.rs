use shelfscan_provider::{
    DateExtractor, HttpDateExtractor, HttpProductRecognizer, ProductRecognizer,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_recognize_response() -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "products": [
            {
                "name": "milk",
                "confidence": 0.94,
                "category": "dairy",
                "suggested_expiration_days": 7
            },
            {
                "name": "tomato",
                "confidence": 0.81,
                "category": "vegetables",
                "suggested_expiration_days": 7,
                "barcode": "4011200296908"
            }
        ],
        "processing_time_ms": 612
    })
}

fn mock_extract_response() -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "dates": [
            {
                "date": "2027-03-14",
                "confidence": 0.88,
                "format": "best-before",
                "raw_text": "BEST BEFORE 14.03.2027"
            }
        ],
        "processing_time_ms": 401
    })
}

fn mock_api_error(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "error": {"type": "api_error", "message": message}
    }))
}

#[tokio::test]
async fn recognize_parses_products_and_timing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(
            serde_json::json!({"image_ref": "file:///groceries.jpg"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_recognize_response()))
        .expect(1)
        .mount(&server)
        .await;

    let recognizer = HttpProductRecognizer::new("test-key", server.uri());
    let outcome = recognizer.recognize("file:///groceries.jpg").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.products.len(), 2);
    assert_eq!(outcome.products[0].name, "milk");
    assert_eq!(outcome.products[1].barcode.as_deref(), Some("4011200296908"));
    assert_eq!(outcome.processing_time_ms, 612);
}

#[tokio::test]
async fn extract_parses_dates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/extract-dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_extract_response()))
        .expect(1)
        .mount(&server)
        .await;

    let extractor = HttpDateExtractor::new("test-key", server.uri());
    let outcome = extractor.extract("file:///groceries.jpg").await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.dates.len(), 1);
    assert_eq!(
        outcome.dates[0].date,
        chrono::NaiveDate::from_ymd_opt(2027, 3, 14).unwrap()
    );
    assert_eq!(outcome.dates[0].raw_text, "BEST BEFORE 14.03.2027");
}

#[tokio::test]
async fn rate_limit_surfaces_as_retryable_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .respond_with(mock_api_error(429, "rate limited"))
        .mount(&server)
        .await;

    let recognizer = HttpProductRecognizer::new("test-key", server.uri());
    let err = recognizer
        .recognize("file:///groceries.jpg")
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("[retryable]"), "unexpected error: {msg}");
    assert!(msg.contains("rate limited"));
}

#[tokio::test]
async fn auth_error_is_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/extract-dates"))
        .respond_with(mock_api_error(401, "bad key"))
        .mount(&server)
        .await;

    let extractor = HttpDateExtractor::new("wrong-key", server.uri());
    let err = extractor.extract("file:///groceries.jpg").await.unwrap_err();
    assert!(!err.to_string().contains("[retryable]"));
}

#[tokio::test]
async fn service_reported_failure_is_not_a_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/recognize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "products": [],
            "error": "no products detected"
        })))
        .mount(&server)
        .await;

    let recognizer = HttpProductRecognizer::new("test-key", server.uri());
    let outcome = recognizer.recognize("file:///empty.jpg").await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("no products detected"));
}
