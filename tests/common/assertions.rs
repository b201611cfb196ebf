//! Assertion helpers for tests.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use super::app::TestResponse;

/// Assert response has expected status code
pub fn assert_status(response: &TestResponse, expected: StatusCode) {
    assert_eq!(
        response.status,
        expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        response.status,
        response.text()
    );
}

/// Assert response is OK (200)
pub fn assert_ok(response: &TestResponse) {
    assert_status(response, StatusCode::OK);
}

/// Assert a JSON error response with the given status and message
pub fn assert_error(response: &TestResponse, expected: StatusCode, message: &str) {
    assert_status(response, expected);
    let json: serde_json::Value = response.json();
    assert_eq!(json["success"], false, "Expected success=false");
    assert_eq!(
        json["error"].as_str(),
        Some(message),
        "Unexpected error message. Full response: {}",
        serde_json::to_string_pretty(&json).unwrap()
    );
    assert_eq!(json["message"], json["error"]);
}

/// Assert a plain-text response
pub fn assert_text(response: &TestResponse, expected: StatusCode, text: &str) {
    assert_status(response, expected);
    assert_eq!(response.text(), text);
}
