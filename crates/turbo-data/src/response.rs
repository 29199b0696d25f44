//! HTTP response handling.

use crate::FetchError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// An HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code.
    pub status: u16,
    /// The response headers.
    pub headers: HashMap<String, String>,
    /// The response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Create a new response.
    pub fn new(status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response was a client error (4xx status).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response was a server error (5xx status).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Get the response body as text.
    pub fn text(&self) -> Result<String, FetchError> {
        String::from_utf8(self.body.clone())
            .map_err(|e| FetchError::ParseError(format!("Invalid UTF-8: {}", e)))
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body).map_err(|e| FetchError::ParseError(e.to_string()))
    }

    /// Get the raw response body.
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Get a header value.
    pub fn header(&self, key: &str) -> Option<&str> {
        // Case-insensitive header lookup
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Convert to a Result, returning an error for non-2xx status codes.
    ///
    /// The error message is the response body, so structured error payloads
    /// survive for the caller to parse.
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            let message = self.text().unwrap_or_else(|_| "Unknown error".to_string());
            Err(FetchError::HttpError {
                status: self.status,
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_response(status: u16, body: &[u8]) -> Response {
        Response::new(status, HashMap::new(), body.to_vec())
    }

    #[test]
    fn test_status_classes() {
        assert!(make_response(201, b"").is_success());
        assert!(make_response(409, b"").is_client_error());
        assert!(make_response(502, b"").is_server_error());
        assert!(!make_response(302, b"").is_success());
    }

    #[test]
    fn test_json_body() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Totals {
            total_price: String,
        }

        let resp = make_response(200, br#"{"total_price": "20000"}"#);
        let totals: Totals = resp.json().unwrap();
        assert_eq!(totals.total_price, "20000");
        assert!(make_response(200, b"<html>").json::<Totals>().is_err());
    }

    #[test]
    fn test_header_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("Cart-Token".to_string(), "abc".to_string());
        let resp = Response::new(200, headers, Vec::new());
        assert_eq!(resp.header("cart-token"), Some("abc"));
        assert_eq!(resp.header("nonce"), None);
    }

    #[test]
    fn test_error_for_status_keeps_body() {
        let resp = make_response(400, br#"{"code":"invalid_product"}"#);
        match resp.error_for_status() {
            Err(FetchError::HttpError { status, message }) => {
                assert_eq!(status, 400);
                assert!(message.contains("invalid_product"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(make_response(204, b"").error_for_status().is_ok());
    }
}
