use axum::http::{header, HeaderMap, Method};

/// The parts of an inbound request a form may look at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub host: Option<String>,
    pub origin: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestInfo {
    pub fn from_parts(method: &Method, path: &str, headers: &HeaderMap) -> Self {
        let header_value = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        Self {
            method: method.as_str().to_string(),
            path: path.to_string(),
            host: header_value(header::HOST),
            origin: header_value(header::ORIGIN),
            user_agent: header_value(header::USER_AGENT),
        }
    }

    pub fn is_submission(&self) -> bool {
        self.method.eq_ignore_ascii_case("POST")
    }
}

/// Posted form values, keeping repeated keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload(Vec<(String, String)>);

impl FormPayload {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl From<Vec<(String, String)>> for FormPayload {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_payload_keeps_repeated_keys() {
        let payload = FormPayload::new(vec![
            ("fc1-topics".to_string(), "a".to_string()),
            ("fc1-name".to_string(), "Ada".to_string()),
            ("fc1-topics".to_string(), "b".to_string()),
        ]);
        assert_eq!(payload.get_all("fc1-topics"), vec!["a", "b"]);
        assert_eq!(payload.get("fc1-name"), Some("Ada"));
        assert!(payload.get_all("missing").is_empty());
    }

    #[test]
    fn test_request_info_from_parts() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("example.com"));
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://example.com"));

        let info = RequestInfo::from_parts(&Method::POST, "/content/3", &headers);
        assert!(info.is_submission());
        assert_eq!(info.host.as_deref(), Some("example.com"));
        assert_eq!(info.origin.as_deref(), Some("https://example.com"));
        assert_eq!(info.user_agent, None);
    }
}
