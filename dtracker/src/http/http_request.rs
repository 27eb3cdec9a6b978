use std::collections::HashMap;

use super::http_method::HttpMethod;

#[derive(Debug)]
pub enum HttpRequestError {
    MalformedRequestLine,
    UnknownMethod,
    MalformedHeaders,
}

/// A parsed HTTP/1.1 request: request line, query parameters (for GET),
/// headers, and whatever body bytes followed the header block.
///
/// Grounded on `tracker.py`'s hand-rolled query-string and multipart
/// parsing, since the tracker accepts exactly the requests dtorrent's
/// `tracker_client` sends and nothing else.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub endpoint: String,
    pub params: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Parses the header block of a request (everything up to `\r\n\r\n`),
    /// leaving the body empty. The caller reads `Content-Length` more bytes
    /// and appends them before the body is used.
    pub fn parse_head(raw: &[u8]) -> Result<Self, HttpRequestError> {
        let text = String::from_utf8_lossy(raw);
        let mut lines = text.split("\r\n");

        let request_line = lines.next().ok_or(HttpRequestError::MalformedRequestLine)?;
        let mut parts = request_line.split_whitespace();
        let method_str = parts.next().ok_or(HttpRequestError::MalformedRequestLine)?;
        let target = parts.next().ok_or(HttpRequestError::MalformedRequestLine)?;

        let method = method_str
            .parse::<HttpMethod>()
            .map_err(|_| HttpRequestError::UnknownMethod)?;

        let (endpoint, query) = match target.split_once('?') {
            Some((endpoint, query)) => (endpoint.to_string(), query.to_string()),
            None => (target.to_string(), String::new()),
        };
        let params = parse_query_string(&query);

        let mut headers = HashMap::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or(HttpRequestError::MalformedHeaders)?;
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }

        Ok(Self {
            method,
            endpoint,
            params,
            headers,
            body: Vec::new(),
        })
    }

    pub fn content_length(&self) -> usize {
        self.headers
            .get("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(|s| s.as_str())
    }
}

fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_head_get_with_query_params() {
        let raw = b"GET /announce?info_hash=abc&port=6881 HTTP/1.1\r\nHost: x\r\n\r\n";
        let request = HttpRequest::parse_head(raw).unwrap();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.endpoint, "/announce");
        assert_eq!(request.params.get("info_hash").unwrap(), "abc");
        assert_eq!(request.params.get("port").unwrap(), "6881");
    }

    #[test]
    fn test_parse_head_post_reads_content_length() {
        let raw = b"POST /announce HTTP/1.1\r\nContent-Type: multipart/form-data; boundary=xyz\r\nContent-Length: 42\r\n\r\n";
        let request = HttpRequest::parse_head(raw).unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.content_length(), 42);
        assert!(request.content_type().unwrap().contains("xyz"));
    }
}
