use std::io::{BufReader, Read};

use crate::errors::{Error, Result};

/// An HTTP request, parsed or about to be sent.
#[derive(Debug)]
pub struct Request {
    /// The HTTP method used in the request
    pub method: String,
    /// The full path of the request
    pub path: String,
    /// Headers of the request
    pub headers: Vec<(String, String)>,
    /// Body of the request
    pub body: String,
}

impl Request {
    /// Create a new request from scratch
    pub fn new(method: &str, path: &str, headers: Vec<(String, String)>, body: String) -> Request {
        Request {
            method: method.to_string(),
            path: path.to_string(),
            headers,
            body,
        }
    }

    /// Create a new GET request for the given path, with an empty body
    pub fn get(path: &str) -> Request {
        Request::new("GET", path, vec![], String::new())
    }

    /// Create a new POST request for the given path, with the given body
    pub fn post(path: &str, body: String) -> Request {
        Request::new("POST", path, vec![], body)
    }

    /// Create a new PUT request for the given path, with the given body
    pub fn put(path: &str, body: String) -> Request {
        Request::new("PUT", path, vec![], body)
    }

    /// Attach a header, builder style
    pub fn with_header(mut self, name: &str, value: &str) -> Request {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// The value of the first header with this name. Header names compare
    /// case-insensitively, as HTTP requires.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Parse an HTTP request from a byte stream.
///
/// Reads until the header section is complete, then keeps reading until
/// Content-Length bytes of body have arrived. Anything a client pipelines
/// after that is dropped with the reader, which HTTP/1.1 permits since the
/// next request is not supposed to be sent before our response.
pub fn parse_request<T>(mut buf_reader: BufReader<T>) -> Result<Request>
where
    T: Sized + Read,
{
    let mut buf = [0; 4096];
    let mut bytes = Vec::new();

    let (body_len, parsed_len, mut request) = loop {
        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut req = httparse::Request::new(&mut headers);
        let bytes_read = buf_reader.read(&mut buf)?;

        if bytes_read == 0 {
            return Err(Error::ConnectionReset);
        }

        bytes.extend_from_slice(&buf[..bytes_read]);

        match req.parse(&bytes) {
            Ok(httparse::Status::Complete(parsed_len)) => {
                let body_len = req
                    .headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case("Content-Length"))
                    .and_then(|length| String::from_utf8_lossy(length.value).parse::<usize>().ok())
                    .unwrap_or(0);

                break (
                    body_len,
                    parsed_len,
                    Request {
                        method: req.method.unwrap_or("GET").to_string(),
                        path: req.path.unwrap_or("/").to_string(),
                        headers: req
                            .headers
                            .iter()
                            .map(|h| {
                                (
                                    h.name.to_string(),
                                    String::from_utf8_lossy(h.value).to_string(),
                                )
                            })
                            .collect(),
                        body: String::new(),
                    },
                );
            }
            Ok(httparse::Status::Partial) => continue,
            Err(err) => return Err(Error::BadRequest(format!("Malformed request: {}", err))),
        }
    };

    while body_len > bytes.len() - parsed_len {
        let bytes_read = buf_reader.read(&mut buf)?;
        if bytes_read == 0 {
            return Err(Error::ConnectionReset);
        }

        bytes.extend_from_slice(&buf[..bytes_read]);
    }
    // Content-Length and the httparse offset both count raw bytes, so the
    // slicing has to happen on bytes; only the body slice gets decoded.
    request.body = String::from_utf8_lossy(&bytes[parsed_len..parsed_len + body_len]).to_string();

    Ok(request)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_parse_simple_request() {
        let req_str = b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: curl/7.68.0\r\nAccept: */*\r\n\r\n";
        let buf_reader = BufReader::new(&req_str[..]);

        let parsed_req = parse_request(buf_reader).unwrap();

        assert_eq!(parsed_req.method, "GET");
        assert_eq!(parsed_req.path, "/");
        assert_eq!(parsed_req.headers.len(), 3);
        assert_eq!(parsed_req.body, "");
    }

    #[test]
    fn test_parse_incomplete_request() {
        let req_str =
            b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: curl/7.68.0\r\nAccept: */*";
        let buf_reader = BufReader::new(&req_str[..]);

        let parsed_req = parse_request(buf_reader);

        assert!(parsed_req.is_err());
    }

    #[test]
    fn test_parse_request_with_body() {
        let body = "{ \"dish_id\": 3, \"customizations\": \"no onions\" }";
        let req_str = format!(
            "POST / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: curl/7.68.0\r\nAccept: */*\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );

        let buf_reader = BufReader::new(req_str.as_bytes());

        let parsed_req = parse_request(buf_reader).unwrap();

        assert_eq!(parsed_req.method, "POST");
        assert_eq!(parsed_req.path, "/");
        assert_eq!(parsed_req.headers.len(), 4);
        assert_eq!(parsed_req.body, body);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req_str =
            b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nx-username: zoe\r\n\r\n";
        let buf_reader = BufReader::new(&req_str[..]);

        let parsed_req = parse_request(buf_reader).unwrap();

        assert_eq!(parsed_req.header_value("X-Username"), Some("zoe"));
        assert_eq!(parsed_req.header_value("X-USERNAME"), Some("zoe"));
        assert_eq!(parsed_req.header_value("X-Missing"), None);
    }

    #[test]
    fn test_parse_request_with_non_utf8_body() {
        // Content-Length counts raw bytes, whatever encoding they are in.
        let mut req_bytes =
            b"POST /menus HTTP/1.1\r\nHost: localhost:8080\r\nContent-Length: 4\r\n\r\n".to_vec();
        req_bytes.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);

        let buf_reader = BufReader::new(&req_bytes[..]);
        let parsed_req = parse_request(buf_reader).unwrap();

        assert_eq!(parsed_req.method, "POST");
        assert_eq!(parsed_req.body, "\u{FFFD}".repeat(4));
    }

    #[test]
    fn test_parse_request_with_length_splitting_a_character() {
        // "é" is two bytes, so a length of 2 takes "n" plus half of it.
        let req_str = "POST / HTTP/1.1\r\nHost: localhost:8080\r\nContent-Length: 2\r\n\r\nné";
        let buf_reader = BufReader::new(req_str.as_bytes());

        let parsed_req = parse_request(buf_reader).unwrap();

        assert_eq!(parsed_req.body, "n\u{FFFD}");
    }

    #[test]
    fn test_parse_request_with_large_header() {
        let mut rng = rand::thread_rng();
        let mut buffer = [0; 4096];
        for c in buffer.iter_mut() {
            *c = rng.gen_range(b'a'..=b'z')
        }
        let x_test_header = String::from_utf8_lossy(&buffer);

        let req_str = format!(
            "GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: curl/7.68.0\r\nAccept: */*\r\nX-Test: {}\r\n\r\n",
            x_test_header
        );

        let buf_reader = BufReader::new(req_str.as_bytes());
        let parsed_req = parse_request(buf_reader).unwrap();

        assert_eq!(parsed_req.method, "GET");
        assert_eq!(parsed_req.path, "/");
        assert_eq!(parsed_req.headers.len(), 4);
        assert_eq!(parsed_req.header_value("X-Test"), Some(x_test_header.as_ref()));
    }

    #[test]
    fn test_parse_request_with_large_body() {
        let mut rng = rand::thread_rng();
        let mut buffer = [0; 4096];
        for c in buffer.iter_mut() {
            *c = rng.gen_range(b'a'..=b'z')
        }
        let body = String::from_utf8_lossy(&buffer);

        let req_str = format!(
            "GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: curl/7.68.0\r\nAccept: */*\r\nContent-Length: {}\r\n\r\n{}",
            buffer.len(),
            body
        );

        let buf_reader = BufReader::new(req_str.as_bytes());
        let parsed_req = parse_request(buf_reader).unwrap();

        assert_eq!(parsed_req.method, "GET");
        assert_eq!(parsed_req.path, "/");
        assert_eq!(parsed_req.headers.len(), 4);
        assert_eq!(parsed_req.body, body);
    }

    #[test]
    fn test_parse_request_with_very_large_body_and_header() {
        let mut rng = rand::thread_rng();
        let mut buffer = [0; 40960];
        for c in buffer.iter_mut() {
            *c = rng.gen_range(b'a'..=b'z')
        }
        let body = String::from_utf8_lossy(&buffer);
        let mut buffer = [0; 40960];
        for c in buffer.iter_mut() {
            *c = rng.gen_range(b'a'..=b'z')
        }
        let x_test_header = String::from_utf8_lossy(&buffer);

        let req_str = format!(
            "GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: curl/7.68.0\r\nAccept: */*\r\nContent-Length: {}\r\nX-TEST: {}\r\n\r\n{}",
            buffer.len(),
            x_test_header,
            body
        );

        let buf_reader = BufReader::new(req_str.as_bytes());
        let parsed_req = parse_request(buf_reader).unwrap();

        assert_eq!(parsed_req.method, "GET");
        assert_eq!(parsed_req.path, "/");
        assert_eq!(parsed_req.headers.len(), 5);
        assert_eq!(parsed_req.body, body);
        assert_eq!(parsed_req.header_value("x-test"), Some(x_test_header.as_ref()));
    }
}
