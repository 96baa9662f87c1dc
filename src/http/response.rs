use std::io::{BufReader, Read};

use serde::Serialize;

use crate::errors::{Error, Result};

/// An HTTP response to be sent to a client
#[derive(Debug)]
pub struct Response {
    /// Status code of the response. Optional because that's what httparse returns, but it
    /// shouldn't happen in practice since we control the responses.
    pub status: Option<u16>,
    /// Headers for the response. It is not necessary to add Content-Length to it, this is done
    /// automatically on serialization.
    pub headers: Vec<(String, String)>,
    /// Body of the response. Give an empty string for an empty body
    pub body: String,
}

impl Response {
    /// Creates a response carrying `value` as a JSON body
    pub fn json<T: Serialize>(status: u16, value: &T) -> Result<Response> {
        Ok(Response {
            status: Some(status),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_string(value)?,
        })
    }

    /// Creates an OK (200) response with the given body
    pub fn ok_with_body(str: String) -> Response {
        Response {
            status: Some(200),
            headers: vec![],
            body: str,
        }
    }

    /// Creates an error response with an empty body.
    ///
    /// The code must be in the 4xx or 5xx range.
    pub fn error(code: u16) -> Response {
        assert!((400..600).contains(&code), "Invalid error code");
        Response {
            status: Some(code),
            headers: vec![],
            body: "".to_string(),
        }
    }

}

/// Parse an HTTP response from a byte stream
///
/// Duplicated from the request implementation; httparse's request and
/// response types are distinct so a shared version would need more
/// abstraction than the two copies are worth.
pub fn parse_response<T>(mut buf_reader: BufReader<T>) -> Result<Response>
where
    T: Sized + Read,
{
    let mut buf = [0; 4096];
    let mut bytes = Vec::new();

    let (body_len, parsed_len, mut response) = loop {
        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut resp = httparse::Response::new(&mut headers);
        let bytes_read = buf_reader.read(&mut buf)?;

        if bytes_read == 0 {
            return Err(Error::ConnectionReset);
        }

        bytes.extend_from_slice(&buf[..bytes_read]);

        match resp.parse(&bytes) {
            Ok(httparse::Status::Complete(parsed_len)) => {
                let body_len = resp
                    .headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case("Content-Length"))
                    .and_then(|length| String::from_utf8_lossy(length.value).parse::<usize>().ok())
                    .unwrap_or(0);

                break (
                    body_len,
                    parsed_len,
                    Response {
                        status: resp.code,
                        headers: resp
                            .headers
                            .iter()
                            .map(|h| {
                                (
                                    h.name.to_string(),
                                    String::from_utf8_lossy(h.value).to_string(),
                                )
                            })
                            .collect(),
                        body: "".to_string(),
                    },
                );
            }
            Ok(httparse::Status::Partial) => continue,
            Err(err) => return Err(Error::BadRequest(format!("Malformed response: {}", err))),
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
    response.body = String::from_utf8_lossy(&bytes[parsed_len..parsed_len + body_len]).to_string();

    Ok(response)
}
