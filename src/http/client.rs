use std::io::{BufReader, Write};
use std::net::TcpStream;

use crate::errors;
use crate::http::{parse_response, Request, Response};

/// Simple HTTP client
///
/// It sends HTTP requests built with the `Request` constructors, then parses and yields the
/// server response.
pub struct HttpClient {
    stream: TcpStream,
}

impl HttpClient {
    /// Create a new client connected to the given server.
    ///
    /// An error is returned if the connection cannot be made for whatever reason
    pub fn new(server: &str) -> errors::Result<Self> {
        Ok(HttpClient {
            stream: TcpStream::connect(server)?,
        })
    }

    /// Send an HTTP request on the open connection.
    ///
    /// Connection keep-alive is not implemented server side, so drop the client after the
    /// response is retrieved and connect again for the next request.
    pub fn send(&mut self, request: &Request) -> errors::Result<Response> {
        let headers = request
            .headers
            .iter()
            .map(|(k, v)| format!("{}: {}\r\n", k, v))
            .collect::<Vec<_>>()
            .join("");
        self.stream.write_all(
            format! {
                "{} {} HTTP/1.1\r\nContent-Length: {}\r\n{}\r\n{}",
                request.method, request.path, request.body.len(), headers, request.body
            }
            .as_bytes(),
        )?;

        let buf_reader = BufReader::new(&mut self.stream);
        parse_response(buf_reader)
    }
}
