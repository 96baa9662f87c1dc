pub mod server;
pub use server::*;

pub mod request;
pub use request::*;

pub mod response;
pub use response::*;

pub mod client;
pub use client::*;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_simple_http_request() {
        // It may fail if started several times in a row since the OS may take some time
        // to make the port available again (or if it is already in use by something else).
        static ADDR: &str = "127.0.0.1:18422";

        let handle = std::thread::spawn(|| {
            eprintln!("Listening on {}", ADDR);
            let server = HttpServer::new(ADDR);
            match server {
                Ok(s) => s.serve_once(|req| {
                    assert_eq!(req.header_value("X-Username"), Some("zoe"));
                    Response::ok_with_body(format!("{{\"path\":\"{}\"}}", req.path))
                }),
                Err(err) => eprintln!("Failed to spawn server: {}", err),
            }
        });

        let mut client = (|| {
            for _ in 1..10 {
                match HttpClient::new(ADDR) {
                    Ok(c) => return Some(c),
                    Err(err) => {
                        eprintln!("Trying to connect to {}: {}", ADDR, err);
                        std::thread::sleep(std::time::Duration::from_millis(10));
                    }
                }
            }
            None
        })()
        .expect("Failed to connect client");

        let request = Request::post("/menu", "{\"dish_id\": 1}".to_string())
            .with_header("X-Username", "zoe");
        let resp = client
            .send(&request)
            .expect("Failed to communicate with server");

        assert_eq!(resp.status.unwrap(), 200);
        assert_eq!(resp.body, "{\"path\":\"/menu\"}");

        handle.join().unwrap();
    }
}
