use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// A request seen by the fake backend.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl SeenRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

struct Route {
    method: &'static str,
    path_prefix: &'static str,
    responses: Vec<(u16, String)>,
}

/// Loopback HTTP backend answering canned JSON per route.
///
/// Each route replays its responses in order and repeats the last one.
pub struct FakeBackend {
    routes: Vec<Route>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn route(
        mut self,
        method: &'static str,
        path_prefix: &'static str,
        status: u16,
        body: &str,
    ) -> Self {
        if let Some(route) = self
            .routes
            .iter_mut()
            .find(|route| route.method == method && route.path_prefix == path_prefix)
        {
            route.responses.push((status, body.to_string()));
        } else {
            self.routes.push(Route {
                method,
                path_prefix,
                responses: vec![(status, body.to_string())],
            });
        }
        self
    }

    /// Start serving; returns the origin and the request log.
    pub fn start(self) -> (String, Arc<Mutex<Vec<SeenRequest>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());
        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = log.clone();
        let routes = Arc::new(Mutex::new(self.routes));
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    continue;
                };
                let routes = routes.clone();
                let seen = seen.clone();
                thread::spawn(move || handle(stream, &routes, &seen));
            }
        });
        (origin, log)
    }
}

fn handle(stream: TcpStream, routes: &Mutex<Vec<Route>>, seen: &Mutex<Vec<SeenRequest>>) {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();
    let mut length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).is_err() {
            return;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; length];
    if reader.read_exact(&mut body).is_err() {
        return;
    }
    let (status, response_body) = {
        let mut routes = routes.lock().unwrap();
        match routes
            .iter_mut()
            .find(|route| route.method == method && path.starts_with(route.path_prefix))
        {
            Some(route) if route.responses.len() > 1 => route.responses.remove(0),
            Some(route) => route.responses[0].clone(),
            None => (404, r#"{"detail":"Not Found"}"#.to_string()),
        }
    };
    seen.lock().unwrap().push(SeenRequest {
        method,
        path,
        body,
    });
    let response = format!(
        "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response_body}",
        response_body.len()
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
