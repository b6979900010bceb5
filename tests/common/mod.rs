//! In-process mock of the Chainquery SQL endpoint.
//!
//! Serves HTTP/1.1 on a loopback port, records every request and answers
//! with a response chosen by a handler closure. Keep-alive connections are
//! served until the client hangs up.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

/// One request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Raw request target, e.g. `/api/sql?query=SELECT+1`
    pub target: String,
    /// Header names are lower-cased
    pub headers: HashMap<String, String>,
    pub received_at: Instant,
}

impl RecordedRequest {
    pub fn path(&self) -> String {
        self.url().path().to_string()
    }

    /// Decoded `query` parameter.
    pub fn sql(&self) -> Option<String> {
        self.url()
            .query_pairs()
            .find(|(name, _)| name == "query")
            .map(|(_, value)| value.into_owned())
    }

    fn url(&self) -> Url {
        Url::parse(&format!("http://mock{}", self.target)).unwrap()
    }
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl MockResponse {
    pub fn ok(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync>;

pub struct MockServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    accept_loop: JoinHandle<()>,
}

impl MockServer {
    /// Server answering every request with the same response.
    pub async fn start(response: MockResponse) -> Self {
        Self::start_with(move |_| response.clone()).await
    }

    /// Server answering each request with `handler(request)`.
    pub async fn start_with<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let recorded = Arc::clone(&requests);
        let accept_loop = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                let handler = Arc::clone(&handler);
                tokio::spawn(serve_connection(stream, recorded, handler));
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
            accept_loop,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    handler: Handler,
) {
    loop {
        let request = match parse_http_request(&mut stream).await {
            Ok(request) => request,
            Err(_) => return,
        };
        recorded.lock().unwrap().push(request.clone());

        let response = handler(&request);
        let bytes = build_http_response(
            response.status,
            &[("Content-Type", "application/json")],
            response.body.as_bytes(),
        );
        if stream.write_all(&bytes).await.is_err() {
            return;
        }
    }
}

/// Reads a CRLF-terminated line.
async fn read_line<S: AsyncRead + Unpin>(stream: &mut S) -> io::Result<String> {
    let mut line = Vec::new();
    let mut buf = [0u8; 1];

    loop {
        stream.read_exact(&mut buf).await?;
        if buf[0] == b'\r' {
            stream.read_exact(&mut buf).await?;
            if buf[0] == b'\n' {
                break;
            }
            line.push(b'\r');
        }
        line.push(buf[0]);
    }

    String::from_utf8(line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Reads the request line and headers. GET requests carry no body.
async fn parse_http_request<S: AsyncRead + Unpin>(stream: &mut S) -> io::Result<RecordedRequest> {
    let request_line = read_line(stream).await?;
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid request line: '{request_line}'"),
        ));
    }

    let mut headers = HashMap::new();
    loop {
        let line = read_line(stream).await?;
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    Ok(RecordedRequest {
        method: parts[0].to_string(),
        target: parts[1].to_string(),
        headers,
        received_at: Instant::now(),
    })
}

fn build_http_response(status: u16, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    };

    let mut response = format!("HTTP/1.1 {status} {reason}\r\n");
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));

    let mut bytes = response.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

/// Envelope body with the given rows.
pub fn envelope(data: &str) -> String {
    format!(r#"{{"Success":true,"Error":"","Data":{data}}}"#)
}
