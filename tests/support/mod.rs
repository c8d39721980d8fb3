//! Shared fixtures for the integration tests.
//!
//! `MockDaraja` is a throwaway HTTP server speaking just enough of the M-Pesa
//! Daraja API (OAuth, STK push, STK query) for the real client to talk to.
#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use hotspot_billing::config::{DatabaseConfig, MpesaConfig};
use hotspot_billing::database::{DbPool, create_pool, run_migrations};
use serde_json::{Value, json};

pub const CONSUMER_KEY: &str = "test-key";
pub const CONSUMER_SECRET: &str = "test-secret";
pub const ACCESS_TOKEN: &str = "mock-access-token";

/// Fresh migrated in-memory database on a single connection.
pub async fn memory_pool() -> DbPool {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        reset_on_startup: false,
    };
    let pool = create_pool(&config).await.expect("pool");
    run_migrations(&pool, false).await.expect("migrations");
    pool
}

pub fn mpesa_config(base_url: &str) -> MpesaConfig {
    MpesaConfig {
        base_url: base_url.to_string(),
        consumer_key: CONSUMER_KEY.to_string(),
        consumer_secret: CONSUMER_SECRET.to_string(),
        business_shortcode: "174379".to_string(),
        passkey: "test-passkey".to_string(),
        callback_url: "https://portal.example/mpesa/callback".to_string(),
        transaction_type: "CustomerPayBillOnline".to_string(),
        timeout_secs: 5,
    }
}

/// How the mock gateway should answer.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    /// OAuth answers 400 instead of issuing a token.
    pub fail_auth: bool,
    /// STK push answers with a gateway error body.
    pub reject_push: bool,
    /// STK query answers "500.001.1001 the transaction is being processed".
    pub query_pending: bool,
    /// `ResultCode` returned by a completed STK query.
    pub query_result_code: String,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            fail_auth: false,
            reject_push: false,
            query_pending: false,
            query_result_code: "0".to_string(),
        }
    }
}

/// One request as the mock saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

pub struct MockDaraja {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockDaraja {
    pub fn start(behavior: MockBehavior) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        listener.set_nonblocking(true)?;

        let running = Arc::new(AtomicBool::new(true));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let running_clone = running.clone();
        let requests_clone = requests.clone();

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let behavior = behavior.clone();
                        let requests = requests_clone.clone();
                        thread::spawn(move || handle_connection(stream, &behavior, &requests));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.split('?').next() == Some(path))
            .collect()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockDaraja {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Reads one HTTP/1.1 request: headers, then `Content-Length` bytes of body.
fn read_request(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    Some((head, data[header_end..].to_vec()))
}

fn header_value(head: &str, name: &str) -> Option<String> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

fn handle_connection(
    mut stream: TcpStream,
    behavior: &MockBehavior,
    requests: &Mutex<Vec<RecordedRequest>>,
) {
    let Some((head, body)) = read_request(&mut stream) else {
        return;
    };

    let mut request_line = head.lines().next().unwrap_or("").split_whitespace();
    let method = request_line.next().unwrap_or("").to_string();
    let path = request_line.next().unwrap_or("").to_string();
    let authorization = header_value(&head, "authorization");
    let body_json = serde_json::from_slice::<Value>(&body).ok();

    requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        authorization: authorization.clone(),
        body: body_json.clone(),
    });

    let route = path.split('?').next().unwrap_or("");
    let bearer_ok = authorization.as_deref() == Some(&format!("Bearer {ACCESS_TOKEN}"));

    let (status, reply) = match (method.as_str(), route) {
        ("GET", "/oauth/v1/generate") => {
            use base64::Engine;
            let expected = format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD
                    .encode(format!("{CONSUMER_KEY}:{CONSUMER_SECRET}"))
            );
            if behavior.fail_auth || authorization.as_deref() != Some(expected.as_str()) {
                (
                    400,
                    json!({
                        "requestId": "auth-1",
                        "errorCode": "400.008.01",
                        "errorMessage": "Invalid Authentication passed"
                    }),
                )
            } else {
                (200, json!({"access_token": ACCESS_TOKEN, "expires_in": "3599"}))
            }
        }
        ("POST", _) if !bearer_ok => (
            401,
            json!({
                "requestId": "auth-2",
                "errorCode": "404.001.03",
                "errorMessage": "Invalid Access Token"
            }),
        ),
        ("POST", "/mpesa/stkpush/v1/processrequest") => {
            if behavior.reject_push {
                (
                    400,
                    json!({
                        "requestId": "push-1",
                        "errorCode": "400.002.02",
                        "errorMessage": "Bad Request - Invalid PhoneNumber"
                    }),
                )
            } else {
                (
                    200,
                    json!({
                        "MerchantRequestID": "29115-34620561-1",
                        "CheckoutRequestID": "ws_CO_191220191020363925",
                        "ResponseCode": "0",
                        "ResponseDescription": "Success. Request accepted for processing",
                        "CustomerMessage": "Success. Request accepted for processing"
                    }),
                )
            }
        }
        ("POST", "/mpesa/stkpushquery/v1/query") => {
            if behavior.query_pending {
                (
                    500,
                    json!({
                        "requestId": "query-1",
                        "errorCode": "500.001.1001",
                        "errorMessage": "The transaction is being processed"
                    }),
                )
            } else {
                let checkout = body_json
                    .as_ref()
                    .and_then(|b| b["CheckoutRequestID"].as_str())
                    .unwrap_or("")
                    .to_string();
                (
                    200,
                    json!({
                        "ResponseCode": "0",
                        "ResponseDescription": "The service request has been accepted successsfully",
                        "MerchantRequestID": "29115-34620561-1",
                        "CheckoutRequestID": checkout,
                        "ResultCode": behavior.query_result_code,
                        "ResultDesc": "The service request is processed successfully."
                    }),
                )
            }
        }
        _ => (404, json!({"errorMessage": "Endpoint not found"})),
    };

    send_response(&mut stream, status, &reply.to_string());
}

fn send_response(stream: &mut TcpStream, status: u16, body: &str) {
    let status_text = match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {status_text}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
