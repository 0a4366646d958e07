// Common test utilities for integration tests
// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use palaver::events::AppEvent;
use palaver::{ApiError, ChatApi, ChatController, Contact, CurrentUser, Message, TokenStore};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

//------------------------------------------------------------------------------
// MOCK API
//------------------------------------------------------------------------------

/// One recorded call against [`MockApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login(String),
    Signup(String),
    CurrentUser(String),
    Contacts(String),
    AddContact(String),
    Messages(i64),
    Send { receiver: String, content: String },
}

fn rejected(status: u16, detail: &str) -> ApiError {
    ApiError::Rejected {
        status,
        detail: detail.to_string(),
    }
}

/// In-memory [`ChatApi`]. Alice (id 1) is signed in; bob (2) and carol (3) are contacts.
pub struct MockApi {
    calls: Mutex<Vec<Call>>,
    pub user: CurrentUser,
    pub contacts: Mutex<Vec<Contact>>,
    pub conversations: Mutex<HashMap<i64, Vec<Message>>>,
    /// Artificial latency per conversation fetch
    pub message_delays: Mutex<HashMap<i64, Duration>>,
    pub valid_password: String,
    pub reject_user: Mutex<bool>,
    pub fail_contacts: Mutex<bool>,
    pub fail_send: Mutex<bool>,
    pub fail_signup: Mutex<Option<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        let mut conversations = HashMap::new();
        conversations.insert(
            2,
            vec![
                message(1, "hi bob", "2024-03-05T14:07:09"),
                message(2, "hi alice", "2024-03-05T14:08:00"),
            ],
        );
        conversations.insert(3, vec![message(3, "carol here", "2024-03-05T15:00:00")]);

        MockApi {
            calls: Mutex::new(Vec::new()),
            user: CurrentUser {
                id: 1,
                username: "alice".to_string(),
                about: None,
                profile_picture: None,
            },
            contacts: Mutex::new(vec![contact(2, "bob"), contact(3, "carol")]),
            conversations: Mutex::new(conversations),
            message_delays: Mutex::new(HashMap::new()),
            valid_password: "s3cret".to_string(),
            reject_user: Mutex::new(false),
            fail_contacts: Mutex::new(false),
            fail_send: Mutex::new(false),
            fail_signup: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn message_fetches(&self, contact_id: i64) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == Call::Messages(contact_id))
            .count()
    }

    pub fn sends(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Send { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatApi for MockApi {
    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        self.record(Call::Login(username.to_string()));
        if username == self.user.username && password == self.valid_password {
            Ok(format!("token-for-{}", username))
        } else {
            Err(rejected(401, "Invalid credentials"))
        }
    }

    async fn signup(&self, username: &str, _password: &str) -> Result<(), ApiError> {
        self.record(Call::Signup(username.to_string()));
        match self.fail_signup.lock().unwrap().clone() {
            Some(detail) => Err(rejected(400, &detail)),
            None => Ok(()),
        }
    }

    async fn current_user(&self, token: &str) -> Result<CurrentUser, ApiError> {
        self.record(Call::CurrentUser(token.to_string()));
        if *self.reject_user.lock().unwrap() {
            return Err(rejected(401, "Could not validate credentials"));
        }
        Ok(self.user.clone())
    }

    async fn contacts(&self, token: &str) -> Result<Vec<Contact>, ApiError> {
        self.record(Call::Contacts(token.to_string()));
        if *self.fail_contacts.lock().unwrap() {
            return Err(rejected(500, "Internal Server Error"));
        }
        Ok(self.contacts.lock().unwrap().clone())
    }

    async fn add_contact(&self, _token: &str, username: &str) -> Result<(), ApiError> {
        self.record(Call::AddContact(username.to_string()));
        let mut contacts = self.contacts.lock().unwrap();
        if username == self.user.username || username == "ghost" {
            return Err(rejected(404, "User not found"));
        }
        if contacts.iter().any(|c| c.username == username) {
            return Err(rejected(400, "Contact already added"));
        }
        let id = contacts.iter().map(|c| c.id).max().unwrap_or(1) + 1;
        contacts.push(contact(id, username));
        Ok(())
    }

    async fn messages(&self, _token: &str, contact_id: i64) -> Result<Vec<Message>, ApiError> {
        self.record(Call::Messages(contact_id));
        let delay = self.message_delays.lock().unwrap().get(&contact_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .get(&contact_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(
        &self,
        _token: &str,
        receiver_username: &str,
        content: &str,
    ) -> Result<(), ApiError> {
        self.record(Call::Send {
            receiver: receiver_username.to_string(),
            content: content.to_string(),
        });
        if *self.fail_send.lock().unwrap() {
            return Err(rejected(404, "Receiver not found"));
        }
        let receiver_id = self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.username == receiver_username)
            .map(|c| c.id);
        if let Some(id) = receiver_id {
            self.conversations
                .lock()
                .unwrap()
                .entry(id)
                .or_default()
                .push(message(self.user.id, content, "2024-03-05T16:00:00"));
        }
        Ok(())
    }
}

pub fn contact(id: i64, username: &str) -> Contact {
    Contact {
        id,
        username: username.to_string(),
        last_message: Some("...".to_string()),
    }
}

pub fn message(sender_id: i64, content: &str, timestamp: &str) -> Message {
    Message {
        id: None,
        sender_id,
        content: content.to_string(),
        timestamp: timestamp.to_string(),
    }
}

/// A controller over `api` whose session file lives in `dir`.
pub fn controller_with(
    api: Arc<MockApi>,
    dir: &std::path::Path,
) -> (ChatController, mpsc::Receiver<AppEvent>, TokenStore) {
    let store = TokenStore::in_dir(dir);
    let (controller, rx) = ChatController::new(api, store.clone(), Duration::from_millis(3000));
    (controller, rx, store)
}

/// Waits for the next `MessagesLoaded` and applies it, handling any ticks on the way.
pub async fn apply_next_messages(controller: &mut ChatController, rx: &mut mpsc::Receiver<AppEvent>) {
    loop {
        let event = rx.recv().await.expect("event channel closed");
        let done = matches!(event, AppEvent::MessagesLoaded { .. });
        controller.handle_event(event);
        if done {
            return;
        }
    }
}

//------------------------------------------------------------------------------
// FAKE HTTP SERVER
//------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// Serves one request per connection; `route` maps a request to `(status, body)`.
pub struct FakeServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl FakeServer {
    pub async fn start<F>(route: F) -> FakeServer
    where
        F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let route = Arc::new(route);

        let recorded = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let route = Arc::clone(&route);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let Some(request) = read_request(&mut socket).await else {
                        return;
                    };
                    let (status, body) = route(&request);
                    recorded.lock().unwrap().push(request);

                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        reason(status),
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        FakeServer {
            base_url: format!("http://{}", addr),
            requests,
            task,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.parse().unwrap_or(0),
                "authorization" => authorization = Some(value.to_string()),
                _ => {}
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        method,
        path,
        authorization,
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    })
}
