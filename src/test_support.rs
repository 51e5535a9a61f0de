//! In-process stand-ins for the bridge's collaborators (ledger API, metadata
//! service, MQTT broker) used by the unit and end-to-end tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One request captured by a [`MockServer`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: String,
    delay: Duration,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

/// HTTP server answering every request with a fixed status and body.
pub struct MockServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockServer {
    pub async fn start(status: StatusCode, body: &str) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    pub async fn start_with_delay(status: StatusCode, body: &str, delay: Duration) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status,
            body: body.to_string(),
            delay,
            requests: requests.clone(),
        };
        let app = Router::new().fallback(capture).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn capture(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(CapturedRequest {
        method,
        path: uri.path().to_string(),
        content_type,
        body,
    });
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, state.body.clone())
}

/// Accepts TCP connections and never writes a byte back.
pub async fn start_silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("http://{addr}")
}

/// URL of a local port with nothing listening on it.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// MQTT 3.1.1 control packet types, as found in the high nibble of the
/// fixed header.
pub mod packet {
    pub const CONNECT: u8 = 1;
    pub const PUBLISH: u8 = 3;
    pub const SUBSCRIBE: u8 = 8;
    pub const PINGREQ: u8 = 12;
    pub const DISCONNECT: u8 = 14;
}

/// One control packet read by a [`FakeBroker`].
#[derive(Debug, Clone)]
pub struct MqttFrame {
    pub header: u8,
    pub body: Vec<u8>,
}

impl MqttFrame {
    pub fn kind(&self) -> u8 {
        self.header >> 4
    }

    pub fn qos(&self) -> u8 {
        (self.header >> 1) & 0x03
    }

    /// Topic and payload of a PUBLISH.
    pub fn publish_parts(&self) -> (String, Vec<u8>) {
        let topic_len = u16::from_be_bytes([self.body[0], self.body[1]]) as usize;
        let topic = String::from_utf8_lossy(&self.body[2..2 + topic_len]).into_owned();
        let mut offset = 2 + topic_len;
        if self.qos() > 0 {
            offset += 2;
        }
        (topic, self.body[offset..].to_vec())
    }

    fn packet_id(&self, at: usize) -> [u8; 2] {
        [self.body[at], self.body[at + 1]]
    }
}

/// Single-session MQTT broker speaking just enough of the protocol for the
/// adapter: it acknowledges CONNECT, SUBSCRIBE, QoS 1 PUBLISH and PINGREQ,
/// and pushes a fixed list of QoS 0 messages after the first SUBACK.
///
/// With `hang_up` set the socket is closed right after those messages,
/// which the client sees as the broker going away.
pub struct FakeBroker {
    pub uri: String,
    frames: Arc<Mutex<Vec<MqttFrame>>>,
    connections: Arc<AtomicUsize>,
}

impl FakeBroker {
    pub async fn start(messages: &[(&str, &str)], hang_up: bool) -> Self {
        let messages: Vec<(String, Vec<u8>)> = messages
            .iter()
            .map(|(topic, payload)| (topic.to_string(), payload.as_bytes().to_vec()))
            .collect();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let session_frames = frames.clone();
        let session_count = connections.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                // only the first session is served; later ones are counted and parked
                if session_count.fetch_add(1, Ordering::SeqCst) == 0 {
                    let frames = session_frames.clone();
                    let messages = messages.clone();
                    tokio::spawn(serve_mqtt_session(stream, messages, hang_up, frames));
                } else {
                    held.push(stream);
                }
            }
        });

        Self {
            uri: format!("tcp://{addr}"),
            frames,
            connections,
        }
    }

    pub fn frames(&self) -> Vec<MqttFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn first_of(&self, kind: u8) -> Option<MqttFrame> {
        self.frames().into_iter().find(|f| f.kind() == kind)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Waits up to five seconds for a packet of `kind` to arrive.
    pub async fn wait_for(&self, kind: u8) -> Option<MqttFrame> {
        for _ in 0..500 {
            if let Some(frame) = self.first_of(kind) {
                return Some(frame);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }
}

async fn serve_mqtt_session(
    mut stream: TcpStream,
    messages: Vec<(String, Vec<u8>)>,
    hang_up: bool,
    frames: Arc<Mutex<Vec<MqttFrame>>>,
) {
    while let Some(frame) = read_mqtt_frame(&mut stream).await {
        frames.lock().unwrap().push(frame.clone());
        let reply = match frame.kind() {
            packet::CONNECT => vec![0x20, 0x02, 0x00, 0x00],
            packet::SUBSCRIBE => {
                let [hi, lo] = frame.packet_id(0);
                let granted = frame.body.last().copied().unwrap_or(0);
                let mut reply = vec![0x90, 0x03, hi, lo, granted];
                for (topic, payload) in &messages {
                    reply.extend(publish_frame(topic, payload));
                }
                if stream.write_all(&reply).await.is_err() || hang_up {
                    return;
                }
                continue;
            }
            packet::PUBLISH if frame.qos() == 1 => {
                let topic_len = u16::from_be_bytes([frame.body[0], frame.body[1]]) as usize;
                let [hi, lo] = frame.packet_id(2 + topic_len);
                vec![0x40, 0x02, hi, lo]
            }
            packet::PINGREQ => vec![0xD0, 0x00],
            packet::DISCONNECT => return,
            _ => continue,
        };
        if stream.write_all(&reply).await.is_err() {
            return;
        }
    }
}

async fn read_mqtt_frame(stream: &mut TcpStream) -> Option<MqttFrame> {
    let header = stream.read_u8().await.ok()?;
    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let byte = stream.read_u8().await.ok()?;
        len |= ((byte & 0x7f) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let mut body = vec![0; len];
    stream.read_exact(&mut body).await.ok()?;
    Some(MqttFrame { header, body })
}

/// Encodes a QoS 0 PUBLISH.
fn publish_frame(topic: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + topic.len() + payload.len());
    body.extend_from_slice(&(topic.len() as u16).to_be_bytes());
    body.extend_from_slice(topic.as_bytes());
    body.extend_from_slice(payload);

    let mut frame = vec![0x30];
    let mut remaining = body.len();
    loop {
        let mut byte = (remaining % 128) as u8;
        remaining /= 128;
        if remaining > 0 {
            byte |= 0x80;
        }
        frame.push(byte);
        if remaining == 0 {
            break;
        }
    }
    frame.extend(body);
    frame
}
