//! Shared test helpers: a loopback RESP2 server backed by in-memory data.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use bytes::{Bytes, BytesMut};
use redis_protocol::codec::Resp2;
use redis_protocol::resp2::types::BytesFrame;
use tokio_util::codec::{Decoder, Encoder};

// =============================================================================
// Store Data
// =============================================================================

/// Sets and hashes served by [`FakeStore`].
#[derive(Debug, Default, Clone)]
pub struct StoreData {
    sets: HashMap<String, Vec<String>>,
    hashes: HashMap<String, Vec<(String, String)>>,
}

impl StoreData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dimension under the default `stats` prefix.
    pub fn dim(mut self, dim: &str) -> Self {
        let members = self.sets.entry("stats:dims".to_string()).or_default();
        if !members.iter().any(|m| m == dim) {
            members.push(dim.to_string());
        }
        self
    }

    pub fn counter(self, dim: &str, name: &str, value: i64) -> Self {
        self.dim(dim)
            .hash_field(&format!("stats:counter:{dim}"), name, &value.to_string())
    }

    pub fn gauge(self, dim: &str, name: &str, value: i64) -> Self {
        self.dim(dim)
            .hash_field(&format!("stats:gauge:{dim}"), name, &value.to_string())
    }

    /// Set a raw hash field, bypassing integer formatting.
    pub fn hash_field(mut self, key: &str, field: &str, value: &str) -> Self {
        let fields = self.hashes.entry(key.to_string()).or_default();
        fields.retain(|(f, _)| f != field);
        fields.push((field.to_string(), value.to_string()));
        self
    }
}

// =============================================================================
// Fake Store
// =============================================================================

struct Shared {
    data: Mutex<StoreData>,
    password: Option<String>,
    connections: AtomicUsize,
    commands: Mutex<Vec<String>>,
}

/// A RESP2 server on 127.0.0.1 answering AUTH, PING, SMEMBERS, HGETALL, QUIT.
pub struct FakeStore {
    address: String,
    shared: Arc<Shared>,
}

impl FakeStore {
    pub fn start(data: StoreData) -> Self {
        Self::start_with(data, None)
    }

    pub fn start_with_password(data: StoreData, password: &str) -> Self {
        Self::start_with(data, Some(password.to_string()))
    }

    fn start_with(data: StoreData, password: Option<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
        let address = listener.local_addr().expect("local addr").to_string();
        let shared = Arc::new(Shared {
            data: Mutex::new(data),
            password,
            connections: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
        });

        let accept_shared = Arc::clone(&shared);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                accept_shared.connections.fetch_add(1, Ordering::SeqCst);
                let conn_shared = Arc::clone(&accept_shared);
                thread::spawn(move || serve(stream, conn_shared));
            }
        });

        Self { address, shared }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Replace the served data.
    pub fn set_data(&self, data: StoreData) {
        *self.shared.data.lock().unwrap() = data;
    }

    /// Number of accepted TCP connections.
    pub fn connection_count(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Names of every command received, in order.
    pub fn commands(&self) -> Vec<String> {
        self.shared.commands.lock().unwrap().clone()
    }
}

fn serve(mut stream: TcpStream, shared: Arc<Shared>) {
    let mut codec = Resp2::default();
    let mut read_buf = BytesMut::new();
    let mut chunk = [0u8; 4096];
    let mut authed = shared.password.is_none();

    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        read_buf.extend_from_slice(&chunk[..n]);

        let mut write_buf = BytesMut::new();
        let mut close = false;
        while let Ok(Some(frame)) = codec.decode(&mut read_buf) {
            let args = command_args(frame);
            let Some(name) = args.first().map(|a| a.to_ascii_uppercase()) else {
                continue;
            };
            shared.commands.lock().unwrap().push(name.clone());

            let reply = match name.as_str() {
                "AUTH" => match (&shared.password, args.get(1)) {
                    (Some(expected), Some(given)) if expected == given => {
                        authed = true;
                        ok()
                    }
                    _ => error("WRONGPASS invalid username-password pair"),
                },
                _ if !authed => error("NOAUTH Authentication required."),
                "PING" => BytesFrame::SimpleString(Bytes::from_static(b"PONG")),
                "QUIT" => {
                    close = true;
                    ok()
                }
                "SMEMBERS" => {
                    let data = shared.data.lock().unwrap();
                    let members = args
                        .get(1)
                        .and_then(|k| data.sets.get(k))
                        .cloned()
                        .unwrap_or_default();
                    BytesFrame::Array(members.into_iter().map(bulk).collect())
                }
                "HGETALL" => {
                    let data = shared.data.lock().unwrap();
                    let fields = args
                        .get(1)
                        .and_then(|k| data.hashes.get(k))
                        .cloned()
                        .unwrap_or_default();
                    BytesFrame::Array(
                        fields
                            .into_iter()
                            .flat_map(|(f, v)| [bulk(f), bulk(v)])
                            .collect(),
                    )
                }
                other => error(&format!("ERR unknown command '{other}'")),
            };
            if codec.encode(reply, &mut write_buf).is_err() {
                return;
            }
        }

        if stream.write_all(&write_buf).is_err() || close {
            return;
        }
    }
}

fn command_args(frame: BytesFrame) -> Vec<String> {
    match frame {
        BytesFrame::Array(parts) => parts
            .into_iter()
            .filter_map(|p| match p {
                BytesFrame::BulkString(b) | BytesFrame::SimpleString(b) => {
                    Some(String::from_utf8_lossy(&b).into_owned())
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn bulk(s: String) -> BytesFrame {
    BytesFrame::BulkString(Bytes::from(s.into_bytes()))
}

fn ok() -> BytesFrame {
    BytesFrame::SimpleString(Bytes::from_static(b"OK"))
}

fn error(msg: &str) -> BytesFrame {
    BytesFrame::Error(msg.to_string().into())
}

/// An address nothing is listening on.
pub fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
    let address = listener.local_addr().expect("local addr").to_string();
    drop(listener);
    address
}
