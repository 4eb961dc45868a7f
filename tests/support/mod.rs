//! A tiny HTTP server for stream tests
//!
//! Mock servers answer with complete bodies; live radio never ends. This
//! server writes its body in paced chunks so captures can be tested against
//! endless, finite, silent and broken streams.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

/// What the server sends after the response head
#[derive(Debug, Clone, Copy)]
pub enum Body {
    /// Chunks until the client goes away
    Endless { chunk_size: usize, interval: Duration },
    /// A fixed number of chunks, then the connection is closed
    Finite {
        chunks: usize,
        chunk_size: usize,
        interval: Duration,
    },
    /// Announces `announced` bytes but closes after `sent`
    Truncated { announced: usize, sent: usize },
    /// The head and nothing else, the connection stays open
    Silent,
}

/// Handle to a running stream server
///
/// The server lives until the test process exits.
pub struct StreamServer {
    addr: SocketAddr,
}

impl StreamServer {
    /// Starts a server answering every request with `body`
    ///
    /// `content_type` is sent as raw bytes, so it may hold values that are
    /// not valid text.
    pub fn start(content_type: &'static [u8], body: Body) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for connection in listener.incoming() {
                let Ok(connection) = connection else {
                    continue;
                };
                thread::spawn(move || serve(connection, content_type, body));
            }
        });

        Self { addr }
    }

    /// URL of `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Bytes that look like MPEG audio frames
pub fn audio_bytes(len: usize) -> Vec<u8> {
    [0xFFu8, 0xFB, 0x90, 0x64]
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

fn serve(mut connection: TcpStream, content_type: &[u8], body: Body) {
    if read_request_head(&connection).is_none() {
        return;
    }

    let length_header = match body {
        Body::Truncated { announced, .. } => format!("Content-Length: {}\r\n", announced),
        _ => String::new(),
    };
    let mut head = b"HTTP/1.1 200 OK\r\nContent-Type: ".to_vec();
    head.extend_from_slice(content_type);
    head.extend_from_slice(format!("\r\n{}Connection: close\r\n\r\n", length_header).as_bytes());
    if connection.write_all(&head).is_err() {
        return;
    }

    match body {
        Body::Endless {
            chunk_size,
            interval,
        } => {
            let chunk = audio_bytes(chunk_size);
            while connection.write_all(&chunk).is_ok() {
                thread::sleep(interval);
            }
        }
        Body::Finite {
            chunks,
            chunk_size,
            interval,
        } => {
            let chunk = audio_bytes(chunk_size);
            for _ in 0..chunks {
                if connection.write_all(&chunk).is_err() {
                    return;
                }
                thread::sleep(interval);
            }
        }
        Body::Truncated { sent, .. } => {
            let _ = connection.write_all(&audio_bytes(sent));
            let _ = connection.flush();
        }
        Body::Silent => {
            // Hold the connection open without sending anything
            thread::sleep(Duration::from_secs(120));
        }
    }
}

fn read_request_head(connection: &TcpStream) -> Option<()> {
    let mut reader = BufReader::new(connection);
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return None,
            Ok(_) if line == "\r\n" || line == "\n" => return Some(()),
            Ok(_) => {}
        }
    }
}
