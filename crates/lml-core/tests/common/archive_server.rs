//! Minimal HTTP/1.1 server for fetch-classification integration tests.
//!
//! Serves every GET with one configured behavior: a fixed body, an empty
//! body, an error status, or a stall (accept, then never answer). Runs in a
//! background thread until the process exits.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

/// How the server answers every request.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// 200 with the given body.
    Body(Vec<u8>),
    /// 200 with an empty body.
    EmptyBody,
    /// The given status with a short body.
    Status(u32),
    /// Read the request, then go silent for the given duration.
    Stall(Duration),
}

/// Starts the server and returns its base URL (e.g. `http://127.0.0.1:4242`).
pub fn start(behavior: Behavior) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let behavior = behavior.clone();
            thread::spawn(move || handle(stream, behavior));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

/// A port nothing listens on (bind, read the port, drop the socket).
pub fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().unwrap().port()
}

fn handle(mut stream: std::net::TcpStream, behavior: Behavior) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    if stream.read(&mut buf).is_err() {
        return;
    }
    match behavior {
        Behavior::Body(body) => {
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(&body);
        }
        Behavior::EmptyBody => {
            let _ = stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        }
        Behavior::Status(code) => {
            let body = format!("status {code}");
            let header = format!(
                "HTTP/1.1 {} Error\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                code,
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(body.as_bytes());
        }
        Behavior::Stall(duration) => {
            thread::sleep(duration);
        }
    }
}
