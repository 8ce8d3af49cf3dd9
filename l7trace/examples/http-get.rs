//! Traffic generator for exercising l7trace by hand
//!
//! Issues plain-text HTTP GET requests over raw TCP so the write/read
//! tracepoints see exactly the bytes this program sends.
//!
//! ## Usage
//!
//! ```bash
//! # Terminal 1: start the tracer
//! sudo ./target/release/l7trace --pid $(pgrep http-get)
//!
//! # Terminal 2: generate requests (default: example.com:80, 5 requests)
//! cargo run --example http-get -- example.com 80 5
//! ```

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

fn main() -> std::io::Result<()> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "example.com".to_string());
    let port: u16 = args.next().and_then(|p| p.parse().ok()).unwrap_or(80);
    let count: usize = args.next().and_then(|c| c.parse().ok()).unwrap_or(5);

    for i in 0..count {
        let mut stream = TcpStream::connect((host.as_str(), port))?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;

        let request = format!("GET /?n={i} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes())?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response).ok();
        println!("request {i}: {} response bytes", response.len());

        std::thread::sleep(Duration::from_millis(200));
    }

    Ok(())
}
