use ferry_remote::{HttpClient, SchemeClient};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

/// A tiny fixed-response HTTP server on a loopback port.
fn spawn_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            // Requests are tiny; handle them inline.
            let _ = handle(stream);
        }
    });

    port
}

fn handle(stream: TcpStream) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();

    let mut range: Option<String> = None;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        if line == "\r\n" || line.is_empty() {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("range:") {
            range = Some(value.trim().to_string());
        }
    }

    let mut stream = reader.into_inner();
    let body = b"hello world";
    match path.as_str() {
        "/data" => {
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nETag: \"v1-etag\"\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )?;
            if method != "HEAD" {
                stream.write_all(body)?;
            }
        }
        "/range" => match range {
            Some(spec) => {
                let spec = spec.trim_start_matches("bytes=");
                let (start, end) = spec.split_once('-').unwrap_or(("0", "0"));
                let start: usize = start.parse().unwrap_or(0);
                let end: usize = end.parse::<usize>().unwrap_or(0).min(body.len() - 1);
                let slice = &body[start..=end];
                write!(
                    stream,
                    "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    slice.len()
                )?;
                stream.write_all(slice)?;
            }
            None => {
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                )?;
                stream.write_all(body)?;
            }
        },
        "/missing" => {
            write!(
                stream,
                "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            )?;
        }
        _ => {
            write!(
                stream,
                "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            )?;
        }
    }
    stream.flush()
}

#[test]
fn etag_comes_from_the_response_headers() {
    let port = spawn_server();
    let client = HttpClient::new(format!("http://127.0.0.1:{port}/data"));
    assert_eq!(client.etag().unwrap().as_deref(), Some("\"v1-etag\""));
    assert_eq!(client.size().unwrap(), Some(11));
}

#[test]
fn fetch_streams_the_body_into_the_sink() {
    let port = spawn_server();
    let client = HttpClient::new(format!("http://127.0.0.1:{port}/data"));
    let mut sink = Vec::new();
    client.fetch(&mut sink).unwrap();
    assert_eq!(sink, b"hello world");
}

#[test]
fn missing_resources_are_not_found() {
    let port = spawn_server();
    let client = HttpClient::new(format!("http://127.0.0.1:{port}/missing"));
    let err = client.etag().unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[test]
fn server_errors_are_recoverable_after_retries() {
    let port = spawn_server();
    let client = HttpClient::new(format!("http://127.0.0.1:{port}/unstable"));
    let err = client.etag().unwrap_err();
    assert!(err.is_recoverable(), "{err}");
}

#[test]
fn connection_failures_are_recoverable() {
    // Nothing listens here; bind-then-drop guarantees the port is closed.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = HttpClient::new(format!("http://127.0.0.1:{port}/data"));
    let err = client.etag().unwrap_err();
    assert!(err.is_recoverable(), "{err}");
}

#[test]
fn byte_ranges_use_partial_content() {
    let port = spawn_server();
    let client = HttpClient::new(format!("http://127.0.0.1:{port}/range"));
    let bytes = client.bytes_range(6, 5).unwrap();
    assert_eq!(bytes.as_deref(), Some(&b"world"[..]));

    // A server that ignores Range yields None so callers fall back.
    let client = HttpClient::new(format!("http://127.0.0.1:{port}/data"));
    assert_eq!(client.bytes_range(0, 5).unwrap(), None);
}

#[test]
fn zero_length_ranges_short_circuit() {
    let client = HttpClient::new("http://127.0.0.1:1/never-contacted".to_string());
    assert_eq!(client.bytes_range(0, 0).unwrap(), Some(Vec::new()));
}
