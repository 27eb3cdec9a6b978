pub mod response;

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use url_encoder::encode;

use crate::torrent::metainfo::bytes_to_hex;

pub use response::{AnnounceResponse, ResponseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Started,
    Stopped,
    Completed,
}

impl Event {
    fn as_str(&self) -> &'static str {
        match self {
            Event::Started => "started",
            Event::Stopped => "stopped",
            Event::Completed => "completed",
        }
    }
}

pub struct AnnounceRequest {
    pub info_hash: [u8; 20],
    pub peer_id: [u8; 20],
    pub port: u16,
    pub uploaded: u64,
    pub downloaded: u64,
    pub left: u64,
    pub event: Option<Event>,
}

#[derive(Debug)]
pub enum TrackerClientError {
    InvalidUrl,
    Connect(std::io::Error),
    Io(std::io::Error),
    SetTimeout(std::io::Error),
    MalformedResponse,
    Response(ResponseError),
    NotFound,
    HttpError(u16),
}

struct ParsedUrl {
    host: String,
    port: u16,
    path: String,
}

fn parse_http_url(url: &str) -> Result<ParsedUrl, TrackerClientError> {
    let rest = url
        .strip_prefix("http://")
        .ok_or(TrackerClientError::InvalidUrl)?;
    let (authority, path) = match rest.find('/') {
        Some(index) => (&rest[..index], &rest[index..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (
            host.to_string(),
            port.parse::<u16>().map_err(|_| TrackerClientError::InvalidUrl)?,
        ),
        None => (authority.to_string(), 80),
    };
    Ok(ParsedUrl {
        host,
        port,
        path: path.to_string(),
    })
}

/// Talks to one BitTorrent tracker over plain HTTP, using a hand-rolled
/// request writer rather than an HTTP client crate — symmetric with
/// the tracker's own hand-rolled socket server.
pub struct TrackerClient {
    tracker_url: String,
    timeout_secs: u64,
}

impl TrackerClient {
    pub fn new(tracker_url: &str, timeout_secs: u64) -> Self {
        Self {
            tracker_url: tracker_url.to_string(),
            timeout_secs,
        }
    }

    fn connect(&self, url: &ParsedUrl) -> Result<TcpStream, TrackerClientError> {
        let stream =
            TcpStream::connect((url.host.as_str(), url.port)).map_err(TrackerClientError::Connect)?;
        let timeout = Some(Duration::from_secs(self.timeout_secs));
        stream
            .set_read_timeout(timeout)
            .map_err(TrackerClientError::SetTimeout)?;
        stream
            .set_write_timeout(timeout)
            .map_err(TrackerClientError::SetTimeout)?;
        Ok(stream)
    }

    fn request(&self, url: &ParsedUrl, request: &str) -> Result<(u16, Vec<u8>), TrackerClientError> {
        let mut stream = self.connect(url)?;
        stream
            .write_all(request.as_bytes())
            .map_err(TrackerClientError::Io)?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).map_err(TrackerClientError::Io)?;

        let separator = b"\r\n\r\n";
        let split_at = raw
            .windows(separator.len())
            .position(|window| window == separator)
            .ok_or(TrackerClientError::MalformedResponse)?;

        let header = std::str::from_utf8(&raw[..split_at]).map_err(|_| TrackerClientError::MalformedResponse)?;
        let status_line = header.lines().next().ok_or(TrackerClientError::MalformedResponse)?;
        let status_code = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or(TrackerClientError::MalformedResponse)?;

        let body = raw[split_at + separator.len()..].to_vec();
        Ok((status_code, body))
    }

    /// GET /announce?info_hash=...&peer_id=...&port=...&uploaded=...&downloaded=...&left=...&compact=1[&event=...]
    pub fn announce(&self, req: &AnnounceRequest) -> Result<AnnounceResponse, TrackerClientError> {
        let url = parse_http_url(&self.tracker_url)?;

        let info_hash_encoded = encode(&bytes_to_hex(&req.info_hash));
        let peer_id_encoded = encode(&bytes_to_hex(&req.peer_id));
        let mut query = format!(
            "info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}&compact=1",
            info_hash_encoded, peer_id_encoded, req.port, req.uploaded, req.downloaded, req.left
        );
        if let Some(event) = req.event {
            query.push_str(&format!("&event={}", event.as_str()));
        }

        let http_request = format!(
            "GET {}?{} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            url.path, query, url.host
        );

        let (status, body) = self.request(&url, &http_request)?;
        if status != 200 {
            return Err(TrackerClientError::HttpError(status));
        }

        AnnounceResponse::from_bencoded(&body).map_err(TrackerClientError::Response)
    }

    /// GET /get_torrent?info_hash=<hex>
    pub fn get_torrent(&self, info_hash_hex: &str) -> Result<Vec<u8>, TrackerClientError> {
        let url = parse_http_url(&self.tracker_url)?;
        let http_request = format!(
            "GET {}?info_hash={} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            url.path, encode(info_hash_hex), url.host
        );

        let (status, body) = self.request(&url, &http_request)?;
        match status {
            200 => Ok(body),
            404 => Err(TrackerClientError::NotFound),
            other => Err(TrackerClientError::HttpError(other)),
        }
    }

    /// POST /announce with a multipart/form-data body carrying the
    /// `.torrent` file bytes plus the same announce fields a GET `/announce`
    /// sends, used when a peer already has the complete file and is
    /// registering it with the tracker for the first time. `info_hash` is
    /// sent as the raw 20 bytes, not its hex encoding, mirroring
    /// `tracker.py`'s `payload.get("info_hash").hex()`.
    pub fn upload_torrent(
        &self,
        req: &AnnounceRequest,
        torrent_bytes: &[u8],
    ) -> Result<(), TrackerClientError> {
        let url = parse_http_url(&self.tracker_url)?;
        let boundary = "----dtorrent-boundary";

        let mut body = Vec::new();
        push_field(&mut body, boundary, "info_hash", &req.info_hash);
        push_field(&mut body, boundary, "peer_id", bytes_to_hex(&req.peer_id).as_bytes());
        push_field(&mut body, boundary, "port", req.port.to_string().as_bytes());
        push_field(&mut body, boundary, "uploaded", req.uploaded.to_string().as_bytes());
        push_field(&mut body, boundary, "downloaded", req.downloaded.to_string().as_bytes());
        push_field(&mut body, boundary, "left", req.left.to_string().as_bytes());
        if let Some(event) = req.event {
            push_field(&mut body, boundary, "event", event.as_str().as_bytes());
        }

        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"torrent_file\"; filename=\"torrent.torrent\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(torrent_bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let http_request_head = format!(
            "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: multipart/form-data; boundary={}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            url.path, url.host, boundary, body.len()
        );

        let mut stream = self.connect(&url)?;
        stream
            .write_all(http_request_head.as_bytes())
            .map_err(TrackerClientError::Io)?;
        stream.write_all(&body).map_err(TrackerClientError::Io)?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).map_err(TrackerClientError::Io)?;
        let header = String::from_utf8_lossy(&raw);
        let status_line = header.lines().next().unwrap_or("");
        let status_code = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok())
            .unwrap_or(0);

        if status_code == 200 {
            Ok(())
        } else {
            Err(TrackerClientError::HttpError(status_code))
        }
    }
}

fn push_field(body: &mut Vec<u8>, boundary: &str, name: &str, value: &[u8]) {
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
    );
    body.extend_from_slice(value);
    body.extend_from_slice(b"\r\n");
}
