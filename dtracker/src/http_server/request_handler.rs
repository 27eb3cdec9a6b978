use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use logger::LoggerSender;

use crate::announce::{multipart, AnnounceRequest, AnnounceResponse};
use crate::http::{HttpMethod, HttpRequest, HttpRequestError, HttpStatus};
use crate::torrent_store::TorrentStore;
use crate::tracker_status::{AtomicTrackerStatus, Swarm};

const MAX_HEADER_BYTES: usize = 64 * 1024;

#[derive(Debug)]
pub enum RequestHandlerError {
    Io(std::io::Error),
    Parse(HttpRequestError),
    ConnectionClosed,
}

/// One accepted TCP connection: reads exactly one HTTP request, dispatches
/// it, and writes back exactly one response over a hand-rolled socket
/// reader rather than pulling in an HTTP framework.
pub struct RequestHandler {
    stream: TcpStream,
}

impl RequestHandler {
    pub fn new(stream: TcpStream) -> RequestHandler {
        RequestHandler { stream }
    }

    pub fn handle(
        &mut self,
        status: Arc<AtomicTrackerStatus>,
        store: Arc<TorrentStore>,
        logger: LoggerSender,
    ) -> Result<(), RequestHandlerError> {
        let peer_ip = self
            .stream
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let mut request = self.read_request()?;
        let method = request.method;
        let endpoint = request.endpoint.clone();

        let (http_status, body) = match (method, endpoint.as_str()) {
            (HttpMethod::Get, "/announce") => self.handle_announce_get(&request, &peer_ip, &status),
            (HttpMethod::Get, "/get_torrent") => self.handle_get_torrent(&request, &store),
            (HttpMethod::Post, "/announce") => {
                self.handle_announce_post(&mut request, &peer_ip, &status, &store)
            }
            _ => (HttpStatus::NotFound, Vec::new()),
        };

        self.send_response(http_status, &body)?;
        logger.info(&format!(
            "{:?} {} from {} -> {}",
            method,
            endpoint,
            peer_ip,
            http_status.to_string()
        ));
        Ok(())
    }

    fn read_request(&mut self) -> Result<HttpRequest, RequestHandlerError> {
        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let read = self.stream.read(&mut chunk).map_err(RequestHandlerError::Io)?;
            if read == 0 {
                return Err(RequestHandlerError::ConnectionClosed);
            }
            raw.extend_from_slice(&chunk[..read]);

            if let Some(pos) = find_subslice(&raw, b"\r\n\r\n") {
                break pos + 4;
            }
            if raw.len() > MAX_HEADER_BYTES {
                return Err(RequestHandlerError::Parse(HttpRequestError::MalformedHeaders));
            }
        };

        let mut request =
            HttpRequest::parse_head(&raw[..header_end]).map_err(RequestHandlerError::Parse)?;

        let mut body = raw[header_end..].to_vec();
        let wanted = request.content_length();
        while body.len() < wanted {
            let read = self.stream.read(&mut chunk).map_err(RequestHandlerError::Io)?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }
        body.truncate(wanted);
        request.body = body;

        Ok(request)
    }

    fn handle_announce_get(
        &self,
        request: &HttpRequest,
        peer_ip: &str,
        status: &Arc<AtomicTrackerStatus>,
    ) -> (HttpStatus, Vec<u8>) {
        let announce = match AnnounceRequest::from_params(&request.params, peer_ip.to_string()) {
            Ok(announce) => announce,
            Err(err) => {
                let body = AnnounceResponse::failure(&err.to_string()).to_bencoded();
                return (HttpStatus::BadRequest, body);
            }
        };

        status.record_event(
            announce.info_hash.as_deref(),
            announce.peer_id,
            announce.ip.clone(),
            announce.port,
            announce.event,
            announce.left,
        );

        let response = match &announce.info_hash {
            Some(info_hash) => match status.get_swarm(info_hash) {
                Some(swarm) => AnnounceResponse::from_swarm(&swarm, announce.peer_id),
                None => AnnounceResponse::failure("invalid info_hash"),
            },
            None => AnnounceResponse::from_swarm(&Swarm::default(), announce.peer_id),
        };

        (HttpStatus::Ok, response.to_bencoded())
    }

    fn handle_get_torrent(
        &self,
        request: &HttpRequest,
        store: &Arc<TorrentStore>,
    ) -> (HttpStatus, Vec<u8>) {
        let info_hash = match request.params.get("info_hash") {
            Some(hash) => hash,
            None => return (HttpStatus::BadRequest, b"Missing required parameter: info_hash".to_vec()),
        };

        match store.load(info_hash) {
            Some(bytes) => (HttpStatus::Ok, bytes),
            None => (
                HttpStatus::NotFound,
                format!("Torrent file for info_hash {} not found.", info_hash).into_bytes(),
            ),
        }
    }

    fn handle_announce_post(
        &self,
        request: &mut HttpRequest,
        peer_ip: &str,
        status: &Arc<AtomicTrackerStatus>,
        store: &Arc<TorrentStore>,
    ) -> (HttpStatus, Vec<u8>) {
        let boundary = match request
            .content_type()
            .and_then(|ct| ct.split("boundary=").nth(1))
        {
            Some(boundary) => boundary.to_string(),
            None => {
                return (
                    HttpStatus::BadRequest,
                    b"Invalid Content-Type for multipart request".to_vec(),
                )
            }
        };

        let parts = multipart::parse(&request.body, &boundary);

        let info_hash_bytes = match parts.get("info_hash") {
            Some(bytes) => bytes,
            None => return (HttpStatus::BadRequest, b"Missing info_hash".to_vec()),
        };
        if info_hash_bytes.len() != 20 {
            return (
                HttpStatus::BadRequest,
                b"info_hash must be 20 bytes".to_vec(),
            );
        }
        let info_hash = encode_hex(info_hash_bytes);

        let torrent_file = match parts.get("torrent_file") {
            Some(bytes) => bytes,
            None => return (HttpStatus::BadRequest, b"Missing torrent_file".to_vec()),
        };

        if let Err(err) = store.save(&info_hash, torrent_file) {
            return (
                HttpStatus::InternalServerError,
                format!("Failed to save torrent file: {:?}", err).into_bytes(),
            );
        }

        let peer_id_bytes = parts.get("peer_id").cloned().unwrap_or_default();
        let peer_id = decode_peer_id(&peer_id_bytes);
        let port = parts
            .get("port")
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(0);
        let left = parts
            .get("left")
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        let event = parts
            .get("event")
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        status.record_event(Some(&info_hash), peer_id, peer_ip.to_string(), port, event, left);

        let body = format!("Torrent file saved at torrent_data_folder/{}.torrent", info_hash);
        (HttpStatus::Ok, body.into_bytes())
    }

    fn send_response(&mut self, status: HttpStatus, body: &[u8]) -> Result<(), RequestHandlerError> {
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status.to_string(),
            body.len()
        );
        self.stream
            .write_all(head.as_bytes())
            .map_err(RequestHandlerError::Io)?;
        self.stream.write_all(body).map_err(RequestHandlerError::Io)?;
        self.stream.flush().map_err(RequestHandlerError::Io)
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

fn decode_peer_id(bytes: &[u8]) -> [u8; 20] {
    let hex = String::from_utf8_lossy(bytes);
    let mut id = [0u8; 20];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate().take(20) {
        if let Ok(chunk_str) = std::str::from_utf8(chunk) {
            if let Ok(byte) = u8::from_str_radix(chunk_str, 16) {
                id[i] = byte;
            }
        }
    }
    id
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
