use std::collections::HashMap;

/// Splits a `multipart/form-data` body into its named parts, mirroring
/// `tracker.py`'s hand-rolled `parse_multipart_request` — no external
/// multipart crate, since the only producer is dtorrent's own
/// `tracker_client::upload_torrent`.
pub fn parse(body: &[u8], boundary: &str) -> HashMap<String, Vec<u8>> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut parts = HashMap::new();

    for chunk in split_on(body, &delimiter) {
        let header_end = match find_subslice(chunk, b"\r\n\r\n") {
            Some(pos) => pos,
            None => continue,
        };
        let header_text = String::from_utf8_lossy(&chunk[..header_end]);
        let name = match extract_field_name(&header_text) {
            Some(name) => name,
            None => continue,
        };

        let mut value = &chunk[header_end + 4..];
        if let Some(stripped) = value.strip_suffix(b"\r\n") {
            value = stripped;
        }
        parts.insert(name, value.to_vec());
    }

    parts
}

fn extract_field_name(header_text: &str) -> Option<String> {
    let marker = "name=\"";
    let start = header_text.find(marker)? + marker.len();
    let end = header_text[start..].find('"')? + start;
    Some(header_text[start..end].to_string())
}

fn split_on<'a>(data: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut rest = data;
    while let Some(pos) = find_subslice(rest, delimiter) {
        if pos > 0 {
            parts.push(&rest[..pos]);
        }
        rest = &rest[pos + delimiter.len()..];
    }
    if !rest.is_empty() {
        parts.push(rest);
    }
    parts
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
