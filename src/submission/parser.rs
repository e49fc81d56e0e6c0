use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use serde_json::{Map, Value};

/// Parse a request body based on its Content-Type header.
///
/// The media type is compared case-insensitively with parameters stripped.
/// A missing header is treated as JSON.
pub async fn parse(headers: &HeaderMap, body: Bytes) -> Result<Value, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err("Empty request body".to_string());
    }

    let kind = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(media_type);

    match kind.as_deref() {
        None | Some("application/json") => {
            serde_json::from_slice(&body).map_err(|e| format!("Invalid JSON: {e}"))
        }
        Some("application/x-www-form-urlencoded") => parse_form_urlencoded(&body),
        Some("multipart/form-data") => parse_multipart(headers, body).await,
        Some(_) => {
            // Try JSON first, then form-urlencoded
            serde_json::from_slice(&body)
                .or_else(|_| parse_form_urlencoded(&body))
                .map_err(|e| format!("Unable to parse body: {e}"))
        }
    }
}

/// `Multipart/Form-Data; boundary=x` -> `multipart/form-data`
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Repeated keys keep the first value.
fn parse_form_urlencoded(body: &[u8]) -> Result<Value, String> {
    std::str::from_utf8(body).map_err(|e| format!("Invalid UTF-8: {e}"))?;

    let mut map = Map::new();
    for (k, v) in form_urlencoded::parse(body) {
        map.entry(k.into_owned())
            .or_insert_with(|| Value::String(v.into_owned()));
    }
    Ok(Value::Object(map))
}

/// Parse multipart form data using multer. File parts are rejected.
async fn parse_multipart(headers: &HeaderMap, body: Bytes) -> Result<Value, String> {
    let boundary = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| "Missing multipart boundary".to_string())?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut map = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Multipart error: {e}"))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if field.file_name().is_some() {
            return Err(format!("File uploads are not accepted: {name}"));
        }
        let value = field
            .text()
            .await
            .map_err(|e| format!("Field read error: {e}"))?;
        map.entry(name).or_insert(Value::String(value));
    }

    Ok(Value::Object(map))
}
