//! Native request → [`NormalizedRequest`].

use std::collections::BTreeMap;
use std::convert::Infallible;

use bytes::Bytes;
use futures_util::stream;
use http::header::{CONTENT_TYPE, COOKIE};
use http::{HeaderMap, HeaderName, HeaderValue};
use multer::Multipart;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::cookie::parse_cookie_header;
use crate::error::HandlerError;
use crate::normalized::NormalizedRequest;
use crate::request::Request;

/// Flattens `req` into the shape orchestrators consume.
///
/// Fails only on a body that claims to be JSON or multipart and is not,
/// which is the client's fault and is reported as `400`.
pub async fn normalize(req: &Request) -> Result<NormalizedRequest, HandlerError> {
    let headers = header_map(req.headers());
    let cookies = cookie_map(req.headers());
    let query = req.query().map(form_pairs).unwrap_or_default();
    let url_params: BTreeMap<String, String> = req
        .params()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let body = parse_body(req).await?;

    let mut parameters = BTreeMap::new();
    merge_strings(&mut parameters, &headers);
    merge_strings(&mut parameters, &cookies);
    if let Value::Object(fields) = &body {
        parameters.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merge_strings(&mut parameters, &query);
    merge_strings(&mut parameters, &url_params);

    Ok(NormalizedRequest {
        method: req.method().to_string(),
        path: req.path().to_owned(),
        url: req.uri().to_string(),
        headers,
        cookies,
        query,
        url_params,
        body,
        raw_body: req.body().to_vec(),
        remote_addr: req.remote_addr(),
        parameters,
    })
}

fn merge_strings(into: &mut BTreeMap<String, Value>, from: &BTreeMap<String, String>) {
    into.extend(from.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))));
}

/// Lowercase names; repeated headers joined with `", "` (RFC 9110 §5.3),
/// except `cookie`, whose split lines join with `"; "` (RFC 9113 §8.2.3).
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| utf8_value(name, v))
            .collect();
        if values.is_empty() {
            continue;
        }
        let separator = if *name == COOKIE { "; " } else { ", " };
        out.insert(name.as_str().to_owned(), values.join(separator));
    }
    out
}

fn cookie_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| utf8_value(&COOKIE, v))
        .flat_map(parse_cookie_header)
        .collect()
}

fn utf8_value<'a>(name: &HeaderName, value: &'a HeaderValue) -> Option<&'a str> {
    match value.to_str() {
        Ok(s) => Some(s),
        Err(_) => {
            debug!(header = %name, "skipping non-UTF-8 header value");
            None
        }
    }
}

/// `application/x-www-form-urlencoded` pairs. A repeated key keeps its last value.
fn form_pairs(input: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(input.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

async fn parse_body(req: &Request) -> Result<Value, HandlerError> {
    if req.body().is_empty() {
        return Ok(Value::Null);
    }
    let Some(mime) = media_type(req.headers()) else {
        return Ok(Value::Null);
    };

    if mime == "application/json" || mime.ends_with("+json") {
        return serde_json::from_slice(req.body()).map_err(|e| {
            HandlerError::known(400, "malformed JSON body")
                .with_details(Value::String(e.to_string()))
        });
    }

    if mime == "application/x-www-form-urlencoded" {
        let body = String::from_utf8_lossy(req.body());
        let fields: Map<String, Value> = form_pairs(&body)
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        return Ok(Value::Object(fields));
    }

    if mime == "multipart/form-data" {
        return parse_multipart(req).await.map(Value::Object);
    }

    Ok(Value::Null)
}

/// Text fields become strings. File parts are represented by their
/// metadata only: `{"filename", "contentType", "size"}`.
async fn parse_multipart(req: &Request) -> Result<Map<String, Value>, HandlerError> {
    let malformed = |e: multer::Error| {
        HandlerError::known(400, "malformed multipart body").with_details(Value::String(e.to_string()))
    };

    let content_type = req.header(CONTENT_TYPE.as_str()).unwrap_or_default();
    let boundary = multer::parse_boundary(content_type).map_err(malformed)?;
    let body: Bytes = req.body.clone();
    let mut multipart = Multipart::new(stream::once(async move { Ok::<_, Infallible>(body) }), boundary);

    let mut fields = Map::new();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_owned) else {
            debug!("skipping unnamed multipart field");
            continue;
        };
        match field.file_name().map(str::to_owned) {
            Some(filename) => {
                let content_type = field.content_type().map(ToString::to_string);
                let size = field.bytes().await.map_err(malformed)?.len();
                fields.insert(
                    name,
                    json!({ "filename": filename, "contentType": content_type, "size": size }),
                );
            }
            None => {
                let text = field.text().await.map_err(malformed)?;
                fields.insert(name, Value::String(text));
            }
        }
    }
    Ok(fields)
}

/// `content-type` without parameters, lowercased.
fn media_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mime = raw.split(';').next().unwrap_or(raw).trim();
    Some(mime.to_ascii_lowercase())
}
