use log::warn;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ServerConfig;
use crate::error::{Result, ViewerError};
use crate::gml::{escape_xml, unescape_xml};

pub const WFS_NS: &str = "http://www.opengis.net/wfs";
pub const GET_FEATURE_VERSION: &str = "1.0.0";
pub const TRANSACTION_VERSION: &str = "1.1.0";
const WFS_SCHEMA_LOCATION: &str =
    "http://www.opengis.net/wfs http://schemas.opengis.net/wfs/1.1.0/wfs.xsd";

/// GetFeature request for one feature type, JSON output in `srs_name`.
pub fn get_feature_url(server: &ServerConfig, srs_name: &str, type_name: &str) -> String {
    format!(
        "{}?service=WFS&version={}&request=GetFeature&typeName={}%3A{}&maxFeatures={}&outputFormat=application%2Fjson&srsName={}",
        server.base_url,
        GET_FEATURE_VERSION,
        encode_component(&server.workspace),
        encode_component(type_name),
        server.max_features,
        srs_name
    )
}

// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Build a Transaction document inserting one feature.
///
/// `geometry_gml` must already be a complete GML geometry element. Scalar
/// properties become child elements next to the geometry; nested values and
/// keys that are not valid element names are skipped.
pub fn insert_transaction(
    server: &ServerConfig,
    type_name: &str,
    geometry_name: &str,
    geometry_gml: &str,
    properties: &Map<String, Value>,
) -> Result<String> {
    if !is_xml_name(type_name) {
        return Err(ViewerError::Config(format!(
            "'{}' is not a valid feature type element name",
            type_name
        )));
    }
    if !is_xml_name(geometry_name) {
        return Err(ViewerError::Config(format!(
            "'{}' is not a valid geometry property name",
            geometry_name
        )));
    }

    let mut xml = String::new();
    xml.push_str(&format!(
        r#"<Transaction xmlns="{}" service="WFS" version="{}" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="{}">"#,
        WFS_NS, TRANSACTION_VERSION, WFS_SCHEMA_LOCATION
    ));
    xml.push_str("<Insert>");
    xml.push_str(&format!(
        r#"<{} xmlns="{}">"#,
        type_name,
        escape_xml(&server.namespace_uri)
    ));

    xml.push_str(&format!("<{}>", geometry_name));
    xml.push_str(geometry_gml);
    xml.push_str(&format!("</{}>", geometry_name));

    for (key, value) in properties {
        if key == geometry_name {
            continue;
        }
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => continue,
            Value::Array(_) | Value::Object(_) => {
                warn!("Skipping non-scalar property '{}' in insert", key);
                continue;
            }
        };
        if !is_xml_name(key) {
            warn!("Skipping property '{}': not a valid element name", key);
            continue;
        }
        xml.push_str(&format!("<{0}>{1}</{0}>", key, escape_xml(&text)));
    }

    xml.push_str(&format!("</{}>", type_name));
    xml.push_str("</Insert></Transaction>");
    Ok(xml)
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// What the server acknowledged for an insert.
#[derive(Serialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub total_inserted: u32,
    pub feature_ids: Vec<String>,
}

/// Interpret a transaction response body.
///
/// Understands WFS 1.1.0 `TransactionResponse` summaries, WFS 1.0.0
/// `WFS_TransactionResponse` status blocks and OWS/OGC exception reports.
/// A 200 response that carries an exception or inserts nothing is a failure.
pub fn parse_transaction_response(body: &str) -> Result<TransactionSummary> {
    let tags = scan_tags(body);
    let find = |local: &str| tags.iter().find(|t| t.local == local);

    if find("ExceptionReport").is_some() || find("ServiceExceptionReport").is_some() {
        let message = find("ExceptionText")
            .or_else(|| find("ServiceException"))
            .and_then(|t| t.text(body))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "server returned an exception report".to_string());
        return Err(ViewerError::TransactionFailed(message));
    }

    let feature_ids: Vec<String> = tags
        .iter()
        .filter(|t| t.local == "FeatureId")
        .filter_map(|t| t.attribute("fid"))
        .map(unescape_xml)
        .collect();

    if find("TransactionResponse").is_some() {
        let total_inserted = find("totalInserted")
            .and_then(|t| t.text(body))
            .and_then(|text| text.parse::<u32>().ok())
            .unwrap_or(feature_ids.len() as u32);
        if total_inserted == 0 {
            return Err(ViewerError::TransactionFailed(
                "server reported zero inserted features".to_string(),
            ));
        }
        return Ok(TransactionSummary {
            total_inserted,
            feature_ids,
        });
    }

    if find("WFS_TransactionResponse").is_some() {
        if find("FAILED").is_some() {
            let message = find("Message")
                .and_then(|t| t.text(body))
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| "transaction status FAILED".to_string());
            return Err(ViewerError::TransactionFailed(message));
        }
        if find("SUCCESS").is_some() {
            return Ok(TransactionSummary {
                total_inserted: feature_ids.len().max(1) as u32,
                feature_ids,
            });
        }
    }

    Err(ViewerError::TransactionFailed(
        "unrecognised transaction response".to_string(),
    ))
}

// A start or empty tag found in a response body.
struct Tag<'a> {
    local: &'a str,
    raw: &'a str,
    content_start: usize,
    self_closing: bool,
}

impl<'a> Tag<'a> {
    fn text(&self, body: &str) -> Option<String> {
        if self.self_closing {
            return Some(String::new());
        }
        let content = &body[self.content_start..];
        content
            .find("</")
            .map(|end| unescape_xml(content[..end].trim()))
    }

    fn attribute(&self, name: &str) -> Option<&'a str> {
        let needle = format!("{}=\"", name);
        let start = self.raw.find(&needle)? + needle.len();
        let len = self.raw[start..].find('"')?;
        Some(&self.raw[start..start + len])
    }
}

fn scan_tags(body: &str) -> Vec<Tag<'_>> {
    let mut tags = Vec::new();
    let mut offset = 0;
    while let Some(open) = body[offset..].find('<') {
        let tag_start = offset + open + 1;
        let Some(close) = body[tag_start..].find('>') else {
            break;
        };
        let raw = &body[tag_start..tag_start + close];
        offset = tag_start + close + 1;

        if raw.starts_with('/') || raw.starts_with('?') || raw.starts_with('!') {
            continue;
        }
        let name = raw
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        let local = name.rsplit(':').next().unwrap_or(name);
        tags.push(Tag {
            local,
            raw,
            content_start: offset,
            self_closing: raw.ends_with('/'),
        });
    }
    tags
}
