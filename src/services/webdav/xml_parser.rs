//! Tolerant parser for WebDAV multi-status (`207`) bodies.
//!
//! Elements are matched by local name, so `D:`, `d:`, `lp1:` and default
//! namespace declarations from Nextcloud, ownCloud, Synology or Apache all
//! parse the same way. Parsing is fail-soft: a `<response>` without an href
//! or without a `200` propstat is dropped, unparseable properties fall back
//! to defaults, and a document that is not XML at all yields no entries.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use crate::models::{ResourceDescriptor, DEFAULT_FILE_CONTENT_TYPE, DIRECTORY_CONTENT_TYPE};
use crate::utils::path;

use super::common::{clean_etag, parse_status_line, strip_origin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropField {
    ContentLength,
    LastModified,
    ContentType,
    ETag,
    CreationDate,
    DisplayName,
    Permissions,
}

impl PropField {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"getcontentlength" => Some(PropField::ContentLength),
            b"getlastmodified" => Some(PropField::LastModified),
            b"getcontenttype" => Some(PropField::ContentType),
            b"getetag" => Some(PropField::ETag),
            b"creationdate" => Some(PropField::CreationDate),
            b"displayname" => Some(PropField::DisplayName),
            b"permissions" => Some(PropField::Permissions),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RawProps {
    is_collection: bool,
    content_length: Option<String>,
    last_modified: Option<String>,
    content_type: Option<String>,
    etag: Option<String>,
    creation_date: Option<String>,
    display_name: Option<String>,
    permissions: Option<String>,
}

impl RawProps {
    fn set(&mut self, field: PropField, value: String) {
        let slot = match field {
            PropField::ContentLength => &mut self.content_length,
            PropField::LastModified => &mut self.last_modified,
            PropField::ContentType => &mut self.content_type,
            PropField::ETag => &mut self.etag,
            PropField::CreationDate => &mut self.creation_date,
            PropField::DisplayName => &mut self.display_name,
            PropField::Permissions => &mut self.permissions,
        };
        *slot = Some(value);
    }
}

#[derive(Debug, Default)]
struct PropstatBuilder {
    status: Option<u16>,
    props: RawProps,
}

#[derive(Debug, Default)]
struct ResponseBuilder {
    href: Option<String>,
    propstats: Vec<PropstatBuilder>,
}

/// What the text of the currently open element should be stored as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Href,
    Status,
    Prop(PropField),
}

/// Parse a multi-status body into resource descriptors, in document order
pub fn parse_multistatus(xml: &str) -> Vec<ResourceDescriptor> {
    let mut reader = Reader::from_str(xml);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;

    let mut descriptors = Vec::new();
    // Local names of the currently open elements
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut response: Option<ResponseBuilder> = None;
    let mut propstat: Option<PropstatBuilder> = None;
    let mut capture: Option<(Capture, usize)> = None;
    let mut text = String::new();
    let mut dropped = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let local = e.local_name().as_ref().to_vec();
                let parent = stack.last().map(|p| p.as_slice());
                on_element_open(&local, parent, &mut response, &mut propstat, &mut capture, stack.len() + 1, &mut text);
                stack.push(local);
            }
            Ok(Event::Empty(ref e)) => {
                let local = e.local_name().as_ref().to_vec();
                let parent = stack.last().map(|p| p.as_slice());
                // An empty element only matters as a resourcetype marker
                if local.as_slice() == b"collection" && parent == Some(b"resourcetype".as_slice()) {
                    if let Some(ref mut ps) = propstat {
                        ps.props.is_collection = true;
                    }
                }
                if local.as_slice() == b"response" {
                    dropped += 1;
                }
            }
            Ok(Event::Text(ref e)) => {
                if capture.is_some() {
                    match e.unescape() {
                        Ok(value) => text.push_str(&value),
                        Err(_) => text.push_str(&String::from_utf8_lossy(e)),
                    }
                }
            }
            Ok(Event::CData(ref e)) => {
                if capture.is_some() {
                    text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::End(_)) => {
                let depth = stack.len();
                let local = match stack.pop() {
                    Some(local) => local,
                    None => continue,
                };

                if let Some((target, open_depth)) = capture {
                    if open_depth == depth {
                        let value = std::mem::take(&mut text).trim().to_string();
                        store_capture(target, value, &mut response, &mut propstat);
                        capture = None;
                    }
                }

                match local.as_slice() {
                    b"propstat" => {
                        if let (Some(r), Some(ps)) = (response.as_mut(), propstat.take()) {
                            r.propstats.push(ps);
                        }
                    }
                    b"response" => {
                        if let Some(r) = response.take() {
                            match build_descriptor(r) {
                                Some(descriptor) => descriptors.push(descriptor),
                                None => dropped += 1,
                            }
                        }
                        propstat = None;
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(
                    "Malformed multi-status XML at position {}: {}; keeping {} parsed entries",
                    reader.buffer_position(),
                    e,
                    descriptors.len()
                );
                break;
            }
            _ => {}
        }
    }

    if dropped > 0 {
        debug!("Dropped {} multi-status entries without usable properties", dropped);
    }
    debug!("Parsed {} resources from multi-status response", descriptors.len());
    descriptors
}

fn on_element_open(
    local: &[u8],
    parent: Option<&[u8]>,
    response: &mut Option<ResponseBuilder>,
    propstat: &mut Option<PropstatBuilder>,
    capture: &mut Option<(Capture, usize)>,
    depth: usize,
    text: &mut String,
) {
    let mut begin = |target: Capture| {
        text.clear();
        *capture = Some((target, depth));
    };

    match (local, parent) {
        (b"response", _) => {
            *response = Some(ResponseBuilder::default());
            *propstat = None;
        }
        (b"href", Some(b"response")) if response.is_some() => begin(Capture::Href),
        (b"propstat", Some(b"response")) if response.is_some() => {
            *propstat = Some(PropstatBuilder::default());
        }
        (b"status", Some(b"propstat")) if propstat.is_some() => begin(Capture::Status),
        (b"collection", Some(b"resourcetype")) => {
            if let Some(ref mut ps) = propstat {
                ps.props.is_collection = true;
            }
        }
        (name, Some(b"prop")) if propstat.is_some() => {
            if let Some(field) = PropField::from_local_name(name) {
                begin(Capture::Prop(field));
            }
        }
        _ => {}
    }
}

fn store_capture(
    target: Capture,
    value: String,
    response: &mut Option<ResponseBuilder>,
    propstat: &mut Option<PropstatBuilder>,
) {
    match target {
        Capture::Href => {
            if let Some(ref mut r) = response {
                r.href = Some(value);
            }
        }
        Capture::Status => {
            if let Some(ref mut ps) = propstat {
                ps.status = parse_status_line(&value);
            }
        }
        Capture::Prop(field) => {
            if value.is_empty() {
                return;
            }
            if let Some(ref mut ps) = propstat {
                ps.props.set(field, value);
            }
        }
    }
}

fn build_descriptor(response: ResponseBuilder) -> Option<ResourceDescriptor> {
    let raw_href = response.href.filter(|h| !h.trim().is_empty())?;
    let ok = response
        .propstats
        .into_iter()
        .find(|ps| ps.status == Some(200))?;
    let props = ok.props;

    let href = path::decode(raw_href.trim());
    let name = strip_origin(&href)
        .split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .unwrap_or("")
        .to_string();

    let is_collection = props.is_collection;
    let size_bytes = if is_collection {
        Some(0)
    } else {
        props
            .content_length
            .as_deref()
            .and_then(|len| len.trim().parse::<u64>().ok())
    };

    let last_modified = props
        .last_modified
        .as_deref()
        .and_then(parse_http_date)
        .unwrap_or_else(Utc::now);
    let created_at = props
        .creation_date
        .as_deref()
        .and_then(parse_http_date)
        .unwrap_or(last_modified);

    let content_type = props.content_type.unwrap_or_else(|| {
        if is_collection {
            DIRECTORY_CONTENT_TYPE.to_string()
        } else {
            DEFAULT_FILE_CONTENT_TYPE.to_string()
        }
    });

    let display_name = props
        .display_name
        .filter(|display| !display.is_empty() && *display != name);

    Some(ResourceDescriptor {
        href,
        name,
        is_collection,
        size_bytes,
        last_modified,
        created_at,
        content_type,
        etag: props.etag.as_deref().and_then(clean_etag),
        display_name,
        permissions: props.permissions,
    })
}

/// Parse RFC 1123 (`getlastmodified`) or RFC 3339 (`creationdate`) timestamps
fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Build a PROPFIND body: `allprop` when `properties` is empty, else an explicit `prop` list.
///
/// Unprefixed names are `DAV:` properties; `oc:`/`nc:` prefixes select the
/// ownCloud and Nextcloud namespaces.
pub fn build_propfind_request_body(properties: &[&str]) -> String {
    if properties.is_empty() {
        return r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:allprop/>
</d:propfind>"#
            .to_string();
    }

    let mut body = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns" xmlns:nc="http://nextcloud.org/ns">
  <d:prop>
"#,
    );
    for property in properties {
        if property.contains(':') {
            body.push_str(&format!("    <{}/>\n", property));
        } else {
            body.push_str(&format!("    <d:{}/>\n", property));
        }
    }
    body.push_str("  </d:prop>\n</d:propfind>");
    body
}
