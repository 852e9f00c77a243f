//! NFO (XML sidecar) reader.
//!
//! Parses Kodi-style NFO documents into a [`MetadataModel`]. The document is
//! read into a small element tree with `quick-xml`; fields are then taken
//! from the direct children of the root element. Root-less fragments such as
//! `<title>Foo</title><year>2020</year>` are accepted as well.

use crate::models::config::ReaderConfig;
use crate::models::metadata::{Actor, MetadataModel};
use crate::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root elements of the supported NFO flavours.
const ROOT_ELEMENTS: &[&str] = &["movie", "tvshow", "episodedetails", "musicvideo"];

/// Elements read from the root.
const FIELD_ELEMENTS: &[&str] = &[
    "title",
    "originaltitle",
    "sorttitle",
    "tagline",
    "plot",
    "outline",
    "year",
    "rating",
    "ratings",
    "mpaa",
    "premiered",
    "releasedate",
    "aired",
    "runtime",
    "id",
    "num",
    "uniqueid",
    "genre",
    "actor",
    "director",
    "writer",
    "credits",
    "studio",
];

/// How source ratings map onto the 0-10 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingScale {
    /// Source ratings are out of 5 and are always doubled.
    #[default]
    FivePoint,
    /// Values up to 5 are doubled, larger values are kept.
    Auto,
    /// Source ratings are already out of 10.
    TenPoint,
}

impl RatingScale {
    /// Map a raw rating to [0, 10]. NaN and negative values become 0.
    pub fn normalize(self, raw: f32) -> f32 {
        if raw.is_nan() || raw <= 0.0 {
            return 0.0;
        }
        let scaled = match self {
            RatingScale::FivePoint => raw * 2.0,
            RatingScale::Auto if raw <= 5.0 => raw * 2.0,
            RatingScale::Auto | RatingScale::TenPoint => raw,
        };
        clamp_rating(scaled)
    }
}

impl std::str::FromStr for RatingScale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "five_point" | "5" => Ok(RatingScale::FivePoint),
            "auto" => Ok(RatingScale::Auto),
            "ten_point" | "10" => Ok(RatingScale::TenPoint),
            other => Err(format!("unknown rating scale: {}", other)),
        }
    }
}

fn clamp_rating(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 10.0)
    }
}

/// Element with its attributes, direct text and child elements.
#[derive(Debug, Default)]
struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// NFO reader.
pub struct NfoReader {
    config: ReaderConfig,
}

impl NfoReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read and parse an NFO file.
    pub fn read_file(&self, path: &Path) -> Result<MetadataModel> {
        let bytes = std::fs::read(path)?;
        self.parse_bytes(&bytes)
    }

    /// Parse raw NFO bytes: UTF-8 (optionally with BOM) or UTF-16 with BOM.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<MetadataModel> {
        let text = decode_source(bytes)?;
        self.parse(&text)
    }

    /// Parse an NFO document.
    pub fn parse(&self, xml: &str) -> Result<MetadataModel> {
        let nodes = build_tree(xml)?;
        if nodes.is_empty() {
            return Err(Error::MalformedSource("no root element".to_string()));
        }

        // A lone element with children (or a known root name) is the root;
        // otherwise the top-level elements are the fields themselves.
        let (root_name, fields): (Option<&str>, &[Node]) = match nodes.as_slice() {
            [root] if ROOT_ELEMENTS.contains(&root.name.as_str()) || !root.children.is_empty() => {
                (Some(root.name.as_str()), root.children.as_slice())
            }
            _ => (None, nodes.as_slice()),
        };

        let known_root = root_name.is_some_and(|n| ROOT_ELEMENTS.contains(&n));
        if !known_root && !fields.iter().any(|n| FIELD_ELEMENTS.contains(&n.name.as_str())) {
            return Err(Error::UnsupportedSchema(format!(
                "no metadata elements under <{}>",
                root_name.unwrap_or(nodes[0].name.as_str())
            )));
        }

        let model = self.extract(fields);
        tracing::debug!(
            "Parsed NFO: \"{}\" ({}), {} actors",
            model.title,
            model.year,
            model.actors.len()
        );
        Ok(model)
    }

    fn extract(&self, fields: &[Node]) -> MetadataModel {
        let first = |name: &str| -> Option<String> {
            fields
                .iter()
                .filter(|n| n.name == name)
                .find_map(|n| clean_text(&n.text))
        };
        let first_of = |names: &[&str]| names.iter().find_map(|name| first(*name));

        let mut model = MetadataModel {
            title: first("title").unwrap_or_else(|| self.config.title_placeholder.clone()),
            original_title: first("originaltitle"),
            sort_title: first("sorttitle"),
            tagline: first("tagline"),
            plot: first_of(&["plot", "outline"]),
            mpaa: first("mpaa"),
            premiered: first_of(&["premiered", "releasedate", "aired"]),
            runtime: first("runtime").and_then(|s| leading_number(&s)).filter(|&n| n > 0),
            ..Default::default()
        };

        model.year = first("year")
            .and_then(|s| leading_number(&s))
            .filter(|&y| y > 0)
            .or_else(|| model.premiered.as_deref().and_then(year_prefix))
            .unwrap_or(0);

        model.rating = first("rating")
            .and_then(|s| parse_float(&s))
            .map(|raw| self.config.rating_scale.normalize(raw))
            .or_else(|| self.kodi_rating(fields));

        model.id = first_of(&["id", "num"]).or_else(|| uniqueid(fields));

        for node in fields {
            match node.name.as_str() {
                "genre" => model.genres.extend(clean_text(&node.text)),
                "director" => model.directors.extend(clean_text(&node.text)),
                "writer" | "credits" => model.writers.extend(clean_text(&node.text)),
                "studio" => model.studios.extend(clean_text(&node.text)),
                "actor" => {
                    if let Some(name) = node.child("name").and_then(|n| clean_text(&n.text)) {
                        model.actors.push(Actor::new(name));
                    }
                }
                _ => {}
            }
        }

        model
    }

    /// `<ratings><rating default="true" max="10"><value>7.8</value></rating></ratings>`
    fn kodi_rating(&self, fields: &[Node]) -> Option<f32> {
        let ratings = fields.iter().find(|n| n.name == "ratings")?;
        let candidates: Vec<&Node> = ratings.children.iter().filter(|n| n.name == "rating").collect();
        let chosen = candidates
            .iter()
            .find(|n| n.attr("default") == Some("true"))
            .or_else(|| candidates.first())?;

        let raw = chosen.child("value").and_then(|v| parse_float(&v.text))?;
        match chosen.attr("max").and_then(parse_float) {
            Some(max) if max > 0.0 => Some(clamp_rating(raw.max(0.0) * 10.0 / max)),
            _ => Some(self.config.rating_scale.normalize(raw)),
        }
    }
}

fn uniqueid(fields: &[Node]) -> Option<String> {
    let ids: Vec<&Node> = fields.iter().filter(|n| n.name == "uniqueid").collect();
    ids.iter()
        .find(|n| n.attr("default") == Some("true"))
        .and_then(|n| clean_text(&n.text))
        .or_else(|| ids.iter().find_map(|n| clean_text(&n.text)))
}

/// Trim and strip control characters other than newline and tab.
/// Empty results become `None`.
pub fn clean_text(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|&c| !c.is_control() || c == '\n' || c == '\t')
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `"7,5"` and `"7.5"` both parse.
fn parse_float(s: &str) -> Option<f32> {
    s.trim().replace(',', ".").parse::<f32>().ok()
}

/// `"120 min"` -> 120.
fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// `"2020-05-01"` -> 2020.
fn year_prefix(s: &str) -> Option<u32> {
    let prefix = s.trim().get(..4)?;
    if prefix.chars().all(|c| c.is_ascii_digit()) {
        prefix.parse().ok().filter(|&y| y > 0)
    } else {
        None
    }
}

fn decode_source(bytes: &[u8]) -> Result<String> {
    let utf16 = |body: &[u8], to_unit: fn([u8; 2]) -> u16| -> Result<String> {
        if body.len() % 2 != 0 {
            return Err(Error::MalformedSource("odd-length UTF-16 document".to_string()));
        }
        let units: Vec<u16> = body.chunks_exact(2).map(|p| to_unit([p[0], p[1]])).collect();
        String::from_utf16(&units)
            .map_err(|_| Error::MalformedSource("invalid UTF-16 document".to_string()))
    };

    match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => std::str::from_utf8(rest)
            .map(str::to_string)
            .map_err(|e| Error::MalformedSource(format!("invalid UTF-8: {}", e))),
        [0xFF, 0xFE, rest @ ..] => utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, u16::from_be_bytes),
        _ => std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| Error::MalformedSource(format!("invalid UTF-8: {}", e))),
    }
}

fn build_tree(xml: &str) -> Result<Vec<Node>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    reader.expand_empty_elements(true);

    let mut roots: Vec<Node> = Vec::new();
    let mut stack: Vec<Node> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                let mut attrs = Vec::new();
                for attr in e.attributes() {
                    let attr = attr.map_err(|err| Error::MalformedSource(err.to_string()))?;
                    let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_lowercase();
                    let mut value = attr.unescape_value()?.trim().to_string();
                    // default="True" and friends
                    if key == "default" {
                        value = value.to_lowercase();
                    }
                    attrs.push((key, value));
                }
                stack.push(Node {
                    name,
                    attrs,
                    ..Default::default()
                });
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                let node = stack.pop().ok_or_else(|| {
                    Error::MalformedSource(format!("unexpected closing tag </{}>", name))
                })?;
                if node.name != name {
                    return Err(Error::MalformedSource(format!(
                        "expected </{}>, found </{}>",
                        node.name, name
                    )));
                }
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => roots.push(node),
                }
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::MalformedSource(format!("unclosed element <{}>", open.name)));
    }
    Ok(roots)
}
