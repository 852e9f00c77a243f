//! Filename generator for the rename step.
//!
//! Templates use `{placeholder}` fields filled from a [`MetadataModel`], e.g.
//! `"{title} ({year})"` or `"{id}_{title}"`.

use crate::models::metadata::MetadataModel;
use crate::{Error, Result};
use regex::Regex;

/// Placeholders understood by [`render_template`].
pub const PLACEHOLDERS: &[&str] = &[
    "title",
    "original_title",
    "year",
    "id",
    "mpaa",
    "premiered",
    "studio",
    "director",
    "genre",
    "rating",
];

#[derive(Debug, PartialEq)]
enum Piece<'a> {
    Literal(&'a str),
    Field(&'a str),
}

fn parse_template(template: &str) -> Result<Vec<Piece<'_>>> {
    let mut pieces = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find(['{', '}']) {
        if rest.as_bytes()[open] == b'}' {
            return Err(Error::Template(format!("unmatched '}}' in \"{}\"", template)));
        }
        if open > 0 {
            pieces.push(Piece::Literal(&rest[..open]));
        }
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| Error::Template(format!("unclosed '{{' in \"{}\"", template)))?;
        let name = &after[..close];
        if !PLACEHOLDERS.contains(&name) {
            return Err(Error::Template(format!("unknown placeholder {{{}}}", name)));
        }
        pieces.push(Piece::Field(name));
        rest = &after[close + 1..];
    }
    if !rest.is_empty() {
        pieces.push(Piece::Literal(rest));
    }

    Ok(pieces)
}

/// Check a template without rendering it.
pub fn validate_template(template: &str) -> Result<()> {
    parse_template(template).map(|_| ())
}

fn field_value(model: &MetadataModel, name: &str) -> String {
    let first = |values: &[String]| values.first().cloned().unwrap_or_default();
    match name {
        "title" => model.title.clone(),
        "original_title" => model.original_title.clone().unwrap_or_default(),
        "year" if model.year > 0 => model.year.to_string(),
        "id" => model.id.clone().unwrap_or_default(),
        "mpaa" => model.mpaa.clone().unwrap_or_default(),
        "premiered" => model.premiered.clone().unwrap_or_default(),
        "studio" => first(&model.studios),
        "director" => first(&model.directors),
        "genre" => first(&model.genres),
        "rating" => model.rating.map(|r| format!("{:.1}", r)).unwrap_or_default(),
        _ => String::new(),
    }
}

/// Render a rename template into a file stem.
///
/// Missing values render empty; brackets left empty by them and doubled
/// spaces are removed. Path separators and other reserved characters are
/// replaced with `_`.
pub fn render_template(template: &str, model: &MetadataModel) -> Result<String> {
    let mut rendered = String::new();
    for piece in parse_template(template)? {
        match piece {
            Piece::Literal(s) => rendered.push_str(s),
            Piece::Field(name) => rendered.push_str(&sanitize_filename(&field_value(model, name))),
        }
    }

    let stem = tidy(&rendered);
    if stem.is_empty() {
        return Err(Error::Template(format!(
            "\"{}\" renders to an empty name for \"{}\"",
            template, model.title
        )));
    }
    Ok(stem)
}

fn tidy(s: &str) -> String {
    let mut out = s.replace("()", "").replace("[]", "");
    while out.contains("  ") {
        out = out.replace("  ", " ");
    }
    out.trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == '.')
        .to_string()
}

/// Whether `stem` already satisfies the naming policy.
///
/// A stem is well-formed when it equals the rendered stem or matches the
/// configured pattern.
pub fn is_well_formed(stem: &str, rendered: &str, pattern: Option<&Regex>) -> bool {
    normalize_title(stem) == normalize_title(rendered)
        || pattern.is_some_and(|re| re.is_match(stem))
}

/// Sanitize a string for use in filenames.
pub fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect()
}

/// Normalize title for comparison.
fn normalize_title(s: &str) -> String {
    s.trim().to_lowercase()
}
