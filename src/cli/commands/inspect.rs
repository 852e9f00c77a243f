//! Inspect command implementation.

use crate::codec::{self, tags, Entry};
use crate::Result;
use colored::Colorize;
use std::path::Path;

fn label(tag: u64, name: Option<&'static str>) -> String {
    match name {
        Some(name) => format!("{} (0x{:02X})", name, tag),
        None => format!("0x{:02X}", tag),
    }
}

fn print_entry(entry: &Entry, indent: usize, in_group: bool) {
    let pad = " ".repeat(indent);
    match entry {
        Entry::Field { tag, value } => {
            let name = if in_group {
                tags::group_tag_name(*tag)
            } else {
                tags::tag_name(*tag)
            };
            println!("{}{:<28} {}", pad, label(*tag, name), value);
        }
        Entry::Group { tag, entries } => {
            println!("{}{}", pad, label(*tag, tags::tag_name(*tag)).bold());
            for child in entries {
                print_entry(child, indent + 2, true);
            }
        }
        Entry::Opaque { tag, payload } => {
            println!(
                "{}{:<28} {}",
                pad,
                label(*tag, None).yellow(),
                format!("<unknown, {} bytes>", payload.len()).dimmed()
            );
        }
    }
}

/// Decode a VSMETA file and print its entries.
pub fn inspect(config_path: Option<&Path>, file: &Path, json: bool) -> Result<()> {
    let config = super::load_settings(config_path, None)?;
    let bytes = std::fs::read(file)?;
    let record = codec::decode_with_limit(&bytes, config.codec.max_varint_bytes)?;

    if json {
        let model = record.to_model()?;
        println!("{}", serde_json::to_string_pretty(&model)?);
        return Ok(());
    }

    println!("{} {}", "[INSPECT]".bold().cyan(), file.display());
    println!(
        "  {} {} (tag table v{})",
        "Edition:".bold(),
        record.edition,
        tags::TAG_TABLE_VERSION
    );
    println!("  {} {}", "Size:".bold(), bytes.len());
    println!("  {} {}", "Entries:".bold(), record.entries.len());
    if record.terminated {
        println!("  {} yes", "Terminated:".bold());
    }
    println!();

    for entry in &record.entries {
        print_entry(entry, 2, false);
    }
    println!();

    match record.verify_checksums() {
        Ok(()) => println!("{} artwork checksums", "[OK]".green()),
        Err(e) => println!("{} {}", "[MISMATCH]".red(), e),
    }

    let opaque = record.opaque_count();
    if opaque > 0 {
        println!("{} {} unknown entries preserved", "[INFO]".yellow(), opaque);
    }

    if codec::encode_record(&record)? == bytes {
        println!("{} re-encodes byte for byte", "[OK]".green());
    } else {
        println!("{} re-encoding differs from the file", "[WARN]".yellow());
    }

    Ok(())
}
