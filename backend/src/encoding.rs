// Character encoding detection for TEI entry files
// BOM first, then the XML declaration, then UTF-8. Output is UTF-8 with LF line endings.

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use lazy_static::lazy_static;
use regex::bytes::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::logger;

lazy_static! {
    static ref RE_XML_DECL_ENCODING: Regex =
        Regex::new(r#"^\s*<\?xml[^>]*?\sencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#).unwrap();
}

/// Reads an XML file and decodes it to UTF-8 with Unix line endings
pub fn read_xml_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .with_context(|| format!("Failed to read file: {:?}", path))?;

    let text = decode_xml_bytes(&bytes);
    if text.had_errors {
        logger::warn(&format!("Encoding errors detected while decoding {:?}", path));
    }
    logger::debug(&format!(
        "File: {:?}, Encoding: {}, BOM: {}",
        path.file_name().unwrap_or_default(),
        text.encoding.name(),
        text.has_bom
    ));

    Ok(text.content)
}

pub struct DecodedXml {
    pub content: String,
    pub encoding: &'static Encoding,
    pub has_bom: bool,
    pub had_errors: bool,
}

pub fn decode_xml_bytes(bytes: &[u8]) -> DecodedXml {
    let (encoding, bom_len) = match detect_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, bom_len),
        None => (declared_encoding(bytes).unwrap_or(UTF_8), 0),
    };

    let (decoded, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);

    DecodedXml {
        content: decoded.replace("\r\n", "\n"),
        encoding,
        has_bom: bom_len > 0,
        had_errors,
    }
}

/// Encoding and byte length of a byte order mark, if present
fn detect_bom(bytes: &[u8]) -> Option<(&'static Encoding, usize)> {
    match bytes {
        [0xFF, 0xFE, ..] => Some((UTF_16LE, 2)),
        [0xFE, 0xFF, ..] => Some((UTF_16BE, 2)),
        [0xEF, 0xBB, 0xBF, ..] => Some((UTF_8, 3)),
        _ => None,
    }
}

/// The `encoding="..."` label of an XML declaration, if it names a known encoding.
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let caps = RE_XML_DECL_ENCODING.captures(bytes)?;
    let label = caps.get(1)?.as_bytes();
    let encoding = Encoding::for_label(label);
    if encoding.is_none() {
        logger::warn(&format!(
            "Unknown encoding in XML declaration: {}",
            String::from_utf8_lossy(label)
        ));
    }
    // UTF-16 labels on BOM-less ASCII-readable input can't be right
    encoding.filter(|e| *e != UTF_16LE && *e != UTF_16BE)
}
