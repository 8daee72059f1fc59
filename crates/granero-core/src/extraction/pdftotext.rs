use crate::error::GraneroError;
use crate::extraction::{PositionedToken, TextExtractor};
use std::io::Write;
use std::process::Command;
use tracing::debug;

/// PDF extraction backend using pdftotext (from poppler-utils).
///
/// Uses `pdftotext -bbox` so every word comes with its page position.
pub struct PdftotextExtractor;

impl PdftotextExtractor {
    pub fn new() -> Self {
        PdftotextExtractor
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for PdftotextExtractor {
    fn extract_tokens(&self, document: &[u8]) -> Result<Vec<PositionedToken>, GraneroError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| GraneroError::Extraction(e.to_string()))?;
        tmpfile
            .write_all(document)
            .map_err(|e| GraneroError::Extraction(e.to_string()))?;

        let output = Command::new("pdftotext")
            .arg("-bbox")
            .arg(tmpfile.path())
            .arg("-") // output to stdout
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GraneroError::PdftotextNotFound
                } else {
                    GraneroError::Extraction(format!("pdftotext -bbox failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(GraneroError::PdftotextFailed { code, stderr });
        }

        let xml = String::from_utf8_lossy(&output.stdout);
        let tokens = parse_bbox_words(&xml);
        debug!(words = tokens.len(), "pdftotext extracted words");
        Ok(tokens)
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

/// Read the `<word>` boxes of `pdftotext -bbox` output. Pages are numbered
/// in the order their `<page>` tags appear.
fn parse_bbox_words(xml: &str) -> Vec<PositionedToken> {
    let mut out = Vec::new();
    let mut page = 0;

    for raw in xml.lines() {
        let line = raw.trim();

        if line.starts_with("<page ") || line == "<page>" {
            page += 1;
            continue;
        }

        if !line.starts_with("<word ") || page == 0 {
            continue;
        }

        let (Some(x_min), Some(y_min), Some(x_max)) = (
            parse_attr_f32(line, "xMin"),
            parse_attr_f32(line, "yMin"),
            parse_attr_f32(line, "xMax"),
        ) else {
            continue;
        };
        let Some(text) = parse_word_text(line) else {
            continue;
        };
        let text = decode_xml_entities(text).trim().to_string();
        if text.is_empty() {
            continue;
        }

        out.push(PositionedToken {
            page,
            x: x_min,
            y: y_min,
            width: (x_max - x_min).max(0.0),
            text,
        });
    }

    out
}

fn parse_attr_f32(tag: &str, name: &str) -> Option<f32> {
    parse_attr(tag, name)?.parse().ok()
}

fn parse_attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!(" {}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let rest = tag.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end)
}

fn parse_word_text(word_tag: &str) -> Option<&str> {
    let start = word_tag.find('>')? + 1;
    let end = word_tag.rfind("</word>")?;
    word_tag.get(start..end)
}

fn decode_xml_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
