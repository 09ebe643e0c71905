//! MusicXML reader: parses either a raw `.musicxml`/`.xml` document or a
//! compressed `.mxl` container, then converts it into the engine's IR
//! (§4.2, §6 "reads .xml, .musicxml and .mxl").

pub mod converter;
pub mod errors;
pub mod parser;
pub mod types;

use crate::domain::errors::Diagnostics;
use crate::domain::movement::Movement;
use errors::{ImportError, ImportWarning};
use std::io::Read;
use std::path::Path;

pub struct MusicXmlReader;

impl MusicXmlReader {
    /// Read a MusicXML source from a byte buffer, auto-detecting whether it
    /// is a raw XML document or a ZIP (`.mxl`) container by magic number.
    pub fn read_bytes(
        bytes: &[u8],
        diagnostics: &mut Diagnostics,
    ) -> Result<(Movement, Vec<ImportWarning>), ImportError> {
        let xml = if bytes.starts_with(b"PK\x03\x04") {
            Self::extract_mxl(bytes)?
        } else {
            Self::decode_text(bytes)
        };
        let score = parser::parse_score_partwise(&xml)?;
        Ok(converter::convert(&score, diagnostics))
    }

    pub fn read_path(path: &Path, diagnostics: &mut Diagnostics) -> Result<(Movement, Vec<ImportWarning>), ImportError> {
        let bytes = std::fs::read(path)?;
        Self::read_bytes(&bytes, diagnostics)
    }

    /// `.mxl` is a ZIP archive containing a `META-INF/container.xml` that
    /// points at the actual score entry; rather than parse the pointer file
    /// (most real-world files have exactly one `.musicxml`/`.xml` entry at
    /// the top level), pick the first non-META-INF XML entry.
    fn extract_mxl(bytes: &[u8]) -> Result<String, ImportError> {
        let cursor = std::io::Cursor::new(bytes);
        let mut archive = zip::ZipArchive::new(cursor).map_err(|e| ImportError::Archive(e.to_string()))?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| ImportError::Archive(e.to_string()))?;
            let name = entry.name().to_string();
            if name.starts_with("META-INF/") || !name.ends_with(".xml") && !name.ends_with(".musicxml") {
                continue;
            }
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf).map_err(ImportError::Io)?;
            return Ok(Self::decode_text(&buf));
        }
        Err(ImportError::Archive("no score entry found in .mxl container".into()))
    }

    /// Decode raw bytes as UTF-8, falling back to the XML prolog's declared
    /// encoding (commonly `ISO-8859-1` or `Windows-1252` in older exports)
    /// when the bytes aren't valid UTF-8.
    fn decode_text(bytes: &[u8]) -> String {
        if let Ok(s) = std::str::from_utf8(bytes) {
            return s.to_string();
        }
        let declared = declared_encoding(bytes);
        let encoding = declared
            .and_then(|name| encoding_rs::Encoding::for_label(name.as_bytes()))
            .unwrap_or(encoding_rs::WINDOWS_1252);
        let (decoded, _, _) = encoding.decode(bytes);
        decoded.into_owned()
    }
}

fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    let marker = "encoding=\"";
    let start = head.find(marker)? + marker.len();
    let end = head[start..].find('"')? + start;
    Some(head[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_plain_utf8_document() {
        let xml = r#"<score-partwise>
          <part id="P1"><measure number="1">
            <attributes><divisions>1</divisions></attributes>
            <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
          </measure></part>
        </score-partwise>"#;
        let mut diagnostics = Diagnostics::new(None);
        let (movement, _) = MusicXmlReader::read_bytes(xml.as_bytes(), &mut diagnostics).unwrap();
        assert_eq!(movement.stave_count(), 1);
    }

    #[test]
    fn declared_encoding_is_parsed_from_the_xml_prolog() {
        let head = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><score-partwise/>";
        assert_eq!(declared_encoding(head).as_deref(), Some("ISO-8859-1"));
    }
}
