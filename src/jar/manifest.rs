//! Parser for the `Name: value` format shared by `META-INF/MANIFEST.MF` and
//! the `.SF` signature files.
//!
//! A file is a main section followed by per-entry sections, separated by
//! blank lines. Long values wrap onto continuation lines that start with a
//! single space. Signature files hash sections byte for byte, so each
//! [`Section`] keeps the exact bytes it was parsed from.

use crate::jar::digest::DigestAlgorithm;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    attributes: Vec<(String, String)>,
    raw: Vec<u8>,
}

impl Section {
    /// Attribute value, names compared case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The `Name` attribute of a per-entry section
    pub fn name(&self) -> Option<&str> {
        self.get("Name")
    }

    /// Exact bytes of the section including its terminating blank line
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Digests stored under `<ALG><suffix>` attributes in a supported
    /// algorithm.
    pub fn digests(&self, suffix: &str) -> Vec<(DigestAlgorithm, &str)> {
        self.attributes
            .iter()
            .filter_map(|(key, value)| {
                DigestAlgorithm::from_attribute(key, suffix).map(|alg| (alg, value.as_str()))
            })
            .collect()
    }

    /// True when at least one supported digest is present and all of them
    /// match `data`.
    pub fn verify_digests(&self, suffix: &str, data: &[u8]) -> bool {
        let digests = self.digests(suffix);
        !digests.is_empty() && digests.iter().all(|(alg, value)| alg.matches(data, value))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub main: Section,
    entries: HashMap<String, Section>,
    raw: Vec<u8>,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        let mut sections = split_sections(bytes).into_iter();
        let main = match sections.next() {
            Some(raw) => parse_section(raw)?,
            None => Section::default(),
        };

        let mut entries = HashMap::new();
        for raw in sections {
            let section = parse_section(raw)?;
            if section.attributes.is_empty() {
                continue;
            }
            let name = section
                .name()
                .ok_or_else(|| "entry section without a Name attribute".to_string())?
                .to_string();
            // Later duplicates win, as in the JDK
            entries.insert(name, section);
        }

        Ok(Self {
            main,
            entries,
            raw: bytes.to_vec(),
        })
    }

    pub fn entry(&self, name: &str) -> Option<&Section> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.entries.iter().map(|(name, section)| (name.as_str(), section))
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// Byte ranges of each section, the blank line terminating a section is
/// kept with it.
fn split_sections(bytes: &[u8]) -> Vec<&[u8]> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        let (line_end, next) = line_bounds(bytes, pos);
        if line_end == pos {
            // Blank line closes the current section
            if pos > start {
                sections.push(&bytes[start..next]);
            }
            start = next;
        }
        pos = next;
    }
    if start < bytes.len() {
        sections.push(&bytes[start..]);
    }

    sections
}

/// End of the line starting at `pos` (without terminator) and start of the
/// following line.
fn line_bounds(bytes: &[u8], pos: usize) -> (usize, usize) {
    let mut end = pos;
    while end < bytes.len() && bytes[end] != b'\n' && bytes[end] != b'\r' {
        end += 1;
    }
    let next = match (bytes.get(end), bytes.get(end + 1)) {
        (Some(b'\r'), Some(b'\n')) => end + 2,
        (Some(_), _) => end + 1,
        (None, _) => end,
    };
    (end, next)
}

fn parse_section(raw: &[u8]) -> Result<Section, String> {
    let text = std::str::from_utf8(raw).map_err(|e| format!("manifest is not UTF-8: {e}"))?;

    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix(' ') {
            let previous = lines
                .last_mut()
                .ok_or_else(|| "continuation line without a header".to_string())?;
            previous.push_str(rest);
        } else {
            lines.push(line.to_string());
        }
    }

    let attributes = lines
        .into_iter()
        .map(|line| {
            let (key, value) = line
                .split_once(": ")
                .or_else(|| line.split_once(':'))
                .ok_or_else(|| format!("invalid header '{line}'"))?;
            Ok((key.trim().to_string(), value.to_string()))
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(Section {
        attributes,
        raw: raw.to_vec(),
    })
}
