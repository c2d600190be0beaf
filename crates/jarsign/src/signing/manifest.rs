//! `META-INF/MANIFEST.MF` and `<NAME>.SF` handling.
//!
//! Sections are lists of `Name: value` attributes separated by blank lines.
//! Lines are at most 72 bytes; longer values continue on lines that start
//! with a single space.

use std::ops::Range;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::SigningError;
use crate::request::DigestAlgorithm;

const MAX_LINE_BYTES: usize = 72;
const NEWLINE: &[u8] = b"\r\n";

pub const MANIFEST_VERSION: &str = "Manifest-Version";
pub const SIGNATURE_VERSION: &str = "Signature-Version";
pub const CREATED_BY: &str = "Created-By";
pub const NAME: &str = "Name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

type Section = Vec<Attribute>;

fn find<'a>(section: &'a [Attribute], name: &str) -> Option<&'a str> {
    section
        .iter()
        .find(|attr| attr.name.eq_ignore_ascii_case(name))
        .map(|attr| attr.value.as_str())
}

fn set(section: &mut Section, name: &str, value: String) {
    match section
        .iter_mut()
        .find(|attr| attr.name.eq_ignore_ascii_case(name))
    {
        Some(attr) => attr.value = value,
        None => section.push(Attribute::new(name, value)),
    }
}

fn digest_attribute(digest: DigestAlgorithm) -> String {
    format!("{}-Digest", digest.manifest_name())
}

/// A parsed JAR manifest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    main: Section,
    /// Per-entry sections; each starts with its `Name` attribute.
    entries: Vec<Section>,
}

impl Manifest {
    /// A fresh manifest with only the main attributes.
    pub fn new(created_by: &str) -> Self {
        Self {
            main: vec![
                Attribute::new(MANIFEST_VERSION, "1.0"),
                Attribute::new(CREATED_BY, created_by),
            ],
            entries: Vec::new(),
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, SigningError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| SigningError::InvalidManifest(format!("not UTF-8: {e}")))?;

        let mut sections: Vec<Section> = Vec::new();
        let mut current: Section = Vec::new();
        for (index, line) in split_lines(text).into_iter().enumerate() {
            if line.is_empty() {
                if !current.is_empty() {
                    sections.push(std::mem::take(&mut current));
                }
                continue;
            }

            if let Some(continued) = line.strip_prefix(' ') {
                let attr = current.last_mut().ok_or_else(|| {
                    SigningError::InvalidManifest(format!(
                        "line {}: continuation without an attribute",
                        index + 1
                    ))
                })?;
                attr.value.push_str(continued);
                continue;
            }

            let (name, value) = line.split_once(": ").ok_or_else(|| {
                SigningError::InvalidManifest(format!("line {}: expected 'Name: value'", index + 1))
            })?;
            current.push(Attribute::new(name, value));
        }
        if !current.is_empty() {
            sections.push(current);
        }

        let mut sections = sections.into_iter();
        let main = sections.next().unwrap_or_default();
        let entries: Vec<Section> = sections.collect();
        if let Some(section) = entries
            .iter()
            .find(|section| !section[0].name.eq_ignore_ascii_case(NAME))
        {
            return Err(SigningError::InvalidManifest(format!(
                "entry section starts with '{}' instead of 'Name'",
                section[0].name
            )));
        }

        Ok(Self { main, entries })
    }

    pub fn main_attribute(&self, name: &str) -> Option<&str> {
        find(&self.main, name)
    }

    pub fn entry_attribute(&self, entry: &str, name: &str) -> Option<&str> {
        self.entry(entry).and_then(|section| find(section, name))
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|section| section[0].value.as_str())
    }

    fn entry(&self, entry: &str) -> Option<&Section> {
        self.entries.iter().find(|section| section[0].value == entry)
    }

    /// Records fresh digests for exactly the given entries, in that order.
    ///
    /// Other attributes of existing sections are kept; sections for entries
    /// not listed are dropped. A main section without `Manifest-Version`
    /// gets one.
    pub fn update_digests(
        &mut self,
        digest: DigestAlgorithm,
        entry_digests: &[(String, Vec<u8>)],
        created_by: &str,
    ) {
        if self.main.is_empty() {
            self.main = Manifest::new(created_by).main;
        } else if find(&self.main, MANIFEST_VERSION).is_none() {
            self.main.insert(0, Attribute::new(MANIFEST_VERSION, "1.0"));
        }

        let attribute = digest_attribute(digest);
        let mut previous = std::mem::take(&mut self.entries);
        self.entries = entry_digests
            .iter()
            .map(|(name, value)| {
                let mut section = previous
                    .iter()
                    .position(|section| section[0].value == *name)
                    .map(|index| previous.swap_remove(index))
                    .unwrap_or_else(|| vec![Attribute::new(NAME, name.as_str())]);
                set(&mut section, &attribute, STANDARD.encode(value));
                section
            })
            .collect();
    }

    pub fn render(&self) -> RenderedManifest {
        let mut bytes = Vec::new();
        write_section(&mut bytes, &self.main);
        let main_len = bytes.len();

        let mut sections = Vec::with_capacity(self.entries.len());
        for section in &self.entries {
            let start = bytes.len();
            write_section(&mut bytes, section);
            sections.push((section[0].value.clone(), start..bytes.len()));
        }

        RenderedManifest {
            bytes,
            main_len,
            sections,
        }
    }
}

/// Manifest bytes plus where each section sits in them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedManifest {
    pub bytes: Vec<u8>,
    main_len: usize,
    sections: Vec<(String, Range<usize>)>,
}

impl RenderedManifest {
    /// Main section including its terminating blank line.
    pub fn main_section(&self) -> &[u8] {
        &self.bytes[..self.main_len]
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.sections
            .iter()
            .map(|(name, range)| (name.as_str(), &self.bytes[range.clone()]))
    }
}

/// Builds the `<NAME>.SF` file for a rendered manifest.
pub fn signature_file(
    manifest: &RenderedManifest,
    digest: DigestAlgorithm,
    created_by: &str,
) -> Vec<u8> {
    let alg = digest.manifest_name();
    let main = vec![
        Attribute::new(SIGNATURE_VERSION, "1.0"),
        Attribute::new(CREATED_BY, created_by),
        Attribute::new(
            format!("{alg}-Digest-Manifest-Main-Attributes"),
            STANDARD.encode(digest.digest(manifest.main_section())),
        ),
        Attribute::new(
            format!("{alg}-Digest-Manifest"),
            STANDARD.encode(digest.digest(&manifest.bytes)),
        ),
    ];

    let mut bytes = Vec::new();
    write_section(&mut bytes, &main);
    for (name, section) in manifest.sections() {
        write_section(
            &mut bytes,
            &[
                Attribute::new(NAME, name),
                Attribute::new(digest_attribute(digest), STANDARD.encode(digest.digest(section))),
            ],
        );
    }
    bytes
}

/// Splits on CRLF, LF or CR.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(|c| c == '\r' || c == '\n') {
            Some(end) => {
                lines.push(&rest[..end]);
                let skip = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[end + skip..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

fn write_section(out: &mut Vec<u8>, section: &[Attribute]) {
    for attr in section {
        write_attribute(out, &format!("{}: {}", attr.name, attr.value));
    }
    out.extend_from_slice(NEWLINE);
}

/// Writes one attribute line, wrapped at 72 bytes without splitting a
/// UTF-8 sequence.
fn write_attribute(out: &mut Vec<u8>, line: &str) {
    let mut rest = line;
    let mut limit = MAX_LINE_BYTES;
    loop {
        if rest.len() <= limit {
            out.extend_from_slice(rest.as_bytes());
            out.extend_from_slice(NEWLINE);
            return;
        }
        let mut split = limit;
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        out.extend_from_slice(rest[..split].as_bytes());
        out.extend_from_slice(NEWLINE);
        out.push(b' ');
        rest = &rest[split..];
        limit = MAX_LINE_BYTES - 1;
    }
}
