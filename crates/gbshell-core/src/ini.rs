//! Minimal INI reader/writer for `config.ini`.
//!
//! Sections and keys keep file order. Keys are case-sensitive. Values may be
//! wrapped in double quotes when read; they are written bare unless trimming
//! or unquoting would change them. Use [`check_key`] and [`check_value`]
//! before rendering text that did not come from [`Document::parse`].

use std::fmt::Write as _;
use std::path::Path;

use crate::error::StorageError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Parse `text`; `path` is only used for error reporting.
    pub fn parse(text: &str, path: &Path) -> Result<Self, StorageError> {
        let mut doc = Document::default();
        let mut current: Option<usize> = None;

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let syntax = || StorageError::Syntax {
                path: path.to_path_buf(),
                line: line_no + 1,
            };

            if let Some(header) = line.strip_prefix('[') {
                let name = header.strip_suffix(']').ok_or_else(syntax)?.trim();
                // Repeated headers continue the earlier section.
                current = Some(match doc.sections.iter().position(|s| s.name == name) {
                    Some(idx) => idx,
                    None => {
                        doc.sections.push(Section::new(name));
                        doc.sections.len() - 1
                    }
                });
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(syntax)?;
            let key = key.trim();
            if key.is_empty() {
                return Err(syntax());
            }
            let idx = current.ok_or_else(syntax)?;
            doc.sections[idx].push(key, unquote(value.trim()));
        }

        Ok(doc)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "[{}]", section.name);
            for (key, value) in &section.entries {
                if value.is_empty() {
                    let _ = writeln!(out, "{key} =");
                } else if needs_quotes(value) {
                    let _ = writeln!(out, "{key} = \"{value}\"");
                } else {
                    let _ = writeln!(out, "{key} = {value}");
                }
            }
        }
        out
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn needs_quotes(value: &str) -> bool {
    value != value.trim() || value.starts_with('"')
}

/// Why `key` would not read back as the same key, if it would not.
pub fn check_key(key: &str) -> Result<(), &'static str> {
    if key.is_empty() {
        return Err("empty name");
    }
    if key != key.trim() {
        return Err("leading or trailing whitespace");
    }
    if key.contains(['=', '\n', '\r']) {
        return Err("contains '=' or a line break");
    }
    if key.starts_with(['[', '#', ';']) {
        return Err("starts with '[', '#' or ';'");
    }
    Ok(())
}

/// Values are single-line; everything else survives a round trip.
pub fn check_value(value: &str) -> Result<(), &'static str> {
    if value.contains(['\n', '\r']) {
        return Err("contains a line break");
    }
    Ok(())
}
