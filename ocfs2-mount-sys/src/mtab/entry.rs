// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::constants::{DEFAULT_MTAB_OPTIONS, FS_TYPE};

/// One line of the mount table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountTableEntry {
    pub source: String,
    pub target: String,
    pub fs_type: String,
    /// `None` means no `-o` was given. It is written as `defaults` and
    /// therefore reads back as `Some("defaults")`; the table itself cannot
    /// tell the two apart.
    pub options: Option<String>,
    pub freq: i32,
    pub passno: i32,
}

impl MountTableEntry {
    /// Entry for a freshly mounted OCFS2 volume
    ///
    /// Both paths are canonicalized; a path that cannot be resolved is
    /// recorded as given.
    pub fn for_mount(device: &str, mountpoint: &str, options: Option<&str>) -> Self {
        Self {
            source: canonicalize(device),
            target: canonicalize(mountpoint),
            fs_type: FS_TYPE.to_string(),
            options: options.map(ToString::to_string),
            freq: 0,
            passno: 0,
        }
    }

    /// `<source> on <target> type <type> (<options>)`, as mount(8) prints it
    pub fn summary(&self) -> String {
        let mut line = format!("{} on {}", self.source, self.target);
        if !self.fs_type.is_empty() {
            line.push_str(&format!(" type {}", self.fs_type));
        }
        if let Some(options) = &self.options {
            line.push_str(&format!(" ({options})"));
        }
        line
    }
}

/// Mount table line, without the trailing newline
impl fmt::Display for MountTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            mangle(&self.source),
            mangle(&self.target),
            mangle(&self.fs_type),
            mangle(self.options.as_deref().unwrap_or(DEFAULT_MTAB_OPTIONS)),
            self.freq,
            self.passno
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid mount table line: {0}")]
pub struct ParseEntryError(pub String);

/// Parses one table line; the options field is always `Some`
impl FromStr for MountTableEntry {
    type Err = ParseEntryError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseEntryError(line.to_string());
        let mut fields = line.split_whitespace();

        let source = fields.next().ok_or_else(invalid)?;
        let target = fields.next().ok_or_else(invalid)?;
        let fs_type = fields.next().ok_or_else(invalid)?;
        let options = fields.next().ok_or_else(invalid)?;
        // dump frequency and pass number are optional
        let freq = fields
            .next()
            .map(str::parse)
            .transpose()
            .map_err(|_| invalid())?
            .unwrap_or(0);
        let passno = fields
            .next()
            .map(str::parse)
            .transpose()
            .map_err(|_| invalid())?
            .unwrap_or(0);

        Ok(Self {
            source: unmangle(source),
            target: unmangle(target),
            fs_type: unmangle(fs_type),
            options: Some(unmangle(options)),
            freq,
            passno,
        })
    }
}

/// Parse every entry of a mount table, skipping blank lines and comments
pub fn parse_entries(input: &str) -> Result<Vec<MountTableEntry>, ParseEntryError> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::parse)
        .collect()
}

fn canonicalize(path: &str) -> String {
    match Path::new(path).canonicalize() {
        Ok(resolved) => resolved.to_string_lossy().into_owned(),
        Err(e) => {
            tracing::debug!("Could not canonicalize {}, recording as given: {}", path, e);
            path.to_string()
        }
    }
}

/// Escape the characters that would break the whitespace separated format
fn mangle(field: &str) -> String {
    let mut output = String::with_capacity(field.len());
    for character in field.chars() {
        match character {
            ' ' => output.push_str("\\040"),
            '\t' => output.push_str("\\011"),
            '\n' => output.push_str("\\012"),
            '\\' => output.push_str("\\134"),
            other => output.push(other),
        }
    }
    output
}

fn unmangle(field: &str) -> String {
    let mut output = String::with_capacity(field.len());
    let mut rest = field;

    while let Some(index) = rest.find('\\') {
        output.push_str(&rest[..index]);
        let escape = &rest[index..];
        let decoded = escape
            .get(1..4)
            .filter(|digits| digits.bytes().all(|b| (b'0'..=b'7').contains(&b)))
            .and_then(|digits| u8::from_str_radix(digits, 8).ok());

        match decoded {
            Some(byte) => {
                output.push(byte as char);
                rest = &escape[4..];
            }
            None => {
                output.push('\\');
                rest = &escape[1..];
            }
        }
    }

    output.push_str(rest);
    output
}
