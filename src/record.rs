//! The sample record wire format.
//!
//! `action,seq,size,python_fraction,pid,pointer,file,line,bytei\n`

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What triggered this record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Action {
    /// A sampled allocation.
    Malloc,
    /// A sampled free that was not the most recent malloc trigger.
    Free,
    /// A sampled free of the pointer that was the most recent malloc trigger.
    FreeOfLastTrigger,
}

impl Action {
    fn as_char(self) -> char {
        match self {
            Action::Malloc => 'M',
            Action::Free => 'F',
            Action::FreeOfLastTrigger => 'f',
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            'M' => Some(Action::Malloc),
            'F' => Some(Action::Free),
            'f' => Some(Action::FreeOfLastTrigger),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One attributed sample, ready to be appended to the channel.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    pub action: Action,
    pub seq: u64,
    pub size: u64,
    pub python_fraction: f64,
    pub pid: i32,
    pub pointer: usize,
    pub file: String,
    pub line: u32,
    pub bytei: u32,
}

impl Record {
    /// Formats the record as a single newline-terminated line, matching the
    /// `%c,%lu,%lu,%f,%d,%p,%s,%d,%d\n` layout from the external interface.
    ///
    /// This crate emits a single trailing `\n` (not a doubled one); see
    /// DESIGN.md for why, and [`parse_line`] for why readers should tolerate
    /// either.
    pub fn format(&self) -> String {
        format!(
            "{},{},{},{:.6},{},0x{:x},{},{},{}\n",
            self.action,
            self.seq,
            self.size,
            self.python_fraction,
            self.pid,
            self.pointer,
            self.file,
            self.line,
            self.bytei,
        )
    }
}

/// Parses one line (with or without its trailing newline(s)) back into a
/// [`Record`]. Returns `None` on any malformed field rather than erroring,
/// since a truncated/dropped record is an
/// expected occurrence a reader must shrug off.
pub fn parse_line(line: &str) -> Option<Record> {
    let line = line.trim_end_matches('\n');
    let mut fields = line.splitn(9, ',');

    let action = Action::from_char(fields.next()?.chars().next()?)?;
    let seq = fields.next()?.parse().ok()?;
    let size = fields.next()?.parse().ok()?;
    let python_fraction = fields.next()?.parse().ok()?;
    let pid = fields.next()?.parse().ok()?;
    let pointer_field = fields.next()?;
    let pointer = usize::from_str_radix(pointer_field.trim_start_matches("0x"), 16).ok()?;
    let file = fields.next()?.to_string();
    let line_no = fields.next()?.parse().ok()?;
    let bytei = fields.next()?.parse().ok()?;

    Some(Record {
        action,
        seq,
        size,
        python_fraction,
        pid,
        pointer,
        file,
        line: line_no,
        bytei,
    })
}

/// A sampled byte-copy event (`memcpy`/`memmove`/`strcpy`), emitted on the
/// independent memcpy channel. Unlike [`Record`] this has no
/// `action`/`pointer`/`python_fraction` fields: a copy has no allocator
/// identity to attribute a free against, and no host-vs-native split to
/// report.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemcpyRecord {
    pub seq: u64,
    pub bytes: u64,
    pub pid: i32,
    pub file: String,
    pub line: u32,
    pub bytei: u32,
}

impl MemcpyRecord {
    /// `seq,bytes,pid,file,line,bytei\n`.
    pub fn format(&self) -> String {
        format!(
            "{},{},{},{},{},{}\n",
            self.seq, self.bytes, self.pid, self.file, self.line, self.bytei,
        )
    }
}

/// Parses a line written by [`MemcpyRecord::format`].
pub fn parse_memcpy_line(line: &str) -> Option<MemcpyRecord> {
    let line = line.trim_end_matches('\n');
    let mut fields = line.splitn(6, ',');

    let seq = fields.next()?.parse().ok()?;
    let bytes = fields.next()?.parse().ok()?;
    let pid = fields.next()?.parse().ok()?;
    let file = fields.next()?.to_string();
    let line_no = fields.next()?.parse().ok()?;
    let bytei = fields.next()?.parse().ok()?;

    Some(MemcpyRecord {
        seq,
        bytes,
        pid,
        file,
        line: line_no,
        bytei,
    })
}

#[cfg(test)]
mod test;
