//! Line-delimited item placement records.
//!
//! Each line of a record file is one JSON object `{"id", "x", "y", "z"}`,
//! optionally with an `items` array holding the contents of a container.
//! Contents are flattened into extra records at the container's position.
//! Blank, unparsable or incomplete lines are skipped.

use crate::ItemId;
use crate::error::{AuditError, Result};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Lines};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub position: Position,
}

impl ItemRecord {
    pub fn new(id: ItemId, x: i32, y: i32, z: i32) -> Self {
        Self {
            id,
            position: Position { x, y, z },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    id: Option<i64>,
    x: Option<i32>,
    y: Option<i32>,
    z: Option<i32>,
    #[serde(default)]
    items: Vec<RawContent>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    id: Option<i64>,
    #[serde(default)]
    items: Vec<RawContent>,
}

fn positive_id(raw: Option<i64>) -> Option<ItemId> {
    raw.filter(|id| *id > 0)
        .and_then(|id| ItemId::try_from(id).ok())
}

/// Parses one line into its records, container contents included.
///
/// Returns `None` when the line is blank, not JSON, or lacks a coordinate or
/// a positive top-level id. Contents without a usable id are dropped while
/// their own children are still visited.
pub fn parse_line(line: &str) -> Option<Vec<ItemRecord>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let raw: RawRecord = serde_json::from_str(line).ok()?;
    let (Some(x), Some(y), Some(z)) = (raw.x, raw.y, raw.z) else {
        return None;
    };
    let id = positive_id(raw.id)?;

    let mut out = vec![ItemRecord::new(id, x, y, z)];

    // Depth-first pre-order over nested contents, without recursion
    let mut stack: Vec<&RawContent> = raw.items.iter().rev().collect();
    while let Some(content) = stack.pop() {
        if let Some(child) = positive_id(content.id) {
            out.push(ItemRecord::new(child, x, y, z));
        }
        stack.extend(content.items.iter().rev());
    }

    Some(out)
}

/// Forward-only reader over a record file.
///
/// Construct a new reader to scan the file again.
pub struct RecordReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    pending: VecDeque<ItemRecord>,
    line_no: u64,
    skipped_lines: u64,
}

impl RecordReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| AuditError::io(&path, e))?;
        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            pending: VecDeque::new(),
            line_no: 0,
            skipped_lines: 0,
        })
    }

    /// Lines skipped so far as blank or malformed.
    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines
    }
}

impl Iterator for RecordReader {
    type Item = Result<ItemRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            let line = match self.lines.next()? {
                Ok(line) => line,
                // Not UTF-8; the bytes are already consumed
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    self.line_no += 1;
                    self.skipped_lines += 1;
                    debug!("Skipping non UTF-8 record at line {}", self.line_no);
                    continue;
                }
                Err(e) => return Some(Err(AuditError::io(&self.path, e))),
            };
            self.line_no += 1;
            match parse_line(&line) {
                Some(records) => self.pending.extend(records),
                None => {
                    self.skipped_lines += 1;
                    if !line.trim().is_empty() {
                        debug!("Skipping malformed record at line {}", self.line_no);
                    }
                }
            }
        }
    }
}
