//! Item catalog document: entry extraction and append-only editing.
//!
//! The catalog is an XML document with one root container whose direct
//! children are entries carrying either `id` or `fromid`/`toid`, plus an
//! optional `article` and a `name`. Editing never re-serializes the
//! document: new entries are spliced in as text right before the root's
//! closing tag, so existing bytes stay exactly as they were.

use crate::ItemId;
use crate::coverage::CoverageIndex;
use crate::error::{AuditError, Result};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DEFAULT_ENTRY_ELEMENT: &str = "item";
const DEFAULT_INDENT: &str = "\t";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    Single {
        id: ItemId,
        article: String,
        name: String,
    },
    Range {
        from: ItemId,
        to: ItemId,
        article: String,
        name: String,
    },
}

impl CatalogEntry {
    pub fn min_id(&self) -> ItemId {
        match self {
            CatalogEntry::Single { id, .. } => *id,
            CatalogEntry::Range { from, .. } => *from,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, CatalogEntry::Range { .. })
    }

    pub fn article(&self) -> &str {
        match self {
            CatalogEntry::Single { article, .. } | CatalogEntry::Range { article, .. } => article,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogEntry::Single { name, .. } | CatalogEntry::Range { name, .. } => name,
        }
    }

    /// Number of identifiers the entry covers.
    pub fn span(&self) -> u64 {
        match self {
            CatalogEntry::Single { .. } => 1,
            CatalogEntry::Range { from, to, .. } => u64::from(to.max(from) - to.min(from)) + 1,
        }
    }

    fn add_to(&self, index: &mut CoverageIndex) {
        match self {
            CatalogEntry::Single { id, .. } => index.add_single(*id),
            CatalogEntry::Range { from, to, .. } => index.add_range(*from, *to),
        }
    }

    /// Self-closing element text, `article` only when non-empty.
    pub fn to_xml(&self, element: &str) -> String {
        let mut out = format!("<{element}");
        match self {
            CatalogEntry::Single { id, .. } => out.push_str(&format!(" id=\"{id}\"")),
            CatalogEntry::Range { from, to, .. } => {
                out.push_str(&format!(" fromid=\"{from}\" toid=\"{to}\""))
            }
        }
        if !self.article().is_empty() {
            out.push_str(&format!(" article=\"{}\"", escape(self.article())));
        }
        out.push_str(&format!(" name=\"{}\" />", escape(self.name())));
        out
    }
}

fn parse_id(raw: Option<&str>) -> Option<ItemId> {
    raw?.trim().parse::<ItemId>().ok().filter(|id| *id > 0)
}

/// Reads an entry from element attributes. Elements without a usable `id`
/// or `fromid`/`toid` pair are not entries.
fn entry_from_element(e: &BytesStart<'_>) -> std::result::Result<Option<CatalogEntry>, quick_xml::Error> {
    let mut id = None;
    let mut from = None;
    let mut to = None;
    let mut article = String::new();
    let mut name = String::new();

    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"id" => id = Some(value.into_owned()),
            b"fromid" => from = Some(value.into_owned()),
            b"toid" => to = Some(value.into_owned()),
            b"article" => article = value.into_owned(),
            b"name" => name = value.into_owned(),
            _ => {}
        }
    }

    if let Some(id) = parse_id(id.as_deref()) {
        return Ok(Some(CatalogEntry::Single { id, article, name }));
    }
    match (parse_id(from.as_deref()), parse_id(to.as_deref())) {
        (Some(from), Some(to)) => Ok(Some(CatalogEntry::Range {
            from,
            to,
            article,
            name,
        })),
        _ => Ok(None),
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Leading whitespace of the line holding byte `at`, if the line is
/// otherwise empty up to `at`.
fn line_indent(content: &str, at: usize) -> Option<String> {
    let line_start = content[..at].rfind('\n').map(|i| i + 1)?;
    let prefix = &content[line_start..at];
    (!prefix.is_empty() && prefix.chars().all(char::is_whitespace)).then(|| prefix.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootClose {
    /// Byte offset of the `</root>` tag
    Tag(usize),
    /// Byte span of a `<root/>` element
    SelfClosing { start: usize, end: usize },
}

#[derive(Debug, Clone)]
struct Layout {
    root: String,
    close: RootClose,
    entry_element: String,
    indent: String,
}

/// A fully parsed catalog held as text.
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
    content: String,
    entries: Vec<CatalogEntry>,
    layout: Layout,
}

impl Catalog {
    /// Reads and fully parses the catalog. Nothing is written.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(AuditError::CatalogNotFound(path));
        }
        let content = fs::read_to_string(&path).map_err(|e| AuditError::io(&path, e))?;
        Self::parse(path, content)
    }

    /// Parses `content` as the catalog living at `path`.
    pub fn parse(path: PathBuf, content: String) -> Result<Self> {
        let (entries, layout) = scan_document(&path, &content)?;
        debug!(
            "Catalog {} has {} entries under <{}>",
            path.display(),
            entries.len(),
            layout.root
        );
        Ok(Self {
            path,
            content,
            entries,
            layout,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn root_name(&self) -> &str {
        &self.layout.root
    }

    /// Finalized coverage over every entry.
    pub fn coverage(&self) -> CoverageIndex {
        let mut index = CoverageIndex::new();
        for entry in &self.entries {
            entry.add_to(&mut index);
        }
        index.finalize();
        index
    }

    /// Splices `entries` between BEGIN/END marker comments right before the
    /// root's closing tag. Returns the number of entries appended.
    pub fn append_entries(&mut self, entries: &[CatalogEntry], label: &str) -> usize {
        if entries.is_empty() {
            return 0;
        }
        let indent = self.layout.indent.as_str();
        // "--" is not allowed inside an XML comment
        let mut label = label.to_string();
        while label.contains("--") {
            label = label.replace("--", "-");
        }

        // Follow the document's line endings
        let eol = if self.content.contains("\r\n") { "\r\n" } else { "\n" };

        let mut block = format!("{indent}<!-- BEGIN auto-appended {label} -->{eol}");
        for entry in entries {
            block.push_str(indent);
            block.push_str(&entry.to_xml(&self.layout.entry_element));
            block.push_str(eol);
        }
        block.push_str(&format!("{indent}<!-- END auto-appended {label} -->{eol}"));

        match self.layout.close {
            RootClose::Tag(at) => {
                let line_start = self.content[..at].rfind('\n').map(|i| i + 1);
                let text = match line_start {
                    Some(start) if self.content[start..at].trim().is_empty() => {
                        self.content.insert_str(start, &block);
                        block
                    }
                    _ => {
                        let text = format!("{eol}{block}");
                        self.content.insert_str(at, &text);
                        text
                    }
                };
                self.layout.close = RootClose::Tag(at + text.len());
            }
            RootClose::SelfClosing { start, end } => {
                let open = self.content[start..end]
                    .trim_end()
                    .trim_end_matches("/>")
                    .trim_end()
                    .to_string();
                let close_tag = format!("</{}>", self.layout.root);
                let replacement = format!("{open}>{eol}{block}{close_tag}");
                let close_at = start + replacement.len() - close_tag.len();
                self.content.replace_range(start..end, &replacement);
                self.layout.close = RootClose::Tag(close_at);
            }
        }

        self.entries.extend_from_slice(entries);
        entries.len()
    }

    /// Writes the content back through a temporary sibling file, so the
    /// catalog is either fully replaced or left as it was.
    pub fn save(&self) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| AuditError::io(dir, e))?;
        tmp.write_all(self.content.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| AuditError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| AuditError::io(&self.path, e.error))?;
        info!("Saved catalog {}", self.path.display());
        Ok(())
    }
}

fn scan_document(path: &Path, content: &str) -> Result<(Vec<CatalogEntry>, Layout)> {
    let mut reader = Reader::from_str(content);
    let mut depth = 0usize;
    let mut root: Option<String> = None;
    let mut close: Option<RootClose> = None;
    let mut entry_element: Option<String> = None;
    let mut indent: Option<String> = None;
    let mut entries = Vec::new();

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| AuditError::xml(path, e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let self_closing = matches!(event, Event::Empty(_));
                match depth {
                    0 => {
                        if root.is_some() {
                            return Err(AuditError::malformed_catalog(
                                path,
                                "more than one root element",
                            ));
                        }
                        root = Some(element_name(e));
                        if self_closing {
                            close = Some(RootClose::SelfClosing {
                                start: before,
                                end: reader.buffer_position() as usize,
                            });
                        }
                    }
                    1 => {
                        if entry_element.is_none() {
                            entry_element = Some(element_name(e));
                            indent = line_indent(content, before);
                        }
                        match entry_from_element(e).map_err(|err| AuditError::xml(path, err))? {
                            Some(entry) => entries.push(entry),
                            None => debug!("Ignoring <{}> without id", element_name(e)),
                        }
                    }
                    _ => {}
                }
                if !self_closing {
                    depth += 1;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    close = Some(RootClose::Tag(before));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let Some(root) = root else {
        return Err(AuditError::malformed_catalog(path, "missing root container"));
    };
    let Some(close) = close.filter(|_| depth == 0) else {
        return Err(AuditError::malformed_catalog(
            path,
            format!("root container <{root}> is not closed"),
        ));
    };

    Ok((
        entries,
        Layout {
            root,
            close,
            entry_element: entry_element.unwrap_or_else(|| DEFAULT_ENTRY_ELEMENT.to_string()),
            indent: indent.unwrap_or_else(|| DEFAULT_INDENT.to_string()),
        },
    ))
}

fn index_entry(path: &Path, e: &BytesStart<'_>, index: &mut CoverageIndex) -> Result<usize> {
    match entry_from_element(e).map_err(|err| AuditError::xml(path, err))? {
        Some(entry) => {
            entry.add_to(index);
            Ok(1)
        }
        None => Ok(0),
    }
}

/// Streams the catalog straight into a finalized [`CoverageIndex`] without
/// keeping its text around.
pub fn load_coverage(path: impl AsRef<Path>) -> Result<CoverageIndex> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AuditError::CatalogNotFound(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| AuditError::io(path, e))?;
    let mut reader = Reader::from_reader(BufReader::new(file));
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut index = CoverageIndex::new();
    let mut entries = 0usize;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| AuditError::xml(path, e))?
        {
            Event::Start(e) => {
                if depth == 0 {
                    seen_root = true;
                } else if depth == 1 {
                    entries += index_entry(path, &e, &mut index)?;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    seen_root = true;
                } else if depth == 1 {
                    entries += index_entry(path, &e, &mut index)?;
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(AuditError::malformed_catalog(path, "missing root container"));
    }
    if depth != 0 {
        return Err(AuditError::malformed_catalog(path, "root container is not closed"));
    }

    index.finalize();
    info!(
        "Loaded {} catalog entries from {} ({} singles, {} merged ranges)",
        entries,
        path.display(),
        index.single_count(),
        index.ranges().len()
    );
    Ok(index)
}
