//! Tokenizer and parser for exception contracts in `///` documentation.
//!
//! Only the parts that matter for contracts are modelled:
//!
//! ```text
//! <exception cref="TypeRef">[Get.|Set. ][Ignore. ]free text</exception>
//! <exception cref="TypeRef"/>
//! <inheritdoc/>
//! ```
//!
//! Every other element is tracked only to decide whether the block is well
//! formed. Offsets are byte offsets into the raw block text, `///` prefixes
//! included, so the synthesizer can splice markers in place.

use std::ops::Range;

/// Accessor tag at the start of an entry body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorTag {
    Get,
    Set,
}

/// One `<exception>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionEntry {
    /// The `cref` attribute value as written.
    pub cref: String,
    /// Whole element, start tag through end tag.
    pub span: Range<usize>,
    /// Element content; `None` for a self-closing tag.
    pub body: Option<Range<usize>>,
    pub accessor: Option<AccessorTag>,
    pub ignored: bool,
    /// Free text after the markers, with line prefixes removed.
    pub text: String,
    /// Where an `Ignore.` marker belongs if it has to be added.
    pub marker_at: usize,
}

impl ExceptionEntry {
    /// The cref without a `T:` documentation-id prefix.
    pub fn type_ref(&self) -> &str {
        strip_doc_id(&self.cref)
    }
}

/// Parsed documentation block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    pub entries: Vec<ExceptionEntry>,
    /// Contains an `<inheritdoc/>` marker.
    pub inherit: bool,
    pub well_formed: bool,
}

/// Strip a `T:` style documentation-id prefix from a cref.
pub fn strip_doc_id(cref: &str) -> &str {
    let cref = cref.trim();
    match cref.as_bytes() {
        [kind, b':', ..] if kind.is_ascii_alphabetic() => &cref[2..],
        _ => cref,
    }
}

struct OpenEntry {
    cref: Option<String>,
    start: usize,
    body_start: usize,
}

impl DocComment {
    /// Parse a raw `///` block.
    pub fn parse(raw: &str) -> Self {
        let mut doc = DocComment {
            well_formed: true,
            ..Default::default()
        };
        let mut stack: Vec<String> = Vec::new();
        let mut open: Option<OpenEntry> = None;
        let mut pos = 0;

        while let Some(offset) = raw[pos..].find('<') {
            let start = pos + offset;
            let rest = &raw[start..];

            if rest.starts_with("<!--") {
                match rest.find("-->") {
                    Some(end) => {
                        pos = start + end + 3;
                        continue;
                    }
                    None => {
                        doc.well_formed = false;
                        break;
                    }
                }
            }

            if let Some(closing) = rest.strip_prefix("</") {
                let Some(gt) = closing.find('>') else {
                    doc.well_formed = false;
                    break;
                };
                let name = closing[..gt].trim();
                if stack.pop().as_deref() != Some(name) {
                    doc.well_formed = false;
                }
                pos = start + 2 + gt + 1;
                if name == "exception" {
                    if let Some(entry) = open.take() {
                        if let Some(cref) = entry.cref {
                            doc.entries.push(Self::entry(
                                raw,
                                cref,
                                entry.start..pos,
                                Some(entry.body_start..start),
                            ));
                        }
                    }
                }
                continue;
            }

            let Some(tag) = scan_tag(&raw[start..]) else {
                doc.well_formed = false;
                break;
            };
            pos = start + tag.len;

            match tag.name.as_str() {
                "inheritdoc" => doc.inherit = true,
                "exception" if open.is_none() => {
                    if tag.self_closing {
                        if let Some(cref) = tag.cref {
                            doc.entries
                                .push(Self::entry(raw, cref, start..pos, None));
                        }
                    } else {
                        open = Some(OpenEntry {
                            cref: tag.cref,
                            start,
                            body_start: pos,
                        });
                    }
                }
                _ => {}
            }
            if !tag.self_closing {
                stack.push(tag.name);
            }
        }

        if !stack.is_empty() || open.is_some() {
            doc.well_formed = false;
        }
        doc
    }

    fn entry(
        raw: &str,
        cref: String,
        span: Range<usize>,
        body: Option<Range<usize>>,
    ) -> ExceptionEntry {
        let Some(body_range) = body.clone() else {
            return ExceptionEntry {
                cref,
                marker_at: span.end,
                span,
                body,
                accessor: None,
                ignored: false,
                text: String::new(),
            };
        };

        let end = body_range.end;
        let mut pos = skip_trivia(raw, body_range.start, end);
        let content_start = pos;

        let mut accessor = None;
        let mut marker_at = content_start;
        if let Some((word, after)) = marker_word(raw, pos, end) {
            let tag = match word.to_ascii_lowercase().as_str() {
                "get" | "getter" => Some(AccessorTag::Get),
                "set" | "setter" => Some(AccessorTag::Set),
                _ => None,
            };
            if tag.is_some() {
                accessor = tag;
                pos = after;
                marker_at = after;
            }
        }

        let mut ignored = false;
        let after_accessor = skip_trivia(raw, pos, end);
        if let Some((word, after)) = marker_word(raw, after_accessor, end) {
            if word.eq_ignore_ascii_case("ignore") {
                ignored = true;
                pos = after;
            }
        }

        let text = clean_text(&raw[pos..end]);
        ExceptionEntry {
            cref,
            span,
            body,
            accessor,
            ignored,
            text,
            marker_at,
        }
    }
}

/// A start tag or self-closing tag.
struct Tag {
    name: String,
    cref: Option<String>,
    self_closing: bool,
    len: usize,
}

fn scan_tag(text: &str) -> Option<Tag> {
    let bytes = text.as_bytes();
    let mut i = 1;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    if i == 1 {
        return None;
    }
    let name = text[1..i].to_string();
    let mut cref = None;

    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/' && text[i..].starts_with("///")) {
            i += if bytes[i] == b'/' { 3 } else { 1 };
        }
        if i >= bytes.len() {
            return None;
        }
        if text[i..].starts_with("/>") {
            return Some(Tag {
                name,
                cref,
                self_closing: true,
                len: i + 2,
            });
        }
        if bytes[i] == b'>' {
            return Some(Tag {
                name,
                cref,
                self_closing: false,
                len: i + 1,
            });
        }

        let attr_start = i;
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        if i == attr_start {
            return None;
        }
        let attr = &text[attr_start..i];
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            return None;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let quote = *bytes.get(i)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let value_start = i + 1;
        let value_len = text[value_start..].find(quote as char)?;
        if attr == "cref" {
            cref = Some(text[value_start..value_start + value_len].to_string());
        }
        i = value_start + value_len + 1;
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'.' | b'-')
}

/// Skip whitespace and `///` line prefixes.
fn skip_trivia(raw: &str, mut pos: usize, end: usize) -> usize {
    loop {
        let rest = &raw[pos..end];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();
        if trimmed.starts_with("///") {
            pos += 3;
            continue;
        }
        return pos;
    }
}

/// A marker word at `pos` and the offset just past it and its optional dot.
fn marker_word(raw: &str, pos: usize, end: usize) -> Option<(&str, usize)> {
    let rest = &raw[pos..end];
    let len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    if len == 0 {
        return None;
    }
    let word = &rest[..len];
    let mut after = pos + len;
    match raw[after..end].chars().next() {
        Some('.') => after += 1,
        None => {}
        Some(c) if c.is_whitespace() || c == '<' => {}
        Some(_) => return None,
    }
    Some((word, after))
}

/// Collapse an entry body into a single line of text.
fn clean_text(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix("///").unwrap_or(line).trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
