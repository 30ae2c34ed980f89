//! Small text helpers shared by the indexer and the refactorings.

use crate::edit::TextRange;

/// Lower-cases the first character of `name` if it is an ASCII upper-case letter.
///
/// `Invoice` becomes `invoice`, `URLParser` becomes `uRLParser`; already
/// decapitalized names are returned unchanged.
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => {
            let mut out = String::with_capacity(name.len());
            out.extend(first.to_lowercase());
            out.push_str(chars.as_str());
            out
        }
        _ => name.to_string(),
    }
}

/// Prefixes every non-empty line of `block` with `indent`.
#[must_use]
pub fn indent_block(block: &str, indent: &str) -> String {
    let mut out = String::with_capacity(block.len() + indent.len() * 4);
    for line in block.split_inclusive('\n') {
        let line_stripped = line.strip_suffix('\n').unwrap_or(line);
        if !line_stripped.trim().is_empty() {
            out.push_str(indent);
            out.push_str(line_stripped);
        }
        if line.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Removes common leading indentation from all non-empty lines in `block`.
#[must_use]
pub fn dedent_block(block: &str) -> String {
    let lines: Vec<&str> = block.lines().collect();
    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    let mut out = String::with_capacity(block.len());
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        if line.trim().is_empty() {
            continue;
        }
        let byte_idx = line
            .char_indices()
            .nth(min_indent)
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        out.push_str(&line[byte_idx..]);
    }
    if block.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Widens `range` to whole lines when only whitespace surrounds it on its first and last line.
///
/// The result swallows the leading indentation and the trailing line break, so deleting it does
/// not leave a blank line behind.
pub fn expand_to_lines(text: &str, range: TextRange) -> TextRange {
    let before = &text[..range.start];
    let line_start = before.rfind('\n').map(|p| p + 1).unwrap_or(0);
    let start = if before[line_start..].trim().is_empty() {
        line_start
    } else {
        range.start
    };

    let after = &text[range.end..];
    let line_end = after.find('\n').map(|p| range.end + p + 1);
    let end = match line_end {
        Some(end) if text[range.end..end].trim().is_empty() => end,
        None if after.trim().is_empty() => text.len(),
        _ => range.end,
    };

    TextRange::new(start, end)
}

/// Leading whitespace of the line containing `offset`.
pub fn line_indent(text: &str, offset: usize) -> &str {
    let line_start = text[..offset].rfind('\n').map(|p| p + 1).unwrap_or(0);
    let line = &text[line_start..];
    let len = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..len]
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LineCol {
    /// Zero-based line.
    pub line: u32,
    /// Zero-based byte column.
    pub col: u32,
}

/// Pre-computed line start offsets for a particular text snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            text_len: text.len(),
        }
    }

    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Convert a byte offset to a line/column pair. Offsets past the end are clamped.
    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = offset.min(self.text_len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert) => insert.saturating_sub(1),
        };
        LineCol {
            line: line as u32,
            col: (offset - self.line_starts[line]) as u32,
        }
    }
}
