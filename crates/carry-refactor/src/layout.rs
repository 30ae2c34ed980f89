//! Placement helpers for members written into a type body.

use carry_core::{expand_to_lines, line_indent, TextRange};

/// Indentation used by the members of the body at `body_range`.
pub(crate) fn member_indent(text: &str, body_range: TextRange) -> String {
    let body = body_range.slice(text);
    let after_brace_line = body.find('\n').map_or("", |nl| &body[nl + 1..]);
    for line in after_brace_line.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('}') {
            continue;
        }
        return line[..line.len() - trimmed.len()].to_string();
    }
    format!("{}    ", line_indent(text, body_range.start))
}

/// Offset and text that make `block` the last member of the body at `body_range`, separated
/// from existing members by a blank line.
pub(crate) fn insert_before_close(
    text: &str,
    body_range: TextRange,
    block: &str,
) -> (usize, String) {
    let close = body_range.end;
    let line_start = text[..close].rfind('\n').map_or(0, |p| p + 1);
    let own_line = line_start > body_range.start && text[line_start..close].trim().is_empty();
    let at = if own_line { line_start } else { close };

    let prefix = &text[..at];
    let mut insertion = String::new();
    if !prefix.ends_with('\n') {
        insertion.push('\n');
    }
    if !body_range.slice(text).trim().is_empty() && !prefix.ends_with("\n\n") {
        insertion.push('\n');
    }
    insertion.push_str(block);
    if !insertion.ends_with('\n') {
        insertion.push('\n');
    }
    if !own_line {
        insertion.push_str(line_indent(text, close));
    }
    (at, insertion)
}

/// Range to delete for a member declared at `range`: whole lines, plus the blank line that
/// separated it from the previous member, or from the next one when it opens the body.
pub(crate) fn member_deletion_range(text: &str, range: TextRange) -> TextRange {
    let lines = expand_to_lines(text, range);
    let before = &text[..lines.start];
    if !before.ends_with('\n') || !text[..lines.end].ends_with('\n') {
        return lines;
    }
    let previous_start = before[..before.len() - 1]
        .rfind('\n')
        .map_or(0, |p| p + 1);
    let previous = &before[previous_start..];
    if previous.trim().is_empty() {
        return TextRange::new(previous_start, lines.end);
    }
    swallow_blank_after_open(text, lines)
}

/// Extends a whole-line `range` that starts right below a `{` over the blank line after it.
fn swallow_blank_after_open(text: &str, range: TextRange) -> TextRange {
    let Some(before) = text[..range.start].strip_suffix('\n') else {
        return range;
    };
    let previous = before.rfind('\n').map_or(before, |p| &before[p + 1..]);
    if !previous.trim_end().ends_with('{') {
        return range;
    }
    let rest = &text[range.end..];
    match rest.find('\n') {
        Some(nl) if rest[..nl].trim().is_empty() => TextRange::new(range.start, range.end + nl + 1),
        _ => range,
    }
}

/// Sorts and merges deletion ranges of `text` that overlap or touch.
pub(crate) fn merge_ranges(text: &str, mut ranges: Vec<TextRange>) -> Vec<TextRange> {
    ranges.sort();
    let mut merged: Vec<TextRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => {
                *last = TextRange::new(last.start, last.end.max(range.end));
            }
            _ => merged.push(range),
        }
    }
    merged
        .into_iter()
        .map(|range| swallow_blank_after_open(text, range))
        .collect()
}
