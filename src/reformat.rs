//! Line reformatter: re-renders a line after substitution, rewrapping
//! source lines that no longer fit and resizing prose heading underlines.

use regex::Regex;
use unicode_width::UnicodeWidthStr as _;

use crate::error::Error;
use crate::types::{FileKind, Fragment, LineTokens};

/// List and field markers that open a line: bullets, enumerators, and
/// `:field name:` markers.
const MARKER_PATTERN: &str =
    r"^(?:(?P<bullet>[-*+•]\s+)|(?P<enumerator>(?:\d+|#|[A-Za-z])[.)]\s+)|(?P<field>:[^:\s][^:]*:(?:\s+|$)))";

/// Continuation padding under a `:field:` marker.
const FIELD_PADDING: &str = "  ";

/// Shortest run of punctuation accepted as a heading underline; shorter
/// runs such as `::` or `..` are reST markup of their own.
const MIN_UNDERLINE: usize = 4;

/// A re-rendered line plus, for prose, a resized heading underline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reformatted {
    /// The replacement for the current line; may span several physical
    /// lines and keeps the original terminator.
    pub line: String,
    /// The replacement for the following line, when it is an underline
    /// whose length no longer matches.
    pub underline: Option<String>,
}

/// Renders substituted lines back into file text.
pub struct Reformatter {
    /// Compiled [`MARKER_PATTERN`].
    marker: Regex,
    /// Maximum display width of a source line.
    width: usize,
}

impl Reformatter {
    /// Indentation for continuation lines: the line's own indentation plus
    /// marker padding, unless the next line is more deeply indented and is
    /// not a marker line itself, in which case its indentation wins.
    fn infer_indent(&self, line: &str, next: Option<&str>) -> String {
        let lead = leading_whitespace(line);
        let mut indent = lead.to_string();

        let rest = line.get(lead.len()..).unwrap_or("");
        if let Some(cap) = self.marker.captures(rest) {
            if let Some(m) = cap.name("bullet").or_else(|| return cap.name("enumerator")) {
                indent.push_str(&" ".repeat(m.as_str().width()));
            } else if cap.name("field").is_some() {
                indent.push_str(FIELD_PADDING);
            }
        }

        let Some(next) = next else {
            return indent;
        };
        let next_lead = leading_whitespace(next);
        let next_rest = next.get(next_lead.len()..).unwrap_or("");
        if !next_rest.trim().is_empty()
            && next_lead.width() > lead.width()
            && !self.marker.is_match(next_rest)
        {
            return next_lead.to_string();
        }
        return indent;
    }

    /// Build a reformatter for the given maximum width.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if the marker pattern fails to compile.
    pub fn new(width: usize) -> Result<Self, Error> {
        return Ok(Self {
            marker: Regex::new(MARKER_PATTERN)?,
            width,
        });
    }

    /// Re-render a substituted line. `next` is the physical line after it,
    /// used for indentation hints and heading underlines. Never fails:
    /// input that cannot be wrapped just stays long.
    pub fn reformat(&self, kind: FileKind, tokens: &LineTokens, next: Option<&str>) -> Reformatted {
        let printed = tokens.render();
        return match kind {
            FileKind::Prose => {
                let underline = next.and_then(|n| return resize_underline(n, &printed));
                Reformatted { line: printed, underline }
            },
            FileKind::Source => Reformatted {
                line: self.wrap(tokens, &printed, next),
                underline: None,
            },
        };
    }

    /// Greedily lay out units so that each physical line fits the width,
    /// closing and reopening a bracketing quote at every break.
    fn wrap(&self, tokens: &LineTokens, printed: &str, next: Option<&str>) -> String {
        let ending = line_ending(printed);
        let body = printed.strip_suffix(ending).unwrap_or(printed);
        if body.width() <= self.width {
            return printed.to_string();
        }

        let indent = self.infer_indent(body, next);
        let quote = bracketing_quote(body);
        let reopen = quote.map(String::from).unwrap_or_default();
        let closing_width = usize::from(quote.is_some());

        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut has_content = false;

        for unit in glue_units(tokens, ending) {
            if has_content {
                let tail = if quote.is_some() { unit.as_str() } else { unit.trim_end() };
                let projected = current
                    .width()
                    .saturating_add(tail.width())
                    .saturating_add(closing_width);
                if projected > self.width {
                    match quote {
                        Some(q) => current.push(q),
                        None => current.truncate(current.trim_end().len()),
                    }
                    lines.push(current);
                    current = format!("{indent}{reopen}{}", unit.trim_start());
                    continue;
                }
            }
            if !unit.trim().is_empty() {
                has_content = true;
            }
            current.push_str(&unit);
        }
        lines.push(current);

        let separator = if ending.is_empty() { "\n" } else { ending };
        let mut out = lines.join(separator);
        out.push_str(ending);
        return out;
    }
}

/// The quote character bracketing the stripped line, if it starts and ends
/// with the same `'` or `"`. Triple-quoted strings span physical lines on
/// their own and are never closed and reopened.
fn bracketing_quote(line: &str) -> Option<char> {
    let stripped = line.trim();
    let first = stripped.chars().next()?;
    if !matches!(first, '\'' | '"') || stripped.chars().count() < 2 {
        return None;
    }
    let triple = first.to_string().repeat(3);
    if stripped.starts_with(&triple) || stripped.ends_with(&triple) {
        return None;
    }
    return stripped.ends_with(first).then_some(first);
}

/// Join fragments into breakable units: adjacent fragments with no
/// whitespace between them (a replacement and the period after it) stay
/// together. The line terminator is dropped from the last fragment.
fn glue_units(tokens: &LineTokens, ending: &str) -> Vec<String> {
    let mut pieces: Vec<&str> = tokens.fragments.iter().map(Fragment::as_str).collect();
    if let Some(last) = pieces.last_mut() {
        let piece: &str = *last;
        *last = piece.strip_suffix(ending).unwrap_or(piece);
    }

    let mut units: Vec<String> = Vec::new();
    for piece in pieces {
        if piece.is_empty() {
            continue;
        }
        match units.last_mut() {
            Some(unit)
                if !unit.ends_with(char::is_whitespace)
                    && !piece.starts_with(char::is_whitespace) =>
            {
                unit.push_str(piece);
            },
            _ => units.push(piece.to_string()),
        }
    }
    return units;
}

/// The run of whitespace at the start of `line`.
fn leading_whitespace(line: &str) -> &str {
    let rest = line.trim_start();
    return line.get(..line.len().saturating_sub(rest.len())).unwrap_or("");
}

/// The terminator `line` ends with: `"\r\n"`, `"\n"`, or nothing.
fn line_ending(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        return "\r\n";
    }
    if line.ends_with('\n') {
        return "\n";
    }
    return "";
}

/// If `underline` is a heading underline (one punctuation character
/// repeated at least [`MIN_UNDERLINE`] times), return it resized to the
/// width of `heading`. `None` if it is not an underline or already fits.
fn resize_underline(underline: &str, heading: &str) -> Option<String> {
    let stripped = underline.trim();
    let mut chars = stripped.chars();
    let first = chars.next()?;
    if !first.is_ascii_punctuation()
        || stripped.len() < MIN_UNDERLINE
        || !chars.all(|c| return c == first)
    {
        return None;
    }

    let heading_body = heading.trim_end();
    let count = heading_body
        .width()
        .saturating_sub(leading_whitespace(heading_body).width())
        .max(1);

    let resized = format!(
        "{}{}{}",
        leading_whitespace(underline),
        first.to_string().repeat(count),
        line_ending(underline)
    );
    return (resized != underline).then_some(resized);
}
