//! Reference tokenizer: splits a line into plain text and `:role:`symbol``
//! matches that are eligible for interactive replacement.

use regex::{Captures, Regex};

use crate::config::{Config, SplitRule};
use crate::error::Error;
use crate::types::{Fragment, LineTokens, ReferenceToken, Role};

/// Inline reference markup. Trailing call parentheses are matched but kept
/// out of the symbol group.
const REFERENCE_PATTERN: &str = r":(class|attr|func|meth|paramref):`(.+?)(?:\(\))?`";

/// Comment lines, decorator lines, and lines opening with `name=` or
/// `name = ` are too risky to rewrite. `#.` and `#)` open auto-numbered
/// list items in reST and are not comments.
const RISKY_LINE_PATTERN: &str = r"^\s*(?:#(?:[^.)]|$)|@|\w+\s*=(?:[^=]|$))";

/// A run of non-whitespace plus the whitespace that follows it.
const WORD_PATTERN: &str = r"\S*\s*";

/// Line tokenizer configured with a package-qualifier tolerance and split rule.
pub struct Tokenizer {
    /// Maximum package qualifier components on a flagged reference.
    max_package_qualifiers: usize,
    /// Compiled [`REFERENCE_PATTERN`].
    reference: Regex,
    /// Compiled [`RISKY_LINE_PATTERN`].
    risky: Regex,
    /// How dotted symbols are split into qualifier and target.
    split: SplitRule,
    /// Compiled [`WORD_PATTERN`].
    word: Regex,
}

impl Tokenizer {
    /// Build a tokenizer from the run configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if a built-in pattern fails to compile.
    pub fn new(config: &Config) -> Result<Self, Error> {
        return Ok(Self {
            max_package_qualifiers: config.max_package_qualifiers,
            reference: Regex::new(REFERENCE_PATTERN)?,
            risky: Regex::new(RISKY_LINE_PATTERN)?,
            split: config.split,
            word: Regex::new(WORD_PATTERN)?,
        });
    }

    /// Turn one regex capture into a flagged reference, or `None` when the
    /// match should pass through untouched.
    fn flag_reference(&self, cap: &Captures<'_>, filter: Option<&Regex>) -> Option<ReferenceToken> {
        let raw = cap.get(0)?.as_str();
        let role = Role::from_name(cap.get(1)?.as_str())?;
        let group = cap.get(2)?.as_str();

        let symbol = group.trim_start_matches(['~', '.']);
        // A space in the symbol would corrupt the `symbol text` ledger line.
        if symbol.is_empty() || symbol.contains(char::is_whitespace) {
            return None;
        }
        let sigil_len = group.len().saturating_sub(symbol.len());
        let sigil = group.get(..sigil_len).unwrap_or("");

        let components: Vec<&str> = symbol.split('.').collect();
        if package_qualifier_len(role, &components, self.split) > self.max_package_qualifiers {
            return None;
        }

        if let Some(filter) = filter
            && !filter.is_match(symbol)
        {
            return None;
        }

        return Some(ReferenceToken {
            raw: raw.to_string(),
            role,
            sigil: sigil.to_string(),
            symbol: symbol.to_string(),
        });
    }

    /// Split plain text into word pieces so the reformatter can break lines
    /// between words without tearing punctuation off the word before it.
    fn push_text(&self, fragments: &mut Vec<Fragment>, text: &str) {
        for piece in self.word.find_iter(text) {
            if !piece.as_str().is_empty() {
                fragments.push(Fragment::Text(piece.as_str().to_string()));
            }
        }
        return;
    }

    /// Search a line for reference markup.
    ///
    /// Returns `None` if the line is risky or holds no reference eligible
    /// for replacement. References that are too heavily qualified, or that
    /// miss the optional `filter`, stay in the result as plain text.
    pub fn tokenize(&self, line: &str, filter: Option<&Regex>) -> Option<LineTokens> {
        if self.risky.is_match(line) {
            return None;
        }

        let mut fragments = Vec::new();
        let mut last = 0_usize;
        let mut flagged = false;

        for cap in self.reference.captures_iter(line) {
            let Some(whole) = cap.get(0) else { continue };
            self.push_text(&mut fragments, line.get(last..whole.start()).unwrap_or(""));

            if let Some(token) = self.flag_reference(&cap, filter) {
                log::debug!("flagged {}{} ({:?})", token.sigil, token.symbol, token.role);
                flagged = true;
                fragments.push(Fragment::Reference(token));
            } else {
                fragments.push(Fragment::Text(whole.as_str().to_string()));
            }
            last = whole.end();
        }

        if !flagged {
            return None;
        }

        self.push_text(&mut fragments, line.get(last..).unwrap_or(""));
        return Some(LineTokens { fragments });
    }
}

/// Count the leading components of a dotted symbol that form its package
/// qualifier under the given split rule.
fn package_qualifier_len(role: Role, components: &[&str], split: SplitRule) -> usize {
    let total = components.len();
    let target_len = match (split, role) {
        (SplitRule::LastComponent, _) | (SplitRule::ByRole, Role::Class | Role::Function) => 1,
        (SplitRule::ByRole, Role::Attribute | Role::Method) => 2,
        (SplitRule::ByRole, Role::Parameter) => {
            // parameter and function, then a class when it looks like one
            let class_part = total
                .checked_sub(3)
                .and_then(|idx| return components.get(idx))
                .and_then(|name| return name.chars().next())
                .is_some_and(char::is_uppercase);
            if class_part { 3 } else { 2 }
        },
    };
    return total.saturating_sub(target_len);
}
