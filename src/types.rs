/// Core domain types for cross-reference tokens and line fragments.
use std::path::Path;

/// How a file is laid out, which decides how rewritten lines are re-rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// reStructuredText: lines are concatenated, heading underlines resized.
    Prose,
    /// Python source: long lines are re-wrapped with inferred indentation.
    Source,
}

impl FileKind {
    /// Map a file extension to its kind. `None` for anything the walker skips.
    pub fn for_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

        return match ext {
            "py" => Some(Self::Source),
            "rst" => Some(Self::Prose),
            _ => None,
        };
    }
}

/// One piece of a tokenized line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// A reference the operator is asked about.
    Reference(ReferenceToken),
    /// Opaque text, including references passed through untouched and
    /// replacement text already substituted.
    Text(String),
}

impl Fragment {
    /// The text this fragment renders as.
    pub fn as_str(&self) -> &str {
        return match self {
            Fragment::Reference(token) => &token.raw,
            Fragment::Text(text) => text,
        };
    }
}

/// A tokenized line. Rendering an untouched `LineTokens` reproduces the
/// source line exactly, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTokens {
    /// Ordered fragments of the line.
    pub fragments: Vec<Fragment>,
}

impl LineTokens {
    /// Concatenate every fragment back into a line.
    pub fn render(&self) -> String {
        return self.fragments.iter().map(Fragment::as_str).collect();
    }

    /// Substitute the reference at `index` with literal text.
    /// Returns `false` if the index does not hold a reference.
    pub fn replace(&mut self, index: usize, text: &str) -> bool {
        let Some(slot) = self.fragments.get_mut(index) else {
            return false;
        };
        if !matches!(slot, Fragment::Reference(_)) {
            return false;
        }
        *slot = Fragment::Text(text.to_string());
        return true;
    }
}

/// A located `:role:`symbol`` match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceToken {
    /// The full matched markup, e.g. ``:meth:`.Foo.bar()` ``.
    pub raw: String,
    /// Which reference role the markup used.
    pub role: Role,
    /// Leading relative sigils (`~`, `.`) stripped from the symbol.
    pub sigil: String,
    /// Role-independent symbol portion, e.g. `Foo.bar`. Never empty.
    pub symbol: String,
}

/// The reference roles the tokenizer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// `:attr:`
    Attribute,
    /// `:class:`
    Class,
    /// `:func:`
    Function,
    /// `:meth:`
    Method,
    /// `:paramref:`
    Parameter,
}

impl Role {
    /// Parse the role name as it appears between the colons.
    pub fn from_name(name: &str) -> Option<Self> {
        return match name {
            "attr" => Some(Self::Attribute),
            "class" => Some(Self::Class),
            "func" => Some(Self::Function),
            "meth" => Some(Self::Method),
            "paramref" => Some(Self::Parameter),
            _ => None,
        };
    }
}
