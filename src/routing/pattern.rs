//! Route pattern primitive.
//!
//! # Responsibilities
//! - Represent a path pattern as a closed set of shapes
//! - Evaluate a pattern against a raw path (query already stripped)
//!
//! # Design Decisions
//! - Two evaluation modes: `covers` (exclude lists, literals act as prefixes)
//!   and `matches` (server routes, literals are exact)
//! - Wildcards are only recognized as a trailing `*`

use regex::Regex;

/// Trailing marker that turns a text pattern into a prefix wildcard.
pub const WILDCARD: char = '*';

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub enum RoutePattern {
    /// A literal path, e.g. `/health`.
    Literal(String),
    /// A prefix with its trailing `*` removed, e.g. `/api/*` is stored as `/api/`.
    PrefixWildcard(String),
    /// A regular expression tested against the path.
    Regex(Regex),
}

impl RoutePattern {
    /// Parse a text pattern. A trailing `*` yields a prefix wildcard,
    /// anything else a literal.
    pub fn parse(text: &str) -> Self {
        match text.strip_suffix(WILDCARD) {
            Some(prefix) => RoutePattern::PrefixWildcard(prefix.to_string()),
            None => RoutePattern::Literal(text.to_string()),
        }
    }

    /// Compile a regular expression pattern.
    pub fn regex(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(RoutePattern::Regex)
    }

    /// Exclude semantics: regex test, otherwise string-prefix match.
    pub fn covers(&self, path: &str) -> bool {
        match self {
            RoutePattern::Literal(prefix) | RoutePattern::PrefixWildcard(prefix) => {
                path.starts_with(prefix.as_str())
            }
            RoutePattern::Regex(re) => re.is_match(path),
        }
    }

    /// Server-route semantics.
    ///
    /// A wildcard matches anything sharing its prefix, plus the prefix with its
    /// trailing `/` removed (`/api/*` matches `/api`). A literal only matches
    /// on equality.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            RoutePattern::Literal(literal) => path == literal,
            RoutePattern::PrefixWildcard(prefix) => {
                path.starts_with(prefix.as_str())
                    || prefix
                        .strip_suffix('/')
                        .is_some_and(|bare| !bare.is_empty() && path == bare)
            }
            RoutePattern::Regex(re) => re.is_match(path),
        }
    }

    /// Source text, for logging.
    pub fn as_str(&self) -> &str {
        match self {
            RoutePattern::Literal(s) | RoutePattern::PrefixWildcard(s) => s,
            RoutePattern::Regex(re) => re.as_str(),
        }
    }
}

impl std::fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutePattern::Literal(s) => write!(f, "{}", s),
            RoutePattern::PrefixWildcard(s) => write!(f, "{}{}", s, WILDCARD),
            RoutePattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// Strip the query string (and fragment) from a request target.
pub fn strip_query(target: &str) -> &str {
    let end = target.find(['?', '#']).unwrap_or(target.len());
    &target[..end]
}
