//! Identifier validation and quoting.

use std::fmt;

/// Longest identifier Postgres keeps without truncating (`NAMEDATALEN - 1`).
pub const PG_IDENT_MAX: usize = 63;

/// A PostgreSQL identifier wrapper.
///
/// Display writes the value escaped and quoted with double quotes.
///
/// # Example
/// ```
/// use hearthbook_schema::Ident;
/// assert_eq!(format!("{}", Ident("income")), "\"income\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for c in self.0.as_ref().chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}

/// Quote a PostgreSQL identifier.
///
/// Always quotes, so reserved words like `date` never need special casing.
/// Doubles any embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("{}", Ident(name))
}

/// An identifier that failed [`validate_ident`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidIdent {
    pub name: String,
    pub reason: &'static str,
}

impl fmt::Display for InvalidIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid identifier {:?}: {}", self.name, self.reason)
    }
}

impl std::error::Error for InvalidIdent {}

/// Check that `name` is a plain lowercase snake_case identifier.
///
/// Rendered SQL quotes every identifier anyway; this rule keeps the on-disk
/// names usable unquoted by other readers of the database.
pub fn validate_ident(name: &str) -> Result<(), InvalidIdent> {
    let fail = |reason| {
        Err(InvalidIdent {
            name: name.to_string(),
            reason,
        })
    };

    let Some(first) = name.chars().next() else {
        return fail("identifier is empty");
    };
    if name.len() > PG_IDENT_MAX {
        return fail("identifier is longer than 63 bytes");
    }
    if !(first.is_ascii_lowercase() || first == '_') {
        return fail("identifier must start with a lowercase letter or underscore");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return fail("identifier may only contain lowercase letters, digits and underscores");
    }

    Ok(())
}
