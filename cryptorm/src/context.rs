//! Field context used for domain separation.

use std::fmt;

/// Identifies the column a stored form belongs to.
///
/// The context is bound into every ciphertext (as associated data) and every
/// search digest, so a value copied from one column into another neither
/// decrypts nor matches a lookup.
///
/// # Example
///
/// ```
/// use cryptorm::context::FieldContext;
///
/// let ctx = FieldContext::new("users", "email");
/// assert_eq!(ctx.to_string(), "users|email");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldContext<'a> {
    table: &'a str,
    column: &'a str,
}

impl<'a> FieldContext<'a> {
    /// Creates a context for `table.column`.
    #[must_use]
    pub const fn new(table: &'a str, column: &'a str) -> Self {
        Self { table, column }
    }

    /// Returns the table name.
    #[must_use]
    pub const fn table(&self) -> &'a str {
        self.table
    }

    /// Returns the column name.
    #[must_use]
    pub const fn column(&self) -> &'a str {
        self.column
    }

    /// Byte form used as associated data and index domain.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for FieldContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.table, self.column)
    }
}
