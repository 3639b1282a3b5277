//! Symbol identifiers and their visibility scopes.

use std::fmt;

/// Visibility scope of a named symbol, ordered narrowest to widest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AccessModifier {
    /// Visible only within the defining section.
    Section,
    /// Visible to sections compiled from the same source file.
    File,
    /// Visible within the containing library.
    Library,
    /// Visible everywhere.
    #[default]
    Global,
}

impl AccessModifier {
    /// Parse the keyword used in the persisted XML vocabulary.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "section" => Some(Self::Section),
            "file" => Some(Self::File),
            "library" => Some(Self::Library),
            "global" => Some(Self::Global),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Section => "section",
            Self::File => "file",
            Self::Library => "library",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for AccessModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The name a symbol can be referenced by, together with its scope.
///
/// An identifier with no id is the [`Identifier::INVALID`] sentinel; a
/// symbol carrying it cannot be referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    id: Option<String>,
    access: AccessModifier,
}

impl Identifier {
    /// Sentinel identifier with no id.
    pub const INVALID: Identifier = Identifier {
        id: None,
        access: AccessModifier::Global,
    };

    pub fn new(access: AccessModifier, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            access,
        }
    }

    /// A globally visible identifier.
    pub fn global(id: impl Into<String>) -> Self {
        Self::new(AccessModifier::Global, id)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn access(&self) -> AccessModifier {
        self.access
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_some()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => f.write_str(id),
            None => f.write_str("<invalid>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_orders_narrow_to_wide() {
        assert!(AccessModifier::Section < AccessModifier::File);
        assert!(AccessModifier::File < AccessModifier::Library);
        assert!(AccessModifier::Library < AccessModifier::Global);
    }

    #[test]
    fn keyword_round_trip() {
        for access in [
            AccessModifier::Section,
            AccessModifier::File,
            AccessModifier::Library,
            AccessModifier::Global,
        ] {
            assert_eq!(AccessModifier::from_keyword(access.keyword()), Some(access));
        }
        assert_eq!(AccessModifier::from_keyword("public"), None);
    }

    #[test]
    fn invalid_sentinel_has_no_id() {
        assert!(!Identifier::INVALID.is_valid());
        assert!(Identifier::global("MyComponent").is_valid());
    }
}
