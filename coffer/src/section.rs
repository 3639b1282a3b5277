//! Sections and the top-level intermediate container.
//!
//! A section groups the symbols produced from one logical compilation
//! unit. An [`Intermediate`] owns an ordered list of sections and stamps
//! its generated id onto each one as a back-reference tag.

use std::fmt;

use fxhash::FxHashSet;
use thiserror::Error;

use crate::symbol::IntermediateSymbol;

/// Kind of compilation unit a section came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum SectionType {
    #[default]
    Unknown,
    Fragment,
    Product,
    Module,
    Patch,
    PatchCreation,
    Bundle,
}

impl SectionType {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Fragment => "fragment",
            Self::Product => "product",
            Self::Module => "module",
            Self::Patch => "patch",
            Self::PatchCreation => "patchCreation",
            Self::Bundle => "bundle",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "unknown" => Some(Self::Unknown),
            "fragment" => Some(Self::Fragment),
            "product" => Some(Self::Product),
            "module" => Some(Self::Module),
            "patch" => Some(Self::Patch),
            "patchCreation" => Some(Self::PatchCreation),
            "bundle" => Some(Self::Bundle),
            _ => None,
        }
    }

    /// Only fragments (and sections of unknown type) may be anonymous.
    pub fn requires_id(self) -> bool {
        !matches!(self, Self::Fragment | Self::Unknown)
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SectionError {
    #[error("a {section_type} section requires an id")]
    MissingId { section_type: SectionType },
}

/// A named grouping of symbols from one compilation unit.
#[derive(Debug, Clone)]
pub struct IntermediateSection {
    id: Option<String>,
    section_type: SectionType,
    codepage: i32,
    symbols: Vec<IntermediateSymbol>,
    intermediate_id: Option<String>,
    library_id: Option<String>,
}

impl IntermediateSection {
    pub fn new(
        id: Option<String>,
        section_type: SectionType,
        codepage: i32,
    ) -> Result<Self, SectionError> {
        if id.is_none() && section_type.requires_id() {
            return Err(SectionError::MissingId { section_type });
        }
        Ok(Self {
            id,
            section_type,
            codepage,
            symbols: Vec::new(),
            intermediate_id: None,
            library_id: None,
        })
    }

    /// An anonymous fragment section, the common case for compiled objects.
    pub fn fragment(codepage: i32) -> Self {
        Self {
            id: None,
            section_type: SectionType::Fragment,
            codepage,
            symbols: Vec::new(),
            intermediate_id: None,
            library_id: None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn section_type(&self) -> SectionType {
        self.section_type
    }

    pub fn codepage(&self) -> i32 {
        self.codepage
    }

    pub fn symbols(&self) -> &[IntermediateSymbol] {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut Vec<IntermediateSymbol> {
        &mut self.symbols
    }

    pub fn add_symbol(&mut self, symbol: IntermediateSymbol) {
        self.symbols.push(symbol);
    }

    pub fn intermediate_id(&self) -> Option<&str> {
        self.intermediate_id.as_deref()
    }

    pub(crate) fn set_intermediate_id(&mut self, id: Option<String>) {
        self.intermediate_id = id;
    }

    pub fn library_id(&self) -> Option<&str> {
        self.library_id.as_deref()
    }

    pub fn set_library_id(&mut self, id: Option<String>) {
        self.library_id = id;
    }
}

/// Top-level container for the sections produced by one compilation.
#[derive(Debug, Clone)]
pub struct Intermediate {
    id: String,
    sections: Vec<IntermediateSection>,
}

impl Intermediate {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            sections: Vec::new(),
        }
    }

    /// Rehydrate an intermediate with a previously persisted id.
    pub(crate) fn with_id(id: String) -> Self {
        Self {
            id,
            sections: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sections(&self) -> &[IntermediateSection] {
        &self.sections
    }

    pub fn sections_mut(&mut self) -> &mut [IntermediateSection] {
        &mut self.sections
    }

    /// Append a section, tagging it with this intermediate's id.
    pub fn add_section(&mut self, mut section: IntermediateSection) {
        section.set_intermediate_id(Some(self.id.clone()));
        self.sections.push(section);
    }
}

impl Default for Intermediate {
    fn default() -> Self {
        Self::new()
    }
}

/// A section/symbol pair with the linker-level identity
/// `"<definition>:<id>"`.
///
/// The conflict and redundancy sets start empty and are populated by the
/// link-time resolver, which owns that analysis.
#[derive(Debug, Clone)]
pub struct SymbolWithSection {
    name: String,
    section_id: Option<String>,
    possibly_conflicts: Option<FxHashSet<String>>,
    redundants: Option<FxHashSet<String>>,
}

impl SymbolWithSection {
    pub fn new(section: &IntermediateSection, symbol: &IntermediateSymbol) -> Self {
        let id = symbol.id().and_then(|id| id.id()).unwrap_or_default();
        Self {
            name: format!("{}:{}", symbol.definition().name(), id),
            section_id: section.id().map(str::to_owned),
            possibly_conflicts: None,
            redundants: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn section_id(&self) -> Option<&str> {
        self.section_id.as_deref()
    }

    pub fn add_possible_conflict(&mut self, other: &SymbolWithSection) {
        self.possibly_conflicts
            .get_or_insert_with(FxHashSet::default)
            .insert(other.name.clone());
    }

    pub fn add_redundant(&mut self, other: &SymbolWithSection) {
        self.redundants
            .get_or_insert_with(FxHashSet::default)
            .insert(other.name.clone());
    }

    pub fn possibly_conflicts(&self) -> impl Iterator<Item = &str> {
        self.possibly_conflicts
            .iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn redundants(&self) -> impl Iterator<Item = &str> {
        self.redundants
            .iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }
}
