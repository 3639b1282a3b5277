//! Intermediate object model and container formats for an installer build
//! toolchain.
//!
//! A compiler front-end produces [`Intermediate`]s: sections of typed
//! symbols described by [`SymbolDefinition`]s. This crate owns that object
//! model, the binary containers it is persisted into, the versioned XML
//! vocabulary inside those containers, and the identifier-rewriting pass
//! used when merging modules.
//!
//! [`Intermediate`]: crate::section::Intermediate
//! [`SymbolDefinition`]: crate::definition::SymbolDefinition

pub mod container;
pub mod definition;
pub mod field;
pub mod identifier;
pub mod index;
pub mod modularize;
pub mod persist;
pub mod reporting;
pub mod section;
pub mod source;
pub mod standard;
pub mod symbol;
pub mod table;
