//! Symbol table backends for hgdb.
//!
//! A debug session resolves source locations and variable names through a
//! symbol table. This crate provides three interchangeable ways to hold one:
//!
//! - [`DebugSymbolTable`]: structured storage on SQLite, written ahead of the
//!   session with integrity checks on every store
//! - [`SymbolDocument`]: a hierarchical JSON document of modules and scopes,
//!   for generators that cannot target a database
//! - [`SymbolIndex`]: the document lowered into flat, queryable tables
//!
//! # Example
//!
//! ```rust
//! use hgdb_symbols::document::{DocVariable, ScopeContainer};
//! use hgdb_symbols::{SymbolDocument, SymbolIndex};
//!
//! let mut doc = SymbolDocument::new("example");
//! let top = doc.add_module("top");
//! top.set_filename("top.sv");
//! top.add_assign(DocVariable::new("a", "a0", true), 3);
//!
//! let index = SymbolIndex::from_document(&doc).unwrap();
//! assert_eq!(index.get_breakpoints("top.sv", 3, 0).len(), 1);
//! ```

#![deny(missing_docs)]

pub mod document;
pub mod error;
pub mod index;
mod schema;
pub mod table;

pub use document::SymbolDocument;
pub use error::SymbolTableError;
pub use index::SymbolIndex;
pub use table::DebugSymbolTable;
