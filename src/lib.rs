//! Client for the Hyper Estraier full-text search engine / 全文搜索引擎客户端
//!
//! Talks to the engine through its C entry points, loaded at runtime:
//!
//! ```no_run
//! use std::sync::Arc;
//! use estraier_client::{Clause, Database, EstraierLibrary, SearchOptions};
//!
//! # fn main() -> estraier_client::Result<()> {
//! let library = Arc::new(EstraierLibrary::load("libestraier.so")?);
//! let db = Database::open(library, "casket")?;
//! for id in db.search(&[Clause::phrase("rust"), SearchOptions::UNION.into()])? {
//!     println!("{}\t{}", id, db.get_doc(id).uri());
//! }
//! db.close()?;
//! # Ok(())
//! # }
//! ```

pub mod condition;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod ffi;

pub use condition::{Clause, SearchOptions, UnknownOption};
pub use database::{Database, DocId, OpenMode};
pub use document::{attrs, Document};
pub use error::{Error, ErrorCode, Result};
pub use ffi::{EstraierLibrary, NativeApi};
