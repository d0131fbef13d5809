//! The raw mod compiler core: lexing, file sorting, the object store, the
//! reader/editor pass, the directive-expansion compiler pass, and the
//! writer. No I/O policy or UI lives here beyond reading mod files and
//! writing compiled output — mod discovery and any interactive frontend are
//! external collaborators (see [`mods::ModDescriptor`]).

pub mod compiler;
pub mod convert;
pub mod lexer;
pub mod mods;
pub mod reader;
pub mod schema;
pub mod sorter;
pub mod store;
pub mod token;
pub mod writer;

use mods::ModDescriptor;
use std::path::Path;
use thiserror::Error;

/// Every way the pipeline can fail outright. Recoverable conditions (an
/// undefined reference, a malformed conditional index, a duplicate id) are
/// not represented here — they're logged via `tracing::warn!` and the
/// pipeline continues, per the source's recovery policy.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cyclic COPY_TAGS_FROM: {}", .chain.join(" -> "))]
    CyclicCopy { chain: Vec<String> },

    #[error("could not read {path}: {source}")]
    Io { path: std::path::PathBuf, source: std::io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reads every mod in order, compiles the merged object graph, and writes
/// the per-super-category output files to `output_path`.
///
/// This is the one entry point the core exposes; exit-code handling and mod
/// discovery belong to the caller (see `rawc-cli`).
pub fn compile(mods: &[ModDescriptor], output_path: &Path) -> Result<()> {
    let mut store = store::ObjectStore::new();
    for mod_descriptor in mods {
        reader::read_mod(&mut store, mod_descriptor)?;
    }
    let compiled = compiler::Compiler::new(&store).compile_all()?;
    writer::write_all(&compiled, output_path)?;
    Ok(())
}
