// src/lib.rs
pub mod types;
pub mod error;
pub mod config;
pub mod taxdb;
pub mod resolve;
pub mod table;
pub mod augment;
pub mod query;
pub mod cache;
pub mod fetch;

use std::path::Path;

use crate::augment::{augment, AugmentSummary};
use crate::error::Result;
use crate::query::{select, QuerySet};
use crate::resolve::RootPolicy;
use crate::table::Table;
use crate::taxdb::TreeIndex;

pub use crate::error::Error;

/// Reads a genome report plus `nodes.dmp`/`names.dmp`, appends the
/// Phylum/Family/Genus/Species columns and writes the result to `output`.
pub fn augment_files<P, N, M, O>(
    prokaryotes_path: P,
    nodes_path: N,
    names_path: M,
    output_path: O,
    policy: RootPolicy,
) -> Result<AugmentSummary>
where
    P: AsRef<Path>,
    N: AsRef<Path>,
    M: AsRef<Path>,
    O: AsRef<Path>,
{
    // 1. Load taxonomy
    let index = TreeIndex::from_paths(nodes_path, names_path)?;

    // 2. Load the base table
    let base = Table::from_path(prokaryotes_path)?;

    // 3. Resolve every row and write the augmented table
    let (augmented, summary) = augment(&base, &index, policy)?;
    augmented.write_to_path(output_path)?;

    Ok(summary)
}

/// Loads an (augmented) table and returns the rows matching the query file.
pub fn select_from_files<D: AsRef<Path>, Q: AsRef<Path>>(data_path: D, queries_path: Q) -> Result<Table> {
    let queries = QuerySet::from_path(queries_path)?;
    let table = Table::from_path(data_path)?;
    select(&table, &queries)
}
