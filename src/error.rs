//src/error.rs

use thiserror::Error;

use crate::types::{RankTarget, TaxId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line of `nodes.dmp` / `names.dmp` that cannot be indexed. Fatal for the whole build.
    #[error("{source_name} line {line}: {reason}")]
    MalformedDump {
        source_name: String,
        line: usize,
        reason: String,
    },

    #[error("taxid {taxid} is ranked '{rank}' in nodes.dmp but has no scientific name in names.dmp")]
    MissingName { taxid: TaxId, rank: RankTarget },

    #[error("data row {row} has no taxid field")]
    MissingTaxId { row: usize },

    #[error("data row {row} has a non-numeric taxid '{value}'")]
    InvalidTaxId { row: usize, value: String },

    #[error("table has no header row")]
    EmptyTable,

    #[error("table line {line} has {found} fields, header has {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("table has no '{column}' column")]
    MissingColumn { column: String },

    #[error("query file line {line}: criterion appears before any 'query' line")]
    CriterionBeforeQuery { line: usize },

    #[error("no queries found in query file")]
    NoQueries,

    #[error("query #{index} has no criteria; please fix the query file")]
    EmptyQuery { index: usize },

    #[error("criterion on column '{column}' has no values; please fix the query file")]
    EmptyCriterion { column: String },

    #[error(
        "the query file names a column ('{column}') that does not exist in the data file. Available columns are:\n    {}",
        .available.join("\n    ")
    )]
    UnknownColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not configure worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Mistakes in the user's query file, as opposed to data or environment failures.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::CriterionBeforeQuery { .. }
                | Error::NoQueries
                | Error::EmptyQuery { .. }
                | Error::EmptyCriterion { .. }
                | Error::UnknownColumn { .. }
        )
    }
}
