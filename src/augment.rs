//src/augment.rs

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::resolve::{resolve, RootPolicy};
use crate::table::Table;
use crate::taxdb::TreeIndex;
use crate::types::{output_ranks, RankTarget, TargetRanks, TaxId};

/// Position of the taxid in every genome report row.
pub const TAXID_FIELD: usize = 1;

/// Counts of what an augmentation pass managed to resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AugmentSummary {
    pub rows: usize,
    /// Rows with a name, per appended column (same order as the columns).
    pub resolved: Vec<(RankTarget, usize)>,
}

/// Header of the augmented table: the base header plus one title-cased
/// column per target rank, in vocabulary order.
pub fn augmented_header(base: &[String]) -> Vec<String> {
    let mut header = base.to_vec();
    header.extend(output_ranks().iter().map(|t| t.title().to_string()));
    header
}

/// Resolves every row of `base` and returns a new table with the rank
/// columns appended. Row order and base column order are preserved;
/// unresolved ranks are written as empty cells.
pub fn augment(base: &Table, index: &TreeIndex, policy: RootPolicy) -> Result<(Table, AugmentSummary)> {
    let targets = output_ranks();
    log::info!("Resolving taxonomy for {} rows", base.len());

    // Maps are only read here, so rows can be resolved independently.
    // Results are gathered in row order first so the earliest bad row is the one reported.
    let results: Vec<Result<TargetRanks>> = base
        .rows()
        .par_iter()
        .enumerate()
        .map(|(i, row)| {
            let taxid = row_taxid(row, i + 1)?;
            resolve(taxid, index, policy)
        })
        .collect();
    let resolved = results.into_iter().collect::<Result<Vec<_>>>()?;

    let mut out = Table::new(augmented_header(base.columns()));
    let mut summary = AugmentSummary {
        rows: base.len(),
        resolved: targets.iter().map(|t| (*t, 0)).collect(),
    };

    for (row, ranks) in base.rows().iter().zip(resolved) {
        let mut new_row = row.clone();
        for (slot, target) in targets.iter().enumerate() {
            let name = ranks.get(*target).unwrap_or_default();
            if !name.is_empty() {
                summary.resolved[slot].1 += 1;
            }
            new_row.push(name.to_string());
        }
        out.push_row(new_row)?;
    }

    for (target, count) in &summary.resolved {
        log::debug!("{target}: resolved {count}/{}", summary.rows);
    }
    Ok((out, summary))
}

/// Taxid of a data row. `row_no` is 1-based, counted after the header.
pub fn row_taxid(row: &[String], row_no: usize) -> Result<TaxId> {
    let field = row
        .get(TAXID_FIELD)
        .ok_or(Error::MissingTaxId { row: row_no })?;
    field.trim().parse().map_err(|_| Error::InvalidTaxId {
        row: row_no,
        value: field.clone(),
    })
}
