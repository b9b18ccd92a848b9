//src/resolve.rs

use crate::error::{Error, Result};
use crate::taxdb::TreeIndex;
use crate::types::{RankTarget, TargetRanks, TaxId, ROOT_TAXID};

/// What to do when the ascent arrives at the root node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootPolicy {
    /// Stop before looking at the root, so the root's own rank is never captured.
    #[default]
    HaltAtRoot,
    /// Look at the root's rank like any other node, then stop.
    InspectRoot,
}

/// Walks from `start` towards the root, recording the scientific name of the
/// nearest ancestor (or `start` itself) at each target rank.
///
/// The walk stops as soon as every target is filled, at the root, at a
/// self-parented node, or at a taxid missing from `nodes.dmp`. Unfilled
/// targets are simply left `None`. A node carrying a target rank but no
/// scientific name is an error.
pub fn resolve(start: TaxId, index: &TreeIndex, policy: RootPolicy) -> Result<TargetRanks> {
    let mut ranks = TargetRanks::default();
    let mut current = start;
    log::trace!("resolve: taxid {start}");

    while !ranks.is_complete() {
        if current == ROOT_TAXID && policy == RootPolicy::HaltAtRoot {
            log::trace!("resolve: reached root, keeping {:?}", ranks);
            break;
        }

        let node = match index.node(current) {
            Some(node) => node,
            None => {
                log::debug!("resolve: taxid {current} is not listed in nodes.dmp, stopping ascent from {start}");
                break;
            }
        };
        log::trace!("resolve: {current} is a {} with parent {}", node.rank, node.parent);

        if let Some(target) = RankTarget::from_rank(&node.rank) {
            if !ranks.is_set(target) {
                let name = index
                    .name(current)
                    .ok_or(Error::MissingName {
                        taxid: current,
                        rank: target,
                    })?;
                ranks.set_if_unset(target, name.to_string());
            }
        }

        if current == ROOT_TAXID || node.parent == current {
            break;
        }
        current = node.parent;
    }

    log::trace!("resolve: {start} => {:?}", ranks);
    Ok(ranks)
}
