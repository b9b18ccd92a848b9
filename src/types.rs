//src/types.rs

use std::fmt;

/// Numeric node identifier in the NCBI taxonomy tree.
pub type TaxId = u32;

/// The NCBI root node. Ascent never proceeds past it.
pub const ROOT_TAXID: TaxId = 1;

/// Every rank label used by `nodes.dmp`, broadest first.
///
/// Only used to decide the order in which rank columns are appended to the
/// augmented table; resolution itself never consults it.
pub const RANK_ORDER: [&str; 19] = [
    "superkingdom",
    "kingdom",
    "superphylum",
    "phylum",
    "subphylum",
    "superclass",
    "class",
    "subclass",
    "infraclass",
    "order",
    "superfamily",
    "family",
    "subfamily",
    "genus",
    "subgenus",
    "species group",
    "species subgroup",
    "species",
    "subspecies",
];

/// One row of `nodes.dmp`: where a taxon hangs in the tree and at which rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub parent: TaxId,
    pub rank: String,
}

/// The ranks resolved for every genome in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankTarget {
    Species,
    Genus,
    Family,
    Phylum,
}

impl RankTarget {
    pub const ALL: [RankTarget; 4] = [
        RankTarget::Species,
        RankTarget::Genus,
        RankTarget::Family,
        RankTarget::Phylum,
    ];

    /// The label as it appears in the rank field of `nodes.dmp`.
    pub fn as_str(&self) -> &'static str {
        match self {
            RankTarget::Species => "species",
            RankTarget::Genus => "genus",
            RankTarget::Family => "family",
            RankTarget::Phylum => "phylum",
        }
    }

    /// Column title used in the augmented table.
    pub fn title(&self) -> &'static str {
        match self {
            RankTarget::Species => "Species",
            RankTarget::Genus => "Genus",
            RankTarget::Family => "Family",
            RankTarget::Phylum => "Phylum",
        }
    }

    /// Exact match against a dump rank label. `"Genus"` or `"genus "` do not match.
    pub fn from_rank(rank: &str) -> Option<RankTarget> {
        RankTarget::ALL.into_iter().find(|t| t.as_str() == rank)
    }
}

impl fmt::Display for RankTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Targets in `RANK_ORDER` order, i.e. the order of the appended columns.
pub fn output_ranks() -> Vec<RankTarget> {
    RANK_ORDER
        .iter()
        .filter_map(|rank| RankTarget::from_rank(rank))
        .collect()
}

/// Result of resolving one taxid: at most one name per target rank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRanks {
    pub species: Option<String>,
    pub genus: Option<String>,
    pub family: Option<String>,
    pub phylum: Option<String>,
}

impl TargetRanks {
    pub fn get(&self, target: RankTarget) -> Option<&str> {
        self.slot(target).as_deref()
    }

    fn slot(&self, target: RankTarget) -> &Option<String> {
        match target {
            RankTarget::Species => &self.species,
            RankTarget::Genus => &self.genus,
            RankTarget::Family => &self.family,
            RankTarget::Phylum => &self.phylum,
        }
    }

    fn slot_mut(&mut self, target: RankTarget) -> &mut Option<String> {
        match target {
            RankTarget::Species => &mut self.species,
            RankTarget::Genus => &mut self.genus,
            RankTarget::Family => &mut self.family,
            RankTarget::Phylum => &mut self.phylum,
        }
    }

    pub fn is_set(&self, target: RankTarget) -> bool {
        self.slot(target).is_some()
    }

    /// Stores `name` unless the slot is already filled. Returns whether it was stored.
    pub fn set_if_unset(&mut self, target: RankTarget, name: String) -> bool {
        let slot = self.slot_mut(target);
        if slot.is_some() {
            return false;
        }
        *slot = Some(name);
        true
    }

    pub fn is_complete(&self) -> bool {
        RankTarget::ALL.iter().all(|t| self.is_set(*t))
    }

    pub fn unresolved(&self) -> Vec<RankTarget> {
        RankTarget::ALL
            .into_iter()
            .filter(|t| !self.is_set(*t))
            .collect()
    }
}
