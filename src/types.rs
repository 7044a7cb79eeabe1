//src/types.rs

use indexmap::IndexMap;

/// A fully loaded taxon, borrowed from the taxonomy tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Taxon<'a> {
    pub id: &'a str,
    pub parent_id: &'a str,
    pub rank: &'a str,
    pub name: &'a str,
    pub depth: u32,
}

/// How an identifier relates to the loaded tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonStatus {
    /// Retired id; holds the id it was merged into.
    Merged(String),
    Valid,
    /// Loaded from a custom source (dotted id such as `1234.5`).
    ValidCustom,
    Invalid,
}

/// One rank slot of a structured lineage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub name: String,
    /// `None` for placeholders synthesized over a gap in the real ancestry.
    pub id: Option<String>,
}

impl RankEntry {
    pub fn is_placeholder(&self) -> bool {
        self.id.is_none()
    }
}

/// Major-rank lineage of a taxon, ordered from the most general rank down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage {
    pub ranks: IndexMap<String, RankEntry>,
    /// The taxon directly below the nearest species ancestor, when there is one.
    pub type_entry: Option<RankEntry>,
}

impl Lineage {
    pub fn get(&self, rank: &str) -> Option<&RankEntry> {
        self.ranks.get(rank)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RankEntry)> {
        self.ranks.iter().map(|(rank, entry)| (rank.as_str(), entry))
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// One real ancestor on the walk to root, rank and all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineageStep<'a> {
    pub id: &'a str,
    pub rank: &'a str,
    pub name: &'a str,
}

/// A row of an OTU table: short-form lineage, assigned reads and their share.
#[derive(Debug, Clone, PartialEq)]
pub struct OtuRow {
    pub lineage: String,
    pub reads: u64,
    pub fraction: f64,
}
