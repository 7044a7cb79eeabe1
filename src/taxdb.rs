//src/taxdb.rs

use ahash::AHashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{Result, TaxonomyError};
use crate::lineage::{LineageFormat, LineageOptions};
use crate::names::NameQuery;
use crate::rank_abbr::RankAbbreviations;
use crate::types::{Lineage, Taxon, TaxonStatus};

pub const ROOT_ID: &str = "1";
pub const ROOT_NAME: &str = "root";
pub const NO_RANK: &str = "no rank";

/// Node table keyed by taxon id, iterated in load order.
pub(crate) type NodeTable = IndexMap<String, TaxonEntry, ahash::RandomState>;

#[derive(Debug, Clone)]
pub(crate) struct NodeLink {
    pub(crate) parent: String,
    pub(crate) rank: String,
}

/// Names and nodes arrive from different files, so either half may be missing.
#[derive(Debug, Clone, Default)]
pub(crate) struct TaxonEntry {
    pub(crate) name: Option<String>,
    pub(crate) link: Option<NodeLink>,
    pub(crate) depth: u32,
    explicit_depth: bool,
}

impl TaxonEntry {
    fn is_complete(&self) -> bool {
        self.name.is_some() && self.link.is_some()
    }
}

/// Mutable taxonomy tables filled by the format parsers.
///
/// Loads are additive: inserting an id that already exists overwrites it,
/// which is how custom sources override or extend a primary taxonomy.
#[derive(Debug, Clone, Default)]
pub struct TaxonStore {
    entries: NodeTable,
    merged: AHashMap<String, String>,
    child_counts: AHashMap<String, u32>,
    abbreviations: RankAbbreviations,
}

impl TaxonStore {
    pub fn new(abbreviations: RankAbbreviations) -> Self {
        Self {
            abbreviations,
            ..Self::default()
        }
    }

    pub fn abbreviations(&self) -> &RankAbbreviations {
        &self.abbreviations
    }

    pub fn set_abbreviations(&mut self, abbreviations: RankAbbreviations) {
        self.abbreviations = abbreviations;
    }

    /// Adds or overwrites a complete taxon.
    ///
    /// Without an explicit depth, the parent's depth plus one is used when the
    /// parent is already known, else 0; `finish` repairs the latter case.
    pub fn insert(&mut self, id: &str, parent_id: &str, rank: &str, name: &str, depth: Option<u32>) {
        let inferred = self
            .entries
            .get(parent_id)
            .filter(|_| parent_id != id)
            .map(|parent| parent.depth + 1)
            .unwrap_or(0);

        self.insert_node(id, parent_id, rank);
        let entry = self.entries.entry(id.to_string()).or_default();
        entry.name = Some(name.to_string());
        entry.depth = depth.unwrap_or(inferred);
        entry.explicit_depth = depth.is_some();
    }

    /// Records the scientific name only (names.dmp).
    pub fn insert_name(&mut self, id: &str, name: &str) {
        self.entries.entry(id.to_string()).or_default().name = Some(name.to_string());
    }

    /// Records parent and rank only (nodes.dmp).
    pub fn insert_node(&mut self, id: &str, parent_id: &str, rank: &str) {
        self.entries.entry(id.to_string()).or_default().link = Some(NodeLink {
            parent: parent_id.to_string(),
            rank: rank.to_string(),
        });
    }

    /// Redirects a retired id to its replacement (merged.dmp).
    pub fn insert_merged(&mut self, old_id: &str, new_id: &str) {
        self.merged.insert(old_id.to_string(), new_id.to_string());
    }

    /// Makes sure the root exists for sources that only name it implicitly.
    pub fn ensure_root(&mut self) {
        let root = self.entries.entry(ROOT_ID.to_string()).or_default();
        if root.name.is_none() {
            root.name = Some(ROOT_NAME.to_string());
        }
        if root.link.is_none() {
            root.link = Some(NodeLink {
                parent: ROOT_ID.to_string(),
                rank: ROOT_NAME.to_string(),
            });
        }
    }

    /// Number of taxa with both a name and a parent.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| e.is_complete()).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.entries.values().any(TaxonEntry::is_complete)
    }

    pub fn merged_len(&self) -> usize {
        self.merged.len()
    }

    /// Freezes the tables for querying; fails if nothing usable was loaded.
    pub fn finish(mut self) -> Result<Taxonomy> {
        if self.is_empty() {
            log::error!("Taxonomy not loaded: no taxa with both a name and a parent");
            return Err(TaxonomyError::NotLoaded);
        }
        self.recompute_depths();
        self.recount_children();
        log::info!(
            "Done parsing taxonomy files (total {} taxa loaded, {} merged ids)",
            self.len(),
            self.merged.len()
        );
        Ok(Taxonomy {
            store: self,
            caches: QueryCaches::default(),
        })
    }

    /// Counted from the final parent links, so a reparented taxon no longer
    /// counts toward its old parent. Root's self link is skipped.
    fn recount_children(&mut self) {
        let mut counts: AHashMap<String, u32> = AHashMap::new();
        for (id, entry) in &self.entries {
            if let Some(link) = entry.link.as_ref().filter(|l| &l.parent != id) {
                *counts.entry(link.parent.clone()).or_insert(0) += 1;
            }
        }
        self.child_counts = counts;
    }

    fn parent_index(&self, idx: usize) -> Option<usize> {
        let (_, entry) = self.entries.get_index(idx)?;
        let link = entry.link.as_ref()?;
        self.entries
            .get_index_of(&link.parent)
            .filter(|&parent| parent != idx)
    }

    /// Second pass over the finished parent table, so ordering within a
    /// source file no longer matters. Explicit depths act as anchors.
    fn recompute_depths(&mut self) {
        let n = self.entries.len();
        let mut depths: Vec<Option<u32>> = self
            .entries
            .values()
            .map(|e| e.explicit_depth.then_some(e.depth))
            .collect();
        let mut chain = Vec::new();

        for start in 0..n {
            if depths[start].is_some() {
                continue;
            }
            chain.clear();
            let mut cur = start;
            let base = loop {
                if let Some(d) = depths[cur] {
                    break Some(d);
                }
                // a cycle never reaches a known depth
                if chain.len() >= n {
                    break None;
                }
                chain.push(cur);
                match self.parent_index(cur) {
                    Some(parent) => cur = parent,
                    None => break None,
                }
            };

            let mut depth = base.map_or(0, |d| d + 1);
            for &idx in chain.iter().rev() {
                if depths[idx].is_none() {
                    depths[idx] = Some(depth);
                }
                depth += 1;
            }
        }

        for (entry, depth) in self.entries.values_mut().zip(depths) {
            if !entry.explicit_depth {
                entry.depth = depth.unwrap_or(0);
            }
        }
    }
}

/// Memo tables filled lazily by queries; valid for the lifetime of one `Taxonomy`.
#[derive(Debug, Default)]
pub(crate) struct QueryCaches {
    pub(crate) lineages: Mutex<AHashMap<(String, LineageOptions), Arc<Lineage>>>,
    pub(crate) lineage_texts: Mutex<AHashMap<(String, LineageOptions, LineageFormat), Arc<str>>>,
    pub(crate) names: Mutex<AHashMap<NameQuery, Arc<[String]>>>,
}

/// A loaded, read-only taxonomy. Every query goes through [`Taxonomy::resolve`].
#[derive(Debug)]
pub struct Taxonomy {
    store: TaxonStore,
    pub(crate) caches: QueryCaches,
}

impl Taxonomy {
    /// Follows at most one merge hop, then requires both a name and a parent.
    /// Returns the canonical id, or `None` for an unknown taxon.
    pub fn resolve(&self, id: &str) -> Option<&str> {
        let id: &str = match self.store.merged.get(id) {
            Some(new_id) => {
                log::debug!("Merged taxID found: {} -> {}", id, new_id);
                new_id.as_str()
            }
            None => id,
        };
        self.store
            .entries
            .get_key_value(id)
            .filter(|(_, entry)| entry.is_complete())
            .map(|(key, _)| key.as_str())
    }

    pub fn lookup(&self, id: &str) -> Option<Taxon<'_>> {
        let id = self.resolve(id)?;
        let entry = self.store.entries.get(id)?;
        let link = entry.link.as_ref()?;
        Some(Taxon {
            id,
            parent_id: &link.parent,
            rank: &link.rank,
            name: entry.name.as_deref()?,
            depth: entry.depth,
        })
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.lookup(id).map(|t| t.name)
    }

    /// The literal rank stored for the taxon.
    pub fn rank(&self, id: &str) -> Option<&str> {
        self.lookup(id).map(|t| t.rank)
    }

    /// The direct parent, whatever its rank.
    pub fn parent(&self, id: &str) -> Option<&str> {
        self.lookup(id).map(|t| t.parent_id)
    }

    pub fn depth(&self, id: &str) -> Option<u32> {
        self.lookup(id).map(|t| t.depth)
    }

    pub fn status(&self, id: &str) -> TaxonStatus {
        if let Some(new_id) = self.store.merged.get(id) {
            return TaxonStatus::Merged(new_id.clone());
        }
        match self.resolve(id) {
            Some(id) if id.contains('.') => TaxonStatus::ValidCustom,
            Some(_) => TaxonStatus::Valid,
            None => TaxonStatus::Invalid,
        }
    }

    /// True when no loaded taxon names this one as its parent.
    pub fn is_leaf(&self, id: &str) -> bool {
        match self.resolve(id) {
            Some(id) => !self.store.child_counts.contains_key(id),
            None => false,
        }
    }

    pub fn abbreviations(&self) -> &RankAbbreviations {
        &self.store.abbreviations
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// All complete taxa in load order.
    pub fn iter(&self) -> impl Iterator<Item = Taxon<'_>> {
        self.store.entries.iter().filter_map(|(id, entry)| {
            let link = entry.link.as_ref()?;
            Some(Taxon {
                id,
                parent_id: &link.parent,
                rank: &link.rank,
                name: entry.name.as_deref()?,
                depth: entry.depth,
            })
        })
    }

    pub(crate) fn table(&self) -> &NodeTable {
        &self.store.entries
    }

    /// The taxon itself followed by each ancestor, ending at root.
    pub fn path_to_root(&self, id: &str) -> PathToRoot<'_> {
        PathToRoot {
            taxonomy: self,
            next: self.resolve(id),
            remaining: self.store.entries.len(),
        }
    }

    /// Canonical key of an id that has a parent link, merges followed.
    fn node_key(&self, id: &str) -> Option<&str> {
        let id: &str = self.store.merged.get(id).map(String::as_str).unwrap_or(id);
        self.store
            .entries
            .get_key_value(id)
            .filter(|(_, entry)| entry.link.is_some())
            .map(|(key, _)| key.as_str())
    }

    /// Rank and name of a node reached during a walk; either may be absent.
    pub(crate) fn node_rank(&self, id: &str) -> Option<&str> {
        self.store.entries.get(id)?.link.as_ref().map(|l| l.rank.as_str())
    }

    pub(crate) fn node_name(&self, id: &str) -> Option<&str> {
        self.store.entries.get(id)?.name.as_deref()
    }

    /// Gives the tables back for an additive load; caches are dropped.
    pub fn into_store(self) -> TaxonStore {
        self.store
    }
}

/// Iterator returned by [`Taxonomy::path_to_root`].
pub struct PathToRoot<'a> {
    taxonomy: &'a Taxonomy,
    next: Option<&'a str>,
    remaining: usize,
}

impl<'a> Iterator for PathToRoot<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let current = self.next.take()?;
        if self.remaining == 0 {
            log::warn!("Cycle detected in taxonomy while walking from {}", current);
            return None;
        }
        self.remaining -= 1;

        if current != ROOT_ID {
            let parent = self
                .taxonomy
                .store
                .entries
                .get(current)
                .and_then(|e| e.link.as_ref())
                .and_then(|l| self.taxonomy.node_key(&l.parent));
            self.next = parent.filter(|&p| p != current);
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_store() -> TaxonStore {
        let mut store = TaxonStore::new(RankAbbreviations::ncbi());
        store.insert("1", "1", NO_RANK, "root", None);
        store.insert("2", "1", "superkingdom", "Bacteria", None);
        store.insert("1224", "2", "phylum", "Proteobacteria", None);
        store.insert("562", "1224", "species", "Escherichia coli", None);
        store
    }

    #[test]
    fn insert_computes_depth_from_loaded_parent() {
        let tax = small_store().finish().unwrap();
        assert_eq!(tax.depth("1"), Some(0));
        assert_eq!(tax.depth("2"), Some(1));
        assert_eq!(tax.depth("562"), Some(3));
    }

    #[test]
    fn finish_repairs_depth_of_children_loaded_before_parents() {
        let mut store = TaxonStore::new(RankAbbreviations::ncbi());
        store.insert("562", "1224", "species", "Escherichia coli", None);
        store.insert("1224", "2", "phylum", "Proteobacteria", None);
        store.insert("2", "1", "superkingdom", "Bacteria", None);
        store.insert("1", "1", NO_RANK, "root", None);
        let tax = store.finish().unwrap();
        assert_eq!(tax.depth("562"), Some(3));
        assert_eq!(tax.depth("1224"), Some(2));
    }

    #[test]
    fn explicit_depth_is_kept() {
        let mut store = small_store();
        store.insert("9999", "562", "no rank", "custom strain", Some(42));
        let tax = store.finish().unwrap();
        assert_eq!(tax.depth("9999"), Some(42));
    }

    #[test]
    fn resolve_requires_name_and_parent() {
        let mut store = small_store();
        store.insert_name("777", "name only");
        store.insert_node("888", "2", "phylum");
        let tax = store.finish().unwrap();
        assert_eq!(tax.resolve("562"), Some("562"));
        assert_eq!(tax.resolve("777"), None);
        assert_eq!(tax.resolve("888"), None);
        assert_eq!(tax.resolve("nope"), None);
        assert!(tax.lookup("777").is_none());
    }

    #[test]
    fn resolve_follows_one_merge_hop() {
        let mut store = small_store();
        store.insert_merged("469598", "562");
        let tax = store.finish().unwrap();
        assert_eq!(tax.resolve("469598"), Some("562"));
        assert_eq!(tax.resolve("469598"), tax.resolve("469598"));
        assert_eq!(tax.name("469598"), Some("Escherichia coli"));
        assert_eq!(tax.status("469598"), TaxonStatus::Merged("562".to_string()));
    }

    #[test]
    fn status_distinguishes_custom_ids() {
        let mut store = small_store();
        store.insert("562.7", "562", "no rank", "custom", None);
        let tax = store.finish().unwrap();
        assert_eq!(tax.status("562"), TaxonStatus::Valid);
        assert_eq!(tax.status("562.7"), TaxonStatus::ValidCustom);
        assert_eq!(tax.status("000"), TaxonStatus::Invalid);
    }

    #[test]
    fn leaf_means_no_child_points_here() {
        let tax = small_store().finish().unwrap();
        assert!(tax.is_leaf("562"));
        assert!(!tax.is_leaf("2"));
        assert!(!tax.is_leaf("1"));
        assert!(!tax.is_leaf("unknown"));
        for taxon in tax.iter() {
            let has_child = tax.iter().any(|t| t.parent_id == taxon.id && t.id != taxon.id);
            assert_eq!(tax.is_leaf(taxon.id), !has_child, "taxon {}", taxon.id);
        }
    }

    #[test]
    fn reparented_taxon_releases_old_parent() {
        let mut store = small_store().finish().unwrap().into_store();
        store.insert("562", "2", "species", "Escherichia coli", None);
        let tax = store.finish().unwrap();
        assert!(tax.is_leaf("1224"));
        assert!(!tax.is_leaf("2"));
        assert_eq!(tax.depth("562"), Some(2));
        for taxon in tax.iter() {
            let has_child = tax.iter().any(|t| t.parent_id == taxon.id && t.id != taxon.id);
            assert_eq!(tax.is_leaf(taxon.id), !has_child, "taxon {}", taxon.id);
        }
    }

    #[test]
    fn empty_store_cannot_be_queried() {
        let store = TaxonStore::new(RankAbbreviations::ncbi());
        assert!(matches!(store.finish(), Err(TaxonomyError::NotLoaded)));
    }

    #[test]
    fn path_to_root_ends_at_root() {
        let tax = small_store().finish().unwrap();
        let path: Vec<&str> = tax.path_to_root("562").collect();
        assert_eq!(path, vec!["562", "1224", "2", "1"]);
        assert_eq!(tax.path_to_root("missing").count(), 0);
    }

    #[test]
    fn path_to_root_stops_on_cycles() {
        let mut store = small_store();
        store.insert("a", "b", NO_RANK, "a", None);
        store.insert("b", "a", NO_RANK, "b", None);
        let tax = store.finish().unwrap();
        assert!(tax.path_to_root("a").count() <= tax.table().len());
    }

    #[test]
    fn ensure_root_keeps_existing_root() {
        let mut store = small_store();
        store.ensure_root();
        let tax = store.finish().unwrap();
        assert_eq!(tax.rank("1"), Some(NO_RANK));

        let mut store = TaxonStore::new(RankAbbreviations::gtdb());
        store.ensure_root();
        let tax = store.finish().unwrap();
        assert_eq!(tax.name("1"), Some(ROOT_NAME));
        assert_eq!(tax.parent("1"), Some(ROOT_ID));
    }

    #[test]
    fn additive_load_overwrites_and_extends() {
        let mut store = small_store().finish().unwrap().into_store();
        store.insert("562", "1224", "species", "E. coli (custom)", None);
        store.insert("562.1", "562", "strain", "E. coli lab strain", None);
        let tax = store.finish().unwrap();
        assert_eq!(tax.name("562"), Some("E. coli (custom)"));
        assert_eq!(tax.parent("562.1"), Some("562"));
        assert!(!tax.is_leaf("562"));
    }
}
