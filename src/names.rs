//src/names.rs

use rayon::prelude::*;
use std::sync::Arc;

use crate::taxdb::Taxonomy;

/// A scientific-name search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NameQuery {
    pub name: String,
    /// Keep only taxa whose literal rank equals this.
    pub rank: Option<String>,
    /// Substring match instead of exact match.
    pub partial: bool,
    /// Stop at the first match in load order.
    pub first_only: bool,
}

impl NameQuery {
    pub fn exact(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn matches(&self, name: &str, rank: &str) -> bool {
        let name_ok = if self.partial {
            name.contains(self.name.as_str())
        } else {
            name == self.name
        };
        name_ok && self.rank.as_deref().map_or(true, |wanted| wanted == rank)
    }
}

/// Ids whose scientific name matches `query`, in load order. Memoized per query.
pub fn name_to_taxids(tax: &Taxonomy, query: &NameQuery) -> Arc<[String]> {
    if let Some(hit) = tax.caches.names.lock().get(query) {
        return Arc::clone(hit);
    }

    let candidate = |(id, entry): (&String, &crate::taxdb::TaxonEntry)| {
        let name = entry.name.as_deref()?;
        let link = entry.link.as_ref()?;
        query.matches(name, &link.rank).then(|| id.clone())
    };

    let table = tax.table();
    let matched: Vec<String> = if query.first_only {
        table.par_iter().find_map_first(candidate).into_iter().collect()
    } else {
        table.par_iter().filter_map(candidate).collect()
    };
    log::debug!("Name query '{}' matched {} taxa", query.name, matched.len());

    let matched: Arc<[String]> = matched.into();
    tax.caches.names.lock().insert(query.clone(), Arc::clone(&matched));
    matched
}

/// Drops memoized name searches.
pub fn reset_name_cache(tax: &Taxonomy) {
    tax.caches.names.lock().clear();
}
