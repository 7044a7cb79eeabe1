//src/lineage.rs

use ahash::AHashMap;
use std::sync::Arc;

use crate::formats::lineage_text::placeholder_name;
use crate::rank::{nearest_major_rank, rank_of, type_of, STRAIN};
use crate::taxdb::{Taxonomy, ROOT_ID, ROOT_NAME};
use crate::types::{Lineage, LineageStep, RankEntry};

/// Shape of a major-rank lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineageOptions {
    /// Fill rank gaps with `"<child> - no_<abbr>_rank"` placeholders.
    pub include_all_ranks: bool,
    /// Keep the strain slot. A leaf without a rank counts as its own strain.
    pub include_strain: bool,
    /// Replace spaces in names with underscores.
    pub normalize_spaces: bool,
}

impl Default for LineageOptions {
    fn default() -> Self {
        Self {
            include_all_ranks: true,
            include_strain: false,
            normalize_spaces: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineageFormat {
    /// `rank|id|name|rank|id|name...`; placeholders have id `0`.
    #[default]
    Pipe,
    /// `abbr__name;abbr__name...`
    Short,
}

/// Major-rank lineage of `id`, memoized per raw id and options.
pub fn lineage(tax: &Taxonomy, id: &str, options: LineageOptions) -> Option<Arc<Lineage>> {
    let key = (id.to_string(), options);
    if let Some(hit) = tax.caches.lineages.lock().get(&key) {
        return Some(Arc::clone(hit));
    }
    let built = Arc::new(build_lineage(tax, id, options)?);
    tax.caches.lineages.lock().insert(key, Arc::clone(&built));
    Some(built)
}

fn build_lineage(tax: &Taxonomy, id: &str, options: LineageOptions) -> Option<Lineage> {
    let taxon = tax.lookup(id)?;
    let abbreviations = tax.abbreviations();
    let normalize = |name: &str| {
        if options.normalize_spaces {
            name.replace(' ', "_")
        } else {
            name.to_string()
        }
    };

    // nearest ancestor wins when a rank repeats
    let mut found: AHashMap<&str, RankEntry> = AHashMap::new();
    for node in tax.path_to_root(taxon.id) {
        if node == ROOT_ID {
            break;
        }
        let (Some(rank), Some(name)) = (tax.node_rank(node), tax.node_name(node)) else {
            continue;
        };
        if name == ROOT_NAME {
            break;
        }
        if abbreviations.is_major(rank) && !found.contains_key(rank) {
            found.insert(
                rank,
                RankEntry {
                    name: normalize(name),
                    id: Some(node.to_string()),
                },
            );
        }
    }

    if options.include_strain
        && abbreviations.is_major(STRAIN)
        && !found.contains_key(STRAIN)
        && rank_of(tax, taxon.id, true) == Some(STRAIN)
    {
        found.insert(
            STRAIN,
            RankEntry {
                name: normalize(taxon.name),
                id: Some(taxon.id.to_string()),
            },
        );
    }

    if options.include_all_ranks {
        // gaps are filled from the taxon's own major rank (or its nearest
        // major ancestor's) up to the most general rank
        let start_rank = if abbreviations.is_major(taxon.rank) {
            Some(taxon.rank)
        } else {
            nearest_major_rank(tax, taxon.id)
                .filter(|&major| major != ROOT_ID)
                .and_then(|major| tax.node_rank(major))
        };
        let ranks: Vec<(&str, &str)> = abbreviations.iter().collect();
        let start = start_rank
            .and_then(|rank| ranks.iter().position(|&(r, _)| r == rank))
            .unwrap_or(0);
        let upto = (start + 1).min(ranks.len());

        let mut last = normalize(taxon.name);
        for &(rank, abbr) in ranks[..upto].iter().rev() {
            match found.get(rank) {
                Some(entry) => last.clone_from(&entry.name),
                None => {
                    let name = placeholder_name(&last, abbr);
                    found.insert(rank, RankEntry { name: name.clone(), id: None });
                    last = name;
                }
            }
        }
    }

    let mut lineage = Lineage::default();
    for (rank, _) in abbreviations.iter() {
        if rank == STRAIN && !options.include_strain {
            continue;
        }
        if let Some(entry) = found.remove(rank) {
            lineage.ranks.insert(rank.to_string(), entry);
        }
    }
    lineage.type_entry = type_of(tax, taxon.id).and_then(|type_id| {
        Some(RankEntry {
            name: tax.node_name(type_id)?.to_string(),
            id: Some(type_id.to_string()),
        })
    });
    Some(lineage)
}

/// Text rendering of [`lineage`], memoized per raw id, options and format.
pub fn lineage_text(tax: &Taxonomy, id: &str, options: LineageOptions, format: LineageFormat) -> Option<String> {
    let key = (id.to_string(), options, format);
    if let Some(hit) = tax.caches.lineage_texts.lock().get(&key) {
        return Some(hit.to_string());
    }

    let lineage = lineage(tax, id, options)?;
    let abbreviations = tax.abbreviations();
    let parts: Vec<String> = lineage
        .iter()
        .map(|(rank, entry)| match format {
            LineageFormat::Pipe => format!("{}|{}|{}", rank, entry.id.as_deref().unwrap_or("0"), entry.name),
            LineageFormat::Short => format!("{}__{}", abbreviations.abbr(rank).unwrap_or(rank), entry.name),
        })
        .collect();
    let text = match format {
        LineageFormat::Pipe => parts.join("|"),
        LineageFormat::Short => parts.join(";"),
    };

    tax.caches.lineage_texts.lock().insert(key, Arc::from(text.as_str()));
    Some(text)
}

/// Every real ancestor from the taxon up to (not including) root, whatever
/// its rank. Stops early at the first ancestor without a name.
pub fn full_lineage<'a>(tax: &'a Taxonomy, id: &str) -> Option<Vec<LineageStep<'a>>> {
    tax.resolve(id)?;
    let mut steps = Vec::new();
    for node in tax.path_to_root(id) {
        if node == ROOT_ID {
            break;
        }
        let Some(name) = tax.node_name(node) else { break };
        steps.push(LineageStep {
            id: node,
            rank: tax.node_rank(node).unwrap_or_default(),
            name,
        });
    }
    Some(steps)
}

/// [`full_lineage`] rendered root first, as `rank|id|name` or `rank__name`.
pub fn full_lineage_text(
    tax: &Taxonomy,
    id: &str,
    format: LineageFormat,
    use_rank_abbr: bool,
    normalize_spaces: bool,
) -> Option<String> {
    let steps = full_lineage(tax, id)?;
    let abbreviations = tax.abbreviations();
    let parts: Vec<String> = steps
        .iter()
        .rev()
        .map(|step| {
            let rank = if use_rank_abbr {
                abbreviations.abbr(step.rank).unwrap_or(step.rank)
            } else {
                step.rank
            };
            match format {
                LineageFormat::Pipe => format!("{}|{}|{}", rank, step.id, step.name),
                LineageFormat::Short => format!("{}__{}", rank, step.name),
            }
        })
        .collect();
    let text = match format {
        LineageFormat::Pipe => parts.join("|"),
        LineageFormat::Short => parts.join(";"),
    };
    Some(if normalize_spaces { text.replace(' ', "_") } else { text })
}

/// Lowest common ancestor over major ranks.
///
/// Ranks are tried from the most specific. A rank settles the answer when
/// every known taxon has the same real ancestor there; a taxon with nothing
/// (or only a placeholder) at that rank keeps the rank from settling.
/// Unknown ids are ignored, and root is returned when no rank agrees.
pub fn lca<I, S>(tax: &Taxonomy, ids: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let options = LineageOptions {
        include_all_ranks: true,
        include_strain: true,
        normalize_spaces: false,
    };
    let lineages: Vec<Arc<Lineage>> = ids
        .into_iter()
        .filter_map(|id| lineage(tax, id.as_ref(), options))
        .collect();

    for (rank, _) in tax.abbreviations().iter().rev() {
        let mut distinct: Vec<Option<&str>> = Vec::new();
        for lineage in &lineages {
            let ancestor = lineage.get(rank).and_then(|entry| entry.id.as_deref());
            if !distinct.contains(&ancestor) {
                distinct.push(ancestor);
            }
        }
        if let [Some(ancestor)] = distinct.as_slice() {
            return ancestor.to_string();
        }
    }
    ROOT_ID.to_string()
}
