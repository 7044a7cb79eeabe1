//src/rank.rs

use crate::taxdb::{Taxonomy, NO_RANK, ROOT_ID, ROOT_NAME};

pub const SPECIES: &str = "species";
pub const STRAIN: &str = "strain";
pub const SPECIES_OTHERS: &str = "species - others";
pub const OTHERS: &str = "others";

/// Rank of a taxon, with `no rank` optionally replaced by a guess:
/// leaves are strains, inner nodes under a species are `species - others`,
/// anything else is `others`. Root is always `root`.
pub fn rank_of<'a>(tax: &'a Taxonomy, id: &str, guess_strain: bool) -> Option<&'a str> {
    let taxon = tax.lookup(id)?;
    if taxon.id == ROOT_ID {
        return Some(ROOT_NAME);
    }
    if taxon.rank != NO_RANK || !guess_strain {
        return Some(taxon.rank);
    }
    if tax.is_leaf(taxon.id) {
        return Some(STRAIN);
    }
    let major = nearest_major_rank(tax, taxon.id)?;
    if major != ROOT_ID && tax.node_rank(major) == Some(SPECIES) {
        Some(SPECIES_OTHERS)
    } else {
        Some(OTHERS)
    }
}

/// Id of the closest strict ancestor whose rank is a major rank, or root.
pub fn nearest_major_rank<'a>(tax: &'a Taxonomy, id: &str) -> Option<&'a str> {
    tax.resolve(id)?;
    let abbreviations = tax.abbreviations();
    let found = tax
        .path_to_root(id)
        .skip(1)
        .take_while(|&p| p != ROOT_ID)
        .find(|&p| tax.node_rank(p).is_some_and(|rank| abbreviations.is_major(rank)));
    Some(found.unwrap_or(ROOT_ID))
}

/// The taxon just below the nearest species ancestor, grouping strains into
/// sub-species types (mostly useful for viruses). `None` when there is no
/// species above, or when the input itself sits directly below it.
pub fn type_of<'a>(tax: &'a Taxonomy, id: &str) -> Option<&'a str> {
    let mut path = tax.path_to_root(id);
    let origin = path.next()?;
    let mut below = origin;
    for ancestor in path {
        if ancestor == ROOT_ID {
            return None;
        }
        if tax.node_rank(ancestor) == Some(SPECIES) {
            return (below != origin).then_some(below);
        }
        below = ancestor;
    }
    None
}

/// First ancestor with a real rank; `no rank` ancestors are skipped.
pub fn effective_parent<'a>(tax: &'a Taxonomy, id: &str) -> Option<&'a str> {
    let id = tax.resolve(id)?;
    if id == ROOT_ID {
        return Some(ROOT_ID);
    }
    tax.path_to_root(id)
        .skip(1)
        .find(|&p| p == ROOT_ID || tax.node_rank(p) != Some(NO_RANK))
}

pub fn is_leaf(tax: &Taxonomy, id: &str) -> bool {
    tax.is_leaf(id)
}

/// Ancestor (or self) whose rank matches `target_rank`, ignoring case.
///
/// `root` answers root without walking; `strain` answers a leaf itself.
pub fn id_on_rank<'a>(tax: &'a Taxonomy, id: &str, target_rank: &str) -> Option<&'a str> {
    let id = tax.resolve(id)?;
    if target_rank.eq_ignore_ascii_case(ROOT_NAME) {
        return Some(ROOT_ID);
    }
    if target_rank.eq_ignore_ascii_case(STRAIN) && tax.is_leaf(id) {
        return Some(id);
    }
    for node in tax.path_to_root(id) {
        if tax.node_rank(node).is_some_and(|rank| rank.eq_ignore_ascii_case(target_rank)) {
            return Some(node);
        }
        if tax.node_name(node) == Some(ROOT_NAME) {
            break;
        }
    }
    None
}

/// Name of [`id_on_rank`]'s answer.
pub fn name_on_rank<'a>(tax: &'a Taxonomy, id: &str, target_rank: &str) -> Option<&'a str> {
    let found = id_on_rank(tax, id, target_rank)?;
    if found == ROOT_ID {
        return Some(tax.node_name(ROOT_ID).unwrap_or(ROOT_NAME));
    }
    tax.node_name(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn guessed_ranks_replace_no_rank() {
        let tax = fixtures::ncbi_taxonomy();
        assert_eq!(rank_of(&tax, "511145", true), Some(STRAIN));
        assert_eq!(rank_of(&tax, "83333", true), Some(SPECIES_OTHERS));
        assert_eq!(rank_of(&tax, "131567", true), Some(OTHERS));
        assert_eq!(rank_of(&tax, "83333", false), Some(NO_RANK));
        assert_eq!(rank_of(&tax, "9606", true), Some(SPECIES));
        assert_eq!(rank_of(&tax, "1", false), Some(ROOT_NAME));
        assert_eq!(rank_of(&tax, "404", true), None);
    }

    #[test]
    fn guessing_never_yields_no_rank() {
        let tax = fixtures::ncbi_taxonomy();
        for taxon in tax.iter() {
            assert_ne!(rank_of(&tax, taxon.id, true), Some(NO_RANK), "taxon {}", taxon.id);
        }
    }

    #[test]
    fn nearest_major_rank_skips_minor_ancestors() {
        let tax = fixtures::ncbi_taxonomy();
        assert_eq!(nearest_major_rank(&tax, "511145"), Some("562"));
        assert_eq!(nearest_major_rank(&tax, "9606"), Some("9605"));
        // kingdom is not a major rank
        assert_eq!(nearest_major_rank(&tax, "7711"), Some("2759"));
        assert_eq!(nearest_major_rank(&tax, "2759"), Some(ROOT_ID));
        assert_eq!(nearest_major_rank(&tax, "missing"), None);
    }

    #[test]
    fn type_is_child_of_nearest_species() {
        let tax = fixtures::ncbi_taxonomy();
        assert_eq!(type_of(&tax, "511145"), Some("83333"));
        assert_eq!(type_of(&tax, "83333"), None);
        assert_eq!(type_of(&tax, "63221"), None);
        assert_eq!(type_of(&tax, "562"), None);
        assert_eq!(type_of(&tax, "1"), None);
    }

    #[test]
    fn effective_parent_skips_unranked_nodes() {
        let tax = fixtures::ncbi_taxonomy();
        assert_eq!(effective_parent(&tax, "511145"), Some("562"));
        assert_eq!(effective_parent(&tax, "562"), Some("561"));
        assert_eq!(effective_parent(&tax, "2759"), Some(ROOT_ID));
        assert_eq!(effective_parent(&tax, "1"), Some(ROOT_ID));
        assert_eq!(effective_parent(&tax, "469598"), Some("561"));
    }

    #[test]
    fn rank_lookup_is_case_insensitive() {
        let tax = fixtures::ncbi_taxonomy();
        assert_eq!(name_on_rank(&tax, "511145", "genus"), Some("Escherichia"));
        assert_eq!(name_on_rank(&tax, "9606", "GENUS"), Some("Homo"));
        assert_eq!(name_on_rank(&tax, "9606", "kingdom"), Some("Metazoa"));
        assert_eq!(id_on_rank(&tax, "469598", "Species"), Some("562"));
        assert_eq!(id_on_rank(&tax, "9606", "species"), Some("9606"));
    }

    #[test]
    fn strain_and_root_short_circuit() {
        let tax = fixtures::ncbi_taxonomy();
        assert_eq!(name_on_rank(&tax, "511145", "strain"), Some("Escherichia coli str. K-12 substr. MG1655"));
        assert_eq!(id_on_rank(&tax, "511145", "strain"), Some("511145"));
        assert_eq!(id_on_rank(&tax, "83333", "strain"), None);
        assert_eq!(name_on_rank(&tax, "9606", "root"), Some("root"));
        assert_eq!(id_on_rank(&tax, "9606", "root"), Some(ROOT_ID));
    }

    #[test]
    fn missing_rank_gives_nothing() {
        let tax = fixtures::ncbi_taxonomy();
        assert_eq!(name_on_rank(&tax, "562", "kingdom"), None);
        assert_eq!(id_on_rank(&tax, "unknown", "genus"), None);
    }
}
