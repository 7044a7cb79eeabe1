// src/lib.rs
pub mod accession;
pub mod error;
pub mod formats;
pub mod lineage;
pub mod loader;
pub mod names;
pub mod otu;
pub mod rank;
pub mod rank_abbr;
pub mod taxdb;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use crate::accession::AccessionIndex;
pub use crate::error::{Result, TaxonomyError};
pub use crate::formats::CustomFormat;
pub use crate::lineage::{full_lineage, full_lineage_text, lca, lineage, lineage_text, LineageFormat, LineageOptions};
pub use crate::loader::{load_taxonomy, LoadOptions};
pub use crate::names::{name_to_taxids, reset_name_cache, NameQuery};
pub use crate::rank::{effective_parent, id_on_rank, name_on_rank, nearest_major_rank, rank_of, type_of};
pub use crate::rank_abbr::RankAbbreviations;
pub use crate::taxdb::{TaxonStore, Taxonomy, ROOT_ID};
pub use crate::types::{Lineage, LineageStep, OtuRow, RankEntry, Taxon, TaxonStatus};
