//src/formats/gtdb.rs

use std::io::BufRead;
use std::path::Path;

use crate::accession::strip_version;
use crate::error::{Result, TaxonomyError};
use crate::formats::lineage_text::{insert_lineage, split_token};
use crate::formats::{data_lines, split_columns};
use crate::rank::STRAIN;
use crate::taxdb::TaxonStore;

const METADATA_COLUMNS: usize = 110;
/// `gtdb_taxonomy` column of the metadata table.
const METADATA_LINEAGE_COL: usize = 16;
/// `ncbi_organism_name` column of the metadata table.
const METADATA_ORGANISM_COL: usize = 62;

/// Abbreviation GTDB uses for the genome leaf, unless the store's table
/// names its own strain code.
const GENOME_ABBR: &str = "x";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GtdbLayout {
    /// `accession<TAB>d__...;s__...`
    Taxonomy,
    /// The 110-column `*_metadata.tsv` release table.
    Metadata,
}

impl GtdbLayout {
    fn columns(self) -> usize {
        match self {
            GtdbLayout::Taxonomy => 2,
            GtdbLayout::Metadata => METADATA_COLUMNS,
        }
    }
}

/// Loads GTDB lineages, each ending in a genome leaf whose id is the
/// accession without its version. Tokens are read with the store's rank
/// table. Any malformed row aborts the load.
pub fn load_gtdb<R: BufRead>(store: &mut TaxonStore, reader: R, origin: &Path, layout: GtdbLayout) -> Result<usize> {
    let abbreviations = store.abbreviations().clone();
    let genome_abbr = abbreviations.abbr(STRAIN).unwrap_or(GENOME_ABBR).to_string();
    let mut genomes = 0;

    for record in data_lines(reader, origin) {
        let (line_no, line) = record?;
        if line.starts_with("accession") {
            continue;
        }
        let fields = split_columns(&line, layout.columns(), origin, line_no)?;
        let accession = fields[0];
        let (lineage, leaf_name) = match layout {
            GtdbLayout::Taxonomy => (fields[1], accession.to_string()),
            GtdbLayout::Metadata => (
                fields[METADATA_LINEAGE_COL],
                format!("{} ({})", fields[METADATA_ORGANISM_COL], accession),
            ),
        };

        let mut tokens = Vec::new();
        for token in lineage.split(';') {
            let parsed = split_token(token).ok_or_else(|| {
                TaxonomyError::malformed(origin, line_no, format!("invalid lineage token '{token}'"))
            })?;
            tokens.push(parsed);
        }
        tokens.push((genome_abbr.as_str(), leaf_name.as_str()));

        insert_lineage(store, &tokens, &abbreviations, Some(strip_version(accession)));
        genomes += 1;
    }
    Ok(genomes)
}
