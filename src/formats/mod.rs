//src/formats/mod.rs

pub mod gtdb;
pub mod lineage_text;
pub mod ncbi;
pub mod tsv;

use flate2::read::MultiGzDecoder;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, TaxonomyError};
use crate::taxdb::TaxonStore;

/// Format of a custom taxonomy file loaded on top of (or instead of) NCBI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CustomFormat {
    /// `id, depth, parent, rank, name`, same shape as `taxonomy.tsv`.
    #[default]
    Tsv,
    /// `sk__Name;p__Name;...` lines (MGnify style).
    Lineage,
    /// GTDB `accession<TAB>lineage`.
    GtdbTaxonomy,
    /// GTDB metadata table, 110 columns.
    GtdbMetadata,
}

impl CustomFormat {
    pub fn is_gtdb(self) -> bool {
        matches!(self, CustomFormat::GtdbTaxonomy | CustomFormat::GtdbMetadata)
    }

    /// Loads `path` into `store` with the matching parser; returns the record count.
    pub fn load_file(self, store: &mut TaxonStore, path: &Path) -> Result<usize> {
        log::info!("Open custom taxonomy node file ({}): {}", self, path.display());
        let reader = open_reader(path)?;
        let count = match self {
            CustomFormat::Tsv => tsv::load_tsv(store, reader, path)?,
            CustomFormat::Lineage => lineage_text::load_lineages(store, reader, path)?,
            CustomFormat::GtdbTaxonomy => gtdb::load_gtdb(store, reader, path, gtdb::GtdbLayout::Taxonomy)?,
            CustomFormat::GtdbMetadata => gtdb::load_gtdb(store, reader, path, gtdb::GtdbLayout::Metadata)?,
        };
        log::info!("Done parsing custom taxonomy file ({} records).", count);
        Ok(count)
    }
}

impl FromStr for CustomFormat {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tsv" => Ok(CustomFormat::Tsv),
            "lineage" | "mgnify_lineage" => Ok(CustomFormat::Lineage),
            "gtdb_taxonomy" => Ok(CustomFormat::GtdbTaxonomy),
            "gtdb_metadata" => Ok(CustomFormat::GtdbMetadata),
            _ => Err(TaxonomyError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for CustomFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CustomFormat::Tsv => "tsv",
            CustomFormat::Lineage => "lineage",
            CustomFormat::GtdbTaxonomy => "gtdb_taxonomy",
            CustomFormat::GtdbMetadata => "gtdb_metadata",
        };
        f.write_str(name)
    }
}

/// Opens a text file, transparently decompressing `.gz`.
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let f = File::open(path).map_err(|e| TaxonomyError::open(path, e))?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    Ok(if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    })
}

/// Non-blank, non-comment lines with their 1-based line numbers.
pub(crate) fn data_lines<'p, R>(reader: R, origin: &'p Path) -> impl Iterator<Item = Result<(usize, String)>> + 'p
where
    R: BufRead + 'p,
{
    reader
        .lines()
        .enumerate()
        .filter_map(move |(idx, line)| match line {
            Err(e) => Some(Err(TaxonomyError::read(origin, e))),
            Ok(line) => {
                let trimmed = line.trim_end_matches(['\r', '\n']);
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    None
                } else {
                    Some(Ok((idx + 1, trimmed.to_string())))
                }
            }
        })
}

/// Splits a tab-separated row and insists on an exact column count.
pub(crate) fn split_columns<'l>(line: &'l str, expected: usize, origin: &Path, line_no: usize) -> Result<Vec<&'l str>> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != expected {
        log::error!("Incorrect column count in {} at line {}", origin.display(), line_no);
        return Err(TaxonomyError::ColumnCount {
            path: origin.to_path_buf(),
            line: line_no,
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}
