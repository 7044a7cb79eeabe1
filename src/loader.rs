//src/loader.rs

use std::path::{Path, PathBuf};

use crate::error::{Result, TaxonomyError};
use crate::formats::{ncbi, open_reader, tsv, CustomFormat};
use crate::rank_abbr::RankAbbreviations;
use crate::taxdb::{TaxonStore, Taxonomy};

pub const DEFAULT_TAXONOMY_DIR: &str = "./taxonomy_db";
pub const TAXDUMP_ARCHIVE: &str = "taxdump.tar.gz";
pub const TAXONOMY_TSV: &str = "taxonomy.tsv";
pub const CUSTOM_TAXONOMY_TSV: &str = "taxonomy.custom.tsv";

pub fn default_taxonomy_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TAXONOMY_DIR)
}

/// Where to find a taxonomy and how to read it.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub taxonomy_dir: PathBuf,
    /// Defaults to `<taxonomy_dir>/taxonomy.custom.tsv`, loaded only if present.
    pub custom_file: Option<PathBuf>,
    pub custom_format: CustomFormat,
    /// Overrides both the bundled table and the directory's JSON.
    pub abbreviations: Option<RankAbbreviations>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::new(default_taxonomy_dir())
    }
}

impl LoadOptions {
    pub fn new(taxonomy_dir: impl Into<PathBuf>) -> Self {
        Self {
            taxonomy_dir: taxonomy_dir.into(),
            custom_file: None,
            custom_format: CustomFormat::default(),
            abbreviations: None,
        }
    }

    pub fn with_custom(mut self, path: impl Into<PathBuf>, format: CustomFormat) -> Self {
        self.custom_file = Some(path.into());
        self.custom_format = format;
        self
    }

    fn custom_path(&self) -> PathBuf {
        self.custom_file
            .clone()
            .unwrap_or_else(|| self.taxonomy_dir.join(CUSTOM_TAXONOMY_TSV))
    }

    /// Explicit table, else the directory's `major_level_to_abbr.json`, else
    /// the bundled GTDB table for GTDB input or the NCBI table otherwise.
    pub fn resolve_abbreviations(&self) -> Result<RankAbbreviations> {
        if let Some(abbreviations) = &self.abbreviations {
            return Ok(abbreviations.clone());
        }
        let bundled = if self.custom_format.is_gtdb() {
            RankAbbreviations::gtdb()
        } else {
            RankAbbreviations::ncbi()
        };
        RankAbbreviations::for_taxonomy_dir(&self.taxonomy_dir, bundled)
    }
}

/// Loads every taxonomy source found under `options.taxonomy_dir`.
pub fn load_taxonomy(options: &LoadOptions) -> Result<Taxonomy> {
    let mut store = TaxonStore::new(options.resolve_abbreviations()?);
    load_into(&mut store, options)?;
    store.finish()
}

/// Adds the sources to an existing store. In order: `names.dmp` + `nodes.dmp`
/// (else `taxdump.tar.gz`), `merged.dmp`, `taxonomy.tsv`, then the custom file.
/// Later sources overwrite ids they share with earlier ones.
pub fn load_into(store: &mut TaxonStore, options: &LoadOptions) -> Result<()> {
    let dir = options.taxonomy_dir.as_path();
    log::debug!("Taxonomy directory: {}", dir.display());

    let names = dir.join(ncbi::NAMES_DMP);
    let nodes = dir.join(ncbi::NODES_DMP);
    let merged = dir.join(ncbi::MERGED_DMP);
    let archive = dir.join(TAXDUMP_ARCHIVE);
    let flat = dir.join(TAXONOMY_TSV);
    let custom = options.custom_path();

    let has_dmp = names.is_file() && nodes.is_file();
    if !has_dmp && !archive.is_file() && !flat.is_file() && !custom.is_file() {
        log::error!("No available taxonomy files in {}", dir.display());
        return Err(TaxonomyError::NoTaxonomyFiles(dir.to_path_buf()));
    }

    if has_dmp {
        ncbi::load_dmp_files(store, &names, &nodes, merged.is_file().then_some(merged.as_path()))?;
    } else if archive.is_file() {
        ncbi::load_taxdump_archive(store, &archive)?;
        if merged.is_file() {
            load_merged_file(store, &merged)?;
        }
    }

    if flat.is_file() {
        tsv::load_tsv_file(store, &flat)?;
    }

    // a custom file named explicitly must exist
    if custom.is_file() || options.custom_file.is_some() {
        options.custom_format.load_file(store, &custom)?;
    }
    Ok(())
}

fn load_merged_file(store: &mut TaxonStore, path: &Path) -> Result<usize> {
    log::info!("Open merged taxonomy node file: {}", path.display());
    ncbi::load_merged(store, open_reader(path)?, path)
}
