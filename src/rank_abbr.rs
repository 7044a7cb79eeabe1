//src/rank_abbr.rs

use ahash::AHashMap;
use indexmap::IndexMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, TaxonomyError};

/// File name looked up inside a taxonomy directory to override the bundled table.
pub const ABBR_JSON_FILE: &str = "major_level_to_abbr.json";

const NCBI_MAJOR_LEVELS: [(&str, &str); 8] = [
    ("superkingdom", "sk"),
    ("phylum", "p"),
    ("class", "c"),
    ("order", "o"),
    ("family", "f"),
    ("genus", "g"),
    ("species", "s"),
    ("strain", "n"),
];

const GTDB_MAJOR_LEVELS: [(&str, &str); 8] = [
    ("superkingdom", "d"),
    ("phylum", "p"),
    ("class", "c"),
    ("order", "o"),
    ("family", "f"),
    ("genus", "g"),
    ("species", "s"),
    ("strain", "x"),
];

/// Bidirectional mapping between the major ranks and their short codes.
///
/// Order matters: ranks are kept from the most general (superkingdom) to the
/// most specific (species or strain), exactly as listed in the JSON source.
#[derive(Debug, Clone)]
pub struct RankAbbreviations {
    major_to_abbr: IndexMap<String, String>,
    abbr_to_major: AHashMap<String, String>,
}

impl RankAbbreviations {
    /// The table used for NCBI-derived taxonomies.
    pub fn ncbi() -> Self {
        Self::from_pairs(NCBI_MAJOR_LEVELS)
    }

    /// The table used for GTDB lineages (`d__` domain, `x__` genome leaf).
    pub fn gtdb() -> Self {
        Self::from_pairs(GTDB_MAJOR_LEVELS)
    }

    fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let major_to_abbr: IndexMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let abbr_to_major = major_to_abbr
            .iter()
            .map(|(rank, abbr)| (abbr.clone(), rank.clone()))
            .collect();
        Self {
            major_to_abbr,
            abbr_to_major,
        }
    }

    /// Parses a `{"rank": "abbr", ...}` JSON object, keeping key order.
    pub fn from_json_str(json: &str, origin: &Path) -> Result<Self> {
        let parsed: IndexMap<String, String> =
            serde_json::from_str(json).map_err(|source| TaxonomyError::AbbreviationJson {
                path: origin.to_path_buf(),
                source,
            })?;
        if parsed.is_empty() {
            log::error!("None of the major level abbreviations loaded from {}", origin.display());
            return Err(TaxonomyError::EmptyAbbreviations(origin.to_path_buf()));
        }
        Ok(Self::from_pairs(parsed))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| TaxonomyError::open(path, e))?;
        Self::from_json_str(&json, path)
    }

    /// Uses `<dir>/major_level_to_abbr.json` when present, else `fallback`.
    pub fn for_taxonomy_dir(dir: &Path, fallback: RankAbbreviations) -> Result<Self> {
        let local = dir.join(ABBR_JSON_FILE);
        if local.is_file() {
            log::info!("Using major level abbreviations from {}", local.display());
            Self::from_json_file(&local)
        } else {
            Ok(fallback)
        }
    }

    pub fn abbr(&self, rank: &str) -> Option<&str> {
        self.major_to_abbr.get(rank).map(String::as_str)
    }

    pub fn rank(&self, abbr: &str) -> Option<&str> {
        self.abbr_to_major.get(abbr).map(String::as_str)
    }

    pub fn is_major(&self, rank: &str) -> bool {
        self.major_to_abbr.contains_key(rank)
    }

    /// `(rank, abbr)` pairs from general to specific.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &str)> + ExactSizeIterator {
        self.major_to_abbr
            .iter()
            .map(|(rank, abbr)| (rank.as_str(), abbr.as_str()))
    }

    /// Abbreviation of the most general rank, the tag every lineage line starts with.
    pub fn leading_abbr(&self) -> Option<&str> {
        self.major_to_abbr.first().map(|(_, abbr)| abbr.as_str())
    }

    pub fn len(&self) -> usize {
        self.major_to_abbr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.major_to_abbr.is_empty()
    }
}

impl PartialEq for RankAbbreviations {
    fn eq(&self, other: &Self) -> bool {
        self.major_to_abbr.iter().eq(other.major_to_abbr.iter())
    }
}

impl Eq for RankAbbreviations {}

impl Default for RankAbbreviations {
    fn default() -> Self {
        Self::ncbi()
    }
}
