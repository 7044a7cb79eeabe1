//src/error.rs

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaxonomyError>;

/// Everything that can abort a load or a file-backed lookup.
///
/// Unknown taxa are not errors; queries report them as `None`.
#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("{}:{line}: expected {expected} columns, found {found}", path.display())]
    ColumnCount {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{}:{line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("invalid custom taxonomy format: {0} (expected tsv, lineage, gtdb_taxonomy or gtdb_metadata)")]
    UnknownFormat(String),

    #[error("no available taxonomy files in {}", .0.display())]
    NoTaxonomyFiles(PathBuf),

    #[error("taxonomy not loaded: no taxa were read")]
    NotLoaded,

    #[error("none of the major level abbreviations loaded from {}", .0.display())]
    EmptyAbbreviations(PathBuf),

    #[error("invalid major level abbreviation file {}: {source}", path.display())]
    AbbreviationJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("archive {} has no member {member}", path.display())]
    MissingArchiveMember { path: PathBuf, member: String },
}

impl TaxonomyError {
    pub(crate) fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TaxonomyError::Open {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TaxonomyError::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        TaxonomyError::Malformed {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}
