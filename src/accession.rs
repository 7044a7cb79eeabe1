//src/accession.rs

use ahash::AHashMap;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Result, TaxonomyError};
use crate::taxdb::Taxonomy;

pub const ACCESSION_FILE: &str = "accession2taxid.tsv";

/// Drops a trailing `.N` version: `NC_000913.3` -> `NC_000913`.
pub fn strip_version(accession: &str) -> &str {
    accession
        .split_once('.')
        .map_or(accession, |(base, _)| base)
}

/// Binary search over a sorted `accession<TAB>taxid` file.
///
/// The file is never read whole; each lookup seeks around a single handle.
/// Answers, including misses, are memoized for the lifetime of the index.
pub struct AccessionIndex {
    path: PathBuf,
    cache: Mutex<AHashMap<String, Option<String>>>,
}

impl AccessionIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(AHashMap::new()),
        }
    }

    /// `<dir>/accession2taxid.tsv`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(ACCESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Taxid for `accession` (version ignored), `None` when it is not listed.
    pub fn lookup(&self, accession: &str) -> Result<Option<String>> {
        let key = strip_version(accession);
        if let Some(hit) = self.cache.lock().get(key) {
            return Ok(hit.clone());
        }
        log::info!("acc2taxid from file: {}", self.path.display());
        let (found, _probes) = self.search(key)?;
        self.cache.lock().insert(key.to_string(), found.clone());
        Ok(found)
    }

    /// `lo` is always a record start; the target, if present, starts in `[lo, hi)`.
    /// Every probe halves the byte window, so the second value (probes made)
    /// stays logarithmic in the number of records.
    fn search(&self, target: &str) -> Result<(Option<String>, u32)> {
        let path = self.path.as_path();
        let file = File::open(path).map_err(|e| TaxonomyError::open(path, e))?;
        let mut hi = file.metadata().map_err(|e| TaxonomyError::read(path, e))?.len();
        let mut lo = 0u64;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        let mut probes = 0u32;

        while lo < hi {
            probes += 1;
            let mid = lo + (hi - lo) / 2;

            // first record starting at or after mid
            let line_start = if mid > lo {
                reader
                    .seek(SeekFrom::Start(mid - 1))
                    .map_err(|e| TaxonomyError::read(path, e))?;
                line.clear();
                let skipped = reader.read_line(&mut line).map_err(|e| TaxonomyError::read(path, e))?;
                mid - 1 + skipped as u64
            } else {
                reader
                    .seek(SeekFrom::Start(lo))
                    .map_err(|e| TaxonomyError::read(path, e))?;
                lo
            };
            if line_start >= hi {
                hi = mid;
                continue;
            }

            line.clear();
            let read = reader.read_line(&mut line).map_err(|e| TaxonomyError::read(path, e))?;
            if read == 0 {
                hi = mid;
                continue;
            }
            let line_end = line_start + read as u64;

            let record = line.trim_end_matches(['\r', '\n']);
            let (key, taxid) = record.split_once('\t').ok_or_else(|| {
                TaxonomyError::malformed(path, 0, format!("no tab in record at byte {line_start}: '{record}'"))
            })?;
            log::debug!("lo: {:>12}, mid: {:>12}, hi: {:>12}, key: {}", lo, mid, hi, key);

            match target.cmp(key) {
                std::cmp::Ordering::Equal => {
                    log::debug!("Found {} after {} probes", target, probes);
                    return Ok((Some(taxid.trim().to_string()), probes));
                }
                std::cmp::Ordering::Greater => lo = line_end,
                std::cmp::Ordering::Less => hi = mid,
            }
        }
        log::debug!("{} not found after {} probes", target, probes);
        Ok((None, probes))
    }
}

impl Taxonomy {
    /// Accession -> taxid via `index`, then through [`Taxonomy::resolve`].
    /// Listed accessions whose taxid is not loaded come back as `None`.
    pub fn lookup_by_accession(&self, index: &AccessionIndex, accession: &str) -> Result<Option<&str>> {
        Ok(index
            .lookup(accession)?
            .and_then(|taxid| self.resolve(&taxid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::io::Write;

    fn write_index(lines: &[(&str, &str)]) -> (tempfile::TempDir, AccessionIndex) {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join(ACCESSION_FILE)).unwrap();
        for (acc, taxid) in lines {
            writeln!(file, "{acc}\t{taxid}").unwrap();
        }
        let index = AccessionIndex::in_dir(dir.path());
        (dir, index)
    }

    fn sorted_records(n: usize) -> Vec<(String, String)> {
        (0..n)
            .map(|i| (format!("ACC{:06}", i * 3), (100 + i).to_string()))
            .collect()
    }

    #[test]
    fn version_suffix_is_ignored() {
        assert_eq!(strip_version("NC_000913.3"), "NC_000913");
        assert_eq!(strip_version("NC_000913"), "NC_000913");
    }

    #[test]
    fn every_listed_accession_is_found() {
        let records = sorted_records(257);
        let borrowed: Vec<(&str, &str)> = records.iter().map(|(a, t)| (a.as_str(), t.as_str())).collect();
        let (_dir, index) = write_index(&borrowed);
        let bound = 2 * (records.len() as f64).log2().ceil() as u32 + 2;
        for (acc, taxid) in &records {
            let (found, probes) = index.search(acc).unwrap();
            assert_eq!(found.as_deref(), Some(taxid.as_str()), "{acc}");
            assert!(probes <= bound, "{acc} took {probes} probes, bound {bound}");
            assert_eq!(index.lookup(acc).unwrap().as_deref(), Some(taxid.as_str()), "{acc}");
        }
    }

    #[test]
    fn absent_accession_is_not_a_neighbour() {
        let records = sorted_records(100);
        let borrowed: Vec<(&str, &str)> = records.iter().map(|(a, t)| (a.as_str(), t.as_str())).collect();
        let (_dir, index) = write_index(&borrowed);
        // ids are multiples of three, so these fall between records
        let bound = 2 * (records.len() as f64).log2().ceil() as u32 + 2;
        for missing in ["ACC000001", "ACC000044", "ACC000298", "AAA", "ZZZ", ""] {
            assert_eq!(index.lookup(missing).unwrap(), None, "{missing}");
            let (_, probes) = index.search(missing).unwrap();
            assert!(probes <= bound, "{missing} took {probes} probes, bound {bound}");
        }
    }

    #[test]
    fn first_last_and_versioned_lookups() {
        let (_dir, index) = write_index(&[
            ("AB000001", "562"),
            ("NC_000913", "511145"),
            ("NZ_CP009072", "9606"),
        ]);
        assert_eq!(index.lookup("AB000001").unwrap().as_deref(), Some("562"));
        assert_eq!(index.lookup("NZ_CP009072.1").unwrap().as_deref(), Some("9606"));
        assert_eq!(index.lookup("NC_000913.3").unwrap().as_deref(), Some("511145"));
    }

    #[test]
    fn results_are_memoized() {
        let (dir, index) = write_index(&[("NC_000913", "511145")]);
        assert_eq!(index.lookup("NC_000913.3").unwrap().as_deref(), Some("511145"));
        assert_eq!(index.lookup("NC_999999").unwrap(), None);
        std::fs::remove_file(dir.path().join(ACCESSION_FILE)).unwrap();
        assert_eq!(index.lookup("NC_000913").unwrap().as_deref(), Some("511145"));
        assert_eq!(index.lookup("NC_999999.2").unwrap(), None);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = AccessionIndex::new(dir.path().join("missing.tsv"));
        assert!(matches!(index.lookup("NC_000913"), Err(TaxonomyError::Open { .. })));
    }

    #[test]
    fn accession_joins_the_tree() {
        let tax = fixtures::ncbi_taxonomy();
        let (_dir, index) = write_index(&[
            ("NC_000913", "511145"),
            ("NC_OLD", "469598"),
            ("NC_UNLOADED", "31337"),
        ]);
        assert_eq!(tax.lookup_by_accession(&index, "NC_000913.3").unwrap(), Some("511145"));
        assert_eq!(tax.lookup_by_accession(&index, "NC_OLD").unwrap(), Some("562"));
        assert_eq!(tax.lookup_by_accession(&index, "NC_UNLOADED").unwrap(), None);
        assert_eq!(tax.lookup_by_accession(&index, "XX_1").unwrap(), None);
    }
}
