//src/formats/ncbi.rs

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Result, TaxonomyError};
use crate::formats::{data_lines, open_reader};
use crate::taxdb::TaxonStore;

pub const NAMES_DMP: &str = "names.dmp";
pub const NODES_DMP: &str = "nodes.dmp";
pub const MERGED_DMP: &str = "merged.dmp";

/// Field separator of the NCBI dump files.
const DMP_SEP: &str = "\t|\t";

/// Reads names.dmp, keeping only `scientific name` rows:
/// ```text
/// 9606\t|\tHomo sapiens\t|\t\t|\tscientific name\t|
/// ```
pub fn load_names<R: BufRead>(store: &mut TaxonStore, reader: R, origin: &Path) -> Result<usize> {
    let mut count = 0;
    for record in data_lines(reader, origin) {
        let (line_no, line) = record?;
        let fields: Vec<&str> = line.split(DMP_SEP).collect();
        if fields.len() != 4 {
            return Err(TaxonomyError::ColumnCount {
                path: origin.to_path_buf(),
                line: line_no,
                expected: 4,
                found: fields.len(),
            });
        }
        if !fields[3].starts_with("scientific name") {
            continue;
        }
        store.insert_name(fields[0], fields[1]);
        count += 1;
    }
    Ok(count)
}

/// Reads nodes.dmp; only taxid, parent taxid and rank are used.
pub fn load_nodes<R: BufRead>(store: &mut TaxonStore, reader: R, origin: &Path) -> Result<usize> {
    let mut count = 0;
    for record in data_lines(reader, origin) {
        let (line_no, line) = record?;
        let fields: Vec<&str> = line.split(DMP_SEP).collect();
        if fields.len() < 3 {
            return Err(TaxonomyError::ColumnCount {
                path: origin.to_path_buf(),
                line: line_no,
                expected: 3,
                found: fields.len(),
            });
        }
        let rank = fields[2].trim_end_matches("\t|");
        store.insert_node(fields[0], fields[1], rank);
        count += 1;
    }
    Ok(count)
}

/// Reads merged.dmp (`old\t|\tnew\t|`).
pub fn load_merged<R: BufRead>(store: &mut TaxonStore, reader: R, origin: &Path) -> Result<usize> {
    let mut count = 0;
    for record in data_lines(reader, origin) {
        let (line_no, line) = record?;
        let fields: Vec<&str> = line.split("\t|").collect();
        if fields.len() < 2 {
            return Err(TaxonomyError::malformed(origin, line_no, "expected '<old>\\t|\\t<new>\\t|'"));
        }
        store.insert_merged(fields[0], fields[1].trim_matches('\t'));
        count += 1;
    }
    Ok(count)
}

/// Loads extracted dump files. `merged` is optional.
pub fn load_dmp_files(store: &mut TaxonStore, names: &Path, nodes: &Path, merged: Option<&Path>) -> Result<()> {
    log::info!("Open taxonomy name file: {}", names.display());
    let n = load_names(store, open_reader(names)?, names)?;
    log::info!("Done parsing taxonomy name file ({} scientific names).", n);

    log::info!("Open taxonomy node file: {}", nodes.display());
    let n = load_nodes(store, open_reader(nodes)?, nodes)?;
    log::info!("Done parsing taxonomy node file ({} nodes).", n);

    if let Some(merged) = merged {
        log::info!("Open merged taxonomy node file: {}", merged.display());
        let n = load_merged(store, open_reader(merged)?, merged)?;
        log::info!("Done parsing merged taxonomy file ({} merged ids).", n);
    }
    Ok(())
}

/// Streams names, nodes and merged straight out of `taxdump.tar.gz`.
pub fn load_taxdump_archive(store: &mut TaxonStore, path: &Path) -> Result<()> {
    log::info!("Open taxonomy file: {}", path.display());
    let file = File::open(path).map_err(|e| TaxonomyError::open(path, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    let mut seen_names = false;
    let mut seen_nodes = false;
    let mut seen_merged = false;

    let entries = archive.entries().map_err(|e| TaxonomyError::read(path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| TaxonomyError::read(path, e))?;
        let member = match entry.path() {
            Ok(p) => p.file_name().and_then(|n| n.to_str()).map(str::to_string),
            Err(e) => return Err(TaxonomyError::read(path, e)),
        };
        let Some(member) = member else { continue };
        let origin = path.join(&member);
        let reader = BufReader::new(entry);

        match member.as_str() {
            NAMES_DMP => {
                log::info!("Extract taxonomy names file: {}", NAMES_DMP);
                load_names(store, reader, &origin)?;
                seen_names = true;
            }
            NODES_DMP => {
                log::info!("Extract taxonomy nodes file: {}", NODES_DMP);
                load_nodes(store, reader, &origin)?;
                seen_nodes = true;
            }
            MERGED_DMP => {
                log::info!("Extract taxonomy merged file: {}", MERGED_DMP);
                load_merged(store, reader, &origin)?;
                seen_merged = true;
            }
            other => log::debug!("Skipping archive member: {}", other),
        }

        if seen_names && seen_nodes && seen_merged {
            break;
        }
    }

    for (seen, member) in [(seen_names, NAMES_DMP), (seen_nodes, NODES_DMP)] {
        if !seen {
            return Err(TaxonomyError::MissingArchiveMember {
                path: path.to_path_buf(),
                member: member.to_string(),
            });
        }
    }
    if !seen_merged {
        log::warn!("{} has no {}; merged ids will not resolve", path.display(), MERGED_DMP);
    }
    Ok(())
}
