//src/formats/tsv.rs

use std::io::BufRead;
use std::path::Path;

use crate::error::{Result, TaxonomyError};
use crate::formats::{data_lines, open_reader, split_columns};
use crate::taxdb::TaxonStore;

const TSV_COLUMNS: usize = 5;

/// Loads a flat taxonomy file in the format:
/// ```text
/// <taxid>\t<depth>\t<parentid>\t<rank>\t<taxname>
/// ```
/// Any row with a different column count aborts the load.
pub fn load_tsv<R: BufRead>(store: &mut TaxonStore, reader: R, origin: &Path) -> Result<usize> {
    let mut count = 0;
    for record in data_lines(reader, origin) {
        let (line_no, line) = record?;
        let fields = split_columns(&line, TSV_COLUMNS, origin, line_no)?;
        let (taxid, depth, parent, rank, name) = (fields[0], fields[1], fields[2], fields[3], fields[4]);

        let depth: u32 = depth
            .trim()
            .parse()
            .map_err(|_| TaxonomyError::malformed(origin, line_no, format!("invalid depth '{depth}'")))?;

        store.insert(taxid, parent, rank, name, Some(depth));
        count += 1;
    }
    Ok(count)
}

pub fn load_tsv_file(store: &mut TaxonStore, path: &Path) -> Result<usize> {
    log::info!("Open taxonomy file: {}", path.display());
    let count = load_tsv(store, open_reader(path)?, path)?;
    log::info!("Done parsing tsv taxonomy file ({} taxa).", count);
    Ok(count)
}
