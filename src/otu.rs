//src/otu.rs

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::error::{Result, TaxonomyError};
use crate::formats::{data_lines, split_columns};
use crate::lineage::{lineage_text, LineageFormat, LineageOptions};
use crate::taxdb::Taxonomy;
use crate::types::OtuRow;

const REPORT_COLUMNS: usize = 5;

fn parse_count(field: &str, what: &str, origin: &Path, line_no: usize) -> Result<u64> {
    field
        .trim()
        .parse()
        .map_err(|_| TaxonomyError::malformed(origin, line_no, format!("invalid {what} count '{field}'")))
}

/// Collapses a `LEVEL, taxa, rollup, assigned, taxid` report into an OTU
/// table: directly assigned reads summed per short-form lineage, sorted by
/// lineage, with each count's share of the classified reads (`root` rollup).
pub fn otu_table<R: BufRead>(tax: &Taxonomy, reader: R, origin: &Path) -> Result<Vec<OtuRow>> {
    let options = LineageOptions {
        normalize_spaces: true,
        ..Default::default()
    };
    let mut classified = 0u64;
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    for record in data_lines(reader, origin) {
        let (line_no, line) = record?;
        let fields = split_columns(&line, REPORT_COLUMNS, origin, line_no)?;
        let (level, rollup, assigned, taxid) = (fields[0], fields[2], fields[3], fields[4]);

        match level {
            "LEVEL" => continue,
            "unclassified" => {
                log::info!("Total number of unclassified reads: {}", rollup);
                continue;
            }
            "root" => {
                classified = parse_count(rollup, "rollup", origin, line_no)?;
                log::info!("Total number of classified reads: {}", classified);
                continue;
            }
            _ => {}
        }

        let assigned = parse_count(assigned, "assigned", origin, line_no)?;
        if assigned == 0 {
            continue;
        }
        match lineage_text(tax, taxid, options, LineageFormat::Short) {
            Some(lineage) if !lineage.is_empty() => *counts.entry(lineage).or_insert(0) += assigned,
            _ => log::info!("unmapped taxa: {}", line),
        }
    }

    if classified == 0 {
        log::warn!("{} has no classified reads (root row); fractions are 0", origin.display());
    }
    Ok(counts
        .into_iter()
        .map(|(lineage, reads)| OtuRow {
            fraction: if classified == 0 { 0.0 } else { reads as f64 / classified as f64 },
            lineage,
            reads,
        })
        .collect())
}

pub fn write_otu_table<W: Write>(rows: &[OtuRow], mut out: W) -> io::Result<()> {
    for row in rows {
        writeln!(out, "{}\t{}\t{}", row.lineage, row.reads, row.fraction)?;
    }
    out.flush()
}
