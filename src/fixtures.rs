//src/fixtures.rs
//
// A small slice of the NCBI tree shared by the unit tests.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use crate::formats::ncbi;
use crate::rank_abbr::RankAbbreviations;
use crate::taxdb::{TaxonStore, Taxonomy};

/// (taxid, parent, rank, scientific name)
pub(crate) const NCBI_NODES: [(&str, &str, &str, &str); 23] = [
    ("1", "1", "no rank", "root"),
    ("131567", "1", "no rank", "cellular organisms"),
    ("2759", "131567", "superkingdom", "Eukaryota"),
    ("33208", "2759", "kingdom", "Metazoa"),
    ("7711", "33208", "phylum", "Chordata"),
    ("40674", "7711", "class", "Mammalia"),
    ("9443", "40674", "order", "Primates"),
    ("9604", "9443", "family", "Hominidae"),
    ("9605", "9604", "genus", "Homo"),
    ("9606", "9605", "species", "Homo sapiens"),
    ("63221", "9606", "subspecies", "Homo sapiens neanderthalensis"),
    ("2", "131567", "superkingdom", "Bacteria"),
    ("1224", "2", "phylum", "Proteobacteria"),
    ("1236", "1224", "class", "Gammaproteobacteria"),
    ("91347", "1236", "order", "Enterobacterales"),
    ("543", "91347", "family", "Enterobacteriaceae"),
    ("561", "543", "genus", "Escherichia"),
    ("562", "561", "species", "Escherichia coli"),
    ("83333", "562", "no rank", "Escherichia coli K-12"),
    ("511145", "83333", "no rank", "Escherichia coli str. K-12 substr. MG1655"),
    ("1920249", "543", "species", "Enterobacteriaceae bacterium ENNIH1"),
    ("12908", "1", "no rank", "unclassified sequences"),
    ("10239", "1", "superkingdom", "Viruses"),
];

pub(crate) fn names_dmp() -> String {
    let mut out = String::new();
    for (id, _, _, name) in NCBI_NODES {
        out.push_str(&format!("{id}\t|\t{name}\t|\t\t|\tscientific name\t|\n"));
        if id == "9606" {
            out.push_str("9606\t|\thuman\t|\t\t|\tgenbank common name\t|\n");
        }
    }
    out
}

/// Children before parents, so depth has to be repaired after loading.
pub(crate) fn nodes_dmp() -> String {
    NCBI_NODES
        .iter()
        .rev()
        .map(|(id, parent, rank, _)| format!("{id}\t|\t{parent}\t|\t{rank}\t|\t\t|\t0\t|\n"))
        .collect()
}

pub(crate) fn merged_dmp() -> String {
    "469598\t|\t562\t|\n".to_string()
}

pub(crate) fn ncbi_store() -> TaxonStore {
    let mut store = TaxonStore::new(RankAbbreviations::ncbi());
    ncbi::load_names(&mut store, Cursor::new(names_dmp()), Path::new(ncbi::NAMES_DMP)).unwrap();
    ncbi::load_nodes(&mut store, Cursor::new(nodes_dmp()), Path::new(ncbi::NODES_DMP)).unwrap();
    ncbi::load_merged(&mut store, Cursor::new(merged_dmp()), Path::new(ncbi::MERGED_DMP)).unwrap();
    store
}

pub(crate) fn ncbi_taxonomy() -> Taxonomy {
    ncbi_store().finish().unwrap()
}

/// Renders a loaded taxonomy back into `taxonomy.tsv` rows.
pub(crate) fn taxonomy_tsv(tax: &Taxonomy) -> String {
    tax.iter()
        .map(|t| format!("{}\t{}\t{}\t{}\t{}\n", t.id, t.depth, t.parent_id, t.rank, t.name))
        .collect()
}

/// Writes a gzipped tar holding `members` as plain files.
pub(crate) fn write_archive(path: &Path, members: &[(&str, String)]) {
    let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, content.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// A `taxdump.tar.gz` with the fixture tree, plus a readme member to skip.
pub(crate) fn write_taxdump(path: &Path, with_merged: bool) {
    let mut members = vec![
        ("readme.txt", "fixture taxdump\n".to_string()),
        (ncbi::NAMES_DMP, names_dmp()),
        (ncbi::NODES_DMP, nodes_dmp()),
    ];
    if with_merged {
        members.push((ncbi::MERGED_DMP, merged_dmp()));
    }
    write_archive(path, &members);
}
