use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use detaxa::formats::open_reader;
use detaxa::otu::{otu_table, write_otu_table};
use detaxa::{
    effective_parent, full_lineage_text, id_on_rank, lineage, lineage_text, load_taxonomy, name_on_rank,
    name_to_taxids, nearest_major_rank, rank_of, type_of, AccessionIndex, CustomFormat, LineageFormat,
    LineageOptions, LoadOptions, NameQuery, Taxonomy, TaxonomyError,
};

/// deTaxa taxonomy utility
#[derive(Parser, Debug)]
#[command(name = "detaxa", author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug logging (RUST_LOG also works)
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(clap::Args, Debug)]
struct TaxonomyArgs {
    /// Path of taxonomy_db/
    #[arg(short, long, env = "TAXONOMY_DB", default_value = detaxa::loader::DEFAULT_TAXONOMY_DIR)]
    database: PathBuf,

    /// Path of a custom taxonomy file
    #[arg(short, long)]
    custom_taxa: Option<PathBuf>,

    /// Custom taxonomy format: tsv, lineage, gtdb_taxonomy or gtdb_metadata
    #[arg(short = 'f', long, default_value = "tsv")]
    custom_fmt: CustomFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every per-taxon query for a taxid
    Taxid {
        taxid: String,
        #[command(flatten)]
        taxonomy: TaxonomyArgs,
    },

    /// Look up taxids by scientific name
    Name2tid {
        name: String,
        #[command(flatten)]
        taxonomy: TaxonomyArgs,
        /// Only taxa of this rank
        #[arg(short, long)]
        rank: Option<String>,
        /// Substring match
        #[arg(short, long)]
        partial: bool,
        /// Stop at the first match
        #[arg(long)]
        first: bool,
    },

    /// Map accessions to taxids through a sorted accession2taxid.tsv
    Acc2taxid {
        #[arg(required = true)]
        accessions: Vec<String>,
        /// Path of the mapping table (default: <database>/accession2taxid.tsv)
        #[arg(short, long)]
        mapping: Option<PathBuf>,
        /// Path of taxonomy_db/
        #[arg(short, long, env = "TAXONOMY_DB", default_value = detaxa::loader::DEFAULT_TAXONOMY_DIR)]
        database: PathBuf,
    },

    /// Convert a LEVEL/TAXA/ROLLUP/ASSIGNED/TAXID report into an OTU table
    Otu {
        report: PathBuf,
        #[command(flatten)]
        taxonomy: TaxonomyArgs,
    },
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}

fn load(args: &TaxonomyArgs) -> Result<Taxonomy, TaxonomyError> {
    let mut options = LoadOptions::new(&args.database);
    options.custom_format = args.custom_fmt;
    options.custom_file = args.custom_taxa.clone();

    let pb = spinner(&format!("Loading taxonomy from {}...", args.database.display()));
    let loaded = load_taxonomy(&options);
    match &loaded {
        Ok(tax) => pb.finish_with_message(format!("Loaded {} taxa.", tax.len())),
        Err(_) => pb.finish_and_clear(),
    }
    loaded
}

fn print_taxid(tax: &Taxonomy, taxid: &str) {
    let show = |value: Option<&str>| value.unwrap_or("unknown").to_string();

    println!("taxid2name( {taxid} )                 => {}", show(tax.name(taxid)));
    println!("taxid2rank( {taxid} )                 => {}", show(rank_of(tax, taxid, true)));
    println!("taxid2status( {taxid} )               => {:?}", tax.status(taxid));
    println!("taxid2depth( {taxid} )                => {}", show(tax.depth(taxid).map(|d| d.to_string()).as_deref()));
    println!("taxid2type( {taxid} )                 => {}", type_of(tax, taxid).unwrap_or("0"));
    println!("taxid2parent( {taxid} )               => {}", show(effective_parent(tax, taxid)));
    println!("taxidIsLeaf( {taxid} )                => {}", tax.is_leaf(taxid));
    println!("taxid2nearestMajorTaxid( {taxid} )    => {}", show(nearest_major_rank(tax, taxid)));
    for rank in ["genus", "phylum"] {
        println!("taxid2nameOnRank( {taxid}, '{rank}')  => {}", name_on_rank(tax, taxid, rank).unwrap_or(""));
        println!("taxid2taxidOnRank( {taxid}, '{rank}') => {}", id_on_rank(tax, taxid, rank).unwrap_or(""));
    }
    println!(
        "taxid2lineage( {taxid}, sep=';' )     => {}",
        lineage_text(tax, taxid, LineageOptions::default(), LineageFormat::Short).unwrap_or_default()
    );
    if let Some(lin) = lineage(tax, taxid, LineageOptions::default()) {
        let mut parts: Vec<String> = lin
            .iter()
            .map(|(rank, entry)| format!("{rank}: {} ({})", entry.name, entry.id.as_deref().unwrap_or("0")))
            .collect();
        if let Some(entry) = &lin.type_entry {
            parts.push(format!("type: {} ({})", entry.name, entry.id.as_deref().unwrap_or("0")));
        }
        println!("taxid2lineageDICT( {taxid} )          => {}", parts.join(", "));
    }
    println!(
        "taxid2fullLineage( {taxid} )          => {}",
        full_lineage_text(tax, taxid, LineageFormat::Pipe, false, true).unwrap_or_default()
    );
    println!(
        "taxid2fullLineage( {taxid}, sep=';' ) => {}",
        full_lineage_text(tax, taxid, LineageFormat::Short, false, true).unwrap_or_default()
    );
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Taxid { taxid, taxonomy } => {
            let tax = load(&taxonomy)?;
            print_taxid(&tax, &taxid);
        }
        Commands::Name2tid {
            name,
            taxonomy,
            rank,
            partial,
            first,
        } => {
            let tax = load(&taxonomy)?;
            let query = NameQuery {
                name,
                rank,
                partial,
                first_only: first,
            };
            println!("{:?}", name_to_taxids(&tax, &query));
        }
        Commands::Acc2taxid {
            accessions,
            mapping,
            database,
        } => {
            let index = match mapping {
                Some(path) => AccessionIndex::new(path),
                None => AccessionIndex::in_dir(&database),
            };
            for accession in &accessions {
                let taxid = index.lookup(accession)?;
                println!("{}\t{}", accession, taxid.unwrap_or_default());
            }
        }
        Commands::Otu { report, taxonomy } => {
            let tax = load(&taxonomy)?;
            let rows = otu_table(&tax, open_reader(&report)?, &report)?;
            write_otu_table(&rows, io::stdout().lock())?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("[ERROR] {}", e);
            ExitCode::FAILURE
        }
    }
}
