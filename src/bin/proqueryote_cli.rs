use clap::Parser;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use proqueryote::cache::CacheLayout;
use proqueryote::config::{default_cache_dir, Config, SequenceKind};
use proqueryote::fetch::{download_selected, HttpFetcher};
use proqueryote::query::{select, QuerySet};
use proqueryote::resolve::RootPolicy;
use proqueryote::table::Table;
use proqueryote::Error;

/// Searches the taxonomy-augmented NCBI prokaryote genome report for rows
/// matching the queries in <QUERIES_FILE>, then offers to download their
/// proteomes (or genomes with --fna).
///
/// Query file format: a line `query` starts a new query; each following line
/// is `<column> <value> [<value>...]`. Values within a line are OR'ed, lines
/// within a query are AND'ed, queries are OR'ed. Blank lines and lines
/// starting with `#` are ignored. Values match cells exactly, except
/// `TaxID`, which is compared as a number.
#[derive(Parser, Debug)]
#[command(name = "proqueryote", author, version, about, long_about)]
struct Args {
    /// Query file to apply to the cached genome report.
    queries_file: PathBuf,

    /// Increase logging (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Download CDS nucleotide FASTA (*_cds_from_genomic.fna) instead of proteomes.
    #[arg(long)]
    fna: bool,

    /// Cache directory for the genome report and taxdump.
    #[arg(long, env = "PROQUERYOTE_CACHE")]
    cache_dir: Option<PathBuf>,

    /// Worker threads for taxonomy resolution.
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Capture the root node's own rank during resolution.
    #[arg(long)]
    inspect_root: bool,

    /// Re-download and rebuild the cache even if it is complete.
    #[arg(long)]
    refresh: bool,

    /// Download without asking for confirmation.
    #[arg(short, long)]
    yes: bool,

    /// Directory in which the download folder is created.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            verbosity: self.verbose,
            cache_dir: self.cache_dir.clone().unwrap_or_else(default_cache_dir),
            sequence_kind: if self.fna {
                SequenceKind::Genome
            } else {
                SequenceKind::Proteome
            },
            threads: self.threads,
            root_policy: if self.inspect_root {
                RootPolicy::InspectRoot
            } else {
                RootPolicy::HaltAtRoot
            },
        }
    }
}

fn spinner(color: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&format!("{{spinner:.{color}}} {{msg}}"))
    {
        spinner.set_style(style);
    }
    spinner
}

/// y/N question. Uses an interactive prompt on a terminal and plain lines
/// from stdin otherwise, so answers can be piped in.
fn confirm(prompt: &str) -> Result<bool, Error> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| Error::Io(io::Error::other(e)));
    }
    println!("{prompt} [y/N]");
    Ok(read_confirmation(stdin.lock(), io::stdout())?)
}

/// Reads answers until one is `y` (yes), `n` or empty (no). EOF counts as no.
fn read_confirmation<R: BufRead, W: Write>(mut input: R, mut out: W) -> io::Result<bool> {
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match line.trim().to_lowercase().as_str() {
            "y" => return Ok(true),
            "n" | "" => return Ok(false),
            _ => writeln!(out, "Please type \"y\" or \"n\" and then press ENTER:")?,
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let config = args.config();
    log::debug!("Configuration: {:?}", config);
    config.init_thread_pool()?;

    let fetcher = HttpFetcher::new()?;
    let layout = CacheLayout::new(&config.cache_dir);

    // 1. Make sure the cache holds the augmented genome report
    if args.refresh || !layout.is_complete() {
        println!("Updating local cache.");
        let pb = spinner("blue");
        pb.set_message("Downloading genome report and taxonomy, building augmented table...");
        let summary = layout.ensure(&fetcher, config.root_policy, args.refresh)?;
        if let Some(summary) = summary {
            pb.finish_with_message(format!("Augmented {} genomes.", summary.rows));
        } else {
            pb.finish_and_clear();
        }
    }

    // 2. Query (parse first so mistakes surface before the large load)
    println!("Preparing to process query using local cache.");
    let queries = QuerySet::from_path(&args.queries_file)?;
    let pb = spinner("green");
    pb.set_message("Loading augmented genome report...");
    let table = Table::from_path(layout.augmented())?;
    pb.finish_and_clear();
    let selected = select(&table, &queries)?;
    log::debug!("Selected records: {:?}", selected.rows());

    // 3. Confirm
    let kind = config.sequence_kind;
    let count = selected.len();
    println!();
    if count == 0 {
        println!("Found 0 species. Nothing to download.");
        return Ok(());
    }
    let prompt = format!("Found {} species. Download available {}?", count, kind.noun());
    let proceed = args.yes || confirm(&prompt)?;
    if !proceed {
        println!("Aborting.");
        return Ok(());
    }

    // 4. Download
    let pb = ProgressBar::new(count as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.yellow} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    let report = download_selected(&selected, kind, &args.output_dir, &fetcher, &pb)?;

    println!(
        "Saved {} {} to {}",
        report.fetched.len(),
        kind.noun(),
        report.folder.display()
    );
    if report.skipped > 0 {
        println!("{} selected rows had no FTP path.", report.skipped);
    }
    if !report.failed.is_empty() {
        eprintln!("{} downloads failed:", report.failed.len());
        for (url, reason) in &report.failed {
            eprintln!("    {url}: {reason}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.config().log_level())
        .parse_default_env()
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\n ** {e} **\n");
            if e.is_usage() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
