//src/config.rs

use std::path::PathBuf;

use crate::resolve::RootPolicy;

/// Name of the cache directory created under the user's home.
pub const CACHE_DIR_NAME: &str = ".proqueryote";

/// Which per-assembly file to download for each selected genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceKind {
    /// `*_protein.faa.gz`
    #[default]
    Proteome,
    /// `*_cds_from_genomic.fna.gz`
    Genome,
}

impl SequenceKind {
    /// Suffix appended to the assembly basename on the NCBI server.
    pub fn remote_suffix(&self) -> &'static str {
        match self {
            SequenceKind::Proteome => "_protein.faa.gz",
            SequenceKind::Genome => "_cds_from_genomic.fna.gz",
        }
    }

    pub fn folder_stub(&self) -> &'static str {
        match self {
            SequenceKind::Proteome => "faa",
            SequenceKind::Genome => "fna",
        }
    }

    pub fn noun(&self) -> &'static str {
        match self {
            SequenceKind::Proteome => "proteomes",
            SequenceKind::Genome => "genomes",
        }
    }
}

/// Settings for one run, passed explicitly to every stage.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of `-v` flags given.
    pub verbosity: u8,
    pub cache_dir: PathBuf,
    pub sequence_kind: SequenceKind,
    /// Worker threads for taxonomy resolution; `None` lets rayon decide.
    pub threads: Option<usize>,
    pub root_policy: RootPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbosity: 0,
            cache_dir: default_cache_dir(),
            sequence_kind: SequenceKind::default(),
            threads: None,
            root_policy: RootPolicy::default(),
        }
    }
}

impl Config {
    /// Log level for the verbosity count: warn, info, debug, then trace.
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    /// Sizes the global rayon pool. Only the first call in a process takes effect.
    pub fn init_thread_pool(&self) -> crate::error::Result<()> {
        if let Some(n) = self.threads {
            rayon::ThreadPoolBuilder::new().num_threads(n).build_global()?;
            log::info!("Using {} threads.", n);
        }
        Ok(())
    }
}

/// `~/.proqueryote`, or `./.proqueryote` when no home directory is known.
pub fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(CACHE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(CACHE_DIR_NAME))
}
