//src/cache.rs

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tar::Archive;

use crate::augment::AugmentSummary;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::resolve::RootPolicy;

pub const PROKARYOTES_URL: &str = "https://ftp.ncbi.nlm.nih.gov/genomes/GENOME_REPORTS/prokaryotes.txt";
pub const TAXDUMP_URL: &str = "https://ftp.ncbi.nlm.nih.gov/pub/taxonomy/taxdump.tar.gz";

/// File names inside the cache directory.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    pub dir: PathBuf,
}

impl CacheLayout {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// NCBI genome report, as downloaded.
    pub fn prokaryotes(&self) -> PathBuf {
        self.dir.join("prokaryotes.txt")
    }

    pub fn nodes(&self) -> PathBuf {
        self.dir.join("nodes.dmp")
    }

    pub fn names(&self) -> PathBuf {
        self.dir.join("names.dmp")
    }

    /// Genome report with the rank columns appended. This is what queries run against.
    pub fn augmented(&self) -> PathBuf {
        self.dir.join("prokaryotes_taxonomic.txt")
    }

    pub fn taxdump(&self) -> PathBuf {
        self.dir.join("taxdump.tar.gz")
    }

    fn required(&self) -> [PathBuf; 4] {
        [self.prokaryotes(), self.names(), self.nodes(), self.augmented()]
    }

    /// Every file this layout writes. Nothing else in `dir` is touched.
    fn owned(&self) -> [PathBuf; 5] {
        [
            self.prokaryotes(),
            self.names(),
            self.nodes(),
            self.augmented(),
            self.taxdump(),
        ]
    }

    /// True when the directory and every file queries depend on exist.
    pub fn is_complete(&self) -> bool {
        if !self.dir.is_dir() {
            log::debug!("cache directory {} missing", self.dir.display());
            return false;
        }
        for path in self.required() {
            if !path.exists() {
                log::debug!("{} is missing from cache", path.display());
                return false;
            }
            log::trace!("{} is present", path.display());
        }
        true
    }

    /// Removes the cache files, downloads the genome report and taxdump,
    /// unpacks `nodes.dmp`/`names.dmp` and writes the augmented table.
    ///
    /// `dir` may be shared with unrelated files; only `owned()` paths are removed.
    pub fn rebuild<F: Fetcher>(&self, fetcher: &F, policy: RootPolicy) -> Result<AugmentSummary> {
        log::info!("Rebuilding cache in {}", self.dir.display());
        fs::create_dir_all(&self.dir)?;
        for path in self.owned() {
            if path.is_file() {
                log::debug!("removing stale {}", path.display());
                fs::remove_file(&path)?;
            }
        }

        fetcher.fetch(PROKARYOTES_URL, &self.prokaryotes())?;
        fetcher.fetch(TAXDUMP_URL, &self.taxdump())?;
        extract_taxdump(&self.taxdump(), &self.dir)?;

        crate::augment_files(
            self.prokaryotes(),
            self.nodes(),
            self.names(),
            self.augmented(),
            policy,
        )
    }

    /// Rebuilds only when files are missing or `force` is set.
    pub fn ensure<F: Fetcher>(
        &self,
        fetcher: &F,
        policy: RootPolicy,
        force: bool,
    ) -> Result<Option<AugmentSummary>> {
        if !force && self.is_complete() {
            log::debug!("cache found to be present");
            return Ok(None);
        }
        self.rebuild(fetcher, policy).map(Some)
    }
}

/// Members of `taxdump.tar.gz` that the cache needs.
pub const TAXDUMP_MEMBERS: [&str; 2] = ["nodes.dmp", "names.dmp"];

/// Unpacks `nodes.dmp` and `names.dmp` from a taxdump `.tar.gz` into
/// `target_dir`, skipping every other member.
pub fn extract_taxdump(archive_path: &Path, target_dir: &Path) -> Result<()> {
    log::debug!("Extracting {} into {}", archive_path.display(), target_dir.display());
    let tar_gz = GzDecoder::new(BufReader::new(File::open(archive_path)?));
    let mut archive = Archive::new(tar_gz);

    let mut extracted = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if TAXDUMP_MEMBERS.contains(&name) => name.to_string(),
            _ => continue,
        };
        entry.unpack(target_dir.join(&name))?;
        extracted += 1;
    }
    if extracted < TAXDUMP_MEMBERS.len() {
        log::warn!(
            "{} holds only {} of {:?}",
            archive_path.display(),
            extracted,
            TAXDUMP_MEMBERS
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::table::Table;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::cell::Cell;

    const REPORT: &str = "#Organism/Name\tTaxID\tGroup\tFTP Path\n\
                          Escherichia coli\t562\tProteobacteria\t-\n";
    const NODES: &str = "1\t|\t1\t|\tno rank\t|\n562\t|\t1\t|\tspecies\t|\n";
    const NAMES: &str = "562\t|\tEscherichia coli\t|\t\t|\tscientific name\t|\n";

    fn taxdump_bytes() -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (name, body) in [
            ("nodes.dmp", NODES),
            ("names.dmp", NAMES),
            ("readme.txt", "taxdump readme"),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, body.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    struct NcbiStub {
        calls: Cell<usize>,
    }

    impl Fetcher for NcbiStub {
        fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            match url {
                PROKARYOTES_URL => fs::write(dest, REPORT)?,
                TAXDUMP_URL => fs::write(dest, taxdump_bytes())?,
                other => panic!("unexpected url {other}"),
            }
            Ok(())
        }
    }

    struct Offline;

    impl Fetcher for Offline {
        fn fetch(&self, _url: &str, _dest: &Path) -> Result<()> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "offline",
            )))
        }
    }

    #[test]
    fn rebuilds_missing_cache() {
        let home = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(home.path().join(".proqueryote"));
        assert!(!layout.is_complete());

        let stub = NcbiStub { calls: Cell::new(0) };
        let summary = layout
            .ensure(&stub, RootPolicy::HaltAtRoot, false)
            .unwrap()
            .expect("cache should have been rebuilt");
        assert_eq!(stub.calls.get(), 2);
        assert_eq!(summary.rows, 1);
        assert!(layout.is_complete());

        let table = Table::from_path(layout.augmented()).unwrap();
        assert_eq!(table.value(0, "Species"), Some("Escherichia coli"));
        assert_eq!(table.value(0, "Genus"), Some(""));

        // second call finds everything in place
        assert!(layout.ensure(&stub, RootPolicy::HaltAtRoot, false).unwrap().is_none());
        assert_eq!(stub.calls.get(), 2);

        // forcing refetches
        layout.ensure(&stub, RootPolicy::HaltAtRoot, true).unwrap();
        assert_eq!(stub.calls.get(), 4);
    }

    #[test]
    fn missing_file_makes_cache_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path());
        for path in [layout.prokaryotes(), layout.nodes(), layout.names()] {
            fs::write(path, "").unwrap();
        }
        assert!(!layout.is_complete());
        fs::write(layout.augmented(), "").unwrap();
        assert!(layout.is_complete());
    }

    #[test]
    fn rebuild_leaves_unrelated_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let thesis = dir.path().join("thesis.tex");
        let readme = dir.path().join("readme.txt");
        fs::write(&thesis, "\\documentclass{article}").unwrap();
        fs::write(&readme, "my notes").unwrap();
        let layout = CacheLayout::new(dir.path());

        // failed download: user files survive
        assert!(layout.ensure(&Offline, RootPolicy::HaltAtRoot, false).is_err());
        assert!(thesis.exists());
        assert!(dir.path().is_dir());

        // successful rebuild: user files survive and are not overwritten
        let stub = NcbiStub { calls: Cell::new(0) };
        layout.ensure(&stub, RootPolicy::HaltAtRoot, false).unwrap();
        assert!(layout.is_complete());
        assert_eq!(fs::read_to_string(&thesis).unwrap(), "\\documentclass{article}");
        assert_eq!(fs::read_to_string(&readme).unwrap(), "my notes");
    }

    #[test]
    fn stale_cache_files_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path());
        fs::write(layout.augmented(), "stale\n").unwrap();

        assert!(layout.rebuild(&Offline, RootPolicy::HaltAtRoot).is_err());
        assert!(!layout.augmented().exists());
    }

    #[test]
    fn fetch_failure_propagates() {
        let home = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(home.path().join("cache"));
        assert!(layout.rebuild(&Offline, RootPolicy::HaltAtRoot).is_err());
    }
}
