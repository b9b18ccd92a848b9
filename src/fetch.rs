//src/fetch.rs

use flate2::read::MultiGzDecoder;
use indicatif::ProgressBar;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::SequenceKind;
use crate::error::Result;
use crate::table::Table;

/// Column of the genome report holding each assembly's directory URL.
pub const FTP_PATH_COLUMN: &str = "FTP Path";

/// Retrieves one remote file into `dest`.
pub trait Fetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Blocking HTTPS downloads.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

/// Whole-request limit, body included. `taxdump.tar.gz` alone is tens of MB.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(1800);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("proqueryote/", env!("CARGO_PKG_VERSION")))
            .timeout(DOWNLOAD_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        log::debug!("GET {url}");
        let mut response = self.client.get(url).send()?.error_for_status()?;
        let mut out = BufWriter::new(File::create(dest)?);
        if let Err(e) = response.copy_to(&mut out) {
            drop(out);
            let _ = fs::remove_file(dest);
            return Err(e.into());
        }
        Ok(())
    }
}

/// NCBI still lists `ftp://` directories; the same paths are served over HTTPS.
pub fn to_https(url: &str) -> String {
    match url.strip_prefix("ftp://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// URL of the sequence file inside an assembly directory, e.g.
/// `.../GCA_000005845.2_ASM584v2` -> `.../GCA_000005845.2_ASM584v2/GCA_000005845.2_ASM584v2_protein.faa.gz`.
///
/// `None` when the report has no directory for the assembly (`-` or empty).
pub fn sequence_url(ftp_path: &str, kind: SequenceKind) -> Option<String> {
    let dir = ftp_path.trim().trim_end_matches('/');
    if dir.is_empty() || dir == "-" {
        return None;
    }
    let basename = dir.rsplit('/').next().filter(|b| !b.is_empty())?;
    Some(format!("{}/{}{}", to_https(dir), basename, kind.remote_suffix()))
}

/// Decompresses `path` next to itself without the `.gz` suffix and removes the archive.
pub fn gunzip_in_place(path: &Path) -> Result<PathBuf> {
    let target = path.with_extension("");
    let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(path)?));
    let mut out = BufWriter::new(File::create(&target)?);
    io::copy(&mut decoder, &mut out)?;
    drop(out);
    fs::remove_file(path)?;
    Ok(target)
}

/// What a download pass produced.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub folder: PathBuf,
    /// Decompressed files on disk.
    pub fetched: Vec<PathBuf>,
    /// Rows without an assembly directory.
    pub skipped: usize,
    /// `(url, reason)` for every failed fetch or decompression.
    pub failed: Vec<(String, String)>,
}

/// Folder name for one download run, e.g. `proqueryote-faa-12-2026-10-18-0931.07`.
pub fn download_folder_name(kind: SequenceKind, count: usize) -> String {
    let stamp = chrono::Local::now().format("%Y-%m-%d-%H%M.%S");
    format!("proqueryote-{}-{}-{}", kind.folder_stub(), count, stamp)
}

/// Fetches and decompresses the sequence file of every row in `selected`
/// into a fresh folder under `base_dir`.
///
/// A single failed file does not stop the run; it is recorded in the report.
pub fn download_selected<F: Fetcher>(
    selected: &Table,
    kind: SequenceKind,
    base_dir: &Path,
    fetcher: &F,
    progress: &ProgressBar,
) -> Result<DownloadReport> {
    let paths = selected.column_values(FTP_PATH_COLUMN)?;
    let folder = base_dir.join(download_folder_name(kind, selected.len()));
    fs::create_dir_all(&folder)?;
    log::info!("Downloading {} {} into {}", paths.len(), kind.noun(), folder.display());

    let mut report = DownloadReport {
        folder: folder.clone(),
        ..Default::default()
    };
    progress.set_length(paths.len() as u64);

    for ftp_path in paths {
        progress.inc(1);
        let url = match sequence_url(ftp_path, kind) {
            Some(url) => url,
            None => {
                log::warn!("No FTP path for a selected row, skipping");
                report.skipped += 1;
                continue;
            }
        };
        // sequence_url guarantees a non-empty last segment
        let file_name = url.rsplit('/').next().unwrap_or_default();
        let dest = folder.join(file_name);
        progress.set_message(file_name.to_string());

        let result = fetcher.fetch(&url, &dest).and_then(|_| gunzip_in_place(&dest));
        match result {
            Ok(path) => report.fetched.push(path),
            Err(e) => {
                log::warn!("Could not fetch {url}: {e}");
                report.failed.push((url, e.to_string()));
            }
        }
    }

    progress.finish_with_message(format!("{} files downloaded", report.fetched.len()));
    Ok(report)
}
