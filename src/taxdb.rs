//src/taxdb.rs

use ahash::AHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{NodeRecord, TaxId};

pub type NodeMap = AHashMap<TaxId, NodeRecord>;
pub type NameMap = AHashMap<TaxId, String>;

/// Field separator used by every NCBI taxdump `.dmp` file.
pub const DMP_DELIMITER: &str = "\t|\t";

const RECORD_TERMINATOR: &str = "\t|";

const SCIENTIFIC_NAME: &str = "scientific name";

/// In-memory copy of `nodes.dmp` and the scientific names from `names.dmp`.
///
/// Built once, then only read.
#[derive(Debug, Default)]
pub struct TreeIndex {
    pub nodes: NodeMap,
    pub names: NameMap,
}

impl TreeIndex {
    /// Reads both dumps fully. Any malformed line aborts the build.
    pub fn build<N: BufRead, M: BufRead>(nodes_source: N, names_source: M) -> Result<Self> {
        let nodes = parse_nodes(nodes_source, "nodes.dmp")?;
        let names = parse_names(names_source, "names.dmp")?;
        log::info!(
            "Indexed {} nodes and {} scientific names",
            nodes.len(),
            names.len()
        );
        Ok(Self { nodes, names })
    }

    pub fn from_paths<P: AsRef<Path>, Q: AsRef<Path>>(nodes_path: P, names_path: Q) -> Result<Self> {
        log::debug!("Loading {}", nodes_path.as_ref().display());
        let nodes = parse_nodes(
            BufReader::new(File::open(&nodes_path)?),
            &nodes_path.as_ref().display().to_string(),
        )?;
        log::debug!("Loading {}", names_path.as_ref().display());
        let names = parse_names(
            BufReader::new(File::open(&names_path)?),
            &names_path.as_ref().display().to_string(),
        )?;
        log::info!(
            "Indexed {} nodes and {} scientific names",
            nodes.len(),
            names.len()
        );
        Ok(Self { nodes, names })
    }

    pub fn node(&self, taxid: TaxId) -> Option<&NodeRecord> {
        self.nodes.get(&taxid)
    }

    pub fn name(&self, taxid: TaxId) -> Option<&str> {
        self.names.get(&taxid).map(String::as_str)
    }
}

/// Parses `nodes.dmp`:
/// ```text
/// <taxid>\t|\t<parent taxid>\t|\t<rank>\t|\t...
/// ```
/// Duplicate taxids keep the first record.
pub fn parse_nodes<R: BufRead>(reader: R, source_name: &str) -> Result<NodeMap> {
    let mut nodes = NodeMap::new();

    for (idx, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line_no = idx + 1;
        let fields: Vec<&str> = split_record(&line);

        if fields.len() < 3 {
            return Err(malformed(
                source_name,
                line_no,
                format!("expected at least 3 fields, found {}", fields.len()),
            ));
        }

        let taxid = parse_taxid(fields[0], source_name, line_no)?;
        let parent = parse_taxid(fields[1], source_name, line_no)?;
        let rank = fields[2].trim().to_string();

        nodes.entry(taxid).or_insert(NodeRecord { parent, rank });
    }
    Ok(nodes)
}

/// Parses `names.dmp`, keeping only `scientific name` rows:
/// ```text
/// <taxid>\t|\t<name>\t|\t<unique name>\t|\t<name class>\t|
/// ```
/// Duplicate taxids keep the first scientific name.
pub fn parse_names<R: BufRead>(reader: R, source_name: &str) -> Result<NameMap> {
    let mut names = NameMap::new();

    for (idx, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line_no = idx + 1;
        let fields: Vec<&str> = split_record(&line);

        if fields.len() < 4 {
            return Err(malformed(
                source_name,
                line_no,
                format!("expected at least 4 fields, found {}", fields.len()),
            ));
        }

        if !fields[3].starts_with(SCIENTIFIC_NAME) {
            continue;
        }

        let taxid = parse_taxid(fields[0], source_name, line_no)?;
        names.entry(taxid).or_insert_with(|| fields[1].to_string());
    }
    Ok(names)
}

/// Splits one dump line into fields, dropping the `\t|` record terminator.
fn split_record(line: &str) -> Vec<&str> {
    line.strip_suffix(RECORD_TERMINATOR)
        .unwrap_or(line)
        .split(DMP_DELIMITER)
        .collect()
}

fn parse_taxid(field: &str, source_name: &str, line_no: usize) -> Result<TaxId> {
    field
        .trim()
        .parse()
        .map_err(|_| malformed(source_name, line_no, format!("invalid taxid '{}'", field)))
}

fn malformed(source_name: &str, line: usize, reason: String) -> Error {
    Error::MalformedDump {
        source_name: source_name.to_string(),
        line,
        reason,
    }
}
