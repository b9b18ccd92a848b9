//src/table.rs

use ahash::AHashMap;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// A tab-separated table with a header row, fully loaded in memory.
///
/// Cells are kept as raw strings; comparisons are exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    column_index: AHashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(header: Vec<String>) -> Self {
        let mut column_index = AHashMap::with_capacity(header.len());
        for (i, name) in header.iter().enumerate() {
            // Duplicate titles resolve to the first column.
            column_index.entry(name.clone()).or_insert(i);
        }
        Self {
            header,
            column_index,
            rows: Vec::new(),
        }
    }

    /// Reads a header line followed by data rows.
    ///
    /// Short rows are padded with empty cells; rows wider than the header are rejected.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();
        let header_line = match lines.next() {
            Some(line) => line?,
            None => return Err(Error::EmptyTable),
        };
        let mut table = Table::new(split_fields(&header_line));
        let width = table.header.len();

        for (idx, line_result) in lines.enumerate() {
            let line = line_result?;
            let mut row = split_fields(&line);
            if row.len() > width {
                return Err(Error::RaggedRow {
                    line: idx + 2,
                    expected: width,
                    found: row.len(),
                });
            }
            row.resize(width, String::new());
            table.rows.push(row);
        }
        Ok(table)
    }

    /// Like [`Table::from_reader`], transparently decompressing `*.gz` files.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path)?;

        let is_gz = path
            .extension()
            .map(|ext| ext == "gz")
            .unwrap_or(false);

        let reader: Box<dyn BufRead> = if is_gz {
            Box::new(BufReader::new(MultiGzDecoder::new(f)))
        } else {
            Box::new(BufReader::new(f))
        };

        let table = Table::from_reader(reader)?;
        log::info!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.header.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.header
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index.contains_key(name)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `row`, column `column`, or `None` when either is out of range.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, column: &str) -> Result<Vec<&str>> {
        let col = self.column_index(column).ok_or_else(|| Error::MissingColumn {
            column: column.to_string(),
        })?;
        Ok(self.rows.iter().map(|r| r[col].as_str()).collect())
    }

    /// Appends a row, padding it to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) -> Result<()> {
        let width = self.header.len();
        if row.len() > width {
            return Err(Error::RaggedRow {
                line: self.rows.len() + 2,
                expected: width,
                found: row.len(),
            });
        }
        row.resize(width, String::new());
        self.rows.push(row);
        Ok(())
    }

    /// Copy of this table keeping only the rows where `keep` is true.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[String]) -> bool,
    {
        Table {
            header: self.header.clone(),
            column_index: self.column_index.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Header line then one line per row, tab-separated and newline-terminated.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = BufWriter::new(writer);
        writeln!(out, "{}", self.header.join("\t"))?;
        for row in &self.rows {
            writeln!(out, "{}", row.join("\t"))?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let f = File::create(path.as_ref())?;
        self.write_tsv(f)?;
        log::info!("Wrote {} rows to {}", self.len(), path.as_ref().display());
        Ok(())
    }
}

/// Only the line terminator is removed, so trailing empty cells survive.
fn split_fields(line: &str) -> Vec<String> {
    line.trim_end_matches(['\r', '\n'])
        .split('\t')
        .map(str::to_string)
        .collect()
}
