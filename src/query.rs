//src/query.rs

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::table::Table;

/// Acceptable values for one column. A row matches if its cell equals any of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub column: String,
    pub values: Vec<String>,
}

/// A row matches a query if it matches every criterion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub criteria: Vec<Criterion>,
}

/// A row is selected if it matches any query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySet {
    pub queries: Vec<Query>,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.column, self.values)
    }
}

impl QuerySet {
    /// Parses the line-oriented query format:
    /// ```text
    /// # comment
    /// query
    /// Group Archaea Bacteria
    /// Status Complete
    /// query
    /// Phylum Firmicutes
    /// ```
    /// A `query` line opens a new query; every other non-blank, non-comment
    /// line is `<column> <value>...` split on single spaces and attached to
    /// the most recent query.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut set = QuerySet::default();

        for (idx, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim_end();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line == "query" {
                log::trace!("query file line {}: new query", idx + 1);
                set.queries.push(Query::default());
                continue;
            }

            let mut tokens = line.split(' ').map(str::to_string);
            let column = tokens.next().unwrap_or_default();
            let criterion = Criterion {
                column,
                values: tokens.collect(),
            };
            let current = set
                .queries
                .last_mut()
                .ok_or(Error::CriterionBeforeQuery { line: idx + 1 })?;
            log::trace!("query file line {}: criterion {}", idx + 1, criterion);
            current.criteria.push(criterion);
        }

        log::debug!("Parsed queries: {:?}", set);
        Ok(set)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::info!("Parsing query file: {}", path.as_ref().display());
        QuerySet::parse(BufReader::new(File::open(path)?))
    }

    /// Checks the set is usable against `columns`: at least one query, no
    /// empty query, no criterion without values, no unknown column.
    pub fn validate<F>(&self, has_column: F, columns: &[String]) -> Result<()>
    where
        F: Fn(&str) -> bool,
    {
        if self.queries.is_empty() {
            return Err(Error::NoQueries);
        }
        for (i, query) in self.queries.iter().enumerate() {
            if query.criteria.is_empty() {
                return Err(Error::EmptyQuery { index: i + 1 });
            }
            for criterion in &query.criteria {
                if criterion.values.is_empty() {
                    return Err(Error::EmptyCriterion {
                        column: criterion.column.clone(),
                    });
                }
                if !has_column(&criterion.column) {
                    return Err(Error::UnknownColumn {
                        column: criterion.column.clone(),
                        available: columns.to_vec(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Columns compared as integers, so `0562` and `562` are the same taxid.
pub const INTEGER_COLUMNS: [&str; 1] = ["TaxID"];

/// One criterion bound to a column position.
enum Matcher<'a> {
    Text(&'a [String]),
    Integer(Vec<i64>),
}

impl<'a> Matcher<'a> {
    fn compile(criterion: &'a Criterion) -> Self {
        if !INTEGER_COLUMNS.contains(&criterion.column.as_str()) {
            return Matcher::Text(&criterion.values);
        }
        let numbers = criterion
            .values
            .iter()
            .filter_map(|v| match v.trim().parse() {
                Ok(n) => Some(n),
                Err(_) => {
                    log::warn!("{}: {:?} is not an integer and matches nothing", criterion.column, v);
                    None
                }
            })
            .collect();
        Matcher::Integer(numbers)
    }

    fn matches(&self, cell: &str) -> bool {
        match self {
            Matcher::Text(values) => values.iter().any(|v| v == cell),
            Matcher::Integer(numbers) => cell
                .trim()
                .parse::<i64>()
                .is_ok_and(|n| numbers.contains(&n)),
        }
    }
}

/// Rows of `table` matching `queries`, in their original order.
///
/// The whole set is validated first, so errors surface even on an empty table.
pub fn select(table: &Table, queries: &QuerySet) -> Result<Table> {
    queries.validate(|c| table.has_column(c), table.columns())?;

    // Resolve column names once; validate guarantees they exist.
    let compiled: Vec<Vec<(usize, Matcher)>> = queries
        .queries
        .iter()
        .map(|q| {
            q.criteria
                .iter()
                .filter_map(|c| Some((table.column_index(&c.column)?, Matcher::compile(c))))
                .collect()
        })
        .collect();

    let selected = table.filter_rows(|row| {
        compiled
            .iter()
            .any(|criteria| criteria.iter().all(|(col, m)| m.matches(&row[*col])))
    });
    log::info!("Selected {} of {} rows", selected.len(), table.len());
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DATA: &str = "Name\tGroup\tStatus\tPhylum\n\
                        a\tArchaea\tComplete\tEuryarchaeota\n\
                        b\tBacteria\tScaffold\tFirmicutes\n\
                        c\tBacteria\tComplete\tProteobacteria\n\
                        d\tEukaryota\tComplete\t\n\
                        e\tArchaea\tContig\tCrenarchaeota\n";

    fn table() -> Table {
        Table::from_reader(Cursor::new(DATA)).unwrap()
    }

    fn names(t: &Table) -> Vec<String> {
        t.column_values("Name")
            .unwrap()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn run(text: &str) -> Result<Table> {
        select(&table(), &QuerySet::parse(Cursor::new(text))?)
    }

    #[test]
    fn parses_queries_comments_and_blanks() {
        let set = QuerySet::parse(Cursor::new(
            "# archaea or bacteria\n\nquery\nGroup Archaea Bacteria\nStatus Complete\n  \nquery\nPhylum Firmicutes\n",
        ))
        .unwrap();
        assert_eq!(set.queries.len(), 2);
        assert_eq!(
            set.queries[0].criteria,
            vec![
                Criterion {
                    column: "Group".to_string(),
                    values: vec!["Archaea".to_string(), "Bacteria".to_string()]
                },
                Criterion {
                    column: "Status".to_string(),
                    values: vec!["Complete".to_string()]
                },
            ]
        );
        assert_eq!(set.queries[1].criteria[0].column, "Phylum");
    }

    #[test]
    fn criterion_before_query_is_an_error() {
        let err = QuerySet::parse(Cursor::new("# hi\nGroup Archaea\nquery\n")).unwrap_err();
        assert!(matches!(err, Error::CriterionBeforeQuery { line: 2 }));
        assert!(err.is_usage());
    }

    #[test]
    fn single_value_selects_exact_matches() {
        assert_eq!(names(&run("query\nStatus Complete\n").unwrap()), ["a", "c", "d"]);
        // no case folding or partial matching
        assert!(run("query\nStatus complete\n").unwrap().is_empty());
        assert!(run("query\nStatus Comp\n").unwrap().is_empty());
    }

    #[test]
    fn values_are_ored() {
        let t = run("query\nGroup Archaea Bacteria\n").unwrap();
        assert_eq!(names(&t), ["a", "b", "c", "e"]);
    }

    #[test]
    fn criteria_are_anded_and_queries_ored() {
        let t = run(
            "query\nGroup Archaea\nStatus Complete\n\
             query\nGroup Bacteria\nPhylum Firmicutes\n",
        )
        .unwrap();
        assert_eq!(names(&t), ["a", "b"]);
        assert_eq!(t.columns(), table().columns());
    }

    #[test]
    fn empty_query_set_is_fatal() {
        assert!(matches!(run("# nothing\n").unwrap_err(), Error::NoQueries));
    }

    #[test]
    fn empty_query_is_fatal() {
        let err = run("query\nGroup Archaea\nquery\n").unwrap_err();
        assert!(matches!(err, Error::EmptyQuery { index: 2 }));
    }

    #[test]
    fn criterion_without_values_is_fatal() {
        let err = run("query\nGroup\n").unwrap_err();
        assert!(matches!(err, Error::EmptyCriterion { ref column } if column == "Group"));
    }

    #[test]
    fn unknown_column_names_it_and_lists_columns() {
        let err = run("query\nPhylm Firmicutes\n").unwrap_err();
        match &err {
            Error::UnknownColumn { column, available } => {
                assert_eq!(column, "Phylm");
                assert_eq!(available, &["Name", "Group", "Status", "Phylum"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("Phylm"));
    }

    #[test]
    fn unknown_column_is_reported_on_empty_table() {
        let empty = Table::from_reader(Cursor::new("Name\tGroup\n")).unwrap();
        let set = QuerySet::parse(Cursor::new("query\nStrain K-12\n")).unwrap();
        assert!(matches!(
            select(&empty, &set).unwrap_err(),
            Error::UnknownColumn { .. }
        ));
    }

    #[test]
    fn taxid_is_compared_as_a_number() {
        let data = Table::from_reader(Cursor::new(
            "Name\tTaxID\n\
             coli\t562\n\
             subtilis\t1423\n\
             broken\tn/a\n",
        ))
        .unwrap();
        let pick = |text: &str| {
            names(&select(&data, &QuerySet::parse(Cursor::new(text)).unwrap()).unwrap())
        };
        assert_eq!(pick("query\nTaxID 0562\n"), ["coli"]);
        assert_eq!(pick("query\nTaxID 1423 562\n"), ["coli", "subtilis"]);
        // non-numeric values match nothing, not even the same text
        assert!(pick("query\nTaxID n/a\n").is_empty());
        assert!(pick("query\nTaxID 56\n").is_empty());
    }

    #[test]
    fn double_space_yields_an_empty_value() {
        // "Phylum  Firmicutes" splits into ["Phylum", "", "Firmicutes"]
        let t = run("query\nPhylum  Firmicutes\n").unwrap();
        assert_eq!(names(&t), ["b", "d"]);

        // trailing spaces are stripped with the line ending
        assert!(matches!(
            run("query\nPhylum \n").unwrap_err(),
            Error::EmptyCriterion { .. }
        ));
    }
}
