//! Row-oriented table backed by a CSV file.
//!
//! The table is the durability boundary of an annotation session: rows are
//! keyed by column name, and every save is a whole-file rewrite. The rewrite
//! goes through a temp file in the target directory followed by an atomic
//! rename, so a failed save never leaves a half-written table behind.

use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// One row of a table: a mapping from column name to cell value.
///
/// Reading a column the row does not carry yields the empty string, which is
/// also the sentinel for "not yet annotated".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, String>,
}

impl Row {
    /// Cell value for `column`, or `""` if the row has no such cell.
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }

    /// Set the cell value for `column`.
    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.values.insert(column.to_string(), value.into());
    }
}

/// An in-memory table with an ordered header and string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given header.
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Column names, in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Whether a column of this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has zero rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Row at `index`, if in bounds.
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Mutable row at `index`, if in bounds.
    pub fn row_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.rows.get_mut(index)
    }

    /// Append a row.
    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Add `name` to the header if absent. Existing cells are untouched;
    /// missing cells read as `""`.
    ///
    /// Returns `true` if the column was added.
    pub fn ensure_column(&mut self, name: &str) -> bool {
        if self.has_column(name) {
            return false;
        }
        self.headers.push(name.to_string());
        true
    }

    /// Add `name` to the header if absent, and replace empty cells in that
    /// column with `fill` in every row.
    pub fn ensure_column_filled(&mut self, name: &str, fill: &str) {
        self.ensure_column(name);
        for row in &mut self.rows {
            if row.get(name).is_empty() {
                row.set(name, fill);
            }
        }
    }

    /// A new table with the same header and the rows in `range`.
    pub fn slice(&self, range: Range<usize>) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: self.rows[range].to_vec(),
        }
    }
}

/// The backing store boundary: whole-table load and whole-file save.
pub trait TableStore {
    /// Read the full table from the store.
    fn load(&self) -> Result<Table>;

    /// Replace the store contents with `table`. Must be all-or-nothing: on
    /// failure the previously stored table remains readable.
    fn save(&mut self, table: &Table) -> Result<()>;
}

/// CSV file store.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    /// A store backed by the CSV file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file path this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableStore for CsvStore {
    fn load(&self) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| Error::parse(format!("failed to open {}: {}", self.path.display(), e)))?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::parse(format!("failed to read header: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();
        let mut table = Table::new(headers.clone());
        for (line, result) in reader.records().enumerate() {
            let record = result
                .map_err(|e| Error::parse(format!("failed to parse record {}: {}", line + 1, e)))?;
            let mut row = Row::default();
            for (i, header) in headers.iter().enumerate() {
                row.set(header, record.get(i).unwrap_or(""));
            }
            table.push_row(row);
        }
        Ok(table)
    }

    fn save(&mut self, table: &Table) -> Result<()> {
        write_csv(&self.path, table)
    }
}

/// Write `table` to `path` as CSV via a temp file plus atomic rename.
pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let temp = NamedTempFile::new_in(parent)
        .map_err(|e| Error::persistence(format!("failed to create temp file: {}", e)))?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file());
        writer
            .write_record(table.headers())
            .map_err(|e| Error::persistence(format!("failed to write header: {}", e)))?;
        for row in table.rows() {
            let record: Vec<&str> = table.headers().iter().map(|h| row.get(h)).collect();
            writer
                .write_record(&record)
                .map_err(|e| Error::persistence(format!("failed to write row: {}", e)))?;
        }
        writer
            .flush()
            .map_err(|e| Error::persistence(format!("failed to flush: {}", e)))?;
    }
    temp.persist(path)
        .map_err(|e| Error::persistence(format!("failed to replace {}: {}", path.display(), e)))?;
    Ok(())
}

/// In-memory store. Useful in tests and for driving a session from a table
/// that lives somewhere other than a local CSV file.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    table: Table,
    fail_next_save: bool,
}

impl MemStore {
    /// A store seeded with `table`.
    pub fn new(table: Table) -> Self {
        Self {
            table,
            fail_next_save: false,
        }
    }

    /// The currently stored table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Make the next `save` fail with a persistence error, then recover.
    pub fn fail_next_save(&mut self) {
        self.fail_next_save = true;
    }
}

impl TableStore for MemStore {
    fn load(&self) -> Result<Table> {
        Ok(self.table.clone())
    }

    fn save(&mut self, table: &Table) -> Result<()> {
        if self.fail_next_save {
            self.fail_next_save = false;
            return Err(Error::persistence("injected save failure"));
        }
        self.table = table.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut table = Table::new(vec!["text".into(), "rewrite".into()]);
        let mut row = Row::default();
        row.set("text", "you are awful");
        row.set("rewrite", "I disagree with you");
        table.push_row(row);
        let mut row = Row::default();
        row.set("text", "get lost");
        row.set("rewrite", "please leave me alone");
        table.push_row(row);
        table
    }

    #[test]
    fn csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let table = sample_table();
        write_csv(&path, &table).unwrap();

        let loaded = CsvStore::new(&path).load().unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("table.csv");
        let mut store = CsvStore::new(&path);
        store.save(&sample_table()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn missing_cells_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "text,rewrite,rating\na,b,A\nc,d\n").unwrap();

        let table = CsvStore::new(&path).load().unwrap();
        assert_eq!(table.rows()[0].get("rating"), "A");
        assert_eq!(table.rows()[1].get("rating"), "");
    }

    #[test]
    fn ensure_column_is_idempotent() {
        let mut table = sample_table();
        assert!(table.ensure_column("rating"));
        assert!(!table.ensure_column("rating"));
        assert_eq!(table.headers().len(), 3);
        assert_eq!(table.rows()[0].get("rating"), "");
    }

    #[test]
    fn ensure_column_filled_replaces_only_empty_cells() {
        let mut table = sample_table();
        table.ensure_column("Neutral");
        table.row_mut(0).unwrap().set("Neutral", "calm text");
        table.ensure_column_filled("Neutral", "[empty]");
        assert_eq!(table.rows()[0].get("Neutral"), "calm text");
        assert_eq!(table.rows()[1].get("Neutral"), "[empty]");
    }

    #[test]
    fn slice_keeps_headers() {
        let table = sample_table();
        let head = table.slice(0..1);
        assert_eq!(head.len(), 1);
        assert_eq!(head.headers(), table.headers());
        assert_eq!(head.rows()[0].get("text"), "you are awful");
    }

    #[test]
    fn mem_store_fail_injection_recovers() {
        let mut store = MemStore::new(sample_table());
        store.fail_next_save();
        let table = sample_table();
        assert!(store.save(&table).is_err());
        assert!(store.save(&table).is_ok());
    }
}
