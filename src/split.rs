//! Split a dataset into annotation batches.
//!
//! Annotation work is handed out in fixed-size chunks: the source table is
//! cut into `n` batches (any remainder spread one row each over the first
//! batches) and a configurable percentage of batches is randomly marked for
//! cross-evaluation, where the same rows are rated by more than one
//! annotator to measure agreement. Marked batches carry a `_crossval`
//! filename suffix.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::Serialize;

use crate::table::{write_csv, Table};
use crate::{Error, Result};

/// Batch splitting parameters.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Number of batches to cut the table into.
    pub num_batches: usize,
    /// Percentage of batches (0–100) to mark for cross-evaluation. When
    /// non-zero, at least one batch is marked.
    pub crossval_percentage: f64,
}

/// One written batch file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFile {
    /// Where the batch was written.
    pub path: PathBuf,
    /// Number of rows in the batch.
    pub rows: usize,
    /// Whether the batch is marked for cross-evaluation.
    pub crossval: bool,
}

/// Cut `table` into batches under `output_dir`, returning the written files
/// in batch order.
///
/// Batch numbering is 1-based in filenames (`batch_1.csv`,
/// `batch_2_crossval.csv`, ...). The cross-evaluation sample is drawn from
/// `rng`, so a seeded generator reproduces the same marking.
pub fn split_into_batches<R: Rng>(
    table: &Table,
    config: &SplitConfig,
    output_dir: &Path,
    rng: &mut R,
) -> Result<Vec<BatchFile>> {
    if config.num_batches == 0 {
        return Err(Error::invalid_input("num_batches must be at least 1"));
    }
    if table.is_empty() {
        return Err(Error::EmptyTable);
    }
    if !(0.0..=100.0).contains(&config.crossval_percentage) {
        return Err(Error::invalid_input(format!(
            "crossval_percentage {} is not in 0..=100",
            config.crossval_percentage
        )));
    }
    std::fs::create_dir_all(output_dir)?;

    let n = config.num_batches;
    let base = table.len() / n;
    let remainder = table.len() % n;
    let crossval = pick_crossval_batches(n, config.crossval_percentage, rng);

    let mut files = Vec::with_capacity(n);
    let mut start = 0;
    for batch_no in 1..=n {
        let size = base + usize::from(batch_no <= remainder);
        let batch = table.slice(start..start + size);
        let is_crossval = crossval.contains(&batch_no);
        let suffix = if is_crossval { "_crossval" } else { "" };
        let path = output_dir.join(format!("batch_{}{}.csv", batch_no, suffix));
        write_csv(&path, &batch)?;
        log::info!(
            "batch {} ({} rows) written to {}",
            batch_no,
            batch.len(),
            path.display()
        );
        files.push(BatchFile {
            path,
            rows: batch.len(),
            crossval: is_crossval,
        });
        start += size;
    }
    Ok(files)
}

/// Sample the 1-based batch numbers to mark for cross-evaluation: at least
/// one when the percentage is non-zero, none when it is zero.
fn pick_crossval_batches<R: Rng>(n: usize, percentage: f64, rng: &mut R) -> HashSet<usize> {
    if percentage <= 0.0 {
        return HashSet::new();
    }
    let count = ((n as f64 * percentage / 100.0).round() as usize).clamp(1, n);
    rand::seq::index::sample(rng, n, count)
        .into_iter()
        .map(|i| i + 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CsvStore, Row, TableStore};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table_of(rows: usize) -> Table {
        let mut table = Table::new(vec!["text".into(), "rewrite".into()]);
        for i in 0..rows {
            let mut row = Row::default();
            row.set("text", format!("toxic {}", i));
            row.set("rewrite", format!("calm {}", i));
            table.push_row(row);
        }
        table
    }

    #[test]
    fn remainder_rows_go_to_the_first_batches() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let config = SplitConfig {
            num_batches: 3,
            crossval_percentage: 0.0,
        };
        let files = split_into_batches(&table_of(10), &config, dir.path(), &mut rng).unwrap();
        let sizes: Vec<usize> = files.iter().map(|f| f.rows).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert!(files.iter().all(|f| !f.crossval));
        assert!(dir.path().join("batch_1.csv").exists());
    }

    #[test]
    fn batches_cover_every_row_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let config = SplitConfig {
            num_batches: 4,
            crossval_percentage: 0.0,
        };
        let files = split_into_batches(&table_of(9), &config, dir.path(), &mut rng).unwrap();

        let mut texts = Vec::new();
        for file in &files {
            let batch = CsvStore::new(&file.path).load().unwrap();
            for row in batch.rows() {
                texts.push(row.get("text").to_string());
            }
        }
        let expected: Vec<String> = (0..9).map(|i| format!("toxic {}", i)).collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn nonzero_percentage_marks_at_least_one_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let config = SplitConfig {
            num_batches: 5,
            crossval_percentage: 1.0,
        };
        let files = split_into_batches(&table_of(25), &config, dir.path(), &mut rng).unwrap();
        let marked: Vec<&BatchFile> = files.iter().filter(|f| f.crossval).collect();
        assert_eq!(marked.len(), 1);
        assert!(marked[0]
            .path
            .to_string_lossy()
            .ends_with("_crossval.csv"));
    }

    #[test]
    fn full_percentage_marks_every_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let config = SplitConfig {
            num_batches: 3,
            crossval_percentage: 100.0,
        };
        let files = split_into_batches(&table_of(6), &config, dir.path(), &mut rng).unwrap();
        assert!(files.iter().all(|f| f.crossval));
    }

    #[test]
    fn seeded_rng_reproduces_the_marking() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let config = SplitConfig {
            num_batches: 6,
            crossval_percentage: 50.0,
        };
        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        let files_a = split_into_batches(&table_of(12), &config, dir_a.path(), &mut rng_a).unwrap();
        let files_b = split_into_batches(&table_of(12), &config, dir_b.path(), &mut rng_b).unwrap();
        let marks_a: Vec<bool> = files_a.iter().map(|f| f.crossval).collect();
        let marks_b: Vec<bool> = files_b.iter().map(|f| f.crossval).collect();
        assert_eq!(marks_a, marks_b);
    }

    #[test]
    fn zero_batches_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let config = SplitConfig {
            num_batches: 0,
            crossval_percentage: 0.0,
        };
        assert!(matches!(
            split_into_batches(&table_of(3), &config, dir.path(), &mut rng),
            Err(Error::InvalidInput(_))
        ));
    }
}
