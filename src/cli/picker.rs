//! Interactive sales CSV picker behind `pulse --pick`.
//!
//! Only files whose header row carries the sales columns are offered, so the
//! list never contains unrelated CSVs that would aggregate to nothing. A chosen
//! file bypasses the precomputed summary, which describes the default dataset.

use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AppError;
use crate::ingest::stream::missing_columns;

/// Directory recursion depth for the search.
const SEARCH_DEPTH: usize = 4;

/// A CSV under the search root whose header has every sales column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesCsv {
    pub path: PathBuf,
    pub bytes: u64,
}

impl SalesCsv {
    fn label(&self) -> String {
        format!("{} ({})", pretty_path(&self.path), fmt_size(self.bytes))
    }
}

/// Result of scanning a directory tree.
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<SalesCsv>,
    /// CSVs found but rejected for missing columns.
    pub skipped: usize,
}

/// Prompt for a sales CSV under the current directory.
///
/// Accepts a list number or a path; `q` cancels.
pub fn prompt_for_csv_path() -> Result<PathBuf, AppError> {
    let found = discover_sales_csvs(Path::new("."), SEARCH_DEPTH);
    let stdin = io::stdin();
    choose(&found, &mut stdin.lock(), &mut io::stdout())
}

fn choose<R: BufRead, W: Write>(found: &Discovery, input: &mut R, out: &mut W) -> Result<PathBuf, AppError> {
    let write_err = |e: io::Error| AppError::new(2, format!("Failed to write prompt: {e}"));

    if found.files.is_empty() {
        return Err(AppError::new(
            2,
            format!(
                "No sales CSV found ({} other .csv file(s) lack YEAR, MONTH, RETAIL SALES, WAREHOUSE SALES). \
                 Provide one with `pulse --csv <file.csv>`.",
                found.skipped
            ),
        ));
    }

    writeln!(out, "Sales CSVs under the current directory:").map_err(write_err)?;
    for (idx, file) in found.files.iter().enumerate() {
        writeln!(out, "{:>3}) {}", idx + 1, file.label()).map_err(write_err)?;
    }
    if found.skipped > 0 {
        writeln!(out, "     ({} CSV file(s) without the sales columns not shown)", found.skipped).map_err(write_err)?;
    }

    loop {
        write!(out, "Pick 1-{} or type a path (q to quit): ", found.files.len()).map_err(write_err)?;
        out.flush().map_err(write_err)?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|e| AppError::new(2, format!("Failed to read input: {e}")))?;
        if read == 0 {
            return Err(AppError::new(2, "No input received. Pass the file with `pulse --csv <file.csv>`."));
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Err(AppError::new(2, "Canceled."));
        }

        if let Ok(n) = line.parse::<usize>() {
            match found.files.get(n.wrapping_sub(1)) {
                Some(file) => return Ok(file.path.clone()),
                None => {
                    writeln!(out, "No entry {n}; pick between 1 and {}.", found.files.len()).map_err(write_err)?;
                    continue;
                }
            }
        }

        match validate_sales_csv(Path::new(line)) {
            Ok(file) => return Ok(file.path),
            Err(err) => writeln!(out, "{err}").map_err(write_err)?,
        }
    }
}

/// Check that `path` is a readable `.csv` file with the sales columns.
pub fn validate_sales_csv(path: &Path) -> Result<SalesCsv, AppError> {
    if !has_csv_extension(path) {
        return Err(AppError::new(2, format!("Not a .csv file: {}", path.display())));
    }
    let meta = fs::metadata(path).map_err(|e| AppError::new(2, format!("Cannot read {}: {e}", path.display())))?;
    if meta.is_dir() {
        return Err(AppError::new(2, format!("Expected a file, got a directory: {}", path.display())));
    }

    let file = File::open(path).map_err(|e| AppError::new(2, format!("Cannot open {}: {e}", path.display())))?;
    let missing = missing_columns(file).map_err(|e| AppError::new(2, format!("{}: {e}", path.display())))?;
    if !missing.is_empty() {
        return Err(AppError::new(
            2,
            format!("{} is missing column(s): {}", path.display(), missing.join(", ")),
        ));
    }

    Ok(SalesCsv {
        path: path.to_path_buf(),
        bytes: meta.len(),
    })
}

/// Walk `root` for sales CSVs, sorted by display path.
pub fn discover_sales_csvs(root: &Path, max_depth: usize) -> Discovery {
    let mut candidates = Vec::new();
    walk(root, 0, max_depth, &mut candidates);

    let mut found = Discovery::default();
    for path in candidates {
        match validate_sales_csv(&path) {
            Ok(file) => found.files.push(file),
            Err(err) => {
                debug!(error = %err, "skipping CSV");
                found.skipped += 1;
            }
        }
    }
    found.files.sort_by_key(|f| pretty_path(&f.path));
    found
}

fn walk(dir: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let Ok(kind) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        if kind.is_dir() {
            if !is_build_dir(&path) {
                walk(&path, depth + 1, max_depth, out);
            }
        } else if kind.is_file() && has_csv_extension(&path) {
            out.push(path);
        }
    }
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

// `public/` holds the generated summary, never a raw export.
fn is_build_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules" | "dist" | "public")
}

fn pretty_path(path: &Path) -> String {
    path.strip_prefix("./").unwrap_or(path).display().to_string()
}

fn fmt_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KIB * KIB {
        format!("{:.1} MiB", b / (KIB * KIB))
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}
