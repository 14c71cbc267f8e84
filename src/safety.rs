//! Output path checks, so a batch run never overwrites its own inputs.

use anyhow::{bail, Result};
use std::path::Path;

/// Library databases are never a valid place to write results.
const DATABASE_EXTENSIONS: [&str; 3] = ["sqlite", "sqlite3", "db"];

/// Validates that `output` is safe to create or overwrite.
///
/// Checks:
/// - Output must be a `.json` file
/// - Output cannot be the same path as any input (library, requests, settings)
///
/// Returns an error describing the first failed check.
pub fn validate_output_path(output: &Path, inputs: &[&Path]) -> Result<()> {
    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => {}
        Some(ext) if DATABASE_EXTENSIONS.contains(&ext) => bail!(
            "Safety check failed: output '{}' looks like a library database",
            output.display()
        ),
        _ => bail!(
            "Safety check failed: output file '{}' must have a .json extension",
            output.display()
        ),
    }

    for input in inputs {
        if is_same_file(output, input) {
            bail!(
                "Safety check failed: output '{}' cannot be the same as input '{}'",
                output.display(),
                input.display()
            );
        }
    }

    Ok(())
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_output() {
        let output = PathBuf::from("/tmp/resolved.json");
        let library = PathBuf::from("/data/library.sqlite3");
        let requests = PathBuf::from("/data/requests.json");
        assert!(validate_output_path(&output, &[&library, &requests]).is_ok());
    }

    #[test]
    fn test_missing_json_extension() {
        let output = PathBuf::from("/tmp/resolved.txt");
        let result = validate_output_path(&output, &[]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must have a .json extension"));
    }

    #[test]
    fn test_database_output_blocked() {
        let output = PathBuf::from("/tmp/library.sqlite3");
        let result = validate_output_path(&output, &[]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("looks like a library database"));
    }

    #[test]
    fn test_output_equals_input() {
        let path = PathBuf::from("/data/requests.json");
        let result = validate_output_path(&path, &[&path]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as input"));
    }

    #[test]
    fn test_output_equals_input_through_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let requests = dir.path().join("requests.json");
        std::fs::write(&requests, "[]").unwrap();
        let aliased = dir.path().join(".").join("requests.json");
        assert!(validate_output_path(&aliased, &[&requests]).is_err());
    }
}
