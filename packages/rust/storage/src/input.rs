//! Input URL list reader.

use std::path::Path;

use tracing::info;

use portscout_shared::{Result, ScoutError};

/// Read source URLs from the input CSV.
///
/// The first row is a header. A `url` column (any case) is used when present,
/// otherwise the first column. Values are trimmed, empty cells dropped, and
/// file order kept.
pub fn read_input_urls(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(ScoutError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "input file not found"),
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ScoutError::parse(format!("{}: {e}", path.display())))?;

    let column = reader
        .headers()
        .map_err(|e| ScoutError::parse(format!("{}: {e}", path.display())))?
        .iter()
        .position(|h| h.eq_ignore_ascii_case("url"))
        .unwrap_or(0);

    let mut urls = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| ScoutError::parse(format!("{}: {e}", path.display())))?;
        if let Some(url) = row.get(column).filter(|u| !u.is_empty()) {
            urls.push(url.to_string());
        }
    }

    info!(count = urls.len(), path = %path.display(), "read input URLs");
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn write_input(content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("portscout_input_{}.csv", Uuid::now_v7()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn uses_url_column() {
        let path = write_input(
            "firm,URL\nExample PE, https://examplepe.com/portfolio \nBlank,\nOwl,https://blueowl.com/x\n",
        );
        let urls = read_input_urls(&path).unwrap();
        assert_eq!(urls, vec!["https://examplepe.com/portfolio", "https://blueowl.com/x"]);
    }

    #[test]
    fn falls_back_to_first_column() {
        let path = write_input("source\nhttps://a.com\nhttps://b.com,extra\n\nhttps://a.com\n");
        let urls = read_input_urls(&path).unwrap();
        assert_eq!(urls, vec!["https://a.com", "https://b.com", "https://a.com"]);
    }

    #[test]
    fn missing_file_is_error() {
        let path = std::env::temp_dir().join(format!("portscout_missing_{}.csv", Uuid::now_v7()));
        let err = read_input_urls(&path).unwrap_err();
        assert!(matches!(err, ScoutError::Io { .. }));
    }
}
