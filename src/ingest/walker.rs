use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Result, RetrievalError};

/// Metadata for a discovered document.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub file_size: u64,
    pub modified: std::time::SystemTime,
}

/// Discovers every `.txt` file under `root` (§6). Other extensions are skipped; this
/// engine only ingests plain text.
pub fn discover_files(root: &Path) -> Result<Vec<FileMetadata>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        if extension != "txt" {
            continue;
        }

        let metadata = std::fs::metadata(path).map_err(RetrievalError::Io)?;

        let relative_path = path
            .strip_prefix(root)
            .map_err(|_| {
                RetrievalError::Config(format!(
                    "failed to compute relative path for: {}",
                    path.display()
                ))
            })?
            .to_string_lossy()
            .to_string();

        files.push(FileMetadata {
            relative_path,
            absolute_path: path.to_path_buf(),
            file_size: metadata.len(),
            modified: metadata.modified().map_err(RetrievalError::Io)?,
        });
    }

    log::info!("discovered {} .txt files under {}", files.len(), root.display());
    Ok(files)
}

/// Reads a document's bytes, auto-detecting its charset and decoding to UTF-8 (§6).
/// Falls back to UTF-8-with-replacement when detection doesn't yield a usable encoding.
pub fn read_with_charset_detection(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(RetrievalError::Io)?;

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(&bytes, true);
    let encoding = detector.guess(None, true);

    let (decoded, _, had_errors) = encoding.decode(&bytes);
    if had_errors && encoding != encoding_rs::UTF_8 {
        let (fallback, _, _) = encoding_rs::UTF_8.decode(&bytes);
        return Ok(fallback.into_owned());
    }
    Ok(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn discovers_only_txt_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("a.txt"), "hello").unwrap();
        fs::write(root.join("nested/b.txt"), "world").unwrap();
        fs::write(root.join("config.yaml"), "key: value").unwrap();
        fs::write(root.join("image.png"), b"\x89PNG\r\n\x1a\n").unwrap();

        let files = discover_files(root).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.relative_path.contains("a.txt")));
        assert!(files.iter().any(|f| f.relative_path.contains("b.txt")));
    }

    #[test]
    fn discover_files_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        let files = discover_files(temp_dir.path()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn reads_utf8_text() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.txt");
        fs::write(&path, "Jeffrey Epstein met with Maxwell in Paris.").unwrap();
        let text = read_with_charset_detection(&path).unwrap();
        assert_eq!(text, "Jeffrey Epstein met with Maxwell in Paris.");
    }

    #[test]
    fn reads_latin1_text_with_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.txt");
        // 0xE9 is "e acute" in Latin-1/Windows-1252, invalid as a lone UTF-8 byte.
        fs::write(&path, [b'C', b'a', b'f', 0xE9]).unwrap();
        let text = read_with_charset_detection(&path).unwrap();
        assert!(text.starts_with("Caf"));
    }
}
