use std::path::{Path, PathBuf};

use crate::error::EditError;

const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eol {
    Lf,
    CrLf,
}

impl Eol {
    fn as_str(self) -> &'static str {
        match self {
            Eol::Lf => "\n",
            Eol::CrLf => "\r\n",
        }
    }
}

/// A file's content decomposed into LF-split lines plus the formatting
/// metadata needed to reconstruct byte-identical output when no edit is
/// applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub lines: Vec<String>,
    pub bom: bool,
    pub eol: Eol,
}

impl FileSnapshot {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EditError> {
        let bom = bytes.starts_with(&BOM);
        let body = if bom { &bytes[3..] } else { bytes };

        let text = String::from_utf8_lossy(body).into_owned();
        let eol = detect_eol(&text);
        let lines = split_lines(&text);

        Ok(Self { lines, bom, eol })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let body = self.lines.join(self.eol.as_str());
        let mut out = Vec::with_capacity(body.len() + 3);
        if self.bom {
            out.extend_from_slice(&BOM);
        }
        out.extend_from_slice(body.as_bytes());
        out
    }

    pub fn joined(&self) -> String {
        self.lines.join("\n")
    }

    pub fn with_lines(&self, lines: Vec<String>) -> Self {
        Self {
            lines,
            bom: self.bom,
            eol: self.eol,
        }
    }
}

fn detect_eol(text: &str) -> Eol {
    for (idx, byte) in text.as_bytes().iter().enumerate() {
        if *byte == b'\n' {
            if idx > 0 && text.as_bytes()[idx - 1] == b'\r' {
                return Eol::CrLf;
            }
            return Eol::Lf;
        }
    }
    Eol::Lf
}

fn split_lines(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    if normalized.is_empty() {
        return vec![String::new()];
    }
    normalized.split('\n').map(|s| s.to_string()).collect()
}

/// Read `path`, enforcing `max_size` and the regular-file requirement.
/// Async to match the rest of the substrate's tokio-based I/O surface.
pub async fn read(path: &Path, max_size: u64) -> Result<FileSnapshot, EditError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EditError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else if e.kind() == std::io::ErrorKind::PermissionDenied {
            EditError::PermissionDenied {
                path: path.to_path_buf(),
            }
        } else {
            EditError::io(&e)
        }
    })?;

    if !metadata.is_file() {
        return Err(EditError::NotRegularFile {
            path: path.to_path_buf(),
        });
    }

    if metadata.len() > max_size {
        return Err(EditError::TooLarge {
            size: metadata.len(),
            limit: max_size,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            EditError::PermissionDenied {
                path: path.to_path_buf(),
            }
        } else {
            EditError::io(&e)
        }
    })?;

    FileSnapshot::from_bytes(&bytes)
}

/// Write `snapshot` to `path` atomically: write to a sibling temp file,
/// then rename over the target. Creates missing parent directories.
pub async fn write(path: &Path, snapshot: &FileSnapshot) -> Result<(), EditError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EditError::io(&e))?;
        }
    }

    let tmp_path = temp_path_for(path);
    tokio::fs::write(&tmp_path, snapshot.to_bytes())
        .await
        .map_err(|e| EditError::io(&e))?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| EditError::io(&e))?;

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let tmp_name = format!(".{file_name}.substrate-tmp");
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(tmp_name),
        _ => PathBuf::from(tmp_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_lf() {
        let snap = FileSnapshot::from_bytes(b"a\nb\nc").unwrap();
        assert_eq!(snap.eol, Eol::Lf);
        assert_eq!(snap.lines, vec!["a", "b", "c"]);
        assert!(!snap.bom);
    }

    #[test]
    fn detects_crlf() {
        let snap = FileSnapshot::from_bytes(b"a\r\nb\r\nc").unwrap();
        assert_eq!(snap.eol, Eol::CrLf);
        assert_eq!(snap.lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn detects_bom() {
        let mut bytes = BOM.to_vec();
        bytes.extend_from_slice(b"hello");
        let snap = FileSnapshot::from_bytes(&bytes).unwrap();
        assert!(snap.bom);
        assert_eq!(snap.lines, vec!["hello"]);
    }

    #[test]
    fn round_trip_preserves_bytes() {
        let original = b"line1\r\nline2\r\nline3".to_vec();
        let snap = FileSnapshot::from_bytes(&original).unwrap();
        assert_eq!(snap.to_bytes(), original);
    }

    #[test]
    fn round_trip_preserves_bom_and_crlf() {
        let mut original = BOM.to_vec();
        original.extend_from_slice(b"a\r\nb");
        let snap = FileSnapshot::from_bytes(&original).unwrap();
        assert_eq!(snap.to_bytes(), original);
    }

    #[test]
    fn empty_content_is_one_empty_line() {
        let snap = FileSnapshot::from_bytes(b"").unwrap();
        assert_eq!(snap.lines, vec![""]);
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read(&tmp.path().join("missing.txt"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn read_rejects_oversize_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("big.txt");
        tokio::fs::write(&path, vec![b'a'; 100]).await.unwrap();
        let err = read(&path, 10).await.unwrap_err();
        assert!(matches!(err, EditError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn write_then_read_round_trips_crlf() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.txt");
        let snap = FileSnapshot {
            lines: vec!["a".into(), "b".into()],
            bom: false,
            eol: Eol::CrLf,
        };
        write(&path, &snap).await.unwrap();
        let bytes = tokio::fs::read(&path).await.unwrap();
        assert_eq!(bytes, b"a\r\nb");
    }

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/dir/out.txt");
        let snap = FileSnapshot {
            lines: vec!["hi".into()],
            bom: false,
            eol: Eol::Lf,
        };
        write(&path, &snap).await.unwrap();
        assert!(path.exists());
    }
}
