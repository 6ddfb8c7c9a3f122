use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug)]
pub enum UploadError {
    BadName,
    NotFound,
    EmptyBody,
    UnsupportedType,
    Io(std::io::Error),
}

pub struct StoredPdf {
    pub filename: String,
    pub size: u64,
}

/// Writes PDF bytes under `dir` with a generated, collision-checked name.
/// Bytes are sniffed for the `%PDF-` magic regardless of the declared
/// content type, so a renamed file cannot sneak past the filter.
pub fn store_pdf(
    dir: &Path,
    bytes: &[u8],
    content_type: Option<&str>,
) -> Result<StoredPdf, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::EmptyBody);
    }
    if let Some(content_type) = content_type
        && content_type != "application/pdf"
        && content_type != "application/octet-stream"
    {
        return Err(UploadError::UnsupportedType);
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(UploadError::UnsupportedType);
    }

    std::fs::create_dir_all(dir).map_err(UploadError::Io)?;

    let millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64;
    for _ in 0..10 {
        let suffix = random_suffix();
        let filename = format!("{millis}-{suffix}.pdf");
        let target = dir.join(&filename);
        if target.exists() {
            continue;
        }
        atomic_write_bytes(&target, bytes).map_err(UploadError::Io)?;
        return Ok(StoredPdf {
            filename,
            size: bytes.len() as u64,
        });
    }

    Err(UploadError::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate upload name",
    )))
}

pub fn read_pdf(dir: &Path, filename: &str) -> Result<Vec<u8>, UploadError> {
    let path = resolve_pdf_path(dir, filename)?;
    match std::fs::read(&path) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(UploadError::NotFound),
        Err(err) => Err(UploadError::Io(err)),
    }
}

pub fn remove_pdf(dir: &Path, filename: &str) -> Result<(), UploadError> {
    let path = resolve_pdf_path(dir, filename)?;
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(UploadError::NotFound),
        Err(err) => Err(UploadError::Io(err)),
    }
}

/// Uploads live in a flat directory; a valid name is a plain `.pdf` file name
/// with no path components, so traversal never leaves `dir`.
fn resolve_pdf_path(dir: &Path, filename: &str) -> Result<PathBuf, UploadError> {
    if filename.is_empty()
        || !filename.ends_with(".pdf")
        || filename.starts_with('.')
        || !filename
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.')
    {
        return Err(UploadError::BadName);
    }
    Ok(dir.join(filename))
}

fn random_suffix() -> String {
    let value: u32 = rand::random();
    format!("{:08x}", value)
}

fn atomic_write_bytes(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("missing parent directory"))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.pdf");
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    for attempt in 0..10u32 {
        let temp_name = format!(".{}.tmp-{}-{}-{}", file_name, pid, nanos, attempt);
        let temp_path = parent.join(temp_name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
        {
            Ok(mut file) => {
                use std::io::Write as _;
                file.write_all(contents)?;
                file.flush()?;
                std::fs::rename(&temp_path, path)?;
                return Ok(());
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to create temp file",
    ))
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn store_pdf__should_write_sniffed_pdf_under_dir() {
        // Given
        let dir = create_temp_dir("store-pdf");
        let bytes = b"%PDF-1.4 minimal";

        // When
        let stored = store_pdf(&dir, bytes, Some("application/pdf")).expect("store pdf");

        // Then
        assert!(stored.filename.ends_with(".pdf"));
        assert_eq!(stored.size, bytes.len() as u64);
        assert_eq!(read_pdf(&dir, &stored.filename).expect("read back"), bytes);

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[test]
    fn store_pdf__should_reject_non_pdf_bytes() {
        // Given
        let dir = create_temp_dir("reject-bytes");

        // When
        let result = store_pdf(&dir, b"plain text", Some("application/pdf"));

        // Then
        assert!(matches!(result, Err(UploadError::UnsupportedType)));

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[test]
    fn store_pdf__should_reject_wrong_content_type() {
        // Given
        let dir = create_temp_dir("reject-type");

        // When
        let result = store_pdf(&dir, b"%PDF-1.4", Some("image/png"));

        // Then
        assert!(matches!(result, Err(UploadError::UnsupportedType)));

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[test]
    fn store_pdf__should_reject_empty_body() {
        // Given
        let dir = create_temp_dir("reject-empty");

        // When
        let result = store_pdf(&dir, b"", Some("application/pdf"));

        // Then
        assert!(matches!(result, Err(UploadError::EmptyBody)));

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[test]
    fn resolve_pdf_path__should_reject_traversal_names() {
        // Given
        let dir = create_temp_dir("traversal");

        // Then
        assert!(matches!(
            read_pdf(&dir, "../outside.pdf"),
            Err(UploadError::BadName)
        ));
        assert!(matches!(
            read_pdf(&dir, "nested/inside.pdf"),
            Err(UploadError::BadName)
        ));
        assert!(matches!(
            read_pdf(&dir, ".hidden.pdf"),
            Err(UploadError::BadName)
        ));
        assert!(matches!(
            read_pdf(&dir, "notes.txt"),
            Err(UploadError::BadName)
        ));

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    #[test]
    fn remove_pdf__should_report_missing_files() {
        // Given
        let dir = create_temp_dir("remove-missing");

        // When
        let result = remove_pdf(&dir, "1700000000-deadbeef.pdf");

        // Then
        assert!(matches!(result, Err(UploadError::NotFound)));

        std::fs::remove_dir_all(&dir).expect("cleanup");
    }

    fn create_temp_dir(test_name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        dir.push(format!("inkpad-{}-{}", test_name, nanos));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }
}
