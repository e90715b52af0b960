use crate::error::{AppError, AppResult};
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_.-]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// A file received from the client, before anything touches the disk
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as declared by the client
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Lowercased extension after the last `.`, if any
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Check a filename against the extension allow-list
///
/// # Examples
/// ```
/// use sheetscope::upload::allowed_file;
///
/// let allowed = vec!["csv".to_string(), "xlsx".to_string()];
/// assert!(allowed_file("Data.CSV", &allowed));
/// assert!(!allowed_file("notes.txt", &allowed));
/// assert!(!allowed_file("csv", &allowed));
/// ```
pub fn allowed_file(filename: &str, allowed: &[String]) -> bool {
    extension(filename).is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
}

/// Reduce a client-supplied filename to something safe to join onto a directory
///
/// Accented letters are folded to their ASCII base (NFKD, then non-ASCII
/// dropped). Path components are dropped, whitespace becomes `_`, anything outside
/// `[A-Za-z0-9_.-]` is removed and leading/trailing dots and underscores are
/// trimmed. The result may be empty.
///
/// # Examples
/// ```
/// use sheetscope::upload::secure_filename;
///
/// assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
/// assert_eq!(secure_filename("My Data (final).xlsx"), "My_Data_final.xlsx");
/// assert_eq!(secure_filename("résumé.csv"), "resume.csv");
/// ```
pub fn secure_filename(filename: &str) -> String {
    let folded: String = filename.nfkd().filter(char::is_ascii).collect();
    let joined = folded.replace(['/', '\\'], " ");
    let underscored = WHITESPACE.replace_all(joined.trim(), "_");
    let cleaned = UNSAFE_CHARS.replace_all(&underscored, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Validate an upload and return the sanitized filename to store it under
///
/// Checks run in order: empty filename, extension allow-list, then
/// sanitization. Nothing is written to disk here.
pub fn validate(file: &UploadedFile, allowed: &[String]) -> AppResult<String> {
    if file.filename.trim().is_empty() {
        return Err(AppError::Validation("No file selected".to_string()));
    }

    if !allowed_file(&file.filename, allowed) {
        return Err(AppError::Validation("Invalid file type".to_string()));
    }

    let safe = secure_filename(&file.filename);
    if safe.is_empty() {
        return Err(AppError::Validation("Invalid file name".to_string()));
    }
    if !allowed_file(&safe, allowed) {
        return Err(AppError::Validation("Invalid file type".to_string()));
    }

    Ok(safe)
}

/// Validate `file` and write it into `dir`, replacing any file with the same name
pub fn save_upload(dir: &Path, file: &UploadedFile, allowed: &[String]) -> AppResult<PathBuf> {
    let safe = validate(file, allowed)?;

    fs::create_dir_all(dir)?;
    let path = dir.join(&safe);
    fs::write(&path, &file.bytes)?;

    log::info!("Saved upload {} ({} bytes)", path.display(), file.bytes.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn allow() -> Vec<String> {
        vec!["xlsx".into(), "xls".into(), "csv".into()]
    }

    fn upload(name: &str, body: &str) -> UploadedFile {
        UploadedFile {
            filename: name.to_string(),
            bytes: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_disallowed_extension_rejected_regardless_of_content() {
        for body in ["a,b\n1,2\n", "", "PK\u{3}\u{4}"] {
            let err = validate(&upload("data.txt", body), &allow()).unwrap_err();
            assert_eq!(err.to_string(), "Invalid file type");
        }
        assert!(validate(&upload("noextension", "a"), &allow()).is_err());
    }

    #[test]
    fn test_empty_filename_rejected() {
        let err = validate(&upload("", "a,b\n"), &allow()).unwrap_err();
        assert_eq!(err.to_string(), "No file selected");
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("report.csv"), "report.csv");
        assert_eq!(secure_filename("C:\\Users\\me\\data.xlsx"), "C_Users_me_data.xlsx");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn test_secure_filename_folds_accents() {
        assert_eq!(secure_filename("résumé.csv"), "resume.csv");
        assert_eq!(secure_filename("Ångström data.xlsx"), "Angstrom_data.xlsx");
        // characters with no ASCII decomposition are dropped
        assert_eq!(secure_filename("数据.csv"), "csv");
    }

    #[test]
    fn test_save_overwrites_same_name() {
        let dir = tempdir().unwrap();

        let first = save_upload(dir.path(), &upload("data.csv", "a\n1\n"), &allow()).unwrap();
        let second = save_upload(dir.path(), &upload("data.csv", "a\n2\n"), &allow()).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(&second).unwrap(), "a\n2\n");
    }

    #[test]
    fn test_save_rejects_before_writing() {
        let dir = tempdir().unwrap();
        assert!(save_upload(dir.path(), &upload("evil.exe", "x"), &allow()).is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
