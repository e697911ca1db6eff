//! Seed prompts loaded from disk.
//!
//! A prompt file is a list of turns that opens every conversation, typically
//! a system turn and perhaps a few example exchanges:
//!
//! ```yaml
//! - role: system
//!   content: You are a terse assistant.
//! - role: user
//!   content: ping
//! - role: assistant
//!   content: pong
//! ```
//!
//! YAML (`.yaml`, `.yml`) and JSON (`.json`) are accepted.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Turn;

/// Loads the seed turns in `path`.
///
/// # Errors
///
/// Fails if the file cannot be read, cannot be parsed, or has an extension
/// other than `.yaml`, `.yml`, or `.json`.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Turn>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let file = File::open(path)
        .map_err(|err| Error::io(format!("failed to open prompt file {}", path.display()), err))?;
    let reader = BufReader::new(file);
    match extension.as_deref() {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_reader(reader)?),
        Some("json") => Ok(serde_json::from_reader(reader)?),
        _ => Err(Error::validation(
            format!(
                "unsupported prompt file {}: expected .yaml, .yml, or .json",
                path.display()
            ),
            Some("prompt".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_temp(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "seed.yaml",
            "- role: system\n  content: Be brief.\n- role: user\n  content: hi\n",
        );
        let turns = load(&path).unwrap();
        assert_eq!(turns, vec![Turn::system("Be brief."), Turn::user("hi")]);
    }

    #[test]
    fn loads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "seed.json",
            r#"[{"role": "assistant", "content": "Hello!"}]"#,
        );
        let turns = load(&path).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::Assistant);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "seed.csv", "system,Be brief.\n");
        assert!(load(&path).unwrap_err().is_validation());
    }

    #[test]
    fn rejects_unknown_role() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "bad.yaml",
            "- role: narrator\n  content: Once upon a time\n",
        );
        assert!(matches!(load(&path), Err(Error::Serialization { .. })));
    }

    #[test]
    fn scratch_files_are_removed_with_their_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "seed.yaml", "- role: user\n  content: hi\n");
        assert_eq!(load(&path).unwrap().len(), 1);
        let root = dir.path().to_path_buf();
        dir.close().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
