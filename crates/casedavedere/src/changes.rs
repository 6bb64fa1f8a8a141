//! Change detection between the codes matched by this run and the previous one.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A listing code, with `None` standing for a listing whose code could not be read.
pub type Code = Option<String>;
pub type CodeSet = HashSet<Code>;

/// How an unknown code is written to the state file.
pub const NULL_MARKER: &str = "None";

#[derive(Debug, thiserror::Error)]
pub enum ChangeSetError {
    #[error("Failed to read code state {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to write code state {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Reads one code per line. A missing file is an empty set.
pub fn load_codes(path: &Path) -> Result<CodeSet, ChangeSetError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CodeSet::new()),
        Err(source) => {
            return Err(ChangeSetError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| (line != NULL_MARKER).then(|| line.to_string()))
        .collect())
}

/// Overwrites `path` with one code per line, sorted.
pub fn write_codes(path: &Path, codes: &CodeSet) -> Result<(), ChangeSetError> {
    let mut sorted: Vec<&Code> = codes.iter().collect();
    sorted.sort();

    let content: String = sorted
        .into_iter()
        .map(|code| format!("{}\n", code.as_deref().unwrap_or(NULL_MARKER)))
        .collect();

    fs::write(path, content).map_err(|source| ChangeSetError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Codes in `current` that were not seen in `previous`.
pub fn new_codes(previous: &CodeSet, current: &CodeSet) -> CodeSet {
    current.difference(previous).cloned().collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub previous: CodeSet,
    pub current: CodeSet,
}

impl ChangeSet {
    pub fn new(previous: CodeSet, current: CodeSet) -> Self {
        Self { previous, current }
    }

    pub fn load(path: &Path, current: CodeSet) -> Result<Self, ChangeSetError> {
        Ok(Self::new(load_codes(path)?, current))
    }

    pub fn new_codes(&self) -> CodeSet {
        new_codes(&self.previous, &self.current)
    }

    pub fn is_changed(&self) -> bool {
        self.previous != self.current
    }

    /// Writes the current codes when they differ from the previous ones.
    /// Returns whether the file was rewritten.
    pub fn persist(&self, path: &Path) -> Result<bool, ChangeSetError> {
        if !self.is_changed() {
            return Ok(false);
        }
        write_codes(path, &self.current)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn codes(items: &[Option<&str>]) -> CodeSet {
        items.iter().map(|c| c.map(str::to_string)).collect()
    }

    #[test]
    fn test_new_codes() {
        let previous = codes(&[Some("1-1"), Some("2-2")]);
        let current = codes(&[Some("2-2"), Some("3-3")]);

        let change_set = ChangeSet::new(previous, current);

        assert_eq!(change_set.new_codes(), codes(&[Some("3-3")]));
        assert!(change_set.is_changed());
    }

    #[test]
    fn test_persist_rewrites_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("property_code.txt");
        fs::write(&path, "1-1\n2-2\n").unwrap();

        let current = codes(&[Some("2-2"), Some("3-3")]);
        let change_set = ChangeSet::load(&path, current.clone()).unwrap();

        assert_eq!(change_set.previous, codes(&[Some("1-1"), Some("2-2")]));
        assert!(change_set.persist(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "2-2\n3-3\n");
        assert_eq!(load_codes(&path).unwrap(), current);
    }

    #[test]
    fn test_persist_is_noop_when_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("property_code.txt");
        fs::write(&path, "2-2\n1-1\n").unwrap();

        let change_set = ChangeSet::load(&path, codes(&[Some("1-1"), Some("2-2")])).unwrap();

        assert!(!change_set.is_changed());
        assert!(!change_set.persist(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "2-2\n1-1\n");
    }

    #[test]
    fn test_null_marker_alone_is_a_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("property_code.txt");
        fs::write(&path, "1-1\n").unwrap();

        let change_set = ChangeSet::load(&path, codes(&[Some("1-1"), None])).unwrap();

        assert_eq!(change_set.new_codes(), codes(&[None]));
        assert!(change_set.persist(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "None\n1-1\n");
    }

    #[test]
    fn test_missing_state_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");

        assert!(load_codes(&path).unwrap().is_empty());
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("property_code.txt");
        fs::write(&path, "1-1\n\n  \nNone\n").unwrap();

        assert_eq!(load_codes(&path).unwrap(), codes(&[Some("1-1"), None]));
    }

    fn arb_codes() -> impl Strategy<Value = CodeSet> {
        proptest::collection::hash_set(proptest::option::of("[0-9]{1,5}-[0-9]{1,5}"), 0..20)
    }

    proptest! {
        #[test]
        fn prop_new_codes_of_same_set_is_empty(set in arb_codes()) {
            prop_assert!(new_codes(&set, &set).is_empty());
        }

        #[test]
        fn prop_new_codes_from_nothing_is_everything(set in arb_codes()) {
            prop_assert_eq!(new_codes(&CodeSet::new(), &set), set);
        }

        #[test]
        fn prop_persisted_codes_round_trip(set in arb_codes()) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("property_code.txt");

            write_codes(&path, &set).unwrap();

            prop_assert_eq!(load_codes(&path).unwrap(), set);
        }
    }
}
