//! JSON configuration read once at startup.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::filter::PropertyFilter;
use crate::types::SearchArea;

pub const FILTER_FILE: &str = "property_filter.json";
pub const AREAS_FILE: &str = "provinces_and_municipalities.json";
pub const RECIPIENTS_FILE: &str = "email_list.json";
pub const REPORT_FILE: &str = "casedavedere.html";
pub const CODES_FILE: &str = "property_code.txt";
pub const TOKEN_FILE: &str = "token.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct AreasFile {
    #[serde(rename = "SELECTED")]
    selected: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RecipientsFile {
    email: Vec<String>,
}

/// Where a run reads its configuration and writes its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub filter: PathBuf,
    pub areas: PathBuf,
    pub recipients: PathBuf,
    pub report: PathBuf,
    pub codes: PathBuf,
    pub token: PathBuf,
}

impl RunPaths {
    /// All files under `dir`, using their default names.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            filter: dir.join(FILTER_FILE),
            areas: dir.join(AREAS_FILE),
            recipients: dir.join(RECIPIENTS_FILE),
            report: dir.join(REPORT_FILE),
            codes: dir.join(CODES_FILE),
            token: dir.join(TOKEN_FILE),
        }
    }
}

impl Default for RunPaths {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// `None` when no filter file exists.
pub fn load_filter(path: &Path) -> Result<Option<PropertyFilter>, ConfigError> {
    read_json(path)
}

/// Every selected municipality of every province. A missing file selects nothing.
pub fn load_search_areas(path: &Path) -> Result<Vec<SearchArea>, ConfigError> {
    let Some(file) = read_json::<AreasFile>(path)? else {
        return Ok(Vec::new());
    };

    Ok(file
        .selected
        .into_iter()
        .flat_map(|(province, municipalities)| {
            municipalities
                .into_iter()
                .map(move |municipality| SearchArea::new(municipality, province.clone()))
        })
        .collect())
}

pub fn load_recipients(path: &Path) -> Result<Vec<String>, ConfigError> {
    Ok(read_json::<RecipientsFile>(path)?
        .map(|file| file.email)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RunPaths::in_dir(dir.path());

        assert!(load_filter(&paths.filter).unwrap().is_none());
        assert!(load_search_areas(&paths.areas).unwrap().is_empty());
        assert!(load_recipients(&paths.recipients).unwrap().is_empty());
    }

    #[test]
    fn test_load_filter() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RunPaths::in_dir(dir.path());
        fs::write(
            &paths.filter,
            r#"{"min_area": 50, "max_area": 100, "min_price": 0, "max_price": 250000,
                "intermediate_floor": false, "min_rooms": 2, "min_balconies": 0,
                "need_box": true, "need_elevator": false}"#,
        )
        .unwrap();

        let filter = load_filter(&paths.filter).unwrap().expect("filter present");

        assert_eq!(filter.min_area, 50);
        assert_eq!(filter.max_price, 250000);
        assert_eq!(filter.min_rooms, 2);
        assert!(filter.require_box);
    }

    #[test]
    fn test_incomplete_filter_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RunPaths::in_dir(dir.path());
        fs::write(&paths.filter, r#"{"min_area": 50}"#).unwrap();

        assert!(matches!(
            load_filter(&paths.filter),
            Err(ConfigError::Json { .. })
        ));
    }

    #[test]
    fn test_load_search_areas() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RunPaths::in_dir(dir.path());
        fs::write(
            &paths.areas,
            r#"{"SELECTED": {"roma": ["monterotondo", "mentana"], "latina": ["aprilia"]}}"#,
        )
        .unwrap();

        let areas = load_search_areas(&paths.areas).unwrap();

        assert_eq!(
            areas,
            vec![
                SearchArea::new("aprilia", "latina"),
                SearchArea::new("monterotondo", "roma"),
                SearchArea::new("mentana", "roma"),
            ]
        );
        assert_eq!(areas[1].slug(), "monterotondo-roma");
    }

    #[test]
    fn test_load_recipients() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RunPaths::in_dir(dir.path());
        fs::write(
            &paths.recipients,
            r#"{"email": ["a@example.com", "b@example.com"]}"#,
        )
        .unwrap();

        assert_eq!(
            load_recipients(&paths.recipients).unwrap(),
            vec!["a@example.com", "b@example.com"]
        );
    }
}
