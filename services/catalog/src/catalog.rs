use crate::image_key::folder_for_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors reading or writing the catalog snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Folder name to image keys, in listing order within each folder.
///
/// Serialized as a plain JSON object; this is the snapshot format shared by
/// the catalog builder and the gallery server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    folders: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    /// Group listed keys by folder in a single pass
    pub fn group_by_folder<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut folders: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for key in keys {
            let folder = folder_for_key(&key).to_string();
            folders.entry(folder).or_default().push(key);
        }

        for (folder, images) in &folders {
            info!(folder = %folder, images = images.len(), "Folder grouped");
        }

        Self { folders }
    }

    /// Iterate folders and their keys
    pub fn folders(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.folders
            .iter()
            .map(|(folder, keys)| (folder.as_str(), keys.as_slice()))
    }

    /// Keys of a single folder
    pub fn folder(&self, name: &str) -> Option<&[String]> {
        self.folders.get(name).map(Vec::as_slice)
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    /// Total number of images across all folders
    pub fn image_count(&self) -> usize {
        self.folders.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Overwrite the snapshot file with compact JSON
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let json = serde_json::to_vec(self)?;
        fs::write(path, &json)?;

        debug!(
            path = %path.display(),
            size_bytes = json.len(),
            "Catalog snapshot written"
        );
        Ok(())
    }

    /// Read a snapshot written by [`Catalog::persist`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let contents = fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&contents)?)
    }
}

impl From<BTreeMap<String, Vec<String>>> for Catalog {
    fn from(folders: BTreeMap<String, Vec<String>>) -> Self {
        Self { folders }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_key::ROOT_FOLDER;

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_group_by_folder() {
        let catalog = Catalog::group_by_folder(keys(&[
            "photos/2024-05/b.jpg",
            "photos/cover.png",
            "photos/2024-05/a.jpg",
            "photos/2023-12/x.gif",
        ]));

        assert_eq!(catalog.folder_count(), 3);
        assert_eq!(catalog.image_count(), 4);
        // listing order is kept inside a folder
        assert_eq!(
            catalog.folder("2024-05").unwrap(),
            ["photos/2024-05/b.jpg", "photos/2024-05/a.jpg"]
        );
        assert_eq!(catalog.folder(ROOT_FOLDER).unwrap(), ["photos/cover.png"]);
    }

    #[test]
    fn test_empty_listing() {
        let catalog = Catalog::group_by_folder(Vec::new());
        assert!(catalog.is_empty());
        assert_eq!(serde_json::to_string(&catalog).unwrap(), "{}");
    }

    #[test]
    fn test_snapshot_is_compact_object() {
        let catalog = Catalog::group_by_folder(keys(&["a.jpg", "p/b/c.jpg"]));
        let json = serde_json::to_string(&catalog).unwrap();
        assert_eq!(json, r#"{"b":["p/b/c.jpg"],"root":["a.jpg"]}"#);
    }

    #[test]
    fn test_persist_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        let catalog = Catalog::group_by_folder(keys(&["p/one/a.jpg", "p/two/b.png"]));
        catalog.persist(&path).unwrap();

        let loaded = Catalog::load(&path).unwrap();
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn test_persist_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        Catalog::group_by_folder(keys(&["p/one/a.jpg", "p/one/b.jpg"]))
            .persist(&path)
            .unwrap();
        Catalog::group_by_folder(keys(&["c.jpg"])).persist(&path).unwrap();

        let loaded = Catalog::load(&path).unwrap();
        assert_eq!(loaded.image_count(), 1);
        assert!(loaded.folder("one").is_none());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(Catalog::load(&missing), Err(SnapshotError::Io(_))));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, b"{\"root\": [").unwrap();
        assert!(matches!(Catalog::load(&broken), Err(SnapshotError::Json(_))));
    }
}
