// Model files: the dataset snapshot as UTF-8 JSON text
use atomicwrites::{AtomicFile, OverwriteBehavior};
use handknn_core::{ClassifierConfig, Error, ExampleStore, Result, Snapshot};
use std::io::Write;
use std::path::Path;

/// File name the browser tool downloads and loads at startup
pub const DEFAULT_MODEL_FILE: &str = "knn-classifier-model.txt";

/// Read and parse a snapshot file
pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<Snapshot> {
    let text = std::fs::read_to_string(path.as_ref())?;
    Snapshot::from_json(&text)
}

/// Write a snapshot file atomically (temp file + rename)
pub fn write_snapshot<P: AsRef<Path>>(path: P, snapshot: &Snapshot) -> Result<()> {
    let path = path.as_ref();
    let json = snapshot.to_json()?;

    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(json.as_bytes()))
        .map_err(|e| Error::Storage(format!("writing {}: {}", path.display(), e)))
}

/// Load an example store from a model file
pub fn load_store<P: AsRef<Path>>(path: P, config: ClassifierConfig) -> Result<ExampleStore> {
    ExampleStore::from_snapshot(read_snapshot(path)?, config)
}

/// Export an example store into a model file
pub fn save_store<P: AsRef<Path>>(path: P, store: &ExampleStore) -> Result<()> {
    write_snapshot(path, &store.export_dataset())
}
