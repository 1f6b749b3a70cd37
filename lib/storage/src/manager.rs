use handknn_core::{ClassifierConfig, Error, ExampleStore, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use crate::archive::{ArchiveDescription, ArchiveManager};
use crate::model_file::{self, DEFAULT_MODEL_FILE};

/// Owns a data directory holding the current model file and its archives
pub struct ModelStorage {
    data_dir: PathBuf,
    model_path: PathBuf,
    archives: ArchiveManager,
}

impl ModelStorage {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let archives = ArchiveManager::new(data_dir.join("archive"))
            .map_err(|e| Error::Storage(e.to_string()))?;

        Ok(Self {
            model_path: data_dir.join(DEFAULT_MODEL_FILE),
            data_dir,
            archives,
        })
    }

    #[inline]
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[inline]
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Load the current model, if one has been saved
    pub fn load(&self, config: ClassifierConfig) -> Result<Option<ExampleStore>> {
        if !self.model_path.exists() {
            debug!("No model file at {:?}", self.model_path);
            return Ok(None);
        }

        let store = model_file::load_store(&self.model_path, config)?;
        info!(
            "Loaded model {:?}: {} classes, {} examples",
            self.model_path,
            store.num_classes(),
            store.total_examples()
        );
        Ok(Some(store))
    }

    /// Overwrite the current model
    pub fn save(&self, store: &ExampleStore) -> Result<()> {
        model_file::save_store(&self.model_path, store)?;
        info!(
            "Saved model {:?}: {} classes, {} examples",
            self.model_path,
            store.num_classes(),
            store.total_examples()
        );
        Ok(())
    }

    /// Keep a timestamped copy of `store`
    pub fn archive(&self, store: &ExampleStore) -> Result<ArchiveDescription> {
        let description = self
            .archives
            .create("knn-classifier-model", &store.export_dataset())
            .map_err(|e| Error::Storage(e.to_string()))?;
        info!("Archived model as {}", description.name);
        Ok(description)
    }

    pub fn list_archives(&self) -> Result<Vec<ArchiveDescription>> {
        self.archives
            .list()
            .map_err(|e| Error::Storage(e.to_string()))
    }

    pub fn delete_archive(&self, name: &str) -> Result<bool> {
        self.archives
            .delete(name)
            .map_err(|e| Error::Storage(e.to_string()))
    }

    /// Load an archived model. The current model file is left as is.
    pub fn restore(&self, name: &str, config: ClassifierConfig) -> Result<ExampleStore> {
        let path = self
            .archives
            .archive_path(name)
            .map_err(|e| Error::Storage(e.to_string()))?;
        model_file::load_store(path, config)
    }
}
