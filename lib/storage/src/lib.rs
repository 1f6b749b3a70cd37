//! # handknn Storage
//!
//! Persistence for example stores: the model file read at startup and written
//! on export, plus timestamped archives of earlier models.

pub mod archive;
pub mod manager;
pub mod model_file;

pub use archive::{ArchiveDescription, ArchiveManager};
pub use manager::ModelStorage;
pub use model_file::{load_store, read_snapshot, save_store, write_snapshot, DEFAULT_MODEL_FILE};
