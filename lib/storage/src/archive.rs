// Timestamped model archives
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use handknn_core::Snapshot;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use crate::model_file::write_snapshot;

const ARCHIVE_EXTENSION: &str = "txt";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";
const TIMESTAMP_LEN: usize = "2000-01-01-00-00-00-000".len();

/// Archive description for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveDescription {
    pub name: String,
    pub creation_time: Option<String>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

pub struct ArchiveManager {
    archive_dir: PathBuf,
}

impl ArchiveManager {
    pub fn new<P: AsRef<Path>>(archive_dir: P) -> Result<Self> {
        let archive_dir = archive_dir.as_ref().to_path_buf();
        fs::create_dir_all(&archive_dir)?;
        Ok(Self { archive_dir })
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Pick a free `<model>-<timestamp>.txt` name. Archives created within
    /// the same millisecond get a `-1`, `-2`, ... suffix.
    fn generate_archive_name(&self, model_name: &str) -> String {
        let now: DateTime<Utc> = Utc::now();
        let stem = format!("{}-{}", model_name, now.format(TIMESTAMP_FORMAT));

        let mut name = format!("{}.{}", stem, ARCHIVE_EXTENSION);
        let mut n = 1;
        while self.archive_dir.join(&name).exists() {
            name = format!("{}-{}.{}", stem, n, ARCHIVE_EXTENSION);
            n += 1;
        }
        name
    }

    /// Write `snapshot` as a new archive
    pub fn create(&self, model_name: &str, snapshot: &Snapshot) -> Result<ArchiveDescription> {
        let name = self.generate_archive_name(model_name);
        let path = self.archive_dir.join(&name);
        write_snapshot(&path, snapshot)?;
        describe(&path, name)
    }

    /// All archives, newest first
    pub fn list(&self) -> Result<Vec<ArchiveDescription>> {
        let mut archives = Vec::new();
        for entry in fs::read_dir(&self.archive_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(ARCHIVE_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                archives.push(describe(&path, name.to_string())?);
            }
        }

        // Unrecognized names go last
        archives.sort_by(|a, b| {
            archive_order(&b.name)
                .cmp(&archive_order(&a.name))
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(archives)
    }

    /// Resolve an archive name to its path, refusing anything outside the archive dir
    pub fn archive_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(anyhow!("Invalid archive name '{}'", name));
        }
        let path = self.archive_dir.join(name);
        if !path.exists() {
            return Err(anyhow!("Archive '{}' not found", name));
        }
        Ok(path)
    }

    pub fn delete(&self, name: &str) -> Result<bool> {
        match self.archive_path(name) {
            Ok(path) => {
                fs::remove_file(path)?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }
}

/// Creation order encoded in an archive name: timestamp, then collision suffix
fn archive_order(name: &str) -> Option<(NaiveDateTime, u32)> {
    let stem = name.strip_suffix(ARCHIVE_EXTENSION)?.strip_suffix('.')?;
    if let Some(ts) = parse_timestamp_tail(stem) {
        return Some((ts, 0));
    }
    let (head, suffix) = stem.rsplit_once('-')?;
    Some((parse_timestamp_tail(head)?, suffix.parse().ok()?))
}

fn parse_timestamp_tail(stem: &str) -> Option<NaiveDateTime> {
    let tail = stem.get(stem.len().checked_sub(TIMESTAMP_LEN)?..)?;
    NaiveDateTime::parse_from_str(tail, TIMESTAMP_FORMAT).ok()
}

fn describe(path: &Path, name: String) -> Result<ArchiveDescription> {
    let metadata = fs::metadata(path)?;
    let checksum = format!("{:x}", Sha256::digest(fs::read(path)?));

    let creation_time = metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .and_then(|d| DateTime::from_timestamp(d.as_secs() as i64, 0))
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string());

    Ok(ArchiveDescription {
        name,
        creation_time,
        size: metadata.len(),
        checksum: Some(checksum),
    })
}
