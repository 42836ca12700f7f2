// Dataset and vector snapshots on disk (JSON, JSON Lines, optionally gzipped)
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Snapshot description for listings and CLI output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDescription {
    pub name: String,
    pub path: PathBuf,
    pub creation_time: Option<String>,
    pub size: u64,
    pub records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// On-disk layout, picked from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// One JSON array.
    Json,
    /// One JSON object per line; blank lines are skipped.
    JsonLines,
}

impl DatasetFormat {
    /// `(format, gzipped)` for names like `rows.jsonl.gz` or `rows.json`.
    pub fn from_path(path: &Path) -> (Self, bool) {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_lowercase();
        let gzipped = name.ends_with(".gz");
        let stem = name.trim_end_matches(".gz");
        let format = if stem.ends_with(".jsonl") || stem.ends_with(".ndjson") {
            DatasetFormat::JsonLines
        } else {
            DatasetFormat::Json
        };
        (format, gzipped)
    }
}

fn open_reader(path: &Path, gzipped: bool) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(if gzipped {
        Box::new(BufReader::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Box::new(BufReader::new(file))
    })
}

/// Read every item of a dataset file.
pub fn read_dataset<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let (format, gzipped) = DatasetFormat::from_path(path);
    let mut reader = open_reader(path, gzipped)?;

    match format {
        DatasetFormat::Json => {
            let mut raw = Vec::new();
            reader.read_to_end(&mut raw)?;
            serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))
        }
        DatasetFormat::JsonLines => {
            let mut items = Vec::new();
            for (lineno, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let item = serde_json::from_str(&line)
                    .map_err(|e| anyhow!("{}:{}: {}", path.display(), lineno + 1, e))?;
                items.push(item);
            }
            Ok(items)
        }
    }
}

/// Write `items` to `path` in the format its name implies.
pub fn write_dataset<T: Serialize>(path: &Path, items: &[T]) -> Result<SnapshotDescription> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let (format, gzipped) = DatasetFormat::from_path(path);

    let mut buf = Vec::new();
    match format {
        DatasetFormat::Json => serde_json::to_writer(&mut buf, items)?,
        DatasetFormat::JsonLines => {
            for item in items {
                serde_json::to_writer(&mut buf, item)?;
                buf.push(b'\n');
            }
        }
    }

    let file = File::create(path)?;
    if gzipped {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        encoder.write_all(&buf)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        writer.write_all(&buf)?;
        writer.flush()?;
    }

    describe(path, items.len())
}

fn describe(path: &Path, records: usize) -> Result<SnapshotDescription> {
    let file_data = fs::read(path)?;
    let checksum = format!("{:x}", Sha256::digest(&file_data));
    let metadata = fs::metadata(path)?;
    let creation_time = metadata
        .modified()
        .ok()
        .map(|t| DateTime::<Utc>::from(t).format("%Y-%m-%dT%H:%M:%SZ").to_string());

    Ok(SnapshotDescription {
        name: path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string(),
        path: path.to_path_buf(),
        creation_time,
        size: metadata.len(),
        records,
        checksum: Some(checksum),
    })
}

/// Timestamped `.jsonl.gz` snapshots grouped by name under one directory.
pub struct SnapshotManager {
    snapshot_dir: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_dir: P) -> Result<Self> {
        let snapshot_dir = snapshot_dir.as_ref().to_path_buf();
        fs::create_dir_all(&snapshot_dir)?;
        Ok(Self { snapshot_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.snapshot_dir
    }

    fn generate_snapshot_name(name: &str) -> String {
        let now: DateTime<Utc> = Utc::now();
        format!("{}-{}.jsonl.gz", name, now.format("%Y-%m-%d-%H-%M-%S-%3f"))
    }

    pub fn create_snapshot<T: Serialize>(&self, name: &str, items: &[T]) -> Result<SnapshotDescription> {
        let path = self.snapshot_dir.join(Self::generate_snapshot_name(name));
        write_dataset(&path, items)
    }

    /// Snapshots of `name`, newest first.
    pub fn list_snapshots(&self, name: &str) -> Result<Vec<PathBuf>> {
        let prefix = format!("{}-", name);
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.snapshot_dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix) && n.ends_with(".jsonl.gz"))
                .unwrap_or(false);
            if matches {
                found.push(path);
            }
        }
        found.sort_by(|a, b| b.cmp(a));
        Ok(found)
    }

    /// Items of the newest snapshot of `name`, if any exists.
    pub fn load_latest<T: DeserializeOwned>(&self, name: &str) -> Result<Option<Vec<T>>> {
        match self.list_snapshots(name)?.into_iter().next() {
            Some(path) => read_dataset(&path).map(Some),
            None => Ok(None),
        }
    }
}
