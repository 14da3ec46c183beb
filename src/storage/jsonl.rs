//! JSONL storage for tasks and dependency edges
//!
//! Records are stored in `.depgate/tasks.jsonl` and `.depgate/edges.jsonl`
//! with one JSON object per line. Uses file locking for concurrent access
//! safety.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::hash::Hash;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::config::PROJECT_DIR;
use crate::domain::{DependencyEdge, EdgeId, Task, TaskId};

/// A record that can live in a JSONL store
pub trait Record: Serialize + DeserializeOwned + Clone {
    type Key: Clone + Eq + Hash + Ord + Display;

    /// Human name used in error messages
    const KIND: &'static str;

    fn key(&self) -> &Self::Key;
}

impl Record for Task {
    type Key = TaskId;
    const KIND: &'static str = "task";

    fn key(&self) -> &TaskId {
        &self.id
    }
}

impl Record for DependencyEdge {
    type Key = EdgeId;
    const KIND: &'static str = "edge";

    fn key(&self) -> &EdgeId {
        &self.id
    }
}

/// Store for records in JSONL format
///
/// Later lines win over earlier ones with the same key. New records are
/// appended; any full rewrite drops superseded lines.
pub struct JsonlStore<T> {
    path: PathBuf,
    _record: PhantomData<T>,
}

pub type TaskStore = JsonlStore<Task>;
pub type EdgeStore = JsonlStore<DependencyEdge>;

impl TaskStore {
    /// Creates the default task store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(PROJECT_DIR).join("tasks.jsonl"))
    }
}

impl EdgeStore {
    /// Creates the default edge store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(PROJECT_DIR).join("edges.jsonl"))
    }
}

impl<T: Record> JsonlStore<T> {
    /// Creates a new store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all records from the store
    pub fn read_all(&self) -> Result<HashMap<T::Key, T>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open {} store: {}", T::KIND, self.path.display()))?;

        // Acquire shared lock for reading
        file.lock_shared()
            .with_context(|| format!("Failed to acquire read lock on {} store", T::KIND))?;

        let reader = BufReader::new(&file);
        let mut records = HashMap::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let record: T = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse {} at line {}", T::KIND, line_num + 1))?;

            records.insert(record.key().clone(), record);
        }

        // Lock is released when file is dropped
        Ok(records)
    }

    /// Reads all records sorted by key
    pub fn read_sorted(&self) -> Result<Vec<T>> {
        let mut records: Vec<T> = self.read_all()?.into_values().collect();
        records.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(records)
    }

    /// Writes all records to the store (full rewrite)
    pub fn write_all<'a>(&self, records: impl IntoIterator<Item = &'a T>) -> Result<()>
    where
        T: 'a,
    {
        self.stage(records)?.commit()
    }

    /// Writes all records to a temp file next to the store
    ///
    /// The store itself is untouched until [`StagedWrite::commit`] renames the
    /// temp file over it.
    pub fn stage<'a>(&self, records: impl IntoIterator<Item = &'a T>) -> Result<StagedWrite>
    where
        T: 'a,
    {
        self.ensure_parent()?;

        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .with_context(|| format!("Failed to acquire write lock on {} store", T::KIND))?;

            let mut writer = BufWriter::new(&file);

            // Sort by key for consistent output
            let mut sorted: Vec<&T> = records.into_iter().collect();
            sorted.sort_by(|a, b| a.key().cmp(b.key()));

            for record in sorted {
                let line = serde_json::to_string(record)
                    .with_context(|| format!("Failed to serialize {}", T::KIND))?;
                writeln!(writer, "{}", line)
                    .with_context(|| format!("Failed to write {}", T::KIND))?;
            }

            writer
                .flush()
                .with_context(|| format!("Failed to flush {} store", T::KIND))?;
            file.sync_all()
                .with_context(|| format!("Failed to sync {} store", T::KIND))?;
        }

        Ok(StagedWrite {
            temp: temp_path,
            target: self.path.clone(),
        })
    }

    /// Appends a single record without a full rewrite
    pub fn append(&self, record: &T) -> Result<()> {
        self.ensure_parent()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {} store: {}", T::KIND, self.path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to acquire write lock on {} store", T::KIND))?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(record)
            .with_context(|| format!("Failed to serialize {}", T::KIND))?;
        writeln!(writer, "{}", line).with_context(|| format!("Failed to write {}", T::KIND))?;

        writer
            .flush()
            .with_context(|| format!("Failed to flush {} store", T::KIND))?;

        Ok(())
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        Ok(())
    }
}

/// A full rewrite waiting to replace its store
pub struct StagedWrite {
    temp: PathBuf,
    target: PathBuf,
}

impl StagedWrite {
    /// Atomically replaces the store with the staged records
    pub fn commit(self) -> Result<()> {
        fs::rename(&self.temp, &self.target).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                self.temp.display(),
                self.target.display()
            )
        })
    }
}
