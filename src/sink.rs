//! Append-only record files.
//!
//! Both files are opened in append mode so a batch interrupted and restarted
//! keeps its earlier rows. Neither writes a header.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::ingest::VideoMetadata;
use crate::pipeline::{FrameCount, ResultSink};

fn open_append(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {} for append", path.display()))?;
    Ok(BufWriter::new(file))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `video,frame_index,count` rows.
pub struct CsvResultSink {
    path: PathBuf,
    out: BufWriter<File>,
}

impl CsvResultSink {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let out = open_append(&path)?;
        Ok(Self { path, out })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out
            .flush()
            .with_context(|| format!("flush {}", self.path.display()))
    }
}

impl ResultSink for CsvResultSink {
    fn record(&mut self, record: &FrameCount) -> Result<()> {
        writeln!(
            self.out,
            "{},{},{}",
            csv_field(&record.video),
            record.frame_index,
            record.count
        )
        .with_context(|| format!("write {}", self.path.display()))
    }
}

impl Drop for CsvResultSink {
    fn drop(&mut self) {
        if let Err(err) = self.out.flush() {
            log::warn!("failed to flush {}: {}", self.path.display(), err);
        }
    }
}

/// `name,valid,fps,frames,length_seconds` rows, one per candidate video.
pub struct VideoInfoLog {
    path: PathBuf,
    out: BufWriter<File>,
}

impl VideoInfoLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let out = open_append(&path)?;
        Ok(Self { path, out })
    }

    pub fn append(&mut self, meta: &VideoMetadata) -> Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{}",
            csv_field(&meta.name),
            meta.valid,
            meta.fps,
            meta.frames,
            meta.length_secs
        )
        .and_then(|()| self.out.flush())
        .with_context(|| format!("write {}", self.path.display()))
    }
}

/// Keeps records in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub records: Vec<FrameCount>,
}

impl ResultSink for MemorySink {
    fn record(&mut self, record: &FrameCount) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
