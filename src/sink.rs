use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::export::ExportError;
use crate::summary::SessionSummary;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Destination for finished sessions.
pub trait SessionSink {
    fn store(&mut self, summary: &SessionSummary) -> Result<(), SinkError>;
}

/// Finished sessions kept for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    sessions: Vec<SessionSummary>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    pub fn get(&self, idx: usize) -> Option<&SessionSummary> {
        self.sessions.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut SessionSummary> {
        self.sessions.get_mut(idx)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionSink for MemoryArchive {
    fn store(&mut self, summary: &SessionSummary) -> Result<(), SinkError> {
        self.sessions.push(summary.clone());
        Ok(())
    }
}

/// Writes each session's attendance sheet as a CSV file.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    dir: PathBuf,
    last_written: Option<PathBuf>,
}

impl CsvFileSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            last_written: None,
        }
    }

    pub fn last_written(&self) -> Option<&Path> {
        self.last_written.as_deref()
    }

    /// Never overwrites: a name already on disk gets a `-2`, `-3`, ... suffix.
    pub fn write(&mut self, summary: &SessionSummary) -> Result<PathBuf, SinkError> {
        let csv = summary.export_csv()?;
        fs::create_dir_all(&self.dir).map_err(|source| SinkError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let name = summary.export_file_name();
        let stem = name.trim_end_matches(".csv");
        let mut attempt = 1;
        let (path, mut file) = loop {
            let path = match attempt {
                1 => self.dir.join(&name),
                n => self.dir.join(format!("{stem}-{n}.csv")),
            };
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(source) => return Err(SinkError::Io { path, source }),
            }
        };
        file.write_all(csv.as_bytes())
            .map_err(|source| SinkError::Io {
                path: path.clone(),
                source,
            })?;

        info!("attendance exported to {}", path.display());
        self.last_written = Some(path.clone());
        Ok(path)
    }
}

impl SessionSink for CsvFileSink {
    fn store(&mut self, summary: &SessionSummary) -> Result<(), SinkError> {
        self.write(summary).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::read_attendance;
    use crate::session::SessionConfig;
    use crate::summary::EndReason;
    use chrono::Local;
    use tempfile::tempdir;

    fn summary() -> SessionSummary {
        SessionSummary {
            config: SessionConfig::quick("Physics", 5, 3),
            marked: [2].into_iter().collect(),
            end_reason: EndReason::EndedEarly,
            started_at: Local::now(),
            ended_at: Local::now(),
        }
    }

    #[test]
    fn test_memory_archive_keeps_order() {
        let mut archive = MemoryArchive::new();
        assert!(archive.is_empty());
        archive.store(&summary()).unwrap();
        let mut second = summary();
        second.config.class_name = "Chemistry".into();
        archive.store(&second).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.get(1).unwrap().config.class_name, "Chemistry");
    }

    #[test]
    fn test_csv_sink_writes_exact_export() {
        let dir = tempdir().unwrap();
        let mut sink = CsvFileSink::new(dir.path().join("out"));
        let path = sink.write(&summary()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Roll Number,Status\n1,Absent\n2,Present\n3,Absent");
        assert_eq!(read_attendance(text.as_bytes()).unwrap().marked.len(), 1);
        assert_eq!(sink.last_written(), Some(path.as_path()));
    }

    #[test]
    fn test_csv_sink_never_overwrites() {
        let dir = tempdir().unwrap();
        let mut sink = CsvFileSink::new(dir.path());
        let earlier = summary();
        let first = sink.write(&earlier).unwrap();
        // same class, same start second
        let mut later = earlier.clone();
        later.marked.clear();
        let second = sink.write(&later).unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
        assert!(fs::read_to_string(&first).unwrap().contains("2,Present"));
        assert!(fs::read_to_string(&second).unwrap().contains("2,Absent"));
    }

    #[test]
    fn test_csv_sink_reports_io_errors() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let mut sink = CsvFileSink::new(&blocker);
        assert!(matches!(sink.store(&summary()), Err(SinkError::Io { .. })));
    }
}
