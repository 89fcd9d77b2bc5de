//! Flat-file output sink
//!
//! Each saved page produces two UTF-8 files in the output directory:
//! `Page_{index}.txt` with the decoded page text and `Data_Page_{index}.txt`
//! with one labelled record per line.

use crate::output::traits::{LabelledRecord, OutputResult, OutputSink};
use crate::SpiderError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes pages and records as text files under one directory
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Creates a sink writing into `dir`, creating the directory if needed
    pub fn create(dir: impl Into<PathBuf>) -> OutputResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| SpiderError::Persistence {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn page_path(&self, page_index: usize) -> PathBuf {
        self.dir.join(format!("Page_{}.txt", page_index))
    }

    pub fn data_path(&self, page_index: usize) -> PathBuf {
        self.dir.join(format!("Data_Page_{}.txt", page_index))
    }
}

fn persistence_error(path: &Path) -> impl FnOnce(std::io::Error) -> SpiderError + '_ {
    move |source| SpiderError::Persistence {
        path: path.to_path_buf(),
        source,
    }
}

impl OutputSink for FileSink {
    fn save_contents(&self, page_index: usize, text: &str) -> OutputResult<PathBuf> {
        let path = self.page_path(page_index);
        fs::write(&path, text).map_err(persistence_error(&path))?;
        tracing::debug!("Saved page {} to {}", page_index, path.display());
        Ok(path)
    }

    fn save_records(&self, page_index: usize, records: &[LabelledRecord]) -> OutputResult<PathBuf> {
        let path = self.data_path(page_index);

        let mut content = String::new();
        for record in records {
            content.push_str(&record.to_string());
            content.push('\n');
        }

        let mut file = fs::File::create(&path).map_err(persistence_error(&path))?;
        file.write_all(content.as_bytes())
            .map_err(persistence_error(&path))?;

        tracing::debug!(
            "Saved {} records of page {} to {}",
            records.len(),
            page_index,
            path.display()
        );
        Ok(path)
    }
}
