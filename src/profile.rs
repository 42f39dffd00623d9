//! Marker-delimited block in the user's shell profile
//!
//! The block looks like
//!
//! ```text
//! # >>> pixgpu >>>
//! export PATH=/usr/local/cuda-12.2/bin:$PATH
//! export LD_LIBRARY_PATH=/usr/local/cuda-12.2/lib64:$LD_LIBRARY_PATH
//! export TF_FORCE_GPU_ALLOW_GROWTH="true"
//! # <<< pixgpu <<<
//! ```
//!
//! The file is read into memory, edited, and written back atomically.
//! An existing block is never rewritten; changing it means removing it first.
//!
//! When the profile does not end with a newline the block is appended after a
//! separating newline and without a trailing one, so that removing it gives
//! back the original bytes.

use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::common::fs::atomic_write;
use crate::error::{PixGpuError, Result, file_read_failed};

pub struct ProfileEditor {
    path: PathBuf,
    begin: String,
    end: String,
}

impl ProfileEditor {
    pub fn new(path: impl Into<PathBuf>, marker: &str) -> Self {
        Self {
            path: path.into(),
            begin: format!("# >>> {marker} >>>"),
            end: format!("# <<< {marker} <<<"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(file_read_failed(&self.path, e)),
        }
    }

    fn malformed(&self, reason: &str) -> PixGpuError {
        PixGpuError::ProfileMalformed {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Byte ranges of every block, each covering the begin line through the
    /// end line and its newline. A block ending at EOF without a newline also
    /// covers the newline before its begin line.
    fn blocks(&self, content: &str) -> Result<Vec<Range<usize>>> {
        let mut blocks = Vec::new();
        let mut open: Option<usize> = None;
        let mut offset = 0;

        for line in content.split_inclusive('\n') {
            let text = line.trim_end_matches(['\n', '\r']);
            if text == self.begin {
                if open.is_some() {
                    return Err(self.malformed("begin marker appears twice without an end marker"));
                }
                open = Some(offset);
            } else if text == self.end {
                let Some(start) = open.take() else {
                    return Err(self.malformed("end marker without a begin marker"));
                };
                let end = offset + line.len();
                let start = if !line.ends_with('\n') && start > 0 {
                    start - 1
                } else {
                    start
                };
                blocks.push(start..end);
            }
            offset += line.len();
        }

        if open.is_some() {
            return Err(self.malformed("begin marker without an end marker"));
        }
        Ok(blocks)
    }

    pub fn has_block(&self) -> Result<bool> {
        let content = self.read()?;
        Ok(!self.blocks(&content)?.is_empty())
    }

    /// Content after appending `text` as a block, or `None` if a block exists
    pub fn with_block(&self, content: &str, text: &str) -> Result<Option<String>> {
        if !self.blocks(content)?.is_empty() {
            return Ok(None);
        }
        let body = text.trim_end_matches('\n');
        let block = format!("{}\n{}\n{}", self.begin, body, self.end);

        let mut updated = content.to_string();
        if content.is_empty() || content.ends_with('\n') {
            updated.push_str(&block);
            updated.push('\n');
        } else {
            updated.push('\n');
            updated.push_str(&block);
        }
        Ok(Some(updated))
    }

    /// Content with every block removed, or `None` if there is none
    pub fn without_block(&self, content: &str) -> Result<Option<String>> {
        let blocks = self.blocks(content)?;
        if blocks.is_empty() {
            return Ok(None);
        }
        let mut updated = String::with_capacity(content.len());
        let mut cursor = 0;
        for range in blocks {
            updated.push_str(&content[cursor..range.start]);
            cursor = range.end;
        }
        updated.push_str(&content[cursor..]);
        Ok(Some(updated))
    }

    /// Append the block unless one is already present. Returns whether the
    /// file changed.
    pub fn ensure_block(&self, text: &str) -> Result<bool> {
        let content = self.read()?;
        match self.with_block(&content, text)? {
            Some(updated) => {
                atomic_write(&self.path, updated.as_bytes())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete the block and its markers. Returns whether the file changed.
    pub fn remove_block(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let content = self.read()?;
        match self.without_block(&content)? {
            Some(updated) => {
                atomic_write(&self.path, updated.as_bytes())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Exports for the CUDA install
pub fn cuda_exports(root: &Path, lib_dir: &Path, feature_flag: &str) -> String {
    format!(
        "export PATH={}/bin:$PATH\n\
         export LD_LIBRARY_PATH={}:$LD_LIBRARY_PATH\n\
         export {feature_flag}=\"true\"",
        root.display(),
        lib_dir.display()
    )
}
