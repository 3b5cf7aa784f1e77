use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::data::Frame;
use crate::output::Display;

/// Writes every n-th frame to a directory as JPEG. Useful when commissioning
/// a line without a monitor attached.
pub struct SnapshotDisplay {
    directory: PathBuf,
    every_n: u64,
    counter: u64,
}

impl SnapshotDisplay {
    pub fn new(directory: impl Into<PathBuf>, every_n: u32) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)
            .with_context(|| format!("cannot create snapshot directory {directory:?}"))?;
        Ok(Self {
            directory,
            every_n: every_n.max(1) as u64,
            counter: 0,
        })
    }
}

impl Display for SnapshotDisplay {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        self.counter += 1;
        if self.counter % self.every_n != 0 {
            return Ok(());
        }
        let path = self.directory.join(format!("frame_{:08}.jpg", self.counter));
        frame
            .image
            .save(&path)
            .with_context(|| format!("cannot write snapshot {path:?}"))?;
        Ok(())
    }
}
