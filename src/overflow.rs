//! Disk-backed overflow for batches that could not be delivered.
//!
//! Each batch is stored verbatim in its own file named by the UNIX timestamp
//! in nanoseconds. A file's existence marks it as pending; deleting it is the
//! only cleanup. Files are written under a hidden staging name and linked
//! into place, so a reader listing the directory never observes a partially
//! written batch. Where the filesystem refuses hard links, the staged file is
//! renamed over a claimed empty placeholder instead.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::{debug, warn};
use rand::seq::SliceRandom;

use crate::clock::unix_nanos;

const STAGING_PREFIX: char = '.';

#[derive(Clone, Debug)]
pub struct OverflowStore {
    dir: PathBuf,
}

impl OverflowStore {
    /// Open the store, creating the directory (and parents) if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `batch` to a new file and return its path.
    pub fn persist(&self, batch: &[u8]) -> io::Result<PathBuf> {
        self.persist_with(batch, |from, to| fs::hard_link(from, to))
    }

    fn persist_with(
        &self,
        batch: &[u8],
        link: impl Fn(&Path, &Path) -> io::Result<()>,
    ) -> io::Result<PathBuf> {
        let (staging, stamp) = self.stage(batch)?;
        let published = match self.link_unique(&staging, stamp, link) {
            Err(err) => {
                debug!(
                    "cannot hard-link overflow files in {}: {err}; renaming instead",
                    self.dir.display()
                );
                self.rename_unique(&staging, stamp)
            }
            linked => linked,
        };
        match fs::remove_file(&staging) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("failed to remove staging file {}: {err}", staging.display()),
        }
        published
    }

    fn stage(&self, batch: &[u8]) -> io::Result<(PathBuf, u64)> {
        let mut stamp = unix_nanos();
        loop {
            let staging = self.dir.join(format!("{STAGING_PREFIX}{stamp}.partial"));
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&staging)
            {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    stamp += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };
            if let Err(err) = file.write_all(batch).and_then(|()| file.sync_data()) {
                let _ = fs::remove_file(&staging);
                return Err(err);
            }
            return Ok((staging, stamp));
        }
    }

    fn link_unique(
        &self,
        staging: &Path,
        mut stamp: u64,
        link: impl Fn(&Path, &Path) -> io::Result<()>,
    ) -> io::Result<PathBuf> {
        loop {
            let path = self.dir.join(stamp.to_string());
            match link(staging, &path) {
                Ok(()) => return Ok(path),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => stamp += 1,
                Err(err) => return Err(err),
            }
        }
    }

    /// Claim a free final name with an empty file, then rename the staged
    /// batch over it. The claim keeps concurrent writers off the same name.
    fn rename_unique(&self, staging: &Path, mut stamp: u64) -> io::Result<PathBuf> {
        loop {
            let path = self.dir.join(stamp.to_string());
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    stamp += 1;
                    continue;
                }
                Err(err) => return Err(err),
            }
            return match fs::rename(staging, &path) {
                Ok(()) => Ok(path),
                Err(err) => {
                    let _ = fs::remove_file(&path);
                    Err(err)
                }
            };
        }
    }

    /// Pending batch files, oldest name first.
    pub fn pending(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(STAGING_PREFIX) {
                continue;
            }
            files.push(entry.path());
        }
        files.sort();
        Ok(files)
    }

    /// Remove one pending batch chosen at random and return its contents.
    ///
    /// The file is deleted before the contents are handed out. When it cannot
    /// be deleted the contents are withheld so the same batch is never
    /// replayed twice.
    pub fn take_random(&self) -> io::Result<Option<Vec<u8>>> {
        let pending = self.pending()?;
        let Some(path) = pending.choose(&mut rand::thread_rng()) else {
            return Ok(None);
        };
        let contents = fs::read(path);
        fs::remove_file(path)?;
        contents.map(Some)
    }
}
