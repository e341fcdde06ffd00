// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;

use fs2::FileExt;

use crate::Error;

/// Exclusive advisory lock over a target directory.
///
/// The lock is held until [`InstanceLock::release`] is called or the value is dropped.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    file: Option<File>,
}

impl InstanceLock {
    /// Acquires the lock on `path`, blocking until any other holder releases it.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(lock) = Self::try_acquire(path)? {
            return Ok(lock);
        }

        log::info!(
            "waiting for another instance to release {}",
            path.display()
        );
        let file = open_lock_file(path)?;
        FileExt::lock_exclusive(&file).map_err(|err| {
            Error::new("failed to acquire instance lock")
                .with_path(path)
                .with_source(err)
        })?;

        log::debug!("acquired instance lock {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    /// Acquires the lock on `path` if nobody holds it.
    ///
    /// Returns `Ok(None)` when another holder owns the lock.
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Option<Self>, Error> {
        let path = path.as_ref();
        let file = open_lock_file(path)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                log::debug!("acquired instance lock {}", path.display());
                Ok(Some(Self {
                    path: path.to_path_buf(),
                    file: Some(file),
                }))
            }
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(err) => Err(Error::new("failed to acquire instance lock")
                .with_path(path)
                .with_source(err)),
        }
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the lock.
    pub fn release(mut self) -> Result<(), Error> {
        match self.file.take() {
            Some(file) => {
                FileExt::unlock(&file).map_err(|err| {
                    Error::new("failed to release instance lock")
                        .with_path(&self.path)
                        .with_source(err)
                })?;
                log::debug!("released instance lock {}", self.path.display());
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(err) = FileExt::unlock(&file) {
                log::warn!(
                    "failed to release instance lock {}: {err}",
                    self.path.display()
                );
            }
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File, Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                Error::new("failed to create lock directory")
                    .with_path(parent)
                    .with_source(err)
            })?;
        }
    }

    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|err| {
            Error::new("failed to open lock file")
                .with_path(path)
                .with_source(err)
        })
}
