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

//! Compiled-in defaults and the [`Config`] of a copy pipeline.

use std::num::NonZeroU64;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::Error;
use crate::rotation::indexed_filename;
use crate::sink::BoundedSinkBuilder;

/// Name of the active output file.
pub const OUTPUT_FILE_NAME: &str = "output";

/// Name of the instance lock file.
pub const LOCK_FILE_NAME: &str = "lock";

/// Size at which the active output file is rotated.
pub const MAX_FILE_SIZE_BYTES: NonZeroU64 = NonZeroU64::new(1024 * 1024).unwrap();

/// Number of output files kept on disk, the active one included.
pub const MAX_OUTPUT_FILES: usize = 10;

/// Size of the buffer used to read from the input.
pub const DEFAULT_BUFFER_SIZE: NonZeroUsize = NonZeroUsize::new(64 * 1024).unwrap();

/// Settings of a copy pipeline.
///
/// The defaults are the compiled-in constants of this crate; the command line binary never
/// changes them.
#[derive(Debug, Clone)]
pub struct Config {
    basedir: PathBuf,
    filename: String,
    lock_filename: String,
    max_file_size: NonZeroU64,
    max_files: usize,
    buffer_size: NonZeroUsize,
}

impl Config {
    /// Creates a new [`Config`] targeting `basedir` with the default settings.
    #[must_use]
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
            filename: OUTPUT_FILE_NAME.to_string(),
            lock_filename: LOCK_FILE_NAME.to_string(),
            max_file_size: MAX_FILE_SIZE_BYTES,
            max_files: MAX_OUTPUT_FILES,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set the name of the active output file.
    #[must_use]
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Set the name of the lock file.
    #[must_use]
    pub fn lock_filename(mut self, filename: impl Into<String>) -> Self {
        self.lock_filename = filename.into();
        self
    }

    /// Set the size in bytes at which the active file is rotated.
    #[must_use]
    pub fn max_file_size(mut self, n: NonZeroU64) -> Self {
        self.max_file_size = n;
        self
    }

    /// Set the number of output files to keep, the active one included.
    ///
    /// A value of 0 or 1 disables rotation: the active file then grows without bound.
    #[must_use]
    pub fn max_files(mut self, n: usize) -> Self {
        self.max_files = n;
        self
    }

    /// Set the size of the input read buffer.
    #[must_use]
    pub fn buffer_size(mut self, n: NonZeroUsize) -> Self {
        self.buffer_size = n;
        self
    }

    /// Path of the active output file.
    pub fn output_path(&self) -> PathBuf {
        self.basedir.join(&self.filename)
    }

    /// Path of the instance lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.basedir.join(&self.lock_filename)
    }

    /// Size of the input read buffer.
    pub fn read_buffer_size(&self) -> NonZeroUsize {
        self.buffer_size
    }

    /// Checks that the file names can be used inside the target directory.
    ///
    /// The lock file must not be any file a rotation writes to, or a rotation would rename it
    /// away from under the held lock.
    pub fn validate(&self) -> Result<(), Error> {
        validate_filename("filename", &self.filename)?;
        validate_filename("lock_filename", &self.lock_filename)?;
        if self.filename == self.lock_filename {
            return Err(Error::new("lock file must differ from the output file")
                .with_context("filename", &self.filename));
        }
        let slots = self.max_files.max(1);
        if let Some(slot) =
            (1..slots).find(|&i| indexed_filename(&self.filename, i) == self.lock_filename)
        {
            return Err(Error::new("lock file must not be a rotation slot")
                .with_context("lock_filename", &self.lock_filename)
                .with_context("slot", slot));
        }
        Ok(())
    }

    /// Returns a [`BoundedSinkBuilder`] carrying the sink part of this config.
    pub fn sink_builder(&self) -> BoundedSinkBuilder {
        BoundedSinkBuilder::new(&self.basedir, &self.filename)
            .max_file_size(self.max_file_size)
            .max_files(self.max_files)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(".")
    }
}

fn validate_filename(key: &'static str, filename: &str) -> Result<(), Error> {
    if filename.is_empty() {
        return Err(Error::new(format!("{key} must not be empty")));
    }
    if filename.contains(std::path::is_separator) || filename == "." || filename == ".." {
        return Err(Error::new(format!("{key} must be a plain file name"))
            .with_context(key, filename));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.output_path(), Path::new(".").join("output"));
        assert_eq!(config.lock_path(), Path::new(".").join("lock"));
        assert_eq!(config.max_file_size.get(), 1024 * 1024);
        assert_eq!(config.max_files, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let err = Config::new("logs").filename("").validate().unwrap_err();
        assert_eq!(err.message(), "filename must not be empty");

        let err = Config::new("logs").filename("a/b").validate().unwrap_err();
        assert_eq!(err.message(), "filename must be a plain file name");

        let err = Config::new("logs").lock_filename("..").validate().unwrap_err();
        assert_eq!(err.message(), "lock_filename must be a plain file name");

        let err = Config::new("logs").filename("lock").validate().unwrap_err();
        assert_eq!(err.message(), "lock file must differ from the output file");
    }

    #[test]
    fn test_validate_rejects_lock_on_rotation_slot() {
        let config = Config::new("logs").lock_filename("output.1").max_files(3);
        let err = config.validate().unwrap_err();
        assert_eq!(err.message(), "lock file must not be a rotation slot");
        assert_eq!(err.context("slot"), Some("1"));

        let err = Config::new("logs")
            .lock_filename("output.9")
            .validate()
            .unwrap_err();
        assert_eq!(err.context("slot"), Some("9"));

        // slots past the last kept file are never written
        assert!(Config::new("logs").lock_filename("output.3").max_files(3).validate().is_ok());
        assert!(Config::new("logs").lock_filename("output.10").validate().is_ok());
        // a disabled rotation never renames anything
        assert!(Config::new("logs").lock_filename("output.1").max_files(1).validate().is_ok());
        assert!(Config::new("logs").lock_filename("output.1").max_files(0).validate().is_ok());
    }

    #[test]
    fn test_read_buffer_size() {
        let config = Config::default();
        assert_eq!(config.read_buffer_size(), DEFAULT_BUFFER_SIZE);

        let config = config.buffer_size(NonZeroUsize::new(7).unwrap());
        assert_eq!(config.read_buffer_size().get(), 7);
    }
}
