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
use std::io;
use std::io::Write;
use std::num::NonZeroU64;
use std::path::Path;
use std::path::PathBuf;

use crate::Error;
use crate::config::MAX_FILE_SIZE_BYTES;
use crate::config::MAX_OUTPUT_FILES;
use crate::rotation::RotationPlan;

/// A size-capped writer over the active output file.
///
/// A write never grows the active file past `max_size`: it consumes at most the bytes that still
/// fit. Once the file is full, the next write first rotates it, closing the active file,
/// executing the [`RotationPlan`] and reopening the active file truncated.
///
/// When the plan is empty (`max_files <= 1`) the size cap is ignored and the active file grows
/// without bound.
#[derive(Debug)]
pub struct BoundedSink {
    state: State,
    writer: Option<File>,
}

impl BoundedSink {
    /// Creates a new [`BoundedSinkBuilder`].
    #[must_use]
    pub fn builder(
        basedir: impl Into<PathBuf>,
        filename: impl Into<String>,
    ) -> BoundedSinkBuilder {
        BoundedSinkBuilder::new(basedir, filename)
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        &self.state.filepath
    }

    /// Bytes in the active file.
    pub fn current_size(&self) -> u64 {
        self.state.current_size
    }

    /// Number of rotations performed by this sink.
    pub fn rotations(&self) -> u64 {
        self.state.rotations
    }

    /// Bytes that still fit in the active file, clamped at zero.
    pub fn remaining(&self) -> u64 {
        if self.state.plan.is_empty() {
            return u64::MAX;
        }
        self.state.max_size.saturating_sub(self.state.current_size)
    }

    /// Bytes the next call to [`BoundedSink::write_bounded`] accepts.
    ///
    /// This is [`BoundedSink::remaining`], except for a full active file, where the next write
    /// rotates first and may then fill a whole fresh file.
    pub fn available(&self) -> u64 {
        if self.state.should_rollover() {
            self.state.max_size
        } else {
            self.remaining()
        }
    }

    /// Writes as much of `buf` as fits in the active file, rotating first if it is full.
    ///
    /// Returns the number of bytes consumed from `buf`.
    pub fn write_bounded(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.state.should_rollover() {
            self.rotate()?;
        }

        let n = self.remaining().min(buf.len() as u64) as usize;
        let writer = self.writer.as_mut().ok_or_else(|| {
            Error::new("active file is closed").with_path(&self.state.filepath)
        })?;
        writer.write_all(&buf[..n]).map_err(|err| {
            Error::new("failed to write active file")
                .with_path(&self.state.filepath)
                .with_source(err)
        })?;
        self.state.current_size += n as u64;
        Ok(n)
    }

    /// Closes the active file, executes the rotation plan and opens a fresh active file.
    pub fn rotate(&mut self) -> Result<(), Error> {
        if let Some(writer) = self.writer.take() {
            self.state.close_writer(writer)?;
        }

        log::info!(
            "rotating {} at {} bytes",
            self.state.filepath.display(),
            self.state.current_size
        );
        let moved = self.state.plan.execute()?;
        log::debug!("rotation moved {moved} files");

        let writer = self.state.open_writer(OpenMode::Truncate)?;
        self.state.current_size = 0;
        self.state.rotations += 1;
        self.writer = Some(writer);
        Ok(())
    }

    /// Closes the active file. No rotation happens, whatever the current size.
    pub fn close(mut self) -> Result<(), Error> {
        match self.writer.take() {
            Some(writer) => self.state.close_writer(writer),
            None => Ok(()),
        }
    }
}

impl Drop for BoundedSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(err) = self.state.close_writer(writer) {
                log::warn!("{err}");
            }
        }
    }
}

impl Write for BoundedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bounded(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

/// A builder for configuring [`BoundedSink`].
#[derive(Debug)]
pub struct BoundedSinkBuilder {
    // required
    basedir: PathBuf,
    filename: String,

    // has default
    max_size: NonZeroU64,
    max_files: usize,
}

impl BoundedSinkBuilder {
    /// Creates a new [`BoundedSinkBuilder`] with the compiled-in size and file count.
    #[must_use]
    pub fn new(basedir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            basedir: basedir.into(),
            filename: filename.into(),
            max_size: MAX_FILE_SIZE_BYTES,
            max_files: MAX_OUTPUT_FILES,
        }
    }

    /// Set the size in bytes at which the active file is rotated.
    #[must_use]
    pub fn max_file_size(mut self, n: NonZeroU64) -> Self {
        self.max_size = n;
        self
    }

    /// Set the number of files to keep, the active one included.
    #[must_use]
    pub fn max_files(mut self, n: usize) -> Self {
        self.max_files = n;
        self
    }

    /// Opens the active file for append and recovers its size.
    ///
    /// If the recovered size already reaches the cap, the file is rotated before this returns.
    pub fn build(self) -> Result<BoundedSink, Error> {
        let Self {
            basedir,
            filename,
            max_size,
            max_files,
        } = self;

        if filename.is_empty() {
            return Err(Error::new("filename must not be empty"));
        }

        fs::create_dir_all(&basedir).map_err(|err| {
            Error::new("failed to create output directory")
                .with_path(&basedir)
                .with_source(err)
        })?;

        let plan = RotationPlan::new(&basedir, &filename, max_files);
        log::debug!("rotation plan = {plan:?}");

        let mut state = State {
            filepath: basedir.join(&filename),
            max_size: max_size.get(),
            plan,
            current_size: 0,
            rotations: 0,
        };

        let writer = state.open_writer(OpenMode::Append)?;
        state.current_size = writer
            .metadata()
            .map_err(|err| {
                Error::new("failed to stat active file")
                    .with_path(&state.filepath)
                    .with_source(err)
            })?
            .len();
        log::debug!(
            "recovered {} bytes from {}",
            state.current_size,
            state.filepath.display()
        );

        let mut sink = BoundedSink {
            state,
            writer: Some(writer),
        };
        if sink.state.should_rollover() {
            sink.rotate()?;
        }
        Ok(sink)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenMode {
    Append,
    Truncate,
}

#[derive(Debug)]
struct State {
    filepath: PathBuf,
    max_size: u64,
    plan: RotationPlan,
    current_size: u64,
    rotations: u64,
}

impl State {
    fn should_rollover(&self) -> bool {
        !self.plan.is_empty() && self.current_size >= self.max_size
    }

    fn open_writer(&self, mode: OpenMode) -> Result<File, Error> {
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            OpenMode::Append => options.append(true),
            OpenMode::Truncate => options.write(true).truncate(true),
        };

        options.open(&self.filepath).map_err(|err| {
            Error::new("failed to open active file")
                .with_path(&self.filepath)
                .with_context("mode", format!("{mode:?}"))
                .with_source(err)
        })
    }

    /// Flushes `writer` and waits for its data to reach the disk before dropping it.
    fn close_writer(&self, mut writer: File) -> Result<(), Error> {
        writer
            .flush()
            .and_then(|()| writer.sync_data())
            .map_err(|err| {
                Error::new("failed to close active file")
                    .with_path(&self.filepath)
                    .with_source(err)
            })
    }
}
