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

use std::io;
use std::io::Read;
use std::num::NonZeroUsize;

use crate::BoundedSink;
use crate::Config;
use crate::Error;
use crate::InstanceLock;

/// What a [`CopyLoop`] did before reaching the end of its input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyStats {
    /// Bytes read from the input and written to the sink.
    pub bytes_copied: u64,
    /// Rotations performed while copying.
    pub rotations: u64,
}

/// Pumps an input into a [`BoundedSink`] until end of input.
#[derive(Debug)]
pub struct CopyLoop<R> {
    input: R,
    buffer: Box<[u8]>,
}

impl<R: Read> CopyLoop<R> {
    /// Creates a loop reading `input` at most `buffer_size` bytes at a time.
    pub fn with_buffer_size(input: R, buffer_size: NonZeroUsize) -> Self {
        Self {
            input,
            buffer: vec![0; buffer_size.get()].into_boxed_slice(),
        }
    }

    /// Copies until the input reports end of file.
    ///
    /// Each read asks for no more than the sink accepts in one write, so a chunk is never split
    /// across a rotation.
    pub fn run(&mut self, sink: &mut BoundedSink) -> Result<CopyStats, Error> {
        let rotations_before = sink.rotations();
        let mut stats = CopyStats::default();

        loop {
            let limit = sink.available().min(self.buffer.len() as u64) as usize;
            debug_assert!(limit > 0, "sink must accept at least one byte");

            let n = match self.input.read(&mut self.buffer[..limit]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::new("failed to read input").with_source(err)),
            };

            let mut pending = &self.buffer[..n];
            while !pending.is_empty() {
                let written = sink.write_bounded(pending)?;
                pending = &pending[written..];
            }
            stats.bytes_copied += n as u64;
        }

        stats.rotations = sink.rotations() - rotations_before;
        Ok(stats)
    }
}

/// Runs the whole pipeline in the directory of `config`: takes the instance lock, opens the sink,
/// copies `input` until end of input and closes everything.
///
/// The lock is released on every return path.
pub fn run<R: Read>(config: &Config, input: R) -> Result<CopyStats, Error> {
    config.validate()?;

    let lock = InstanceLock::acquire(config.lock_path())?;
    let mut sink = config.sink_builder().build()?;
    log::debug!(
        "writing {} starting at {} bytes",
        sink.path().display(),
        sink.current_size()
    );

    let stats = CopyLoop::with_buffer_size(input, config.read_buffer_size()).run(&mut sink)?;
    log::info!(
        "end of input after {} bytes and {} rotations",
        stats.bytes_copied,
        stats.rotations
    );

    sink.close()?;
    lock.release()?;
    Ok(stats)
}
