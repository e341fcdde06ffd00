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

//! File naming and the rename sequence of a rotation.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::Error;

/// Returns the file name of slot `index`: the active file for 0, `{filename}.{index}` otherwise.
pub fn indexed_filename(filename: &str, index: usize) -> String {
    match index {
        0 => filename.to_string(),
        _ => format!("{filename}.{index}"),
    }
}

/// A single rename of a rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationStep {
    from: PathBuf,
    to: PathBuf,
}

impl RotationStep {
    /// The file being moved.
    pub fn from(&self) -> &Path {
        &self.from
    }

    /// Where the file lands; an existing file there is replaced.
    pub fn to(&self) -> &Path {
        &self.to
    }

    /// Renames `from` onto `to`, replacing `to` if it exists.
    ///
    /// Returns `Ok(false)` when `from` does not exist yet.
    fn apply(&self) -> Result<bool, Error> {
        log::debug!(
            "rotate from {} to {}",
            self.from.display(),
            self.to.display()
        );

        match fs::rename(&self.from, &self.to) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("skip missing rotation source {}", self.from.display());
                Ok(false)
            }
            Err(err) => Err(Error::new("failed to rotate file")
                .with_context("from", self.from.display())
                .with_context("to", self.to.display())
                .with_source(err)),
        }
    }
}

/// The ordered renames that shift every historical file one slot older.
///
/// For `max_files = N` the plan moves `{filename}.{N-2}` onto `{filename}.{N-1}` first and
/// `{filename}` onto `{filename}.1` last, so no file is overwritten before it has been moved
/// itself. The oldest slot is dropped by being renamed over.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
///
/// use simplerotate::RotationPlan;
///
/// let plan = RotationPlan::new("logs", "output", 3);
/// let steps = plan
///     .steps()
///     .iter()
///     .map(|step| (step.from().to_path_buf(), step.to().to_path_buf()))
///     .collect::<Vec<_>>();
///
/// assert_eq!(
///     steps,
///     vec![
///         (PathBuf::from("logs/output.1"), PathBuf::from("logs/output.2")),
///         (PathBuf::from("logs/output"), PathBuf::from("logs/output.1")),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationPlan {
    steps: Vec<RotationStep>,
}

impl RotationPlan {
    /// Builds the plan for `filename` inside `basedir`.
    ///
    /// With `max_files <= 1` the plan is empty and rotation is disabled.
    pub fn new(basedir: impl AsRef<Path>, filename: &str, max_files: usize) -> Self {
        if max_files <= 1 {
            return Self::default();
        }

        let basedir = basedir.as_ref();
        let steps = (1..max_files)
            .rev()
            .map(|i| RotationStep {
                from: basedir.join(indexed_filename(filename, i - 1)),
                to: basedir.join(indexed_filename(filename, i)),
            })
            .collect();

        Self { steps }
    }

    /// The renames in execution order, oldest slot first.
    pub fn steps(&self) -> &[RotationStep] {
        &self.steps
    }

    /// Whether rotation is disabled.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Performs every rename in order and returns how many files were actually moved.
    ///
    /// Missing sources are skipped; any other failure aborts the rotation.
    pub fn execute(&self) -> Result<usize, Error> {
        let mut moved = 0;
        for step in &self.steps {
            if step.apply()? {
                moved += 1;
            }
        }
        Ok(moved)
    }
}
