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

//! Simplerotate copies a byte stream into a size-capped, rotating set of files.
//!
//! # Overview
//!
//! The active file (`output` by default) receives the input. Once it holds `max_file_size`
//! bytes, the next write rotates it: `output.{N-2}` is renamed to `output.{N-1}`, and so on down
//! to `output` becoming `output.1`, after which a fresh `output` is created. At most
//! `max_files` files exist at any time, the newest historical file being `output.1`. With
//! `max_files <= 1` rotation is disabled and the active file grows without bound.
//!
//! A restarted process appends to the existing active file and recovers its size from disk; if
//! that file is already full it is rotated before any new byte is accepted.
//!
//! Only one process at a time may write a given directory: [`InstanceLock`] takes an exclusive
//! advisory lock on a `lock` file there, blocking until any other instance exits.
//!
//! # Examples
//!
//! ```
//! use std::io::Cursor;
//! use std::num::NonZeroU64;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = simplerotate::Config::new(dir.path())
//!     .max_file_size(NonZeroU64::new(10).unwrap())
//!     .max_files(3);
//!
//! let stats = simplerotate::run(&config, Cursor::new(vec![b'a'; 20])).unwrap();
//! assert_eq!(stats.rotations, 1);
//! assert_eq!(std::fs::read(dir.path().join("output.1")).unwrap(), vec![b'a'; 10]);
//! ```

#![deny(missing_docs)]

pub use config::Config;
pub use copy::CopyLoop;
pub use copy::CopyStats;
pub use copy::run;
pub use error::Error;
pub use lock::InstanceLock;
pub use rotation::RotationPlan;
pub use rotation::RotationStep;
pub use sink::BoundedSink;
pub use sink::BoundedSinkBuilder;

pub mod config;
pub mod logger;
pub mod rotation;

mod copy;
mod error;
mod lock;
mod sink;
