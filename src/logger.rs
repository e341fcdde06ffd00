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


//! Diagnostic logging to standard error.
//!
//! Records go through [`logforth`] to standard error. The `LOG_LEVEL` environment variable
//! selects the most verbose level shown (e.g. `LOG_LEVEL=debug`); when it is unset or not a level
//! name, only warnings and errors are shown.

use logforth::record::Level;
use logforth::record::LevelFilter;

use crate::Error;

/// Environment variable holding the level name.
pub const DEFAULT_FILTER_ENV: &str = "LOG_LEVEL";

/// Level used when [`DEFAULT_FILTER_ENV`] is unset or malformed.
pub const DEFAULT_LEVEL: Level = Level::Warn;

/// Maps the value of [`DEFAULT_FILTER_ENV`] to a filter. Level names are case insensitive.
pub fn level_filter(value: Option<&str>) -> LevelFilter {
    let level = value
        .and_then(|value| value.trim().parse::<Level>().ok())
        .unwrap_or(DEFAULT_LEVEL);
    level.to_level_filter()
}

/// Installs the global stderr logger, filtered by [`DEFAULT_FILTER_ENV`].
pub fn setup() -> Result<(), Error> {
    let value = std::env::var(DEFAULT_FILTER_ENV).ok();
    logforth::starter_log::stderr()
        .with_filter(level_filter(value.as_deref()))
        .try_apply()
        .map_err(|err| Error::new("failed to set global logger").with_source(err))
}
