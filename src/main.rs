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

//! Reads `stdin` and writes it into `output`, rotating it to `output.1` … `output.9` every MiB.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use simplerotate::Config;
use simplerotate::Error;
use simplerotate::logger;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory holding the output and lock files; defaults to the current directory
    dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("simplerotate: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Error> {
    logger::setup()?;

    if let Some(dir) = &args.dir {
        std::env::set_current_dir(dir).map_err(|err| {
            Error::new("failed to change directory")
                .with_path(dir)
                .with_source(err)
        })?;
    }

    let config = Config::default();
    log::debug!("begin with {config:?}");

    simplerotate::run(&config, io::stdin().lock())?;
    log::debug!("end");
    Ok(())
}
