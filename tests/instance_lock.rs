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
use std::io;
use std::io::Cursor;
use std::io::Read;
use std::num::NonZeroU64;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use simplerotate::Config;
use simplerotate::InstanceLock;
use tempfile::TempDir;

/// Input that yields whatever is sent on the channel and ends once the sender is dropped.
struct ChannelReader {
    rx: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl ChannelReader {
    fn new() -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel();
        let reader = ChannelReader {
            rx,
            pending: Vec::new(),
        };
        (tx, reader)
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.rx.recv() {
                Ok(data) => self.pending = data,
                Err(mpsc::RecvError) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

fn wait_for_content(path: &Path, expected: &[u8]) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while fs::read(path).ok().as_deref() != Some(expected) {
        assert!(Instant::now() < deadline, "timed out waiting for {path:?}");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_second_instance_waits_for_first() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let dir = temp_dir.path().to_path_buf();
    let config = Config::new(&dir)
        .max_file_size(NonZeroU64::new(1024).unwrap())
        .max_files(3);

    let (tx, reader) = ChannelReader::new();
    let first = {
        let config = config.clone();
        thread::spawn(move || simplerotate::run(&config, reader))
    };

    tx.send(b"first\n".to_vec()).unwrap();
    wait_for_content(&dir.join("output"), b"first\n");
    assert!(InstanceLock::try_acquire(dir.join("lock")).unwrap().is_none());

    let second = {
        let config = config.clone();
        thread::spawn(move || simplerotate::run(&config, Cursor::new(b"second\n".to_vec())))
    };

    thread::sleep(Duration::from_millis(300));
    assert!(!second.is_finished());
    assert_eq!(fs::read(dir.join("output")).unwrap(), b"first\n");

    tx.send(b"more\n".to_vec()).unwrap();
    drop(tx);

    let first = first.join().unwrap().unwrap();
    assert_eq!(first.bytes_copied, 11);
    let second = second.join().unwrap().unwrap();
    assert_eq!(second.bytes_copied, 7);

    assert_eq!(
        fs::read(dir.join("output")).unwrap(),
        b"first\nmore\nsecond\n"
    );
    assert!(InstanceLock::try_acquire(dir.join("lock")).unwrap().is_some());
}

#[test]
fn test_lock_is_scoped_to_directory() {
    let temp_dir = TempDir::new().expect("failed to create a temporary directory");
    let one = temp_dir.path().join("one");
    let two = temp_dir.path().join("two");

    let _held = InstanceLock::acquire(one.join("lock")).unwrap();
    let input = Cursor::new(b"independent".to_vec());
    let stats = simplerotate::run(&Config::new(&two), input).unwrap();

    assert_eq!(stats.bytes_copied, 11);
    assert_eq!(fs::read(two.join("output")).unwrap(), b"independent");
    assert!(!one.join("output").exists());
}
