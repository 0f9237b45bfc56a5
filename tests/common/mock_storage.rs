//! Storage doubles layered over the real filesystem
//!
//! - `GatedStorage` parks the worker inside the Nth pass flush so tests can
//!   cancel or tamper at an exact pass boundary
//! - `FaultyStorage` makes writes to one file name make no progress

use ash_wipe::io::{EntryMetadata, LocalStorage, StorageAccess, WritableHandle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};

#[derive(Default)]
struct GateState {
    syncs: usize,
    paused: bool,
    released: bool,
}

pub struct Gate {
    pause_at: usize,
    state: Mutex<GateState>,
    cv: Condvar,
}

impl Gate {
    pub fn new(pause_at: usize) -> Arc<Self> {
        Arc::new(Self {
            pause_at,
            state: Mutex::new(GateState::default()),
            cv: Condvar::new(),
        })
    }

    fn arrive(&self) {
        let mut state = self.state.lock().unwrap();
        state.syncs += 1;
        if state.syncs != self.pause_at {
            return;
        }
        state.paused = true;
        self.cv.notify_all();
        while !state.released {
            state = self.cv.wait(state).unwrap();
        }
    }

    /// Block until the worker is parked
    pub fn wait_paused(&self) {
        let mut state = self.state.lock().unwrap();
        while !state.paused {
            state = self.cv.wait(state).unwrap();
        }
    }

    pub fn release(&self) {
        self.state.lock().unwrap().released = true;
        self.cv.notify_all();
    }
}

struct GatedHandle {
    inner: Box<dyn WritableHandle>,
    gate: Arc<Gate>,
}

impl WritableHandle for GatedHandle {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.inner.write_at(buf, offset)
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.inner.read_at(buf, offset)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.inner.sync()?;
        self.gate.arrive();
        Ok(())
    }
}

pub struct GatedStorage {
    inner: LocalStorage,
    gate: Arc<Gate>,
}

impl GatedStorage {
    pub fn new(gate: Arc<Gate>) -> Self {
        Self {
            inner: LocalStorage::new(),
            gate,
        }
    }
}

impl StorageAccess for GatedStorage {
    fn metadata(&self, path: &Path) -> io::Result<EntryMetadata> {
        self.inner.metadata(path)
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        self.inner.list(dir)
    }

    fn length(&self, path: &Path) -> io::Result<u64> {
        self.inner.length(path)
    }

    fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn WritableHandle>> {
        Ok(Box::new(GatedHandle {
            inner: self.inner.open_for_write(path)?,
            gate: Arc::clone(&self.gate),
        }))
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        self.inner.delete(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.inner.remove_dir(path)
    }
}

/// Accepts the write call but stores nothing
struct StalledHandle;

impl WritableHandle for StalledHandle {
    fn write_at(&mut self, _buf: &[u8], _offset: u64) -> io::Result<usize> {
        Ok(0)
    }

    fn read_at(&mut self, _buf: &mut [u8], _offset: u64) -> io::Result<usize> {
        Ok(0)
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct FaultyStorage {
    inner: LocalStorage,
    faulty_name: String,
}

impl FaultyStorage {
    pub fn new(faulty_name: &str) -> Self {
        Self {
            inner: LocalStorage::new(),
            faulty_name: faulty_name.to_string(),
        }
    }

    fn is_faulty(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| n.to_string_lossy() == self.faulty_name)
            .unwrap_or(false)
    }
}

impl StorageAccess for FaultyStorage {
    fn metadata(&self, path: &Path) -> io::Result<EntryMetadata> {
        self.inner.metadata(path)
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        self.inner.list(dir)
    }

    fn length(&self, path: &Path) -> io::Result<u64> {
        self.inner.length(path)
    }

    fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn WritableHandle>> {
        if self.is_faulty(path) {
            return Ok(Box::new(StalledHandle));
        }
        self.inner.open_for_write(path)
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        self.inner.delete(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        self.inner.remove_dir(path)
    }

    fn supports_positional_overwrite(&self) -> bool {
        false
    }
}
