// Storage access layer: the seam between the wipe engine and the platform

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom};
use std::os::unix::fs::{FileExt, FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

/// Kind of a directory entry, as seen without following symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    BlockDevice,
    /// FIFOs, sockets, character devices
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    pub kind: EntryKind,
    /// Size reported by the filesystem; zero for block devices, use [`StorageAccess::length`]
    pub len: u64,
}

/// An open target that supports positioned I/O
#[cfg_attr(test, mockall::automock)]
pub trait WritableHandle: Send {
    /// Write data at `offset`; may write fewer bytes than requested
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;

    /// Read data at `offset`; returns 0 at end of target
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Commit everything written so far to stable storage
    fn sync(&mut self) -> io::Result<()>;
}

/// Platform operations the engine needs
pub trait StorageAccess: Send + Sync {
    /// Metadata of `path` itself (never follows a final symlink)
    fn metadata(&self, path: &Path) -> io::Result<EntryMetadata>;

    /// Entries of a directory, in no particular order
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Current byte length of a file or block device
    fn length(&self, path: &Path) -> io::Result<u64>;

    /// Open an existing target read/write without truncating or following symlinks
    fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn WritableHandle>>;

    fn delete(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory
    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    /// Whether writes land on the same physical extent as the original data
    fn supports_positional_overwrite(&self) -> bool {
        true
    }
}

/// Local filesystem and block device access
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }
}

struct LocalHandle {
    file: File,
}

impl WritableHandle for LocalHandle {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        // pwrite: no shared cursor
        self.file.write_at(buf, offset)
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.file.read_at(buf, offset)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}

fn entry_kind(file_type: fs::FileType) -> EntryKind {
    if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else if file_type.is_block_device() {
        EntryKind::BlockDevice
    } else {
        EntryKind::Other
    }
}

impl StorageAccess for LocalStorage {
    fn metadata(&self, path: &Path) -> io::Result<EntryMetadata> {
        let meta = fs::symlink_metadata(path)?;
        Ok(EntryMetadata {
            kind: entry_kind(meta.file_type()),
            len: meta.len(),
        })
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    fn length(&self, path: &Path) -> io::Result<u64> {
        let meta = fs::symlink_metadata(path)?;
        if meta.file_type().is_block_device() {
            // Block devices report st_size 0; the real size is where the end is
            let mut file = File::open(path)?;
            file.seek(SeekFrom::End(0))
        } else {
            Ok(meta.len())
        }
    }

    fn open_for_write(&self, path: &Path) -> io::Result<Box<dyn WritableHandle>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOFOLLOW)
            .open(path)?;
        Ok(Box::new(LocalHandle { file }))
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }
}
