//! Non-Unix stand-in. Only the pieces of the public API that are plausibly
//! portable (the sampler, the record format, the path filter) build on this
//! target; anything that needs the shared-memory channel or process signals
//! returns `Unsupported`.

use std::fs::File;
use std::io::{Error, ErrorKind, Result};
use std::path::Path;

fn unsupported<T>() -> Result<T> {
    Err(Error::from(ErrorKind::Unsupported))
}

pub fn open_rw_create(_path: &Path) -> Result<File> {
    unsupported()
}

pub fn ftruncate(_file: &File, _len: u64) -> Result<()> {
    unsupported()
}

pub unsafe fn mmap_shared(_file: &File, _len: usize, _offset: i64) -> Result<*mut u8> {
    unsupported()
}

pub unsafe fn munmap(_ptr: *mut u8, _len: usize) -> Result<()> {
    unsupported()
}

pub fn flock_exclusive(_file: &File) -> Result<()> {
    unsupported()
}

pub fn flock_unlock(_file: &File) -> Result<()> {
    unsupported()
}

pub fn getpid() -> i32 {
    std::process::id() as i32
}

pub fn raise(_signal: i32) {}

pub fn ignore_signal_if_default(_signal: i32) {}
