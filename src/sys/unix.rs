use std::ffi::CString;
use std::fs::File;
use std::io::{Error, Result};
use std::os::fd::{AsRawFd, FromRawFd};
use std::path::Path;
use std::ptr::null_mut;

/// Opens (creating if needed) a file for read/write with user-only permissions.
pub fn open_rw_create(path: &Path) -> Result<File> {
    let c_path = path_to_cstring(path)?;
    let fd = unsafe {
        libc::open(
            c_path.as_ptr(),
            libc::O_RDWR | libc::O_CREAT,
            libc::S_IRUSR | libc::S_IWUSR,
        )
    };
    if fd != -1 {
        Ok(unsafe { File::from_raw_fd(fd) })
    } else {
        Err(Error::last_os_error())
    }
}

pub fn ftruncate(file: &File, len: u64) -> Result<()> {
    let result = unsafe { libc::ftruncate(file.as_raw_fd(), len as libc::off_t) };
    if result == 0 {
        Ok(())
    } else {
        Err(Error::last_os_error())
    }
}

/// Maps `len` bytes of `file` starting at `offset`, shared between processes.
///
/// # Safety
/// The caller is responsible for eventually calling [`munmap`] on the
/// returned pointer with the same `len`, and for not outliving `file`'s
/// backing storage in a way that would make the mapping dangle.
pub unsafe fn mmap_shared(file: &File, len: usize, offset: i64) -> Result<*mut u8> {
    let ptr = libc::mmap(
        null_mut(),
        len,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_SHARED,
        file.as_raw_fd(),
        offset,
    );
    if ptr != libc::MAP_FAILED {
        Ok(ptr as *mut u8)
    } else {
        Err(Error::last_os_error())
    }
}

/// # Safety
/// `ptr`/`len` must be exactly the pair returned by a prior [`mmap_shared`] call
/// that has not yet been unmapped.
pub unsafe fn munmap(ptr: *mut u8, len: usize) -> Result<()> {
    let result = libc::munmap(ptr as *mut _, len);
    if result == 0 {
        Ok(())
    } else {
        Err(Error::last_os_error())
    }
}

/// Acquires an exclusive advisory lock on `file`, blocking until available.
pub fn flock_exclusive(file: &File) -> Result<()> {
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if result == 0 {
        Ok(())
    } else {
        Err(Error::last_os_error())
    }
}

pub fn flock_unlock(file: &File) -> Result<()> {
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if result == 0 {
        Ok(())
    } else {
        Err(Error::last_os_error())
    }
}

pub fn getpid() -> i32 {
    unsafe { libc::getpid() }
}

/// Sends `signal` to the calling process, as the host-side drain trigger.
pub fn raise(signal: i32) {
    unsafe {
        libc::raise(signal);
    }
}

/// Installs `SIG_IGN` for `signal` unless a non-default handler is already
/// present, restoring the handler it finds. We don't want to clobber a
/// handler the host process installed before loading us, but we don't want
/// delivery of these signals to kill the process if nobody is listening yet
/// either.
pub fn ignore_signal_if_default(signal: i32) {
    unsafe {
        let old = libc::signal(signal, libc::SIG_IGN);
        if old != libc::SIG_DFL && old != libc::SIG_ERR {
            libc::signal(signal, old);
        }
    }
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes())
        .map_err(|e| Error::new(std::io::ErrorKind::InvalidInput, e))
}
