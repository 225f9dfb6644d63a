//! Thin platform-abstraction seam.
//!
//! Everything that ultimately needs a raw syscall goes through here, mirroring
//! how the rest of this codebase keeps `unsafe` at the FFI boundary and gives
//! callers a safe, `io::Result`-returning surface on top of it.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::*;

#[cfg(not(unix))]
mod stub;
#[cfg(not(unix))]
pub use stub::*;
