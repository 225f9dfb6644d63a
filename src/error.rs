use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can be meaningfully propagated to a caller.
///
/// Most of the native runtime deliberately does *not* propagate errors (see
/// the error handling design in the crate's top-level docs): a failure to
/// attribute an allocation is silent, and a failure to construct the sample
/// channel aborts the process. This type exists for the fallible inner
/// constructors that sit one layer below those abort points, so the abort
/// policy itself stays testable.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to initialize sample channel from template {template:?}: {source}")]
    ChannelInit {
        template: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("one-shot init handshake for {path:?} produced an unrecognized magic")]
    BadInitMagic { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
