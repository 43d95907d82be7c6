// Licensed under the Apache-2.0 license

use crate::accel::HwError;

/// Errors returned by [`Sha256Context`](crate::context::Sha256Context)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Sha256Error {
    /// `starts` could not initialize any backend allowed by the policy
    BackendUnavailable,
    /// The accelerator failed during `update` or `finish`; the session is over
    HardwareFault(HwError),
    /// `update`/`finish`/`process_block` called without an active session
    InvalidSequence,
    /// A midstate whose pending bytes are a whole block or disagree with its length
    InvalidMidstate,
}

impl From<HwError> for Sha256Error {
    fn from(err: HwError) -> Self {
        Sha256Error::HardwareFault(err)
    }
}

impl core::fmt::Display for Sha256Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Sha256Error::BackendUnavailable => f.write_str("no hash backend available"),
            Sha256Error::HardwareFault(err) => write!(f, "hardware fault: {err}"),
            Sha256Error::InvalidSequence => f.write_str("operation requires an active session"),
            Sha256Error::InvalidMidstate => f.write_str("inconsistent midstate"),
        }
    }
}

impl core::error::Error for Sha256Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Sha256Error::HardwareFault(err) => Some(err),
            _ => None,
        }
    }
}
