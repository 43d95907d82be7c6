// Licensed under the Apache-2.0 license

//! Hardware backend boundary
//!
//! [`Accelerator`] is the narrow session interface the dispatcher drives.
//! [`ShaController`] implements it for any register-level [`ShaPeripheral`],
//! and [`NoAccelerator`] stands in on targets without a hash engine.

pub mod config;
pub mod controller;
pub mod traits;

pub use config::{AcceleratorConfig, AcceleratorConfigBuilder};
pub use controller::{ShaController, ShaSession};
pub use traits::ShaPeripheral;

use crate::common::{Variant, DIGEST_SIZE};
use crate::soft::Midstate;

/// Errors reported by an accelerator
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HwError {
    /// The engine is owned by another session
    Busy,
    /// No engine is present
    Unavailable,
    /// The engine did not complete within the configured timeout
    Timeout,
    /// The engine reported an error, or the session was already faulted
    Fault,
}

impl core::fmt::Display for HwError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            HwError::Busy => "accelerator busy",
            HwError::Unavailable => "accelerator unavailable",
            HwError::Timeout => "accelerator timed out",
            HwError::Fault => "accelerator fault",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for HwError {}

/// One hashing session on a hardware engine.
///
/// Sessions are capabilities: holding one means holding the engine. Dropping
/// a session must release the engine, so `close` is only a named drop.
pub trait Accelerator {
    type Session<'s>
    where
        Self: 's;

    /// Starts a session for `variant`.
    ///
    /// # Errors
    /// `HwError::Busy` if the engine is in use, `HwError::Unavailable` if
    /// there is none.
    fn open_session(&self, variant: Variant) -> Result<Self::Session<'_>, HwError>;

    /// Feeds message bytes.
    ///
    /// # Errors
    /// Any engine failure. The session is unusable afterwards.
    fn feed(&self, session: &mut Self::Session<'_>, data: &[u8]) -> Result<(), HwError>;

    /// Finalizes the message and writes the digest.
    ///
    /// `out` is left untouched on failure. For SHA-224 the trailing four bytes
    /// are zero.
    ///
    /// # Errors
    /// Any engine failure.
    fn read_digest(
        &self,
        session: &mut Self::Session<'_>,
        out: &mut [u8; DIGEST_SIZE],
    ) -> Result<(), HwError>;

    /// Ends the session and returns the engine.
    fn close(&self, session: Self::Session<'_>);

    /// Opens a second session continuing from the same state.
    ///
    /// # Errors
    /// `HwError::Busy` when the engine cannot hold another session, which is
    /// the default for single-session engines.
    fn fork<'s>(&'s self, _session: &Self::Session<'s>) -> Result<Self::Session<'s>, HwError> {
        Err(HwError::Busy)
    }

    /// Snapshots the session so it can be continued in software.
    fn export(&self, session: &Self::Session<'_>) -> Midstate;
}

/// Session type of [`NoAccelerator`]; it has no values.
#[derive(Debug)]
pub enum NoSession {}

/// Accelerator for targets without a hash engine. Every `open_session` fails
/// with `HwError::Unavailable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAccelerator;

impl Accelerator for NoAccelerator {
    type Session<'s> = NoSession;

    fn open_session(&self, _variant: Variant) -> Result<NoSession, HwError> {
        Err(HwError::Unavailable)
    }

    fn feed(&self, session: &mut NoSession, _data: &[u8]) -> Result<(), HwError> {
        match *session {}
    }

    fn read_digest(
        &self,
        session: &mut NoSession,
        _out: &mut [u8; DIGEST_SIZE],
    ) -> Result<(), HwError> {
        match *session {}
    }

    fn close(&self, session: NoSession) {
        match session {}
    }

    fn export(&self, session: &NoSession) -> Midstate {
        match *session {}
    }
}
