// Licensed under the Apache-2.0 license

use super::HwError;
use crate::common::{BLOCK_SIZE, STATE_WORDS};

/// Register-level view of a SHA-256 engine that compresses one block at a
/// time from a loaded digest state.
///
/// Board support implements this over its peripheral access crate; padding,
/// buffering, timeouts and ownership are handled by
/// [`ShaController`](super::ShaController).
pub trait ShaPeripheral {
    /// Powers and clocks the engine. Called when a session opens.
    fn enable(&mut self);

    /// Gates the engine again. Called when a session is released.
    fn disable(&mut self);

    /// Loads the digest registers.
    fn load_state(&mut self, state: &[u32; STATE_WORDS]);

    /// Starts compressing `block` into the loaded state.
    fn start_block(&mut self, block: &[u8; BLOCK_SIZE]);

    /// Polls the engine after `start_block`.
    ///
    /// # Errors
    /// `nb::Error::WouldBlock` while the engine is running,
    /// `nb::Error::Other` if it flagged an error.
    fn poll(&mut self) -> nb::Result<(), HwError>;

    /// Reads the digest registers.
    fn read_state(&mut self) -> [u32; STATE_WORDS];

    /// Stops any running operation and clears the engine state.
    fn abort(&mut self);
}
