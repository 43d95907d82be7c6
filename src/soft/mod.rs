// Licensed under the Apache-2.0 license

//! Software SHA-224/SHA-256 backend
//!
//! Keeps the running digest words, the unprocessed tail of the input in a
//! 64-byte block buffer, and the total message length. Each time the buffer
//! fills it is handed to [`compress`] and emptied.

mod compress;

pub use compress::compress;

use crate::common::{serialize_state, sha256_padding, Variant, BLOCK_SIZE, DIGEST_SIZE, STATE_WORDS};
use crate::error::Sha256Error;
use core::sync::atomic::{compiler_fence, Ordering};
use heapless::Vec;

/// Intermediate state of an in-progress hash, independent of the backend
/// that produced it.
///
/// An accelerator exports one of these so a session can be continued in
/// software, see [`crate::accel::Accelerator::export`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Midstate {
    pub variant: Variant,
    /// Digest words after the last fully processed block.
    pub state: [u32; STATE_WORDS],
    /// Total bytes fed so far, including `pending`.
    pub total_len: u64,
    /// Bytes received but not yet compressed (always shorter than a block).
    pub pending: Vec<u8, BLOCK_SIZE>,
}

/// Software digest state for one session.
#[derive(Clone)]
pub struct SoftwareState {
    state: [u32; STATE_WORDS],
    buffer: [u8; BLOCK_SIZE],
    buffered: usize,
    total_len: u64,
    variant: Variant,
}

impl SoftwareState {
    #[must_use]
    pub fn new(variant: Variant) -> Self {
        Self {
            state: variant.iv(),
            buffer: [0; BLOCK_SIZE],
            buffered: 0,
            total_len: 0,
            variant,
        }
    }

    /// Rebuilds a software session from an exported midstate.
    ///
    /// # Errors
    /// `Sha256Error::InvalidMidstate` if `pending` holds a whole block or its
    /// length disagrees with `total_len` modulo the block size.
    pub fn from_midstate(midstate: &Midstate) -> Result<Self, Sha256Error> {
        let pending = midstate.pending.as_slice();
        if pending.len() >= BLOCK_SIZE
            || midstate.total_len % BLOCK_SIZE as u64 != pending.len() as u64
        {
            return Err(Sha256Error::InvalidMidstate);
        }

        let mut soft = Self::new(midstate.variant);
        soft.state = midstate.state;
        soft.total_len = midstate.total_len;
        let dst = soft
            .buffer
            .get_mut(..pending.len())
            .ok_or(Sha256Error::InvalidMidstate)?;
        dst.copy_from_slice(pending);
        soft.buffered = pending.len();
        Ok(soft)
    }

    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.variant
    }

    #[must_use]
    pub const fn total_len(&self) -> u64 {
        self.total_len
    }

    /// Number of bytes waiting in the block buffer (0..=63).
    #[must_use]
    pub const fn buffered(&self) -> usize {
        self.buffered
    }

    #[must_use]
    pub fn midstate(&self) -> Midstate {
        let mut pending = Vec::new();
        if let Some(tail) = self.buffer.get(..self.buffered) {
            // Cannot overflow: `buffered` never reaches the block size between calls.
            let _ = pending.extend_from_slice(tail);
        }
        Midstate {
            variant: self.variant,
            state: self.state,
            total_len: self.total_len,
            pending,
        }
    }

    /// Compresses one block into the digest words without touching the block
    /// buffer or the length counter.
    pub fn process_block(&mut self, block: &[u8; BLOCK_SIZE]) {
        compress(&mut self.state, block);
    }

    pub fn update(&mut self, input: &[u8]) {
        if input.is_empty() {
            return;
        }
        self.total_len = self.total_len.wrapping_add(input.len() as u64);
        self.absorb(input);
    }

    /// Pads the message, compresses the final block(s) and returns the digest.
    ///
    /// For SHA-224 the trailing four bytes of the result are zero.
    pub fn finish(&mut self) -> [u8; DIGEST_SIZE] {
        let mut pad = [0u8; 2 * BLOCK_SIZE];
        let pad_len = sha256_padding(self.total_len, &mut pad);
        self.absorb(pad.get(..pad_len).unwrap_or_default());
        debug_assert_eq!(self.buffered, 0);
        serialize_state(&self.state, self.variant)
    }

    /// Overwrites the digest words and buffered input.
    pub fn zeroize(&mut self) {
        for word in &mut self.state {
            // SAFETY: `word` is a valid, aligned, exclusive reference.
            unsafe { core::ptr::write_volatile(word, 0) };
        }
        for byte in &mut self.buffer {
            // SAFETY: as above.
            unsafe { core::ptr::write_volatile(byte, 0) };
        }
        self.buffered = 0;
        self.total_len = 0;
        compiler_fence(Ordering::SeqCst);
    }

    fn absorb(&mut self, mut input: &[u8]) {
        if self.buffered > 0 {
            let take = (BLOCK_SIZE - self.buffered).min(input.len());
            let (head, rest) = input.split_at(take);
            if let Some(dst) = self.buffer.get_mut(self.buffered..self.buffered + take) {
                dst.copy_from_slice(head);
            }
            self.buffered += take;
            input = rest;

            if self.buffered < BLOCK_SIZE {
                return;
            }
            compress(&mut self.state, &self.buffer);
            self.buffered = 0;
        }

        let mut blocks = input.chunks_exact(BLOCK_SIZE);
        for block in &mut blocks {
            if let Ok(block) = <&[u8; BLOCK_SIZE]>::try_from(block) {
                compress(&mut self.state, block);
            }
        }

        let tail = blocks.remainder();
        if let Some(dst) = self.buffer.get_mut(..tail.len()) {
            dst.copy_from_slice(tail);
        }
        self.buffered = tail.len();
    }
}

impl Drop for SoftwareState {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl core::fmt::Debug for SoftwareState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SoftwareState")
            .field("variant", &self.variant)
            .field("buffered", &self.buffered)
            .field("total_len", &self.total_len)
            .finish_non_exhaustive()
    }
}
