// Licensed under the Apache-2.0 license

//! Session driver for block-oriented SHA-256 engines
//!
//! `ShaController` owns a [`ShaPeripheral`] and a delay source and turns them
//! into an [`Accelerator`]. The engine is a singleton: one [`ShaSession`] at a
//! time may own it, acquired without blocking in `open_session` and released
//! when the session is closed or dropped.
//!
//! The session keeps the clerical state (partial block, message length, the
//! digest words after the last block) and reloads the digest registers before
//! each block, so the engine holds nothing a session cannot recreate. That is
//! also what makes [`Accelerator::export`] possible.
//!
//! ```no_run
//! use sha256_alt::accel::{ShaController, ShaPeripheral};
//! use sha256_alt::context::Sha256Context;
//! # fn example<P: ShaPeripheral, D: embedded_hal::delay::DelayNs>(peripheral: P, delay: D)
//! #     -> Result<(), sha256_alt::error::Sha256Error> {
//! let controller = ShaController::new(peripheral, delay);
//!
//! let mut ctx = Sha256Context::with_accelerator(&controller);
//! ctx.starts(false)?;
//! ctx.update(b"hello")?;
//! let mut digest = [0u8; 32];
//! ctx.finish(&mut digest)?;
//! # Ok(())
//! # }
//! ```

use super::config::AcceleratorConfig;
use super::traits::ShaPeripheral;
use super::{Accelerator, HwError};
use crate::common::{serialize_state, sha256_padding, Variant, BLOCK_SIZE, DIGEST_SIZE, STATE_WORDS};
use crate::soft::Midstate;
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};
use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::{trace, warn};

struct Hardware<P, D> {
    peripheral: P,
    delay: D,
}

impl<P: ShaPeripheral, D: DelayNs> Hardware<P, D> {
    /// Polls until the running block completes, bounded by `config.timeout`.
    fn wait_idle(&mut self, config: &AcceleratorConfig) -> Result<(), HwError> {
        let interval = config.poll_interval.to_micros().max(1);
        let budget = config.timeout.to_micros();
        let mut waited: u32 = 0;
        loop {
            match self.peripheral.poll() {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(err)) => return Err(err),
                Err(nb::Error::WouldBlock) if waited >= budget => return Err(HwError::Timeout),
                Err(nb::Error::WouldBlock) => {
                    self.delay.delay_us(interval);
                    waited = waited.saturating_add(interval);
                }
            }
        }
    }
}

/// Single-owner driver for a SHA-256 engine
pub struct ShaController<P: ShaPeripheral, D: DelayNs> {
    owned: AtomicBool,
    hardware: UnsafeCell<Hardware<P, D>>,
    config: AcceleratorConfig,
}

// SAFETY: `hardware` is only reached through `ShaSession::hardware`, and the
// `owned` flag admits a single session at a time.
unsafe impl<P: ShaPeripheral + Send, D: DelayNs + Send> Sync for ShaController<P, D> {}

impl<P: ShaPeripheral, D: DelayNs> ShaController<P, D> {
    pub fn new(peripheral: P, delay: D) -> Self {
        Self::with_config(peripheral, delay, AcceleratorConfig::default())
    }

    pub fn with_config(peripheral: P, delay: D, config: AcceleratorConfig) -> Self {
        Self {
            owned: AtomicBool::new(false),
            hardware: UnsafeCell::new(Hardware { peripheral, delay }),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AcceleratorConfig {
        &self.config
    }

    /// Whether a session currently owns the engine.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.owned.load(Ordering::Acquire)
    }

    /// Recovers the peripheral and delay source.
    pub fn into_inner(self) -> (P, D) {
        let hardware = self.hardware.into_inner();
        (hardware.peripheral, hardware.delay)
    }

    fn acquire(&self) -> Result<(), HwError> {
        self.owned
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|_| HwError::Busy)
    }
}

/// A session owning the engine of a [`ShaController`].
pub struct ShaSession<'a, P: ShaPeripheral, D: DelayNs> {
    controller: &'a ShaController<P, D>,
    variant: Variant,
    state: [u32; STATE_WORDS],
    pending: Vec<u8, BLOCK_SIZE>,
    total_len: u64,
    /// Set by a failed operation or after the digest was read.
    sealed: bool,
}

impl<P: ShaPeripheral, D: DelayNs> ShaSession<'_, P, D> {
    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.variant
    }

    #[must_use]
    pub const fn total_len(&self) -> u64 {
        self.total_len
    }

    fn hardware(&mut self) -> &mut Hardware<P, D> {
        // SAFETY: a live session is the only owner of the engine (see
        // `ShaController::acquire`), and `&mut self` keeps this borrow unique.
        unsafe { &mut *self.controller.hardware.get() }
    }

    fn run_block(&mut self, block: &[u8; BLOCK_SIZE]) -> Result<(), HwError> {
        let state = self.state;
        let config = self.controller.config;
        let hw = self.hardware();
        hw.peripheral.load_state(&state);
        hw.peripheral.start_block(block);
        hw.wait_idle(&config)?;
        let next = hw.peripheral.read_state();
        self.state = next;
        Ok(())
    }

    /// Feeds whole blocks to the engine and keeps the remainder in `pending`.
    fn absorb(&mut self, mut data: &[u8]) -> Result<(), HwError> {
        if !self.pending.is_empty() {
            let take = (BLOCK_SIZE - self.pending.len()).min(data.len());
            let (head, rest) = data.split_at(take);
            self.pending
                .extend_from_slice(head)
                .map_err(|()| HwError::Fault)?;
            data = rest;

            if !self.pending.is_full() {
                return Ok(());
            }
            let block = <[u8; BLOCK_SIZE]>::try_from(self.pending.as_slice())
                .map_err(|_| HwError::Fault)?;
            self.pending.clear();
            self.run_block(&block)?;
        }

        let mut blocks = data.chunks_exact(BLOCK_SIZE);
        for block in &mut blocks {
            let block = <&[u8; BLOCK_SIZE]>::try_from(block).map_err(|_| HwError::Fault)?;
            self.run_block(block)?;
        }
        self.pending
            .extend_from_slice(blocks.remainder())
            .map_err(|()| HwError::Fault)
    }

    fn check_open(&self) -> Result<(), HwError> {
        if self.sealed {
            Err(HwError::Fault)
        } else {
            Ok(())
        }
    }

    fn seal_on_error<T>(&mut self, result: Result<T, HwError>) -> Result<T, HwError> {
        if let Err(err) = &result {
            warn!("accelerator session failed: {err}");
            self.sealed = true;
            self.hardware().peripheral.abort();
        }
        result
    }
}

impl<P: ShaPeripheral, D: DelayNs> Drop for ShaSession<'_, P, D> {
    fn drop(&mut self) {
        let hw = self.hardware();
        hw.peripheral.abort();
        hw.peripheral.disable();
        self.pending.clear();
        self.state = [0; STATE_WORDS];
        self.controller.owned.store(false, Ordering::Release);
        trace!("accelerator session released");
    }
}

impl<P: ShaPeripheral, D: DelayNs> Accelerator for ShaController<P, D> {
    type Session<'s>
        = ShaSession<'s, P, D>
    where
        Self: 's;

    fn open_session(&self, variant: Variant) -> Result<Self::Session<'_>, HwError> {
        self.acquire()?;
        let mut session = ShaSession {
            controller: self,
            variant,
            state: variant.iv(),
            pending: Vec::new(),
            total_len: 0,
            sealed: false,
        };
        session.hardware().peripheral.enable();
        trace!("accelerator session opened for {variant:?}");
        Ok(session)
    }

    fn feed(&self, session: &mut Self::Session<'_>, data: &[u8]) -> Result<(), HwError> {
        session.check_open()?;
        session.total_len = session.total_len.wrapping_add(data.len() as u64);
        let result = session.absorb(data);
        session.seal_on_error(result)
    }

    fn read_digest(
        &self,
        session: &mut Self::Session<'_>,
        out: &mut [u8; DIGEST_SIZE],
    ) -> Result<(), HwError> {
        session.check_open()?;
        let mut pad = [0u8; 2 * BLOCK_SIZE];
        let pad_len = sha256_padding(session.total_len, &mut pad);
        let result = session.absorb(pad.get(..pad_len).unwrap_or_default());
        session.seal_on_error(result)?;

        *out = serialize_state(&session.state, session.variant);
        session.sealed = true;
        Ok(())
    }

    fn close(&self, session: Self::Session<'_>) {
        drop(session);
    }

    fn export(&self, session: &Self::Session<'_>) -> Midstate {
        Midstate {
            variant: session.variant,
            state: session.state,
            total_len: session.total_len,
            pending: session.pending.clone(),
        }
    }
}
