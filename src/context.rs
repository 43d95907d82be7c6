// Licensed under the Apache-2.0 license

//! SHA-224/SHA-256 context dispatching to an accelerator or to software
//!
//! A [`Sha256Context`] commits to one backend in [`starts`](Sha256Context::starts)
//! and keeps it until the session ends. An accelerator failure ends the
//! session with an error; it is not continued in software.
//!
//! # Lifecycle
//!
//! 1. `new` / `with_accelerator`: idle, no backend
//! 2. `starts`: selects a backend and loads the IV
//! 3. `update`: any number of times
//! 4. `finish`: writes the digest and ends the session
//! 5. `free` (or drop): releases the accelerator, clears software state
//!
//! ```
//! use sha256_alt::context::Sha256Context;
//!
//! let mut ctx = Sha256Context::new();
//! ctx.starts(false)?;
//! ctx.update(b"ab")?;
//! ctx.update(b"c")?;
//! let mut digest = [0u8; 32];
//! ctx.finish(&mut digest)?;
//! assert_eq!(digest[0], 0xba);
//! # Ok::<(), sha256_alt::error::Sha256Error>(())
//! ```

use crate::accel::{Accelerator, NoAccelerator};
use crate::common::{Variant, BLOCK_SIZE, DIGEST_SIZE};
use crate::error::Sha256Error;
use crate::soft::SoftwareState;
use core::mem;
use log::{debug, warn};

static NO_ACCELERATOR: NoAccelerator = NoAccelerator;

/// How `starts` picks a backend.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendPolicy {
    /// Use the accelerator when it can open a session, software otherwise.
    #[default]
    PreferHardware,
    /// Never touch the accelerator.
    SoftwareOnly,
    /// Fail with `BackendUnavailable` instead of falling back to software.
    HardwareOnly,
}

/// Which backend a context is currently bound to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Idle,
    Hardware,
    Software,
    Finished,
}

enum Backend<'a, A: Accelerator + 'a> {
    Idle,
    Hardware(A::Session<'a>),
    Software(SoftwareState),
    /// `finish` ran (or the accelerator failed); a new `starts` is required.
    Finished,
}

/// Incremental SHA-224/SHA-256 context.
///
/// Not internally synchronized: every mutating call takes `&mut self`.
pub struct Sha256Context<'a, A: Accelerator + 'a = NoAccelerator> {
    accel: &'a A,
    policy: BackendPolicy,
    backend: Backend<'a, A>,
}

impl Sha256Context<'static, NoAccelerator> {
    /// Software-only context.
    #[must_use]
    pub fn new() -> Self {
        Sha256Context::with_accelerator(&NO_ACCELERATOR)
    }
}

impl Default for Sha256Context<'static, NoAccelerator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, A: Accelerator + 'a> Sha256Context<'a, A> {
    /// Context that prefers `accel` and falls back to software.
    #[must_use]
    pub fn with_accelerator(accel: &'a A) -> Self {
        Self {
            accel,
            policy: BackendPolicy::default(),
            backend: Backend::Idle,
        }
    }

    /// Sets the selection policy used by subsequent `starts` calls.
    #[must_use]
    pub fn with_policy(mut self, policy: BackendPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> BackendPolicy {
        self.policy
    }

    #[must_use]
    pub fn backend(&self) -> BackendKind {
        match self.backend {
            Backend::Idle => BackendKind::Idle,
            Backend::Hardware(_) => BackendKind::Hardware,
            Backend::Software(_) => BackendKind::Software,
            Backend::Finished => BackendKind::Finished,
        }
    }

    /// Starts a new SHA-224 (`is224`) or SHA-256 session.
    ///
    /// Any previous session is discarded first, releasing the accelerator if
    /// this context held it.
    ///
    /// # Errors
    /// `Sha256Error::BackendUnavailable` if the policy is `HardwareOnly` and
    /// the accelerator cannot open a session.
    pub fn starts(&mut self, is224: bool) -> Result<(), Sha256Error> {
        self.free();
        self.backend = self.select(Variant::from_is224(is224))?;
        Ok(())
    }

    fn select(&self, variant: Variant) -> Result<Backend<'a, A>, Sha256Error> {
        if self.policy != BackendPolicy::SoftwareOnly {
            let accel: &'a A = self.accel;
            match accel.open_session(variant) {
                Ok(session) => {
                    debug!("{variant:?} session on accelerator");
                    return Ok(Backend::Hardware(session));
                }
                Err(err) if self.policy == BackendPolicy::HardwareOnly => {
                    warn!("accelerator required but {err}");
                    return Err(Sha256Error::BackendUnavailable);
                }
                Err(err) => debug!("{err}, {variant:?} session in software"),
            }
        }
        Ok(Backend::Software(SoftwareState::new(variant)))
    }

    /// Feeds `input` to the active session. Empty input is a no-op.
    ///
    /// # Errors
    /// - `Sha256Error::InvalidSequence` without an active session
    /// - `Sha256Error::HardwareFault` if the accelerator failed; the session
    ///   is then over and the accelerator released
    pub fn update(&mut self, input: &[u8]) -> Result<(), Sha256Error> {
        let result = match &mut self.backend {
            Backend::Software(soft) => {
                soft.update(input);
                Ok(())
            }
            Backend::Hardware(_) if input.is_empty() => Ok(()),
            Backend::Hardware(session) => self.accel.feed(session, input),
            Backend::Idle | Backend::Finished => return Err(Sha256Error::InvalidSequence),
        };
        result.map_err(|err| {
            self.abandon();
            Sha256Error::from(err)
        })
    }

    /// Writes the digest and ends the session.
    ///
    /// All 32 bytes of `output` are written: for SHA-224 the digest is the
    /// first 28 and the last 4 are zero. On error `output` is not modified.
    ///
    /// # Errors
    /// - `Sha256Error::InvalidSequence` without an active session (including a
    ///   second `finish`)
    /// - `Sha256Error::HardwareFault` if the accelerator failed
    pub fn finish(&mut self, output: &mut [u8; DIGEST_SIZE]) -> Result<(), Sha256Error> {
        let digest = match mem::replace(&mut self.backend, Backend::Finished) {
            Backend::Software(mut soft) => soft.finish(),
            Backend::Hardware(mut session) => {
                let mut digest = [0u8; DIGEST_SIZE];
                let result = self.accel.read_digest(&mut session, &mut digest);
                self.accel.close(session);
                result?;
                digest
            }
            idle @ (Backend::Idle | Backend::Finished) => {
                self.backend = idle;
                return Err(Sha256Error::InvalidSequence);
            }
        };
        *output = digest;
        Ok(())
    }

    /// Compresses one block into a software session's digest words, bypassing
    /// the block buffer and length counter.
    ///
    /// # Errors
    /// `Sha256Error::InvalidSequence` unless a software session is active.
    pub fn process_block(&mut self, block: &[u8; BLOCK_SIZE]) -> Result<(), Sha256Error> {
        match &mut self.backend {
            Backend::Software(soft) => {
                soft.process_block(block);
                Ok(())
            }
            _ => Err(Sha256Error::InvalidSequence),
        }
    }

    /// Ends any session and returns to the idle state.
    pub fn free(&mut self) {
        match mem::replace(&mut self.backend, Backend::Idle) {
            Backend::Hardware(session) => self.accel.close(session),
            Backend::Software(mut soft) => soft.zeroize(),
            Backend::Idle | Backend::Finished => {}
        }
    }

    fn abandon(&mut self) {
        if let Backend::Hardware(session) = mem::replace(&mut self.backend, Backend::Finished) {
            self.accel.close(session);
        }
    }
}

impl<'a, A: Accelerator + 'a> Clone for Sha256Context<'a, A> {
    /// Deep copy of the session.
    ///
    /// A hardware session is forked on the accelerator when it supports a
    /// second session; otherwise the copy continues in software from the
    /// exported midstate. Either way both contexts produce the same digest
    /// for the same remaining input. If the accelerator exports an
    /// inconsistent midstate the copy is left `Finished`.
    fn clone(&self) -> Self {
        let backend = match &self.backend {
            Backend::Idle => Backend::Idle,
            Backend::Finished => Backend::Finished,
            Backend::Software(soft) => Backend::Software(soft.clone()),
            Backend::Hardware(session) => {
                let accel: &'a A = self.accel;
                match accel.fork(session) {
                    Ok(forked) => Backend::Hardware(forked),
                    Err(err) => {
                        debug!("{err}, clone continues in software");
                        match SoftwareState::from_midstate(&accel.export(session)) {
                            Ok(soft) => Backend::Software(soft),
                            Err(err) => {
                                warn!("clone not resumable: {err}");
                                Backend::Finished
                            }
                        }
                    }
                }
            }
        };
        Self {
            accel: self.accel,
            policy: self.policy,
            backend,
        }
    }
}

impl<'a, A: Accelerator + 'a> Drop for Sha256Context<'a, A> {
    fn drop(&mut self) {
        self.free();
    }
}
