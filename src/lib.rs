// Licensed under the Apache-2.0 license

// Keep panic-prone patterns out of non-test code
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::indexing_slicing))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! SHA-224/SHA-256 with a hardware accelerator and a software fallback
//! behind one context type.

pub mod accel;
pub mod common;
pub mod context;
pub mod error;
pub mod oneshot;
pub mod selftest;
pub mod soft;

pub use accel::{Accelerator, HwError, NoAccelerator};
pub use common::{Variant, BLOCK_SIZE, DIGEST_SIZE, SHA224_DIGEST_SIZE};
pub use context::{BackendKind, BackendPolicy, Sha256Context};
pub use error::Sha256Error;
pub use oneshot::{hash, hash_with};
pub use selftest::{self_test, self_test_with};
