// Licensed under the Apache-2.0 license

//! One-call hashing helpers.

use crate::accel::Accelerator;
use crate::common::DIGEST_SIZE;
use crate::context::Sha256Context;
use crate::error::Sha256Error;

/// SHA-224 (`is224`) or SHA-256 of `input`, computed in software.
///
/// For SHA-224 the trailing four bytes are zero.
#[must_use]
pub fn hash(input: &[u8], is224: bool) -> [u8; DIGEST_SIZE] {
    let mut output = [0u8; DIGEST_SIZE];
    let mut ctx = Sha256Context::new();
    // A software session has no failure path.
    let result = ctx
        .starts(is224)
        .and_then(|()| ctx.update(input))
        .and_then(|()| ctx.finish(&mut output));
    debug_assert_eq!(result, Ok(()));
    ctx.free();
    output
}

/// Same as [`hash`], routed through a context that prefers `accel`.
///
/// # Errors
/// Whatever `starts`, `update` or `finish` report.
pub fn hash_with<A: Accelerator>(
    accel: &A,
    input: &[u8],
    is224: bool,
) -> Result<[u8; DIGEST_SIZE], Sha256Error> {
    let mut ctx = Sha256Context::with_accelerator(accel);
    ctx.starts(is224)?;
    ctx.update(input)?;
    let mut output = [0u8; DIGEST_SIZE];
    ctx.finish(&mut output)?;
    ctx.free();
    Ok(output)
}
