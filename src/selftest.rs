// Licensed under the Apache-2.0 license

//! Known-answer self-test against the FIPS 180-2 example messages.
//!
//! Progress is written to any `embedded_io::Write` sink (typically a UART);
//! pass [`Discard`] to run silently.

use crate::accel::{Accelerator, NoAccelerator};
use crate::common::{Variant, DIGEST_SIZE, SHA224_DIGEST_SIZE};
use crate::context::Sha256Context;
use core::convert::Infallible;
use embedded_io::{ErrorType, Write};
use hex_literal::hex;

static MILLION_A_CHUNK: [u8; 1000] = [b'a'; 1000];

struct Vector {
    message: &'static [u8],
    /// Number of times `message` is fed.
    repeat: usize,
    sha224: [u8; SHA224_DIGEST_SIZE],
    sha256: [u8; DIGEST_SIZE],
}

static VECTORS: [Vector; 4] = [
    Vector {
        message: b"",
        repeat: 1,
        sha224: hex!("d14a028c2a3a2bc9476102bb288234c415a2b01f828ea62ac5b3e42f"),
        sha256: hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"),
    },
    Vector {
        message: b"abc",
        repeat: 1,
        sha224: hex!("23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"),
        sha256: hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"),
    },
    Vector {
        message: b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq",
        repeat: 1,
        sha224: hex!("75388b16512776cc5dba5da1fd890150b0c6455cb4f58b1952522525"),
        sha256: hex!("248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1"),
    },
    Vector {
        message: &MILLION_A_CHUNK,
        repeat: 1000,
        sha224: hex!("20794655980c91d8bbb4c1ea97618a4bf03f42581948b2ee4ee7ad67"),
        sha256: hex!("cdc76e5c9914fb9281a1c7e284d73e67f1809a48a497200e046d39ccc7112cd0"),
    },
];

/// Sink that drops all output.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl ErrorType for Discard {
    type Error = Infallible;
}

impl Write for Discard {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Runs the known-answer tests in software.
///
/// Returns `true` when every vector passes. With `verbose`, one line per test
/// is written to `out`; output stops at the first write error, which does not
/// affect the result.
pub fn self_test<W: Write>(verbose: bool, out: &mut W) -> bool {
    self_test_with(&NoAccelerator, verbose, out)
}

/// Runs the known-answer tests through contexts preferring `accel`.
pub fn self_test_with<A: Accelerator, W: Write>(accel: &A, verbose: bool, out: &mut W) -> bool {
    let mut passed = true;
    // Cleared by the first failed write; the tests still run to completion.
    let mut report = verbose;

    for variant in [Variant::Sha224, Variant::Sha256] {
        for (index, vector) in VECTORS.iter().enumerate() {
            if report {
                let bits = variant.output_bits();
                report = write!(out, "  SHA-{bits} test #{}: ", index + 1).is_ok();
            }
            let ok = run_vector(accel, variant, vector);
            passed &= ok;
            if report {
                report = writeln!(out, "{}", verdict(ok)).is_ok();
            }
        }

        if report {
            report = write!(out, "  SHA-{} clone test: ", variant.output_bits()).is_ok();
        }
        let ok = run_clone(accel, variant);
        passed &= ok;
        if report {
            report = writeln!(out, "{}", verdict(ok)).is_ok();
        }
    }

    if report {
        let _ = writeln!(out);
    }
    passed
}

const fn verdict(ok: bool) -> &'static str {
    if ok {
        "passed"
    } else {
        "failed"
    }
}

fn expected(variant: Variant, vector: &Vector) -> &[u8] {
    match variant {
        Variant::Sha224 => &vector.sha224,
        Variant::Sha256 => &vector.sha256,
    }
}

fn digest_matches(variant: Variant, digest: &[u8; DIGEST_SIZE], expected: &[u8]) -> bool {
    digest.get(..variant.digest_size()) == Some(expected)
}

fn run_vector<A: Accelerator>(accel: &A, variant: Variant, vector: &Vector) -> bool {
    let mut ctx = Sha256Context::with_accelerator(accel);
    if ctx.starts(variant == Variant::Sha224).is_err() {
        return false;
    }
    for _ in 0..vector.repeat {
        if ctx.update(vector.message).is_err() {
            return false;
        }
    }
    let mut digest = [0u8; DIGEST_SIZE];
    ctx.finish(&mut digest).is_ok() && digest_matches(variant, &digest, expected(variant, vector))
}

/// Splits the two-block FIPS message, clones between the halves and checks
/// that both copies reach the published digest.
fn run_clone<A: Accelerator>(accel: &A, variant: Variant) -> bool {
    let Some(vector) = VECTORS.get(2) else {
        return false;
    };
    let (head, tail) = vector.message.split_at(vector.message.len() / 2);

    let mut ctx = Sha256Context::with_accelerator(accel);
    if ctx.starts(variant == Variant::Sha224).is_err() || ctx.update(head).is_err() {
        return false;
    }
    let mut copy = ctx.clone();

    let mut first = [0u8; DIGEST_SIZE];
    let mut second = [0u8; DIGEST_SIZE];
    let finished = ctx.update(tail).is_ok()
        && ctx.finish(&mut first).is_ok()
        && copy.update(tail).is_ok()
        && copy.finish(&mut second).is_ok();

    finished && first == second && digest_matches(variant, &first, expected(variant, vector))
}
