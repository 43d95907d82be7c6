// Licensed under the Apache-2.0 license

//! Constants and helpers shared by the software and accelerator backends.

use zerocopy::byteorder::{BigEndian, U32};

/// SHA-224/SHA-256 block size in bytes.
pub const BLOCK_SIZE: usize = 64;
/// Size of the `finish` output buffer.
pub const DIGEST_SIZE: usize = 32;
/// Meaningful prefix of the output for SHA-224.
pub const SHA224_DIGEST_SIZE: usize = 28;
/// Number of 32-bit digest accumulator words.
pub const STATE_WORDS: usize = 8;

/// Offset inside the final block where the 64-bit message length starts.
const LENGTH_OFFSET: usize = BLOCK_SIZE - 8;

pub const SHA256_IV: [u32; STATE_WORDS] = [
    0x6a09_e667,
    0xbb67_ae85,
    0x3c6e_f372,
    0xa54f_f53a,
    0x510e_527f,
    0x9b05_688c,
    0x1f83_d9ab,
    0x5be0_cd19,
];

pub const SHA224_IV: [u32; STATE_WORDS] = [
    0xc105_9ed8,
    0x367c_d507,
    0x3070_dd17,
    0xf70e_5939,
    0xffc0_0b31,
    0x6858_1511,
    0x64f9_8fa7,
    0xbefa_4fa4,
];

/// Which of the two fixed-IV variants a session computes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Variant {
    Sha224,
    Sha256,
}

impl Variant {
    #[must_use]
    pub const fn from_is224(is224: bool) -> Self {
        if is224 {
            Variant::Sha224
        } else {
            Variant::Sha256
        }
    }

    #[must_use]
    pub const fn iv(self) -> [u32; STATE_WORDS] {
        match self {
            Variant::Sha224 => SHA224_IV,
            Variant::Sha256 => SHA256_IV,
        }
    }

    /// Number of meaningful digest bytes.
    #[must_use]
    pub const fn digest_size(self) -> usize {
        match self {
            Variant::Sha224 => SHA224_DIGEST_SIZE,
            Variant::Sha256 => DIGEST_SIZE,
        }
    }

    #[must_use]
    pub const fn output_bits(self) -> usize {
        self.digest_size() * 8
    }
}

/// Serializes the digest words big-endian.
///
/// For SHA-224 only the first seven words are digest output; the trailing
/// four bytes of the returned buffer are always zero.
#[must_use]
pub fn serialize_state(state: &[u32; STATE_WORDS], variant: Variant) -> [u8; DIGEST_SIZE] {
    let words: [U32<BigEndian>; STATE_WORDS] = (*state).map(U32::new);
    let mut bytes: [u8; DIGEST_SIZE] = zerocopy::transmute!(words);
    if let Some(tail) = bytes.get_mut(variant.digest_size()..) {
        tail.fill(0);
    }
    bytes
}

/// Writes the SHA-2 padding for a message of `msg_len` bytes into `out`.
///
/// Returns the number of padding bytes: a `0x80` marker, zeros, and the
/// big-endian bit length, so that `msg_len + returned` is a multiple of the
/// block size.
pub fn sha256_padding(msg_len: u64, out: &mut [u8; 2 * BLOCK_SIZE]) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    let used = (msg_len % BLOCK_SIZE as u64) as usize;
    let pad_len = if used < LENGTH_OFFSET {
        BLOCK_SIZE - used
    } else {
        2 * BLOCK_SIZE - used
    };

    out.fill(0);
    if let Some(marker) = out.first_mut() {
        *marker = 0x80;
    }
    let bit_len = msg_len.wrapping_mul(8).to_be_bytes();
    if let Some(length) = out.get_mut(pad_len - bit_len.len()..pad_len) {
        length.copy_from_slice(&bit_len);
    }
    pad_len
}
