//! Identity token decoding.
//!
//! Two independent algorithms over cookie text:
//!
//! - [`decode_session_uid`]: 192-char session token → numeric user id
//!   (salted rotation, URL-safe base64 alphabet, little-endian u32 at
//!   bytes 68..72 of the decoded buffer).
//! - [`decode_embedded_timestamp`]: 32-char hex visitor token → creation
//!   time in unix seconds (two DES blocks decrypted independently,
//!   little-endian u32 at bytes 4..8 of the plaintext).
//!
//! Both are total: malformed input yields a sentinel, never an error.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use des::cipher::generic_array::GenericArray;
use des::cipher::{BlockDecrypt, KeyInit};
use des::Des;
use tracing::warn;

pub const SESSION_TOKEN_LEN: usize = 192;
pub const VISITOR_TOKEN_LEN: usize = 32;

/// Returned by [`decode_embedded_timestamp`] when the token is not 32 chars.
pub const NO_TIMESTAMP: i64 = -1;

const DES_KEY: &[u8; 8] = b"ZxdeacAD";
const DES_BLOCK: usize = 8;
const UID_OFFSET: usize = 68;
const TIMESTAMP_OFFSET: usize = 4;

/// Decode a session token into a numeric user id. Returns 0 when the token
/// is not exactly 192 bytes or does not decode.
pub fn decode_session_uid(token: &str) -> u64 {
    let bytes = token.as_bytes();
    if bytes.len() != SESSION_TOKEN_LEN {
        return 0;
    }

    let salt = session_salt(bytes);
    let mut rotated = bytes.to_vec();
    rotated.rotate_left(SESSION_TOKEN_LEN - salt);
    for b in rotated.iter_mut() {
        match *b {
            b'-' => *b = b'+',
            b'~' => *b = b'/',
            _ => {}
        }
    }

    let decoded = match STANDARD.decode(&rotated) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "session token base64 decode failed");
            return 0;
        }
    };

    match decoded.get(UID_OFFSET..UID_OFFSET + 4) {
        Some(raw) => u64::from(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
        None => 0,
    }
}

/// Sum of every position plus the byte's single-byte varint value
/// (bytes >= 0x80 are not complete varints and count as zero),
/// folded into {1, 2}.
fn session_salt(bytes: &[u8]) -> usize {
    let sum: usize = bytes
        .iter()
        .enumerate()
        .map(|(i, &b)| i + if b < 0x80 { b as usize } else { 0 })
        .sum();
    sum % 2 + 1
}

/// Decode the creation timestamp embedded in a 32-char visitor token.
/// Returns [`NO_TIMESTAMP`] when the length is wrong.
pub fn decode_embedded_timestamp(token: &str) -> i64 {
    let bytes = token.as_bytes();
    if bytes.len() != VISITOR_TOKEN_LEN {
        return NO_TIMESTAMP;
    }

    let cipher = Des::new(GenericArray::from_slice(DES_KEY));
    let mut plain = [0u8; DES_BLOCK * 2];

    for (run, out) in bytes.chunks_exact(DES_BLOCK * 2).zip(plain.chunks_exact_mut(DES_BLOCK)) {
        let mut block = GenericArray::clone_from_slice(&hex_block(run));
        cipher.decrypt_block(&mut block);
        out.copy_from_slice(&block);
    }

    let raw = &plain[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 4];
    i64::from(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Pair 16 hex characters into 8 bytes. Characters outside `0-9a-fA-F`
/// are not rejected; they wrap like the digit arithmetic does.
fn hex_block(run: &[u8]) -> [u8; DES_BLOCK] {
    let mut out = [0u8; DES_BLOCK];
    for (dst, pair) in out.iter_mut().zip(run.chunks_exact(2)) {
        *dst = nibble(pair[0]).wrapping_mul(0x10).wrapping_add(nibble(pair[1]));
    }
    out
}

fn nibble(c: u8) -> u8 {
    match c {
        b'A'..=b'F' => c - b'A' + 10,
        b'a'..=b'f' => c - b'a' + 10,
        _ => c.wrapping_sub(b'0'),
    }
}
