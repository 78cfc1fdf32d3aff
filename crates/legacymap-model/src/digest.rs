//! Run digests.
//!
//! Successive assembly runs are compared by a simple, deterministic,
//! non-cryptographic digest over the ordered ids of the output graph:
//!
//! - algorithm: **FNV-1a 64-bit**
//! - input: each id's UTF-8 bytes followed by a `\n` separator
//! - output: `"fnv1a64:<16 lowercase hex digits>"`
//!
//! Equal digests mean equal id sets *and* equal ordering.

pub const DIGEST_PREFIX: &str = "fnv1a64:";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001b3;

fn add(hash: &mut u64, bytes: &[u8]) {
    for b in bytes {
        *hash ^= (*b) as u64;
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}

/// Digest an ordered sequence of ids.
pub fn ids_digest<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for id in ids {
        add(&mut hash, id.as_bytes());
        add(&mut hash, b"\n");
    }
    format!("{DIGEST_PREFIX}{hash:016x}")
}
