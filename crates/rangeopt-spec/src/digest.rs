//! Input digests (versioned).
//!
//! Reports need a stable way to refer to the exact source and specification
//! text an analysis was run against. We use a simple, deterministic,
//! non-cryptographic digest:
//!
//! - algorithm: **FNV-1a 64-bit**
//! - input: the UTF-8 bytes of the text as-read
//! - output: `"fnv1a64:<16 lowercase hex digits>"`
//!
//! This is an identity tool for reports, not a security primitive.

/// Prefix used in serialized digests.
pub const DIGEST_V1_PREFIX: &str = "fnv1a64:";

/// Compute a v1 digest (FNV-1a 64-bit) over arbitrary bytes.
pub fn fnv1a64_digest_bytes(bytes: &[u8]) -> String {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x00000100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= (*b) as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    format!("{DIGEST_V1_PREFIX}{hash:016x}")
}

/// Digest of a source or specification text.
pub fn text_digest_v1(text: &str) -> String {
    fnv1a64_digest_bytes(text.as_bytes())
}
