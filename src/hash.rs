//! Bone name hashing
//!
//! Skeletons, motion clips and reference skeletons are matched to each other
//! by a 32 bit hash of the bone name rather than by string comparison. The
//! hash is MurmurHash3 (x86, 32 bit) over the UTF-16LE encoding of the name
//! with a seed of `0xffff_ffff`. It is case sensitive and is only a matching
//! key, not a collision resistant hash.

/// Seed used for every bone name hash
pub const NAME_HASH_SEED: u32 = 0xffff_ffff;

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

const fn mix_k(k: u32) -> u32 {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

const fn fmix(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// MurmurHash3 x86 32 bit
#[must_use]
pub fn murmur3(data: &[u8], seed: u32) -> u32 {
    let mut h = seed;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        h ^= mix_k(k);
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, b) in tail.iter().enumerate() {
            k |= u32::from(*b) << (8 * i);
        }
        h ^= mix_k(k);
    }

    // The length is mixed in modulo 2^32 as in the reference implementation
    #[allow(clippy::cast_possible_truncation)]
    let len = data.len() as u32;
    fmix(h ^ len)
}

/// Hashes a bone name into the key used for all cross-table lookups
#[must_use]
pub fn name_hash(name: &str) -> u32 {
    let bytes: Vec<u8> =
        name.encode_utf16().flat_map(u16::to_le_bytes).collect();
    murmur3(&bytes, NAME_HASH_SEED)
}
