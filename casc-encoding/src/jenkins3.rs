//! Bob Jenkins' [`lookup3`][0] hash.
//!
//! A fast, seedable, non-cryptographic 32-bit hash used for name indexing
//! and for short checksum fingerprints in error output.
//!
//! [0]: https://www.burtleburtle.net/bob/c/lookup3.c

const INIT: u32 = 0xdead_beef;

/// Rotation schedule for [`mix`]: each step updates one lane against the
/// other two, cycling through the lanes in order.
const MIX_ROTS: [u32; 6] = [4, 6, 8, 16, 19, 4];

/// Rotation schedule for [`finish`].
const FINAL_ROTS: [u32; 7] = [14, 11, 25, 16, 4, 14, 24];

fn word(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Mix the 3 internal lanes reversibly.
fn mix(s: &mut [u32; 3]) {
    for (n, rot) in MIX_ROTS.into_iter().enumerate() {
        let (i, j, k) = (n % 3, (n + 1) % 3, (n + 2) % 3);
        s[i] = s[i].wrapping_sub(s[k]);
        s[i] ^= s[k].rotate_left(rot);
        s[k] = s[k].wrapping_add(s[j]);
    }
}

/// Final avalanche of the 3 internal lanes.
fn finish(s: &mut [u32; 3]) {
    for (n, rot) in FINAL_ROTS.into_iter().enumerate() {
        let (i, k) = ((n + 2) % 3, (n + 1) % 3);
        s[i] ^= s[k];
        s[i] = s[i].wrapping_sub(s[k].rotate_left(rot));
    }
}

/// Hashes a variable-length key into a `u32`, seeded with `seed`.
pub fn hashlittle(key: &[u8], seed: u32) -> u32 {
    let mut pc = seed;
    hashlittle2(key, &mut pc, &mut 0);
    pc
}

/// Produces two 32-bit hash values, reading `key` as groups of 3
/// little-endian `u32`s.
///
/// `pc` and `pb` seed the hash on entry and carry the two results on
/// return; `pc` alone is the [`hashlittle`] value.
pub fn hashlittle2(key: &[u8], pc: &mut u32, pb: &mut u32) {
    let a = INIT.wrapping_add(key.len() as u32).wrapping_add(*pc);
    let mut s = [a, a, a.wrapping_add(*pb)];

    if key.is_empty() {
        *pc = s[2];
        *pb = s[1];
        return;
    }

    let mut k = key;
    while k.len() > 12 {
        s[0] = s[0].wrapping_add(word(&k[0..4]));
        s[1] = s[1].wrapping_add(word(&k[4..8]));
        s[2] = s[2].wrapping_add(word(&k[8..12]));
        mix(&mut s);
        k = &k[12..];
    }

    // The C original falls through a switch for the short final block,
    // reading missing high bytes as zero. Zero-padding a copy is the same.
    let mut tail = [0u8; 12];
    tail[..k.len()].copy_from_slice(k);

    s[0] = s[0].wrapping_add(word(&tail[0..4]));
    if k.len() > 4 {
        s[1] = s[1].wrapping_add(word(&tail[4..8]));
    }
    if k.len() > 8 {
        s[2] = s[2].wrapping_add(word(&tail[8..12]));
    }

    finish(&mut s);

    *pc = s[2];
    *pb = s[1];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key() {
        // No mixing happens for empty input.
        assert_eq!(hashlittle(b"", 0), 0xdeadbeef);
    }

    #[test]
    fn test_lookup3_reference_vectors() {
        // Values from the driver in Jenkins' lookup3.c.
        assert_eq!(hashlittle(b"Four score and seven years ago", 0), 0x17770551);
        assert_eq!(hashlittle(b"Four score and seven years ago", 1), 0xcd628161);
    }

    #[test]
    fn test_hashlittle2_matches_hashlittle() {
        let key = b"some/archive/path.blob";
        let mut pc = 42;
        let mut pb = 0;
        hashlittle2(key, &mut pc, &mut pb);
        assert_eq!(pc, hashlittle(key, 42));
    }

    #[test]
    fn test_seed_changes_hash() {
        assert_ne!(hashlittle(b"abc", 0), hashlittle(b"abc", 1));
    }
}
