//! The 32-bit hash shared with the asset toolchain.
//!
//! Type ids are `fast_hash` of the ASCII type name, and the patch filter
//! fingerprints chunk contents with the same function. The algorithm is
//! Paul Hsieh's SuperFastHash: seeded with the input length, processing
//! 16-bit little-endian halves, tail bytes sign-extended, and `0` for empty
//! input. It must stay bit-compatible with the producing pipeline.

#[inline]
fn get16(data: &[u8]) -> u32 {
    u16::from_le_bytes([data[0], data[1]]) as u32
}

/// Hash `data` to 32 bits.
pub fn fast_hash(data: &[u8]) -> u32 {
    if data.is_empty() {
        return 0;
    }

    let mut hash = data.len() as u32;
    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        hash = hash.wrapping_add(get16(block));
        let tmp = (get16(&block[2..]) << 11) ^ hash;
        hash = (hash << 16) ^ tmp;
        hash = hash.wrapping_add(hash >> 11);
    }

    let tail = blocks.remainder();
    match tail.len() {
        3 => {
            hash = hash.wrapping_add(get16(tail));
            hash ^= hash << 16;
            hash ^= ((tail[2] as i8 as i32) << 18) as u32;
            hash = hash.wrapping_add(hash >> 11);
        }
        2 => {
            hash = hash.wrapping_add(get16(tail));
            hash ^= hash << 11;
            hash = hash.wrapping_add(hash >> 17);
        }
        1 => {
            hash = hash.wrapping_add(tail[0] as i8 as i32 as u32);
            hash ^= hash << 10;
            hash = hash.wrapping_add(hash >> 1);
        }
        _ => {}
    }

    // Avalanche the final bits.
    hash ^= hash << 3;
    hash = hash.wrapping_add(hash >> 5);
    hash ^= hash << 4;
    hash = hash.wrapping_add(hash >> 17);
    hash ^= hash << 25;
    hash = hash.wrapping_add(hash >> 6);
    hash
}

/// Type id of a named asset type.
pub fn type_id_of(type_name: &str) -> u32 {
    fast_hash(type_name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_hashes_to_zero() {
        assert_eq!(fast_hash(&[]), 0);
    }

    #[test]
    fn deterministic_and_length_sensitive() {
        assert_eq!(fast_hash(b"GameMap"), fast_hash(b"GameMap"));
        assert_ne!(fast_hash(b"GameMap"), fast_hash(b"GameMap\0"));
        assert_ne!(fast_hash(&[0]), fast_hash(&[0, 0]));
    }

    #[test]
    fn every_tail_length_is_mixed() {
        let data = b"abcdefg";
        let hashes: Vec<u32> = (1..=data.len()).map(|n| fast_hash(&data[..n])).collect();
        for (i, a) in hashes.iter().enumerate() {
            for b in &hashes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn high_tail_bytes_are_sign_extended() {
        // A sign-extended 0xFF differs from a zero-extended one, so these
        // must not collide with their 0x7F counterparts.
        assert_ne!(fast_hash(&[0xFF]), fast_hash(&[0x7F]));
        assert_ne!(fast_hash(&[1, 2, 0xFF]), fast_hash(&[1, 2, 0x7F]));
    }

    #[test]
    fn reserved_type_names_are_distinct() {
        let a = type_id_of("GameScriptList");
        let b = type_id_of("TerrainTextureAtlas");
        let c = type_id_of("GameMap");
        assert!(a != b && b != c && a != c);
    }
}
