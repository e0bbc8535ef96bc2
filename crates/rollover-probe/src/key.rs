//! Probe key selection.
//!
//! A shard's `[start, end)` range is split into [`PARTITIONS`] equal parts
//! and the probe reads the boundary of a randomly chosen part. Keys are
//! compared as big-endian numbers over the first 8 bytes after the common
//! prefix of `start` and `end`, which is enough resolution for any range
//! that holds more than one row.

use rand::Rng;
use rollover_types::ShardDescriptor;

/// Number of equal partitions a shard range is split into.
pub const PARTITIONS: u32 = 16;

const WINDOW: usize = 8;

/// Pick a pseudo-random key inside `shard`'s range.
pub fn random_key<R: Rng>(shard: &ShardDescriptor, rng: &mut R) -> Vec<u8> {
    partition_key(
        &shard.start_key,
        &shard.end_key,
        rng.random_range(0..PARTITIONS),
    )
}

/// The start of partition `index` (of [`PARTITIONS`]) of `[start, end)`.
///
/// An empty `end` means the range is unbounded above. The result always
/// satisfies `start <= key` and, for a bounded range, `key < end`.
pub fn partition_key(start: &[u8], end: &[u8], index: u32) -> Vec<u8> {
    let index = index.min(PARTITIONS - 1);
    let common = start
        .iter()
        .zip(end)
        .take_while(|(a, b)| a == b)
        .count();

    let lo = u128::from(window(&start[common..]));
    let hi = if end.is_empty() {
        1u128 << 64
    } else {
        u128::from(window(&end[common..]))
    };
    if hi <= lo {
        return start.to_vec();
    }

    let offset = (hi - lo) * u128::from(index) / u128::from(PARTITIONS);
    if offset == 0 {
        return start.to_vec();
    }

    // lo + offset < hi <= 2^64
    let value = (lo + offset) as u64;
    let bytes = value.to_be_bytes();
    let len = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);

    let mut key = Vec::with_capacity(common + len);
    key.extend_from_slice(&start[..common]);
    key.extend_from_slice(&bytes[..len]);
    key
}

/// First [`WINDOW`] bytes as a big-endian number, zero padded.
fn window(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; WINDOW];
    let n = bytes.len().min(WINDOW);
    buf[..n].copy_from_slice(&bytes[..n]);
    u64::from_be_bytes(buf)
}
