//! Order number generation.
//!
//! Format: `ORD-<epoch-millis>-<6-char base36 uppercase suffix>`. Uniqueness
//! is probabilistic; the storage layer carries a unique index on the column
//! and regenerates on conflict.

use chrono::{DateTime, Utc};
use uuid::Uuid;

const SUFFIX_LEN: usize = 6;
const SUFFIX_SPACE: u64 = 36u64.pow(SUFFIX_LEN as u32);
const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate an order number for the given instant.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    format!(
        "ORD-{}-{}",
        now.timestamp_millis(),
        base36_suffix(random_seed())
    )
}

/// Suffix entropy comes from the random bits of a fresh UUIDv7.
fn random_seed() -> u64 {
    let bytes = Uuid::now_v7().into_bytes();
    u64::from_be_bytes([
        bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    ])
}

fn base36_suffix(seed: u64) -> String {
    let mut value = seed % SUFFIX_SPACE;
    let mut buf = [b'0'; SUFFIX_LEN];
    for slot in buf.iter_mut().rev() {
        *slot = ALPHABET[(value % 36) as usize];
        value /= 36;
    }
    buf.iter().map(|b| *b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn format_is_prefix_millis_suffix() {
        let now = Utc::now();
        let number = generate_order_number(now);
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(
            parts[2]
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
        );
    }

    #[test]
    fn suffix_encoding_is_zero_padded() {
        assert_eq!(base36_suffix(0), "000000");
        assert_eq!(base36_suffix(35), "00000Z");
        assert_eq!(base36_suffix(36), "000010");
        assert_eq!(base36_suffix(SUFFIX_SPACE - 1), "ZZZZZZ");
        // Seeds wrap into the suffix space.
        assert_eq!(base36_suffix(SUFFIX_SPACE), "000000");
    }

    #[test]
    fn concurrent_generation_stays_within_birthday_bound() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                thread::spawn(|| {
                    (0..1250)
                        .map(|_| generate_order_number(Utc::now()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        let mut total = 0usize;
        for handle in handles {
            for number in handle.join().unwrap() {
                seen.insert(number);
                total += 1;
            }
        }

        assert_eq!(total, 10_000);
        // 10k draws over a 36^6 space spread across several milliseconds; a
        // couple of collisions is already far outside the expected range.
        assert!(total - seen.len() <= 2, "too many collisions");
    }
}
