//! Handshake arithmetic: challenge response, cipher multipliers and the
//! two-byte sequence seeds carried by the init reply and keep-alive pings.

use rand::Rng;

use crate::cipher::{MAX_MULTIPLE, MIN_MULTIPLE};
use crate::codecs::MAX1;

/// Exclusive upper bound for a generated sequence start
pub const SEQUENCE_START_LIMIT: u32 = 1757;

/// Answer the client's handshake challenge.
pub fn challenge_response(challenge: u32) -> u32 {
    let c = challenge as i64 + 1;
    let value = 110_905
        + (c % 9 + 1) * (11_092_004 - c).rem_euclid((c % 11 + 1) * 119) * 119
        + c % 2004;
    value as u32
}

/// Pick the decode/encode multipliers for a new session.
pub fn generate_multiples(rng: &mut impl Rng) -> (u8, u8) {
    (
        rng.gen_range(MIN_MULTIPLE..=MAX_MULTIPLE),
        rng.gen_range(MIN_MULTIPLE..=MAX_MULTIPLE),
    )
}

pub fn generate_sequence_start(rng: &mut impl Rng) -> u32 {
    rng.gen_range(0..SEQUENCE_START_LIMIT)
}

/// Split a start into the init reply's two one-byte seeds.
pub fn init_sequence_bytes(start: u32) -> (u32, u32) {
    let shifted = start.min(SEQUENCE_START_LIMIT - 1) + 13;
    (shifted / 7, shifted % 7)
}

/// Recover the start from the init reply's seeds.
pub fn sequence_start_from_init(s1: u32, s2: u32) -> u32 {
    (s1 * 7 + s2).saturating_sub(13)
}

/// Split a start into a ping's (two-byte, one-byte) seeds.
pub fn ping_sequence_bytes(start: u32, rng: &mut impl Rng) -> (u32, u32) {
    let s2 = rng.gen_range(0..MAX1 - 1);
    (start + s2, s2)
}

pub fn sequence_start_from_ping(s1: u32, s2: u32) -> u32 {
    s1.saturating_sub(s2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_challenge_response_known_values() {
        // c = 1: 110905 + 2 * (11092003 % 238) * 119 + 1
        assert_eq!(challenge_response(0), 110_905 + 2 * (11_092_003 % 238) * 119 + 1);
        assert_eq!(challenge_response(0), challenge_response(0));
        assert_ne!(challenge_response(1), challenge_response(2));
    }

    #[test]
    fn test_challenge_response_large_challenge() {
        // A challenge above 11092004 must not underflow.
        let response = challenge_response(16_000_000);
        assert!(response >= 110_905);
    }

    #[test]
    fn test_init_seeds_recover_start() {
        for start in [0, 1, 6, 7, 500, SEQUENCE_START_LIMIT - 1] {
            let (s1, s2) = init_sequence_bytes(start);
            assert!(s1 < MAX1, "seed does not fit a char for {}", start);
            assert_eq!(sequence_start_from_init(s1, s2), start);
        }
    }

    #[test]
    fn test_ping_seeds_recover_start() {
        let mut rng = StdRng::seed_from_u64(7);
        for start in [0, 42, SEQUENCE_START_LIMIT - 1] {
            let (s1, s2) = ping_sequence_bytes(start, &mut rng);
            assert_eq!(sequence_start_from_ping(s1, s2), start);
        }
    }

    #[test]
    fn test_multiples_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let (a, b) = generate_multiples(&mut rng);
            assert!((MIN_MULTIPLE..=MAX_MULTIPLE).contains(&a));
            assert!((MIN_MULTIPLE..=MAX_MULTIPLE).contains(&b));
        }
    }
}
