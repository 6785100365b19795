use crate::error::RaffleError;

/// Picks the winning ticket index: the 32 random bytes read as a big-endian
/// 256-bit integer, reduced modulo `ticket_count`.
pub fn select_winner(random_value: &[u8; 32], ticket_count: u64) -> Result<u64, RaffleError> {
    if ticket_count == 0 {
        return Err(RaffleError::RaffleEmpty);
    }

    // Horner's rule keeps every intermediate below ticket_count * 256.
    let modulus = ticket_count as u128;
    let index = random_value
        .iter()
        .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % modulus);

    Ok(index as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_from_u64(v: u64) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&v.to_be_bytes());
        bytes
    }

    #[test]
    fn small_values_reduce_directly() {
        assert_eq!(select_winner(&value_from_u64(0), 3), Ok(0));
        assert_eq!(select_winner(&value_from_u64(7), 3), Ok(1));
        assert_eq!(select_winner(&value_from_u64(1_000_001), 1_000), Ok(1));
    }

    #[test]
    fn uses_all_256_bits() {
        // 2^248 mod 3 == 1 since 2^2 == 1 (mod 3)
        let mut high_bit = [0u8; 32];
        high_bit[0] = 1;
        assert_eq!(select_winner(&high_bit, 3), Ok(1));

        // 2^256 - 1 is divisible by 3 and by 5
        let max = [0xffu8; 32];
        assert_eq!(select_winner(&max, 3), Ok(0));
        assert_eq!(select_winner(&max, 5), Ok(0));
    }

    #[test]
    fn is_deterministic() {
        let random = [0x5au8; 32];
        let first = select_winner(&random, 17).unwrap();
        for _ in 0..10 {
            assert_eq!(select_winner(&random, 17).unwrap(), first);
        }
        assert!(first < 17);
    }

    #[test]
    fn single_ticket_always_wins() {
        assert_eq!(select_winner(&[0xabu8; 32], 1), Ok(0));
    }

    #[test]
    fn empty_raffle_has_no_winner() {
        assert_eq!(select_winner(&[1u8; 32], 0), Err(RaffleError::RaffleEmpty));
    }
}
