//! Commit-reveal exchange with the entropy oracle, seen from one raffle.
//!
//! Closing a raffle commits `keccak(user_randomness)` before the provider's
//! randomness exists. The delivery must reveal the matching user randomness,
//! and the final value mixes both sides so neither could choose it alone.

use solana_program::{clock::UnixTimestamp, keccak};

use crate::{
    error::RaffleError,
    machine,
    state::{OracleRequest, Raffle, RaffleState},
};

/// Commitment a requester submits for its secret randomness
pub fn commitment_for(user_randomness: &[u8; 32]) -> [u8; 32] {
    keccak::hash(user_randomness).to_bytes()
}

/// Final randomness derived from both revealed halves
pub fn combine(user_randomness: &[u8; 32], provider_randomness: &[u8; 32]) -> [u8; 32] {
    keccak::hashv(&[&user_randomness[..], &provider_randomness[..]]).to_bytes()
}

/// Guards checked before any fee leaves the requester
pub fn check_request(raffle: &Raffle, fee: u64, quoted_fee: u64) -> Result<(), RaffleError> {
    if raffle.state != RaffleState::Open {
        return Err(RaffleError::RaffleNotOpen);
    }
    if raffle.ticket_holders.is_empty() {
        return Err(RaffleError::RaffleEmpty);
    }
    if fee < quoted_fee {
        return Err(RaffleError::InsufficientFee);
    }
    Ok(())
}

/// Stores the submitted request and moves the raffle to Closing
pub fn record_request(
    raffle: &mut Raffle,
    request: &OracleRequest,
    now: UnixTimestamp,
    recovery_delay: i64,
) -> Result<(), RaffleError> {
    machine::close(raffle, request, now, recovery_delay)
}

/// Validates an oracle delivery and returns the final randomness.
/// Does not touch the raffle; finalization happens in the payout.
pub fn accept_delivery(
    raffle: &Raffle,
    request_id: u64,
    user_randomness: &[u8; 32],
    provider_randomness: &[u8; 32],
) -> Result<[u8; 32], RaffleError> {
    if raffle.request_id != Some(request_id) {
        return Err(RaffleError::UnknownRequest);
    }
    if raffle.state != RaffleState::Closing {
        return Err(RaffleError::AlreadyFinalized);
    }
    if commitment_for(user_randomness) != raffle.commitment {
        return Err(RaffleError::CommitmentMismatch);
    }
    Ok(combine(user_randomness, provider_randomness))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AssetRef, MIN_RECOVERY_DELAY};
    use solana_program::pubkey::Pubkey;

    const USER: [u8; 32] = [0x11; 32];
    const PROVIDER: [u8; 32] = [0x22; 32];

    fn raffle_with_tickets(tickets: usize) -> Raffle {
        let prize = AssetRef {
            token_program: spl_token::id(),
            mint: Pubkey::new_unique(),
        };
        let mut raffle = Raffle::new(1, 255, Pubkey::new_unique(), prize, 10, 5).unwrap();
        for _ in 0..tickets {
            crate::ledger::append_ticket(&mut raffle, Pubkey::new_unique(), 10).unwrap();
        }
        raffle
    }

    fn closing_raffle(request_id: u64) -> Raffle {
        let mut raffle = raffle_with_tickets(2);
        let request = OracleRequest {
            id: request_id,
            program: Pubkey::new_unique(),
            provider: Pubkey::new_unique(),
            commitment: commitment_for(&USER),
        };
        record_request(&mut raffle, &request, 0, MIN_RECOVERY_DELAY).unwrap();
        raffle
    }

    #[test]
    fn request_guards_in_order() {
        let empty = raffle_with_tickets(0);
        assert_eq!(check_request(&empty, 100, 100), Err(RaffleError::RaffleEmpty));

        let sold = raffle_with_tickets(1);
        assert_eq!(check_request(&sold, 99, 100), Err(RaffleError::InsufficientFee));
        assert_eq!(check_request(&sold, 100, 100), Ok(()));
        assert_eq!(check_request(&sold, 150, 100), Ok(()));

        let closing = closing_raffle(1);
        assert_eq!(check_request(&closing, 100, 100), Err(RaffleError::RaffleNotOpen));
    }

    #[test]
    fn delivery_for_pending_request() {
        let raffle = closing_raffle(8);
        assert_eq!(
            accept_delivery(&raffle, 8, &USER, &PROVIDER),
            Ok(combine(&USER, &PROVIDER))
        );
    }

    #[test]
    fn delivery_with_wrong_request_id_fails() {
        let raffle = closing_raffle(8);
        assert_eq!(
            accept_delivery(&raffle, 9, &USER, &PROVIDER),
            Err(RaffleError::UnknownRequest)
        );
        assert_eq!(
            accept_delivery(&raffle_with_tickets(1), 8, &USER, &PROVIDER),
            Err(RaffleError::UnknownRequest)
        );
    }

    #[test]
    fn delivery_after_finalization_fails() {
        let mut raffle = closing_raffle(3);
        let winner = raffle.ticket_holders()[0];
        machine::mark_drawn(&mut raffle, winner).unwrap();
        assert_eq!(
            accept_delivery(&raffle, 3, &USER, &PROVIDER),
            Err(RaffleError::AlreadyFinalized)
        );
    }

    #[test]
    fn reveal_must_match_commitment() {
        let raffle = closing_raffle(1);
        assert_eq!(
            accept_delivery(&raffle, 1, &[0x12; 32], &PROVIDER),
            Err(RaffleError::CommitmentMismatch)
        );
    }

    #[test]
    fn combination_depends_on_both_sides() {
        let base = combine(&USER, &PROVIDER);
        assert_ne!(base, combine(&[0x12; 32], &PROVIDER));
        assert_ne!(base, combine(&USER, &[0x23; 32]));
        assert_ne!(base, combine(&PROVIDER, &USER));
        assert_eq!(base, combine(&USER, &PROVIDER));
    }
}
