//! Raffle lifecycle. Every write to `Raffle::state` goes through here.
//!
//! ```text
//! Open ──close──▶ Closing ──draw──▶ Drawn
//!   │                │
//!   └─cancel─▶ Cancelled ◀─recover─┘
//! ```

use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::{
    error::RaffleError,
    state::{check_recovery_delay, OracleRequest, Raffle, RaffleState},
};

/// Whether the edge `from -> to` exists at all; guards are checked separately
pub fn can_transition(from: RaffleState, to: RaffleState) -> bool {
    use RaffleState::*;
    if from.is_terminal() {
        return false;
    }
    matches!(
        (from, to),
        (Open, Closing) | (Closing, Drawn) | (Open, Cancelled) | (Closing, Cancelled)
    )
}

fn transition(raffle: &mut Raffle, to: RaffleState) -> Result<(), RaffleError> {
    if !can_transition(raffle.state, to) {
        return Err(RaffleError::InvalidStateTransition);
    }
    raffle.state = to;
    Ok(())
}

/// Open -> Closing, recording the outstanding oracle request and the time
/// from which the raffle may be recovered if the oracle stays silent
pub fn close(
    raffle: &mut Raffle,
    request: &OracleRequest,
    now: UnixTimestamp,
    recovery_delay: i64,
) -> Result<(), RaffleError> {
    if raffle.ticket_holders.is_empty() {
        return Err(RaffleError::RaffleEmpty);
    }
    check_recovery_delay(recovery_delay)?;
    let recover_after = now
        .checked_add(recovery_delay)
        .ok_or(RaffleError::ArithmeticOverflow)?;

    transition(raffle, RaffleState::Closing)?;
    raffle.request_id = Some(request.id);
    raffle.oracle_program = request.program;
    raffle.oracle_provider = request.provider;
    raffle.commitment = request.commitment;
    raffle.closed_at = Some(now);
    raffle.recover_after = Some(recover_after);
    Ok(())
}

/// Closing -> Drawn
pub fn mark_drawn(raffle: &mut Raffle, winner: Pubkey) -> Result<(), RaffleError> {
    transition(raffle, RaffleState::Drawn)?;
    raffle.winner = Some(winner);
    Ok(())
}

/// Open -> Cancelled, only before any ticket was sold
pub fn cancel(raffle: &mut Raffle) -> Result<(), RaffleError> {
    if raffle.state != RaffleState::Open || !raffle.ticket_holders.is_empty() {
        return Err(RaffleError::InvalidStateTransition);
    }
    transition(raffle, RaffleState::Cancelled)
}

/// Closing -> Cancelled once the deadline recorded at close has passed
pub fn recover(raffle: &mut Raffle, now: UnixTimestamp) -> Result<(), RaffleError> {
    if raffle.state != RaffleState::Closing {
        return Err(RaffleError::InvalidStateTransition);
    }
    let available_at = raffle
        .recover_after
        .ok_or(RaffleError::InvalidStateTransition)?;
    if now < available_at {
        return Err(RaffleError::RecoveryNotAvailable);
    }
    transition(raffle, RaffleState::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AssetRef, MIN_RECOVERY_DELAY};

    const DELAY: i64 = 3_600;

    fn request(id: u64) -> OracleRequest {
        OracleRequest {
            id,
            program: Pubkey::new_unique(),
            provider: Pubkey::new_unique(),
            commitment: [0u8; 32],
        }
    }

    fn open_raffle(tickets: usize) -> Raffle {
        let prize = AssetRef {
            token_program: spl_token::id(),
            mint: Pubkey::new_unique(),
        };
        let mut raffle = Raffle::new(1, 255, Pubkey::new_unique(), prize, 100, 5).unwrap();
        raffle.ticket_holders = (0..tickets).map(|_| Pubkey::new_unique()).collect();
        raffle
    }

    #[test]
    fn transition_table() {
        use RaffleState::*;
        let all = [Open, Closing, Drawn, Cancelled];
        let allowed = [
            (Open, Closing),
            (Closing, Drawn),
            (Open, Cancelled),
            (Closing, Cancelled),
        ];
        for from in all {
            for to in all {
                assert_eq!(can_transition(from, to), allowed.contains(&(from, to)));
            }
            if from.is_terminal() {
                assert!(all.iter().all(|to| !can_transition(from, *to)));
            }
        }
    }

    #[test]
    fn close_sets_pending_request() {
        let mut raffle = open_raffle(2);
        let request = OracleRequest {
            commitment: [3u8; 32],
            ..request(11)
        };
        close(&mut raffle, &request, 1_000, DELAY).unwrap();

        assert_eq!(raffle.state(), RaffleState::Closing);
        assert_eq!(raffle.pending_request_id(), Some(11));
        assert_eq!(raffle.oracle_program(), &request.program);
        assert_eq!(raffle.oracle_provider(), &request.provider);
        assert_eq!(raffle.commitment(), &[3u8; 32]);
        assert_eq!(raffle.closed_at(), Some(1_000));
        assert_eq!(raffle.recover_after(), Some(1_000 + DELAY));
    }

    #[test]
    fn close_twice_fails() {
        let mut raffle = open_raffle(1);
        close(&mut raffle, &request(1), 0, DELAY).unwrap();
        assert_eq!(
            close(&mut raffle, &request(2), 0, DELAY),
            Err(RaffleError::InvalidStateTransition)
        );
        assert_eq!(raffle.pending_request_id(), Some(1));
    }

    #[test]
    fn empty_raffle_cannot_close() {
        let mut raffle = open_raffle(0);
        assert_eq!(
            close(&mut raffle, &request(1), 0, DELAY),
            Err(RaffleError::RaffleEmpty)
        );
        assert_eq!(raffle.state(), RaffleState::Open);
    }

    #[test]
    fn close_rejects_short_recovery_delay() {
        let mut raffle = open_raffle(1);
        assert_eq!(
            close(&mut raffle, &request(1), 0, 0),
            Err(RaffleError::InvalidRecoveryDelay)
        );
        assert_eq!(raffle.state(), RaffleState::Open);
        assert_eq!(raffle.recover_after(), None);
    }

    #[test]
    fn drawn_clears_pending_request() {
        let mut raffle = open_raffle(1);
        let winner = raffle.ticket_holders[0];
        close(&mut raffle, &request(5), 0, DELAY).unwrap();
        mark_drawn(&mut raffle, winner).unwrap();

        assert_eq!(raffle.state(), RaffleState::Drawn);
        assert_eq!(raffle.pending_request_id(), None);
        assert_eq!(raffle.request_id(), Some(5));
        assert_eq!(raffle.winner(), Some(winner));
        assert_eq!(
            mark_drawn(&mut raffle, winner),
            Err(RaffleError::InvalidStateTransition)
        );
    }

    #[test]
    fn cancel_requires_open_and_empty() {
        let mut empty = open_raffle(0);
        cancel(&mut empty).unwrap();
        assert_eq!(empty.state(), RaffleState::Cancelled);
        assert_eq!(cancel(&mut empty), Err(RaffleError::InvalidStateTransition));

        let mut sold = open_raffle(1);
        assert_eq!(cancel(&mut sold), Err(RaffleError::InvalidStateTransition));
        assert_eq!(sold.state(), RaffleState::Open);
    }

    #[test]
    fn recover_waits_for_delay() {
        let mut raffle = open_raffle(1);
        close(&mut raffle, &request(1), 100, MIN_RECOVERY_DELAY).unwrap();

        assert_eq!(recover(&mut raffle, 100), Err(RaffleError::RecoveryNotAvailable));
        assert_eq!(
            recover(&mut raffle, 99 + MIN_RECOVERY_DELAY),
            Err(RaffleError::RecoveryNotAvailable)
        );
        assert_eq!(raffle.state(), RaffleState::Closing);

        recover(&mut raffle, 100 + MIN_RECOVERY_DELAY).unwrap();
        assert_eq!(raffle.state(), RaffleState::Cancelled);
        assert_eq!(raffle.pending_request_id(), None);
    }

    #[test]
    fn recover_only_from_closing() {
        let mut raffle = open_raffle(1);
        assert_eq!(
            recover(&mut raffle, i64::MAX),
            Err(RaffleError::InvalidStateTransition)
        );

        let winner = raffle.ticket_holders[0];
        close(&mut raffle, &request(1), 0, DELAY).unwrap();
        mark_drawn(&mut raffle, winner).unwrap();
        assert_eq!(
            recover(&mut raffle, i64::MAX),
            Err(RaffleError::InvalidStateTransition)
        );
    }
}
