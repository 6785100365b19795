//! Settlement of ticket revenue and the final state change.
//!
//! Each operation is split in a `plan_*` step that only reads the raffle and
//! an `apply_*` step run after the token and lamport transfers went through,
//! so a failed transfer leaves the raffle untouched.

use solana_program::pubkey::Pubkey;

use crate::{
    error::RaffleError,
    ledger, machine,
    state::{Raffle, RaffleState},
};

/// What a successful draw pays out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub winner: Pubkey,
    pub creator: Pubkey,
    /// Lamports owed to the creator, `tickets_sold * ticket_price`
    pub revenue: u64,
}

pub fn plan_payout(raffle: &Raffle, winner_index: u64) -> Result<Payout, RaffleError> {
    if raffle.state != RaffleState::Closing {
        return Err(RaffleError::AlreadyFinalized);
    }
    let winner = ledger::holder_at(raffle, winner_index).ok_or(RaffleError::RaffleEmpty)?;
    Ok(Payout {
        winner,
        creator: raffle.creator,
        revenue: raffle.revenue,
    })
}

/// Marks the raffle Drawn once the prize and revenue have moved
pub fn apply_payout(raffle: &mut Raffle, payout: &Payout) -> Result<(), RaffleError> {
    machine::mark_drawn(raffle, payout.winner)?;
    raffle.revenue = 0;
    Ok(())
}

/// Refunds owed to the next `limit` tickets of a recovered raffle, in ticket order
pub fn plan_refunds(raffle: &Raffle, limit: usize) -> Result<Vec<(Pubkey, u64)>, RaffleError> {
    if raffle.state != RaffleState::Cancelled {
        return Err(RaffleError::InvalidStateTransition);
    }
    Ok(raffle
        .ticket_holders
        .iter()
        .skip(raffle.refunded as usize)
        .take(limit)
        .map(|holder| (*holder, raffle.ticket_price))
        .collect())
}

pub fn apply_refunds(raffle: &mut Raffle, refunds: &[(Pubkey, u64)]) -> Result<(), RaffleError> {
    let total = refunds
        .iter()
        .try_fold(0u64, |acc, (_, amount)| acc.checked_add(*amount))
        .ok_or(RaffleError::ArithmeticOverflow)?;
    raffle.revenue = raffle
        .revenue
        .checked_sub(total)
        .ok_or(RaffleError::ArithmeticOverflow)?;
    raffle.refunded = raffle
        .refunded
        .checked_add(refunds.len() as u32)
        .ok_or(RaffleError::ArithmeticOverflow)?;
    Ok(())
}
