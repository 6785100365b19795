use solana_program::pubkey::Pubkey;

use crate::{
    error::RaffleError,
    state::{Raffle, RaffleState},
};

/// Records a ticket for `buyer` and accrues `payment` into the raffle revenue.
/// Returns the index of the new ticket.
pub fn append_ticket(raffle: &mut Raffle, buyer: Pubkey, payment: u64) -> Result<u32, RaffleError> {
    if raffle.state != RaffleState::Open {
        return Err(RaffleError::RaffleNotOpen);
    }
    if raffle.tickets_sold() >= raffle.max_tickets {
        return Err(RaffleError::RaffleFull);
    }
    if payment != raffle.ticket_price {
        return Err(RaffleError::InsufficientPayment);
    }

    let revenue = raffle
        .revenue
        .checked_add(payment)
        .ok_or(RaffleError::ArithmeticOverflow)?;

    let index = raffle.tickets_sold();
    raffle.ticket_holders.push(buyer);
    raffle.revenue = revenue;
    Ok(index)
}

/// Holder of ticket `index`
pub fn holder_at(raffle: &Raffle, index: u64) -> Option<Pubkey> {
    usize::try_from(index)
        .ok()
        .and_then(|i| raffle.ticket_holders.get(i))
        .copied()
}
