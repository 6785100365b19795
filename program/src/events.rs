//! Lifecycle events, written to the program log as single `event:` lines so
//! indexers can follow a raffle without decoding account data.

use std::fmt;

use solana_program::{msg, pubkey::Pubkey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaffleEvent {
    RaffleCreated {
        raffle_id: u64,
        creator: Pubkey,
        mint: Pubkey,
        ticket_price: u64,
        max_tickets: u32,
    },
    TicketPurchased {
        raffle_id: u64,
        buyer: Pubkey,
        ticket_index: u32,
    },
    RaffleClosed {
        raffle_id: u64,
        request_id: u64,
    },
    RaffleDrawn {
        raffle_id: u64,
        winner: Pubkey,
        winner_index: u64,
        revenue: u64,
    },
    RaffleCancelled {
        raffle_id: u64,
    },
    RaffleRecovered {
        raffle_id: u64,
        by: Pubkey,
    },
    TicketsRefunded {
        raffle_id: u64,
        count: u32,
        amount: u64,
    },
}

impl RaffleEvent {
    pub fn emit(&self) {
        msg!("event: {}", self);
    }
}

impl fmt::Display for RaffleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RaffleCreated {
                raffle_id,
                creator,
                mint,
                ticket_price,
                max_tickets,
            } => write!(
                f,
                "RaffleCreated raffle_id={} creator={} mint={} ticket_price={} max_tickets={}",
                raffle_id, creator, mint, ticket_price, max_tickets
            ),
            Self::TicketPurchased {
                raffle_id,
                buyer,
                ticket_index,
            } => write!(
                f,
                "TicketPurchased raffle_id={} buyer={} ticket_index={}",
                raffle_id, buyer, ticket_index
            ),
            Self::RaffleClosed {
                raffle_id,
                request_id,
            } => write!(
                f,
                "RaffleClosed raffle_id={} request_id={}",
                raffle_id, request_id
            ),
            Self::RaffleDrawn {
                raffle_id,
                winner,
                winner_index,
                revenue,
            } => write!(
                f,
                "RaffleDrawn raffle_id={} winner={} winner_index={} revenue={}",
                raffle_id, winner, winner_index, revenue
            ),
            Self::RaffleCancelled { raffle_id } => {
                write!(f, "RaffleCancelled raffle_id={}", raffle_id)
            }
            Self::RaffleRecovered { raffle_id, by } => {
                write!(f, "RaffleRecovered raffle_id={} by={}", raffle_id, by)
            }
            Self::TicketsRefunded {
                raffle_id,
                count,
                amount,
            } => write!(
                f,
                "TicketsRefunded raffle_id={} count={} amount={}",
                raffle_id, count, amount
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_lines_are_key_value() {
        let event = RaffleEvent::RaffleClosed {
            raffle_id: 4,
            request_id: 17,
        };
        assert_eq!(event.to_string(), "RaffleClosed raffle_id=4 request_id=17");

        let buyer = Pubkey::new_unique();
        let event = RaffleEvent::TicketPurchased {
            raffle_id: 1,
            buyer,
            ticket_index: 2,
        };
        assert_eq!(
            event.to_string(),
            format!("TicketPurchased raffle_id=1 buyer={} ticket_index=2", buyer)
        );
    }
}
