use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};

use crate::error::RaffleError;

/// Largest ticket cap. A raffle account is allocated through a CPI, which
/// caps it at 10 KiB.
pub const MAX_TICKETS: u32 = 300;

/// Shortest wait, in seconds, before a Closing raffle may be recovered
pub const MIN_RECOVERY_DELAY: i64 = 60;

pub fn check_recovery_delay(recovery_delay: i64) -> Result<(), RaffleError> {
    if recovery_delay < MIN_RECOVERY_DELAY {
        return Err(RaffleError::InvalidRecoveryDelay);
    }
    Ok(())
}

/// Lifecycle of a raffle
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaffleState {
    /// Prize escrowed, tickets on sale
    Open,
    /// Randomness requested, waiting for the oracle callback
    Closing,
    /// Winner drawn and paid out
    Drawn,
    /// Prize returned to the creator
    Cancelled,
}

impl RaffleState {
    /// Terminal raffles are kept as immutable history
    pub fn is_terminal(self) -> bool {
        matches!(self, RaffleState::Drawn | RaffleState::Cancelled)
    }
}

/// A randomness request as submitted to the entropy oracle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OracleRequest {
    /// Id assigned by the oracle
    pub id: u64,
    /// Oracle program the request went to
    pub program: Pubkey,
    /// Provider account that will answer
    pub provider: Pubkey,
    /// keccak256 of the requester's secret randomness
    pub commitment: [u8; 32],
}

/// Identifies the prize: the token program that owns it and its mint
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetRef {
    pub token_program: Pubkey,
    pub mint: Pubkey,
}

/// Raffle account data
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Sequential id (1, 2, 3, ...), also the PDA seed
    pub id: u64,
    /// Bump of the raffle PDA
    pub bump: u8,
    /// Opened the raffle and receives the proceeds
    pub creator: Pubkey,
    /// The escrowed prize
    pub prize: AssetRef,
    /// Price per ticket in lamports
    pub ticket_price: u64,
    /// Ticket cap
    pub max_tickets: u32,
    pub(crate) state: RaffleState,
    pub(crate) request_id: Option<u64>,
    pub(crate) oracle_program: Pubkey,
    pub(crate) oracle_provider: Pubkey,
    pub(crate) commitment: [u8; 32],
    pub(crate) closed_at: Option<UnixTimestamp>,
    pub(crate) recover_after: Option<UnixTimestamp>,
    pub(crate) revenue: u64,
    pub(crate) winner: Option<Pubkey>,
    pub(crate) refunded: u32,
    pub(crate) ticket_holders: Vec<Pubkey>,
}

impl Raffle {
    /// Serialized size without any ticket holder
    pub const BASE_LEN: usize = 1 // is_initialized
        + 8 // id
        + 1 // bump
        + 32 // creator
        + 32 + 32 // prize
        + 8 // ticket_price
        + 4 // max_tickets
        + 1 // state
        + (1 + 8) // request_id
        + 32 // oracle_program
        + 32 // oracle_provider
        + 32 // commitment
        + (1 + 8) // closed_at
        + (1 + 8) // recover_after
        + 8 // revenue
        + (1 + 32) // winner
        + 4 // refunded
        + 4; // ticket_holders length prefix

    /// Account size needed to hold `max_tickets` holders
    pub fn space(max_tickets: u32) -> usize {
        Self::BASE_LEN + 32 * max_tickets as usize
    }

    pub fn new(
        id: u64,
        bump: u8,
        creator: Pubkey,
        prize: AssetRef,
        ticket_price: u64,
        max_tickets: u32,
    ) -> Result<Self, RaffleError> {
        if ticket_price == 0 {
            return Err(RaffleError::ZeroTicketPrice);
        }
        if max_tickets == 0 {
            return Err(RaffleError::ZeroMaxTickets);
        }
        if max_tickets > MAX_TICKETS {
            return Err(RaffleError::TooManyTickets);
        }

        Ok(Self {
            is_initialized: true,
            id,
            bump,
            creator,
            prize,
            ticket_price,
            max_tickets,
            state: RaffleState::Open,
            request_id: None,
            oracle_program: Pubkey::default(),
            oracle_provider: Pubkey::default(),
            commitment: [0u8; 32],
            closed_at: None,
            recover_after: None,
            revenue: 0,
            winner: None,
            refunded: 0,
            ticket_holders: Vec::with_capacity(max_tickets as usize),
        })
    }

    /// Decodes raffle account data, ignoring the unused tail of the allocation
    pub fn unpack_account(data: &[u8]) -> Result<Self, ProgramError> {
        let raffle = Self::deserialize(&mut &data[..])?;
        if !raffle.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(raffle)
    }

    /// Loads a raffle owned by this program
    pub fn load(account: &AccountInfo, program_id: &Pubkey) -> Result<Self, ProgramError> {
        if account.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        Self::unpack_account(&account.data.borrow())
    }

    pub fn save(&self, account: &AccountInfo) -> Result<(), ProgramError> {
        let mut data = account.data.borrow_mut();
        let mut dst: &mut [u8] = &mut data;
        self.serialize(&mut dst)?;
        Ok(())
    }

    pub fn state(&self) -> RaffleState {
        self.state
    }

    pub fn tickets_sold(&self) -> u32 {
        self.ticket_holders.len() as u32
    }

    pub fn ticket_holders(&self) -> &[Pubkey] {
        &self.ticket_holders
    }

    /// Number of tickets bought by `buyer`
    pub fn tickets_held_by(&self, buyer: &Pubkey) -> usize {
        self.ticket_holders.iter().filter(|h| *h == buyer).count()
    }

    /// The outstanding oracle request, only while Closing
    pub fn pending_request_id(&self) -> Option<u64> {
        match self.state {
            RaffleState::Closing => self.request_id,
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<u64> {
        self.request_id
    }

    /// Oracle program the pending request was sent to
    pub fn oracle_program(&self) -> &Pubkey {
        &self.oracle_program
    }

    pub fn oracle_provider(&self) -> &Pubkey {
        &self.oracle_provider
    }

    pub fn commitment(&self) -> &[u8; 32] {
        &self.commitment
    }

    pub fn closed_at(&self) -> Option<UnixTimestamp> {
        self.closed_at
    }

    /// Earliest time a Closing raffle can be recovered, fixed when it closed
    pub fn recover_after(&self) -> Option<UnixTimestamp> {
        self.recover_after
    }

    /// Lamports currently escrowed as ticket revenue
    pub fn revenue(&self) -> u64 {
        self.revenue
    }

    pub fn winner(&self) -> Option<Pubkey> {
        self.winner
    }

    /// Tickets already refunded after a recovery
    pub fn refunded(&self) -> u32 {
        self.refunded
    }
}

/// Program configuration account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Admin authority that can update config and recover stalled raffles
    pub admin: Pubkey,
    /// Entropy oracle program
    pub entropy_program: Pubkey,
    /// Entropy provider account used for new requests
    pub entropy_provider: Pubkey,
    /// Seconds a raffle must stay in Closing before it can be recovered
    pub recovery_delay: i64,
    /// Counter for sequential raffle ids
    pub next_raffle_id: u64,
}

impl Config {
    /// Number of raffles created so far
    pub fn raffle_count(&self) -> u64 {
        self.next_raffle_id.saturating_sub(1)
    }
}

impl Sealed for Config {}

impl IsInitialized for Config {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Config {
    const LEN: usize = 1 + 32 + 32 + 32 + 8 + 8;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Config::LEN];
        let (is_initialized, admin, entropy_program, entropy_provider, recovery_delay, next_raffle_id) =
            array_refs![src, 1, 32, 32, 32, 8, 8];

        Ok(Config {
            is_initialized: is_initialized[0] != 0,
            admin: Pubkey::new_from_array(*admin),
            entropy_program: Pubkey::new_from_array(*entropy_program),
            entropy_provider: Pubkey::new_from_array(*entropy_provider),
            recovery_delay: i64::from_le_bytes(*recovery_delay),
            next_raffle_id: u64::from_le_bytes(*next_raffle_id),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Config::LEN];
        let (
            is_initialized_dst,
            admin_dst,
            entropy_program_dst,
            entropy_provider_dst,
            recovery_delay_dst,
            next_raffle_id_dst,
        ) = mut_array_refs![dst, 1, 32, 32, 32, 8, 8];

        is_initialized_dst[0] = self.is_initialized as u8;
        admin_dst.copy_from_slice(self.admin.as_ref());
        entropy_program_dst.copy_from_slice(self.entropy_program.as_ref());
        entropy_provider_dst.copy_from_slice(self.entropy_provider.as_ref());
        *recovery_delay_dst = self.recovery_delay.to_le_bytes();
        *next_raffle_id_dst = self.next_raffle_id.to_le_bytes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prize() -> AssetRef {
        AssetRef {
            token_program: spl_token::id(),
            mint: Pubkey::new_unique(),
        }
    }

    #[test]
    fn new_raffle_rejects_bad_parameters() {
        let creator = Pubkey::new_unique();
        assert_eq!(
            Raffle::new(1, 255, creator, prize(), 0, 3),
            Err(RaffleError::ZeroTicketPrice)
        );
        assert_eq!(
            Raffle::new(1, 255, creator, prize(), 10, 0),
            Err(RaffleError::ZeroMaxTickets)
        );
        assert_eq!(
            Raffle::new(1, 255, creator, prize(), 10, MAX_TICKETS + 1),
            Err(RaffleError::TooManyTickets)
        );
    }

    #[test]
    fn full_raffle_fits_its_allocation() {
        let mut raffle = Raffle::new(7, 254, Pubkey::new_unique(), prize(), 10, 3).unwrap();
        raffle.ticket_holders = vec![Pubkey::new_unique(); 3];
        raffle.request_id = Some(9);
        raffle.closed_at = Some(1_700_000_000);
        raffle.recover_after = Some(1_700_003_600);
        raffle.winner = Some(Pubkey::new_unique());

        let bytes = borsh::to_vec(&raffle).unwrap();
        assert_eq!(bytes.len(), Raffle::space(3));

        let mut data = vec![0u8; Raffle::space(3)];
        data[..bytes.len()].copy_from_slice(&bytes);
        assert_eq!(Raffle::unpack_account(&data).unwrap(), raffle);
    }

    #[test]
    fn largest_raffle_fits_cpi_allocation() {
        assert!(Raffle::space(MAX_TICKETS) <= 10_240);
    }

    #[test]
    fn partially_filled_account_decodes() {
        let mut raffle = Raffle::new(1, 250, Pubkey::new_unique(), prize(), 10, 5).unwrap();
        raffle.ticket_holders.push(Pubkey::new_unique());

        let mut data = vec![0u8; Raffle::space(5)];
        let bytes = borsh::to_vec(&raffle).unwrap();
        data[..bytes.len()].copy_from_slice(&bytes);

        let decoded = Raffle::unpack_account(&data).unwrap();
        assert_eq!(decoded.tickets_sold(), 1);
        assert_eq!(decoded.state(), RaffleState::Open);
        assert_eq!(decoded.pending_request_id(), None);
    }

    #[test]
    fn uninitialized_account_is_rejected() {
        let data = vec![0u8; Raffle::space(1)];
        assert_eq!(
            Raffle::unpack_account(&data),
            Err(ProgramError::UninitializedAccount)
        );
    }

    #[test]
    fn recovery_delay_has_a_floor() {
        assert_eq!(check_recovery_delay(0), Err(RaffleError::InvalidRecoveryDelay));
        assert_eq!(check_recovery_delay(-5), Err(RaffleError::InvalidRecoveryDelay));
        assert_eq!(
            check_recovery_delay(MIN_RECOVERY_DELAY - 1),
            Err(RaffleError::InvalidRecoveryDelay)
        );
        assert_eq!(check_recovery_delay(MIN_RECOVERY_DELAY), Ok(()));
    }

    #[test]
    fn config_pack_round_trip() {
        let config = Config {
            is_initialized: true,
            admin: Pubkey::new_unique(),
            entropy_program: Pubkey::new_unique(),
            entropy_provider: Pubkey::new_unique(),
            recovery_delay: 86_400,
            next_raffle_id: 4,
        };
        let mut buf = [0u8; Config::LEN];
        Config::pack(config, &mut buf).unwrap();
        let unpacked = Config::unpack(&buf).unwrap();
        assert_eq!(unpacked, config);
        assert_eq!(unpacked.raffle_count(), 3);
    }
}
