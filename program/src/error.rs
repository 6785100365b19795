use solana_program::{
    decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError,
};
use thiserror::Error;

/// Errors that may be returned by the raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstruction,

    /// Ticket price must be positive
    #[error("Ticket price must be greater than zero")]
    ZeroTicketPrice,

    /// Ticket cap must be positive
    #[error("Max tickets must be greater than zero")]
    ZeroMaxTickets,

    /// Ticket cap above what a raffle account can hold
    #[error("Max tickets exceeds the program limit")]
    TooManyTickets,

    /// The prize is not a single non-fungible SPL token
    #[error("Prize must be an SPL token with supply 1 and 0 decimals")]
    InvalidPrizeAsset,

    /// The raffle account does not match the raffle id
    #[error("Raffle account does not match the raffle id")]
    InvalidRaffleAccount,

    /// The oracle program or provider account is not the configured one
    #[error("Invalid entropy oracle account")]
    InvalidOracle,

    /// Config was already initialized
    #[error("Config already initialized")]
    ConfigAlreadyInitialized,

    /// Raffle is not accepting this action because it is not open
    #[error("Raffle is not open")]
    RaffleNotOpen,

    /// Requested lifecycle transition is not allowed
    #[error("Invalid raffle state transition")]
    InvalidStateTransition,

    /// The raffle already left the Closing state
    #[error("Raffle randomness already finalized")]
    AlreadyFinalized,

    /// Recovery requested before the recovery delay elapsed
    #[error("Raffle recovery is not available yet")]
    RecoveryNotAvailable,

    /// Payment does not equal the ticket price
    #[error("Payment must equal the ticket price")]
    InsufficientPayment,

    /// Fee is below the oracle quote
    #[error("Fee is below the oracle quote")]
    InsufficientFee,

    /// All tickets are sold
    #[error("Raffle is full")]
    RaffleFull,

    /// No tickets were sold
    #[error("Raffle has no tickets")]
    RaffleEmpty,

    /// Depositor does not hold the prize
    #[error("Depositor does not own the prize")]
    NotOwner,

    /// Depositor did not delegate the prize to the custody authority
    #[error("Prize transfer is not approved for the custody authority")]
    NotApproved,

    /// The escrow does not hold the prize
    #[error("Prize is not in custody")]
    NotInCustody,

    /// Destination token account does not belong to the recipient
    #[error("Destination token account does not belong to the recipient")]
    WinnerAccountMismatch,

    /// Request id was never issued for this raffle
    #[error("Unknown randomness request")]
    UnknownRequest,

    /// Revealed user randomness does not match the commitment
    #[error("Revealed randomness does not match the commitment")]
    CommitmentMismatch,

    /// Signer is not allowed to perform this action
    #[error("Signer is not authorized for this action")]
    Unauthorized,

    /// Lamport or counter arithmetic overflowed
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    /// Recovery delay below `MIN_RECOVERY_DELAY`
    #[error("Recovery delay is too short")]
    InvalidRecoveryDelay,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
