// NFT Raffle Program
// Escrows one non-fungible prize, sells fixed-price tickets and draws the
// winner from commit-reveal randomness delivered by an entropy oracle.

pub mod error;
pub mod escrow;
pub mod events;
pub mod instruction;
pub mod ledger;
pub mod machine;
pub mod oracle;
pub mod payout;
pub mod processor;
pub mod randomness;
pub mod selector;
pub mod state;
pub mod utils;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

/// Instruction handler, also used to register the program in tests
pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
