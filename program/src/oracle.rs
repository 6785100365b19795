//! Interface to the external entropy oracle.
//!
//! The oracle keeps one provider account per randomness provider. A request
//! pays the provider's fee and bumps its sequence number, which becomes the
//! request id. The oracle later delivers `(request_id, user_randomness,
//! provider_randomness)` by sending `DrawRaffle` signed by the provider's
//! callback authority.

use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::invoke,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
    system_program,
};

use crate::error::RaffleError;

/// Provider account data, owned by the oracle program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntropyProvider {
    pub is_initialized: bool,
    /// Signs the randomness callbacks
    pub authority: Pubkey,
    /// Lamports charged per request
    pub fee: u64,
    /// Id of the most recent request
    pub sequence_number: u64,
}

impl Sealed for EntropyProvider {}

impl IsInitialized for EntropyProvider {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for EntropyProvider {
    const LEN: usize = 1 + 32 + 8 + 8;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, EntropyProvider::LEN];
        let (is_initialized, authority, fee, sequence_number) = array_refs![src, 1, 32, 8, 8];

        Ok(EntropyProvider {
            is_initialized: is_initialized[0] != 0,
            authority: Pubkey::new_from_array(*authority),
            fee: u64::from_le_bytes(*fee),
            sequence_number: u64::from_le_bytes(*sequence_number),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, EntropyProvider::LEN];
        let (is_initialized_dst, authority_dst, fee_dst, sequence_number_dst) =
            mut_array_refs![dst, 1, 32, 8, 8];

        is_initialized_dst[0] = self.is_initialized as u8;
        authority_dst.copy_from_slice(self.authority.as_ref());
        *fee_dst = self.fee.to_le_bytes();
        *sequence_number_dst = self.sequence_number.to_le_bytes();
    }
}

/// Instructions understood by the oracle program
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum EntropyInstruction {
    /// Request randomness against a provider
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Payer of the fee
    /// 1. `[writable]` Provider account
    /// 2. `[]` The system program
    Request {
        /// Hash of the requester's secret randomness
        commitment: [u8; 32],
        /// Fee offered, at least the provider's quote
        fee: u64,
    },
}

/// Create an oracle request instruction
pub fn request(
    entropy_program: &Pubkey,
    payer: &Pubkey,
    provider: &Pubkey,
    commitment: [u8; 32],
    fee: u64,
) -> Result<Instruction, ProgramError> {
    let data = borsh::to_vec(&EntropyInstruction::Request { commitment, fee })?;

    Ok(Instruction {
        program_id: *entropy_program,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(*provider, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    })
}

/// Reads a provider account, checking it belongs to the oracle program
pub fn load_provider(
    provider_info: &AccountInfo,
    entropy_program: &Pubkey,
) -> Result<EntropyProvider, ProgramError> {
    if provider_info.owner != entropy_program {
        msg!("Provider account is not owned by the entropy program");
        return Err(RaffleError::InvalidOracle.into());
    }
    EntropyProvider::unpack(&provider_info.data.borrow())
        .map_err(|_| RaffleError::InvalidOracle.into())
}

/// Fee the provider currently charges per request
pub fn quote_fee(provider_info: &AccountInfo, entropy_program: &Pubkey) -> Result<u64, ProgramError> {
    Ok(load_provider(provider_info, entropy_program)?.fee)
}

/// Submits the commitment and fee to the oracle and returns the request id
pub fn submit_request<'a>(
    entropy_program_info: &AccountInfo<'a>,
    payer_info: &AccountInfo<'a>,
    provider_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    commitment: [u8; 32],
    fee: u64,
) -> Result<u64, ProgramError> {
    let before = load_provider(provider_info, entropy_program_info.key)?.sequence_number;

    invoke(
        &request(
            entropy_program_info.key,
            payer_info.key,
            provider_info.key,
            commitment,
            fee,
        )?,
        &[
            payer_info.clone(),
            provider_info.clone(),
            system_program_info.clone(),
            entropy_program_info.clone(),
        ],
    )?;

    let request_id = load_provider(provider_info, entropy_program_info.key)?.sequence_number;
    if request_id <= before {
        msg!("Entropy oracle did not assign a new sequence number");
        return Err(RaffleError::InvalidOracle.into());
    }
    Ok(request_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_layout_round_trip() {
        let provider = EntropyProvider {
            is_initialized: true,
            authority: Pubkey::new_unique(),
            fee: 1_500,
            sequence_number: 42,
        };
        let mut buf = [0u8; EntropyProvider::LEN];
        EntropyProvider::pack(provider, &mut buf).unwrap();
        assert_eq!(EntropyProvider::unpack(&buf).unwrap(), provider);
    }

    #[test]
    fn request_instruction_encodes_commitment_and_fee() {
        let program = Pubkey::new_unique();
        let payer = Pubkey::new_unique();
        let provider = Pubkey::new_unique();
        let ix = request(&program, &payer, &provider, [7u8; 32], 99).unwrap();

        assert_eq!(ix.program_id, program);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[1].pubkey, provider);
        assert_eq!(
            EntropyInstruction::try_from_slice(&ix.data).unwrap(),
            EntropyInstruction::Request {
                commitment: [7u8; 32],
                fee: 99
            }
        );
    }
}
