use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{
    error::RaffleError,
    utils::{find_config_address, find_custody_authority, find_escrow_address, find_raffle_address},
};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleInstruction {
    /// Initialize the program config
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The admin, pays for the config account
    /// 1. `[writable]` The config account (PDA)
    /// 2. `[]` The entropy oracle program
    /// 3. `[]` The entropy provider account
    /// 4. `[]` The system program
    InitializeConfig {
        /// Seconds a Closing raffle waits for its randomness before it can be recovered
        recovery_delay: i64,
    },

    /// Update the config (admin only)
    ///
    /// Accounts expected:
    /// 0. `[signer]` Current admin
    /// 1. `[writable]` Config account
    /// 2. `[]` New admin
    /// 3. `[]` Entropy oracle program
    /// 4. `[]` Entropy provider account
    UpdateConfig { recovery_delay: i64 },

    /// Open a raffle, taking the prize into custody
    ///
    /// The creator must first approve the custody authority as delegate of
    /// the token account holding the prize.
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The creator, pays for the raffle and escrow accounts
    /// 1. `[writable]` Config account
    /// 2. `[writable]` The raffle account (PDA for the next raffle id)
    /// 3. `[]` Prize mint
    /// 4. `[writable]` Creator's token account holding the prize
    /// 5. `[writable]` Escrow token account (raffle's associated token account)
    /// 6. `[]` Custody authority (PDA)
    /// 7. `[]` The token program
    /// 8. `[]` The associated token account program
    /// 9. `[]` The system program
    CreateRaffle {
        /// Price per ticket in lamports
        ticket_price: u64,
        max_tickets: u32,
    },

    /// Buy one ticket
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The buyer
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    PurchaseTicket {
        raffle_id: u64,
        /// Lamports paid, must equal the ticket price
        payment: u64,
    },

    /// Stop ticket sales and request randomness (creator only)
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The creator, pays the oracle fee
    /// 1. `[]` Config account
    /// 2. `[writable]` The raffle account
    /// 3. `[]` The entropy oracle program
    /// 4. `[writable]` The entropy provider account
    /// 5. `[]` The system program
    CloseRaffle {
        raffle_id: u64,
        /// keccak256 of the creator's secret randomness
        commitment: [u8; 32],
        /// Fee offered to the oracle, at least its quote
        fee: u64,
    },

    /// Randomness callback from the entropy oracle. Picks the winner and pays out.
    ///
    /// Accounts expected:
    /// 0. `[signer]` The provider's callback authority
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The entropy provider account the request was made to
    /// 3. `[writable]` Escrow token account
    /// 4. `[writable]` Winner's token account for the prize mint
    /// 5. `[writable]` The creator, receives the ticket revenue
    /// 6. `[]` The token program
    DrawRaffle {
        raffle_id: u64,
        request_id: u64,
        user_randomness: [u8; 32],
        provider_randomness: [u8; 32],
    },

    /// Cancel a raffle that sold no ticket, returning the prize (creator only)
    ///
    /// Accounts expected:
    /// 0. `[signer]` The creator
    /// 1. `[writable]` The raffle account
    /// 2. `[writable]` Escrow token account
    /// 3. `[writable]` Creator's token account for the prize mint
    /// 4. `[]` The token program
    CancelRaffle { raffle_id: u64 },

    /// Cancel a raffle whose randomness never arrived, returning the prize
    /// to the creator. Creator or admin, after the recovery delay.
    ///
    /// Accounts expected:
    /// 0. `[signer]` The creator or the admin
    /// 1. `[]` Config account
    /// 2. `[writable]` The raffle account
    /// 3. `[writable]` Escrow token account
    /// 4. `[writable]` Creator's token account for the prize mint
    /// 5. `[]` The token program
    RecoverRaffle { raffle_id: u64 },

    /// Refund ticket payments of a recovered raffle, in ticket order.
    /// Anyone can crank this.
    ///
    /// Accounts expected:
    /// 0. `[writable]` The raffle account
    /// 1.. `[writable]` Holders of the next tickets to refund, one per ticket
    RefundTickets { raffle_id: u64 },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| RaffleError::InvalidInstruction.into())
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        Ok(borsh::to_vec(self)?)
    }
}

/// Create initialize_config instruction
pub fn initialize_config(
    program_id: &Pubkey,
    admin: &Pubkey,
    entropy_program: &Pubkey,
    entropy_provider: &Pubkey,
    recovery_delay: i64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::InitializeConfig { recovery_delay }.pack()?;
    let (config, _) = find_config_address(program_id);

    let accounts = vec![
        AccountMeta::new(*admin, true),
        AccountMeta::new(config, false),
        AccountMeta::new_readonly(*entropy_program, false),
        AccountMeta::new_readonly(*entropy_provider, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create update_config instruction
pub fn update_config(
    program_id: &Pubkey,
    admin: &Pubkey,
    new_admin: &Pubkey,
    entropy_program: &Pubkey,
    entropy_provider: &Pubkey,
    recovery_delay: i64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::UpdateConfig { recovery_delay }.pack()?;
    let (config, _) = find_config_address(program_id);

    let accounts = vec![
        AccountMeta::new_readonly(*admin, true),
        AccountMeta::new(config, false),
        AccountMeta::new_readonly(*new_admin, false),
        AccountMeta::new_readonly(*entropy_program, false),
        AccountMeta::new_readonly(*entropy_provider, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create create_raffle instruction. `raffle_id` must be the config's next raffle id.
pub fn create_raffle(
    program_id: &Pubkey,
    creator: &Pubkey,
    raffle_id: u64,
    mint: &Pubkey,
    source: &Pubkey,
    ticket_price: u64,
    max_tickets: u32,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::CreateRaffle {
        ticket_price,
        max_tickets,
    }
    .pack()?;
    let (config, _) = find_config_address(program_id);
    let (raffle, _) = find_raffle_address(program_id, raffle_id);
    let (custody_authority, _) = find_custody_authority(program_id);

    let accounts = vec![
        AccountMeta::new(*creator, true),
        AccountMeta::new(config, false),
        AccountMeta::new(raffle, false),
        AccountMeta::new_readonly(*mint, false),
        AccountMeta::new(*source, false),
        AccountMeta::new(find_escrow_address(&raffle, mint), false),
        AccountMeta::new_readonly(custody_authority, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create purchase_ticket instruction
pub fn purchase_ticket(
    program_id: &Pubkey,
    buyer: &Pubkey,
    raffle_id: u64,
    payment: u64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::PurchaseTicket { raffle_id, payment }.pack()?;
    let (raffle, _) = find_raffle_address(program_id, raffle_id);

    let accounts = vec![
        AccountMeta::new(*buyer, true),
        AccountMeta::new(raffle, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create close_raffle instruction
pub fn close_raffle(
    program_id: &Pubkey,
    creator: &Pubkey,
    raffle_id: u64,
    entropy_program: &Pubkey,
    entropy_provider: &Pubkey,
    commitment: [u8; 32],
    fee: u64,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::CloseRaffle {
        raffle_id,
        commitment,
        fee,
    }
    .pack()?;
    let (config, _) = find_config_address(program_id);
    let (raffle, _) = find_raffle_address(program_id, raffle_id);

    let accounts = vec![
        AccountMeta::new(*creator, true),
        AccountMeta::new_readonly(config, false),
        AccountMeta::new(raffle, false),
        AccountMeta::new_readonly(*entropy_program, false),
        AccountMeta::new(*entropy_provider, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create draw_raffle instruction, as submitted by the oracle's callback authority
#[allow(clippy::too_many_arguments)]
pub fn draw_raffle(
    program_id: &Pubkey,
    callback_authority: &Pubkey,
    raffle_id: u64,
    entropy_provider: &Pubkey,
    mint: &Pubkey,
    winner_token_account: &Pubkey,
    creator: &Pubkey,
    request_id: u64,
    user_randomness: [u8; 32],
    provider_randomness: [u8; 32],
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::DrawRaffle {
        raffle_id,
        request_id,
        user_randomness,
        provider_randomness,
    }
    .pack()?;
    let (raffle, _) = find_raffle_address(program_id, raffle_id);

    let accounts = vec![
        AccountMeta::new_readonly(*callback_authority, true),
        AccountMeta::new(raffle, false),
        AccountMeta::new_readonly(*entropy_provider, false),
        AccountMeta::new(find_escrow_address(&raffle, mint), false),
        AccountMeta::new(*winner_token_account, false),
        AccountMeta::new(*creator, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create cancel_raffle instruction
pub fn cancel_raffle(
    program_id: &Pubkey,
    creator: &Pubkey,
    raffle_id: u64,
    mint: &Pubkey,
    creator_token_account: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::CancelRaffle { raffle_id }.pack()?;
    let (raffle, _) = find_raffle_address(program_id, raffle_id);

    let accounts = vec![
        AccountMeta::new_readonly(*creator, true),
        AccountMeta::new(raffle, false),
        AccountMeta::new(find_escrow_address(&raffle, mint), false),
        AccountMeta::new(*creator_token_account, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create recover_raffle instruction
pub fn recover_raffle(
    program_id: &Pubkey,
    authority: &Pubkey,
    raffle_id: u64,
    mint: &Pubkey,
    creator_token_account: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::RecoverRaffle { raffle_id }.pack()?;
    let (config, _) = find_config_address(program_id);
    let (raffle, _) = find_raffle_address(program_id, raffle_id);

    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new_readonly(config, false),
        AccountMeta::new(raffle, false),
        AccountMeta::new(find_escrow_address(&raffle, mint), false),
        AccountMeta::new(*creator_token_account, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create refund_tickets instruction for the next `holders`, in ticket order
pub fn refund_tickets(
    program_id: &Pubkey,
    raffle_id: u64,
    holders: &[Pubkey],
) -> Result<Instruction, ProgramError> {
    let data = RaffleInstruction::RefundTickets { raffle_id }.pack()?;
    let (raffle, _) = find_raffle_address(program_id, raffle_id);

    let mut accounts = vec![AccountMeta::new(raffle, false)];
    accounts.extend(holders.iter().map(|holder| AccountMeta::new(*holder, false)));

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_rejects_garbage() {
        assert_eq!(
            RaffleInstruction::unpack(&[]),
            Err(RaffleError::InvalidInstruction.into())
        );
        assert_eq!(
            RaffleInstruction::unpack(&[42]),
            Err(RaffleError::InvalidInstruction.into())
        );
        // PurchaseTicket with a truncated payment
        assert_eq!(
            RaffleInstruction::unpack(&[3, 1, 0, 0, 0, 0, 0, 0, 0, 5]),
            Err(RaffleError::InvalidInstruction.into())
        );
    }

    #[test]
    fn draw_instruction_carries_reveal() {
        let program_id = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let ix = draw_raffle(
            &program_id,
            &authority,
            2,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            9,
            [1u8; 32],
            [2u8; 32],
        )
        .unwrap();

        assert_eq!(ix.accounts[0].pubkey, authority);
        assert!(ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[1].pubkey, find_raffle_address(&program_id, 2).0);
        assert_eq!(
            RaffleInstruction::unpack(&ix.data).unwrap(),
            RaffleInstruction::DrawRaffle {
                raffle_id: 2,
                request_id: 9,
                user_randomness: [1u8; 32],
                provider_randomness: [2u8; 32],
            }
        );
    }

    #[test]
    fn refund_lists_holders_after_raffle() {
        let program_id = Pubkey::new_unique();
        let holders = [Pubkey::new_unique(), Pubkey::new_unique()];
        let ix = refund_tickets(&program_id, 1, &holders).unwrap();
        assert_eq!(ix.accounts.len(), 3);
        assert_eq!(ix.accounts[1].pubkey, holders[0]);
        assert!(ix.accounts[2].is_writable);
    }
}
