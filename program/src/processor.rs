use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction, system_program,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};
use spl_token::state::Mint;

use crate::{
    error::RaffleError,
    escrow,
    events::RaffleEvent,
    instruction::RaffleInstruction,
    ledger, machine, oracle, payout, randomness, selector,
    state::{check_recovery_delay, AssetRef, Config, OracleRequest, Raffle, MIN_RECOVERY_DELAY},
    utils::{
        find_config_address, find_custody_authority, find_escrow_address, find_raffle_address,
        transfer_lamports, CONFIG_SEED, RAFFLE_SEED,
    },
};

/// Program state handler.
pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeConfig { recovery_delay } => {
                msg!("Instruction: Initialize Config");
                Self::process_initialize_config(program_id, accounts, recovery_delay)
            }
            RaffleInstruction::UpdateConfig { recovery_delay } => {
                msg!("Instruction: Update Config");
                Self::process_update_config(program_id, accounts, recovery_delay)
            }
            RaffleInstruction::CreateRaffle {
                ticket_price,
                max_tickets,
            } => {
                msg!("Instruction: Create Raffle");
                Self::process_create_raffle(program_id, accounts, ticket_price, max_tickets)
            }
            RaffleInstruction::PurchaseTicket { raffle_id, payment } => {
                msg!("Instruction: Purchase Ticket");
                Self::process_purchase_ticket(program_id, accounts, raffle_id, payment)
            }
            RaffleInstruction::CloseRaffle {
                raffle_id,
                commitment,
                fee,
            } => {
                msg!("Instruction: Close Raffle");
                Self::process_close_raffle(program_id, accounts, raffle_id, commitment, fee)
            }
            RaffleInstruction::DrawRaffle {
                raffle_id,
                request_id,
                user_randomness,
                provider_randomness,
            } => {
                msg!("Instruction: Draw Raffle");
                Self::process_draw_raffle(
                    program_id,
                    accounts,
                    raffle_id,
                    request_id,
                    user_randomness,
                    provider_randomness,
                )
            }
            RaffleInstruction::CancelRaffle { raffle_id } => {
                msg!("Instruction: Cancel Raffle");
                Self::process_cancel_raffle(program_id, accounts, raffle_id)
            }
            RaffleInstruction::RecoverRaffle { raffle_id } => {
                msg!("Instruction: Recover Raffle");
                Self::process_recover_raffle(program_id, accounts, raffle_id)
            }
            RaffleInstruction::RefundTickets { raffle_id } => {
                msg!("Instruction: Refund Tickets");
                Self::process_refund_tickets(program_id, accounts, raffle_id)
            }
        }
    }

    /// Creates the config PDA. Only callable once.
    fn process_initialize_config(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        recovery_delay: i64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let entropy_program_info = next_account_info(account_info_iter)?;
        let entropy_provider_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !admin_info.is_signer {
            msg!("Admin must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if let Err(e) = check_recovery_delay(recovery_delay) {
            msg!("Recovery delay must be at least {} seconds", MIN_RECOVERY_DELAY);
            return Err(e.into());
        }

        let (expected_config, bump_seed) = find_config_address(program_id);
        if *config_info.key != expected_config {
            msg!("Invalid config account address");
            return Err(ProgramError::InvalidArgument);
        }

        if config_info.owner == program_id {
            let existing = Config::unpack_unchecked(&config_info.data.borrow())?;
            if existing.is_initialized {
                msg!("Config account is already initialized");
                return Err(RaffleError::ConfigAlreadyInitialized.into());
            }
        } else {
            let rent = Rent::get()?;
            invoke_signed(
                &system_instruction::create_account(
                    admin_info.key,
                    config_info.key,
                    rent.minimum_balance(Config::LEN),
                    Config::LEN as u64,
                    program_id,
                ),
                &[
                    admin_info.clone(),
                    config_info.clone(),
                    system_program_info.clone(),
                ],
                &[&[CONFIG_SEED, &[bump_seed]]],
            )?;
        }

        Self::check_oracle(entropy_program_info, entropy_provider_info)?;

        let config = Config {
            is_initialized: true,
            admin: *admin_info.key,
            entropy_program: *entropy_program_info.key,
            entropy_provider: *entropy_provider_info.key,
            recovery_delay,
            next_raffle_id: 1,
        };
        Config::pack(config, &mut config_info.data.borrow_mut())?;

        msg!("Config initialized, admin {}", admin_info.key);
        Ok(())
    }

    /// Replaces admin, oracle and recovery delay (admin only)
    fn process_update_config(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        recovery_delay: i64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let new_admin_info = next_account_info(account_info_iter)?;
        let entropy_program_info = next_account_info(account_info_iter)?;
        let entropy_provider_info = next_account_info(account_info_iter)?;

        let mut config = Self::load_config(config_info, program_id)?;
        Self::check_admin(admin_info, &config)?;
        if let Err(e) = check_recovery_delay(recovery_delay) {
            msg!("Recovery delay must be at least {} seconds", MIN_RECOVERY_DELAY);
            return Err(e.into());
        }
        Self::check_oracle(entropy_program_info, entropy_provider_info)?;

        config.admin = *new_admin_info.key;
        config.entropy_program = *entropy_program_info.key;
        config.entropy_provider = *entropy_provider_info.key;
        config.recovery_delay = recovery_delay;
        Config::pack(config, &mut config_info.data.borrow_mut())?;

        msg!("Config updated, admin {}", new_admin_info.key);
        Ok(())
    }

    /// Opens raffle `config.next_raffle_id` and escrows its prize
    fn process_create_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        ticket_price: u64,
        max_tickets: u32,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let creator_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let mint_info = next_account_info(account_info_iter)?;
        let source_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let custody_authority_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;
        let associated_token_program_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !creator_info.is_signer {
            msg!("Creator must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *token_program_info.key != spl_token::id()
            || *associated_token_program_info.key != spl_associated_token_account::id()
            || *system_program_info.key != system_program::id()
        {
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut config = Self::load_config(config_info, program_id)?;
        let raffle_id = config.next_raffle_id;
        let (expected_raffle, bump) = find_raffle_address(program_id, raffle_id);
        if *raffle_info.key != expected_raffle {
            msg!("Raffle account does not match raffle id {}", raffle_id);
            return Err(RaffleError::InvalidRaffleAccount.into());
        }

        let prize = AssetRef {
            token_program: *token_program_info.key,
            mint: *mint_info.key,
        };
        if mint_info.owner != token_program_info.key {
            msg!("Prize mint is not owned by the token program");
            return Err(RaffleError::InvalidPrizeAsset.into());
        }
        let mint = Mint::unpack(&mint_info.data.borrow())?;
        escrow::check_prize_mint(&mint)?;

        let raffle = Raffle::new(
            raffle_id,
            bump,
            *creator_info.key,
            prize,
            ticket_price,
            max_tickets,
        )?;

        let (custody_authority, custody_bump) = find_custody_authority(program_id);
        if *custody_authority_info.key != custody_authority {
            msg!("Invalid custody authority");
            return Err(ProgramError::InvalidArgument);
        }
        if *escrow_info.key != find_escrow_address(raffle_info.key, mint_info.key) {
            msg!("Escrow is not the raffle's associated token account");
            return Err(RaffleError::InvalidRaffleAccount.into());
        }
        let source = escrow::unpack_token_account(source_info, &prize)?;
        escrow::check_depositor(&source, &prize, creator_info.key, &custody_authority)?;

        let raffle_id_bytes = raffle_id.to_le_bytes();
        let space = Raffle::space(max_tickets);
        invoke_signed(
            &system_instruction::create_account(
                creator_info.key,
                raffle_info.key,
                Rent::get()?.minimum_balance(space),
                space as u64,
                program_id,
            ),
            &[
                creator_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
            &[&[RAFFLE_SEED, &raffle_id_bytes, &[bump]]],
        )?;

        invoke(
            &spl_associated_token_account::instruction::create_associated_token_account_idempotent(
                creator_info.key,
                raffle_info.key,
                mint_info.key,
                token_program_info.key,
            ),
            &[
                creator_info.clone(),
                escrow_info.clone(),
                raffle_info.clone(),
                mint_info.clone(),
                system_program_info.clone(),
                token_program_info.clone(),
                associated_token_program_info.clone(),
            ],
        )?;

        escrow::take_custody(
            &prize,
            creator_info.key,
            raffle_info.key,
            source_info,
            escrow_info,
            custody_authority_info,
            token_program_info,
            custody_bump,
        )?;

        raffle.save(raffle_info)?;
        config.next_raffle_id = raffle_id
            .checked_add(1)
            .ok_or(RaffleError::ArithmeticOverflow)?;
        Config::pack(config, &mut config_info.data.borrow_mut())?;

        RaffleEvent::RaffleCreated {
            raffle_id,
            creator: raffle.creator,
            mint: prize.mint,
            ticket_price,
            max_tickets,
        }
        .emit();
        Ok(())
    }

    fn process_purchase_ticket(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        raffle_id: u64,
        payment: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let buyer_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !buyer_info.is_signer {
            msg!("Buyer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let mut raffle = Self::load_raffle(raffle_info, program_id, raffle_id)?;
        let ticket_index = ledger::append_ticket(&mut raffle, *buyer_info.key, payment)?;

        invoke(
            &system_instruction::transfer(buyer_info.key, raffle_info.key, payment),
            &[
                buyer_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        raffle.save(raffle_info)?;

        RaffleEvent::TicketPurchased {
            raffle_id,
            buyer: *buyer_info.key,
            ticket_index,
        }
        .emit();
        Ok(())
    }

    /// Ends ticket sales and submits the creator's commitment to the oracle
    fn process_close_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        raffle_id: u64,
        commitment: [u8; 32],
        fee: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let creator_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let entropy_program_info = next_account_info(account_info_iter)?;
        let entropy_provider_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        let config = Self::load_config(config_info, program_id)?;
        let mut raffle = Self::load_raffle(raffle_info, program_id, raffle_id)?;
        Self::check_creator(creator_info, &raffle)?;

        if *entropy_program_info.key != config.entropy_program
            || *entropy_provider_info.key != config.entropy_provider
        {
            msg!("Entropy oracle accounts do not match the config");
            return Err(RaffleError::InvalidOracle.into());
        }
        if *system_program_info.key != system_program::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let quoted_fee = oracle::quote_fee(entropy_provider_info, &config.entropy_program)?;
        randomness::check_request(&raffle, fee, quoted_fee)?;

        let request_id = oracle::submit_request(
            entropy_program_info,
            creator_info,
            entropy_provider_info,
            system_program_info,
            commitment,
            fee,
        )?;

        let request = OracleRequest {
            id: request_id,
            program: *entropy_program_info.key,
            provider: *entropy_provider_info.key,
            commitment,
        };
        let now = Clock::get()?.unix_timestamp;
        randomness::record_request(&mut raffle, &request, now, config.recovery_delay)?;
        raffle.save(raffle_info)?;

        RaffleEvent::RaffleClosed {
            raffle_id,
            request_id,
        }
        .emit();
        Ok(())
    }

    /// Oracle callback: selects the winner, releases the prize and pays the creator
    fn process_draw_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        raffle_id: u64,
        request_id: u64,
        user_randomness: [u8; 32],
        provider_randomness: [u8; 32],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let entropy_provider_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let winner_token_info = next_account_info(account_info_iter)?;
        let creator_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Callback authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = Self::load_raffle(raffle_info, program_id, raffle_id)?;

        let random =
            randomness::accept_delivery(&raffle, request_id, &user_randomness, &provider_randomness)?;

        if entropy_provider_info.key != raffle.oracle_provider() {
            msg!("Provider account is not the one the request was made to");
            return Err(RaffleError::InvalidOracle.into());
        }
        let provider = oracle::load_provider(entropy_provider_info, raffle.oracle_program())?;
        if provider.authority != *authority_info.key {
            msg!("Signer is not the provider's callback authority");
            return Err(RaffleError::Unauthorized.into());
        }

        let winner_index = selector::select_winner(&random, u64::from(raffle.tickets_sold()))?;
        let payout = payout::plan_payout(&raffle, winner_index)?;

        if *creator_info.key != payout.creator {
            msg!("Revenue recipient is not the raffle creator");
            return Err(ProgramError::InvalidArgument);
        }
        Self::check_escrow(escrow_info, token_program_info, raffle_info, &raffle)?;

        let raffle_id_bytes = raffle.id.to_le_bytes();
        let bump = [raffle.bump];
        escrow::release(
            &raffle.prize,
            &payout.winner,
            escrow_info,
            winner_token_info,
            raffle_info,
            token_program_info,
            &[RAFFLE_SEED, &raffle_id_bytes, &bump],
        )?;
        transfer_lamports(raffle_info, creator_info, payout.revenue)?;

        payout::apply_payout(&mut raffle, &payout)?;
        raffle.save(raffle_info)?;

        RaffleEvent::RaffleDrawn {
            raffle_id,
            winner: payout.winner,
            winner_index,
            revenue: payout.revenue,
        }
        .emit();
        Ok(())
    }

    /// Cancels a raffle with no ticket sold and returns the prize
    fn process_cancel_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        raffle_id: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let creator_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let creator_token_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;

        let mut raffle = Self::load_raffle(raffle_info, program_id, raffle_id)?;
        Self::check_creator(creator_info, &raffle)?;
        Self::check_escrow(escrow_info, token_program_info, raffle_info, &raffle)?;

        machine::cancel(&mut raffle)?;
        Self::return_prize(
            &raffle,
            raffle_info,
            escrow_info,
            creator_token_info,
            token_program_info,
        )?;
        raffle.save(raffle_info)?;

        RaffleEvent::RaffleCancelled { raffle_id }.emit();
        Ok(())
    }

    /// Timeout escape for a raffle whose randomness never arrived
    fn process_recover_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        raffle_id: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let escrow_info = next_account_info(account_info_iter)?;
        let creator_token_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let config = Self::load_config(config_info, program_id)?;
        let mut raffle = Self::load_raffle(raffle_info, program_id, raffle_id)?;
        if *authority_info.key != raffle.creator && *authority_info.key != config.admin {
            msg!("Only the creator or the admin can recover a raffle");
            return Err(RaffleError::Unauthorized.into());
        }
        Self::check_escrow(escrow_info, token_program_info, raffle_info, &raffle)?;

        let now = Clock::get()?.unix_timestamp;
        machine::recover(&mut raffle, now)?;
        Self::return_prize(
            &raffle,
            raffle_info,
            escrow_info,
            creator_token_info,
            token_program_info,
        )?;
        raffle.save(raffle_info)?;

        RaffleEvent::RaffleRecovered {
            raffle_id,
            by: *authority_info.key,
        }
        .emit();
        Ok(())
    }

    /// Pays back ticket holders of a recovered raffle, continuing from the refund cursor
    fn process_refund_tickets(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        raffle_id: u64,
    ) -> ProgramResult {
        let (raffle_info, holder_infos) = accounts
            .split_first()
            .ok_or(ProgramError::NotEnoughAccountKeys)?;

        let mut raffle = Self::load_raffle(raffle_info, program_id, raffle_id)?;
        let refunds = payout::plan_refunds(&raffle, holder_infos.len())?;
        if refunds.len() != holder_infos.len() {
            msg!(
                "Only {} tickets left to refund, got {} accounts",
                refunds.len(),
                holder_infos.len()
            );
            return Err(ProgramError::InvalidArgument);
        }

        let mut amount = 0u64;
        for (holder_info, (holder, refund)) in holder_infos.iter().zip(refunds.iter()) {
            if holder_info.key != holder {
                msg!("Account {} does not hold the next ticket", holder_info.key);
                return Err(ProgramError::InvalidArgument);
            }
            transfer_lamports(raffle_info, holder_info, *refund)?;
            amount = amount
                .checked_add(*refund)
                .ok_or(RaffleError::ArithmeticOverflow)?;
        }

        payout::apply_refunds(&mut raffle, &refunds)?;
        raffle.save(raffle_info)?;

        RaffleEvent::TicketsRefunded {
            raffle_id,
            count: refunds.len() as u32,
            amount,
        }
        .emit();
        Ok(())
    }

    fn load_config(config_info: &AccountInfo, program_id: &Pubkey) -> Result<Config, ProgramError> {
        if config_info.owner != program_id || *config_info.key != find_config_address(program_id).0
        {
            msg!("Invalid config account");
            return Err(ProgramError::InvalidArgument);
        }
        Config::unpack(&config_info.data.borrow())
    }

    fn load_raffle(
        raffle_info: &AccountInfo,
        program_id: &Pubkey,
        raffle_id: u64,
    ) -> Result<Raffle, ProgramError> {
        let raffle = Raffle::load(raffle_info, program_id)?;
        let expected = Pubkey::create_program_address(
            &[RAFFLE_SEED, &raffle.id.to_le_bytes(), &[raffle.bump]],
            program_id,
        )
        .map_err(|_| RaffleError::InvalidRaffleAccount)?;
        if raffle.id != raffle_id || expected != *raffle_info.key {
            msg!("Account {} is not raffle {}", raffle_info.key, raffle_id);
            return Err(RaffleError::InvalidRaffleAccount.into());
        }
        Ok(raffle)
    }

    fn check_admin(admin_info: &AccountInfo, config: &Config) -> ProgramResult {
        if !admin_info.is_signer {
            msg!("Admin must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *admin_info.key != config.admin {
            msg!("Signer is not the admin");
            return Err(RaffleError::Unauthorized.into());
        }
        Ok(())
    }

    fn check_creator(creator_info: &AccountInfo, raffle: &Raffle) -> ProgramResult {
        if !creator_info.is_signer {
            msg!("Creator must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }
        if *creator_info.key != raffle.creator {
            msg!("Signer is not the raffle creator");
            return Err(RaffleError::Unauthorized.into());
        }
        Ok(())
    }

    fn check_escrow(
        escrow_info: &AccountInfo,
        token_program_info: &AccountInfo,
        raffle_info: &AccountInfo,
        raffle: &Raffle,
    ) -> ProgramResult {
        if *token_program_info.key != raffle.prize.token_program {
            return Err(ProgramError::IncorrectProgramId);
        }
        if *escrow_info.key != find_escrow_address(raffle_info.key, &raffle.prize.mint) {
            msg!("Escrow is not the raffle's associated token account");
            return Err(RaffleError::InvalidRaffleAccount.into());
        }
        Ok(())
    }

    fn check_oracle(
        entropy_program_info: &AccountInfo,
        entropy_provider_info: &AccountInfo,
    ) -> ProgramResult {
        if !entropy_program_info.executable {
            msg!("Entropy program account is not executable");
            return Err(RaffleError::InvalidOracle.into());
        }
        oracle::load_provider(entropy_provider_info, entropy_program_info.key)?;
        Ok(())
    }

    /// Sends the escrowed prize back to the creator
    fn return_prize<'a>(
        raffle: &Raffle,
        raffle_info: &AccountInfo<'a>,
        escrow_info: &AccountInfo<'a>,
        creator_token_info: &AccountInfo<'a>,
        token_program_info: &AccountInfo<'a>,
    ) -> ProgramResult {
        let raffle_id_bytes = raffle.id.to_le_bytes();
        let bump = [raffle.bump];
        escrow::release(
            &raffle.prize,
            &raffle.creator,
            escrow_info,
            creator_token_info,
            raffle_info,
            token_program_info,
            &[RAFFLE_SEED, &raffle_id_bytes, &bump],
        )
    }
}
