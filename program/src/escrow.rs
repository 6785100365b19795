//! Custody of the prize token.
//!
//! Creators approve the program's custody authority as delegate of the token
//! account holding the prize. Creating the raffle moves the token into the
//! raffle's escrow account, owned by the raffle PDA, which is the only signer
//! able to move it out again.

use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program::invoke_signed,
    program_error::ProgramError,
    program_option::COption,
    program_pack::Pack,
    pubkey::Pubkey,
};
use spl_token::state::{Account as TokenAccount, Mint};

use crate::{error::RaffleError, state::AssetRef, utils::CUSTODY_SEED};

/// The prize must be a single indivisible token that nobody can freeze.
/// A frozen escrow could neither pay the winner nor return the prize.
pub fn check_prize_mint(mint: &Mint) -> Result<(), RaffleError> {
    if !mint.is_initialized || mint.supply != 1 || mint.decimals != 0 {
        return Err(RaffleError::InvalidPrizeAsset);
    }
    if mint.freeze_authority.is_some() {
        return Err(RaffleError::InvalidPrizeAsset);
    }
    Ok(())
}

/// `from` must hold the prize and have delegated it to the custody authority
pub fn check_depositor(
    source: &TokenAccount,
    prize: &AssetRef,
    from: &Pubkey,
    custody_authority: &Pubkey,
) -> Result<(), RaffleError> {
    if source.mint != prize.mint || source.owner != *from || source.amount < 1 {
        return Err(RaffleError::NotOwner);
    }
    if source.delegate != COption::Some(*custody_authority) || source.delegated_amount < 1 {
        return Err(RaffleError::NotApproved);
    }
    Ok(())
}

/// The escrow must be the raffle's account for the prize mint and still hold it
pub fn check_in_custody(
    escrow: &TokenAccount,
    prize: &AssetRef,
    raffle: &Pubkey,
) -> Result<(), RaffleError> {
    if escrow.mint != prize.mint || escrow.owner != *raffle {
        return Err(RaffleError::InvalidRaffleAccount);
    }
    if escrow.amount == 0 {
        return Err(RaffleError::NotInCustody);
    }
    Ok(())
}

/// Release destination must be a prize-mint account owned by the recipient
pub fn check_destination(
    destination: &TokenAccount,
    prize: &AssetRef,
    recipient: &Pubkey,
) -> Result<(), RaffleError> {
    if destination.mint != prize.mint || destination.owner != *recipient {
        return Err(RaffleError::WinnerAccountMismatch);
    }
    Ok(())
}

/// Unpack an SPL token account, checking the owning program
pub fn unpack_token_account(
    account: &AccountInfo,
    prize: &AssetRef,
) -> Result<TokenAccount, ProgramError> {
    if account.owner != &prize.token_program {
        msg!("Token account {} is not owned by the token program", account.key);
        return Err(ProgramError::IncorrectProgramId);
    }
    TokenAccount::unpack(&account.data.borrow())
}

/// Moves the prize from the creator's token account into the raffle escrow
#[allow(clippy::too_many_arguments)]
pub fn take_custody<'a>(
    prize: &AssetRef,
    from: &Pubkey,
    raffle: &Pubkey,
    source_info: &AccountInfo<'a>,
    escrow_info: &AccountInfo<'a>,
    custody_authority_info: &AccountInfo<'a>,
    token_program_info: &AccountInfo<'a>,
    custody_bump: u8,
) -> ProgramResult {
    let source = unpack_token_account(source_info, prize)?;
    check_depositor(&source, prize, from, custody_authority_info.key)?;

    let escrow = unpack_token_account(escrow_info, prize)?;
    if escrow.mint != prize.mint || escrow.owner != *raffle {
        msg!("Escrow account is not the raffle's account for the prize mint");
        return Err(RaffleError::InvalidRaffleAccount.into());
    }

    invoke_signed(
        &spl_token::instruction::transfer(
            token_program_info.key,
            source_info.key,
            escrow_info.key,
            custody_authority_info.key,
            &[],
            1,
        )?,
        &[
            source_info.clone(),
            escrow_info.clone(),
            custody_authority_info.clone(),
            token_program_info.clone(),
        ],
        &[&[CUSTODY_SEED, &[custody_bump]]],
    )?;

    msg!("Prize {} taken into custody", prize.mint);
    Ok(())
}

/// Releases the escrowed prize to `recipient`. Fails with `NotInCustody`
/// once the prize has left, so a second release can never succeed.
pub fn release<'a>(
    prize: &AssetRef,
    recipient: &Pubkey,
    escrow_info: &AccountInfo<'a>,
    destination_info: &AccountInfo<'a>,
    raffle_info: &AccountInfo<'a>,
    token_program_info: &AccountInfo<'a>,
    raffle_seeds: &[&[u8]],
) -> ProgramResult {
    let escrow = unpack_token_account(escrow_info, prize)?;
    check_in_custody(&escrow, prize, raffle_info.key)?;

    let destination = unpack_token_account(destination_info, prize)?;
    check_destination(&destination, prize, recipient)?;

    invoke_signed(
        &spl_token::instruction::transfer(
            token_program_info.key,
            escrow_info.key,
            destination_info.key,
            raffle_info.key,
            &[],
            escrow.amount,
        )?,
        &[
            escrow_info.clone(),
            destination_info.clone(),
            raffle_info.clone(),
            token_program_info.clone(),
        ],
        &[raffle_seeds],
    )?;

    msg!("Prize {} released to {}", prize.mint, recipient);
    Ok(())
}
