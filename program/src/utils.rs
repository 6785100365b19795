use solana_program::{account_info::AccountInfo, program_error::ProgramError, pubkey::Pubkey};

use crate::error::RaffleError;

pub const CONFIG_SEED: &[u8] = b"config";
pub const RAFFLE_SEED: &[u8] = b"raffle";
pub const CUSTODY_SEED: &[u8] = b"custody";

/// Find the program derived address for the config account
pub fn find_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id)
}

/// Find the program derived address for a raffle
pub fn find_raffle_address(program_id: &Pubkey, raffle_id: u64) -> (Pubkey, u8) {
    let raffle_id_bytes = raffle_id.to_le_bytes();
    Pubkey::find_program_address(&[RAFFLE_SEED, &raffle_id_bytes], program_id)
}

/// Find the delegate creators approve before their prize can be escrowed
pub fn find_custody_authority(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CUSTODY_SEED], program_id)
}

/// Escrow token account of a raffle: the raffle's associated token account for the prize
pub fn find_escrow_address(raffle: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(raffle, mint)
}

/// Move lamports out of an account owned by this program
pub fn transfer_lamports(
    from: &AccountInfo,
    to: &AccountInfo,
    amount: u64,
) -> Result<(), ProgramError> {
    if amount == 0 {
        return Ok(());
    }
    let from_balance = from
        .lamports()
        .checked_sub(amount)
        .ok_or(RaffleError::ArithmeticOverflow)?;
    let to_balance = to
        .lamports()
        .checked_add(amount)
        .ok_or(RaffleError::ArithmeticOverflow)?;

    **from.try_borrow_mut_lamports()? = from_balance;
    **to.try_borrow_mut_lamports()? = to_balance;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raffle_addresses_differ_per_id() {
        let program_id = Pubkey::new_unique();
        let (first, _) = find_raffle_address(&program_id, 1);
        let (second, _) = find_raffle_address(&program_id, 2);
        assert_ne!(first, second);
        assert_eq!(find_raffle_address(&program_id, 1).0, first);
    }

    #[test]
    fn transfer_lamports_moves_exact_amount() {
        let owner = Pubkey::new_unique();
        let (from_key, to_key) = (Pubkey::new_unique(), Pubkey::new_unique());
        let (mut from_lamports, mut to_lamports) = (1_000u64, 5u64);
        let (mut from_data, mut to_data) = (Vec::<u8>::new(), Vec::<u8>::new());
        let from = AccountInfo::new(
            &from_key,
            false,
            true,
            &mut from_lamports,
            &mut from_data,
            &owner,
            false,
            0,
        );
        let to = AccountInfo::new(
            &to_key,
            false,
            true,
            &mut to_lamports,
            &mut to_data,
            &owner,
            false,
            0,
        );

        transfer_lamports(&from, &to, 300).unwrap();
        assert_eq!(from.lamports(), 700);
        assert_eq!(to.lamports(), 305);

        assert_eq!(
            transfer_lamports(&from, &to, 701),
            Err(RaffleError::ArithmeticOverflow.into())
        );
        assert_eq!(from.lamports(), 700);
    }
}
