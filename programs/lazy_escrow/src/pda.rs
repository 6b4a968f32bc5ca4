//! Address derivation for the escrow record and its vault.
//!
//! Neither address has a private key. The program signs for the record by
//! presenting `[ESCROW_SEED, maker, bump]`, and the vault is the associated
//! token account whose authority is the record.

use anchor_lang::prelude::*;
use anchor_spl::associated_token::get_associated_token_address_with_program_id;

use crate::constants::ESCROW_SEED;

/// Escrow record address and canonical bump for `maker`
pub fn escrow_address(maker: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[ESCROW_SEED, maker.as_ref()], &crate::ID)
}

/// Associated token account of `wallet` for `mint` under `token_program`
pub fn associated_address(wallet: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(wallet, mint, token_program)
}

/// Vault token account owned by `escrow` for `mint`
pub fn vault_address(escrow: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    associated_address(escrow, mint, token_program)
}
