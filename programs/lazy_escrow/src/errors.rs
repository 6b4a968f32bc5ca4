use anchor_lang::prelude::*;

#[error_code]
pub enum EscrowError {
    #[msg("Invalid amount: amount must be greater than zero")]
    InvalidAmount,
    #[msg("Invalid mints: token_a and token_b must differ")]
    IdenticalMints,
    #[msg("Duplicate offer: maker already has an outstanding escrow")]
    DuplicateOffer,
    #[msg("Escrow not found: offer was already taken or refunded")]
    NotFound,
    #[msg("Unauthorized: signer is not the escrow maker")]
    Unauthorized,
    #[msg("Insufficient funds: source balance is below the required amount")]
    InsufficientFunds,
    #[msg("Invalid account: account does not match the escrow terms")]
    InvalidAccount,
}
