use anchor_lang::prelude::*;

use crate::{constants::ESCROW_SEED, errors::EscrowError};

/// Escrow account that stores the terms of one outstanding offer
///
/// The amount offered is not stored: the vault balance is authoritative.
#[account(discriminator = 1)]
#[derive(InitSpace, Debug)]
pub struct Escrow {
    /// The maker's wallet address (creator of the offer)
    pub maker: Pubkey,
    /// Mint the maker deposited into the vault
    pub token_a: Pubkey,
    /// Mint the maker wants in return
    pub token_b: Pubkey,
    /// Amount of token_b the maker wants to receive
    pub amount_wanted: u64,
    /// Bump seed for PDA derivation (cached for signing)
    pub bump: u8,
}

impl Escrow {
    /// Allocated size including the 1-byte discriminator
    pub const SPACE: usize = Escrow::DISCRIMINATOR.len() + Escrow::INIT_SPACE;

    /// Validate the terms of a new offer
    pub fn check_terms(
        token_a: &Pubkey,
        token_b: &Pubkey,
        amount_wanted: u64,
        amount_offered: u64,
        source_balance: u64,
    ) -> Result<()> {
        require_gt!(amount_wanted, 0, EscrowError::InvalidAmount);
        require_gt!(amount_offered, 0, EscrowError::InvalidAmount);
        require_keys_neq!(*token_a, *token_b, EscrowError::IdenticalMints);
        require_gte!(
            source_balance,
            amount_offered,
            EscrowError::InsufficientFunds
        );
        Ok(())
    }

    /// Whether this record has been written by a previous `make`
    ///
    /// A freshly allocated record is all zeroes, and the zero key can never sign as a maker.
    pub fn is_live(&self) -> bool {
        self.maker != Pubkey::default()
    }

    /// A maker holds at most one open offer
    pub fn check_vacant(&self) -> Result<()> {
        require!(!self.is_live(), EscrowError::DuplicateOffer);
        Ok(())
    }

    /// Decode a record from raw account state
    ///
    /// An account we do not own, or one without data, has been closed (or never
    /// opened) and reports `NotFound`.
    pub fn from_record(owner: &Pubkey, mut data: &[u8]) -> Result<Self> {
        if owner != &crate::ID || data.is_empty() {
            return err!(EscrowError::NotFound);
        }
        let escrow = Escrow::try_deserialize(&mut data)?;
        require!(escrow.is_live(), EscrowError::NotFound);
        Ok(escrow)
    }

    /// Load the record behind `info`, or `NotFound`
    pub fn load(info: &AccountInfo) -> Result<Self> {
        let data = info.try_borrow_data()?;
        Self::from_record(info.owner, &data[..])
    }

    /// Check that `address` is the record derived from the stored maker and bump
    pub fn verify_address(&self, address: &Pubkey) -> Result<()> {
        let expected = Pubkey::create_program_address(
            &[ESCROW_SEED, self.maker.as_ref(), &[self.bump]],
            &crate::ID,
        )
        .map_err(|_| error!(EscrowError::InvalidAccount))?;
        require_keys_eq!(expected, *address, EscrowError::InvalidAccount);
        Ok(())
    }

    /// Only the stored maker may cancel the offer
    pub fn authorize_refund(&self, signer: &Pubkey) -> Result<()> {
        require_keys_eq!(self.maker, *signer, EscrowError::Unauthorized);
        Ok(())
    }

    /// Plan the two transfers of a `take` before any of them is issued
    pub fn settle_take(&self, vault_balance: u64, taker_balance_b: u64) -> Result<Settlement> {
        require_gte!(
            taker_balance_b,
            self.amount_wanted,
            EscrowError::InsufficientFunds
        );
        Ok(Settlement {
            to_maker: self.amount_wanted,
            to_taker: vault_balance,
        })
    }

    /// Seeds that let the program sign as the record
    pub fn signer_seeds<'a>(&'a self, bump: &'a [u8; 1]) -> [&'a [u8]; 3] {
        [ESCROW_SEED, self.maker.as_ref(), bump]
    }
}

/// Token movements of a `take`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// token_b moved from the taker to the maker
    pub to_maker: u64,
    /// token_a moved from the vault to the taker
    pub to_taker: u64,
}
