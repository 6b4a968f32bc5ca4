use anchor_lang::prelude::*;
use anchor_spl::{
    associated_token::AssociatedToken,
    token_interface::{transfer_checked, Mint, TokenAccount, TokenInterface, TransferChecked},
};

use crate::{
    constants::ESCROW_SEED, errors::EscrowError, helpers::AssociatedTokenAccount, state::Escrow,
};

#[derive(Accounts)]
pub struct Make<'info> {
    /// The maker who sets exchange terms and deposits token_a
    #[account(mut)]
    pub maker: Signer<'info>,

    /// Escrow record for this maker; an already-written record means a duplicate offer
    #[account(
        init_if_needed,
        payer = maker,
        space = Escrow::SPACE,
        seeds = [ESCROW_SEED, maker.key().as_ref()],
        bump,
    )]
    pub escrow: Account<'info, Escrow>,

    /// Mint the maker deposits
    #[account(
        constraint = *token_a.to_account_info().owner == token_program.key()
            @ EscrowError::InvalidAccount,
    )]
    pub token_a: InterfaceAccount<'info, Mint>,

    /// Mint the maker wants in return
    #[account(
        constraint = *token_b.to_account_info().owner == token_program.key()
            @ EscrowError::InvalidAccount,
    )]
    pub token_b: InterfaceAccount<'info, Mint>,

    /// Maker's token_a account (source of the deposit)
    #[account(
        mut,
        constraint = ata_maker_token_a.mint == token_a.key() @ EscrowError::InvalidAccount,
        constraint = ata_maker_token_a.owner == maker.key() @ EscrowError::InvalidAccount,
        constraint = *ata_maker_token_a.to_account_info().owner == token_program.key()
            @ EscrowError::InvalidAccount,
    )]
    pub ata_maker_token_a: InterfaceAccount<'info, TokenAccount>,

    /// CHECK: vault of `escrow`, checked and created by `AssociatedTokenAccount::init_if_needed`
    #[account(mut)]
    pub vault_token_a: UncheckedAccount<'info>,

    pub token_program: Interface<'info, TokenInterface>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

impl<'info> Make<'info> {
    /// Write the offer terms into the escrow record
    pub fn init_escrow(&mut self, amount_wanted: u64, bumps: &MakeBumps) -> Result<()> {
        self.escrow.check_vacant()?;

        self.escrow.set_inner(Escrow {
            maker: self.maker.key(),
            token_a: self.token_a.key(),
            token_b: self.token_b.key(),
            amount_wanted,
            bump: bumps.escrow,
        });
        Ok(())
    }

    /// Create the vault as the record's associated token_a account
    pub fn open_vault(&self) -> Result<()> {
        AssociatedTokenAccount::init_if_needed(
            &self.vault_token_a.to_account_info(),
            &self.escrow.to_account_info(),
            &self.token_a.to_account_info(),
            &self.maker.to_account_info(),
            &self.token_program.to_account_info(),
            &self.associated_token_program.to_account_info(),
            &self.system_program.to_account_info(),
        )
    }

    /// Transfer token_a from maker to vault
    pub fn deposit(&mut self, amount: u64) -> Result<()> {
        let cpi_accounts = TransferChecked {
            from: self.ata_maker_token_a.to_account_info(),
            mint: self.token_a.to_account_info(),
            to: self.vault_token_a.to_account_info(),
            authority: self.maker.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);

        transfer_checked(cpi_ctx, amount, self.token_a.decimals)
    }
}

/// Handler for the make instruction
pub fn handler(ctx: Context<Make>, amount_wanted: u64, amount_offered: u64) -> Result<()> {
    Escrow::check_terms(
        &ctx.accounts.token_a.key(),
        &ctx.accounts.token_b.key(),
        amount_wanted,
        amount_offered,
        ctx.accounts.ata_maker_token_a.amount,
    )?;

    ctx.accounts.init_escrow(amount_wanted, &ctx.bumps)?;
    ctx.accounts.open_vault()?;
    ctx.accounts.deposit(amount_offered)?;

    msg!(
        "Offered {} of {} for {} of {}",
        amount_offered,
        ctx.accounts.token_a.key(),
        amount_wanted,
        ctx.accounts.token_b.key()
    );
    Ok(())
}
