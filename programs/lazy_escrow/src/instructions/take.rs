use anchor_lang::prelude::*;
use anchor_spl::{
    associated_token::AssociatedToken,
    token_interface::{
        close_account, transfer_checked, CloseAccount, Mint, TokenAccount, TokenInterface,
        TransferChecked,
    },
};

use crate::{
    errors::EscrowError,
    helpers::{AssociatedTokenAccount, ProgramAccount},
    state::{Escrow, Settlement},
};

#[derive(Accounts)]
pub struct Take<'info> {
    /// The taker who accepts the exchange terms
    #[account(mut)]
    pub taker: Signer<'info>,

    /// The original maker who created the escrow
    #[account(mut)]
    pub maker: SystemAccount<'info>,

    /// Token A mint
    #[account(
        constraint = *token_a.to_account_info().owner == token_program.key()
            @ EscrowError::InvalidAccount,
    )]
    pub token_a: Box<InterfaceAccount<'info, Mint>>,

    /// Token B mint
    #[account(
        constraint = *token_b.to_account_info().owner == token_program.key()
            @ EscrowError::InvalidAccount,
    )]
    pub token_b: Box<InterfaceAccount<'info, Mint>>,

    /// CHECK: vault of `escrow`, validated by `AssociatedTokenAccount::load` after the record loads
    #[account(mut)]
    pub vault_token_a: UncheckedAccount<'info>,

    /// CHECK: maker's associated token_b account, checked and created in `open_destinations`
    #[account(mut)]
    pub ata_maker_token_b: UncheckedAccount<'info>,

    /// CHECK: taker's associated token_a account, checked and created in `open_destinations`
    #[account(mut)]
    pub ata_taker_token_a: UncheckedAccount<'info>,

    /// Taker's token_b account (source of token_b)
    #[account(
        mut,
        constraint = ata_taker_token_b.mint == token_b.key() @ EscrowError::InvalidAccount,
        constraint = ata_taker_token_b.owner == taker.key() @ EscrowError::InvalidAccount,
        constraint = *ata_taker_token_b.to_account_info().owner == token_program.key()
            @ EscrowError::InvalidAccount,
    )]
    pub ata_taker_token_b: Box<InterfaceAccount<'info, TokenAccount>>,

    /// CHECK: escrow record, loaded by `Escrow::load`; a closed record fails with `NotFound`
    #[account(mut)]
    pub escrow: UncheckedAccount<'info>,

    pub token_program: Interface<'info, TokenInterface>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

impl<'info> Take<'info> {
    /// Load the record and check every supplied account against it
    pub fn validate(&self) -> Result<(Escrow, Settlement)> {
        let escrow = Escrow::load(&self.escrow)?;

        require_keys_eq!(escrow.maker, self.maker.key(), EscrowError::InvalidAccount);
        escrow.verify_address(self.escrow.key)?;
        require_keys_eq!(escrow.token_a, self.token_a.key(), EscrowError::InvalidAccount);
        require_keys_eq!(escrow.token_b, self.token_b.key(), EscrowError::InvalidAccount);

        let vault = AssociatedTokenAccount::load(
            &self.vault_token_a,
            self.escrow.key,
            &escrow.token_a,
            &self.token_program.key(),
        )?;

        let settlement = escrow.settle_take(vault.amount, self.ata_taker_token_b.amount)?;
        Ok((escrow, settlement))
    }

    /// Check both payout accounts, creating them at the taker's expense when missing
    pub fn open_destinations(&self) -> Result<()> {
        let taker = self.taker.to_account_info();
        let token_program = self.token_program.to_account_info();
        let associated_token_program = self.associated_token_program.to_account_info();
        let system_program = self.system_program.to_account_info();

        AssociatedTokenAccount::init_if_needed(
            &self.ata_maker_token_b.to_account_info(),
            &self.maker.to_account_info(),
            &self.token_b.to_account_info(),
            &taker,
            &token_program,
            &associated_token_program,
            &system_program,
        )?;
        AssociatedTokenAccount::init_if_needed(
            &self.ata_taker_token_a.to_account_info(),
            &taker,
            &self.token_a.to_account_info(),
            &taker,
            &token_program,
            &associated_token_program,
            &system_program,
        )
    }

    /// Transfer token_b from taker to maker
    pub fn transfer_to_maker(&mut self, amount: u64) -> Result<()> {
        let cpi_accounts = TransferChecked {
            from: self.ata_taker_token_b.to_account_info(),
            mint: self.token_b.to_account_info(),
            to: self.ata_maker_token_b.to_account_info(),
            authority: self.taker.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new(cpi_program, cpi_accounts);

        transfer_checked(cpi_ctx, amount, self.token_b.decimals)
    }

    /// Withdraw token_a from vault to taker, then close the vault
    pub fn withdraw_and_close_vault(&mut self, escrow: &Escrow, amount: u64) -> Result<()> {
        let bump = [escrow.bump];
        let seeds = escrow.signer_seeds(&bump);
        let signer_seeds: &[&[&[u8]]] = &[&seeds];

        let cpi_accounts = TransferChecked {
            from: self.vault_token_a.to_account_info(),
            mint: self.token_a.to_account_info(),
            to: self.ata_taker_token_a.to_account_info(),
            authority: self.escrow.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

        transfer_checked(cpi_ctx, amount, self.token_a.decimals)?;

        // Vault rent goes to the taker, who pays for this transaction
        let cpi_accounts = CloseAccount {
            account: self.vault_token_a.to_account_info(),
            destination: self.taker.to_account_info(),
            authority: self.escrow.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

        close_account(cpi_ctx)
    }

    /// Close the escrow record and return its rent to the maker
    pub fn close_escrow(&mut self) -> Result<()> {
        ProgramAccount::close(
            &self.escrow.to_account_info(),
            &self.maker.to_account_info(),
        )
    }
}

/// Handler for the take instruction
pub fn handler(ctx: Context<Take>) -> Result<()> {
    let (escrow, settlement) = ctx.accounts.validate()?;
    ctx.accounts.open_destinations()?;

    ctx.accounts.transfer_to_maker(settlement.to_maker)?;
    ctx.accounts.withdraw_and_close_vault(&escrow, settlement.to_taker)?;
    ctx.accounts.close_escrow()?;

    msg!(
        "Took {} of {} for {} of {}",
        settlement.to_taker,
        escrow.token_a,
        settlement.to_maker,
        escrow.token_b
    );
    Ok(())
}
