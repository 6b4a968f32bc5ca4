use anchor_lang::prelude::*;
use anchor_spl::{
    associated_token::AssociatedToken,
    token_interface::{
        close_account, transfer_checked, CloseAccount, Mint, TokenInterface, TransferChecked,
    },
};

use crate::{
    errors::EscrowError,
    helpers::{AssociatedTokenAccount, ProgramAccount},
    state::Escrow,
};

#[derive(Accounts)]
pub struct Refund<'info> {
    /// The maker who originally created the escrow (can refund)
    #[account(mut)]
    pub maker: Signer<'info>,

    /// Token A mint
    #[account(
        constraint = *token_a.to_account_info().owner == token_program.key()
            @ EscrowError::InvalidAccount,
    )]
    pub token_a: InterfaceAccount<'info, Mint>,

    /// CHECK: maker's associated token_a account, checked and created in `open_destination`
    #[account(mut)]
    pub ata_maker_token_a: UncheckedAccount<'info>,

    /// CHECK: vault of `escrow`, validated by `AssociatedTokenAccount::load` after the record loads
    #[account(mut)]
    pub vault_token_a: UncheckedAccount<'info>,

    /// CHECK: escrow record, loaded by `Escrow::load`; a closed record fails with `NotFound`
    #[account(mut)]
    pub escrow: UncheckedAccount<'info>,

    pub token_program: Interface<'info, TokenInterface>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

impl<'info> Refund<'info> {
    /// Load the record, check the signer is its maker, and return the vault balance
    pub fn validate(&self) -> Result<(Escrow, u64)> {
        let escrow = Escrow::load(&self.escrow)?;

        escrow.authorize_refund(&self.maker.key())?;
        escrow.verify_address(self.escrow.key)?;
        require_keys_eq!(escrow.token_a, self.token_a.key(), EscrowError::InvalidAccount);

        let vault = AssociatedTokenAccount::load(
            &self.vault_token_a,
            self.escrow.key,
            &escrow.token_a,
            &self.token_program.key(),
        )?;

        Ok((escrow, vault.amount))
    }

    /// Check the maker's token_a account, creating it when missing
    pub fn open_destination(&self) -> Result<()> {
        let maker = self.maker.to_account_info();

        AssociatedTokenAccount::init_if_needed(
            &self.ata_maker_token_a.to_account_info(),
            &maker,
            &self.token_a.to_account_info(),
            &maker,
            &self.token_program.to_account_info(),
            &self.associated_token_program.to_account_info(),
            &self.system_program.to_account_info(),
        )
    }

    /// Withdraw all token_a from vault back to maker and close the vault
    pub fn refund_and_close_vault(&mut self, escrow: &Escrow, amount: u64) -> Result<()> {
        let bump = [escrow.bump];
        let seeds = escrow.signer_seeds(&bump);
        let signer_seeds: &[&[&[u8]]] = &[&seeds];

        let cpi_accounts = TransferChecked {
            from: self.vault_token_a.to_account_info(),
            mint: self.token_a.to_account_info(),
            to: self.ata_maker_token_a.to_account_info(),
            authority: self.escrow.to_account_info(),
        };
        let cpi_program = self.token_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);

        transfer_checked(cpi_ctx, amount, self.token_a.decimals)?;

        let cpi_accounts = CloseAccount {
            account: self.vault_token_a.to_account_info(),
            destination: self.maker.to_account_info(),
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

/// Handler for the refund instruction
pub fn handler(ctx: Context<Refund>) -> Result<()> {
    let (escrow, amount) = ctx.accounts.validate()?;
    ctx.accounts.open_destination()?;

    ctx.accounts.refund_and_close_vault(&escrow, amount)?;
    ctx.accounts.close_escrow()?;

    msg!("Refunded {} of {} to maker", amount, escrow.token_a);
    Ok(())
}
