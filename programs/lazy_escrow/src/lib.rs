use anchor_lang::prelude::*;

pub mod constants;
mod errors;
mod helpers;
mod instructions;
pub mod pda;
pub mod state;

pub use errors::EscrowError;
use instructions::*;

declare_id!("G12PpJUib62fdSGLveZxVTZnr9wnmF2bXsfY7TFPDAxX");

#[program]
pub mod lazy_escrow {
    use super::*;

    /// Open an offer: maker deposits token_a and names the token_b amount wanted
    ///
    /// Arguments come in wire order: `amount_wanted` (token_b asked in return)
    /// first, then `amount_offered` (token_a moved into the vault). `make(10, 20)`
    /// therefore deposits 20 and asks for 10.
    #[instruction(discriminator = 0)]
    pub fn make(ctx: Context<Make>, amount_wanted: u64, amount_offered: u64) -> Result<()> {
        instructions::make::handler(ctx, amount_wanted, amount_offered)
    }

    /// Fill the offer: taker sends token_b, receives the vault's token_a
    #[instruction(discriminator = 1)]
    pub fn take(ctx: Context<Take>) -> Result<()> {
        instructions::take::handler(ctx)
    }

    /// Cancel the offer: maker reclaims token_a
    #[instruction(discriminator = 2)]
    pub fn refund(ctx: Context<Refund>) -> Result<()> {
        instructions::refund::handler(ctx)
    }
}
