use anchor_lang::{prelude::*, system_program};
use anchor_spl::{
    associated_token::{create_idempotent, Create},
    token_interface::TokenAccount,
};

use crate::{errors::EscrowError, pda};

/// Associated token accounts passed in unchecked and verified here, so that
/// every mismatch reports `InvalidAccount`
pub struct AssociatedTokenAccount;

impl AssociatedTokenAccount {
    /// Check that `account` is the live associated account of `authority` for `mint`
    pub fn load(
        account: &AccountInfo,
        authority: &Pubkey,
        mint: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<TokenAccount> {
        require_keys_eq!(
            *account.key,
            pda::associated_address(authority, mint, token_program),
            EscrowError::InvalidAccount
        );
        require_keys_eq!(*account.owner, *token_program, EscrowError::InvalidAccount);

        let data = account.try_borrow_data()?;
        let token = TokenAccount::try_deserialize(&mut &data[..])
            .map_err(|_| error!(EscrowError::InvalidAccount))?;

        require_keys_eq!(token.mint, *mint, EscrowError::InvalidAccount);
        require_keys_eq!(token.owner, *authority, EscrowError::InvalidAccount);
        Ok(token)
    }

    /// Check a destination slot before paying into it
    ///
    /// Returns `true` when nothing exists at the derived address yet and the
    /// account still has to be created.
    pub fn check_destination(
        account: &AccountInfo,
        authority: &Pubkey,
        mint: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<bool> {
        if account.data_is_empty() && *account.owner == system_program::ID {
            require_keys_eq!(
                *account.key,
                pda::associated_address(authority, mint, token_program),
                EscrowError::InvalidAccount
            );
            return Ok(true);
        }
        Self::load(account, authority, mint, token_program).map(|_| false)
    }

    /// Create the associated account unless a valid one is already there
    pub fn init_if_needed<'info>(
        account: &AccountInfo<'info>,
        authority: &AccountInfo<'info>,
        mint: &AccountInfo<'info>,
        payer: &AccountInfo<'info>,
        token_program: &AccountInfo<'info>,
        associated_token_program: &AccountInfo<'info>,
        system_program: &AccountInfo<'info>,
    ) -> Result<()> {
        if !Self::check_destination(account, authority.key, mint.key, token_program.key)? {
            return Ok(());
        }

        let cpi_accounts = Create {
            payer: payer.clone(),
            associated_token: account.clone(),
            authority: authority.clone(),
            mint: mint.clone(),
            system_program: system_program.clone(),
            token_program: token_program.clone(),
        };
        let cpi_ctx = CpiContext::new(associated_token_program.clone(), cpi_accounts);

        create_idempotent(cpi_ctx)
    }
}

pub struct ProgramAccount;

impl ProgramAccount {
    /// Close a program-owned account: move its lamports to `destination`,
    /// hand it back to the system program and drop its data
    pub fn close<'info>(
        account: &AccountInfo<'info>,
        destination: &AccountInfo<'info>,
    ) -> Result<()> {
        let lamports = account.lamports();
        let credited = destination
            .lamports()
            .checked_add(lamports)
            .ok_or(ProgramError::ArithmeticOverflow)?;

        **destination.try_borrow_mut_lamports()? = credited;
        **account.try_borrow_mut_lamports()? = 0;

        account.assign(&system_program::ID);
        account.resize(0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anchor_lang::solana_program::program_pack::Pack;
    use anchor_spl::token::spl_token::state::{Account as SplAccount, AccountState};

    use super::*;
    use crate::state::Escrow;

    const TOKEN_PROGRAM: Pubkey = anchor_spl::token::ID;

    fn code(err: Error) -> ProgramError {
        err.into()
    }

    fn invalid_account() -> ProgramError {
        code(EscrowError::InvalidAccount.into())
    }

    fn load(slot: &mut Slot, authority: &Pubkey, mint: &Pubkey) -> Result<TokenAccount> {
        AssociatedTokenAccount::load(&slot.info(), authority, mint, &TOKEN_PROGRAM)
    }

    fn destination(slot: &mut Slot, authority: &Pubkey, mint: &Pubkey) -> Result<bool> {
        AssociatedTokenAccount::check_destination(&slot.info(), authority, mint, &TOKEN_PROGRAM)
    }

    struct Slot {
        key: Pubkey,
        owner: Pubkey,
        lamports: u64,
        data: Vec<u8>,
    }

    impl Slot {
        fn token(key: Pubkey, mint: Pubkey, authority: Pubkey, amount: u64) -> Self {
            let mut data = vec![0u8; SplAccount::LEN];
            let account = SplAccount {
                mint,
                owner: authority,
                amount,
                state: AccountState::Initialized,
                ..SplAccount::default()
            };
            SplAccount::pack(account, &mut data).unwrap();

            Self {
                key,
                owner: TOKEN_PROGRAM,
                lamports: 2_039_280,
                data,
            }
        }

        fn ata(authority: Pubkey, mint: Pubkey, amount: u64) -> Self {
            let key = pda::associated_address(&authority, &mint, &TOKEN_PROGRAM);
            Self::token(key, mint, authority, amount)
        }

        fn uncreated(key: Pubkey) -> Self {
            Self {
                key,
                owner: system_program::ID,
                lamports: 0,
                data: Vec::new(),
            }
        }

        fn info(&mut self) -> AccountInfo<'_> {
            AccountInfo::new(
                &self.key,
                false,
                true,
                &mut self.lamports,
                &mut self.data,
                &self.owner,
                false,
                0,
            )
        }
    }

    #[test]
    fn vault_loads_with_its_balance() {
        let (escrow, mint) = (Pubkey::new_unique(), Pubkey::new_unique());
        let mut vault = Slot::ata(escrow, mint, 10);

        let token = load(&mut vault, &escrow, &mint).unwrap();

        assert_eq!(token.amount, 10);
        assert_eq!(token.owner, escrow);
    }

    #[test]
    fn vault_at_another_address_is_invalid() {
        let (escrow, mint) = (Pubkey::new_unique(), Pubkey::new_unique());
        let mut vault = Slot::token(Pubkey::new_unique(), mint, escrow, 10);

        let err = load(&mut vault, &escrow, &mint).unwrap_err();

        assert_eq!(code(err), invalid_account());
    }

    #[test]
    fn vault_owned_by_another_program_is_invalid() {
        let (escrow, mint) = (Pubkey::new_unique(), Pubkey::new_unique());
        let mut vault = Slot::ata(escrow, mint, 10);
        vault.owner = Pubkey::new_unique();

        let err = load(&mut vault, &escrow, &mint).unwrap_err();

        assert_eq!(code(err), invalid_account());
    }

    #[test]
    fn vault_of_another_mint_is_invalid() {
        let (escrow, mint) = (Pubkey::new_unique(), Pubkey::new_unique());
        let key = pda::associated_address(&escrow, &mint, &TOKEN_PROGRAM);
        let mut vault = Slot::token(key, Pubkey::new_unique(), escrow, 10);

        let err = load(&mut vault, &escrow, &mint).unwrap_err();

        assert_eq!(code(err), invalid_account());
    }

    #[test]
    fn vault_with_another_authority_is_invalid() {
        let (escrow, mint) = (Pubkey::new_unique(), Pubkey::new_unique());
        let key = pda::associated_address(&escrow, &mint, &TOKEN_PROGRAM);
        let mut vault = Slot::token(key, mint, Pubkey::new_unique(), 10);

        let err = load(&mut vault, &escrow, &mint).unwrap_err();

        assert_eq!(code(err), invalid_account());
    }

    #[test]
    fn vault_that_is_not_a_token_account_is_invalid() {
        let (escrow, mint) = (Pubkey::new_unique(), Pubkey::new_unique());
        let mut vault = Slot::ata(escrow, mint, 10);
        vault.data = vec![0u8; SplAccount::LEN];

        let err = load(&mut vault, &escrow, &mint).unwrap_err();
        assert_eq!(code(err), invalid_account());

        vault.data.truncate(40);
        let err = load(&mut vault, &escrow, &mint).unwrap_err();
        assert_eq!(code(err), invalid_account());
    }

    #[test]
    fn token_b_account_in_token_a_destination_is_invalid() {
        let taker = Pubkey::new_unique();
        let (token_a, token_b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let mut slot = Slot::ata(taker, token_b, 500);

        let err = destination(&mut slot, &taker, &token_a).unwrap_err();

        assert_eq!(code(err), invalid_account());
    }

    #[test]
    fn destination_of_another_wallet_is_invalid() {
        let (maker, taker, token_b) = (
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );
        let mut slot = Slot::ata(taker, token_b, 0);

        let err = destination(&mut slot, &maker, &token_b).unwrap_err();

        assert_eq!(code(err), invalid_account());
    }

    #[test]
    fn existing_destination_is_reused() {
        let (maker, token_b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let mut slot = Slot::ata(maker, token_b, 3);

        let create = destination(&mut slot, &maker, &token_b).unwrap();

        assert!(!create);
    }

    #[test]
    fn uncreated_destination_must_sit_at_the_derived_address() {
        let (maker, token_b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let derived = pda::associated_address(&maker, &token_b, &TOKEN_PROGRAM);

        let mut slot = Slot::uncreated(derived);
        let create = destination(&mut slot, &maker, &token_b).unwrap();
        assert!(create);

        let mut slot = Slot::uncreated(Pubkey::new_unique());
        let err = destination(&mut slot, &maker, &token_b).unwrap_err();
        assert_eq!(code(err), invalid_account());
    }

    /// Account as the runtime serializes it: the original data length sits
    /// just before the key and the current length just before the data
    #[allow(dead_code)]
    #[repr(C, align(8))]
    struct Serialized {
        original_data_len: u32,
        key: Pubkey,
        _pad: [u8; 4],
        data_len: u64,
        data: [u8; Escrow::SPACE],
    }

    #[test]
    fn close_drains_reassigns_and_empties_the_record() {
        let mut record = Serialized {
            original_data_len: Escrow::SPACE as u32,
            key: Pubkey::new_unique(),
            _pad: [0; 4],
            data_len: Escrow::SPACE as u64,
            data: [7; Escrow::SPACE],
        };
        let owner = crate::ID;
        let mut lamports = 1_628_640;
        let info = AccountInfo::new(
            &record.key,
            false,
            true,
            &mut lamports,
            &mut record.data,
            &owner,
            false,
            0,
        );
        let mut maker = Slot::uncreated(Pubkey::new_unique());
        maker.lamports = 1_000;
        let destination = maker.info();

        ProgramAccount::close(&info, &destination).unwrap();

        let reassigned = unsafe { std::ptr::read_volatile(info.owner) };
        assert_eq!(reassigned, system_program::ID);
        assert_eq!(info.lamports(), 0);
        assert_eq!(info.data_len(), 0);
        assert_eq!(destination.lamports(), 1_629_640);

        // a later take or refund sees nothing there
        let err = Escrow::load(&info).unwrap_err();
        assert_eq!(code(err), code(EscrowError::NotFound.into()));
    }
}
