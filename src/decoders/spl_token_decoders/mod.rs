pub mod account;
pub mod mint;

// --- FIXTURES DE TEST ---

#[cfg(test)]
pub(crate) fn mint_fixture(decimals: u8, supply: u64) -> Vec<u8> {
    use solana_program_pack::Pack;
    let mint = spl_token::state::Mint {
        mint_authority: None.into(),
        supply,
        decimals,
        is_initialized: true,
        freeze_authority: None.into(),
    };
    let mut data = vec![0u8; spl_token::state::Mint::LEN];
    spl_token::state::Mint::pack(mint, &mut data).unwrap();
    data
}

#[cfg(test)]
pub(crate) fn token_account_fixture(mint: &solana_sdk::pubkey::Pubkey, owner: &solana_sdk::pubkey::Pubkey, amount: u64) -> Vec<u8> {
    use solana_program_pack::Pack;
    let account = spl_token::state::Account {
        mint: *mint,
        owner: *owner,
        amount,
        state: spl_token::state::AccountState::Initialized,
        ..spl_token::state::Account::default()
    };
    let mut data = vec![0u8; spl_token::state::Account::LEN];
    spl_token::state::Account::pack(account, &mut data).unwrap();
    data
}
