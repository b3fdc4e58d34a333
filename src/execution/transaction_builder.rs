// DANS : src/execution/transaction_builder.rs

use crate::derivation::{self, PoolAddresses, TOKEN_METADATA_PROGRAM_ID, WSOL_MINT};
use crate::error::{LaunchpadError, LaunchpadResult};
use crate::execution::instructions::{LaunchpadInstruction, MetadataArgs, SwapArgs, TargetConfigArgs};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
    transaction::Transaction,
};
// Import déprécié mais toujours exposé par solana-sdk 2.x.
#[allow(deprecated)]
use solana_sdk::system_instruction;
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

/// Les comptes d'un pool existant nécessaires aux instructions de trading.
#[derive(Debug, Clone, Copy)]
pub struct PoolAccounts {
    pub pool: Pubkey,
    pub traded_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub derived: PoolAddresses,
}

impl PoolAccounts {
    pub fn derive(pool: Pubkey, traded_mint: Pubkey, quote_mint: Pubkey, program_id: &Pubkey) -> LaunchpadResult<Self> {
        Ok(Self {
            pool,
            traded_mint,
            quote_mint,
            derived: derivation::pool_addresses(&pool, &traded_mint, &quote_mint, program_id)?,
        })
    }
}

/// Construit les instructions du launchpad et leurs instructions annexes
/// (comptes associés idempotents, wrap/unwrap du SOL).
#[derive(Debug, Clone, Copy)]
pub struct LaunchpadTransactionBuilder {
    program_id: Pubkey,
    fee_authority: Option<Pubkey>,
}

fn token_error(e: impl std::fmt::Display) -> LaunchpadError {
    LaunchpadError::invalid_argument("token_instruction", e.to_string())
}

impl LaunchpadTransactionBuilder {
    pub fn new(program_id: Pubkey, fee_authority: Option<Pubkey>) -> Self {
        Self { program_id, fee_authority }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    fn instruction(&self, ix: &LaunchpadInstruction, accounts: Vec<AccountMeta>) -> LaunchpadResult<Instruction> {
        Ok(Instruction {
            program_id: self.program_id,
            accounts,
            data: ix.encode()?,
        })
    }

    pub fn init_target_config(
        &self,
        creator: &Pubkey,
        quote_mint: &Pubkey,
        traded_mint: &Pubkey,
        token_target_amount: u64,
    ) -> LaunchpadResult<Vec<Instruction>> {
        let ix = LaunchpadInstruction::InitTargetConfig(TargetConfigArgs { token_target_amount });
        ix.validate()?;
        let config = derivation::target_config(quote_mint, traded_mint, &self.program_id)?;
        Ok(vec![self.instruction(&ix, vec![
            AccountMeta::new(*creator, true),
            AccountMeta::new(config.address, false),
            AccountMeta::new_readonly(*quote_mint, false),
            AccountMeta::new_readonly(*traded_mint, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ])?])
    }

    /// Crée le pool puis ses métadonnées. Les vaults du signer du pool sont
    /// créés de façon idempotente dans la même transaction.
    pub fn new_pool(
        &self,
        sender: &Pubkey,
        traded_mint: &Pubkey,
        quote_mint: &Pubkey,
        metadata: MetadataArgs,
    ) -> LaunchpadResult<(Pubkey, Vec<Instruction>)> {
        let metadata_ix = LaunchpadInstruction::CreateMetadata(metadata);
        metadata_ix.validate()?;
        if traded_mint == quote_mint {
            return Err(LaunchpadError::invalid_argument("traded_mint", "doit différer du mint de cotation"));
        }

        let pool = derivation::bound_pool(traded_mint, quote_mint, &self.program_id)?.address;
        let accounts = PoolAccounts::derive(pool, *traded_mint, *quote_mint, &self.program_id)?;
        let signer = accounts.derived.signer.address;
        let fee_owner = self.fee_authority.unwrap_or(*sender);
        let fee_quote_vault = get_associated_token_address(&fee_owner, quote_mint);
        let metadata_address = derivation::metadata_record(traded_mint)?.address;

        let mut instructions = vec![
            create_associated_token_account_idempotent(sender, &signer, traded_mint, &spl_token::id()),
            create_associated_token_account_idempotent(sender, &signer, quote_mint, &spl_token::id()),
            create_associated_token_account_idempotent(sender, &fee_owner, quote_mint, &spl_token::id()),
        ];
        instructions.push(self.instruction(&LaunchpadInstruction::NewPool, vec![
            AccountMeta::new(*sender, true),
            AccountMeta::new(pool, false),
            AccountMeta::new(accounts.derived.meme_vault, false),
            AccountMeta::new(accounts.derived.quote_vault, false),
            AccountMeta::new(*traded_mint, false),
            AccountMeta::new_readonly(*quote_mint, false),
            AccountMeta::new(fee_quote_vault, false),
            AccountMeta::new_readonly(accounts.derived.target_config, false),
            AccountMeta::new_readonly(signer, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        ])?);
        instructions.push(self.instruction(&metadata_ix, vec![
            AccountMeta::new(*sender, true),
            AccountMeta::new_readonly(pool, false),
            AccountMeta::new_readonly(*traded_mint, false),
            AccountMeta::new_readonly(signer, false),
            AccountMeta::new(metadata_address, false),
            AccountMeta::new_readonly(TOKEN_METADATA_PROGRAM_ID, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ])?);
        Ok((pool, instructions))
    }

    /// Achat (quote -> meme). Avec WSOL en cotation, le SOL est enveloppé avant
    /// le swap et le reliquat récupéré après.
    #[allow(deprecated)]
    pub fn buy(&self, owner: &Pubkey, pool: &PoolAccounts, args: SwapArgs) -> LaunchpadResult<Vec<Instruction>> {
        let ix = LaunchpadInstruction::SwapY(args);
        ix.validate()?;
        let user_quote = get_associated_token_address(owner, &pool.quote_mint);
        let user_meme = get_associated_token_address(owner, &pool.traded_mint);
        let wraps_sol = pool.quote_mint == WSOL_MINT;

        let mut instructions = vec![
            create_associated_token_account_idempotent(owner, owner, &pool.quote_mint, &spl_token::id()),
            create_associated_token_account_idempotent(owner, owner, &pool.traded_mint, &spl_token::id()),
        ];
        if wraps_sol {
            instructions.push(system_instruction::transfer(owner, &user_quote, args.coin_in_amount));
            instructions.push(spl_token::instruction::sync_native(&spl_token::id(), &user_quote).map_err(token_error)?);
        }
        // Ordre des comptes de `SwapCoinY`.
        instructions.push(self.instruction(&ix, vec![
            AccountMeta::new(pool.pool, false),
            AccountMeta::new(pool.derived.meme_vault, false),
            AccountMeta::new(pool.derived.quote_vault, false),
            AccountMeta::new(user_quote, false),
            AccountMeta::new(user_meme, false),
            AccountMeta::new(*owner, true),
            AccountMeta::new_readonly(pool.derived.signer.address, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ])?);
        if wraps_sol {
            instructions.push(close_wsol(owner, &user_quote)?);
        }
        Ok(instructions)
    }

    /// Vente (meme -> quote).
    pub fn sell(&self, owner: &Pubkey, pool: &PoolAccounts, args: SwapArgs) -> LaunchpadResult<Vec<Instruction>> {
        let ix = LaunchpadInstruction::SwapX(args);
        ix.validate()?;
        let user_quote = get_associated_token_address(owner, &pool.quote_mint);
        let user_meme = get_associated_token_address(owner, &pool.traded_mint);

        let mut instructions = vec![create_associated_token_account_idempotent(
            owner,
            owner,
            &pool.quote_mint,
            &spl_token::id(),
        )];
        instructions.push(self.instruction(&ix, vec![
            AccountMeta::new(pool.pool, false),
            AccountMeta::new(pool.derived.meme_vault, false),
            AccountMeta::new(pool.derived.quote_vault, false),
            AccountMeta::new(user_meme, false),
            AccountMeta::new(user_quote, false),
            AccountMeta::new(*owner, true),
            AccountMeta::new_readonly(pool.derived.signer.address, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ])?);
        if pool.quote_mint == WSOL_MINT {
            instructions.push(close_wsol(owner, &user_quote)?);
        }
        Ok(instructions)
    }

    /// Migration vers l'AMM. Les comptes côté AMM sont fournis par l'appelant,
    /// dans l'ordre attendu par le programme.
    pub fn migrate(&self, payer: &Pubkey, pool: &PoolAccounts, amm_accounts: Vec<AccountMeta>) -> LaunchpadResult<Vec<Instruction>> {
        let mut accounts = vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(pool.pool, false),
            AccountMeta::new_readonly(pool.derived.signer.address, false),
            AccountMeta::new(pool.derived.meme_vault, false),
            AccountMeta::new(pool.derived.quote_vault, false),
            AccountMeta::new_readonly(pool.traded_mint, false),
            AccountMeta::new_readonly(pool.quote_mint, false),
        ];
        accounts.extend(amm_accounts);
        Ok(vec![self.instruction(&LaunchpadInstruction::MigrateToRaydium, accounts)?])
    }
}

fn close_wsol(owner: &Pubkey, account: &Pubkey) -> LaunchpadResult<Instruction> {
    spl_token::instruction::close_account(&spl_token::id(), account, owner, owner, &[]).map_err(token_error)
}

/// Transaction legacy non signée, payée par `payer`. Le blockhash est posé à l'envoi.
pub fn unsigned_transaction(instructions: &[Instruction], payer: &Pubkey) -> Transaction {
    Transaction::new_with_payer(instructions, Some(payer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::LAUNCHPAD_PROGRAM_ID;

    fn builder() -> LaunchpadTransactionBuilder {
        LaunchpadTransactionBuilder::new(LAUNCHPAD_PROGRAM_ID, None)
    }

    fn launchpad_ix(instructions: &[Instruction]) -> &Instruction {
        instructions.iter().find(|ix| ix.program_id == LAUNCHPAD_PROGRAM_ID).unwrap()
    }

    #[test]
    fn buy_wraps_sol_and_uses_swap_y_account_order() {
        let owner = Pubkey::new_unique();
        let pool = PoolAccounts::derive(Pubkey::new_unique(), Pubkey::new_unique(), WSOL_MINT, &LAUNCHPAD_PROGRAM_ID).unwrap();
        let instructions = builder().buy(&owner, &pool, SwapArgs { coin_in_amount: 1_000, min_out: 1 }).unwrap();
        assert_eq!(instructions.len(), 6);

        let swap = launchpad_ix(&instructions);
        assert_eq!(
            LaunchpadInstruction::decode(&swap.data).unwrap(),
            LaunchpadInstruction::SwapY(SwapArgs { coin_in_amount: 1_000, min_out: 1 })
        );
        assert_eq!(swap.accounts[0].pubkey, pool.pool);
        assert_eq!(swap.accounts[1].pubkey, pool.derived.meme_vault);
        assert_eq!(swap.accounts[3].pubkey, get_associated_token_address(&owner, &WSOL_MINT));
        assert!(swap.accounts[5].is_signer);
        assert_eq!(swap.accounts[6].pubkey, pool.derived.signer.address);
    }

    #[test]
    fn zero_amount_buy_is_rejected() {
        let pool = PoolAccounts::derive(Pubkey::new_unique(), Pubkey::new_unique(), WSOL_MINT, &LAUNCHPAD_PROGRAM_ID).unwrap();
        let result = builder().buy(&Pubkey::new_unique(), &pool, SwapArgs { coin_in_amount: 0, min_out: 0 });
        assert!(matches!(result, Err(LaunchpadError::InvalidArgument { .. })));
    }

    #[test]
    fn new_pool_derives_pool_and_vaults() {
        let sender = Pubkey::new_unique();
        let meme = Pubkey::new_unique();
        let metadata = MetadataArgs { name: "Cat".into(), symbol: "CAT".into(), uri: "https://x/cat.json".into() };
        let (pool, instructions) = builder().new_pool(&sender, &meme, &WSOL_MINT, metadata).unwrap();

        assert_eq!(pool, derivation::bound_pool(&meme, &WSOL_MINT, &LAUNCHPAD_PROGRAM_ID).unwrap().address);
        let new_pool = launchpad_ix(&instructions);
        assert_eq!(new_pool.data, LaunchpadInstruction::NewPool.encode().unwrap());
        let signer = derivation::pool_signer(&pool, &LAUNCHPAD_PROGRAM_ID).unwrap().address;
        assert_eq!(new_pool.accounts[2].pubkey, derivation::vault(&signer, &meme));
        assert_eq!(instructions.iter().filter(|ix| ix.program_id == LAUNCHPAD_PROGRAM_ID).count(), 2);
    }

    #[test]
    fn init_target_config_targets_the_config_pda() {
        let creator = Pubkey::new_unique();
        let meme = Pubkey::new_unique();
        let instructions = builder().init_target_config(&creator, &WSOL_MINT, &meme, 85_000_000_000).unwrap();
        let config = derivation::target_config(&WSOL_MINT, &meme, &LAUNCHPAD_PROGRAM_ID).unwrap().address;
        assert_eq!(instructions[0].accounts[1].pubkey, config);
        assert!(builder().init_target_config(&creator, &WSOL_MINT, &meme, 0).is_err());
    }

    #[test]
    fn unsigned_transaction_has_payer_first() {
        let owner = Pubkey::new_unique();
        let pool = PoolAccounts::derive(Pubkey::new_unique(), Pubkey::new_unique(), WSOL_MINT, &LAUNCHPAD_PROGRAM_ID).unwrap();
        let instructions = builder().sell(&owner, &pool, SwapArgs { coin_in_amount: 5, min_out: 0 }).unwrap();
        let tx = unsigned_transaction(&instructions, &owner);
        assert_eq!(tx.message.account_keys[0], owner);
        assert_eq!(tx.message.header.num_required_signatures, 1);
    }
}
