// DANS : src/state/reconciler.rs

use crate::models::{DraftPoolRecord, PoolRecord, Provenance, UnifiedPoolView};
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    pub views: Vec<UnifiedPoolView>,
    /// Identités des brouillons qui ont trouvé leur pool on-chain.
    pub superseded: Vec<Pubkey>,
}

/// Fusionne les pools on-chain et les brouillons locaux en une seule liste.
///
/// Clé de correspondance : l'adresse du pool quand le brouillon la connaît,
/// sinon le mint échangé. Chaque pool apparaît une fois (enrichi du brouillon
/// le plus récent qui lui correspond), chaque brouillon orphelin une fois.
/// Les champs numériques viennent toujours du pool ; les champs descriptifs
/// viennent des métadonnées on-chain, à défaut du brouillon.
///
/// Fonction pure : même entrée, même sortie, dans le même ordre.
pub fn reconcile(pools: &[PoolRecord], drafts: &[DraftPoolRecord]) -> Reconciliation {
    // Un pool par adresse, le premier vu l'emporte.
    let mut seen = HashSet::new();
    let pools: Vec<&PoolRecord> = pools.iter().filter(|p| seen.insert(p.address)).collect();

    let by_address: HashMap<Pubkey, usize> = pools.iter().enumerate().map(|(i, p)| (p.address, i)).collect();
    let mut by_mint: HashMap<Pubkey, usize> = HashMap::new();
    for (i, pool) in pools.iter().enumerate() {
        by_mint.entry(pool.traded.mint).or_insert(i);
    }

    let mut matched: HashMap<usize, &DraftPoolRecord> = HashMap::new();
    let mut orphans: HashMap<Pubkey, &DraftPoolRecord> = HashMap::new();
    let mut superseded = HashSet::new();

    for draft in drafts {
        let target = match draft.pool_address {
            Some(address) => by_address.get(&address),
            None => by_mint.get(&draft.traded_mint),
        };
        match target {
            Some(&index) => {
                superseded.insert(draft.identity());
                let slot = matched.entry(index).or_insert(draft);
                if is_newer(draft, slot) {
                    *slot = draft;
                }
            }
            None => {
                let slot = orphans.entry(draft.identity()).or_insert(draft);
                if is_newer(draft, slot) {
                    *slot = draft;
                }
            }
        }
    }

    let mut views: Vec<UnifiedPoolView> = pools
        .iter()
        .enumerate()
        .map(|(i, pool)| merge(pool, matched.get(&i).copied()))
        .chain(orphans.values().map(|draft| local_only(draft)))
        .collect();

    views.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.traded_mint.cmp(&b.traded_mint))
            .then_with(|| a.pool_address.cmp(&b.pool_address))
            .then_with(|| a.provenance.cmp(&b.provenance))
    });

    let mut superseded: Vec<Pubkey> = superseded.into_iter().collect();
    superseded.sort();

    Reconciliation { views, superseded }
}

/// Départage entre deux brouillons de même clé, indépendamment de l'ordre d'entrée.
fn is_newer(candidate: &DraftPoolRecord, current: &DraftPoolRecord) -> bool {
    (candidate.created_at, &candidate.signature, &candidate.name) > (current.created_at, &current.signature, &current.name)
}

fn merge(pool: &PoolRecord, draft: Option<&DraftPoolRecord>) -> UnifiedPoolView {
    let metadata = pool.metadata.as_ref();
    let non_empty = |value: &String| (!value.is_empty()).then(|| value.clone());

    UnifiedPoolView {
        pool_address: Some(pool.address),
        traded_mint: pool.traded.mint,
        quote_mint: pool.quote.mint,
        name: metadata.and_then(|m| non_empty(&m.name)).or_else(|| draft.map(|d| d.name.clone())),
        symbol: metadata.and_then(|m| non_empty(&m.symbol)).or_else(|| draft.map(|d| d.symbol.clone())),
        description: metadata
            .and_then(|m| m.description.clone())
            .or_else(|| draft.and_then(|d| d.description.clone())),
        image_uri: metadata
            .and_then(|m| m.image_uri.clone())
            .or_else(|| draft.and_then(|d| d.image_uri.clone())),
        traded_balance: Some(pool.traded.balance),
        quote_balance: Some(pool.quote.balance),
        traded_supply: pool.traded_supply,
        migration_threshold: pool.migration_threshold,
        creator: pool.creator,
        active: pool.active,
        created_at: pool.created_at.or(draft.map(|d| d.created_at)).unwrap_or(0),
        provenance: if draft.is_some() { Provenance::Merged } else { Provenance::OnChainOnly },
    }
}

/// Sans compte on-chain, `active` reflète ce que le brouillon sait : envoyé
/// (signature connue) et pas encore remplacé par un pool observé.
fn local_only(draft: &DraftPoolRecord) -> UnifiedPoolView {
    UnifiedPoolView {
        pool_address: draft.pool_address,
        traded_mint: draft.traded_mint,
        quote_mint: draft.quote_mint,
        name: Some(draft.name.clone()),
        symbol: Some(draft.symbol.clone()),
        description: draft.description.clone(),
        image_uri: draft.image_uri.clone(),
        traded_balance: None,
        quote_balance: None,
        traded_supply: None,
        migration_threshold: None,
        creator: draft.creator,
        active: draft.signature.is_some() && !draft.superseded,
        created_at: draft.created_at,
        provenance: Provenance::LocalOnly,
    }
}

#[cfg(test)]
pub(crate) fn pool_fixture(address: Pubkey, traded_mint: Pubkey, created_at: Option<i64>) -> PoolRecord {
    use crate::models::ReserveDescriptor;
    PoolRecord {
        address,
        signer: Pubkey::new_unique(),
        traded: ReserveDescriptor { mint: traded_mint, balance: 690_000_000, vault: Pubkey::new_unique() },
        quote: ReserveDescriptor { mint: crate::derivation::WSOL_MINT, balance: 5_000_000_000, vault: Pubkey::new_unique() },
        fee_vault: Pubkey::new_unique(),
        config_record: Pubkey::new_unique(),
        creator: Pubkey::new_unique(),
        active: true,
        migrated: false,
        migration_threshold: Some(85_000_000_000),
        traded_supply: Some(1_000_000_000),
        traded_decimals: Some(6),
        created_at,
        metadata: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenMetadataRecord;
    use crate::state::drafts::draft_fixture;

    #[test]
    fn draft_becomes_merged_once_its_pool_appears() {
        let pool_address = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let drafts = vec![draft_fixture(Some(pool_address), mint, "cat", 100)];

        let before = reconcile(&[], &drafts);
        assert_eq!(before.views.len(), 1);
        assert_eq!(before.views[0].provenance, Provenance::LocalOnly);
        assert!(before.superseded.is_empty());

        let pools = vec![pool_fixture(pool_address, mint, Some(50))];
        let after = reconcile(&pools, &drafts);
        assert_eq!(after.views.len(), 1);
        let view = &after.views[0];
        assert_eq!(view.provenance, Provenance::Merged);
        assert_eq!(view.name.as_deref(), Some("cat"));
        assert_eq!(view.description.as_deref(), Some("cat description"));
        assert_eq!(view.traded_balance, Some(690_000_000));
        assert_eq!(view.quote_balance, Some(5_000_000_000));
        assert_eq!(view.created_at, 50);
        assert_eq!(after.superseded, vec![pool_address]);
    }

    #[test]
    fn local_only_activity_follows_the_draft() {
        let unsent = draft_fixture(None, Pubkey::new_unique(), "unsent", 3);
        let mut sent = draft_fixture(None, Pubkey::new_unique(), "sent", 2);
        sent.signature = Some("5sig".into());
        let mut replaced = draft_fixture(None, Pubkey::new_unique(), "replaced", 1);
        replaced.signature = Some("6sig".into());
        replaced.superseded = true;

        let result = reconcile(&[], &[unsent, sent, replaced]);
        let activity: Vec<(Option<&str>, bool)> =
            result.views.iter().map(|v| (v.name.as_deref(), v.active)).collect();
        assert_eq!(activity, vec![(Some("unsent"), false), (Some("sent"), true), (Some("replaced"), false)]);
    }

    #[test]
    fn draft_without_address_matches_on_traded_mint() {
        let mint = Pubkey::new_unique();
        let pools = vec![pool_fixture(Pubkey::new_unique(), mint, None)];
        let drafts = vec![draft_fixture(None, mint, "dog", 7)];
        let result = reconcile(&pools, &drafts);
        assert_eq!(result.views.len(), 1);
        assert_eq!(result.views[0].provenance, Provenance::Merged);
        assert_eq!(result.views[0].created_at, 7);
    }

    #[test]
    fn onchain_metadata_wins_over_draft_descriptions() {
        let mint = Pubkey::new_unique();
        let mut pool = pool_fixture(Pubkey::new_unique(), mint, Some(1));
        pool.metadata = Some(TokenMetadataRecord {
            name: "Real Name".into(),
            symbol: "REAL".into(),
            uri: String::new(),
            image_uri: Some("https://img/real.png".into()),
            description: None,
        });
        let result = reconcile(&[pool], &[draft_fixture(None, mint, "draft", 1)]);
        let view = &result.views[0];
        assert_eq!(view.name.as_deref(), Some("Real Name"));
        assert_eq!(view.image_uri.as_deref(), Some("https://img/real.png"));
        // Absent on-chain : repli sur le brouillon.
        assert_eq!(view.description.as_deref(), Some("draft description"));
    }

    #[test]
    fn each_pool_appears_once_with_the_newest_draft() {
        let mint = Pubkey::new_unique();
        let address = Pubkey::new_unique();
        let pools = vec![pool_fixture(address, mint, Some(1)), pool_fixture(address, mint, Some(1))];
        let drafts = vec![
            draft_fixture(None, mint, "old", 1),
            draft_fixture(Some(address), mint, "new", 9),
        ];
        let result = reconcile(&pools, &drafts);
        assert_eq!(result.views.len(), 1);
        assert_eq!(result.views[0].name.as_deref(), Some("new"));
    }

    #[test]
    fn output_is_newest_first_and_idempotent() {
        let pools: Vec<PoolRecord> = (0..5)
            .map(|i| pool_fixture(Pubkey::new_unique(), Pubkey::new_unique(), Some(i * 10)))
            .collect();
        let drafts: Vec<DraftPoolRecord> = (0..3)
            .map(|i| draft_fixture(None, Pubkey::new_unique(), "orphan", 15 + i))
            .collect();

        let first = reconcile(&pools, &drafts);
        let second = reconcile(&pools, &drafts);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first.views).unwrap(),
            serde_json::to_vec(&second.views).unwrap()
        );

        let timestamps: Vec<i64> = first.views.iter().map(|v| v.created_at).collect();
        let mut sorted = timestamps.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(timestamps, sorted);
        assert_eq!(first.views.len(), 8);

        let mut reversed_drafts = drafts.clone();
        reversed_drafts.reverse();
        assert_eq!(reconcile(&pools, &reversed_drafts).views, first.views);
    }
}
