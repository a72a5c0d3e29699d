//! # Adversarial Property Tests
//!
//! Randomized call sequences against the coordinator. After every step the
//! allocator invariants must hold and the mirror must agree with the
//! allocator for every item.
//!
//! Runs are seeded with `StdRng::seed_from_u64` so failures reproduce.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use reveal_allocator::prelude::*;
use std::collections::HashSet;

// =============================================================================
// TEST HELPERS
// =============================================================================

const ITEM_SPACE: u64 = 40;

fn holder() -> Address {
    Address::new([0x42; 20])
}

fn random_word(rng: &mut StdRng) -> U256 {
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes[..]);
    U256::from_big_endian(&bytes)
}

async fn assert_consistent(coordinator: &InMemoryCoordinator, step: usize) {
    let check = coordinator.check_invariants().await;
    assert!(check.is_valid(), "step {step}: {check:?}");

    for raw in 1..=ITEM_SPACE {
        let item = ItemId(raw);
        assert_eq!(
            coordinator.mirror().raw_index(item),
            coordinator.asset_index_raw(item).await,
            "step {step}: mirror disagrees for {item}"
        );
    }
}

async fn assigned_indices(coordinator: &InMemoryCoordinator) -> Vec<AssetIndex> {
    let mut indices = Vec::new();
    for raw in 1..=ITEM_SPACE {
        if let RollState::Assigned(index) = coordinator.roll_state(ItemId(raw)).await {
            indices.push(index);
        }
    }
    indices
}

/// One randomized run. Returns the number of assigned items.
async fn run_random_sequence(seed: u64, pool: u64, steps: usize) -> usize {
    let mut rng = StdRng::seed_from_u64(seed);
    let coordinator = create_test_coordinator(RevealConfig::default());
    let owner = coordinator.config().owner;
    let oracle = coordinator.config().oracle_address;
    coordinator.initialize_pool(owner, pool).await.unwrap();

    let mut open: Vec<RequestId> = Vec::new();
    let mut consumed: Vec<RequestId> = Vec::new();

    for step in 0..steps {
        match rng.gen_range(0..10) {
            // Request a batch of random items; may hit rolling/assigned items.
            0..=3 => {
                let size = rng.gen_range(1..=4);
                let mut items: Vec<u64> = (1..=ITEM_SPACE).collect();
                items.shuffle(&mut rng);
                let entries: Vec<RevealEntry> = items[..size]
                    .iter()
                    .map(|raw| RevealEntry::new(holder(), ItemId(*raw)))
                    .collect();
                let rolling_before = coordinator.rolling_count().await;

                match coordinator.request_reveal(&entries).await {
                    Ok(id) => open.push(id),
                    Err(err) => {
                        assert_eq!(err.category(), ErrorCategory::Precondition);
                        assert_eq!(coordinator.rolling_count().await, rolling_before);
                    }
                }
            }
            // Fulfill an open request.
            4..=6 if !open.is_empty() => {
                let id = open.swap_remove(rng.gen_range(0..open.len()));
                let count = coordinator.oracle().pending_words(id).unwrap_or(0);
                let words: Vec<U256> = (0..count).map(|_| random_word(&mut rng)).collect();
                let pool_before = coordinator.pool_size().await;
                let tracked = coordinator.pending_requests().await.contains(&id);

                match coordinator.on_fulfill(oracle, id, &words).await {
                    Ok(revealed) => {
                        assert_eq!(coordinator.pool_size().await, pool_before - revealed.len());
                        consumed.push(id);
                    }
                    Err(RevealError::Pool(PoolError::PoolExhausted)) => {
                        assert_eq!(coordinator.pool_size().await, pool_before);
                        open.push(id);
                    }
                    // The owner already revealed the whole batch.
                    Err(RevealError::Tracker(TrackerError::UnknownRequest(_))) => {
                        assert!(!tracked, "step {step}: tracked request {id} rejected");
                        assert_eq!(coordinator.pool_size().await, pool_before);
                        consumed.push(id);
                    }
                    Err(other) => panic!("step {step}: unexpected {other}"),
                }
            }
            // Replay a consumed request.
            7 if !consumed.is_empty() => {
                let id = *consumed.choose(&mut rng).unwrap();
                let pool_before = coordinator.pool_size().await;
                let err = coordinator
                    .on_fulfill(oracle, id, &[U256::zero()])
                    .await
                    .unwrap_err();
                assert_eq!(err, RevealError::Tracker(TrackerError::UnknownRequest(id)));
                assert_eq!(coordinator.pool_size().await, pool_before);
            }
            // Owner fallback on a random item.
            8 => {
                let item = ItemId(rng.gen_range(1..=ITEM_SPACE));
                let was_rolling = coordinator.roll_state(item).await.is_rolling();
                match coordinator.reveal_by_owner(owner, item).await {
                    Ok(_) => assert!(was_rolling),
                    Err(RevealError::Ledger(LedgerError::NotRolling(_))) => assert!(!was_rolling),
                    Err(RevealError::Pool(PoolError::PoolExhausted)) => {}
                    Err(other) => panic!("step {step}: unexpected {other}"),
                }
            }
            // Stranger pokes privileged entry points.
            _ => {
                let stranger = Address::new([rng.gen(); 20]);
                if stranger != owner && stranger != oracle {
                    let item = ItemId(rng.gen_range(1..=ITEM_SPACE));
                    let err = coordinator.reveal_by_owner(stranger, item).await.unwrap_err();
                    assert!(err.is_authorization());
                    if let Some(id) = open.first() {
                        let err = coordinator
                            .on_fulfill(stranger, *id, &[])
                            .await
                            .unwrap_err();
                        assert!(err.is_authorization());
                    }
                }
            }
        }

        assert_consistent(&coordinator, step).await;
    }

    let indices = assigned_indices(&coordinator).await;
    let distinct: HashSet<AssetIndex> = indices.iter().copied().collect();
    assert_eq!(distinct.len(), indices.len(), "seed {seed}: duplicate index");
    assert_eq!(
        coordinator.pool_size().await + indices.len(),
        usize::try_from(pool).unwrap()
    );
    indices.len()
}

// =============================================================================
// PROPERTIES
// =============================================================================

#[tokio::test]
async fn test_random_sequences_keep_invariants() {
    for seed in 0..16 {
        run_random_sequence(seed, 25, 120).await;
    }
}

/// A pool smaller than the item space runs dry along the way.
#[tokio::test]
async fn test_random_sequences_with_scarce_pool() {
    for seed in 100..108 {
        let assigned = run_random_sequence(seed, 6, 150).await;
        assert!(assigned <= 6);
    }
}

#[tokio::test]
async fn test_same_seed_same_outcome() {
    async fn outcome(seed: u64) -> Vec<(ItemId, RollState)> {
        let mut rng = StdRng::seed_from_u64(seed);
        let coordinator = create_test_coordinator(RevealConfig::default());
        let owner = coordinator.config().owner;
        coordinator.initialize_pool(owner, 50).await.unwrap();

        let entries: Vec<RevealEntry> = (1..=20)
            .map(|raw| RevealEntry::new(holder(), ItemId(raw)))
            .collect();
        let id = coordinator.request_reveal(&entries).await.unwrap();
        let words: Vec<U256> = (0..20).map(|_| random_word(&mut rng)).collect();
        coordinator
            .oracle()
            .fulfill(&coordinator, id, &words)
            .await
            .unwrap();

        let mut states = Vec::new();
        for raw in 1..=20 {
            states.push((ItemId(raw), coordinator.roll_state(ItemId(raw)).await));
        }
        states
    }

    assert_eq!(outcome(9).await, outcome(9).await);
    assert_ne!(outcome(9).await, outcome(10).await);
}

/// Every index of the pool is reachable: draining with random words yields
/// a permutation of the full range.
#[tokio::test]
async fn test_drain_yields_permutation() {
    let mut rng = StdRng::seed_from_u64(77);
    let coordinator = create_test_coordinator(RevealConfig::default());
    let owner = coordinator.config().owner;
    coordinator.initialize_pool(owner, 30).await.unwrap();

    for chunk in (1..=30u64).collect::<Vec<_>>().chunks(7) {
        let entries: Vec<RevealEntry> = chunk
            .iter()
            .map(|raw| RevealEntry::new(holder(), ItemId(*raw)))
            .collect();
        let id = coordinator.request_reveal(&entries).await.unwrap();
        let words: Vec<U256> = chunk.iter().map(|_| random_word(&mut rng)).collect();
        coordinator
            .oracle()
            .fulfill(&coordinator, id, &words)
            .await
            .unwrap();
    }

    let mut indices: Vec<u64> = Vec::new();
    for raw in 1..=30 {
        indices.push(
            coordinator
                .roll_state(ItemId(raw))
                .await
                .assigned_index()
                .unwrap()
                .get(),
        );
    }
    indices.sort_unstable();
    assert_eq!(indices, (0..30).collect::<Vec<_>>());
    assert_eq!(coordinator.pool_size().await, 0);
}
