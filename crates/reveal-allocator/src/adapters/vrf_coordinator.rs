//! # Mock VRF Coordinator
//!
//! In-memory randomness oracle. Hands out sequential request ids, remembers
//! what was asked for, and delivers fulfillments on demand by calling back
//! into the consumer with its own address as caller.

use crate::config::OracleRequestParams;
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, RandomWord, RequestId, U256};
use crate::errors::{OracleError, RevealError};
use crate::ports::inbound::{RevealApi, Revealed};
use crate::ports::outbound::RandomnessOracle;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// A request the mock has accepted but not yet fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingVrfRequest {
    /// Parameters the consumer sent.
    pub params: OracleRequestParams,
    /// Number of words to deliver.
    pub num_words: u32,
}

#[derive(Debug, Default)]
struct VrfInner {
    next_id: u64,
    pending: BTreeMap<RequestId, PendingVrfRequest>,
    fail_next: bool,
    forced_id: Option<RequestId>,
    total_requests: u64,
}

/// In-memory oracle for tests and the demo node.
#[derive(Debug)]
pub struct MockVrfCoordinator {
    /// Address used as caller when fulfilling.
    address: Address,
    inner: Mutex<VrfInner>,
}

impl MockVrfCoordinator {
    /// Create a coordinator that fulfills as `address`. Ids start at 1.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            inner: Mutex::new(VrfInner {
                next_id: 1,
                ..VrfInner::default()
            }),
        }
    }

    /// Caller address presented on fulfillment.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Makes the next `request` fail.
    pub fn fail_next_request(&self) {
        self.lock().fail_next = true;
    }

    /// Makes the next `request` return `id` instead of the next sequential id.
    pub fn force_next_id(&self, id: RequestId) {
        self.lock().forced_id = Some(id);
    }

    /// Words requested by `id`, if it is still pending.
    #[must_use]
    pub fn pending_words(&self, id: RequestId) -> Option<u32> {
        self.lock().pending.get(&id).map(|request| request.num_words)
    }

    /// Pending request ids in ascending order.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<RequestId> {
        self.lock().pending.keys().copied().collect()
    }

    /// Details of a pending request.
    #[must_use]
    pub fn pending_request(&self, id: RequestId) -> Option<PendingVrfRequest> {
        self.lock().pending.get(&id).copied()
    }

    /// Requests accepted so far.
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.lock().total_requests
    }

    /// Delivers `words` for `request_id` to `consumer`.
    ///
    /// The request leaves the pending set only if the consumer accepts the
    /// fulfillment.
    ///
    /// # Errors
    ///
    /// Whatever `consumer.on_fulfill` returns.
    pub async fn fulfill<A>(
        &self,
        consumer: &A,
        request_id: RequestId,
        words: &[RandomWord],
    ) -> Result<Vec<Revealed>, RevealError>
    where
        A: RevealApi + ?Sized,
    {
        let revealed = consumer.on_fulfill(self.address, request_id, words).await?;
        self.lock().pending.remove(&request_id);
        debug!(request_id = %request_id, revealed = revealed.len(), "Mock VRF fulfilled");
        Ok(revealed)
    }

    /// Delivers as many words as were requested, derived from `seed`.
    ///
    /// # Errors
    ///
    /// `UnknownRequest` if the mock never saw `request_id`, otherwise whatever
    /// `consumer.on_fulfill` returns.
    pub async fn fulfill_with_seed<A>(
        &self,
        consumer: &A,
        request_id: RequestId,
        seed: u64,
    ) -> Result<Vec<Revealed>, RevealError>
    where
        A: RevealApi + ?Sized,
    {
        let num_words = self.pending_words(request_id).ok_or(
            crate::errors::TrackerError::UnknownRequest(request_id),
        )?;
        let words = expand_words(seed, num_words);
        self.fulfill(consumer, request_id, &words).await
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VrfInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Derives `count` words from `seed` by hashing `seed || i`.
#[must_use]
pub fn expand_words(seed: u64, count: u32) -> Vec<RandomWord> {
    (0..count)
        .map(|i| {
            let mut preimage = [0u8; 12];
            preimage[..8].copy_from_slice(&seed.to_be_bytes());
            preimage[8..].copy_from_slice(&i.to_be_bytes());
            keccak256(&preimage).to_u256()
        })
        .collect()
}

#[async_trait]
impl RandomnessOracle for MockVrfCoordinator {
    async fn request(
        &self,
        params: &OracleRequestParams,
        num_words: u32,
    ) -> Result<RequestId, OracleError> {
        let mut inner = self.inner.lock().map_err(|_| OracleError::Unavailable)?;

        if inner.fail_next {
            inner.fail_next = false;
            return Err(OracleError::SubmissionFailed(
                "mock coordinator refused request".to_string(),
            ));
        }

        let id = match inner.forced_id.take() {
            Some(id) => id,
            None => {
                let id = RequestId(U256::from(inner.next_id));
                inner.next_id += 1;
                id
            }
        };

        inner.pending.insert(
            id,
            PendingVrfRequest {
                params: *params,
                num_words,
            },
        );
        inner.total_requests += 1;
        debug!(request_id = %id, num_words, "Mock VRF request accepted");
        Ok(id)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sequential_ids() {
        let vrf = MockVrfCoordinator::new(Address::new([0x0b; 20]));
        let params = OracleRequestParams::default();

        assert_eq!(vrf.request(&params, 1).await.unwrap(), RequestId::from_u64(1));
        assert_eq!(vrf.request(&params, 2).await.unwrap(), RequestId::from_u64(2));
        assert_eq!(vrf.pending_words(RequestId::from_u64(2)), Some(2));
        assert_eq!(vrf.total_requests(), 2);
    }

    #[tokio::test]
    async fn test_fail_next_request() {
        let vrf = MockVrfCoordinator::new(Address::new([0x0b; 20]));
        let params = OracleRequestParams::default();

        vrf.fail_next_request();
        assert!(vrf.request(&params, 1).await.is_err());
        assert!(vrf.pending_ids().is_empty());

        // Only one request fails.
        assert!(vrf.request(&params, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_forced_id() {
        let vrf = MockVrfCoordinator::new(Address::new([0x0b; 20]));
        let params = OracleRequestParams {
            subscription_id: 42,
            ..OracleRequestParams::default()
        };

        vrf.force_next_id(RequestId::from_u64(99));
        let id = vrf.request(&params, 3).await.unwrap();

        assert_eq!(id, RequestId::from_u64(99));
        assert_eq!(vrf.pending_request(id).unwrap().params.subscription_id, 42);
        // Sequence is unaffected.
        assert_eq!(vrf.request(&params, 1).await.unwrap(), RequestId::from_u64(1));
    }

    #[tokio::test]
    async fn test_pending_ids_ascending() {
        let vrf = MockVrfCoordinator::new(Address::new([0x0b; 20]));
        let params = OracleRequestParams::default();

        vrf.force_next_id(RequestId::from_u64(50));
        vrf.request(&params, 1).await.unwrap();
        vrf.request(&params, 1).await.unwrap();
        vrf.request(&params, 1).await.unwrap();

        assert_eq!(
            vrf.pending_ids(),
            vec![
                RequestId::from_u64(1),
                RequestId::from_u64(2),
                RequestId::from_u64(50)
            ]
        );
    }

    #[test]
    fn test_expand_words() {
        let words = expand_words(7, 3);
        assert_eq!(words.len(), 3);
        assert_ne!(words[0], words[1]);
        assert_eq!(words, expand_words(7, 3));
        assert_ne!(words, expand_words(8, 3));
    }
}
