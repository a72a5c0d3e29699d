//! # Oracle Bridge Adapter
//!
//! Channel-backed randomness oracle plus the inbound handler that drives
//! `on_fulfill` when randomness comes back.
//!
//! ```text
//! coordinator ──request()──▶ ChannelOracle ──OracleRequest──▶ (oracle)
//!                                                               │
//! coordinator ◀──on_fulfill── FulfillmentHandler ◀──Fulfillment─┘
//! ```
//!
//! The two halves only share the channels, so the oracle side may answer at
//! any later time, or never.

use crate::config::OracleRequestParams;
use crate::domain::value_objects::{Address, RandomWord, RequestId, U256};
use crate::errors::{OracleError, RevealError};
use crate::ports::inbound::{RevealApi, Revealed};
use crate::ports::outbound::RandomnessOracle;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

// =============================================================================
// OUTBOUND: REQUESTS
// =============================================================================

/// A randomness request as seen by the oracle side of the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    /// Id assigned by the bridge.
    pub request_id: RequestId,
    /// Parameters sent by the coordinator.
    pub params: OracleRequestParams,
    /// Words to deliver.
    pub num_words: u32,
}

/// Randomness oracle that forwards requests over a channel.
#[derive(Debug)]
pub struct ChannelOracle {
    requests: mpsc::UnboundedSender<OracleRequest>,
    next_id: AtomicU64,
}

impl ChannelOracle {
    /// Create the oracle and the receiving end the oracle side reads from.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OracleRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                requests: tx,
                next_id: AtomicU64::new(1),
            },
            rx,
        )
    }
}

#[async_trait]
impl RandomnessOracle for ChannelOracle {
    async fn request(
        &self,
        params: &OracleRequestParams,
        num_words: u32,
    ) -> Result<RequestId, OracleError> {
        let request_id = RequestId(U256::from(self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.requests
            .send(OracleRequest {
                request_id,
                params: *params,
                num_words,
            })
            .map_err(|_| OracleError::Unavailable)?;
        debug!(request_id = %request_id, num_words, "Oracle request forwarded");
        Ok(request_id)
    }
}

// =============================================================================
// INBOUND: FULFILLMENTS
// =============================================================================

/// Randomness delivered by the oracle side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fulfillment {
    /// Address the delivery comes from.
    pub caller: Address,
    /// Request being answered.
    pub request_id: RequestId,
    /// One word per requested item.
    pub words: Vec<RandomWord>,
}

/// Totals of a finished listener.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListenerReport {
    /// Fulfillments the coordinator accepted.
    pub applied: u64,
    /// Fulfillments the coordinator rejected.
    pub rejected: u64,
    /// Items revealed across all accepted fulfillments.
    pub revealed: u64,
}

/// Applies fulfillments to a [`RevealApi`].
pub struct FulfillmentHandler<T: RevealApi + ?Sized> {
    /// The reveal API implementation.
    api: Arc<T>,
}

impl<T: RevealApi + ?Sized> FulfillmentHandler<T> {
    /// Create a new handler.
    pub fn new(api: Arc<T>) -> Self {
        Self { api }
    }

    /// Hands one fulfillment to the coordinator.
    ///
    /// # Errors
    ///
    /// Whatever `on_fulfill` returns. The coordinator's state is unchanged in
    /// that case.
    pub async fn handle(&self, fulfillment: &Fulfillment) -> Result<Vec<Revealed>, RevealError> {
        let correlation_id = Uuid::new_v4();
        debug!(
            correlation_id = %correlation_id,
            request_id = %fulfillment.request_id,
            words = fulfillment.words.len(),
            "Fulfillment received"
        );
        self.api
            .on_fulfill(fulfillment.caller, fulfillment.request_id, &fulfillment.words)
            .await
    }

    /// Drains `fulfillments` until every sender is dropped.
    pub async fn run(self, mut fulfillments: mpsc::Receiver<Fulfillment>) -> ListenerReport {
        let mut report = ListenerReport::default();
        while let Some(fulfillment) = fulfillments.recv().await {
            match self.handle(&fulfillment).await {
                Ok(revealed) => {
                    report.applied += 1;
                    report.revealed += revealed.len() as u64;
                }
                Err(err) => {
                    warn!(request_id = %fulfillment.request_id, error = %err, "Fulfillment rejected");
                    report.rejected += 1;
                }
            }
        }
        info!(
            applied = report.applied,
            rejected = report.rejected,
            "Fulfillment listener stopped"
        );
        report
    }
}

/// Spawns a task that applies fulfillments from `fulfillments` to `api`.
///
/// The task ends, returning its report, once all senders are dropped.
pub fn spawn_fulfillment_listener<T>(
    api: Arc<T>,
    fulfillments: mpsc::Receiver<Fulfillment>,
) -> JoinHandle<ListenerReport>
where
    T: RevealApi + ?Sized + 'static,
{
    let handler = FulfillmentHandler::new(api);
    tokio::spawn(handler.run(fulfillments))
}

// =============================================================================
// TESTS
// =============================================================================
