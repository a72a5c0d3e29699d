//! Simulated randomness oracle.
//!
//! Reads requests forwarded by the channel oracle, waits a configurable
//! latency, and answers each with freshly generated words.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reveal_allocator::prelude::{Address, Fulfillment, OracleRequest, U256};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Oracle stand-in that answers every request it sees.
pub struct SimulatedOracle {
    /// Caller address presented with each fulfillment.
    address: Address,
    /// Word source.
    rng: StdRng,
    /// Delay before answering.
    latency: Duration,
    /// Requests left unanswered on purpose, oldest first.
    drop_first: usize,
}

impl SimulatedOracle {
    /// Create an oracle answering as `address`. A fixed `seed` makes runs
    /// reproducible.
    pub fn new(address: Address, seed: Option<u64>, latency: Duration) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            address,
            rng,
            latency,
            drop_first: 0,
        }
    }

    /// Never answers the first `n` requests, leaving them to the owner fallback.
    pub fn dropping_first(mut self, n: usize) -> Self {
        self.drop_first = n;
        self
    }

    fn next_word(&mut self) -> U256 {
        let mut bytes = [0u8; 32];
        self.rng.fill(&mut bytes[..]);
        U256::from_big_endian(&bytes)
    }

    /// Answers requests until the request channel closes or the fulfillment
    /// channel is gone. Returns the number of fulfillments sent.
    pub async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<OracleRequest>,
        fulfillments: mpsc::Sender<Fulfillment>,
    ) -> u64 {
        let mut delivered = 0;
        while let Some(request) = requests.recv().await {
            if self.drop_first > 0 {
                self.drop_first -= 1;
                warn!(request_id = %request.request_id, "[oracle] Dropping request");
                continue;
            }

            tokio::time::sleep(self.latency).await;
            let words: Vec<U256> = (0..request.num_words).map(|_| self.next_word()).collect();
            debug!(
                request_id = %request.request_id,
                words = words.len(),
                subscription_id = request.params.subscription_id,
                "[oracle] Delivering randomness"
            );

            let fulfillment = Fulfillment {
                caller: self.address,
                request_id: request.request_id,
                words,
            };
            if fulfillments.send(fulfillment).await.is_err() {
                warn!("[oracle] Fulfillment channel closed");
                break;
            }
            delivered += 1;
        }
        info!(delivered, "[oracle] Stopped");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reveal_allocator::prelude::{OracleRequestParams, RequestId};

    fn request(id: u64, num_words: u32) -> OracleRequest {
        OracleRequest {
            request_id: RequestId::from_u64(id),
            params: OracleRequestParams::default(),
            num_words,
        }
    }

    #[tokio::test]
    async fn test_answers_with_requested_word_count() {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (ful_tx, mut ful_rx) = mpsc::channel(4);
        let oracle = SimulatedOracle::new(Address::new([0x0b; 20]), Some(1), Duration::ZERO);

        req_tx.send(request(1, 3)).unwrap();
        drop(req_tx);

        assert_eq!(oracle.run(req_rx, ful_tx).await, 1);
        let fulfillment = ful_rx.recv().await.unwrap();
        assert_eq!(fulfillment.request_id, RequestId::from_u64(1));
        assert_eq!(fulfillment.words.len(), 3);
        assert_eq!(fulfillment.caller, Address::new([0x0b; 20]));
    }

    #[tokio::test]
    async fn test_dropping_first_requests() {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (ful_tx, mut ful_rx) = mpsc::channel(4);
        let oracle = SimulatedOracle::new(Address::new([0x0b; 20]), Some(1), Duration::ZERO)
            .dropping_first(1);

        req_tx.send(request(1, 1)).unwrap();
        req_tx.send(request(2, 1)).unwrap();
        drop(req_tx);

        assert_eq!(oracle.run(req_rx, ful_tx).await, 1);
        assert_eq!(
            ful_rx.recv().await.unwrap().request_id,
            RequestId::from_u64(2)
        );
    }
}
