//! Background thread for oracle mask refreshes.
//!
//! Keeps the oracle call off the interaction thread. Requests go in over a
//! channel, results come back through a non-blocking queue the caller polls
//! each tick. The worker never cancels an in-flight call; superseded
//! responses are discarded by the session store's revision check when they
//! arrive.

use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::mask::RawMask;
use crate::model::SeedPoint;
use crate::session::RefreshTicket;

use super::{OracleError, SegmentationOracle};

/// A mask refresh handed to the worker thread.
pub struct RefreshRequest {
    pub ticket: RefreshTicket,
    /// Encoded image bytes, as the oracle boundary expects them.
    pub image_png: Vec<u8>,
    /// The full point list at request time, in insertion order.
    pub points: Vec<SeedPoint>,
}

/// Message sent to the worker thread.
enum ThreadMessage {
    Refresh(RefreshRequest),
    Shutdown,
}

/// Outcome of one refresh, tagged with the ticket it was issued for.
pub enum RefreshResult {
    /// Candidate masks, best first.
    Masks {
        ticket: RefreshTicket,
        masks: Vec<RawMask>,
    },
    /// The oracle call failed; the session stays in `PointsPlaced`.
    Failed {
        ticket: RefreshTicket,
        error: OracleError,
    },
}

impl RefreshResult {
    pub fn ticket(&self) -> RefreshTicket {
        match self {
            RefreshResult::Masks { ticket, .. } => *ticket,
            RefreshResult::Failed { ticket, .. } => *ticket,
        }
    }
}

/// Manages a background thread that runs oracle requests.
///
/// The worker does not enforce one outstanding request per image; the
/// session store discards stale responses, so overlapping requests are
/// harmless.
pub struct OracleWorker {
    request_tx: Sender<ThreadMessage>,
    result_rx: Receiver<RefreshResult>,
    thread_handle: Option<JoinHandle<()>>,
    pending: HashSet<RefreshTicket>,
}

impl OracleWorker {
    /// Spawn a worker around a segmentation oracle.
    pub fn spawn(oracle: Box<dyn SegmentationOracle>) -> Result<Self, String> {
        let (request_tx, request_rx) = mpsc::channel::<ThreadMessage>();
        let (result_tx, result_rx) = mpsc::channel::<RefreshResult>();

        let thread_handle = thread::Builder::new()
            .name("oracle-worker".to_string())
            .spawn(move || {
                log::info!("oracle worker thread started");
                Self::thread_loop(oracle, request_rx, result_tx);
                log::info!("oracle worker thread exiting");
            })
            .map_err(|e| format!("failed to spawn oracle worker: {}", e))?;

        Ok(Self {
            request_tx,
            result_rx,
            thread_handle: Some(thread_handle),
            pending: HashSet::new(),
        })
    }

    fn thread_loop(
        oracle: Box<dyn SegmentationOracle>,
        request_rx: Receiver<ThreadMessage>,
        result_tx: Sender<RefreshResult>,
    ) {
        loop {
            match request_rx.recv() {
                Ok(ThreadMessage::Refresh(request)) => {
                    let ticket = request.ticket;
                    let result = match oracle.request_mask(&request.image_png, &request.points) {
                        Ok(masks) => RefreshResult::Masks { ticket, masks },
                        Err(error) => RefreshResult::Failed { ticket, error },
                    };
                    if result_tx.send(result).is_err() {
                        log::warn!("result channel closed, oracle worker exiting");
                        break;
                    }
                }
                Ok(ThreadMessage::Shutdown) => {
                    log::debug!("oracle worker received shutdown");
                    break;
                }
                Err(_) => {
                    log::debug!("request channel closed, oracle worker exiting");
                    break;
                }
            }
        }
    }

    /// Queue a mask refresh. Non-blocking.
    pub fn request_refresh(
        &mut self,
        ticket: RefreshTicket,
        image_png: Vec<u8>,
        points: Vec<SeedPoint>,
    ) {
        self.pending.insert(ticket);

        let request = RefreshRequest {
            ticket,
            image_png,
            points,
        };
        if self
            .request_tx
            .send(ThreadMessage::Refresh(request))
            .is_err()
        {
            log::error!("failed to send refresh request: channel closed");
            self.pending.remove(&ticket);
        } else {
            log::debug!(
                "refresh queued for image {} revision {}",
                ticket.image_id,
                ticket.revision
            );
        }
    }

    /// Take the oldest completed result, if any. Non-blocking.
    pub fn take_one_result(&mut self) -> Option<RefreshResult> {
        match self.result_rx.try_recv() {
            Ok(result) => {
                self.pending.remove(&result.ticket());
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("oracle worker disconnected");
                None
            }
        }
    }

    /// Number of refreshes queued or in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a specific refresh is still outstanding.
    pub fn is_pending(&self, ticket: RefreshTicket) -> bool {
        self.pending.contains(&ticket)
    }
}

impl Drop for OracleWorker {
    fn drop(&mut self) {
        let _ = self.request_tx.send(ThreadMessage::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("oracle worker panicked: {:?}", e);
            }
        }
    }
}
