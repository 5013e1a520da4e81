//! The background build thread.
//!
//! Patch builds allocate freely, so they run here and the finished unit
//! crosses to the audio thread over a lock-free ring. Retired units come
//! back the other way to be dropped off the audio thread.

use std::thread;
use std::time::Duration;

use rtrb::{Consumer, Producer, RingBuffer};
use tracing::{debug, warn};

use crate::patch::{BuildFailure, PatchBuilder, PatchSource, PatchUnit};

/// How many requests and responses can be in flight at once.
const RING_CAPACITY: usize = 16;

/// How long the worker sleeps when its inbox is empty.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

pub enum WorkRequest {
    Build {
        source: PatchSource,
        time_step: f32,
    },
    /// A retired unit to drop away from the audio thread.
    Dispose(PatchUnit),
}

pub enum WorkResponse {
    Ready(PatchUnit),
    Rejected(BuildFailure),
}

/// Start the build thread. It runs until the request producer is dropped.
pub fn spawn(
    builder: impl PatchBuilder + 'static,
) -> (Producer<WorkRequest>, Consumer<WorkResponse>) {
    let (request_tx, mut request_rx) = RingBuffer::new(RING_CAPACITY);
    let (mut response_tx, response_rx) = RingBuffer::new(RING_CAPACITY);
    thread::spawn(move || loop {
        match request_rx.pop() {
            Ok(WorkRequest::Build { source, time_step }) => {
                debug!(patch = %source.name, "building patch");
                let unit = builder.build(&source, time_step);
                let response = match unit.failure_stage() {
                    None => WorkResponse::Ready(unit),
                    Some(stage) => {
                        warn!(
                            patch = %source.name,
                            ?stage,
                            diagnostics = ?unit.diagnostics,
                            "patch build rejected"
                        );
                        WorkResponse::Rejected(BuildFailure {
                            source,
                            stage,
                            diagnostics: unit.diagnostics,
                        })
                    }
                };
                if response_tx.push(response).is_err() {
                    warn!("response ring full, dropping build result");
                }
            }
            Ok(WorkRequest::Dispose(unit)) => {
                debug!(patch = %unit.source.name, "disposing retired patch");
                drop(unit);
            }
            Err(_) => {
                if request_rx.is_abandoned() {
                    debug!("engine gone, worker exiting");
                    break;
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    });
    (request_tx, response_rx)
}
