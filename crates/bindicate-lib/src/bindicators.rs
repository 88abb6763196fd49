//! Bindicators manager — turns a bindicator set into strip commands.
//!
//! Every update produces exactly one command per configured strip: a clear
//! for strips no valid bindicator landed on, a write for the rest. When
//! several bindicators map to the same strip, the last one in payload
//! order wins. Frame buffers on the device persist between updates, so
//! the clear is what empties a strip — a write only repaints its range.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::color::resolve_colour;
use crate::models::Bindicator;
use crate::protocol::{Command, encode_clear, encode_write};
use crate::queue::{CommandQueue, CommandSink, DeliveryOutcome};
use crate::topology::TopologyProvider;

/// Outcome of an update, aligned with the HTTP statuses the outer API
/// reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The whole batch was delivered.
    Ok,
    /// The payload was malformed; nothing was written.
    BadRequest,
    /// Delivery failed partway; the strips may be inconsistent until the
    /// next successful update.
    InternalError,
}

impl UpdateStatus {
    /// Numeric status code for API responses.
    pub fn code(self) -> u16 {
        match self {
            UpdateStatus::Ok => 200,
            UpdateStatus::BadRequest => 400,
            UpdateStatus::InternalError => 500,
        }
    }
}

/// Owns the topology and the delivery queue for the strip controller.
pub struct BindicatorsManager<T: TopologyProvider, S: CommandSink> {
    topology: T,
    queue: CommandQueue<S>,
}

impl<T: TopologyProvider, S: CommandSink> BindicatorsManager<T, S> {
    pub fn new(topology: T, sink: S) -> Self {
        BindicatorsManager { topology, queue: CommandQueue::new(sink) }
    }

    /// Apply the given bindicator set to the strips.
    ///
    /// The payload must be a JSON array; anything else is rejected before
    /// any command is written. Elements that are not valid bindicators
    /// are skipped, and the rest of the batch still delivers.
    pub async fn update(&self, payload: &Value) -> UpdateStatus {
        let Some(bindicators) = parse_payload(payload) else {
            log::warn!("rejecting malformed bindicators payload");
            return UpdateStatus::BadRequest;
        };
        log::info!("updating {} bindicator(s)", bindicators.len());

        let batch = self.build_commands(&bindicators);
        match self.queue.deliver(batch).await {
            DeliveryOutcome::Delivered { sent } => {
                log::debug!("update delivered ({sent} command(s))");
                UpdateStatus::Ok
            }
            DeliveryOutcome::Aborted { sent, error } => {
                log::error!("update aborted after {sent} command(s): {error}");
                UpdateStatus::InternalError
            }
        }
    }

    /// Build the command batch for a bindicator set: one command per
    /// configured strip, keyed by strip id.
    pub fn build_commands(&self, bindicators: &[Bindicator]) -> BTreeMap<u8, Command> {
        let mut batch: BTreeMap<u8, Command> = self
            .topology
            .strips()
            .into_iter()
            .map(|strip| (strip, encode_clear(strip)))
            .collect();

        for bindicator in bindicators {
            let leds = self.topology.lookup_leds(bindicator);
            let (Some(first), Some(last)) = (leds.first(), leds.last()) else {
                log::debug!(
                    "no placement for cart {} shelf {} bin {}",
                    bindicator.cart,
                    bindicator.shelf,
                    bindicator.bin
                );
                continue;
            };
            // The write spans the first to the last resolved offset on the
            // first LED's strip; a gap between offsets is lit too.
            let strip = first.strip;
            let Some(strip_length) = self.topology.strip_length(strip) else {
                log::error!("placement references unconfigured strip {strip}");
                continue;
            };
            let colour = resolve_colour(&bindicator.rgb);
            batch.insert(
                strip,
                encode_write(strip, first.offset, last.offset, colour, strip_length),
            );
        }
        batch
    }
}

/// Parse the payload into bindicators; `None` only when the payload is
/// not an array. Invalid elements are dropped, not an error.
fn parse_payload(payload: &Value) -> Option<Vec<Bindicator>> {
    let items = payload.as_array()?;
    let bindicators: Vec<Bindicator> = items.iter().filter_map(Bindicator::from_value).collect();
    if bindicators.len() < items.len() {
        log::debug!(
            "skipped {} invalid bindicator(s)",
            items.len() - bindicators.len()
        );
    }
    Some(bindicators)
}
