// Poll -> decode -> transform -> encode -> submit loop

use std::ops::AddAssign;
use std::sync::Arc;

use super::config::{BackpressurePolicy, BridgeConfig};
use super::shutdown::Shutdown;
use super::transform::Transform;
use crate::error::ChannelError;
use crate::Codec::{Codec, Schema};
use crate::Ring::RingChannel;

/// Counters for one or more bridge iterations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Raw records drained from the inbound ring
    pub received: usize,
    /// Records re-encoded and submitted outbound
    pub forwarded: usize,
    /// Records that failed to decode or encode
    pub skipped: usize,
    /// Records lost to outbound back-pressure
    pub dropped: usize,
}

impl AddAssign for PassStats {
    fn add_assign(&mut self, rhs: Self) {
        self.received += rhs.received;
        self.forwarded += rhs.forwarded;
        self.skipped += rhs.skipped;
        self.dropped += rhs.dropped;
    }
}

/// Forwards records from an inbound ring to an outbound ring.
///
/// Owns both channel handles; dropping the bridge releases them.
pub struct Bridge<T: Transform> {
    inbound: RingChannel,
    outbound: RingChannel,
    decoder: Codec,
    encoder: Codec,
    transform: T,
    config: BridgeConfig,
    shutdown: Arc<Shutdown>,
}

impl<T: Transform> Bridge<T> {
    /// Bridge using one schema for both directions.
    pub fn new(
        inbound: RingChannel,
        outbound: RingChannel,
        schema: Schema,
        transform: T,
        config: BridgeConfig,
    ) -> Self {
        let codec = Codec::new(schema);
        Self::with_codecs(inbound, outbound, codec.clone(), codec, transform, config)
    }

    pub fn with_codecs(
        inbound: RingChannel,
        outbound: RingChannel,
        decoder: Codec,
        encoder: Codec,
        transform: T,
        config: BridgeConfig,
    ) -> Self {
        Self {
            inbound,
            outbound,
            decoder,
            encoder,
            transform,
            config,
            shutdown: Shutdown::new(),
        }
    }

    /// Signal used to stop [`run`](Self::run).
    pub fn shutdown_handle(&self) -> Arc<Shutdown> {
        Arc::clone(&self.shutdown)
    }

    pub fn inbound(&self) -> &RingChannel {
        &self.inbound
    }

    pub fn outbound(&self) -> &RingChannel {
        &self.outbound
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Give the channel handles back.
    pub fn into_channels(self) -> (RingChannel, RingChannel) {
        (self.inbound, self.outbound)
    }

    /// One iteration: drain the inbound ring and forward every record in
    /// arrival order.
    ///
    /// Per-record failures are logged and counted. Only channel-level
    /// failures (`ChannelClosed`, a corrupt ring) are returned.
    pub fn run_once(&mut self) -> Result<PassStats, ChannelError> {
        // Don't drain records there is nowhere to forward to
        if self.outbound.is_closed() {
            return Err(ChannelError::ChannelClosed);
        }
        let records = self.inbound.poll()?;
        let mut stats = PassStats {
            received: records.len(),
            ..PassStats::default()
        };
        if !records.is_empty() {
            tracing::debug!(count = records.len(), "polled inbound records");
        }

        for raw in records {
            let mut event = match self.decoder.decode(&raw) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecodable record");
                    stats.skipped += 1;
                    continue;
                }
            };

            self.transform.apply(&mut event);

            let encoded = match self.encoder.encode(&event) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, %event, "skipping unencodable event");
                    stats.skipped += 1;
                    continue;
                }
            };

            match self.submit(&encoded) {
                Ok(()) => {
                    stats.forwarded += 1;
                    tracing::info!("{}", event);
                }
                Err(e @ (ChannelError::BufferFull { .. } | ChannelError::RecordTooLarge { .. })) => {
                    tracing::warn!(error = %e, %event, "dropping event");
                    stats.dropped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(stats)
    }

    /// Loop until the shutdown signal fires or a channel is closed.
    pub fn run(&mut self) -> Result<PassStats, ChannelError> {
        tracing::info!(
            inbound = ?self.inbound.name(),
            outbound = ?self.outbound.name(),
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "bridge started"
        );

        let mut total = PassStats::default();
        while !self.shutdown.is_triggered() {
            match self.run_once() {
                Ok(stats) => total += stats,
                Err(ChannelError::ChannelClosed) => {
                    tracing::info!("channel closed by remote side, stopping");
                    break;
                }
                Err(e) => return Err(e),
            }
            if self.shutdown.wait_timeout(self.config.poll_interval) {
                break;
            }
        }

        tracing::info!(
            received = total.received,
            forwarded = total.forwarded,
            skipped = total.skipped,
            dropped = total.dropped,
            "bridge stopped"
        );
        Ok(total)
    }

    fn submit(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        let (retries, backoff) = match self.config.backpressure {
            BackpressurePolicy::Drop => (0, Default::default()),
            BackpressurePolicy::Retry { attempts, backoff } => (attempts, backoff),
        };

        let mut attempt = 0;
        loop {
            match self.outbound.submit(bytes) {
                Err(ChannelError::BufferFull { .. }) if attempt < retries => {
                    attempt += 1;
                    if self.shutdown.wait_timeout(backoff) {
                        // Stop retrying; the next submit result is final
                        attempt = retries;
                    }
                }
                result => return result,
            }
        }
    }
}
