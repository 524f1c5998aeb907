use crate::error::StageError;
use crate::policy::TargetRatePolicy;
use bytes::{Bytes, BytesMut};
use std::io::Write;
use streamdec_audio::{Canonical, CanonicalFormat, Caps, RateConverter, SampleNormalizer};
use tracing::instrument;

pub const NO_TARGET_RATE_MESSAGE: &str = "No supported target sample rate";

/// Notifications for whoever controls the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Eos,
    Error(String),
}

pub type EventCallback = Box<dyn Fn(StageEvent) + Send>;

/// Drives one decoded stream through normalization and rate conversion into a sink.
///
/// The sink receives the chosen target rate as a 4-byte little-endian header, followed
/// by canonical interleaved stereo samples at that rate. Processors are created from the
/// first caps seen; a later change of the source rate replaces the rate converter while
/// the target rate stays fixed. Buffers need not end on a frame boundary; a trailing
/// partial frame is held back and completed by the next buffer.
pub struct StreamStage<W: Write, C: CanonicalFormat = Canonical> {
    sink: Option<W>,
    policy: TargetRatePolicy,
    emit: EventCallback,
    normalizer: Option<SampleNormalizer<C>>,
    converter: Option<RateConverter<C>>,
    /// Bytes of an incomplete input frame carried over to the next buffer.
    pending: BytesMut,
    bytes_delivered: u64,
}

impl<W: Write, C: CanonicalFormat> StreamStage<W, C> {
    pub fn new(sink: W, policy: TargetRatePolicy, emit: EventCallback) -> Self {
        Self {
            sink: Some(sink),
            policy,
            emit,
            normalizer: None,
            converter: None,
            pending: BytesMut::new(),
            bytes_delivered: 0,
        }
    }

    /// Whether the stage stopped accepting buffers.
    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    pub fn target_rate(&self) -> Option<u32> {
        self.converter.as_ref().map(RateConverter::target_rate)
    }

    pub fn source_rate(&self) -> Option<u32> {
        self.converter.as_ref().map(RateConverter::source_rate)
    }

    /// Bytes of sample data written to the sink, without the rate header.
    pub fn stats(&self) -> u64 {
        self.bytes_delivered
    }

    pub fn reset_stats(&mut self) {
        self.bytes_delivered = 0;
    }

    /// Converts one decoded buffer and writes the result to the sink.
    ///
    /// Buffers arriving before any caps are dropped. Buffers arriving after the stage
    /// was closed are ignored.
    pub fn handle_buffer(&mut self, caps: Option<&Caps>, buffer: &Bytes) -> Result<(), StageError> {
        if self.is_closed() {
            tracing::trace!("Ignoring buffer on closed stage");
            return Ok(());
        }

        if let Some(caps) = caps {
            self.setup_processors(caps)?;
        }

        let (Some(normalizer), Some(converter)) = (&self.normalizer, &mut self.converter) else {
            tracing::trace!(len = buffer.len(), "Dropping buffer received before caps");
            return Ok(());
        };

        let descriptor = normalizer.descriptor();
        let frame_bytes = descriptor.bytes_per_sample() * descriptor.channels() as usize;
        let whole = whole_frames(&mut self.pending, buffer, frame_bytes);
        let canonical = normalizer.normalize(&whole);
        let resampled = converter.eat(&canonical);
        if resampled.is_empty() {
            return Ok(());
        }

        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(&resampled)?;
            self.bytes_delivered += resampled.len() as u64;
        }
        Ok(())
    }

    fn setup_processors(&mut self, caps: &Caps) -> Result<(), StageError> {
        if self.normalizer.is_none() {
            self.normalizer = Some(SampleNormalizer::from_caps(Some(caps)));
            self.pending.clear();
        }

        let source_rate = caps.rate_or_default();
        let Some(converter) = &self.converter else {
            return self.start_conversion(source_rate);
        };
        if converter.source_rate() == source_rate {
            return Ok(());
        }

        let target_rate = converter.target_rate();
        tracing::info!(
            previous = converter.source_rate(),
            source_rate,
            target_rate,
            "Source sample rate changed, restarting rate conversion"
        );
        self.converter = Some(RateConverter::new(source_rate, target_rate)?);
        Ok(())
    }

    #[instrument(level = "debug", skip(self), err)]
    fn start_conversion(&mut self, source_rate: u32) -> Result<(), StageError> {
        let Some(target_rate) = self.policy.select(source_rate) else {
            tracing::warn!(allowed = ?self.policy.allowed(), "No allowed target rate, closing stage");
            self.report_error(NO_TARGET_RATE_MESSAGE);
            self.sink = None;
            return Err(StageError::NoTargetRate { source_rate });
        };

        let converter = RateConverter::new(source_rate, target_rate)?;
        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(&target_rate.to_le_bytes())?;
        }

        tracing::info!(source_rate, target_rate, "Started rate conversion");
        self.converter = Some(converter);
        Ok(())
    }

    pub fn report_error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(?message, "Reporting stream error");
        (self.emit)(StageEvent::Error(message));
    }

    /// Signals the end of the stream, flushes the sink and hands it back.
    #[instrument(level = "debug", skip(self), fields(bytes = self.bytes_delivered), err)]
    pub fn end_of_stream(&mut self) -> Result<Option<W>, StageError> {
        if self.is_closed() {
            return Ok(None);
        }

        (self.emit)(StageEvent::Eos);
        self.close()
    }

    /// Flushes and releases the sink without signalling the end of the stream.
    pub fn close(&mut self) -> Result<Option<W>, StageError> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(None);
        };

        tracing::debug!("Closing stage");
        sink.flush()?;
        Ok(Some(sink))
    }
}

/// Joins `buffer` to the carried-over bytes and splits off every complete frame.
fn whole_frames(pending: &mut BytesMut, buffer: &Bytes, frame_bytes: usize) -> Bytes {
    if frame_bytes == 0 || (pending.is_empty() && buffer.len() % frame_bytes == 0) {
        return buffer.clone();
    }

    pending.extend_from_slice(buffer);
    let whole = pending.len() / frame_bytes * frame_bytes;
    pending.split_to(whole).freeze()
}
