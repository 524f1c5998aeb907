//! Sample format normalization and streaming rate conversion for decoded PCM.
//!
//! Decoded buffers of any supported layout are first brought into the canonical
//! interleaved stereo format by a [`SampleNormalizer`], then resampled to the
//! stream's target rate by a [`RateConverter`]. Both are driven synchronously by
//! whoever owns the stream and keep no global state.

pub mod error;
pub mod format;
pub mod normalize;
pub mod resample;
pub mod ring;
pub mod sample;

pub use error::{FormatError, ResampleError};
pub use format::{Caps, FormatDescriptor, SampleFormat, SampleKind};
pub use normalize::SampleNormalizer;
pub use resample::RateConverter;
pub use ring::CircularFrameBuffer;
pub use sample::{CanonicalFormat, Frame, S16, S24In32};

/// Canonical sample format selected at build time.
#[cfg(not(feature = "s24"))]
pub type Canonical = S16;

/// Canonical sample format selected at build time.
#[cfg(feature = "s24")]
pub type Canonical = S24In32;

/// Sample rate assumed when the negotiated caps do not carry one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Number of interleaved channels in the canonical stream.
pub const OUTPUT_CHANNELS: usize = 2;
