use streamdec_audio::ResampleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("Allowed sample rates must be strictly ascending, got {0:?}")]
    UnsortedRates(Vec<u32>),
    #[error("No supported target sample rate for source rate {source_rate} Hz")]
    NoTargetRate { source_rate: u32 },
    #[error(transparent)]
    Resample(#[from] ResampleError),
    #[error("Failed to write to sink: {0}")]
    Io(#[from] std::io::Error),
}
