use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Sample format string is empty")]
    Empty,
    #[error("Unknown sample encoding {0:?}, expected one of 'S', 'U' or 'F'")]
    UnknownEncoding(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResampleError {
    #[error("Sample rates must be non-zero (source: {source_rate} Hz, target: {target_rate} Hz)")]
    ZeroRate { source_rate: u32, target_rate: u32 },
}
