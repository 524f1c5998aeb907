use crate::error::FormatError;
use crate::{CanonicalFormat, DEFAULT_SAMPLE_RATE};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::instrument;

const MAX_CHANNELS: u32 = 2;

/// Format negotiation result handed over by the decoder together with its buffers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caps {
    pub rate: Option<u32>,
    pub channels: Option<u32>,
    pub format: Option<String>,
}

impl Caps {
    pub fn new(format: impl Into<String>, channels: u32, rate: u32) -> Self {
        Self {
            rate: Some(rate),
            channels: Some(channels),
            format: Some(format.into()),
        }
    }

    #[inline]
    pub fn rate_or_default(&self) -> u32 {
        self.rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }
}

impl Display for Caps {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "audio/x-raw, format={}, channels={}, rate={}",
            self.format.as_deref().unwrap_or("?"),
            self.channels.map_or("?".to_string(), |c| c.to_string()),
            self.rate.map_or("?".to_string(), |r| r.to_string()),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Signed,
    Unsigned,
    Float,
}

/// Parsed `[SUF]<depth>[_<width>][BE]` format string, e.g. `S16LE`, `U8`, `F32BE`, `S24_32LE`.
///
/// Missing digits parse as zero, anything after the numbers other than a literal
/// `BE` counts as little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleFormat {
    pub encoding: Encoding,
    pub depth: u32,
    pub width: u32,
    pub big_endian: bool,
}

impl FromStr for SampleFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let encoding = match chars.next() {
            None => return Err(FormatError::Empty),
            Some('S') => Encoding::Signed,
            Some('U') => Encoding::Unsigned,
            Some('F') => Encoding::Float,
            Some(other) => return Err(FormatError::UnknownEncoding(other)),
        };

        let (depth, rest) = split_number(chars.as_str());
        let (width, rest) = match rest.strip_prefix('_') {
            Some(padded) => split_number(padded),
            None => (depth, rest),
        };

        Ok(Self {
            encoding,
            depth,
            width,
            big_endian: rest == "BE",
        })
    }
}

impl Display for SampleFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let encoding = match self.encoding {
            Encoding::Signed => 'S',
            Encoding::Unsigned => 'U',
            Encoding::Float => 'F',
        };
        write!(f, "{encoding}{}", self.depth)?;
        if self.width != self.depth {
            write!(f, "_{}", self.width)?;
        }
        if self.width > 8 {
            f.write_str(if self.big_endian { "BE" } else { "LE" })?;
        }
        Ok(())
    }
}

fn split_number(s: &str) -> (u32, &str) {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(s.len(), |(i, _)| i);
    (s[..end].parse().unwrap_or(0), &s[end..])
}

/// Concrete raw sample representation, used to pick a conversion routine once per buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    I8,
    U8,
    I16,
    U16,
    /// Three-byte packed signed integer.
    I24,
    /// Three-byte packed unsigned integer.
    U24,
    I32,
    U32,
    F32,
}

/// Layout of the raw PCM data a normalizer converts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatDescriptor {
    big_endian: bool,
    float: bool,
    signed: bool,
    width: u32,
    depth: u32,
    channels: u32,
}

impl Default for FormatDescriptor {
    fn default() -> Self {
        Self {
            big_endian: false,
            float: false,
            signed: true,
            width: 16,
            depth: 16,
            channels: 2,
        }
    }
}

impl FormatDescriptor {
    /// Builds a descriptor, clamping the channel count to stereo and a depth outside
    /// `1..=width` to the full width.
    pub fn new(format: SampleFormat, channels: u32) -> Self {
        let depth = if format.depth == 0 || format.depth > format.width {
            format.width
        } else {
            format.depth
        };

        Self {
            big_endian: format.big_endian,
            float: format.encoding == Encoding::Float,
            // float input keeps the signed default, it never goes through sign conversion
            signed: format.encoding != Encoding::Unsigned,
            width: format.width,
            depth,
            channels: channels.min(MAX_CHANNELS),
        }
    }

    /// Derives the descriptor from negotiated caps.
    ///
    /// Missing caps or fields keep the defaults (`S16LE`, stereo). A format string that
    /// cannot be parsed is reported and ignored.
    #[instrument(level = "debug", skip_all, fields(caps = ?caps.map(ToString::to_string)))]
    pub fn from_caps(caps: Option<&Caps>) -> Self {
        let mut descriptor = Self::default();
        let Some(caps) = caps else {
            return descriptor;
        };

        let channels = caps.channels.unwrap_or(descriptor.channels);
        descriptor.channels = channels.min(MAX_CHANNELS);

        if let Some(format) = caps.format.as_deref() {
            match format.parse::<SampleFormat>() {
                Ok(format) => descriptor = Self::new(format, channels),
                Err(FormatError::Empty) => {}
                Err(err) => {
                    tracing::warn!(?err, ?format, "Ignoring unsupported sample format");
                }
            }
        }

        tracing::debug!(descriptor = %descriptor, "Derived source format");
        descriptor
    }

    #[inline]
    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        self.float
    }

    #[inline]
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        (self.width / 8) as usize
    }

    /// Bits of padding below the meaningful bits in every container.
    #[inline]
    pub fn padding(&self) -> u32 {
        if self.float {
            0
        } else {
            self.width - self.depth
        }
    }

    /// Whether no conversion can ever produce output for this layout.
    #[inline]
    pub fn is_inert(&self) -> bool {
        self.bytes_per_sample() == 0 || self.channels == 0
    }

    /// Whether the layout already is the canonical stream format.
    pub fn is_canonical<C: CanonicalFormat>(&self) -> bool {
        !self.big_endian
            && !self.float
            && self.signed
            && self.width == C::WIDTH
            && self.depth == C::DEPTH
            && self.channels == 2
    }

    pub fn sample_kind(&self) -> Option<SampleKind> {
        let kind = match (self.float, self.signed, self.width) {
            (true, _, 32) => SampleKind::F32,
            (true, _, _) => return None,
            (false, true, 8) => SampleKind::I8,
            (false, false, 8) => SampleKind::U8,
            (false, true, 16) => SampleKind::I16,
            (false, false, 16) => SampleKind::U16,
            (false, true, 24) => SampleKind::I24,
            (false, false, 24) => SampleKind::U24,
            (false, true, 32) => SampleKind::I32,
            (false, false, 32) => SampleKind::U32,
            _ => return None,
        };
        Some(kind)
    }
}

impl Display for FormatDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let encoding = if self.float {
            "float"
        } else if self.signed {
            "signed"
        } else {
            "unsigned"
        };
        write!(
            f,
            "{} {} {}/{} x{}",
            if self.big_endian { "BE" } else { "LE" },
            encoding,
            self.depth,
            self.width,
            self.channels
        )
    }
}
