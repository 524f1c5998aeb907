use crate::resample::FRACTION_BITS;
use bytes::BufMut;
use std::fmt::Debug;

/// One instant in time across both output channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Frame<T> {
    pub left: T,
    pub right: T,
}

impl<T: Copy> Frame<T> {
    #[inline]
    pub const fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    #[inline]
    pub const fn mono(sample: T) -> Self {
        Self {
            left: sample,
            right: sample,
        }
    }
}

/// Numeric policy of the canonical sample stream.
///
/// Everything downstream of the normalizer works exclusively on
/// [`CanonicalFormat::Sample`] values. The policy fixes the meaningful bit depth, the
/// container width, the little-endian wire encoding and the intermediate precision
/// used while interpolating between two samples.
pub trait CanonicalFormat: Copy + Debug + Default + Send + Sync + 'static {
    type Sample: Copy + Debug + Default + PartialEq + Eq + Send + Sync + 'static;

    /// Format name in the `[SUF]<depth>[_<width>][BE]` grammar.
    const NAME: &'static str;
    /// Meaningful bits per sample.
    const DEPTH: u32;
    /// Container bits per sample.
    const WIDTH: u32;
    const BYTES: usize = (Self::WIDTH / 8) as usize;
    /// Precision of the interpolation weight in bits.
    const WEIGHT_BITS: u32;
    const MAX: Self::Sample;
    const MIN: Self::Sample;

    /// Truncates an already depth-aligned value into the sample container.
    fn from_i32(value: i32) -> Self::Sample;

    /// Linear interpolation `next * frac + prev * (1 - frac)`, with `frac` carrying
    /// [`FRACTION_BITS`] fractional bits.
    fn interpolate(prev: Self::Sample, next: Self::Sample, frac: u32) -> Self::Sample;

    fn read_le(bytes: &[u8]) -> Self::Sample;

    fn put_le<B: BufMut>(buf: &mut B, sample: Self::Sample);

    /// Converts a signed sample occupying `bits` bits to the canonical depth.
    ///
    /// Narrower sources are shifted left, wider ones shifted right arithmetically so
    /// the sign is preserved.
    #[inline]
    fn from_signed(value: i32, bits: u32) -> Self::Sample {
        let aligned = if bits < Self::DEPTH {
            value << (Self::DEPTH - bits)
        } else {
            value >> (bits - Self::DEPTH)
        };
        Self::from_i32(aligned)
    }

    /// Converts a float sample in `[-1.0, 1.0]` to the canonical depth.
    ///
    /// The float is first scaled to a 32-bit signed value, backing off half a
    /// canonical step from full scale so that `1.0` does not round past the maximum.
    #[inline]
    fn from_float(value: f32) -> Self::Sample {
        let half_step = (1i64 << (32 - Self::WIDTH)) / 2;
        let scale = (i32::MAX as i64 - half_step) as f64;
        // `as` saturates out-of-range values and maps NaN to zero.
        let scaled = (value as f64 * scale).round() as i32;
        Self::from_signed(scaled, 32)
    }

    #[inline]
    fn read_frame(bytes: &[u8]) -> Frame<Self::Sample> {
        Frame::new(
            Self::read_le(&bytes[..Self::BYTES]),
            Self::read_le(&bytes[Self::BYTES..2 * Self::BYTES]),
        )
    }

    #[inline]
    fn put_frame<B: BufMut>(buf: &mut B, frame: Frame<Self::Sample>) {
        Self::put_le(buf, frame.left);
        Self::put_le(buf, frame.right);
    }
}

/// 16-bit signed samples in 16-bit containers (`S16LE`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct S16;

impl CanonicalFormat for S16 {
    type Sample = i16;

    const NAME: &'static str = "S16LE";
    const DEPTH: u32 = 16;
    const WIDTH: u32 = 16;
    const WEIGHT_BITS: u32 = 16;
    const MAX: i16 = i16::MAX;
    const MIN: i16 = i16::MIN;

    #[inline]
    fn from_i32(value: i32) -> i16 {
        value as i16
    }

    #[inline]
    fn interpolate(prev: i16, next: i16, frac: u32) -> i16 {
        let weight = (frac >> (FRACTION_BITS - Self::WEIGHT_BITS)) as i32;
        let one = 1i32 << Self::WEIGHT_BITS;
        ((next as i32 * weight + prev as i32 * (one - weight)) >> Self::WEIGHT_BITS) as i16
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> i16 {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }

    #[inline]
    fn put_le<B: BufMut>(buf: &mut B, sample: i16) {
        buf.put_i16_le(sample);
    }
}

/// 24-bit signed samples, right-aligned in 32-bit containers (`S24_32LE`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct S24In32;

impl CanonicalFormat for S24In32 {
    type Sample = i32;

    const NAME: &'static str = "S24_32LE";
    const DEPTH: u32 = 24;
    const WIDTH: u32 = 32;
    const WEIGHT_BITS: u32 = 32;
    const MAX: i32 = 0x007f_ffff;
    const MIN: i32 = -0x0080_0000;

    #[inline]
    fn from_i32(value: i32) -> i32 {
        value
    }

    #[inline]
    fn interpolate(prev: i32, next: i32, frac: u32) -> i32 {
        let weight = (frac as i64) << (Self::WEIGHT_BITS - FRACTION_BITS);
        let one = 1i64 << Self::WEIGHT_BITS;
        ((next as i64 * weight + prev as i64 * (one - weight)) >> Self::WEIGHT_BITS) as i32
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> i32 {
        i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    #[inline]
    fn put_le<B: BufMut>(buf: &mut B, sample: i32) {
        buf.put_i32_le(sample);
    }
}
