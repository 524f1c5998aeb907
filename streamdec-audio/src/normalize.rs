use crate::format::{Caps, FormatDescriptor, SampleKind};
use crate::{Canonical, CanonicalFormat, Frame, OUTPUT_CHANNELS};
use bytes::{Bytes, BytesMut};
use std::marker::PhantomData;
use tracing::instrument;

/// Converts raw decoder output into canonical interleaved stereo samples.
///
/// The source layout is fixed for the lifetime of the normalizer. Buffers that already
/// are in the canonical layout are handed back without copying.
#[derive(Debug, Clone)]
pub struct SampleNormalizer<C: CanonicalFormat = Canonical> {
    descriptor: FormatDescriptor,
    _format: PhantomData<C>,
}

impl<C: CanonicalFormat> SampleNormalizer<C> {
    #[instrument(level = "debug", skip_all, fields(descriptor = %descriptor, canonical = C::NAME))]
    pub fn new(descriptor: FormatDescriptor) -> Self {
        if descriptor.is_canonical::<C>() {
            tracing::debug!("Source already in canonical format, passing buffers through");
        } else if descriptor.is_inert() || descriptor.sample_kind().is_none() {
            tracing::warn!("Source format cannot be converted, output will be empty");
        }

        Self {
            descriptor,
            _format: PhantomData,
        }
    }

    pub fn from_caps(caps: Option<&Caps>) -> Self {
        Self::new(FormatDescriptor::from_caps(caps))
    }

    #[inline]
    pub fn descriptor(&self) -> &FormatDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn is_passthrough(&self) -> bool {
        self.descriptor.is_canonical::<C>()
    }

    /// Converts one raw buffer.
    ///
    /// Trailing bytes that do not make up a complete frame are ignored. Layouts that
    /// cannot be converted produce an empty buffer.
    pub fn normalize(&self, raw: &Bytes) -> Bytes {
        if self.is_passthrough() {
            return raw.clone();
        }
        if self.descriptor.is_inert() {
            return Bytes::new();
        }

        match self.descriptor.sample_kind() {
            Some(SampleKind::I8) => self.convert::<i8>(raw),
            Some(SampleKind::U8) => self.convert::<u8>(raw),
            Some(SampleKind::I16) => self.convert::<i16>(raw),
            Some(SampleKind::U16) => self.convert::<u16>(raw),
            Some(SampleKind::I24) => self.convert::<I24>(raw),
            Some(SampleKind::U24) => self.convert::<U24>(raw),
            Some(SampleKind::I32) => self.convert::<i32>(raw),
            Some(SampleKind::U32) => self.convert::<u32>(raw),
            Some(SampleKind::F32) => self.convert::<f32>(raw),
            None => Bytes::new(),
        }
    }

    fn convert<R: RawSample>(&self, raw: &[u8]) -> Bytes {
        let layout = RawLayout {
            stride: R::BYTES * self.descriptor.channels() as usize,
            big_endian: self.descriptor.is_big_endian(),
            padding: self.descriptor.padding(),
        };

        if self.descriptor.channels() == 1 {
            convert_frames::<R, C, true>(raw, layout)
        } else {
            convert_frames::<R, C, false>(raw, layout)
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RawLayout {
    /// Bytes per raw frame, including channels beyond the first two.
    stride: usize,
    big_endian: bool,
    padding: u32,
}

fn convert_frames<R: RawSample, C: CanonicalFormat, const MONO: bool>(
    raw: &[u8],
    layout: RawLayout,
) -> Bytes {
    let num_frames = raw.len() / layout.stride;
    let mut out = BytesMut::with_capacity(num_frames * OUTPUT_CHANNELS * C::BYTES);

    // padding goes first: the unsigned offset applies to the meaningful bits only
    let sample = |bytes: &[u8]| {
        R::read(bytes, layout.big_endian)
            .pad(layout.padding)
            .canonical::<C>()
    };

    for frame in raw.chunks_exact(layout.stride) {
        let left = sample(&frame[..R::BYTES]);
        let right = if MONO {
            left
        } else {
            sample(&frame[R::BYTES..2 * R::BYTES])
        };
        C::put_frame(&mut out, Frame::new(left, right));
    }

    out.freeze()
}

/// A single raw sample as stored by the decoder.
trait RawSample: Copy {
    const BYTES: usize;

    /// Reads one sample in host representation from its stored byte order.
    fn read(bytes: &[u8], big_endian: bool) -> Self;

    /// Moves the meaningful bits of a padded container to its top.
    fn pad(self, shift: u32) -> Self;

    fn canonical<C: CanonicalFormat>(self) -> C::Sample;
}

macro_rules! raw_integer {
    ($raw:ty, $signed:ty, $offset:expr) => {
        impl RawSample for $raw {
            const BYTES: usize = size_of::<$raw>();

            #[inline]
            fn read(bytes: &[u8], big_endian: bool) -> Self {
                let mut buf = [0u8; size_of::<$raw>()];
                buf.copy_from_slice(&bytes[..size_of::<$raw>()]);
                if big_endian {
                    <$raw>::from_be_bytes(buf)
                } else {
                    <$raw>::from_le_bytes(buf)
                }
            }

            #[inline]
            fn pad(self, shift: u32) -> Self {
                self << shift
            }

            #[inline]
            fn canonical<C: CanonicalFormat>(self) -> C::Sample {
                // unsigned samples move into the signed domain by offsetting with the minimum
                let signed = (self as $signed).wrapping_add($offset);
                C::from_signed(signed as i32, <$raw>::BITS)
            }
        }
    };
}

raw_integer!(i8, i8, 0);
raw_integer!(u8, i8, i8::MIN);
raw_integer!(i16, i16, 0);
raw_integer!(u16, i16, i16::MIN);
raw_integer!(i32, i32, 0);
raw_integer!(u32, i32, i32::MIN);

/// Three-byte packed integer, bytes kept in little-endian order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Packed24<const SIGNED: bool>([u8; 3]);

type I24 = Packed24<true>;
type U24 = Packed24<false>;

impl<const SIGNED: bool> RawSample for Packed24<SIGNED> {
    const BYTES: usize = 3;

    #[inline]
    fn read(bytes: &[u8], big_endian: bool) -> Self {
        let mut b = [bytes[0], bytes[1], bytes[2]];
        if big_endian {
            b.reverse();
        }
        Self(b)
    }

    #[inline]
    fn pad(self, shift: u32) -> Self {
        let [b0, b1, b2] = self.0;
        let [p0, p1, p2, _] = (u32::from_le_bytes([b0, b1, b2, 0]) << shift).to_le_bytes();
        Self([p0, p1, p2])
    }

    #[inline]
    fn canonical<C: CanonicalFormat>(self) -> C::Sample {
        let [b0, b1, b2] = self.0;
        // unpacked into the top three bytes of a 32-bit container
        let container = i32::from_le_bytes([0, b0, b1, b2]);
        let signed = if SIGNED {
            container
        } else {
            container.wrapping_add(i32::MIN)
        };
        C::from_signed(signed, 32)
    }
}

impl RawSample for f32 {
    const BYTES: usize = 4;

    #[inline]
    fn read(bytes: &[u8], big_endian: bool) -> Self {
        f32::from_bits(u32::read(bytes, big_endian))
    }

    #[inline]
    fn pad(self, _shift: u32) -> Self {
        self
    }

    #[inline]
    fn canonical<C: CanonicalFormat>(self) -> C::Sample {
        C::from_float(self)
    }
}
