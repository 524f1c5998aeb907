use crate::error::ResampleError;
use crate::ring::CircularFrameBuffer;
use crate::{Canonical, CanonicalFormat, Frame, OUTPUT_CHANNELS};
use bytes::{Bytes, BytesMut};
use tracing::instrument;

/// Integer bits of the fixed-point source increment. Five bits allow downsampling
/// ratios just below 32; larger ratios wrap and produce garbage stepping.
pub const INTEGER_BITS: u32 = 5;
/// Fractional bits of the fixed-point source position and increment.
pub const FRACTION_BITS: u32 = 32 - INTEGER_BITS;

const FRACTION_MASK: u32 = (1 << FRACTION_BITS) - 1;

/// Streaming linear-interpolation sample rate converter for canonical stereo frames.
///
/// Incoming frames are appended to a scratch ring holding roughly one second of audio.
/// Output frames are produced as far as the buffered input allows, so the result does not
/// depend on how the input stream is split into buffers. A converter is bound to a single
/// source rate; a stream changing its rate needs a new converter.
pub struct RateConverter<C: CanonicalFormat = Canonical> {
    source_rate: u32,
    target_rate: u32,
    scratch: CircularFrameBuffer<Frame<C::Sample>>,
    /// Reused to decode incoming bytes before they are appended to the scratch ring.
    staging: Vec<Frame<C::Sample>>,
    /// Whole source frames consumed so far.
    position_int: u64,
    /// Fraction of the current source frame, [`FRACTION_BITS`] wide.
    position_frac: u32,
    /// `source_rate / target_rate` in fixed point.
    increment: u32,
}

impl<C: CanonicalFormat> RateConverter<C> {
    #[instrument(level = "debug", fields(canonical = C::NAME), err)]
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self, ResampleError> {
        if source_rate == 0 || target_rate == 0 {
            return Err(ResampleError::ZeroRate {
                source_rate,
                target_rate,
            });
        }

        // truncating to 32 bits is the documented wrap for ratios of 32 and above
        let increment = ((u64::from(source_rate) << FRACTION_BITS) / u64::from(target_rate)) as u32;
        let identity = source_rate == target_rate;
        let scratch_frames = if identity {
            0
        } else {
            source_rate.max(target_rate) as usize
        };

        tracing::debug!(?increment, ?identity, "Created rate converter");
        Ok(Self {
            source_rate,
            target_rate,
            scratch: CircularFrameBuffer::new(scratch_frames),
            staging: Vec::new(),
            position_int: 0,
            position_frac: 0,
            increment,
        })
    }

    #[inline]
    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    #[inline]
    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.source_rate == self.target_rate
    }

    /// Resamples one canonical buffer, returning every output frame that can be computed
    /// from the input seen so far.
    ///
    /// With equal rates the input is handed back as is, without copying. Buffers longer
    /// than the scratch ring can hold are written and consumed in slices, so the read
    /// position never falls behind the readable window.
    pub fn eat(&mut self, input: &Bytes) -> Bytes {
        if self.is_identity() {
            return input.clone();
        }

        let frame_bytes = OUTPUT_CHANNELS * C::BYTES;
        let mut rest: &[u8] = input;
        let mut out: Option<BytesMut> = None;
        loop {
            let take = (rest.len() / frame_bytes).min(self.writable_frames()) * frame_bytes;
            let (slice, tail) = rest.split_at(take);
            self.write(slice);
            let produced = self.produce();
            rest = tail;

            if rest.len() < frame_bytes && out.is_none() {
                return produced;
            }
            out.get_or_insert_with(BytesMut::new)
                .extend_from_slice(&produced);
            if rest.len() < frame_bytes {
                break;
            }
        }

        out.map(BytesMut::freeze).unwrap_or_default()
    }

    /// Frames that can be appended before unread frames would be overwritten.
    #[inline]
    fn writable_frames(&self) -> usize {
        let unread = self.scratch.write_head().saturating_sub(self.position_int);
        // at least one frame, so ratios beyond the ring size still make progress
        (self.scratch.capacity() as u64)
            .saturating_sub(unread)
            .max(1) as usize
    }

    /// Appends the complete frames of a canonical buffer to the scratch ring.
    pub fn write(&mut self, input: &[u8]) {
        let frame_bytes = OUTPUT_CHANNELS * C::BYTES;

        self.staging.clear();
        self.staging
            .extend(input.chunks_exact(frame_bytes).map(C::read_frame));
        self.scratch.write(&self.staging);
    }

    /// Number of source frames that can be stepped over, keeping one frame of lookahead
    /// for interpolation.
    #[inline]
    pub fn frames_available(&self) -> i64 {
        self.scratch.write_head() as i64 - self.position_int as i64 - 1
    }

    /// Produces as many output frames as the buffered source frames allow.
    pub fn produce(&mut self) -> Bytes {
        let available = self.frames_available();
        if available <= 0 {
            return Bytes::new();
        }

        let num_out_frames = (available as u64 * u64::from(self.target_rate)
            / u64::from(self.source_rate)) as usize;
        let mut out = BytesMut::with_capacity(num_out_frames * OUTPUT_CHANNELS * C::BYTES);

        for _ in 0..num_out_frames {
            // the estimate can overshoot the lookahead by one frame after an earlier short call
            if !self.has_lookahead() {
                break;
            }
            C::put_frame(&mut out, self.interpolated_frame());
            self.advance();
        }

        out.freeze()
    }

    #[inline]
    fn has_lookahead(&self) -> bool {
        let needed = if self.position_frac & FRACTION_MASK == 0 { 1 } else { 2 };
        self.position_int + needed <= self.scratch.write_head()
    }

    #[inline]
    fn interpolated_frame(&self) -> Frame<C::Sample> {
        let frac = self.position_frac & FRACTION_MASK;
        let prev = *self.scratch.peek(self.position_int);

        if frac == 0 {
            return prev;
        }

        let next = *self.scratch.peek(self.position_int + 1);
        Frame::new(
            C::interpolate(prev.left, next.left, frac),
            C::interpolate(prev.right, next.right, frac),
        )
    }

    #[inline]
    fn advance(&mut self) {
        self.position_frac = self.position_frac.wrapping_add(self.increment);
        let carry = self.position_frac >> FRACTION_BITS;
        if carry != 0 {
            self.position_int += u64::from(carry);
            self.position_frac &= FRACTION_MASK;
        }
    }
}
