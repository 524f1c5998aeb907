use bytes::Bytes;
use pretty_assertions::assert_eq;
use streamdec_audio::{
    CanonicalFormat, FormatDescriptor, Frame, RateConverter, S16, S24In32, SampleFormat,
    SampleNormalizer,
};
use test_log::test;

fn normalizer<C: CanonicalFormat>(format: &str, channels: u32) -> SampleNormalizer<C> {
    let format: SampleFormat = format.parse().expect("format should parse");
    SampleNormalizer::new(FormatDescriptor::new(format, channels))
}

fn frames<C: CanonicalFormat>(bytes: &[u8]) -> Vec<Frame<C::Sample>> {
    bytes.chunks_exact(2 * C::BYTES).map(C::read_frame).collect()
}

/// Deterministic xorshift, enough to scatter chunk sizes and sample values.
struct Scatter(u64);

impl Scatter {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

#[test]
fn canonical_input_passes_through_unchanged() {
    let input = Bytes::from_static(&[0x01, 0x02, 0x03, 0x04, 0xfe, 0xff, 0x00, 0x80]);

    let s16 = normalizer::<S16>("S16LE", 2).normalize(&input);
    assert_eq!(s16, input);
    assert_eq!(s16.as_ptr(), input.as_ptr());

    let s24 = normalizer::<S24In32>("S24_32LE", 2).normalize(&input);
    assert_eq!(s24.as_ptr(), input.as_ptr());
}

#[test]
fn unsigned_8_bit_matches_offset_signed() {
    let unsigned = Bytes::from((0..=u8::MAX).flat_map(|u| [u, u]).collect::<Vec<_>>());
    let signed = Bytes::from((0..=u8::MAX).flat_map(|u| [u ^ 0x80, u ^ 0x80]).collect::<Vec<_>>());

    assert_eq!(
        normalizer::<S16>("U8", 2).normalize(&unsigned),
        normalizer::<S16>("S8", 2).normalize(&signed)
    );
    assert_eq!(
        normalizer::<S24In32>("U8", 2).normalize(&unsigned),
        normalizer::<S24In32>("S8", 2).normalize(&signed)
    );
}

#[test]
fn unsigned_16_bit_matches_offset_signed() {
    let unsigned: Vec<u8> = (0..=u16::MAX).flat_map(u16::to_le_bytes).collect();
    let signed: Vec<u8> = (0..=u16::MAX)
        .flat_map(|u| (u as i16).wrapping_add(i16::MIN).to_le_bytes())
        .collect();

    let unsigned = Bytes::from(unsigned);
    let signed = Bytes::from(signed);
    assert_eq!(
        normalizer::<S16>("U16LE", 1).normalize(&unsigned),
        normalizer::<S16>("S16LE", 1).normalize(&signed)
    );
    assert_eq!(
        normalizer::<S24In32>("U16LE", 1).normalize(&unsigned),
        normalizer::<S24In32>("S16LE", 1).normalize(&signed)
    );
}

#[test]
fn big_endian_matches_swapped_little_endian() {
    let mut scatter = Scatter(0x9e37_79b9_7f4a_7c15);
    let raw: Vec<u8> = (0..4 * 3 * 64).map(|_| scatter.next() as u8).collect();

    for (width, be, le) in [
        (2, "S16BE", "S16LE"),
        (2, "U16BE", "U16LE"),
        (3, "S24BE", "S24LE"),
        (3, "U24BE", "U24LE"),
        (3, "S20_24BE", "S20_24LE"),
        (4, "S32BE", "S32LE"),
        (4, "U32BE", "U32LE"),
        (4, "S24_32BE", "S24_32LE"),
    ] {
        let swapped: Vec<u8> = raw
            .chunks_exact(width)
            .flat_map(|sample| sample.iter().rev().copied())
            .collect();

        let raw = Bytes::from(raw.clone());
        let swapped = Bytes::from(swapped);
        assert_eq!(
            normalizer::<S16>(be, 2).normalize(&raw),
            normalizer::<S16>(le, 2).normalize(&swapped),
            "{be}"
        );
        assert_eq!(
            normalizer::<S24In32>(be, 2).normalize(&raw),
            normalizer::<S24In32>(le, 2).normalize(&swapped),
            "{be}"
        );
    }
}

#[test]
fn float_big_endian_matches_swapped_little_endian() {
    let values = [0.0f32, 0.25, -0.5, 1.0, -1.0, 0.123_456];
    let be: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
    let le: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();

    assert_eq!(
        normalizer::<S16>("F32BE", 2).normalize(&Bytes::from(be)),
        normalizer::<S16>("F32LE", 2).normalize(&Bytes::from(le))
    );
}

fn extremes(format: &str) -> Bytes {
    let (max, min): (Vec<u8>, Vec<u8>) = match format {
        "S8" => (vec![0x7f], vec![0x80]),
        "U8" => (vec![0xff], vec![0x00]),
        "S16LE" => (i16::MAX.to_le_bytes().to_vec(), i16::MIN.to_le_bytes().to_vec()),
        "S24LE" => (vec![0xff, 0xff, 0x7f], vec![0x00, 0x00, 0x80]),
        "S32LE" => (i32::MAX.to_le_bytes().to_vec(), i32::MIN.to_le_bytes().to_vec()),
        "F32LE" => (1.0f32.to_le_bytes().to_vec(), (-1.0f32).to_le_bytes().to_vec()),
        _ => unreachable!("no extremes for {format}"),
    };
    Bytes::from([max, min].concat())
}

#[test]
fn depth_extremes_map_to_canonical_extremes() {
    for format in ["S16LE", "S24LE", "S32LE", "F32LE"] {
        let out = normalizer::<S16>(format, 1).normalize(&extremes(format));
        assert_eq!(
            frames::<S16>(&out),
            vec![Frame::mono(S16::MAX), Frame::mono(S16::MIN)],
            "{format}"
        );
    }

    for format in ["S24LE", "S32LE", "F32LE"] {
        let out = normalizer::<S24In32>(format, 1).normalize(&extremes(format));
        assert_eq!(
            frames::<S24In32>(&out),
            vec![Frame::mono(S24In32::MAX), Frame::mono(S24In32::MIN)],
            "{format}"
        );
    }
}

#[test]
fn narrower_extremes_keep_low_bits_clear() {
    for format in ["S8", "U8"] {
        let out = normalizer::<S16>(format, 1).normalize(&extremes(format));
        assert_eq!(
            frames::<S16>(&out),
            vec![Frame::mono(0x7f00), Frame::mono(S16::MIN)],
            "{format}"
        );
    }

    let out = normalizer::<S24In32>("S16LE", 1).normalize(&extremes("S16LE"));
    assert_eq!(
        frames::<S24In32>(&out),
        vec![Frame::mono(0x007f_ff00), Frame::mono(S24In32::MIN)]
    );
}

#[test]
fn one_below_extremes_stays_within_tolerance() {
    // 24-bit packing drops the lowest bits, so neighbours of the extremes may round
    let raw = Bytes::from([[0xfe, 0xff, 0x7f], [0x01, 0x00, 0x80]].concat());

    let out = frames::<S16>(&normalizer::<S16>("S24LE", 1).normalize(&raw));
    assert!(out[0].left.abs_diff(S16::MAX) <= 1);
    assert!(out[1].left.abs_diff(S16::MIN) <= 1);

    let out = frames::<S24In32>(&normalizer::<S24In32>("S24LE", 1).normalize(&raw));
    assert!(out[0].left.abs_diff(S24In32::MAX) <= 256);
    assert!(out[1].left.abs_diff(S24In32::MIN) <= 256);
}

#[test]
fn mono_is_duplicated_to_both_channels() {
    let mut scatter = Scatter(42);
    for format in ["S8", "U8", "S16LE", "U16BE", "S24LE", "U24BE", "S32LE", "F32LE"] {
        let raw = Bytes::from((0..96).map(|_| scatter.next() as u8).collect::<Vec<_>>());
        let out = frames::<S16>(&normalizer::<S16>(format, 1).normalize(&raw));
        assert!(!out.is_empty(), "{format}");
        assert!(out.iter().all(|frame| frame.left == frame.right), "{format}");
    }
}

#[test]
fn equal_rates_return_identical_buffers() {
    let normalizer = normalizer::<S16>("U8", 2);
    let mut converter = RateConverter::<S16>::new(22_050, 22_050).expect("rates are valid");

    let canonical = normalizer.normalize(&Bytes::from_static(&[0, 64, 128, 255]));
    let out = converter.eat(&canonical);
    assert_eq!(out, canonical);
}

#[test]
fn frame_production_does_not_depend_on_chunking() {
    let mut scatter = Scatter(7);

    for (source, target) in [
        (44_100u32, 48_000u32),
        (48_000, 44_100),
        (8_000, 48_000),
        (96_000, 32_000),
    ] {
        let num_frames = 300 + scatter.below(300) as usize;
        let input: Vec<u8> = (0..num_frames * 4).map(|_| scatter.next() as u8).collect();
        let expected_frames = (num_frames as u64 - 1) * u64::from(target) / u64::from(source);

        let mut whole = RateConverter::<S16>::new(source, target).expect("rates are valid");
        let reference = frames::<S16>(&whole.eat(&Bytes::from(input.clone())));

        for _ in 0..8 {
            let mut converter = RateConverter::<S16>::new(source, target).expect("rates are valid");
            let mut out = Vec::new();
            let mut rest = input.as_slice();
            while !rest.is_empty() {
                let take = (4 * (1 + scatter.below(24) as usize)).min(rest.len());
                let (chunk, tail) = rest.split_at(take);
                out.extend_from_slice(&converter.eat(&Bytes::copy_from_slice(chunk)));
                rest = tail;
            }

            let out = frames::<S16>(&out);
            assert!(
                (out.len() as u64).abs_diff(expected_frames) <= 1,
                "{source} -> {target}: {} frames, expected {expected_frames}",
                out.len()
            );
            let common = out.len().min(reference.len());
            assert_eq!(&out[..common], &reference[..common]);
        }
    }
}
