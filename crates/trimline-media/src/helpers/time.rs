// crates/trimline-media/src/helpers/time.rs
//
// Stream time base <-> microsecond conversions. i128 intermediates so long
// files in 1/90000 time bases cannot overflow. Results round to nearest like
// av_rescale_q, so a tick survives a trip through microseconds and back.

use ffmpeg_the_third as ffmpeg;
use ffmpeg::Rational;

/// `num / den` rounded half away from zero. `den` must be non-zero.
fn div_round(num: i128, den: i128) -> i128 {
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    if num >= 0 {
        (num + den / 2) / den
    } else {
        (num - den / 2) / den
    }
}

pub fn to_us(ts: i64, tb: Rational) -> i64 {
    if tb.denominator() == 0 {
        return 0;
    }
    div_round(ts as i128 * tb.numerator() as i128 * 1_000_000, tb.denominator() as i128) as i64
}

pub fn from_us(us: i64, tb: Rational) -> i64 {
    if tb.numerator() == 0 {
        return 0;
    }
    div_round(us as i128 * tb.denominator() as i128, tb.numerator() as i128 * 1_000_000) as i64
}

/// Rescales a duration between two stream time bases.
pub fn rescale(ts: i64, from: Rational, to: Rational) -> i64 {
    let den = from.denominator() as i128 * to.numerator() as i128;
    if den == 0 {
        return 0;
    }
    div_round(ts as i128 * from.numerator() as i128 * to.denominator() as i128, den) as i64
}
