// crates/trimline-core/src/helpers/time.rs
//
// Human-readable timestamps for the zoom indicator, output file names and
// log lines. All inputs are milliseconds; negative values clamp to zero.

/// Format milliseconds as `MM:SS.mmm`, or `H:MM:SS.mmm` past an hour.
///
/// ```
/// use trimline_core::helpers::time::format_timestamp;
/// assert_eq!(format_timestamp(0),         "00:00.000");
/// assert_eq!(format_timestamp(61_500),    "01:01.500");
/// assert_eq!(format_timestamp(3_875_042), "1:04:35.042");
/// ```
pub fn format_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    let h  = ms / 3_600_000;
    let m  = (ms / 60_000) % 60;
    let s  = (ms / 1000) % 60;
    let f  = ms % 1000;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}.{f:03}")
    } else {
        format!("{m:02}:{s:02}.{f:03}")
    }
}

/// Compact duration for labels: `4.2s`, `3:07`, `1:04:35`.
///
/// ```
/// use trimline_core::helpers::time::format_duration;
/// assert_eq!(format_duration(4_200),     "4.2s");
/// assert_eq!(format_duration(59_960),    "59.9s");
/// assert_eq!(format_duration(187_000),   "3:07");
/// assert_eq!(format_duration(3_875_000), "1:04:35");
/// ```
pub fn format_duration(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    if secs >= 3600 {
        format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}:{:02}", secs / 60, secs % 60)
    } else {
        // Tenths are truncated so the label never reads 60.0s.
        let ms = ms.max(0);
        format!("{secs}.{}s", (ms % 1000) / 100)
    }
}

/// Filename-safe form of a timestamp, e.g. `00m05s250`.
///
/// ```
/// use trimline_core::helpers::time::file_stamp;
/// assert_eq!(file_stamp(5_250),  "00m05s250");
/// assert_eq!(file_stamp(-10),    "00m00s000");
/// ```
pub fn file_stamp(ms: i64) -> String {
    let ms = ms.max(0);
    format!("{:02}m{:02}s{:03}", ms / 60_000, (ms / 1000) % 60, ms % 1000)
}
