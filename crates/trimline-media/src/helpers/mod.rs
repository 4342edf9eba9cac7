// crates/trimline-media/src/helpers/mod.rs
//
// FFmpeg-side helpers shared by the thumbnail decoder and the remux backend.
// Not re-exported from lib.rs.

pub mod seek;
pub mod time;
