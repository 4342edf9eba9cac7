// crates/trimline-core/src/lib.rs
//
// Pure timeline model — no FFmpeg, no threads, no egui.
//
// The host feeds input and decoded thumbnails into `TimelineView`; the view
// answers with a render list, listener callbacks and `MediaRequest`s that the
// media crate turns into background work.

pub mod animation;
pub mod cache;
pub mod config;
pub mod error;
pub mod gesture;
pub mod helpers;
pub mod media_types;
pub mod render;
pub mod sync;
pub mod trim;
pub mod view;
pub mod zoom;

pub use config::TimelineConfig;
pub use error::{Result, TimelineError};
pub use media_types::{CachedFrame, MediaRequest, MediaResult, Thumbnail};
pub use trim::TrimRange;
pub use view::{TimelineListener, TimelineView};
pub use zoom::{ZoomLevel, ZoomTable};
