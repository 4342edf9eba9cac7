// crates/trimline-core/src/helpers/mod.rs
pub mod time;
