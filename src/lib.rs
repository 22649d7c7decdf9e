//! spritealign - Library for preparing animated character stickers
//!
//! This library provides functionality to:
//! - Cut sprite sheets into frames, with optional grid auto-detection
//! - Separate characters from solid or chroma-key backgrounds
//! - Align frames on a shared canvas using a prioritized chain of anchor strategies
//! - Distribute timing across frames with easing curves
//! - Encode APNG animations within platform size limits and report compliance

pub mod align;
pub mod anchor;
pub mod apng;
pub mod assemble;
pub mod canvas;
pub mod classify;
pub mod cli;
pub mod color;
pub mod config;
pub mod frame;
pub mod grid;
pub mod loop_score;
pub mod output;
pub mod quantize;
pub mod segment;
pub mod timing;
pub mod validate;
