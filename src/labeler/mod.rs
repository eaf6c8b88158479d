//! Batch image labeling on top of the dispatch engine.
//!
//! The engine handles one payload at a time; this module is the caller side
//! that fans a directory of images out over a fixed worker pool, one dispatch
//! per image, and writes accepted captions to `<stem>.txt` sidecars.

pub mod images;
pub mod payload;
pub mod pool;

pub use images::{content_type_for, is_image_file, list_images, tag_text_path};
pub use payload::image_payload;
pub use pool::{BatchOptions, BatchReport, LabelRecord, run_batch};
