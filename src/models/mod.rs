//! Data models for rechub
//!
//! The canonical recording schema shared by every source, and the result
//! envelope handed to callers.

pub mod recording;

pub use recording::{Owner, Recording, RecordingsEnvelope, Site, SourceKind};
