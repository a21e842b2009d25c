//! Data layer: dataset layout, decoding, segment index and cache.
//!
//! Architecture:
//! ```text
//!  <root>/primary/sub-<id>/...csv
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  layout   │  participant folders → recording files
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → RecordingTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  label tuples → row indices (SegmentIndex)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  client   │  TimeSeriesClient, LRU cache of decoded recordings
//!   └──────────┘
//! ```

pub mod cache;
pub mod client;
pub mod filter;
pub mod labels;
pub mod layout;
pub mod loader;
pub mod model;
pub mod synthetic;
