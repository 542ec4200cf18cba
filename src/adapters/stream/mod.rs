//! Record stream reconstruction.
//!
//! - `StreamParser` - Incremental bytes-to-events parser, one per stream
//! - `noise` - Removal of diagnostic text captured inside blocks
//! - `normalize` - Loose block notation to strict JSON

mod noise;
mod normalize;
mod parser;

pub use noise::{is_diagnostic_line, strip_noise, MONITOR_PREFIX};
pub use normalize::{decode_block, normalize_block, BlockError};
pub use parser::{ParserStats, StreamParser, DEFAULT_MAX_BUFFER_BYTES};
