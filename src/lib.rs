pub mod audio;
pub mod cutter;
pub mod error;

// Re-export for convenience
pub use audio::*;
pub use cutter::*;
pub use error::{CutterError, Result};
