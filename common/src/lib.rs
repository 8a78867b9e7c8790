#[doc(hidden)]
pub use anyhow;
#[doc(hidden)]
pub use uuid;

#[macro_use]
pub mod macros;
pub mod log_setup;
pub mod normalize_string;

pub use log_setup::{setup_logging, LogConfig};

pub fn is_debug() -> bool {
    cfg!(debug_assertions)
}
