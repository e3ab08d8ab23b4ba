pub mod config;
pub mod host;
pub mod logging;
pub mod notifier;
pub mod runtime;
pub mod util;
#[cfg(feature = "voidstar")]
pub mod voidstar;
