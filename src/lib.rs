rust_i18n::i18n!("locales", fallback = "en");

pub mod config;
pub mod error;
pub mod features;
pub mod i18n;
pub mod logging;
mod router;
pub mod state;
pub mod ui;

pub use router::dispatch_json;
