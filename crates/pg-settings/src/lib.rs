//! PopGuard Settings Loader
//!
//! This crate turns the extension's persisted settings document into the
//! [`Configuration`] snapshot the engine consumes.
//!
//! The document is the object kept in extension storage:
//!
//! ```json
//! {
//!   "blockingEnabled": true,
//!   "whitelist": ["google.com", "gmail.com", "github.com"],
//!   "settings": {
//!     "aggressiveness": 2,
//!     "detectPlayButtons": true,
//!     "detectMultiPopups": true,
//!     "detectNoInteraction": true
//!   }
//! }
//! ```
//!
//! Missing fields take the fresh-install defaults. Unknown fields
//! (statistics, site preferences) are ignored.

pub mod document;

pub use document::{parse_settings, SettingsDocument, SettingsError};
