//! Browser DOM layer for the Tapwrite editor.
//!
//! This crate provides the browser image platform, DOM mounting and event
//! handling on top of `tapwrite-core`. It assumes a
//! `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `platform`: object-URL previews, image preloading, the file picker
//! - `mount`: rendering the editor into the page
//! - `dom_sync`: DOM point ↔ document position mapping
//! - `events`: keyboard, input, paste and drop listeners
//! - `resize`: pointer wiring for image resize handles
//!
//! # Re-exports
//!
//! This crate re-exports `tapwrite-core` for convenience, so consumers
//! only need to depend on `tapwrite-browser`.

pub use tapwrite_core;
pub use tapwrite_core::*;

pub mod dom_sync;
pub mod events;
pub mod mount;
pub mod platform;
pub mod resize;

pub use events::{Listeners, SharedEditor, attach, editor_key, spawn_add_image, spawn_upload, transfer_from};
pub use mount::MountedEditor;
pub use platform::{BrowserFile, BrowserPlatform};
