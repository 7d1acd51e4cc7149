//! Floating dialog system
//!
//! Several independent dialogs can be open at once. Each is addressed by a
//! stable [`DialogId`], owns its own content state, and can be focused,
//! minimized to the tray, dragged by its header, or closed.
//!
//! The pieces, leaf first:
//! - [`positioning`]: placement, clamping and the drag state machine
//! - [`registry`]: the authoritative map of live dialog records
//! - [`host`]: mounts content per record and routes input to it
//! - [`managers`]: CRM-specific entry points that pick ids and payloads
//! - [`content`]: the forms shown inside dialog frames

pub mod content;
pub mod host;
pub mod layer;
pub mod managers;
pub mod positioning;
pub mod registry;
pub mod types;

pub use host::DialogHost;
pub use managers::{DialogCallbacks, DialogManagers, IdAllocator};
pub use positioning::PositioningEngine;
pub use registry::DialogRegistry;
pub use types::*;
