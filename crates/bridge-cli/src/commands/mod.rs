//! Command implementations.

mod events;
mod settings;
mod sync;

pub use events::{replay, resolve, test_event};
pub use settings::{settings_fields, settings_import, settings_show};
pub use sync::{sync_start, sync_status};
