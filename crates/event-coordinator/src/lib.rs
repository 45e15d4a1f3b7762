//! Real-time event coordination.
//!
//! Host callbacks are translated into event notifications by [`HostHooks`]
//! and handed to the [`EventCoordinator`] together with the
//! [`UnitOfWork`] they belong to. Most events are resolved and enqueued
//! right away. Membership level changes are held until the unit of work is
//! flushed, and dropped for users who checked out in the same unit of work:
//! the checkout event already carries the new level.
//!
//! ```ignore
//! let mut uow = coordinator.begin();
//! hooks.checkout(&mut uow, &order).await?;
//! hooks.level_changed(&mut uow, order.membership_id, order.user_id).await?;
//! let report = coordinator.flush(uow).await; // sends the checkout only
//! ```

mod coordinator;
mod error;
mod hooks;
mod unit_of_work;

pub use coordinator::{DispatchOutcome, EventCoordinator, FlushReport};
pub use error::{CoordinatorError, CoordinatorResult};
pub use hooks::{ContentCatalog, HostHooks, HostNotification, MembershipOrder};
pub use unit_of_work::{PendingLevelChange, UnitOfWork};
