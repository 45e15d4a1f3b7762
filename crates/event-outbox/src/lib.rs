//! Delivery of resolved events to the marketing API.
//!
//! This crate provides:
//! - [`EventSender`]: the delivery capability, implemented over HTTP by [`BentoClient`]
//! - [`TaskScheduler`]: deferred execution, with a timer-based [`TokioScheduler`]
//!   and a host-driven [`ScheduleQueue`]
//! - [`TaskRouter`]: dispatches scheduled tasks to handlers by name
//! - [`DeliveryQueue`]: enqueue now, deliver later; inline delivery when no
//!   scheduler is available

mod client;
mod delivery;
mod error;
mod queue;
mod router;
mod scheduler;
mod sender;
mod task;

pub use client::{BentoClient, ClientConfig, FIELD_CACHE_TTL};
pub use delivery::{DeliveryQueue, EnqueueOutcome, DELIVER_EVENT_TASK};
pub use error::{DeliveryError, DeliveryResult};
pub use queue::ScheduleQueue;
pub use router::TaskRouter;
pub use scheduler::TokioScheduler;
pub use sender::{send_test_event, EventSender, TEST_EVENT_NAME};
pub use task::{args_match, ScheduledTask, TaskHandle, TaskHandler, TaskScheduler};
