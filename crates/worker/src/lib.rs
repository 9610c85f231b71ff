//! Worker-side logic for sw-cache.
//!
//! This crate provides the interception layer: the route classifier, the
//! cache-first and network-first strategies, the install/activate/refresh
//! lifecycle and the event bridge (sync replay, push, notification clicks,
//! control messages). Everything runs against the store from
//! `sw-cache-core` and reaches the outside world through two seams: the
//! [`Fetcher`] trait for the network and the [`Host`] trait for clients and
//! notifications.

pub mod events;
pub mod fetch;
pub mod host;
pub mod lifecycle;
pub mod route;
pub mod strategy;
pub mod wait;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use events::{ClickOutcome, ControlMessage, ControlReply, PushPayload, SyncReport};
pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use host::{ClientInfo, Host, LocalHost, Notification, NotificationData};
pub use lifecycle::{ActivateReport, InstallReport, RefreshReport, RefreshSchedule, RefreshTrigger, WorkerState};
pub use route::{Route, RoutePolicy};
pub use wait::WaitUntil;
pub use worker::{Event, EventOutcome, FetchOutcome, Worker, WorkerContext, WorkerStatus};
