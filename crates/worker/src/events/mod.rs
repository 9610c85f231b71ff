//! Event bridge: background sync, push, notification clicks and control
//! messages.

pub mod click;
pub mod message;
pub mod push;
pub mod sync;

pub use click::{ClickOutcome, handle_notification_click};
pub use message::{ControlMessage, ControlReply, ReplyPort, handle_message};
pub use push::{PushPayload, build_notification, handle_push};
pub use sync::{SyncReport, handle_sync, queue_mutation, replay_pending};
