pub mod application_received;
pub mod expiry_sweeper;
pub mod expiry_warner;
pub mod job_created;
pub mod outcome;
pub mod push_sender;
pub mod recipients;

pub use application_received::ApplicationReceivedNotifier;
pub use expiry_sweeper::{ExpirySweeper, SweepReport};
pub use expiry_warner::{warning_window, ExpiryWarner, WarnReport};
pub use job_created::JobCreatedNotifier;
pub use outcome::{report, HandlerOutcome, SkipReason};
pub use push_sender::{
    DeliveryHints, FcmDispatcher, LogOnlyDispatcher, PushDispatcher, PushError, PushMessage,
    PushTarget,
};
