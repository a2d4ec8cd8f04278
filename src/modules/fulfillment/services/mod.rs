pub mod access;
pub mod notifier;

pub use access::{AccessGranter, LogAccessGranter};
pub use notifier::{LogNotifier, NotificationKind, Notifier};
