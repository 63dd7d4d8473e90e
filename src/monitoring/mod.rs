pub mod notifier;

pub use notifier::{SnapshotNotifier, SnapshotSummary};
