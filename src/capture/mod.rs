pub mod filter;
pub mod lookup;
pub mod message;
pub mod relay;

pub use filter::CaptureFilter;
pub use lookup::RetryPolicy;
pub use message::{CaptureEvent, InboundMessage, OutboundMessage};
pub use relay::{CaptureRelay, RelayStats};
