pub mod wager;
pub mod window;

pub use wager::WagerView;
pub use window::{
    deviation, reference_chance, window_reports, window_stats, Deviation, WindowReport,
    WindowStats, WINDOW_SIZES,
};
