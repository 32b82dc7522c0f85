mod clock_trait;
mod software_clock;

pub use clock_trait::{MonotonicClock, SharedClock};
pub use software_clock::SoftwareClock;
