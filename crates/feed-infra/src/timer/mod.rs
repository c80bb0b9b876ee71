mod interval;

pub use interval::IntervalTimer;
