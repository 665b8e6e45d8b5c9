pub mod admission;
pub mod lifecycle;
pub mod schedule;
pub mod slots;
