//! Tabular results: dynamic values and ordered column frames.

pub mod frame;
pub mod value;

pub use frame::{Column, Frame, FrameError, FrameResult};
pub use value::{GroupKey, Value};
