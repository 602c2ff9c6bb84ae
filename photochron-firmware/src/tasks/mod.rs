//! Embassy async tasks
//!
//! Each task runs independently and communicates via the edge channels
//! and the statics in `channels`.

pub mod capture;
pub mod correlate;
#[cfg(not(feature = "digital-sensor"))]
pub mod calibrate;
#[cfg(not(feature = "digital-sensor"))]
pub mod sampler;

pub use capture::edge_capture_task;
pub use correlate::correlate_task;
#[cfg(not(feature = "digital-sensor"))]
pub use calibrate::calibration_task;
#[cfg(not(feature = "digital-sensor"))]
pub use sampler::sampler_task;
