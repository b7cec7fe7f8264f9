//! Person gating and category detection.
//!
//! | Stage | Capability | Output |
//! |-------|------------|--------|
//! | `PersonGate` | `PersonDetector` | has-person flag and person boxes |
//! | `DetectionFusion` | two `ObjectDetector`s (clothing, jewelry) | `Detection`s in full-frame coordinates |

pub mod fusion;
pub mod person;
pub mod providers;

pub use fusion::{DetectionFusion, FusionConfig};
pub use person::{PersonGate, PersonGateConfig, PersonVerdict};
pub use providers::{
    DetectorLabel, ObjectDetector, PersonDetections, PersonDetector, RawBox, RawDetections,
};
