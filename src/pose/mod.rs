#[cfg(feature = "desktop")]
pub mod detector;
pub mod estimator;
pub mod keypoint;
#[cfg(feature = "desktop")]
pub mod preprocess;

#[cfg(feature = "desktop")]
pub use detector::MoveNetDetector;
pub use estimator::{InferenceOptions, ModelArch, PoseEstimator};
pub use keypoint::{BBox, Keypoint, KeypointIndex, Pose};
#[cfg(feature = "desktop")]
pub use preprocess::{effective_input_size, preprocess_frame};
