pub mod euclidean;
pub mod quaternion;
pub mod so3;

pub use euclidean::Euclidean;
pub use quaternion::{UnitQuaternion, UNIT_NORM_TOLERANCE};
pub use so3::{angular_distance, exp_map, log_map, UnitQuaternions};
