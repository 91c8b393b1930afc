mod junction;
mod offset;

pub use self::junction::{JunctionBuilder, JunctionLane, STRICT_RADII};
pub use self::offset::offset_centerline;
