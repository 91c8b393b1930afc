//! Small utilities shared by the rest of the workspace that don't belong to any one domain.

pub mod logger;
