//! Typed services over the authenticated pipeline.

pub mod access_points;

pub use access_points::{AccessPointService, ScanFormat};
