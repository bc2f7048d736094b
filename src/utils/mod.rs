//! Utility functions and types

pub mod data_loader;
mod dataset;

pub use data_loader::{DataLoader, DataSaver};
pub use dataset::Dataset;
