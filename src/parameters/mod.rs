//! Parameter management types and utilities
//!
//! This module provides the parameter store, the persisted schema tables
//! and the typed parameter groups consumed by the navigation engine and
//! the barometer. Non-volatile persistence backends live in the platform
//! layer; the stable storage indices they rely on are declared here.

pub mod baro;
pub mod error;
pub mod navigation;
pub mod schema;
pub mod storage;

pub use baro::BaroParams;
pub use error::ParameterError;
pub use navigation::WpNavParams;
pub use schema::ParamDescriptor;
pub use storage::{ParamFlags, ParamValue, ParameterStore, MAX_PARAMS, PARAM_NAME_LEN};
