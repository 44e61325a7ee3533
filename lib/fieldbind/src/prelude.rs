//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types, functions, and macros
//! for easy glob importing:
//!
//! ```ignore
//! use fieldbind::prelude::*;
//! ```

pub use crate::{
    Bindable, CancelSignal, Canceller, Engine, EngineConfig, Error, Field, File, InboundRequest,
    Method, Patch, Payload, Record, Registry, Request, Result, Upload, bindable_scalar, field,
};
pub use serde::{Deserialize, Serialize};
