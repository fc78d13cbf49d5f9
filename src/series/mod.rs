//! Point and Sequence Protocol
//!
//! The value and iterator contracts every other component depends on:
//!
//! - **point**: `DataPoint` and its tagged `Value`
//! - **sequence**: the forward-only, seekable `Sequence` cursor
//! - **types**: `Series`, its identity metadata and `Signature`
//! - **error**: contract violation errors

pub mod error;
pub mod point;
pub mod sequence;
pub mod types;

pub use error::{SeriesError, SeriesResult};
pub use point::{DataPoint, Value};
pub use sequence::{Sequence, SliceSequence};
pub use types::{Annotation, Series, SeriesMeta, SeriesOutput, Signature};
