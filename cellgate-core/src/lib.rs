//! cellgate-core: Gate table, quantification types and session state for
//! manual marker gating of multiplexed tissue images.
//!
//! This crate holds no file I/O. Gate tables are persisted through the
//! [`GateStorage`] trait, implemented by `cellgate-io`.
//!

pub mod error;
pub mod gate;
pub mod histogram;
pub mod markers;
pub mod natural;
pub mod plot;
pub mod quantification;
pub mod session;

pub use error::{Error, GateColumn, NoOpReason, Result, ValidationError};
pub use gate::{GateKey, GateRecord, GateTable, GateUpdate, UNSET_GATE};
pub use histogram::IntensityHistogram;
pub use markers::{MarkerChannel, MarkerIndex};
pub use natural::{natural_cmp, sort_natural};
pub use plot::{CellPoint, GateSummary};
pub use quantification::{Quantification, SAMPLE_ID_COLUMN, X_CENTROID_COLUMN, Y_CENTROID_COLUMN};
pub use session::{Effect, GateEvent, GateStorage, Outcome, Session};
