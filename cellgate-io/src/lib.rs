//! cellgate-io: CSV, project file and TIFF I/O for cellgate.
//!
//! CSV tables are parsed with `polars`, project files with `serde_json` and
//! images with `tiff` into `ndarray` planes. [`CsvGateStorage`] connects a
//! [`cellgate_core::Session`] to gate files on disk.
//!

mod error;
mod frame;
pub mod gates;
pub mod image;
pub mod project;
pub mod quantification;

pub use error::{Error, Result};
pub use gates::{
    gates_to_csv, parse_gates, read_gates, read_gates_file, write_gates_file, CsvGateStorage,
};
pub use image::{contrast_limits, mask_outline, page_count, read_channel, read_mask, LabelMask, Plane};
pub use project::ProjectConfig;
pub use quantification::{
    cells_to_csv, parse_markers, parse_quantification, read_markers, read_quantification,
};
