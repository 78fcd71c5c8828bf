//! Export of authored instances into FHIR JSON

mod instance_exporter;
mod package;
mod soft_index;

pub use instance_exporter::{ExportSummary, InstanceExporter};
pub use package::Package;
pub use soft_index::resolve_soft_indexing;
