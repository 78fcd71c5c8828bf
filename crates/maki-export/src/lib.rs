//! MAKI Export
//!
//! Definition registry, element-tree path resolution and instance export for
//! FHIR Shorthand (FSH) projects. Loaded FHIR packages are fished by id, URL
//! or name; authored instances are turned into FHIR JSON by applying their
//! fixed-value rules against the StructureDefinition they are an instance of.

pub mod canonical;
pub mod config;
pub mod error;
pub mod export;
pub mod fhirtypes;
pub mod fshtypes;
pub mod load;
pub mod result;

pub use canonical::{
    DEFAULT_FISHING_ORDER, DefinitionKind, FhirDefinitions, FhirMetadata, FhirType, Fishable,
    SupplementalDefinitions,
};
pub use config::{ExportConfiguration, InstanceOptions};
pub use error::{ErrorKind, MakiExportError};
pub use export::{ExportSummary, InstanceExporter, Package};
pub use fhirtypes::{ElementDefinition, InstanceDefinition, StructureDefinition};
pub use fshtypes::{
    FixedValueRule, FshCode, FshDocument, FshQuantity, FshReference, FshTank, FshValue, Instance,
    InstanceUsage, SourceInfo,
};
pub use load::{LoadError, load_from_path};
pub use result::{Result, ResultExt};

/// Initialize tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("maki_export=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
