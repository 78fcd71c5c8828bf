//! FHIR-side models: element trees, paths, fixed values and exported instances

pub mod common;
mod element_definition;
mod instance_definition;
pub mod path;
mod structure_definition;
mod type_table;

pub use common::{
    FieldEdit, SLICE_NAME_KEY, merge, merge_property_on_instance, replace_field,
    replace_references, set_property_on_instance,
};
pub use element_definition::{ElementDefinition, ElementDefinitionType, FixedMode, FixedValue};
pub use instance_definition::InstanceDefinition;
pub use path::{Bracket, PathPart, SoftIndexOp, assemble_path, parse_fsh_path, structural_path};
pub use structure_definition::StructureDefinition;
pub use type_table::{FixedValueKeys, fixed_value_keys};
