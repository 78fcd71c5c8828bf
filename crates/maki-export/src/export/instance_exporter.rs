//! Instance exporter
//!
//! Turns authored instances into FHIR JSON documents. Each instance starts
//! from the StructureDefinition its `instanceOf` resolves to; its rules are
//! then applied in order, and after each rule the fixed and pattern values
//! of the elements along the rule's path are cascaded into the document so
//! that every element the profile pins down is present.

use super::package::Package;
use super::soft_index::resolve_soft_indexing;
use crate::canonical::{FhirType, Fishable};
use crate::error::MakiExportError;
use crate::fhirtypes::{
    Bracket, FieldEdit, InstanceDefinition, PathPart, SLICE_NAME_KEY, StructureDefinition,
    merge_property_on_instance, replace_field, replace_references, set_property_on_instance,
    structural_path,
};
use crate::fshtypes::{FixedValueRule, FshTank, Instance};
use crate::result::Result;
use dashmap::DashMap;
use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::{debug, error, info, trace};

/// Where an `instanceOf` may point
const INSTANCE_OF_TYPES: [FhirType; 4] = [
    FhirType::Resource,
    FhirType::Type,
    FhirType::Profile,
    FhirType::Extension,
];

/// Outcome of exporting a whole tank
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported: usize,
    /// Instances whose name was already taken in the package
    pub skipped: usize,
    /// Names of instances dropped because of an error
    pub failed: Vec<String>,
}

impl ExportSummary {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Exports the instances of a [`FshTank`] against a definition registry
///
/// The exporter keeps one pristine copy of every StructureDefinition it has
/// fished; each instance works on its own clone, so unfolding done for one
/// instance never leaks into another.
pub struct InstanceExporter<'a> {
    tank: &'a FshTank,
    fisher: &'a dyn Fishable,
    structures: DashMap<String, StructureDefinition>,
}

impl<'a> InstanceExporter<'a> {
    pub fn new(tank: &'a FshTank, fisher: &'a dyn Fishable) -> Self {
        Self {
            tank,
            fisher,
            structures: DashMap::new(),
        }
    }

    /// Export every instance of the tank into `package`
    ///
    /// A failing instance is logged with its source location and left out;
    /// the remaining instances are still exported.
    pub fn export(&self, package: &mut Package) -> ExportSummary {
        let mut summary = ExportSummary::default();
        for instance in self.tank.instances() {
            if package.find_instance(&instance.name).is_some() {
                summary.skipped += 1;
                continue;
            }
            let result = self.export_instance(instance);
            collect(package, instance, result, &mut summary);
        }
        log_summary(&summary);
        summary
    }

    /// Same as [`export`](Self::export), with instances exported on the rayon
    /// pool. Results are added to the package in authoring order.
    pub fn export_parallel(&self, package: &mut Package) -> ExportSummary {
        let mut summary = ExportSummary::default();
        let pending: Vec<&Instance> = self
            .tank
            .instances()
            .filter(|instance| {
                let exists = package.find_instance(&instance.name).is_some();
                if exists {
                    summary.skipped += 1;
                }
                !exists
            })
            .collect();

        let results: Vec<(&Instance, Result<InstanceDefinition>)> = pending
            .par_iter()
            .map(|instance| (*instance, self.export_instance(instance)))
            .collect();

        for (instance, result) in results {
            collect(package, instance, result, &mut summary);
        }
        log_summary(&summary);
        summary
    }

    /// Export a single authored instance
    pub fn export_instance(&self, fsh_instance: &Instance) -> Result<InstanceDefinition> {
        debug!(
            "Exporting instance {} of {}",
            fsh_instance.name, fsh_instance.instance_of
        );
        let mut structure = self.structure_for(fsh_instance)?;
        let options = &self.tank.config.instance_options;

        let mut instance =
            InstanceDefinition::new(&structure.sd_type, &fsh_instance.name, fsh_instance.usage);
        if options.sets_id(fsh_instance.usage) {
            instance.set_id(&fsh_instance.id);
        }
        if structure.is_constraint()
            && options.sets_meta_profile(fsh_instance.usage)
            && let Some(url) = &structure.url
        {
            instance.set_meta_profile(url);
        }

        self.set_fixed_values(fsh_instance, &mut structure, &mut instance)?;
        clean_instance(instance.content_mut());
        Ok(instance)
    }

    fn structure_for(&self, fsh_instance: &Instance) -> Result<StructureDefinition> {
        if let Some(cached) = self.structures.get(&fsh_instance.instance_of) {
            return Ok(cached.value().clone());
        }

        let definition = self
            .fisher
            .fish_for_fhir(&fsh_instance.instance_of, &INSTANCE_OF_TYPES)
            .ok_or_else(|| {
                MakiExportError::instance_of_not_defined(
                    &fsh_instance.name,
                    &fsh_instance.instance_of,
                )
            })?;
        let structure = StructureDefinition::from_json(&definition)?;
        self.structures
            .insert(fsh_instance.instance_of.clone(), structure.clone());
        Ok(structure)
    }

    fn set_fixed_values(
        &self,
        fsh_instance: &Instance,
        structure: &mut StructureDefinition,
        instance: &mut InstanceDefinition,
    ) -> Result<()> {
        let mut rules = fsh_instance.rules.clone();
        resolve_soft_indexing(&mut rules)?;

        for rule in &rules {
            self.apply_rule(rule, structure, instance)
                .map_err(|err| err.at_rule(&rule.path, &rule.source_info))?;
        }

        let root_id = structure.root().id.clone();
        set_fixed_values_for_direct_children(structure, &root_id, &[], instance)
    }

    fn apply_rule(
        &self,
        rule: &FixedValueRule,
        structure: &mut StructureDefinition,
        instance: &mut InstanceDefinition,
    ) -> Result<()> {
        let rule = replace_references(rule, self.tank, self.fisher);
        let (value, parts) =
            structure.validate_value_at_path(&rule.path, &rule.fixed_value, self.fisher)?;
        trace!("Setting {} = {}", rule.path, value);
        set_property_on_instance(instance.content_mut(), &parts, value)?;

        for depth in 1..=parts.len() {
            let prefix = &parts[..depth];
            let element_id = structure
                .find_element_by_path(&structural_path(prefix), self.fisher)?
                .id
                .clone();
            set_fixed_values_for_direct_children(structure, &element_id, prefix, instance)?;
        }
        Ok(())
    }
}

/// Merge the fixed and pattern values of the direct children of
/// `element_id` into the instance below `parent`
fn set_fixed_values_for_direct_children(
    structure: &StructureDefinition,
    element_id: &str,
    parent: &[PathPart],
    instance: &mut InstanceDefinition,
) -> Result<()> {
    for child in structure.children(element_id, false) {
        let (Some(fixed), Some(name)) = (child.fixed_json(), child.instance_property_name()) else {
            continue;
        };
        let mut part = PathPart::new(name);
        if child.is_array() {
            part.brackets.push(Bracket::Index(0));
        }
        let mut parts = parent.to_vec();
        parts.push(part);

        // A primitive already sits at the parent; nothing to merge into
        if let Err(err) = merge_property_on_instance(instance.content_mut(), &parts, fixed.clone())
        {
            debug!("Not cascading {}: {}", child.id, err);
        }
    }
    Ok(())
}

/// Strip slice markers and turn empty objects into nulls
fn clean_instance(content: &mut Value) {
    replace_field(
        content,
        &|key: &str, _: &Value| key == SLICE_NAME_KEY,
        &|_: &str, _: &Value| FieldEdit::Remove,
    );
    replace_field(
        content,
        &|_: &str, value: &Value| value.as_object().is_some_and(Map::is_empty),
        &|_: &str, _: &Value| FieldEdit::Set(Value::Null),
    );
}

fn collect(
    package: &mut Package,
    fsh_instance: &Instance,
    result: Result<InstanceDefinition>,
    summary: &mut ExportSummary,
) {
    match result {
        Ok(instance) => {
            if package.add_instance(instance) {
                summary.exported += 1;
            } else {
                summary.skipped += 1;
            }
        }
        Err(err) => {
            error!("{}\n  File: {}", err, fsh_instance.source_info);
            summary.failed.push(fsh_instance.name.clone());
        }
    }
}

fn log_summary(summary: &ExportSummary) {
    info!(
        "Exported {} instance(s), {} skipped, {} failed",
        summary.exported,
        summary.skipped,
        summary.failed.len()
    );
}
