//! Helpers shared by the exporters: writing into instance JSON, structural
//! rewrites and reference resolution

use super::path::PathPart;
use crate::canonical::{FhirType, Fishable};
use crate::error::MakiExportError;
use crate::fshtypes::{FixedValueRule, FshReference, FshTank, FshValue};
use crate::result::Result;
use serde_json::{Map, Value, json};

/// Marker recording which slice an array entry belongs to; stripped on export
pub const SLICE_NAME_KEY: &str = "_sliceName";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Replace,
    /// Keep what is there, fill in what is missing
    Merge,
}

/// Write `value` at the location described by `parts`, creating containers
///
/// Numeric indices address array entries, padding with empty objects. A part
/// with slice brackets addresses the n-th entry of that slice rather than the
/// n-th entry of the array.
pub fn set_property_on_instance(
    instance: &mut Value,
    parts: &[PathPart],
    value: Value,
) -> Result<()> {
    write_at(instance, parts, value, WriteMode::Replace)
}

/// Like [`set_property_on_instance`], but merges into existing content
/// instead of overwriting it
pub fn merge_property_on_instance(
    instance: &mut Value,
    parts: &[PathPart],
    value: Value,
) -> Result<()> {
    write_at(instance, parts, value, WriteMode::Merge)
}

fn write_at(current: &mut Value, parts: &[PathPart], value: Value, mode: WriteMode) -> Result<()> {
    let Some((part, rest)) = parts.split_first() else {
        place(current, value, mode, None);
        return Ok(());
    };
    let object = current.as_object_mut().ok_or_else(|| {
        MakiExportError::invalid_path(part.to_string(), "cannot set a property on a primitive")
    })?;

    match part.index() {
        Some(index) => {
            let entry = object
                .entry(part.base.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            let items = entry.as_array_mut().ok_or_else(|| {
                MakiExportError::invalid_path(part.to_string(), "existing value is not an array")
            })?;
            let slice = part.slice_name();
            let position = physical_index(items, slice.as_deref(), index);
            let slot = &mut items[position];
            if slot.is_null() {
                *slot = empty_entry(slice.as_deref());
            }
            if rest.is_empty() {
                place(slot, value, mode, slice.as_deref());
                Ok(())
            } else {
                write_at(slot, rest, value, mode)
            }
        }
        None if rest.is_empty() => {
            match object.get_mut(&part.base) {
                Some(existing) => place(existing, value, mode, None),
                None => {
                    object.insert(part.base.clone(), value);
                }
            }
            Ok(())
        }
        None => {
            let entry = object
                .entry(part.base.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if entry.is_null() {
                *entry = Value::Object(Map::new());
            }
            write_at(entry, rest, value, mode)
        }
    }
}

fn empty_entry(slice: Option<&str>) -> Value {
    match slice {
        Some(name) => json!({ SLICE_NAME_KEY: name }),
        None => Value::Object(Map::new()),
    }
}

fn physical_index(items: &mut Vec<Value>, slice: Option<&str>, index: usize) -> usize {
    let Some(name) = slice else {
        while items.len() <= index {
            items.push(Value::Object(Map::new()));
        }
        return index;
    };

    let mut positions: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.get(SLICE_NAME_KEY).and_then(Value::as_str) == Some(name))
        .map(|(position, _)| position)
        .collect();
    while positions.len() <= index {
        items.push(empty_entry(Some(name)));
        positions.push(items.len() - 1);
    }
    positions[index]
}

fn place(slot: &mut Value, value: Value, mode: WriteMode, slice: Option<&str>) {
    match mode {
        WriteMode::Replace => {
            *slot = value;
            if let (Some(name), Some(object)) = (slice, slot.as_object_mut()) {
                object.insert(SLICE_NAME_KEY.to_string(), json!(name));
            }
        }
        WriteMode::Merge => merge(slot, value),
    }
}

/// Deep-merge `incoming` into `existing`; existing scalars win
pub fn merge(existing: &mut Value, incoming: Value) {
    if existing.is_null() {
        *existing = incoming;
        return;
    }
    match (existing, incoming) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => {
            for (position, value) in source.into_iter().enumerate() {
                match target.get_mut(position) {
                    Some(slot) => merge(slot, value),
                    None => target.push(value),
                }
            }
        }
        _ => {}
    }
}

/// What to do with a field matched by [`replace_field`]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    Remove,
    Set(Value),
}

/// Walk `value` and rewrite every field the predicate matches
///
/// Matched fields are not descended into. Array entries are visited with
/// their index as the key.
pub fn replace_field<P, M>(value: &mut Value, predicate: &P, mutator: &M)
where
    P: Fn(&str, &Value) -> bool,
    M: Fn(&str, &Value) -> FieldEdit,
{
    match value {
        Value::Object(object) => {
            let keys: Vec<String> = object.keys().cloned().collect();
            for key in keys {
                let Some(field) = object.get_mut(&key) else {
                    continue;
                };
                if !predicate(&key, field) {
                    replace_field(field, predicate, mutator);
                    continue;
                }
                match mutator(&key, field) {
                    FieldEdit::Remove => {
                        object.shift_remove(&key);
                    }
                    FieldEdit::Set(replacement) => *field = replacement,
                }
            }
        }
        Value::Array(items) => {
            let mut kept = Vec::with_capacity(items.len());
            for (position, mut item) in std::mem::take(items).into_iter().enumerate() {
                let key = position.to_string();
                if !predicate(&key, &item) {
                    replace_field(&mut item, predicate, mutator);
                    kept.push(item);
                    continue;
                }
                if let FieldEdit::Set(replacement) = mutator(&key, &item) {
                    kept.push(replacement);
                }
            }
            *items = kept;
        }
        _ => {}
    }
}

/// Resolve authored references and code system names to canonical targets
///
/// `Reference(name)` naming an instance in the tank becomes
/// `<type>/<id>`; a code whose system names a known CodeSystem gets that
/// CodeSystem's URL. Anything that does not resolve is left as authored.
pub fn replace_references(
    rule: &FixedValueRule,
    tank: &FshTank,
    fisher: &dyn Fishable,
) -> FixedValueRule {
    let replaced = match &rule.fixed_value {
        FshValue::Reference(reference) => resolve_reference(reference, tank, fisher),
        FshValue::Code(code) => code
            .system
            .as_deref()
            .filter(|system| !system.contains(':'))
            .and_then(|system| fisher.fish_for_metadata(system, &[FhirType::CodeSystem]))
            .and_then(|metadata| metadata.url)
            .map(|url| {
                let mut code = code.clone();
                code.system = Some(url);
                FshValue::Code(code)
            }),
        _ => None,
    };

    match replaced {
        Some(fixed_value) => FixedValueRule {
            fixed_value,
            ..rule.clone()
        },
        None => rule.clone(),
    }
}

fn resolve_reference(
    reference: &FshReference,
    tank: &FshTank,
    fisher: &dyn Fishable,
) -> Option<FshValue> {
    let instance = tank.fish_for_instance(&reference.reference)?;
    let sd_type = fisher
        .fish_for_metadata(
            &instance.instance_of,
            &[FhirType::Resource, FhirType::Profile],
        )?
        .sd_type?;
    Some(FshValue::Reference(FshReference {
        reference: format!("{sd_type}/{}", instance.id),
        display: reference.display.clone(),
        sd_type: Some(sd_type),
    }))
}
