//! Element tree of one StructureDefinition
//!
//! The tree is the snapshot's element list in document order. Paths are
//! resolved against element ids; structure that the snapshot does not spell
//! out (children of datatypes, narrowed choice types) is added on demand and
//! never removed again.

use super::element_definition::{ElementDefinition, upper_first};
use super::path::{Bracket, PathPart, parse_fsh_path};
use crate::canonical::{FhirType, Fishable};
use crate::error::MakiExportError;
use crate::fshtypes::FshValue;
use crate::result::Result;
use serde_json::Value;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct StructureDefinition {
    pub id: Option<String>,
    pub url: Option<String>,
    pub name: Option<String>,
    /// The resource or datatype this definition describes
    pub sd_type: String,
    pub kind: Option<String>,
    pub derivation: Option<String>,
    pub base_definition: Option<String>,
    /// Never empty; the first element is the root
    elements: Vec<ElementDefinition>,
}

impl StructureDefinition {
    /// Build the tree from the snapshot (or, failing that, the differential)
    pub fn from_json(json: &Value) -> Result<Self> {
        let text = |key: &str| json.get(key).and_then(Value::as_str).map(String::from);
        let label = text("url")
            .or_else(|| text("id"))
            .unwrap_or_else(|| "<anonymous>".to_string());

        let sd_type = text("type").ok_or_else(|| {
            MakiExportError::invalid_definition(format!("StructureDefinition {label} has no type"))
        })?;
        let elements = json
            .pointer("/snapshot/element")
            .or_else(|| json.pointer("/differential/element"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                MakiExportError::invalid_definition(format!(
                    "StructureDefinition {label} has no elements"
                ))
            })?
            .iter()
            .map(ElementDefinition::from_json)
            .collect::<Result<Vec<_>>>()?;
        if elements.is_empty() {
            return Err(MakiExportError::invalid_definition(format!(
                "StructureDefinition {label} has no elements"
            )));
        }

        Ok(Self {
            id: text("id"),
            url: text("url"),
            name: text("name"),
            sd_type,
            kind: text("kind"),
            derivation: text("derivation"),
            base_definition: text("baseDefinition"),
            elements,
        })
    }

    pub fn is_constraint(&self) -> bool {
        self.derivation.as_deref() == Some("constraint")
    }

    pub fn root(&self) -> &ElementDefinition {
        &self.elements[0]
    }

    pub fn elements(&self) -> &[ElementDefinition] {
        &self.elements
    }

    /// Exact id lookup
    pub fn find_element(&self, id: &str) -> Option<&ElementDefinition> {
        self.elements.iter().find(|element| element.id == id)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.elements.iter().position(|element| element.id == id)
    }

    /// Elements exactly one segment below `id`
    pub fn children(&self, id: &str, include_slices: bool) -> Vec<&ElementDefinition> {
        let prefix = format!("{id}.");
        self.elements
            .iter()
            .filter(|element| {
                element.id.strip_prefix(&prefix).is_some_and(|rest| {
                    !rest.contains('.') && (include_slices || !rest.contains(':'))
                })
            })
            .collect()
    }

    /// Resolve a FSH path to an element, unfolding nested structure as needed
    pub fn find_element_by_path(
        &mut self,
        path: &str,
        fisher: &dyn Fishable,
    ) -> Result<&ElementDefinition> {
        let parts = parse_fsh_path(path)?;
        let mut current = 0;
        for part in &parts {
            current = self.resolve_part(current, part, path, fisher)?.1;
        }
        Ok(&self.elements[current])
    }

    /// Check that `value` can be fixed at `path`
    ///
    /// Returns the value as it would appear in an instance together with the
    /// parsed path, where every repeating element without an explicit index
    /// gets `[0]`. The tree's own elements are not modified beyond unfolding.
    pub fn validate_value_at_path(
        &mut self,
        path: &str,
        value: &FshValue,
        fisher: &dyn Fishable,
    ) -> Result<(Value, Vec<PathPart>)> {
        let mut parts = parse_fsh_path(path)?;
        let mut current = 0;

        for part in parts.iter_mut() {
            let (base, resolved) = self.resolve_part(current, part, path, fisher)?;
            let repeats = self.elements[base].is_array();
            match part.index() {
                None if repeats => part.brackets.push(Bracket::Index(0)),
                Some(index) if index > 0 && !repeats => {
                    return Err(MakiExportError::path_resolution(
                        path,
                        format!("{} does not repeat", self.elements[base].id),
                    ));
                }
                _ => {}
            }
            current = resolved;
        }

        let mut leaf = self.elements[current].clone();
        let candidate = leaf.coerce(value)?;
        leaf.assign_fixed(candidate.clone(), value)?;
        Ok((candidate.value, parts))
    }

    /// Returns (unsliced element, element after slice selection)
    fn resolve_part(
        &mut self,
        parent: usize,
        part: &PathPart,
        path: &str,
        fisher: &dyn Fishable,
    ) -> Result<(usize, usize)> {
        if part.has_soft_index() {
            return Err(MakiExportError::invalid_path(
                path,
                "soft index must be resolved before path resolution",
            ));
        }

        let base = self.find_child(parent, &part.base, path, fisher)?;
        let resolved = match part.slice_name() {
            Some(slice) => self.find_slice(base, &slice).ok_or_else(|| {
                MakiExportError::path_resolution(
                    path,
                    format!("{} has no slice named {slice}", self.elements[base].id),
                )
            })?,
            None => base,
        };
        trace!("Resolved {} to {}", part, self.elements[resolved].id);
        Ok((base, resolved))
    }

    fn find_child(
        &mut self,
        parent: usize,
        name: &str,
        path: &str,
        fisher: &dyn Fishable,
    ) -> Result<usize> {
        if let Some(index) = self.lookup_child(parent, name) {
            return Ok(index);
        }
        if !self.has_children(parent) {
            self.unfold(parent, path, fisher)?;
            if let Some(index) = self.lookup_child(parent, name) {
                return Ok(index);
            }
        }
        Err(MakiExportError::path_resolution(
            path,
            format!("{} has no child named {name}", self.elements[parent].id),
        ))
    }

    fn lookup_child(&mut self, parent: usize, name: &str) -> Option<usize> {
        let id = format!("{}.{name}", self.elements[parent].id);
        self.index_of(&id)
            .or_else(|| self.narrow_choice(parent, name))
    }

    /// Slice by name; extension slices may also be named by their profile URL
    fn find_slice(&self, base: usize, slice: &str) -> Option<usize> {
        let base_id = &self.elements[base].id;
        self.index_of(&format!("{base_id}:{slice}")).or_else(|| {
            let prefix = format!("{base_id}:");
            self.elements.iter().position(|element| {
                element
                    .id
                    .strip_prefix(&prefix)
                    .is_some_and(|name| !name.contains('.'))
                    && element
                        .types
                        .iter()
                        .any(|element_type| element_type.profile.iter().any(|p| p == slice))
            })
        })
    }

    /// `valueQuantity` under a parent with `value[x]` becomes
    /// `value[x]:valueQuantity`, restricted to Quantity
    fn narrow_choice(&mut self, parent: usize, name: &str) -> Option<usize> {
        let prefix = format!("{}.", self.elements[parent].id);
        let (choice, type_code) = self.elements.iter().enumerate().find_map(|(index, element)| {
            let stem = element.id.strip_prefix(&prefix)?.strip_suffix("[x]")?;
            if stem.contains('.') || stem.contains(':') {
                return None;
            }
            let suffix = name.strip_prefix(stem)?;
            element
                .types
                .iter()
                .find(|element_type| upper_first(&element_type.code) == suffix)
                .map(|element_type| (index, element_type.code.clone()))
        })?;

        if self.elements[choice].types.len() == 1 {
            return Some(choice);
        }

        let narrowed_id = format!("{}:{name}", self.elements[choice].id);
        if let Some(existing) = self.index_of(&narrowed_id) {
            return Some(existing);
        }

        let mut narrowed = self.elements[choice].clone();
        narrowed.id = narrowed_id;
        narrowed.slice_name = Some(name.to_string());
        narrowed
            .types
            .retain(|element_type| element_type.code == type_code);

        let at = self.subtree_end(choice);
        trace!("Narrowing choice element {} at {}", narrowed.id, at);
        self.elements.insert(at, narrowed);
        Some(at)
    }

    fn has_children(&self, index: usize) -> bool {
        let prefix = format!("{}.", self.elements[index].id);
        self.elements
            .iter()
            .any(|element| element.id.starts_with(&prefix))
    }

    /// Index just past the element's children and slices
    fn subtree_end(&self, index: usize) -> usize {
        let id = &self.elements[index].id;
        let (children, slices) = (format!("{id}."), format!("{id}:"));
        self.elements[index + 1..]
            .iter()
            .position(|element| {
                !(element.id.starts_with(&children) || element.id.starts_with(&slices))
            })
            .map_or(self.elements.len(), |offset| index + 1 + offset)
    }

    /// Copy in the children of an element that the tree does not spell out
    fn unfold(&mut self, index: usize, path: &str, fisher: &dyn Fishable) -> Result<()> {
        let element = self.elements[index].clone();

        let unfolded: Vec<ElementDefinition> = if let Some(reference) = &element.content_reference
        {
            let target = reference.rsplit('#').next().unwrap_or(reference);
            let target_path = self
                .find_element(target)
                .map(|target| target.path.clone())
                .unwrap_or_else(|| target.to_string());
            self.rebased_descendants(target, &target_path, &element)
        } else if let Some(sliced) = element
            .slice_name
            .as_ref()
            .and_then(|slice| element.id.strip_suffix(&format!(":{slice}")))
            .and_then(|base_id| self.index_of(base_id))
            .filter(|&base| self.has_children(base))
        {
            let base = self.elements[sliced].clone();
            self.rebased_descendants(&base.id, &base.path, &element)
        } else {
            let [element_type] = element.types.as_slice() else {
                return Err(MakiExportError::path_resolution(
                    path,
                    format!("cannot unfold {} without a single type", element.id),
                ));
            };
            let definition = element_type
                .profile
                .first()
                .and_then(|profile| {
                    fisher.fish_for_fhir(
                        profile,
                        &[
                            FhirType::Profile,
                            FhirType::Extension,
                            FhirType::Type,
                            FhirType::Resource,
                        ],
                    )
                })
                .or_else(|| {
                    fisher.fish_for_fhir(element_type.fhir_type(), &[FhirType::Type, FhirType::Resource])
                })
                .ok_or_else(|| {
                    MakiExportError::path_resolution(
                        path,
                        format!("cannot find definition for type {}", element_type.fhir_type()),
                    )
                })?;
            let type_tree = StructureDefinition::from_json(&definition)?;
            let root = type_tree.root();
            type_tree.elements[1..]
                .iter()
                .map(|child| rebase(child, &root.id, &root.path, &element))
                .collect()
        };

        trace!("Unfolded {} elements under {}", unfolded.len(), element.id);
        self.elements.splice(index + 1..index + 1, unfolded);
        Ok(())
    }

    fn rebased_descendants(
        &self,
        source_id: &str,
        source_path: &str,
        target: &ElementDefinition,
    ) -> Vec<ElementDefinition> {
        let prefix = format!("{source_id}.");
        self.elements
            .iter()
            .filter(|element| element.id.starts_with(&prefix))
            .map(|element| rebase(element, source_id, source_path, target))
            .collect()
    }
}

fn rebase(
    element: &ElementDefinition,
    source_id: &str,
    source_path: &str,
    target: &ElementDefinition,
) -> ElementDefinition {
    let mut rebased = element.clone();
    if let Some(rest) = element.id.strip_prefix(source_id) {
        rebased.id = format!("{}{rest}", target.id);
    }
    if let Some(rest) = element.path.strip_prefix(source_path) {
        rebased.path = format!("{}{rest}", target.path);
    }
    rebased
}
