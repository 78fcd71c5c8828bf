use super::Instance;
use crate::config::ExportConfiguration;
use indexmap::IndexMap;
use std::path::PathBuf;

/// The instances authored in one `.fsh` file, in authoring order
#[derive(Debug, Clone, Default)]
pub struct FshDocument {
    pub file: PathBuf,
    pub instances: IndexMap<String, Instance>,
}

impl FshDocument {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            instances: IndexMap::new(),
        }
    }

    /// Add an instance, stamping this document's file onto its source info
    pub fn add_instance(&mut self, mut instance: Instance) {
        if instance.source_info.file.is_none() {
            instance.source_info.file = Some(self.file.clone());
        }
        self.instances.insert(instance.name.clone(), instance);
    }
}

/// All parsed documents of a project plus its configuration
#[derive(Debug, Clone, Default)]
pub struct FshTank {
    pub docs: Vec<FshDocument>,
    pub config: ExportConfiguration,
}

impl FshTank {
    pub fn new(docs: Vec<FshDocument>, config: ExportConfiguration) -> Self {
        Self { docs, config }
    }

    /// Every instance across all documents, in authoring order
    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.docs.iter().flat_map(|doc| doc.instances.values())
    }

    /// Find an authored instance by name or id
    pub fn fish_for_instance(&self, item: &str) -> Option<&Instance> {
        self.instances()
            .find(|instance| instance.name == item || instance.id == item)
    }
}
