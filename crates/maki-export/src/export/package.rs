use crate::config::ExportConfiguration;
use crate::fhirtypes::InstanceDefinition;
use serde_json::Value;
use tracing::debug;

/// Collected output of an export run
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Exported instances in authoring order
    pub instances: Vec<InstanceDefinition>,
    pub config: ExportConfiguration,
}

impl Package {
    pub fn new(config: ExportConfiguration) -> Self {
        Self {
            instances: Vec::new(),
            config,
        }
    }

    pub fn find_instance(&self, name: &str) -> Option<&InstanceDefinition> {
        self.instances
            .iter()
            .find(|instance| instance.instance_name == name)
    }

    /// Add an instance unless one with the same name is already present
    pub fn add_instance(&mut self, instance: InstanceDefinition) -> bool {
        if self.find_instance(&instance.instance_name).is_some() {
            debug!(
                "Instance {} already exported, keeping the first",
                instance.instance_name
            );
            return false;
        }
        self.instances.push(instance);
        true
    }

    pub fn instances_json(&self) -> Vec<Value> {
        self.instances
            .iter()
            .map(InstanceDefinition::to_json)
            .collect()
    }
}
