use std::collections::HashMap;
use tracing::warn;

use crate::openapi::OperationDescriptor;

/// Operation descriptors keyed by id, listed in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    operations: Vec<OperationDescriptor>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor`, replacing any earlier one with the same id.
    /// The replacement keeps the original listing position.
    pub fn register(&mut self, descriptor: OperationDescriptor) {
        match self.index.get(&descriptor.id) {
            Some(&position) => {
                warn!(
                    "Tool id {} registered twice; {} {} replaces {} {}",
                    descriptor.id,
                    descriptor.http_method,
                    descriptor.path_template,
                    self.operations[position].http_method,
                    self.operations[position].path_template
                );
                self.operations[position] = descriptor;
            }
            None => {
                self.index.insert(descriptor.id.clone(), self.operations.len());
                self.operations.push(descriptor);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&OperationDescriptor> {
        self.index.get(id).map(|&position| &self.operations[position])
    }

    pub fn list(&self) -> &[OperationDescriptor] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
