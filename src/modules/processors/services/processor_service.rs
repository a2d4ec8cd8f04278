use super::processor_trait::ProcessorAdapter;
use crate::core::{AppError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry routing product payment configuration to a concrete processor
///
/// Adapters are constructed once at startup and injected wherever dispatch is
/// needed; nothing here is a process-wide mutable singleton.
pub struct ProcessorRegistry {
    processors: HashMap<String, Arc<dyn ProcessorAdapter>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    pub fn register(&mut self, processor: Arc<dyn ProcessorAdapter>) {
        self.processors
            .insert(processor.name().to_string(), processor);
    }

    /// Look up a processor by the name a product's payment configuration carries
    pub fn get(&self, name: &str) -> Result<Arc<dyn ProcessorAdapter>> {
        self.processors
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Processor '{}' not found", name)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.processors.keys().map(String::as_str).collect()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
