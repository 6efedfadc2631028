/// Hot-reload workflow registry using ArcSwap
///
/// Provides lock-free, atomic updates to the in-memory workflow registry.
/// Each workflow update swaps the entire registry pointer, so concurrent
/// executions keep the snapshot they started with while new runs see the
/// updated definition immediately.

use crate::catalog::{ModuleCatalog, ModuleCategory};
use crate::workflow::{storage::WorkflowStorage, types::Workflow};
use anyhow::Result;
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};

/// Lock-free workflow registry for hot-reload capabilities
///
/// The registry is the single source of truth for active workflows in
/// memory. Compilation is deliberately draft-tolerant: structural problems
/// (cycles, dangling connections) are caught when a run is requested, not
/// when the editor saves.
#[derive(Debug)]
pub struct WorkflowRegistry {
    /// Atomic pointer to the workflow map, keyed by workflow id
    workflows: ArcSwap<HashMap<String, CompiledWorkflow>>,

    /// Persistent storage backing reload operations
    storage: WorkflowStorage,

    /// Catalog used to categorize modules during compilation
    catalog: Arc<ModuleCatalog>,
}

/// Workflow plus execution metadata extracted at load time
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    /// Base workflow definition
    pub workflow: Workflow,

    /// Module ids whose category is Input - the only ids runtime inputs bind to
    pub input_module_ids: Vec<String>,

    /// Module ids whose category is Output - their values form the run result
    pub output_module_ids: Vec<String>,
}

impl WorkflowRegistry {
    /// Create new registry instance with storage backend and catalog
    pub fn new(storage: WorkflowStorage, catalog: Arc<ModuleCatalog>) -> Self {
        Self {
            workflows: ArcSwap::new(Arc::new(HashMap::new())),
            storage,
            catalog,
        }
    }

    /// Initialize registry by loading all workflows from storage
    ///
    /// Called during application startup to populate the in-memory registry.
    pub async fn init_from_storage(&self) -> Result<()> {
        let stored_workflows = self.storage.load_all_workflows().await?;

        let mut compiled = HashMap::new();
        for (id, workflow) in stored_workflows {
            compiled.insert(id, self.compile(workflow));
        }
        self.workflows.store(Arc::new(compiled));

        tracing::info!(
            "Initialized workflow registry with {} workflows",
            self.workflows.load().len()
        );

        Ok(())
    }

    /// Hot-reload a single workflow from storage
    ///
    /// Lock-free: clones the current map, updates it, and swaps the pointer.
    pub async fn reload_workflow(&self, workflow_id: &str) -> Result<()> {
        let workflow = self
            .storage
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Workflow not found: {}", workflow_id))?;

        let compiled = self.compile(workflow);

        let current = self.workflows.load();
        let mut new_registry = (**current).clone();
        new_registry.insert(workflow_id.to_string(), compiled);
        self.workflows.store(Arc::new(new_registry));

        tracing::info!("Hot-reloaded workflow: {}", workflow_id);

        Ok(())
    }

    /// Get a workflow by ID (lock-free read)
    pub fn get_workflow(&self, workflow_id: &str) -> Option<CompiledWorkflow> {
        self.workflows.load().get(workflow_id).cloned()
    }

    /// List all active workflow IDs
    pub fn list_workflow_ids(&self) -> Vec<String> {
        self.workflows.load().keys().cloned().collect()
    }

    /// Remove a workflow from registry
    pub fn remove_workflow(&self, workflow_id: &str) {
        let current = self.workflows.load();
        let mut new_registry = (**current).clone();

        if new_registry.remove(workflow_id).is_some() {
            self.workflows.store(Arc::new(new_registry));
            tracing::info!("Removed workflow from registry: {}", workflow_id);
        }
    }

    /// Extract execution metadata from a workflow definition
    ///
    /// Modules whose type is unknown to the catalog stay uncategorized here;
    /// graph build reports them as fatal when a run is actually requested.
    fn compile(&self, workflow: Workflow) -> CompiledWorkflow {
        let mut input_module_ids = Vec::new();
        let mut output_module_ids = Vec::new();

        for module in &workflow.modules {
            match self.catalog.resolve(&module.type_id).map(|t| t.category) {
                Some(ModuleCategory::Input) => input_module_ids.push(module.id.clone()),
                Some(ModuleCategory::Output) => output_module_ids.push(module.id.clone()),
                _ => {}
            }
        }

        CompiledWorkflow {
            workflow,
            input_module_ids,
            output_module_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::sqlite::SqlitePool;

    async fn registry() -> WorkflowRegistry {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let storage = WorkflowStorage::new(pool);
        storage.init_schema().await.unwrap();
        WorkflowRegistry::new(storage, Arc::new(ModuleCatalog::builtin()))
    }

    fn workflow(id: &str) -> Workflow {
        serde_json::from_value(json!({
            "id": id,
            "name": "Compiled",
            "modules": [
                {"id": "in1", "type": "text-input"},
                {"id": "ai1", "type": "openai-text"},
                {"id": "out1", "type": "text-output"},
                {"id": "mystery", "type": "not-in-catalog"}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn compile_extracts_input_and_output_ids() {
        let registry = registry().await;
        registry.storage.save_workflow(&workflow("wf-1")).await.unwrap();
        registry.init_from_storage().await.unwrap();

        let compiled = registry.get_workflow("wf-1").unwrap();
        assert_eq!(compiled.input_module_ids, vec!["in1"]);
        assert_eq!(compiled.output_module_ids, vec!["out1"]);
    }

    #[tokio::test]
    async fn reload_and_remove_swap_the_map() {
        let registry = registry().await;
        registry.storage.save_workflow(&workflow("wf-1")).await.unwrap();

        assert!(registry.get_workflow("wf-1").is_none());
        registry.reload_workflow("wf-1").await.unwrap();
        assert!(registry.get_workflow("wf-1").is_some());
        assert_eq!(registry.list_workflow_ids(), vec!["wf-1"]);

        registry.remove_workflow("wf-1");
        assert!(registry.get_workflow("wf-1").is_none());
    }
}
