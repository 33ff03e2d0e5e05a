//! Tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::tools::tool::{Tool, ToolSchema, validate_tool_schema};

/// Name-keyed registry of tools.
///
/// Registration is expected to happen at startup; lookups during active
/// loops only take the read lock. Listing preserves registration order, and
/// re-registering a name replaces the earlier tool in place.
pub struct ToolRegistry {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    order: Vec<String>,
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Register a tool. The last registration for a given name wins.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();

        let problems = validate_tool_schema(&tool.parameters_schema(), &name);
        if !problems.is_empty() {
            tracing::warn!(
                tool = %name,
                problems = ?problems,
                "Tool registered with a questionable parameter schema"
            );
        }

        let mut inner = self.inner.write().await;
        if inner.tools.insert(name.clone(), tool).is_some() {
            tracing::debug!(tool = %name, "Replaced previously registered tool");
        } else {
            inner.order.push(name.clone());
            tracing::debug!(tool = %name, "Registered tool");
        }
    }

    /// Register the built-in tools.
    pub async fn register_builtin_tools(&self) {
        use crate::tools::builtin::{BatchFileCreateTool, BatchFileSearchTool, EchoTool};

        self.register(Arc::new(EchoTool)).await;
        self.register(Arc::new(BatchFileSearchTool)).await;
        self.register(Arc::new(BatchFileCreateTool)).await;
    }

    /// Look up a tool by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.inner.read().await.tools.get(name).cloned()
    }

    /// All tools, in registration order.
    pub async fn list(&self) -> Vec<Arc<dyn Tool>> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|name| inner.tools.get(name).cloned())
            .collect()
    }

    /// Schemas of all tools, in registration order.
    pub async fn schemas(&self) -> Vec<ToolSchema> {
        self.list().await.iter().map(|t| t.schema()).collect()
    }

    /// Number of registered tools.
    pub async fn count(&self) -> usize {
        self.inner.read().await.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
