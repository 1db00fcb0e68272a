use std::sync::Arc;

use loom_core::{
    Category, ClusterEngine, ClusterRequest, ClusterSummary, Record, RecordFilter, RelationGraph,
    Strategy, now_unix_secs,
};
use loom_store::store::{LAST_INGEST_KEY, SCHEMA_VERSION_KEY};
use loom_store::{Config, Store};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct LoomServer {
    state: Arc<Mutex<ServerState>>,
    tool_router: ToolRouter<Self>,
}

struct ServerState {
    store: Store,
    config: Config,
}

impl LoomServer {
    pub fn new(store: Store, config: Config) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServerState { store, config })),
            tool_router: Self::tool_router(),
        }
    }

    /// Fold the WAL into the database before exit.
    pub async fn checkpoint_wal(&self) {
        let state = self.state.lock().await;
        match state.store.checkpoint_truncate() {
            Ok(()) => tracing::info!("WAL checkpoint complete"),
            Err(e) => tracing::warn!("WAL checkpoint failed: {e}"),
        }
    }

    /// Records for a graph or clustering pass, bounded by `graph.max_records`.
    fn load_bounded(state: &ServerState, filter: RecordFilter) -> Result<Vec<Record>, McpError> {
        let max = state.config.graph.max_records;
        let filter = RecordFilter {
            limit: Some(filter.limit.map_or(max, |l| l.min(max))),
            ..filter
        };
        state
            .store
            .load_records(&filter)
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

fn json_result(value: &serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )])
}

// --- Tool parameter types ---

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct FilterRequest {
    /// Only records carrying every one of these tags
    tags: Option<Vec<String>>,
    /// Case-insensitive substring matched against content and tags
    search: Option<String>,
    /// Only records in this project
    project: Option<String>,
    /// Only records in this category; "uncategorized" selects records without one
    category: Option<String>,
    /// Maximum number of records to consider
    limit: Option<usize>,
}

impl FilterRequest {
    fn into_filter(self) -> RecordFilter {
        RecordFilter {
            tags: self.tags.unwrap_or_default(),
            search: self.search,
            project: self.project,
            category: self.category,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ClusterToolRequest {
    /// One of: category, tag, temporal, content, smart, project. Defaults to the configured strategy.
    strategy: Option<String>,
    /// Smallest cluster to keep, 1-10. Defaults to the configured size.
    min_cluster_size: Option<usize>,
    #[serde(flatten)]
    filter: FilterRequest,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct AddRequest {
    /// Record text
    content: String,
    /// Tags; "title:" and "summary:" prefixes carry display metadata
    tags: Option<Vec<String>>,
    /// One of: personal, work, code, research, conversations, preferences
    category: Option<String>,
    /// Project label
    project: Option<String>,
}

#[tool_router]
impl LoomServer {
    #[tool(
        description = "Group stored memories into clusters. Strategies: category, tag (a memory joins every tag it carries), temporal (today / this week / this month / earlier), content (lexical overlap), smart (category refined by tag or content), project. Returns clusters sorted largest first plus a coverage summary."
    )]
    async fn loom_cluster(
        &self,
        Parameters(req): Parameters<ClusterToolRequest>,
    ) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;

        let strategy = match req.strategy.as_deref() {
            Some(s) => s
                .parse::<Strategy>()
                .map_err(|e| McpError::invalid_params(e, None))?,
            None => state.config.clustering.strategy,
        };
        let min_size = req
            .min_cluster_size
            .unwrap_or(state.config.clustering.min_cluster_size);

        let records = Self::load_bounded(&state, req.filter.into_filter())?;
        let request = ClusterRequest::new(strategy)
            .with_min_size(min_size)
            .with_now(now_unix_secs());
        let clusters = ClusterEngine::cluster(&records, &request);
        let summary = ClusterSummary::compute(&records, &clusters);

        Ok(json_result(&serde_json::json!({
            "strategy": strategy,
            "minClusterSize": request.min_size(),
            "clusters": clusters,
            "summary": summary,
        })))
    }

    #[tool(
        description = "Build the relationship graph of stored memories. Two memories are linked when they share at least one tag; edge weight is the shared-tag count over the larger tag set. Returns nodes, edges and summary statistics."
    )]
    async fn loom_graph(
        &self,
        Parameters(req): Parameters<FilterRequest>,
    ) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let records = Self::load_bounded(&state, req.into_filter())?;
        let graph = RelationGraph::build(&records);

        Ok(json_result(&serde_json::json!({
            "nodes": graph.nodes,
            "edges": graph.edges,
            "stats": graph.stats(),
        })))
    }

    #[tool(description = "Store a new memory, stamped with the current time.")]
    async fn loom_add(
        &self,
        Parameters(req): Parameters<AddRequest>,
    ) -> Result<CallToolResult, McpError> {
        if req.content.trim().is_empty() {
            return Err(McpError::invalid_params(
                "content must not be empty".to_string(),
                None,
            ));
        }
        let category = req
            .category
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()
            .map_err(|e| McpError::invalid_params(e, None))?;

        let record = crate::new_record(
            &req.content,
            &req.tags.unwrap_or_default(),
            category,
            req.project.as_deref(),
        );

        let state = self.state.lock().await;
        state
            .store
            .upsert_record(&record)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let total = state
            .store
            .count()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(json_result(&serde_json::json!({
            "id": record.id,
            "timestamp": record.timestamp,
            "total": total,
        })))
    }

    #[tool(
        description = "Find stored memories by tag, text, project or category. Returns matching records newest first."
    )]
    async fn loom_search(
        &self,
        Parameters(req): Parameters<FilterRequest>,
    ) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let records = state
            .store
            .load_records(&req.into_filter())
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(json_result(&serde_json::json!({
            "count": records.len(),
            "records": records,
        })))
    }

    #[tool(description = "Get store statistics: record count, tag and project tallies, database size.")]
    async fn loom_stats(&self) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let store = &state.store;
        let internal = |e: loom_store::StoreError| McpError::internal_error(e.to_string(), None);

        let tags: Vec<serde_json::Value> = store
            .tag_counts()
            .map_err(internal)?
            .into_iter()
            .map(|(tag, count)| serde_json::json!({ "tag": tag, "count": count }))
            .collect();
        let projects: Vec<serde_json::Value> = store
            .project_counts()
            .map_err(internal)?
            .into_iter()
            .map(|(project, count)| serde_json::json!({ "project": project, "count": count }))
            .collect();

        Ok(json_result(&serde_json::json!({
            "records": store.count().map_err(internal)?,
            "tags": tags,
            "projects": projects,
            "db_size_bytes": store.db_size().map_err(internal)?,
            "schema_version": store.get_metadata(SCHEMA_VERSION_KEY).map_err(internal)?,
            "last_ingest": store.get_metadata(LAST_INGEST_KEY).map_err(internal)?,
        })))
    }
}

#[tool_handler]
impl ServerHandler for LoomServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Relationship and clustering views over a store of tagged memories.\n\n\
                 - loom_add stores a memory. Use tags for topics; a \"title:\" tag sets its display label.\n\
                 - loom_search narrows by tag, text, project or category.\n\
                 - loom_graph links memories that share tags.\n\
                 - loom_cluster groups memories. Start with the smart strategy; use temporal for \
                   recency views and content when memories are untagged.\n\
                 - loom_stats reports store size and tag usage."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
