//! In-memory cluster for tests.
//!
//! `InMemoryCluster` implements `ClusterProvider` over plain maps so the bulk
//! engine, the index service and the CLI commands can be exercised without a
//! running cluster. It mirrors the cluster's structural failures (missing index,
//! existing index, missing alias) and its bulk item responses.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use tim_shared::{AliasEntry, ClusterInfo, ClusterVersion, IndexSummary};

use crate::errors::TimError;
use crate::interfaces::ClusterProvider;
use crate::types::AliasAction;

#[derive(Debug, Default)]
struct IndexState {
    aliases: BTreeSet<String>,
    documents: BTreeMap<String, Map<String, Value>>,
    body: Value,
}

#[derive(Debug, Default)]
struct State {
    indexes: BTreeMap<String, IndexState>,
    item_errors: HashMap<String, Value>,
    failures: HashMap<&'static str, (u16, String)>,
    bulk_requests: Vec<Vec<String>>,
    alias_updates: Vec<Vec<AliasAction>>,
    refreshed: Vec<String>,
}

/// An in-memory stand-in for an OpenSearch cluster.
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    state: Mutex<State>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an empty index linked to the given aliases.
    pub fn with_index(self, index: &str, aliases: &[&str]) -> Self {
        {
            let mut state = self.state();
            let entry = state.indexes.entry(index.to_string()).or_default();
            entry
                .aliases
                .extend(aliases.iter().map(|alias| alias.to_string()));
        }
        self
    }

    /// Add a document to an index, creating the index if needed.
    pub fn with_document(self, index: &str, id: &str, document: Value) -> Self {
        {
            let mut state = self.state();
            let document = match document {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            state
                .indexes
                .entry(index.to_string())
                .or_default()
                .documents
                .insert(id.to_string(), document);
        }
        self
    }

    /// Make every bulk item for `id` fail with this error object.
    pub fn with_item_error(self, id: &str, error: Value) -> Self {
        self.state().item_errors.insert(id.to_string(), error);
        self
    }

    /// Make every call to the named provider method fail with an API error.
    pub fn with_failure(self, method: &'static str, status: u16, body: &str) -> Self {
        self.state()
            .failures
            .insert(method, (status, body.to_string()));
        self
    }

    pub fn index_names(&self) -> Vec<String> {
        self.state().indexes.keys().cloned().collect()
    }

    /// Sorted alias names of an index, or `None` if the index is missing.
    pub fn aliases_of(&self, index: &str) -> Option<Vec<String>> {
        self.state()
            .indexes
            .get(index)
            .map(|entry| entry.aliases.iter().cloned().collect())
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.state()
            .indexes
            .get(index)
            .and_then(|entry| entry.documents.get(id))
            .map(|document| Value::Object(document.clone()))
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.state()
            .indexes
            .get(index)
            .map_or(0, |entry| entry.documents.len())
    }

    /// Body an index was created with.
    pub fn creation_body(&self, index: &str) -> Option<Value> {
        self.state()
            .indexes
            .get(index)
            .map(|entry| entry.body.clone())
    }

    /// Every bulk request body received, as NDJSON lines.
    pub fn bulk_requests(&self) -> Vec<Vec<String>> {
        self.state().bulk_requests.clone()
    }

    /// Every alias update request received.
    pub fn alias_updates(&self) -> Vec<Vec<AliasAction>> {
        self.state().alias_updates.clone()
    }

    pub fn refreshed(&self) -> Vec<String> {
        self.state().refreshed.clone()
    }

    fn check_failure(&self, method: &'static str) -> Result<(), TimError> {
        match self.state().failures.get(method) {
            Some((status, body)) => Err(TimError::api(*status, body.clone())),
            None => Ok(()),
        }
    }
}

fn parse_line(line: &str) -> Result<Value, TimError> {
    Ok(serde_json::from_str(line)?)
}

fn apply_action(
    state: &mut State,
    operation: &str,
    index: &str,
    id: &str,
    source: Option<Value>,
) -> Value {
    if let Some(error) = state.item_errors.get(id) {
        return json!({ operation: { "_index": index, "_id": id, "status": 400, "error": error } });
    }

    let entry = state.indexes.entry(index.to_string()).or_default();
    let exists = entry.documents.contains_key(id);
    let document = match source {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let (status, result) = match operation {
        "index" => {
            entry.documents.insert(id.to_string(), document);
            if exists {
                (200, "updated")
            } else {
                (201, "created")
            }
        }
        "create" if exists => {
            let error = json!({ "type": "version_conflict_engine_exception", "reason": "document already exists" });
            return json!({ operation: { "_index": index, "_id": id, "status": 409, "error": error } });
        }
        "create" => {
            entry.documents.insert(id.to_string(), document);
            (201, "created")
        }
        "update" => {
            let patch = match document.get("doc") {
                Some(Value::Object(patch)) => patch.clone(),
                _ => Map::new(),
            };
            match entry.documents.get_mut(id) {
                Some(existing) => {
                    existing.extend(patch);
                    (200, "updated")
                }
                None => {
                    let error = json!({ "type": "document_missing_exception", "reason": "document missing" });
                    return json!({ operation: { "_index": index, "_id": id, "status": 404, "error": error } });
                }
            }
        }
        "delete" => {
            if entry.documents.remove(id).is_some() {
                (200, "deleted")
            } else {
                (404, "not_found")
            }
        }
        _ => (400, "unknown"),
    };

    json!({ operation: { "_index": index, "_id": id, "status": status, "result": result } })
}

#[async_trait]
impl ClusterProvider for InMemoryCluster {
    async fn info(&self) -> Result<ClusterInfo, TimError> {
        self.check_failure("info")?;
        Ok(ClusterInfo {
            cluster_name: "in-memory".to_string(),
            cluster_uuid: "00000000-0000-0000-0000-000000000000".to_string(),
            version: ClusterVersion {
                number: "2.11.1".to_string(),
                lucene_version: "9.7.0".to_string(),
            },
        })
    }

    async fn cat_aliases(&self) -> Result<Vec<AliasEntry>, TimError> {
        self.check_failure("cat_aliases")?;
        let state = self.state();
        Ok(state
            .indexes
            .iter()
            .flat_map(|(index, entry)| {
                entry
                    .aliases
                    .iter()
                    .map(move |alias| AliasEntry::new(alias.clone(), index.clone()))
            })
            .collect())
    }

    async fn cat_indices(&self) -> Result<Vec<IndexSummary>, TimError> {
        self.check_failure("cat_indices")?;
        let state = self.state();
        Ok(state
            .indexes
            .iter()
            .map(|(index, entry)| IndexSummary {
                index: index.clone(),
                health: Some("green".to_string()),
                status: Some("open".to_string()),
                uuid: Some(format!("uuid-{}", index)),
                pri: Some("1".to_string()),
                rep: Some("1".to_string()),
                docs_count: Some(entry.documents.len().to_string()),
                pri_store_size: Some("208b".to_string()),
                store_size: Some("416b".to_string()),
            })
            .collect())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, TimError> {
        self.check_failure("index_exists")?;
        Ok(self.state().indexes.contains_key(index))
    }

    async fn create_index(&self, index: &str, body: &Value) -> Result<String, TimError> {
        self.check_failure("create_index")?;
        let mut state = self.state();
        if state.indexes.contains_key(index) {
            return Err(TimError::index_exists(index));
        }
        state.indexes.insert(
            index.to_string(),
            IndexState {
                body: body.clone(),
                ..IndexState::default()
            },
        );
        Ok(index.to_string())
    }

    async fn delete_index(&self, index: &str) -> Result<(), TimError> {
        self.check_failure("delete_index")?;
        match self.state().indexes.remove(index) {
            Some(_) => Ok(()),
            None => Err(TimError::index_not_found(index)),
        }
    }

    async fn index_aliases(&self, index: &str) -> Result<Vec<String>, TimError> {
        self.check_failure("index_aliases")?;
        self.aliases_of(index)
            .ok_or_else(|| TimError::index_not_found(index))
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), TimError> {
        self.check_failure("update_aliases")?;
        let mut state = self.state();
        state.alias_updates.push(actions.to_vec());

        for action in actions {
            let entry = state
                .indexes
                .get(action.index())
                .ok_or_else(|| TimError::index_not_found(action.index()))?;
            if let AliasAction::Remove { index, alias } = action {
                if !entry.aliases.contains(alias) {
                    return Err(TimError::alias_not_found(alias.as_str(), index.as_str()));
                }
            }
        }

        for action in actions {
            if let Some(entry) = state.indexes.get_mut(action.index()) {
                match action {
                    AliasAction::Add { alias, .. } => {
                        entry.aliases.insert(alias.clone());
                    }
                    AliasAction::Remove { alias, .. } => {
                        entry.aliases.remove(alias);
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete_alias(&self, index: &str, alias: &str) -> Result<(), TimError> {
        self.check_failure("delete_alias")?;
        let mut state = self.state();
        let entry = state
            .indexes
            .get_mut(index)
            .ok_or_else(|| TimError::index_not_found(index))?;
        if !entry.aliases.remove(alias) {
            return Err(TimError::alias_not_found(alias, index));
        }
        Ok(())
    }

    async fn bulk(&self, index: &str, lines: Vec<String>) -> Result<Vec<Value>, TimError> {
        self.check_failure("bulk")?;
        let mut state = self.state();
        state.bulk_requests.push(lines.clone());

        let mut items = Vec::new();
        let mut lines = lines.iter();
        while let Some(header) = lines.next() {
            let header = parse_line(header)?;
            let Some((operation, meta)) = header.as_object().and_then(|h| h.iter().next()) else {
                return Err(TimError::api(400, format!("Malformed bulk header: {}", header)));
            };
            let operation = operation.clone();
            let target = meta["_index"].as_str().unwrap_or(index).to_string();
            let id = meta["_id"].as_str().unwrap_or_default().to_string();
            let source = if operation == "delete" {
                None
            } else {
                match lines.next() {
                    Some(line) => Some(parse_line(line)?),
                    None => return Err(TimError::api(400, "Bulk request missing source line")),
                }
            };
            items.push(apply_action(&mut state, &operation, &target, &id, source));
        }
        Ok(items)
    }

    async fn refresh(&self, index: &str) -> Result<(), TimError> {
        self.check_failure("refresh")?;
        let mut state = self.state();
        if !state.indexes.contains_key(index) {
            return Err(TimError::index_not_found(index));
        }
        state.refreshed.push(index.to_string());
        Ok(())
    }
}
