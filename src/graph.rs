use crate::error::{AppError, AppResult};
use crate::table::Table;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum number of node ids returned by [`GraphStore::search`]
pub const SEARCH_LIMIT: usize = 100;

/// One node of the graph document
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,

    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    pub size: u32,
}

/// A link between two nodes, by id
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GraphMetadata {
    pub total_nodes: usize,
    pub total_edges: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

/// Node/link collection as served to the front end and persisted on disk
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GraphDocument {
    pub nodes: Vec<GraphNode>,

    #[serde(default)]
    pub links: Vec<GraphLink>,

    pub metadata: GraphMetadata,
}

impl GraphDocument {
    fn new(nodes: Vec<GraphNode>, links: Vec<GraphLink>, generated_at: Option<String>) -> Self {
        let metadata = GraphMetadata {
            total_nodes: nodes.len(),
            total_edges: links.len(),
            generated_at,
        };
        GraphDocument {
            nodes,
            links,
            metadata,
        }
    }
}

/// Build the graph document for a table: one `paper` node per row
///
/// Rows are not related to each other, so the link set is always empty.
pub fn build_graph(table: &Table) -> GraphDocument {
    let nodes = (0..table.row_count())
        .map(|idx| GraphNode {
            id: format!("paper_{}", idx),
            label: format!("Paper {}", idx + 1),
            node_type: "paper".to_string(),
            group: Some("papers".to_string()),
            size: 10,
        })
        .collect();

    GraphDocument::new(nodes, Vec::new(), Some(Local::now().to_rfc3339()))
}

/// Placeholder served while nothing has been uploaded
pub fn sample_graph() -> GraphDocument {
    let welcome = GraphNode {
        id: "welcome".to_string(),
        label: "Upload your Excel file to begin".to_string(),
        node_type: "info".to_string(),
        group: None,
        size: 20,
    };
    GraphDocument::new(vec![welcome], Vec::new(), None)
}

/// Result of a node search
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SearchHits {
    /// Matching node ids, at most [`SEARCH_LIMIT`]
    pub results: Vec<String>,
    /// Total number of matches before the limit
    pub count: usize,
}

/// Node and edge counts of the live document
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<GraphMetadata>,
}

/// Outcome of [`GraphStore::clear`]
#[derive(Clone, Debug, PartialEq)]
pub enum ClearOutcome {
    /// The live document was copied here and removed
    BackedUp(PathBuf),
    /// There was no live document
    NothingToClear,
}

/// The persisted graph document and its backups
#[derive(Clone, Debug)]
pub struct GraphStore {
    path: PathBuf,
    backup_dir: PathBuf,
}

impl GraphStore {
    pub fn new(path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        GraphStore {
            path: path.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `doc` as the live document, replacing any previous one
    pub fn save(&self, doc: &GraphDocument) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        fs::write(&self.path, json)?;

        log::info!(
            "Saved graph with {} nodes to {}",
            doc.metadata.total_nodes,
            self.path.display()
        );
        Ok(())
    }

    /// The live document, if one has been saved
    pub fn load(&self) -> AppResult<Option<GraphDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    /// Back up the live document, then delete it
    ///
    /// Backups are named `backup_<YYYYmmdd_HHMMSS>.json`; a numeric suffix is
    /// added when two clears land in the same second.
    pub fn clear(&self) -> AppResult<ClearOutcome> {
        if !self.path.exists() {
            return Ok(ClearOutcome::NothingToClear);
        }

        fs::create_dir_all(&self.backup_dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut backup = self.backup_dir.join(format!("backup_{}.json", stamp));
        let mut n = 1;
        while backup.exists() {
            backup = self.backup_dir.join(format!("backup_{}_{}.json", stamp, n));
            n += 1;
        }

        fs::copy(&self.path, &backup)?;
        fs::remove_file(&self.path)?;

        log::info!("Cleared graph data, backup at {}", backup.display());
        Ok(ClearOutcome::BackedUp(backup))
    }

    /// Case-insensitive substring search over each node's JSON form
    pub fn search(&self, query: &str) -> AppResult<SearchHits> {
        let doc = match self.load()? {
            Some(doc) => doc,
            None => {
                return Ok(SearchHits {
                    results: Vec::new(),
                    count: 0,
                });
            }
        };
        Ok(search_nodes(&doc, query))
    }

    pub fn stats(&self) -> AppResult<GraphStats> {
        Ok(match self.load()? {
            Some(doc) => GraphStats {
                total_nodes: doc.nodes.len(),
                total_edges: doc.links.len(),
                metadata: Some(doc.metadata),
            },
            None => GraphStats {
                total_nodes: 0,
                total_edges: 0,
                metadata: None,
            },
        })
    }
}

/// Search the nodes of `doc`; an empty query matches nothing
pub fn search_nodes(doc: &GraphDocument, query: &str) -> SearchHits {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return SearchHits {
            results: Vec::new(),
            count: 0,
        };
    }

    let matches: Vec<String> = doc
        .nodes
        .iter()
        .filter(|node| {
            serde_json::to_string(node)
                .map(|s| s.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
        .map(|node| node.id.clone())
        .collect();

    let count = matches.len();
    SearchHits {
        results: matches.into_iter().take(SEARCH_LIMIT).collect(),
        count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Value;
    use tempfile::tempdir;

    fn table(rows: usize) -> Table {
        Table::new(
            vec!["title".into()],
            (0..rows)
                .map(|i| vec![Value::Text(format!("T{}", i))])
                .collect(),
        )
    }

    #[test]
    fn test_one_node_per_row_and_no_edges() {
        for rows in [0, 1, 7, 250] {
            let doc = build_graph(&table(rows));
            assert_eq!(doc.nodes.len(), rows);
            assert_eq!(doc.metadata.total_nodes, rows);
            assert!(doc.links.is_empty());
            assert_eq!(doc.metadata.total_edges, 0);
        }

        let doc = build_graph(&table(2));
        assert_eq!(doc.nodes[1].id, "paper_1");
        assert_eq!(doc.nodes[1].label, "Paper 2");
        assert_eq!(doc.nodes[1].group.as_deref(), Some("papers"));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample_graph()).unwrap();
        assert_eq!(json["nodes"][0]["type"], "info");
        assert!(json["nodes"][0].get("group").is_none());
        assert_eq!(json["links"], serde_json::json!([]));
        assert_eq!(json["metadata"]["total_nodes"], 1);
    }

    #[test]
    fn test_save_load() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("data/graph.json"), dir.path().join("backups"));
        assert!(store.load().unwrap().is_none());

        let doc = build_graph(&table(3));
        store.save(&doc).unwrap();
        assert_eq!(store.load().unwrap(), Some(doc));
    }

    #[test]
    fn test_clear_makes_exactly_one_backup() {
        let dir = tempdir().unwrap();
        let backups = dir.path().join("backups");
        let store = GraphStore::new(dir.path().join("graph.json"), &backups);

        store.save(&build_graph(&table(2))).unwrap();
        let outcome = store.clear().unwrap();

        let backup = match outcome {
            ClearOutcome::BackedUp(path) => path,
            ClearOutcome::NothingToClear => panic!("expected a backup"),
        };
        assert!(backup.exists());
        assert!(!store.path().exists());
        assert_eq!(fs::read_dir(&backups).unwrap().count(), 1);

        // second clear in the same second finds nothing to back up
        assert_eq!(store.clear().unwrap(), ClearOutcome::NothingToClear);
        assert_eq!(fs::read_dir(&backups).unwrap().count(), 1);
    }

    #[test]
    fn test_backups_do_not_collide() {
        let dir = tempdir().unwrap();
        let backups = dir.path().join("backups");
        let store = GraphStore::new(dir.path().join("graph.json"), &backups);

        for _ in 0..3 {
            store.save(&build_graph(&table(1))).unwrap();
            store.clear().unwrap();
        }
        assert_eq!(fs::read_dir(&backups).unwrap().count(), 3);
    }

    #[test]
    fn test_clear_without_graph_is_noop() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("graph.json"), dir.path().join("backups"));
        assert_eq!(store.clear().unwrap(), ClearOutcome::NothingToClear);
        assert!(!dir.path().join("backups").exists());
    }

    #[test]
    fn test_search_caps_results() {
        let doc = build_graph(&table(150));
        let hits = search_nodes(&doc, "PAPER");
        assert_eq!(hits.count, 150);
        assert_eq!(hits.results.len(), SEARCH_LIMIT);

        let hits = search_nodes(&doc, "paper 12");
        // Paper 12, Paper 120..129
        assert_eq!(hits.count, 11);
        assert!(hits.results.contains(&"paper_11".to_string()));

        assert_eq!(search_nodes(&doc, "").count, 0);
    }

    #[test]
    fn test_stats() {
        let dir = tempdir().unwrap();
        let store = GraphStore::new(dir.path().join("graph.json"), dir.path().join("backups"));
        assert_eq!(store.stats().unwrap().total_nodes, 0);

        store.save(&build_graph(&table(4))).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.total_edges, 0);
        assert!(stats.metadata.is_some());
    }
}
