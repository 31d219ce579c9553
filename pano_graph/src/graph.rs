use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::direction::Direction;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("reading graph {}: {}", .path, .source)]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("graph configuration is not a JSON object of locations: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("location '{name}' is malformed: {source}")]
    Node {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("location '{0}' has an empty asset reference")]
    EmptyAssetRef(String),
    #[error("location '{0}' is declared more than once")]
    DuplicateLocation(String),
    #[error("graph has no locations")]
    Empty,
}

/// Lookup of a location name that the graph does not contain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("location '{name}' is not part of the graph")]
pub struct GraphLookupError {
    pub name: String,
}

/// On-disk shape of a single location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(alias = "filename", alias = "asset_ref")]
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
}

impl NodeConfig {
    fn neighbors(self) -> BTreeMap<Direction, String> {
        [
            (Direction::Front, self.front),
            (Direction::Behind, self.behind),
            (Direction::Left, self.left),
            (Direction::Right, self.right),
        ]
        .into_iter()
        .filter_map(|(direction, target)| target.map(|name| (direction, name)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentNode {
    name: String,
    asset_ref: String,
    neighbors: BTreeMap<Direction, String>,
}

impl EnvironmentNode {
    pub fn new(
        name: impl Into<String>,
        asset_ref: impl Into<String>,
        neighbors: impl IntoIterator<Item = (Direction, String)>,
    ) -> Self {
        Self {
            name: name.into(),
            asset_ref: asset_ref.into(),
            neighbors: neighbors.into_iter().collect(),
        }
    }

    fn from_config(name: String, config: NodeConfig) -> Self {
        let asset_ref = config.asset.clone();
        Self {
            name,
            asset_ref,
            neighbors: config.neighbors(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn asset_ref(&self) -> &str {
        &self.asset_ref
    }

    pub fn neighbor(&self, direction: Direction) -> Option<&str> {
        self.neighbors.get(&direction).map(String::as_str)
    }

    /// Outgoing edges in direction priority order.
    pub fn neighbors(&self) -> impl ExactSizeIterator<Item = (Direction, &str)> {
        self.neighbors
            .iter()
            .map(|(direction, name)| (*direction, name.as_str()))
    }
}

/// Edge whose target is not declared in the graph. Reported for diagnostics
/// only; navigation is where such edges fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingEdge {
    pub from: String,
    pub direction: Direction,
    pub to: String,
}

/// Read-only map of location name to node, in declaration order.
#[derive(Debug, Clone)]
pub struct EnvironmentGraph {
    nodes: Vec<EnvironmentNode>,
    index: HashMap<String, usize>,
}

impl EnvironmentGraph {
    pub fn from_nodes<N>(nodes: N) -> Result<Self, GraphError>
    where
        N: IntoIterator<Item = EnvironmentNode>,
    {
        let mut ordered = Vec::new();
        let mut index = HashMap::new();
        for node in nodes {
            if node.asset_ref.trim().is_empty() {
                return Err(GraphError::EmptyAssetRef(node.name));
            }
            if index.contains_key(&node.name) {
                return Err(GraphError::DuplicateLocation(node.name));
            }
            index.insert(node.name.clone(), ordered.len());
            ordered.push(node);
        }
        if ordered.is_empty() {
            return Err(GraphError::Empty);
        }
        Ok(Self {
            nodes: ordered,
            index,
        })
    }

    pub fn from_json_str(source: &str) -> Result<Self, GraphError> {
        let locations: Map<String, Value> = serde_json::from_str(source)?;
        let mut nodes = Vec::with_capacity(locations.len());
        for (name, value) in locations {
            let config: NodeConfig = match serde_json::from_value(value) {
                Ok(config) => config,
                Err(source) => return Err(GraphError::Node { name, source }),
            };
            nodes.push(EnvironmentNode::from_config(name, config));
        }
        Self::from_nodes(nodes)
    }

    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let source = fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&source)
    }

    pub fn lookup(&self, name: &str) -> Result<&EnvironmentNode, GraphLookupError> {
        self.index
            .get(name)
            .map(|&idx| &self.nodes[idx])
            .ok_or_else(|| GraphLookupError {
                name: name.to_string(),
            })
    }

    /// Target of the edge leaving `name` in `direction`; `Ok(None)` when the
    /// location has no edge there. The target itself is not checked.
    pub fn neighbor_of(
        &self,
        name: &str,
        direction: Direction,
    ) -> Result<Option<&str>, GraphLookupError> {
        Ok(self.lookup(name)?.neighbor(direction))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The first declared location, used as the default start.
    pub fn first(&self) -> &EnvironmentNode {
        &self.nodes[0]
    }

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &EnvironmentNode> {
        self.nodes.iter()
    }

    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.nodes.iter().map(EnvironmentNode::name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dangling_edges(&self) -> Vec<DanglingEdge> {
        self.nodes
            .iter()
            .flat_map(|node| {
                node.neighbors()
                    .filter(|(_, target)| !self.contains(target))
                    .map(|(direction, target)| DanglingEdge {
                        from: node.name.clone(),
                        direction,
                        to: target.to_string(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_NODES: &str = r#"{
        "A": { "asset": "a.img", "front": "B" },
        "B": { "filename": "b.img", "behind": "A" }
    }"#;

    #[test]
    fn parses_locations_in_declaration_order() {
        let graph = EnvironmentGraph::from_json_str(TWO_NODES).expect("graph parses");
        assert_eq!(graph.names().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(graph.first().name(), "A");
        assert_eq!(graph.lookup("B").expect("B present").asset_ref(), "b.img");
    }

    #[test]
    fn first_key_wins_even_when_not_alphabetical() {
        let graph = EnvironmentGraph::from_json_str(
            r#"{ "Zulu": { "asset": "z.jpg" }, "Alpha": { "asset": "a.jpg" } }"#,
        )
        .expect("graph parses");
        assert_eq!(graph.first().name(), "Zulu");
    }

    #[test]
    fn neighbor_of_distinguishes_missing_edge_from_missing_location() {
        let graph = EnvironmentGraph::from_json_str(TWO_NODES).expect("graph parses");
        assert_eq!(graph.neighbor_of("A", Direction::Front), Ok(Some("B")));
        assert_eq!(graph.neighbor_of("A", Direction::Left), Ok(None));
        assert_eq!(
            graph.neighbor_of("Z", Direction::Front),
            Err(GraphLookupError {
                name: "Z".to_string()
            })
        );
    }

    #[test]
    fn rejects_empty_asset_reference() {
        let err = EnvironmentGraph::from_json_str(r#"{ "A": { "asset": "  " } }"#)
            .expect_err("empty asset rejected");
        assert!(matches!(err, GraphError::EmptyAssetRef(name) if name == "A"));
    }

    #[test]
    fn rejects_empty_graph_and_non_object_nodes() {
        assert!(matches!(
            EnvironmentGraph::from_json_str("{}"),
            Err(GraphError::Empty)
        ));
        assert!(matches!(
            EnvironmentGraph::from_json_str(r#"{ "A": 3 }"#),
            Err(GraphError::Node { name, .. }) if name == "A"
        ));
    }

    #[test]
    fn dangling_edges_are_reported_not_rejected() {
        let graph = EnvironmentGraph::from_json_str(
            r#"{ "A": { "asset": "a.jpg", "left": "Nowhere", "front": "A" } }"#,
        )
        .expect("dangling edges are allowed");
        assert_eq!(
            graph.dangling_edges(),
            vec![DanglingEdge {
                from: "A".to_string(),
                direction: Direction::Left,
                to: "Nowhere".to_string(),
            }]
        );
    }

    #[test]
    fn duplicate_names_are_rejected_when_built_from_nodes() {
        let err = EnvironmentGraph::from_nodes([
            EnvironmentNode::new("A", "a.jpg", []),
            EnvironmentNode::new("A", "b.jpg", []),
        ])
        .expect_err("duplicate rejected");
        assert!(matches!(err, GraphError::DuplicateLocation(name) if name == "A"));
    }
}
