// Zapflow
// Copyright (C) 2025 Zapflow contributors

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Node a conversation rests on when no state has been recorded yet.
pub const ENTRY_NODE: &str = "1";

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("flow graph has no nodes")]
    Empty,
    #[error("duplicate node id `{0}`")]
    DuplicateNode(String),
    #[error("node `{node}` references unknown node `{target}`")]
    UnknownTarget { node: String, target: String },
    #[error("edge `{0}` references an unknown node")]
    DanglingEdge(String),
    #[error("message node `{0}` has no content")]
    MissingContent(String),
    #[error("condition on node `{node}` has an invalid pattern `{pattern}`")]
    InvalidPattern { node: String, pattern: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Message,
    Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
}

/// A single branch of a condition node. Text comparators are
/// case-insensitive; `Matches` tests the raw pattern against the raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub op: Comparator,
    pub value: String,
    pub next_node: String,
}

impl Condition {
    pub fn matches(&self, text: &str) -> bool {
        let text_lc = text.to_lowercase();
        let value_lc = self.value.to_lowercase();
        match self.op {
            Comparator::Equals => text_lc == value_lc,
            Comparator::Contains => text_lc.contains(&value_lc),
            Comparator::StartsWith => text_lc.starts_with(&value_lc),
            Comparator::EndsWith => text_lc.ends_with(&value_lc),
            // an unparseable pattern never matches; validate() rejects it up front
            Comparator::Matches => Regex::new(&self.value)
                .map(|re| re.is_match(text))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl FlowGraph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Successor of a message node: the target of the first edge leaving it.
    pub fn successor(&self, id: &str) -> Option<&str> {
        self.edges
            .iter()
            .find(|e| e.source == id)
            .map(|e| e.target.as_str())
    }

    /// Referential integrity the stored graph must uphold: unique node ids,
    /// condition branches and edges pointing at nodes that exist, message
    /// nodes carrying content, patterns that compile.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut ids: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }

        for node in &self.nodes {
            match node.kind {
                NodeKind::Message => {
                    if node.content.as_deref().is_none_or(|c| c.is_empty()) {
                        return Err(GraphError::MissingContent(node.id.clone()));
                    }
                }
                NodeKind::Condition => {
                    for cond in &node.conditions {
                        if !ids.contains(cond.next_node.as_str()) {
                            return Err(GraphError::UnknownTarget {
                                node: node.id.clone(),
                                target: cond.next_node.clone(),
                            });
                        }
                        if cond.op == Comparator::Matches && Regex::new(&cond.value).is_err() {
                            return Err(GraphError::InvalidPattern {
                                node: node.id.clone(),
                                pattern: cond.value.clone(),
                            });
                        }
                    }
                }
            }
        }

        for edge in &self.edges {
            if !ids.contains(edge.source.as_str()) || !ids.contains(edge.target.as_str()) {
                return Err(GraphError::DanglingEdge(edge.id.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition(op: Comparator, value: &str) -> Condition {
        Condition {
            op,
            value: value.to_owned(),
            next_node: "2".to_owned(),
        }
    }

    #[test]
    fn comparators_ignore_case() {
        assert!(condition(Comparator::Equals, "Menu").matches("MENU"));
        assert!(condition(Comparator::Contains, "SUPPORT").matches("i need support now"));
        assert!(condition(Comparator::StartsWith, "hi").matches("Hi there"));
        assert!(condition(Comparator::EndsWith, "BYE").matches("ok bye"));
        assert!(!condition(Comparator::Equals, "menu").matches("menus"));
    }

    #[test]
    fn matches_is_a_regex_test() {
        assert!(condition(Comparator::Matches, r"^\d{4}$").matches("1234"));
        assert!(!condition(Comparator::Matches, r"^\d{4}$").matches("12345"));
    }

    #[test]
    fn invalid_pattern_never_matches() {
        assert!(!condition(Comparator::Matches, "[unclosed").matches("anything"));
    }

    #[test]
    fn successor_follows_the_first_edge() {
        let graph: FlowGraph = serde_json::from_value(json!({
            "nodes": [
                { "id": "1", "type": "message", "content": "hello" },
                { "id": "2", "type": "message", "content": "again" }
            ],
            "edges": [
                { "id": "e1", "source": "1", "target": "2" }
            ]
        }))
        .unwrap();

        assert_eq!(graph.successor("1"), Some("2"));
        assert_eq!(graph.successor("2"), None);
    }

    #[test]
    fn validate_rejects_broken_graphs() {
        let duplicate: FlowGraph = serde_json::from_value(json!({
            "nodes": [
                { "id": "1", "type": "message", "content": "a" },
                { "id": "1", "type": "message", "content": "b" }
            ]
        }))
        .unwrap();
        assert_eq!(
            duplicate.validate(),
            Err(GraphError::DuplicateNode("1".to_owned()))
        );

        let dangling: FlowGraph = serde_json::from_value(json!({
            "nodes": [{ "id": "1", "type": "condition", "conditions": [
                { "op": "equals", "value": "yes", "next_node": "99" }
            ]}]
        }))
        .unwrap();
        assert_eq!(
            dangling.validate(),
            Err(GraphError::UnknownTarget {
                node: "1".to_owned(),
                target: "99".to_owned(),
            })
        );

        let empty_message: FlowGraph = serde_json::from_value(json!({
            "nodes": [{ "id": "1", "type": "message" }]
        }))
        .unwrap();
        assert_eq!(
            empty_message.validate(),
            Err(GraphError::MissingContent("1".to_owned()))
        );

        let bad_pattern: FlowGraph = serde_json::from_value(json!({
            "nodes": [
                { "id": "1", "type": "condition", "conditions": [
                    { "op": "matches", "value": "[unclosed", "next_node": "2" }
                ]},
                { "id": "2", "type": "message", "content": "ok" }
            ]
        }))
        .unwrap();
        assert!(matches!(
            bad_pattern.validate(),
            Err(GraphError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn builder_payload_deserializes() {
        let graph: FlowGraph = serde_json::from_value(json!({
            "nodes": [
                {
                    "id": "1",
                    "type": "condition",
                    "conditions": [
                        { "op": "contains", "value": "price", "next_node": "2" }
                    ],
                    "position": { "x": 120.0, "y": 40.0 }
                },
                { "id": "2", "type": "message", "content": "Our plans start at $10." }
            ],
            "edges": []
        }))
        .unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.node("1").unwrap().kind, NodeKind::Condition);
        assert!(graph.validate().is_ok());
    }
}
