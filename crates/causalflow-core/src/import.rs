//! # Import/Build Adapters
//!
//! Translate external payloads into session mutations:
//!
//! - [`DataImport`]: the dataset summary returned by an upload.
//! - [`LearnedStructure`]: edges returned by remote structure learning.
//! - [`PriorModel`]: node definitions plus edges, for prior-based builds and
//!   for model files read by the CLI.
//!
//! Payloads are checked before anything is applied.

use crate::session::Session;
use crate::{CausalFlowError, Edge, NodeDefinition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Dataset summary: `{columns, meta_info, row_count, column_count}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataImport {
    pub columns: Vec<String>,
    /// Column name -> observed discrete values.
    #[serde(default)]
    pub meta_info: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub row_count: usize,
    #[serde(default)]
    pub column_count: Option<usize>,
}

impl DataImport {
    /// Replace the session's graph with one node per column.
    ///
    /// Empty or repeated column names reject the whole import.
    pub fn apply(&self, session: &mut Session) -> Result<usize, CausalFlowError> {
        let mut seen = BTreeSet::new();
        for column in &self.columns {
            if column.trim().is_empty() {
                return Err(CausalFlowError::EmptyName);
            }
            if !seen.insert(column.as_str()) {
                return Err(CausalFlowError::DuplicateName(column.clone()));
            }
        }
        session.replace_all_from_import(&self.columns, &self.meta_info, self.row_count);
        Ok(self.columns.len())
    }
}

/// Structure learning result: `{edges, edge_count}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LearnedStructure {
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub edge_count: Option<usize>,
}

impl LearnedStructure {
    /// Bulk-replace the session's edges. Returns the number applied.
    pub fn apply(&self, session: &mut Session) -> Result<usize, CausalFlowError> {
        session.replace_edges_from_learned(&self.edges)
    }
}

/// Node definitions and edges: `{node_defs, edges}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriorModel {
    #[serde(alias = "nodes")]
    pub node_defs: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl PriorModel {
    /// Load definitions and edges into the session as manual nodes.
    ///
    /// Every definition and edge is checked against a scratch copy first, so
    /// a bad entry leaves `session` untouched.
    pub fn apply(&self, session: &mut Session) -> Result<(), CausalFlowError> {
        let mut scratch = session.clone();
        for def in &self.node_defs {
            scratch.add_manual_node(&def.name, def.states.clone(), def.prior.clone())?;
        }
        for edge in &self.edges {
            scratch.add_edge(&edge.source, &edge.target)?;
        }
        *session = scratch;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mode;

    fn rain_sprinkler() -> DataImport {
        let mut meta_info = BTreeMap::new();
        meta_info.insert("Rain".to_string(), vec!["Yes".to_string(), "No".to_string()]);
        meta_info.insert(
            "Sprinkler".to_string(),
            vec!["On".to_string(), "Off".to_string()],
        );
        DataImport {
            columns: vec!["Rain".into(), "Sprinkler".into()],
            meta_info,
            row_count: 4,
            column_count: Some(2),
        }
    }

    #[test]
    fn upload_payload_parses() {
        let raw = r#"{
            "columns": ["Rain", "Sprinkler"],
            "meta_info": {"Rain": ["Yes", "No"], "Sprinkler": ["On", "Off"]},
            "row_count": 4,
            "column_count": 2
        }"#;
        let parsed: DataImport = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed, rain_sprinkler());
    }

    #[test]
    fn import_builds_one_node_per_column() {
        let mut session = Session::new();
        let count = rain_sprinkler().apply(&mut session).expect("import");

        assert_eq!(count, 2);
        assert_eq!(session.store().node_count(), 2);
        assert_eq!(session.store().edge_count(), 0);
        assert_eq!(session.mode(), Mode::Building);
        let node = session.store().node("Sprinkler").expect("node");
        assert_eq!(node.states, vec!["On".to_string(), "Off".to_string()]);
    }

    #[test]
    fn repeated_column_rejects_import() {
        let mut session = Session::new();
        let mut import = rain_sprinkler();
        import.columns.push("Rain".into());

        assert_eq!(
            import.apply(&mut session),
            Err(CausalFlowError::DuplicateName("Rain".into()))
        );
        assert_eq!(session.mode(), Mode::Empty);
    }

    #[test]
    fn learned_edges_replace_existing() {
        let mut session = Session::new();
        rain_sprinkler().apply(&mut session).expect("import");
        session.add_edge("Sprinkler", "Rain").expect("edge");
        let layout_before = session.store().layout_generation();

        let learned = LearnedStructure {
            edges: vec![Edge::new("Rain", "Sprinkler")],
            edge_count: Some(1),
        };
        assert_eq!(learned.apply(&mut session), Ok(1));
        assert!(session.store().contains_edge("Rain", "Sprinkler"));
        assert!(!session.store().contains_edge("Sprinkler", "Rain"));
        assert!(session.store().layout_generation() > layout_before);
    }

    #[test]
    fn prior_model_is_all_or_nothing() {
        let raw = r#"{
            "node_defs": [
                {"name": "A", "states": ["T", "F"], "prior": {"T": 0.5, "F": 0.5}},
                {"name": "B", "states": ["T", "F"]}
            ],
            "edges": [{"source": "A", "target": "C"}]
        }"#;
        let model: PriorModel = serde_json::from_str(raw).expect("parse");
        let mut session = Session::new();

        assert_eq!(
            model.apply(&mut session),
            Err(CausalFlowError::UnknownNode("C".into()))
        );
        assert_eq!(session.store().node_count(), 0);
    }

    #[test]
    fn prior_model_loads_as_manual_nodes() {
        let model = PriorModel {
            node_defs: vec![
                NodeDefinition {
                    name: "A".into(),
                    states: vec!["T".into(), "F".into()],
                    prior: Some([("T", 0.7), ("F", 0.3)].into_iter().collect()),
                },
                NodeDefinition {
                    name: "B".into(),
                    states: vec!["T".into(), "F".into()],
                    prior: None,
                },
            ],
            edges: vec![Edge::new("A", "B")],
        };
        let mut session = Session::new();
        model.apply(&mut session).expect("apply");

        assert_eq!(session.store().node_definitions(), model.node_defs);
        assert_eq!(session.store().edge_list(), model.edges);
        assert!(session.store().has_manual_nodes());
    }
}
