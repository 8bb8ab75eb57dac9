//! Conversion of a fitted ensemble into an ONNX `TreeEnsembleClassifier`
//! graph.
//!
//! Graph contract: one float input `float_input` of shape `[N, width]`,
//! outputs `label` (int64 `[N]`) and `probabilities` (float `[N, 2]`).
//! Leaf weights live on class 0's margin slot and `post_transform = LOGISTIC`
//! turns the summed margin into `[1 - p, p]`, which is how binary boosted
//! models are laid out for ONNX runtimes.

use super::gradient_boosting::{GradientBoostedClassifier, TreeNode, sigmoid};
use crate::infrastructure::onnx::proto::{
    AttributeProto, Dimension, GraphProto, ModelProto, NodeProto, OperatorSetIdProto,
    ValueInfoProto, data_type,
};
use anyhow::{Context, Result, anyhow, bail};
use prost::Message;
use std::collections::HashMap;

pub const INPUT_NAME: &str = "float_input";
pub const LABEL_OUTPUT: &str = "label";
pub const PROBABILITY_OUTPUT: &str = "probabilities";

/// Default-domain opset the graph targets.
pub const TARGET_OPSET: i64 = 12;
/// IR version matching opset 12.
pub const IR_VERSION: i64 = 7;
pub const ML_DOMAIN: &str = "ai.onnx.ml";
pub const ML_OPSET: i64 = 1;

const BATCH_DIM: &str = "N";
const NODE_NAME: &str = "TreeEnsembleClassifier";
const MODE_BRANCH_LT: &str = "BRANCH_LT";
const MODE_LEAF: &str = "LEAF";

/// Flat node arrays, one entry per tree node across the whole ensemble.
#[derive(Default)]
struct NodeArrays {
    tree_ids: Vec<i64>,
    node_ids: Vec<i64>,
    feature_ids: Vec<i64>,
    modes: Vec<&'static str>,
    values: Vec<f32>,
    true_ids: Vec<i64>,
    false_ids: Vec<i64>,
    missing_tracks_true: Vec<i64>,
    class_tree_ids: Vec<i64>,
    class_node_ids: Vec<i64>,
    class_ids: Vec<i64>,
    class_weights: Vec<f32>,
}

impl NodeArrays {
    fn collect(model: &GradientBoostedClassifier) -> Self {
        let mut arrays = Self::default();
        for (tree_id, tree) in model.trees().iter().enumerate() {
            let tree_id = tree_id as i64;
            for (node_id, node) in tree.nodes().iter().enumerate() {
                let node_id = node_id as i64;
                arrays.tree_ids.push(tree_id);
                arrays.node_ids.push(node_id);
                arrays.missing_tracks_true.push(0);
                match node {
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        arrays.feature_ids.push(*feature as i64);
                        arrays.modes.push(MODE_BRANCH_LT);
                        arrays.values.push(*threshold);
                        arrays.true_ids.push(*left as i64);
                        arrays.false_ids.push(*right as i64);
                    }
                    TreeNode::Leaf { weight } => {
                        arrays.feature_ids.push(0);
                        arrays.modes.push(MODE_LEAF);
                        arrays.values.push(0.0);
                        arrays.true_ids.push(0);
                        arrays.false_ids.push(0);

                        arrays.class_tree_ids.push(tree_id);
                        arrays.class_node_ids.push(node_id);
                        arrays.class_ids.push(0);
                        arrays.class_weights.push(*weight as f32);
                    }
                }
            }
        }
        arrays
    }

    fn into_attributes(self, base_margin: f64) -> Vec<AttributeProto> {
        vec![
            AttributeProto::floats("base_values", vec![base_margin as f32]),
            AttributeProto::ints("class_ids", self.class_ids),
            AttributeProto::ints("class_nodeids", self.class_node_ids),
            AttributeProto::ints("class_treeids", self.class_tree_ids),
            AttributeProto::floats("class_weights", self.class_weights),
            AttributeProto::ints("classlabels_int64s", vec![0, 1]),
            AttributeProto::ints("nodes_falsenodeids", self.false_ids),
            AttributeProto::ints("nodes_featureids", self.feature_ids),
            AttributeProto::ints(
                "nodes_missing_value_tracks_true",
                self.missing_tracks_true,
            ),
            AttributeProto::strings("nodes_modes", &self.modes),
            AttributeProto::ints("nodes_nodeids", self.node_ids),
            AttributeProto::ints("nodes_treeids", self.tree_ids),
            AttributeProto::ints("nodes_truenodeids", self.true_ids),
            AttributeProto::floats("nodes_values", self.values),
            AttributeProto::string("post_transform", "LOGISTIC"),
        ]
    }
}

/// Builds the ONNX model for a fitted classifier.
pub fn export_classifier(model: &GradientBoostedClassifier) -> ModelProto {
    let width = model.n_features() as i64;
    let node = NodeProto {
        input: vec![INPUT_NAME.to_string()],
        output: vec![LABEL_OUTPUT.to_string(), PROBABILITY_OUTPUT.to_string()],
        name: NODE_NAME.to_string(),
        op_type: NODE_NAME.to_string(),
        attribute: NodeArrays::collect(model).into_attributes(model.base_margin()),
        domain: ML_DOMAIN.to_string(),
    };

    let graph = GraphProto {
        node: vec![node],
        name: "signal_outcome_classifier".to_string(),
        doc_string: format!(
            "{} trees, max depth {}, learning rate {}",
            model.trees().len(),
            model.params().max_depth,
            model.params().learning_rate
        ),
        input: vec![ValueInfoProto::tensor(
            INPUT_NAME,
            data_type::FLOAT,
            vec![Dimension::symbolic(BATCH_DIM), Dimension::fixed(width)],
        )],
        output: vec![
            ValueInfoProto::tensor(
                LABEL_OUTPUT,
                data_type::INT64,
                vec![Dimension::symbolic(BATCH_DIM)],
            ),
            ValueInfoProto::tensor(
                PROBABILITY_OUTPUT,
                data_type::FLOAT,
                vec![Dimension::symbolic(BATCH_DIM), Dimension::fixed(2)],
            ),
        ],
    };

    ModelProto {
        ir_version: IR_VERSION,
        producer_name: env!("CARGO_PKG_NAME").to_string(),
        producer_version: env!("CARGO_PKG_VERSION").to_string(),
        domain: String::new(),
        model_version: 0,
        doc_string: String::new(),
        graph: Some(graph),
        opset_import: vec![
            OperatorSetIdProto {
                domain: String::new(),
                version: TARGET_OPSET,
            },
            OperatorSetIdProto {
                domain: ML_DOMAIN.to_string(),
                version: ML_OPSET,
            },
        ],
    }
}

/// Serialized ONNX bytes for a fitted classifier.
pub fn to_onnx_bytes(model: &GradientBoostedClassifier) -> Vec<u8> {
    export_classifier(model).encode_to_vec()
}

/// Name and dimensions of the graph's first input; symbolic dimensions are
/// reported as `None`.
pub fn declared_input(model: &ModelProto) -> Option<(String, Vec<Option<i64>>)> {
    let input = model.graph.as_ref()?.input.first()?;
    let (_, dims) = input.tensor_shape()?;
    Some((
        input.name.clone(),
        dims.iter().map(|d| d.dim_value).collect(),
    ))
}

/// Scores rows straight from an exported graph's node arrays, following the
/// `TreeEnsembleClassifier` semantics the graph declares.
pub struct ExportedEnsemble {
    base_margin: f32,
    roots: Vec<i64>,
    nodes: HashMap<(i64, i64), ExportedNode>,
    leaf_weights: HashMap<(i64, i64), f32>,
}

enum ExportedNode {
    Branch {
        feature: usize,
        threshold: f32,
        when_true: i64,
        when_false: i64,
    },
    Leaf,
}

impl ExportedEnsemble {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let model = ModelProto::decode(bytes).context("Failed to decode ONNX model")?;
        let node = model
            .graph
            .as_ref()
            .and_then(|g| g.node.iter().find(|n| n.op_type == NODE_NAME))
            .ok_or_else(|| anyhow!("Graph has no {} node", NODE_NAME))?;

        let attr = |name: &str| {
            node.attribute
                .iter()
                .find(|a| a.name == name)
                .ok_or_else(|| anyhow!("Missing attribute {}", name))
        };

        let tree_ids = &attr("nodes_treeids")?.ints;
        let node_ids = &attr("nodes_nodeids")?.ints;
        let feature_ids = &attr("nodes_featureids")?.ints;
        let values = &attr("nodes_values")?.floats;
        let true_ids = &attr("nodes_truenodeids")?.ints;
        let false_ids = &attr("nodes_falsenodeids")?.ints;
        let modes = &attr("nodes_modes")?.strings;

        let n = tree_ids.len();
        if [node_ids.len(), feature_ids.len(), values.len(), true_ids.len(), false_ids.len(), modes.len()]
            .iter()
            .any(|len| *len != n)
        {
            bail!("Node attribute arrays have inconsistent lengths");
        }

        let mut nodes = HashMap::with_capacity(n);
        let mut roots = Vec::new();
        for i in 0..n {
            let key = (tree_ids[i], node_ids[i]);
            if node_ids[i] == 0 {
                roots.push(tree_ids[i]);
            }
            let node = match modes[i].as_slice() {
                b"LEAF" => ExportedNode::Leaf,
                b"BRANCH_LT" => ExportedNode::Branch {
                    feature: feature_ids[i] as usize,
                    threshold: values[i],
                    when_true: true_ids[i],
                    when_false: false_ids[i],
                },
                other => bail!(
                    "Unsupported node mode {}",
                    String::from_utf8_lossy(other)
                ),
            };
            nodes.insert(key, node);
        }

        let class_trees = &attr("class_treeids")?.ints;
        let class_nodes = &attr("class_nodeids")?.ints;
        let class_weights = &attr("class_weights")?.floats;
        let mut leaf_weights = HashMap::with_capacity(class_weights.len());
        for ((tree, node), weight) in class_trees.iter().zip(class_nodes).zip(class_weights) {
            *leaf_weights.entry((*tree, *node)).or_insert(0.0) += *weight;
        }

        let base_margin = attr("base_values")
            .ok()
            .and_then(|a| a.floats.first().copied())
            .unwrap_or(0.0);

        Ok(Self {
            base_margin,
            roots,
            nodes,
            leaf_weights,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.roots.len()
    }

    /// Probability of the positive class for one row.
    pub fn predict_proba(&self, row: &[f32]) -> Result<f64> {
        let mut margin = self.base_margin as f64;
        for &tree in &self.roots {
            let mut node_id = 0;
            loop {
                let node = self
                    .nodes
                    .get(&(tree, node_id))
                    .ok_or_else(|| anyhow!("Tree {} has no node {}", tree, node_id))?;
                match node {
                    ExportedNode::Leaf => {
                        margin += self
                            .leaf_weights
                            .get(&(tree, node_id))
                            .copied()
                            .unwrap_or(0.0) as f64;
                        break;
                    }
                    ExportedNode::Branch {
                        feature,
                        threshold,
                        when_true,
                        when_false,
                    } => {
                        let value = row
                            .get(*feature)
                            .ok_or_else(|| anyhow!("Row has no feature {}", feature))?;
                        node_id = if *value < *threshold {
                            *when_true
                        } else {
                            *when_false
                        };
                    }
                }
            }
        }
        Ok(sigmoid(margin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::gradient_boosting::BoostingParams;

    fn fitted(width: usize) -> (GradientBoostedClassifier, Vec<Vec<f32>>) {
        let x: Vec<Vec<f32>> = (0..30)
            .map(|i| (0..width).map(|f| ((i * (f + 3)) % 11) as f32 / 10.0).collect())
            .collect();
        let y: Vec<u8> = x.iter().map(|r| u8::from(r[0] > 0.45)).collect();
        let params = BoostingParams {
            n_estimators: 10,
            ..Default::default()
        };
        (GradientBoostedClassifier::fit(&x, &y, params).unwrap(), x)
    }

    #[test]
    fn test_declares_batch_by_width_input() {
        let (model, _) = fitted(24);
        let proto = export_classifier(&model);

        let (name, dims) = declared_input(&proto).unwrap();
        assert_eq!(name, INPUT_NAME);
        assert_eq!(dims, vec![None, Some(24)]);

        let opsets: Vec<(&str, i64)> = proto
            .opset_import
            .iter()
            .map(|o| (o.domain.as_str(), o.version))
            .collect();
        assert_eq!(opsets, vec![("", TARGET_OPSET), (ML_DOMAIN, ML_OPSET)]);
    }

    #[test]
    fn test_bytes_decode_to_same_model() {
        let (model, _) = fitted(4);
        let proto = export_classifier(&model);
        let decoded = ModelProto::decode(to_onnx_bytes(&model).as_slice()).unwrap();
        assert_eq!(decoded, proto);
    }

    #[test]
    fn test_exported_graph_scores_like_the_ensemble() {
        let (model, x) = fitted(6);
        let exported = ExportedEnsemble::decode(&to_onnx_bytes(&model)).unwrap();
        assert_eq!(exported.tree_count(), model.trees().len());

        for row in &x {
            let direct = model.predict_proba(row);
            let via_graph = exported.predict_proba(row).unwrap();
            assert!((direct - via_graph).abs() < 1e-4, "{} vs {}", direct, via_graph);
        }
    }

    #[test]
    fn test_every_leaf_has_one_class_weight() {
        let (model, _) = fitted(3);
        let proto = export_classifier(&model);
        let node = &proto.graph.unwrap().node[0];
        let weights = node
            .attribute
            .iter()
            .find(|a| a.name == "class_weights")
            .unwrap();
        let leaves: usize = model.trees().iter().map(|t| t.leaf_count()).sum();
        assert_eq!(weights.floats.len(), leaves);
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        assert!(ExportedEnsemble::decode(&[0xff, 0xff, 0xff]).is_err());
    }
}
