use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Deepest parent chain a forest may have. Deeper documents are rejected at
/// load time.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Program,
    Product,
    Project,
    Topic,
}

impl NodeKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "program" => Some(Self::Program),
            "product" => Some(Self::Product),
            "project" => Some(Self::Project),
            "topic" => Some(Self::Topic),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Program => "program",
            Self::Product => "product",
            Self::Project => "project",
            Self::Topic => "topic",
        }
    }

    /// Child kind that nests inside the parent's own column.
    pub fn continuation(self) -> Option<NodeKind> {
        match self {
            Self::Program => Some(Self::Program),
            Self::Product => Some(Self::Product),
            Self::Project => Some(Self::Topic),
            Self::Topic => None,
        }
    }

    pub fn is_continuation_of(self, parent: NodeKind) -> bool {
        parent.continuation() == Some(self)
    }

    pub fn column(self) -> Column {
        match self {
            Self::Program => Column::Programs,
            Self::Product => Column::Products,
            Self::Project | Self::Topic => Column::ProjectsWithTopics,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Column {
    Programs,
    Products,
    ProjectsWithTopics,
}

impl Column {
    pub const ALL: [Column; 3] = [Self::Programs, Self::Products, Self::ProjectsWithTopics];

    pub fn index(self) -> usize {
        match self {
            Self::Programs => 0,
            Self::Products => 1,
            Self::ProjectsWithTopics => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(id: &str, name: &str, kind: NodeKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = children;
        self
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("invalid tree document: {0}")]
    Parse(String),

    #[error("unknown node type '{kind}' for node '{id}'")]
    UnknownKind { id: String, kind: String },

    #[error("duplicate node id '{0}'")]
    DuplicateId(String),

    #[error("node '{child}' is listed under both '{first}' and '{second}'")]
    MultipleParents {
        child: String,
        first: String,
        second: String,
    },

    #[error("node '{parent}' references unknown child '{child}'")]
    UnknownChild { parent: String, child: String },

    #[error("unknown root node '{0}'")]
    UnknownRoot(String),

    #[error("cycle detected through node '{0}'")]
    Cycle(String),

    #[error("topic '{0}' cannot have children")]
    TopicHasChildren(String),

    #[error("node '{id}' is nested deeper than {limit} levels")]
    TooDeep { id: String, limit: usize },
}

pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub kind: NodeKind,
    pub parent: Option<String>,
    pub child_count: usize,
}

/// Validated, read-only forest. Ids are unique and every node has at most
/// one parent, so traversals always terminate.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    roots: Vec<TreeNode>,
    index: HashMap<String, NodeInfo>,
}

impl Forest {
    pub fn new(roots: Vec<TreeNode>) -> TreeResult<Self> {
        let mut index = HashMap::new();
        let mut stack: Vec<(&TreeNode, Option<&str>, usize)> =
            roots.iter().rev().map(|node| (node, None, 0)).collect();
        while let Some((node, parent, depth)) = stack.pop() {
            if depth >= MAX_DEPTH {
                return Err(TreeError::TooDeep {
                    id: node.id.clone(),
                    limit: MAX_DEPTH,
                });
            }
            if node.kind == NodeKind::Topic && node.has_children() {
                return Err(TreeError::TopicHasChildren(node.id.clone()));
            }
            let info = NodeInfo {
                kind: node.kind,
                parent: parent.map(str::to_string),
                child_count: node.children.len(),
            };
            if index.insert(node.id.clone(), info).is_some() {
                return Err(TreeError::DuplicateId(node.id.clone()));
            }
            for child in node.children.iter().rev() {
                stack.push((child, Some(node.id.as_str()), depth + 1));
            }
        }
        Ok(Self { roots, index })
    }

    pub fn roots(&self) -> &[TreeNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn info(&self, id: &str) -> Option<&NodeInfo> {
        self.index.get(id)
    }

    pub fn kind_of(&self, id: &str) -> Option<NodeKind> {
        self.index.get(id).map(|info| info.kind)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.index.get(id).and_then(|info| info.parent.as_deref())
    }

    pub fn is_expandable(&self, id: &str) -> bool {
        self.index
            .get(id)
            .map(|info| info.child_count > 0)
            .unwrap_or(false)
    }

    /// Every node with at least one child, at any depth.
    pub fn expandable_ids(&self) -> BTreeSet<String> {
        self.index
            .iter()
            .filter(|(_, info)| info.child_count > 0)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        if !self.contains(id) {
            return None;
        }
        let mut stack: Vec<&TreeNode> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }
}

#[derive(Debug, Deserialize)]
struct NestedNodeDoc {
    id: String,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    children: Vec<NestedNodeDoc>,
}

#[derive(Debug, Deserialize)]
struct KeyedNodeDoc {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    children: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct KeyedDoc {
    nodes: BTreeMap<String, KeyedNodeDoc>,
    roots: Option<Vec<String>>,
}

/// Parses a nested (`[{id, type, children: [...]}]`) or keyed
/// (`{nodes: {id: {type, children: [ids]}}, roots?}`) tree document.
pub fn parse_tree_document(input: &str) -> TreeResult<Forest> {
    let value: serde_json::Value =
        json5::from_str(input).map_err(|err| TreeError::Parse(err.to_string()))?;
    let keyed = value.get("nodes").is_some();
    let roots = match value {
        serde_json::Value::Array(_) => nested_roots(value)?,
        serde_json::Value::Object(_) if keyed => {
            let doc: KeyedDoc =
                serde_json::from_value(value).map_err(|err| TreeError::Parse(err.to_string()))?;
            keyed_roots(doc)?
        }
        serde_json::Value::Object(mut map) => match map.remove("roots") {
            Some(roots) => nested_roots(roots)?,
            None => {
                return Err(TreeError::Parse(
                    "expected an array of nodes, a `roots` array, or a `nodes` map".to_string(),
                ));
            }
        },
        _ => {
            return Err(TreeError::Parse(
                "top-level value must be an array or an object".to_string(),
            ));
        }
    };
    let forest = Forest::new(roots)?;
    debug!(nodes = forest.len(), roots = forest.roots().len(), "tree document loaded");
    Ok(forest)
}

fn nested_roots(value: serde_json::Value) -> TreeResult<Vec<TreeNode>> {
    let docs: Vec<NestedNodeDoc> =
        serde_json::from_value(value).map_err(|err| TreeError::Parse(err.to_string()))?;
    docs.into_iter().map(nested_to_node).collect()
}

fn nested_to_node(doc: NestedNodeDoc) -> TreeResult<TreeNode> {
    assemble(doc, |doc| {
        let kind = NodeKind::from_token(&doc.kind).ok_or_else(|| TreeError::UnknownKind {
            id: doc.id.clone(),
            kind: doc.kind.clone(),
        })?;
        Ok(PendingNode {
            name: doc.name.unwrap_or_else(|| doc.id.clone()),
            id: doc.id,
            kind,
            built: Vec::with_capacity(doc.children.len()),
            children: doc.children.into_iter(),
        })
    })
}

/// A node whose children are still being built.
struct PendingNode<I> {
    id: String,
    name: String,
    kind: NodeKind,
    children: I,
    built: Vec<TreeNode>,
}

impl<I> PendingNode<I> {
    fn finish(self) -> TreeNode {
        TreeNode {
            id: self.id,
            name: self.name,
            kind: self.kind,
            children: self.built,
        }
    }
}

/// Builds a tree bottom-up with an explicit stack; `open` turns one source
/// node into a pending node that yields its child sources in order.
fn assemble<S, I, F>(root: S, mut open: F) -> TreeResult<TreeNode>
where
    I: Iterator<Item = S>,
    F: FnMut(S) -> TreeResult<PendingNode<I>>,
{
    let mut stack = vec![open(root)?];
    while let Some(top) = stack.last_mut() {
        if let Some(child) = top.children.next() {
            let child = open(child)?;
            stack.push(child);
            continue;
        }
        let Some(done) = stack.pop() else {
            break;
        };
        let node = done.finish();
        match stack.last_mut() {
            Some(parent) => parent.built.push(node),
            None => return Ok(node),
        }
    }
    Err(TreeError::Parse("empty node".to_string()))
}

fn keyed_roots(doc: KeyedDoc) -> TreeResult<Vec<TreeNode>> {
    let mut parents: HashMap<&str, &str> = HashMap::new();
    for (id, node) in &doc.nodes {
        for child in &node.children {
            if !doc.nodes.contains_key(child) {
                return Err(TreeError::UnknownChild {
                    parent: id.clone(),
                    child: child.clone(),
                });
            }
            if let Some(first) = parents.insert(child.as_str(), id.as_str()) {
                return Err(TreeError::MultipleParents {
                    child: child.clone(),
                    first: first.to_string(),
                    second: id.clone(),
                });
            }
        }
    }

    // With single parents, a node on a cycle reaches itself by following
    // parent links; the number of links followed is the node's depth.
    for id in doc.nodes.keys() {
        let mut cursor = parents.get(id.as_str()).copied();
        let mut steps = 0usize;
        while let Some(current) = cursor {
            if current == id.as_str() || steps > doc.nodes.len() {
                return Err(TreeError::Cycle(id.clone()));
            }
            steps += 1;
            if steps >= MAX_DEPTH {
                return Err(TreeError::TooDeep {
                    id: id.clone(),
                    limit: MAX_DEPTH,
                });
            }
            cursor = parents.get(current).copied();
        }
    }

    let root_ids: Vec<String> = match &doc.roots {
        Some(roots) => {
            for root in roots {
                if !doc.nodes.contains_key(root) {
                    return Err(TreeError::UnknownRoot(root.clone()));
                }
            }
            roots.clone()
        }
        None => doc
            .nodes
            .keys()
            .filter(|id| !parents.contains_key(id.as_str()))
            .cloned()
            .collect(),
    };

    let nodes = &doc.nodes;
    let mut used: HashSet<String> = HashSet::new();
    let mut roots = Vec::with_capacity(root_ids.len());
    for root in &root_ids {
        let Some((root, _)) = nodes.get_key_value(root.as_str()) else {
            return Err(TreeError::UnknownRoot(root.clone()));
        };
        roots.push(assemble(root, |id| open_keyed(id, nodes, &mut used))?);
    }
    let skipped = doc.nodes.len().saturating_sub(used.len());
    if skipped > 0 {
        debug!(skipped, "nodes not reachable from the listed roots were dropped");
    }
    Ok(roots)
}

fn open_keyed<'a>(
    id: &'a String,
    nodes: &'a BTreeMap<String, KeyedNodeDoc>,
    used: &mut HashSet<String>,
) -> TreeResult<PendingNode<std::slice::Iter<'a, String>>> {
    let Some(doc) = nodes.get(id) else {
        return Err(TreeError::UnknownRoot(id.clone()));
    };
    if !used.insert(id.clone()) {
        return Err(TreeError::DuplicateId(id.clone()));
    }
    let kind = NodeKind::from_token(&doc.kind).ok_or_else(|| TreeError::UnknownKind {
        id: id.clone(),
        kind: doc.kind.clone(),
    })?;
    Ok(PendingNode {
        id: id.clone(),
        name: doc.name.clone().unwrap_or_else(|| id.clone()),
        kind,
        children: doc.children.iter(),
        built: Vec::with_capacity(doc.children.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_follows_column_nesting() {
        assert_eq!(NodeKind::Program.continuation(), Some(NodeKind::Program));
        assert_eq!(NodeKind::Product.continuation(), Some(NodeKind::Product));
        assert_eq!(NodeKind::Project.continuation(), Some(NodeKind::Topic));
        assert_eq!(NodeKind::Topic.continuation(), None);
        assert!(NodeKind::Topic.is_continuation_of(NodeKind::Project));
        assert!(!NodeKind::Product.is_continuation_of(NodeKind::Program));
    }

    #[test]
    fn parses_nested_document() {
        let input = r#"[
            { id: "p1", name: "Alpha", type: "Program", children: [
                { id: "x", type: "product" },
            ]},
        ]"#;
        let forest = parse_tree_document(input).unwrap();
        assert_eq!(forest.len(), 2);
        assert_eq!(forest.kind_of("x"), Some(NodeKind::Product));
        assert_eq!(forest.parent_of("x"), Some("p1"));
        assert_eq!(forest.find("x").unwrap().name, "x");
        assert!(forest.is_expandable("p1"));
        assert!(!forest.is_expandable("x"));
    }

    #[test]
    fn parses_keyed_document_with_inferred_roots() {
        let input = r#"{
            "nodes": {
                "b": { "name": "Beta", "type": "program", "children": ["c"] },
                "a": { "name": "Alpha", "type": "program" },
                "c": { "name": "Gamma", "type": "product" }
            }
        }"#;
        let forest = parse_tree_document(input).unwrap();
        let ids: Vec<&str> = forest.roots().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(forest.roots()[1].children[0].name, "Gamma");
    }

    #[test]
    fn rejects_keyed_cycle() {
        let input = r#"{
            "nodes": {
                "a": { "type": "program", "children": ["b"] },
                "b": { "type": "program", "children": ["a"] }
            }
        }"#;
        assert!(matches!(parse_tree_document(input), Err(TreeError::Cycle(_))));
    }

    #[test]
    fn rejects_child_under_two_parents() {
        let input = r#"{
            "nodes": {
                "a": { "type": "program", "children": ["c"] },
                "b": { "type": "program", "children": ["c"] },
                "c": { "type": "product" }
            }
        }"#;
        assert!(matches!(
            parse_tree_document(input),
            Err(TreeError::MultipleParents { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_ids_and_topic_children() {
        let dup = vec![
            TreeNode::new("a", "A", NodeKind::Program),
            TreeNode::new("a", "A again", NodeKind::Program),
        ];
        assert!(matches!(Forest::new(dup), Err(TreeError::DuplicateId(_))));

        let topic = vec![TreeNode::new("t", "T", NodeKind::Topic)
            .with_children(vec![TreeNode::new("u", "U", NodeKind::Topic)])];
        assert!(matches!(
            Forest::new(topic),
            Err(TreeError::TopicHasChildren(_))
        ));
    }

    #[test]
    fn rejects_unknown_kind_and_dangling_child() {
        let kind = r#"[{ "id": "a", "type": "portfolio" }]"#;
        assert!(matches!(
            parse_tree_document(kind),
            Err(TreeError::UnknownKind { .. })
        ));
        let dangling = r#"{ "nodes": { "a": { "type": "program", "children": ["zz"] } } }"#;
        assert!(matches!(
            parse_tree_document(dangling),
            Err(TreeError::UnknownChild { .. })
        ));
    }

    #[test]
    fn expandable_ids_cover_every_depth() {
        let forest = Forest::new(vec![TreeNode::new("a", "A", NodeKind::Program).with_children(
            vec![TreeNode::new("b", "B", NodeKind::Program).with_children(vec![
                TreeNode::new("c", "C", NodeKind::Product).with_children(vec![TreeNode::new(
                    "d",
                    "D",
                    NodeKind::Project,
                )]),
            ])],
        )])
        .unwrap();
        let ids: Vec<String> = forest.expandable_ids().into_iter().collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    fn program_chain(depth: usize) -> TreeNode {
        let mut node = TreeNode::new(&format!("p{}", depth - 1), "leaf", NodeKind::Program);
        for idx in (0..depth - 1).rev() {
            node = TreeNode::new(&format!("p{idx}"), "link", NodeKind::Program)
                .with_children(vec![node]);
        }
        node
    }

    #[test]
    fn rejects_chains_deeper_than_the_limit() {
        assert!(Forest::new(vec![program_chain(MAX_DEPTH)]).is_ok());
        match Forest::new(vec![program_chain(MAX_DEPTH + 1)]) {
            Err(TreeError::TooDeep { id, limit }) => {
                assert_eq!(id, format!("p{MAX_DEPTH}"));
                assert_eq!(limit, MAX_DEPTH);
            }
            other => panic!("expected TooDeep, got {other:?}"),
        }
    }

    #[test]
    fn keyed_chain_depth_is_checked_before_building() {
        let keyed = |depth: usize| {
            let nodes: Vec<String> = (0..depth)
                .map(|idx| {
                    let children = if idx + 1 < depth {
                        format!(r#"["n{}"]"#, idx + 1)
                    } else {
                        "[]".to_string()
                    };
                    format!(r#""n{idx}": {{ "type": "product", "children": {children} }}"#)
                })
                .collect();
            format!(r#"{{ "nodes": {{ {} }} }}"#, nodes.join(", "))
        };
        let forest = parse_tree_document(&keyed(MAX_DEPTH)).unwrap();
        assert_eq!(forest.len(), MAX_DEPTH);
        assert_eq!(forest.roots()[0].id, "n0");
        let last = format!("n{}", MAX_DEPTH - 1);
        assert_eq!(forest.parent_of(&last), Some(format!("n{}", MAX_DEPTH - 2).as_str()));
        assert!(matches!(
            parse_tree_document(&keyed(MAX_DEPTH + 1)),
            Err(TreeError::TooDeep { .. })
        ));
    }

    #[test]
    fn nested_children_keep_document_order() {
        let input = r#"[{ id: "a", type: "program", children: [
            { id: "b", type: "program", children: [{ id: "c", type: "product" }] },
            { id: "d", type: "product" },
        ]}, { id: "e", type: "program" }]"#;
        let forest = parse_tree_document(input).unwrap();
        let a = forest.find("a").unwrap();
        let ids: Vec<&str> = a.children.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d"]);
        assert_eq!(a.children[0].children[0].id, "c");
        assert_eq!(forest.roots()[1].id, "e");
        assert_eq!(forest.parent_of("c"), Some("b"));
    }
}
