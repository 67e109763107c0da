use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Identifier of a node within a strategy graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canvas coordinates; carried for round-tripping, ignored by evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    #[serde(deserialize_with = "lenient::number")]
    pub x: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub y: f64,
}

/// Outgoing edge. `label` optionally names the branch a condition takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub target_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Connection {
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target_id: NodeId::new(target),
            label: None,
        }
    }

    pub fn branch_to(target: impl Into<String>, outcome: bool) -> Self {
        Self {
            target_id: NodeId::new(target),
            label: Some(outcome.to_string()),
        }
    }

    /// Branch outcome named by the label, if it names one.
    pub fn branch(&self) -> Option<bool> {
        match self.label.as_deref()?.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        }
    }
}

/// Account attribute a condition node reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionField {
    DelinquencyBand,
    CurrentBalance,
    DaysPastDue,
    DebtCategory,
    Other(String),
}

impl From<String> for ConditionField {
    fn from(value: String) -> Self {
        match value.trim() {
            "delinquency_band" | "band" => Self::DelinquencyBand,
            "current_balance" | "balance" => Self::CurrentBalance,
            "days_past_due" | "days_in_arrears" => Self::DaysPastDue,
            "debt_category" => Self::DebtCategory,
            _ => Self::Other(value),
        }
    }
}

impl From<ConditionField> for String {
    fn from(value: ConditionField) -> Self {
        match value {
            ConditionField::DelinquencyBand => "delinquency_band".to_string(),
            ConditionField::CurrentBalance => "current_balance".to_string(),
            ConditionField::DaysPastDue => "days_past_due".to_string(),
            ConditionField::DebtCategory => "debt_category".to_string(),
            ConditionField::Other(raw) => raw,
        }
    }
}

/// Comparison applied by a condition node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    Between,
    InList,
    IsEmpty,
    IsNotEmpty,
    Other(String),
}

impl From<String> for ConditionOperator {
    fn from(value: String) -> Self {
        match value.trim() {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "contains" => Self::Contains,
            "between" => Self::Between,
            "in_list" => Self::InList,
            "is_empty" => Self::IsEmpty,
            "is_not_empty" => Self::IsNotEmpty,
            _ => Self::Other(value),
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(value: ConditionOperator) -> Self {
        let label = match value {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "not_equals",
            ConditionOperator::GreaterThan => "greater_than",
            ConditionOperator::LessThan => "less_than",
            ConditionOperator::Contains => "contains",
            ConditionOperator::Between => "between",
            ConditionOperator::InList => "in_list",
            ConditionOperator::IsEmpty => "is_empty",
            ConditionOperator::IsNotEmpty => "is_not_empty",
            ConditionOperator::Other(raw) => return raw,
        };
        label.to_string()
    }
}

/// Literal a condition compares against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Number(f64),
    Text(String),
    List(Vec<ConditionValue>),
    /// Cleared input, persisted as `null`.
    Empty,
}

impl Default for ConditionValue {
    fn default() -> Self {
        ConditionValue::Text(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionData {
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(deserialize_with = "lenient::text")]
    pub field: ConditionField,
    #[serde(deserialize_with = "lenient::text")]
    pub operator: ConditionOperator,
    pub value: ConditionValue,
}

impl Default for ConditionData {
    fn default() -> Self {
        Self {
            title: String::new(),
            field: ConditionField::Other(String::new()),
            operator: ConditionOperator::Other(String::new()),
            value: ConditionValue::default(),
        }
    }
}

/// Qualitative urgency of an action node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionPriority {
    Low,
    Medium,
    High,
    #[default]
    Unspecified,
}

impl ActionPriority {
    /// Graph-path priority; higher is more urgent.
    pub fn score(&self) -> i32 {
        match self {
            ActionPriority::High => 8,
            ActionPriority::Medium => 5,
            ActionPriority::Low | ActionPriority::Unspecified => 2,
        }
    }
}

impl From<String> for ActionPriority {
    fn from(value: String) -> Self {
        match value.trim() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Unspecified,
        }
    }
}

impl From<ActionPriority> for String {
    fn from(value: ActionPriority) -> Self {
        match value {
            ActionPriority::Low => "low",
            ActionPriority::Medium => "medium",
            ActionPriority::High => "high",
            ActionPriority::Unspecified => "",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActionScheduling {
    #[serde(deserialize_with = "lenient::number")]
    pub delay: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub unit: String,
    #[serde(deserialize_with = "lenient::flag")]
    pub business_hours_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActionData {
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(deserialize_with = "lenient::text")]
    pub action_type: String,
    #[serde(deserialize_with = "lenient::text")]
    pub priority: ActionPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<ActionScheduling>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimerData {
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    /// NaN when the authored value is blank or not a number.
    #[serde(deserialize_with = "lenient::number")]
    pub duration: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub unit: String,
    #[serde(deserialize_with = "lenient::flag")]
    pub business_hours_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EscalationData {
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(deserialize_with = "lenient::text")]
    pub escalation_type: String,
    #[serde(deserialize_with = "lenient::number")]
    pub threshold: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndData {
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(deserialize_with = "lenient::text")]
    pub outcome: String,
    #[serde(deserialize_with = "lenient::text")]
    pub reason: String,
}

/// Field readers for payloads written by form-based authoring tools, where
/// cleared inputs persist as `null` and numbers may arrive as text.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
            Value::String(raw) => raw.trim().parse().unwrap_or(f64::NAN),
            _ => f64::NAN,
        })
    }

    pub(super) fn text<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: From<String>,
    {
        let raw = match Value::deserialize(deserializer)? {
            Value::Null => String::new(),
            Value::String(raw) => raw,
            other => other.to_string(),
        };
        Ok(T::from(raw))
    }

    pub(super) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
    }
}

/// Node kinds a strategy author can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Condition,
    Action,
    Timer,
    Escalation,
    End,
}

impl NodeType {
    pub fn label(&self) -> &'static str {
        match self {
            NodeType::Condition => "condition",
            NodeType::Action => "action",
            NodeType::Timer => "timer",
            NodeType::Escalation => "escalation",
            NodeType::End => "end",
        }
    }
}

/// Typed payload of a node.
///
/// `Unknown` keeps nodes whose `type` this build does not recognise so that
/// documents from newer authoring tools still load and round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Condition(ConditionData),
    Action(ActionData),
    Timer(TimerData),
    Escalation(EscalationData),
    End(EndData),
    Unknown { node_type: String, data: Value },
}

impl NodeKind {
    /// Payload a freshly placed node starts with.
    pub fn default_for(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Condition => NodeKind::Condition(ConditionData {
                title: "New Condition".to_string(),
                field: ConditionField::DelinquencyBand,
                operator: ConditionOperator::Equals,
                value: ConditionValue::default(),
            }),
            NodeType::Action => NodeKind::Action(ActionData {
                title: "New Action".to_string(),
                action_type: "phone".to_string(),
                priority: ActionPriority::Medium,
                template: Some(String::new()),
                scheduling: None,
            }),
            NodeType::Timer => NodeKind::Timer(TimerData {
                title: "Wait Timer".to_string(),
                duration: 1.0,
                unit: "days".to_string(),
                business_hours_only: false,
            }),
            NodeType::Escalation => NodeKind::Escalation(EscalationData {
                title: "Escalate".to_string(),
                escalation_type: "manager".to_string(),
                threshold: 3.0,
                reason: String::new(),
            }),
            NodeType::End => NodeKind::End(EndData {
                title: "End Process".to_string(),
                outcome: "closed".to_string(),
                reason: String::new(),
            }),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Condition(_) => NodeType::Condition.label(),
            NodeKind::Action(_) => NodeType::Action.label(),
            NodeKind::Timer(_) => NodeType::Timer.label(),
            NodeKind::Escalation(_) => NodeType::Escalation.label(),
            NodeKind::End(_) => NodeType::End.label(),
            NodeKind::Unknown { node_type, .. } => node_type,
        }
    }
}

/// A node together with its outgoing connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct StrategyNode {
    pub id: NodeId,
    pub position: Option<Position>,
    pub kind: NodeKind,
    pub connections: Vec<Connection>,
}

impl StrategyNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(id),
            position: None,
            kind,
            connections: Vec::new(),
        }
    }

    pub fn with_connections(mut self, connections: Vec<Connection>) -> Self {
        self.connections = connections;
        self
    }
}

/// Persisted node shape: `{id, type, position?, data, connections}`.
#[derive(Serialize, Deserialize)]
struct RawNode {
    id: NodeId,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<Position>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    connections: Vec<Connection>,
}

fn payload<T>(id: &NodeId, data: Value) -> Result<T, serde_json::Error>
where
    T: serde::de::DeserializeOwned + Default,
{
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data)
        .map_err(|err| <serde_json::Error as serde::de::Error>::custom(format!("node {id}: {err}")))
}

impl TryFrom<RawNode> for StrategyNode {
    type Error = serde_json::Error;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let kind = match raw.node_type.as_str() {
            "condition" => NodeKind::Condition(payload(&raw.id, raw.data)?),
            "action" => NodeKind::Action(payload(&raw.id, raw.data)?),
            "timer" => NodeKind::Timer(payload(&raw.id, raw.data)?),
            "escalation" => NodeKind::Escalation(payload(&raw.id, raw.data)?),
            "end" => NodeKind::End(payload(&raw.id, raw.data)?),
            _ => NodeKind::Unknown {
                node_type: raw.node_type,
                data: raw.data,
            },
        };

        Ok(Self {
            id: raw.id,
            position: raw.position,
            kind,
            connections: raw.connections,
        })
    }
}

impl From<StrategyNode> for RawNode {
    fn from(node: StrategyNode) -> Self {
        let node_type = node.kind.type_name().to_string();
        let data = match node.kind {
            NodeKind::Condition(data) => serde_json::to_value(data),
            NodeKind::Action(data) => serde_json::to_value(data),
            NodeKind::Timer(data) => serde_json::to_value(data),
            NodeKind::Escalation(data) => serde_json::to_value(data),
            NodeKind::End(data) => serde_json::to_value(data),
            NodeKind::Unknown { data, .. } => Ok(data),
        }
        .unwrap_or(Value::Null);

        Self {
            id: node.id,
            node_type,
            position: node.position,
            data,
            connections: node.connections,
        }
    }
}

impl TryFrom<Value> for StrategyGraph {
    type Error = serde_json::Error;

    /// Accepts `{"nodes": [..]}`, `{"blocks": [..]}` or a bare node array,
    /// keeping the node-level error when a node fails to parse.
    fn try_from(document: Value) -> Result<Self, Self::Error> {
        let nodes = match document {
            Value::Array(nodes) => Value::Array(nodes),
            Value::Object(mut fields) => fields
                .remove("nodes")
                .or_else(|| fields.remove("blocks"))
                .ok_or_else(|| <serde_json::Error as serde::de::Error>::missing_field("nodes"))?,
            _ => {
                return Err(<serde_json::Error as serde::de::Error>::custom(
                    "strategy document must be a node array or an object with a `nodes` list",
                ))
            }
        };
        Ok(Self {
            nodes: serde_json::from_value(nodes)?,
        })
    }
}

/// Error raised while reading a rule set or strategy document.
#[derive(Debug, thiserror::Error)]
pub enum StrategyLoadError {
    #[error("failed to read strategy document: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid strategy document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error raised by graph editing operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphEditError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
}

/// Authoring feedback; none of these stop a graph from being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum GraphIssue {
    DuplicateNodeId { node: NodeId },
    DanglingConnection { from: NodeId, target: NodeId },
    NoEntryNode,
    MultipleEntryNodes { nodes: Vec<NodeId> },
    ConditionBranches { node: NodeId, connections: usize },
    UnknownNodeType { node: NodeId, node_type: String },
    Unreachable { node: NodeId },
    Cycle { node: NodeId },
}

impl GraphIssue {
    pub fn summary(&self) -> String {
        match self {
            GraphIssue::DuplicateNodeId { node } => format!("node id {node} is used more than once"),
            GraphIssue::DanglingConnection { from, target } => {
                format!("{from} connects to missing node {target}")
            }
            GraphIssue::NoEntryNode => "no entry node: every node has an incoming connection".to_string(),
            GraphIssue::MultipleEntryNodes { nodes } => {
                let names: Vec<&str> = nodes.iter().map(|node| node.0.as_str()).collect();
                format!(
                    "multiple entry nodes ({}); evaluation starts at {}",
                    names.join(", "),
                    names.first().copied().unwrap_or_default()
                )
            }
            GraphIssue::ConditionBranches { node, connections } => {
                format!("condition {node} has {connections} connection(s), expected 2")
            }
            GraphIssue::UnknownNodeType { node, node_type } => {
                format!("node {node} has unknown type '{node_type}'")
            }
            GraphIssue::Unreachable { node } => format!("node {node} is unreachable from the entry"),
            GraphIssue::Cycle { node } => format!("cycle detected through node {node}"),
        }
    }
}

/// Operator-authored strategy: nodes with per-node outgoing connections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct StrategyGraph {
    nodes: Vec<StrategyNode>,
}

impl StrategyGraph {
    pub fn new(nodes: Vec<StrategyNode>) -> Self {
        Self { nodes }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, StrategyLoadError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, StrategyLoadError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn nodes(&self) -> &[StrategyNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&StrategyNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    fn targeted_ids(&self) -> HashSet<&NodeId> {
        self.nodes
            .iter()
            .flat_map(|node| node.connections.iter().map(|conn| &conn.target_id))
            .collect()
    }

    /// Nodes that no connection points at, in declaration order.
    pub fn entry_candidates(&self) -> Vec<&StrategyNode> {
        let targeted = self.targeted_ids();
        self.nodes
            .iter()
            .filter(|node| !targeted.contains(&node.id))
            .collect()
    }

    /// Where evaluation starts: the first node with no incoming connection.
    pub fn entry_node(&self) -> Option<&StrategyNode> {
        self.entry_candidates().into_iter().next()
    }

    /// Places a node with default payload and returns its generated id.
    pub fn add_node(&mut self, node_type: NodeType, position: Option<Position>) -> NodeId {
        let mut sequence = self.nodes.len() + 1;
        let id = loop {
            let candidate = NodeId(format!("block_{sequence}"));
            if self.node(&candidate).is_none() {
                break candidate;
            }
            sequence += 1;
        };

        self.nodes.push(StrategyNode {
            id: id.clone(),
            position,
            kind: NodeKind::default_for(node_type),
            connections: Vec::new(),
        });
        id
    }

    pub fn push_node(&mut self, node: StrategyNode) {
        self.nodes.push(node);
    }

    pub fn update_node(&mut self, id: &NodeId, kind: NodeKind) -> Result<(), GraphEditError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|node| &node.id == id)
            .ok_or_else(|| GraphEditError::UnknownNode(id.clone()))?;
        node.kind = kind;
        Ok(())
    }

    /// Removes a node and every connection pointing at it.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<StrategyNode, GraphEditError> {
        let index = self
            .nodes
            .iter()
            .position(|node| &node.id == id)
            .ok_or_else(|| GraphEditError::UnknownNode(id.clone()))?;
        let removed = self.nodes.remove(index);

        for node in &mut self.nodes {
            node.connections.retain(|conn| &conn.target_id != id);
        }
        Ok(removed)
    }

    /// Appends a connection; an existing connection to the same target is
    /// replaced, so it moves to the end of the list.
    pub fn connect(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        label: Option<String>,
    ) -> Result<(), GraphEditError> {
        if self.node(to).is_none() {
            return Err(GraphEditError::UnknownNode(to.clone()));
        }
        let node = self
            .nodes
            .iter_mut()
            .find(|node| &node.id == from)
            .ok_or_else(|| GraphEditError::UnknownNode(from.clone()))?;

        node.connections.retain(|conn| &conn.target_id != to);
        node.connections.push(Connection {
            target_id: to.clone(),
            label,
        });
        Ok(())
    }

    pub fn validate(&self) -> Vec<GraphIssue> {
        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(&node.id) {
                issues.push(GraphIssue::DuplicateNodeId {
                    node: node.id.clone(),
                });
            }
        }

        for node in &self.nodes {
            for conn in &node.connections {
                if !seen.contains(&conn.target_id) {
                    issues.push(GraphIssue::DanglingConnection {
                        from: node.id.clone(),
                        target: conn.target_id.clone(),
                    });
                }
            }

            match &node.kind {
                NodeKind::Condition(_) if node.connections.len() != 2 => {
                    issues.push(GraphIssue::ConditionBranches {
                        node: node.id.clone(),
                        connections: node.connections.len(),
                    });
                }
                NodeKind::Unknown { node_type, .. } => {
                    issues.push(GraphIssue::UnknownNodeType {
                        node: node.id.clone(),
                        node_type: node_type.clone(),
                    });
                }
                _ => {}
            }
        }

        let entries = self.entry_candidates();
        let Some(entry) = entries.first().copied() else {
            if !self.nodes.is_empty() {
                issues.push(GraphIssue::NoEntryNode);
            }
            return issues;
        };
        if entries.len() > 1 {
            issues.push(GraphIssue::MultipleEntryNodes {
                nodes: entries.iter().map(|node| node.id.clone()).collect(),
            });
        }

        let index: HashMap<&NodeId, &StrategyNode> =
            self.nodes.iter().map(|node| (&node.id, node)).collect();
        let mut visited = BTreeSet::new();
        let mut on_path = HashSet::new();
        let mut cycles = Vec::new();
        walk(entry, &index, &mut visited, &mut on_path, &mut cycles);

        for node in cycles {
            issues.push(GraphIssue::Cycle { node });
        }
        for node in &self.nodes {
            if !visited.contains(&node.id) {
                issues.push(GraphIssue::Unreachable {
                    node: node.id.clone(),
                });
            }
        }

        issues
    }
}

fn walk<'a>(
    node: &'a StrategyNode,
    index: &HashMap<&'a NodeId, &'a StrategyNode>,
    visited: &mut BTreeSet<NodeId>,
    on_path: &mut HashSet<&'a NodeId>,
    cycles: &mut Vec<NodeId>,
) {
    visited.insert(node.id.clone());
    on_path.insert(&node.id);

    for conn in &node.connections {
        if on_path.contains(&conn.target_id) {
            cycles.push(conn.target_id.clone());
            continue;
        }
        if visited.contains(&conn.target_id) {
            continue;
        }
        if let Some(next) = index.get(&conn.target_id).copied() {
            walk(next, index, visited, on_path, cycles);
        }
    }

    on_path.remove(&node.id);
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHORED: &str = r#"{
        "nodes": [
            {"id":"block_1","type":"condition","position":{"x":120,"y":40},
             "data":{"title":"Late?","field":"days_past_due","operator":"greater_than","value":"30"},
             "connections":[{"targetId":"block_2"},{"targetId":"block_3"}]},
            {"id":"block_2","type":"action","position":{"x":40,"y":200},
             "data":{"title":"Call","actionType":"phone","priority":"high","template":""},
             "connections":[]},
            {"id":"block_3","type":"end","position":{"x":220,"y":200},
             "data":{"title":"Done","outcome":"closed","reason":""},
             "connections":[]}
        ]
    }"#;

    #[test]
    fn parses_authored_graph_document() {
        let graph: StrategyGraph = serde_json::from_str(AUTHORED).expect("graph parses");

        assert_eq!(graph.nodes().len(), 3);
        let entry = graph.entry_node().expect("entry present");
        assert_eq!(entry.id, NodeId::new("block_1"));
        match &entry.kind {
            NodeKind::Condition(data) => {
                assert_eq!(data.field, ConditionField::DaysPastDue);
                assert_eq!(data.operator, ConditionOperator::GreaterThan);
                assert_eq!(data.value, ConditionValue::Text("30".to_string()));
            }
            other => panic!("expected condition, got {other:?}"),
        }
        assert!(graph.validate().is_empty());
    }

    #[test]
    fn accepts_bare_node_arrays_and_blocks_key() {
        let bare = r#"[{"id":"a","type":"end","data":{"outcome":"legal"}}]"#;
        let graph: StrategyGraph = serde_json::from_str(bare).expect("bare array parses");
        assert_eq!(graph.nodes().len(), 1);

        let blocks = r#"{"blocks":[{"id":"a","type":"timer","data":{"duration":2,"unit":"days"}}]}"#;
        let graph: StrategyGraph = serde_json::from_str(blocks).expect("blocks key parses");
        assert!(matches!(graph.nodes()[0].kind, NodeKind::Timer(_)));
    }

    #[test]
    fn keeps_unknown_node_types() {
        let json = r#"[{"id":"x","type":"webhook","data":{"url":"https://example.test"}}]"#;
        let graph: StrategyGraph = serde_json::from_str(json).expect("parses");

        match &graph.nodes()[0].kind {
            NodeKind::Unknown { node_type, data } => {
                assert_eq!(node_type, "webhook");
                assert_eq!(data["url"], "https://example.test");
            }
            other => panic!("expected unknown node, got {other:?}"),
        }
        assert!(graph
            .validate()
            .contains(&GraphIssue::UnknownNodeType {
                node: NodeId::new("x"),
                node_type: "webhook".to_string(),
            }));
    }

    #[test]
    fn serializes_back_to_persisted_shape() {
        let graph: StrategyGraph = serde_json::from_str(AUTHORED).expect("graph parses");
        let value = serde_json::to_value(&graph).expect("serializes");

        let first = &value["nodes"][0];
        assert_eq!(first["type"], "condition");
        assert_eq!(first["data"]["field"], "days_past_due");
        assert_eq!(first["connections"][1]["targetId"], "block_3");
        assert_eq!(value["nodes"][1]["data"]["actionType"], "phone");

        let reparsed: StrategyGraph = serde_json::from_value(value).expect("reparses");
        assert_eq!(reparsed, graph);
    }

    #[test]
    fn field_and_operator_aliases_resolve() {
        assert_eq!(ConditionField::from("band".to_string()), ConditionField::DelinquencyBand);
        assert_eq!(ConditionField::from("balance".to_string()), ConditionField::CurrentBalance);
        assert_eq!(
            ConditionField::from("days_in_arrears".to_string()),
            ConditionField::DaysPastDue
        );
        assert_eq!(
            ConditionOperator::from("matches".to_string()),
            ConditionOperator::Other("matches".to_string())
        );
    }

    #[test]
    fn editing_generates_ids_and_replaces_duplicate_connections() {
        let mut graph = StrategyGraph::default();
        let condition = graph.add_node(NodeType::Condition, None);
        let action = graph.add_node(NodeType::Action, Some(Position { x: 1.0, y: 2.0 }));
        let end = graph.add_node(NodeType::End, None);
        assert_eq!(condition, NodeId::new("block_1"));
        assert_eq!(end, NodeId::new("block_3"));

        graph.connect(&condition, &action, None).expect("connects");
        graph.connect(&condition, &end, None).expect("connects");
        graph.connect(&condition, &action, None).expect("reconnects");

        let targets: Vec<&NodeId> = graph
            .node(&condition)
            .expect("present")
            .connections
            .iter()
            .map(|conn| &conn.target_id)
            .collect();
        assert_eq!(targets, vec![&end, &action]);

        assert_eq!(
            graph.connect(&condition, &NodeId::new("missing"), None),
            Err(GraphEditError::UnknownNode(NodeId::new("missing")))
        );
    }

    #[test]
    fn removing_a_node_prunes_incoming_connections() {
        let mut graph: StrategyGraph = serde_json::from_str(AUTHORED).expect("graph parses");
        graph
            .remove_node(&NodeId::new("block_2"))
            .expect("node removed");

        let entry = graph.entry_node().expect("entry present");
        assert_eq!(entry.connections.len(), 1);
        assert!(graph.validate().contains(&GraphIssue::ConditionBranches {
            node: NodeId::new("block_1"),
            connections: 1,
        }));
    }

    #[test]
    fn validate_reports_structural_problems() {
        let graph = StrategyGraph::new(vec![
            StrategyNode::new("start", NodeKind::default_for(NodeType::Condition))
                .with_connections(vec![Connection::to("loop"), Connection::to("ghost")]),
            StrategyNode::new("loop", NodeKind::default_for(NodeType::Condition))
                .with_connections(vec![Connection::to("end"), Connection::to("loop")]),
            StrategyNode::new("end", NodeKind::default_for(NodeType::End)),
            StrategyNode::new("orphan", NodeKind::default_for(NodeType::Timer)),
        ]);

        let issues = graph.validate();
        assert!(issues.contains(&GraphIssue::DanglingConnection {
            from: NodeId::new("start"),
            target: NodeId::new("ghost"),
        }));
        assert!(issues.contains(&GraphIssue::Cycle {
            node: NodeId::new("loop"),
        }));
        assert!(issues.contains(&GraphIssue::MultipleEntryNodes {
            nodes: vec![NodeId::new("start"), NodeId::new("orphan")],
        }));
        assert!(issues.contains(&GraphIssue::Unreachable {
            node: NodeId::new("orphan"),
        }));
    }

    #[test]
    fn fully_cyclic_graph_has_no_entry() {
        let graph = StrategyGraph::new(vec![
            StrategyNode::new("a", NodeKind::default_for(NodeType::Timer))
                .with_connections(vec![Connection::to("b")]),
            StrategyNode::new("b", NodeKind::default_for(NodeType::Timer))
                .with_connections(vec![Connection::to("a")]),
        ]);

        assert!(graph.entry_node().is_none());
        assert_eq!(graph.validate(), vec![GraphIssue::NoEntryNode]);
    }

    #[test]
    fn labeled_connections_expose_branch_outcome() {
        assert_eq!(Connection::branch_to("x", true).branch(), Some(true));
        let no = Connection {
            target_id: NodeId::new("y"),
            label: Some("No".to_string()),
        };
        assert_eq!(no.branch(), Some(false));
        assert_eq!(Connection::to("z").branch(), None);
    }

    #[test]
    fn cleared_timer_duration_loads_as_nan() {
        let graph: StrategyGraph = serde_json::from_str(
            r#"[{"id":"t","type":"timer","data":{"title":"Wait","duration":null,"unit":"days"},"connections":[]}]"#,
        )
        .expect("null duration loads");
        match &graph.nodes()[0].kind {
            NodeKind::Timer(data) => {
                assert!(data.duration.is_nan());
                assert_eq!(data.unit, "days");
            }
            other => panic!("unexpected kind: {other:?}"),
        }

        let json = serde_json::to_value(&graph).expect("serializes");
        assert!(json["nodes"][0]["data"]["duration"].is_null());
    }

    #[test]
    fn null_condition_value_loads_as_empty() {
        let graph: StrategyGraph = serde_json::from_str(
            r#"{"nodes":[{"id":"c","type":"condition","data":{"title":null,"field":"band","operator":"equals","value":null}}]}"#,
        )
        .expect("null value loads");
        match &graph.nodes()[0].kind {
            NodeKind::Condition(data) => {
                assert_eq!(data.value, ConditionValue::Empty);
                assert_eq!(data.title, "");
                assert_eq!(data.field, ConditionField::DelinquencyBand);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn loosely_typed_numbers_load() {
        let graph: StrategyGraph = serde_json::from_str(
            r#"[
                {"id":"e","type":"escalation","data":{"escalationType":"legal","threshold":2.5},
                 "position":{"x":"40","y":null}},
                {"id":"t","type":"timer","data":{"duration":"3","unit":"hours","businessHoursOnly":null}},
                {"id":"a","type":"action","data":{"title":"Call","actionType":"phone","priority":null,
                 "scheduling":{"delay":"","unit":"days"}}}
            ]"#,
        )
        .expect("loose numbers load");

        match &graph.nodes()[0].kind {
            NodeKind::Escalation(data) => assert_eq!(data.threshold, 2.5),
            other => panic!("unexpected kind: {other:?}"),
        }
        let position = graph.nodes()[0].position.expect("position kept");
        assert_eq!(position.x, 40.0);
        assert!(position.y.is_nan());
        match &graph.nodes()[1].kind {
            NodeKind::Timer(data) => {
                assert_eq!(data.duration, 3.0);
                assert!(!data.business_hours_only);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        match &graph.nodes()[2].kind {
            NodeKind::Action(data) => {
                assert_eq!(data.priority, ActionPriority::Unspecified);
                let scheduling = data.scheduling.as_ref().expect("scheduling kept");
                assert!(scheduling.delay.is_nan());
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn parse_errors_name_the_failing_node() {
        let err = serde_json::from_str::<StrategyGraph>(
            r#"{"nodes":[{"id":"broken","type":"action","data":{"title":"Call","scheduling":5}}]}"#,
        )
        .map(|_| ())
        .expect_err("scalar scheduling is rejected");
        let message = err.to_string();
        assert!(message.contains("node broken"), "{message}");
        assert!(!message.contains("did not match any variant"), "{message}");

        let err = serde_json::from_str::<StrategyGraph>(r#"{"edges":[]}"#)
            .map(|_| ())
            .expect_err("missing node list is rejected");
        assert!(err.to_string().contains("nodes"));

        let err = serde_json::from_str::<StrategyGraph>("42")
            .map(|_| ())
            .expect_err("scalar is rejected");
        assert!(err.to_string().contains("node array"));
    }
}
