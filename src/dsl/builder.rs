use crate::dsl::{Definition, Node, Edge, NodeKind};

pub struct DefinitionBuilder {
    id: String,
    name: String,
    pub nodes: Vec<Node>, // public so tests can reorder or tamper with nodes
    edges: Vec<Edge>,
}

impl DefinitionBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn start(mut self, id: &str) -> Self {
        self.nodes.push(Node {
            id: id.to_string(),
            name: String::new(),
            kind: NodeKind::Start,
        });
        self
    }

    pub fn end(mut self, id: &str) -> Self {
        self.nodes.push(Node {
            id: id.to_string(),
            name: String::new(),
            kind: NodeKind::End,
        });
        self
    }

    pub fn user_task<I, S>(mut self, id: &str, name: &str, candidate_groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes.push(Node {
            id: id.to_string(),
            name: name.to_string(),
            kind: NodeKind::UserTask {
                candidate_groups: candidate_groups.into_iter().map(Into::into).collect(),
            },
        });
        self
    }

    pub fn gateway(mut self, id: &str) -> Self {
        self.nodes.push(Node {
            id: id.to_string(),
            name: String::new(),
            kind: NodeKind::ExclusiveGateway,
        });
        self
    }

    pub fn connect(self, source: &str, target: &str) -> Self {
        self.push_edge(source, target, None, None)
    }

    pub fn connect_labeled(self, source: &str, target: &str, label: &str) -> Self {
        self.push_edge(source, target, Some(label), None)
    }

    /// 条件连线。An empty guard string is treated as no guard at all.
    pub fn connect_if(self, source: &str, target: &str, label: &str, guard: &str) -> Self {
        self.push_edge(source, target, Some(label), Some(guard))
    }

    fn push_edge(mut self, source: &str, target: &str, label: Option<&str>, guard: Option<&str>) -> Self {
        self.edges.push(Edge {
            source: source.to_string(),
            target: target.to_string(),
            label: label.filter(|l| !l.is_empty()).map(str::to_string),
            guard: guard.filter(|g| !g.trim().is_empty()).map(str::to_string),
        });
        self
    }

    pub fn build(self) -> Definition {
        Definition {
            id: self.id,
            name: self.name,
            version: 0,
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}
