//! The workflow graph: an ordered set of steps with rule and template
//! references
//!
//! A graph is immutable once versioned. Overlays never mutate a graph in
//! place; they produce a new merged graph at materialization time.

use crate::execution::StepExecution;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ── Workflow Graph ───────────────────────────────────────────────────

/// A versioned compliance workflow definition: an ordered set of steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    /// Stable workflow identifier (e.g. `de.gmbh.incorporation`)
    pub id: String,
    /// Semantic version of this graph
    pub version: String,
    /// Steps in authoring order
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl WorkflowGraph {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Look up a step by id.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Every rule id referenced by any step, deduplicated and ordered.
    pub fn rule_ids(&self) -> BTreeSet<String> {
        self.steps
            .iter()
            .flat_map(|s| s.verify.iter().map(|r| r.id.clone()))
            .collect()
    }

    /// Every template id referenced by any step, deduplicated and ordered.
    pub fn template_ids(&self) -> BTreeSet<String> {
        self.steps
            .iter()
            .flat_map(|s| s.templates.iter().cloned())
            .collect()
    }
}

// ── Step ─────────────────────────────────────────────────────────────

/// A single node in the workflow graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Step identifier, unique within the graph
    pub id: String,
    /// Domain-defined step kind (e.g. `name-check`, `tax-submission`)
    #[serde(default)]
    pub kind: String,
    /// Human-readable title
    #[serde(default)]
    pub title: String,
    /// Rules this step must verify
    #[serde(default)]
    pub verify: Vec<RuleRef>,
    /// Document templates this step renders
    #[serde(default)]
    pub templates: Vec<String>,
    /// How the step is executed, if automated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<StepExecution>,
    /// Predecessor step ids
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Step {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: String::new(),
            title: String::new(),
            verify: Vec::new(),
            templates: Vec::new(),
            execution: None,
            depends_on: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.verify.push(RuleRef::new(rule_id));
        self
    }

    pub fn with_template(mut self, template_id: impl Into<String>) -> Self {
        self.templates.push(template_id.into());
        self
    }

    pub fn with_execution(mut self, execution: StepExecution) -> Self {
        self.execution = Some(execution);
        self
    }

    pub fn with_dependency(mut self, step_id: impl Into<String>) -> Self {
        self.depends_on.push(step_id.into());
        self
    }

    /// Check whether this step references a given rule.
    pub fn references_rule(&self, rule_id: &str) -> bool {
        self.verify.iter().any(|r| r.id == rule_id)
    }
}

/// A reference from a step to a rule it must verify.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRef {
    pub id: String,
}

impl RuleRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}
