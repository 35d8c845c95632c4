//! Lockfile builder
//!
//! Composes version resolution and overlay merging into the frozen
//! lockfile. Calling `materialize` twice with identical inputs against
//! an unchanged data source yields byte-identical lockfiles; downstream
//! audit tooling depends on that.

use crate::error::{MaterializeError, MaterializeResult, VersionResolutionError};
use crate::source::DataSource;
use crate::validate::validate_execution;
use flowcert_types::{
    LockedRef, LockedRule, OverlayRef, OverlayVersion, Step, WorkflowDefVersion, WorkflowGraph,
    WorkflowLockfile,
};
use std::collections::BTreeMap;

/// The output of a successful materialization: the frozen lockfile,
/// the concrete merged step graph, and non-fatal observations.
#[derive(Clone, Debug)]
pub struct Materialized {
    pub lockfile: WorkflowLockfile,
    pub steps: Vec<Step>,
    pub warnings: Vec<String>,
}

/// Materialize a workflow: resolve versions, merge overlays, assemble
/// the lockfile, validate execution descriptors.
pub async fn materialize(
    workflow_id: &str,
    version: &str,
    overlays: &[OverlayRef],
    source: &dyn DataSource,
) -> MaterializeResult<Materialized> {
    let definition = resolve_definition(workflow_id, version, source).await?;
    let overlay_versions = resolve_overlays(overlays, source).await?;

    let merged = merge_graph(&definition, &overlay_versions)?;

    let rules = resolve_rules(&definition, &merged, source).await?;
    let templates = resolve_templates(&definition, &merged, source).await?;

    let lockfile = WorkflowLockfile {
        workflow_def: LockedRef::new(&definition.id, &definition.version, &definition.checksum),
        overlays: overlay_versions
            .iter()
            .map(|o| LockedRef::new(&o.id, &o.version, &o.checksum))
            .collect(),
        rules,
        templates,
    };

    let mut warnings = Vec::new();
    for step in &merged.steps {
        validate_execution(step)?;
        if step.execution.is_none() && step.verify.is_empty() {
            warnings.push(format!(
                "step '{}' has no execution descriptor and no rule references",
                step.id
            ));
        }
    }

    tracing::info!(
        workflow = workflow_id,
        version,
        overlays = overlay_versions.len(),
        rules = lockfile.rules.len(),
        templates = lockfile.templates.len(),
        "workflow materialized"
    );

    Ok(Materialized {
        lockfile,
        steps: merged.steps,
        warnings,
    })
}

async fn resolve_definition(
    workflow_id: &str,
    version: &str,
    source: &dyn DataSource,
) -> MaterializeResult<WorkflowDefVersion> {
    source
        .workflow_definition(workflow_id, version)
        .await?
        .ok_or_else(|| {
            VersionResolutionError::WorkflowDefinitionNotFound {
                id: workflow_id.to_string(),
                version: version.to_string(),
            }
            .into()
        })
}

async fn resolve_overlays(
    overlays: &[OverlayRef],
    source: &dyn DataSource,
) -> MaterializeResult<Vec<OverlayVersion>> {
    let mut resolved = Vec::with_capacity(overlays.len());
    for reference in overlays {
        let overlay = source.overlay(reference).await?.ok_or_else(|| {
            MaterializeError::from(VersionResolutionError::OverlayNotFound {
                id: reference.id.clone(),
                version: reference.version.clone(),
            })
        })?;
        resolved.push(overlay);
    }
    Ok(resolved)
}

/// Apply overlay patches to the base graph in list order and parse the
/// merged tree back into a typed graph.
fn merge_graph(
    definition: &WorkflowDefVersion,
    overlays: &[OverlayVersion],
) -> MaterializeResult<WorkflowGraph> {
    let base = serde_json::to_value(&definition.graph)
        .map_err(|e| MaterializeError::InvalidMergedGraph(e.to_string()))?;

    let patches: Vec<_> = overlays.iter().map(|o| o.patch.clone()).collect();
    let merged_value = flowcert_overlay::apply(&base, &patches)?;

    serde_json::from_value(merged_value)
        .map_err(|e| MaterializeError::InvalidMergedGraph(e.to_string()))
}

async fn resolve_rules(
    definition: &WorkflowDefVersion,
    merged: &WorkflowGraph,
    source: &dyn DataSource,
) -> MaterializeResult<BTreeMap<String, LockedRule>> {
    let mut rules = BTreeMap::new();
    for rule_id in merged.rule_ids() {
        let selector = definition.rule_bindings.get(&rule_id).ok_or_else(|| {
            MaterializeError::from(VersionResolutionError::UnboundRule {
                rule_id: rule_id.clone(),
                step_id: first_step_referencing_rule(merged, &rule_id),
            })
        })?;
        let rule = source.rule(&rule_id, selector).await?.ok_or_else(|| {
            MaterializeError::from(VersionResolutionError::RuleNotFound {
                rule_id: rule_id.clone(),
                selector: selector.clone(),
            })
        })?;
        rules.insert(
            rule_id,
            LockedRule {
                id: rule.id,
                version: rule.version,
                checksum: rule.checksum,
                sources: rule.sources,
            },
        );
    }
    Ok(rules)
}

async fn resolve_templates(
    definition: &WorkflowDefVersion,
    merged: &WorkflowGraph,
    source: &dyn DataSource,
) -> MaterializeResult<BTreeMap<String, LockedRef>> {
    let mut templates = BTreeMap::new();
    for template_id in merged.template_ids() {
        let selector = definition.template_bindings.get(&template_id).ok_or_else(|| {
            MaterializeError::from(VersionResolutionError::UnboundTemplate {
                template_id: template_id.clone(),
                step_id: first_step_referencing_template(merged, &template_id),
            })
        })?;
        let template = source
            .template(&template_id, selector)
            .await?
            .ok_or_else(|| {
                MaterializeError::from(VersionResolutionError::TemplateNotFound {
                    template_id: template_id.clone(),
                    selector: selector.clone(),
                })
            })?;
        templates.insert(
            template_id,
            LockedRef::new(template.id, template.version, template.checksum),
        );
    }
    Ok(templates)
}

fn first_step_referencing_rule(graph: &WorkflowGraph, rule_id: &str) -> String {
    graph
        .steps
        .iter()
        .find(|s| s.references_rule(rule_id))
        .map(|s| s.id.clone())
        .unwrap_or_default()
}

fn first_step_referencing_template(graph: &WorkflowGraph, template_id: &str) -> String {
    graph
        .steps
        .iter()
        .find(|s| s.templates.iter().any(|t| t == template_id))
        .map(|s| s.id.clone())
        .unwrap_or_default()
}
