//! The version data source seam
//!
//! Version records are authored and published elsewhere; the engine
//! retrieves them through this trait and treats them as immutable. A
//! selector is an opaque string the data source understands (the
//! in-memory implementation treats it as an exact version). Every
//! method returns `Ok(None)` for a clean not-found so resolution
//! errors can name the missing entity precisely.

use crate::error::DataSourceError;
use async_trait::async_trait;
use flowcert_types::{OverlayRef, OverlayVersion, RuleVersion, TemplateVersion, WorkflowDefVersion};
use std::collections::HashMap;

#[async_trait]
pub trait DataSource: Send + Sync {
    async fn workflow_definition(
        &self,
        id: &str,
        version: &str,
    ) -> Result<Option<WorkflowDefVersion>, DataSourceError>;

    async fn overlay(
        &self,
        reference: &OverlayRef,
    ) -> Result<Option<OverlayVersion>, DataSourceError>;

    async fn rule(
        &self,
        rule_id: &str,
        selector: &str,
    ) -> Result<Option<RuleVersion>, DataSourceError>;

    async fn template(
        &self,
        template_id: &str,
        selector: &str,
    ) -> Result<Option<TemplateVersion>, DataSourceError>;
}

/// In-memory data source. The reference implementation for tests and
/// for callers that load a version catalog up front.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDataSource {
    definitions: HashMap<(String, String), WorkflowDefVersion>,
    overlays: HashMap<(String, String), OverlayVersion>,
    rules: HashMap<(String, String), RuleVersion>,
    templates: HashMap<(String, String), TemplateVersion>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_definition(&mut self, def: WorkflowDefVersion) -> &mut Self {
        tracing::debug!(id = %def.id, version = %def.version, "workflow definition registered");
        self.definitions
            .insert((def.id.clone(), def.version.clone()), def);
        self
    }

    pub fn add_overlay(&mut self, overlay: OverlayVersion) -> &mut Self {
        self.overlays
            .insert((overlay.id.clone(), overlay.version.clone()), overlay);
        self
    }

    pub fn add_rule(&mut self, rule: RuleVersion) -> &mut Self {
        self.rules.insert((rule.id.clone(), rule.version.clone()), rule);
        self
    }

    pub fn add_template(&mut self, template: TemplateVersion) -> &mut Self {
        self.templates
            .insert((template.id.clone(), template.version.clone()), template);
        self
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn workflow_definition(
        &self,
        id: &str,
        version: &str,
    ) -> Result<Option<WorkflowDefVersion>, DataSourceError> {
        Ok(self
            .definitions
            .get(&(id.to_string(), version.to_string()))
            .cloned())
    }

    async fn overlay(
        &self,
        reference: &OverlayRef,
    ) -> Result<Option<OverlayVersion>, DataSourceError> {
        Ok(self
            .overlays
            .get(&(reference.id.clone(), reference.version.clone()))
            .cloned())
    }

    async fn rule(
        &self,
        rule_id: &str,
        selector: &str,
    ) -> Result<Option<RuleVersion>, DataSourceError> {
        Ok(self
            .rules
            .get(&(rule_id.to_string(), selector.to_string()))
            .cloned())
    }

    async fn template(
        &self,
        template_id: &str,
        selector: &str,
    ) -> Result<Option<TemplateVersion>, DataSourceError> {
        Ok(self
            .templates
            .get(&(template_id.to_string(), selector.to_string()))
            .cloned())
    }
}
