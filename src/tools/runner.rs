//! Running tools through the authenticated client.

use reqwest::Method;

use crate::auth::{ApiRequest, AuthenticatedClient};

use super::error::ToolError;
use super::form::ToolForm;
use super::history::GeneratorHistory;
use super::result::ToolResult;
use super::schema::ToolSchema;

pub struct ToolRunner<'a> {
    client: &'a AuthenticatedClient,
}

impl<'a> ToolRunner<'a> {
    pub fn new(client: &'a AuthenticatedClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<ToolSchema>, ToolError> {
        Ok(self.client.get("/tools").await?)
    }

    pub async fn schema(&self, slug: &str) -> Result<ToolSchema, ToolError> {
        Ok(self.client.get(&format!("/tools/{slug}")).await?)
    }

    /// Validate and submit the full value map. A non-2xx answer carries the
    /// backend message unchanged and is never retried here.
    pub async fn run(&self, form: &ToolForm) -> Result<ToolResult, ToolError> {
        form.validate()?;

        let slug = &form.schema().slug;
        let request = ApiRequest::json(Method::POST, form.schema().run_path(), form.to_payload());
        let data: serde_json::Value = self.client.data(request).await.inspect_err(|e| {
            tracing::warn!(tool = %slug, error = %e, "Tool run failed");
        })?;

        tracing::debug!(tool = %slug, "Tool run completed");
        Ok(ToolResult::from_data(data))
    }
}

/// Form plus results for one tool: repeatable tools keep a history, others
/// keep only the latest result.
#[derive(Debug, Clone)]
pub struct ToolSession {
    pub form: ToolForm,
    latest: Option<ToolResult>,
    history: GeneratorHistory,
}

impl ToolSession {
    pub fn new(schema: ToolSchema) -> Self {
        Self {
            form: ToolForm::from_schema(schema),
            latest: None,
            history: GeneratorHistory::default(),
        }
    }

    pub fn is_repeatable(&self) -> bool {
        self.form.schema().repeatable
    }

    /// Make `result` the latest; repeatable tools also keep it in history.
    pub fn record(&mut self, result: ToolResult) -> &ToolResult {
        if self.is_repeatable() {
            self.history.push(result.clone());
        }
        self.latest.insert(result)
    }

    pub async fn run(&mut self, runner: &ToolRunner<'_>) -> Result<&ToolResult, ToolError> {
        let result = runner.run(&self.form).await?;
        Ok(self.record(result))
    }

    pub fn latest(&self) -> Option<&ToolResult> {
        self.latest.as_ref()
    }

    pub fn history(&self) -> &GeneratorHistory {
        &self.history
    }
}
