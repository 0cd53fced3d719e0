//! Built-in search tools over the research datasets.
//!
//! Every tool has the same shape: validate input, clamp `limit` to the
//! caller's tier, query the data service, and return
//! `{query, total, returned, results}`.

use async_trait::async_trait;
use grantscout_core::{AccessTier, Tool, ToolError};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::data::DataService;

/// A search over one dataset.
pub struct SearchTool {
    name: &'static str,
    description: &'static str,
    dataset: &'static str,
    schema: Value,
    required: &'static [&'static str],
    data: Arc<dyn DataService>,
}

impl SearchTool {
    pub fn new(
        name: &'static str,
        description: &'static str,
        dataset: &'static str,
        schema: Value,
        required: &'static [&'static str],
        data: Arc<dyn DataService>,
    ) -> Self {
        Self {
            name,
            description,
            dataset,
            schema,
            required,
            data,
        }
    }

    pub fn dataset(&self) -> &str {
        self.dataset
    }

    fn validate(&self, input: &Value) -> Result<(), ToolError> {
        let Value::Object(map) = input else {
            return Err(ToolError::InvalidArguments(format!(
                "{}: input must be an object",
                self.name
            )));
        };
        for field in self.required {
            let present = map
                .get(*field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty());
            if !present {
                return Err(ToolError::InvalidArguments(format!(
                    "{}: missing '{}'",
                    self.name, field
                )));
            }
        }
        if let Some(limit) = map.get("limit") {
            if !limit.is_u64() {
                return Err(ToolError::InvalidArguments(format!(
                    "{}: 'limit' must be a non-negative integer",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, input: Value, tier: &AccessTier) -> Result<Value, ToolError> {
        self.validate(&input)?;

        let limit = tier.clamp_limit(input.get("limit").and_then(Value::as_u64));
        let mut params = input;
        if let Value::Object(map) = &mut params {
            map.remove("limit");
        }

        let page = self.data.query(self.dataset, &params, limit).await?;
        let total = page.get("total").and_then(Value::as_u64).unwrap_or(0);
        let rows = match page.get("rows") {
            Some(Value::Array(rows)) => rows.clone(),
            _ => Vec::new(),
        };

        Ok(json!({
            "query": params,
            "total": total,
            "returned": rows.len(),
            "limit": limit,
            "results": rows,
        }))
    }
}

fn limit_property() -> Value {
    json!({
        "type": "integer",
        "minimum": 1,
        "description": "Maximum rows to return (capped by the caller's plan)"
    })
}

/// Create the default tool registry over a data service.
pub fn default_registry(data: Arc<dyn DataService>) -> grantscout_core::ToolRegistry {
    let mut registry = grantscout_core::ToolRegistry::new();

    registry.register(Arc::new(SearchTool::new(
        "search_grants",
        "Search funded research projects by keyword, institution, state, activity code or fiscal year. Returns matching projects with totals.",
        "grants",
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Keywords matched against titles, abstracts and investigators" },
                "org_name": { "type": "string", "description": "Institution name" },
                "org_state": { "type": "string", "description": "Two-letter state code" },
                "activity_code": { "type": "string", "description": "Funding mechanism, e.g. R01, U01" },
                "fiscal_year": { "type": "integer" },
                "limit": limit_property()
            },
            "required": ["query"]
        }),
        &["query"],
        Arc::clone(&data),
    )));

    registry.register(Arc::new(SearchTool::new(
        "get_grant_details",
        "Fetch the full record of one funded project by its project number.",
        "grant_details",
        json!({
            "type": "object",
            "properties": {
                "project_number": { "type": "string", "description": "e.g. R01NS112233" }
            },
            "required": ["project_number"]
        }),
        &["project_number"],
        Arc::clone(&data),
    )));

    registry.register(Arc::new(SearchTool::new(
        "search_clinical_trials",
        "Search registered clinical studies by condition or intervention, optionally filtered by recruitment status and phase.",
        "clinical_studies",
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Condition, intervention or keyword" },
                "status": { "type": "string", "description": "e.g. recruiting, completed" },
                "phase": { "type": "string", "description": "e.g. Phase 2" },
                "limit": limit_property()
            },
            "required": ["query"]
        }),
        &["query"],
        Arc::clone(&data),
    )));

    registry.register(Arc::new(SearchTool::new(
        "search_patents",
        "Search patents linked to funded research by keyword or assignee.",
        "patents",
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Keywords matched against patent titles" },
                "patent_org": { "type": "string", "description": "Assignee institution" },
                "limit": limit_property()
            },
            "required": ["query"]
        }),
        &["query"],
        Arc::clone(&data),
    )));

    registry.register(Arc::new(SearchTool::new(
        "search_publications",
        "Search publications linked to funded projects by keyword, journal or year.",
        "publications",
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Keywords matched against titles and abstracts" },
                "journal_title": { "type": "string" },
                "year": { "type": "integer" },
                "limit": limit_property()
            },
            "required": ["query"]
        }),
        &["query"],
        data,
    )));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StaticDataService;

    fn tier(limit: u32) -> AccessTier {
        AccessTier {
            tier: "test".into(),
            results_limit: limit,
            can_export: false,
            can_see_emails: true,
            can_see_abstracts: true,
            quota: None,
        }
    }

    fn registry() -> grantscout_core::ToolRegistry {
        default_registry(Arc::new(StaticDataService::sample()))
    }

    #[test]
    fn default_registry_has_catalog() {
        let registry = registry();
        assert_eq!(
            registry.names(),
            vec![
                "get_grant_details",
                "search_clinical_trials",
                "search_grants",
                "search_patents",
                "search_publications"
            ]
        );
        for schema in registry.schemas() {
            assert_eq!(schema.input_schema["type"], "object");
            assert!(!schema.description.is_empty());
        }
    }

    #[tokio::test]
    async fn search_returns_envelope() {
        let tool = registry().get("search_clinical_trials").unwrap();
        let out = tool.execute(json!({"query": "SOD1"}), &tier(10)).await.unwrap();
        assert_eq!(out["query"]["query"], "SOD1");
        assert_eq!(out["total"], 1);
        assert_eq!(out["returned"], 1);
        assert_eq!(out["results"][0]["nct_id"], "NCT05112233");
    }

    #[tokio::test]
    async fn limit_is_clamped_to_tier() {
        let rows: Vec<Value> = (0..40).map(|i| json!({"title": format!("ALS paper {i}")})).collect();
        let data = StaticDataService::new().with_dataset("publications", rows);
        let tool = default_registry(Arc::new(data)).get("search_publications").unwrap();

        let out = tool
            .execute(json!({"query": "ALS", "limit": 1000}), &tier(5))
            .await
            .unwrap();
        assert_eq!(out["total"], 40);
        assert_eq!(out["returned"], 5);
        assert_eq!(out["limit"], 5);
        assert!(out["query"].get("limit").is_none());
    }

    #[tokio::test]
    async fn details_lookup_by_project_number() {
        let tool = registry().get("get_grant_details").unwrap();
        let out = tool
            .execute(json!({"project_number": "U01AG070011"}), &tier(10))
            .await
            .unwrap();
        assert_eq!(out["total"], 1);
        assert_eq!(out["results"][0]["org_state"], "WA");
    }

    #[tokio::test]
    async fn missing_required_field_is_invalid() {
        let tool = registry().get("search_grants").unwrap();
        let err = tool.execute(json!({"org_state": "MD"}), &tier(10)).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));

        let err = tool.execute(json!("ALS"), &tier(10)).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn negative_limit_is_invalid() {
        let tool = registry().get("search_patents").unwrap();
        let err = tool
            .execute(json!({"query": "TDP-43", "limit": -3}), &tier(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
