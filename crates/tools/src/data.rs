//! Data services backing the search tools.
//!
//! A [`DataService`] answers `query(dataset, params, limit)` with
//! `{"total": n, "rows": [...]}`. The HTTP implementation calls remote
//! procedures on a REST data API; the static one serves in-memory rows for
//! offline use and tests. Both are shared across concurrent tool calls.

use async_trait::async_trait;
use grantscout_core::ToolError;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Query interface over the research datasets.
#[async_trait]
pub trait DataService: Send + Sync {
    fn name(&self) -> &str;

    /// Run a query. `params` is a JSON object of filters; `limit` bounds `rows`.
    async fn query(&self, dataset: &str, params: &Value, limit: u32) -> Result<Value, ToolError>;
}

/// REST data API client: `POST {base_url}/rpc/{dataset}`.
pub struct HttpDataService {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpDataService {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::Backend(format!("HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn rpc_url(&self, dataset: &str) -> String {
        format!("{}/rpc/{}", self.base_url, dataset)
    }

    /// Accept either `{total, rows}` or a bare row array.
    fn normalize(body: Value, limit: u32) -> Result<Value, ToolError> {
        let (total, mut rows) = match body {
            Value::Array(rows) => (rows.len() as u64, rows),
            Value::Object(mut map) => {
                let rows = match map.remove("rows") {
                    Some(Value::Array(rows)) => rows,
                    _ => {
                        return Err(ToolError::Backend(
                            "data service response has no rows".into(),
                        ));
                    }
                };
                let total = map
                    .get("total")
                    .and_then(Value::as_u64)
                    .unwrap_or(rows.len() as u64);
                (total, rows)
            }
            other => {
                return Err(ToolError::Backend(format!(
                    "unexpected data service response: {other}"
                )));
            }
        };
        rows.truncate(limit as usize);
        Ok(json!({ "total": total, "rows": rows }))
    }
}

#[async_trait]
impl DataService for HttpDataService {
    fn name(&self) -> &str {
        "http"
    }

    async fn query(&self, dataset: &str, params: &Value, limit: u32) -> Result<Value, ToolError> {
        let mut body = params.clone();
        if let Value::Object(map) = &mut body {
            map.insert("result_limit".into(), json!(limit));
        }

        debug!(dataset, limit, "Querying data service");

        let mut request = self.client.post(self.rpc_url(dataset)).json(&body);
        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ToolError::Backend(format!("{dataset}: HTTP {status}: {text}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ToolError::Backend(format!("{dataset}: invalid JSON: {e}")))?;
        Self::normalize(body, limit)
    }
}

/// In-memory datasets with simple filtering.
///
/// The `query` parameter matches case-insensitively against any string
/// field; every other scalar parameter must equal the row's field of the
/// same name.
#[derive(Debug, Clone, Default)]
pub struct StaticDataService {
    datasets: HashMap<String, Vec<Value>>,
}

impl StaticDataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, name: impl Into<String>, rows: Vec<Value>) -> Self {
        self.datasets.insert(name.into(), rows);
        self
    }

    /// A small sample corpus for offline runs.
    pub fn sample() -> Self {
        let grants = vec![
            json!({
                "project_number": "R01NS112233",
                "title": "Motor neuron degeneration mechanisms in ALS",
                "org_name": "Johns Hopkins University",
                "org_state": "MD",
                "activity_code": "R01",
                "fiscal_year": 2024,
                "total_cost": 612_500,
                "pi_names": "Rivera, Ana",
                "pi_email": "arivera@jhu.example",
                "abstract_text": "We characterize TDP-43 aggregation in motor neurons and test antisense therapies."
            }),
            json!({
                "project_number": "U01AG070011",
                "title": "Biomarkers of early Alzheimer disease progression",
                "org_name": "University of Washington",
                "org_state": "WA",
                "activity_code": "U01",
                "fiscal_year": 2023,
                "total_cost": 1_450_000,
                "pi_names": "Okafor, James",
                "pi_email": "jokafor@uw.example",
                "abstract_text": "A longitudinal cohort measuring plasma p-tau217 and cognitive decline."
            }),
            json!({
                "project_number": "R21CA998877",
                "title": "CAR-T persistence in solid tumors",
                "org_name": "Stanford University",
                "org_state": "CA",
                "activity_code": "R21",
                "fiscal_year": 2024,
                "total_cost": 275_000,
                "pi_names": "Chen, Mei",
                "pi_email": "mchen@stanford.example",
                "abstract_text": "Engineering exhaustion-resistant CAR-T cells for pancreatic cancer."
            }),
        ];
        let trials = vec![
            json!({
                "nct_id": "NCT05112233",
                "study_title": "Tofersen in presymptomatic SOD1 ALS carriers",
                "status": "recruiting",
                "phase": "Phase 3",
                "conditions": "Amyotrophic Lateral Sclerosis",
                "project_number": "R01NS112233",
                "contact_email": "als-trial@jhu.example",
                "brief_summary": "Evaluates whether early tofersen delays clinical onset."
            }),
            json!({
                "nct_id": "NCT04998877",
                "study_title": "Plasma p-tau217 screening for prevention trials",
                "status": "active, not recruiting",
                "phase": "Phase 2",
                "conditions": "Alzheimer Disease",
                "project_number": "U01AG070011",
                "contact_email": "ad-screen@uw.example",
                "brief_summary": "Validates a blood test for trial enrichment."
            }),
        ];
        let patents = vec![json!({
            "patent_id": "US11234567",
            "patent_title": "Antisense oligonucleotides targeting TDP-43 mis-splicing",
            "patent_org": "Johns Hopkins University",
            "project_number": "R01NS112233",
            "issue_year": 2023
        })];
        let publications = vec![
            json!({
                "pmid": "38012345",
                "title": "TDP-43 loss of function drives cryptic exon inclusion in ALS",
                "journal_title": "Nature Neuroscience",
                "year": 2024,
                "project_number": "R01NS112233",
                "abstract": "Cryptic exon inclusion in STMN2 was observed in patient motor neurons."
            }),
            json!({
                "pmid": "37987654",
                "title": "Plasma p-tau217 predicts amyloid positivity",
                "journal_title": "JAMA Neurology",
                "year": 2023,
                "project_number": "U01AG070011",
                "abstract": "p-tau217 showed high accuracy against amyloid PET."
            }),
        ];

        Self::new()
            .with_dataset("grant_details", grants.clone())
            .with_dataset("grants", grants)
            .with_dataset("clinical_studies", trials)
            .with_dataset("patents", patents)
            .with_dataset("publications", publications)
    }

    fn matches(row: &Value, params: &Value) -> bool {
        let Value::Object(filters) = params else {
            return true;
        };
        filters.iter().all(|(key, wanted)| {
            if key == "query" {
                let Some(needle) = wanted.as_str() else {
                    return true;
                };
                let needle = needle.to_lowercase();
                return row
                    .as_object()
                    .map(|fields| {
                        fields.values().any(|v| {
                            v.as_str()
                                .map(|s| s.to_lowercase().contains(&needle))
                                .unwrap_or(false)
                        })
                    })
                    .unwrap_or(false);
            }
            match (wanted, row.get(key)) {
                (Value::Null, _) => true,
                (Value::String(w), Some(Value::String(have))) => w.eq_ignore_ascii_case(have),
                (w, Some(have)) if !w.is_object() && !w.is_array() => w == have,
                (_, None) => false,
                _ => true,
            }
        })
    }
}

#[async_trait]
impl DataService for StaticDataService {
    fn name(&self) -> &str {
        "static"
    }

    async fn query(&self, dataset: &str, params: &Value, limit: u32) -> Result<Value, ToolError> {
        let rows = self
            .datasets
            .get(dataset)
            .ok_or_else(|| ToolError::Backend(format!("unknown dataset: {dataset}")))?;
        let matched: Vec<&Value> = rows.iter().filter(|r| Self::matches(r, params)).collect();
        let returned: Vec<Value> = matched.iter().take(limit as usize).map(|r| (*r).clone()).collect();
        Ok(json!({ "total": matched.len(), "rows": returned }))
    }
}
