use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type JobId = String;

pub const UNLINKED_POLICY_LABEL: &str = "None directly linked";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Body of `GET {apiBase}/job/{job_id}`, discriminated by `status`.
///
/// Any status other than `completed` or `failed` (the backend reports
/// `processing` while it works) decodes as `Pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatusResponse {
    Completed {
        #[serde(default)]
        result: Option<AnalysisReport>,
    },
    Failed {
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(alias = "processing", other)]
    Pending,
}

impl JobStatusResponse {
    pub fn status(&self) -> JobStatus {
        match self {
            JobStatusResponse::Pending => JobStatus::Pending,
            JobStatusResponse::Completed { .. } => JobStatus::Completed,
            JobStatusResponse::Failed { .. } => JobStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job_id: JobId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub job_id: JobId,
    pub status: JobStatus,
    pub result: Option<AnalysisReport>,
    pub error: Option<String>,
}

impl AnalysisJob {
    pub fn from_response(job_id: impl Into<JobId>, response: JobStatusResponse) -> Self {
        let job_id = job_id.into();
        match response {
            JobStatusResponse::Pending => Self {
                job_id,
                status: JobStatus::Pending,
                result: None,
                error: None,
            },
            JobStatusResponse::Completed { result } => Self {
                job_id,
                status: JobStatus::Completed,
                result,
                error: None,
            },
            JobStatusResponse::Failed { error } => Self {
                job_id,
                status: JobStatus::Failed,
                result: None,
                error,
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub report_title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub influence_chains: Vec<InfluenceChain>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InfluenceChain {
    #[serde(default, deserialize_with = "null_as_default")]
    pub politician: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub policy: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub industry_or_sector: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub impact_description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub companies: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub evidence: Vec<Evidence>,
}

impl InfluenceChain {
    /// Policy text as shown on the graph; blank policies map to the unlinked sentinel.
    pub fn policy_label(&self) -> &str {
        if self.policy.trim().is_empty() {
            UNLINKED_POLICY_LABEL
        } else {
            &self.policy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default, alias = "title", deserialize_with = "null_as_default")]
    pub source_title: String,
    #[serde(default, alias = "source_url", deserialize_with = "null_as_default")]
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceDirection {
    #[serde(rename = "상승", alias = "up")]
    Up,
    #[serde(rename = "하락", alias = "down")]
    Down,
    #[serde(rename = "보합", alias = "unchanged")]
    Unchanged,
}

impl PriceDirection {
    pub fn label(self) -> &'static str {
        match self {
            PriceDirection::Up => "상승",
            PriceDirection::Down => "하락",
            PriceDirection::Unchanged => "보합",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPriceQuote {
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
    pub direction: PriceDirection,
    #[serde(default, deserialize_with = "string_or_number")]
    pub change: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub change_percent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

/// Body of `POST {apiBase}/stock-price`: either a quote or `{error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StockPriceResponse {
    Error { error: String },
    Quote(StockPriceQuote),
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
