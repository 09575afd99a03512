use thiserror::Error;

pub const TRANSPORT_FAILURE_REASON: &str = "검색도중 에러가 났습니다.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockLookupError {
    #[error("company name must not be blank")]
    InvalidCompany,
    #[error("stock price request failed: {0}")]
    Transport(String),
    #[error("stock price backend returned status {status}")]
    HttpStatus { status: u16 },
    #[error("stock price backend reported: {0}")]
    Backend(String),
}

impl StockLookupError {
    /// Short reason kept next to the failed company.
    pub fn reason(&self) -> String {
        match self {
            StockLookupError::Backend(message) => message.clone(),
            StockLookupError::InvalidCompany => "회사명이 비어 있습니다.".to_string(),
            StockLookupError::Transport(_) | StockLookupError::HttpStatus { .. } => {
                TRANSPORT_FAILURE_REASON.to_string()
            }
        }
    }
}
