use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::json;

use crate::{
    report::{StockPriceQuote, StockPriceResponse},
    stock::{error::StockLookupError, ports::StockQuoteSource},
};

pub const DEFAULT_STOCK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HttpStockQuoteSource {
    client: Client,
    api_base: String,
    timeout: Duration,
}

impl HttpStockQuoteSource {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, StockLookupError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| StockLookupError::Transport(format!("failed to build http client: {err}")))?;
        Ok(Self::with_client(client, api_base, timeout))
    }

    pub fn with_client(client: Client, api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl StockQuoteSource for HttpStockQuoteSource {
    async fn fetch_quote(&self, company: &str) -> Result<StockPriceQuote, StockLookupError> {
        let company = company.trim();
        if company.is_empty() {
            return Err(StockLookupError::InvalidCompany);
        }

        let response = self
            .client
            .post(format!("{}/stock-price", self.api_base))
            .timeout(self.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&json!({ "company": company }))
            .send()
            .await
            .map_err(|err| StockLookupError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StockLookupError::HttpStatus {
                status: status.as_u16(),
            });
        }

        match response
            .json::<StockPriceResponse>()
            .await
            .map_err(|err| StockLookupError::Transport(format!("malformed stock price body: {err}")))?
        {
            StockPriceResponse::Quote(quote) => Ok(quote),
            StockPriceResponse::Error { error } => Err(StockLookupError::Backend(error)),
        }
    }
}
