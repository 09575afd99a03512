use async_trait::async_trait;

use crate::{report::StockPriceQuote, stock::error::StockLookupError};

#[async_trait]
pub trait StockQuoteSource: Send + Sync {
    async fn fetch_quote(&self, company: &str) -> Result<StockPriceQuote, StockLookupError>;
}
