pub mod enrichment;
pub mod error;
pub mod http;
pub mod ports;

pub use enrichment::{
    DEFAULT_FETCH_SPACING, StockBoard, StockEnricher, StockLookup, collect_companies,
};
pub use error::StockLookupError;
pub use http::{DEFAULT_STOCK_TIMEOUT, HttpStockQuoteSource};
pub use ports::StockQuoteSource;
