use serde::{Deserialize, Serialize};

use crate::{
    graph::model::{GraphNode, NodeDetail},
    report::PriceDirection,
    stock::{StockBoard, StockLookup},
};

pub const LOOKUP_FAILED_SENTINEL: &str = "조회 실패";
pub const QUOTE_UNAVAILABLE_TEXT: &str = "주가 정보를 불러올 수 없습니다";
pub const LOADING_TEXT: &str = "로딩 중...";
pub const UNTITLED_EVIDENCE: &str = "제목 없음";
pub const MISSING_TEXT: &str = "N/A";

#[derive(Debug, Clone, Copy)]
pub enum StockState<'a> {
    Loading,
    Ready(&'a StockBoard),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub title: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuoteView {
    Unavailable,
    Failed {
        reason: String,
    },
    Priced {
        price: String,
        direction: PriceDirection,
        change: Option<String>,
        change_percent: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyQuote {
    pub company: String,
    pub quote: QuoteView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TooltipBody {
    Input,
    Policy {
        policy: String,
        evidence: Vec<EvidenceItem>,
    },
    Sector {
        sector: String,
        impact: String,
    },
    EnterpriseLoading,
    Enterprise {
        quotes: Vec<CompanyQuote>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tooltip {
    pub title: String,
    pub body: TooltipBody,
}

impl Tooltip {
    pub fn for_node(node: &GraphNode, stocks: StockState<'_>) -> Self {
        let title = or_missing(&node.label);
        let body = match &node.detail {
            NodeDetail::Input => TooltipBody::Input,
            NodeDetail::Policy { policy, evidence } => TooltipBody::Policy {
                policy: or_missing(policy),
                evidence: evidence
                    .iter()
                    .map(|item| EvidenceItem {
                        title: if item.source_title.trim().is_empty() {
                            UNTITLED_EVIDENCE.to_string()
                        } else {
                            item.source_title.clone()
                        },
                        url: Some(item.url.trim())
                            .filter(|url| !url.is_empty())
                            .map(str::to_string),
                    })
                    .collect(),
            },
            NodeDetail::Sector {
                sector,
                impact_description,
            } => TooltipBody::Sector {
                sector: or_missing(sector),
                impact: or_missing(impact_description),
            },
            NodeDetail::Enterprise { .. } => match stocks {
                StockState::Loading => TooltipBody::EnterpriseLoading,
                StockState::Ready(board) => TooltipBody::Enterprise {
                    quotes: node
                        .companies()
                        .into_iter()
                        .map(|company| CompanyQuote {
                            company: company.to_string(),
                            quote: quote_view(board.get(company)),
                        })
                        .collect(),
                },
            },
        };

        Self { title, body }
    }

    /// Plain-text rendering, one entry per line.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.title.clone()];
        match &self.body {
            TooltipBody::Input => {}
            TooltipBody::Policy { policy, evidence } => {
                lines.push(format!("관련 정책: {policy}"));
                if !evidence.is_empty() {
                    lines.push("관련 근거".to_string());
                    for item in evidence {
                        lines.push(format!("  - {}", item.title));
                        if let Some(url) = &item.url {
                            lines.push(format!("    {url}"));
                        }
                    }
                }
            }
            TooltipBody::Sector { sector, impact } => {
                lines.push(format!("산업 분야: {sector}"));
                lines.push(format!("영향 분석: {impact}"));
            }
            TooltipBody::EnterpriseLoading => {
                lines.push("주가 정보".to_string());
                lines.push(LOADING_TEXT.to_string());
            }
            TooltipBody::Enterprise { quotes } => {
                lines.push("주가 정보".to_string());
                for entry in quotes {
                    lines.push(format!("  {}", entry.company));
                    lines.push(format!("    {}", describe_quote(&entry.quote)));
                }
            }
        }
        lines
    }
}

pub fn truncate_label(text: &str, max_chars: usize) -> String {
    if text.is_empty() {
        return MISSING_TEXT.to_string();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}

fn quote_view(lookup: Option<&StockLookup>) -> QuoteView {
    match lookup {
        None => QuoteView::Unavailable,
        Some(StockLookup::Failed { reason }) => QuoteView::Failed {
            reason: reason.clone(),
        },
        Some(StockLookup::Quote(quote)) => QuoteView::Priced {
            price: if quote.price.is_empty() {
                MISSING_TEXT.to_string()
            } else {
                quote.price.clone()
            },
            direction: quote.direction,
            change: Some(quote.change.clone()).filter(|change| !change.is_empty()),
            change_percent: quote.change_percent.clone(),
        },
    }
}

fn describe_quote(quote: &QuoteView) -> String {
    match quote {
        QuoteView::Unavailable => QUOTE_UNAVAILABLE_TEXT.to_string(),
        QuoteView::Failed { reason } if reason.is_empty() => LOOKUP_FAILED_SENTINEL.to_string(),
        QuoteView::Failed { reason } => format!("{LOOKUP_FAILED_SENTINEL} ({reason})"),
        QuoteView::Priced {
            price,
            direction,
            change: Some(change),
            change_percent,
        } => format!("{price} {} {change} ({change_percent})", direction.label()),
        QuoteView::Priced {
            price,
            direction,
            change: None,
            ..
        } => format!("{price} {}", direction.label()),
    }
}

fn or_missing(text: &str) -> String {
    if text.trim().is_empty() {
        MISSING_TEXT.to_string()
    } else {
        text.to_string()
    }
}
