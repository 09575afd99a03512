use pin_analyzer::report::{AnalysisReport, Evidence, InfluenceChain};

pub fn chain(policy: &str, sector: &str, companies: &[&str]) -> InfluenceChain {
    InfluenceChain {
        politician: "이재명".to_string(),
        policy: policy.to_string(),
        industry_or_sector: sector.to_string(),
        impact_description: format!("{sector} 수혜"),
        companies: companies.iter().map(|company| company.to_string()).collect(),
        evidence: vec![Evidence {
            source_title: format!("{policy} 보도"),
            url: "https://news.example.test/1".to_string(),
        }],
    }
}

pub fn report(chains: Vec<InfluenceChain>) -> AnalysisReport {
    AnalysisReport {
        report_title: "정책 영향 분석".to_string(),
        time_range: "2018-2025".to_string(),
        notes: None,
        influence_chains: chains,
    }
}

/// Three chains with 2, 0 and 3 companies.
pub fn uneven_report() -> AnalysisReport {
    report(vec![
        chain("기본소득", "지역화폐", &["코나아이 (052400)", "KG모빌리언스"]),
        chain("", "공공임대", &[]),
        chain(
            "그린뉴딜",
            "2차전지",
            &["LG에너지솔루션", "삼성SDI (006400)", "동신건설 (025950)"],
        ),
    ])
}
