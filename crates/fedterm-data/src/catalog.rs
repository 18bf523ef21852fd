//! Curated Indicator Catalog
//!
//! The major series the terminal surfaces in its watch panel and
//! teaches the model about through the system prompt.

use crate::model::SeriesInfo;

/// (id, Korean title, short description, category)
const CATALOG: &[(&str, &str, &str, &str)] = &[
    (
        "FEDFUNDS",
        "연방기금금리",
        "미국 기준금리, 연준 통화정책의 핵심 지표",
        "금리",
    ),
    ("DGS10", "미 국채 10년 금리", "장기 시장금리의 기준", "금리"),
    (
        "DGS2",
        "미 국채 2년 금리",
        "통화정책 기대를 반영하는 단기 금리",
        "금리",
    ),
    (
        "T10Y2Y",
        "장단기 금리차 (10년-2년)",
        "경기침체 선행 지표로 쓰이는 수익률곡선 스프레드",
        "금리",
    ),
    ("CPIAUCSL", "소비자물가지수 (CPI)", "대표 인플레이션 지표", "물가"),
    (
        "PCE",
        "개인소비지출 (PCE)",
        "연준이 선호하는 소비 기반 물가 지표",
        "물가",
    ),
    ("PPIFIS", "생산자물가지수 (PPI)", "생산 단계의 물가 압력", "물가"),
    ("UNRATE", "실업률", "노동시장 상태의 대표 지표", "고용"),
    ("PAYEMS", "비농업 고용", "월간 신규 고용 규모", "고용"),
    ("ICSA", "신규 실업수당 청구", "주간 고빈도 노동시장 지표", "고용"),
    ("GDP", "국내총생산 (GDP)", "경제 전체의 생산 규모", "성장"),
    ("INDPRO", "산업생산지수", "제조업 경기 흐름", "성장"),
    ("RSAFS", "전체 소매판매", "소비 경기의 핵심 지표", "성장"),
    ("HOUST", "주택 착공 건수", "주택 경기 선행 지표", "성장"),
    ("SP500", "S&P 500", "미국 대형주 대표 지수", "시장"),
    ("NASDAQCOM", "나스닥 종합지수", "기술주 중심 지수", "시장"),
    (
        "VIXCLS",
        "VIX 변동성 지수 (공포지수)",
        "시장 불안 심리 측정",
        "시장",
    ),
    ("DCOILWTICO", "WTI 원유 현물 가격", "에너지 가격의 기준", "원자재"),
    (
        "GOLDAMGBD228NLBM",
        "금 현물 가격 (런던 오전)",
        "안전자산 수요 지표",
        "원자재",
    ),
    ("M2SL", "M2 통화량", "광의 통화 공급", "통화"),
];

/// Category groupings for the watch panel
pub const INDICATOR_CATEGORIES: &[(&str, &[&str])] = &[
    ("금리", &["FEDFUNDS", "DGS10", "DGS2", "T10Y2Y"]),
    ("물가", &["CPIAUCSL", "PCE", "PPIFIS"]),
    ("고용", &["UNRATE", "PAYEMS", "ICSA"]),
    ("성장", &["GDP", "INDPRO", "RSAFS", "HOUST"]),
    ("시장", &["SP500", "NASDAQCOM", "VIXCLS"]),
    ("원자재", &["DCOILWTICO", "GOLDAMGBD228NLBM"]),
    ("통화", &["M2SL"]),
];

/// All curated indicators as metadata records.
pub fn major_indicators() -> Vec<SeriesInfo> {
    CATALOG
        .iter()
        .map(|(id, title, description, category)| SeriesInfo {
            id: (*id).to_owned(),
            title: (*title).to_owned(),
            description: (*description).to_owned(),
            category: Some((*category).to_owned()),
        })
        .collect()
}

/// Catalog section appended to the system prompts.
pub fn indicators_context() -> String {
    let lines: Vec<String> = CATALOG
        .iter()
        .map(|(id, title, description, _)| format!("- **{id}**: {title} — {description}"))
        .collect();
    format!("\n## 사용 가능한 주요 지표\n{}", lines.join("\n"))
}
