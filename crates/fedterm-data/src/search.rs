//! Indicator Search Pipeline
//!
//! Turns a free-form query into exactly five watch-panel slots: one
//! sector series found through FRED full-text search, three curated
//! macro series, and one risk gauge. A small deterministic planner call
//! picks the search term and the curated ids; everything the model
//! proposes is validated against allow-lists so stale or hallucinated
//! ids never reach the panel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use fedterm_agent::{GenerationOptions, LlmProvider, Message};

use crate::fred::FredClient;
use crate::model::SeriesInfo;
use crate::translate::{Translator, extract_json_object, korean_title, lookup_static};

/// Curated macro series the planner may pick from. All actively updated.
pub const ALLOWED_MACRO_IDS: &[&str] = &[
    "FEDFUNDS",
    "DGS10",
    "CPIAUCSL",
    "UNRATE",
    "PCE",
    "PAYEMS",
    "INDPRO",
    "HOUST",
    "RETAILSMNSA",
    "DGS2",
];

/// Curated risk gauges the planner may pick from.
pub const ALLOWED_RISK_IDS: &[&str] =
    &["VIXCLS", "BAMLH0A0HYM2", "T10Y2Y", "STLFSI4", "T10Y3M"];

const DEFAULT_MACRO_IDS: [&str; 3] = ["CPIAUCSL", "UNRATE", "FEDFUNDS"];
const DEFAULT_RISK_ID: &str = "VIXCLS";
const BROAD_FALLBACK_QUERY: &str = "commodity price";

/// A validated search plan
#[derive(Clone, Debug, PartialEq)]
pub struct SearchPlan {
    pub sector_keyword: String,
    pub macro_ids: Vec<String>,
    pub risk_id: String,
}

/// Planner output before validation
#[derive(Debug, Default, Deserialize)]
struct RawPlan {
    #[serde(default)]
    sector_keyword: Option<String>,
    #[serde(default)]
    macro_ids: Vec<String>,
    #[serde(default)]
    risk_id: Option<String>,
}

/// One watch-panel slot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
}

/// The full search result handed to the model and the panel
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub query: String,
    pub keywords: Vec<String>,
    pub count: usize,
    pub results: Vec<SearchHit>,
}

/// Query-to-slots pipeline
pub struct SearchPipeline {
    provider: Arc<dyn LlmProvider>,
    planner_model: String,
    fred: Arc<FredClient>,
    translator: Arc<Translator>,
}

impl SearchPipeline {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        planner_model: impl Into<String>,
        fred: Arc<FredClient>,
        translator: Arc<Translator>,
    ) -> Self {
        Self {
            provider,
            planner_model: planner_model.into(),
            fred,
            translator,
        }
    }

    /// Run the full pipeline. Never fails: every stage degrades to a
    /// default, so the outcome always carries five slots.
    pub async fn run(&self, query: &str) -> SearchOutcome {
        let plan = self.plan(query).await;

        let mut sector = self.sector_top1(&plan.sector_keyword).await;
        if sector.is_none() {
            sector = self.sector_top1(BROAD_FALLBACK_QUERY).await;
        }
        let sector_hit = sector.unwrap_or_else(|| SeriesInfo {
            id: "CPIAUCSL".into(),
            title: korean_title("CPIAUCSL", "소비자물가지수 (CPI)"),
            description: "Consumer Price Index for All Urban Consumers".into(),
            category: Some("sector".into()),
        });

        // Uncataloged sector titles get one batch translation call.
        let translated = if lookup_static(&sector_hit.id).is_none() {
            self.translator
                .translate_batch(&[(sector_hit.id.clone(), sector_hit.title.clone())])
                .await
        } else {
            HashMap::new()
        };
        let sector_title = lookup_static(&sector_hit.id)
            .map(str::to_owned)
            .or_else(|| translated.get(&sector_hit.id).cloned())
            .unwrap_or_else(|| sector_hit.title.clone());

        let mut results = Vec::with_capacity(5);
        results.push(SearchHit {
            id: sector_hit.id.clone(),
            title: sector_title,
            description: sector_hit.description.chars().take(120).collect(),
            category: "sector".into(),
        });
        for macro_id in &plan.macro_ids {
            results.push(SearchHit {
                id: macro_id.clone(),
                title: korean_title(macro_id, macro_id),
                description: String::new(),
                category: "macro".into(),
            });
        }
        results.push(SearchHit {
            id: plan.risk_id.clone(),
            title: korean_title(&plan.risk_id, &plan.risk_id),
            description: String::new(),
            category: "risk".into(),
        });

        SearchOutcome {
            query: query.to_owned(),
            keywords: vec![plan.sector_keyword],
            count: results.len(),
            results,
        }
    }

    async fn plan(&self, query: &str) -> SearchPlan {
        let options = GenerationOptions::deterministic(&self.planner_model, 300);
        let raw = match self
            .provider
            .complete(&[Message::user(planner_prompt(query))], &[], &options)
            .await
        {
            Ok(completion) => extract_json_object(&completion.text)
                .and_then(|span| serde_json::from_str::<RawPlan>(span).ok()),
            Err(e) => {
                tracing::warn!(error = %e, "search planner failed, using defaults");
                None
            }
        };
        validate_plan(raw, query)
    }

    /// Best single hit for a keyword: exact-id dedupe, then frequency
    /// variants collapsed to one representative.
    async fn sector_top1(&self, keyword: &str) -> Option<SeriesInfo> {
        let hits = self.fred.search(keyword).await;
        collapse_freq_variants(dedupe_ids(hits)).into_iter().next()
    }
}

fn planner_prompt(query: &str) -> String {
    format!(
        "For the given economic/stock query, return a JSON object with 3 fields.\n\
         Return ONLY valid JSON. No explanation.\n\n\
         Query: {query}\n\n\
         JSON format:\n\
         {{\n  \"sector_keyword\": \"1 specific English FRED search term for the asset/commodity price most directly related to this query (e.g. 'uranium spot price', 'gold price', 'oil price')\",\n  \"macro_ids\": [\"ID1\", \"ID2\", \"ID3\"],\n  \"risk_id\": \"ID\"\n}}\n\n\
         Available macro_ids (pick exactly 3 most relevant to the query, prefer sector-specific ones):\n\
         FEDFUNDS (기준금리), DGS10 (10년 국채), CPIAUCSL (CPI 인플레이션), UNRATE (실업률),\n\
         PCE (PCE 소비지출), PAYEMS (비농업 고용), INDPRO (산업생산지수), HOUST (주택착공),\n\
         RETAILSMNSA (소매판매), DGS2 (2년 국채)\n\n\
         Available risk_id (pick exactly 1, the most relevant fear/stress indicator):\n\
         VIXCLS (VIX 공포지수), BAMLH0A0HYM2 (하이일드 스프레드), T10Y2Y (장단기 금리차),\n\
         STLFSI4 (세인트루이스 금융스트레스지수), T10Y3M (10년-3개월 금리차)"
    )
}

/// Clamp a raw plan to the allow-lists. Macro ids are deduplicated in
/// first-occurrence order and backfilled from the defaults so there are
/// always exactly three.
fn validate_plan(raw: Option<RawPlan>, query: &str) -> SearchPlan {
    let raw = raw.unwrap_or_default();

    let sector_keyword = raw
        .sector_keyword
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| query.to_owned());

    let mut macro_ids: Vec<String> = Vec::new();
    for id in &raw.macro_ids {
        let upper = id.to_ascii_uppercase();
        if ALLOWED_MACRO_IDS.contains(&upper.as_str()) && !macro_ids.contains(&upper) {
            macro_ids.push(upper);
        }
    }
    macro_ids.truncate(3);
    for default in DEFAULT_MACRO_IDS {
        if macro_ids.len() >= 3 {
            break;
        }
        if !macro_ids.iter().any(|m| m == default) {
            macro_ids.push(default.to_owned());
        }
    }

    let risk_id = raw
        .risk_id
        .map(|r| r.to_ascii_uppercase())
        .filter(|r| ALLOWED_RISK_IDS.contains(&r.as_str()))
        .unwrap_or_else(|| DEFAULT_RISK_ID.to_owned());

    SearchPlan {
        sector_keyword,
        macro_ids,
        risk_id,
    }
}

fn dedupe_ids(hits: Vec<SeriesInfo>) -> Vec<SeriesInfo> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.id.clone()))
        .collect()
}

/// Strip one leading frequency letter (D/M/W/Q/A before another letter)
/// to get the base id. "M2SL" keeps its M because a digit follows.
fn base_id(series_id: &str) -> String {
    let upper = series_id.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    if bytes.len() >= 2
        && matches!(bytes[0], b'D' | b'M' | b'W' | b'Q' | b'A')
        && bytes[1].is_ascii_uppercase()
    {
        upper[1..].to_owned()
    } else {
        upper
    }
}

fn freq_rank(series_id: &str) -> u8 {
    match series_id.as_bytes().first().map(u8::to_ascii_uppercase) {
        Some(b'M') => 0,
        Some(b'Q') => 1,
        Some(b'A') => 2,
        Some(b'W') => 3,
        Some(b'D') => 4,
        _ => 5,
    }
}

/// Keep one series per base id, preferring monthly over quarterly over
/// annual over weekly over daily, in first-appearance order.
fn collapse_freq_variants(hits: Vec<SeriesInfo>) -> Vec<SeriesInfo> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, SeriesInfo> = HashMap::new();

    for hit in hits {
        let base = base_id(&hit.id);
        match best.get(&base) {
            None => {
                order.push(base.clone());
                best.insert(base, hit);
            }
            Some(existing) => {
                if freq_rank(&hit.id) < freq_rank(&existing.id) {
                    best.insert(base, hit);
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|base| best.remove(&base))
        .collect()
}
