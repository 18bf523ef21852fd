//! Korean Series Titles
//!
//! Static catalog of Korean titles for the FRED series the terminal talks
//! about most, plus an LLM-backed translator for everything outside the
//! catalog. Translations are cached so the model is called at most once
//! per unknown series id.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use fedterm_agent::{GenerationOptions, LlmProvider, Message};

/// Curated Korean titles keyed by uppercase FRED series id.
pub const KOREAN_TITLES: &[(&str, &str)] = &[
    // 국민계정
    ("GDP", "국내총생산 (GDP)"),
    ("GDPC1", "실질 GDP"),
    ("GDPPOT", "잠재 GDP"),
    ("GDPDEF", "GDP 디플레이터"),
    ("GDI", "국내총소득 (GDI)"),
    ("A191RL1Q225SBEA", "실질 GDP 성장률"),
    // 물가
    ("CPIAUCSL", "소비자물가지수 (CPI)"),
    ("CPILFESL", "근원 CPI (식품·에너지 제외)"),
    ("CPIENGSL", "에너지 CPI"),
    ("CPIFABSL", "식품·음료 CPI"),
    ("CPIHOSSL", "주거비 CPI"),
    ("PCE", "개인소비지출 (PCE)"),
    ("PCEPI", "PCE 물가지수"),
    ("PCEPILFE", "근원 PCE 물가지수"),
    ("T5YIFR", "5년 기대 인플레이션"),
    ("T10YIE", "10년 기대 인플레이션"),
    ("MICH", "미시건대 인플레이션 기대"),
    ("PPIFIS", "생산자물가지수 (PPI)"),
    ("PPIACO", "원자재 PPI"),
    // 노동
    ("UNRATE", "실업률"),
    ("U6RATE", "광의 실업률 (U-6)"),
    ("PAYEMS", "비농업 고용"),
    ("ICSA", "신규 실업수당 청구"),
    ("CCSA", "연속 실업수당 청구건수"),
    ("CIVPART", "경제활동참가율"),
    ("EMRATIO", "고용-인구 비율"),
    ("AWHAETP", "주평균 근로시간 (민간)"),
    ("CES0500000003", "민간 시간당 평균 임금"),
    ("LNS12300060", "핵심 근로연령 고용률"),
    ("JOLTSJOL", "구인 공석 (JOLTS)"),
    ("JOLTSQUL", "자발적 이직자 수"),
    ("JTSHIL", "채용 건수"),
    // 통화정책
    ("FEDFUNDS", "연방기금금리"),
    ("DFF", "연방기금금리 (일별)"),
    ("DFEDTARL", "연방기금금리 하단 목표"),
    ("DFEDTARU", "연방기금금리 상단 목표"),
    ("M1SL", "M1 통화량"),
    ("M2SL", "M2 통화량"),
    ("BOGMBASE", "본원통화 (화폐기반)"),
    ("WALCL", "연준 총자산"),
    ("WTREGEN", "연준 지급준비금"),
    ("RRPONTSYD", "연준 역레포 잔액"),
    // 금리·채권
    ("DGS1MO", "미 국채 1개월 금리"),
    ("DGS3MO", "미 국채 3개월 금리"),
    ("DGS6MO", "미 국채 6개월 금리"),
    ("DGS1", "미 국채 1년 금리"),
    ("DGS2", "미 국채 2년 금리"),
    ("DGS5", "미 국채 5년 금리"),
    ("DGS10", "미 국채 10년 금리"),
    ("DGS30", "미 국채 30년 금리"),
    ("T10Y2Y", "장단기 금리차 (10년-2년)"),
    ("T10Y3M", "장단기 금리차 (10년-3개월)"),
    ("T5YIEM", "5년 손익분기 인플레이션"),
    ("BAMLH0A0HYM2", "하이일드 채권 스프레드"),
    ("BAMLC0A0CM", "투자등급 회사채 스프레드"),
    ("DBAA", "Baa 등급 회사채 금리"),
    ("DAAA", "Aaa 등급 회사채 금리"),
    ("MORTGAGE30US", "30년 고정 모기지 금리"),
    ("MORTGAGE15US", "15년 고정 모기지 금리"),
    ("MORTGAGEPURCHASEINDEX", "모기지 구매 신청 지수"),
    // 주식시장
    ("SP500", "S&P 500"),
    ("NASDAQCOM", "나스닥 종합지수"),
    ("DJIA", "다우존스 산업평균 (DJIA)"),
    ("VIXCLS", "VIX 변동성 지수 (공포지수)"),
    ("WILL5000IND", "윌셔 5000 전체 시장 지수"),
    // 원자재
    ("DCOILWTICO", "WTI 원유 현물 가격"),
    ("DCOILBRENTEU", "브렌트유 현물 가격"),
    ("DHHNGSP", "천연가스 헨리허브 가격"),
    ("GOLDAMGBD228NLBM", "금 현물 가격 (런던 오전)"),
    ("SLVPRUSD", "은 현물 가격"),
    // 주택
    ("HOUST", "주택 착공 건수"),
    ("PERMIT", "건축 허가 건수"),
    ("EXHOSLUSM495S", "기존주택 판매량"),
    ("HSN1F", "신규주택 판매량"),
    ("CSUSHPISA", "케이스-실러 주택가격지수"),
    ("MSPUS", "신규주택 중위가격"),
    ("USHOWN", "자가 보유율"),
    // 소비·소득
    ("UMCSENT", "미시건대 소비자심리지수"),
    ("CSCICP03USM665S", "컨퍼런스보드 소비자신뢰지수"),
    ("DSPIC96", "실질 가처분소득"),
    ("PSAVERT", "개인 저축률"),
    ("RSXFS", "핵심 소매판매"),
    ("RSAFS", "전체 소매판매"),
    ("RETAILSMNSA", "소매판매"),
    ("TOTALSA", "자동차 총 판매량"),
    // 기업·생산
    ("INDPRO", "산업생산지수"),
    ("TCU", "제조업 가동률"),
    ("ISRATIO", "재고/매출 비율"),
    ("DGORDER", "내구재 주문"),
    ("AMTMNO", "제조업 신규 주문"),
    ("BUSLOANS", "기업 대출 잔액"),
    ("DPCREDIT", "국내 민간 신용"),
    // 대외·환율
    ("BOPGSTB", "미국 무역수지"),
    ("DEXUSEU", "달러/유로 환율"),
    ("DEXJPUS", "엔/달러 환율"),
    ("DEXCHUS", "위안/달러 환율"),
    ("DEXKOUS", "원/달러 환율"),
    ("DTWEXBGS", "달러 무역가중지수 (광의)"),
    ("DTWEXEMEGS", "달러 무역가중지수 (신흥)"),
    // 신용·금융
    ("DRSFRMACBS", "모기지 연체율"),
    ("DRCCLACBS", "신용카드 연체율"),
    ("STLFSI4", "세인트루이스 연준 금융스트레스지수"),
    ("NFCI", "시카고 연준 금융여건지수"),
];

/// Look up the static Korean title for a series id, case-insensitive.
pub fn lookup_static(series_id: &str) -> Option<&'static str> {
    let upper = series_id.to_ascii_uppercase();
    KOREAN_TITLES
        .iter()
        .find(|(id, _)| *id == upper)
        .map(|(_, title)| *title)
}

/// Static Korean title with a fallback for uncataloged series.
pub fn korean_title(series_id: &str, fallback: &str) -> String {
    lookup_static(series_id)
        .map(str::to_owned)
        .unwrap_or_else(|| fallback.to_owned())
}

/// Extract the first balanced `{...}` span from model output, honoring
/// string literals and escapes so a `}` inside a quoted title does not
/// close the object early.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Translates FRED series titles to Korean with a small deterministic
/// model call, memoized per series id.
pub struct Translator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    cache: RwLock<HashMap<String, String>>,
}

impl Translator {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Korean title for a series: static catalog first, then the cache,
    /// then one model call. Any provider failure returns the English
    /// title unchanged and caches nothing.
    pub async fn title_for(&self, series_id: &str, english_title: &str) -> String {
        let key = series_id.to_ascii_uppercase();
        if let Some(title) = lookup_static(&key) {
            return title.to_owned();
        }
        if let Some(cached) = self.cache.read().unwrap().get(&key) {
            return cached.clone();
        }

        let prompt = format!(
            "Translate this FRED economic indicator title to concise Korean \
             (한국어, max 20 chars).\n\
             Return ONLY the Korean translation, nothing else.\n\n\
             Title: {english_title}"
        );
        let options = GenerationOptions::deterministic(&self.model, 60);
        match self
            .provider
            .complete(&[Message::user(prompt)], &[], &options)
            .await
        {
            Ok(completion) => {
                let translated = completion.text.trim().to_owned();
                if translated.is_empty() {
                    return english_title.to_owned();
                }
                self.cache.write().unwrap().insert(key, translated.clone());
                translated
            }
            Err(e) => {
                tracing::warn!(series = %series_id, error = %e, "title translation failed");
                english_title.to_owned()
            }
        }
    }

    /// Translate several titles in one call. The model returns a JSON
    /// object mapping series id to Korean title; on any failure the map
    /// is empty and callers keep the English titles.
    pub async fn translate_batch(&self, titles: &[(String, String)]) -> HashMap<String, String> {
        if titles.is_empty() {
            return HashMap::new();
        }

        let listing = titles
            .iter()
            .map(|(id, title)| format!("{id}: {title}"))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Translate the following FRED economic indicator titles into concise Korean (한국어).\n\
             Return ONLY a JSON object: {{\"SERIES_ID\": \"Korean title\", ...}}. No explanation.\n\n\
             {listing}"
        );
        let options = GenerationOptions::deterministic(&self.model, 500);
        let completion = match self
            .provider
            .complete(&[Message::user(prompt)], &[], &options)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "batch title translation failed");
                return HashMap::new();
            }
        };

        let Some(span) = extract_json_object(&completion.text) else {
            return HashMap::new();
        };
        let Ok(map) = serde_json::from_str::<HashMap<String, String>>(span) else {
            return HashMap::new();
        };

        let mut cache = self.cache.write().unwrap();
        for (id, translated) in &map {
            cache.insert(id.to_ascii_uppercase(), translated.clone());
        }
        drop(cache);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fedterm_agent::{
        AgentError, Completion, CompletionStream, Result as AgentResult, StopReason, ToolSchema,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedProvider {
        reply: String,
        calls: AtomicUsize,
    }

    impl CannedProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_owned(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> AgentResult<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Completion {
                text: self.reply.clone(),
                tool_calls: Vec::new(),
                model: "test".into(),
                stop_reason: Some(StopReason::EndTurn),
                usage: None,
            })
        }

        async fn complete_stream(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> AgentResult<CompletionStream> {
            unimplemented!("translator never streams")
        }
    }

    struct DownProvider;

    #[async_trait]
    impl LlmProvider for DownProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> AgentResult<Completion> {
            Err(AgentError::ProviderUnavailable("connection refused".into()))
        }

        async fn complete_stream(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> AgentResult<CompletionStream> {
            Err(AgentError::ProviderUnavailable("connection refused".into()))
        }
    }

    #[test]
    fn test_static_lookup_is_case_insensitive() {
        assert_eq!(lookup_static("CPIAUCSL"), Some("소비자물가지수 (CPI)"));
        assert_eq!(lookup_static("cpiaucsl"), Some("소비자물가지수 (CPI)"));
        assert_eq!(lookup_static("NOT_A_SERIES"), None);
        assert_eq!(korean_title("UNRATE", "Unemployment Rate"), "실업률");
        assert_eq!(korean_title("XYZ123", "Some Title"), "Some Title");
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(
            extract_json_object(r#"Here you go: {"a": 1} done"#),
            Some(r#"{"a": 1}"#)
        );
        assert_eq!(
            extract_json_object(r#"{"outer": {"inner": 2}}"#),
            Some(r#"{"outer": {"inner": 2}}"#)
        );
        // A brace inside a string must not close the object.
        assert_eq!(
            extract_json_object(r#"{"title": "a } b"}"#),
            Some(r#"{"title": "a } b"}"#)
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{ unterminated"), None);
    }

    #[tokio::test]
    async fn test_static_title_skips_the_model() {
        let provider = Arc::new(CannedProvider::new("무시됨"));
        let translator = Translator::new(provider.clone(), "test-model");

        let title = translator.title_for("FEDFUNDS", "Federal Funds Rate").await;
        assert_eq!(title, "연방기금금리");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_translation_is_memoized() {
        let provider = Arc::new(CannedProvider::new("우라늄 현물 가격"));
        let translator = Translator::new(provider.clone(), "test-model");

        let first = translator.title_for("URANIUMSPOT", "Uranium Spot Price").await;
        let second = translator.title_for("uraniumspot", "Uranium Spot Price").await;
        assert_eq!(first, "우라늄 현물 가격");
        assert_eq!(second, "우라늄 현물 가격");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_english() {
        let translator = Translator::new(Arc::new(DownProvider), "test-model");

        let title = translator.title_for("URANIUMSPOT", "Uranium Spot Price").await;
        assert_eq!(title, "Uranium Spot Price");

        let batch = translator
            .translate_batch(&[("URANIUMSPOT".into(), "Uranium Spot Price".into())])
            .await;
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_batch_translation_populates_cache() {
        let provider = Arc::new(CannedProvider::new(
            r#"Sure: {"PURANIUM": "우라늄 가격"} hope that helps"#,
        ));
        let translator = Translator::new(provider.clone(), "test-model");

        let map = translator
            .translate_batch(&[("PURANIUM".into(), "Global price of Uranium".into())])
            .await;
        assert_eq!(map.get("PURANIUM").map(String::as_str), Some("우라늄 가격"));

        // A later single lookup hits the cache instead of the model.
        let title = translator.title_for("PURANIUM", "Global price of Uranium").await;
        assert_eq!(title, "우라늄 가격");
        assert_eq!(provider.call_count(), 1);
    }
}
