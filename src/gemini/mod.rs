//! Gemini access: through the Supabase edge function first, then directly
//! against a cascade of models that have separate free-tier quotas.

pub mod prompts;

use serde_json::{json, Value};
use std::time::Duration;

use crate::app::errors::AppError;
use crate::config::{Config, GeminiConfig};
use crate::model::SearchFilters;
use crate::supabase::SupabaseClient;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Prompt the proxy answers with the model list instead of a completion.
pub const LIST_MODELS: &str = "LIST_MODELS";

const QUOTA_MARKERS: [&str; 2] = ["RESOURCE_EXHAUSTED", "Quota exceeded"];

pub trait LanguageModel: Send + Sync {
    /// Completes `prompt`.
    ///
    /// `None` means no model could answer (quota, network, missing key).
    /// `Some("")` means a model answered with nothing usable.
    fn generate(&self, prompt: &str, temperature: f32) -> Option<String>;

    fn name(&self) -> &'static str;
}

pub fn is_quota_message(text: &str) -> bool {
    QUOTA_MARKERS.iter().any(|m| text.contains(m))
}

/// `candidates[0].content.parts[0].text` of a generateContent response.
pub fn extract_text(response: &Value) -> Option<&str> {
    response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
}

/// Removes Markdown code fences around a JSON answer.
pub fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// One model call, kept behind a trait so the fallback logic runs without
/// the network.
pub trait GenerativeApi: Send + Sync {
    /// One generateContent call. Returns the HTTP status and the decoded body.
    fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<(u16, Value), AppError>;

    fn list_models(&self) -> Result<Value, AppError>;
}

/// Supabase edge function invocation.
pub trait EdgeFunction: Send + Sync {
    fn invoke(&self, name: &str, body: &Value) -> Result<Value, AppError>;
}

impl EdgeFunction for SupabaseClient {
    fn invoke(&self, name: &str, body: &Value) -> Result<Value, AppError> {
        self.invoke_function(name, body)
    }
}

/// Direct REST client for the Gemini API.
pub struct GeminiDirect {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl GeminiDirect {
    pub fn new(api_key: &str) -> Result<Self, AppError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

impl GenerativeApi for GeminiDirect {
    fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<(u16, Value), AppError> {
        let url = format!("{API_BASE}/{model}:generateContent");
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": temperature }
        });

        let resp = self
            .client
            .post(url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()?;

        let status = resp.status().as_u16();
        let text = resp.text()?;
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok((status, value))
    }

    fn list_models(&self) -> Result<Value, AppError> {
        let resp = self
            .client
            .get(API_BASE)
            .query(&[("key", &self.api_key)])
            .send()?;
        Ok(resp.json()?)
    }
}

/// Tries each model in order and returns the first usable text.
pub fn cascade(
    api: &dyn GenerativeApi,
    models: &[String],
    prompt: &str,
    temperature: f32,
) -> Option<String> {
    for model in models {
        log::info!("trying gemini model {model}");

        let (status, body) = match api.generate_content(model, prompt, temperature) {
            Ok(reply) => reply,
            Err(err) => {
                log::warn!("model {model} request failed: {err}");
                continue;
            }
        };

        if status == 429 {
            log::warn!("model {model} rate-limited (429), trying next");
            continue;
        }

        match extract_text(&body) {
            Some(text) if !text.is_empty() && !is_quota_message(text) => {
                log::info!("model {model} answered");
                return Some(text.to_string());
            }
            _ => log::warn!("model {model} returned no usable text, trying next"),
        }
    }

    None
}

/// Server half of the `gemini-proxy` edge function: `{text}` from the
/// primary model, retried once on the secondary model after a 429.
pub struct GeminiProxy {
    api: Box<dyn GenerativeApi>,
}

impl GeminiProxy {
    pub fn new(api: Box<dyn GenerativeApi>) -> Self {
        Self { api }
    }

    pub fn answer(&self, prompt: &str, models: &[String]) -> Result<Value, AppError> {
        if prompt == LIST_MODELS {
            return self.api.list_models();
        }

        let primary = models
            .first()
            .ok_or_else(|| AppError::invalid_input("no proxy model configured"))?;

        let (mut status, mut body) = self.api.generate_content(primary, prompt, 0.7)?;

        if status == 429 {
            if let Some(secondary) = models.get(1) {
                log::warn!("model {primary} quota exceeded, falling back to {secondary}");
                (status, body) = self.api.generate_content(secondary, prompt, 0.7)?;
            }
        }

        log::debug!("proxy status={status}");

        let text = extract_text(&body)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("Erro ao interpretar. Gemini Response: {body}"));

        Ok(json!({ "text": text }))
    }
}

/// Edge function first, direct cascade when it fails or reports quota.
pub struct Gemini {
    edge: Option<Box<dyn EdgeFunction>>,
    direct: Option<Box<dyn GenerativeApi>>,
    config: GeminiConfig,
}

impl Gemini {
    pub fn new(
        edge: Option<Box<dyn EdgeFunction>>,
        direct: Option<Box<dyn GenerativeApi>>,
        config: GeminiConfig,
    ) -> Self {
        Self {
            edge,
            direct,
            config,
        }
    }

    fn via_proxy(&self, edge: &dyn EdgeFunction, prompt: &str) -> Option<String> {
        match edge.invoke(&self.config.proxy_function, &json!({ "prompt": prompt })) {
            Ok(data) => match data.get("text").and_then(|t| t.as_str()) {
                Some(text) if is_quota_message(text) => {
                    log::warn!("gemini proxy quota exceeded, trying direct models");
                    None
                }
                Some(text) => Some(text.to_string()),
                None => Some(String::new()),
            },
            Err(err) => {
                log::warn!("gemini proxy failed, trying direct models: {err}");
                None
            }
        }
    }
}

impl LanguageModel for Gemini {
    fn generate(&self, prompt: &str, temperature: f32) -> Option<String> {
        if let Some(edge) = &self.edge {
            if let Some(text) = self.via_proxy(edge.as_ref(), prompt) {
                return Some(text);
            }
        }

        match &self.direct {
            Some(direct) => cascade(
                direct.as_ref(),
                &self.config.fallback_models,
                prompt,
                temperature,
            ),
            None => {
                log::warn!("no gemini api key, direct models skipped");
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Asks the model to turn a free-text query into filters.
///
/// Blank queries, missing answers and unparseable JSON all yield `None`.
pub fn interpret_search_query(
    llm: &dyn LanguageModel,
    config: &Config,
    query: &str,
) -> Option<SearchFilters> {
    if query.trim().is_empty() {
        return None;
    }

    let prompt = prompts::search_interpretation(query);
    let text = llm.generate(&prompt, config.gemini.search_temperature)?;
    if text.trim().is_empty() {
        log::warn!("model={} empty interpretation for {query:?}", llm.name());
        return None;
    }

    match serde_json::from_str::<SearchFilters>(&strip_fences(&text)) {
        Ok(filters) => {
            log::info!("interpreted {query:?} as {filters:?}");
            Some(filters)
        }
        Err(err) => {
            log::error!("model={} returned invalid filters: {err}", llm.name());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SortBy;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<String>>>;

    /// Answers generateContent calls from a queue and records the models hit.
    struct ScriptedApi {
        replies: Mutex<VecDeque<Result<(u16, Value), AppError>>>,
        calls: Calls,
    }

    impl ScriptedApi {
        fn new(replies: Vec<Result<(u16, Value), AppError>>) -> (Self, Calls) {
            let calls = Calls::default();
            let api = Self {
                replies: Mutex::new(replies.into()),
                calls: calls.clone(),
            };
            (api, calls)
        }
    }

    impl GenerativeApi for ScriptedApi {
        fn generate_content(
            &self,
            model: &str,
            _prompt: &str,
            _temperature: f32,
        ) -> Result<(u16, Value), AppError> {
            self.calls.lock().unwrap().push(model.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::Unavailable("script exhausted".to_string())))
        }

        fn list_models(&self) -> Result<Value, AppError> {
            self.calls.lock().unwrap().push(LIST_MODELS.to_string());
            Ok(json!({ "models": [{ "name": "models/gemini-2.5-flash" }] }))
        }
    }

    struct ScriptedEdge(Result<Value, AppError>, Calls);

    impl EdgeFunction for ScriptedEdge {
        fn invoke(&self, name: &str, body: &Value) -> Result<Value, AppError> {
            self.1.lock().unwrap().push(format!("{name}:{}", body["prompt"]));
            match &self.0 {
                Ok(value) => Ok(value.clone()),
                Err(err) => Err(AppError::Unavailable(err.to_string())),
            }
        }
    }

    fn answer(text: &str) -> Result<(u16, Value), AppError> {
        Ok((
            200,
            json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }),
        ))
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    struct Canned(Option<&'static str>);

    impl LanguageModel for Canned {
        fn generate(&self, _prompt: &str, _temperature: f32) -> Option<String> {
            self.0.map(str::to_owned)
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    #[test]
    fn test_extract_text() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "olá" }] } }]
        });
        assert_eq!(extract_text(&body), Some("olá"));
        assert_eq!(extract_text(&json!({ "error": { "code": 429 } })), None);
    }

    #[test]
    fn test_quota_and_fences() {
        assert!(is_quota_message("429 RESOURCE_EXHAUSTED"));
        assert!(is_quota_message("Quota exceeded for metric"));
        assert!(!is_quota_message("tudo certo"));
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn test_interpret_search_query() {
        let config = Config::default();
        let llm = Canned(Some(
            "```json\n{\"categories\":[\"Japonesa\"],\"price_level\":1,\"sort_by\":\"rating\"}\n```",
        ));

        let filters = interpret_search_query(&llm, &config, "sushi barato").unwrap();
        assert_eq!(filters.categories, Some(vec!["Japonesa".to_string()]));
        assert_eq!(filters.price_level, Some(1));
        assert_eq!(filters.sort_by, Some(SortBy::Rating));
    }

    #[test]
    fn test_interpret_failures() {
        let config = Config::default();
        assert!(interpret_search_query(&Canned(Some("{}")), &config, "   ").is_none());
        assert!(interpret_search_query(&Canned(None), &config, "pizza").is_none());
        assert!(interpret_search_query(&Canned(Some("")), &config, "pizza").is_none());
        assert!(interpret_search_query(&Canned(Some("not json")), &config, "pizza").is_none());
    }

    #[test]
    fn test_cascade_skips_unusable_models() {
        let (api, calls) = ScriptedApi::new(vec![
            Ok((429, json!({ "error": { "code": 429 } }))),
            answer("429 RESOURCE_EXHAUSTED"),
            Err(AppError::Unavailable("connection reset".to_string())),
            answer(""),
            answer("Pizzaria Bella!"),
        ]);
        let list = models(&["a", "b", "c", "d", "e", "f"]);

        assert_eq!(cascade(&api, &list, "oi", 0.7).as_deref(), Some("Pizzaria Bella!"));
        assert_eq!(*calls.lock().unwrap(), models(&["a", "b", "c", "d", "e"]));
    }

    #[test]
    fn test_cascade_exhausted() {
        let (api, calls) = ScriptedApi::new(vec![Ok((429, json!({}))), answer("Quota exceeded")]);

        assert_eq!(cascade(&api, &models(&["a", "b"]), "oi", 0.7), None);
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_gemini_prefers_edge_function() {
        let edge_calls = Calls::default();
        let (api, api_calls) = ScriptedApi::new(vec![answer("direto")]);
        let gemini = Gemini::new(
            Some(Box::new(ScriptedEdge(Ok(json!({ "text": "via proxy" })), edge_calls.clone()))),
            Some(Box::new(api)),
            GeminiConfig::default(),
        );

        assert_eq!(gemini.generate("oi", 0.1).as_deref(), Some("via proxy"));
        assert_eq!(*edge_calls.lock().unwrap(), vec!["gemini-proxy:\"oi\"".to_string()]);
        assert!(api_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_gemini_falls_back_to_direct_models() {
        let config = GeminiConfig::default();

        // quota text from the edge function
        let (api, api_calls) = ScriptedApi::new(vec![Ok((429, json!({}))), answer("direto")]);
        let gemini = Gemini::new(
            Some(Box::new(ScriptedEdge(
                Ok(json!({ "text": "Quota exceeded for gemini-2.5-flash" })),
                Calls::default(),
            ))),
            Some(Box::new(api)),
            config.clone(),
        );
        assert_eq!(gemini.generate("oi", 0.1).as_deref(), Some("direto"));
        assert_eq!(*api_calls.lock().unwrap(), config.fallback_models[..2].to_vec());

        // edge function error
        let (api, _) = ScriptedApi::new(vec![answer("direto")]);
        let gemini = Gemini::new(
            Some(Box::new(ScriptedEdge(
                Err(AppError::Unavailable("500".to_string())),
                Calls::default(),
            ))),
            Some(Box::new(api)),
            config.clone(),
        );
        assert_eq!(gemini.generate("oi", 0.1).as_deref(), Some("direto"));

        // no direct key
        let gemini = Gemini::new(
            Some(Box::new(ScriptedEdge(
                Err(AppError::Unavailable("500".to_string())),
                Calls::default(),
            ))),
            None,
            config.clone(),
        );
        assert_eq!(gemini.generate("oi", 0.1), None);

        // answer without text reads as blank
        let gemini = Gemini::new(
            Some(Box::new(ScriptedEdge(Ok(json!({})), Calls::default()))),
            None,
            config,
        );
        assert_eq!(gemini.generate("oi", 0.1).as_deref(), Some(""));
    }

    #[test]
    fn test_proxy_retries_secondary_on_429() {
        let (api, calls) = ScriptedApi::new(vec![Ok((429, json!({}))), answer("olá")]);
        let proxy = GeminiProxy::new(Box::new(api));

        let reply = proxy.answer("oi", &models(&["primary", "secondary"])).unwrap();
        assert_eq!(reply, json!({ "text": "olá" }));
        assert_eq!(*calls.lock().unwrap(), models(&["primary", "secondary"]));
    }

    #[test]
    fn test_proxy_edge_cases() {
        let (api, calls) = ScriptedApi::new(vec![Ok((500, json!({ "error": "boom" })))]);
        let proxy = GeminiProxy::new(Box::new(api));

        let listed = proxy.answer(LIST_MODELS, &models(&["primary"])).unwrap();
        assert_eq!(listed["models"][0]["name"], "models/gemini-2.5-flash");

        let reply = proxy.answer("oi", &models(&["primary"])).unwrap();
        assert!(reply["text"]
            .as_str()
            .unwrap()
            .starts_with("Erro ao interpretar. Gemini Response:"));
        assert_eq!(*calls.lock().unwrap(), models(&[LIST_MODELS, "primary"]));

        let err = proxy.answer("oi", &[]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
