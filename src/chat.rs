//! Restaurant concierge: builds a prompt from the database and a live
//! Google search, then resolves the restaurants the model suggests.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::app::errors::AppError;
use crate::app::App;
use crate::eid::Eid;
use crate::gemini::prompts;
use crate::model::{ChatMessage, ChatRole, Restaurant, RestaurantSummary};
use crate::places;
use crate::storage::StorageManager;

pub const UNAVAILABLE_REPLY: &str = "🔴 Todos os modelos de IA estão temporariamente indisponíveis por excesso de uso. Tente novamente em alguns minutos! Enquanto isso, use a busca por filtros para encontrar restaurantes. 🍽️";
pub const BLANK_REPLY: &str = "Desculpe, deu um branco! Pode repetir?";

const NO_DB_CONTEXT: &str = "Nenhum restaurante encontrado no banco interno.";
const NO_MAPS_CONTEXT: &str = "Nenhum local encontrado no Google Maps para esta busca recente.";

pub const GREETING: &str = "Olá! Sou seu Concierge do Deguste. Onde vamos comer hoje?";
pub const CLEARED: &str = "Histórico apagado! Como posso ajudar você agora?";
pub const SEND_FAILED: &str = "Oops! Tive um problema ao processar sua mensagem. Tente novamente.";

const SESSION_FILE: &str = "chat.json";

static SUGGESTIONS_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```json\n(.*?)\n```").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_restaurants: Option<Vec<Restaurant>>,
}

#[derive(Deserialize)]
struct Suggestions {
    #[serde(default)]
    suggested_ids: Vec<String>,
}

fn db_context(summaries: &[RestaurantSummary]) -> String {
    if summaries.is_empty() {
        return NO_DB_CONTEXT.to_string();
    }

    summaries
        .iter()
        .map(|r| {
            format!(
                "[Origem: Supabase DB, ID: {}] {} - Categorias: {} - Cidade: {} - Atributos: {} - Descrição curta: {}",
                r.id,
                r.name,
                r.categories.join(", "),
                r.city,
                serde_json::to_string(&r.attributes).unwrap_or_default(),
                r.description.as_deref().unwrap_or_default(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn maps_context(found: &[Restaurant]) -> String {
    if found.is_empty() {
        return NO_MAPS_CONTEXT.to_string();
    }

    found
        .iter()
        .map(|r| {
            format!(
                "[Origem: Google Maps, ID: {}] {} - Endereço: {} - Categoria (Google): {} - Preço (1 a 4): {} - Avaliação: {} estrelas",
                r.id,
                r.name,
                r.address,
                r.categories.join(", "),
                r.price_level.map(|p| p.to_string()).unwrap_or_default(),
                r.rating_avg,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn history(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_upper(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

impl App {
    pub fn chat_with_assistant(&self, messages: &[ChatMessage]) -> Result<ChatReply, AppError> {
        let summaries = self.store.restaurant_summaries().unwrap_or_else(|err| {
            log::warn!("concierge context unavailable: {err}");
            Vec::new()
        });

        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        let found = match &self.places {
            Some(provider) if last.chars().count() > self.config.search.min_query_len => {
                places::fetch_places_by_query(
                    provider.as_ref(),
                    &self.config,
                    last,
                    &self.config.default_city,
                    None,
                )
            }
            _ => Vec::new(),
        };

        let prompt = prompts::concierge(&db_context(&summaries), &maps_context(&found), &history(messages));

        let Some(llm) = &self.llm else {
            log::warn!("no language model configured");
            return Ok(ChatReply {
                text: UNAVAILABLE_REPLY.to_string(),
                suggested_restaurants: None,
            });
        };

        let mut text = match llm.generate(&prompt, self.config.gemini.chat_temperature) {
            None => {
                return Ok(ChatReply {
                    text: UNAVAILABLE_REPLY.to_string(),
                    suggested_restaurants: None,
                })
            }
            Some(text) if text.trim().is_empty() => BLANK_REPLY.to_string(),
            Some(text) => text,
        };

        let mut suggested = None;

        let block = SUGGESTIONS_BLOCK
            .captures(&text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        if let Some(block) = block {
            match serde_json::from_str::<Suggestions>(&block) {
                Ok(parsed) => {
                    if !parsed.suggested_ids.is_empty() {
                        suggested = Some(self.resolve_suggestions(&parsed.suggested_ids, found)?);
                    }
                    let stripped = SUGGESTIONS_BLOCK.replace(&text, "").trim().to_string();
                    text = stripped;
                }
                Err(err) => log::error!("failed to parse suggested restaurants: {err}"),
            }
        }

        Ok(ChatReply {
            text,
            suggested_restaurants: suggested,
        })
    }

    /// Places from the live search first, then the rest from the store.
    fn resolve_suggestions(
        &self,
        ids: &[String],
        found: Vec<Restaurant>,
    ) -> Result<Vec<Restaurant>, AppError> {
        let mut resolved: Vec<Restaurant> =
            found.into_iter().filter(|r| ids.contains(&r.id)).collect();

        let remaining: Vec<String> = ids
            .iter()
            .filter(|id| !resolved.iter().any(|r| &r.id == *id))
            .cloned()
            .collect();

        if !remaining.is_empty() {
            resolved.extend(self.store.restaurants_by_ids(&remaining)?);
        }

        Ok(resolved)
    }
}

/// A conversation persisted between runs.
pub struct ChatSession {
    storage: Box<dyn StorageManager>,
    messages: Vec<ChatMessage>,
}

fn message(role: ChatRole, content: &str) -> ChatMessage {
    ChatMessage {
        id: Eid::new().to_string(),
        role,
        content: content.to_string(),
        timestamp: chrono::Utc::now().timestamp_millis(),
        suggested_restaurants: None,
    }
}

impl ChatSession {
    /// Resumes the saved conversation or starts one with a greeting.
    /// An unreadable save starts an empty conversation.
    pub fn open(storage: Box<dyn StorageManager>) -> Self {
        let messages = if storage.exists(SESSION_FILE) {
            storage
                .read(SESSION_FILE)
                .map_err(anyhow::Error::from)
                .and_then(|data| Ok(serde_json::from_slice::<Vec<ChatMessage>>(&data)?))
                .unwrap_or_else(|err| {
                    log::warn!("discarding unreadable chat history: {err}");
                    Vec::new()
                })
        } else {
            vec![message(ChatRole::Assistant, GREETING)]
        };

        Self { storage, messages }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Sends `content` and returns the reply, or `None` for blank input.
    /// Failures become a `system` message instead of an error.
    pub fn send_message(&mut self, app: &App, content: &str) -> Option<&ChatMessage> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }

        self.messages.push(message(ChatRole::User, content));

        let reply = match app.chat_with_assistant(&self.messages) {
            Ok(reply) => ChatMessage {
                suggested_restaurants: reply.suggested_restaurants,
                ..message(ChatRole::Assistant, &reply.text)
            },
            Err(err) => {
                log::error!("failed to send message to the concierge: {err}");
                message(ChatRole::System, SEND_FAILED)
            }
        };

        self.messages.push(reply);
        self.save();
        self.messages.last()
    }

    pub fn clear_history(&mut self) {
        self.messages = vec![message(ChatRole::Assistant, CLEARED)];
        self.save();
    }

    fn save(&self) {
        let result = serde_json::to_vec(&self.messages)
            .map_err(anyhow::Error::from)
            .and_then(|data| Ok(self.storage.write(SESSION_FILE, &data)?));

        if let Err(err) = result {
            log::error!("failed to save chat history: {err}");
        }
    }
}
