//! Blocking client for Supabase's PostgREST, RPC and edge function endpoints.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt::Display;
use std::time::Duration;

use crate::app::errors::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    url: String,
    key: String,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SupabaseClient {{ url: {:?}, key: [REDACTED] }}", self.url)
    }
}

impl SupabaseClient {
    pub fn new(url: &str, anon_key: &str) -> Result<Self, AppError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            key: anon_key.to_string(),
        })
    }

    pub fn from(&self, table: &str) -> Query<'_> {
        Query {
            client: self,
            table: table.to_string(),
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Calls a Postgres function through `/rest/v1/rpc/<name>`.
    pub fn rpc(&self, name: &str, args: &Value) -> Result<Value, AppError> {
        let url = format!("{}/rest/v1/rpc/{name}", self.url);
        log::debug!("supabase rpc {name}");

        let resp = self.request(Method::POST, &url).json(args).send()?;
        read_json(check(resp)?)
    }

    /// Invokes an edge function through `/functions/v1/<name>`.
    pub fn invoke_function(&self, name: &str, body: &Value) -> Result<Value, AppError> {
        let url = format!("{}/functions/v1/{name}", self.url);
        log::debug!("supabase function {name}");

        let resp = self.request(Method::POST, &url).json(body).send()?;
        read_json(check(resp)?)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.url)
    }
}

/// Maps non-2xx responses to `AppError::Supabase`, keeping PostgREST's
/// `message` when the body carries one.
fn check(resp: Response) -> Result<Response, AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_owned)
        })
        .unwrap_or(body);

    Err(AppError::Supabase {
        status: status.as_u16(),
        message,
    })
}

fn read_json(resp: Response) -> Result<Value, AppError> {
    let text = resp.text()?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

/// Quotes a value for use inside `in.(..)` and `ov.{..}` lists.
fn quote(value: &str) -> String {
    let reserved = [',', '(', ')', '{', '}', '"', ' ', ':', '.', '\\'];
    if value.contains(&reserved[..]) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Total row count from a `Content-Range` header such as `0-24/3573` or `*/0`.
pub fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

/// PostgREST query on one table. Filters accumulate as query parameters;
/// a terminal method sends the request.
pub struct Query<'a> {
    client: &'a SupabaseClient,
    table: String,
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
}

impl<'a> Query<'a> {
    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    fn filter(mut self, column: &str, op: &str, value: impl Display) -> Self {
        self.filters
            .push((column.to_string(), format!("{op}.{value}")));
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lte", value)
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gte", value)
    }

    /// Case-insensitive LIKE. `%` in the pattern is sent as PostgREST's `*`.
    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.filter(column, "ilike", pattern.replace('%', "*"))
    }

    /// Array overlap (`&&`).
    pub fn overlaps<S: AsRef<str>>(self, column: &str, values: &[S]) -> Self {
        let list = values
            .iter()
            .map(|v| quote(v.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        self.filter(column, "ov", format!("{{{list}}}"))
    }

    pub fn in_<S: AsRef<str>>(self, column: &str, values: &[S]) -> Self {
        let list = values
            .iter()
            .map(|v| quote(v.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        self.filter(column, "in", format!("({list})"))
    }

    /// Raw disjunction, e.g. `name.ilike.*pizza*,description.ilike.*pizza*`.
    pub fn or(mut self, expression: &str) -> Self {
        self.filters
            .push(("or".to_string(), format!("({expression})")));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{column}.{dir}"));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query string parameters in the order they are sent.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(select) = &self.select {
            params.push(("select".to_string(), select.clone()));
        }
        params.extend(self.filters.iter().cloned());
        if !self.order.is_empty() {
            params.push(("order".to_string(), self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    fn build(&self, method: Method) -> RequestBuilder {
        log::debug!("supabase {method} {} {:?}", self.table, self.params());
        self.client
            .request(method, &self.client.table_url(&self.table))
            .query(&self.params())
    }

    pub fn execute<T: DeserializeOwned>(self) -> Result<Vec<T>, AppError> {
        let resp = self.build(Method::GET).send()?;
        let rows = check(resp)?.json::<Vec<T>>()?;
        Ok(rows)
    }

    pub fn first<T: DeserializeOwned>(self) -> Result<Option<T>, AppError> {
        Ok(self.limit(1).execute::<T>()?.into_iter().next())
    }

    /// Exact row count of the filtered table, read from `Content-Range`.
    pub fn count(self) -> Result<u64, AppError> {
        let resp = self
            .build(Method::HEAD)
            .header("Prefer", "count=exact")
            .send()?;
        let resp = check(resp)?;

        resp.headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| AppError::Supabase {
                status: resp.status().as_u16(),
                message: "missing content-range header".to_string(),
            })
    }

    /// Inserts rows and returns them as stored.
    pub fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        self,
        rows: &B,
    ) -> Result<Vec<T>, AppError> {
        let resp = self
            .build(Method::POST)
            .header("Prefer", "return=representation")
            .json(rows)
            .send()?;
        Ok(check(resp)?.json::<Vec<T>>()?)
    }

    /// Patches every row matching the filters and returns the updated rows.
    pub fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        self,
        patch: &B,
    ) -> Result<Vec<T>, AppError> {
        let resp = self
            .build(Method::PATCH)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()?;
        Ok(check(resp)?.json::<Vec<T>>()?)
    }

    pub fn delete(self) -> Result<(), AppError> {
        let resp = self.build(Method::DELETE).send()?;
        check(resp)?;
        Ok(())
    }
}
