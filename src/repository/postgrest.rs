//! Hosted store over a PostgREST endpoint
//!
//! Speaks the REST dialect of the hosted database: tables `Term` and
//! `Translation`, filters in the query string, embedded translations via
//! `select=*,Translation(*)`. Position batches go out as concurrent PATCH
//! requests, one per row, so a batch is not atomic.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{DomainError, DomainResult, Term, TermCard, Translation};
use crate::ranking::{sort_translations, NewRankedItem, PositionUpdate};
use crate::session::Session;
use super::term_repo::escape_like;
use super::traits::{PersistenceService, Repository, TermCatalog};

const TERM_TABLE: &str = "Term";
const TRANSLATION_TABLE: &str = "Translation";

/// Characters left readable in query values
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'*');

#[derive(Debug, Deserialize)]
struct TranslationRow {
    id: i64,
    term_id: i64,
    text: String,
    #[serde(default)]
    is_preferred: Option<bool>,
    #[serde(default)]
    sort_order: Option<i32>,
    #[serde(default)]
    usage: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TermRow {
    id: i64,
    name: String,
    #[serde(default)]
    aliases: Option<Vec<String>>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(rename = "Translation", default)]
    translations: Vec<TranslationRow>,
}

#[derive(Serialize)]
struct TranslationInsert<'a> {
    term_id: i64,
    text: &'a str,
    usage: Option<&'a str>,
    sort_order: i32,
    is_preferred: bool,
}

#[derive(Deserialize)]
struct IdRow {
    id: i64,
}

/// RFC 3339 timestamps from the server, as epoch millis
fn parse_timestamp(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|v| chrono::DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.timestamp_millis())
}

impl From<TranslationRow> for Translation {
    fn from(row: TranslationRow) -> Self {
        Translation {
            id: row.id,
            term_id: row.term_id,
            text: row.text,
            is_preferred: row.is_preferred,
            sort_order: row.sort_order,
            usage: row.usage,
            created_at: parse_timestamp(row.created_at.as_deref()),
        }
    }
}

impl TermRow {
    fn into_card(self) -> TermCard {
        let mut translations: Vec<Translation> =
            self.translations.into_iter().map(Translation::from).collect();
        sort_translations(&mut translations);
        TermCard {
            term: Term {
                id: self.id,
                name: self.name,
                aliases: self.aliases.unwrap_or_default(),
                note: self.note,
                created_at: parse_timestamp(self.created_at.as_deref()),
            },
            translations,
        }
    }

    fn into_term(self) -> Term {
        self.into_card().term
    }
}

/// Quote a value for use inside a PostgREST logic tree
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// `ilike` pattern matching `value` literally; `*` is the only wildcard
/// PostgREST adds, `%` and `_` are escaped as in the SQLite store
fn ilike_literal(value: &str) -> String {
    escape_like(&value.replace('*', ""))
}

/// Name prefix (case-insensitive) or exact alias
fn search_filter(query: &str) -> String {
    let pattern = format!("{}*", ilike_literal(query));
    format!("or=({})", encode(&format!(
        "name.ilike.{},aliases.cs.{{{}}}",
        quote(&pattern),
        quote(query)
    )))
}

/// Name equality (case-insensitive) or exact alias
fn lookup_filter(name: &str) -> String {
    format!("or=({})", encode(&format!(
        "name.ilike.{},aliases.cs.{{{}}}",
        quote(&ilike_literal(name)),
        quote(name)
    )))
}

fn transport(e: reqwest::Error) -> DomainError {
    DomainError::Persistence(format!("request failed: {}", e))
}

fn status_error(status: StatusCode, body: &str) -> DomainError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DomainError::PermissionDenied(format!("{}: {}", status, body))
        }
        StatusCode::NOT_FOUND => DomainError::NotFound(body.to_string()),
        StatusCode::CONFLICT => DomainError::Conflict(body.to_string()),
        s if s.is_client_error() => DomainError::InvalidInput(format!("{}: {}", status, body)),
        _ => DomainError::Persistence(format!("{}: {}", status, body)),
    }
}

async fn send(
    client: &Client,
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
) -> DomainResult<String> {
    debug!("{} {}", method, url);
    let mut req = client.request(method, &url).headers(headers);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let resp = req.send().await.map_err(transport)?;
    let status = resp.status();
    let text = resp.text().await.map_err(transport)?;
    if !status.is_success() {
        warn!("{} from {}", status, url);
        return Err(status_error(status, &text));
    }
    Ok(text)
}

fn parse<T: for<'de> Deserialize<'de>>(body: &str) -> DomainResult<Vec<T>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(body).map_err(|e| DomainError::Persistence(format!("bad response: {}", e)))
}

/// REST client for the hosted term database
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: String,
    session: Session,
}

impl PostgrestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, session: Session) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            session,
        }
    }

    fn table_url(&self, table: &str, query: &[String]) -> String {
        let mut url = format!("{}/rest/v1/{}", self.base_url, table);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    /// The signed-in user's token when present, otherwise the anonymous key
    fn headers(&self, representation: bool) -> DomainResult<HeaderMap> {
        let header = |v: &str| {
            HeaderValue::from_str(v).map_err(|e| DomainError::InvalidInput(format!("invalid header: {}", e)))
        };
        let bearer = self.session.access_token().unwrap_or_else(|| self.api_key.clone());

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("apikey"), header(&self.api_key)?);
        headers.insert(AUTHORIZATION, header(&format!("Bearer {}", bearer))?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if representation {
            headers.insert(HeaderName::from_static("prefer"), HeaderValue::from_static("return=representation"));
        }
        Ok(headers)
    }

    async fn get_terms(&self, query: Vec<String>) -> DomainResult<Vec<TermRow>> {
        let url = self.table_url(TERM_TABLE, &query);
        let body = send(&self.client, Method::GET, url, self.headers(false)?, None).await?;
        parse(&body)
    }

    async fn get_cards(&self, filter: String) -> DomainResult<Vec<TermCard>> {
        let rows = self
            .get_terms(vec!["select=*,Translation(*)".to_string(), filter, "order=name".to_string()])
            .await?;
        Ok(rows.into_iter().map(TermRow::into_card).collect())
    }
}

#[async_trait]
impl Repository<Term> for PostgrestStore {
    async fn create(&self, entity: &Term) -> DomainResult<Term> {
        let url = self.table_url(TERM_TABLE, &[]);
        let body = json!({ "name": entity.name, "aliases": entity.aliases, "note": entity.note });
        let text = send(&self.client, Method::POST, url, self.headers(true)?, Some(body)).await?;
        parse::<TermRow>(&text)?
            .into_iter()
            .next()
            .map(TermRow::into_term)
            .ok_or_else(|| DomainError::Persistence("insert returned no row".to_string()))
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Term>> {
        let rows = self.get_terms(vec![format!("id=eq.{}", id)]).await?;
        Ok(rows.into_iter().next().map(TermRow::into_term))
    }

    async fn list(&self) -> DomainResult<Vec<Term>> {
        let rows = self.get_terms(vec!["order=created_at.desc".to_string()]).await?;
        Ok(rows.into_iter().map(TermRow::into_term).collect())
    }

    async fn update(&self, entity: &Term) -> DomainResult<Term> {
        let url = self.table_url(TERM_TABLE, &[format!("id=eq.{}", entity.id)]);
        let body = json!({ "name": entity.name, "aliases": entity.aliases, "note": entity.note });
        let text = send(&self.client, Method::PATCH, url, self.headers(true)?, Some(body)).await?;
        parse::<TermRow>(&text)?
            .into_iter()
            .next()
            .map(TermRow::into_term)
            .ok_or_else(|| DomainError::NotFound(format!("Term {} not found", entity.id)))
    }

    async fn delete(&self, id: i64) -> DomainResult<()> {
        let url = self.table_url(TERM_TABLE, &[format!("id=eq.{}", id)]);
        let text = send(&self.client, Method::DELETE, url, self.headers(true)?, None).await?;
        if parse::<IdRow>(&text)?.is_empty() {
            return Err(DomainError::NotFound(format!("Term {} not found", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TermCatalog for PostgrestStore {
    async fn search_cards(&self, query: &str) -> DomainResult<Vec<TermCard>> {
        self.get_cards(search_filter(query)).await
    }

    async fn lookup_cards(&self, name: &str) -> DomainResult<Vec<TermCard>> {
        self.get_cards(lookup_filter(name)).await
    }
}

#[async_trait]
impl PersistenceService for PostgrestStore {
    async fn fetch_ranked_items(&self, parent_id: i64) -> DomainResult<Vec<Translation>> {
        let url = self.table_url(TRANSLATION_TABLE, &[format!("term_id=eq.{}", parent_id)]);
        let body = send(&self.client, Method::GET, url, self.headers(false)?, None).await?;
        Ok(parse::<TranslationRow>(&body)?.into_iter().map(Translation::from).collect())
    }

    async fn bulk_upsert_positions(&self, updates: &[PositionUpdate]) -> Vec<DomainResult<()>> {
        let headers = match self.headers(true) {
            Ok(headers) => headers,
            Err(e) => return updates.iter().map(|_| Err(e.clone())).collect(),
        };

        let handles: Vec<_> = updates
            .iter()
            .map(|update| {
                let client = self.client.clone();
                let headers = headers.clone();
                let id = update.id;
                let url = self.table_url(TRANSLATION_TABLE, &[format!("id=eq.{}", id)]);
                let body = json!({ "sort_order": update.position, "is_preferred": update.preferred });
                tokio::spawn(async move {
                    let text = send(&client, Method::PATCH, url, headers, Some(body)).await?;
                    if parse::<IdRow>(&text)?.is_empty() {
                        return Err(DomainError::NotFound(format!("Translation {} not found", id)));
                    }
                    Ok(())
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(result) => result,
                Err(e) => Err(DomainError::Internal(format!("write task failed: {}", e))),
            });
        }
        results
    }

    async fn delete_item(&self, id: i64) -> DomainResult<()> {
        let url = self.table_url(TRANSLATION_TABLE, &[format!("id=eq.{}", id)]);
        let text = send(&self.client, Method::DELETE, url, self.headers(true)?, None).await?;
        if parse::<IdRow>(&text)?.is_empty() {
            return Err(DomainError::NotFound(format!("Translation {} not found", id)));
        }
        Ok(())
    }

    async fn delete_items_for_parent(&self, parent_id: i64) -> DomainResult<()> {
        let url = self.table_url(TRANSLATION_TABLE, &[format!("term_id=eq.{}", parent_id)]);
        send(&self.client, Method::DELETE, url, self.headers(false)?, None).await?;
        Ok(())
    }

    async fn insert_items(&self, parent_id: i64, items: &[NewRankedItem]) -> DomainResult<Vec<i64>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<TranslationInsert> = items
            .iter()
            .map(|item| TranslationInsert {
                term_id: parent_id,
                text: &item.text,
                usage: item.usage.as_deref(),
                sort_order: item.position,
                is_preferred: item.preferred,
            })
            .collect();
        let body = serde_json::to_value(&rows).map_err(|e| DomainError::Internal(e.to_string()))?;
        let url = self.table_url(TRANSLATION_TABLE, &[]);
        let text = send(&self.client, Method::POST, url, self.headers(true)?, Some(body)).await?;
        Ok(parse::<IdRow>(&text)?.into_iter().map(|r| r.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuthSession;

    #[test]
    fn test_search_filter_quotes_and_encodes() {
        assert_eq!(
            search_filter("api"),
            "or=(name.ilike.%22api*%22%2Caliases.cs.%7B%22api%22%7D)"
        );
        // Quotes inside the query are escaped before encoding
        assert!(search_filter("a\"b").contains("a%5C%22b"));
    }

    #[test]
    fn test_like_wildcards_are_literal() {
        // `100%` becomes `100\%` for LIKE, then `\` is doubled inside the quotes
        let filter = search_filter("100%");
        assert!(filter.starts_with("or=(name.ilike.%22100%5C%5C%25*%22"));
        assert!(filter.ends_with("aliases.cs.%7B%22100%25%22%7D)"));

        let filter = lookup_filter("snake_case");
        assert!(filter.starts_with("or=(name.ilike.%22snake%5C%5C_case%22"));
        assert!(filter.contains("cs.%7B%22snake_case%22%7D"));
    }

    #[test]
    fn test_table_url() {
        let store = PostgrestStore::new("https://db.example.com/", "anon", Session::signed_out());
        assert_eq!(
            store.table_url(TRANSLATION_TABLE, &["term_id=eq.4".to_string()]),
            "https://db.example.com/rest/v1/Translation?term_id=eq.4"
        );
        assert_eq!(store.table_url(TERM_TABLE, &[]), "https://db.example.com/rest/v1/Term");
    }

    #[test]
    fn test_headers_prefer_session_token() {
        let session = Session::signed_out();
        let store = PostgrestStore::new("https://db.example.com", "anon", session.clone());
        let headers = store.headers(false).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer anon");
        assert!(headers.get("prefer").is_none());

        session.sign_in(AuthSession::new("editor", "jwt"));
        let headers = store.headers(true).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer jwt");
        assert_eq!(headers.get("apikey").unwrap(), "anon");
        assert_eq!(headers.get("prefer").unwrap(), "return=representation");
    }

    #[test]
    fn test_term_row_into_card_sorts_translations() {
        let body = r#"[{
            "id": 4, "name": "context", "aliases": null,
            "created_at": "2024-03-01T12:00:00+00:00",
            "Translation": [
                {"id": 5, "term_id": 4, "text": "a", "is_preferred": null, "usage": null},
                {"id": 1, "term_id": 4, "text": "b", "sort_order": 2},
                {"id": 3, "term_id": 4, "text": "c", "sort_order": 0, "is_preferred": true}
            ]
        }]"#;
        let rows: Vec<TermRow> = parse(body).unwrap();
        let card = rows.into_iter().next().unwrap().into_card();
        assert!(card.term.aliases.is_empty());
        assert_eq!(card.term.created_at, Some(1_709_294_400_000));
        let ids: Vec<i64> = card.translations.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 1, 5]);
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(status_error(StatusCode::UNAUTHORIZED, ""), DomainError::PermissionDenied(_)));
        assert!(matches!(status_error(StatusCode::CONFLICT, ""), DomainError::Conflict(_)));
        assert!(matches!(status_error(StatusCode::BAD_GATEWAY, ""), DomainError::Persistence(_)));
        assert!(parse::<IdRow>("").unwrap().is_empty());
    }
}
