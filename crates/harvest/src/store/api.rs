//! MediaWiki Action API client implementing both collaborator traits.
//!
//! One client talks to two endpoints: the wiki hosting the article text
//! and the repository holding the structured records. Transport failures
//! and rate-limit responses surface as `Transient`; auth, permission and
//! malformed-claim responses surface as `Permanent`.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::attribute::AttributeId;
use crate::error::{HarvestError, Result};
use crate::value::CanonicalValue;

use super::{Claim, ClaimValue, PageText, Record, StructuredStore, TextSource};

/// Default article-text API endpoint.
const DEFAULT_WIKI_API: &str = "https://en.wikipedia.org/w/api.php";

/// Default structured-store API endpoint.
const DEFAULT_REPO_API: &str = "https://www.wikidata.org/w/api.php";

/// Property used to attach a provenance reference URL to a written claim.
const REFERENCE_URL_PROPERTY: &str = "P854";

static LEADING_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})").unwrap());

/// Configuration for the API client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Endpoint of the wiki hosting article text.
    pub wiki_endpoint: String,
    /// Endpoint of the structured-store repository.
    pub repo_endpoint: String,
    /// Sitelink key linking article titles to records (e.g. "enwiki").
    pub site: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// CSRF token for writes. Fetched on demand when absent.
    pub edit_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            wiki_endpoint: std::env::var("HARVEST_WIKI_API")
                .unwrap_or_else(|_| DEFAULT_WIKI_API.to_string()),
            repo_endpoint: std::env::var("HARVEST_REPO_API")
                .unwrap_or_else(|_| DEFAULT_REPO_API.to_string()),
            site: "enwiki".to_string(),
            user_agent: "harvest/0.1 (https://github.com/scotthandley/harvest)".to_string(),
            timeout_secs: 30,
            edit_token: None,
        }
    }
}

/// MediaWiki Action API client.
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
}

impl ApiClient {
    /// Create a client with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(ApiConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HarvestError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .get(endpoint)
            .query(params)
            .send()
            .map_err(map_transport)?;
        Self::parse_response(response)
    }

    fn post_json(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .post(endpoint)
            .form(params)
            .send()
            .map_err(map_transport)?;
        Self::parse_response(response)
    }

    fn parse_response(response: reqwest::blocking::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status, &body));
        }
        let value: Value = response
            .json()
            .map_err(|e| HarvestError::Permanent(format!("malformed API response: {}", e)))?;
        if let Some(error) = value.get("error") {
            return Err(classify_api_error(error));
        }
        Ok(value)
    }

    fn fetch_csrf_token(&self) -> Result<String> {
        let value = self.get_json(
            &self.config.repo_endpoint,
            &[
                ("action", "query"),
                ("format", "json"),
                ("meta", "tokens"),
                ("type", "csrf"),
            ],
        )?;
        value
            .pointer("/query/tokens/csrftoken")
            .and_then(Value::as_str)
            .map(|t| t.to_string())
            .ok_or_else(|| HarvestError::Permanent("no CSRF token in response".to_string()))
    }
}

impl TextSource for ApiClient {
    fn fetch_text(&self, title: &str) -> Result<Option<PageText>> {
        let value = self.get_json(
            &self.config.wiki_endpoint,
            &[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("rvslots", "main"),
                ("titles", title),
            ],
        )?;

        let page = match value.pointer("/query/pages/0") {
            Some(page) => page,
            None => return Ok(None),
        };
        if page.get("missing").is_some() || page.get("invalid").is_some() {
            return Ok(None);
        }
        let content = page
            .pointer("/revisions/0/slots/main/content")
            .and_then(Value::as_str)
            .ok_or_else(|| HarvestError::Permanent(format!("no revision content for '{}'", title)))?;
        Ok(Some(PageText::new(title, content)))
    }

    fn expand_templates(&self, title: &str, text: &str) -> Result<String> {
        let value = self.get_json(
            &self.config.wiki_endpoint,
            &[
                ("action", "expandtemplates"),
                ("format", "json"),
                ("prop", "wikitext"),
                ("title", title),
                ("text", text),
            ],
        )?;
        value
            .pointer("/expandtemplates/wikitext")
            .and_then(Value::as_str)
            .map(|t| t.to_string())
            .ok_or_else(|| HarvestError::Permanent("no expanded wikitext in response".to_string()))
    }

    fn collection(&self, name: &str) -> Result<Vec<String>> {
        let cmtitle = if name.starts_with("Category:") {
            name.to_string()
        } else {
            format!("Category:{}", name)
        };

        let mut titles = Vec::new();
        let mut continue_from: Option<String> = None;
        loop {
            let mut params = vec![
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("list", "categorymembers"),
                ("cmtitle", cmtitle.as_str()),
                ("cmnamespace", "0"),
                ("cmlimit", "500"),
            ];
            if let Some(cont) = &continue_from {
                params.push(("cmcontinue", cont.as_str()));
            }
            let value = self.get_json(&self.config.wiki_endpoint, &params)?;

            if let Some(members) = value
                .pointer("/query/categorymembers")
                .and_then(Value::as_array)
            {
                titles.extend(
                    members
                        .iter()
                        .filter_map(|m| m.get("title").and_then(Value::as_str))
                        .map(|t| t.to_string()),
                );
            }

            match value
                .pointer("/continue/cmcontinue")
                .and_then(Value::as_str)
            {
                Some(cont) => continue_from = Some(cont.to_string()),
                None => break,
            }
        }
        Ok(titles)
    }
}

impl StructuredStore for ApiClient {
    fn record_for(&self, title: &str) -> Result<Option<Record>> {
        let value = self.get_json(
            &self.config.repo_endpoint,
            &[
                ("action", "wbgetentities"),
                ("format", "json"),
                ("sites", self.config.site.as_str()),
                ("titles", title),
                ("props", "claims|labels"),
                ("languages", "en"),
            ],
        )?;

        let entity = match value
            .get("entities")
            .and_then(Value::as_object)
            .and_then(|entities| entities.values().next())
        {
            Some(entity) => entity,
            None => return Ok(None),
        };
        if entity.get("missing").is_some() {
            return Ok(None);
        }
        let id = match entity.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => return Ok(None),
        };

        let label = entity
            .pointer("/labels/en/value")
            .and_then(Value::as_str)
            .map(|l| l.to_string());

        let mut claims: IndexMap<String, Vec<Claim>> = IndexMap::new();
        if let Some(claim_map) = entity.get("claims").and_then(Value::as_object) {
            for (property, statements) in claim_map {
                let parsed: Vec<Claim> = statements
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|statement| parse_claim(property, statement))
                            .collect()
                    })
                    .unwrap_or_default();
                if !parsed.is_empty() {
                    claims.insert(property.clone(), parsed);
                }
            }
        }

        Ok(Some(Record { id, label, claims }))
    }

    fn label_of(&self, id: &str) -> Result<Option<String>> {
        let value = self.get_json(
            &self.config.repo_endpoint,
            &[
                ("action", "wbgetentities"),
                ("format", "json"),
                ("ids", id),
                ("props", "labels"),
                ("languages", "en"),
            ],
        )?;
        Ok(value
            .pointer(&format!("/entities/{}/labels/en/value", id))
            .and_then(Value::as_str)
            .map(|l| l.to_string()))
    }

    fn add_claim(
        &self,
        record_id: &str,
        attribute: &AttributeId,
        value: &CanonicalValue,
        summary: &str,
        reference: Option<&str>,
    ) -> Result<()> {
        let token = match &self.config.edit_token {
            Some(token) => token.clone(),
            None => self.fetch_csrf_token()?,
        };
        let encoded = claim_value_json(value)?;

        let response = self.post_json(
            &self.config.repo_endpoint,
            &[
                ("action", "wbcreateclaim"),
                ("format", "json"),
                ("entity", record_id),
                ("property", attribute.as_str()),
                ("snaktype", "value"),
                ("value", encoded.as_str()),
                ("summary", summary),
                ("token", token.as_str()),
            ],
        )?;

        if let Some(reference_url) = reference {
            if let Some(claim_id) = response.pointer("/claim/id").and_then(Value::as_str) {
                let snaks = json!({
                    REFERENCE_URL_PROPERTY: [{
                        "snaktype": "value",
                        "property": REFERENCE_URL_PROPERTY,
                        "datavalue": {"type": "string", "value": reference_url}
                    }]
                })
                .to_string();
                self.post_json(
                    &self.config.repo_endpoint,
                    &[
                        ("action", "wbsetreference"),
                        ("format", "json"),
                        ("statement", claim_id),
                        ("snaks", snaks.as_str()),
                        ("token", token.as_str()),
                    ],
                )?;
            }
        }
        Ok(())
    }
}

fn map_transport(error: reqwest::Error) -> HarvestError {
    HarvestError::Transient(format!("request failed: {}", error))
}

fn classify_status(status: StatusCode, body: &str) -> HarvestError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        HarvestError::Transient(format!("API returned {}: {}", status, body))
    } else {
        HarvestError::Permanent(format!("API returned {}: {}", status, body))
    }
}

fn classify_api_error(error: &Value) -> HarvestError {
    let code = error.get("code").and_then(Value::as_str).unwrap_or("unknown");
    let info = error.get("info").and_then(Value::as_str).unwrap_or("");
    match code {
        "ratelimited" | "maxlag" | "readonly" => {
            HarvestError::Transient(format!("{}: {}", code, info))
        }
        _ => HarvestError::Permanent(format!("{}: {}", code, info)),
    }
}

/// Map one statement of the entity JSON into a typed claim. Statements
/// with no usable value (novalue/somevalue snaks, unknown datatypes) are
/// skipped.
fn parse_claim(property: &str, statement: &Value) -> Option<Claim> {
    let snak = statement.get("mainsnak")?;
    let datatype = snak.get("datatype").and_then(Value::as_str).unwrap_or("");
    let datavalue = snak.pointer("/datavalue/value")?;
    let value_type = snak.pointer("/datavalue/type").and_then(Value::as_str)?;

    let value = match value_type {
        "string" => {
            let text = datavalue.as_str()?;
            if datatype == "commonsMedia" {
                ClaimValue::File {
                    title: text.to_string(),
                }
            } else {
                ClaimValue::Text {
                    value: text.to_string(),
                }
            }
        }
        "wikibase-entityid" => ClaimValue::Item {
            id: datavalue.get("id").and_then(Value::as_str)?.to_string(),
        },
        "quantity" => ClaimValue::Quantity {
            amount: datavalue
                .get("amount")
                .and_then(Value::as_str)?
                .trim_start_matches('+')
                .parse()
                .ok()?,
            unit: match datavalue.get("unit").and_then(Value::as_str) {
                None | Some("1") => None,
                Some(unit) => Some(unit.to_string()),
            },
        },
        "globecoordinate" => ClaimValue::Coordinate {
            lat: datavalue.get("latitude").and_then(Value::as_f64)?,
            lon: datavalue.get("longitude").and_then(Value::as_f64)?,
        },
        "time" => ClaimValue::Time {
            instant: parse_repo_time(datavalue.get("time").and_then(Value::as_str)?)?,
        },
        _ => return None,
    };
    Some(Claim::new(property, value))
}

/// Repository timestamps look like `+1952-07-01T00:00:00Z`. Imprecise
/// dates use zero month/day components, which fall back to the first
/// instant of the year.
fn parse_repo_time(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim_start_matches('+');
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(instant.with_timezone(&Utc));
    }
    LEADING_YEAR
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .and_then(|year| Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single())
}

/// Encode a canonical value for `wbcreateclaim`.
fn claim_value_json(value: &CanonicalValue) -> Result<String> {
    let encoded = match value {
        CanonicalValue::Text { value } => serde_json::to_string(value)?,
        CanonicalValue::Quantity { amount } => {
            let amount = if *amount >= 0.0 {
                format!("+{}", amount)
            } else {
                format!("{}", amount)
            };
            json!({"amount": amount, "unit": "1"}).to_string()
        }
        CanonicalValue::Coordinate { lat, lon } => json!({
            "latitude": lat,
            "longitude": lon,
            "globe": "http://www.wikidata.org/entity/Q2",
            "precision": 0.000001
        })
        .to_string(),
        CanonicalValue::PointInTime { instant } => json!({
            "time": format!("+{}", instant.format("%Y-%m-%dT%H:%M:%SZ")),
            "timezone": 0,
            "before": 0,
            "after": 0,
            "precision": 11,
            "calendarmodel": "http://www.wikidata.org/entity/Q1985727"
        })
        .to_string(),
        CanonicalValue::FileRef { title } => {
            serde_json::to_string(title.trim_start_matches("File:"))?
        }
        CanonicalValue::EntityRef { id: Some(id), .. } => {
            json!({"entity-type": "item", "id": id}).to_string()
        }
        CanonicalValue::EntityRef { label, id: None } => {
            return Err(HarvestError::Permanent(format!(
                "entity '{}' has no structured counterpart to link",
                label
            )));
        }
    };
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_item_claim() {
        let statement = json!({
            "mainsnak": {
                "datatype": "wikibase-item",
                "datavalue": {
                    "type": "wikibase-entityid",
                    "value": {"entity-type": "item", "id": "Q5603654"}
                }
            }
        });
        let claim = parse_claim("P127", &statement).unwrap();
        assert_eq!(
            claim.value,
            ClaimValue::Item {
                id: "Q5603654".into()
            }
        );
    }

    #[test]
    fn test_parse_quantity_claim_strips_plus_sign() {
        let statement = json!({
            "mainsnak": {
                "datatype": "quantity",
                "datavalue": {
                    "type": "quantity",
                    "value": {"amount": "+60491", "unit": "1"}
                }
            }
        });
        let claim = parse_claim("P1083", &statement).unwrap();
        assert_eq!(
            claim.value,
            ClaimValue::Quantity {
                amount: 60491.0,
                unit: None
            }
        );
    }

    #[test]
    fn test_parse_media_claim() {
        let statement = json!({
            "mainsnak": {
                "datatype": "commonsMedia",
                "datavalue": {"type": "string", "value": "Green Templeton College.jpg"}
            }
        });
        let claim = parse_claim("P18", &statement).unwrap();
        assert_eq!(
            claim.value,
            ClaimValue::File {
                title: "Green Templeton College.jpg".into()
            }
        );
    }

    #[test]
    fn test_novalue_snak_is_skipped() {
        let statement = json!({"mainsnak": {"snaktype": "novalue", "datatype": "string"}});
        assert!(parse_claim("P856", &statement).is_none());
    }

    #[test]
    fn test_parse_repo_time_full_and_imprecise() {
        assert_eq!(
            parse_repo_time("+1952-07-01T00:00:00Z").unwrap(),
            Utc.with_ymd_and_hms(1952, 7, 1, 0, 0, 0).unwrap()
        );
        // Year-precision timestamps carry zero month/day components.
        assert_eq!(
            parse_repo_time("+1952-00-00T00:00:00Z").unwrap(),
            Utc.with_ymd_and_hms(1952, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_claim_value_json_for_entity() {
        let resolved = CanonicalValue::entity_with_id("Monrovia", "Q3748");
        let encoded = claim_value_json(&resolved).unwrap();
        assert!(encoded.contains("\"id\":\"Q3748\""));

        let unresolved = CanonicalValue::entity("Monrovia");
        assert!(claim_value_json(&unresolved).is_err());
    }

    #[test]
    fn test_error_classification() {
        let rate = json!({"code": "ratelimited", "info": "slow down"});
        assert!(classify_api_error(&rate).is_retryable());

        let perm = json!({"code": "permissiondenied", "info": "no"});
        assert!(!classify_api_error(&perm).is_retryable());

        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
        assert!(!classify_status(StatusCode::FORBIDDEN, "").is_retryable());
    }
}
