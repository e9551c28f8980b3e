//! MarvelCDB client
//!
//! Card records come from `/api/public/card/{code}` and deck lists from
//! `/api/public/decklist/{id}`. Transport failures and server errors are
//! retried a bounded number of times.

use deck_model::{CardId, CardKind, CardRecord, DeckListEntry};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::database::RemoteCardDatabase;
use crate::types::{DeckListing, ImportError, Result};

pub const MARVELCDB_URL: &str = "https://marvelcdb.com";

const DEFAULT_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// MarvelCDB keys and the property names they are stored under
const PROPERTY_NAMES: [(&str, &str); 25] = [
    ("cost", "Cost"),
    ("traits", "Attribute"),
    ("text", "Text"),
    ("flavor", "Quote"),
    ("card_set_name", "Owner"),
    ("resource_energy", "Resource_Energy"),
    ("resource_mental", "Resource_Mental"),
    ("resource_physical", "Resource_Physical"),
    ("resource_wild", "Resource_Wild"),
    ("attack", "Attack"),
    ("thwart", "Thwart"),
    ("defense", "Defense"),
    ("recover", "Recovery"),
    ("scheme", "Scheme"),
    ("attack_cost", "AttackCost"),
    ("thwart_cost", "ThwartCost"),
    ("hand_size", "HandSize"),
    ("health", "HP"),
    ("threat", "Threat"),
    ("base_threat", "BaseThreat"),
    ("escalation_threat", "EscalationThreat"),
    ("scheme_acceleration", "Scheme_Acceleration"),
    ("scheme_crisis", "Scheme_Crisis"),
    ("scheme_hazard", "Scheme_Hazard"),
    ("boost", "Boost"),
];

/// MarvelCDB flags stored as `True`/`False` properties
const FLAG_NAMES: [(&str, &str); 2] = [("is_unique", "Unique"), ("health_per_hero", "HP_Per_Hero")];

/// A card as served by MarvelCDB
#[derive(Debug, Clone, Deserialize)]
struct MarvelCdbCard {
    code: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    type_code: Option<String>,
    #[serde(default)]
    pack_name: Option<String>,
    #[serde(default)]
    imagesrc: Option<String>,
    #[serde(default)]
    backimagesrc: Option<String>,
    #[serde(default)]
    octgn_id: Option<String>,
    #[serde(default)]
    linked_card: Option<Box<MarvelCdbCard>>,
    #[serde(flatten)]
    other: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct MarvelCdbDeck {
    name: String,
    #[serde(default)]
    investigator_code: Option<String>,
    #[serde(default)]
    slots: BTreeMap<String, usize>,
}

/// Card record and the image paths still to download
pub struct PendingRecord {
    pub record: CardRecord,
    pub front_src: Option<String>,
    pub back_src: Option<String>,
}

/// Translate a MarvelCDB card document. Images are left to the caller.
pub fn record_from_json(json: &str) -> Result<PendingRecord> {
    let card: MarvelCdbCard = serde_json::from_str(json)?;
    Ok(pending_record(card))
}

fn pending_record(card: MarvelCdbCard) -> PendingRecord {
    let mut fields = BTreeMap::new();
    fields.insert("CardNumber".to_string(), card.code.clone());
    if let Some(type_code) = &card.type_code {
        fields.insert("Type".to_string(), type_code.clone());
    }
    for (key, name) in PROPERTY_NAMES {
        if let Some(text) = card.other.get(key).and_then(value_text) {
            fields.insert(name.to_string(), text);
        }
    }
    for (key, name) in FLAG_NAMES {
        if let Some(flag) = card.other.get(key).and_then(Value::as_bool) {
            let text = if flag { "True" } else { "False" };
            fields.insert(name.to_string(), text.to_string());
        }
    }

    let linked = card.linked_card.as_deref();
    let back_src = card
        .backimagesrc
        .clone()
        .or_else(|| linked.and_then(|l| l.imagesrc.clone()));
    let record = CardRecord {
        code: card.code.clone(),
        id: card.octgn_id.as_deref().and_then(CardId::parse),
        name: card.name.clone(),
        set: card.pack_name.clone(),
        kind: kind_for_type(card.type_code.as_deref()),
        front_image: None,
        back_image: None,
        back_name: linked.and_then(|l| l.name.clone()),
        fields,
    };
    PendingRecord {
        record,
        front_src: card.imagesrc,
        back_src,
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Card kind from a MarvelCDB type code
fn kind_for_type(type_code: Option<&str>) -> CardKind {
    match type_code {
        Some("ally" | "event" | "upgrade" | "support" | "resource" | "hero" | "alter_ego") => {
            CardKind::Player
        }
        Some(
            "attachment" | "environment" | "minion" | "side_scheme" | "treachery" | "obligation"
            | "main_scheme",
        ) => CardKind::Encounter,
        Some("villain") => CardKind::Villain,
        _ => CardKind::Unspecified,
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Clone)]
pub struct MarvelCdbClient {
    client: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl Default for MarvelCdbClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MarvelCdbClient {
    pub fn new() -> Self {
        Self::with_base_url(MARVELCDB_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retries: DEFAULT_RETRIES,
        }
    }

    /// Number of extra attempts after a failed request
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            let result = self.client.get(url).send().await;
            let retryable = match &result {
                Ok(response) => response.status().is_server_error(),
                Err(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            };
            if !retryable || attempt >= self.retries {
                let response = result?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ImportError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                return Ok(response);
            }
            attempt += 1;
            log::warn!("Request to {} failed, retry {}/{}", url, attempt, self.retries);
            tokio::time::sleep(RETRY_DELAY * attempt).await;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        log::debug!("GET {}", url);
        let text = self.get(&url).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url(path);
        log::debug!("GET {}", url);
        Ok(self.get(&url).await?.bytes().await?.to_vec())
    }
}

impl RemoteCardDatabase for MarvelCdbClient {
    async fn fetch_card(&self, code: &str) -> Result<CardRecord> {
        let card: MarvelCdbCard = self
            .get_json(&format!("api/public/card/{}", code))
            .await?;
        let PendingRecord {
            mut record,
            front_src,
            back_src,
        } = pending_record(card);
        if let Some(src) = front_src {
            record.front_image = Some(self.get_bytes(&src).await?);
        }
        if let Some(src) = back_src {
            record.back_image = Some(self.get_bytes(&src).await?);
        }
        Ok(record)
    }

    async fn fetch_deck_list(&self, deck_id: &str) -> Result<DeckListing> {
        let deck: MarvelCdbDeck = self
            .get_json(&format!("api/public/decklist/{}", deck_id))
            .await?;
        // Hero first, then the deck's slots
        let mut entries: Vec<DeckListEntry> = deck
            .investigator_code
            .into_iter()
            .map(|code| DeckListEntry::new(code, 1))
            .collect();
        entries.extend(
            deck.slots
                .into_iter()
                .filter(|(_, quantity)| *quantity > 0)
                .map(|(code, quantity)| DeckListEntry::new(code, quantity)),
        );
        Ok(DeckListing {
            name: deck.name,
            entries,
        })
    }
}
