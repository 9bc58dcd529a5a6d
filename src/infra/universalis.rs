//! Thin asynchronous client for the Universalis market board API v2.
//!
//! - Fetches current listings for a set of items, once per quality tier.
//! - The two tier requests run concurrently; each is bounded by the client
//!   timeout and retried with exponential backoff on transient failures.

use std::{collections::BTreeMap, collections::HashMap, time::Duration};

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::{ItemId, ItemMarket, Listing, MarketSnapshot, Quality};
use crate::util::version::user_agent;

pub const DEFAULT_BASE_URL: &str = "https://universalis.app/api/v2/";
pub const DEFAULT_LISTINGS: u32 = 200;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Universalis rejects more ids than this in one request.
const MAX_IDS_PER_REQUEST: usize = 100;

#[derive(Debug, Error)]
pub enum UniversalisError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("api error: {0}")]
    Api(String),
}

#[derive(Clone)]
pub struct UniversalisClient {
    http: Client,
    base_url: Url,
    listings: u32,
    max_attempts: u32,
    retry_delay: Duration,
}

impl UniversalisClient {
    pub fn new() -> Result<Self, UniversalisError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base: &str) -> Result<Self, UniversalisError> {
        Self::with_timeout(base, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base: &str, timeout: Duration) -> Result<Self, UniversalisError> {
        let base_url = if base.ends_with('/') {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{base}/"))?
        };
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            listings: DEFAULT_LISTINGS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Maximum listings requested per item and tier.
    pub fn with_listings(mut self, listings: u32) -> Self {
        self.listings = listings.max(1);
        self
    }

    /// Total attempts per request (at least one) and the first backoff delay,
    /// doubled after every failed attempt.
    pub fn with_retries(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Current listings for `item_ids` on `scope` (a world, data center or
    /// region name).
    ///
    /// High-quality listings are requested only for `hq_item_ids`; when that
    /// is empty the high-quality tier is simply absent. Any failed request
    /// fails the whole snapshot.
    pub async fn fetch_snapshot(
        &self,
        scope: &str,
        item_ids: &[ItemId],
        hq_item_ids: &[ItemId],
    ) -> Result<MarketSnapshot, UniversalisError> {
        let (normal, high) = tokio::try_join!(
            self.fetch_tier(scope, item_ids, Quality::Normal),
            self.fetch_tier(scope, hq_item_ids, Quality::High),
        )?;

        let mut items: BTreeMap<ItemId, ItemMarket> = BTreeMap::new();
        for (quality, entries) in [(Quality::Normal, normal), (Quality::High, high)] {
            for (item_id, dto) in entries {
                merge_item(&mut items, item_id, quality, dto);
            }
        }

        tracing::info!(
            scope,
            requested = item_ids.len(),
            returned = items.len(),
            "fetched market snapshot"
        );

        Ok(MarketSnapshot {
            scope: scope.to_string(),
            fetched_at: OffsetDateTime::now_utc(),
            items,
        })
    }

    async fn fetch_tier(
        &self,
        scope: &str,
        item_ids: &[ItemId],
        quality: Quality,
    ) -> Result<Vec<(ItemId, ItemDto)>, UniversalisError> {
        let mut entries = Vec::new();

        for chunk in item_ids.chunks(MAX_IDS_PER_REQUEST) {
            let url = self.market_url(scope, chunk, quality)?;
            tracing::debug!(%url, quality = quality.label(), "requesting Universalis listings");

            let raw = self.get_json(url).await?;
            let parsed = parse_items(raw, chunk)?;
            tracing::debug!(
                quality = quality.label(),
                items = parsed.len(),
                "parsed Universalis items"
            );
            entries.extend(parsed);
        }

        Ok(entries)
    }

    async fn get_json(&self, url: Url) -> Result<serde_json::Value, UniversalisError> {
        let mut delay = self.retry_delay;
        let mut attempt = 1;

        loop {
            match self.try_get_json(url.clone()).await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < self.max_attempts && is_transient(&error) => {
                    tracing::warn!(
                        %url,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "Universalis request failed: {error}; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!(%url, attempt, "Universalis request failed: {error}");
                    return Err(error);
                }
            }
        }
    }

    async fn try_get_json(&self, url: Url) -> Result<serde_json::Value, UniversalisError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    fn market_url(
        &self,
        scope: &str,
        item_ids: &[ItemId],
        quality: Quality,
    ) -> Result<Url, UniversalisError> {
        let ids = item_ids
            .iter()
            .map(ItemId::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let mut url = self.base_url.join(&format!("{scope}/{ids}"))?;
        url.query_pairs_mut()
            .append_pair("hq", if quality.is_high() { "true" } else { "false" })
            .append_pair("listings", &self.listings.to_string())
            .append_pair("entries", "0");
        Ok(url)
    }
}

fn is_transient(error: &UniversalisError) -> bool {
    match error {
        UniversalisError::Http(error) => match error.status() {
            Some(status) => status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error(),
            None => error.is_timeout() || error.is_connect() || error.is_request(),
        },
        _ => false,
    }
}

fn merge_item(
    items: &mut BTreeMap<ItemId, ItemMarket>,
    item_id: ItemId,
    quality: Quality,
    dto: ItemDto,
) {
    let market = items
        .entry(item_id)
        .or_insert_with(|| ItemMarket::new(item_id));

    // Universalis computes each velocity from the sales matching the request's
    // `hq` flag, so a tier's figure is only meaningful in its own response.
    match quality {
        Quality::Normal => market.velocity.normal = dto.nq_sale_velocity.unwrap_or(0.0),
        Quality::High => market.velocity.high = dto.hq_sale_velocity.unwrap_or(0.0),
    }

    let uploaded = dto.last_upload_time.and_then(parse_upload_time);
    market.last_upload = market.last_upload.max(uploaded);

    market
        .listings
        .extend(dto.listings.into_iter().map(|listing| Listing {
            item_id,
            quality,
            price_per_unit: listing.price_per_unit,
            quantity: listing.quantity.unwrap_or(1),
            is_exchange_only: listing.on_mannequin,
            seller_location: listing.world_name.unwrap_or_default(),
        }));
}

fn parse_upload_time(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MultiItemDto {
    items: HashMap<String, ItemDto>,
    #[serde(default)]
    unresolved_items: Vec<ItemId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemDto {
    #[serde(rename = "itemID", default)]
    item_id: Option<ItemId>,
    #[serde(default)]
    nq_sale_velocity: Option<f64>,
    #[serde(default)]
    hq_sale_velocity: Option<f64>,
    #[serde(default)]
    last_upload_time: Option<i64>,
    #[serde(default)]
    listings: Vec<ListingDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingDto {
    price_per_unit: u64,
    #[serde(default)]
    quantity: Option<u32>,
    #[serde(default)]
    on_mannequin: bool,
    #[serde(default)]
    world_name: Option<String>,
}

/// Universalis answers a multi-id request with `{ "items": { "<id>": ... } }`
/// and a single-id request with the bare item object.
fn parse_items(
    value: serde_json::Value,
    requested: &[ItemId],
) -> Result<Vec<(ItemId, ItemDto)>, UniversalisError> {
    if value.get("items").is_some_and(serde_json::Value::is_object) {
        let wrapper: MultiItemDto = serde_json::from_value(value)?;
        if !wrapper.unresolved_items.is_empty() {
            tracing::debug!(unresolved = ?wrapper.unresolved_items, "Universalis has no data for some items");
        }
        let mut entries = wrapper
            .items
            .into_iter()
            .map(|(key, dto)| {
                key.parse::<ItemId>()
                    .ok()
                    .or(dto.item_id)
                    .map(|id| (id, dto))
                    .ok_or_else(|| UniversalisError::Api(format!("unexpected item key {key:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|(id, _)| *id);
        return Ok(entries);
    }

    let dto: ItemDto = serde_json::from_value(value)?;
    let item_id = match (dto.item_id, requested) {
        (Some(id), _) => id,
        (None, [only]) => *only,
        (None, _) => {
            return Err(UniversalisError::Api(
                "single-item response without an item id".to_string(),
            ))
        }
    };
    Ok(vec![(item_id, dto)])
}
