//! Reference lookup against the Wikidata claims API.
//!
//! Two requests per probe: resolve the name to an entity id
//! (`wbsearchentities`), then fetch the date-of-death claim (`wbgetclaims`,
//! property P570). Per the port contract everything that can go wrong --
//! transport, a miss on the name, an unparseable claim -- degrades to
//! `None` after a log line.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::ports::ReferenceLookup;

/// Wikidata property id for "date of death".
const DEATH_DATE_PROPERTY: &str = "P570";

/// [`ReferenceLookup`] backed by a Wikidata-compatible endpoint.
pub struct WikidataLookup {
    http: reqwest::Client,
    base_url: String,
}

impl WikidataLookup {
    pub fn new() -> Self {
        Self::with_base_url("https://www.wikidata.org")
    }

    /// Point at a different endpoint (a mirror, or a stub server in
    /// tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn try_lookup(&self, name: &str) -> Result<Option<NaiveDate>, reqwest::Error> {
        let api = format!("{}/w/api.php", self.base_url);

        let search: SearchResponse = self
            .http
            .get(&api)
            .query(&[
                ("action", "wbsearchentities"),
                ("search", name),
                ("language", "en"),
                ("type", "item"),
                ("limit", "1"),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(hit) = search.search.into_iter().next() else {
            debug!(name, "no wikidata entity for name");
            return Ok(None);
        };

        let claims: ClaimsResponse = self
            .http
            .get(&api)
            .query(&[
                ("action", "wbgetclaims"),
                ("entity", hit.id.as_str()),
                ("property", DEATH_DATE_PROPERTY),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(death_date_from_claims(claims))
    }
}

impl Default for WikidataLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReferenceLookup for WikidataLookup {
    async fn death_date(&self, name: &str) -> Option<NaiveDate> {
        match self.try_lookup(name).await {
            Ok(date) => date,
            Err(err) => {
                debug!(name, %err, "wikidata lookup failed");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ClaimsResponse {
    #[serde(default)]
    claims: HashMap<String, Vec<Claim>>,
}

#[derive(Debug, Deserialize)]
struct Claim {
    mainsnak: Option<Snak>,
}

#[derive(Debug, Deserialize)]
struct Snak {
    datavalue: Option<DataValue>,
}

#[derive(Debug, Deserialize)]
struct DataValue {
    value: TimeValue,
}

#[derive(Debug, Deserialize)]
struct TimeValue {
    time: String,
}

fn death_date_from_claims(response: ClaimsResponse) -> Option<NaiveDate> {
    let claim = response.claims.get(DEATH_DATE_PROPERTY)?.first()?;
    let time = &claim.mainsnak.as_ref()?.datavalue.as_ref()?.value.time;
    parse_claim_time(time)
}

/// Parse Wikidata's time-string format, e.g. `+1977-08-16T00:00:00Z`.
///
/// Values below day precision carry `00` for the unknown month or day;
/// those are clamped to the first. BCE dates (leading `-`) are out of this
/// system's domain and come back as `None`.
fn parse_claim_time(raw: &str) -> Option<NaiveDate> {
    let rest = raw.strip_prefix('+')?;
    let date_part = rest.split('T').next()?;

    let mut fields = date_part.splitn(3, '-');
    let year: i32 = fields.next()?.parse().ok()?;
    let month: u32 = fields.next()?.parse().ok()?;
    let day: u32 = fields.next()?.parse().ok()?;

    NaiveDate::from_ymd_opt(year, month.max(1), day.max(1))
}
