use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::NOT_AVAILABLE;
use crate::types::CreatorInfo;

/// Read-only lookups against a block explorer.
#[async_trait]
pub trait ChainExplorer: Send + Sync {
    /// Address that deployed `token_address`, if the explorer knows it.
    async fn contract_creator(&self, token_address: &str) -> Result<Option<String>>;

    /// Time of the earliest transaction sent or received by `address`.
    async fn first_transaction_time(&self, address: &str) -> Result<Option<DateTime<Utc>>>;
}

/// Etherscan-style response envelope. `result` is an array on success and an
/// error string otherwise.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ContractCreation {
    #[serde(rename = "contractCreator")]
    contract_creator: String,
}

#[derive(Debug, Deserialize)]
struct Transaction {
    #[serde(rename = "timeStamp")]
    time_stamp: String,
}

impl ApiResponse {
    /// Decode `result` as a list; an empty or "No transactions found" reply is an empty list.
    fn into_rows<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        match self.result {
            serde_json::Value::Array(_) => {
                serde_json::from_value(self.result).context("unexpected basescan result shape")
            }
            serde_json::Value::Null => Ok(Vec::new()),
            other => {
                if self.message.starts_with("No ") {
                    return Ok(Vec::new());
                }
                Err(anyhow!(
                    "basescan error (status {}): {} {}",
                    self.status,
                    self.message,
                    other
                ))
            }
        }
    }
}

fn parse_creator(response: ApiResponse) -> Result<Option<String>> {
    let rows: Vec<ContractCreation> = response.into_rows()?;
    Ok(rows
        .into_iter()
        .next()
        .map(|r| r.contract_creator)
        .filter(|c| !c.is_empty()))
}

fn parse_first_transaction(response: ApiResponse) -> Result<Option<DateTime<Utc>>> {
    let rows: Vec<Transaction> = response.into_rows()?;
    let Some(first) = rows.into_iter().next() else {
        return Ok(None);
    };
    let secs: i64 = first
        .time_stamp
        .parse()
        .with_context(|| format!("invalid timeStamp {:?}", first.time_stamp))?;
    DateTime::from_timestamp(secs, 0)
        .map(Some)
        .ok_or_else(|| anyhow!("timeStamp out of range: {secs}"))
}

/// Basescan (Base mainnet) API client.
pub struct BasescanClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl BasescanClient {
    /// Every request is bounded by `timeout`.
    pub fn new(api_base: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            api_base: api_base.to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<ApiResponse> {
        let resp = self
            .http
            .get(&self.api_base)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ChainExplorer for BasescanClient {
    async fn contract_creator(&self, token_address: &str) -> Result<Option<String>> {
        let response = self
            .get(&[
                ("module", "contract"),
                ("action", "getcontractcreation"),
                ("contractaddresses", token_address),
            ])
            .await?;
        parse_creator(response)
    }

    async fn first_transaction_time(&self, address: &str) -> Result<Option<DateTime<Utc>>> {
        let response = self
            .get(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("page", "1"),
                ("offset", "1"),
                ("sort", "asc"),
            ])
            .await?;
        parse_first_transaction(response)
    }
}

/// Hours elapsed from `since` to `now`, rounded to two decimals. Never negative.
pub fn hours_between(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let secs = (now - since).num_seconds().max(0);
    (Decimal::from(secs) / Decimal::from(3600))
        .round_dp(2)
        .to_f64()
        .unwrap_or(0.0)
}

/// Resolves a token's creator and the creator wallet's age.
///
/// Every lookup is a single request; failures degrade to [`NOT_AVAILABLE`]
/// and `0.0` instead of being retried.
pub struct OnChainResolver<E> {
    explorer: E,
}

impl<E: ChainExplorer> OnChainResolver<E> {
    pub fn new(explorer: E) -> Self {
        Self { explorer }
    }

    pub fn explorer(&self) -> &E {
        &self.explorer
    }

    pub async fn creator_of(&self, token_address: &str) -> String {
        if token_address.is_empty() {
            return NOT_AVAILABLE.to_string();
        }
        match self.explorer.contract_creator(token_address).await {
            Ok(Some(creator)) => creator,
            Ok(None) => {
                warn!("No contract creation record for {token_address}");
                NOT_AVAILABLE.to_string()
            }
            Err(e) => {
                warn!("Contract creator lookup failed for {token_address}: {e:#}");
                NOT_AVAILABLE.to_string()
            }
        }
    }

    pub async fn wallet_age_hours(&self, creator: &str) -> f64 {
        self.wallet_age_hours_at(creator, Utc::now()).await
    }

    async fn wallet_age_hours_at(&self, creator: &str, now: DateTime<Utc>) -> f64 {
        if creator.is_empty() || creator == NOT_AVAILABLE {
            return 0.0;
        }
        match self.explorer.first_transaction_time(creator).await {
            Ok(Some(first)) => hours_between(first, now),
            Ok(None) => {
                debug!("No transactions for {creator}");
                0.0
            }
            Err(e) => {
                warn!("Wallet age lookup failed for {creator}: {e:#}");
                0.0
            }
        }
    }

    /// Creator lookup followed by the wallet age lookup. The second call is
    /// skipped when the creator is unknown.
    pub async fn resolve(&self, token_address: &str) -> CreatorInfo {
        let address = self.creator_of(token_address).await;
        if address == NOT_AVAILABLE {
            return CreatorInfo::unresolved();
        }
        let wallet_age_hours = self.wallet_age_hours(&address).await;
        info!("Creator {address} (wallet age {wallet_age_hours}h)");
        CreatorInfo {
            address,
            wallet_age_hours,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    /// Explorer returning canned answers and counting requests.
    #[derive(Default)]
    pub(crate) struct FakeExplorer {
        pub creator: Option<String>,
        pub first_tx: Option<DateTime<Utc>>,
        pub fail: bool,
        pub creator_calls: AtomicUsize,
        pub history_calls: AtomicUsize,
    }

    #[async_trait]
    impl ChainExplorer for FakeExplorer {
        async fn contract_creator(&self, _token: &str) -> Result<Option<String>> {
            self.creator_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self.creator.clone())
        }

        async fn first_transaction_time(&self, _address: &str) -> Result<Option<DateTime<Utc>>> {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self.first_tx)
        }
    }

    fn response(value: serde_json::Value) -> ApiResponse {
        serde_json::from_value(value).expect("valid envelope")
    }

    #[tokio::test]
    async fn empty_token_returns_sentinel_without_request() {
        let resolver = OnChainResolver::new(FakeExplorer::default());
        assert_eq!(resolver.creator_of("").await, NOT_AVAILABLE);
        assert_eq!(resolver.explorer.creator_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sentinel_creator_has_zero_age_without_request() {
        let resolver = OnChainResolver::new(FakeExplorer::default());
        assert_eq!(resolver.wallet_age_hours(NOT_AVAILABLE).await, 0.0);
        assert_eq!(resolver.wallet_age_hours("").await, 0.0);
        assert_eq!(resolver.explorer.history_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_creator_lookup_skips_history() {
        let resolver = OnChainResolver::new(FakeExplorer {
            fail: true,
            ..Default::default()
        });
        let info = resolver.resolve("0xdead").await;
        assert_eq!(info, CreatorInfo::unresolved());
        assert_eq!(resolver.explorer.creator_calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.explorer.history_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn wallet_age_is_rounded_hours() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let first = now - chrono::Duration::seconds(5 * 3600 + 15 * 60);
        let resolver = OnChainResolver::new(FakeExplorer {
            creator: Some("0xbeef".to_string()),
            first_tx: Some(first),
            ..Default::default()
        });
        assert_eq!(resolver.wallet_age_hours_at("0xbeef", now).await, 5.25);
    }

    #[tokio::test]
    async fn wallet_without_transactions_is_zero_hours() {
        let resolver = OnChainResolver::new(FakeExplorer {
            creator: Some("0xbeef".to_string()),
            ..Default::default()
        });
        let info = resolver.resolve("0xdead").await;
        assert_eq!(info.address, "0xbeef");
        assert_eq!(info.wallet_age_hours, 0.0);
        assert_eq!(resolver.explorer.history_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hours_between_rounds_and_clamps() {
        let t0 = DateTime::from_timestamp(0, 0).unwrap();
        let t1 = DateTime::from_timestamp(100, 0).unwrap();
        assert_eq!(hours_between(t0, t1), 0.03);
        assert_eq!(hours_between(t1, t0), 0.0);
    }

    #[test]
    fn parses_contract_creation() {
        let resp = response(json!({
            "status": "1",
            "message": "OK",
            "result": [{
                "contractAddress": "0xdead",
                "contractCreator": "0xbeef",
                "txHash": "0x01"
            }]
        }));
        assert_eq!(parse_creator(resp).unwrap(), Some("0xbeef".to_string()));
    }

    #[test]
    fn parses_first_transaction() {
        let resp = response(json!({
            "status": "1",
            "message": "OK",
            "result": [{ "blockNumber": "1", "timeStamp": "1700000000", "hash": "0x02" }]
        }));
        let first = parse_first_transaction(resp).unwrap().unwrap();
        assert_eq!(first.timestamp(), 1_700_000_000);
    }

    #[test]
    fn no_transactions_is_none() {
        let resp = response(json!({
            "status": "0",
            "message": "No transactions found",
            "result": []
        }));
        assert_eq!(parse_first_transaction(resp).unwrap(), None);
    }

    #[test]
    fn error_envelope_is_an_error() {
        let resp = response(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Invalid API Key"
        }));
        assert!(parse_creator(resp).is_err());

        let resp = response(json!({
            "status": "1",
            "message": "OK",
            "result": [{ "timeStamp": "not-a-number" }]
        }));
        assert!(parse_first_transaction(resp).is_err());
    }
}
