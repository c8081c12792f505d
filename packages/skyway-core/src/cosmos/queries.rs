//! Cosmos balance queries over the LCD REST API

use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::BridgeError;
use crate::format::format_balance;
use crate::types::{CosmosCurrency, Currency};

/// Native token balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinBalance {
    pub denom: String,
    pub amount: u128,
}

/// Read-only LCD client for bank queries.
pub struct LcdQueryClient {
    lcd_url: String,
    client: Client,
}

impl LcdQueryClient {
    pub fn new(lcd_url: &str) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .wrap_err("failed to create HTTP client")?;

        Ok(Self {
            lcd_url: lcd_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Balance of one denom, in base units. Zero when the account holds none.
    pub async fn native_balance(&self, address: &str, denom: &str) -> Result<u128> {
        let url = format!(
            "{}/cosmos/bank/v1beta1/balances/{}/by_denom?denom={}",
            self.lcd_url, address, denom
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .wrap_err("failed to query balance")?;

        if !response.status().is_success() {
            return Err(eyre!("balance query failed: {}", response.status()));
        }

        let data: serde_json::Value = response.json().await?;
        let amount = data
            .get("balance")
            .and_then(|b| b.get("amount"))
            .and_then(|v| v.as_str())
            .unwrap_or("0")
            .parse()
            .unwrap_or(0);

        Ok(amount)
    }

    /// All native balances of an address.
    pub async fn all_balances(&self, address: &str) -> Result<Vec<CoinBalance>> {
        let url = format!("{}/cosmos/bank/v1beta1/balances/{}", self.lcd_url, address);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .wrap_err("failed to query balances")?;

        if !response.status().is_success() {
            return Err(eyre!("balance query failed: {}", response.status()));
        }

        let data: serde_json::Value = response.json().await?;
        let balances = data
            .get("balances")
            .and_then(|b| b.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|coin| {
                        let denom = coin.get("denom")?.as_str()?.to_string();
                        let amount: u128 = coin.get("amount")?.as_str()?.parse().ok()?;
                        Some(CoinBalance { denom, amount })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(balances)
    }

    /// Balance of a currency rendered for display, e.g. "5.00 TIA".
    pub async fn display_balance(
        &self,
        address: &str,
        currency: &CosmosCurrency,
    ) -> Result<String, BridgeError> {
        let amount = self
            .native_balance(address, &currency.minimal_denom)
            .await?;
        let formatted = format_balance(&amount.to_string(), currency.decimals)?;
        Ok(format!("{} {}", formatted, currency.display_denom()))
    }
}
