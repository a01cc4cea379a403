// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::TenantIdError;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque identifier partitioning all snapshot and analysis data of one account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(raw: impl Into<String>) -> Result<Self, TenantIdError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TenantIdError::Empty);
        }
        Ok(TenantId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = TenantIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TenantId::new(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = TenantIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TenantId::new(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub tenant_id: TenantId,
    pub total_value: Decimal,
    pub invested_amount: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub date: NaiveDate,
    pub tenant_id: TenantId,
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub tenant_id: TenantId,
    pub model: String,
    pub investment_amount: Decimal,
    pub portfolio_value: Decimal,
    pub response_text: String,
}

/// One holding as delivered by a portfolio source (broker export or simulation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetHolding {
    pub symbol: String,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: Decimal,
    pub last_price: Decimal,
    pub total_value: Decimal,
    #[serde(default)]
    pub daily_variation_pct: Option<Decimal>,
}

/// Lookback window for gain computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GainWindow {
    Daily,
    Weekly,
    Monthly,
}

impl GainWindow {
    pub const ALL: [GainWindow; 3] = [GainWindow::Daily, GainWindow::Weekly, GainWindow::Monthly];

    pub fn days(self) -> i64 {
        match self {
            GainWindow::Daily => 1,
            GainWindow::Weekly => 7,
            GainWindow::Monthly => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GainWindow::Daily => "daily",
            GainWindow::Weekly => "weekly",
            GainWindow::Monthly => "monthly",
        }
    }
}

impl fmt::Display for GainWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gain {
    pub absolute: Decimal,
    pub percent: Decimal,
}

/// A holding enriched with absolute gains over each lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetGains {
    #[serde(flatten)]
    pub holding: AssetHolding,
    pub daily_gain: Decimal,
    pub weekly_gain: Decimal,
    pub monthly_gain: Decimal,
}

impl AssetGains {
    pub fn gain(&self, window: GainWindow) -> Decimal {
        match window {
            GainWindow::Daily => self.daily_gain,
            GainWindow::Weekly => self.weekly_gain,
            GainWindow::Monthly => self.monthly_gain,
        }
    }
}
