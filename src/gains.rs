// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Day/week/month performance deltas from stored snapshots.
//!
//! Each window looks up the most recent snapshot dated on or before
//! `today - window`, not one exactly that many days ago. Missing history is
//! handled differently per level: the portfolio result omits the window,
//! asset results report a zero gain.

use crate::error::StorageError;
use crate::models::{AssetGains, AssetHolding, Gain, GainWindow, TenantId};
use crate::store;
use crate::utils::today;
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// History loaded for portfolio-level gains. Covers the longest window.
pub const HISTORY_DAYS: u32 = 40;

pub fn calculate_gains(
    conn: &Connection,
    current_value: Decimal,
    tenant: &TenantId,
) -> Result<BTreeMap<GainWindow, Gain>, StorageError> {
    calculate_gains_as_of(conn, today(), current_value, tenant)
}

pub fn calculate_gains_as_of(
    conn: &Connection,
    today: NaiveDate,
    current_value: Decimal,
    tenant: &TenantId,
) -> Result<BTreeMap<GainWindow, Gain>, StorageError> {
    let history: BTreeMap<NaiveDate, Decimal> =
        store::get_history_as_of(conn, today, HISTORY_DAYS, tenant)?
            .into_iter()
            .map(|s| (s.date, s.total_value))
            .collect();

    let mut out = BTreeMap::new();
    for window in GainWindow::ALL {
        let target = window_target(today, window);
        if let Some((_, &past)) = history.range(..=target).next_back() {
            out.insert(window, gain_between(current_value, past));
        }
    }
    Ok(out)
}

pub fn calculate_asset_gains(
    conn: &Connection,
    current_assets: &[AssetHolding],
    tenant: &TenantId,
) -> Result<Vec<AssetGains>, StorageError> {
    calculate_asset_gains_as_of(conn, today(), current_assets, tenant)
}

pub fn calculate_asset_gains_as_of(
    conn: &Connection,
    today: NaiveDate,
    current_assets: &[AssetHolding],
    tenant: &TenantId,
) -> Result<Vec<AssetGains>, StorageError> {
    let mut out = Vec::with_capacity(current_assets.len());
    for asset in current_assets {
        let mut deltas = [Decimal::ZERO; 3];
        for (slot, window) in deltas.iter_mut().zip(GainWindow::ALL) {
            let target = window_target(today, window);
            let past = store::asset_value_on_or_before(conn, tenant, &asset.symbol, target)?;
            if let Some(past) = past {
                *slot = asset.total_value.saturating_sub(past);
            }
        }
        let [daily_gain, weekly_gain, monthly_gain] = deltas;
        out.push(AssetGains {
            holding: asset.clone(),
            daily_gain,
            weekly_gain,
            monthly_gain,
        });
    }
    Ok(out)
}

fn window_target(today: NaiveDate, window: GainWindow) -> NaiveDate {
    today - chrono::Duration::days(window.days())
}

/// Absolute and percentage change from `past` to `current`. A zero baseline
/// yields a zero percentage. Results beyond the `Decimal` range saturate at
/// `Decimal::MAX` / `Decimal::MIN`.
pub fn gain_between(current: Decimal, past: Decimal) -> Gain {
    let absolute = current.saturating_sub(past);
    let percent = if past.is_zero() {
        Decimal::ZERO
    } else {
        absolute
            .checked_div(past)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or_else(|| saturated(absolute.is_sign_negative() != past.is_sign_negative()))
    };
    Gain { absolute, percent }
}

fn saturated(negative: bool) -> Decimal {
    if negative { Decimal::MIN } else { Decimal::MAX }
}
