// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod analysis;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod gains;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod store;
pub mod utils;

pub use error::{MigrationError, StorageError};
pub use models::{
    AnalysisRecord, AssetGains, AssetHolding, AssetSnapshot, Gain, GainWindow, PortfolioSnapshot,
    TenantId,
};
