// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod assistant;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod forecast;
pub mod models;
pub mod utils;
pub mod commands;
