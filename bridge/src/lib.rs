// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod limiter;
pub mod metrics;
pub mod node;
pub mod replay;
pub mod server;
pub mod test_utils;
pub mod token;
pub mod utils;
pub mod verifier;
