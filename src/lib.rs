// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod kubernetes;
pub mod queue;
pub mod runner;
pub mod shim;
pub mod signal;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;
