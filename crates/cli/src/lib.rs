// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod catalog;
pub mod config;
pub mod encode;
pub mod prompt;
pub mod reauth;
pub mod registrar;
pub mod run;
pub mod table;
pub mod test_support;
pub mod windows;
