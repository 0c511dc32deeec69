// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod decode;
pub mod inspect;
pub mod simulate;
pub mod validate;
