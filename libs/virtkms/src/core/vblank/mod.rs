// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod timer;
mod tracker;

pub use timer::{VblankHandler, VblankTimer};
pub use tracker::{VblankCounter, VblankStamp, VblankTracker};
