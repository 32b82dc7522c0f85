// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod channel;
mod event;
mod request;

pub use channel::{AlreadyPending, CommitEventChannel};
pub use event::{CompletionSink, CompletionToken, EventQueue, VblankEvent};
pub use request::CommitRequest;
