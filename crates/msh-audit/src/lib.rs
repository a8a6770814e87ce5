// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable, append-only audit trail for a shell session.
//!
//! Every routed event becomes exactly one [`AuditRecord`], serialized as a
//! single JSON line. Sinks never fail their caller: write errors are diverted
//! to a fallback diagnostic stream and reported through `tracing`.

pub mod error;
pub mod record;
pub mod sink;

pub use error::{AuditError, AuditResult};
pub use record::{AuditLevel, AuditRecord};
pub use sink::file::FileAuditLog;
pub use sink::memory::MemoryAuditLog;
pub use sink::AuditSink;
