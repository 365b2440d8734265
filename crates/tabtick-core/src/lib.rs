//! # tabtick-core
//!
//! Foundation types, branded IDs, and utilities for tabtick.
//!
//! This crate provides the shared vocabulary that the rule engine and its
//! surfaces depend on:
//!
//! - **Branded IDs**: `TabId`, `WindowId`, `GroupId` as numeric newtypes;
//!   `BookmarkId` and `SnoozeHandle` as string newtypes
//! - **Browser records**: `Tab`, `Window`, `TabGroup` snapshots and the
//!   per-pass `TabDerived` annotations
//! - **URL analysis**: domain, origin, and dedup-key canonicalization
//! - **Categories**: static domain → category table with subdomain fallback
//! - **Durations**: `<int><unit>` literals and human-readable ages
//! - **Logging**: `tracing` subscriber setup and log capture for tests

#![deny(unsafe_code)]

pub mod categories;
pub mod duration;
pub mod ids;
pub mod logging;
pub mod tab;
pub mod urls;

pub use ids::{BookmarkId, GroupId, SnoozeHandle, TabId, WindowId};
pub use tab::{Tab, TabDerived, TabGroup, Window};
