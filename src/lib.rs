//! # vitality-sync
//!
//! Offline-first data layer for a personal health tracker.
//!
//! ## Overview
//!
//! Every user action (water intake, meals, workouts, mindfulness minutes) is
//! written to a local key-value store first and queued as a remote mutation.
//! The sync driver writes queued mutations to the remote whenever the app is
//! online, retrying failed writes up to a configurable limit. A small TTL
//! cache and a chat coach proxy complete the library.
//!
//! ## Architecture
//!
//! - Local persistence ([`store`]) and the TTL cache ([`cache`])
//! - The sync queue, remotes and background flusher ([`queue`])
//! - Domain actions that feed the queue ([`tracker`])
//! - Sync analytics and pass history ([`events`], [`history`])
//! - Coach prompt and upstream client ([`coach`])
//! - Configuration, state and logging ([`config`], [`settings`], [`state`], [`logger`])
//! - Command-line handlers ([`handlers`], [`onboarding`])

/// TTL cache over the `cache` partition of the local store.
///
/// Entries carry their write time and an optional TTL; an expired entry is
/// evicted when read.
pub mod cache;

/// Chat coach proxy.
///
/// Builds the coach prompt from recent messages and the user's stats, calls
/// the generative-language API with a server-held key and normalizes the
/// reply text.
pub mod coach;

/// Platform-agnostic configuration directory management for vitality-sync.
///
/// Provides utilities for locating and managing configuration files and directories
/// following platform conventions (XDG on Linux, Application Support on macOS,
/// AppData on Windows).
pub mod config;

/// Analytics events emitted by the sync driver.
pub mod events;

/// Command handlers behind the CLI subcommands.
pub mod handlers;

/// Sync pass history tracking and persistence.
///
/// Records every sync pass that attempted at least one operation, with what
/// triggered it and how many writes succeeded, will be retried or failed.
pub mod history;

/// Logging configuration and utilities.
///
/// Sets up dual logging to both console (configurable via `RUST_LOG` environment
/// variable) and a persistent log file in the config directory. Includes automatic
/// log rotation when files exceed size limits.
pub mod logger;

/// Interactive onboarding flow for first-time setup.
pub mod onboarding;

/// Offline sync queue.
///
/// Persists pending mutations, writes them to a [`queue::RemoteSink`] when
/// online and tracks retries until an operation is synced or marked failed.
/// A background [`queue::SyncScheduler`] flushes the queue periodically.
pub mod queue;

/// Persistent driver settings (`config.toml`).
pub mod settings;

/// Connectivity state remembered between invocations (`state.json`).
pub mod state;

/// File-backed key-value store with one JSON document per partition.
pub mod store;

/// Daily stats and the user actions that produce sync operations.
pub mod tracker;
