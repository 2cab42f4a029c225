// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ChronoHub - Leave Management API
//!
//! REST backend for employee leave requests with role-gated approvals.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session tokens, password hashing, Google sign-in and role gating
//! - `lifecycle` - Leave request state machine
//! - `storage` - Embedded redb document store

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod state;
pub mod storage;
