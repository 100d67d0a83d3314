// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the relational store.
//!
//! Every query filters on the owning user id taken from the verified token,
//! so one user's rows are unreachable from another user's requests.

pub mod configs;
pub mod users;

pub use configs::ConfigRepository;
