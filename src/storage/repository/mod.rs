// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the record store.
//!
//! Each repository wraps the generic bucket operations for one record kind
//! and adds the uniqueness checks callers expect before creation.

pub mod items;
pub mod users;

pub use items::ItemRepository;
pub use users::UserRepository;
