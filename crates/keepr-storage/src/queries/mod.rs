// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each accepts `&Database` and runs on the single
//! writer thread via `connection().call()`.

pub mod actions;
pub mod join_requests;
pub mod vaults;

/// Parse a TEXT column into an enum, mapping parse failures onto rusqlite's
/// conversion error so they surface through the normal error path.
pub(crate) fn column_enum<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
