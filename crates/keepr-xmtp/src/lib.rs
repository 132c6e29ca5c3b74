// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! XMTP adapter for the Keepr membership engine.
//!
//! The deployment runs the XMTP node as a sidecar gateway exposing a small
//! HTTP surface; [`XmtpGatewayClient`] implements
//! [`GroupClient`](keepr_core::GroupClient) against it. All SDK-version
//! quirks live behind the gateway, so this adapter's only job is honest
//! error classification: the action queue decides retry-versus-fail from
//! the [`MessagingErrorKind`](keepr_core::MessagingErrorKind) reported
//! here.

pub mod client;

pub use client::XmtpGatewayClient;
