// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # cloudroute reconciler
//!
//! Reconciles the desired state of a single route in a cloud routing table
//! against the live state reported by a remote networking control plane.
//!
//! The engine is [`reconciler::RouteReconciler`].  It is stateless: an
//! external lifecycle driver invokes one operation at a time, passing the
//! desired-state record along with the remote client and the driver's
//! attribute store.  The driver persists results between operations; this
//! crate persists nothing.
//!
//! The remote client seam is [`client::RouteClient`]; implementations own
//! authentication and transport-level concerns.  [`sim`] provides an
//! in-memory control plane for tests and development.

pub mod client;
pub mod config;
pub mod reconciler;
pub mod sim;
pub mod store;

pub use config::ReconcilerConfig;
pub use reconciler::RouteReconciler;
