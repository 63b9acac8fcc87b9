// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # cloudroute common facilities
//!
//! This crate implements types and facilities shared by the cloudroute
//! components: the route data model (specs, observed state, targets,
//! identities), the error taxonomy used across the remote-client boundary,
//! and retry plumbing for operations that poll a remote control plane.
//!
//! The reconciliation engine itself lives in `cloudroute-reconciler`.

pub mod api;
pub mod backoff;
pub mod error;

pub use error::Error;
