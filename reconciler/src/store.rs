// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interface to the lifecycle driver's attribute store

use cloudroute_common::api::RouteIdentity;
use cloudroute_common::api::RouteState;

/// The driver-owned record the reconciler writes results through
///
/// The reconciler reads desired state from the [`RouteSpec`] it is handed
/// and writes back observed state and the route's identity through this
/// trait.  It never persists anything itself; whether a written record is
/// kept, dropped, or retried is the driver's decision.
///
/// [`RouteSpec`]: cloudroute_common::api::RouteSpec
pub trait RouteStore: Send {
    /// Record the observed state of the route after a successful reconcile
    fn set_observed(&mut self, state: &RouteState);

    /// Record the route's synthetic identity
    fn set_identity(&mut self, identity: RouteIdentity);

    /// Forget the route's identity (the route was deleted, or its routing
    /// table no longer exists)
    fn clear_identity(&mut self);
}
