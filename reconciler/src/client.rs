// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interface to the remote networking control plane

use async_trait::async_trait;
use cloudroute_common::api::RouteState;
use cloudroute_common::api::RouteTarget;
use cloudroute_common::error::Error;
use oxnet::IpNet;

/// Remote calls the reconciler makes against the control plane
///
/// Implementations must classify their failures into the
/// [`cloudroute_common::error::Error`] taxonomy: the reconciler's retry and
/// absence handling both depend on that classification being reliable.  In
/// particular, [`Error::InvalidParameter`] marks the transient
/// readiness-race class and [`Error::RouteTableNotFound`] marks a missing
/// table.  Authentication and transport-level retry belong to the
/// implementation, not to callers of this trait.
#[async_trait]
pub trait RouteClient: Send + Sync {
    /// Create a route for `destination` in `route_table_id`, forwarding to
    /// `target`
    async fn create_route(
        &self,
        route_table_id: &str,
        destination: &IpNet,
        target: &RouteTarget,
    ) -> Result<(), Error>;

    /// Replace the target of the existing route for `destination`
    async fn replace_route(
        &self,
        route_table_id: &str,
        destination: &IpNet,
        target: &RouteTarget,
    ) -> Result<(), Error>;

    /// Delete the route for `destination` in `route_table_id`
    async fn delete_route(
        &self,
        route_table_id: &str,
        destination: &IpNet,
    ) -> Result<(), Error>;

    /// List the observed state of every route in `route_table_id`
    async fn list_routes(
        &self,
        route_table_id: &str,
    ) -> Result<Vec<RouteState>, Error>;
}
