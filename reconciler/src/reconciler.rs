// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The route reconciliation engine
//!
//! Translates a [`RouteSpec`] into remote calls and converges the driver's
//! record to the remote route's observed state.  Validation always runs
//! before the first remote call, so a validation failure can leave no
//! partial state behind.  Create and delete retry the transient
//! invalid-parameter class at a fixed interval until their window elapses;
//! every other remote failure is surfaced immediately.

use crate::client::RouteClient;
use crate::config::ReconcilerConfig;
use crate::store::RouteStore;
use cloudroute_common::api::RouteIdentity;
use cloudroute_common::api::RouteSpec;
use cloudroute_common::api::RouteState;
use cloudroute_common::backoff;
use cloudroute_common::backoff::BackoffError;
use cloudroute_common::error::Error;
use oxnet::IpNet;
use slog::debug;
use slog::info;
use slog::o;
use slog::warn;
use slog::Logger;

/// Reconciles one route at a time against the remote control plane
///
/// Holds no state between operations: desired state is passed in and remote
/// state is fetched fresh on every invocation.  One instance may be shared
/// across tasks reconciling different routes without coordination; within
/// one operation the retry loops block only the calling task.
pub struct RouteReconciler {
    log: Logger,
    config: ReconcilerConfig,
}

impl RouteReconciler {
    pub fn new(log: &Logger, config: ReconcilerConfig) -> RouteReconciler {
        RouteReconciler {
            log: log.new(o!("component" => "RouteReconciler")),
            config,
        }
    }

    fn route_log(&self, spec: &RouteSpec) -> Logger {
        self.log.new(o!(
            "route_table_id" => spec.route_table_id.clone(),
            "destination" => spec.destination.to_string(),
        ))
    }

    fn op_context(operation: &str, spec: &RouteSpec) -> String {
        format!(
            "{} (route table {}, destination {})",
            operation, spec.route_table_id, spec.destination
        )
    }

    /// Create the route described by `spec`
    ///
    /// The create call is retried on the transient invalid-parameter class
    /// for up to [`ReconcilerConfig::create_window`]; the control plane
    /// rejects creates that race the table or target becoming ready.  After
    /// the create is acknowledged, the route may not yet be visible to
    /// reads, so we poll for it for up to
    /// [`ReconcilerConfig::convergence_window`].  The identity is derived
    /// and stored only once the route has actually been observed.
    pub async fn create<C, S>(
        &self,
        spec: &RouteSpec,
        client: &C,
        store: &mut S,
    ) -> Result<(RouteIdentity, RouteState), Error>
    where
        C: RouteClient + ?Sized,
        S: RouteStore + ?Sized,
    {
        let target = spec.target.resolve_for_create()?;
        let log = self.route_log(spec);
        debug!(log, "creating route"; "target" => %target);

        backoff::retry_notify(
            backoff::poll_policy(
                self.config.create_retry_interval,
                self.config.create_window,
            ),
            || async {
                client
                    .create_route(
                        &spec.route_table_id,
                        &spec.destination,
                        &target,
                    )
                    .await
                    .map_err(retry_class)
            },
            |error, delay| {
                warn!(
                    log,
                    "transient failure creating route, will retry";
                    "error" => %error,
                    "delay" => ?delay,
                );
            },
        )
        .await
        .map_err(|error| {
            error.remote_context(Self::op_context("creating route", spec))
        })?;

        let route = backoff::retry_notify(
            backoff::poll_policy(
                self.config.convergence_poll_interval,
                self.config.convergence_window,
            ),
            || async {
                find_route(client, &spec.route_table_id, &spec.destination)
                    .await
                    .map_err(BackoffError::transient)
            },
            |error, delay| {
                debug!(
                    log,
                    "created route not yet visible";
                    "error" => %error,
                    "delay" => ?delay,
                );
            },
        )
        .await
        .map_err(|error| {
            warn!(
                log,
                "route was created but never became visible";
                "last_error" => %error,
            );
            Error::RouteNotConverged {
                route_table_id: spec.route_table_id.clone(),
                destination: spec.destination,
            }
        })?;

        let identity =
            RouteIdentity::for_route(&spec.route_table_id, &spec.destination);
        store.set_identity(identity.clone());
        store.set_observed(&route);
        info!(log, "created route"; "identity" => %identity);
        Ok((identity, route))
    }

    /// Fetch the observed state of the route described by `spec`
    ///
    /// Returns `Ok(None)` when the route is absent, whether because the
    /// routing table itself is gone or because no route matches the
    /// destination.  When the table is gone the route's identity is cleared
    /// through the store, since the route cannot come back.
    pub async fn read<C, S>(
        &self,
        spec: &RouteSpec,
        client: &C,
        store: &mut S,
    ) -> Result<Option<RouteState>, Error>
    where
        C: RouteClient + ?Sized,
        S: RouteStore + ?Sized,
    {
        let log = self.route_log(spec);
        match find_route(client, &spec.route_table_id, &spec.destination)
            .await
        {
            Ok(route) => {
                store.set_observed(&route);
                Ok(Some(route))
            }
            Err(Error::RouteTableNotFound { .. }) => {
                warn!(log, "route table not found, clearing route identity");
                store.clear_identity();
                Ok(None)
            }
            Err(Error::RouteNotFound { .. }) => {
                debug!(log, "no route for destination");
                Ok(None)
            }
            Err(error) => Err(
                error.remote_context(Self::op_context("reading route", spec))
            ),
        }
    }

    /// Replace the target of the route described by `spec`
    ///
    /// The replace call is issued exactly once: unlike create and delete
    /// there is no retry on the transient class, and there is no
    /// post-replace convergence poll.  The operation is complete when the
    /// remote call acknowledges.
    pub async fn update<C>(
        &self,
        spec: &RouteSpec,
        client: &C,
    ) -> Result<(), Error>
    where
        C: RouteClient + ?Sized,
    {
        let target = spec.target.resolve_for_update()?;
        let log = self.route_log(spec);
        debug!(log, "replacing route"; "target" => %target);

        client
            .replace_route(&spec.route_table_id, &spec.destination, &target)
            .await
            .map_err(|error| {
                error.remote_context(Self::op_context("replacing route", spec))
            })?;
        info!(log, "replaced route"; "target" => %target);
        Ok(())
    }

    /// Delete the route described by `spec`
    ///
    /// Retries the transient invalid-parameter class for up to
    /// [`ReconcilerConfig::delete_window`].  On success the route's identity
    /// is cleared through the store.
    pub async fn delete<C, S>(
        &self,
        spec: &RouteSpec,
        client: &C,
        store: &mut S,
    ) -> Result<(), Error>
    where
        C: RouteClient + ?Sized,
        S: RouteStore + ?Sized,
    {
        let log = self.route_log(spec);
        debug!(log, "deleting route");

        backoff::retry_notify(
            backoff::poll_policy(
                self.config.delete_retry_interval,
                self.config.delete_window,
            ),
            || async {
                client
                    .delete_route(&spec.route_table_id, &spec.destination)
                    .await
                    .map_err(retry_class)
            },
            |error, delay| {
                warn!(
                    log,
                    "transient failure deleting route, will retry";
                    "error" => %error,
                    "delay" => ?delay,
                );
            },
        )
        .await
        .map_err(|error| {
            error.remote_context(Self::op_context("deleting route", spec))
        })?;

        store.clear_identity();
        info!(log, "deleted route");
        Ok(())
    }

    /// Report whether the route described by `spec` exists
    ///
    /// A missing routing table means the route cannot exist and reports
    /// `false`; any other remote failure is fatal.
    pub async fn exists<C>(
        &self,
        spec: &RouteSpec,
        client: &C,
    ) -> Result<bool, Error>
    where
        C: RouteClient + ?Sized,
    {
        let log = self.route_log(spec);
        match client.list_routes(&spec.route_table_id).await {
            Ok(routes) => Ok(routes
                .iter()
                .any(|route| route.destination == spec.destination)),
            Err(Error::RouteTableNotFound { .. }) => {
                warn!(log, "route table is gone, so route does not exist");
                Ok(false)
            }
            Err(error) => Err(error.remote_context(Self::op_context(
                "checking whether route exists",
                spec,
            ))),
        }
    }
}

/// Classify a remote failure for the retry loops.
fn retry_class(error: Error) -> BackoffError<Error> {
    if error.retryable() {
        BackoffError::transient(error)
    } else {
        BackoffError::Permanent(error)
    }
}

/// Locate the route for `destination` in `route_table_id` by exact match.
async fn find_route<C>(
    client: &C,
    route_table_id: &str,
    destination: &IpNet,
) -> Result<RouteState, Error>
where
    C: RouteClient + ?Sized,
{
    let routes = client.list_routes(route_table_id).await?;
    routes
        .into_iter()
        .find(|route| route.destination == *destination)
        .ok_or_else(|| Error::RouteNotFound {
            route_table_id: route_table_id.to_owned(),
            destination: *destination,
        })
}
