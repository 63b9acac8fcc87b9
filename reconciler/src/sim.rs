// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory simulation of the remote networking control plane
//!
//! [`SimCloud`] implements [`RouteClient`] against routing tables held in
//! memory.  It models the behaviors the reconciler has to cope with in the
//! real control plane: routes that are invisible to reads for a while after
//! creation, the interface id the provider discovers for instance-targeted
//! routes, and injectable per-call failures.  It also counts calls so tests
//! can assert exactly which remote operations ran.

use crate::client::RouteClient;
use crate::store::RouteStore;
use async_trait::async_trait;
use cloudroute_common::api::RouteIdentity;
use cloudroute_common::api::RouteLifecycleState;
use cloudroute_common::api::RouteOrigin;
use cloudroute_common::api::RouteState;
use cloudroute_common::api::RouteTarget;
use cloudroute_common::error::Error;
use oxnet::IpNet;
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Account id the simulation reports as the owner of instance targets.
const SIM_OWNER_ID: &str = "586931053439";

/// Remote operations that can be counted and scripted to fail
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimOp {
    CreateRoute,
    ReplaceRoute,
    DeleteRoute,
    ListRoutes,
}

struct SimRoute {
    state: RouteState,
    /// Number of list calls this route stays invisible for.
    hidden_list_calls: usize,
}

#[derive(Default)]
struct SimTable {
    routes: Vec<SimRoute>,
}

#[derive(Default)]
struct SimInner {
    tables: BTreeMap<String, SimTable>,
    injected: BTreeMap<SimOp, VecDeque<Error>>,
    calls: BTreeMap<SimOp, usize>,
    visibility_delay: usize,
    next_interface: usize,
}

impl SimInner {
    /// Count the call and pop a scripted failure for it, if any.
    fn begin(&mut self, op: SimOp) -> Result<(), Error> {
        *self.calls.entry(op).or_insert(0) += 1;
        if let Some(queue) = self.injected.get_mut(&op) {
            if let Some(error) = queue.pop_front() {
                return Err(error);
            }
        }
        Ok(())
    }

    fn table(&mut self, route_table_id: &str) -> Result<&mut SimTable, Error> {
        self.tables
            .get_mut(route_table_id)
            .ok_or_else(|| Error::table_not_found(route_table_id))
    }

    /// Produce the state the control plane would report for `target`.
    ///
    /// Instance targets gain a discovered network interface id and an owner
    /// account id.
    fn observe(&mut self, target: &RouteTarget) -> (RouteTarget, Option<String>) {
        match target {
            RouteTarget::Instance { id, .. } => {
                self.next_interface += 1;
                let interface = format!("eni-sim{:04x}", self.next_interface);
                (
                    RouteTarget::Instance {
                        id: id.clone(),
                        network_interface_id: Some(interface),
                    },
                    Some(SIM_OWNER_ID.to_string()),
                )
            }
            other => (other.clone(), None),
        }
    }
}

/// An in-memory control plane holding simulated routing tables
pub struct SimCloud {
    inner: Mutex<SimInner>,
}

impl SimCloud {
    pub fn new() -> SimCloud {
        SimCloud { inner: Mutex::new(SimInner::default()) }
    }

    /// Create an empty routing table.
    pub fn add_table(&self, route_table_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.tables.insert(route_table_id.to_owned(), SimTable::default());
    }

    /// Drop a routing table and everything in it.
    pub fn remove_table(&self, route_table_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.tables.remove(route_table_id);
    }

    /// Make newly-created routes invisible for the next `list_calls` list
    /// operations, modeling the control plane's eventual consistency.
    pub fn set_visibility_delay(&self, list_calls: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.visibility_delay = list_calls;
    }

    /// Script the next call of `op` to fail with `error`.  Repeated
    /// injections queue up in order.
    pub fn inject_error(&self, op: SimOp, error: Error) {
        let mut inner = self.inner.lock().unwrap();
        inner.injected.entry(op).or_default().push_back(error);
    }

    /// Returns how many times `op` has been invoked.
    pub fn call_count(&self, op: SimOp) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.calls.get(&op).copied().unwrap_or(0)
    }

    /// Returns the current (fully visible) state of the route for
    /// `destination`, if any.
    pub fn route(
        &self,
        route_table_id: &str,
        destination: &IpNet,
    ) -> Option<RouteState> {
        let inner = self.inner.lock().unwrap();
        let table = inner.tables.get(route_table_id)?;
        table
            .routes
            .iter()
            .find(|route| route.state.destination == *destination)
            .map(|route| route.state.clone())
    }
}

impl Default for SimCloud {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouteClient for SimCloud {
    async fn create_route(
        &self,
        route_table_id: &str,
        destination: &IpNet,
        target: &RouteTarget,
    ) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.begin(SimOp::CreateRoute)?;
        let (target, instance_owner_id) = inner.observe(target);
        let hidden_list_calls = inner.visibility_delay;
        let table = inner.table(route_table_id)?;
        if table
            .routes
            .iter()
            .any(|route| route.state.destination == *destination)
        {
            return Err(Error::remote(&format!(
                "route for {} already exists",
                destination
            )));
        }
        table.routes.push(SimRoute {
            state: RouteState {
                destination: *destination,
                target: Some(target),
                destination_prefix_list_id: None,
                instance_owner_id,
                origin: RouteOrigin::CreateRoute,
                state: RouteLifecycleState::Active,
            },
            hidden_list_calls,
        });
        Ok(())
    }

    async fn replace_route(
        &self,
        route_table_id: &str,
        destination: &IpNet,
        target: &RouteTarget,
    ) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.begin(SimOp::ReplaceRoute)?;
        let (target, instance_owner_id) = inner.observe(target);
        let table = inner.table(route_table_id)?;
        let route = table
            .routes
            .iter_mut()
            .find(|route| route.state.destination == *destination)
            .ok_or_else(|| Error::RouteNotFound {
                route_table_id: route_table_id.to_owned(),
                destination: *destination,
            })?;
        route.state.target = Some(target);
        route.state.instance_owner_id = instance_owner_id;
        Ok(())
    }

    async fn delete_route(
        &self,
        route_table_id: &str,
        destination: &IpNet,
    ) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.begin(SimOp::DeleteRoute)?;
        let table = inner.table(route_table_id)?;
        let before = table.routes.len();
        table.routes.retain(|route| route.state.destination != *destination);
        if table.routes.len() == before {
            return Err(Error::RouteNotFound {
                route_table_id: route_table_id.to_owned(),
                destination: *destination,
            });
        }
        Ok(())
    }

    async fn list_routes(
        &self,
        route_table_id: &str,
    ) -> Result<Vec<RouteState>, Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.begin(SimOp::ListRoutes)?;
        let table = inner.table(route_table_id)?;
        let mut routes = Vec::new();
        for route in table.routes.iter_mut() {
            if route.hidden_list_calls > 0 {
                route.hidden_list_calls -= 1;
                continue;
            }
            routes.push(route.state.clone());
        }
        Ok(routes)
    }
}

/// A minimal [`RouteStore`] recording what the reconciler wrote back
#[derive(Debug, Default)]
pub struct SimRouteStore {
    pub observed: Option<RouteState>,
    pub identity: Option<RouteIdentity>,
}

impl RouteStore for SimRouteStore {
    fn set_observed(&mut self, state: &RouteState) {
        self.observed = Some(state.clone());
    }

    fn set_identity(&mut self, identity: RouteIdentity) {
        self.identity = Some(identity);
    }

    fn clear_identity(&mut self) {
        self.identity = None;
    }
}
