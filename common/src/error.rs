// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error handling facilities for route reconciliation
//!
//! Remote-client implementations are responsible for classifying their
//! failures into these variants; the reconciler decides retry-vs-fatal
//! purely from that classification plus the operation in progress.

use oxnet::IpNet;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;

/// An error that can be generated while reconciling a route
///
/// General best practices for error design apply here.  Where possible, we
/// want to reuse existing variants rather than inventing new ones to
/// distinguish cases that no programmatic consumer needs to distinguish.
#[derive(Clone, Debug, Deserialize, thiserror::Error, PartialEq, Serialize)]
pub enum Error {
    /// More than one route target was specified in the desired state.
    /// Checked locally, before any remote call is made.
    #[error(
        "more than one route target specified ({fields}): exactly one of \
         internet gateway, NAT gateway, instance, network interface, or VPC \
         peering connection is allowed"
    )]
    TargetAmbiguous { fields: String },
    /// No route target was specified in the desired state.
    #[error("no route target specified")]
    NoTargetSpecified,
    /// The remote control plane rejected a parameter, usually a race against
    /// the routing table or target becoming ready.  This is the only
    /// retryable class.
    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },
    /// The routing table itself is gone.  A normal outcome for read and
    /// existence checks (a route cannot outlive its table), fatal elsewhere.
    #[error("route table {route_table_id} not found")]
    RouteTableNotFound { route_table_id: String },
    /// The routing table exists but holds no route for this destination.
    #[error("no route for {destination} in route table {route_table_id}")]
    RouteNotFound { route_table_id: String, destination: IpNet },
    /// A created route never became visible to reads within the poll window.
    #[error(
        "route for {destination} in route table {route_table_id} was \
         created but never became visible"
    )]
    RouteNotConverged { route_table_id: String, destination: IpNet },
    /// Any other remote failure.  Surfaced immediately, never retried.
    #[error("remote request failed: {message}")]
    RemoteRequest { message: String },
}

impl Error {
    /// Returns whether the error is transient and the remote call can
    /// reasonably be retried
    pub fn retryable(&self) -> bool {
        match self {
            Error::InvalidParameter { .. } => true,

            Error::TargetAmbiguous { .. }
            | Error::NoTargetSpecified
            | Error::RouteTableNotFound { .. }
            | Error::RouteNotFound { .. }
            | Error::RouteNotConverged { .. }
            | Error::RemoteRequest { .. } => false,
        }
    }

    /// Returns whether the error was produced locally by target validation,
    /// with no remote call having been made
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::TargetAmbiguous { .. } | Error::NoTargetSpecified
        )
    }

    /// Generates an [`Error::InvalidParameter`] with the given message
    pub fn invalid_parameter(message: &str) -> Error {
        Error::InvalidParameter { message: message.to_owned() }
    }

    /// Generates an [`Error::RouteTableNotFound`] for the given table
    pub fn table_not_found(route_table_id: &str) -> Error {
        Error::RouteTableNotFound { route_table_id: route_table_id.to_owned() }
    }

    /// Generates an [`Error::RemoteRequest`] with the given message
    ///
    /// This is the catch-all for remote failures that are neither the
    /// transient invalid-parameter class nor a not-found condition.
    pub fn remote(message: &str) -> Error {
        Error::RemoteRequest { message: message.to_owned() }
    }

    /// Given an [`Error`] carrying a remote message, return the same error
    /// with `context` prepended to it
    ///
    /// Used by the reconciler to report which operation, table, and
    /// destination a fatal remote failure belongs to.  Variants that already
    /// identify the route are returned unchanged.
    pub fn remote_context<C>(self, context: C) -> Error
    where
        C: Display + Send + Sync + 'static,
    {
        match self {
            Error::InvalidParameter { message } => Error::InvalidParameter {
                message: format!("{}: {}", context, message),
            },
            Error::RemoteRequest { message } => Error::RemoteRequest {
                message: format!("{}: {}", context, message),
            },
            Error::TargetAmbiguous { .. }
            | Error::NoTargetSpecified
            | Error::RouteTableNotFound { .. }
            | Error::RouteNotFound { .. }
            | Error::RouteNotConverged { .. } => self,
        }
    }
}

#[cfg(test)]
mod test {
    use super::Error;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::invalid_parameter("table not ready").retryable());
        assert!(!Error::remote("permission denied").retryable());
        assert!(!Error::table_not_found("rtb-1").retryable());
        assert!(!Error::NoTargetSpecified.retryable());
    }

    #[test]
    fn test_remote_context() {
        let error = Error::remote("access denied")
            .remote_context("creating route (route table rtb-1)");
        assert_eq!(
            error.to_string(),
            "remote request failed: creating route (route table rtb-1): \
             access denied"
        );

        // Variants that already name the route pass through unchanged.
        let error = Error::table_not_found("rtb-1").remote_context("reading");
        assert_eq!(error, Error::table_not_found("rtb-1"));
    }
}
