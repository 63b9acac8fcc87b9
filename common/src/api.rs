// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data model for route reconciliation
//!
//! A route maps a destination CIDR block to exactly one target resource in a
//! routing table.  The driver supplies desired state as a [`RouteSpec`]; the
//! remote control plane reports observed state as [`RouteState`]s.  Routes
//! have no provider-assigned id, so a stable synthetic [`RouteIdentity`] is
//! derived from the routing table id and the destination.

use crate::error::Error;
use oxnet::IpNet;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use std::fmt;

/// The resource a route forwards matching traffic to
///
/// Exactly one target is in play at a time.  The `Instance` variant carries
/// the network interface id that the provider discovers and reports as a side
/// effect of creating an instance-targeted route; it is informational and
/// never sent back on the wire.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type", content = "value")]
pub enum RouteTarget {
    Gateway(String),
    NatGateway(String),
    Instance { id: String, network_interface_id: Option<String> },
    NetworkInterface(String),
    VpcPeeringConnection(String),
}

impl RouteTarget {
    /// Returns the target kind as a wire-friendly label
    pub fn kind(&self) -> &'static str {
        match self {
            RouteTarget::Gateway(_) => "gateway",
            RouteTarget::NatGateway(_) => "nat_gateway",
            RouteTarget::Instance { .. } => "instance",
            RouteTarget::NetworkInterface(_) => "network_interface",
            RouteTarget::VpcPeeringConnection(_) => "vpc_peering_connection",
        }
    }

    /// Returns the id of the targeted resource
    pub fn id(&self) -> &str {
        match self {
            RouteTarget::Gateway(id)
            | RouteTarget::NatGateway(id)
            | RouteTarget::Instance { id, .. }
            | RouteTarget::NetworkInterface(id)
            | RouteTarget::VpcPeeringConnection(id) => id,
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// One of the five driver-visible target fields
///
/// The enumeration order here is the fixed resolution order: when target
/// validation reports an ambiguity, the last populated field in this order is
/// the one that had been selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TargetField {
    Gateway,
    NatGateway,
    Instance,
    NetworkInterface,
    VpcPeeringConnection,
}

impl TargetField {
    fn name(&self) -> &'static str {
        match self {
            TargetField::Gateway => "gateway_id",
            TargetField::NatGateway => "nat_gateway_id",
            TargetField::Instance => "instance_id",
            TargetField::NetworkInterface => "network_interface_id",
            TargetField::VpcPeeringConnection => "vpc_peering_connection_id",
        }
    }

    fn target(&self, id: &str) -> RouteTarget {
        let id = id.to_owned();
        match self {
            TargetField::Gateway => RouteTarget::Gateway(id),
            TargetField::NatGateway => RouteTarget::NatGateway(id),
            TargetField::Instance => {
                RouteTarget::Instance { id, network_interface_id: None }
            }
            TargetField::NetworkInterface => RouteTarget::NetworkInterface(id),
            TargetField::VpcPeeringConnection => {
                RouteTarget::VpcPeeringConnection(id)
            }
        }
    }
}

/// The raw target fields of a desired-state record, as supplied by the driver
///
/// At most one field may be populated; [`TargetSelection::resolve_for_create`]
/// and [`TargetSelection::resolve_for_update`] enforce this and produce the
/// resolved [`RouteTarget`].  An empty string is treated the same as an absent
/// field.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TargetSelection {
    #[serde(default)]
    pub gateway_id: Option<String>,
    #[serde(default)]
    pub nat_gateway_id: Option<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub network_interface_id: Option<String>,
    #[serde(default)]
    pub vpc_peering_connection_id: Option<String>,
}

impl TargetSelection {
    pub fn gateway(id: &str) -> TargetSelection {
        TargetSelection {
            gateway_id: Some(id.to_owned()),
            ..Default::default()
        }
    }

    pub fn nat_gateway(id: &str) -> TargetSelection {
        TargetSelection {
            nat_gateway_id: Some(id.to_owned()),
            ..Default::default()
        }
    }

    pub fn instance(id: &str) -> TargetSelection {
        TargetSelection {
            instance_id: Some(id.to_owned()),
            ..Default::default()
        }
    }

    pub fn network_interface(id: &str) -> TargetSelection {
        TargetSelection {
            network_interface_id: Some(id.to_owned()),
            ..Default::default()
        }
    }

    pub fn vpc_peering_connection(id: &str) -> TargetSelection {
        TargetSelection {
            vpc_peering_connection_id: Some(id.to_owned()),
            ..Default::default()
        }
    }

    /// Returns the populated fields in resolution order
    fn populated(&self) -> Vec<(TargetField, &str)> {
        let fields = [
            (TargetField::Gateway, &self.gateway_id),
            (TargetField::NatGateway, &self.nat_gateway_id),
            (TargetField::Instance, &self.instance_id),
            (TargetField::NetworkInterface, &self.network_interface_id),
            (TargetField::VpcPeeringConnection, &self.vpc_peering_connection_id),
        ];
        fields
            .into_iter()
            .filter_map(|(field, value)| match value.as_deref() {
                Some(id) if !id.is_empty() => Some((field, id)),
                _ => None,
            })
            .collect()
    }

    fn ambiguous(populated: &[(TargetField, &str)]) -> Error {
        let fields = populated
            .iter()
            .map(|(field, _)| field.name())
            .collect::<Vec<_>>()
            .join(", ");
        Error::TargetAmbiguous { fields }
    }

    /// Resolve the target for route creation
    ///
    /// Exactly one field must be populated.
    pub fn resolve_for_create(&self) -> Result<RouteTarget, Error> {
        let populated = self.populated();
        if populated.len() > 1 {
            return Err(Self::ambiguous(&populated));
        }
        match populated.last() {
            Some((field, id)) => Ok(field.target(id)),
            None => Err(Error::NoTargetSpecified),
        }
    }

    /// Resolve the target for route replacement
    ///
    /// Same rule as creation with one carve-out: the provider populates the
    /// network interface id itself when it creates an instance-targeted
    /// route, so a record being updated may legitimately show exactly
    /// instance + network interface.  That combination resolves to the
    /// instance; any other multi-field combination is ambiguous.
    pub fn resolve_for_update(&self) -> Result<RouteTarget, Error> {
        let populated = self.populated();
        if populated.len() == 2
            && populated
                .iter()
                .all(|(field, _)| {
                    matches!(
                        field,
                        TargetField::Instance | TargetField::NetworkInterface
                    )
                })
        {
            // populated() is in resolution order, so instance comes first.
            let (_, instance_id) = populated[0];
            let (_, interface_id) = populated[1];
            return Ok(RouteTarget::Instance {
                id: instance_id.to_owned(),
                network_interface_id: Some(interface_id.to_owned()),
            });
        }
        if populated.len() > 1 {
            return Err(Self::ambiguous(&populated));
        }
        match populated.last() {
            Some((field, id)) => Ok(field.target(id)),
            None => Err(Error::NoTargetSpecified),
        }
    }
}

/// Desired state for a single route, supplied by the lifecycle driver
///
/// The routing table id and destination are immutable for the life of the
/// route; only the target may change across updates.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteSpec {
    pub route_table_id: String,
    pub destination: IpNet,
    #[serde(flatten)]
    pub target: TargetSelection,
}

/// How a route came to exist, as reported by the provider
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum RouteOrigin {
    CreateRouteTable,
    CreateRoute,
    EnableVgwRoutePropagation,
}

impl fmt::Display for RouteOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RouteOrigin::CreateRouteTable => "CreateRouteTable",
            RouteOrigin::CreateRoute => "CreateRoute",
            RouteOrigin::EnableVgwRoutePropagation => {
                "EnableVgwRoutePropagation"
            }
        };
        f.write_str(label)
    }
}

/// Provider-reported lifecycle state of a route
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteLifecycleState {
    Pending,
    Active,
    Blackhole,
}

impl fmt::Display for RouteLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RouteLifecycleState::Pending => "pending",
            RouteLifecycleState::Active => "active",
            RouteLifecycleState::Blackhole => "blackhole",
        };
        f.write_str(label)
    }
}

/// Observed state of a single route, derived from the remote control plane
///
/// Never the source of truth for the target choice during an update; only
/// used to populate computed fields after a successful reconcile.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteState {
    pub destination: IpNet,
    pub target: Option<RouteTarget>,
    pub destination_prefix_list_id: Option<String>,
    pub instance_owner_id: Option<String>,
    pub origin: RouteOrigin,
    pub state: RouteLifecycleState,
}

/// Synthetic stable key for a route
///
/// Routes have no provider-assigned id, so the key is derived from the
/// routing table id and a stable digest of the destination CIDR text.  The
/// destination is immutable after creation, which makes the identity stable
/// for the life of the route.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RouteIdentity(String);

impl RouteIdentity {
    /// Derive the identity for the route at `destination` in
    /// `route_table_id`
    ///
    /// Pure and deterministic: the same inputs always produce the same
    /// identity, across processes and releases.
    pub fn for_route(route_table_id: &str, destination: &IpNet) -> Self {
        let digest = Sha256::digest(destination.to_string().as_bytes());
        let hash =
            u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        RouteIdentity(format!("r-{}{}", route_table_id, hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod test {
    use super::RouteIdentity;
    use super::RouteTarget;
    use super::TargetSelection;
    use crate::error::Error;
    use oxnet::IpNet;

    fn cidr(s: &str) -> IpNet {
        s.parse().unwrap()
    }

    #[test]
    fn test_resolve_single_target() {
        let selection = TargetSelection::gateway("igw-1");
        assert_eq!(
            selection.resolve_for_create().unwrap(),
            RouteTarget::Gateway("igw-1".to_string())
        );

        let selection = TargetSelection::instance("i-1234");
        assert_eq!(
            selection.resolve_for_create().unwrap(),
            RouteTarget::Instance {
                id: "i-1234".to_string(),
                network_interface_id: None,
            }
        );
    }

    #[test]
    fn test_resolve_no_target() {
        let selection = TargetSelection::default();
        assert_eq!(
            selection.resolve_for_create().unwrap_err(),
            Error::NoTargetSpecified
        );
        assert_eq!(
            selection.resolve_for_update().unwrap_err(),
            Error::NoTargetSpecified
        );
    }

    #[test]
    fn test_empty_string_is_unset() {
        let selection = TargetSelection {
            gateway_id: Some(String::new()),
            nat_gateway_id: Some("nat-1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            selection.resolve_for_create().unwrap(),
            RouteTarget::NatGateway("nat-1".to_string())
        );
    }

    #[test]
    fn test_resolve_ambiguous() {
        let selection = TargetSelection {
            gateway_id: Some("igw-1".to_string()),
            nat_gateway_id: Some("nat-1".to_string()),
            ..Default::default()
        };
        let error = selection.resolve_for_create().unwrap_err();
        assert_eq!(
            error,
            Error::TargetAmbiguous {
                fields: "gateway_id, nat_gateway_id".to_string()
            }
        );
        // The same pair is ambiguous for update too.
        assert!(matches!(
            selection.resolve_for_update().unwrap_err(),
            Error::TargetAmbiguous { .. }
        ));
    }

    #[test]
    fn test_update_instance_interface_carve_out() {
        let selection = TargetSelection {
            instance_id: Some("i-1234".to_string()),
            network_interface_id: Some("eni-5678".to_string()),
            ..Default::default()
        };
        // Legal on update: the interface id was discovered by the provider.
        assert_eq!(
            selection.resolve_for_update().unwrap(),
            RouteTarget::Instance {
                id: "i-1234".to_string(),
                network_interface_id: Some("eni-5678".to_string()),
            }
        );
        // Still ambiguous on create.
        assert!(matches!(
            selection.resolve_for_create().unwrap_err(),
            Error::TargetAmbiguous { .. }
        ));
    }

    #[test]
    fn test_update_other_two_field_combinations_are_ambiguous() {
        let selection = TargetSelection {
            instance_id: Some("i-1234".to_string()),
            gateway_id: Some("igw-1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            selection.resolve_for_update().unwrap_err(),
            Error::TargetAmbiguous { .. }
        ));

        // Three fields never qualify for the carve-out.
        let selection = TargetSelection {
            instance_id: Some("i-1234".to_string()),
            network_interface_id: Some("eni-5678".to_string()),
            gateway_id: Some("igw-1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            selection.resolve_for_update().unwrap_err(),
            Error::TargetAmbiguous { .. }
        ));
    }

    #[test]
    fn test_target_wire_shape() {
        let target = RouteTarget::Instance {
            id: "i-1234".to_string(),
            network_interface_id: Some("eni-5678".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&target).unwrap(),
            serde_json::json!({
                "type": "instance",
                "value": {
                    "id": "i-1234",
                    "network_interface_id": "eni-5678",
                },
            })
        );
    }

    #[test]
    fn test_identity_is_deterministic() {
        let first = RouteIdentity::for_route("rtb-1", &cidr("10.0.0.0/16"));
        let second = RouteIdentity::for_route("rtb-1", &cidr("10.0.0.0/16"));
        assert_eq!(first, second);
        assert!(first.as_str().starts_with("r-rtb-1"));
    }

    #[test]
    fn test_identity_varies_with_inputs() {
        let base = RouteIdentity::for_route("rtb-1", &cidr("10.0.0.0/16"));
        let other_cidr =
            RouteIdentity::for_route("rtb-1", &cidr("10.1.0.0/16"));
        let other_table =
            RouteIdentity::for_route("rtb-2", &cidr("10.0.0.0/16"));
        assert_ne!(base, other_cidr);
        assert_ne!(base, other_table);
    }
}
