//! Closed vocabularies: diagram kinds, shape kinds and connector kinds.
//!
//! Every vocabulary is an explicit `variant <-> canonical string` table. Lookups never fail:
//! unknown input resolves to the vocabulary's fallback so payloads authored by newer or older
//! renderers still decode to something usable.

use serde::{Deserialize, Serialize};

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        pub enum $name:ident (fallback = $fallback:ident) {
            $( $variant:ident => $text:literal, )+
        }
        aliases { $( $alias:literal => $target:ident, )* }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$variant, )+];

            /// The value unknown input resolves to.
            pub const FALLBACK: $name = $name::$fallback;

            const ALIASES: &'static [(&'static str, $name)] = &[$( ($alias, $name::$target), )*];

            /// Canonical string form.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }

            /// Looks up a canonical string or alias. Returns `None` for unknown input.
            pub fn lookup(raw: &str) -> Option<Self> {
                let raw = raw.trim();
                match raw {
                    $( $text => return Some($name::$variant), )+
                    _ => {}
                }
                if let Some(v) = Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(raw))
                {
                    return Some(v);
                }
                Self::ALIASES
                    .iter()
                    .find(|(alias, _)| alias.eq_ignore_ascii_case(raw))
                    .map(|(_, v)| *v)
            }

            /// Like [`Self::lookup`], but resolves unknown input to [`Self::FALLBACK`].
            pub fn parse(raw: &str) -> Self {
                Self::lookup(raw).unwrap_or(Self::FALLBACK)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::FALLBACK
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::parse(s))
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }
    };
}

vocabulary! {
    /// The diagram kind recorded in the envelope's `<diagram name="...">` header.
    pub enum DiagramKind (fallback = Flowchart) {
        Flowchart => "flowchart",
        Sequence => "sequence",
        Er => "er",
        Uml => "uml",
        Network => "network",
        Mindmap => "mindmap",
        Org => "org",
        Timeline => "timeline",
    }
    aliases {
        "org_chart" => Org,
        "orgchart" => Org,
        "entity-relationship" => Er,
    }
}

vocabulary! {
    /// Shape identifiers as they appear in the `shape=` key of a style-string.
    pub enum ShapeKind (fallback = Rectangle) {
        // Generic
        Rectangle => "rectangle",
        Ellipse => "ellipse",
        Rhombus => "rhombus",
        Triangle => "triangle",
        Hexagon => "hexagon",
        Actor => "actor",
        Note => "note",
        Text => "text",
        Card => "card",
        Step => "step",
        Cube => "cube",
        Cylinder => "cylinder",
        Cloud => "cloud",
        Star => "star",

        // Flowchart
        Process => "process",
        Parallelogram => "parallelogram",
        Document => "document",
        ManualInput => "manualInput",
        PredefinedProcess => "mxgraph.flowchart.predefined_process",
        StoredData => "mxgraph.flowchart.stored_data",
        InternalStorage => "mxgraph.flowchart.internal_storage",
        Merge => "mxgraph.flowchart.merge",
        Extract => "mxgraph.flowchart.extract",
        Delay => "mxgraph.flowchart.delay",
        SummingPoint => "mxgraph.flowchart.summing_point",
        Or => "mxgraph.flowchart.or",
        Display => "mxgraph.flowchart.display",

        // Network
        Server => "mxgraph.networks.server",
        NetworkCloud => "mxgraph.networks.cloud",
        Firewall => "mxgraph.networks.firewall",
        Router => "mxgraph.networks.router",
        Switch => "mxgraph.networks.switch",
        WirelessRouter => "mxgraph.networks.wireless_router",
        Database => "mxgraph.networks.database",
        User => "mxgraph.networks.user",
        Laptop => "mxgraph.networks.laptop",
        Pc => "mxgraph.networks.pc",
        Mobile => "mxgraph.networks.mobile",
        Storage => "mxgraph.networks.storage",
        LoadBalancer => "mxgraph.networks.load_balancer",
        Proxy => "mxgraph.networks.proxy",
        Wan => "mxgraph.networks.wan",
        Satellite => "mxgraph.networks.satellite",
        Vpn => "mxgraph.networks.vpn",
        Ids => "mxgraph.networks.ids",
        Rack => "mxgraph.networks.rack",
        WirelessAccessPoint => "mxgraph.networks.wireless_access_point",

        // Containers
        Container => "mxgraph.kubernetes.container",
        Pod => "mxgraph.kubernetes.pod",
        Service => "mxgraph.kubernetes.service",
        Volume => "mxgraph.kubernetes.volume",
        Deployment => "mxgraph.kubernetes.deploy",
        StatefulSet => "mxgraph.kubernetes.sts",
        ConfigMap => "mxgraph.kubernetes.cm",
        Secret => "mxgraph.kubernetes.secret",
        Ingress => "mxgraph.kubernetes.ing",

        // AWS
        AwsCloud => "mxgraph.aws4.cloud",
        AwsEc2 => "mxgraph.aws4.ec2",
        AwsS3 => "mxgraph.aws4.s3",
        AwsRds => "mxgraph.aws4.rds",
        AwsLambda => "mxgraph.aws4.lambda",
        AwsVpc => "mxgraph.aws4.vpc",
        AwsSubnet => "mxgraph.aws4.subnet",
        AwsAutoScaling => "mxgraph.aws4.auto_scaling",
        AwsElb => "mxgraph.aws4.elastic_load_balancing",
        AwsEcs => "mxgraph.aws4.ecs",
        AwsEks => "mxgraph.aws4.eks",
        AwsApiGateway => "mxgraph.aws4.api_gateway",
        AwsCloudFront => "mxgraph.aws4.cloudfront",
        AwsRoute53 => "mxgraph.aws4.route_53",
        AwsSqs => "mxgraph.aws4.sqs",
        AwsSns => "mxgraph.aws4.sns",

        // Azure
        AzureVm => "mxgraph.azure.virtual_machine",
        AzureAppService => "mxgraph.azure.app_service",
        AzureSql => "mxgraph.azure.sql_database",
        AzureStorage => "mxgraph.azure.storage",
        AzureFunctions => "mxgraph.azure.functions",
        AzureCosmosDb => "mxgraph.azure.cosmos_db",
        AzureKubernetes => "mxgraph.azure.aks",

        // GCP
        GcpCompute => "mxgraph.gcp.compute_engine",
        GcpCloudRun => "mxgraph.gcp.cloud_run",
        GcpGke => "mxgraph.gcp.gke",
        GcpCloudSql => "mxgraph.gcp.cloud_sql",
        GcpCloudStorage => "mxgraph.gcp.cloud_storage",
        GcpBigQuery => "mxgraph.gcp.bigquery",

        // UML
        UmlClass => "mxgraph.uml.class",
        UmlInterface => "mxgraph.uml.interface",
        UmlPackage => "mxgraph.uml.package",
        UmlActor => "mxgraph.uml.actor",
        UmlUseCase => "mxgraph.uml.useCase",
        UmlLifeline => "mxgraph.uml.lifeline",
        UmlActivation => "mxgraph.uml.activation",
    }
    aliases {
        "rect" => Rectangle,
        "circle" => Ellipse,
        "start_end" => Ellipse,
        "diamond" => Rhombus,
        "decision" => Rhombus,
        "input_output" => Parallelogram,
        "preparation" => Hexagon,
        "data" => Cylinder,
        "manual_input" => ManualInput,
    }
}

vocabulary! {
    /// Connector routing/semantics, stored in the `edgeStyle=` key of a connector style-string.
    pub enum ConnectorKind (fallback = Straight) {
        Straight => "straight",
        Curved => "curved",
        Orthogonal => "orthogonal",
        Bidirectional => "bidirectional",
        Dashed => "dashed",
        Dotted => "dotted",
        Arrow => "arrow",
        DoubleArrow => "double_arrow",
        ThickArrow => "thickArrow",
        ThinArrow => "thinArrow",
        Async => "async",
        Sync => "sync",
        Aggregation => "aggregation",
        Composition => "composition",
        Inheritance => "inheritance",
        Implementation => "implementation",
        Dependency => "dependency",
        Custom => "custom",
    }
    aliases {
        "double-arrow" => DoubleArrow,
        "thick-arrow" => ThickArrow,
        "thin-arrow" => ThinArrow,
        "orthogonalEdgeStyle" => Orthogonal,
        "elbowEdgeStyle" => Orthogonal,
    }
}

/// Arrow-head presentation keys implied by a connector kind.
///
/// These keys only affect how draw.io renders the edge; the decoder recovers the kind from
/// `edgeStyle` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArrowHeads {
    pub start: Option<(&'static str, bool)>,
    pub end: Option<(&'static str, bool)>,
}

impl ConnectorKind {
    pub(crate) fn arrow_heads(self) -> ArrowHeads {
        let (start, end) = match self {
            ConnectorKind::Arrow | ConnectorKind::ThickArrow | ConnectorKind::ThinArrow => {
                (None, Some(("classic", true)))
            }
            ConnectorKind::DoubleArrow | ConnectorKind::Bidirectional => {
                (Some(("classic", true)), Some(("classic", true)))
            }
            ConnectorKind::Async | ConnectorKind::Dependency => (None, Some(("open", false))),
            ConnectorKind::Sync => (None, Some(("block", true))),
            ConnectorKind::Inheritance | ConnectorKind::Implementation => {
                (None, Some(("block", false)))
            }
            ConnectorKind::Aggregation => (None, Some(("diamondThin", false))),
            ConnectorKind::Composition => (None, Some(("diamondThin", true))),
            ConnectorKind::Straight
            | ConnectorKind::Curved
            | ConnectorKind::Orthogonal
            | ConnectorKind::Dashed
            | ConnectorKind::Dotted
            | ConnectorKind::Custom => (None, None),
        };
        ArrowHeads { start, end }
    }
}
