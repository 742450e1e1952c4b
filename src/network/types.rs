//! Network configuration document
//!
//! The configuration source may answer in one of two shapes:
//!
//! - flat: `{ "contentSpaceId", "fabricURIs", "ethereumURIs" }`
//! - fabric node: `{ "qspace": { "id" }, "network": { "services": { "fabric_api", "ethereum_api" } } }`
//!
//! Both normalize into [`NetworkConfig`].

use serde::{Deserialize, Serialize};

use crate::types::{BridgeError, Result};

/// Content space and node endpoints every client is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Content space identifier
    #[serde(rename = "contentSpaceId")]
    pub content_space_id: String,
    /// Fabric API endpoints, in preference order
    #[serde(rename = "fabricURIs")]
    pub fabric_uris: Vec<String>,
    /// Ethereum RPC endpoints
    #[serde(rename = "ethereumURIs", default)]
    pub ethereum_uris: Vec<String>,
}

impl NetworkConfig {
    /// Reject configs no client could be built from
    pub fn validate(&self) -> Result<()> {
        if self.content_space_id.trim().is_empty() {
            return Err(BridgeError::ConfigFetch(
                "configuration has no content space id".into(),
            ));
        }
        if self.fabric_uris.is_empty() {
            return Err(BridgeError::ConfigFetch(
                "configuration lists no fabric URIs".into(),
            ));
        }
        Ok(())
    }

    /// Parse either document shape and validate the result
    pub fn from_document(raw: &[u8]) -> Result<Self> {
        let document: ConfigDocument = serde_json::from_slice(raw)
            .map_err(|e| BridgeError::ConfigFetch(format!("malformed configuration: {e}")))?;

        let config = match document {
            ConfigDocument::Flat(config) => config,
            ConfigDocument::Node(node) => NetworkConfig {
                content_space_id: node.qspace.id,
                fabric_uris: node.network.services.fabric_api,
                ethereum_uris: node.network.services.ethereum_api,
            },
        };

        config.validate()?;
        Ok(config)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigDocument {
    Flat(NetworkConfig),
    Node(NodeDocument),
}

#[derive(Deserialize)]
struct NodeDocument {
    qspace: QSpace,
    network: NodeNetwork,
}

#[derive(Deserialize)]
struct QSpace {
    id: String,
}

#[derive(Deserialize)]
struct NodeNetwork {
    services: NodeServices,
}

#[derive(Deserialize)]
struct NodeServices {
    #[serde(default)]
    fabric_api: Vec<String>,
    #[serde(default)]
    ethereum_api: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_document() {
        let raw = br#"{
            "contentSpaceId": "ispc2RUoRe9eR2v33HARQUVSp1rYXzw1",
            "fabricURIs": ["https://host-1.example/fabric", "https://host-2.example/fabric"],
            "ethereumURIs": ["https://host-1.example/eth"]
        }"#;

        let config = NetworkConfig::from_document(raw).unwrap();
        assert_eq!(config.content_space_id, "ispc2RUoRe9eR2v33HARQUVSp1rYXzw1");
        assert_eq!(config.fabric_uris.len(), 2);
        assert_eq!(config.ethereum_uris, vec!["https://host-1.example/eth"]);
    }

    #[test]
    fn test_parse_node_document() {
        let raw = br#"{
            "node_id": "inod3Sa5p3czRyYi8GnVGnh8gBDLaqJr",
            "qspace": { "id": "ispc3ANoVSzNA3P6t7abLR69ho5YPPZU", "version": "0.1" },
            "network": {
                "services": {
                    "fabric_api": ["https://main.net955305.contentfabric.io"],
                    "ethereum_api": ["https://host-76-74-28-227.contentfabric.io/eth/"]
                }
            }
        }"#;

        let config = NetworkConfig::from_document(raw).unwrap();
        assert_eq!(config.content_space_id, "ispc3ANoVSzNA3P6t7abLR69ho5YPPZU");
        assert_eq!(config.fabric_uris, vec!["https://main.net955305.contentfabric.io"]);
        assert_eq!(config.ethereum_uris.len(), 1);
    }

    #[test]
    fn test_reject_missing_fabric_uris() {
        let raw = br#"{ "contentSpaceId": "ispc1", "fabricURIs": [] }"#;
        let err = NetworkConfig::from_document(raw).unwrap_err();
        assert!(matches!(err, BridgeError::ConfigFetch(_)));
    }

    #[test]
    fn test_reject_garbage() {
        let err = NetworkConfig::from_document(b"<html>not json</html>").unwrap_err();
        assert!(matches!(err, BridgeError::ConfigFetch(_)));
    }

    #[test]
    fn test_serializes_wire_names() {
        let config = NetworkConfig {
            content_space_id: "ispc1".into(),
            fabric_uris: vec!["https://f".into()],
            ethereum_uris: vec![],
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["contentSpaceId"], "ispc1");
        assert_eq!(value["fabricURIs"][0], "https://f");
        assert!(value["ethereumURIs"].as_array().unwrap().is_empty());
    }
}
