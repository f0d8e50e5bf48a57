//! Read-only catalog tree handed to the parser strategies.
//!
//! Catalog transports deserialize remote documents into [`CatalogNode`] trees.
//! The root node stands for the catalog itself; its children are the
//! top-level datasets. Any node may reference child catalogs by URI.

use serde::{Deserialize, Serialize};

/// Controlled vocabulary whose variable descriptions are indexed as `cf_variable`.
pub const CF_VOCABULARY: &str = "CF-1.0";

/// Returns true when `vocabulary` names the known controlled vocabulary.
pub fn is_controlled_vocabulary(vocabulary: &str) -> bool {
    vocabulary == CF_VOCABULARY
}

/// One entry in a hierarchical metadata catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogNode {
    pub id: Option<String>,
    pub name: Option<String>,
    pub documentation: Vec<Documentation>,
    pub variables: Vec<VariableList>,
    pub properties: Vec<Property>,
    pub access: Vec<Access>,
    /// Size in bytes, for nodes describing a single file.
    pub data_size: Option<u64>,
    pub children: Vec<CatalogNode>,
    /// URIs of child catalogs, possibly relative to the current catalog.
    pub catalog_refs: Vec<String>,
}

/// `<documentation type="...">` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Documentation {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Inline text; `None` for documentation that only links elsewhere.
    pub content: Option<String>,
}

/// Variables sharing a naming vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableList {
    pub vocabulary: Option<String>,
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variable {
    pub name: String,
    pub vocabulary_name: Option<String>,
    pub units: Option<String>,
    /// Human-readable description, e.g. "Surface Sensible Heat Flux".
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

/// Service endpoint through which a dataset can be accessed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Access {
    pub service_name: Option<String>,
    pub service_base: Option<String>,
    pub url_path: String,
    pub data_format: Option<String>,
}

impl Access {
    /// Absolute endpoint URL: the service base joined with the url path.
    pub fn resolved_url(&self) -> String {
        match self.service_base.as_deref() {
            Some(base) if !base.is_empty() => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                self.url_path.trim_start_matches('/')
            ),
            _ => self.url_path.clone(),
        }
    }
}

impl CatalogNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Identifier, treating blank strings as absent.
    pub fn id(&self) -> Option<&str> {
        non_blank(self.id.as_deref())
    }

    /// Display name, treating blank strings as absent.
    pub fn name(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }

    /// All leaf nodes strictly below this node, depth-first in document order.
    pub fn descendant_leaves(&self) -> Vec<&CatalogNode> {
        let mut leaves = Vec::new();
        let mut stack: Vec<&CatalogNode> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                leaves.push(node);
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
        leaves
    }

    /// Child-catalog references declared anywhere in this subtree, in document order.
    pub fn all_catalog_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            refs.extend(node.catalog_refs.iter().map(String::as_str));
            stack.extend(node.children.iter().rev());
        }
        refs
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: &str) -> CatalogNode {
        CatalogNode {
            id: Some(id.to_string()),
            name: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_deserialize_minimal_node() {
        let json = r#"{ "id": "ds1", "name": "Dataset One" }"#;
        let node: CatalogNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.id(), Some("ds1"));
        assert_eq!(node.name(), Some("Dataset One"));
        assert!(node.is_leaf());
        assert!(node.documentation.is_empty());
    }

    #[test]
    fn test_deserialize_full_node() {
        let json = r#"{
            "id": "ds1",
            "name": "Dataset One",
            "documentation": [{ "type": "summary", "content": "abstract text" }],
            "variables": [{
                "vocabulary": "CF-1.0",
                "variables": [{ "name": "hfss", "units": "W m-2", "description": "Surface Sensible Heat Flux" }]
            }],
            "properties": [{ "name": "experiment", "value": "rcp85" }],
            "access": [{ "service_name": "HTTPServer", "url_path": "/data/hfss.nc" }],
            "catalog_refs": ["sub/catalog.json"]
        }"#;
        let node: CatalogNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.documentation[0].kind.as_deref(), Some("summary"));
        assert_eq!(node.variables[0].variables[0].name, "hfss");
        assert_eq!(node.properties[0].value, "rcp85");
        assert_eq!(node.access[0].url_path, "/data/hfss.nc");
        assert_eq!(node.catalog_refs, vec!["sub/catalog.json".to_string()]);
    }

    #[test]
    fn test_blank_id_is_absent() {
        let node = CatalogNode {
            id: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(node.id(), None);
        assert_eq!(node.name(), None);
    }

    #[test]
    fn test_descendant_leaves_in_document_order() {
        let mut inner = leaf("inner");
        inner.children = vec![leaf("f2"), leaf("f3")];
        let mut root = leaf("root");
        root.children = vec![leaf("f1"), inner, leaf("f4")];

        let ids: Vec<_> = root
            .descendant_leaves()
            .into_iter()
            .filter_map(CatalogNode::id)
            .collect();
        assert_eq!(ids, vec!["f1", "f2", "f3", "f4"]);
        assert!(leaf("alone").descendant_leaves().is_empty());
    }

    #[test]
    fn test_all_catalog_refs() {
        let mut child = leaf("child");
        child.catalog_refs = vec!["b.json".to_string()];
        let mut root = leaf("root");
        root.catalog_refs = vec!["a.json".to_string()];
        root.children = vec![child];

        assert_eq!(root.all_catalog_refs(), vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_access_resolved_url() {
        let access = Access {
            service_base: Some("http://data.example.org/thredds/fileServer/".to_string()),
            url_path: "/ipcc/hfss.nc".to_string(),
            ..Default::default()
        };
        assert_eq!(
            access.resolved_url(),
            "http://data.example.org/thredds/fileServer/ipcc/hfss.nc"
        );

        let bare = Access {
            url_path: "/ipcc/hfss.nc".to_string(),
            ..Default::default()
        };
        assert_eq!(bare.resolved_url(), "/ipcc/hfss.nc");
    }

    #[test]
    fn test_controlled_vocabulary() {
        assert!(is_controlled_vocabulary("CF-1.0"));
        assert!(!is_controlled_vocabulary("GRIB-1"));
    }
}
