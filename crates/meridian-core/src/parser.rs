//! Strategies turning catalog nodes into records.
//!
//! Every strategy shares the same field mapping for a single node; they
//! differ in how many records one node yields:
//!
//! - [`ParserStrategy::TopLevelDataset`]: one "Dataset" record per node.
//! - [`ParserStrategy::DatasetWithChildren`]: the dataset record followed by
//!   one "File" record per descendant leaf.
//! - [`ParserStrategy::Aggregation`]: one "Dataset" record that also carries
//!   the node's access endpoints as `url` values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{is_controlled_vocabulary, CatalogNode};
use crate::models::{fields, TYPE_DATASET, TYPE_FILE};
use crate::{AppError, Record};

/// Shape of catalog handled by a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParserStrategy {
    #[default]
    TopLevelDataset,
    DatasetWithChildren,
    Aggregation,
}

impl fmt::Display for ParserStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParserStrategy::TopLevelDataset => "top-level-dataset",
            ParserStrategy::DatasetWithChildren => "dataset-with-children",
            ParserStrategy::Aggregation => "aggregation",
        };
        f.write_str(name)
    }
}

impl FromStr for ParserStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top-level-dataset" => Ok(ParserStrategy::TopLevelDataset),
            "dataset-with-children" => Ok(ParserStrategy::DatasetWithChildren),
            "aggregation" => Ok(ParserStrategy::Aggregation),
            other => Err(AppError::ConfigError(format!(
                "Unknown parser strategy: {other}"
            ))),
        }
    }
}

/// How the canonical `url` of a dataset record is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UrlBuilder {
    /// `<catalog uri>#<node id>`.
    #[default]
    CatalogUrl,
    /// The first access endpoint of the node, falling back to the catalog URL.
    AccessUrl,
}

impl UrlBuilder {
    /// Builds the URL for a node whose identifier is `id`.
    pub fn build_url(&self, catalog_uri: &str, id: &str, node: &CatalogNode) -> String {
        match self {
            UrlBuilder::CatalogUrl => format!("{catalog_uri}#{id}"),
            UrlBuilder::AccessUrl => node
                .access
                .first()
                .map(|access| access.resolved_url())
                .unwrap_or_else(|| UrlBuilder::CatalogUrl.build_url(catalog_uri, id, node)),
        }
    }
}

impl FromStr for UrlBuilder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "catalog-url" => Ok(UrlBuilder::CatalogUrl),
            "access-url" => Ok(UrlBuilder::AccessUrl),
            other => Err(AppError::ConfigError(format!("Unknown URL builder: {other}"))),
        }
    }
}

/// Records derived from one catalog node.
#[derive(Debug, Default)]
pub struct ParsedNode {
    pub records: Vec<Record>,
    /// Descendants that were skipped because they were invalid.
    pub warnings: Vec<AppError>,
}

/// Converts catalog nodes into records using a fixed strategy and URL builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogParser {
    strategy: ParserStrategy,
    url_builder: UrlBuilder,
}

impl CatalogParser {
    pub fn new(strategy: ParserStrategy, url_builder: UrlBuilder) -> Self {
        Self {
            strategy,
            url_builder,
        }
    }

    /// Parses one top-level node from the catalog at `catalog_uri`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidCatalogNode` if the node itself has no
    /// identifier or name. Invalid descendants do not fail the call; they are
    /// reported in [`ParsedNode::warnings`].
    pub fn parse(&self, catalog_uri: &str, node: &CatalogNode) -> Result<ParsedNode, AppError> {
        let dataset = self.node_record(catalog_uri, node, TYPE_DATASET)?;
        let mut parsed = ParsedNode::default();

        match self.strategy {
            ParserStrategy::TopLevelDataset => {
                // Access entries carry no fields for plain datasets.
                for access in &node.access {
                    tracing::trace!(
                        dataset = dataset.id(),
                        url_path = %access.url_path,
                        "Skipping access entry"
                    );
                }
                parsed.records.push(dataset);
            }
            ParserStrategy::DatasetWithChildren => {
                let dataset_id = dataset.id().to_string();
                parsed.records.push(dataset);
                for leaf in node.descendant_leaves() {
                    match self.file_record(catalog_uri, leaf, &dataset_id) {
                        Ok(record) => parsed.records.push(record),
                        Err(e) => parsed.warnings.push(e),
                    }
                }
            }
            ParserStrategy::Aggregation => {
                let mut dataset = dataset;
                for access in &node.access {
                    dataset.add_field(fields::URL, access.resolved_url());
                }
                parsed.records.push(dataset);
            }
        }

        Ok(parsed)
    }

    fn file_record(
        &self,
        catalog_uri: &str,
        node: &CatalogNode,
        dataset_id: &str,
    ) -> Result<Record, AppError> {
        let mut record = self.node_record(catalog_uri, node, TYPE_FILE)?;
        record.add_field(fields::DATASET_ID, dataset_id);
        if let Some(size) = node.data_size {
            record.add_field(fields::SIZE, size.to_string());
        }
        for access in &node.access {
            record.add_field(fields::URL, access.resolved_url());
        }
        Ok(record)
    }

    /// Field mapping shared by every strategy.
    fn node_record(
        &self,
        catalog_uri: &str,
        node: &CatalogNode,
        record_type: &str,
    ) -> Result<Record, AppError> {
        let id = node
            .id()
            .ok_or_else(|| AppError::InvalidCatalogNode("Dataset ID cannot be null".to_string()))?;
        let name = node.name().ok_or_else(|| {
            AppError::InvalidCatalogNode(format!("Dataset name cannot be null (id: {id})"))
        })?;

        let mut record = Record::new(id)?;
        record.add_field(fields::TITLE, name);
        record.add_field(
            fields::URL,
            self.url_builder.build_url(catalog_uri, id, node),
        );
        record.add_field(fields::TYPE, record_type);

        for documentation in &node.documentation {
            if let Some(content) = documentation.content.as_deref() {
                if !content.trim().is_empty() {
                    record.add_field(fields::DESCRIPTION, content);
                }
            }
        }

        for list in &node.variables {
            let controlled = list
                .vocabulary
                .as_deref()
                .map_or(false, is_controlled_vocabulary);
            for variable in &list.variables {
                record.add_field(fields::VARIABLE, variable.name.as_str());
                if controlled {
                    if let Some(description) = variable.description.as_deref() {
                        record.add_field(fields::CF_VARIABLE, description);
                    }
                }
            }
        }

        // The node name already provided the title.
        for property in &node.properties {
            if property.name == fields::TITLE {
                record.add_field(fields::DESCRIPTION, property.value.as_str());
            } else {
                record.add_field(property.name.as_str(), property.value.as_str());
            }
        }

        Ok(record)
    }
}
