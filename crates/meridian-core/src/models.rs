//! Canonical record model and search input/output types.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AppError;

/// Well-known index field names.
pub mod fields {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const URL: &str = "url";
    pub const TYPE: &str = "type";
    pub const VARIABLE: &str = "variable";
    pub const CF_VARIABLE: &str = "cf_variable";
    pub const DATASET_ID: &str = "dataset_id";
    pub const SIZE: &str = "size";
}

/// Record type assigned to dataset-level records.
pub const TYPE_DATASET: &str = "Dataset";
/// Record type assigned to file-level records.
pub const TYPE_FILE: &str = "File";

/// A named, multi-valued record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub values: Vec<String>,
}

/// Canonical, index-agnostic metadata record.
///
/// The identifier is fixed at construction and can never be empty. Fields keep
/// the order in which they were first added, and each field keeps its values
/// in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    id: String,
    fields: Vec<Field>,
}

impl Record {
    /// Creates an empty record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRecord` if `id` is empty or only whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, AppError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(AppError::InvalidRecord(
                "record identifier cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            fields: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Appends a value to the named field, creating the field if needed.
    ///
    /// The `id` field is reserved: values added under that name are dropped,
    /// since the identifier cannot change once set.
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if name == fields::ID {
            tracing::debug!(record = %self.id, "Ignoring value for reserved field 'id'");
            return;
        }
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.values.push(value),
            None => self.fields.push(Field {
                name,
                values: vec![value],
            }),
        }
    }

    /// Builder-style variant of [`add_field`](Self::add_field).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_field(name, value);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns all values of a field, or `None` when the field is absent.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.values.as_slice())
    }

    /// Returns the first value of a field.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.first(fields::TITLE)
    }

    pub fn record_type(&self) -> Option<&str> {
        self.first(fields::TYPE)
    }
}

/// Kind of remote metadata repository being crawled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryType {
    /// Remote hierarchical catalog fetched over HTTP(S).
    #[default]
    Thredds,
    /// Catalog tree stored on the local filesystem.
    Local,
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryType::Thredds => write!(f, "thredds"),
            RepositoryType::Local => write!(f, "local"),
        }
    }
}

impl FromStr for RepositoryType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thredds" => Ok(RepositoryType::Thredds),
            "local" => Ok(RepositoryType::Local),
            other => Err(AppError::ConfigError(format!(
                "Unknown repository type: {other} (expected 'thredds' or 'local')"
            ))),
        }
    }
}

/// Abstract search request, independent of the index backend.
///
/// An input with no text, no type and no constraints matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchInput {
    /// Free-text query.
    pub text: Option<String>,
    /// Exact filter on the record type field.
    pub record_type: Option<String>,
    /// Facet name to required values. Every value becomes its own exact filter.
    pub constraints: BTreeMap<String, BTreeSet<String>>,
    /// Facets whose value distributions should be returned.
    pub facets: BTreeSet<String>,
    /// Index of the first result to return.
    pub offset: usize,
    /// Maximum number of results; `None` leaves the backend default.
    pub limit: Option<usize>,
}

impl SearchInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    pub fn with_constraint(mut self, facet: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_constraint(facet, value);
        self
    }

    pub fn with_facet(mut self, facet: impl Into<String>) -> Self {
        self.facets.insert(facet.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn add_constraint(&mut self, facet: impl Into<String>, value: impl Into<String>) {
        self.constraints
            .entry(facet.into())
            .or_default()
            .insert(value.into());
    }
}

/// One value of a facet with its number of matching records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetValue {
    pub value: String,
    pub count: u64,
}

/// Value distribution of a single facet, in the order reported by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet {
    pub name: String,
    pub values: Vec<FacetValue>,
}

impl Facet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn value_set(&self) -> BTreeSet<String> {
        self.values.iter().map(|v| v.value.clone()).collect()
    }
}

/// Result of a search against the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchOutput {
    /// Total number of matching records, independent of pagination.
    pub counts: u64,
    /// Offset of the first returned result.
    pub offset: u64,
    pub results: Vec<Record>,
    pub facets: BTreeMap<String, Facet>,
}

/// Outcome of looking up a record by its unique identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(Record),
    NotFound,
    /// More than one record matched; carries the number of matches.
    Ambiguous(u64),
}

impl LookupOutcome {
    /// Classifies a search output by its total match count.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MalformedDocument` if the index reports exactly one
    /// match but returns no document for it.
    pub fn from_output(output: SearchOutput) -> Result<Self, AppError> {
        match output.counts {
            0 => Ok(LookupOutcome::NotFound),
            1 => output
                .results
                .into_iter()
                .next()
                .map(LookupOutcome::Found)
                .ok_or_else(|| {
                    AppError::MalformedDocument(
                        "index reported one match but returned no document".to_string(),
                    )
                }),
            n => Ok(LookupOutcome::Ambiguous(n)),
        }
    }
}
