//! Translation between [`SearchInput`] and the index query protocol.
//!
//! A query is first assembled as a list of typed [`QueryClause`]s and only
//! rendered to URL parameters at the end, so quoting and encoding live in one
//! place:
//!
//! | clause                 | parameter                 |
//! |------------------------|---------------------------|
//! | `Text("foo")`          | `q=foo`                   |
//! | `Filter(type, Dataset)`| `fq=type:"Dataset"`       |
//! | `Facet(model)`         | `facet.field=model`       |

use std::collections::BTreeMap;

use url::Url;

use crate::models::{fields, Facet, FacetValue, SearchInput, SearchOutput};
use crate::serializer::RecordSerializer;
use crate::xml::{self, XmlElement};
use crate::AppError;

/// Query term used when the input carries no free text.
const MATCH_ALL: &str = "*:*";

/// One element of an index query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryClause {
    /// Free-text query term.
    Text(String),
    /// Exact-match filter on a field.
    Filter { field: String, value: String },
    /// Request for a facet's value distribution.
    Facet(String),
}

/// Structured index query built from a [`SearchInput`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexQuery {
    clauses: Vec<QueryClause>,
    start: usize,
    rows: Option<usize>,
}

impl IndexQuery {
    /// Translates a search input, requesting the facets named in `input.facets`.
    pub fn from_input(input: &SearchInput) -> Result<Self, AppError> {
        Self::with_facets(input, input.facets.iter().map(String::as_str))
    }

    /// Translates a search input, requesting exactly the given facets.
    ///
    /// # Errors
    ///
    /// Returns `AppError::QueryTranslationFailure` if a field name is not a
    /// plain identifier or any term contains control characters.
    pub fn with_facets<'a>(
        input: &SearchInput,
        facets: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, AppError> {
        let mut clauses = Vec::new();

        if let Some(text) = input.text.as_deref().filter(|t| !t.trim().is_empty()) {
            check_term(text)?;
            clauses.push(QueryClause::Text(text.to_string()));
        }

        if let Some(record_type) = input.record_type.as_deref().filter(|t| !t.trim().is_empty()) {
            clauses.push(filter(fields::TYPE, record_type)?);
        }

        for (facet, values) in &input.constraints {
            for value in values {
                clauses.push(filter(facet, value)?);
            }
        }

        let mut requested: Vec<&str> = Vec::new();
        for facet in facets {
            if !requested.contains(&facet) {
                check_field(facet)?;
                requested.push(facet);
                clauses.push(QueryClause::Facet(facet.to_string()));
            }
        }

        Ok(Self {
            clauses,
            start: input.offset,
            rows: input.limit,
        })
    }

    pub fn clauses(&self) -> &[QueryClause] {
        &self.clauses
    }

    pub fn filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.clauses.iter().filter_map(|c| match c {
            QueryClause::Filter { field, value } => Some((field.as_str(), value.as_str())),
            _ => None,
        })
    }

    pub fn facets(&self) -> impl Iterator<Item = &str> {
        self.clauses.iter().filter_map(|c| match c {
            QueryClause::Facet(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Renders the query as unencoded request parameters, in clause order.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        let text = self.clauses.iter().find_map(|c| match c {
            QueryClause::Text(text) => Some(text.clone()),
            _ => None,
        });
        params.push(("q", text.unwrap_or_else(|| MATCH_ALL.to_string())));

        for (field, value) in self.filters() {
            params.push(("fq", format!("{field}:\"{}\"", escape_phrase(value))));
        }

        let mut facets = self.facets().peekable();
        if facets.peek().is_some() {
            params.push(("facet", "true".to_string()));
            params.push(("facet.mincount", "1".to_string()));
            for facet in facets {
                params.push(("facet.field", facet.to_string()));
            }
        }

        params.push(("start", self.start.to_string()));
        if let Some(rows) = self.rows {
            params.push(("rows", rows.to_string()));
        }
        params.push(("wt", "xml".to_string()));
        params
    }

    /// Builds the encoded `select` URL below the index base URL.
    pub fn select_url(&self, base: &Url) -> Result<Url, AppError> {
        let mut url = base
            .join("select")
            .map_err(|e| AppError::QueryTranslationFailure(e.to_string()))?;
        url.query_pairs_mut().extend_pairs(self.to_params());
        Ok(url)
    }
}

/// Maps an XML select response onto a [`SearchOutput`].
///
/// # Errors
///
/// Returns `AppError::MalformedDocument` if the response has no result
/// section, its counts are not numbers, or a result document has no id.
pub fn parse_response(xml: &str) -> Result<SearchOutput, AppError> {
    let root = xml::parse_document(xml)?;
    let result = root
        .find("result")
        .ok_or_else(|| AppError::MalformedDocument("response has no <result>".to_string()))?;

    let counts = number_attribute(result, "numFound")?.unwrap_or(0);
    let offset = number_attribute(result, "start")?.unwrap_or(0);

    let serializer = RecordSerializer::new();
    let results = result
        .children()
        .iter()
        .filter(|c| c.name == "doc")
        .map(|doc| serializer.deserialize(doc))
        .collect::<Result<Vec<_>, _>>()?;

    let mut facets = BTreeMap::new();
    if let Some(facet_fields) = root
        .child_named("lst", "facet_counts")
        .and_then(|counts| counts.child_named("lst", "facet_fields"))
    {
        for field in facet_fields.children() {
            let Some(name) = field.attribute("name") else {
                continue;
            };
            let mut facet = Facet::new(name);
            for entry in field.children() {
                let Some(value) = entry.attribute("name") else {
                    continue;
                };
                let count = entry.text().trim().parse::<u64>().map_err(|e| {
                    AppError::MalformedDocument(format!("facet count for {name}={value}: {e}"))
                })?;
                facet.values.push(FacetValue {
                    value: value.to_string(),
                    count,
                });
            }
            facets.insert(name.to_string(), facet);
        }
    }

    Ok(SearchOutput {
        counts,
        offset,
        results,
        facets,
    })
}

fn number_attribute(element: &XmlElement, name: &str) -> Result<Option<u64>, AppError> {
    element
        .attribute(name)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| AppError::MalformedDocument(format!("{name}={raw}: {e}")))
        })
        .transpose()
}

fn filter(field: &str, value: &str) -> Result<QueryClause, AppError> {
    check_field(field)?;
    check_term(value)?;
    Ok(QueryClause::Filter {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn check_field(field: &str) -> Result<(), AppError> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(AppError::QueryTranslationFailure(format!(
            "invalid field name: {field:?}"
        )))
    }
}

fn check_term(term: &str) -> Result<(), AppError> {
    if term.chars().any(|c| c.is_control() && c != '\t') {
        return Err(AppError::QueryTranslationFailure(format!(
            "term contains control characters: {term:?}"
        )));
    }
    Ok(())
}

/// Escapes a value placed inside a quoted phrase.
fn escape_phrase(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
