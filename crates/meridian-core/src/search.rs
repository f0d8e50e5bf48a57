//! Search façade: paginated queries, facet listings and lookups by id.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::fields;
use crate::query::{self, IndexQuery};
use crate::traits::IndexClient;
use crate::{AppError, LookupOutcome, Record, SearchInput, SearchOutput};

/// Query-side service over an [`IndexClient`].
#[derive(Clone)]
pub struct SearchService<I: IndexClient> {
    index: I,
}

impl<I: IndexClient> SearchService<I> {
    pub fn new(index: I) -> Self {
        Self { index }
    }

    /// Runs a search and returns the matching page with its total count.
    ///
    /// Facets named in `input.facets` are counted as well.
    pub async fn query_results(&self, input: &SearchInput) -> Result<SearchOutput, AppError> {
        let query = IndexQuery::from_input(input)?;
        self.run(&query).await
    }

    /// Distinct values of each named facet across the records matching `input`.
    ///
    /// No result documents are requested. A facet with no values in the
    /// response maps to an empty set, so every requested name is present.
    pub async fn query_facets(
        &self,
        names: &[&str],
        input: &SearchInput,
    ) -> Result<BTreeMap<String, BTreeSet<String>>, AppError> {
        let mut facet_input = input.clone();
        facet_input.limit = Some(0);
        let query = IndexQuery::with_facets(&facet_input, names.iter().copied())?;
        let output = self.run(&query).await?;

        Ok(names
            .iter()
            .map(|name| {
                let values = output
                    .facets
                    .get(*name)
                    .map(|facet| facet.value_set())
                    .unwrap_or_default();
                (name.to_string(), values)
            })
            .collect())
    }

    /// Distinct values of a single facet.
    pub async fn query_facet(
        &self,
        name: &str,
        input: &SearchInput,
    ) -> Result<BTreeSet<String>, AppError> {
        let mut facets = self.query_facets(&[name], input).await?;
        Ok(facets.remove(name).unwrap_or_default())
    }

    /// Looks up a record by identifier, classifying the number of matches.
    pub async fn lookup(&self, id: &str) -> Result<LookupOutcome, AppError> {
        let input = SearchInput::new()
            .with_constraint(fields::ID, id)
            .with_limit(1);
        let output = self.query_results(&input).await?;
        LookupOutcome::from_output(output)
    }

    /// Returns the single record with identifier `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AmbiguousIdentifier` if more than one record
    /// carries the identifier.
    pub async fn query_result(&self, id: &str) -> Result<Option<Record>, AppError> {
        match self.lookup(id).await? {
            LookupOutcome::Found(record) => Ok(Some(record)),
            LookupOutcome::NotFound => Ok(None),
            LookupOutcome::Ambiguous(count) => Err(AppError::AmbiguousIdentifier {
                id: id.to_string(),
                count,
            }),
        }
    }

    async fn run(&self, query: &IndexQuery) -> Result<SearchOutput, AppError> {
        tracing::debug!(params = ?query.to_params(), "Querying index");
        let raw = self.index.select(query).await?;
        query::parse_response(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{IndexCall, MockIndex};
    use pretty_assertions::assert_eq;

    const TWO_MATCHES: &str = r#"<response>
  <result name="response" numFound="2" start="0">
    <doc><str name="id">dup</str><str name="title">First</str></doc>
  </result>
</response>"#;

    const ONE_MATCH: &str = r#"<response>
  <result name="response" numFound="1" start="0">
    <doc>
      <str name="id">ds1</str>
      <str name="title">Dataset One</str>
      <arr name="variable"><str>tas</str><str>pr</str></arr>
    </doc>
  </result>
</response>"#;

    const FACETS: &str = r#"<response>
  <result name="response" numFound="12" start="0"/>
  <lst name="facet_counts">
    <lst name="facet_fields">
      <lst name="model">
        <int name="CCSM">7</int>
        <int name="PCM">5</int>
      </lst>
      <lst name="experiment"/>
    </lst>
  </lst>
</response>"#;

    fn param<'a>(call: &'a IndexCall, key: &str) -> Vec<&'a str> {
        match call {
            IndexCall::Select(params) => params
                .iter()
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_query_result_not_found() {
        let service = SearchService::new(MockIndex::new());
        assert_eq!(service.query_result("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_result_found() {
        let index = MockIndex::new().with_response(ONE_MATCH);
        let service = SearchService::new(index.clone());

        let record = service.query_result("ds1").await.unwrap().unwrap();
        assert_eq!(record.id(), "ds1");
        assert_eq!(record.title(), Some("Dataset One"));
        assert_eq!(
            record.get("variable"),
            Some(&["tas".to_string(), "pr".to_string()][..])
        );

        let call = &index.calls()[0];
        assert_eq!(param(call, "fq"), vec![r#"id:"ds1""#]);
        assert_eq!(param(call, "rows"), vec!["1"]);
    }

    #[tokio::test]
    async fn test_query_result_ambiguous() {
        let service = SearchService::new(MockIndex::new().with_response(TWO_MATCHES));

        let err = service.query_result("dup").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Too many results associated with unique identifier dup: 2"
        );
        assert!(matches!(
            err,
            AppError::AmbiguousIdentifier { count: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_lookup_classifies_matches() {
        let service = SearchService::new(MockIndex::new().with_response(TWO_MATCHES));
        assert_eq!(service.lookup("dup").await.unwrap(), LookupOutcome::Ambiguous(2));
    }

    #[tokio::test]
    async fn test_query_results_reports_total_counts() {
        let index = MockIndex::new().with_response(TWO_MATCHES);
        let service = SearchService::new(index.clone());
        let input = SearchInput::new().with_text("dup").with_limit(1);

        let output = service.query_results(&input).await.unwrap();
        assert_eq!(output.counts, 2);
        assert_eq!(output.results.len(), 1);
        assert_eq!(param(&index.calls()[0], "q"), vec!["dup"]);
    }

    #[tokio::test]
    async fn test_query_facets() {
        let index = MockIndex::new().with_response(FACETS);
        let service = SearchService::new(index.clone());
        let input = SearchInput::new().with_type("Dataset");

        let facets = service
            .query_facets(&["model", "experiment", "realm"], &input)
            .await
            .unwrap();

        assert_eq!(facets.len(), 3);
        assert_eq!(
            facets["model"],
            BTreeSet::from(["CCSM".to_string(), "PCM".to_string()])
        );
        assert!(facets["experiment"].is_empty());
        assert!(facets["realm"].is_empty());

        let call = &index.calls()[0];
        assert_eq!(param(call, "rows"), vec!["0"]);
        assert_eq!(
            param(call, "facet.field"),
            vec!["model", "experiment", "realm"]
        );
    }

    #[tokio::test]
    async fn test_query_facet_single() {
        let service = SearchService::new(MockIndex::new().with_response(FACETS));
        let values = service
            .query_facet("model", &SearchInput::new())
            .await
            .unwrap();
        assert_eq!(values.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_facet_name_is_rejected_before_query() {
        let index = MockIndex::new();
        let service = SearchService::new(index.clone());

        let err = service
            .query_facets(&["bad name"], &SearchInput::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QueryTranslationFailure(_)));
        assert!(index.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let service = SearchService::new(MockIndex::new().failing());
        let err = service.query_results(&SearchInput::new()).await.unwrap_err();
        assert!(err.is_transport());
    }
}
