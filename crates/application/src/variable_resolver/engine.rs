//! Variable resolution engine
//!
//! Substitutes `{{name}}` tokens from a merged variable map. Unknown names are
//! left in place verbatim so they stay visible in the sent request, and
//! substituted values are never re-scanned.

use courier_domain::{
    EnvironmentVariableSet, GlobalVariableSet, KeyValue, RequestDraft, ResolvedRequest,
    VariableMap,
};

use super::parser::parse_variables;

/// Overlays the active environment on the globals.
///
/// Environment values win on collision; within one set later rows win.
/// Rows with an empty key are skipped.
#[must_use]
pub fn merge_variables(
    globals: &GlobalVariableSet,
    environment: Option<&EnvironmentVariableSet>,
) -> VariableMap {
    let mut merged = globals.to_map();
    if let Some(environment) = environment {
        merged.extend(environment.to_map());
    }
    merged
}

/// The variable resolution engine.
#[derive(Debug, Clone, Default)]
pub struct VariableResolver {
    variables: VariableMap,
}

impl VariableResolver {
    /// Creates a resolver over a merged variable map.
    #[must_use]
    pub const fn new(variables: VariableMap) -> Self {
        Self { variables }
    }

    /// Returns the variable map.
    #[must_use]
    pub const fn variables(&self) -> &VariableMap {
        &self.variables
    }

    /// Replaces every known `{{name}}` token in `input`.
    #[must_use]
    pub fn substitute(&self, input: &str) -> String {
        let references = parse_variables(input);
        if references.is_empty() {
            return input.to_string();
        }

        let mut output = String::with_capacity(input.len());
        let mut last = 0;
        for reference in references {
            output.push_str(&input[last..reference.span.start]);
            match self.variables.get(&reference.name) {
                Some(value) => output.push_str(value),
                None => output.push_str(&input[reference.span.clone()]),
            }
            last = reference.span.end;
        }
        output.push_str(&input[last..]);
        output
    }

    /// Substitutes key and value of every row.
    #[must_use]
    pub fn substitute_pairs(&self, pairs: &[KeyValue]) -> Vec<KeyValue> {
        pairs
            .iter()
            .map(|pair| KeyValue::new(self.substitute(&pair.key), self.substitute(&pair.value)))
            .collect()
    }

    /// Names referenced in `input` that the map does not define, first occurrence order.
    #[must_use]
    pub fn find_unresolved(&self, input: &str) -> Vec<String> {
        let mut unresolved: Vec<String> = Vec::new();
        for reference in parse_variables(input) {
            if !self.variables.contains_key(&reference.name) && !unresolved.contains(&reference.name)
            {
                unresolved.push(reference.name);
            }
        }
        unresolved
    }

    /// Resolves every template field of a draft.
    ///
    /// URL, header and parameter rows, the raw body and the GraphQL texts are
    /// substituted. Url-encoded and form-data rows are left alone; callers
    /// substitute url-encoded rows with [`Self::substitute_pairs`] beforehand.
    #[must_use]
    pub fn resolve(&self, draft: &RequestDraft) -> ResolvedRequest {
        let resolved = RequestDraft {
            url: self.substitute(&draft.url),
            headers: self.substitute_pairs(&draft.headers),
            params: self.substitute_pairs(&draft.params),
            body: self.substitute(&draft.body),
            graphql_query: self.substitute(&draft.graphql_query),
            graphql_variables: self.substitute(&draft.graphql_variables),
            ..draft.clone()
        };
        ResolvedRequest::from_substituted(resolved)
    }
}
