//! Script sandbox port

use courier_domain::{
    AssertionResult, NormalizedResponse, PreRequestContext, PreRequestOutcome, VariableMap,
};

/// Runs user scripts against an explicit capability object.
///
/// Both entry points are synchronous and never fail: a pre-request error is
/// reported in the outcome with the context as it stood, an assertion-phase
/// error becomes one failing [`AssertionResult`].
pub trait ScriptEngine: Send + Sync {
    /// Runs a pre-request script. An empty script returns the context unchanged.
    fn run_pre_request(
        &self,
        script: &str,
        context: PreRequestContext,
        env: &VariableMap,
    ) -> PreRequestOutcome;

    /// Runs a test script. An empty script yields no results.
    fn run_assertions(
        &self,
        script: &str,
        response: &NormalizedResponse,
        env: &VariableMap,
    ) -> Vec<AssertionResult>;
}
