//! `ScriptEngine` adapter over the interpreter.
//!
//! Each phase builds a capability object, exposes its members both as bare
//! names and through `ctx`, and runs the script to completion.

use courier_application::ports::ScriptEngine;
use courier_domain::testing::DEFAULT_ASSERTION_MESSAGE;
use courier_domain::{
    AssertionResult, KeyValue, NormalizedResponse, PreRequestContext, PreRequestOutcome,
    VariableMap,
};
use indexmap::IndexMap;
use tracing::info;

use super::error::ScriptError;
use super::interpreter::{Host, Interpreter};
use super::parser::parse_script;
use super::value::{Builtin, Callable, Capability, ScriptValue};

/// Runs pre-request and test scripts in the sandboxed interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxScriptEngine;

impl SandboxScriptEngine {
    /// Creates the engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn capability(capability: Capability) -> ScriptValue {
    ScriptValue::Function(Callable::Capability(capability))
}

fn builtin(builtin: Builtin) -> ScriptValue {
    ScriptValue::Function(Callable::Builtin(builtin))
}

fn env_object(env: &VariableMap) -> ScriptValue {
    let mut keys: Vec<_> = env.keys().collect();
    keys.sort();
    ScriptValue::Object(
        keys.into_iter()
            .map(|key| (key.clone(), ScriptValue::string(env[key].clone())))
            .collect(),
    )
}

fn pairs_array(pairs: &[KeyValue]) -> ScriptValue {
    ScriptValue::Array(
        pairs
            .iter()
            .map(|pair| {
                ScriptValue::Object(IndexMap::from([
                    ("key".to_string(), ScriptValue::string(pair.key.clone())),
                    ("value".to_string(), ScriptValue::string(pair.value.clone())),
                ]))
            })
            .collect(),
    )
}

/// Globals: the capability surface, `ctx` mirroring it, and the builtins.
fn globals(surface: IndexMap<String, ScriptValue>) -> IndexMap<String, ScriptValue> {
    let mut globals = surface.clone();
    globals.insert("ctx".to_string(), ScriptValue::Object(surface));
    globals.insert(
        "console".to_string(),
        ScriptValue::Object(IndexMap::from([(
            "log".to_string(),
            capability(Capability::Log),
        )])),
    );
    globals.insert(
        "JSON".to_string(),
        ScriptValue::Object(IndexMap::from([
            ("parse".to_string(), builtin(Builtin::JsonParse)),
            ("stringify".to_string(), builtin(Builtin::JsonStringify)),
        ])),
    );
    globals.insert("String".to_string(), builtin(Builtin::String));
    globals.insert("Number".to_string(), builtin(Builtin::Number));
    globals.insert("Boolean".to_string(), builtin(Builtin::Boolean));
    globals.insert("Error".to_string(), builtin(Builtin::Error));
    globals
}

fn log_line(args: &[ScriptValue]) -> String {
    args.iter()
        .map(ScriptValue::to_log_text)
        .collect::<Vec<_>>()
        .join(" ")
}

fn key_and_value(args: &[ScriptValue]) -> (String, String) {
    let text = |index: usize| {
        args.get(index)
            .filter(|value| !value.is_nullish())
            .map(ScriptValue::to_display)
            .unwrap_or_default()
    };
    (text(0), text(1))
}

/// Host for the pre-request phase: mutates a working copy.
struct PreRequestHost {
    context: PreRequestContext,
    logs: Vec<String>,
}

impl Host for PreRequestHost {
    fn invoke(
        &mut self,
        capability: Capability,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        match capability {
            Capability::SetHeader => {
                let (key, value) = key_and_value(args);
                if !key.is_empty() {
                    self.context.headers.insert(key, value);
                }
            }
            Capability::SetQuery => {
                let (key, value) = key_and_value(args);
                if !key.is_empty() {
                    self.context.params.push(KeyValue::new(key, value));
                }
            }
            Capability::SetBody => {
                self.context.body = match args.first() {
                    None | Some(ScriptValue::Undefined | ScriptValue::Null) => String::new(),
                    Some(ScriptValue::String(s)) => s.clone(),
                    Some(other) => other.to_log_text(),
                };
            }
            Capability::SetFormField => {
                let (key, value) = key_and_value(args);
                self.context.form_data.push(KeyValue::new(key, value));
            }
            Capability::Log => {
                let line = log_line(args);
                info!(target: "courier::script", phase = "pre-request", "{line}");
                self.logs.push(line);
            }
            Capability::Assert => return Err(ScriptError::Reference("assert".to_string())),
        }
        Ok(ScriptValue::Undefined)
    }
}

/// Host for the test phase: accumulates assertion results.
struct AssertionHost {
    results: Vec<AssertionResult>,
}

impl Host for AssertionHost {
    fn invoke(
        &mut self,
        capability: Capability,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        match capability {
            Capability::Assert => {
                let ok = args.first().is_some_and(ScriptValue::is_truthy);
                let message = args
                    .get(1)
                    .filter(|message| !message.is_nullish())
                    .map_or_else(
                        || DEFAULT_ASSERTION_MESSAGE.to_string(),
                        ScriptValue::to_display,
                    );
                self.results.push(AssertionResult { ok, message });
                Ok(ScriptValue::Undefined)
            }
            Capability::Log => {
                let line = log_line(args);
                info!(target: "courier::script", phase = "test", "{line}");
                Ok(ScriptValue::Undefined)
            }
            other => Err(ScriptError::Reference(
                match other {
                    Capability::SetHeader => "setHeader",
                    Capability::SetQuery => "setQuery",
                    Capability::SetBody => "setBody",
                    _ => "setFormField",
                }
                .to_string(),
            )),
        }
    }
}

impl ScriptEngine for SandboxScriptEngine {
    fn run_pre_request(
        &self,
        script: &str,
        context: PreRequestContext,
        env: &VariableMap,
    ) -> PreRequestOutcome {
        if script.trim().is_empty() {
            return PreRequestOutcome::unchanged(context);
        }

        let surface = IndexMap::from([
            ("env".to_string(), env_object(env)),
            (
                "headers".to_string(),
                ScriptValue::Object(
                    context
                        .headers
                        .iter()
                        .map(|(k, v)| (k.clone(), ScriptValue::string(v.clone())))
                        .collect(),
                ),
            ),
            ("params".to_string(), pairs_array(&context.params)),
            ("body".to_string(), ScriptValue::string(context.body.clone())),
            ("setHeader".to_string(), capability(Capability::SetHeader)),
            ("setQuery".to_string(), capability(Capability::SetQuery)),
            ("setBody".to_string(), capability(Capability::SetBody)),
            ("setFormField".to_string(), capability(Capability::SetFormField)),
            ("log".to_string(), capability(Capability::Log)),
        ]);

        let mut host = PreRequestHost {
            context,
            logs: Vec::new(),
        };
        let result = parse_script(script).and_then(|statements| {
            Interpreter::new(globals(surface), &mut host).run(&statements)
        });

        let error = result.err().map(|error| error.to_string());
        PreRequestOutcome {
            context: host.context,
            logs: host.logs,
            error,
        }
    }

    fn run_assertions(
        &self,
        script: &str,
        response: &NormalizedResponse,
        env: &VariableMap,
    ) -> Vec<AssertionResult> {
        if script.trim().is_empty() {
            return Vec::new();
        }

        let response = serde_json::to_value(response)
            .map_or(ScriptValue::Undefined, |json| ScriptValue::from_json(&json));
        let surface = IndexMap::from([
            ("response".to_string(), response),
            ("env".to_string(), env_object(env)),
            ("assert".to_string(), capability(Capability::Assert)),
            ("log".to_string(), capability(Capability::Log)),
        ]);

        let mut host = AssertionHost {
            results: Vec::new(),
        };
        let result = parse_script(script).and_then(|statements| {
            Interpreter::new(globals(surface), &mut host).run(&statements)
        });

        if let Err(error) = result {
            host.results.push(AssertionResult::fail(error.to_string()));
        }
        host.results
    }
}
