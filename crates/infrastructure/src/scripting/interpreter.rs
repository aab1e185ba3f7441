//! Tree-walking interpreter.
//!
//! Names resolve through block scopes first, then through the capability
//! surface the host injected. Nothing else is reachable from a script.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::ast::{BinaryOp, Expr, LogicalOp, Stmt, TemplatePart, UnaryOp};
use super::builtins::{call_builtin, call_method, make_error, not_a_function};
use super::error::ScriptError;
use super::value::{Callable, Capability, MAX_VALUE_SIZE, ScriptValue, check_size};

const ERROR_CLASSES: &[&str] = &["Error", "TypeError", "RangeError", "SyntaxError"];

/// Receives capability calls from a running script.
pub trait Host {
    /// Performs a capability call.
    ///
    /// # Errors
    ///
    /// Returns an error the script sees as thrown.
    fn invoke(
        &mut self,
        capability: Capability,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError>;
}

struct Binding {
    value: ScriptValue,
    constant: bool,
}

/// Runs parsed statements against a host.
pub struct Interpreter<'h> {
    globals: IndexMap<String, ScriptValue>,
    scopes: Vec<HashMap<String, Binding>>,
    host: &'h mut dyn Host,
}

impl<'h> Interpreter<'h> {
    /// Creates an interpreter whose global names are `globals`.
    pub fn new(globals: IndexMap<String, ScriptValue>, host: &'h mut dyn Host) -> Self {
        Self {
            globals,
            scopes: vec![HashMap::new()],
            host,
        }
    }

    /// Executes statements in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first runtime error or thrown value.
    pub fn run(&mut self, statements: &[Stmt]) -> Result<(), ScriptError> {
        statements.iter().try_for_each(|stmt| self.execute(stmt))
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), ScriptError> {
        match stmt {
            Stmt::Empty => Ok(()),
            Stmt::Expr(expr) => self.evaluate(expr).map(drop),
            Stmt::Declare {
                name,
                init,
                constant,
            } => {
                let value = match init {
                    Some(expr) => self.evaluate(expr)?,
                    None => ScriptValue::Undefined,
                };
                self.declare(name, value, *constant)
            }
            Stmt::If {
                test,
                then,
                otherwise,
            } => {
                if self.evaluate(test)?.is_truthy() {
                    self.execute(then)
                } else if let Some(otherwise) = otherwise {
                    self.execute(otherwise)
                } else {
                    Ok(())
                }
            }
            Stmt::Block(body) => {
                self.scopes.push(HashMap::new());
                let result = self.run(body);
                self.scopes.pop();
                result
            }
            Stmt::Throw(expr) => Err(ScriptError::Thrown(self.evaluate(expr)?.thrown_message())),
        }
    }

    fn declare(&mut self, name: &str, value: ScriptValue, constant: bool) -> Result<(), ScriptError> {
        let Some(scope) = self.scopes.last_mut() else {
            return Ok(());
        };
        if let Some(existing) = scope.get(name)
            && (constant || existing.constant)
        {
            return Err(ScriptError::Type(format!(
                "Identifier '{name}' has already been declared"
            )));
        }
        scope.insert(name.to_string(), Binding { value, constant });
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<ScriptValue> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map(|binding| binding.value.clone())
            .or_else(|| self.globals.get(name).cloned())
    }

    fn assign(&mut self, name: &str, value: ScriptValue) -> Result<ScriptValue, ScriptError> {
        if let Some(binding) = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
        {
            if binding.constant {
                return Err(ScriptError::Assignment("constant variable.".to_string()));
            }
            binding.value = value.clone();
            return Ok(value);
        }
        if self.globals.contains_key(name) {
            return Err(ScriptError::Assignment(format!("read-only '{name}'.")));
        }
        Err(ScriptError::Reference(name.to_string()))
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<ScriptValue, ScriptError> {
        Ok(match expr {
            Expr::Number(n) => ScriptValue::Number(*n),
            Expr::Str(s) => ScriptValue::String(s.clone()),
            Expr::Bool(b) => ScriptValue::Bool(*b),
            Expr::Null => ScriptValue::Null,
            Expr::Undefined => ScriptValue::Undefined,
            Expr::Template(parts) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(s) => text.push_str(s),
                        TemplatePart::Expr(expr) => text.push_str(&self.evaluate(expr)?.to_display()),
                    }
                    check_size(text.len())?;
                }
                ScriptValue::String(text)
            }
            Expr::Array(items) => {
                let mut budget = MAX_VALUE_SIZE;
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let value = self.evaluate(item)?;
                    budget = charge(&value, budget)?;
                    values.push(value);
                }
                ScriptValue::Array(values)
            }
            Expr::Object(entries) => {
                let mut budget = MAX_VALUE_SIZE;
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let value = self.evaluate(value)?;
                    budget = charge(&value, budget)?
                        .checked_sub(key.len())
                        .ok_or_else(ScriptError::too_large)?;
                    map.insert(key.clone(), value);
                }
                ScriptValue::Object(map)
            }
            Expr::Ident(name) => self
                .lookup(name)
                .ok_or_else(|| ScriptError::Reference(name.clone()))?,
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let object = self.evaluate(object)?;
                if *optional && object.is_nullish() {
                    return Ok(ScriptValue::Undefined);
                }
                let key = self.evaluate(property)?.to_display();
                object.get(&key)?
            }
            Expr::Call { callee, args } => {
                let function = self.evaluate(callee)?;
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(&function, &args, callee)?.within_limits()?
            }
            Expr::New { class, args } => {
                if !ERROR_CLASSES.contains(&class.as_str()) {
                    return Err(ScriptError::Type(format!("{class} is not a constructor")));
                }
                let message = match args.first() {
                    Some(arg) => self.evaluate(arg)?,
                    None => ScriptValue::Undefined,
                };
                make_error(class, &message)
            }
            Expr::Unary(op, operand) => self.unary(*op, operand)?,
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                binary(*op, &lhs, &rhs).within_limits()?
            }
            Expr::Logical(op, lhs, rhs) => {
                let lhs = self.evaluate(lhs)?;
                let short_circuit = match op {
                    LogicalOp::And => !lhs.is_truthy(),
                    LogicalOp::Or => lhs.is_truthy(),
                    LogicalOp::Nullish => !lhs.is_nullish(),
                };
                if short_circuit {
                    lhs
                } else {
                    self.evaluate(rhs)?
                }
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                if self.evaluate(test)?.is_truthy() {
                    self.evaluate(then)?
                } else {
                    self.evaluate(otherwise)?
                }
            }
            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.assign(name, value)?
            }
        })
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<ScriptValue, ScriptError> {
        if op == UnaryOp::TypeOf
            && let Expr::Ident(name) = operand
            && self.lookup(name).is_none()
        {
            return Ok(ScriptValue::string("undefined"));
        }
        let value = self.evaluate(operand)?;
        Ok(match op {
            UnaryOp::Not => ScriptValue::Bool(!value.is_truthy()),
            UnaryOp::Neg => ScriptValue::Number(-value.to_number()),
            UnaryOp::Plus => ScriptValue::Number(value.to_number()),
            UnaryOp::TypeOf => ScriptValue::string(value.type_of()),
        })
    }

    fn call(
        &mut self,
        function: &ScriptValue,
        args: &[ScriptValue],
        callee: &Expr,
    ) -> Result<ScriptValue, ScriptError> {
        match function {
            ScriptValue::Function(Callable::Capability(capability)) => {
                self.host.invoke(*capability, args)
            }
            ScriptValue::Function(Callable::Builtin(builtin)) => call_builtin(*builtin, args),
            ScriptValue::Function(Callable::Method { receiver, name }) => {
                call_method(receiver, name, args)
            }
            _ => Err(not_a_function(&describe(callee))),
        }
    }
}

/// Deducts an element's size from what is left of a literal's budget.
fn charge(value: &ScriptValue, budget: usize) -> Result<usize, ScriptError> {
    value
        .weigh(budget, 1)
        .map(|size| budget - size)
        .ok_or_else(ScriptError::too_large)
}

/// Source-like name of a callee for error messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object, property, ..
        } => match property.as_ref() {
            Expr::Str(key) => format!("{}.{key}", describe(object)),
            _ => format!("{}[...]", describe(object)),
        },
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}

fn binary(op: BinaryOp, lhs: &ScriptValue, rhs: &ScriptValue) -> ScriptValue {
    use ScriptValue::{Bool, Number};

    match op {
        BinaryOp::Add => {
            let is_textual = |v: &ScriptValue| {
                matches!(
                    v,
                    ScriptValue::String(_)
                        | ScriptValue::Array(_)
                        | ScriptValue::Object(_)
                        | ScriptValue::Error { .. }
                )
            };
            if is_textual(lhs) || is_textual(rhs) {
                ScriptValue::String(lhs.to_display() + &rhs.to_display())
            } else {
                Number(lhs.to_number() + rhs.to_number())
            }
        }
        BinaryOp::Sub => Number(lhs.to_number() - rhs.to_number()),
        BinaryOp::Mul => Number(lhs.to_number() * rhs.to_number()),
        BinaryOp::Div => Number(lhs.to_number() / rhs.to_number()),
        BinaryOp::Rem => Number(lhs.to_number() % rhs.to_number()),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (lhs, rhs) {
                (ScriptValue::String(a), ScriptValue::String(b)) => Some(a.cmp(b)),
                _ => lhs.to_number().partial_cmp(&rhs.to_number()),
            };
            Bool(ordering.is_some_and(|ordering| match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::LooseEq => Bool(lhs.loose_equals(rhs)),
        BinaryOp::LooseNe => Bool(!lhs.loose_equals(rhs)),
        BinaryOp::StrictEq => Bool(lhs.strict_equals(rhs)),
        BinaryOp::StrictNe => Bool(!lhs.strict_equals(rhs)),
    }
}
