/// Statement evaluation: resolves `'name'` references against the variable
/// and switch namespaces, then evaluates the resulting literal expression.
use crate::core::arith::{evaluate_literal, Value};
use crate::core::error::EvalError;
use crate::schema::line::ScriptSyntax;
use crate::schema::state::Namespace;

/// Which namespace a name reference selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameShape {
    Variable,
    Switch,
}

/// Classify a name by its two-character prefix.
pub fn name_shape(name: &str, syntax: &ScriptSyntax) -> Result<NameShape, EvalError> {
    let shaped = |prefix: &str| name.len() > prefix.len() && name.starts_with(prefix);
    if shaped(&syntax.variable_prefix) {
        Ok(NameShape::Variable)
    } else if shaped(&syntax.switch_prefix) {
        Ok(NameShape::Switch)
    } else {
        Err(EvalError::TypeError(format!(
            "'{}' is neither a variable ({}...) nor a switch ({}...) name",
            name, syntax.variable_prefix, syntax.switch_prefix
        )))
    }
}

/// Read one name from whichever namespace its prefix selects.
pub fn resolve_name(
    name: &str,
    syntax: &ScriptSyntax,
    variables: &dyn Namespace<f64>,
    switches: &dyn Namespace<bool>,
) -> Result<Value, EvalError> {
    let missing = || EvalError::DataNotFound(name.to_string());
    match name_shape(name, syntax)? {
        NameShape::Variable => {
            let idx = variables.lookup(name).ok_or_else(missing)?;
            variables.get(idx).map(Value::Number).ok_or_else(missing)
        }
        NameShape::Switch => {
            let idx = switches.lookup(name).ok_or_else(missing)?;
            switches.get(idx).map(Value::Bool).ok_or_else(missing)
        }
    }
}

/// The quoted names of a statement, in order of appearance.
pub fn referenced_names<'a>(
    statement: &'a str,
    syntax: &ScriptSyntax,
) -> Result<Vec<&'a str>, EvalError> {
    let segments: Vec<&str> = statement.split(syntax.name_quote).collect();
    if segments.len() % 2 == 0 {
        return Err(EvalError::UnbalancedQuotes(statement.to_string()));
    }
    Ok(segments.into_iter().skip(1).step_by(2).map(str::trim).collect())
}

/// Substitute every `'name'` in `statement` with its current value.
pub fn substitute_names(
    statement: &str,
    syntax: &ScriptSyntax,
    variables: &dyn Namespace<f64>,
    switches: &dyn Namespace<bool>,
) -> Result<String, EvalError> {
    let names = referenced_names(statement, syntax)?;
    let values = names
        .iter()
        .map(|name| resolve_name(name, syntax, variables, switches))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != names.len() {
        return Err(EvalError::ValueMismatch {
            slots: names.len(),
            values: values.len(),
        });
    }

    let mut out = String::with_capacity(statement.len());
    let mut values = values.iter();
    for (i, segment) in statement.split(syntax.name_quote).enumerate() {
        if i % 2 == 0 {
            out.push_str(segment);
            continue;
        }
        let value = values.next().ok_or(EvalError::ValueMismatch {
            slots: names.len(),
            values: i / 2,
        })?;
        // Parenthesised so a negative value can follow any operator.
        out.push('(');
        out.push_str(&value.to_string());
        out.push(')');
    }
    Ok(out)
}

/// Evaluate a statement that may reference named game state.
pub fn evaluate(
    statement: &str,
    syntax: &ScriptSyntax,
    variables: &dyn Namespace<f64>,
    switches: &dyn Namespace<bool>,
) -> Result<Value, EvalError> {
    let literal = substitute_names(statement, syntax, variables, switches)?;
    evaluate_literal(&literal)
}

/// Evaluate a statement and reduce it to a truth value.
pub fn evaluate_condition(
    statement: &str,
    syntax: &ScriptSyntax,
    variables: &dyn Namespace<f64>,
    switches: &dyn Namespace<bool>,
) -> Result<bool, EvalError> {
    evaluate(statement, syntax, variables, switches).map(|v| v.is_truthy())
}

/// Evaluate a statement that must produce a number.
pub fn evaluate_number(
    statement: &str,
    syntax: &ScriptSyntax,
    variables: &dyn Namespace<f64>,
    switches: &dyn Namespace<bool>,
) -> Result<f64, EvalError> {
    match evaluate(statement, syntax, variables, switches)? {
        Value::Number(n) if !n.is_finite() => Err(EvalError::TypeError(format!(
            "'{}' does not evaluate to a finite number",
            statement.trim()
        ))),
        Value::Number(n) => Ok(n),
        other => Err(EvalError::TypeError(format!(
            "expected a number, got {} '{}'",
            other.type_name(),
            other
        ))),
    }
}
