// Document substitution
// Variable and expression spans resolved across a whole document tree

use tracing::{debug, trace};

use crate::environment::Environment;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::pointer;
use crate::span::{self, Span, SpanSyntax};
use crate::value::Value;

/// Resolve a dotted variable path (`names.1.name`) against the context.
/// The empty path resolves to the empty string.
pub fn resolve_variable(path: &str, context: &Value) -> Result<Value> {
    if path.is_empty() {
        return Ok(Value::from(""));
    }
    let found = pointer::resolve(context, &pointer::from_path(path))?;
    Ok(found.clone())
}

/// Replace each span with the value produced for its inner text.
///
/// When a span's literal is the entire current text the produced value is
/// returned as-is, keeping its type. Otherwise its display form replaces
/// every occurrence of the literal.
fn splice<F>(input: &str, spans: Vec<Span>, mut produce: F) -> Result<Value>
where
    F: FnMut(&str) -> Result<Value>,
{
    let mut text = input.to_string();
    for span in spans {
        let value = produce(&span.inner)?;
        if span.literal == text {
            return Ok(value);
        }
        text = text.replace(&span.literal, &value.to_string());
    }
    Ok(Value::from(text))
}

/// Substitute every `${...}` span in `input`
pub fn substitute_variables(input: &str, context: &Value) -> Result<Value> {
    let spans = span::find(input, &SpanSyntax::VARIABLE)?;
    splice(input, spans, |path| {
        let value = resolve_variable(path, context)?;
        trace!(path, value = %value.repr(), "resolved variable");
        Ok(value)
    })
}

/// Evaluate the inner text of one `$(...)` span.
///
/// Nested expression markers are flattened into plain parentheses and
/// variables are spliced in before the text is parsed as one expression.
/// Empty content evaluates to the empty string.
pub fn evaluate_expression(content: &str, context: &Value, environment: &Environment) -> Result<Value> {
    let flattened = span::unwrap_nested(content, &SpanSyntax::EXPRESSION);
    let source = match substitute_variables(&flattened, context)? {
        Value::String(s) => s.to_string(),
        other => other.repr(),
    };
    if source.is_empty() {
        return Ok(Value::from(""));
    }

    let mut evaluator = Evaluator::new(environment.clone());
    let value = evaluator.evaluate_str(&source)?;
    trace!(expression = %source, value = %value.repr(), "evaluated expression");
    Ok(value)
}

/// Substitute every `$(...)` span in `input`
pub fn substitute_expressions(input: &str, context: &Value, environment: &Environment) -> Result<Value> {
    let spans = span::find(input, &SpanSyntax::EXPRESSION)?;
    splice(input, spans, |content| evaluate_expression(content, context, environment))
}

/// Run one string through the full pipeline: expressions, then variables,
/// then unescaping of `\$`.
pub fn substitute_string(input: &str, context: &Value, environment: &Environment) -> Result<Value> {
    if !input.contains('$') {
        return Ok(Value::from(input));
    }

    let text = match substitute_expressions(input, context, environment)? {
        Value::String(s) => s,
        other => return Ok(other),
    };
    match substitute_variables(&text, context)? {
        Value::String(s) => Ok(Value::from(span::unescape(&s, &SpanSyntax::VARIABLE))),
        other => Ok(other),
    }
}

/// Walk a document, substituting every string leaf.
///
/// Mappings keep their keys and order, lists keep their order, and every
/// other scalar is returned unchanged.
pub fn substitute(document: &Value, context: &Value, environment: &Environment) -> Result<Value> {
    match document {
        Value::String(s) => substitute_string(s, context, environment),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| substitute(item, context, environment))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::array(items))
        }
        Value::Object(map) => {
            let map = map
                .iter()
                .map(|(key, value)| Ok((key.clone(), substitute(value, context, environment)?)))
                .collect::<Result<_>>()?;
            Ok(Value::object(map))
        }
        other => Ok(other.clone()),
    }
}

/// A configured substitution: context tree plus expression environment
///
/// ```
/// use serde_json::json;
/// use yamlscript::{Substitution, Value};
///
/// let substitution = Substitution::new()
///     .with_context(json!({"ints": [0, 1, 2, 3]}))
///     .with_overrides([("ints/-", Value::Int(4))])
///     .unwrap();
/// let result = substitution.apply(&Value::from("$(sum(${ints}))")).unwrap();
/// assert_eq!(result, Value::Int(10));
/// ```
#[derive(Debug, Clone)]
pub struct Substitution {
    context: Value,
    environment: Environment,
}

impl Substitution {
    /// Empty context, default environment
    pub fn new() -> Self {
        Substitution {
            context: Value::empty_object(),
            environment: Environment::default(),
        }
    }

    pub fn with_context(mut self, context: impl Into<Value>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set context values before substitution. Each pointer is slash
    /// separated without the leading `/`; the parent must already exist and
    /// `-` appends to a list.
    pub fn with_overrides<I, K>(mut self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        for (path, value) in values {
            let path = format!("/{}", path.as_ref());
            debug!(pointer = %path, "applying context override");
            pointer::set(&mut self.context, &path, value)?;
        }
        Ok(self)
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Substitute a whole document
    pub fn apply(&self, document: &Value) -> Result<Value> {
        debug!(environment = self.environment.len(), "substituting document");
        substitute(document, &self.context, &self.environment)
    }

    /// Substitute a single string
    pub fn apply_str(&self, input: &str) -> Result<Value> {
        substitute_string(input, &self.context, &self.environment)
    }
}

impl Default for Substitution {
    fn default() -> Self {
        Self::new()
    }
}
