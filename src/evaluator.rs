// Expression evaluator
// Tree-walking evaluation of `ast::AstNode` against an `Environment`

use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::ast::{Argument, AstNode, BinaryOp, CompareOp, Comprehension, Target, UnaryOp};
use crate::datetime::{DateTimeError, RelativeDelta};
use crate::environment::Environment;
use crate::functions::methods;
use crate::parser::{self, ParserError};
use crate::signature::{Arguments, Parameter, Signature, SignatureError};
use crate::utils::{compare, is_truthy, key_string, normalize_index, slice_bounds, type_name, values_equal};
use crate::value::{Function, Lambda, Value};

/// Evaluator errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluatorError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] ParserError),

    #[error("name '{0}' is not defined")]
    UndefinedName(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Value error: {0}")]
    ValueError(String),

    #[error("Key error: {0}")]
    MissingKey(String),

    #[error("Index error: {0}")]
    IndexOutOfRange(String),

    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Overflow: {0}")]
    Overflow(String),

    #[error("'{type_name}' object has no attribute '{name}'")]
    UnknownAttribute { type_name: String, name: String },

    #[error("Maximum recursion depth ({0}) exceeded")]
    RecursionLimit(usize),

    #[error("{0}")]
    Arguments(#[from] SignatureError),

    #[error("{0}")]
    DateTime(#[from] DateTimeError),
}

impl EvaluatorError {
    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        EvaluatorError::TypeError(message.into())
    }
}

/// Evaluator for expressions
///
/// Names resolve through the local scopes (innermost first) and then the
/// environment. Local scopes are introduced by comprehensions and lambda
/// calls only; the environment itself is never mutated.
pub struct Evaluator {
    environment: Environment,
    scopes: Vec<IndexMap<String, Value>>,
    recursion_depth: usize,
    max_recursion_depth: usize,
}

impl Evaluator {
    pub fn new(environment: Environment) -> Self {
        Evaluator {
            environment,
            scopes: Vec::new(),
            recursion_depth: 0,
            max_recursion_depth: 302,
        }
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Parse and evaluate an expression string
    pub fn evaluate_str(&mut self, expression: &str) -> Result<Value, EvaluatorError> {
        let ast = parser::parse(expression)?;
        self.evaluate(&ast)
    }

    /// Evaluate an AST node
    pub fn evaluate(&mut self, node: &AstNode) -> Result<Value, EvaluatorError> {
        if self.recursion_depth >= self.max_recursion_depth {
            return Err(EvaluatorError::RecursionLimit(self.max_recursion_depth));
        }
        self.recursion_depth += 1;
        let result = self.evaluate_internal(node);
        self.recursion_depth -= 1;
        result
    }

    fn evaluate_internal(&mut self, node: &AstNode) -> Result<Value, EvaluatorError> {
        match node {
            AstNode::String(s) => Ok(Value::from(s.as_str())),
            AstNode::Integer(n) => Ok(Value::Int(*n)),
            AstNode::Float(n) => Ok(Value::Float(*n)),
            AstNode::Boolean(b) => Ok(Value::Bool(*b)),
            AstNode::None => Ok(Value::Null),

            AstNode::Name(name) => self.lookup(name),

            AstNode::List(items) | AstNode::Tuple(items) => {
                let values = items
                    .iter()
                    .map(|item| self.evaluate(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::from(values))
            }

            AstNode::Dict(entries) => {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    let key = key_string(&self.evaluate(key)?);
                    let value = self.evaluate(value)?;
                    map.insert(key, value);
                }
                Ok(Value::from(map))
            }

            AstNode::ListComprehension {
                element,
                generators,
            } => {
                let mut items = Vec::new();
                self.comprehend(generators, &mut |ev| {
                    items.push(ev.evaluate(element)?);
                    Ok(())
                })?;
                Ok(Value::from(items))
            }

            AstNode::DictComprehension {
                key,
                value,
                generators,
            } => {
                let mut map = IndexMap::new();
                self.comprehend(generators, &mut |ev| {
                    let k = key_string(&ev.evaluate(key)?);
                    let v = ev.evaluate(value)?;
                    map.insert(k, v);
                    Ok(())
                })?;
                Ok(Value::from(map))
            }

            AstNode::Binary { op, lhs, rhs } => {
                let left = self.evaluate(lhs)?;
                match op {
                    // Short-circuit, yielding the deciding operand
                    BinaryOp::And if !is_truthy(&left) => Ok(left),
                    BinaryOp::Or if is_truthy(&left) => Ok(left),
                    BinaryOp::And | BinaryOp::Or => self.evaluate(rhs),
                    _ => {
                        let right = self.evaluate(rhs)?;
                        binary_op(*op, &left, &right)
                    }
                }
            }

            AstNode::Unary { op, operand } => {
                let value = self.evaluate(operand)?;
                unary_op(*op, &value)
            }

            AstNode::Compare { lhs, comparisons } => {
                let mut left = self.evaluate(lhs)?;
                for (op, rhs) in comparisons {
                    let right = self.evaluate(rhs)?;
                    if !compare_op(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }

            AstNode::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            AstNode::Lambda { params, body } => {
                let mut captured = IndexMap::new();
                for scope in &self.scopes {
                    for (name, value) in scope {
                        captured.insert(name.clone(), value.clone());
                    }
                }
                Ok(Value::Function(Function::Lambda(Rc::new(Lambda {
                    params: params.clone(),
                    body: (**body).clone(),
                    captured,
                }))))
            }

            AstNode::Call { function, args } => {
                let callee = self.evaluate(function)?;
                let mut arguments = Arguments::new();
                for arg in args {
                    match arg {
                        Argument::Positional(node) => {
                            arguments.positional.push(self.evaluate(node)?)
                        }
                        Argument::Keyword(name, node) => {
                            let value = self.evaluate(node)?;
                            arguments.keywords.insert(name.clone(), value);
                        }
                    }
                }
                self.call(&callee, arguments)
            }

            AstNode::Subscript { value, index } => {
                let container = self.evaluate(value)?;
                let index = self.evaluate(index)?;
                subscript(&container, &index)
            }

            AstNode::Slice { value, start, stop } => {
                let container = self.evaluate(value)?;
                let start = self.slice_bound(start.as_deref())?;
                let stop = self.slice_bound(stop.as_deref())?;
                slice(&container, start, stop)
            }

            AstNode::Attribute { value, name } => {
                let target = self.evaluate(value)?;
                methods::attribute(&target, name)
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, EvaluatorError> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(name) {
                return Ok(value.clone());
            }
        }
        self.environment
            .get(name)
            .cloned()
            .ok_or_else(|| EvaluatorError::UndefinedName(name.to_string()))
    }

    fn slice_bound(&mut self, node: Option<&AstNode>) -> Result<Option<i64>, EvaluatorError> {
        match node {
            None => Ok(None),
            Some(node) => match self.evaluate(node)? {
                Value::Null => Ok(None),
                Value::Int(n) => Ok(Some(n)),
                Value::Bool(b) => Ok(Some(i64::from(b))),
                other => Err(EvaluatorError::type_error(format!(
                    "slice indices must be integers or None, not {}",
                    type_name(&other)
                ))),
            },
        }
    }

    /// Run the comprehension clauses in a fresh local scope, calling `emit`
    /// once per binding that passes every condition.
    fn comprehend(
        &mut self,
        generators: &[Comprehension],
        emit: &mut dyn FnMut(&mut Evaluator) -> Result<(), EvaluatorError>,
    ) -> Result<(), EvaluatorError> {
        self.scopes.push(IndexMap::new());
        let result = self.run_generators(generators, emit);
        self.scopes.pop();
        result
    }

    fn run_generators(
        &mut self,
        generators: &[Comprehension],
        emit: &mut dyn FnMut(&mut Evaluator) -> Result<(), EvaluatorError>,
    ) -> Result<(), EvaluatorError> {
        let (first, rest) = match generators.split_first() {
            Some(split) => split,
            None => return emit(self),
        };

        let iterable = self.evaluate(&first.iter)?;
        'items: for item in iterate(&iterable)? {
            self.bind_target(&first.target, item)?;
            for condition in &first.conditions {
                if !is_truthy(&self.evaluate(condition)?) {
                    continue 'items;
                }
            }
            self.run_generators(rest, emit)?;
        }
        Ok(())
    }

    fn bind_target(&mut self, target: &Target, value: Value) -> Result<(), EvaluatorError> {
        match target {
            Target::Name(name) => {
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.clone(), value);
                }
                Ok(())
            }
            Target::Tuple(targets) => {
                let items = match &value {
                    Value::Array(items) => items.clone(),
                    Value::String(_) | Value::Object(_) => Rc::new(iterate(&value)?),
                    other => {
                        return Err(EvaluatorError::type_error(format!(
                            "cannot unpack non-iterable {} object",
                            type_name(other)
                        )))
                    }
                };
                if items.len() < targets.len() {
                    return Err(EvaluatorError::ValueError(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        items.len()
                    )));
                }
                if items.len() > targets.len() {
                    return Err(EvaluatorError::ValueError(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    )));
                }
                for (target, item) in targets.iter().zip(items.iter()) {
                    self.bind_target(target, item.clone())?;
                }
                Ok(())
            }
        }
    }

    /// Call a function value with the given arguments
    pub fn call(&mut self, callee: &Value, args: Arguments) -> Result<Value, EvaluatorError> {
        match callee {
            Value::Function(Function::Native { call, .. }) => {
                let call = Rc::clone(call);
                (*call)(self, args)
            }
            Value::Function(Function::Lambda(lambda)) => self.call_lambda(lambda, args),
            other => Err(EvaluatorError::type_error(format!(
                "'{}' object is not callable",
                type_name(other)
            ))),
        }
    }

    fn call_lambda(&mut self, lambda: &Lambda, args: Arguments) -> Result<Value, EvaluatorError> {
        let signature = Signature::new(
            "<lambda>",
            lambda.params.iter().map(|p| Parameter::required(p)).collect(),
        );
        let bound = signature.bind(args)?;

        let mut frame = lambda.captured.clone();
        frame.extend(bound.into_map());

        // Lambdas see their captured bindings, not the caller's locals
        let saved = std::mem::replace(&mut self.scopes, vec![frame]);
        let result = self.evaluate(&lambda.body);
        self.scopes = saved;
        result
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

/// Values produced by iterating a list, dictionary (its keys) or string (its characters)
pub fn iterate(value: &Value) -> Result<Vec<Value>, EvaluatorError> {
    match value {
        Value::Array(items) => Ok(items.to_vec()),
        Value::Object(map) => Ok(map.keys().map(|k| Value::from(k.as_str())).collect()),
        Value::String(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
        other => Err(EvaluatorError::type_error(format!(
            "'{}' object is not iterable",
            type_name(other)
        ))),
    }
}

// ── Operators ────────────────────────────────────────────────────────────────

enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> Option<Number> {
        match value {
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Int(n) => Some(Number::Int(*n)),
            Value::Float(n) => Some(Number::Float(*n)),
            _ => None,
        }
    }

    fn to_f64(&self) -> f64 {
        match self {
            Number::Int(n) => *n as f64,
            Number::Float(n) => *n,
        }
    }
}

fn unsupported(op: &str, lhs: &Value, rhs: &Value) -> EvaluatorError {
    EvaluatorError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        type_name(lhs),
        type_name(rhs)
    ))
}

fn overflow(op: BinaryOp) -> EvaluatorError {
    EvaluatorError::Overflow(format!("integer result of '{}' out of range", op.symbol()))
}

fn repeat_count(value: &Value) -> Option<usize> {
    match Number::of(value)? {
        Number::Int(n) => Some(usize::try_from(n).unwrap_or(0)),
        Number::Float(_) => None,
    }
}

fn add_delta_to_date(date: chrono::NaiveDate, delta: &RelativeDelta) -> Result<Value, EvaluatorError> {
    if delta.has_time() {
        let midnight = date
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .fixed_offset();
        Ok(Value::from(delta.apply_to_datetime(midnight)?))
    } else {
        Ok(Value::from(delta.apply_to_date(date)?))
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        r.checked_add(b)
    } else {
        Some(r)
    }
}

fn float_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        r + b
    } else {
        r
    }
}

/// Apply an arithmetic operator to two evaluated operands
pub fn binary_op(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvaluatorError> {
    use Number::Int;

    match op {
        BinaryOp::And => return Ok(if is_truthy(lhs) { rhs.clone() } else { lhs.clone() }),
        BinaryOp::Or => return Ok(if is_truthy(lhs) { lhs.clone() } else { rhs.clone() }),
        _ => {}
    }

    if let (Some(a), Some(b)) = (Number::of(lhs), Number::of(rhs)) {
        return match (op, a, b) {
            (BinaryOp::Add, Int(a), Int(b)) => a.checked_add(b).map(Value::Int).ok_or_else(|| overflow(op)),
            (BinaryOp::Subtract, Int(a), Int(b)) => a.checked_sub(b).map(Value::Int).ok_or_else(|| overflow(op)),
            (BinaryOp::Multiply, Int(a), Int(b)) => a.checked_mul(b).map(Value::Int).ok_or_else(|| overflow(op)),
            (BinaryOp::FloorDivide, Int(_), Int(0)) | (BinaryOp::Modulo, Int(_), Int(0)) => Err(
                EvaluatorError::DivisionByZero("integer division or modulo by zero".to_string()),
            ),
            (BinaryOp::FloorDivide, Int(a), Int(b)) => floor_div(a, b).map(Value::Int).ok_or_else(|| overflow(op)),
            (BinaryOp::Modulo, Int(a), Int(b)) => floor_mod(a, b).map(Value::Int).ok_or_else(|| overflow(op)),
            (BinaryOp::Power, Int(a), Int(b)) if b >= 0 => u32::try_from(b)
                .ok()
                .and_then(|exp| a.checked_pow(exp))
                .map(Value::Int)
                .ok_or_else(|| overflow(op)),
            (BinaryOp::Power, Int(0), Int(_)) => Err(EvaluatorError::DivisionByZero(
                "0 cannot be raised to a negative power".to_string(),
            )),
            (op, a, b) => float_op(op, a.to_f64(), b.to_f64(), lhs, rhs),
        };
    }

    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            Ok(Value::from(s))
        }
        (BinaryOp::Add, Value::Array(a), Value::Array(b)) => {
            let mut items = a.to_vec();
            items.extend(b.iter().cloned());
            Ok(Value::from(items))
        }

        (BinaryOp::Multiply, Value::String(s), n) | (BinaryOp::Multiply, n, Value::String(s)) => {
            match repeat_count(n) {
                Some(count) if s.len().checked_mul(count).is_some() => {
                    Ok(Value::from(s.repeat(count)))
                }
                Some(_) => Err(overflow(op)),
                None => Err(unsupported(op.symbol(), lhs, rhs)),
            }
        }
        (BinaryOp::Multiply, Value::Array(items), n) | (BinaryOp::Multiply, n, Value::Array(items)) => {
            match repeat_count(n) {
                Some(count) => {
                    let capacity = items.len().checked_mul(count).ok_or_else(|| overflow(op))?;
                    let mut result = Vec::with_capacity(capacity);
                    for _ in 0..count {
                        result.extend(items.iter().cloned());
                    }
                    Ok(Value::from(result))
                }
                None => Err(unsupported(op.symbol(), lhs, rhs)),
            }
        }

        // Calendar arithmetic
        (BinaryOp::Add, Value::Date(d), Value::Delta(delta))
        | (BinaryOp::Add, Value::Delta(delta), Value::Date(d)) => add_delta_to_date(*d, delta),
        (BinaryOp::Subtract, Value::Date(d), Value::Delta(delta)) => {
            add_delta_to_date(*d, &delta.negated())
        }
        (BinaryOp::Add, Value::DateTime(dt), Value::Delta(delta))
        | (BinaryOp::Add, Value::Delta(delta), Value::DateTime(dt)) => {
            Ok(Value::from(delta.apply_to_datetime(*dt)?))
        }
        (BinaryOp::Subtract, Value::DateTime(dt), Value::Delta(delta)) => {
            Ok(Value::from(delta.negated().apply_to_datetime(*dt)?))
        }
        (BinaryOp::Subtract, Value::DateTime(a), Value::DateTime(b)) => {
            Ok(Value::from(RelativeDelta::from_duration(*a - *b)))
        }
        (BinaryOp::Subtract, Value::Date(a), Value::Date(b)) => {
            Ok(Value::from(RelativeDelta::days((*a - *b).num_days())))
        }
        (BinaryOp::Add, Value::Delta(a), Value::Delta(b)) => Ok(Value::from(a.plus(b))),
        (BinaryOp::Subtract, Value::Delta(a), Value::Delta(b)) => {
            Ok(Value::from(a.plus(&b.negated())))
        }
        (BinaryOp::Multiply, Value::Delta(delta), n) | (BinaryOp::Multiply, n, Value::Delta(delta)) => {
            match Number::of(n) {
                Some(Number::Int(factor)) => Ok(Value::from(delta.scaled(factor))),
                _ => Err(unsupported(op.symbol(), lhs, rhs)),
            }
        }

        _ => Err(unsupported(op.symbol(), lhs, rhs)),
    }
}

fn float_op(op: BinaryOp, a: f64, b: f64, lhs: &Value, rhs: &Value) -> Result<Value, EvaluatorError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => {
            if b == 0.0 {
                return Err(EvaluatorError::DivisionByZero("division by zero".to_string()));
            }
            a / b
        }
        BinaryOp::FloorDivide => {
            if b == 0.0 {
                return Err(EvaluatorError::DivisionByZero(
                    "float floor division by zero".to_string(),
                ));
            }
            (a / b).floor()
        }
        BinaryOp::Modulo => {
            if b == 0.0 {
                return Err(EvaluatorError::DivisionByZero("float modulo".to_string()));
            }
            float_mod(a, b)
        }
        BinaryOp::Power => {
            if a == 0.0 && b < 0.0 {
                return Err(EvaluatorError::DivisionByZero(
                    "0.0 cannot be raised to a negative power".to_string(),
                ));
            }
            a.powf(b)
        }
        BinaryOp::And | BinaryOp::Or => return Err(unsupported(op.symbol(), lhs, rhs)),
    };
    Ok(Value::Float(result))
}

fn unary_op(op: UnaryOp, value: &Value) -> Result<Value, EvaluatorError> {
    match (op, value) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!is_truthy(v))),
        (UnaryOp::Negate, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Negate, Value::Delta(delta)) => Ok(Value::from(delta.negated())),
        (UnaryOp::Negate, v) => match Number::of(v) {
            Some(Number::Int(n)) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EvaluatorError::Overflow("integer negation out of range".to_string())),
            _ => Err(EvaluatorError::type_error(format!(
                "bad operand type for unary -: '{}'",
                type_name(v)
            ))),
        },
        (UnaryOp::Plus, Value::Bool(b)) => Ok(Value::Int(i64::from(*b))),
        (UnaryOp::Plus, v @ (Value::Int(_) | Value::Float(_) | Value::Delta(_))) => Ok(v.clone()),
        (UnaryOp::Plus, v) => Err(EvaluatorError::type_error(format!(
            "bad operand type for unary +: '{}'",
            type_name(v)
        ))),
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, EvaluatorError> {
    match container {
        Value::Array(items) => Ok(items.iter().any(|v| values_equal(v, item))),
        Value::Object(map) => Ok(map.contains_key(&key_string(item))),
        Value::String(s) => match item {
            Value::String(needle) => Ok(s.contains(needle.as_ref())),
            other => Err(EvaluatorError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                type_name(other)
            ))),
        },
        other => Err(EvaluatorError::type_error(format!(
            "argument of type '{}' is not iterable",
            type_name(other)
        ))),
    }
}

fn identical(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
        (Value::String(a), Value::String(b)) => Rc::ptr_eq(a, b) || a == b,
        _ => lhs == rhs,
    }
}

fn compare_op(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool, EvaluatorError> {
    let ordering = |lhs: &Value, rhs: &Value| match compare(lhs, rhs) {
        Some(ordering) => Ok(Some(ordering)),
        // NaN compares false against everything
        None if Number::of(lhs).is_some() && Number::of(rhs).is_some() => Ok(None),
        None => Err(EvaluatorError::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            type_name(lhs),
            type_name(rhs)
        ))),
    };

    match op {
        CompareOp::Equal => Ok(values_equal(lhs, rhs)),
        CompareOp::NotEqual => Ok(!values_equal(lhs, rhs)),
        CompareOp::LessThan => Ok(ordering(lhs, rhs)?.is_some_and(|o| o.is_lt())),
        CompareOp::LessThanOrEqual => Ok(ordering(lhs, rhs)?.is_some_and(|o| o.is_le())),
        CompareOp::GreaterThan => Ok(ordering(lhs, rhs)?.is_some_and(|o| o.is_gt())),
        CompareOp::GreaterThanOrEqual => Ok(ordering(lhs, rhs)?.is_some_and(|o| o.is_ge())),
        CompareOp::In => contains(rhs, lhs),
        CompareOp::NotIn => Ok(!contains(rhs, lhs)?),
        CompareOp::Is => Ok(identical(lhs, rhs)),
        CompareOp::IsNot => Ok(!identical(lhs, rhs)),
    }
}

fn integer_index(index: &Value, what: &str) -> Result<i64, EvaluatorError> {
    match index {
        Value::Int(n) => Ok(*n),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(EvaluatorError::type_error(format!(
            "{} indices must be integers, not {}",
            what,
            type_name(other)
        ))),
    }
}

fn subscript(container: &Value, index: &Value) -> Result<Value, EvaluatorError> {
    match container {
        Value::Array(items) => {
            let i = integer_index(index, "list")?;
            normalize_index(i, items.len())
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| EvaluatorError::IndexOutOfRange("list index out of range".to_string()))
        }
        Value::String(s) => {
            let i = integer_index(index, "string")?;
            let chars: Vec<char> = s.chars().collect();
            normalize_index(i, chars.len())
                .map(|i| Value::from(chars[i].to_string()))
                .ok_or_else(|| {
                    EvaluatorError::IndexOutOfRange("string index out of range".to_string())
                })
        }
        Value::Object(map) => {
            let key = key_string(index);
            map.get(&key)
                .cloned()
                .ok_or_else(|| EvaluatorError::MissingKey(index.repr()))
        }
        other => Err(EvaluatorError::type_error(format!(
            "'{}' object is not subscriptable",
            type_name(other)
        ))),
    }
}

fn slice(container: &Value, start: Option<i64>, stop: Option<i64>) -> Result<Value, EvaluatorError> {
    match container {
        Value::Array(items) => {
            let (lo, hi) = slice_bounds(start, stop, items.len());
            Ok(Value::from(items[lo..hi].to_vec()))
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (lo, hi) = slice_bounds(start, stop, chars.len());
            Ok(Value::from(chars[lo..hi].iter().collect::<String>()))
        }
        other => Err(EvaluatorError::type_error(format!(
            "'{}' object is not subscriptable",
            type_name(other)
        ))),
    }
}
