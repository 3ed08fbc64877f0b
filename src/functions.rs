// Built-in function implementations
// Coercions, the default expression library and value methods

use chrono::{Timelike, Utc};
use indexmap::IndexMap;

use crate::ast::BinaryOp;
use crate::datetime::{self, DateTimeParts, RelativeDelta};
use crate::environment::Globals;
use crate::evaluator::{binary_op, iterate, Evaluator, EvaluatorError};
use crate::signature::{Arguments, BoundArguments, Parameter, Signature};
use crate::utils::{compare, is_truthy, key_string, type_name};
use crate::value::{Function, Value};

/// The default expression library
///
/// Relative deltas, date and datetime construction, iteration helpers and
/// identifier generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionGlobals;

impl Globals for ExpressionGlobals {
    fn members(&self) -> Vec<(String, Value)> {
        let mut members = Vec::new();
        members.extend(delta::members());
        members.extend(dates::members());
        members.extend(iter::members());
        members.extend(ident::members());
        members.sort_by(|a, b| a.0.cmp(&b.0));
        members
    }
}

fn native<F>(name: &str, call: F) -> (String, Value)
where
    F: Fn(&mut Evaluator, Arguments) -> Result<Value, EvaluatorError> + 'static,
{
    (name.to_string(), Value::Function(Function::native(name, call)))
}

fn bind(function: &str, params: Vec<Parameter>, args: Arguments) -> Result<BoundArguments, EvaluatorError> {
    Ok(Signature::new(function, params).bind(args)?)
}

/// Integer argument, accepting bools and integral floats
fn int_arg(bound: &BoundArguments, function: &str, name: &str, default: i64) -> Result<i64, EvaluatorError> {
    match bound.get(name) {
        None => Ok(default),
        Some(Value::Int(n)) => Ok(*n),
        Some(Value::Bool(b)) => Ok(i64::from(*b)),
        Some(Value::Float(f)) if f.fract() == 0.0 && f.abs() < 9.2e18 => Ok(*f as i64),
        Some(other) => Err(EvaluatorError::type_error(format!(
            "{}() argument '{}' must be int, not {}",
            function,
            name,
            type_name(other)
        ))),
    }
}

fn str_arg<'a>(bound: &'a BoundArguments, function: &str, name: &str) -> Result<Option<&'a str>, EvaluatorError> {
    match bound.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(EvaluatorError::type_error(format!(
            "{}() argument '{}' must be str, not {}",
            function,
            name,
            type_name(other)
        ))),
    }
}

fn required(bound: &BoundArguments, name: &str) -> Value {
    // Binding guarantees presence of required parameters
    bound.get(name).cloned().unwrap_or(Value::Null)
}

/// Type coercions present in every environment
///
/// Each name converts its argument: `int('42')` is `42`, `bool([])` is
/// `False`, `float('1.5')` is `1.5`. None of them is an alias of `str`, so
/// `int(x)` in an expression yields an integer, not text.
pub mod coerce {
    use super::*;

    pub fn members() -> Vec<(String, Value)> {
        vec![
            native("bool", |_, args| to_bool(args)),
            native("dict", |_, args| to_dict(args)),
            native("float", |_, args| to_float(args)),
            native("int", |_, args| to_int(args)),
            native("list", |_, args| to_list(args)),
            native("str", |_, args| to_str(args)),
        ]
    }

    /// bool(x=False)
    pub fn to_bool(args: Arguments) -> Result<Value, EvaluatorError> {
        let bound = bind("bool", vec![Parameter::optional("x")], args)?;
        Ok(Value::Bool(bound.get("x").is_some_and(is_truthy)))
    }

    /// int(x=0)
    pub fn to_int(args: Arguments) -> Result<Value, EvaluatorError> {
        let bound = bind("int", vec![Parameter::optional("x")], args)?;
        match bound.get("x") {
            None => Ok(Value::Int(0)),
            Some(Value::Int(n)) => Ok(Value::Int(*n)),
            Some(Value::Bool(b)) => Ok(Value::Int(i64::from(*b))),
            Some(Value::Float(f)) => {
                if !f.is_finite() {
                    return Err(EvaluatorError::ValueError(format!(
                        "cannot convert float {} to integer",
                        Value::Float(*f)
                    )));
                }
                let truncated = f.trunc();
                if truncated >= i64::MAX as f64 || truncated < i64::MIN as f64 {
                    return Err(EvaluatorError::Overflow("int too large to convert".to_string()));
                }
                Ok(Value::Int(truncated as i64))
            }
            Some(Value::String(s)) => s
                .trim()
                .replace('_', "")
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| {
                    EvaluatorError::ValueError(format!(
                        "invalid literal for int() with base 10: {}",
                        Value::String(s.clone()).repr()
                    ))
                }),
            Some(other) => Err(EvaluatorError::type_error(format!(
                "int() argument must be a string or a number, not '{}'",
                type_name(other)
            ))),
        }
    }

    /// float(x=0.0)
    pub fn to_float(args: Arguments) -> Result<Value, EvaluatorError> {
        let bound = bind("float", vec![Parameter::optional("x")], args)?;
        match bound.get("x") {
            None => Ok(Value::Float(0.0)),
            Some(Value::Int(n)) => Ok(Value::Float(*n as f64)),
            Some(Value::Bool(b)) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
            Some(Value::Float(f)) => Ok(Value::Float(*f)),
            Some(Value::String(s)) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                EvaluatorError::ValueError(format!(
                    "could not convert string to float: {}",
                    Value::String(s.clone()).repr()
                ))
            }),
            Some(other) => Err(EvaluatorError::type_error(format!(
                "float() argument must be a string or a number, not '{}'",
                type_name(other)
            ))),
        }
    }

    /// str(x='')
    pub fn to_str(args: Arguments) -> Result<Value, EvaluatorError> {
        let bound = bind("str", vec![Parameter::optional("x")], args)?;
        match bound.get("x") {
            None => Ok(Value::from("")),
            Some(value @ Value::String(_)) => Ok(value.clone()),
            Some(value) => Ok(Value::from(value.to_string())),
        }
    }

    /// list(x=[])
    pub fn to_list(args: Arguments) -> Result<Value, EvaluatorError> {
        let bound = bind("list", vec![Parameter::optional("x")], args)?;
        match bound.get("x") {
            None => Ok(Value::from(Vec::new())),
            Some(value) => Ok(Value::from(iterate(value)?)),
        }
    }

    /// dict(x={}, **entries)
    pub fn to_dict(args: Arguments) -> Result<Value, EvaluatorError> {
        if args.positional.len() > 1 {
            return Err(EvaluatorError::type_error(format!(
                "dict expected at most 1 argument, got {}",
                args.positional.len()
            )));
        }

        let mut map = IndexMap::new();
        match args.positional.first() {
            None => {}
            Some(Value::Object(source)) => {
                map.extend(source.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Some(other) => {
                for (index, item) in iterate(other)?.into_iter().enumerate() {
                    let pair = iterate(&item)?;
                    if pair.len() != 2 {
                        return Err(EvaluatorError::ValueError(format!(
                            "dictionary update sequence element #{} has length {}; 2 is required",
                            index,
                            pair.len()
                        )));
                    }
                    map.insert(key_string(&pair[0]), pair[1].clone());
                }
            }
        }
        map.extend(args.keywords);
        Ok(Value::from(map))
    }
}

/// Relative deltas: years(n), months(n), ...
pub mod delta {
    use super::*;

    type Constructor = fn(i64) -> RelativeDelta;

    const UNITS: &[(&str, Constructor)] = &[
        ("years", RelativeDelta::years),
        ("months", RelativeDelta::months),
        ("weeks", RelativeDelta::weeks),
        ("days", RelativeDelta::days),
        ("hours", RelativeDelta::hours),
        ("minutes", RelativeDelta::minutes),
        ("seconds", RelativeDelta::seconds),
        ("microseconds", RelativeDelta::microseconds),
    ];

    pub fn members() -> Vec<(String, Value)> {
        UNITS
            .iter()
            .map(|&(name, build)| {
                native(name, move |_, args| {
                    let bound = bind(name, vec![Parameter::required("num")], args)?;
                    let n = int_arg(&bound, name, "num", 0)?;
                    Ok(Value::from(build(n)))
                })
            })
            .collect()
    }
}

/// date(), datetime(), now(), today()
pub mod dates {
    use super::*;

    pub fn members() -> Vec<(String, Value)> {
        vec![
            native("date", |_, args| date(args)),
            native("datetime", |_, args| datetime(args)),
            native("now", |_, args| {
                bind("now", Vec::new(), args)?;
                now()
            }),
            native("today", |_, args| {
                bind("today", Vec::new(), args)?;
                Ok(Value::from(Utc::now().date_naive()))
            }),
        ]
    }

    /// date(string=None, *, year=0, month=1, day=1)
    pub fn date(args: Arguments) -> Result<Value, EvaluatorError> {
        let bound = bind(
            "date",
            vec![
                Parameter::optional("string"),
                Parameter::keyword("year"),
                Parameter::keyword("month"),
                Parameter::keyword("day"),
            ],
            args,
        )?;

        if let Some(text) = str_arg(&bound, "date", "string")? {
            return Ok(Value::from(datetime::parse_date(text)?));
        }

        let date = datetime::make_date(
            int_arg(&bound, "date", "year", 0)?,
            int_arg(&bound, "date", "month", 1)?,
            int_arg(&bound, "date", "day", 1)?,
        )?;
        Ok(Value::from(date))
    }

    /// datetime(string=None, *, year=0, month=1, day=1, hour=0, minute=0,
    /// second=0, microsecond=0, utc_offset=0)
    pub fn datetime(args: Arguments) -> Result<Value, EvaluatorError> {
        let bound = bind(
            "datetime",
            vec![
                Parameter::optional("string"),
                Parameter::keyword("year"),
                Parameter::keyword("month"),
                Parameter::keyword("day"),
                Parameter::keyword("hour"),
                Parameter::keyword("minute"),
                Parameter::keyword("second"),
                Parameter::keyword("microsecond"),
                Parameter::keyword("utc_offset"),
            ],
            args,
        )?;

        if let Some(text) = str_arg(&bound, "datetime", "string")? {
            return Ok(Value::from(datetime::parse_datetime(text)?));
        }

        let defaults = DateTimeParts::default();
        let field = |name: &str, default: i64| int_arg(&bound, "datetime", name, default);
        let parts = DateTimeParts {
            year: field("year", defaults.year)?,
            month: field("month", defaults.month)?,
            day: field("day", defaults.day)?,
            hour: field("hour", defaults.hour)?,
            minute: field("minute", defaults.minute)?,
            second: field("second", defaults.second)?,
            microsecond: field("microsecond", defaults.microsecond)?,
            utc_offset: field("utc_offset", defaults.utc_offset)?,
        };
        Ok(Value::from(datetime::make_datetime(&parts)?))
    }

    /// Current UTC time with microsecond precision
    pub fn now() -> Result<Value, EvaluatorError> {
        let now = Utc::now();
        let truncated = now.nanosecond() / 1_000 * 1_000;
        let now = now.with_nanosecond(truncated).unwrap_or(now);
        Ok(Value::from(now.fixed_offset()))
    }
}

/// enumerate, filter, map, max, min, sum
pub mod iter {
    use super::*;
    use std::cmp::Ordering;

    pub fn members() -> Vec<(String, Value)> {
        vec![
            native("enumerate", |_, args| enumerate(args)),
            native("filter", filter),
            native("map", map),
            native("max", |ev, args| extreme(ev, "max", Ordering::Greater, args)),
            native("min", |ev, args| extreme(ev, "min", Ordering::Less, args)),
            native("sum", |_, args| sum(args)),
        ]
    }

    /// enumerate(iterable, start=0) -> [[index, item], ...]
    pub fn enumerate(args: Arguments) -> Result<Value, EvaluatorError> {
        let bound = bind(
            "enumerate",
            vec![Parameter::required("iterable"), Parameter::optional("start")],
            args,
        )?;
        let start = int_arg(&bound, "enumerate", "start", 0)?;
        let items = iterate(&required(&bound, "iterable"))?;
        let mut result = Vec::with_capacity(items.len());
        for (offset, item) in (0_i64..).zip(items) {
            let index = start
                .checked_add(offset)
                .ok_or_else(|| EvaluatorError::Overflow("enumerate index out of range".to_string()))?;
            result.push(Value::from(vec![Value::Int(index), item]));
        }
        Ok(Value::from(result))
    }

    /// filter(function, iterable); a None function keeps truthy items
    pub fn filter(ev: &mut Evaluator, args: Arguments) -> Result<Value, EvaluatorError> {
        let bound = bind(
            "filter",
            vec![Parameter::required("function"), Parameter::required("iterable")],
            args,
        )?;
        let function = required(&bound, "function");
        let mut result = Vec::new();
        for item in iterate(&required(&bound, "iterable"))? {
            let keep = if function.is_null() {
                is_truthy(&item)
            } else {
                is_truthy(&ev.call(&function, Arguments::positional(vec![item.clone()]))?)
            };
            if keep {
                result.push(item);
            }
        }
        Ok(Value::from(result))
    }

    /// map(function, iterable, *iterables); stops at the shortest iterable
    pub fn map(ev: &mut Evaluator, args: Arguments) -> Result<Value, EvaluatorError> {
        let bound = bind(
            "map",
            vec![
                Parameter::required("function"),
                Parameter::required("iterable"),
                Parameter::variadic("iterables"),
            ],
            args,
        )?;
        let function = required(&bound, "function");

        let mut columns = vec![iterate(&required(&bound, "iterable"))?];
        if let Some(Value::Array(rest)) = bound.get("iterables") {
            for iterable in rest.iter() {
                columns.push(iterate(iterable)?);
            }
        }

        let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
        let mut result = Vec::with_capacity(rows);
        for row in 0..rows {
            let call_args = columns.iter().map(|column| column[row].clone()).collect();
            result.push(ev.call(&function, Arguments::positional(call_args))?);
        }
        Ok(Value::from(result))
    }

    /// max/min(iterable, *, key=None, default=<error>) or max/min(a, b, ...)
    fn extreme(
        ev: &mut Evaluator,
        name: &str,
        wanted: Ordering,
        args: Arguments,
    ) -> Result<Value, EvaluatorError> {
        let bound = bind(
            name,
            vec![
                Parameter::variadic("args"),
                Parameter::keyword("key"),
                Parameter::keyword("default"),
            ],
            args,
        )?;

        let candidates = match bound.get("args") {
            Some(Value::Array(values)) if values.len() == 1 => iterate(&values[0])?,
            Some(Value::Array(values)) if !values.is_empty() => values.to_vec(),
            _ => {
                return Err(EvaluatorError::type_error(format!(
                    "{} expected at least 1 argument, got 0",
                    name
                )))
            }
        };

        let key = bound.get("key").filter(|k| !k.is_null());
        let mut best: Option<(Value, Value)> = None;
        for item in candidates {
            let rank = match key {
                Some(function) => ev.call(function, Arguments::positional(vec![item.clone()]))?,
                None => item.clone(),
            };
            let replace = match &best {
                None => true,
                Some((_, best_rank)) => match compare(&rank, best_rank) {
                    Some(ordering) => ordering == wanted,
                    None => {
                        return Err(EvaluatorError::type_error(format!(
                            "'{}' not supported between instances of '{}' and '{}'",
                            if wanted == Ordering::Greater { ">" } else { "<" },
                            type_name(&rank),
                            type_name(best_rank)
                        )))
                    }
                },
            };
            if replace {
                best = Some((item, rank));
            }
        }

        match best {
            Some((item, _)) => Ok(item),
            None => bound.get("default").cloned().ok_or_else(|| {
                EvaluatorError::ValueError(format!("{}() arg is an empty sequence", name))
            }),
        }
    }

    /// sum(iterable, start=0)
    pub fn sum(args: Arguments) -> Result<Value, EvaluatorError> {
        let bound = bind(
            "sum",
            vec![Parameter::required("iterable"), Parameter::optional("start")],
            args,
        )?;
        let start = bound.get("start").cloned().unwrap_or(Value::Int(0));
        if start.is_string() {
            return Err(EvaluatorError::type_error(
                "sum() can't sum strings [use ''.join(seq) instead]",
            ));
        }
        iterate(&required(&bound, "iterable"))?
            .iter()
            .try_fold(start, |total, item| binary_op(BinaryOp::Add, &total, item))
    }
}

/// uuid(strip=False)
pub mod ident {
    use super::*;
    use uuid::Uuid;

    pub fn members() -> Vec<(String, Value)> {
        vec![native("uuid", |_, args| uuid(args))]
    }

    /// A random (v4) UUID string, without hyphens when `strip` is truthy
    pub fn uuid(args: Arguments) -> Result<Value, EvaluatorError> {
        let bound = bind("uuid", vec![Parameter::optional("strip")], args)?;
        let id = Uuid::new_v4();
        let text = if bound.get("strip").is_some_and(is_truthy) {
            id.simple().to_string()
        } else {
            id.hyphenated().to_string()
        };
        Ok(Value::from(text))
    }
}

/// Attribute access: temporal fields and bound methods
pub mod methods {
    use super::*;

    /// Resolve `target.name`
    pub fn attribute(target: &Value, name: &str) -> Result<Value, EvaluatorError> {
        if let Some(value) = field(target, name) {
            return Ok(value);
        }
        if has_method(target, name) {
            let receiver = target.clone();
            let method = name.to_string();
            let qualified = format!("{}.{}", type_name(target), name);
            return Ok(Value::Function(Function::native(qualified, move |_, args| {
                call_method(&receiver, &method, args)
            })));
        }
        Err(EvaluatorError::UnknownAttribute {
            type_name: type_name(target).to_string(),
            name: name.to_string(),
        })
    }

    fn field(target: &Value, name: &str) -> Option<Value> {
        use chrono::Datelike;

        let n = match (target, name) {
            (Value::Date(d), "year") => i64::from(d.year()),
            (Value::Date(d), "month") => i64::from(d.month()),
            (Value::Date(d), "day") => i64::from(d.day()),
            (Value::DateTime(dt), "year") => i64::from(dt.year()),
            (Value::DateTime(dt), "month") => i64::from(dt.month()),
            (Value::DateTime(dt), "day") => i64::from(dt.day()),
            (Value::DateTime(dt), "hour") => i64::from(dt.hour()),
            (Value::DateTime(dt), "minute") => i64::from(dt.minute()),
            (Value::DateTime(dt), "second") => i64::from(dt.second()),
            (Value::DateTime(dt), "microsecond") => i64::from(dt.nanosecond() / 1_000),
            (Value::Delta(d), "years") => d.years,
            (Value::Delta(d), "months") => d.months,
            (Value::Delta(d), "days") => d.days,
            (Value::Delta(d), "hours") => d.hours,
            (Value::Delta(d), "minutes") => d.minutes,
            (Value::Delta(d), "seconds") => d.seconds,
            (Value::Delta(d), "microseconds") => d.microseconds,
            _ => return None,
        };
        Some(Value::Int(n))
    }

    fn has_method(target: &Value, name: &str) -> bool {
        matches!(
            (target, name),
            (
                Value::String(_),
                "upper" | "lower" | "strip" | "split" | "join" | "replace" | "startswith" | "endswith"
            ) | (Value::Object(_), "keys" | "values" | "items" | "get")
                | (Value::Date(_), "isoformat")
                | (Value::DateTime(_), "isoformat" | "date")
        )
    }

    fn call_method(receiver: &Value, method: &str, args: Arguments) -> Result<Value, EvaluatorError> {
        let qualified = format!("{}.{}", type_name(receiver), method);
        let qualified = qualified.as_str();

        match (receiver, method) {
            (Value::String(s), "upper") => {
                bind(qualified, Vec::new(), args)?;
                Ok(Value::from(s.to_uppercase()))
            }
            (Value::String(s), "lower") => {
                bind(qualified, Vec::new(), args)?;
                Ok(Value::from(s.to_lowercase()))
            }
            (Value::String(s), "strip") => {
                let bound = bind(qualified, vec![Parameter::optional("chars")], args)?;
                let stripped = match str_arg(&bound, qualified, "chars")? {
                    Some(chars) => s.trim_matches(|c: char| chars.contains(c)),
                    None => s.trim(),
                };
                Ok(Value::from(stripped))
            }
            (Value::String(s), "split") => {
                let bound = bind(qualified, vec![Parameter::optional("sep")], args)?;
                let parts: Vec<Value> = match str_arg(&bound, qualified, "sep")? {
                    Some("") => return Err(EvaluatorError::ValueError("empty separator".to_string())),
                    Some(sep) => s.split(sep).map(Value::from).collect(),
                    None => s.split_whitespace().map(Value::from).collect(),
                };
                Ok(Value::from(parts))
            }
            (Value::String(s), "join") => {
                let bound = bind(qualified, vec![Parameter::required("iterable")], args)?;
                let mut pieces = Vec::new();
                for (index, item) in iterate(&required(&bound, "iterable"))?.iter().enumerate() {
                    match item.as_str() {
                        Some(piece) => pieces.push(piece.to_string()),
                        None => {
                            return Err(EvaluatorError::type_error(format!(
                                "sequence item {}: expected str instance, {} found",
                                index,
                                type_name(item)
                            )))
                        }
                    }
                }
                Ok(Value::from(pieces.join(&s[..])))
            }
            (Value::String(s), "replace") => {
                let bound = bind(
                    qualified,
                    vec![Parameter::required("old"), Parameter::required("new")],
                    args,
                )?;
                let old = str_arg(&bound, qualified, "old")?.unwrap_or_default();
                let new = str_arg(&bound, qualified, "new")?.unwrap_or_default();
                Ok(Value::from(s.replace(old, new)))
            }
            (Value::String(s), "startswith") | (Value::String(s), "endswith") => {
                let bound = bind(qualified, vec![Parameter::required("affix")], args)?;
                let affix = str_arg(&bound, qualified, "affix")?.unwrap_or_default();
                let result = if method == "startswith" {
                    s.starts_with(affix)
                } else {
                    s.ends_with(affix)
                };
                Ok(Value::Bool(result))
            }

            (Value::Object(map), "keys") => {
                bind(qualified, Vec::new(), args)?;
                Ok(Value::from(map.keys().map(|k| Value::from(k.as_str())).collect::<Vec<_>>()))
            }
            (Value::Object(map), "values") => {
                bind(qualified, Vec::new(), args)?;
                Ok(Value::from(map.values().cloned().collect::<Vec<_>>()))
            }
            (Value::Object(map), "items") => {
                bind(qualified, Vec::new(), args)?;
                let items = map
                    .iter()
                    .map(|(k, v)| Value::from(vec![Value::from(k.as_str()), v.clone()]))
                    .collect::<Vec<_>>();
                Ok(Value::from(items))
            }
            (Value::Object(map), "get") => {
                let bound = bind(
                    qualified,
                    vec![Parameter::required("key"), Parameter::optional("default")],
                    args,
                )?;
                let key = key_string(&required(&bound, "key"));
                Ok(map
                    .get(&key)
                    .or_else(|| bound.get("default"))
                    .cloned()
                    .unwrap_or(Value::Null))
            }

            (Value::Date(d), "isoformat") => {
                bind(qualified, Vec::new(), args)?;
                Ok(Value::from(d.format("%Y-%m-%d").to_string()))
            }
            (Value::DateTime(dt), "isoformat") => {
                bind(qualified, Vec::new(), args)?;
                Ok(Value::from(datetime::format_datetime(dt, 'T')))
            }
            (Value::DateTime(dt), "date") => {
                bind(qualified, Vec::new(), args)?;
                Ok(Value::from(dt.date_naive()))
            }

            _ => Err(EvaluatorError::UnknownAttribute {
                type_name: type_name(receiver).to_string(),
                name: method.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use serde_json::json;

    fn eval(expression: &str) -> Result<Value, EvaluatorError> {
        Evaluator::new(Environment::default()).evaluate_str(expression)
    }

    fn eval_ok(expression: &str) -> Value {
        eval(expression).unwrap()
    }

    #[test]
    fn test_coercions() {
        assert_eq!(eval_ok("str(20)"), Value::from("20"));
        assert_eq!(eval_ok("str(2.0)"), Value::from("2.0"));
        assert_eq!(eval_ok("str(None)"), Value::from("None"));
        assert_eq!(eval_ok("int('42')"), Value::Int(42));
        assert_eq!(eval_ok("int(-2.7)"), Value::Int(-2));
        assert_eq!(eval_ok("float('1.5')"), Value::Float(1.5));
        assert_eq!(eval_ok("bool([])"), Value::Bool(false));
        assert_eq!(eval_ok("bool('x')"), Value::Bool(true));
        assert_eq!(eval_ok("list('ab')"), Value::from(json!(["a", "b"])));
        assert_eq!(eval_ok("int()"), Value::Int(0));
        assert!(matches!(eval("int('x')"), Err(EvaluatorError::ValueError(_))));
        assert!(matches!(eval("int([])"), Err(EvaluatorError::TypeError(_))));
    }

    #[test]
    fn test_dict_coercion() {
        assert_eq!(
            eval_ok("dict([['a', 1]], b=2)"),
            Value::from(json!({"a": 1, "b": 2}))
        );
        assert_eq!(eval_ok("dict()"), Value::from(json!({})));
        assert!(matches!(eval("dict([[1]])"), Err(EvaluatorError::ValueError(_))));
    }

    #[test]
    fn test_deltas() {
        assert_eq!(eval_ok("weeks(10)"), Value::from(RelativeDelta::days(70)));
        assert_eq!(eval_ok("days(1) + hours(2)").to_string(), "relativedelta(days=+1, hours=+2)");
        assert!(matches!(eval("days('x')"), Err(EvaluatorError::TypeError(_))));
        assert!(matches!(eval("days()"), Err(EvaluatorError::Arguments(_))));
    }

    #[test]
    fn test_date_construction() {
        assert_eq!(eval_ok("date('1970-01-01')"), eval_ok("date(year=1970, month=1, day=1)"));
        assert_eq!(
            eval_ok("datetime('1970-01-01T00:00:00.000+00:00')"),
            eval_ok("datetime(year=1970, month=1, day=1, hour=0, minute=0, second=0, microsecond=0, utc_offset=0)")
        );
        assert!(matches!(eval("datetime()"), Err(EvaluatorError::DateTime(_))));
        assert!(matches!(eval("date('nope')"), Err(EvaluatorError::DateTime(_))));
    }

    #[test]
    fn test_calendar_arithmetic() {
        assert_eq!(
            eval_ok("date('2021-01-31') + months(1)"),
            eval_ok("date('2021-02-28')")
        );
        assert_eq!(
            eval_ok("date('1970-01-01') + hours(1)"),
            eval_ok("datetime('1970-01-01T01:00:00+00:00')")
        );
        assert_eq!(
            eval_ok("(datetime('1970-01-02') - datetime('1970-01-01')).days"),
            Value::Int(1)
        );
        assert_eq!(eval_ok("datetime('2020-05-17T08:30:00+02:00').hour"), Value::Int(8));
    }

    #[test]
    fn test_now_and_today() {
        assert!(matches!(eval_ok("now()"), Value::DateTime(_)));
        assert!(matches!(eval_ok("today()"), Value::Date(_)));
        assert!(matches!(eval("now(1)"), Err(EvaluatorError::Arguments(_))));
    }

    #[test]
    fn test_iteration_helpers() {
        assert_eq!(
            eval_ok("enumerate(['a', 'b'])"),
            Value::from(json!([[0, "a"], [1, "b"]]))
        );
        assert_eq!(eval_ok("enumerate('a', start=5)"), Value::from(json!([[5, "a"]])));
        assert_eq!(
            eval_ok("filter(lambda i: i > 1, [0, 1, 2, 3])"),
            Value::from(json!([2, 3]))
        );
        assert_eq!(eval_ok("filter(None, [0, 1, '', 'x'])"), Value::from(json!([1, "x"])));
        assert_eq!(
            eval_ok("map(lambda a, b: a + b, [1, 2, 3], [10, 20])"),
            Value::from(json!([11, 22]))
        );
        assert_eq!(eval_ok("map(str, [1, 2])"), Value::from(json!(["1", "2"])));
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(eval_ok("sum([0, 1, 2, 3])"), Value::Int(6));
        assert_eq!(eval_ok("sum([0.5, 1])"), Value::Float(1.5));
        assert_eq!(eval_ok("sum(x * 2 for x in [1, 2])"), Value::Int(6));
        assert_eq!(eval_ok("max([0, 3, 1])"), Value::Int(3));
        assert_eq!(eval_ok("min(4, 2, 8)"), Value::Int(2));
        assert_eq!(
            eval_ok("max([{'n': 1}, {'n': 5}], key=lambda d: d['n'])"),
            Value::from(json!({"n": 5}))
        );
        assert_eq!(eval_ok("min([], default=None)"), Value::Null);
        assert!(matches!(eval("max([])"), Err(EvaluatorError::ValueError(_))));
        assert!(matches!(eval("sum(['a'])"), Err(EvaluatorError::TypeError(_))));
    }

    #[test]
    fn test_uuid() {
        let hyphenated = eval_ok("uuid()");
        let text = hyphenated.as_str().unwrap();
        assert_eq!(text.len(), 36);
        assert_eq!(text.matches('-').count(), 4);

        let stripped = eval_ok("uuid(strip=True)");
        let text = stripped.as_str().unwrap();
        assert_eq!(text.len(), 32);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(eval_ok("'abc'.upper()"), Value::from("ABC"));
        assert_eq!(eval_ok("'  x '.strip()"), Value::from("x"));
        assert_eq!(eval_ok("'xxaxx'.strip('x')"), Value::from("a"));
        assert_eq!(eval_ok("'a,b'.split(',')"), Value::from(json!(["a", "b"])));
        assert_eq!(eval_ok("'a b  c'.split()"), Value::from(json!(["a", "b", "c"])));
        assert_eq!(eval_ok("'-'.join(['a', 'b'])"), Value::from("a-b"));
        assert_eq!(eval_ok("'aXa'.replace('a', 'b')"), Value::from("bXb"));
        assert_eq!(eval_ok("'name'.startswith('na')"), Value::Bool(true));
        assert!(matches!(eval("'-'.join([1])"), Err(EvaluatorError::TypeError(_))));
        assert!(matches!(
            eval("'x'.nope()"),
            Err(EvaluatorError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_dict_methods() {
        assert_eq!(eval_ok("{'a': 1}.keys()"), Value::from(json!(["a"])));
        assert_eq!(eval_ok("{'a': 1}.items()"), Value::from(json!([["a", 1]])));
        assert_eq!(eval_ok("{'a': 1}.get('b', 2)"), Value::Int(2));
        assert_eq!(eval_ok("{'a': 1}.get('b')"), Value::Null);
    }

    #[test]
    fn test_isoformat() {
        assert_eq!(eval_ok("date('1970-01-01').isoformat()"), Value::from("1970-01-01"));
        assert_eq!(
            eval_ok("datetime('1970-01-01 12:00').isoformat()"),
            Value::from("1970-01-01T12:00:00+00:00")
        );
    }
}
