// Call arguments and parameter binding
// Shared by built-in functions and lambdas

use indexmap::IndexMap;
use thiserror::Error;

use crate::value::Value;

/// Argument binding errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignatureError {
    #[error("{function}() takes {max} positional arguments but {actual} were given")]
    TooManyPositional {
        function: String,
        max: usize,
        actual: usize,
    },

    #[error("{function}() missing required argument: '{name}'")]
    MissingArgument { function: String, name: String },

    #[error("{function}() got an unexpected keyword argument '{name}'")]
    UnexpectedKeyword { function: String, name: String },

    #[error("{function}() got multiple values for argument '{name}'")]
    DuplicateArgument { function: String, name: String },
}

/// Arguments as written at a call site
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    pub positional: Vec<Value>,
    pub keywords: IndexMap<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(values: Vec<Value>) -> Self {
        Arguments {
            positional: values,
            keywords: IndexMap::new(),
        }
    }

    pub fn with_keyword(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How a parameter may be supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// By position or by keyword
    Positional,
    /// Only by keyword
    KeywordOnly,
    /// Collects all remaining positional arguments into a list
    Variadic,
}

/// Function parameter definition
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    pub optional: bool,
}

impl Parameter {
    pub fn required(name: &str) -> Self {
        Parameter {
            name: name.to_string(),
            kind: ParamKind::Positional,
            optional: false,
        }
    }

    pub fn optional(name: &str) -> Self {
        Parameter {
            name: name.to_string(),
            kind: ParamKind::Positional,
            optional: true,
        }
    }

    pub fn keyword(name: &str) -> Self {
        Parameter {
            name: name.to_string(),
            kind: ParamKind::KeywordOnly,
            optional: true,
        }
    }

    pub fn variadic(name: &str) -> Self {
        Parameter {
            name: name.to_string(),
            kind: ParamKind::Variadic,
            optional: true,
        }
    }
}

/// Function signature
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<Parameter>,
}

/// Arguments matched to parameter names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments {
    values: IndexMap<String, Value>,
}

impl BoundArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.values.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn into_map(self) -> IndexMap<String, Value> {
        self.values
    }
}

impl Signature {
    pub fn new(name: &str, params: Vec<Parameter>) -> Self {
        Signature {
            name: name.to_string(),
            params,
        }
    }

    /// Match call-site arguments to parameters.
    ///
    /// Positional arguments fill positional parameters in order; a variadic
    /// parameter absorbs the rest. Keywords may name any non-variadic
    /// parameter not already filled.
    pub fn bind(&self, args: Arguments) -> Result<BoundArguments, SignatureError> {
        let mut values = IndexMap::new();
        let mut positional = args.positional.into_iter();

        for param in &self.params {
            match param.kind {
                ParamKind::Positional => {
                    if let Some(value) = positional.next() {
                        values.insert(param.name.clone(), value);
                    }
                }
                ParamKind::Variadic => {
                    let rest: Vec<Value> = positional.by_ref().collect();
                    values.insert(param.name.clone(), Value::from(rest));
                }
                ParamKind::KeywordOnly => {}
            }
        }

        let extra = positional.count();
        if extra > 0 {
            let max = self
                .params
                .iter()
                .filter(|p| p.kind == ParamKind::Positional)
                .count();
            return Err(SignatureError::TooManyPositional {
                function: self.name.clone(),
                max,
                actual: max + extra,
            });
        }

        for (name, value) in args.keywords {
            let param = self
                .params
                .iter()
                .find(|p| p.name == name && p.kind != ParamKind::Variadic)
                .ok_or_else(|| SignatureError::UnexpectedKeyword {
                    function: self.name.clone(),
                    name: name.clone(),
                })?;
            if values.contains_key(&param.name) {
                return Err(SignatureError::DuplicateArgument {
                    function: self.name.clone(),
                    name,
                });
            }
            values.insert(name, value);
        }

        if let Some(missing) = self
            .params
            .iter()
            .find(|p| !p.optional && !values.contains_key(&p.name))
        {
            return Err(SignatureError::MissingArgument {
                function: self.name.clone(),
                name: missing.name.clone(),
            });
        }

        Ok(BoundArguments { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime_signature() -> Signature {
        Signature::new(
            "datetime",
            vec![
                Parameter::optional("string"),
                Parameter::keyword("year"),
                Parameter::keyword("month"),
            ],
        )
    }

    #[test]
    fn test_bind_positional_and_keywords() {
        let args = Arguments::positional(vec![Value::from("1970-01-01")]).with_keyword("year", 1970);
        let bound = datetime_signature().bind(args).unwrap();
        assert_eq!(bound.get("string"), Some(&Value::from("1970-01-01")));
        assert_eq!(bound.get("year"), Some(&Value::Int(1970)));
        assert!(!bound.contains("month"));
    }

    #[test]
    fn test_keyword_only_rejects_position() {
        let args = Arguments::positional(vec![Value::from("x"), Value::Int(1970)]);
        let err = datetime_signature().bind(args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "datetime() takes 1 positional arguments but 2 were given"
        );
    }

    #[test]
    fn test_unexpected_and_duplicate_keywords() {
        let sig = datetime_signature();
        let err = sig.bind(Arguments::new().with_keyword("hour", 1)).unwrap_err();
        assert_eq!(
            err,
            SignatureError::UnexpectedKeyword {
                function: "datetime".to_string(),
                name: "hour".to_string()
            }
        );

        let args = Arguments::positional(vec![Value::from("x")]).with_keyword("string", "y");
        assert!(matches!(
            sig.bind(args),
            Err(SignatureError::DuplicateArgument { .. })
        ));
    }

    #[test]
    fn test_missing_required() {
        let sig = Signature::new("days", vec![Parameter::required("n")]);
        let err = sig.bind(Arguments::new()).unwrap_err();
        assert_eq!(err.to_string(), "days() missing required argument: 'n'");
    }

    #[test]
    fn test_variadic_collects_rest() {
        let sig = Signature::new("max", vec![Parameter::variadic("args")]);
        let bound = sig
            .bind(Arguments::positional(vec![Value::Int(1), Value::Int(2)]))
            .unwrap();
        assert_eq!(
            bound.get("args"),
            Some(&Value::from(vec![Value::Int(1), Value::Int(2)]))
        );
    }
}
