//! Term tree construction.
//!
//! A term is a node in the query expression tree: an operator tag, ordered
//! positional arguments, named optional arguments, and (for DATUM terms
//! only) an embedded JSON value.

use crate::error::QueryError;
use crate::term_type::TermType;
use crate::types::TypeFlag;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A node in the query expression tree.
///
/// Invariant: `datum` is `Some` iff the operator tag is DATUM, and DATUM
/// terms carry no arguments. The constructors uphold this.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    op: TermType,
    args: Vec<Term>,
    opt_args: BTreeMap<String, Term>,
    datum: Option<Value>,
}

impl Term {
    /// Translates a parsed JSON expression into a term tree.
    ///
    /// - An object becomes a MAKE_OBJ term whose entries are named args.
    /// - An array is a term: `[code, args?, optargs?]` with 1 to 3 entries.
    /// - Anything else is a DATUM term embedding the value.
    pub fn from_value(value: Value) -> Result<Term, QueryError> {
        let entries = match value {
            Value::Object(entries) => return Self::make_obj_term(entries),
            Value::Array(entries) => entries,
            datum => {
                return Ok(Term {
                    op: TermType::Datum,
                    args: Vec::new(),
                    opt_args: BTreeMap::new(),
                    datum: Some(datum),
                });
            }
        };

        if entries.len() > 3 {
            return Err(QueryError::TermArity(entries.len()));
        }
        let mut entries = entries.into_iter();
        let type_val = match entries.next() {
            Some(v) => v,
            None => return Err(QueryError::TermArity(0)),
        };

        if !type_val.is_number() {
            return Err(QueryError::TermShape {
                what: "term type",
                expected: "number",
                found: type_val.type_name(),
            });
        }
        let code = type_val.as_i64();
        let op = TermType::from_wire(code).ok_or(QueryError::UnknownOperator(code))?;

        let mut args = Vec::new();
        if let Some(args_val) = entries.next() {
            let arg_vals = match args_val {
                Value::Array(items) => items,
                other => {
                    return Err(QueryError::TermShape {
                        what: "term args",
                        expected: "array",
                        found: other.type_name(),
                    });
                }
            };
            args.reserve(arg_vals.len());
            for (i, arg_val) in arg_vals.into_iter().enumerate() {
                let arg = Term::from_value(arg_val)
                    .map_err(|err| err.context(format!("{} arg[{}]", op.name(), i)))?;
                args.push(arg);
            }
        }

        let mut opt_args = BTreeMap::new();
        if let Some(opts_val) = entries.next() {
            let opt_vals = match opts_val {
                Value::Object(entries) => entries,
                other => {
                    return Err(QueryError::TermShape {
                        what: "term optargs",
                        expected: "object",
                        found: other.type_name(),
                    });
                }
            };
            for (key, opt_val) in opt_vals {
                let opt = Term::from_value(opt_val)
                    .map_err(|err| err.context(format!("{} optArg[{:?}]", op.name(), key)))?;
                opt_args.insert(key, opt);
            }
        }

        Ok(Term {
            op,
            args,
            opt_args,
            datum: None,
        })
    }

    fn make_obj_term(entries: BTreeMap<String, Value>) -> Result<Term, QueryError> {
        let mut opt_args = BTreeMap::new();
        for (key, value) in entries {
            let opt = Term::from_value(value)
                .map_err(|err| err.context(format!("obj[{key:?}]")))?;
            opt_args.insert(key, opt);
        }

        Ok(Term {
            op: TermType::MakeObj,
            args: Vec::new(),
            opt_args,
            datum: None,
        })
    }

    pub fn op(&self) -> TermType {
        self.op
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }

    pub fn opt_args(&self) -> &BTreeMap<String, Term> {
        &self.opt_args
    }

    /// The embedded JSON value, present only on DATUM terms.
    pub fn datum(&self) -> Option<&Value> {
        self.datum.as_ref()
    }

    pub fn is_datum(&self) -> bool {
        self.op == TermType::Datum
    }

    /// The static result type of this term: the embedded value's type for
    /// DATUM terms, the operator's declared type otherwise. `None` means no
    /// type has been declared; the compile stage decides what to do with
    /// those, never this layer.
    pub fn result_type(&self) -> Option<TypeFlag> {
        match &self.datum {
            Some(value) => Some(value_type(value)),
            None => self.op.return_type(),
        }
    }

    /// Compile-stage shape check: rejects operators the server will never
    /// support. Everything else passes; arity and argument typing belong to
    /// the execution engine.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.op.is_unsupported() {
            return Err(QueryError::UnsupportedTerm(self.op.name()));
        }
        for (i, arg) in self.args.iter().enumerate() {
            arg.validate()
                .map_err(|err| err.context(format!("{} arg[{}]", self.op.name(), i)))?;
        }
        for (key, opt) in &self.opt_args {
            opt.validate()
                .map_err(|err| err.context(format!("{} optArg[{:?}]", self.op.name(), key)))?;
        }
        Ok(())
    }

    fn format(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        if let Some(datum) = &self.datum {
            return write!(f, "{datum}");
        }

        write!(f, "({}", self.op.name())?;
        self.format_args(f, depth)?;
        self.format_opt_args(f, depth)?;
        f.write_str(")")
    }

    fn format_args(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        if self.args.is_empty() {
            return Ok(());
        }

        let indent = "  ".repeat(depth);
        let multi = self.args.len() > 1;
        let inner = if multi { depth + 1 } else { depth };

        f.write_str(" [")?;
        for arg in &self.args {
            if multi {
                write!(f, "\n{indent}  ")?;
            }
            arg.format(f, inner)?;
        }
        if multi {
            write!(f, "\n{indent}")?;
        }
        f.write_str("]")
    }

    fn format_opt_args(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        if self.opt_args.is_empty() {
            return Ok(());
        }

        let indent = "  ".repeat(depth);
        let multi = self.opt_args.len() > 1;
        let inner = if multi { depth + 1 } else { depth };

        f.write_str(" {")?;
        for (key, opt) in &self.opt_args {
            if multi {
                write!(f, "\n{indent}  ")?;
            }
            write!(f, "{key:?}: ")?;
            opt.format(f, inner)?;
        }
        if multi {
            write!(f, "\n{indent}")?;
        }
        f.write_str("}")
    }
}

fn value_type(value: &Value) -> TypeFlag {
    match value {
        Value::Null => TypeFlag::NULL,
        Value::Bool(_) => TypeFlag::BOOL,
        Value::Number(_) => TypeFlag::NUMBER,
        Value::String(_) => TypeFlag::STRING,
        Value::Object(_) => TypeFlag::OBJECT,
        Value::Array(_) => TypeFlag::ARRAY,
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.format(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(json: &str) -> Term {
        Term::from_value(Value::parse(json.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_scalar_becomes_datum() {
        for json in ["null", "true", "1", "\"hi\""] {
            let t = term(json);
            assert!(t.is_datum());
            assert!(t.args().is_empty());
            assert!(t.opt_args().is_empty());
            assert!(t.datum().is_some());
        }
    }

    #[test]
    fn test_object_becomes_make_obj() {
        let t = term(r#"{"name": "sam", "age": 7}"#);
        assert_eq!(t.op(), TermType::MakeObj);
        assert!(t.args().is_empty());
        assert!(t.datum().is_none());
        let keys: Vec<_> = t.opt_args().keys().cloned().collect();
        assert_eq!(keys, vec!["age".to_string(), "name".to_string()]);
        assert!(t.opt_args()["age"].is_datum());
    }

    #[test]
    fn test_table_lookup_term() {
        // TABLE applied to DB("db") and the table name "users".
        let t = term(r#"[15,[[14,["db"]],"users"]]"#);
        assert_eq!(t.op(), TermType::Table);
        assert_eq!(t.args().len(), 2);
        assert_eq!(t.args()[0].op(), TermType::Db);
        assert_eq!(t.args()[0].args().len(), 1);
        assert_eq!(t.args()[0].args()[0].datum().unwrap().as_str(), "db");
        assert_eq!(t.args()[1].datum().unwrap().as_str(), "users");
        assert_eq!(t.result_type(), Some(TypeFlag::TABLE));
    }

    #[test]
    fn test_datum_result_types() {
        assert_eq!(term("null").result_type(), Some(TypeFlag::NULL));
        assert_eq!(term("true").result_type(), Some(TypeFlag::BOOL));
        assert_eq!(term("1").result_type(), Some(TypeFlag::NUMBER));
        assert_eq!(term("\"s\"").result_type(), Some(TypeFlag::STRING));
        assert_eq!(term("{}").result_type(), Some(TypeFlag::OBJECT));
        // A bare array of datums is a MAKE_ARRAY-like datum embed only when
        // it fails term shape; [1] parses as a DATUM term (code 1).
    }

    #[test]
    fn test_undeclared_result_type_stays_none() {
        let t = term(r#"[31,[[15,[[14,["db"]],"users"]],"field"]]"#);
        assert_eq!(t.op(), TermType::GetField);
        assert_eq!(t.result_type(), None);
    }

    #[test]
    fn test_missing_args_is_shape_valid() {
        // [15] alone is within the 1..=3 arity; it parses with no args and
        // is left for a later validation pass to reject.
        let t = term("[15]");
        assert_eq!(t.op(), TermType::Table);
        assert!(t.args().is_empty());
    }

    #[test]
    fn test_arity_errors() {
        let empty = Term::from_value(Value::parse(b"[]").unwrap()).unwrap_err();
        assert!(matches!(empty, QueryError::TermArity(0)));

        let long = Term::from_value(Value::parse(b"[1,[],{},{}]").unwrap()).unwrap_err();
        assert!(matches!(long, QueryError::TermArity(4)));
    }

    #[test]
    fn test_term_type_must_be_number() {
        let err = Term::from_value(Value::parse(br#"["DB"]"#).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            QueryError::TermShape {
                what: "term type",
                ..
            }
        ));
    }

    #[test]
    fn test_args_must_be_array() {
        let err = Term::from_value(Value::parse(b"[15,1]").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            QueryError::TermShape {
                what: "term args",
                ..
            }
        ));
    }

    #[test]
    fn test_optargs_must_be_object() {
        let err = Term::from_value(Value::parse(b"[15,[],1]").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            QueryError::TermShape {
                what: "term optargs",
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_operator_code() {
        let err = Term::from_value(Value::parse(b"[9999]").unwrap()).unwrap_err();
        assert!(matches!(err, QueryError::UnknownOperator(9999)));
    }

    #[test]
    fn test_nested_error_context() {
        // The DB argument is itself a term array with a bad inner shape.
        let err = Term::from_value(Value::parse(br#"[15,[[14,[[]]],"users"]]"#).unwrap())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "TABLE arg[0] -> DB arg[0] -> expected 1 to 3 entries in term array, but got 0"
        );
    }

    #[test]
    fn test_optarg_error_context() {
        let err =
            Term::from_value(Value::parse(br#"[56,[],{"durability":[9999]}]"#).unwrap())
                .unwrap_err();
        assert_eq!(
            err.to_string(),
            "INSERT optArg[\"durability\"] -> unrecognized term type code: 9999"
        );
    }

    #[test]
    fn test_object_entry_error_context() {
        let err = Term::from_value(Value::parse(br#"{"bad":[9999]}"#).unwrap()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "obj[\"bad\"] -> unrecognized term type code: 9999"
        );
    }

    #[test]
    fn test_validate_rejects_unsupported() {
        let js = term(r#"[11,["return 1"]]"#);
        let err = js.validate().unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedTerm("JAVASCRIPT")));

        // Nested inside another term it is still caught, with context.
        let nested = term(r#"[38,[[15],[11,["f"]]]]"#);
        let err = nested.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "MAP arg[1] -> term type JAVASCRIPT is not supported"
        );
    }

    #[test]
    fn test_validate_accepts_undeclared() {
        term(r#"[41,[[15]]]"#).validate().unwrap();
    }

    #[test]
    fn test_display_single_arg_inline() {
        let t = term(r#"[14,["db"]]"#);
        assert_eq!(t.to_string(), r#"(DB ["db"])"#);
    }

    #[test]
    fn test_display_multi_arg_multiline() {
        let t = term(r#"[15,[[14,["db"]],"users"]]"#);
        assert_eq!(
            t.to_string(),
            "(TABLE [\n  (DB [\"db\"])\n  \"users\"\n])"
        );
    }

    #[test]
    fn test_display_datum_values() {
        assert_eq!(term("null").to_string(), "null");
        assert_eq!(term("1").to_string(), "1");
        assert_eq!(term("\"hi\"").to_string(), "\"hi\"");
    }

    #[test]
    fn test_display_opt_args() {
        let t = term(r#"[56,[[15]],{"durability":"soft"}]"#);
        assert_eq!(
            t.to_string(),
            r#"(INSERT [(TABLE)] {"durability": "soft"})"#
        );
    }

    #[test]
    fn test_display_nested_indentation() {
        let t = term(r#"[17,[[24,[1,2]],3]]"#);
        assert_eq!(
            t.to_string(),
            "(EQ [\n  (ADD [\n    1\n    2\n  ])\n  3\n])"
        );
    }
}
