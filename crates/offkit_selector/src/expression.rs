//! Selector parsing and evaluation.

use crate::collation::values_equal;
use crate::error::{SelectorError, SelectorResult};
use crate::path::field_value;
use regex::Regex;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Longest `$regex` pattern accepted.
const MAX_REGEX_LEN: usize = 1000;

/// A comparison operator of the selector language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `$eq`
    Eq,
    /// `$ne`
    Ne,
    /// `$lt`
    Lt,
    /// `$lte`
    Lte,
    /// `$gt`
    Gt,
    /// `$gte`
    Gte,
    /// `$in`
    In,
    /// `$exists`
    Exists,
    /// `$regex`
    Regex,
}

impl Operator {
    /// Parses an operator token such as `"$gte"`.
    pub fn parse(token: &str) -> SelectorResult<Self> {
        match token {
            "$eq" => Ok(Operator::Eq),
            "$ne" => Ok(Operator::Ne),
            "$lt" => Ok(Operator::Lt),
            "$lte" => Ok(Operator::Lte),
            "$gt" => Ok(Operator::Gt),
            "$gte" => Ok(Operator::Gte),
            "$in" => Ok(Operator::In),
            "$exists" => Ok(Operator::Exists),
            "$regex" => Ok(Operator::Regex),
            other => Err(SelectorError::UnknownOperator(other.to_string())),
        }
    }

    /// Returns the operator token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::In => "$in",
            Operator::Exists => "$exists",
            Operator::Regex => "$regex",
        }
    }
}

/// A leaf condition: `{ attribute, operator, operand }`.
#[derive(Debug, Clone)]
pub struct Condition {
    attribute: String,
    operator: Operator,
    operand: Value,
    pattern: Option<Regex>,
}

impl Condition {
    /// Compiles a condition, validating the operand for the operator.
    pub fn new(
        attribute: impl Into<String>,
        operator: Operator,
        operand: Value,
    ) -> SelectorResult<Self> {
        let mut pattern = None;
        match operator {
            Operator::In if !operand.is_array() => {
                return Err(SelectorError::invalid_operand(
                    operator.as_str(),
                    "expected an array",
                ));
            }
            Operator::Exists if !operand.is_boolean() => {
                return Err(SelectorError::invalid_operand(
                    operator.as_str(),
                    "expected a boolean",
                ));
            }
            Operator::Regex => {
                let source = operand.as_str().ok_or_else(|| {
                    SelectorError::invalid_operand(operator.as_str(), "expected a string")
                })?;
                pattern = Some(compile_regex(source)?);
            }
            _ => {}
        }

        Ok(Self {
            attribute: attribute.into(),
            operator,
            operand,
            pattern,
        })
    }

    /// Returns the dotted attribute path.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Returns the operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns the operand.
    pub fn operand(&self) -> &Value {
        &self.operand
    }

    /// Evaluates this condition against a document.
    pub fn evaluate(&self, document: &Value) -> bool {
        let value = field_value(document, &self.attribute);
        match self.operator {
            Operator::Eq => is_equal(value, &self.operand),
            Operator::Ne => !is_equal(value, &self.operand),
            Operator::Lt => ordering(value, &self.operand).is_some_and(Ordering::is_lt),
            Operator::Lte => ordering(value, &self.operand).is_some_and(Ordering::is_le),
            Operator::Gt => ordering(value, &self.operand).is_some_and(Ordering::is_gt),
            Operator::Gte => ordering(value, &self.operand).is_some_and(Ordering::is_ge),
            Operator::In => {
                let choices = self.operand.as_array().map(Vec::as_slice).unwrap_or(&[]);
                match value {
                    Some(Value::Array(items)) => items
                        .iter()
                        .any(|item| choices.iter().any(|c| values_equal(item, c))),
                    Some(v) => choices.iter().any(|c| values_equal(v, c)),
                    None => false,
                }
            }
            Operator::Exists => value.is_some() == self.operand.as_bool().unwrap_or(true),
            Operator::Regex => match (value.and_then(Value::as_str), &self.pattern) {
                (Some(text), Some(re)) => re.is_match(text),
                _ => false,
            },
        }
    }
}

fn compile_regex(source: &str) -> SelectorResult<Regex> {
    if source.len() > MAX_REGEX_LEN {
        return Err(SelectorError::InvalidRegex {
            pattern: source.chars().take(32).collect(),
            message: format!("pattern too long (max {MAX_REGEX_LEN} chars)"),
        });
    }
    Regex::new(source).map_err(|e| SelectorError::InvalidRegex {
        pattern: source.to_string(),
        message: e.to_string(),
    })
}

/// Undefined equals only `null`.
fn is_equal(value: Option<&Value>, operand: &Value) -> bool {
    match value {
        Some(v) => values_equal(v, operand),
        None => operand.is_null(),
    }
}

/// Ordering for `$lt`/`$lte`/`$gt`/`$gte`; `None` means "not comparable".
///
/// An undefined field is never comparable. A `null` facing a string is
/// treated as the empty string.
fn ordering(value: Option<&Value>, operand: &Value) -> Option<Ordering> {
    match (value?, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::String(a), Value::Null) => Some(a.as_str().cmp("")),
        (Value::Null, Value::String(b)) => Some("".cmp(b.as_str())),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// A compiled selector expression tree.
#[derive(Debug, Clone)]
pub enum Expression {
    /// All sub-expressions must hold. An empty list holds.
    And(Vec<Expression>),
    /// At least one sub-expression must hold. An empty list does not hold.
    Or(Vec<Expression>),
    /// A leaf condition.
    Condition(Condition),
}

impl Expression {
    /// Evaluates the tree, short-circuiting `$and` on the first `false` and
    /// `$or` on the first `true`.
    pub fn evaluate(&self, document: &Value) -> bool {
        match self {
            Expression::And(terms) => terms.iter().all(|t| t.evaluate(document)),
            Expression::Or(terms) => terms.iter().any(|t| t.evaluate(document)),
            Expression::Condition(condition) => condition.evaluate(document),
        }
    }

    fn parse(value: &Value) -> SelectorResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| SelectorError::malformed("selector node must be an object"))?;

        let mut terms = Vec::with_capacity(map.len());

        // Combinators first, then fields.
        for (key, operand) in map.iter().filter(|(k, _)| k.starts_with('$')) {
            let subterms = match key.as_str() {
                "$and" | "$or" => operand
                    .as_array()
                    .ok_or_else(|| {
                        SelectorError::invalid_operand(key.as_str(), "expected an array")
                    })?
                    .iter()
                    .map(Expression::parse)
                    .collect::<SelectorResult<Vec<_>>>()?,
                other => return Err(SelectorError::UnknownOperator(other.to_string())),
            };
            terms.push(if key == "$and" {
                Expression::And(subterms)
            } else {
                Expression::Or(subterms)
            });
        }

        for (attribute, operand) in map.iter().filter(|(k, _)| !k.starts_with('$')) {
            Self::parse_field(attribute, operand, &mut terms)?;
        }

        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expression::And(terms)
        })
    }

    fn parse_field(
        attribute: &str,
        operand: &Value,
        terms: &mut Vec<Expression>,
    ) -> SelectorResult<()> {
        match operand {
            Value::Object(ops) if is_operator_map(ops) => {
                for (token, value) in ops {
                    if !token.starts_with('$') {
                        return Err(SelectorError::malformed(format!(
                            "cannot mix operators and fields under {attribute:?}"
                        )));
                    }
                    let operator = Operator::parse(token)?;
                    terms.push(Expression::Condition(Condition::new(
                        attribute,
                        operator,
                        value.clone(),
                    )?));
                }
            }
            other => terms.push(Expression::Condition(Condition::new(
                attribute,
                Operator::Eq,
                other.clone(),
            )?)),
        }
        Ok(())
    }
}

fn is_operator_map(map: &Map<String, Value>) -> bool {
    map.keys().any(|k| k.starts_with('$'))
}

/// A compiled selector.
///
/// Selectors are immutable and can be shared across threads and reused for
/// any number of documents.
#[derive(Debug, Clone)]
pub struct Selector {
    root: Expression,
}

impl Selector {
    /// Compiles a JSON selector.
    ///
    /// # Errors
    ///
    /// Returns an error on unknown operators, malformed nodes, operands of
    /// the wrong shape, or invalid regex patterns.
    pub fn parse(selector: &Value) -> SelectorResult<Self> {
        Ok(Self {
            root: Expression::parse(selector)?,
        })
    }

    /// Returns the root of the expression tree.
    pub fn expression(&self) -> &Expression {
        &self.root
    }

    /// Returns true if the document satisfies the selector.
    pub fn matches(&self, document: &Value) -> bool {
        self.root.evaluate(document)
    }
}

/// Compiles `selector` and evaluates it against `document`.
pub fn satisfy(selector: &Value, document: &Value) -> SelectorResult<bool> {
    Ok(Selector::parse(selector)?.matches(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "key": "item-1",
            "metadata": {"url": "https://api.test/items?page=1", "method": "GET"},
            "value": {"name": "Widget", "price": 12.5, "tags": ["blue", "sale"], "note": null}
        })
    }

    #[test]
    fn implicit_equality() {
        assert!(satisfy(&json!({"metadata.method": "GET"}), &doc()).unwrap());
        assert!(!satisfy(&json!({"metadata.method": "PUT"}), &doc()).unwrap());
    }

    #[test]
    fn multiple_fields_collapse_into_and() {
        let selector = Selector::parse(&json!({"key": "item-1", "value.price": {"$gt": 10}})).unwrap();
        assert!(matches!(selector.expression(), Expression::And(terms) if terms.len() == 2));
        assert!(selector.matches(&doc()));

        let selector = Selector::parse(&json!({"value.price": {"$gt": 10, "$lt": 12}})).unwrap();
        assert!(!selector.matches(&doc()));
    }

    #[test]
    fn combinators() {
        let or = json!({"$or": [{"key": "nope"}, {"value.name": "Widget"}]});
        assert!(satisfy(&or, &doc()).unwrap());

        let and = json!({"$and": [{"key": "item-1"}, {"value.name": "Gadget"}]});
        assert!(!satisfy(&and, &doc()).unwrap());

        assert!(!satisfy(&json!({"$or": []}), &doc()).unwrap());
        assert!(satisfy(&json!({}), &doc()).unwrap());
    }

    #[test]
    fn comparisons_against_undefined_are_false() {
        for op in ["$lt", "$lte", "$gt", "$gte"] {
            let selector = json!({"value.missing": {op: 5}});
            assert!(!satisfy(&selector, &doc()).unwrap(), "{op}");
        }
    }

    #[test]
    fn undefined_matches_exists_false_and_eq_null() {
        assert!(satisfy(&json!({"value.missing": {"$exists": false}}), &doc()).unwrap());
        assert!(!satisfy(&json!({"value.missing": {"$exists": true}}), &doc()).unwrap());
        assert!(satisfy(&json!({"value.missing": {"$eq": null}}), &doc()).unwrap());
        assert!(satisfy(&json!({"value.note": {"$exists": true}}), &doc()).unwrap());
    }

    #[test]
    fn null_faces_string_as_empty() {
        assert!(satisfy(&json!({"value.name": {"$gt": null}}), &doc()).unwrap());
        assert!(satisfy(&json!({"value.note": {"$lt": "a"}}), &doc()).unwrap());
        assert!(!satisfy(&json!({"value.note": {"$gt": "a"}}), &doc()).unwrap());
    }

    #[test]
    fn in_operator() {
        assert!(satisfy(&json!({"value.name": {"$in": ["Gadget", "Widget"]}}), &doc()).unwrap());
        assert!(satisfy(&json!({"value.tags": {"$in": ["sale"]}}), &doc()).unwrap());
        assert!(!satisfy(&json!({"value.tags": {"$in": ["red"]}}), &doc()).unwrap());
    }

    #[test]
    fn regex_operator() {
        assert!(satisfy(&json!({"metadata.url": {"$regex": "^https://api\\.test/items"}}), &doc()).unwrap());
        assert!(!satisfy(&json!({"value.price": {"$regex": "12"}}), &doc()).unwrap());
    }

    #[test]
    fn ne_operator() {
        assert!(satisfy(&json!({"value.name": {"$ne": "Gadget"}}), &doc()).unwrap());
        assert!(satisfy(&json!({"value.missing": {"$ne": 3}}), &doc()).unwrap());
        assert!(!satisfy(&json!({"value.missing": {"$ne": null}}), &doc()).unwrap());
    }

    #[test]
    fn unknown_operator_fails_to_parse() {
        let err = Selector::parse(&json!({"a": {"$near": 1}})).unwrap_err();
        assert_eq!(err, SelectorError::UnknownOperator("$near".into()));

        let err = Selector::parse(&json!({"$nor": []})).unwrap_err();
        assert_eq!(err, SelectorError::UnknownOperator("$nor".into()));
    }

    #[test]
    fn malformed_operands_fail_to_parse() {
        assert!(Selector::parse(&json!({"a": {"$in": 3}})).is_err());
        assert!(Selector::parse(&json!({"a": {"$exists": "yes"}})).is_err());
        assert!(Selector::parse(&json!({"a": {"$regex": "("}})).is_err());
        assert!(Selector::parse(&json!({"$and": {"a": 1}})).is_err());
        assert!(Selector::parse(&json!({"a": {"$eq": 1, "b": 2}})).is_err());
        assert!(Selector::parse(&json!([1, 2])).is_err());
    }

    #[test]
    fn nested_object_without_operators_is_equality() {
        let doc = json!({"a": {"b": 1}});
        assert!(satisfy(&json!({"a": {"b": 1.0}}), &doc).unwrap());
        assert!(!satisfy(&json!({"a": {"b": 2}}), &doc).unwrap());
    }
}
