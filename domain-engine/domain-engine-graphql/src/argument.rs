//! Field arguments: variable substitution and collection arguments.

use arcstr::ArcStr;
use domain_engine_core::{domain_error::DomainErrorKind, DomainResult};
use fnv::FnvHashMap;
use graphql_parser::query::{Type, Value as GqlValue, VariableDefinition};
use ontol_runtime::{
    query::{
        condition::{Comparison, Condition},
        order::{Direction, Nulls, OrderBy},
    },
    value::Value,
};
use serde_json::Value as JsonValue;

/// Variable values supplied by the caller, as in the `variables` member of a GraphQL request.
pub type Variables = serde_json::Map<String, JsonValue>;

/// The variables visible to one operation, with defaults applied.
pub(crate) struct VariableScope<'a> {
    values: FnvHashMap<&'a str, JsonValue>,
}

impl<'a> VariableScope<'a> {
    pub fn new(
        definitions: &[VariableDefinition<'a, &'a str>],
        variables: &Variables,
    ) -> DomainResult<Self> {
        let empty = Self {
            values: Default::default(),
        };
        let mut values: FnvHashMap<&'a str, JsonValue> = Default::default();

        for definition in definitions {
            let value = match (variables.get(definition.name), &definition.default_value) {
                (Some(value), _) => value.clone(),
                (None, Some(default)) => empty.resolve(default)?,
                (None, None) => {
                    if matches!(definition.var_type, Type::NonNullType(_)) {
                        return Err(
                            DomainErrorKind::UndefinedVariable(definition.name.to_string())
                                .into_error(),
                        );
                    }
                    JsonValue::Null
                }
            };
            values.insert(definition.name, value);
        }

        Ok(Self { values })
    }

    /// Convert an argument value to JSON, substituting variables.
    pub fn resolve(&self, value: &GqlValue<'a, &'a str>) -> DomainResult<JsonValue> {
        Ok(match value {
            GqlValue::Variable(name) => self
                .values
                .get(name)
                .cloned()
                .ok_or_else(|| DomainErrorKind::UndefinedVariable(name.to_string()).into_error())?,
            GqlValue::Int(number) => match number.as_i64() {
                Some(int) => JsonValue::from(int),
                None => return Err(compile_error("integer out of range")),
            },
            GqlValue::Float(float) => JsonValue::from(*float),
            GqlValue::String(string) => JsonValue::String(string.clone()),
            GqlValue::Boolean(bool) => JsonValue::Bool(*bool),
            GqlValue::Null => JsonValue::Null,
            GqlValue::Enum(name) => JsonValue::String(name.to_string()),
            GqlValue::List(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| self.resolve(item))
                    .collect::<DomainResult<_>>()?,
            ),
            GqlValue::Object(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(key, value)| Ok((key.to_string(), self.resolve(value)?)))
                    .collect::<DomainResult<_>>()?,
            ),
        })
    }
}

/// Arguments accepted by root collections and links.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct CollectionArgs {
    pub condition: Condition,
    pub order: Vec<OrderBy>,
    /// Maximum number of elements
    pub first: Option<usize>,
    /// Position of the last element already seen, elements continue after it
    pub after: Option<usize>,
}

impl CollectionArgs {
    pub(crate) fn parse<'a>(
        arguments: &[(&'a str, GqlValue<'a, &'a str>)],
        scope: &VariableScope<'a>,
    ) -> DomainResult<Self> {
        let mut args = Self::default();
        let mut seen: Vec<&str> = vec![];

        for (name, value) in arguments {
            if seen.contains(name) {
                return Err(compile_error(format!("argument `{name}` given more than once")));
            }
            seen.push(*name);

            let value = scope.resolve(value)?;

            match *name {
                "filter" => {
                    if !value.is_null() {
                        args.condition = parse_condition(&value)?;
                    }
                }
                "order" => args.order = parse_order(&value)?,
                "first" => args.first = parse_first(&value)?,
                "after" => args.after = parse_cursor(&value)?,
                other => return Err(compile_error(format!("unknown argument `{other}`"))),
            }
        }

        Ok(args)
    }
}

fn compile_error(msg: impl Into<String>) -> domain_engine_core::DomainError {
    DomainErrorKind::BackendCompile(msg.into()).into_error()
}

fn parse_condition(json: &JsonValue) -> DomainResult<Condition> {
    let JsonValue::Object(entries) = json else {
        return Err(compile_error(format!("filter must be an object, got `{json}`")));
    };

    let mut conditions = vec![];

    for (key, value) in entries {
        match key.as_str() {
            "and" => conditions.push(Condition::All(parse_condition_list(value)?)),
            "or" => conditions.push(Condition::Any(parse_condition_list(value)?)),
            "not" => conditions.push(Condition::Not(Box::new(parse_condition(value)?))),
            field => {
                let JsonValue::Object(operators) = value else {
                    return Err(compile_error(format!(
                        "filter on `{field}` must be an object of operators"
                    )));
                };
                let field: ArcStr = field.into();

                for (operator, operand) in operators {
                    if operator == "exists" {
                        let JsonValue::Bool(exists) = operand else {
                            return Err(compile_error("`exists` takes a boolean"));
                        };
                        conditions.push(Condition::Exists(field.clone(), *exists));
                    } else {
                        let comparison = Comparison::from_name(operator).ok_or_else(|| {
                            compile_error(format!("unknown filter operator `{operator}`"))
                        })?;
                        conditions.push(Condition::Compare(
                            field.clone(),
                            comparison,
                            json_literal(operand)?,
                        ));
                    }
                }
            }
        }
    }

    if conditions.len() == 1 {
        Ok(conditions.remove(0))
    } else {
        Ok(Condition::All(conditions))
    }
}

fn parse_condition_list(json: &JsonValue) -> DomainResult<Vec<Condition>> {
    match json {
        JsonValue::Array(items) => items.iter().map(parse_condition).collect(),
        // a single object is accepted where a list is expected, as for GraphQL input coercion
        JsonValue::Object(_) => Ok(vec![parse_condition(json)?]),
        _ => Err(compile_error("`and`/`or` take a list of filters")),
    }
}

fn json_literal(json: &JsonValue) -> DomainResult<Value> {
    match json {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(bool) => Ok(Value::Boolean(*bool)),
        JsonValue::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(int), _) => Ok(Value::I64(int)),
            (None, Some(float)) => Ok(Value::F64(float)),
            _ => Err(compile_error(format!("unsupported number `{number}`"))),
        },
        JsonValue::String(string) => Ok(Value::text(string.as_str())),
        other => Err(compile_error(format!("`{other}` is not a scalar literal"))),
    }
}

/// `order: {field: {dir: ASC, nulls: SMALLEST}}`.
///
/// Several keys of one object apply in name order,
/// a list of objects gives explicit precedence.
fn parse_order(json: &JsonValue) -> DomainResult<Vec<OrderBy>> {
    let mut output = vec![];

    match json {
        JsonValue::Null => {}
        JsonValue::Array(items) => {
            for item in items {
                output.extend(parse_order(item)?);
            }
        }
        JsonValue::Object(entries) => {
            for (field, sort_key) in entries {
                let mut order_by = OrderBy::new(field.as_str(), Direction::Ascending);

                match sort_key {
                    JsonValue::Object(sort_key) => {
                        for (key, value) in sort_key {
                            match (key.as_str(), value.as_str()) {
                                ("dir", Some("ASC")) => order_by.direction = Direction::Ascending,
                                ("dir", Some("DESC")) => {
                                    order_by.direction = Direction::Descending
                                }
                                ("nulls", Some("SMALLEST")) => order_by.nulls = Nulls::Smallest,
                                ("nulls", Some("BIGGEST")) => order_by.nulls = Nulls::Biggest,
                                _ => {
                                    return Err(compile_error(format!(
                                        "invalid order option `{key}: {value}`"
                                    )))
                                }
                            }
                        }
                    }
                    _ => {
                        return Err(compile_error(format!(
                            "order on `{field}` must be an object"
                        )))
                    }
                }

                output.push(order_by);
            }
        }
        other => return Err(compile_error(format!("invalid order `{other}`"))),
    }

    Ok(output)
}

fn parse_first(json: &JsonValue) -> DomainResult<Option<usize>> {
    match json {
        JsonValue::Null => Ok(None),
        JsonValue::Number(number) => match number.as_u64() {
            Some(first) => Ok(Some(first as usize)),
            None => Err(compile_error(format!(
                "`first` must be a non-negative integer, got `{number}`"
            ))),
        },
        other => Err(compile_error(format!("`first` must be an integer, got `{other}`"))),
    }
}

fn parse_cursor(json: &JsonValue) -> DomainResult<Option<usize>> {
    match json {
        JsonValue::Null => Ok(None),
        JsonValue::String(cursor) => cursor
            .parse::<usize>()
            .map(Some)
            .map_err(|_| compile_error(format!("malformed cursor `{cursor}`"))),
        other => Err(compile_error(format!("`after` must be a string, got `{other}`"))),
    }
}
