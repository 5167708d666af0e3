//! Backend-neutral repository queries.
//!
//! A [`Query`] is a conjunction of field conditions over top-level document
//! fields, an optional sort and a page window. Backends translate it; the
//! in-memory backend evaluates it directly with [`Filter::matches`] and
//! [`Query::apply`].

use std::cmp::Ordering;

use serde_json::Value;

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// The field's value is one of the values of an array.
    In,
    /// The field is an array that contains the value.
    Contains,
}

/// One condition on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Op,
    pub value: Value,
}

impl Condition {
    /// Evaluate this condition against a document.
    ///
    /// A missing field behaves like `null`.
    pub fn matches(&self, document: &Value) -> bool {
        let actual = document.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            Op::Eq => actual == &self.value,
            Op::Ne => actual != &self.value,
            Op::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            Op::Gte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Op::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            Op::Lte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Op::In => self
                .value
                .as_array()
                .is_some_and(|candidates| candidates.contains(actual)),
            Op::Contains => actual
                .as_array()
                .is_some_and(|items| items.contains(&self.value)),
        }
    }
}

/// Conjunction of conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition.
    pub fn and(mut self, field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(field, Op::Eq, value)
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(field, Op::Ne, value)
    }

    pub fn contains(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(field, Op::Contains, value)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// True when every condition holds for the document.
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(document))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Sort on one top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filter, sort and page window for `Repository::query`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Evaluate the query over an in-memory sequence of documents.
    ///
    /// Input order is kept for equal sort keys; documents missing the sort
    /// field sort last.
    pub fn apply(&self, documents: impl IntoIterator<Item = Value>) -> Vec<Value> {
        let mut selected: Vec<Value> = documents
            .into_iter()
            .filter(|doc| self.filter.matches(doc))
            .collect();

        if let Some(order) = &self.order_by {
            selected.sort_by(|a, b| {
                let ordering = match (a.get(&order.field), b.get(&order.field)) {
                    (Some(x), Some(y)) => sort_order(x, y),
                    (Some(_), None) => return Ordering::Less,
                    (None, Some(_)) => return Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let page = selected.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }
}

/// Order two JSON scalars of the same kind. Mixed kinds are incomparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order over JSON values for sorting, following jsonb's ordering
/// across kinds: null < string < number < bool < array < object.
fn sort_order(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::String(_) => 1,
            Value::Number(_) => 2,
            Value::Bool(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => x.to_string().cmp(&y.to_string()),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}
