use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    config::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT},
    error::{ApiError, ApiResult},
};

/// Generic List Pipeline
///
/// Turns the raw query string of a collection endpoint into a validated,
/// typed query plan ([`ListQuery`]) and renders the executed plan
/// ([`ListResult`]) into the uniform collection envelope. The repository
/// layer executes the plan with the `QueryBuilder` helpers at the bottom of
/// this module, so filtering, sorting, field selection, and pagination behave
/// identically for every resource.
///
/// Field names are never taken from the request verbatim. Each resource
/// declares a [`FieldPolicy`] allow-list with the value type of every
/// filterable/sortable/selectable field; anything outside the policy is
/// rejected with a 400 before a query is built.

// Pipeline directives, stripped from the parameter set before filters are
// constructed.
const RESERVED_PARAMS: [&str; 5] = ["select", "sort", "page", "limit", "populate"];

/// The value type a policy declares for a field. Drives both parse-time
/// validation and the bind type used when the plan is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Bool,
}

/// A single allow-listed field: the name exposed on the API, the column it
/// maps to, and its value type. Exposed names and storage columns are kept
/// separate so the query string never names internal columns directly.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

/// FieldPolicy
///
/// Per-resource allow-list: which fields may appear in filters, `sort`, and
/// `select`, and which relation names `populate` may request. Declared as
/// consts next to each model.
#[derive(Debug, Clone, Copy)]
pub struct FieldPolicy {
    pub fields: &'static [FieldDef],
    pub relations: &'static [&'static str],
}

impl FieldPolicy {
    fn lookup(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Comparator
///
/// The enumerated comparator tokens accepted in filter parameters, e.g.
/// `averagecost[gt]=1000`. A parameter without a token is an equality match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl Comparator {
    fn parse(token: &str) -> ApiResult<Self> {
        match token {
            "gt" => Ok(Comparator::Gt),
            "gte" => Ok(Comparator::Gte),
            "lt" => Ok(Comparator::Lt),
            "lte" => Ok(Comparator::Lte),
            "in" => Ok(Comparator::In),
            other => Err(ApiError::invalid(format!(
                "Unrecognized filter operator '{other}'"
            ))),
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
            // `in` renders as `field = ANY($n)` with a list bind.
            Comparator::In => "= ANY(",
        }
    }
}

/// A filter value, already parsed under the field's declared kind so the
/// executor can bind it with the correct Postgres type.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Only constructed internally, for base filters on foreign keys
    /// (e.g. the nested reviews-of-a-bootcamp listing).
    Uuid(Uuid),
    TextList(Vec<String>),
    NumberList(Vec<f64>),
}

/// One comparison in the query plan. Field names always originate from a
/// [`FieldPolicy`] or an internal base filter, never from raw input.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub comparator: Comparator,
    pub value: FilterValue,
}

impl Filter {
    /// Base filter pinning a foreign-key column to an id, injected by nested
    /// routes before user-supplied filters are parsed.
    pub fn eq_uuid(field: &str, id: Uuid) -> Self {
        Self {
            field: field.to_string(),
            comparator: Comparator::Eq,
            value: FilterValue::Uuid(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

/// ListQuery
///
/// The request-scoped query plan for one collection listing: validated
/// filters, ordered sort keys, the selected field set, pagination window, and
/// relation hints. Built once per request and handed to the repository.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortKey>,
    pub select: Option<Vec<String>>,
    pub page: i64,
    pub limit: i64,
    pub populate: Vec<String>,
}

impl ListQuery {
    /// build
    ///
    /// Constructs the plan from raw query parameters, applying the pipeline
    /// rules in fixed order: reserved directives are stripped, remaining keys
    /// become policy-validated filters (with optional `[gt|gte|lt|lte|in]`
    /// comparators), then `select`, `sort`, `page`/`limit`, and `populate`
    /// directives are parsed. Every validation failure is a 400 raised before
    /// any query executes.
    pub fn build(
        raw: &HashMap<String, String>,
        policy: &FieldPolicy,
        base_filters: Vec<Filter>,
    ) -> ApiResult<Self> {
        let mut filters = base_filters;

        // Stable plan text regardless of query-string ordering.
        let mut filter_params: Vec<(&String, &String)> = raw
            .iter()
            .filter(|(key, _)| {
                let field = key.split('[').next().unwrap_or(key);
                !RESERVED_PARAMS.contains(&field)
            })
            .collect();
        filter_params.sort_by_key(|(key, _)| key.as_str());

        for (key, value) in filter_params {
            filters.push(parse_filter(key, value, policy)?);
        }

        let select = match raw.get("select") {
            Some(spec) => Some(parse_select(spec, policy)?),
            None => None,
        };

        let sort = match raw.get("sort") {
            Some(spec) => parse_sort(spec, policy)?,
            None => Vec::new(),
        };

        let page = parse_positive(raw.get("page"), "page", 1)?;
        let limit = parse_positive(raw.get("limit"), "limit", DEFAULT_PAGE_LIMIT)?;
        if limit > MAX_PAGE_LIMIT {
            return Err(ApiError::invalid(format!(
                "Parameter 'limit' must not exceed {MAX_PAGE_LIMIT}"
            )));
        }

        let populate = match raw.get("populate") {
            Some(spec) => parse_populate(spec, policy)?,
            None => Vec::new(),
        };

        Ok(Self {
            filters,
            sort,
            select,
            page,
            limit,
            populate,
        })
    }

    /// Zero-based row offset of the requested page. Saturates rather than
    /// overflowing: `page` has no upper bound, and a page far past the end of
    /// the data is an empty page, not a failure.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Whether `populate` requested the given relation.
    pub fn wants(&self, relation: &str) -> bool {
        self.populate.iter().any(|r| r == relation)
    }
}

fn parse_filter(key: &str, value: &str, policy: &FieldPolicy) -> ApiResult<Filter> {
    let (field, comparator) = match key.split_once('[') {
        Some((field, rest)) => {
            let token = rest.strip_suffix(']').ok_or_else(|| {
                ApiError::invalid(format!("Malformed filter parameter '{key}'"))
            })?;
            (field, Comparator::parse(token)?)
        }
        None => (key, Comparator::Eq),
    };

    let def = policy
        .lookup(field)
        .ok_or_else(|| ApiError::invalid(format!("Cannot filter on unknown field '{field}'")))?;

    let parsed = match (comparator, def.kind) {
        (Comparator::In, FieldKind::Text) => FilterValue::TextList(
            value.split(',').map(|v| v.trim().to_string()).collect(),
        ),
        (Comparator::In, FieldKind::Number) => {
            let numbers = value
                .split(',')
                .map(|v| v.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| {
                    ApiError::invalid(format!("Filter values for '{field}' must be numbers"))
                })?;
            FilterValue::NumberList(numbers)
        }
        (Comparator::In, FieldKind::Bool) => {
            return Err(ApiError::invalid(format!(
                "Operator 'in' is not supported on field '{field}'"
            )));
        }
        (_, FieldKind::Number) => FilterValue::Number(value.parse::<f64>().map_err(|_| {
            ApiError::invalid(format!("Filter value for '{field}' must be a number"))
        })?),
        (_, FieldKind::Bool) => match value {
            "true" => FilterValue::Bool(true),
            "false" => FilterValue::Bool(false),
            _ => {
                return Err(ApiError::invalid(format!(
                    "Filter value for '{field}' must be true or false"
                )));
            }
        },
        (_, FieldKind::Text) => FilterValue::Text(value.to_string()),
    };

    Ok(Filter {
        field: def.column.to_string(),
        comparator,
        value: parsed,
    })
}

fn parse_select(spec: &str, policy: &FieldPolicy) -> ApiResult<Vec<String>> {
    let mut fields = Vec::new();
    for name in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        // The identifier is always returned; listing it is a no-op.
        if name == "id" {
            continue;
        }
        if policy.lookup(name).is_none() {
            return Err(ApiError::invalid(format!(
                "Cannot select unknown field '{name}'"
            )));
        }
        if !fields.iter().any(|f| f == name) {
            fields.push(name.to_string());
        }
    }
    Ok(fields)
}

fn parse_sort(spec: &str, policy: &FieldPolicy) -> ApiResult<Vec<SortKey>> {
    let mut keys = Vec::new();
    for raw in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (field, direction) = match raw.strip_prefix('-') {
            Some(field) => (field, Direction::Desc),
            None => (raw, Direction::Asc),
        };
        let def = policy.lookup(field).ok_or_else(|| {
            ApiError::invalid(format!("Cannot sort on unknown field '{field}'"))
        })?;
        keys.push(SortKey {
            field: def.column.to_string(),
            direction,
        });
    }
    Ok(keys)
}

fn parse_populate(spec: &str, policy: &FieldPolicy) -> ApiResult<Vec<String>> {
    let mut relations = Vec::new();
    for name in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !policy.relations.contains(&name) {
            return Err(ApiError::invalid(format!(
                "Cannot populate unknown relation '{name}'"
            )));
        }
        relations.push(name.to_string());
    }
    Ok(relations)
}

fn parse_positive(raw: Option<&String>, name: &str, default: i64) -> ApiResult<i64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<i64>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(ApiError::invalid(format!(
            "Parameter '{name}' must be a positive integer"
        ))),
    }
}

// --- Plan execution helpers (used by the repository) ---

/// push_where
///
/// Appends the plan's filters as a parameterized WHERE clause. Field names
/// are interpolated directly; they are safe because they can only originate
/// from a `FieldPolicy` allow-list or an internal base filter. All values are
/// bound.
pub fn push_where(builder: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        builder.push(&filter.field);
        builder.push(" ");
        builder.push(filter.comparator.sql());
        builder.push(" ");
        match &filter.value {
            FilterValue::Text(v) => {
                builder.push_bind(v.clone());
            }
            FilterValue::Number(v) => {
                builder.push_bind(*v);
            }
            FilterValue::Bool(v) => {
                builder.push_bind(*v);
            }
            FilterValue::Uuid(v) => {
                builder.push_bind(*v);
            }
            FilterValue::TextList(v) => {
                builder.push_bind(v.clone());
                builder.push(")");
            }
            FilterValue::NumberList(v) => {
                builder.push_bind(v.clone());
                builder.push(")");
            }
        }
    }
}

/// push_order_and_page
///
/// Appends ORDER BY, LIMIT, and OFFSET. Without explicit sort keys the plan
/// falls back to `created_at DESC`, so pagination stays deterministic across
/// pages of an unchanged dataset.
pub fn push_order_and_page(builder: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
    builder.push(" ORDER BY ");
    if query.sort.is_empty() {
        builder.push("created_at DESC");
    } else {
        for (i, key) in query.sort.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(&key.field);
            builder.push(match key.direction {
                Direction::Asc => " ASC",
                Direction::Desc => " DESC",
            });
        }
    }
    builder.push(" LIMIT ");
    builder.push_bind(query.limit);
    builder.push(" OFFSET ");
    builder.push_bind(query.offset());
}

// --- Result envelope ---

/// ListResult
///
/// The executed plan: one page of items plus the pre-pagination total, from
/// which the prev/next page links are derived.
#[derive(Debug, Clone)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> ListResult<T> {
    pub fn prev_page(&self) -> Option<i64> {
        (self.page > 1).then(|| self.page - 1)
    }

    pub fn next_page(&self) -> Option<i64> {
        // Saturating for the same reason as `ListQuery::offset`: a huge page
        // number is past the data, so no next link exists.
        let skip = (self.page - 1).saturating_mul(self.limit);
        (skip.saturating_add(self.limit) < self.total_count).then(|| self.page + 1)
    }
}

/// Pagination links included in the collection envelope when a neighbouring
/// page exists.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PageLinks {
    #[serde(rename = "prevPage", skip_serializing_if = "Option::is_none")]
    pub prev_page: Option<i64>,
    #[serde(rename = "nextPage", skip_serializing_if = "Option::is_none")]
    pub next_page: Option<i64>,
}

/// ListEnvelope
///
/// The wire shape of every collection response:
///
/// ```json
/// { "success": true, "count": 2, "pagination": { "nextPage": 2 }, "data": [...] }
/// ```
///
/// `count` is the number of items in this page; `pagination` is omitted when
/// neither link exists. Field selection is applied here as a
/// serialization-time projection, keeping the persistence rows fully typed.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ListEnvelope {
    pub success: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageLinks>,
    pub data: Vec<Value>,
}

impl ListEnvelope {
    pub fn new<T: Serialize>(result: ListResult<T>, query: &ListQuery) -> ApiResult<Self> {
        let pagination = match (result.prev_page(), result.next_page()) {
            (None, None) => None,
            (prev_page, next_page) => Some(PageLinks {
                prev_page,
                next_page,
            }),
        };

        let mut data = Vec::with_capacity(result.items.len());
        for item in &result.items {
            let value = serde_json::to_value(item).map_err(|e| {
                tracing::error!(error = ?e, "failed to serialize list item");
                ApiError::new(
                    crate::error::ErrorKind::Unknown,
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Server Error",
                )
            })?;
            data.push(project_fields(value, query.select.as_deref(), &query.populate));
        }

        Ok(Self {
            success: true,
            count: data.len(),
            pagination,
            data,
        })
    }
}

/// Restricts a serialized item to the selected fields plus the identifier
/// and any populated relations, so `select` narrows columns without undoing a
/// `populate` directive. With no `select` directive the item passes through
/// untouched.
fn project_fields(value: Value, select: Option<&[String]>, populate: &[String]) -> Value {
    let Some(select) = select else {
        return value;
    };
    let Value::Object(map) = value else {
        return value;
    };

    let mut projected = serde_json::Map::new();
    if let Some(id) = map.get("id") {
        projected.insert("id".to_string(), id.clone());
    }
    for field in select {
        if let Some(v) = map.get(field) {
            projected.insert(field.clone(), v.clone());
        }
    }
    for relation in populate {
        if let Some(v) = map.get(relation) {
            projected.insert(relation.clone(), v.clone());
        }
    }
    Value::Object(projected)
}
