use std::collections::HashMap;

use axum::http::StatusCode;
use bootcamp_api::{
    models::{BOOTCAMP_FIELDS, REVIEW_FIELDS},
    query::{
        Comparator, Filter, FilterValue, ListEnvelope, ListQuery, ListResult, push_order_and_page,
        push_where,
    },
};
use serde_json::json;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn build(pairs: &[(&str, &str)]) -> ListQuery {
    ListQuery::build(&params(pairs), &BOOTCAMP_FIELDS, Vec::new()).unwrap()
}

fn build_err(pairs: &[(&str, &str)]) -> bootcamp_api::ApiError {
    ListQuery::build(&params(pairs), &BOOTCAMP_FIELDS, Vec::new()).unwrap_err()
}

// --- Plan construction ---

#[test]
fn test_reserved_params_never_become_filters() {
    let query = build(&[
        ("select", "name"),
        ("sort", "name"),
        ("page", "2"),
        ("limit", "10"),
    ]);
    assert!(query.filters.is_empty());
}

#[test]
fn test_comparator_token_maps_field_to_column() {
    let query = build(&[("averagecost[gt]", "1000")]);
    assert_eq!(query.filters.len(), 1);
    let filter = &query.filters[0];
    // Public name 'averagecost' resolves to the storage column.
    assert_eq!(filter.field, "average_cost");
    assert_eq!(filter.comparator, Comparator::Gt);
    assert_eq!(filter.value, FilterValue::Number(1000.0));
}

#[test]
fn test_bare_parameter_is_equality() {
    let query = build(&[("housing", "true")]);
    assert_eq!(query.filters[0].comparator, Comparator::Eq);
    assert_eq!(query.filters[0].value, FilterValue::Bool(true));
}

#[test]
fn test_in_comparator_parses_list() {
    let query = build(&[("name[in]", "Devworks, Codemasters")]);
    assert_eq!(
        query.filters[0].value,
        FilterValue::TextList(vec!["Devworks".to_string(), "Codemasters".to_string()])
    );
}

#[test]
fn test_unknown_comparator_rejected() {
    let err = build_err(&[("averagecost[gtt]", "1000")]);
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.message(), "Unrecognized filter operator 'gtt'");
}

#[test]
fn test_unknown_filter_field_rejected() {
    let err = build_err(&[("owner_id", "abc")]);
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.message(), "Cannot filter on unknown field 'owner_id'");
}

#[test]
fn test_non_numeric_value_for_number_field_rejected() {
    let err = build_err(&[("averagecost[gt]", "lots")]);
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(err.message().contains("must be a number"));
}

#[test]
fn test_unknown_sort_and_select_fields_rejected() {
    let err = build_err(&[("sort", "-secret")]);
    assert_eq!(err.message(), "Cannot sort on unknown field 'secret'");

    let err = build_err(&[("select", "name,password")]);
    assert_eq!(err.message(), "Cannot select unknown field 'password'");
}

#[test]
fn test_sort_prefix_sets_direction() {
    let query = build(&[("sort", "-name,averagecost")]);
    assert_eq!(query.sort.len(), 2);
    assert_eq!(query.sort[0].field, "name");
    assert_eq!(
        query.sort[0].direction,
        bootcamp_api::query::Direction::Desc
    );
    assert_eq!(query.sort[1].field, "average_cost");
    assert_eq!(query.sort[1].direction, bootcamp_api::query::Direction::Asc);
}

#[test]
fn test_populate_validated_against_relations() {
    let query =
        ListQuery::build(&params(&[("populate", "bootcamp")]), &REVIEW_FIELDS, Vec::new()).unwrap();
    assert!(query.wants("bootcamp"));

    let err = ListQuery::build(&params(&[("populate", "owner")]), &REVIEW_FIELDS, Vec::new())
        .unwrap_err();
    assert_eq!(err.message(), "Cannot populate unknown relation 'owner'");
}

#[test]
fn test_pagination_defaults_and_bounds() {
    let query = build(&[]);
    assert_eq!(query.page, 1);
    assert_eq!(query.limit, 25);

    assert_eq!(
        build_err(&[("page", "0")]).message(),
        "Parameter 'page' must be a positive integer"
    );
    assert_eq!(
        build_err(&[("limit", "-3")]).message(),
        "Parameter 'limit' must be a positive integer"
    );
    assert_eq!(
        build_err(&[("limit", "101")]).message(),
        "Parameter 'limit' must not exceed 100"
    );
}

#[test]
fn test_base_filters_precede_user_filters() {
    let bootcamp_id = Uuid::from_u128(9);
    let base = vec![Filter::eq_uuid("bootcamp_id", bootcamp_id)];
    let query =
        ListQuery::build(&params(&[("rating[gte]", "8")]), &REVIEW_FIELDS, base).unwrap();
    assert_eq!(query.filters[0].field, "bootcamp_id");
    assert_eq!(query.filters[0].value, FilterValue::Uuid(bootcamp_id));
    assert_eq!(query.filters[1].field, "rating");
}

#[test]
fn test_identical_params_build_identical_plans() {
    // HashMap iteration order varies; the built plan must not.
    let pairs = [
        ("averagecost[gt]", "1000"),
        ("housing", "true"),
        ("name[in]", "a,b"),
        ("sort", "-name"),
    ];
    let a = build(&pairs);
    let b = build(&pairs);
    assert_eq!(a.filters, b.filters);
    assert_eq!(a.sort, b.sort);
    assert_eq!(a.page, b.page);
    assert_eq!(a.limit, b.limit);
}

// --- SQL rendering ---

#[test]
fn test_rendered_sql_binds_values() {
    let query = build(&[
        ("averagecost[gt]", "1000"),
        ("sort", "-name"),
        ("page", "2"),
        ("limit", "5"),
    ]);

    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT * FROM bootcamps");
    push_where(&mut builder, &query.filters);
    push_order_and_page(&mut builder, &query);

    assert_eq!(
        builder.sql(),
        "SELECT * FROM bootcamps WHERE average_cost > $1 ORDER BY name DESC LIMIT $2 OFFSET $3"
    );
}

#[test]
fn test_rendered_sql_in_list_and_default_sort() {
    let query = build(&[("name[in]", "a,b")]);

    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT * FROM bootcamps");
    push_where(&mut builder, &query.filters);
    push_order_and_page(&mut builder, &query);

    assert_eq!(
        builder.sql(),
        "SELECT * FROM bootcamps WHERE name = ANY( $1) ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    );
}

// --- Pagination links ---

#[test]
fn test_offset_and_page_links() {
    let query = build(&[("page", "2"), ("limit", "5")]);
    assert_eq!(query.offset(), 5);

    // 12 total rows at 5 per page: pages 1..=3.
    let page2 = ListResult::<()> {
        items: vec![(); 5],
        total_count: 12,
        page: 2,
        limit: 5,
    };
    assert_eq!(page2.prev_page(), Some(1));
    assert_eq!(page2.next_page(), Some(3));

    let page3 = ListResult::<()> {
        items: vec![(); 2],
        total_count: 12,
        page: 3,
        limit: 5,
    };
    assert_eq!(page3.prev_page(), Some(2));
    assert_eq!(page3.next_page(), None);

    let page1 = ListResult::<()> {
        items: vec![(); 5],
        total_count: 12,
        page: 1,
        limit: 5,
    };
    assert_eq!(page1.prev_page(), None);
    assert_eq!(page1.next_page(), Some(2));
}

#[test]
fn test_huge_page_number_saturates_instead_of_overflowing() {
    // page has a minimum but no maximum; the largest representable value must
    // produce an empty page, not an arithmetic failure.
    let query = build(&[("page", "9223372036854775807"), ("limit", "25")]);
    assert_eq!(query.page, i64::MAX);
    assert_eq!(query.offset(), i64::MAX);

    let result = ListResult::<()> {
        items: vec![],
        total_count: 12,
        page: i64::MAX,
        limit: 25,
    };
    assert_eq!(result.next_page(), None);
    assert_eq!(result.prev_page(), Some(i64::MAX - 1));
}

#[test]
fn test_exact_final_page_has_no_next_link() {
    let result = ListResult::<()> {
        items: vec![(); 5],
        total_count: 10,
        page: 2,
        limit: 5,
    };
    assert_eq!(result.next_page(), None);
}

// --- Envelope rendering ---

#[test]
fn test_envelope_omits_pagination_on_single_page() {
    let query = build(&[]);
    let result = ListResult {
        items: vec![json!({"id": "1", "name": "Devworks"})],
        total_count: 1,
        page: 1,
        limit: 25,
    };

    let envelope = ListEnvelope::new(result, &query).unwrap();
    assert!(envelope.success);
    assert_eq!(envelope.count, 1);
    assert!(envelope.pagination.is_none());

    let rendered = serde_json::to_value(&envelope).unwrap();
    assert!(rendered.get("pagination").is_none());
}

#[test]
fn test_envelope_select_projection_keeps_id() {
    let query = build(&[("select", "name,housing")]);
    let result = ListResult {
        items: vec![json!({
            "id": "abc",
            "name": "Devworks",
            "description": "hidden",
            "housing": true
        })],
        total_count: 1,
        page: 1,
        limit: 25,
    };

    let envelope = ListEnvelope::new(result, &query).unwrap();
    let item = envelope.data[0].as_object().unwrap();
    assert_eq!(item.len(), 3);
    assert_eq!(item["id"], "abc");
    assert_eq!(item["name"], "Devworks");
    assert_eq!(item["housing"], true);
    assert!(!item.contains_key("description"));
}

#[test]
fn test_envelope_select_keeps_populated_relation() {
    let raw = params(&[("select", "title"), ("populate", "bootcamp")]);
    let query = ListQuery::build(&raw, &REVIEW_FIELDS, Vec::new()).unwrap();
    let result = ListResult {
        items: vec![json!({
            "id": "abc",
            "title": "Learned loads",
            "rating": 8,
            "bootcamp": {"id": "def", "name": "Devworks", "description": "d"}
        })],
        total_count: 1,
        page: 1,
        limit: 25,
    };

    let envelope = ListEnvelope::new(result, &query).unwrap();
    let item = envelope.data[0].as_object().unwrap();
    assert_eq!(item.len(), 3);
    assert_eq!(item["title"], "Learned loads");
    // Narrowing columns must not strip the embedded relation.
    assert_eq!(item["bootcamp"]["name"], "Devworks");
    assert!(!item.contains_key("rating"));
}

#[test]
fn test_envelope_pagination_serialized_in_camel_case() {
    let query = build(&[("page", "2"), ("limit", "5")]);
    let result = ListResult {
        items: vec![json!({"id": "1"}); 5],
        total_count: 12,
        page: 2,
        limit: 5,
    };

    let envelope = ListEnvelope::new(result, &query).unwrap();
    let rendered = serde_json::to_value(&envelope).unwrap();
    assert_eq!(rendered["pagination"]["prevPage"], 1);
    assert_eq!(rendered["pagination"]["nextPage"], 3);
}
