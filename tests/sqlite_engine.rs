//! 在内存 SQLite 上执行渲染出的 SQL，检查跨方言函数的实际语义。

use pretty_assertions::assert_eq;
use rusqlite::Connection;
use rusqlite::types::Value;
use sqlexpr::{ConditionBuilder, DateUnit, Expr, Flavor, QueryContext, SqlValue};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn to_sqlite(v: SqlValue) -> Value {
    match v {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Integer(i64::from(b)),
        SqlValue::I64(i) => Value::Integer(i),
        SqlValue::U64(u) => Value::Integer(u as i64),
        SqlValue::F64(f) => Value::Real(f),
        SqlValue::String(s) => Value::Text(s.into_owned()),
        SqlValue::Bytes(b) => Value::Blob(b),
        SqlValue::Json(j) => Value::Text(j.to_string()),
        SqlValue::Timestamp(t) => Value::Text(
            t.format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
        ),
    }
}

fn ctx() -> QueryContext {
    QueryContext::new(Flavor::SQLite)
}

/// `SELECT <expr>` 并取出唯一的值。
fn scalar(conn: &Connection, expr: Expr) -> Value {
    let (sql, values) = expr.to_sql();
    let params: Vec<Value> = values.into_iter().map(to_sqlite).collect();
    conn.query_row(
        &format!("SELECT {sql}"),
        rusqlite::params_from_iter(params),
        |row| row.get(0),
    )
    .unwrap_or_else(|e| panic!("{sql}: {e}"))
}

fn posts() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE posts (id INTEGER PRIMARY KEY, status TEXT, view_count INTEGER, user_id TEXT);
         INSERT INTO posts (status, view_count, user_id) VALUES
           ('draft', 5, 'user1'),
           ('published', 50, 'user1'),
           ('published', 150, 'user2'),
           ('review', 25, 'user2');",
    )
    .unwrap();
    conn
}

/// 按条件查出匹配行的 view_count。
fn select_views(conn: &Connection, cond: &ConditionBuilder) -> Vec<i64> {
    let (clause, values) = cond.where_clause().to_sql();
    let params: Vec<Value> = values.into_iter().map(to_sqlite).collect();
    let sql = format!("SELECT view_count FROM posts {clause} ORDER BY view_count");
    let mut stmt = conn.prepare(&sql).unwrap();
    stmt.query_map(rusqlite::params_from_iter(params), |row| row.get(0))
        .unwrap()
        .collect::<rusqlite::Result<Vec<i64>>>()
        .unwrap()
}

#[test]
fn integer_division_keeps_fraction() {
    init_tracing();
    let conn = Connection::open_in_memory().unwrap();
    let eb = ctx().expr();
    assert_eq!(scalar(&conn, eb.divide(7_i64, 2_i64)), Value::Real(3.5));
}

#[test]
fn grouped_predicate_selects_published_rows() {
    init_tracing();
    let conn = posts();
    let mut c = ctx().condition();
    c.equals("status", "published").group(|g| {
        g.less_than("view_count", 100_i64).or_equals("user_id", "user2");
    });
    assert_eq!(select_views(&conn, &c), vec![50, 150]);
}

#[test]
fn between_matches_inclusive_range() {
    init_tracing();
    let conn = posts();

    let mut between = ctx().condition();
    between.between("view_count", 25_i64, 150_i64);
    let mut range = ctx().condition();
    range
        .greater_than_or_equal("view_count", 25_i64)
        .less_than_or_equal("view_count", 150_i64);
    assert_eq!(select_views(&conn, &between), vec![25, 50, 150]);
    assert_eq!(select_views(&conn, &between), select_views(&conn, &range));

    let mut outside = ctx().condition();
    outside.not_between("view_count", 25_i64, 150_i64);
    let mut all = select_views(&conn, &between);
    all.extend(select_views(&conn, &outside));
    all.sort_unstable();
    assert_eq!(all, vec![5, 25, 50, 150]);
}

#[test]
fn string_helpers() {
    init_tracing();
    let conn = Connection::open_in_memory().unwrap();
    let eb = ctx().expr();

    assert_eq!(scalar(&conn, eb.reverse("abc")), Value::Text("cba".into()));
    assert_eq!(scalar(&conn, eb.reverse("")), Value::Text(String::new()));
    assert_eq!(
        scalar(&conn, eb.concat(["a", "b", "c"])),
        Value::Text("abc".into())
    );
    assert_eq!(scalar(&conn, eb.left("hello", 2_i64)), Value::Text("he".into()));
    assert_eq!(scalar(&conn, eb.right("hello", 3_i64)), Value::Text("llo".into()));
    assert_eq!(scalar(&conn, eb.repeat("ab", 3_i64)), Value::Text("ababab".into()));
    assert_eq!(scalar(&conn, eb.upper("rust")), Value::Text("RUST".into()));
}

#[test]
fn math_fallbacks() {
    init_tracing();
    let conn = Connection::open_in_memory().unwrap();
    let eb = ctx().expr();

    assert_eq!(scalar(&conn, eb.greatest([3_i64, 9, 4])), Value::Integer(9));
    assert_eq!(scalar(&conn, eb.trunc(7.9_f64, None)), Value::Integer(7));
    assert_eq!(scalar(&conn, eb.trunc(-7.9_f64, None)), Value::Integer(-7));
}

#[test]
fn json_and_date_helpers() {
    init_tracing();
    let conn = Connection::open_in_memory().unwrap();
    let eb = ctx().expr();

    let doc = r#"{"user":{"name":"ann","tags":["a","b"]}}"#;
    assert_eq!(
        scalar(&conn, eb.json_extract_text(doc, "$.user.name")),
        Value::Text("ann".into())
    );

    let append = |doc: &'static str| scalar(&conn, eb.json_array_append(doc, "$.tags", r#""y""#));
    assert_eq!(append(r#"{"a":1}"#), Value::Text(r#"{"a":1,"tags":["y"]}"#.into()));
    assert_eq!(append(r#"{"tags":null}"#), Value::Text(r#"{"tags":["y"]}"#.into()));
    assert_eq!(append(r#"{"tags":["x"]}"#), Value::Text(r#"{"tags":["x","y"]}"#.into()));

    let at = "2024-03-15 10:20:30";
    assert_eq!(scalar(&conn, eb.year(at)), Value::Integer(2024));
    assert_eq!(
        scalar(&conn, eb.date_trunc(DateUnit::Month, at)),
        Value::Text("2024-03-01 00:00:00".into())
    );
    assert_eq!(
        scalar(&conn, eb.date_add(at, 20, DateUnit::Day)),
        Value::Text("2024-04-04 10:20:30".into())
    );
}

#[test]
fn json_contains_takes_json_text() {
    init_tracing();
    let conn = Connection::open_in_memory().unwrap();
    let eb = ctx().expr();
    let contains = |doc: &'static str, value: &'static str| scalar(&conn, eb.json_contains(doc, value));

    assert_eq!(contains(r#"["a","b"]"#, r#""a""#), Value::Integer(1));
    assert_eq!(contains(r#"["a","b"]"#, r#"["b","a"]"#), Value::Integer(1));
    assert_eq!(contains(r#"["a","b"]"#, r#""c""#), Value::Integer(0));
    assert_eq!(contains("[1,2]", "1"), Value::Integer(1));
    assert_eq!(contains("[1,2]", r#""1""#), Value::Integer(0));
    assert_eq!(contains("[true]", "1"), Value::Integer(0));
    assert_eq!(contains(r#"{"k":"a","n":2}"#, r#"{"k":"a"}"#), Value::Integer(1));
    assert_eq!(contains(r#"{"k":"a"}"#, r#""a""#), Value::Integer(0));
    assert_eq!(contains(r#""a""#, r#""a""#), Value::Integer(1));
}

#[test]
fn date_diff_counts_complete_units() {
    init_tracing();
    let conn = Connection::open_in_memory().unwrap();
    let eb = ctx().expr();
    let diff = |unit: DateUnit, start: &'static str, end: &'static str| {
        scalar(&conn, eb.date_diff(unit, start, end))
    };

    assert_eq!(diff(DateUnit::Year, "2023-12-31", "2024-01-01"), Value::Integer(0));
    assert_eq!(
        diff(DateUnit::Year, "2023-12-31", "2024-01-01"),
        scalar(&conn, eb.age("2023-12-31", "2024-01-01"))
    );
    assert_eq!(diff(DateUnit::Year, "2020-06-15", "2024-06-15"), Value::Integer(4));
    assert_eq!(diff(DateUnit::Year, "2020-06-15", "2024-06-14"), Value::Integer(3));
    assert_eq!(diff(DateUnit::Year, "2024-06-15", "2020-06-16"), Value::Integer(-3));

    assert_eq!(diff(DateUnit::Month, "2024-01-31", "2024-02-01"), Value::Integer(0));
    assert_eq!(diff(DateUnit::Month, "2024-01-15", "2024-03-15"), Value::Integer(2));
    assert_eq!(
        diff(DateUnit::Month, "2024-01-15 12:00:00", "2024-03-15 11:59:59"),
        Value::Integer(1)
    );
    assert_eq!(diff(DateUnit::Month, "2024-03-15", "2024-01-16"), Value::Integer(-1));

    assert_eq!(
        diff(DateUnit::Day, "2024-01-03 12:00:00", "2024-01-01 00:00:00"),
        Value::Integer(-2)
    );
}

#[test]
fn random_stays_below_one() {
    init_tracing();
    let conn = Connection::open_in_memory().unwrap();
    let (sql, _) = ctx().expr().random().to_sql();
    let (lo, hi): (f64, f64) = conn
        .query_row(
            &format!("WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 10000) \
                      SELECT MIN(r), MAX(r) FROM (SELECT {sql} AS r FROM n)"),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert!(lo >= 0.0, "{lo}");
    assert!(hi < 1.0, "{hi}");
}
