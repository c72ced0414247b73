//! SQLite date fragments must not depend on the host's local time zone.
//!
//! Kept in its own test binary because it changes `TZ` for the whole process.

use ngramkit::{DateBucket, SearchPredicateBuilder, SqlDialect};
use rusqlite::Connection;

fn evaluate(conn: &Connection, expr: &str) -> Option<String> {
    let sql = format!("SELECT {} FROM (SELECT '2026-01-04 23:30:00' AS ts)", expr);
    conn.query_row(&sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn test_sqlite_dates_ignore_host_time_zone() {
    std::env::set_var("TZ", "America/New_York");
    let conn = Connection::open_in_memory().unwrap();
    let builder = SearchPredicateBuilder::new(SqlDialect::Sqlite);

    let cases = [
        ("UTC", "2026-01-04"),
        ("+00:00", "2026-01-04"),
        ("+02:00", "2026-01-05"),
        ("-05:00", "2026-01-04"),
    ];
    for (zone, expected) in cases {
        let expr = builder.build_date_bucket("ts", DateBucket::Day, zone).unwrap();
        assert_eq!(evaluate(&conn, &expr).as_deref(), Some(expected), "zone {}", zone);
    }

    let range = builder.build_date_range("ts", "UTC").unwrap();
    let sql = format!(
        "SELECT COUNT(*) FROM (SELECT '2026-01-04 23:30:00' AS ts) WHERE {}",
        range
    );
    let count: i64 = conn
        .query_row(&sql, ["2026-01-04", "2026-01-04"], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);

    // names would evaluate to NULL in SQLite, so they never reach the SQL
    let err = builder
        .build_date_range("ts", "Europe/Paris")
        .unwrap_err();
    assert!(err.is_invalid_input());
}
