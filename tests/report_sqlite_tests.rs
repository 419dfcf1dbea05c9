mod common;

use approx::assert_relative_eq;
use common::{ratings_by_id, row_count, setup_db, setup_seeded_db};
use restaurant_report::{ReportPlan, ReportSummary, run_report_sqlite};

fn run_seeded() -> (rusqlite::Connection, ReportSummary, String) {
    let mut conn = setup_seeded_db();
    let plan = ReportPlan::restaurants().unwrap();
    let mut out = Vec::new();
    let summary = run_report_sqlite(&mut conn, &plan, &mut out).unwrap();
    (conn, summary, String::from_utf8(out).unwrap())
}

fn f(value: &serde_json::Value) -> f64 {
    value.as_f64().unwrap()
}

fn s(value: &serde_json::Value) -> &str {
    value.as_str().unwrap()
}

#[test]
fn test_top_rated_sorted_by_rating_then_name() {
    let (_, summary, _) = run_seeded();
    let rows = &summary.step("top_rated").unwrap().rows;
    assert_eq!(rows.len(), 8);
    for pair in rows.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(f(&a[1]) > f(&b[1]) || (f(&a[1]) == f(&b[1]) && s(&a[0]) <= s(&b[0])));
    }
    // Tie on 3.1 is broken by name
    assert_eq!(s(&rows[6][0]), "Cheap Eats");
    assert_eq!(s(&rows[7][0]), "Taco Tienda");
}

#[test]
fn test_insert_returns_id_of_new_row() {
    let (conn, summary, output) = run_seeded();
    let inserted = &summary.step("insert_restaurant").unwrap().rows;
    assert_eq!(inserted.len(), 1);
    let id = inserted[0][0].as_i64().unwrap();
    assert_eq!(s(&inserted[0][1]), "Queeny's");

    let row: (String, String, f64, f64, String, f64, i64) = conn
        .query_row(
            "SELECT name, address, distance_miles, rating, cuisine, avg_cost, personal_rank FROM restaurants WHERE id = ?1",
            [id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?)),
        )
        .unwrap();
    assert_eq!(row.0, "Queeny's");
    assert_eq!(row.1, "321 E Chapel Hill St, Durham, NC");
    assert_relative_eq!(row.2, 1.5);
    assert_relative_eq!(row.3, 4.3);
    assert_eq!(row.4, "American");
    assert_relative_eq!(row.5, 22.0);
    assert_eq!(row.6, 7);

    assert!(output.contains(&format!("Inserted: ({id}, \"Queeny's\")")));
}

#[test]
fn test_update_only_changes_nuvotaco() {
    let mut conn = setup_seeded_db();
    let before = ratings_by_id(&conn);
    let plan = ReportPlan::restaurants().unwrap();
    let mut out = Vec::new();
    let summary = run_report_sqlite(&mut conn, &plan, &mut out).unwrap();

    let updated = &summary.step("update_rating").unwrap().rows;
    assert_eq!(updated.len(), 1);
    assert_eq!(s(&updated[0][0]), "NuvoTaco");
    assert_relative_eq!(f(&updated[0][1]), 4.6, epsilon = 1e-9);

    let after = ratings_by_id(&conn);
    for (id, name, rating) in &before {
        if *id == 7 {
            // removed by the lowest-rated delete
            continue;
        }
        let (_, _, new_rating) = after.iter().find(|(a, _, _)| a == id).unwrap();
        if name == "NuvoTaco" {
            assert_relative_eq!(*new_rating, rating + 0.1, epsilon = 1e-9);
        } else {
            assert_relative_eq!(*new_rating, *rating);
        }
    }
}

#[test]
fn test_update_without_match_prints_nothing() {
    let mut conn = setup_seeded_db();
    conn.execute("DELETE FROM restaurants WHERE name = 'NuvoTaco'", [])
        .unwrap();
    let plan = ReportPlan::restaurants().unwrap();
    let mut out = Vec::new();
    let summary = run_report_sqlite(&mut conn, &plan, &mut out).unwrap();

    assert!(summary.step("update_rating").unwrap().rows.is_empty());
    let output = String::from_utf8(out).unwrap();
    assert!(output.contains("Updating rating for NuvoTaco...\n\nDeleting lowest-rated place..."));
    assert!(!output.contains("Updated:"));
}

#[test]
fn test_delete_lowest_rated_breaks_ties_by_id() {
    let mut conn = setup_seeded_db();
    let plan = ReportPlan::restaurants().unwrap();
    let mut out = Vec::new();
    let summary = run_report_sqlite(&mut conn, &plan, &mut out).unwrap();

    let deleted = &summary.step("delete_lowest_rated").unwrap().rows;
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0][0].as_i64(), Some(7));
    assert_eq!(s(&deleted[0][1]), "Cheap Eats");
    assert_relative_eq!(f(&deleted[0][2]), 3.1);

    // 8 seeded + 1 inserted - 1 deleted
    assert_eq!(row_count(&conn), 8);
    let ids: Vec<i64> = ratings_by_id(&conn).into_iter().map(|(id, _, _)| id).collect();
    assert!(!ids.contains(&7));
    assert!(ids.contains(&8));
}

#[test]
fn test_cheapest_five_limited_and_sorted() {
    let (_, summary, _) = run_seeded();
    let rows = &summary.step("cheapest_five").unwrap().rows;
    assert_eq!(rows.len(), 5);
    assert!(rows.windows(2).all(|p| f(&p[0][2]) <= f(&p[1][2])));
    assert_eq!(s(&rows[0][0]), "Taco Tienda");
    assert_eq!(s(&rows[0][1]), "Mexican");
}

#[test]
fn test_nearby_highly_rated_filters_and_orders() {
    let (_, summary, _) = run_seeded();
    let rows = &summary.step("nearby_highly_rated").unwrap().rows;
    let names: Vec<&str> = rows.iter().map(|r| s(&r[0])).collect();
    assert_eq!(
        names,
        vec!["Mateo", "NuvoTaco", "Pizzeria Toro", "Queeny's", "Dame's Chicken", "Bull City Burger"]
    );
    for row in rows {
        assert!(f(&row[2]) <= 5.0);
        assert!(f(&row[3]) >= 4.0);
    }
}

#[test]
fn test_within_two_miles() {
    let (_, summary, _) = run_seeded();
    let rows = &summary.step("within_two_miles").unwrap().rows;
    let names: Vec<&str> = rows.iter().map(|r| s(&r[0])).collect();
    assert_eq!(
        names,
        vec!["NuvoTaco", "Bull City Burger", "Mateo", "Queeny's", "Pizzeria Toro"]
    );
}

#[test]
fn test_top_three() {
    let (_, summary, _) = run_seeded();
    let rows = &summary.step("top_three").unwrap().rows;
    let names: Vec<&str> = rows.iter().map(|r| s(&r[0])).collect();
    assert_eq!(names, vec!["Mateo", "NuvoTaco", "Pizzeria Toro"]);
}

#[test]
fn test_cost_with_tax_column() {
    let (conn, summary, _) = run_seeded();
    let rows = &summary.step("cost_with_tax").unwrap().rows;
    assert_eq!(rows.len() as i64, row_count(&conn));
    for row in rows {
        assert_relative_eq!(f(&row[2]), f(&row[1]) * 1.075, epsilon = 1e-9);
    }
}

#[test]
fn test_cuisine_counts_sum_to_row_count() {
    let (conn, summary, _) = run_seeded();
    let result = summary.step("cuisine_counts").unwrap();
    assert_eq!(result.columns, vec!["cuisine", "num_restaurants"]);
    let counts: Vec<i64> = result.rows.iter().map(|r| r[1].as_i64().unwrap()).collect();
    assert_eq!(counts.iter().sum::<i64>(), row_count(&conn));
    assert!(counts.windows(2).all(|p| p[0] >= p[1]));
    assert_eq!(counts[0], 2);
}

#[test]
fn test_empty_table_end_to_end() {
    let mut conn = setup_db();
    let plan = ReportPlan::restaurants().unwrap();
    let mut out = Vec::new();
    let summary = run_report_sqlite(&mut conn, &plan, &mut out).unwrap();

    assert_eq!(row_count(&conn), 0);
    assert_eq!(summary.steps.len(), 10);

    let expected = "
Top rated places:

Inserting a new restaurant...
Inserted: (1, \"Queeny's\")

Updating rating for NuvoTaco...

Deleting lowest-rated place...
Deleted: (1, \"Queeny's\", 4.3)

5 Cheapest Restaurants:

Nearby highly rated (within 5 miles, rating >= 4.0):

Restaurants within 2 miles:

Top 3 Restaurants by Rating:

Restaurants with avg_cost and cost_with_tax:

Number of restaurants per cuisine:
";
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn test_sections_printed_in_plan_order() {
    let (_, _, output) = run_seeded();
    let plan = ReportPlan::restaurants().unwrap();
    let mut last = 0;
    for step in &plan.steps {
        let pos = output[last..]
            .find(&step.label)
            .unwrap_or_else(|| panic!("label for {} missing or out of order", step.name));
        last += pos + step.label.len();
    }
}

#[test]
fn test_report_is_committed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.db");
    {
        let conn = restaurant_report::open_sqlite(&path).unwrap();
        conn.execute(common::SCHEMA, []).unwrap();
        conn.execute_batch(
            "INSERT INTO restaurants (name, rating, cuisine) VALUES ('NuvoTaco', 4.5, 'Mexican'), ('Low', 1.0, 'Diner');",
        )
        .unwrap();
    }

    let mut conn = restaurant_report::open_sqlite(&path).unwrap();
    let plan = ReportPlan::restaurants().unwrap();
    run_report_sqlite(&mut conn, &plan, &mut std::io::sink()).unwrap();
    drop(conn);

    let reopened = restaurant_report::open_sqlite(&path).unwrap();
    let rows = ratings_by_id(&reopened);
    let names: Vec<&str> = rows.iter().map(|(_, name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["NuvoTaco", "Queeny's"]);
    assert_relative_eq!(rows[0].2, 4.6, epsilon = 1e-9);
}
