#![allow(dead_code)]

use rusqlite::Connection;

pub const SCHEMA: &str = "CREATE TABLE restaurants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    address TEXT,
    distance_miles REAL,
    rating REAL,
    cuisine TEXT,
    avg_cost REAL,
    personal_rank INTEGER
)";

pub fn setup_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute(SCHEMA, []).unwrap();
    conn
}

/// Eight restaurants; "Cheap Eats" (id 7) and "Taco Tienda" (id 8) tie for the lowest rating
pub fn setup_seeded_db() -> Connection {
    let conn = setup_db();
    seed(&conn);
    conn
}

/// Create and seed a database file, for runs that go through the binary
pub fn setup_seeded_file(path: &std::path::Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute(SCHEMA, []).unwrap();
    seed(&conn);
}

fn seed(conn: &Connection) {
    conn.execute_batch(
        "INSERT INTO restaurants (name, address, distance_miles, rating, cuisine, avg_cost, personal_rank) VALUES
            ('NuvoTaco', '212 W Main St', 0.8, 4.5, 'Mexican', 15.0, 2),
            ('Mateo', '109 W Chapel Hill St', 1.2, 4.7, 'Tapas', 45.0, 1),
            ('Dame''s Chicken', '317 W Main St', 2.5, 4.2, 'Southern', 18.0, 4),
            ('Bull City Burger', '107 E Parrish St', 1.0, 4.0, 'American', 16.0, 5),
            ('Sushi Love', '2000 Chapel Hill Rd', 6.5, 3.9, 'Japanese', 30.0, 6),
            ('Pizzeria Toro', '105 E Chapel Hill St', 1.8, 4.4, 'Italian', 25.0, 3),
            ('Cheap Eats', '1 Ninth St', 3.0, 3.1, 'American', 9.5, 9),
            ('Taco Tienda', '800 Alston Ave', 4.0, 3.1, 'Mexican', 8.0, 10);",
    )
    .unwrap();
}

pub fn row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM restaurants", [], |row| row.get(0))
        .unwrap()
}

pub fn ratings_by_id(conn: &Connection) -> Vec<(i64, String, f64)> {
    let mut stmt = conn
        .prepare("SELECT id, name, rating FROM restaurants ORDER BY id")
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<rusqlite::Result<Vec<_>>>()
        .unwrap()
}
