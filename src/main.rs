use anyhow::Result;
use rusqlite::Connection;
use serde_json::json;
use std::env;

use calc_records::{
    count_calculations, get_calculations_for_user, insert_calculation, insert_user,
    setup_database, Calculation, User,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    // In-memory by default; pass a path to keep the database around.
    let conn = match args.get(1) {
        Some(path) => Connection::open(path)?,
        None => Connection::open_in_memory()?,
    };

    println!("🗄️  calc-records v{}", calc_records::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Setup database
    println!("\n🔧 Setting up database...");
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode");

    // 2. Seed a user
    let user = User::new("Dummy", "User", "duser@njit.edu", "dummy_user", "hashed_password");
    insert_user(&conn, &user)?;
    println!("\n👤 Created user {} ({})", user.full_name(), user.id);

    // 3. Record one calculation per kind via the factory
    println!("\n💾 Recording calculations...");
    let samples = [
        ("Addition", json!([12, 10, 9, 18, -30])),
        ("Subtraction", json!([10, 5, 3.5])),
        ("Multiplication", json!([1, 2, 3])),
        ("Division", json!([42, 3, 2])),
    ];
    for (kind, inputs) in samples {
        let calc = Calculation::create(kind, &user.id, inputs)?.with_result()?;
        println!(
            "✓ {} {} = {}",
            calc.kind,
            calc.inputs,
            calc.result.unwrap_or(f64::NAN)
        );
        insert_calculation(&conn, &calc)?;
    }

    // 4. Read back
    println!("\n🔍 Verifying database...");
    let stored = get_calculations_for_user(&conn, &user.id)?;
    for calc in &stored {
        println!("✓ [{}] {} -> {:?}", calc.kind, calc.inputs, calc.result);
    }
    println!(
        "✓ Database contains {} calculations",
        count_calculations(&conn)?
    );

    Ok(())
}
