//! Basic usage example for `cryptorm`.

use cryptorm::prelude::*;
use cryptorm_sqlite::SqliteDriver;

#[derive(Debug, Clone, Record)]
#[record(table = "users")]
struct User {
    id: Id,
    email: Hashed,
    name: String,
    age: i64,
    active: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cryptorm Basic Usage Example");
    println!("============================\n");

    let key = EncryptionKey::generate();
    println!("✓ Generated key: {}\n", key.to_base64());

    let driver = SqliteDriver::open_in_memory()?;
    let mut session = Session::builder(driver, &key).register::<User>().open()?;
    println!("✓ Session opened, `users` table ensured\n");

    for (email, name, age) in [("alice@example.com", "Alice", 31), ("bob@example.com", "Bob", 27)] {
        let mut user = User {
            id: Id::default(),
            email: email.into(),
            name: name.to_string(),
            age,
            active: true,
        };
        let id = session.create(&mut user)?;
        println!("✓ Created {name} with id {id}");
    }

    // Search field lookup
    let alice = session
        .find::<User>()
        .filter(User::EMAIL.eq("alice@example.com"))
        .first()?
        .ok_or("alice not found")?;
    println!(
        "\nFound by email: {} (age {}), email stored as {:?}",
        alice.name, alice.age, alice.email
    );

    // Protected-value lookup
    let bobs = session.find::<User>().filter(User::NAME.eq("Bob")).all()?;
    println!("Found by name: {}", bobs.map_or(0, |v| v.len()));

    // Update
    let mut alice = alice;
    alice.age += 1;
    session.save(&alice)?;
    println!("✓ Saved Alice, age now {}", alice.age);

    // Delete by query
    let removed = session.find::<User>().filter(User::ACTIVE.eq(true)).delete()?;
    println!("✓ Removed {removed} users");
    assert!(session.find::<User>().all()?.is_none());

    session.close()?;
    println!("\n✓ Session closed");
    Ok(())
}
