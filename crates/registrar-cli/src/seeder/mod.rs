//! Fake data for development: a catalogue of courses and subjects, people
//! with accounts, and a conflict-free timetable with enrollments.
//!
//! Seeded rows are recognisable by the `SEED-` code prefix and the
//! `@example.com` email domain, which is what [`clear_all`] deletes by.

pub mod catalog;
pub mod models;
pub mod people;
pub mod timetable;

use sqlx::PgPool;
use std::time::Instant;

pub use models::{PeopleCounts, SeedConfig};

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("\n🌱 Starting database seeding...\n");

    let catalog = catalog::seed_catalog(
        db,
        config.num_courses,
        config.semesters_per_course,
        config.num_subjects,
        config.first_semester_start,
    )
    .await?;
    let people = people::seed_people(db, &catalog.courses, &config.people, &config.password).await?;
    timetable::seed_timetable(db, &catalog, &people, config.subjects_per_semester).await?;

    println!(
        "\n✅ Seeding complete in {:?} ({} students). Every account uses the password '{}'.",
        start_time.elapsed(),
        config.total_students(),
        config.password
    );
    Ok(())
}

/// Removes everything [`seed_all`] created. Admin accounts are kept.
pub async fn clear_all(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("\n🧹 Clearing seeded data...\n");

    catalog::clear_catalog(db).await?;
    people::clear_people(db).await?;

    println!("\n✅ Cleared seeded data in {:?}", start_time.elapsed());
    Ok(())
}
