//! Fixtures shared by the test modules.

use chrono::{NaiveDateTime, Weekday};
use sqlx::SqlitePool;
use std::collections::BTreeSet;

use crate::models::{Address, NewUser, Role, Room, User};
use crate::repository::{SqliteUserRepository, UserRepository};

/// Parse a `dd/MM/yyyy HH:mm` timestamp.
pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, crate::date_utils::DATETIME_FORMAT).unwrap()
}

pub async fn insert_user(pool: &SqlitePool, email: &str) -> User {
    SqliteUserRepository::new(pool.clone())
        .insert(NewUser {
            email: email.into(),
            password_hash: "not-a-real-hash".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            role: Role::User,
        })
        .await
        .unwrap()
        .unwrap()
}

pub async fn insert_admin(pool: &SqlitePool, email: &str) -> User {
    SqliteUserRepository::new(pool.clone())
        .insert(NewUser {
            email: email.into(),
            password_hash: "not-a-real-hash".into(),
            first_name: "Admin".into(),
            last_name: "User".into(),
            role: Role::Admin,
        })
        .await
        .unwrap()
        .unwrap()
}

/// A meeting room in central Nantes, open Monday and Wednesday, 10/hour.
pub fn sample_room(owner_id: i64, city: &str, zip_code: i64) -> Room {
    Room {
        id: 0,
        room_type: "meeting".into(),
        description: "Second floor".into(),
        equipments: BTreeSet::from(["projector".to_string(), "wifi".to_string()]),
        days: vec![Weekday::Mon, Weekday::Wed],
        price: 10.0,
        address: Address {
            street: "1 rue Crébillon".into(),
            city: city.into(),
            zip_code,
            latitude: Some(47.2133),
            longitude: Some(-1.5600),
        },
        owner_id,
    }
}
