use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Weekday;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::{BTreeSet, HashMap};

use super::RoomRepository;
use crate::models::{Address, Room};

const ROOM_SELECT: &str = "SELECT id, owner_id, room_type, description, price, street, city, zip_code,
        latitude, longitude
    FROM rooms";

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: i64,
    owner_id: i64,
    room_type: String,
    description: String,
    price: f64,
    street: String,
    city: String,
    zip_code: i64,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl RoomRow {
    fn into_room(self, equipments: BTreeSet<String>, days: Vec<Weekday>) -> Room {
        Room {
            id: self.id,
            room_type: self.room_type,
            description: self.description,
            equipments,
            days,
            price: self.price,
            address: Address {
                street: self.street,
                city: self.city,
                zip_code: self.zip_code,
                latitude: self.latitude,
                longitude: self.longitude,
            },
            owner_id: self.owner_id,
        }
    }
}

#[derive(Clone)]
pub struct SqliteRoomRepository {
    db: SqlitePool,
}

impl SqliteRoomRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn fetch_rooms(&self, filter: &str, binds: &[Bind<'_>]) -> Result<Vec<Room>> {
        let sql = format!("{ROOM_SELECT} {filter} ORDER BY id ASC");
        let mut query = sqlx::query_as::<_, RoomRow>(&sql);
        for bind in binds {
            query = match bind {
                Bind::Int(v) => query.bind(*v),
                Bind::Text(v) => query.bind(*v),
            };
        }
        let rows = query.fetch_all(&self.db).await.context("fetch rooms")?;
        self.hydrate(rows).await
    }

    /// Attach equipment and open days, one query each for the whole batch.
    async fn hydrate(&self, rows: Vec<RoomRow>) -> Result<Vec<Room>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

        let mut equipments: HashMap<i64, BTreeSet<String>> = HashMap::new();
        let equipment_rows = self
            .children("SELECT room_id, name FROM room_equipments", &ids)
            .await?;
        for (room_id, name) in equipment_rows {
            equipments.entry(room_id).or_default().insert(name);
        }

        let mut days: HashMap<i64, Vec<Weekday>> = HashMap::new();
        for (room_id, day) in self.children("SELECT room_id, day FROM room_days", &ids).await? {
            let weekday = day
                .parse::<Weekday>()
                .map_err(|_| anyhow!("invalid weekday {day:?} stored for room {room_id}"))?;
            days.entry(room_id).or_default().push(weekday);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                row.into_room(
                    equipments.remove(&id).unwrap_or_default(),
                    days.remove(&id).unwrap_or_default(),
                )
            })
            .collect())
    }

    async fn children(&self, select: &str, ids: &[i64]) -> Result<Vec<(i64, String)>> {
        let mut qb = QueryBuilder::<Sqlite>::new(select);
        qb.push(" WHERE room_id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY rowid ASC");
        let rows = qb
            .build_query_as::<(i64, String)>()
            .fetch_all(&self.db)
            .await
            .context("fetch room children")?;
        Ok(rows)
    }
}

enum Bind<'a> {
    Int(i64),
    Text(&'a str),
}

#[async_trait]
impl RoomRepository for SqliteRoomRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Room>> {
        let mut rooms = self.fetch_rooms("WHERE id = ?", &[Bind::Int(id)]).await?;
        Ok(rooms.pop())
    }

    async fn exists_by_id(&self, id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM rooms WHERE id = ?")
            .bind(id)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }

    async fn find_all(&self) -> Result<Vec<Room>> {
        self.fetch_rooms("", &[]).await
    }

    async fn find_by_city(&self, city: &str, zip_code: i64) -> Result<Vec<Room>> {
        self.fetch_rooms(
            "WHERE city = ? COLLATE NOCASE AND zip_code = ?",
            &[Bind::Text(city), Bind::Int(zip_code)],
        )
        .await
    }

    async fn find_by_city_and_day(
        &self,
        city: &str,
        zip_code: i64,
        day: &str,
    ) -> Result<Vec<Room>> {
        self.fetch_rooms(
            "WHERE city = ? COLLATE NOCASE AND zip_code = ?
               AND id IN (SELECT room_id FROM room_days WHERE day = ?)",
            &[Bind::Text(city), Bind::Int(zip_code), Bind::Text(day)],
        )
        .await
    }

    async fn find_with_coordinates(&self) -> Result<Vec<Room>> {
        self.fetch_rooms("WHERE latitude IS NOT NULL AND longitude IS NOT NULL", &[])
            .await
    }

    async fn find_by_type(&self, room_type: &str) -> Result<Vec<Room>> {
        self.fetch_rooms("WHERE room_type = ? COLLATE NOCASE", &[Bind::Text(room_type)])
            .await
    }

    async fn find_by_equipment(&self, equipment: &str) -> Result<Vec<Room>> {
        self.fetch_rooms(
            "WHERE id IN (SELECT room_id FROM room_equipments WHERE name = ? COLLATE NOCASE)",
            &[Bind::Text(equipment)],
        )
        .await
    }

    async fn find_by_owner(&self, owner_id: i64) -> Result<Vec<Room>> {
        self.fetch_rooms("WHERE owner_id = ?", &[Bind::Int(owner_id)])
            .await
    }

    async fn all_types(&self) -> Result<Vec<String>> {
        let types = sqlx::query_scalar("SELECT DISTINCT room_type FROM rooms ORDER BY room_type")
            .fetch_all(&self.db)
            .await?;
        Ok(types)
    }

    async fn all_equipments(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar("SELECT DISTINCT name FROM room_equipments ORDER BY name")
            .fetch_all(&self.db)
            .await?;
        Ok(names)
    }

    async fn save(&self, room: Room) -> Result<Room> {
        let mut tx = self.db.begin().await?;

        let id = if room.id == 0 {
            sqlx::query(
                "INSERT INTO rooms (owner_id, room_type, description, price, street, city, zip_code,
                 latitude, longitude)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(room.owner_id)
            .bind(&room.room_type)
            .bind(&room.description)
            .bind(room.price)
            .bind(&room.address.street)
            .bind(&room.address.city)
            .bind(room.address.zip_code)
            .bind(room.address.latitude)
            .bind(room.address.longitude)
            .execute(&mut *tx)
            .await
            .context("insert room")?
            .last_insert_rowid()
        } else {
            sqlx::query(
                "UPDATE rooms SET owner_id = ?, room_type = ?, description = ?, price = ?, street = ?,
                 city = ?, zip_code = ?, latitude = ?, longitude = ?
                 WHERE id = ?",
            )
            .bind(room.owner_id)
            .bind(&room.room_type)
            .bind(&room.description)
            .bind(room.price)
            .bind(&room.address.street)
            .bind(&room.address.city)
            .bind(room.address.zip_code)
            .bind(room.address.latitude)
            .bind(room.address.longitude)
            .bind(room.id)
            .execute(&mut *tx)
            .await
            .context("update room")?;

            sqlx::query("DELETE FROM room_equipments WHERE room_id = ?")
                .bind(room.id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM room_days WHERE room_id = ?")
                .bind(room.id)
                .execute(&mut *tx)
                .await?;
            room.id
        };

        for name in &room.equipments {
            sqlx::query("INSERT OR IGNORE INTO room_equipments (room_id, name) VALUES (?, ?)")
                .bind(id)
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }
        for day in &room.days {
            sqlx::query("INSERT OR IGNORE INTO room_days (room_id, day) VALUES (?, ?)")
                .bind(id)
                .bind(day.to_string())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("room {id} vanished after save"))
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM rooms WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete room")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::test_support::{insert_user, sample_room};

    #[tokio::test]
    async fn test_save_inserts_with_children() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "owner@example.com").await;
        let repo = SqliteRoomRepository::new(pool);

        let room = repo.save(sample_room(owner.id, "nantes", 44000)).await.unwrap();
        assert!(room.id > 0);
        assert_eq!(room.equipments, BTreeSet::from(["projector".to_string(), "wifi".to_string()]));
        assert_eq!(room.days, vec![Weekday::Mon, Weekday::Wed]);
        assert!(repo.exists_by_id(room.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_updates_and_replaces_children() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "owner@example.com").await;
        let repo = SqliteRoomRepository::new(pool);

        let mut room = repo.save(sample_room(owner.id, "nantes", 44000)).await.unwrap();
        room.price = 42.0;
        room.equipments = BTreeSet::from(["whiteboard".to_string()]);
        room.days = vec![Weekday::Sat];
        let updated = repo.save(room.clone()).await.unwrap();

        assert_eq!(updated.id, room.id);
        assert_eq!(updated.price, 42.0);
        assert_eq!(repo.all_equipments().await.unwrap(), vec!["whiteboard".to_string()]);
        assert_eq!(updated.days, vec![Weekday::Sat]);
    }

    #[tokio::test]
    async fn test_city_and_day_filters() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "owner@example.com").await;
        let repo = SqliteRoomRepository::new(pool);

        repo.save(sample_room(owner.id, "Nantes", 44000)).await.unwrap();
        let mut weekend = sample_room(owner.id, "nantes", 44000);
        weekend.days = vec![Weekday::Sat, Weekday::Sun];
        repo.save(weekend).await.unwrap();
        repo.save(sample_room(owner.id, "rennes", 35000)).await.unwrap();

        assert_eq!(repo.find_by_city("nantes", 44000).await.unwrap().len(), 2);
        assert!(repo.find_by_city("nantes", 35000).await.unwrap().is_empty());
        assert_eq!(repo.find_by_city_and_day("NANTES", 44000, "Sat").await.unwrap().len(), 1);
        assert_eq!(repo.find_by_city_and_day("nantes", 44000, "Mon").await.unwrap().len(), 1);
        assert!(repo.find_by_city_and_day("nantes", 44000, "Tue").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_type_equipment_and_owner_lookups() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "owner@example.com").await;
        let other = insert_user(&pool, "other@example.com").await;
        let repo = SqliteRoomRepository::new(pool);

        repo.save(sample_room(owner.id, "nantes", 44000)).await.unwrap();
        let mut studio = sample_room(other.id, "nantes", 44000);
        studio.room_type = "studio".into();
        studio.equipments = BTreeSet::from(["piano".to_string()]);
        repo.save(studio).await.unwrap();

        assert_eq!(repo.find_by_type("Studio").await.unwrap().len(), 1);
        assert_eq!(repo.find_by_equipment("wifi").await.unwrap().len(), 1);
        assert_eq!(repo.find_by_owner(other.id).await.unwrap().len(), 1);
        assert_eq!(
            repo.all_types().await.unwrap(),
            vec!["meeting".to_string(), "studio".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "owner@example.com").await;
        let repo = SqliteRoomRepository::new(pool.clone());

        let room = repo.save(sample_room(owner.id, "nantes", 44000)).await.unwrap();
        repo.delete_by_id(room.id).await.unwrap();

        assert!(repo.find_by_id(room.id).await.unwrap().is_none());
        let leftovers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM room_equipments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_find_with_coordinates_skips_unlocated() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "owner@example.com").await;
        let repo = SqliteRoomRepository::new(pool);

        repo.save(sample_room(owner.id, "nantes", 44000)).await.unwrap();
        let mut unlocated = sample_room(owner.id, "nantes", 44000);
        unlocated.address.latitude = None;
        unlocated.address.longitude = None;
        repo.save(unlocated).await.unwrap();

        assert_eq!(repo.find_with_coordinates().await.unwrap().len(), 1);
    }
}
