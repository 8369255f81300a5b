use chrono::Datelike;
use std::sync::Arc;

use crate::auth::authorize_owner;
use crate::date_utils;
use crate::error::AppError;
use crate::models::{Room, RoomSearchQuery, User};
use crate::repository::RoomRepository;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Clone)]
pub struct RoomService {
    rooms: Arc<dyn RoomRepository>,
    search_radius_km: f64,
}

impl RoomService {
    pub fn new(rooms: Arc<dyn RoomRepository>, search_radius_km: f64) -> Self {
        Self {
            rooms,
            search_radius_km,
        }
    }

    /// Store a new room owned by `actor`.
    pub async fn create(&self, mut room: Room, actor: Option<&User>) -> Result<Room, AppError> {
        let owner = authorize_owner(actor, room.owner_id)?;
        validate(&room)?;

        room.id = 0;
        let room = self.rooms.save(room).await?;
        tracing::info!(room_id = room.id, owner_id = owner.id, "room created");
        Ok(room)
    }

    /// Search rooms.
    ///
    /// Strategies, first match wins: coordinates, city + zip + day,
    /// city + zip, everything. Only the coordinate search may come back empty.
    pub async fn find_all(&self, query: &RoomSearchQuery) -> Result<Vec<Room>, AppError> {
        if let (Some(lat), Some(lon)) = (query.lat, query.lon) {
            return self.find_by_coordinates(lat, lon).await;
        }

        let rooms = match (query.city.as_deref(), query.zip_code, query.day.as_deref()) {
            (Some(city), Some(zip), Some(day)) => {
                let weekday = date_utils::parse_date(day)?.weekday();
                self.rooms
                    .find_by_city_and_day(city, zip, &weekday.to_string())
                    .await?
            }
            (Some(city), Some(zip), None) => self.rooms.find_by_city(city, zip).await?,
            _ => self.rooms.find_all().await?,
        };
        non_empty(rooms)
    }

    /// Rooms within the search radius, nearest first.
    async fn find_by_coordinates(&self, lat: f64, lon: f64) -> Result<Vec<Room>, AppError> {
        let mut nearby: Vec<(f64, Room)> = self
            .rooms
            .find_with_coordinates()
            .await?
            .into_iter()
            .filter_map(|room| {
                let (rlat, rlon) = (room.address.latitude?, room.address.longitude?);
                let d = distance_km(lat, lon, rlat, rlon);
                (d <= self.search_radius_km).then_some((d, room))
            })
            .collect();
        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(nearby.into_iter().map(|(_, room)| room).collect())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Room, AppError> {
        self.rooms
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Room"))
    }

    pub async fn find_by_type(&self, room_type: &str) -> Result<Vec<Room>, AppError> {
        non_empty(self.rooms.find_by_type(room_type).await?)
    }

    pub async fn find_by_equipment(&self, equipment: &str) -> Result<Vec<Room>, AppError> {
        non_empty(self.rooms.find_by_equipment(equipment).await?)
    }

    pub async fn find_by_user(&self, owner_id: i64) -> Result<Vec<Room>, AppError> {
        non_empty(self.rooms.find_by_owner(owner_id).await?)
    }

    pub async fn all_types(&self) -> Result<Vec<String>, AppError> {
        Ok(self.rooms.all_types().await?)
    }

    pub async fn all_equipments(&self) -> Result<Vec<String>, AppError> {
        Ok(self.rooms.all_equipments().await?)
    }

    /// Replace a room. The payload and the stored room must both belong to `actor`.
    pub async fn update(&self, room: Room, actor: Option<&User>) -> Result<Room, AppError> {
        authorize_owner(actor, room.owner_id)?;
        validate(&room)?;

        let stored = self.find_by_id(room.id).await?;
        authorize_owner(actor, stored.owner_id)?;

        let room = self.rooms.save(room).await?;
        tracing::info!(room_id = room.id, "room updated");
        Ok(room)
    }

    pub async fn delete(&self, id: i64, actor: Option<&User>) -> Result<(), AppError> {
        let stored = self.find_by_id(id).await?;
        authorize_owner(actor, stored.owner_id)?;

        self.rooms.delete_by_id(id).await?;
        tracing::info!(room_id = id, "room deleted");
        Ok(())
    }
}

fn validate(room: &Room) -> Result<(), AppError> {
    if room.room_type.trim().is_empty() {
        return Err(AppError::validation("Room type is required"));
    }
    if !room.price.is_finite() || room.price < 0.0 {
        return Err(AppError::validation("Room price must be a non-negative amount"));
    }
    if room.address.city.trim().is_empty() {
        return Err(AppError::validation("Room city is required"));
    }
    Ok(())
}

fn non_empty(rooms: Vec<Room>) -> Result<Vec<Room>, AppError> {
    if rooms.is_empty() {
        Err(AppError::not_found("Room"))
    } else {
        Ok(rooms)
    }
}

/// Great-circle distance (haversine).
fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}
