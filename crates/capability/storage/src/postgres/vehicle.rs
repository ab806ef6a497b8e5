//! Postgres 车辆存储实现

use crate::error::StorageError;
use crate::models::VehicleRecord;
use crate::traits::VehicleStore;
use crate::validation::ensure_vehicle_id;
use domain::VehicleId;
use sqlx::{PgPool, Row};

pub struct PgVehicleStore {
    pub pool: PgPool,
}

impl PgVehicleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl VehicleStore for PgVehicleStore {
    async fn insert_vehicles(
        &self,
        records: Vec<VehicleRecord>,
    ) -> Result<Vec<VehicleRecord>, StorageError> {
        for record in &records {
            ensure_vehicle_id(record.vehicle_id)?;
        }
        let mut tx = self.pool.begin().await?;
        for record in &records {
            sqlx::query(
                "insert into vehicles \
                 (vehicle_id, car_no, brand, model, area, voltage_program_id, has_helmet, investor) \
                 values ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(record.vehicle_id)
            .bind(&record.car_no)
            .bind(&record.brand)
            .bind(&record.model)
            .bind(&record.area)
            .bind(record.voltage_program_id)
            .bind(record.has_helmet)
            .bind(&record.investor)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(records)
    }

    async fn find_vehicle(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Option<VehicleRecord>, StorageError> {
        let row = sqlx::query(
            "select vehicle_id, car_no, brand, model, area, voltage_program_id, has_helmet, investor \
             from vehicles where vehicle_id = $1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(VehicleRecord {
            vehicle_id: row.try_get("vehicle_id")?,
            car_no: row.try_get("car_no")?,
            brand: row.try_get("brand")?,
            model: row.try_get("model")?,
            area: row.try_get("area")?,
            voltage_program_id: row.try_get("voltage_program_id")?,
            has_helmet: row.try_get("has_helmet")?,
            investor: row.try_get("investor")?,
        }))
    }

    async fn set_voltage_program(
        &self,
        vehicle_id: VehicleId,
        program_id: Option<i64>,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query("update vehicles set voltage_program_id = $1 where vehicle_id = $2")
            .bind(program_id)
            .bind(vehicle_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
