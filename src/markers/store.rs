use libsql::Connection;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::model::{Marker, NewMarker};

/// CRUD over the `markers` table.
pub struct MarkerStore<'a> {
    conn: &'a Connection,
}

impl<'a> MarkerStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// All markers in insertion order.
    pub async fn list(&self) -> StoreResult<Vec<Marker>> {
        let query = r#"
            SELECT id, name, lat, lng, type
            FROM markers
            ORDER BY rowid
        "#;

        let markers = self.read_all(query).await.inspect_err(|e| {
            tracing::error!(error = %crate::unpack_error(e), "failed to fetch markers");
        })?;

        tracing::info!(count = markers.len(), "fetched markers");
        Ok(markers)
    }

    pub async fn create(&self, input: NewMarker) -> StoreResult<Marker> {
        let id = Uuid::new_v4().to_string();

        self.conn
            .execute(
                "INSERT INTO markers (id, name, lat, lng, type) VALUES (?, ?, ?, ?, ?)",
                libsql::params![
                    id.as_str(),
                    input.name.as_str(),
                    input.lat,
                    input.lng,
                    input.marker_type.as_deref()
                ],
            )
            .await
            .inspect_err(|e| {
                tracing::error!(
                    marker_id = %id,
                    lat = input.lat,
                    lng = input.lng,
                    name = %input.name,
                    error = %crate::unpack_error(e),
                    "failed to add marker"
                );
            })?;

        tracing::info!(marker_id = %id, lat = input.lat, lng = input.lng, "added marker");
        Ok(Marker {
            id,
            name: input.name,
            lat: input.lat,
            lng: input.lng,
            marker_type: input.marker_type,
        })
    }

    /// Moves a marker. Only `lat` and `lng` change.
    pub async fn update_position(&self, id: &str, lat: f64, lng: f64) -> StoreResult<()> {
        self.conn
            .execute(
                "UPDATE markers SET lat = ?, lng = ? WHERE id = ?",
                libsql::params![lat, lng, id],
            )
            .await
            .map_err(StoreError::from)
            .and_then(|changed| Self::found(id, changed))
            .inspect_err(|e| {
                tracing::error!(marker_id = id, lat, lng, error = %crate::unpack_error(e), "failed to update marker position");
            })?;

        tracing::info!(marker_id = id, lat, lng, "updated marker position");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM markers WHERE id = ?", libsql::params![id])
            .await
            .map_err(StoreError::from)
            .and_then(|removed| Self::found(id, removed))
            .inspect_err(|e| {
                tracing::error!(marker_id = id, error = %crate::unpack_error(e), "failed to delete marker");
            })?;

        tracing::info!(marker_id = id, "deleted marker");
        Ok(())
    }

    async fn read_all(&self, query: &str) -> StoreResult<Vec<Marker>> {
        let mut rows = self.conn.query(query, ()).await?;
        let mut markers = vec![];
        while let Some(row) = rows.next().await? {
            markers.push(Self::row_to_marker(&row)?);
        }
        Ok(markers)
    }

    /// Zero affected rows means no marker has `id`.
    fn found(id: &str, affected: u64) -> StoreResult<()> {
        if affected == 0 {
            return Err(StoreError::NotFound(id.to_owned()));
        }
        Ok(())
    }

    fn row_to_marker(row: &libsql::Row) -> StoreResult<Marker> {
        Ok(Marker {
            id: row.get(0)?,
            name: row.get(1)?,
            lat: row.get(2)?,
            lng: row.get(3)?,
            marker_type: row.get::<Option<String>>(4)?,
        })
    }
}
