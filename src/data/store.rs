use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::Mutex;
use tracing::{debug, info, warn};
use crate::data::source::{FetchRequest, ListingSource};
use crate::data::types::{parse_listing_date, Furnishing, Listing};

/// Local SQLite copy of the listings table
pub struct SqliteListingStore {
    conn: Mutex<Connection>,
}

impl SqliteListingStore {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                listing_id TEXT PRIMARY KEY,
                property_type TEXT NOT NULL,
                location TEXT NOT NULL,
                latitude REAL,
                longitude REAL,
                price REAL NOT NULL,
                size_sq_m REAL NOT NULL,
                bedrooms INTEGER NOT NULL DEFAULT 0,
                bathrooms INTEGER NOT NULL DEFAULT 0,
                year_built INTEGER,
                furnished TEXT NOT NULL,
                date_listed TEXT NOT NULL,
                synced_at TIMESTAMP NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sync_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                row_count INTEGER NOT NULL,
                synced_at TIMESTAMP NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_listings_date_listed ON listings(date_listed);
            CREATE INDEX IF NOT EXISTS idx_listings_location ON listings(location);
            "#
        )?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Listing store connection poisoned"))
    }

    /// Swap the snapshot contents for `listings`, in one transaction.
    /// Rows missing from `listings` are dropped.
    pub fn replace_listings(&self, listings: &[Listing]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        let removed = tx.execute("DELETE FROM listings", [])?;
        debug!("Cleared {} snapshot rows", removed);

        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO listings
                 (listing_id, property_type, location, latitude, longitude, price, size_sq_m,
                  bedrooms, bathrooms, year_built, furnished, date_listed, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            )?;

            for l in listings {
                stmt.execute(params![
                    l.listing_id,
                    l.property_type.as_str(),
                    l.location,
                    l.latitude,
                    l.longitude,
                    l.price,
                    l.size_sq_m,
                    l.bedrooms,
                    l.bathrooms,
                    l.year_built,
                    l.furnished.as_str(),
                    l.date_listed.format("%Y-%m-%d").to_string(),
                    now,
                ])?;
            }
        }

        tx.commit()?;
        Ok(listings.len())
    }

    /// Record a completed sync
    pub fn log_sync(&self, source: &str, row_count: usize) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sync_runs (source, row_count, synced_at) VALUES (?1, ?2, ?3)",
            params![source, row_count, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Timestamp of the most recent sync, if any
    pub fn last_synced_at(&self) -> Result<Option<String>> {
        let conn = self.lock()?;
        let ts: Option<String> = conn.query_row(
            "SELECT MAX(synced_at) FROM sync_runs",
            [],
            |row| row.get(0),
        )?;
        Ok(ts)
    }

    pub fn count_listings(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: usize = conn.query_row(
            "SELECT COUNT(*) FROM listings",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Most recent listings, newest first
    pub fn get_recent_listings(&self, request: &FetchRequest) -> Result<Vec<Listing>> {
        let conn = self.lock()?;

        let mut sql = String::from(
            "SELECT listing_id, property_type, location, latitude, longitude, price, size_sq_m,
                    bedrooms, bathrooms, year_built, furnished, date_listed
             FROM listings"
        );
        if request.geolocated_only {
            sql.push_str(" WHERE latitude IS NOT NULL AND longitude IS NOT NULL");
        }
        sql.push_str(" ORDER BY date_listed DESC, listing_id");
        // SQLite treats a negative LIMIT as no limit
        sql.push_str(" LIMIT ?1");

        let limit: i64 = request.limit.map(|l| l as i64).unwrap_or(-1);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<f64>>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, u32>(7)?,
                row.get::<_, u32>(8)?,
                row.get::<_, Option<i32>>(9)?,
                row.get::<_, String>(10)?,
                row.get::<_, String>(11)?,
            ))
        })?;

        let mut listings = Vec::new();
        for row in rows {
            let (listing_id, kind, location, latitude, longitude, price, size_sq_m,
                 bedrooms, bathrooms, year_built, furnished, date_listed) = row?;

            let property_type = match kind.parse() {
                Ok(t) => t,
                Err(e) => {
                    debug!("Skipping stored listing {}: {}", listing_id, e);
                    continue;
                }
            };
            let date_listed = match parse_listing_date(&date_listed) {
                Ok(d) => d,
                Err(e) => {
                    debug!("Skipping stored listing {}: {}", listing_id, e);
                    continue;
                }
            };

            listings.push(Listing {
                listing_id,
                property_type,
                location,
                latitude,
                longitude,
                price,
                size_sq_m,
                bedrooms,
                bathrooms,
                year_built,
                furnished: Furnishing::parse(&furnished),
                date_listed,
            });
        }

        Ok(listings)
    }
}

#[async_trait]
impl ListingSource for SqliteListingStore {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Listing>> {
        self.get_recent_listings(request)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

/// Copy the newest listings from `source` into the local store
pub async fn sync_snapshot(
    source: &dyn ListingSource,
    store: &SqliteListingStore,
    request: &FetchRequest,
) -> Result<usize> {
    info!("Syncing listings snapshot from {}...", source.name());

    let listings = source.fetch(request).await?;

    // An empty fetch would wipe the snapshot
    if listings.is_empty() {
        warn!("{} returned no listings, keeping the current snapshot", source.name());
        bail!("{} returned no listings", source.name());
    }

    let written = store.replace_listings(&listings)?;
    store.log_sync(source.name(), written)?;

    info!("Snapshot sync complete: {} listings written", written);
    Ok(written)
}
