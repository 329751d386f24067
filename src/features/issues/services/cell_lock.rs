use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::features::issues::services::geo_index::METERS_PER_DEGREE_LAT;

/// Per-spatial-cell advisory locks. Submissions hash into a coarse grid cell
/// and hold that cell's lock across resolve-then-commit, so two concurrent
/// submissions for the same spot serialize through one decision path instead
/// of both creating a report.
///
/// In-process only: separate instances of the service do not share cells.
/// Points on opposite sides of a cell boundary take different locks; the
/// grid only narrows the race, it is not a correctness guarantee.
pub struct SpatialCellLocks {
    cell_size_meters: f64,
    cells: std::sync::Mutex<HashMap<(i64, i64), Arc<Mutex<()>>>>,
}

impl SpatialCellLocks {
    pub fn new(cell_size_meters: f64) -> Self {
        Self {
            cell_size_meters,
            cells: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Grid coordinates for a point. No cos(lat) correction for longitude;
    /// cells widen toward the poles, which only coarsens serialization.
    pub(crate) fn cell_key(&self, lat: f64, lon: f64) -> (i64, i64) {
        let row = (lat * METERS_PER_DEGREE_LAT / self.cell_size_meters).floor() as i64;
        let col = (lon * METERS_PER_DEGREE_LAT / self.cell_size_meters).floor() as i64;
        (row, col)
    }

    /// Take the cell's mutual-exclusion token. Held until the guard drops.
    pub async fn acquire(&self, lat: f64, lon: f64) -> OwnedMutexGuard<()> {
        let key = self.cell_key(lat, lon);

        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
            // Drop cells nobody holds or waits on; held locks keep an Arc
            // alive through their guard.
            cells.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                cells
                    .entry(key)
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        cell.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_nearby_points_share_a_cell() {
        let locks = SpatialCellLocks::new(250.0);

        assert_eq!(
            locks.cell_key(12.9, 77.6),
            locks.cell_key(12.9001, 77.6001)
        );
    }

    #[test]
    fn test_distant_points_use_different_cells() {
        let locks = SpatialCellLocks::new(250.0);

        assert_ne!(locks.cell_key(12.9, 77.6), locks.cell_key(13.0, 77.6));
        assert_ne!(locks.cell_key(12.9, 77.6), locks.cell_key(12.9, 77.7));
    }

    #[tokio::test]
    async fn test_same_cell_submissions_serialize() {
        let locks = Arc::new(SpatialCellLocks::new(250.0));
        let entered = Arc::new(AtomicBool::new(false));

        let guard = locks.acquire(12.9, 77.6).await;

        let task = {
            let locks = Arc::clone(&locks);
            let entered = Arc::clone(&entered);
            tokio::spawn(async move {
                let _guard = locks.acquire(12.9001, 77.6001).await;
                entered.store(true, Ordering::SeqCst);
            })
        };

        tokio::task::yield_now().await;
        assert!(!entered.load(Ordering::SeqCst));

        drop(guard);
        task.await.unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_different_cells_do_not_block_each_other() {
        let locks = SpatialCellLocks::new(250.0);

        let _first = locks.acquire(12.9, 77.6).await;
        // Must not deadlock
        let _second = locks.acquire(13.0, 77.6).await;
    }
}
