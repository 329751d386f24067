use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::issues::models::{CandidateReport, Department, IssueCategory};

/// Earth's radius in meters (for Haversine formula)
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of latitude, shared by the bounding-box prefilter and
/// the spatial cell keying
pub(crate) const METERS_PER_DEGREE_LAT: f64 = 111_000.0;

/// Proximity index over open reports. The duplicate matcher consumes this
/// through the trait so tests can substitute a fake.
#[async_trait]
pub trait GeoIndex: Send + Sync {
    /// All reports with status in {submitted, progress} within
    /// `radius_meters` of the point, sorted by distance ascending with ties
    /// broken by smallest report id.
    async fn find_open_within(
        &self,
        lat: f64,
        lon: f64,
        radius_meters: f64,
    ) -> Result<Vec<CandidateReport>>;
}

/// Calculate Haversine distance between two points in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_METERS * c
}

/// Nearest-first, report id as the tie-break. The automatic merge reference
/// is always index 0 of the result.
pub(crate) fn rank_candidates(mut candidates: Vec<CandidateReport>) -> Vec<CandidateReport> {
    candidates.sort_by(|a, b| {
        a.distance_meters
            .partial_cmp(&b.distance_meters)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates
}

#[derive(Debug, FromRow)]
struct OpenReportRow {
    id: Uuid,
    description: String,
    category: IssueCategory,
    department: Department,
    lat: f64,
    lon: f64,
}

/// Postgres-backed index over the reports table
pub struct PgGeoIndex {
    pool: PgPool,
}

impl PgGeoIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GeoIndex for PgGeoIndex {
    async fn find_open_within(
        &self,
        lat: f64,
        lon: f64,
        radius_meters: f64,
    ) -> Result<Vec<CandidateReport>> {
        // Bounding-box prefilter; 1 degree of latitude is ~111km, longitude
        // shrinks with cos(lat). The exact great-circle check below prunes
        // the corners.
        let lat_delta = (radius_meters / METERS_PER_DEGREE_LAT) * 2.0;
        let lon_delta = lat_delta / lat.to_radians().cos().abs().max(0.01);

        let rows = sqlx::query_as::<_, OpenReportRow>(
            r#"
            SELECT id, description, category, department, lat, lon
            FROM reports
            WHERE status IN ('submitted', 'progress')
            AND lat BETWEEN $1 AND $2
            AND lon BETWEEN $3 AND $4
            "#,
        )
        .bind(lat - lat_delta)
        .bind(lat + lat_delta)
        .bind(lon - lon_delta)
        .bind(lon + lon_delta)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::store)?;

        let nearby: Vec<CandidateReport> = rows
            .into_iter()
            .map(|r| {
                let distance_meters = haversine_distance(lat, lon, r.lat, r.lon);
                CandidateReport {
                    id: r.id,
                    description: r.description,
                    category: r.category,
                    department: r.department,
                    distance_meters,
                }
            })
            .filter(|c| c.distance_meters <= radius_meters)
            .collect();

        Ok(rank_candidates(nearby))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u128, distance_meters: f64) -> CandidateReport {
        CandidateReport {
            id: Uuid::from_u128(id),
            description: "Large pothole near the bus stop".to_string(),
            category: IssueCategory::Pothole,
            department: Department::RoadConstruction,
            distance_meters,
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // Bengaluru to Mysuru city centers, roughly 130km great-circle
        let distance = haversine_distance(12.9716, 77.5946, 12.2958, 76.6394);

        assert!(distance > 125_000.0 && distance < 135_000.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let distance = haversine_distance(12.9716, 77.5946, 12.9716, 77.5946);

        assert!(distance < 1.0); // Less than 1 meter
    }

    #[test]
    fn test_haversine_adjacent_submissions_within_dedup_radius() {
        // ~15m apart; must fall inside a 20m radius
        let distance = haversine_distance(12.9, 77.6, 12.9001, 77.6001);

        assert!(distance < 20.0);
        assert!(distance > 5.0);
    }

    #[test]
    fn test_rank_candidates_nearest_first() {
        let ranked = rank_candidates(vec![
            candidate(3, 42.0),
            candidate(1, 7.5),
            candidate(2, 19.0),
        ]);

        let distances: Vec<f64> = ranked.iter().map(|c| c.distance_meters).collect();
        assert_eq!(distances, vec![7.5, 19.0, 42.0]);
    }

    #[test]
    fn test_rank_candidates_ties_break_on_smallest_id() {
        let ranked = rank_candidates(vec![candidate(9, 10.0), candidate(2, 10.0)]);

        assert_eq!(ranked[0].id, Uuid::from_u128(2));
        assert_eq!(ranked[1].id, Uuid::from_u128(9));
    }
}
