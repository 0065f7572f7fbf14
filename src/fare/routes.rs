use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Distance used when a pickup/destination pair is not in the table.
pub const DEFAULT_DISTANCE_KM: f64 = 8.5;
/// Travel time used when a pickup/destination pair is not in the table.
pub const DEFAULT_TIME_MINUTES: u32 = 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub base_time_minutes: u32,
    pub traffic_multiplier: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSourceKind {
    Table,
    Default,
    Directions,
}

/// Distance and time for one trip, however they were obtained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub distance_km: f64,
    pub base_time_minutes: u32,
    pub traffic_multiplier: f64,
    pub source: RouteSourceKind,
}

impl RouteInfo {
    pub fn default_route() -> Self {
        Self {
            distance_km: DEFAULT_DISTANCE_KM,
            base_time_minutes: DEFAULT_TIME_MINUTES,
            traffic_multiplier: 1.0,
            source: RouteSourceKind::Default,
        }
    }
}

impl From<&RouteEntry> for RouteInfo {
    fn from(entry: &RouteEntry) -> Self {
        Self {
            distance_km: entry.distance_km,
            base_time_minutes: entry.base_time_minutes,
            traffic_multiplier: entry.traffic_multiplier,
            source: RouteSourceKind::Table,
        }
    }
}

// (place a, place b, km, minutes, traffic multiplier). Each unordered pair appears once.
const KOLKATA_ROUTES: &[(&str, &str, f64, u32, f64)] = &[
    ("park street", "howrah station", 7.8, 25, 1.4),
    ("park street", "sealdah station", 4.2, 15, 1.3),
    ("park street", "salt lake sector v", 11.5, 32, 1.5),
    ("park street", "kolkata airport", 17.6, 45, 1.3),
    ("park street", "victoria memorial", 2.1, 8, 1.2),
    ("park street", "new town", 14.8, 38, 1.3),
    ("park street", "gariahat", 5.6, 18, 1.4),
    ("howrah station", "sealdah station", 6.4, 22, 1.5),
    ("howrah station", "esplanade", 4.9, 18, 1.5),
    ("howrah station", "kolkata airport", 21.3, 55, 1.3),
    ("howrah station", "salt lake sector v", 15.2, 42, 1.4),
    ("howrah station", "victoria memorial", 6.8, 24, 1.4),
    ("sealdah station", "esplanade", 3.1, 12, 1.4),
    ("sealdah station", "salt lake sector v", 8.9, 26, 1.3),
    ("sealdah station", "kolkata airport", 14.7, 38, 1.2),
    ("esplanade", "victoria memorial", 2.4, 9, 1.2),
    ("esplanade", "gariahat", 7.2, 24, 1.4),
    ("salt lake sector v", "new town", 6.3, 16, 1.2),
    ("salt lake sector v", "kolkata airport", 9.4, 22, 1.2),
    ("new town", "kolkata airport", 8.1, 18, 1.1),
    ("gariahat", "victoria memorial", 5.3, 17, 1.3),
    ("dakshineswar", "kolkata airport", 9.8, 24, 1.2),
    ("dakshineswar", "howrah station", 13.6, 36, 1.3),
    ("dakshineswar", "esplanade", 13.1, 40, 1.4),
];

pub fn normalize(place: &str) -> String {
    place.trim().to_lowercase()
}

pub fn route_key(origin: &str, destination: &str) -> String {
    format!("{}-{}", normalize(origin), normalize(destination))
}

/// Static, immutable table of hand-curated routes keyed by `"origin-destination"`.
#[derive(Clone, Debug)]
pub struct RouteTable {
    entries: HashMap<String, RouteEntry>,
}

impl RouteTable {
    /// Builds a table from records, registering both directions of every record.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RouteEntry>,
    {
        let mut entries = HashMap::new();

        for record in records {
            let reverse = RouteEntry {
                origin: record.destination.clone(),
                destination: record.origin.clone(),
                ..record.clone()
            };

            entries.insert(route_key(&record.origin, &record.destination), record);
            entries.insert(route_key(&reverse.origin, &reverse.destination), reverse);
        }

        Self { entries }
    }

    pub fn kolkata() -> Self {
        Self::from_records(KOLKATA_ROUTES.iter().map(
            |&(origin, destination, distance_km, base_time_minutes, traffic_multiplier)| {
                RouteEntry {
                    origin: normalize(origin),
                    destination: normalize(destination),
                    distance_km,
                    base_time_minutes,
                    traffic_multiplier,
                }
            },
        ))
    }

    pub fn lookup(&self, origin: &str, destination: &str) -> Option<&RouteEntry> {
        self.entries.get(&route_key(origin, destination))
    }

    pub fn route_or_default(&self, origin: &str, destination: &str) -> RouteInfo {
        match self.lookup(origin, destination) {
            Some(entry) => entry.into(),
            None => {
                tracing::debug!(
                    origin,
                    destination,
                    "route not in table, using default distance"
                );
                RouteInfo::default_route()
            }
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_normalized() {
        assert_eq!(
            route_key("  Park Street ", "HOWRAH Station"),
            "park street-howrah station"
        );
    }

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        let table = RouteTable::kolkata();
        let entry = table.lookup(" PARK street", "Howrah Station  ").unwrap();

        assert_eq!(entry.distance_km, 7.8);
        assert_eq!(entry.base_time_minutes, 25);
    }

    #[test]
    fn unknown_route_falls_back_to_default() {
        let table = RouteTable::kolkata();
        let route = table.route_or_default("Somewhere", "Elsewhere");

        assert_eq!(route.distance_km, DEFAULT_DISTANCE_KM);
        assert_eq!(route.base_time_minutes, DEFAULT_TIME_MINUTES);
        assert_eq!(route.source, RouteSourceKind::Default);
    }

    #[test]
    fn table_is_symmetric() {
        let table = RouteTable::kolkata();

        for entry in table.entries() {
            let reverse = table
                .lookup(&entry.destination, &entry.origin)
                .expect("reverse entry missing");

            assert_eq!(reverse.distance_km, entry.distance_km);
            assert_eq!(reverse.base_time_minutes, entry.base_time_minutes);
            assert_eq!(reverse.traffic_multiplier, entry.traffic_multiplier);
        }
    }

    #[test]
    fn built_in_records_are_clean() {
        let mut pairs = HashSet::new();

        for &(a, b, distance_km, minutes, traffic_multiplier) in KOLKATA_ROUTES {
            assert_ne!(normalize(a), normalize(b));
            assert!(distance_km > 0.0);
            assert!(minutes > 0);
            assert!(traffic_multiplier >= 1.0);

            let mut pair = [normalize(a), normalize(b)];
            pair.sort();
            assert!(pairs.insert(pair), "duplicate pair {} / {}", a, b);
        }

        assert_eq!(RouteTable::kolkata().len(), KOLKATA_ROUTES.len() * 2);
        assert!(!RouteTable::kolkata().is_empty());
    }

    #[test]
    fn empty_table_always_falls_back() {
        let table = RouteTable::from_records(Vec::new());

        assert!(table.is_empty());
        assert_eq!(
            table.route_or_default("Park Street", "Howrah Station").source,
            RouteSourceKind::Default
        );
    }
}
