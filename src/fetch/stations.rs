//! Station metadata from the operator's GBFS `station_information` feed,
//! kept next to the ridership files as `station_info.csv`.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};

pub const STATION_INFO_FILE: &str = "station_info.csv";

#[derive(Debug, Deserialize)]
struct Feed {
    data: FeedData,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    #[serde(default)]
    stations: Vec<Station>,
}

/// One dock location. Feeds differ in which optional fields they publish.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Station {
    /// A string in most feeds, a bare number in some.
    pub station_id: Value,
    #[serde(default)]
    pub name: String,
    pub physical_configuration: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude: Option<f64>,
    pub address: Option<String>,
    pub post_code: Option<String>,
    pub capacity: Option<u32>,
    pub is_charging_station: Option<bool>,
    #[serde(default)]
    pub rental_methods: Vec<String>,
    pub nearby_distance: Option<f64>,
}

#[derive(Debug, Serialize)]
struct StationRow<'a> {
    station_id: String,
    name: &'a str,
    physical_configuration: Option<&'a str>,
    lat: Option<f64>,
    lon: Option<f64>,
    altitude: Option<f64>,
    address: Option<&'a str>,
    post_code: Option<&'a str>,
    capacity: Option<u32>,
    is_charging_station: Option<bool>,
    rental_methods: String,
    nearby_distance: Option<f64>,
}

impl Station {
    pub fn id(&self) -> String {
        match &self.station_id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn row(&self) -> StationRow<'_> {
        StationRow {
            station_id: self.id(),
            name: &self.name,
            physical_configuration: self.physical_configuration.as_deref(),
            lat: self.lat,
            lon: self.lon,
            altitude: self.altitude,
            address: self.address.as_deref(),
            post_code: self.post_code.as_deref(),
            capacity: self.capacity,
            is_charging_station: self.is_charging_station,
            rental_methods: self.rental_methods.join(";"),
            nearby_distance: self.nearby_distance,
        }
    }
}

/// Decode a `station_information` document.
pub fn parse_station_info(body: &str) -> Result<Vec<Station>> {
    let feed: Feed = serde_json::from_str(body).context("decoding station_information feed")?;
    Ok(feed.data.stations)
}

/// One row per station, feed order, header first.
pub fn write_station_info(stations: &[Station], path: &Path) -> Result<()> {
    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for station in stations {
        wtr.serialize(station.row())?;
    }
    wtr.flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

/// Download the station feed at `url` and write it to
/// `<out_dir>/station_info.csv`.
#[instrument(level = "info", skip(client, out_dir))]
pub async fn fetch_station_info(client: &Client, url: &str, out_dir: &Path) -> Result<PathBuf> {
    let body = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?
        .text()
        .await
        .with_context(|| format!("Reading text from {}", url))?;
    let stations = parse_station_info(&body)?;

    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let path = out_dir.join(STATION_INFO_FILE);
    write_station_info(&stations, &path)?;
    info!(stations = stations.len(), path = %path.display(), "station info written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FEED: &str = r#"{
        "last_updated": 1697040000,
        "ttl": 15,
        "data": {
            "stations": [
                {
                    "station_id": "7000",
                    "name": "Fort York  Blvd / Capreol Ct",
                    "physical_configuration": "REGULAR",
                    "lat": 43.639832,
                    "lon": -79.395954,
                    "altitude": 0.0,
                    "address": "Fort York  Blvd / Capreol Ct",
                    "capacity": 35,
                    "is_charging_station": false,
                    "rental_methods": ["KEY", "TRANSITCARD", "CREDITCARD", "PHONE"],
                    "groups": [],
                    "obcn": "647-643-9607",
                    "nearby_distance": 500.0
                },
                {
                    "station_id": 7001,
                    "name": "Wellesley Station Green P",
                    "lat": 43.66496,
                    "lon": -79.38355
                }
            ]
        }
    }"#;

    #[test]
    fn parses_the_station_feed() {
        let stations = parse_station_info(FEED).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].id(), "7000");
        assert_eq!(stations[0].capacity, Some(35));
        assert_eq!(stations[0].rental_methods.len(), 4);
        assert_eq!(stations[1].id(), "7001");
        assert_eq!(stations[1].address, None);
    }

    #[test]
    fn feed_without_data_is_an_error() {
        assert!(parse_station_info(r#"{"last_updated": 1}"#).is_err());
        assert!(parse_station_info("<html>").is_err());
    }

    #[test]
    fn writes_one_row_per_station() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join(STATION_INFO_FILE);
        write_station_info(&parse_station_info(FEED).unwrap(), &path).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "station_id");
        assert_eq!(&headers[10], "rental_methods");
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "7000");
        assert_eq!(&rows[0][8], "35");
        assert_eq!(&rows[0][10], "KEY;TRANSITCARD;CREDITCARD;PHONE");
        assert_eq!(&rows[1][0], "7001");
        assert_eq!(&rows[1][6], "");
    }
}
