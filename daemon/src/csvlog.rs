//! Session log sink — CSV rows per detection, KML export at shutdown.
//!
//! Rows are flushed as they arrive so a yanked SD card or power loss
//! costs nothing already written. Placemarks for records carrying a
//! position are collected along the way and written as a KML document
//! when the pipeline finalizes.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use roadhound::record::DetectionRecord;
use roadhound::sink::{DetectionSink, SinkError};

struct Placemark {
    name: String,
    mac: String,
    description: String,
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

pub struct SessionLog {
    writer: csv::Writer<File>,
    kml_path: PathBuf,
    placemarks: Vec<Placemark>,
}

impl SessionLog {
    /// Open a new session log pair (CSV now, KML at finalize) named after
    /// the current local time.
    pub fn create(log_dir: &Path) -> Result<Self, SinkError> {
        fs::create_dir_all(log_dir)?;
        let session = Local::now().format("%Y%m%d_%H%M%S");
        let csv_path = log_dir.join(format!("roadhound_{session}.csv"));
        let kml_path = log_dir.join(format!("roadhound_{session}.kml"));

        let mut writer = csv::Writer::from_path(&csv_path).map_err(csv_err)?;
        writer
            .write_record([
                "Timestamp",
                "Protocol",
                "Type",
                "MAC",
                "Name/SSID",
                "RSSI",
                "Threat_Score",
                "Latitude",
                "Longitude",
                "Altitude",
                "Description",
            ])
            .map_err(csv_err)?;
        writer.flush()?;

        log::info!("logging detections to {}", csv_path.display());
        Ok(Self {
            writer,
            kml_path,
            placemarks: Vec::new(),
        })
    }

    fn write_kml(&self) -> Result<(), SinkError> {
        let mut out = File::create(&self.kml_path)?;
        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(out, r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#)?;
        writeln!(out, "<Document>")?;
        writeln!(out, "  <name>Roadhound Detections</name>")?;
        for placemark in &self.placemarks {
            let name = if placemark.name.is_empty() {
                "Unknown"
            } else {
                placemark.name.as_str()
            };
            writeln!(out, "  <Placemark>")?;
            writeln!(out, "    <name>{}</name>", xml_escape(name))?;
            writeln!(
                out,
                "    <description>{} (MAC: {})</description>",
                xml_escape(&placemark.description),
                placemark.mac
            )?;
            writeln!(out, "    <Point>")?;
            writeln!(
                out,
                "      <coordinates>{},{},{}</coordinates>",
                placemark.longitude, placemark.latitude, placemark.altitude
            )?;
            writeln!(out, "    </Point>")?;
            writeln!(out, "  </Placemark>")?;
        }
        writeln!(out, "</Document>")?;
        writeln!(out, "</kml>")?;
        Ok(())
    }
}

impl DetectionSink for SessionLog {
    fn record_detection(&mut self, record: &DetectionRecord) -> Result<(), SinkError> {
        let format_opt = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
        let rssi = record.rssi.to_string();
        let score = record.threat_score.to_string();
        let latitude = format_opt(record.latitude);
        let longitude = format_opt(record.longitude);
        let altitude = format_opt(record.altitude);
        self.writer
            .write_record([
                record.timestamp.as_str(),
                record.protocol.as_str(),
                record.kind.as_str(),
                record.mac.as_str(),
                record.name.as_str(),
                rssi.as_str(),
                score.as_str(),
                latitude.as_str(),
                longitude.as_str(),
                altitude.as_str(),
                record.description.as_str(),
            ])
            .map_err(csv_err)?;
        self.writer.flush()?;

        if let (Some(latitude), Some(longitude)) = (record.latitude, record.longitude) {
            self.placemarks.push(Placemark {
                name: record.name.clone(),
                mac: record.mac.clone(),
                description: record.description.clone(),
                latitude,
                longitude,
                altitude: record.altitude.unwrap_or(0.0),
            });
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        log::info!("writing KML export to {}", self.kml_path.display());
        self.write_kml()
    }
}

fn csv_err(e: csv::Error) -> SinkError {
    SinkError::Other(e.to_string())
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
