/// NMEA 0183 position-sentence parsing.
///
/// Only the two sentence types that carry a position solution are handled:
/// GGA (fix data, with altitude and satellite count) and RMC (recommended
/// minimum, position only). A sentence yields a fix only when it reports a
/// usable solution — GGA quality > 0 or RMC status "A". Anything else,
/// including lines mangled by a noisy serial link, is simply ignored.
use chrono::NaiveTime;

use crate::record::PositionFix;

/// Parse one line from a position source.
///
/// Returns a fix only for valid-solution GGA/RMC sentences. A trailing
/// `*hh` checksum is verified when present; sentences without one are
/// accepted as-is.
pub fn parse_sentence(line: &str) -> Option<PositionFix> {
    let line = line.trim();
    // GNSS talkers all start with 'G' (GP, GN, GL, GA, GB).
    if !line.starts_with("$G") {
        return None;
    }

    let body = match line[1..].rsplit_once('*') {
        Some((body, given)) => {
            let computed = body.bytes().fold(0u8, |acc, b| acc ^ b);
            let given = u8::from_str_radix(given.trim(), 16).ok()?;
            if computed != given {
                return None;
            }
            body
        }
        None => &line[1..],
    };

    let fields: Vec<&str> = body.split(',').collect();
    let talker = fields.first()?;
    if talker.len() != 5 || !talker.is_ascii() {
        return None;
    }

    match &talker[2..] {
        "GGA" => parse_gga(&fields),
        "RMC" => parse_rmc(&fields),
        _ => None,
    }
}

/// GGA: $xxGGA,time,lat,N/S,lon,E/W,quality,numsats,hdop,alt,M,...
fn parse_gga(fields: &[&str]) -> Option<PositionFix> {
    if fields.len() < 10 {
        return None;
    }
    let quality: u8 = fields[6].parse().ok()?;
    if quality == 0 {
        return None;
    }
    let latitude = parse_coord(fields[2], fields[3], 2)?;
    let longitude = parse_coord(fields[4], fields[5], 3)?;
    Some(PositionFix {
        latitude,
        longitude,
        altitude: fields[9].parse().unwrap_or(0.0),
        quality,
        satellites: fields[7].parse().unwrap_or(0),
        time: parse_time(fields[1]),
    })
}

/// RMC: $xxRMC,time,status,lat,N/S,lon,E/W,speed,course,date,...
///
/// Carries no altitude or satellite count; those default to zero.
fn parse_rmc(fields: &[&str]) -> Option<PositionFix> {
    if fields.len() < 7 {
        return None;
    }
    if fields[2] != "A" {
        return None;
    }
    let latitude = parse_coord(fields[3], fields[4], 2)?;
    let longitude = parse_coord(fields[5], fields[6], 3)?;
    Some(PositionFix {
        latitude,
        longitude,
        altitude: 0.0,
        quality: 1,
        satellites: 0,
        time: parse_time(fields[1]),
    })
}

/// Convert ddmm.mmmm / dddmm.mmmm plus hemisphere to signed degrees.
fn parse_coord(value: &str, hemisphere: &str, degree_digits: usize) -> Option<f64> {
    if value.len() <= degree_digits || !value.is_ascii() {
        return None;
    }
    let degrees: f64 = value[..degree_digits].parse().ok()?;
    let minutes: f64 = value[degree_digits..].parse().ok()?;
    let magnitude = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Some(magnitude),
        "S" | "W" => Some(-magnitude),
        _ => None,
    }
}

/// hhmmss with optional fractional seconds.
fn parse_time(value: &str) -> Option<NaiveTime> {
    if value.len() < 6 || !value.is_ascii() {
        return None;
    }
    NaiveTime::parse_from_str(&value[..6], "%H%M%S").ok()
}
