//! Dataset ingestion.
//!
//! The datasets are `;`-separated CSV files with row-type tags in the first
//! column: `TRO` rows describe transport orders (vehicles), `PLT` rows
//! describe truck announcements (planned or realised capacity files share
//! the shape). The capacity-history file is untagged apart from a header
//! row. Timestamps come as `dd/mm/YYYY-HH:MM:SS`; only the date part is
//! meaningful at the planner's daily resolution.
//!
//! Malformed rows are structural errors: the importer refuses the file and
//! names the offending line rather than skipping it.

use csv::{ReaderBuilder, StringRecord};
use std::collections::BTreeMap;
use std::path::Path;
use vlt_core::{
    CapacityObservation, Day, Location, LocationKind, Truck, TruckId, Vehicle, VltError,
    VltResult, TRAIN_ORDINAL_OFFSET,
};

/// Everything one dataset run needs: the location universe, the demand, and
/// the two truck views.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub locations: Vec<Location>,
    pub vehicles: Vec<Vehicle>,
    pub trucks_planned: BTreeMap<TruckId, Truck>,
    pub trucks_realised: BTreeMap<TruckId, Truck>,
}

/// Reads a dataset directory: `vehicle_data.csv`, `planned_capacity_data.csv`
/// and the named realised-capacity file.
pub fn read_dataset(dir: &Path, realised_file_name: &str) -> VltResult<Dataset> {
    let vehicles = read_vehicles(&dir.join("vehicle_data.csv"))?;
    let mut locations = Vec::new();
    let trucks_realised = read_trucks(&dir.join(realised_file_name), &mut locations)?;
    let trucks_planned = read_trucks(&dir.join("planned_capacity_data.csv"), &mut locations)?;
    Ok(Dataset {
        locations,
        vehicles,
        trucks_planned,
        trucks_realised,
    })
}

/// Parses a location code: five characters of site code followed by a kind
/// token (`PLANT`, `TERM`, `DEAL`; the long form `DEALER` appears in some
/// segment strings and is accepted too).
pub fn parse_location(code: &str) -> VltResult<Location> {
    if code.len() < 6 || !code.is_char_boundary(5) {
        return Err(VltError::Parse(format!("location code '{code}' too short")));
    }
    let (name, kind_token) = code.split_at(5);
    let kind = match kind_token {
        "DEALER" => LocationKind::Dealer,
        token => LocationKind::from_token(token)?,
    };
    Ok(Location::new(name, kind))
}

/// Splits the concatenated pair of location codes at the start of a segment
/// string, e.g. `GER01PLANTITA01DEAL`.
fn parse_location_pair(codes: &str) -> VltResult<(Location, Location)> {
    if codes.len() < 6 || !codes.is_char_boundary(5) {
        return Err(VltError::Parse(format!(
            "cannot split segment codes '{codes}'"
        )));
    }
    // Kind tokens are not prefix-free ("DEAL"/"DEALER"), so try the longer
    // candidates first and fall through on a split that does not parse.
    for token in ["PLANT", "DEALER", "TERM", "DEAL"] {
        let start_len = 5 + token.len();
        if codes.len() > start_len && codes[5..].starts_with(token) {
            if let (Ok(start), Ok(end)) = (
                parse_location(&codes[..start_len]),
                parse_location(&codes[start_len..]),
            ) {
                return Ok((start, end));
            }
        }
    }
    Err(VltError::Parse(format!(
        "cannot split segment codes '{codes}'"
    )))
}

/// Segment field of a truck row: `STARTEND-MODE-NUM`. Train ordinals are
/// offset so they never collide with road trucks on the same segment.
pub fn parse_segment(segment: &str) -> VltResult<(Location, Location, u32)> {
    let mut parts = segment.split('-');
    let (Some(codes), Some(mode), Some(number), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(VltError::Parse(format!(
            "segment '{segment}' is not STARTEND-MODE-NUM"
        )));
    };
    let (start, end) = parse_location_pair(codes)?;
    let number: u32 = number
        .parse()
        .map_err(|_| VltError::Parse(format!("segment '{segment}' has non-numeric ordinal")))?;
    let ordinal = match mode {
        "TRUCK" => number,
        "TRAIN" => number + TRAIN_ORDINAL_OFFSET,
        other => {
            return Err(VltError::Parse(format!(
                "segment '{segment}' has unknown mode '{other}'"
            )))
        }
    };
    Ok((start, end, ordinal))
}

fn parse_day(field: &str) -> VltResult<Day> {
    let timestamp = chrono::NaiveDateTime::parse_from_str(field, "%d/%m/%Y-%H:%M:%S")
        .map_err(|err| VltError::Parse(format!("bad timestamp '{field}': {err}")))?;
    Ok(Day::from_date(timestamp.date()))
}

/// Count fields arrive as decimals ("8.0"); negative values are refused.
fn parse_count(field: &str, what: &str) -> VltResult<u32> {
    let value: f64 = field
        .parse()
        .map_err(|_| VltError::Parse(format!("bad {what} '{field}'")))?;
    if value < 0.0 {
        return Err(VltError::Parse(format!("negative {what} '{field}'")));
    }
    Ok(value as u32)
}

fn field<'r>(record: &'r StringRecord, index: usize, line: u64) -> VltResult<&'r str> {
    record.get(index).ok_or_else(|| {
        VltError::Parse(format!("line {line}: missing column {index}"))
    })
}

fn with_line<T>(result: VltResult<T>, line: u64) -> VltResult<T> {
    result.map_err(|err| match err {
        VltError::Parse(message) => VltError::Parse(format!("line {line}: {message}")),
        other => other,
    })
}

fn open_csv(path: &Path) -> VltResult<csv::Reader<std::fs::File>> {
    ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| VltError::Parse(format!("opening '{}': {err}", path.display())))
}

/// Reads `TRO` rows into vehicles. Ids are 1-based in the file and
/// normalised to a dense 0-based range here; gaps are a structural error.
pub fn read_vehicles(path: &Path) -> VltResult<Vec<Vehicle>> {
    let mut reader = open_csv(path)?;
    let mut vehicles = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let line = index as u64 + 1;
        let record = record.map_err(|err| VltError::Parse(format!("line {line}: {err}")))?;
        if record.get(0) != Some("TRO") {
            continue;
        }
        let raw_id: usize = field(&record, 1, line)?
            .parse()
            .map_err(|_| VltError::Parse(format!("line {line}: bad vehicle id")))?;
        if raw_id == 0 {
            return Err(VltError::Parse(format!(
                "line {line}: vehicle ids are 1-based"
            )));
        }
        let origin = with_line(parse_location(field(&record, 4, line)?), line)?;
        let destination = with_line(parse_location(field(&record, 5, line)?), line)?;
        let available = with_line(parse_day(field(&record, 6, line)?), line)?;
        let due = with_line(parse_day(field(&record, 8, line)?), line)?;
        vehicles.push(Vehicle {
            id: raw_id - 1,
            origin,
            destination,
            available,
            due,
        });
    }
    vehicles.sort_by_key(|v| v.id);
    for (index, vehicle) in vehicles.iter().enumerate() {
        if vehicle.id != index {
            return Err(VltError::Validation(format!(
                "vehicle ids are not dense: expected {index}, found {}",
                vehicle.id
            )));
        }
    }
    Ok(vehicles)
}

/// Reads `PLT` rows into trucks, collecting newly seen locations into
/// `locations` in order of first appearance. Works for planned and realised
/// capacity files alike.
pub fn read_trucks(
    path: &Path,
    locations: &mut Vec<Location>,
) -> VltResult<BTreeMap<TruckId, Truck>> {
    let mut reader = open_csv(path)?;
    let mut trucks = BTreeMap::new();
    for (index, record) in reader.records().enumerate() {
        let line = index as u64 + 1;
        let record = record.map_err(|err| VltError::Parse(format!("line {line}: {err}")))?;
        if record.get(0) != Some("PLT") {
            continue;
        }
        let (start, end, ordinal) = with_line(parse_segment(field(&record, 3, line)?), line)?;
        let departure = with_line(parse_day(field(&record, 4, line)?), line)?;
        let arrival = with_line(parse_day(field(&record, 5, line)?), line)?;
        if arrival < departure {
            return Err(VltError::Parse(format!(
                "line {line}: truck arrives before it departs"
            )));
        }
        let capacity = with_line(parse_count(field(&record, 6, line)?, "capacity"), line)?;
        let price = with_line(parse_count(field(&record, 7, line)?, "price"), line)?;
        for location in [&start, &end] {
            if !locations.contains(location) {
                locations.push(location.clone());
            }
        }
        let truck = Truck {
            start,
            end,
            departure,
            arrival,
            ordinal,
            capacity,
            price,
        };
        trucks.insert(truck.id(), truck);
    }
    Ok(trucks)
}

/// Reads capacity-history observations (`capacity_history.csv`): segment,
/// departure, capacity and price per row, no arrival.
pub fn read_history(path: &Path) -> VltResult<Vec<CapacityObservation>> {
    let mut reader = open_csv(path)?;
    let mut observations = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let line = index as u64 + 1;
        let record = record.map_err(|err| VltError::Parse(format!("line {line}: {err}")))?;
        match record.get(0) {
            None | Some("") | Some("#PathSegment") => continue,
            Some(segment) => {
                let (start, end, ordinal) = with_line(parse_segment(segment), line)?;
                let departure = with_line(parse_day(field(&record, 2, line)?), line)?;
                let capacity =
                    with_line(parse_count(field(&record, 3, line)?, "capacity"), line)?;
                let price = with_line(parse_count(field(&record, 4, line)?, "price"), line)?;
                observations.push(CapacityObservation {
                    start,
                    end,
                    ordinal,
                    departure,
                    capacity,
                    price,
                });
            }
        }
    }
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_location_codes() {
        let plant = parse_location("GER01PLANT").unwrap();
        assert_eq!(plant.code, "GER01");
        assert_eq!(plant.kind, LocationKind::Plant);
        let dealer = parse_location("ITA01DEAL").unwrap();
        assert_eq!(dealer.kind, LocationKind::Dealer);
        assert!(parse_location("GER01").is_err());
        assert!(parse_location("GER01HOUSE").is_err());
    }

    #[test]
    fn test_parse_segment_truck_and_train() {
        let (start, end, ordinal) = parse_segment("GER01PLANTITA01DEAL-TRUCK-2").unwrap();
        assert_eq!(start.code, "GER01");
        assert_eq!(end.code, "ITA01");
        assert_eq!(ordinal, 2);
        let (_, _, train_ordinal) = parse_segment("GER01PLANTITA01DEAL-TRAIN-2").unwrap();
        assert_eq!(train_ordinal, 12);
        assert!(parse_segment("GER01PLANTITA01DEAL-BARGE-1").is_err());
        assert!(parse_segment("GER01PLANTITA01DEAL-TRUCK").is_err());
    }

    #[test]
    fn test_read_vehicles() {
        let file = write_file(concat!(
            "HDR;x;y\n",
            "TRO;1;a;b;GER01PLANT;ITA01DEAL;01/01/2025-10:00:00;x;05/01/2025-00:00:00\n",
            "TRO;2;a;b;GER01PLANT;ITA01DEAL;02/01/2025-10:00:00;x;06/01/2025-00:00:00\n",
        ));
        let vehicles = read_vehicles(file.path()).unwrap();
        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[0].id, 0);
        assert_eq!(vehicles[0].available, Day::from_ymd(2025, 1, 1).unwrap());
        assert_eq!(vehicles[1].due, Day::from_ymd(2025, 1, 6).unwrap());
    }

    #[test]
    fn test_read_vehicles_rejects_gap_in_ids() {
        let file = write_file(concat!(
            "TRO;1;a;b;GER01PLANT;ITA01DEAL;01/01/2025-10:00:00;x;05/01/2025-00:00:00\n",
            "TRO;3;a;b;GER01PLANT;ITA01DEAL;01/01/2025-10:00:00;x;05/01/2025-00:00:00\n",
        ));
        assert!(matches!(
            read_vehicles(file.path()),
            Err(VltError::Validation(_))
        ));
    }

    #[test]
    fn test_read_trucks() {
        let file = write_file(concat!(
            "PLT;x;y;GER01PLANTITA01DEAL-TRUCK-1;02/01/2025-08:00:00;04/01/2025-18:00:00;8.0;450.0\n",
            "PLT;x;y;GER01PLANTITA01DEAL-TRAIN-1;02/01/2025-08:00:00;05/01/2025-18:00:00;20.0;0.0\n",
            "OTHER;ignored\n",
        ));
        let mut locations = Vec::new();
        let trucks = read_trucks(file.path(), &mut locations).unwrap();
        assert_eq!(trucks.len(), 2);
        assert_eq!(locations.len(), 2);
        let road = trucks.values().find(|t| t.ordinal == 1).unwrap();
        assert_eq!(road.capacity, 8);
        assert_eq!(road.price, 450);
        assert!(trucks.values().any(|t| t.ordinal == 11));
    }

    #[test]
    fn test_read_trucks_rejects_negative_capacity() {
        let file = write_file(
            "PLT;x;y;GER01PLANTITA01DEAL-TRUCK-1;02/01/2025-08:00:00;04/01/2025-18:00:00;-3.0;450.0\n",
        );
        let mut locations = Vec::new();
        let result = read_trucks(file.path(), &mut locations);
        assert!(matches!(result, Err(VltError::Parse(message)) if message.contains("negative")));
    }

    #[test]
    fn test_read_trucks_rejects_backwards_dates() {
        let file = write_file(
            "PLT;x;y;GER01PLANTITA01DEAL-TRUCK-1;05/01/2025-08:00:00;04/01/2025-18:00:00;3.0;450.0\n",
        );
        let mut locations = Vec::new();
        let result = read_trucks(file.path(), &mut locations);
        assert!(matches!(result, Err(VltError::Parse(message)) if message.contains("before")));
    }

    #[test]
    fn test_read_history() {
        let file = write_file(concat!(
            "#PathSegment;header;row\n",
            "GER01PLANTITA01DEAL-TRUCK-1;x;03/01/2025-08:00:00;7.0;450.0\n",
            "GER01PLANTITA01DEAL-TRUCK-1;x;10/01/2025-08:00:00;9.0;450.0\n",
        ));
        let observations = read_history(file.path()).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].capacity, 7);
        // Both observations fall on the same weekday.
        assert_eq!(
            observations[0].departure.weekday().unwrap(),
            observations[1].departure.weekday().unwrap()
        );
    }
}
