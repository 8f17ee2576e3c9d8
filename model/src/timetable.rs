use anyhow::Result;

use gtfs::StopID;

/// A rail timetable for one agency and direction, as published.
///
/// Row 0 holds stop IDs, one per (arrival, departure) column pair starting at column 2. Row 1
/// labels each column as arrival or departure. Every following row is one trip: the route's
/// relation ID, a trip number token, then the (arrival, departure) pairs as "HH:MM", possibly
/// blank.
#[derive(Clone, Debug)]
pub struct Timetable {
    stop_header: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// One trip from the table
pub struct TimetableRow<'a> {
    pub relation_id: &'a str,
    pub token: &'a str,
    cells: &'a [String],
}

/// The raw cells for one stop of one trip. Blank cells are None.
#[derive(Debug, PartialEq)]
pub struct StopCells<'a> {
    pub stop_id: StopID,
    pub arrival: Option<&'a str>,
    pub departure: Option<&'a str>,
}

pub fn load<R: std::io::Read>(reader: R) -> Result<Timetable> {
    let mut records = Vec::new();
    for rec in csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
        .records()
    {
        let rec = rec?;
        records.push(rec.iter().map(|x| x.to_string()).collect::<Vec<String>>());
    }
    Timetable::new(records)
}

impl Timetable {
    pub fn new(records: Vec<Vec<String>>) -> Result<Self> {
        let mut records = records.into_iter();
        let (stop_header, markers) = match (records.next(), records.next()) {
            (Some(stops), Some(markers)) => (stops, markers),
            _ => bail!("Timetable needs a stop row and an arrival/departure row"),
        };
        let rows = records.collect();
        if stop_header.len() < 2 || markers.len() < 2 {
            bail!(
                "Timetable header rows have {} and {} columns",
                stop_header.len(),
                markers.len()
            );
        }
        Ok(Self { stop_header, rows })
    }

    pub fn num_trips(&self) -> usize {
        self.rows.len()
    }

    /// Rows belonging to one route. Rows too short to have a trip token are skipped.
    pub fn rows_for<'a>(&'a self, relation_id: &'a str) -> impl Iterator<Item = TimetableRow<'a>> {
        self.rows.iter().filter_map(move |row| {
            if row.len() < 2 || row[0] != relation_id {
                return None;
            }
            Some(TimetableRow {
                relation_id: &row[0],
                token: &row[1],
                cells: &row[2..],
            })
        })
    }

    /// The stop for the pair of columns starting at `col`. The ID may be written over either
    /// column of the pair.
    fn stop_at(&self, col: usize) -> Option<StopID> {
        [col, col + 1]
            .into_iter()
            .filter_map(|c| self.stop_header.get(c))
            .find(|x| !x.is_empty())
            .map(|x| StopID::new(x.clone()))
    }

    /// Every stop this trip records, in table order. Stops with both cells blank are left out.
    pub fn stop_cells<'a>(&'a self, row: &TimetableRow<'a>) -> Vec<StopCells<'a>> {
        let num_cols = self.stop_header.len().max(row.cells.len() + 2);
        let mut results = Vec::new();
        let cells: &'a [String] = row.cells;
        let mut col = 2;
        while col < num_cols {
            let cell = |c: usize| -> Option<&'a str> {
                cells
                    .get(c - 2)
                    .map(|x| x.as_str())
                    .filter(|x| !x.is_empty())
            };
            let arrival = cell(col);
            let departure = cell(col + 1);
            if arrival.is_some() || departure.is_some() {
                match self.stop_at(col) {
                    Some(stop_id) => results.push(StopCells {
                        stop_id,
                        arrival,
                        departure,
                    }),
                    None => {
                        warn!(
                            "Timetable trip {} has times in column {col} with no stop",
                            row.token
                        );
                    }
                }
            }
            col += 2;
        }
        results
    }
}
