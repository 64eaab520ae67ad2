//! Well-known-text reader: one track per line of a delimited file, the
//! geometry column holding a `LINESTRING`, `POLYGON` (outer ring kept) or
//! `MULTIPOLYGON` (first ring of the first polygon kept).
use camino::Utf8Path;
use csv::{ReaderBuilder, Trim};
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map, opt},
    multi::separated_list1,
    number::complete::double,
    sequence::{delimited, preceded},
    IResult, Parser,
};
use serde::Deserialize;
use tracing::debug;

use super::{input_files, line_of};
use crate::coords::{Coord, CoordKind};
use crate::observation::Observation;
use crate::time::Timestamp;
use crate::track::{Track, TrackCollection};
use crate::tracklib_errors::TrackError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WktFormat {
    pub id_geom: usize,
    /// Column of the user identifier, the line number otherwise
    pub id_user: Option<usize>,
    /// Column of the track identifier, the line number otherwise
    pub id_track: Option<usize>,
    pub separator: char,
    pub header: usize,
    pub srid: CoordKind,
}

impl Default for WktFormat {
    fn default() -> Self {
        WktFormat {
            id_geom: 0,
            id_user: None,
            id_track: None,
            separator: ';',
            header: 0,
            srid: CoordKind::Enu,
        }
    }
}

type Vertex = (f64, f64, f64);

fn vertex(input: &str) -> IResult<&str, Vertex> {
    map(
        (
            double,
            preceded(multispace1, double),
            opt(preceded(multispace1, double)),
        ),
        |(x, y, z)| (x, y, z.unwrap_or(0.0)),
    )
    .parse(input)
}

fn comma(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0).parse(input)
}

fn parens<'a, O>(
    inner: impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>> {
    delimited(
        (multispace0, char('('), multispace0),
        inner,
        (multispace0, char(')')),
    )
}

fn ring(input: &str) -> IResult<&str, Vec<Vertex>> {
    parens(separated_list1(comma, vertex)).parse(input)
}

fn polygon_body(input: &str) -> IResult<&str, Vec<Vec<Vertex>>> {
    parens(separated_list1(comma, ring)).parse(input)
}

fn geometry(input: &str) -> IResult<&str, Vec<Vertex>> {
    alt((
        preceded(tag_no_case("LINESTRING"), ring),
        map(preceded(tag_no_case("MULTIPOLYGON"), parens(separated_list1(comma, polygon_body))), |mut polygons| {
            polygons.swap_remove(0).swap_remove(0)
        }),
        map(preceded(tag_no_case("POLYGON"), polygon_body), |mut rings| rings.swap_remove(0)),
    ))
    .parse(input)
}

/// Vertices `(x, y, z)` of a WKT geometry, `z` being 0 for 2D coordinates.
pub fn parse_wkt(text: &str) -> Result<Vec<(f64, f64, f64)>, TrackError> {
    all_consuming(delimited(multispace0, geometry, multispace0))
        .parse(text)
        .map(|(_, v)| v)
        .map_err(|e| TrackError::wrong(format!("invalid WKT geometry: {e}")))
}

/// Read one track per line of a WKT file, or of every `.wkt` file of a directory.
///
/// Observations are stamped at the epoch.
pub fn read_wkt(path: &Utf8Path, format: &WktFormat) -> Result<TrackCollection, TrackError> {
    if !format.separator.is_ascii() {
        return Err(TrackError::wrong(format!(
            "separator '{}' is not a single byte",
            format.separator
        )));
    }
    let mut out = TrackCollection::new();
    for file in input_files(path, |p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("wkt")))? {
        let mut reader = ReaderBuilder::new()
            .delimiter(format.separator as u8)
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_path(&file)?;
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            if i < format.header || record.iter().all(str::is_empty) {
                continue;
            }
            let line = line_of(&record);
            let geom = record.get(format.id_geom).ok_or_else(|| {
                TrackError::parse(file.as_str(), line, format!("missing column {}", format.id_geom))
            })?;
            let vertices = parse_wkt(geom)
                .map_err(|e| TrackError::parse(file.as_str(), line, e.to_string()))?;
            let id = |col: Option<usize>| {
                col.and_then(|c| record.get(c))
                    .map_or_else(|| line.to_string(), str::to_string)
            };
            let observations = vertices
                .into_iter()
                .map(|(x, y, z)| Observation::new(Coord::of_kind(format.srid, x, y, z), Timestamp::zero()))
                .collect();
            out.add(Track::with_ids(observations, &id(format.id_user), &id(format.id_track)));
        }
        debug!(path = %file, tracks = out.len(), "wkt file read");
    }
    Ok(out)
}
