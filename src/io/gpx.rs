//! GPX reader built on the `quick-xml` pull parser.
//!
//! Each `<trk>` (or `<rte>`) becomes one track of geodetic observations. The
//! `lon` / `lat` attributes give the position, `<ele>` the height (0 when
//! absent) and `<time>` the ISO 8601 timestamp. A point without `<time>` repeats the
//! previous timestamp (the first one of the track for leading points, the epoch
//! for a track without any time). Leaf
//! elements below `<extensions>` become features: numeric when every value
//! parses as a number, text otherwise.
use std::collections::BTreeMap;
use std::str::FromStr;

use camino::Utf8Path;
use hifitime::Epoch;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{input_files, read_text};
use crate::constants::NAN;
use crate::coords::Coord;
use crate::observation::Observation;
use crate::time::Timestamp;
use crate::track::{FeatureColumn, Track, TrackCollection};
use crate::tracklib_errors::TrackError;

/// Which GPX tree is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpxSource {
    /// `<trk>/<trkseg>/<trkpt>`, one track per `<trk>`
    #[default]
    Track,
    /// `<rte>/<rtept>`, one track per `<rte>`
    Route,
    /// every `<wpt>` of the file as a single track
    Waypoint,
}

impl GpxSource {
    fn container(&self) -> &'static [u8] {
        match self {
            GpxSource::Track => b"trk",
            GpxSource::Route => b"rte",
            GpxSource::Waypoint => b"gpx",
        }
    }

    fn point(&self) -> &'static [u8] {
        match self {
            GpxSource::Track => b"trkpt",
            GpxSource::Route => b"rtept",
            GpxSource::Waypoint => b"wpt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GpxFormat {
    pub source: GpxSource,
    pub read_extensions: bool,
}

impl Default for GpxFormat {
    fn default() -> Self {
        GpxFormat {
            source: GpxSource::Track,
            read_extensions: true,
        }
    }
}

#[derive(Default)]
struct Point {
    lon: f64,
    lat: f64,
    ele: f64,
    time: Option<Timestamp>,
    extensions: Vec<(String, String)>,
}

#[derive(Default)]
struct Container {
    name: Option<String>,
    points: Vec<Point>,
}

enum Target {
    Nothing,
    Name,
    Ele,
    Time,
    Extension(String),
}

fn line_at(xml: &str, offset: u64) -> usize {
    let end = (offset as usize).min(xml.len());
    xml.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

fn coordinate(e: &BytesStart<'_>, key: &str) -> Result<Option<f64>, TrackError> {
    let Some(attr) = e.try_get_attribute(key).map_err(quick_xml::Error::from)? else {
        return Ok(None);
    };
    Ok(attr.unescape_value()?.trim().parse::<f64>().ok())
}

fn open_point(e: &BytesStart<'_>) -> Result<Option<Point>, TrackError> {
    match (coordinate(e, "lon")?, coordinate(e, "lat")?) {
        (Some(lon), Some(lat)) => Ok(Some(Point {
            lon,
            lat,
            ..Point::default()
        })),
        _ => Ok(None),
    }
}

fn build_track(container: Container, uid: &str, rank: usize) -> Result<Track, TrackError> {
    let mut names: Vec<String> = Vec::new();
    for p in &container.points {
        for (name, _) in &p.extensions {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }

    let tid = container.name.unwrap_or_else(|| rank.to_string());
    // untimed points repeat the previous timestamp, leading ones the first known
    let first_known = container.points.iter().find_map(|p| p.time);
    let mut current = first_known.unwrap_or_else(Timestamp::zero);
    let mut untimed = 0;
    let observations = container
        .points
        .iter()
        .map(|p| {
            match p.time {
                Some(t) => current = t,
                None => untimed += 1,
            }
            Observation::new(Coord::geo(p.lon, p.lat, p.ele), current)
        })
        .collect();
    if untimed > 0 && first_known.is_some() {
        warn!(%tid, untimed, "points without <time> take the previous timestamp");
    }
    let mut track = Track::with_ids(observations, uid, &tid);

    let n = container.points.len();
    for name in names {
        let raw: BTreeMap<usize, String> = container
            .points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                p.extensions
                    .iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| (i, v.clone()))
            })
            .collect();
        let numeric = raw.values().all(|v| v.trim().parse::<f64>().is_ok());
        let column = if numeric {
            let mut values = vec![NAN; n];
            for (i, v) in &raw {
                values[*i] = v.trim().parse().unwrap_or(NAN);
            }
            FeatureColumn::Float(values)
        } else {
            FeatureColumn::Text { len: n, values: raw }
        };
        track.set_feature_column(&name, column)?;
    }
    Ok(track)
}

fn parse_gpx(xml: &str, path: &Utf8Path, format: &GpxFormat) -> Result<Vec<Track>, TrackError> {
    let uid = path.file_stem().unwrap_or("0");
    let container_tag = format.source.container();
    let point_tag = format.source.point();

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut tracks = Vec::new();
    let mut container: Option<Container> = None;
    let mut point: Option<Point> = None;
    let mut target = Target::Nothing;
    let mut in_extensions = false;
    let (mut depth, mut container_depth) = (0usize, 0usize);

    loop {
        let event = reader.read_event().map_err(|e| {
            TrackError::parse(path.as_str(), line_at(xml, reader.buffer_position()), e.to_string())
        })?;
        match event {
            Event::Start(e) => {
                depth += 1;
                let local = e.local_name();
                let tag = local.as_ref();
                if tag == container_tag {
                    container = Some(Container::default());
                    container_depth = depth;
                } else if tag == point_tag && container.is_some() {
                    point = open_point(&e)?;
                } else if point.is_some() {
                    target = match tag {
                        b"ele" => Target::Ele,
                        b"time" => Target::Time,
                        b"extensions" => {
                            in_extensions = true;
                            Target::Nothing
                        }
                        other if in_extensions && format.read_extensions => {
                            Target::Extension(String::from_utf8_lossy(other).into_owned())
                        }
                        _ => Target::Nothing,
                    };
                } else if tag == b"name" && container.is_some() && depth == container_depth + 1 {
                    target = Target::Name;
                }
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == point_tag {
                    if let (Some(c), Some(p)) = (container.as_mut(), open_point(&e)?) {
                        c.points.push(p);
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                match (&target, point.as_mut(), container.as_mut()) {
                    (Target::Ele, Some(p), _) => p.ele = text.trim().parse().unwrap_or(0.0),
                    (Target::Time, Some(p), _) => {
                        let epoch = Epoch::from_str(text.trim()).map_err(|e| {
                            TrackError::parse(
                                path.as_str(),
                                line_at(xml, reader.buffer_position()),
                                format!("invalid time '{text}': {e}"),
                            )
                        })?;
                        p.time = Some(Timestamp::from_epoch(epoch));
                    }
                    (Target::Extension(name), Some(p), _) => p.extensions.push((name.clone(), text)),
                    (Target::Name, None, Some(c)) => c.name = Some(text),
                    _ => {}
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let local = e.local_name();
                let tag = local.as_ref();
                if tag == point_tag {
                    if let (Some(c), Some(p)) = (container.as_mut(), point.take()) {
                        c.points.push(p);
                    }
                    in_extensions = false;
                } else if tag == container_tag {
                    if let Some(c) = container.take() {
                        tracks.push(build_track(c, uid, tracks.len())?);
                    }
                } else if tag == b"extensions" {
                    in_extensions = false;
                }
                target = Target::Nothing;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    debug!(path = %path, tracks = tracks.len(), "gpx file read");
    Ok(tracks)
}

/// Read a GPX file, or every `.gpx` file of a directory in name order.
///
/// Return
/// ----------
/// * One track per `<trk>` / `<rte>` (or one for all waypoints). Track `uid`
///   is the file stem, `tid` the `<name>` of the tree or its rank in the file.
/// * [`TrackError::Parse`] with the line of malformed XML or of an invalid `<time>`.
pub fn read_gpx(path: &Utf8Path, format: &GpxFormat) -> Result<TrackCollection, TrackError> {
    let mut out = TrackCollection::new();
    for file in input_files(path, |p| {
        p.extension().is_some_and(|e| e.eq_ignore_ascii_case("gpx"))
    })? {
        let xml = read_text(&file)?;
        out.extend(parse_gpx(&xml, &file, format)?);
    }
    Ok(out)
}
