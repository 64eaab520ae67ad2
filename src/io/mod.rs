//! # Track readers
//!
//! Three input formats, each driven by an explicit, `serde`-deserializable
//! descriptor:
//!
//! | Format | Descriptor | Reader |
//! |--------|------------|--------|
//! | delimited text | [`TrackFormat`] | [`read_csv`] |
//! | GPX | [`GpxFormat`] | [`gpx::read_gpx`] |
//! | WKT column | [`WktFormat`] | [`wkt::read_wkt`] |
//!
//! [`read_tracks`] dispatches on an [`InputFormat`] and accepts a file or a
//! directory (every file of the directory with a matching extension, in name
//! order).
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::constants::NAN;
use crate::coords::{Coord, CoordKind};
use crate::observation::Observation;
use crate::time::{default_format, FormatContext, Timestamp};
use crate::track::{Track, TrackCollection};
use crate::tracklib_errors::TrackError;

pub mod gpx;
pub mod wkt;

pub use gpx::{read_gpx, GpxFormat};
pub use wkt::{parse_wkt, read_wkt, WktFormat};

/// Column layout of a delimited text file.
///
/// ```toml
/// id_e = 1
/// id_n = 2
/// id_t = 0
/// separator = ";"
/// header = 1
/// srid = "GEO"
/// read_all = true
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackFormat {
    /// Column of E, X or longitude
    pub id_e: usize,
    /// Column of N, Y or latitude
    pub id_n: usize,
    /// Column of U, Z or height, 0 when absent
    pub id_u: Option<usize>,
    /// Timestamp column, epoch (Unix 0) when absent
    pub id_t: Option<usize>,
    /// Number of header lines. Feature names come from the last one.
    pub header: usize,
    pub comment: Option<char>,
    pub separator: char,
    /// Value read as no-data in feature columns
    pub no_data: Option<f64>,
    pub srid: CoordKind,
    /// Read pattern of the timestamp column, the thread default otherwise
    pub time_pattern: Option<String>,
    /// Turn every other column into a feature
    pub read_all: bool,
}

impl Default for TrackFormat {
    fn default() -> Self {
        TrackFormat {
            id_e: 0,
            id_n: 1,
            id_u: None,
            id_t: None,
            header: 0,
            comment: Some('#'),
            separator: ',',
            no_data: None,
            srid: CoordKind::Enu,
            time_pattern: None,
            read_all: false,
        }
    }
}

impl TrackFormat {
    fn format_context(&self) -> FormatContext {
        match &self.time_pattern {
            Some(p) => FormatContext::new(p, p),
            None => default_format(),
        }
    }

    fn validate(&self) -> Result<(), TrackError> {
        let mut used = vec![self.id_e, self.id_n];
        used.extend(self.id_u);
        used.extend(self.id_t);
        used.sort_unstable();
        if used.windows(2).any(|w| w[0] == w[1]) {
            return Err(TrackError::wrong("two coordinate columns share the same index"));
        }
        if !self.separator.is_ascii() {
            return Err(TrackError::wrong(format!(
                "separator '{}' is not a single byte",
                self.separator
            )));
        }
        Ok(())
    }

    fn is_reserved(&self, col: usize) -> bool {
        col == self.id_e || col == self.id_n || Some(col) == self.id_u || Some(col) == self.id_t
    }
}

/// Reader selection for [`read_tracks`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputFormat {
    Csv(TrackFormat),
    Gpx(GpxFormat),
    Wkt(WktFormat),
}

impl InputFormat {
    /// Default descriptor for a file extension (`csv`, `txt`, `dat`, `gpx`, `wkt`).
    pub fn from_extension(path: &Utf8Path) -> Result<Self, TrackError> {
        match path.extension().map(str::to_ascii_lowercase).as_deref() {
            Some("csv" | "txt" | "dat") => Ok(InputFormat::Csv(TrackFormat::default())),
            Some("gpx") => Ok(InputFormat::Gpx(GpxFormat::default())),
            Some("wkt") => Ok(InputFormat::Wkt(WktFormat::default())),
            _ => Err(TrackError::wrong(format!("no reader for '{path}'"))),
        }
    }

    fn accepts(&self, path: &Utf8Path) -> bool {
        let ext = path.extension().map(str::to_ascii_lowercase);
        match self {
            InputFormat::Csv(_) => matches!(ext.as_deref(), Some("csv" | "txt" | "dat")),
            InputFormat::Gpx(_) => ext.as_deref() == Some("gpx"),
            InputFormat::Wkt(_) => matches!(ext.as_deref(), Some("wkt" | "csv" | "txt")),
        }
    }
}

/// Files of `path`: the file itself, or the matching files of a directory in name order.
pub(crate) fn input_files(
    path: &Utf8Path,
    accepts: impl Fn(&Utf8Path) -> bool,
) -> Result<Vec<Utf8PathBuf>, TrackError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in path.read_dir_utf8()? {
        let entry = entry?;
        if entry.path().is_file() && accepts(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    debug!(dir = %path, files = files.len(), "reading directory");
    Ok(files)
}

/// Read a file or a directory with the given format.
pub fn read_tracks(path: &Utf8Path, format: &InputFormat) -> Result<TrackCollection, TrackError> {
    let mut out = TrackCollection::new();
    for file in input_files(path, |p| format.accepts(p))? {
        match format {
            InputFormat::Csv(f) => out.add(read_csv(&file, f)?),
            InputFormat::Gpx(f) => out.extend(read_gpx(&file, f)?),
            InputFormat::Wkt(f) => out.extend(read_wkt(&file, f)?),
        }
    }
    Ok(out)
}

fn field<'r>(record: &'r StringRecord, col: usize, path: &Utf8Path) -> Result<&'r str, TrackError> {
    record.get(col).ok_or_else(|| {
        TrackError::parse(
            path.as_str(),
            line_of(record),
            format!("missing column {col} ({} found)", record.len()),
        )
    })
}

fn number(record: &StringRecord, col: usize, path: &Utf8Path) -> Result<f64, TrackError> {
    let raw = field(record, col, path)?;
    raw.parse::<f64>().map_err(|e| {
        TrackError::parse(path.as_str(), line_of(record), format!("column {col}: '{raw}': {e}"))
    })
}

pub(crate) fn line_of(record: &StringRecord) -> usize {
    record.position().map_or(0, |p| p.line() as usize)
}

/// Read one track from a delimited text file.
///
/// Arguments
/// -----------------
/// * `path`: the file. Its stem becomes the track identifier.
/// * `format`: column layout.
///
/// Return
/// ----------
/// * The track. Feature columns (with `read_all`) are numeric, cells equal to
///   `no_data` or not parseable as a number are no-data.
/// * [`TrackError::Parse`] with the file line for a malformed coordinate or
///   timestamp, [`TrackError::WrongArgument`] for an inconsistent layout.
pub fn read_csv(path: &Utf8Path, format: &TrackFormat) -> Result<Track, TrackError> {
    format.validate()?;
    let ctx = format.format_context();
    let mut reader = ReaderBuilder::new()
        .delimiter(format.separator as u8)
        .comment(format.comment.map(|c| c as u8))
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut names: Vec<String> = Vec::new();
    let mut observations = Vec::new();
    let mut columns: Vec<(usize, Vec<f64>)> = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let record = record?;
        if i < format.header {
            names = record.iter().map(str::to_string).collect();
            continue;
        }
        if record.iter().all(str::is_empty) {
            debug!(path = %path, line = line_of(&record), "skipping empty line");
            continue;
        }

        let e = number(&record, format.id_e, path)?;
        let n = number(&record, format.id_n, path)?;
        let u = match format.id_u {
            Some(col) => number(&record, col, path)?,
            None => 0.0,
        };
        let timestamp = match format.id_t {
            Some(col) => ctx.parse_or_unix(field(&record, col, path)?).map_err(|err| {
                TrackError::parse(path.as_str(), line_of(&record), err.to_string())
            })?,
            None => Timestamp::zero(),
        };
        observations.push(Observation::new(Coord::of_kind(format.srid, e, n, u), timestamp));

        if format.read_all {
            if columns.is_empty() {
                columns = (0..record.len())
                    .filter(|&c| !format.is_reserved(c))
                    .map(|c| (c, Vec::new()))
                    .collect();
            }
            for (col, values) in columns.iter_mut() {
                let v = record
                    .get(*col)
                    .and_then(|raw| raw.parse::<f64>().ok())
                    .filter(|v| Some(*v) != format.no_data)
                    .unwrap_or(NAN);
                values.push(v);
            }
        }
    }

    let stem = path.file_stem().unwrap_or("0");
    let mut track = Track::with_ids(observations, stem, stem);
    for (col, values) in columns {
        let name = names.get(col).cloned().unwrap_or_else(|| format!("col{col}"));
        if track.has_feature(&name) {
            warn!(path = %path, feature = %name, "duplicate column name, later column dropped");
            continue;
        }
        track.set_feature(&name, values)?;
    }
    debug!(path = %path, size = track.size(), features = track.feature_names().len(), "csv track read");
    Ok(track)
}

/// Read every file of a directory (or one file) with [`read_csv`].
pub fn read_csv_dir(path: &Utf8Path, format: &TrackFormat) -> Result<TrackCollection, TrackError> {
    read_tracks(path, &InputFormat::Csv(format.clone()))
}

pub(crate) fn read_text(path: &Utf8Path) -> Result<String, TrackError> {
    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod io_test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::tracklib_errors::ErrorKind;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_csv_with_features() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "walk.csv",
            "# exported track\ntime;x;y;hr;z\n01/01/2018 10:00:00;1.0;2.0;80;5\n01/01/2018 10:00:10;2.0;4.0;-1;6\n",
        );
        let format = TrackFormat {
            id_e: 1,
            id_n: 2,
            id_u: Some(4),
            id_t: Some(0),
            header: 1,
            separator: ';',
            no_data: Some(-1.0),
            read_all: true,
            ..TrackFormat::default()
        };
        let track = read_csv(&path, &format).unwrap();
        assert_eq!(track.size(), 2);
        assert_eq!(track.tid, "walk");
        assert_eq!(track.z(), vec![5.0, 6.0]);
        assert_abs_diff_eq!(track.duration(), 10.0, epsilon = 1e-9);
        let hr = track.get_feature("hr").unwrap();
        assert_eq!(hr[0], 80.0);
        assert!(hr[1].is_nan());
        assert_eq!(track.feature_names(), &["hr".to_string()]);
    }

    #[test]
    fn test_missing_time_column_defaults_to_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "a.csv", "0,0\n3,4\n");
        let track = read_csv(&path, &TrackFormat::default()).unwrap();
        assert_eq!(track.length(), 5.0);
        assert!(track.t().iter().all(|&t| t == 0.0));
    }

    #[test]
    fn test_parse_error_has_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "bad.csv", "0,0\n1,oops\n");
        match read_csv(&path, &TrackFormat::default()).unwrap_err() {
            TrackError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_layout_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "a.csv", "0,0\n");
        let format = TrackFormat {
            id_n: 0,
            ..TrackFormat::default()
        };
        assert_eq!(read_csv(&path, &format).unwrap_err().kind(), ErrorKind::WrongArgument);
    }

    #[test]
    fn test_read_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "b.csv", "0,0\n1,1\n");
        write(&dir, "a.csv", "0,0\n");
        write(&dir, "notes.md", "ignored");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let tracks = read_csv_dir(&root, &TrackFormat::default()).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks.get(0).unwrap().tid, "a");
        assert_eq!(tracks.get(1).unwrap().size(), 2);
    }

    #[test]
    fn test_format_from_extension() {
        assert!(matches!(
            InputFormat::from_extension(Utf8Path::new("x.GPX")).unwrap(),
            InputFormat::Gpx(_)
        ));
        assert!(InputFormat::from_extension(Utf8Path::new("x.bin")).is_err());
    }
}
