//! ESRI ASCII grid (`.asc`) reader and writer.
//!
//! ```text
//! ncols         4
//! nrows         2
//! xllcorner     0.0
//! yllcorner     0.0
//! cellsize      10.0
//! NODATA_value  -999999
//! 1 2 3 4
//! 5 6 7 8
//! ```
//!
//! Row 0 of the body is the top of the grid. Non-square cells are written with
//! `dx` / `dy` lines in place of `cellsize`, and read back the same way.
use std::fs;

use camino::Utf8Path;
use nalgebra::DMatrix;
use nom::{
    bytes::complete::take_while,
    character::complete::{alpha1, space0, space1},
    combinator::recognize,
    number::complete::double,
    sequence::{delimited, pair, separated_pair},
    IResult, Parser,
};

use super::AfMap;
use crate::constants::NO_DATA_VALUE;
use crate::tracklib_errors::TrackError;

fn header_line(input: &str) -> IResult<&str, (&str, f64)> {
    delimited(
        space0,
        separated_pair(
            recognize(pair(alpha1, take_while(|c: char| c.is_alphanumeric() || c == '_'))),
            space1,
            double,
        ),
        space0,
    )
    .parse(input)
}

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<f64>,
    yll: Option<f64>,
    dx: Option<f64>,
    dy: Option<f64>,
    no_data: Option<f64>,
}

/// Read an ASC grid; the map is named after the file stem.
pub fn read_asc(path: &Utf8Path) -> Result<AfMap, TrackError> {
    let content = fs::read_to_string(path)?;
    let err = |line: usize, msg: String| TrackError::parse(path.as_str(), line, msg);

    let mut header = Header::default();
    let mut lines = content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()).peekable();
    while let Some(&(no, line)) = lines.peek() {
        let Ok((rest, (key, value))) = header_line(line) else {
            break;
        };
        if !rest.is_empty() {
            return Err(err(no + 1, format!("trailing characters in header: '{rest}'")));
        }
        match key.to_ascii_lowercase().as_str() {
            "ncols" => header.ncols = Some(value as usize),
            "nrows" => header.nrows = Some(value as usize),
            "xllcorner" | "xllcenter" => header.xll = Some(value),
            "yllcorner" | "yllcenter" => header.yll = Some(value),
            "cellsize" => {
                header.dx = Some(value);
                header.dy = Some(value);
            }
            "dx" => header.dx = Some(value),
            "dy" => header.dy = Some(value),
            "nodata_value" => header.no_data = Some(value),
            other => return Err(err(no + 1, format!("unknown header key '{other}'"))),
        }
        lines.next();
    }

    let missing = |what: &str| err(0, format!("missing '{what}' in header"));
    let ncols = header.ncols.ok_or_else(|| missing("ncols"))?;
    let nrows = header.nrows.ok_or_else(|| missing("nrows"))?;
    let x_min = header.xll.ok_or_else(|| missing("xllcorner"))?;
    let y_min = header.yll.ok_or_else(|| missing("yllcorner"))?;
    let dx = header.dx.ok_or_else(|| missing("cellsize"))?;
    let dy = header.dy.ok_or_else(|| missing("cellsize"))?;
    let no_data = header.no_data.unwrap_or(NO_DATA_VALUE);

    let mut values = Vec::with_capacity(nrows * ncols);
    let mut read_rows = 0;
    for (no, line) in lines {
        let row = line
            .split_whitespace()
            .map(|tok| tok.parse::<f64>().map_err(|e| err(no + 1, format!("'{tok}': {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        if row.len() != ncols {
            return Err(err(no + 1, format!("expected {ncols} values, found {}", row.len())));
        }
        values.extend(row);
        read_rows += 1;
    }
    if read_rows != nrows {
        return Err(err(0, format!("expected {nrows} rows, found {read_rows}")));
    }

    let name = path.file_stem().unwrap_or("asc").to_string();
    Ok(AfMap {
        name,
        x_min,
        y_min,
        dx,
        dy,
        no_data,
        values: DMatrix::from_row_slice(nrows, ncols, &values),
    })
}

/// Write a map as an ASC grid.
pub fn write_asc(map: &AfMap, path: &Utf8Path) -> Result<(), TrackError> {
    let mut out = String::new();
    out.push_str(&format!("ncols         {}\n", map.ncols()));
    out.push_str(&format!("nrows         {}\n", map.nrows()));
    out.push_str(&format!("xllcorner     {}\n", map.x_min));
    out.push_str(&format!("yllcorner     {}\n", map.y_min));
    if map.dx == map.dy {
        out.push_str(&format!("cellsize      {}\n", map.dx));
    } else {
        out.push_str(&format!("dx            {}\n", map.dx));
        out.push_str(&format!("dy            {}\n", map.dy));
    }
    out.push_str(&format!("NODATA_value  {}\n", map.no_data));
    for r in 0..map.nrows() {
        let row: Vec<String> = (0..map.ncols())
            .map(|c| {
                let v = map.values[(r, c)];
                if v.is_nan() {
                    format!("{}", map.no_data)
                } else {
                    format!("{v}")
                }
            })
            .collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod asc_test {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn test_header_line() {
        assert_eq!(header_line("cellsize  10.5").unwrap(), ("", ("cellsize", 10.5)));
        assert!(header_line("1 2 3").is_err());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("speed.asc")).unwrap();
        let map = AfMap {
            name: "speed".into(),
            x_min: 100.0,
            y_min: 200.0,
            dx: 10.0,
            dy: 10.0,
            no_data: NO_DATA_VALUE,
            values: DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, NO_DATA_VALUE, 6.5]),
        };
        write_asc(&map, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("ncols         3\nnrows         2\n"));
        assert!(text.ends_with("1 2 3\n4 -999999 6.5\n"));
        assert_eq!(read_asc(&path).unwrap(), map);
    }

    #[test]
    fn test_row_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("bad.asc")).unwrap();
        fs::write(
            &path,
            "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -1\n1 2\n",
        )
        .unwrap();
        let err = read_asc(&path).unwrap_err();
        assert_eq!(err.kind(), crate::tracklib_errors::ErrorKind::Parse);
    }
}
