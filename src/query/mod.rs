//! # Query engine
//!
//! A small SQL-like language over the analytical features of one [`Track`]:
//!
//! ```text
//! SELECT <projections> [WHERE <predicate>] [GROUP BY <features>]
//! ```
//!
//! * `SELECT *` returns the filtered track.
//! * `SELECT speed, z` returns the filtered feature columns.
//! * `SELECT AVG(speed), COUNT(*)` returns one scalar per projection.
//! * `GROUP BY` returns a table with one row per distinct key, sorted by key.
//!
//! Predicates combine comparisons with `AND` / `OR` strictly from left to right.
//! A comparison involving a no-data value is false. Quoted literals are
//! timestamps, read with the [`FormatContext`] of the call (or a number of Unix
//! seconds), and are compared against the `t` pseudo-feature as Unix seconds.
//!
//! ```rust
//! use tracklib::query::QueryResult;
//! use tracklib::track::Track;
//!
//! let mut track = Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (3.0, 0.0)]);
//! track.set_feature("speed", vec![1.0, 2.0, 4.0]).unwrap();
//! let res = track.query("SELECT MAX(speed) WHERE speed < 3").unwrap();
//! assert_eq!(res, QueryResult::Scalars(vec![("max(speed)".into(), 2.0)]));
//! ```
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::operators::{read_input, AggregateOp};
use crate::time::{default_format, FormatContext};
use crate::track::Track;
use crate::tracklib_errors::TrackError;

pub mod parser;

pub use parser::parse_query;

/// Aggregate functions callable in a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFunction {
    Avg,
    Sum,
    Min,
    Max,
    Count,
    Var,
    Median,
    StdDev,
    Rmse,
    Mad,
    ArgMin,
    ArgMax,
    Zeros,
}

impl QueryFunction {
    /// Reduction backing the function.
    pub fn op(&self) -> AggregateOp {
        match self {
            QueryFunction::Avg => AggregateOp::Mean,
            QueryFunction::Sum => AggregateOp::Sum,
            QueryFunction::Min => AggregateOp::Min,
            QueryFunction::Max => AggregateOp::Max,
            QueryFunction::Count => AggregateOp::Count,
            QueryFunction::Var => AggregateOp::Variance,
            QueryFunction::Median => AggregateOp::Median,
            QueryFunction::StdDev => AggregateOp::StdDev,
            QueryFunction::Rmse => AggregateOp::Rmse,
            QueryFunction::Mad => AggregateOp::Mad,
            QueryFunction::ArgMin => AggregateOp::ArgMin,
            QueryFunction::ArgMax => AggregateOp::ArgMax,
            QueryFunction::Zeros => AggregateOp::Zeros,
        }
    }
}

impl FromStr for QueryFunction {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "AVG" => QueryFunction::Avg,
            "SUM" => QueryFunction::Sum,
            "MIN" => QueryFunction::Min,
            "MAX" => QueryFunction::Max,
            "COUNT" => QueryFunction::Count,
            "VAR" => QueryFunction::Var,
            "MEDIAN" => QueryFunction::Median,
            "STDDEV" => QueryFunction::StdDev,
            "RMSE" => QueryFunction::Rmse,
            "MAD" => QueryFunction::Mad,
            "ARGMIN" => QueryFunction::ArgMin,
            "ARGMAX" => QueryFunction::ArgMax,
            "ZEROS" => QueryFunction::Zeros,
            other => return Err(TrackError::wrong(format!("unknown query function '{other}'"))),
        })
    }
}

impl fmt::Display for QueryFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryFunction::Avg => "avg",
            QueryFunction::Sum => "sum",
            QueryFunction::Min => "min",
            QueryFunction::Max => "max",
            QueryFunction::Count => "count",
            QueryFunction::Var => "var",
            QueryFunction::Median => "median",
            QueryFunction::StdDev => "stddev",
            QueryFunction::Rmse => "rmse",
            QueryFunction::Mad => "mad",
            QueryFunction::ArgMin => "argmin",
            QueryFunction::ArgMax => "argmax",
            QueryFunction::Zeros => "zeros",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Feature(String),
    /// `feature` is `"*"` for `COUNT(*)`
    Aggregate { func: QueryFunction, feature: String },
}

impl Projection {
    /// Column name in the result.
    pub fn label(&self) -> String {
        match self {
            Projection::All => "*".to_string(),
            Projection::Feature(name) => name.clone(),
            Projection::Aggregate { func, feature } => format!("{func}({feature})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// `lhs op rhs`, false whenever either side is NaN.
    fn holds(&self, lhs: f64, rhs: f64) -> bool {
        if lhs.is_nan() || rhs.is_nan() {
            return false;
        }
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Quoted(String),
}

impl Literal {
    fn resolve(&self, ctx: &FormatContext) -> Result<f64, TrackError> {
        match self {
            Literal::Number(v) => Ok(*v),
            Literal::Quoted(s) => ctx.parse_or_unix(s).map(|ts| ts.to_unix()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub feature: String,
    pub op: CmpOp,
    pub value: Literal,
}

impl Comparison {
    fn mask(&self, track: &Track, ctx: &FormatContext) -> Result<Vec<bool>, TrackError> {
        let rhs = self.value.resolve(ctx)?;
        let lhs = read_input(track, &self.feature)?;
        Ok(lhs.into_iter().map(|v| self.op.holds(v, rhs)).collect())
    }
}

/// `first (connector comparison)*`, folded from left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub first: Comparison,
    pub rest: Vec<(Connector, Comparison)>,
}

impl Predicate {
    pub fn mask(&self, track: &Track, ctx: &FormatContext) -> Result<Vec<bool>, TrackError> {
        let mut mask = self.first.mask(track, ctx)?;
        for (connector, cmp) in &self.rest {
            let other = cmp.mask(track, ctx)?;
            for (m, o) in mask.iter_mut().zip(other) {
                *m = match connector {
                    Connector::And => *m && o,
                    Connector::Or => *m || o,
                };
            }
        }
        Ok(mask)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub projections: Vec<Projection>,
    pub predicate: Option<Predicate>,
    pub group_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// `SELECT *`
    Track(Track),
    /// Feature projections, one filtered column each
    Columns(Vec<(String, Vec<f64>)>),
    /// Aggregate projections, one value each
    Scalars(Vec<(String, f64)>),
    /// `GROUP BY`, one row per distinct key in ascending key order
    Table {
        header: Vec<String>,
        rows: Vec<Vec<f64>>,
    },
}

impl Query {
    /// Run the query on `track`.
    ///
    /// Arguments
    /// -----------------
    /// * `track`: the queried track. Feature names may also be the pseudo-features
    ///   `x`, `y`, `z`, `t` and `idx`.
    /// * `ctx`: read pattern of quoted timestamp literals.
    ///
    /// Return
    /// ----------
    /// * The result shaped by the projection list.
    /// * [`TrackError::WrongArgument`] when `*` is mixed with other projections,
    ///   when features and aggregates are mixed without `GROUP BY`, or when a
    ///   projected feature is not a grouping key.
    /// * [`TrackError::MissingFeature`] for an unknown feature.
    pub fn execute(&self, track: &Track, ctx: &FormatContext) -> Result<QueryResult, TrackError> {
        let kept: Vec<usize> = match &self.predicate {
            Some(p) => p
                .mask(track, ctx)?
                .into_iter()
                .enumerate()
                .filter_map(|(i, keep)| keep.then_some(i))
                .collect(),
            None => (0..track.size()).collect(),
        };
        debug!(selected = kept.len(), size = track.size(), "query predicate evaluated");

        let has_all = self.projections.contains(&Projection::All);
        if has_all && self.projections.len() > 1 {
            return Err(TrackError::wrong("'*' cannot be combined with other projections"));
        }
        if !self.group_by.is_empty() {
            if has_all {
                return Err(TrackError::wrong("'SELECT *' cannot be grouped"));
            }
            return self.grouped(track, &kept);
        }
        if has_all {
            return Ok(QueryResult::Track(track.select(&kept)));
        }

        let aggregates = self
            .projections
            .iter()
            .filter(|p| matches!(p, Projection::Aggregate { .. }))
            .count();
        if aggregates == 0 {
            let columns = self
                .projections
                .iter()
                .map(|p| {
                    let values = read_input(track, &p.label())?;
                    Ok((p.label(), kept.iter().map(|&i| values[i]).collect()))
                })
                .collect::<Result<Vec<_>, TrackError>>()?;
            return Ok(QueryResult::Columns(columns));
        }
        if aggregates != self.projections.len() {
            return Err(TrackError::wrong(
                "features and aggregates can only be mixed with GROUP BY",
            ));
        }
        let scalars = self
            .projections
            .iter()
            .map(|p| Ok((p.label(), aggregate(track, p, &kept)?)))
            .collect::<Result<Vec<_>, TrackError>>()?;
        Ok(QueryResult::Scalars(scalars))
    }

    fn grouped(&self, track: &Track, kept: &[usize]) -> Result<QueryResult, TrackError> {
        for p in &self.projections {
            if let Projection::Feature(name) = p {
                if !self.group_by.contains(name) {
                    return Err(TrackError::wrong(format!(
                        "'{name}' must appear in GROUP BY or inside an aggregate"
                    )));
                }
            }
        }
        let keys = self
            .group_by
            .iter()
            .map(|name| read_input(track, name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups: BTreeMap<Vec<OrderedFloat<f64>>, Vec<usize>> = BTreeMap::new();
        for &i in kept {
            let key = keys.iter().map(|col| OrderedFloat(col[i])).collect();
            groups.entry(key).or_default().push(i);
        }

        let mut rows = Vec::with_capacity(groups.len());
        for (key, members) in &groups {
            let row = self
                .projections
                .iter()
                .map(|p| match p {
                    Projection::Feature(name) => {
                        let k = self.group_by.iter().position(|g| g == name).unwrap_or(0);
                        Ok(key[k].into_inner())
                    }
                    _ => aggregate(track, p, members),
                })
                .collect::<Result<Vec<_>, TrackError>>()?;
            rows.push(row);
        }
        Ok(QueryResult::Table {
            header: self.projections.iter().map(Projection::label).collect(),
            rows,
        })
    }
}

/// Aggregate projection over the observations `rows`. Index results refer to
/// the queried track.
fn aggregate(track: &Track, projection: &Projection, rows: &[usize]) -> Result<f64, TrackError> {
    let Projection::Aggregate { func, feature } = projection else {
        return Err(TrackError::wrong(format!("'{}' is not an aggregate", projection.label())));
    };
    if feature == "*" {
        return match func {
            QueryFunction::Count => Ok(rows.len() as f64),
            _ => Err(TrackError::wrong(format!("{func}(*) is not supported"))),
        };
    }
    let column = read_input(track, feature)?;
    let values: Vec<f64> = rows.iter().map(|&i| column[i]).collect();
    let res = func.op().apply(&values, None)?;
    Ok(match func {
        QueryFunction::ArgMin | QueryFunction::ArgMax if !res.is_nan() => rows[res as usize] as f64,
        _ => res,
    })
}

/// Parse and run `text` on `track` with the thread's default timestamp format.
pub fn query(track: &Track, text: &str) -> Result<QueryResult, TrackError> {
    parse_query(text)?.execute(track, &default_format())
}

impl Track {
    /// See [`query`].
    pub fn query(&self, text: &str) -> Result<QueryResult, TrackError> {
        query(self, text)
    }
}

#[cfg(test)]
mod query_test {
    use super::*;
    use crate::constants::NAN;
    use crate::tracklib_errors::ErrorKind;

    fn sample() -> Track {
        let mut t = Track::from_xy(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        t.set_feature("speed", vec![1.0, 5.0, 3.0, NAN, 2.0]).unwrap();
        t.set_feature("lane", vec![1.0, 2.0, 1.0, 2.0, 1.0]).unwrap();
        t
    }

    #[test]
    fn test_select_star_filters() {
        let QueryResult::Track(t) = sample().query("SELECT * WHERE speed >= 2").unwrap() else {
            panic!("expected a track");
        };
        assert_eq!(t.size(), 3);
        assert_eq!(t.x(), vec![1.0, 2.0, 4.0]);
        assert_eq!(t.get_feature("lane").unwrap(), vec![2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_nan_never_matches() {
        let res = sample().query("SELECT idx WHERE speed != 1").unwrap();
        assert_eq!(res, QueryResult::Columns(vec![("idx".into(), vec![1.0, 2.0, 4.0])]));
    }

    #[test]
    fn test_left_to_right() {
        // (speed < 2 OR speed > 4) AND lane = 2
        let res = sample()
            .query("SELECT idx WHERE speed < 2 OR speed > 4 AND lane = 2")
            .unwrap();
        assert_eq!(res, QueryResult::Columns(vec![("idx".into(), vec![1.0])]));
    }

    #[test]
    fn test_aggregates() {
        let res = sample()
            .query("SELECT AVG(speed), COUNT(*), ARGMAX(speed), count(speed) WHERE idx > 0")
            .unwrap();
        assert_eq!(
            res,
            QueryResult::Scalars(vec![
                ("avg(speed)".into(), 10.0 / 3.0),
                ("count(*)".into(), 4.0),
                ("argmax(speed)".into(), 1.0),
                ("count(speed)".into(), 3.0),
            ])
        );
    }

    #[test]
    fn test_argmin_maps_to_track_index() {
        let res = sample().query("SELECT ARGMIN(speed) WHERE idx >= 2").unwrap();
        assert_eq!(res, QueryResult::Scalars(vec![("argmin(speed)".into(), 4.0)]));
    }

    #[test]
    fn test_timestamp_literal() {
        let res = sample()
            .query("SELECT idx WHERE t >= '01/01/1970 00:00:02' AND t < \"4\"")
            .unwrap();
        assert_eq!(res, QueryResult::Columns(vec![("idx".into(), vec![2.0, 3.0])]));
        let ctx = FormatContext::new("4Y-2M-2D 2h:2m:2s", "4Y-2M-2D 2h:2m:2s");
        let q = parse_query("SELECT COUNT(*) WHERE t > '1970-01-01 00:00:03'").unwrap();
        assert_eq!(
            q.execute(&sample(), &ctx).unwrap(),
            QueryResult::Scalars(vec![("count(*)".into(), 1.0)])
        );
    }

    #[test]
    fn test_group_by() {
        let res = sample().query("SELECT lane, SUM(speed), COUNT(*) GROUP BY lane").unwrap();
        assert_eq!(
            res,
            QueryResult::Table {
                header: vec!["lane".into(), "sum(speed)".into(), "count(*)".into()],
                rows: vec![vec![1.0, 6.0, 3.0], vec![2.0, 5.0, 2.0]],
            }
        );
    }

    #[test]
    fn test_invalid_shapes() {
        let t = sample();
        for text in [
            "SELECT *, speed",
            "SELECT speed, AVG(speed)",
            "SELECT * GROUP BY lane",
            "SELECT speed, AVG(speed) GROUP BY lane",
            "SELECT MAX(*)",
        ] {
            assert_eq!(t.query(text).unwrap_err().kind(), ErrorKind::WrongArgument, "{text}");
        }
        assert_eq!(
            t.query("SELECT foo").unwrap_err(),
            TrackError::MissingFeature("foo".into())
        );
    }
}
