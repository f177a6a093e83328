//! Simulator result readers.
//!
//! Spectre results are PSF (binary or ASCII) and are read with `psfparser`.
//! ngspice and Xyce write SPICE rawfiles, which are parsed here with `nom`.

use std::collections::HashMap;
use std::path::Path;

use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_till1};
use nom::character::complete::{
    char, digit1, line_ending, multispace0, multispace1, not_line_ending, space0, space1,
};
use nom::combinator::{map, map_res, opt, value, verify};
use nom::multi::{count, many0};
use nom::number::complete::{double, le_f64};
use nom::sequence::{pair, preceded, separated_pair, tuple};
use nom::IResult;
use psfparser::analysis::transient::TransientData;

use crate::error::{FridaError, Result};

/// Named real-valued vectors from one analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    pub signals: HashMap<String, Vec<f64>>,
    /// Imaginary parts, present only for complex (AC) plots.
    pub imag: HashMap<String, Vec<f64>>,
    /// Name of the sweep variable, usually `time`.
    pub sweep: Option<String>,
}

impl RawResult {
    pub fn signal(&self, name: &str) -> Option<&[f64]> {
        self.signals.get(name).map(Vec::as_slice)
    }

    pub fn time(&self) -> Option<&[f64]> {
        self.sweep.as_deref().and_then(|s| self.signal(s))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.signals.keys().map(String::as_str)
    }
}

impl From<TransientData> for RawResult {
    fn from(data: TransientData) -> Self {
        Self {
            signals: data.signals,
            imag: HashMap::new(),
            sweep: Some(data.time),
        }
    }
}

/// Reads a Spectre transient PSF file.
pub fn read_psf(path: impl AsRef<Path>) -> Result<RawResult> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let result = if data.starts_with(b"HEADER") {
        let text = std::str::from_utf8(&data)
            .map_err(|e| FridaError::FileFormat(format!("{path:?}: {e}")))?;
        let ast = psfparser::ascii::parse(text)
            .map_err(|e| FridaError::FileFormat(format!("{path:?}: {e}")))?;
        TransientData::from_ascii(&ast)
    } else {
        let ast = psfparser::binary::parse(&data)
            .map_err(|e| FridaError::FileFormat(format!("{path:?}: {e}")))?;
        TransientData::from_binary(ast)
    };
    Ok(result.into())
}

/// Reads the first plot of an ngspice or Xyce rawfile, ASCII or binary.
pub fn read_rawfile(path: impl AsRef<Path>) -> Result<RawResult> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    parse_rawfile(&data).map_err(|e| match e {
        FridaError::FileFormat(msg) => FridaError::FileFormat(format!("{path:?}: {msg}")),
        other => other,
    })
}

fn format_err(msg: impl Into<String>) -> FridaError {
    FridaError::FileFormat(msg.into())
}

fn parse_err(data: &[u8], err: nom::Err<nom::error::Error<&[u8]>>) -> FridaError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => format_err(format!(
            "unexpected input at byte {} ({:?})",
            data.len() - e.input.len(),
            e.code
        )),
        nom::Err::Incomplete(_) => format_err("truncated rawfile"),
    }
}

fn is_newline(c: u8) -> bool {
    c == b'\n' || c == b'\r'
}

fn token(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_till1(|c: u8| c.is_ascii_whitespace())(input)
}

/// `Key: value` line. The variable list ends the header.
fn header_field(input: &[u8]) -> IResult<&[u8], (&str, &str)> {
    let key = map_res(take_till1(|c: u8| c == b':' || is_newline(c)), std::str::from_utf8);
    let key = verify(key, |k: &str| !k.trim().eq_ignore_ascii_case("variables"));
    let text = map_res(not_line_ending, std::str::from_utf8);
    map(
        tuple((space0, key, char(':'), text, line_ending)),
        |(_, k, _, v, _)| (k.trim(), v.trim()),
    )(input)
}

fn headers(input: &[u8]) -> IResult<&[u8], Vec<(&str, &str)>> {
    map(
        many0(alt((map(header_field, Some), value(None, line_ending)))),
        |fields: Vec<Option<(&str, &str)>>| fields.into_iter().flatten().collect(),
    )(input)
}

/// `<index> <name> <unit> [params]`; only the name is kept.
fn variable(input: &[u8]) -> IResult<&[u8], &str> {
    map(
        tuple((
            multispace0,
            digit1,
            space1,
            map_res(token, std::str::from_utf8),
            not_line_ending,
            opt(line_ending),
        )),
        |(_, _, _, name, _, _)| name,
    )(input)
}

/// The variable list. Xyce may put the first entry on the `Variables:` line.
fn variables(input: &[u8], n_vars: usize) -> IResult<&[u8], Vec<&str>> {
    preceded(
        tuple((space0, tag_no_case("Variables:"), space0, opt(line_ending))),
        count(variable, n_vars),
    )(input)
}

fn ascii_sample(input: &[u8], complex: bool) -> IResult<&[u8], (f64, f64)> {
    if complex {
        separated_pair(double, char(','), double)(input)
    } else {
        map(double, |re| (re, 0.0))(input)
    }
}

fn binary_sample(input: &[u8], complex: bool) -> IResult<&[u8], (f64, f64)> {
    if complex {
        pair(le_f64, le_f64)(input)
    } else {
        map(le_f64, |re| (re, 0.0))(input)
    }
}

/// Leading index of ASCII point `point`.
fn point_index(input: &[u8], point: usize) -> IResult<&[u8], usize> {
    let index = map_res(map_res(digit1, std::str::from_utf8), str::parse::<usize>);
    verify(preceded(multispace0, index), |&idx: &usize| idx == point)(input)
}

fn ascii_rows(
    input: &[u8],
    n_vars: usize,
    n_points: usize,
    complex: bool,
) -> IResult<&[u8], Vec<Vec<(f64, f64)>>> {
    let (mut input, _) = tuple((space0, tag_no_case("Values:"), space0, line_ending))(input)?;
    let mut rows = Vec::with_capacity(n_points);
    for point in 0..n_points {
        let row;
        (input, _) = point_index(input, point)?;
        (input, row) = count(
            preceded(multispace1, |i| ascii_sample(i, complex)),
            n_vars,
        )(input)?;
        rows.push(row);
    }
    Ok((input, rows))
}

fn binary_rows(
    input: &[u8],
    n_vars: usize,
    n_points: usize,
    complex: bool,
) -> IResult<&[u8], Vec<Vec<(f64, f64)>>> {
    let (input, _) = tuple((space0, tag_no_case("Binary:"), space0, line_ending))(input)?;
    count(count(|i| binary_sample(i, complex), n_vars), n_points)(input)
}

fn count_field(fields: &[(&str, &str)], key: &str) -> Result<usize> {
    let text = fields
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| *v)
        .ok_or_else(|| format_err(format!("missing `{key}` header")))?;
    text.parse()
        .map_err(|e| format_err(format!("bad `{key}` value `{text}`: {e}")))
}

pub fn parse_rawfile(data: &[u8]) -> Result<RawResult> {
    let (rest, fields) = headers(data).map_err(|e| parse_err(data, e))?;
    let complex = fields
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("flags"))
        .is_some_and(|(_, v)| v.to_ascii_lowercase().contains("complex"));
    let n_vars = count_field(&fields, "No. Variables")?;
    let n_points = count_field(&fields, "No. Points")?;

    let (rest, names) = variables(rest, n_vars).map_err(|e| parse_err(data, e))?;
    let (_, rows) = alt((
        |i| ascii_rows(i, n_vars, n_points, complex),
        |i| binary_rows(i, n_vars, n_points, complex),
    ))(rest)
    .map_err(|e| parse_err(data, e))?;

    let column = |k: usize, part: fn(&(f64, f64)) -> f64| -> Vec<f64> {
        rows.iter().map(|row| part(&row[k])).collect()
    };
    let mut out = RawResult {
        sweep: names.first().map(|s| s.to_string()),
        ..Default::default()
    };
    for (k, name) in names.iter().enumerate() {
        out.signals.insert(name.to_string(), column(k, |s| s.0));
        if complex {
            out.imag.insert(name.to_string(), column(k, |s| s.1));
        }
    }
    Ok(out)
}
