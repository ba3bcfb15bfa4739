//! One-port Touchstone (.s1p) reader and writer.
//!
//! Supports:
//! - Parameters: S (MA, RI, DB) and Z (RI, normalised to the reference)
//! - Frequency units: Hz, kHz, MHz, GHz
//! - `R <ohms>` reference impedance in (0, 10000]
//!
//! Samples come out as series R/X in ohms keyed by frequency in kHz. NaN or
//! negative resistance reads as 0 and NaN reactance reads as 0.

use crate::error::{FormatError, FormatResult};
use lib_types::{
    gamma_to_impedance, impedance_to_gamma, DataFormat, Ohms, ParameterKind, SamplePoint,
};
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, line_ending, not_line_ending, space0, space1},
    combinator::{eof, map, opt, value},
    multi::{many0, many1},
    number::complete::double,
    sequence::preceded,
    IResult, Parser,
};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Largest accepted reference impedance.
const MAX_REFERENCE_OHMS: f64 = 10_000.0;

/// Options from the `#` line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchstoneOptions {
    /// Multiplier from file frequency units to Hz.
    pub freq_mult: f64,

    pub parameter: ParameterKind,

    pub format: DataFormat,

    /// Reference impedance.
    pub z0: Ohms,
}

impl Default for TouchstoneOptions {
    fn default() -> Self {
        Self {
            freq_mult: 1e9, // GHz default
            parameter: ParameterKind::S,
            format: DataFormat::MA,
            z0: Ohms::Z0_50,
        }
    }
}

impl TouchstoneOptions {
    fn validate(&self) -> FormatResult<()> {
        if !(self.z0.0 > 0.0 && self.z0.0 <= MAX_REFERENCE_OHMS) {
            return Err(FormatError::invalid_value(
                "R",
                format!("reference impedance must be in (0, {}], got {}", MAX_REFERENCE_OHMS, self.z0.0),
            ));
        }
        if self.parameter == ParameterKind::Z && self.format != DataFormat::RI {
            return Err(FormatError::invalid_format(
                "Touchstone",
                format!("Z parameters are only read in RI format, got {:?}", self.format),
            ));
        }
        Ok(())
    }

    /// Convert one data row to a sample.
    fn to_sample(&self, freq: f64, v1: f64, v2: f64) -> SamplePoint {
        let (r, x) = match self.parameter {
            ParameterKind::S => gamma_to_impedance(self.z0, self.format.to_complex(v1, v2)),
            ParameterKind::Z => (v1 * self.z0.0, v2 * self.z0.0),
        };
        let r = if r.is_nan() || r < 0.0 { 0.0 } else { r };
        let x = if x.is_nan() { 0.0 } else { x };
        SamplePoint::new(freq * self.freq_mult / 1e3, r, x)
    }
}

/// Parsed one-port Touchstone file.
#[derive(Clone, Debug)]
pub struct TouchstoneFile {
    pub options: TouchstoneOptions,
    pub samples: Vec<SamplePoint>,
}

/// Parameter/format combinations written on export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TouchstoneKind {
    /// Normalised impedance, real/imaginary.
    #[default]
    ZRi,
    /// Reflection coefficient, real/imaginary.
    SRi,
    /// Reflection coefficient, magnitude/angle in degrees.
    SMa,
}

impl TouchstoneKind {
    pub fn parameter(&self) -> ParameterKind {
        match self {
            Self::ZRi => ParameterKind::Z,
            Self::SRi | Self::SMa => ParameterKind::S,
        }
    }

    pub fn format(&self) -> DataFormat {
        match self {
            Self::ZRi | Self::SRi => DataFormat::RI,
            Self::SMa => DataFormat::MA,
        }
    }

    fn option_line(&self, z0: Ohms) -> String {
        let (p, f) = match self {
            Self::ZRi => ("Z", "RI"),
            Self::SRi => ("S", "RI"),
            Self::SMa => ("S", "MA"),
        };
        format!("# MHz {} {} R {}", p, f, z0.0)
    }

    fn format_comment(&self, z0: Ohms) -> String {
        match self {
            Self::ZRi => format!(
                "! Format: Frequency Z-real Z-imaginary (normalized to {} Ohm)",
                z0.0
            ),
            Self::SRi => format!(
                "! Format: Frequency S-real S-imaginary (normalized to {} Ohm)",
                z0.0
            ),
            Self::SMa => format!(
                "! Format: Frequency S-magnitude S-angle (normalized to {} Ohm, angle in degrees)",
                z0.0
            ),
        }
    }

    /// Data pair for one sample.
    fn values(&self, sample: &SamplePoint, z0: Ohms) -> (f64, f64) {
        let (v1, v2) = match self {
            Self::ZRi => {
                let z = sample.normalized(z0);
                (z.re, z.im)
            }
            Self::SRi | Self::SMa => {
                let gamma = impedance_to_gamma(z0, sample.r_ohm, sample.x_ohm);
                self.format().from_complex(gamma)
            }
        };
        (zero_if_nan(v1), zero_if_nan(v2))
    }
}

impl fmt::Display for TouchstoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ZRi => "z-ri",
            Self::SRi => "s-ri",
            Self::SMa => "s-ma",
        };
        f.write_str(s)
    }
}

impl FromStr for TouchstoneKind {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "z-ri" | "zri" => Ok(Self::ZRi),
            "s-ri" | "sri" => Ok(Self::SRi),
            "s-ma" | "sma" => Ok(Self::SMa),
            other => Err(FormatError::invalid_value(
                "touchstone kind",
                format!("expected z-ri, s-ri or s-ma, got '{}'", other),
            )),
        }
    }
}

fn zero_if_nan(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v
    }
}

/// Parse a one-port Touchstone file from a string.
pub fn parse_touchstone(content: &str) -> FormatResult<TouchstoneFile> {
    let (remaining, (options, data_lines)) = parse_touchstone_inner(content)?;

    if !remaining.trim().is_empty() {
        tracing::warn!("Unparsed content at end of Touchstone file");
    }

    options.validate()?;
    let samples = build_samples(&options, &data_lines)?;
    Ok(TouchstoneFile { options, samples })
}

/// Write samples as a one-port Touchstone file.
pub fn write_touchstone<W: Write>(
    mut out: W,
    samples: &[SamplePoint],
    kind: TouchstoneKind,
    z0: Ohms,
) -> FormatResult<()> {
    writeln!(out, "! Touchstone file generated by antscope")?;
    writeln!(out, "{}", kind.option_line(z0))?;
    writeln!(out, "{}", kind.format_comment(z0))?;
    for s in samples {
        let (v1, v2) = kind.values(s, z0);
        writeln!(out, "{} {} {}", s.frequency_khz / 1e3, v1, v2)?;
    }
    out.flush()?;
    Ok(())
}

// ============================================================================
// Nom Parsers (nom 8 compatible)
// ============================================================================

fn parse_touchstone_inner(input: &str) -> IResult<&str, (TouchstoneOptions, Vec<Vec<f64>>)> {
    let (input, _) = many0(comment_or_blank_line).parse(input)?;
    let (input, options) = parse_options_line(input)?;
    let (input, _) = many0(comment_or_blank_line).parse(input)?;
    let (input, data_lines) = many1(parse_data_line).parse(input)?;
    let (input, _) = many0(comment_or_blank_line).parse(input)?;
    Ok((input, (options, data_lines)))
}

fn parse_options_line(input: &str) -> IResult<&str, TouchstoneOptions> {
    let (input, _) = space0(input)?;
    let (input, _) = char('#')(input)?;
    let (input, _) = space0(input)?;

    let mut options = TouchstoneOptions::default();

    // Parse tokens in any order
    let (input, tokens) = many0(preceded(space0, parse_option_token)).parse(input)?;

    for token in tokens {
        match token {
            OptionToken::FreqUnit(mult) => options.freq_mult = mult,
            OptionToken::Parameter(p) => options.parameter = p,
            OptionToken::Format(f) => options.format = f,
            OptionToken::Z0(z) => options.z0 = z,
        }
    }

    // Anything else on the line is an unknown option
    let (input, _) = space0(input)?;
    let (input, _) = opt(preceded(char('!'), not_line_ending)).parse(input)?;
    let (input, _) = alt((line_ending, eof)).parse(input).map_err(|_: nom::Err<nom::error::Error<&str>>| {
        nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Verify))
    })?;

    Ok((input, options))
}

#[derive(Clone, Debug)]
enum OptionToken {
    FreqUnit(f64),
    Parameter(ParameterKind),
    Format(DataFormat),
    Z0(Ohms),
}

fn parse_option_token(input: &str) -> IResult<&str, OptionToken> {
    alt((parse_freq_unit, parse_parameter, parse_format, parse_z0)).parse(input)
}

fn parse_freq_unit(input: &str) -> IResult<&str, OptionToken> {
    alt((
        value(OptionToken::FreqUnit(1.0), tag_no_case("HZ")),
        value(OptionToken::FreqUnit(1e3), tag_no_case("KHZ")),
        value(OptionToken::FreqUnit(1e6), tag_no_case("MHZ")),
        value(OptionToken::FreqUnit(1e9), tag_no_case("GHZ")),
    ))
    .parse(input)
}

fn parse_parameter(input: &str) -> IResult<&str, OptionToken> {
    alt((
        value(OptionToken::Parameter(ParameterKind::S), tag_no_case("S")),
        value(OptionToken::Parameter(ParameterKind::Z), tag_no_case("Z")),
    ))
    .parse(input)
}

fn parse_format(input: &str) -> IResult<&str, OptionToken> {
    alt((
        value(OptionToken::Format(DataFormat::RI), tag_no_case("RI")),
        value(OptionToken::Format(DataFormat::MA), tag_no_case("MA")),
        value(OptionToken::Format(DataFormat::DB), tag_no_case("DB")),
    ))
    .parse(input)
}

fn parse_z0(input: &str) -> IResult<&str, OptionToken> {
    let (input, _) = tag_no_case("R")(input)?;
    let (input, _) = space1(input)?;
    let (input, z0) = double(input)?;
    Ok((input, OptionToken::Z0(Ohms(z0))))
}

fn comment_or_blank_line(input: &str) -> IResult<&str, ()> {
    alt((
        map((space0, char('!'), not_line_ending, opt(line_ending)), |_| ()),
        map((space0, line_ending), |_| ()),
    ))
    .parse(input)
}

fn parse_data_line(input: &str) -> IResult<&str, Vec<f64>> {
    let (input, _) = space0(input)?;

    // Skip if it's a comment or empty
    if input.starts_with('!') || input.starts_with('\n') || input.starts_with('\r') || input.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    let (input, values) = many1(preceded(space0, double)).parse(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = opt(preceded(char('!'), not_line_ending)).parse(input)?;
    let (input, _) = opt(line_ending).parse(input)?;

    Ok((input, values))
}

fn build_samples(
    options: &TouchstoneOptions,
    data_lines: &[Vec<f64>],
) -> FormatResult<Vec<SamplePoint>> {
    // Values per frequency point: frequency plus one complex S11/Z11
    const VALUES_PER_FREQ: usize = 3;

    let all_values: Vec<f64> = data_lines.iter().flatten().copied().collect();
    if all_values.len() < VALUES_PER_FREQ {
        return Err(FormatError::invalid_format(
            "Touchstone",
            format!(
                "Insufficient data: need at least {} values, got {}",
                VALUES_PER_FREQ,
                all_values.len()
            ),
        ));
    }

    let samples = all_values
        .chunks_exact(VALUES_PER_FREQ)
        .map(|c| options.to_sample(c[0], c[1], c[2]))
        .collect();

    // Warn if there are leftover values (incomplete frequency point)
    let remainder = all_values.len() % VALUES_PER_FREQ;
    if remainder != 0 {
        tracing::warn!(
            "Incomplete frequency point: {} extra values ignored",
            remainder
        );
    }

    Ok(samples)
}
