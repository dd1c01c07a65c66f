// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate failure;
extern crate fractal_sampler;
extern crate image;
#[macro_use]
extern crate log;
extern crate num;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use failure::Error;
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::ColorType;
use num::{clamp, Complex};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use fractal_sampler::{
    sample_escape_time_with, sample_newton_with, EscapeTimeSample, NewtonSample, SampleConfig,
    SampleError, View, NO_ROOT,
};

/// Splits `s` at the first `separator` and parses both sides, ignoring
/// surrounding whitespace.
fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    let index = s.find(separator)?;
    let left = s[..index].trim().parse().ok()?;
    let right = s[index + separator.len_utf8()..].trim().parse().ok()?;
    Some((left, right))
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    parse_pair(s, ',').map(|(re, im)| Complex::new(re, im))
}

/// A comma-separated list of coefficients, lowest degree first.  Each
/// is a real number or a `re:im` pair.
fn parse_coeffs(s: &str) -> Option<Vec<Complex<f64>>> {
    s.split(',')
        .map(|term| {
            let term = term.trim();
            match parse_pair::<f64>(term, ':') {
                Some((re, im)) => Some(Complex::new(re, im)),
                None => f64::from_str(term).ok().map(|re| Complex::new(re, 0.0)),
            }
        })
        .collect()
}

/// Either `x,y`, or a single `x` with the y span following the image's
/// aspect ratio.
fn parse_span(s: &str, size: (usize, usize)) -> Option<(f64, f64)> {
    match parse_pair(s, ',') {
        Some(pair) => Some(pair),
        None => f64::from_str(s)
            .ok()
            .map(|x| (x, x * size.1 as f64 / size.0.max(1) as f64)),
    }
}

fn validate<T>(s: &str, parse: fn(&str) -> Option<T>, err: &str) -> Result<(), String> {
    match parse(s) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const CENTER: &str = "center";
const SPAN: &str = "span";
const ITERATIONS: &str = "iterations";
const THREADS: &str = "threads";
const GPU: &str = "gpu";
const VERBOSE: &str = "verbose";
const JULIA_C: &str = "c";
const COEFFS: &str = "coeffs";

fn common_args(center: &'static str) -> Vec<Arg<'static, 'static>> {
    vec![
        Arg::with_name(OUTPUT)
            .required(true)
            .long(OUTPUT)
            .short("o")
            .takes_value(true)
            .help("Output file (PNM)"),
        Arg::with_name(SIZE)
            .long(SIZE)
            .short("s")
            .takes_value(true)
            .default_value("800x600")
            .validator(|s| {
                validate(&s, |s| parse_pair::<usize>(s, 'x'), "Could not parse output image size")
            })
            .help("Size of output image, WIDTHxHEIGHT"),
        Arg::with_name(CENTER)
            .long(CENTER)
            .takes_value(true)
            .allow_hyphen_values(true)
            .default_value(center)
            .validator(|s| validate(&s, parse_complex, "Could not parse center"))
            .help("Center of the view on the complex plane, RE,IM"),
        Arg::with_name(SPAN)
            .long(SPAN)
            .takes_value(true)
            .default_value("3.0")
            .validator(|s| {
                validate(&s, |s| parse_span(s, (1, 1)), "Could not parse span")
            })
            .help("Extent of the view, X,Y or X alone to follow the image's aspect ratio"),
        Arg::with_name(ITERATIONS)
            .long(ITERATIONS)
            .short("i")
            .takes_value(true)
            .default_value("100")
            .validator(|s| validate(&s, |s| u32::from_str(s).ok(), "Could not parse iteration count"))
            .help("Iteration cap per pixel"),
        Arg::with_name(THREADS)
            .long(THREADS)
            .short("t")
            .takes_value(true)
            .default_value("0")
            .validator(|s| validate(&s, |s| usize::from_str(s).ok(), "Could not parse thread count"))
            .help("Number of worker threads, 0 for one per CPU"),
        Arg::with_name(GPU)
            .long(GPU)
            .help("Sample on the GPU, falling back to the CPU if none is available"),
    ]
}

fn args<'a>() -> ArgMatches<'a> {
    App::new("fractal_sampler")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Escape-time and Newton fractal renderer")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name(VERBOSE)
                .long(VERBOSE)
                .short("v")
                .global(true)
                .help("Log progress and timing"),
        )
        .subcommand(
            SubCommand::with_name("mandelbrot")
                .about("Render the Mandelbrot set")
                .args(&common_args("-0.5,0")),
        )
        .subcommand(
            SubCommand::with_name("julia")
                .about("Render the Julia set for a constant")
                .args(&common_args("0,0"))
                .arg(
                    Arg::with_name(JULIA_C)
                        .long(JULIA_C)
                        .short("c")
                        .required(true)
                        .takes_value(true)
                        .allow_hyphen_values(true)
                        .validator(|s| validate(&s, parse_complex, "Could not parse Julia constant"))
                        .help("The constant c, RE,IM"),
                ),
        )
        .subcommand(
            SubCommand::with_name("newton")
                .about("Render Newton's method for a polynomial")
                .args(&common_args("0,0"))
                .arg(
                    Arg::with_name(COEFFS)
                        .long(COEFFS)
                        .required(true)
                        .takes_value(true)
                        .allow_hyphen_values(true)
                        .validator(|s| validate(&s, parse_coeffs, "Could not parse coefficients"))
                        .help("Coefficients, lowest degree first, each RE or RE:IM"),
                ),
        )
        .get_matches()
}

/// Everything the sampling calls need, pulled out of one subcommand's
/// arguments.
struct Job {
    output: String,
    view: View,
    iterations: u32,
    threads: usize,
    gpu: bool,
}

fn value<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, Error> {
    matches
        .value_of(name)
        .ok_or_else(|| format_err!("missing --{}", name))
}

fn job(matches: &ArgMatches) -> Result<Job, Error> {
    let size = parse_pair::<usize>(value(matches, SIZE)?, 'x')
        .ok_or_else(|| format_err!("Error parsing image dimensions"))?;
    let center =
        parse_complex(value(matches, CENTER)?).ok_or_else(|| format_err!("Error parsing center"))?;
    let span =
        parse_span(value(matches, SPAN)?, size).ok_or_else(|| format_err!("Error parsing span"))?;
    Ok(Job {
        output: value(matches, OUTPUT)?.to_string(),
        view: View::new(center, span.0, span.1, size.0, size.1),
        iterations: u32::from_str(value(matches, ITERATIONS)?)?,
        threads: usize::from_str(value(matches, THREADS)?)?,
        gpu: matches.is_present(GPU),
    })
}

/// Runs `sample` on the GPU if asked, and on the CPU if that was not
/// asked for or turned out to be impossible.
fn with_fallback<T, F>(job: &Job, sample: F) -> Result<T, SampleError>
where
    F: Fn(&SampleConfig) -> Result<T, SampleError>,
{
    let cpu = SampleConfig::cpu(job.threads);
    if !job.gpu {
        return sample(&cpu);
    }
    match sample(&SampleConfig::gpu()) {
        Err(ref e) if e.is_recoverable() => {
            warn!("{}; falling back to the CPU", e);
            sample(&cpu)
        }
        result => result,
    }
}

fn write_image(
    outfile: &str,
    pixels: &[u8],
    bounds: (usize, usize),
    subtype: PNMSubtype,
    color: ColorType,
) -> Result<(), Error> {
    let output = File::create(Path::new(outfile))?;
    let mut encoder = PNMEncoder::new(output).with_subtype(subtype);
    encoder.encode(pixels, bounds.0 as u32, bounds.1 as u32, color)?;
    Ok(())
}

/// Log-scaled grayscale; pixels that never escaped are black.
fn shade_escape_time(sample: &EscapeTimeSample) -> Vec<u8> {
    let top = f64::from(sample.limit()).ln_1p();
    sample
        .iterations()
        .as_slice()
        .iter()
        .map(|&itr| {
            if itr == sample.limit() {
                0
            } else {
                clamp(255.0 * f64::from(itr).ln_1p() / top, 0.0, 255.0) as u8
            }
        })
        .collect()
}

const PALETTE: [[u8; 3]; 6] = [
    [230, 57, 70],
    [69, 123, 157],
    [244, 162, 97],
    [42, 157, 143],
    [131, 56, 236],
    [233, 196, 106],
];

/// Each root gets a colour, darker the longer the pixel took to get
/// there.  Unmatched pixels are black.
fn shade_newton(sample: &NewtonSample) -> Vec<u8> {
    let limit = f64::from(sample.limit());
    let cells = sample
        .root_index()
        .as_slice()
        .iter()
        .zip(sample.iterations().as_slice());

    let mut pixels = Vec::with_capacity(sample.iterations().as_slice().len() * 3);
    for (&index, &itr) in cells {
        if index == NO_ROOT {
            pixels.extend_from_slice(&[0, 0, 0]);
            continue;
        }
        let brightness = 1.0 - 0.8 * (f64::from(itr) / limit).sqrt();
        let colour = PALETTE[index as usize % PALETTE.len()];
        pixels.extend(
            colour
                .iter()
                .map(|&channel| clamp(f64::from(channel) * brightness, 0.0, 255.0) as u8),
        );
    }
    pixels
}

fn run() -> Result<(), Error> {
    let matches = args();
    let verbose = matches.is_present(VERBOSE)
        || matches
            .subcommand()
            .1
            .map_or(false, |sub| sub.is_present(VERBOSE));
    let level = if verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match matches.subcommand() {
        ("mandelbrot", Some(sub)) | ("julia", Some(sub)) => {
            let job = job(sub)?;
            let julia_c = match sub.value_of(JULIA_C) {
                Some(c) => Some(
                    parse_complex(c).ok_or_else(|| format_err!("Error parsing Julia constant"))?,
                ),
                None => None,
            };
            let sample = with_fallback(&job, |config| {
                sample_escape_time_with(&job.view, job.iterations, julia_c, config)
            })?;
            let size = (sample.iterations().width(), sample.iterations().height());
            write_image(
                &job.output,
                &shade_escape_time(&sample),
                size,
                PNMSubtype::Graymap(SampleEncoding::Binary),
                ColorType::Gray(8),
            )
        }
        ("newton", Some(sub)) => {
            let job = job(sub)?;
            let coeffs = parse_coeffs(value(sub, COEFFS)?)
                .ok_or_else(|| format_err!("Error parsing coefficients"))?;
            let sample = with_fallback(&job, |config| {
                sample_newton_with(&coeffs, &job.view, job.iterations, config)
            })?;
            info!("roots: {:?}", sample.roots().as_slice());
            let size = (sample.iterations().width(), sample.iterations().height());
            write_image(
                &job.output,
                &shade_newton(&sample),
                size,
                PNMSubtype::Pixmap(SampleEncoding::Binary),
                ColorType::RGB(8),
            )
        }
        (name, _) => Err(format_err!("unknown command {}", name)),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_parse_real_and_complex_terms() {
        assert_eq!(
            parse_coeffs("-1, 0,1"),
            Some(vec![
                Complex::new(-1.0, 0.0),
                Complex::new(0.0, 0.0),
                Complex::new(1.0, 0.0)
            ])
        );
        assert_eq!(
            parse_coeffs("1:-2,1"),
            Some(vec![Complex::new(1.0, -2.0), Complex::new(1.0, 0.0)])
        );
        assert_eq!(parse_coeffs("1,x"), None);
    }

    #[test]
    fn pairs_split_at_the_first_separator() {
        assert_eq!(parse_pair::<usize>("800x600", 'x'), Some((800, 600)));
        assert_eq!(parse_pair::<usize>("800x", 'x'), None);
        assert_eq!(parse_pair::<usize>("800", 'x'), None);
        assert_eq!(parse_pair::<f64>("1,2,3", ','), None);
        assert_eq!(parse_complex("-0.8, 0.156"), Some(Complex::new(-0.8, 0.156)));
        assert_eq!(parse_complex("0.5"), None);
    }

    #[test]
    fn a_single_span_follows_the_aspect_ratio() {
        assert_eq!(parse_span("4", (800, 600)), Some((4.0, 3.0)));
        assert_eq!(parse_span("4,1", (800, 600)), Some((4.0, 1.0)));
        assert_eq!(parse_span("four", (800, 600)), None);
    }
}
