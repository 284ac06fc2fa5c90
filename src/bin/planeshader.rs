// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[macro_use]
extern crate log;
#[macro_use]
extern crate failure;

extern crate clap;
extern crate env_logger;
extern crate image;
extern crate num;
extern crate num_cpus;
extern crate planeshader;
extern crate rand;

use clap::{App, Arg, ArgMatches};
use image::RgbImage;
use num::Complex;
use std::str::FromStr;

use planeshader::{create, ColorScheme, ComplexPlane, Kernel, Mode, Settings};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    parse_pair(s, ',').map(|(re, im)| Complex { re, im })
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const MODE: &str = "mode";
const OUTPUT: &str = "output";
const SIZE: &str = "size";
const CENTER: &str = "center";
const ZOOM: &str = "zoom";
const FUNCTION: &str = "function";
const DERIVATIVE: &str = "derivative";
const JULIA: &str = "julia";
const START: &str = "start";
const PALETTE: &str = "palette";
const ADVANCES: &str = "advances";
const THREADS: &str = "threads";
const SEED: &str = "seed";
const SMOOTH: &str = "smooth";
const SHOW_ROOTS: &str = "show-roots";
const AXES: &str = "axes";
const PROVEN: &str = "proven";
const EMIT_KERNEL: &str = "emit-kernel";

const MODES: &[&str] = &["escape", "mandelbrot", "julia", "newton", "littlewood"];

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    let mut palettes: Vec<&str> = ColorScheme::names().to_vec();
    palettes.push("random");

    App::new("planeshader")
        .version("0.1.0")
        .about("Renders escape-time sets, Newton basins and Littlewood roots")
        .arg(
            Arg::with_name(MODE)
                .long(MODE)
                .short("m")
                .takes_value(true)
                .default_value("mandelbrot")
                .possible_values(MODES)
                .case_insensitive(true)
                .help("Which engine to run"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .required_unless(EMIT_KERNEL)
                .help("Output file; the extension picks the format"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("800x600")
                .validator(|s| validate_pair::<u16>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(CENTER)
                .long(CENTER)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0,0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse view center"))
                .help("Point at the middle of the image"),
        )
        .arg(
            Arg::with_name(ZOOM)
                .long(ZOOM)
                .short("z")
                .takes_value(true)
                .default_value("3")
                .validator(|s| {
                    validate_range(
                        &s,
                        std::f64::MIN_POSITIVE,
                        std::f64::MAX,
                        "Could not parse zoom",
                        "Zoom must be a positive number",
                    )
                })
                .help("Extent of the plane along the shorter side of the image"),
        )
        .arg(
            Arg::with_name(FUNCTION)
                .long(FUNCTION)
                .short("f")
                .takes_value(true)
                .allow_hyphen_values(true)
                .help("Iteration map in z and c (escape) or f(z) (newton)"),
        )
        .arg(
            Arg::with_name(DERIVATIVE)
                .long(DERIVATIVE)
                .short("d")
                .takes_value(true)
                .allow_hyphen_values(true)
                .help("Derivative of the function (newton)"),
        )
        .arg(
            Arg::with_name(JULIA)
                .long(JULIA)
                .short("j")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-0.8,0.156")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse Julia parameter"))
                .help("The fixed c of a Julia set"),
        )
        .arg(
            Arg::with_name(START)
                .long(START)
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0,0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse starting point"))
                .help("Starting z of every orbit (escape)"),
        )
        .arg(
            Arg::with_name(PALETTE)
                .long(PALETTE)
                .short("p")
                .takes_value(true)
                .default_value("UGent")
                .possible_values(&palettes)
                .case_insensitive(true)
                .help("Color scheme"),
        )
        .arg(
            Arg::with_name(ADVANCES)
                .long(ADVANCES)
                .short("a")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        100_000,
                        "Could not parse advance count",
                        "Advance count must be between 0 and 100000",
                    )
                })
                .help("Batches to run before rendering (mandelbrot, julia, littlewood)"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads to use; all cores if absent"),
        )
        .arg(
            Arg::with_name(SEED)
                .long(SEED)
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        u32::max_value(),
                        "Could not parse seed",
                        "Seed must fit in 32 bits",
                    )
                })
                .help("Seed for the initial root estimates (littlewood); random if absent"),
        )
        .arg(Arg::with_name(SMOOTH).long(SMOOTH).help("Smooth shading (newton)"))
        .arg(
            Arg::with_name(SHOW_ROOTS)
                .long(SHOW_ROOTS)
                .help("Mark the roots (newton)"),
        )
        .arg(Arg::with_name(AXES).long(AXES).help("Draw the coordinate axes"))
        .arg(
            Arg::with_name(PROVEN)
                .long(PROVEN)
                .help("Paint the region proven free of roots (littlewood)"),
        )
        .arg(
            Arg::with_name(EMIT_KERNEL)
                .long(EMIT_KERNEL)
                .help("Print the compiled kernel source instead of rendering"),
        )
        .get_matches()
}

fn complex_of(matches: &ArgMatches, name: &str) -> Result<Complex<f64>, failure::Error> {
    let text = matches.value_of(name).unwrap_or_default();
    parse_complex(text).ok_or_else(|| format_err!("Could not parse {} '{}'", name, text))
}

fn number_of<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>, failure::Error> {
    match matches.value_of(name) {
        None => Ok(None),
        Some(text) => T::from_str(text)
            .map(Some)
            .map_err(|_| format_err!("Could not parse {} '{}'", name, text)),
    }
}

/// The function and derivative for `mode`, falling back to a sensible
/// pair when the user gave neither.
fn functions(matches: &ArgMatches, mode: Mode) -> Result<(String, String), failure::Error> {
    let function = matches.value_of(FUNCTION);
    let derivative = matches.value_of(DERIVATIVE);
    match (mode, function, derivative) {
        (Mode::Newton, None, None) => Ok(("z^3 - 1".to_string(), "3z^2".to_string())),
        (Mode::Newton, Some(_), None) => bail!("Newton mode needs --{} as well", DERIVATIVE),
        (Mode::Newton, None, Some(_)) => bail!("Newton mode needs --{} as well", FUNCTION),
        (_, f, d) => Ok((
            f.unwrap_or("z*z + c").to_string(),
            d.unwrap_or("1").to_string(),
        )),
    }
}

fn run() -> Result<(), failure::Error> {
    let matches = args();
    let mode = Mode::from_str(matches.value_of(MODE).unwrap_or_default())
        .map_err(failure::err_msg)?;
    let (function, derivative) = functions(&matches, mode)?;

    if matches.is_present(EMIT_KERNEL) {
        let kernel = match mode {
            Mode::Escape => Kernel::iteration(&function)?,
            Mode::Newton => Kernel::newton(&function, &derivative)?,
            _ => bail!("The {} engine takes no user function", mode),
        };
        print!("{}", kernel.source());
        return Ok(());
    }

    let (width, height) = parse_pair::<u16>(matches.value_of(SIZE).unwrap_or_default(), 'x')
        .ok_or_else(|| format_err!("Could not parse image size"))?;
    let zoom: f64 = number_of(&matches, ZOOM)?.unwrap_or(3.0);
    let plane = ComplexPlane::new(
        usize::from(width),
        usize::from(height),
        complex_of(&matches, CENTER)?,
        zoom,
    )?;

    let run_seed = match number_of::<u32>(&matches, SEED)? {
        Some(seed) => seed,
        None => {
            let seed = rand::random();
            info!("using random seed {}", seed);
            seed
        }
    };

    let settings = Settings {
        function,
        derivative,
        seed: complex_of(&matches, START)?,
        julia: complex_of(&matches, JULIA)?,
        run_seed,
        smooth: matches.is_present(SMOOTH),
        show_roots: matches.is_present(SHOW_ROOTS),
        axes: matches.is_present(AXES),
        proven: matches.is_present(PROVEN),
        threads: number_of(&matches, THREADS)?.unwrap_or_else(num_cpus::get),
    };

    let palette = matches.value_of(PALETTE).unwrap_or("UGent");
    let scheme = if palette.eq_ignore_ascii_case("random") {
        ColorScheme::random(&mut rand::thread_rng())
    } else {
        ColorScheme::named(palette).ok_or_else(|| format_err!("Unknown palette '{}'", palette))?
    };
    info!("palette {}", scheme.name());

    let mut engine = create(mode, plane, &settings)?;
    let advances = number_of::<usize>(&matches, ADVANCES)?.unwrap_or(match mode {
        Mode::Mandelbrot | Mode::Julia => 4,
        Mode::Littlewood => 200,
        Mode::Escape | Mode::Newton => 0,
    });
    if advances > 0 && !mode.is_iterative() {
        warn!("the {} engine ignores --{}", mode, ADVANCES);
    }
    for _ in 0..advances {
        engine.advance();
    }

    let mut target = RgbImage::new(u32::from(width), u32::from(height));
    engine.render(&mut target, &scheme);

    let output = matches
        .value_of(OUTPUT)
        .ok_or_else(|| format_err!("No output file given"))?;
    target.save(output)?;
    info!("wrote {}x{} {} image to {}", width, height, mode, output);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run() {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
