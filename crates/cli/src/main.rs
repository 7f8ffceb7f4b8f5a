use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use indicatif::ProgressBar;
use kurbo::{Rect, Size};
use polygraph_curve::{sample, Curve};
use polygraph_driver::sim::SimBench;
use polygraph_driver::sysfs::{SysfsGpio, SysfsPwm};
use polygraph_driver::{
    Axis, Gpio, MotionConfig, PenConfig, PinMap, PlotStats, Plotter, Pwm,
};
use polygraph_expr::Polynomial;

use crate::runlog::RunLog;

mod preview;
mod runlog;

const TICK: Duration = Duration::from_millis(50);

/// Draw a polynomial curve on the plotter.
#[derive(Parser)]
struct Args {
    /// The polynomial, in compact form like "3x^2-2x+7".
    expr: String,
    /// Left edge of the sampling domain.
    x_min: f64,
    /// Right edge of the sampling domain.
    x_max: f64,
    /// Bottom of the visible band; values below it become gaps.
    y_min: f64,
    /// Top of the visible band; values above it become gaps.
    y_max: f64,

    /// How many samples to draw.
    #[arg(long, default_value_t = 100)]
    samples: usize,
    /// Device travel along x, in steps.
    #[arg(long, default_value_t = 800)]
    width: u32,
    /// Device travel along y, in steps.
    #[arg(long, default_value_t = 600)]
    height: u32,
    /// Drive an in-memory rig instead of the real one.
    #[arg(long)]
    bench: bool,
    /// Append a timestamped record of this run to a file.
    #[arg(long)]
    log: Option<PathBuf>,
    /// Write an SVG of what the bench drew (needs --bench).
    #[arg(long)]
    svg: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let mut run_log = match &args.log {
        Some(path) => Some(RunLog::open(path).with_context(|| {
            format!("could not open the run log at {}", path.display())
        })?),
        None => None,
    };
    note(
        &mut run_log,
        &format!(
            "start: {:?} over x [{}, {}], y [{}, {}], {} samples",
            args.expr, args.x_min, args.x_max, args.y_min, args.y_max, args.samples
        ),
    );

    match run(&args) {
        Ok(stats) => {
            note(&mut run_log, &format!("done: {stats}"));
            Ok(())
        }
        Err(err) => {
            note(&mut run_log, &format!("failed: {err:#}"));
            Err(err)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<PlotStats> {
    let poly = polygraph_expr::parse(&args.expr)
        .with_context(|| format!("rejected expression {:?}", args.expr))?;
    print_terms(&poly)?;

    let window = Rect::new(args.x_min, args.y_min, args.x_max, args.y_max);
    let extents = Size::new(f64::from(args.width), f64::from(args.height));
    let curve = sample(&poly, window, args.samples, extents)?;
    print_curve(&curve)?;

    let stats = if args.bench {
        // The bench does not need motor timing, so the delays go away
        // and a full run finishes in milliseconds.
        let motion = MotionConfig {
            pulse_width: Duration::ZERO,
            direction_settle: Duration::ZERO,
            ..MotionConfig::default()
        };
        let pen = PenConfig {
            settle: Duration::ZERO,
            ..PenConfig::default()
        };
        let travel = bench_travel(args.width, args.height);
        // Powered up somewhere in the middle of the travel, as a real
        // rig would be.
        let bench = SimBench::new(PinMap::default(), travel, (travel.0 / 2, travel.1 / 2));
        let stats = plot_on(bench.clone(), bench.clone(), motion, pen, &curve)?;
        eprintln!(
            "bench: {} x pulses, {} y pulses, {} trails",
            bench.step_count(Axis::X),
            bench.step_count(Axis::Y),
            bench.polylines().len(),
        );
        if let Some(path) = &args.svg {
            preview::save(path, &bench.polylines(), extents)
                .with_context(|| format!("could not write the preview to {}", path.display()))?;
            eprintln!("preview written to {}", path.display());
        }
        stats
    } else {
        if args.svg.is_some() {
            bail!("--svg previews come from the bench; pass --bench too");
        }
        plot_on(
            SysfsGpio::new(),
            SysfsPwm::new(),
            MotionConfig::default(),
            PenConfig::default(),
            &curve,
        )?
    };

    println!("{stats}");
    println!("{}", serde_json::to_string(&stats)?);
    Ok(stats)
}

/// The bench's travel extents. Extents beyond `i32` clamp rather than
/// wrap; a wrapped value would turn negative and leave the extreme
/// switches permanently engaged.
fn bench_travel(width: u32, height: u32) -> (i32, i32) {
    (
        i32::try_from(width).unwrap_or(i32::MAX),
        i32::try_from(height).unwrap_or(i32::MAX),
    )
}

fn plot_on<G: Gpio, P: Pwm>(
    gpio: G,
    pwm: P,
    motion: MotionConfig,
    pen: PenConfig,
    curve: &Curve,
) -> anyhow::Result<PlotStats> {
    let mut plotter = Plotter::new(gpio, pwm, PinMap::default(), motion, pen)
        .context("hardware setup failed")?;
    let bar = ProgressBar::new_spinner().with_message("drawing...");
    bar.enable_steady_tick(TICK);
    let stats = plotter.plot(curve)?;
    bar.finish_with_message("pen up, done");
    Ok(stats)
}

fn print_terms(poly: &Polynomial) -> anyhow::Result<()> {
    println!("drawing {poly}");
    println!("{:>4}  {:>11}  {:>8}", "term", "coefficient", "exponent");
    for (i, term) in poly.terms().iter().enumerate() {
        println!("{i:>4}  {:>11}  {:>8}", term.coefficient, term.exponent);
    }
    println!("{}", serde_json::to_string(poly)?);
    Ok(())
}

fn print_curve(curve: &Curve) -> anyhow::Result<()> {
    println!("{:>6}  {:>10}  {:>10}", "sample", "x", "y");
    for (i, s) in curve.samples().iter().enumerate() {
        match s.y {
            Some(y) => println!("{i:>6}  {:>10.3}  {y:>10.3}", s.x),
            None => println!("{i:>6}  {:>10.3}  {:>10}", s.x, "undefined"),
        }
    }
    println!("{}", serde_json::to_string(curve)?);
    Ok(())
}

fn note(run_log: &mut Option<RunLog>, text: &str) {
    if let Some(sink) = run_log {
        sink.line(text);
    }
}
