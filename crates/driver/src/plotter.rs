//! Walking a sampled curve on the hardware.
//!
//! The plotter owns the head and the pen and sequences them: pen safely
//! up, home (or return to the origin), then visit the samples in order,
//! lifting across undefined stretches and lowering again afterwards.
//! The pen never touches the paper before the first defined sample has
//! been visited.

use std::fmt;
use std::time::Instant;

use log::{debug, info};
use polygraph_curve::Curve;
use serde::Serialize;

use crate::head::{Head, HomingError, MotionConfig, Position};
use crate::io::{Gpio, Pwm, SetupError};
use crate::pen::{Pen, PenConfig};
use crate::pins::PinMap;

/// Whether the pen is on the paper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PenState {
    Up,
    Down,
}

/// What a finished plot cost.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PlotStats {
    /// Sum of the straight-line distances between the positions the
    /// head actually visited, in steps. Not a pulse count: a blocked
    /// move contributes only the ground it covered.
    pub path_length: f64,
    /// Wall-clock time for the whole traversal.
    pub elapsed_secs: f64,
}

impl fmt::Display for PlotStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "path length {:.1} steps, elapsed {:.2} s",
            self.path_length, self.elapsed_secs
        )
    }
}

pub struct Plotter<G, P> {
    head: Head<G>,
    pen: Pen<P>,
    pen_state: PenState,
    homed: bool,
}

impl<G: Gpio, P: Pwm> Plotter<G, P> {
    /// Claim every line the rig needs and bring the pen channel up in
    /// the lifted position.
    pub fn new(
        gpio: G,
        pwm: P,
        pins: PinMap,
        motion: MotionConfig,
        pen: PenConfig,
    ) -> Result<Plotter<G, P>, SetupError> {
        let head = Head::new(gpio, pins, motion)?;
        let pen = Pen::new(pwm, pins.pen_channel, pen)?;
        Ok(Plotter {
            head,
            pen,
            pen_state: PenState::Up,
            homed: false,
        })
    }

    pub fn position(&self) -> Position {
        self.head.position()
    }

    fn lift(&mut self) {
        self.pen.lift();
        self.pen_state = PenState::Up;
    }

    fn lower(&mut self) {
        self.pen.lower();
        self.pen_state = PenState::Down;
    }

    /// Draw `curve` and report what it cost.
    ///
    /// The first plot homes the rig; later plots return to the origin
    /// through an ordinary walk. Undefined samples break the trace: the
    /// pen lifts, the gap's motion is skipped entirely, and the pen
    /// lowers again only after the next defined sample is on deck. A
    /// curve with no defined samples moves nothing and never lowers.
    pub fn plot(&mut self, curve: &Curve) -> Result<PlotStats, HomingError> {
        let started = Instant::now();

        // Pen up before anything moves, whatever we believe its state
        // to be.
        self.lift();
        if self.homed {
            self.head.move_to(Position::default());
        } else {
            self.head.home()?;
            self.homed = true;
        }
        debug!("head at the origin, walking {} samples", curve.len());

        let mut path_length = 0.0;
        let mut visited_any = false;
        for sample in curve.samples() {
            let Some(point) = sample.point() else {
                if self.pen_state == PenState::Down {
                    self.lift();
                }
                continue;
            };

            if self.pen_state == PenState::Up && visited_any {
                self.lower();
            }

            let target = Position::new(point.x.round() as i32, point.y.round() as i32);
            let from = self.head.position();
            let reached = self.head.move_to(target);
            path_length += from.distance(reached);
            visited_any = true;
        }

        // Leave the pen up between plots.
        self.lift();

        let stats = PlotStats {
            path_length,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        info!("plot finished: {stats}");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use polygraph_curve::{sample, Sample};
    use polygraph_expr::parse;

    use crate::head::{Axis, Direction};
    use crate::sim::{SimBench, SimEvent};

    const UP: f32 = 8.0;
    const DOWN: f32 = 12.0;

    fn quick_motion() -> MotionConfig {
        MotionConfig {
            pulse_width: Duration::ZERO,
            direction_settle: Duration::ZERO,
            ..MotionConfig::default()
        }
    }

    fn quick_pen() -> PenConfig {
        PenConfig {
            settle: Duration::ZERO,
            ..PenConfig::default()
        }
    }

    fn rig(start: (i32, i32)) -> (SimBench, Plotter<SimBench, SimBench>) {
        let bench = SimBench::new(PinMap::default(), (100, 100), start);
        let plotter = Plotter::new(
            bench.clone(),
            bench.clone(),
            PinMap::default(),
            quick_motion(),
            quick_pen(),
        )
        .unwrap();
        (bench, plotter)
    }

    fn defined(x: f64, y: f64) -> Sample {
        Sample { x, y: Some(y) }
    }

    fn gap(x: f64) -> Sample {
        Sample { x, y: None }
    }

    #[test]
    fn pen_and_motion_interleave_exactly() {
        let (bench, mut plotter) = rig((0, 0));
        let curve = Curve::new(vec![defined(1.0, 0.0), defined(2.0, 0.0)]);
        plotter.plot(&curve).unwrap();

        use SimEvent::*;
        let x = Step {
            axis: Axis::X,
            direction: Direction::Positive,
        };
        // Channel start at construction, the safety lift, no homing
        // pulses (the rig already sits at the origin), then: move to the
        // first sample pen-up, lower, draw to the second, final lift.
        assert_eq!(
            bench.events(),
            vec![
                PenDuty { duty_pct: UP },
                PenDuty { duty_pct: UP },
                x,
                PenDuty { duty_pct: DOWN },
                x,
                PenDuty { duty_pct: UP },
            ]
        );
    }

    #[test]
    fn never_lowers_before_the_first_defined_sample() {
        let (bench, mut plotter) = rig((0, 0));
        let curve = Curve::new(vec![gap(0.0), gap(1.0), defined(2.0, 2.0)]);
        plotter.plot(&curve).unwrap();
        assert!(!bench
            .events()
            .iter()
            .any(|e| matches!(e, SimEvent::PenDuty { duty_pct } if *duty_pct == DOWN)));
    }

    #[test]
    fn gaps_lift_then_lower_before_moving_on() {
        let (bench, mut plotter) = rig((0, 0));
        let curve = Curve::new(vec![
            defined(1.0, 0.0),
            defined(2.0, 0.0),
            gap(3.0),
            defined(4.0, 0.0),
        ]);
        plotter.plot(&curve).unwrap();

        // Pen-down trails: one for the stretch drawn before the gap,
        // one after. The gap's motion itself was skipped, so the second
        // trail starts where the first ended.
        let trails = bench.polylines();
        assert_eq!(trails.len(), 2);
        assert_eq!(trails[0].first().map(|p| p.x), Some(1.0));
        assert_eq!(trails[0].last().map(|p| p.x), Some(2.0));
        assert_eq!(trails[1].first().map(|p| p.x), Some(2.0));
        assert_eq!(trails[1].last().map(|p| p.x), Some(4.0));
    }

    #[test]
    fn all_gaps_never_move_or_lower() {
        let (bench, mut plotter) = rig((0, 0));
        let curve = Curve::new(vec![gap(0.0), gap(1.0), gap(2.0)]);
        let stats = plotter.plot(&curve).unwrap();
        assert_eq!(stats.path_length, 0.0);
        assert_eq!(bench.step_count(Axis::X), 0);
        assert_eq!(bench.step_count(Axis::Y), 0);
        assert!(bench.polylines().is_empty());
    }

    #[test]
    fn homes_before_the_first_plot_only() {
        let (bench, mut plotter) = rig((3, 2));
        let curve = Curve::new(vec![defined(1.0, 1.0)]);
        plotter.plot(&curve).unwrap();
        // 3 + 2 homing pulses, then the walk to (1, 1).
        assert_eq!(bench.step_count(Axis::X), 4);
        assert_eq!(bench.step_count(Axis::Y), 3);
        assert_eq!(bench.position(), (1, 1));

        let before = bench.events().len();
        plotter.plot(&curve).unwrap();
        // The second plot returns to the origin by walking, then redraws.
        assert_eq!(bench.position(), (1, 1));
        assert!(bench.events().len() > before);
    }

    #[test]
    fn path_length_counts_only_ground_covered() {
        let (_bench, mut plotter) = rig((0, 0));
        // The second sample asks for x = 150 on a 100-step rig; the move
        // stops short at the extreme.
        let curve = Curve::new(vec![defined(0.0, 0.0), defined(150.0, 0.0)]);
        let stats = plotter.plot(&curve).unwrap();
        assert_eq!(stats.path_length, 100.0);
        assert_eq!(plotter.position(), Position::new(100, 0));
    }

    #[test]
    fn fractional_samples_round_to_the_nearest_step() {
        let (bench, mut plotter) = rig((0, 0));
        let curve = Curve::new(vec![defined(2.5, 0.0), defined(5.2, 3.7)]);
        plotter.plot(&curve).unwrap();
        assert_eq!(bench.position(), (5, 4));
        // 2.5 rounds away from zero.
        assert_eq!(plotter.position(), Position::new(5, 4));
    }

    #[test]
    fn plots_a_sampled_parabola_end_to_end() {
        let poly = parse("3x^2+2x").unwrap();
        let curve = sample(
            &poly,
            kurbo::Rect::new(-2.0, -1.0, 2.0, 4.0),
            10,
            kurbo::Size::new(100.0, 80.0),
        )
        .unwrap();
        let (bench, mut plotter) = rig((0, 0));
        let stats = plotter.plot(&curve).unwrap();
        assert!(stats.path_length > 0.0);
        // The defined stretch is contiguous, so exactly one trail.
        assert_eq!(bench.polylines().len(), 1);
    }
}
