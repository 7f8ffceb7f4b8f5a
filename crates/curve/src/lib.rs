//! Sampling a polynomial over a rectangular window and mapping the
//! result into device coordinates.
//!
//! The window is a [`kurbo::Rect`]: `x0..x1` is the sampling domain and
//! `y0..y1` the visible band. Values that land outside the band are not
//! clipped to its edge; they become undefined samples, which downstream
//! code renders as pen-up gaps. The device is described by a
//! [`kurbo::Size`] giving its travel along each axis, in steps.

use kurbo::{Point, Rect, Size};
use polygraph_expr::Polynomial;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One curve point in device coordinates. `y` is `None` when the
/// evaluated value fell outside the window band.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: Option<f64>,
}

impl Sample {
    /// The sample as a point, when it is defined.
    pub fn point(&self) -> Option<Point> {
        self.y.map(|y| Point::new(self.x, y))
    }
}

/// A run of samples ordered by strictly increasing `x`, with `x`
/// starting at 0 and `y` (where defined) inside `0..=height`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    samples: Vec<Sample>,
}

impl Curve {
    /// Assemble a curve from already-mapped samples.
    pub fn new(samples: Vec<Sample>) -> Curve {
        Curve { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A window the sampler cannot work with. Raised before any evaluation
/// happens; a run that gets one must stop.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum BoundsError {
    #[error("empty domain: x1 ({x1}) must exceed x0 ({x0})")]
    EmptyDomain { x0: f64, x1: f64 },
    #[error("empty window band: y1 ({y1}) must exceed y0 ({y0})")]
    EmptyBand { y0: f64, y1: f64 },
    #[error("sample count must be at least 1")]
    NoSamples,
}

/// Sample `poly` across `window` and map the result onto a device with
/// the given travel `extents`.
///
/// The `count` x-values start at `window.x0` and advance by the domain
/// span over `count`, so the last one stops a step short of `window.x1`.
/// Each value is then translated so the first sample sits at x 0,
/// normalized by the window spans, and scaled by the extents. Undefined
/// samples keep their mapped x but carry no y.
pub fn sample(
    poly: &Polynomial,
    window: Rect,
    count: usize,
    extents: Size,
) -> Result<Curve, BoundsError> {
    if window.x1 <= window.x0 {
        return Err(BoundsError::EmptyDomain {
            x0: window.x0,
            x1: window.x1,
        });
    }
    if window.y1 <= window.y0 {
        return Err(BoundsError::EmptyBand {
            y0: window.y0,
            y1: window.y1,
        });
    }
    if count == 0 {
        return Err(BoundsError::NoSamples);
    }

    let x_span = window.x1 - window.x0;
    let y_span = window.y1 - window.y0;
    let step = x_span / count as f64;

    let mut samples = Vec::with_capacity(count);
    for i in 0..count {
        let x = window.x0 + i as f64 * step;
        let y = poly.eval(x);
        let y = (window.y0 <= y && y <= window.y1).then_some(y);
        samples.push(Sample {
            x: (x - window.x0) / x_span * extents.width,
            y: y.map(|y| (y - window.y0) / y_span * extents.height),
        });
    }
    Ok(Curve { samples })
}
