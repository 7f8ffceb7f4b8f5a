//! SVG rendering of a bench run's pen trails.

use kurbo::{Point, Size};
use svg::node::element::{path::Data, Path, Rectangle};
use svg::Document;

/// Write the pen-down trails as an SVG. Device y grows upward, SVG y
/// grows downward, so the trails are flipped to read the way the paper
/// would.
pub fn save(
    path: &std::path::Path,
    trails: &[Vec<Point>],
    extents: Size,
) -> std::io::Result<()> {
    let mut document =
        Document::new().set("viewBox", (0.0, 0.0, extents.width, extents.height));
    document = document.add(
        Rectangle::new()
            .set("width", extents.width)
            .set("height", extents.height)
            .set("fill", "white")
            .set("stroke", "gray"),
    );
    for trail in trails {
        let mut flipped = trail.iter().map(|p| (p.x, extents.height - p.y));
        let Some(first) = flipped.next() else {
            continue;
        };
        let mut data = Data::new().move_to(first);
        for point in flipped {
            data = data.line_to(point);
        }
        document = document.add(
            Path::new()
                .set("fill", "none")
                .set("stroke", "black")
                .set("stroke-width", 1)
                .set("d", data),
        );
    }
    svg::save(path, &document)
}
