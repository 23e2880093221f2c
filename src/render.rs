use crate::engine::{BlipView, FrameOutput};
use crate::labels::{TextAlign, TextMeasure};
use crate::sweep::ScopeGeometry;

const RING_FRACTIONS: [f64; 3] = [1.0, 0.66, 0.33];
const RADIAL_SPACING_DEG: usize = 30;
const BEAM_HALF_WIDTH_DEG: f64 = 2.0;
const HEADING_TICK_FRACTION: f64 = 0.05;
const FALLBACK_DOT_FRACTION: f64 = 0.02;
const HIGHLIGHT_FACTOR: f64 = 0.55;
const ETA_OFFSET_FRACTION: f64 = 0.04;
const COMPASS_TEXT_FRACTION: f64 = 0.1;
const ETA_TEXT_FRACTION: f64 = 0.06;
pub const CALLOUT_TEXT_PX: f64 = 12.0;

/// Aircraft outline, nose up, in a 20 unit box.
const MARKER_SHAPE: [(f64, f64); 4] = [(0.0, -10.0), (7.0, 8.0), (0.0, 2.0), (-7.0, 8.0)];
const MARKER_SHAPE_EXTENT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity in `[0, 1]`.
    pub a: f64,
}

impl Color {
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Color { r, g, b, a }
    }

    #[must_use]
    pub fn with_alpha(self, a: f64) -> Self {
        Color {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Scales the existing opacity.
    #[must_use]
    pub fn faded(self, factor: f64) -> Self {
        self.with_alpha(self.a * factor)
    }
}

pub const SCOPE_GREEN: Color = Color::rgba(53, 255, 153, 1.0);
pub const ALERT_RED: Color = Color::rgba(255, 103, 103, 1.0);
pub const COMPASS_TEXT: Color = Color::rgba(200, 230, 220, 0.75);
pub const ETA_TEXT: Color = Color::rgba(255, 255, 255, 0.85);
pub const AIRSPACE_AMBER: Color = Color::rgba(255, 196, 87, 0.45);
pub const CALLOUT_TEXT: Color = Color::rgba(220, 240, 230, 0.9);

/// Drawing backend. Angles are compass bearings (0 = up, clockwise) and
/// coordinates are surface pixels with y growing downwards.
pub trait RenderSurface: TextMeasure {
    fn size(&self) -> (f64, f64);
    fn clear(&mut self);
    fn line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Color);
    fn circle(
        &mut self,
        center: (f64, f64),
        radius: f64,
        fill: Option<Color>,
        stroke: Option<(f64, Color)>,
    );
    fn wedge(&mut self, center: (f64, f64), radius: f64, start_deg: f64, end_deg: f64, color: Color);
    fn polygon(&mut self, points: &[(f64, f64)], fill: Color);
    fn text(&mut self, position: (f64, f64), text: &str, size_px: f64, align: TextAlign, color: Color);

    /// Aircraft marker `size` pixels tall, rotated to `heading_deg`.
    fn marker(&mut self, center: (f64, f64), size: f64, heading_deg: f64, color: Color) {
        let points = marker_outline(center, size, heading_deg);
        self.polygon(&points, color);
    }
}

#[must_use]
pub fn marker_outline(center: (f64, f64), size: f64, heading_deg: f64) -> Vec<(f64, f64)> {
    let scale = size / MARKER_SHAPE_EXTENT;
    let (sin, cos) = heading_deg.to_radians().sin_cos();
    MARKER_SHAPE
        .iter()
        .map(|&(x, y)| {
            let (x, y) = (x * scale, y * scale);
            (center.0 + x * cos - y * sin, center.1 + x * sin + y * cos)
        })
        .collect()
}

fn polar(geometry: &ScopeGeometry, bearing_deg: f64, radius: f64) -> (f64, f64) {
    let (sin, cos) = bearing_deg.to_radians().sin_cos();
    (geometry.center_x + sin * radius, geometry.center_y - cos * radius)
}

pub struct ScopePainter;

impl ScopePainter {
    pub fn paint(frame: &FrameOutput, surface: &mut dyn RenderSurface) {
        let geometry = &frame.geometry;
        surface.clear();
        Self::paint_background(geometry, surface);
        Self::paint_beam(geometry, frame.beam_bearing_deg, surface);
        Self::paint_compass(geometry, surface);

        for airspace in &frame.airspaces {
            surface.circle(airspace.center, airspace.radius_px, None, Some((1.0, AIRSPACE_AMBER)));
            let (x, y) = airspace.label_rect.center();
            surface.text((x, y), &airspace.icao, CALLOUT_TEXT_PX, TextAlign::Center, AIRSPACE_AMBER);
        }

        for view in &frame.blips {
            Self::paint_blip(geometry, view, surface);
        }

        for callout in &frame.callouts {
            let placement = &callout.placement;
            let (from, to) = placement.leader;
            surface.line(from, to, 1.0, SCOPE_GREEN.with_alpha(0.5));
            let rect = &placement.rect;
            let y = rect.y + rect.height / 2.0;
            let x = match placement.align {
                TextAlign::Left => rect.x,
                TextAlign::Center => rect.x + rect.width / 2.0,
                TextAlign::Right => rect.right(),
            };
            surface.text((x, y), &callout.text, CALLOUT_TEXT_PX, placement.align, CALLOUT_TEXT);
        }
    }

    fn paint_background(geometry: &ScopeGeometry, surface: &mut dyn RenderSurface) {
        let center = (geometry.center_x, geometry.center_y);
        let stroke_width = (geometry.radius * 0.0025).max(1.0);
        let grid = SCOPE_GREEN.with_alpha(0.35);

        surface.circle(center, geometry.radius, Some(SCOPE_GREEN.with_alpha(0.08)), None);
        for fraction in RING_FRACTIONS {
            surface.circle(center, geometry.radius * fraction, None, Some((stroke_width, grid)));
        }
        for bearing in (0..360).step_by(RADIAL_SPACING_DEG) {
            #[allow(clippy::cast_precision_loss)]
            let end = polar(geometry, bearing as f64, geometry.radius);
            surface.line(center, end, stroke_width, grid);
        }
    }

    fn paint_beam(geometry: &ScopeGeometry, bearing_deg: f64, surface: &mut dyn RenderSurface) {
        surface.wedge(
            (geometry.center_x, geometry.center_y),
            geometry.radius,
            bearing_deg - BEAM_HALF_WIDTH_DEG,
            bearing_deg + BEAM_HALF_WIDTH_DEG,
            SCOPE_GREEN.with_alpha(0.6),
        );
    }

    fn paint_compass(geometry: &ScopeGeometry, surface: &mut dyn RenderSurface) {
        let square = geometry.width.min(geometry.height);
        let offset = (geometry.radius + square * 0.03).min(square / 2.0 - square * 0.02);
        let size = geometry.radius * COMPASS_TEXT_FRACTION;
        let (cx, cy) = (geometry.center_x, geometry.center_y);
        surface.text((cx, cy - offset), "N", size, TextAlign::Center, COMPASS_TEXT);
        surface.text((cx, cy + offset), "S", size, TextAlign::Center, COMPASS_TEXT);
        surface.text((cx + offset, cy), "E", size, TextAlign::Left, COMPASS_TEXT);
        surface.text((cx - offset, cy), "W", size, TextAlign::Right, COMPASS_TEXT);
    }

    fn paint_blip(geometry: &ScopeGeometry, view: &BlipView, surface: &mut dyn RenderSurface) {
        let blip = &view.blip;
        let inbound = blip.annotation.alerting;
        let position = (blip.x, blip.y);
        let alpha = if inbound {
            view.alpha.max(0.25)
        } else {
            view.alpha * 0.8
        };
        let base = if inbound { ALERT_RED } else { SCOPE_GREEN };

        let (sin, cos) = blip.heading_deg.to_radians().sin_cos();
        let tick = geometry.radius * HEADING_TICK_FRACTION;
        surface.line(
            position,
            (blip.x + sin * tick, blip.y - cos * tick),
            (geometry.radius * 0.0025).max(1.0),
            base.with_alpha(0.8).faded(alpha),
        );

        if view.marker_size > 0.0 {
            if inbound {
                surface.circle(
                    position,
                    view.marker_size * HIGHLIGHT_FACTOR,
                    Some(ALERT_RED.with_alpha(0.35).faded(view.alpha.max(0.3))),
                    None,
                );
            }
            let marker_alpha = if inbound { view.alpha.max(0.6) } else { view.alpha };
            surface.marker(position, view.marker_size, blip.heading_deg, base.with_alpha(marker_alpha));
        } else {
            surface.circle(
                position,
                geometry.radius * FALLBACK_DOT_FRACTION,
                Some(base.with_alpha(alpha)),
                None,
            );
        }

        if let (true, Some(minutes)) = (inbound, blip.annotation.minutes_to_base) {
            surface.text(
                (blip.x, blip.y - geometry.radius * ETA_OFFSET_FRACTION),
                &format!("{minutes}m"),
                geometry.radius * ETA_TEXT_FRACTION,
                TextAlign::Center,
                ETA_TEXT,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{marker_outline, Color, RenderSurface, ScopePainter, ALERT_RED};
    use crate::engine::{BlipView, FrameOutput};
    use crate::labels::{MonospaceMeasure, Rect, TextAlign, TextMeasure};
    use crate::sweep::{Blip, BlipAnnotation, ScopeGeometry};

    #[derive(Debug, Clone, PartialEq)]
    enum DrawCommand {
        Clear,
        Line,
        Circle { fill: Option<Color> },
        Wedge { start_deg: f64, end_deg: f64 },
        Polygon { points: usize, fill: Color },
        Text { text: String, position: (f64, f64) },
    }

    #[derive(Default)]
    struct RecordingSurface {
        commands: Vec<DrawCommand>,
    }

    impl RecordingSurface {
        fn texts(&self) -> Vec<&str> {
            self.commands
                .iter()
                .filter_map(|command| match command {
                    DrawCommand::Text { text, .. } => Some(text.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl TextMeasure for RecordingSurface {
        fn measure(&self, text: &str) -> (f64, f64) {
            MonospaceMeasure::default().measure(text)
        }
    }

    impl RenderSurface for RecordingSurface {
        fn size(&self) -> (f64, f64) {
            (400.0, 400.0)
        }
        fn clear(&mut self) {
            self.commands.push(DrawCommand::Clear);
        }
        fn line(&mut self, _from: (f64, f64), _to: (f64, f64), _width: f64, _color: Color) {
            self.commands.push(DrawCommand::Line);
        }
        fn circle(
            &mut self,
            _center: (f64, f64),
            _radius: f64,
            fill: Option<Color>,
            _stroke: Option<(f64, Color)>,
        ) {
            self.commands.push(DrawCommand::Circle { fill });
        }
        fn wedge(&mut self, _center: (f64, f64), _radius: f64, start_deg: f64, end_deg: f64, _color: Color) {
            self.commands.push(DrawCommand::Wedge { start_deg, end_deg });
        }
        fn polygon(&mut self, points: &[(f64, f64)], fill: Color) {
            self.commands.push(DrawCommand::Polygon {
                points: points.len(),
                fill,
            });
        }
        fn text(&mut self, position: (f64, f64), text: &str, _size_px: f64, _align: TextAlign, _color: Color) {
            self.commands.push(DrawCommand::Text {
                text: text.to_string(),
                position,
            });
        }
    }

    fn empty_frame() -> FrameOutput {
        FrameOutput {
            geometry: ScopeGeometry::fit(400.0, 400.0, 50.0),
            beam_bearing_deg: 90.0,
            sweep_id: 0,
            blips: Vec::new(),
            callouts: Vec::new(),
            airspaces: Vec::new(),
            painted: Vec::new(),
            notification: None,
        }
    }

    fn blip_view(alerting: bool, minutes_to_base: Option<i64>) -> BlipView {
        BlipView {
            blip: Blip {
                key: String::from("ABC123"),
                x: 200.0,
                y: 120.0,
                heading_deg: 180.0,
                spawned_at: chrono::DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp"),
                altitude_ft: 5000,
                distance_km: 11.1,
                flight: String::from("ABC123"),
                annotation: BlipAnnotation {
                    alerting,
                    minutes_to_base,
                },
            },
            alpha: 0.1,
            marker: Rect::from_center((200.0, 120.0), 25.0, 25.0),
            marker_size: 25.2,
        }
    }

    #[test]
    fn when_scope_painted_then_grid_beam_and_compass_drawn() {
        let mut surface = RecordingSurface::default();
        ScopePainter::paint(&empty_frame(), &mut surface);

        assert_eq!(surface.commands[0], DrawCommand::Clear);
        // glow plus three rings
        let circles = surface
            .commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::Circle { .. }))
            .count();
        assert_eq!(circles, 4);
        let radials = surface
            .commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::Line))
            .count();
        assert_eq!(radials, 12);
        assert!(surface.commands.contains(&DrawCommand::Wedge {
            start_deg: 88.0,
            end_deg: 92.0
        }));
        assert_eq!(surface.texts(), vec!["N", "S", "E", "W"]);
    }

    #[test]
    fn when_inbound_blip_painted_then_highlight_marker_and_eta_drawn() {
        let mut frame = empty_frame();
        frame.blips.push(blip_view(true, Some(7)));
        let mut surface = RecordingSurface::default();
        ScopePainter::paint(&frame, &mut surface);

        assert!(surface.texts().contains(&"7m"));
        let marker = surface
            .commands
            .iter()
            .find_map(|command| match command {
                DrawCommand::Polygon { points, fill } => Some((*points, *fill)),
                _ => None,
            })
            .expect("marker drawn");
        assert_eq!(marker.0, 4);
        assert_eq!((marker.1.r, marker.1.g, marker.1.b), (ALERT_RED.r, ALERT_RED.g, ALERT_RED.b));
        // faded blip still visible because it is inbound
        assert!((marker.1.a - 0.6).abs() < 1e-9);
    }

    #[test]
    fn when_blip_not_inbound_then_no_eta_text() {
        let mut frame = empty_frame();
        frame.blips.push(blip_view(false, Some(7)));
        let mut surface = RecordingSurface::default();
        ScopePainter::paint(&frame, &mut surface);
        assert!(!surface.texts().contains(&"7m"));
    }

    #[test]
    fn when_marker_rotated_east_then_nose_points_right() {
        let outline = marker_outline((100.0, 100.0), 20.0, 90.0);
        let nose = outline[0];
        assert!((nose.0 - 110.0).abs() < 1e-9);
        assert!((nose.1 - 100.0).abs() < 1e-9);
    }
}
