mod constants;

use crate::engine::FrameOutput;
use crate::labels::{TextAlign, TextMeasure};
use crate::notifications::DisplayedNotification;
use crate::render::{Color, RenderSurface, ScopePainter, CALLOUT_TEXT_PX};
use crate::scope::ScopeDriver;
use crate::sweep::SweepDirection;
use constants::{
    AIRCRAFT_REFERENCE_EXTENT, AIRCRAFT_REFERENCE_SHAPE, ALERT_RADIUS_STEP_KM, SCOPE_BACKGROUND,
    SIDE_PANEL_WIDTH, WEDGE_POINTS_PER_DEG, WINDOW_SIZE,
};
use eframe::{egui, epaint};

/// Opens the scope window and blocks until it is closed.
pub fn run(driver: ScopeDriver) -> eframe::Result {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(WINDOW_SIZE),
        ..Default::default()
    };
    eframe::run_native(
        "radarscope",
        options,
        Box::new(|_cc| Ok(Box::new(RadarApp::new(driver)))),
    )
}

pub struct RadarApp {
    driver: ScopeDriver,
    last_notification: Option<DisplayedNotification>,
}

impl RadarApp {
    #[must_use]
    pub fn new(driver: ScopeDriver) -> Self {
        Self {
            driver,
            last_notification: None,
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let engine = self.driver.engine_mut();
        ctx.input(|input| {
            if input.key_pressed(egui::Key::ArrowUp) {
                engine.adjust_range(1);
            }
            if input.key_pressed(egui::Key::ArrowDown) {
                engine.adjust_range(-1);
            }
            if input.key_pressed(egui::Key::CloseBracket) {
                engine.adjust_alert_radius(ALERT_RADIUS_STEP_KM);
            }
            if input.key_pressed(egui::Key::OpenBracket) {
                engine.adjust_alert_radius(-ALERT_RADIUS_STEP_KM);
            }
            if input.key_pressed(egui::Key::Equals) || input.key_pressed(egui::Key::Plus) {
                engine.adjust_volume(1);
            }
            if input.key_pressed(egui::Key::Minus) {
                engine.adjust_volume(-1);
            }
            if input.key_pressed(egui::Key::D) {
                let next = match engine.sweep().direction() {
                    SweepDirection::Clockwise => SweepDirection::CounterClockwise,
                    SweepDirection::CounterClockwise => SweepDirection::Clockwise,
                };
                engine.set_sweep_direction(next);
            }
            if input.key_pressed(egui::Key::F) {
                let enabled = !engine.display_only_selected();
                engine.set_display_only_selected(enabled);
            }
            if input.key_pressed(egui::Key::Escape) {
                engine.select_track(None);
            }
        });
    }

    fn side_panel(&self, ui: &mut egui::Ui) {
        let engine = self.driver.engine();
        ui.label(format!("Status: {}", engine.connection().label()));
        ui.separator();

        for (label, value) in engine.range_lines() {
            ui.label(format!("{label}: {value}"));
        }
        ui.separator();

        let info = engine.info_lines();
        if info.is_empty() {
            ui.label("No contact");
        }
        for (label, value) in info {
            ui.label(format!("{label}: {value}"));
        }
        ui.separator();

        ui.label("Recent alerts");
        for entry in engine.recent_alerts() {
            let prefix = if entry.resolved { "cleared" } else { "" };
            ui.label(format!("{} {prefix} {}", entry.at.format("%H:%M:%S"), entry.message));
        }
    }

    /// Selects the blip under the pointer, or clears the selection on a miss.
    fn select_at(&mut self, frame: &FrameOutput, pointer: (f64, f64)) {
        let hit = frame
            .blips
            .iter()
            .filter(|view| {
                let (dx, dy) = (view.blip.x - pointer.0, view.blip.y - pointer.1);
                dx.hypot(dy) <= view.marker_size.max(8.0)
            })
            .min_by(|a, b| {
                let da = (a.blip.x - pointer.0).hypot(a.blip.y - pointer.1);
                let db = (b.blip.x - pointer.0).hypot(b.blip.y - pointer.1);
                da.total_cmp(&db)
            })
            .map(|view| view.blip.key.clone());
        self.driver.engine_mut().select_track(hit.as_deref());
    }
}

impl eframe::App for RadarApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.driver.pump_feed();
        self.handle_keys(ctx);

        egui::SidePanel::right("scope_info")
            .exact_width(SIDE_PANEL_WIDTH)
            .show(ctx, |ui| self.side_panel(ui));

        egui::TopBottomPanel::bottom("ticker").show(ctx, |ui| {
            let (text, color) = match &self.last_notification {
                Some(shown) if shown.notification.alert => {
                    (shown.notification.text.as_str(), egui::Color32::LIGHT_RED)
                }
                Some(shown) => (shown.notification.text.as_str(), egui::Color32::LIGHT_GREEN),
                None => ("", egui::Color32::GRAY),
            };
            ui.colored_label(color, text);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let (response, painter) =
                    ui.allocate_painter(ui.available_size(), egui::Sense::click());
                let rect = response.rect;
                let mut surface = EguiSurface {
                    painter: &painter,
                    origin: rect.min,
                    size: rect.size(),
                };
                let (width, height) = surface.size();
                let frame = self.driver.frame(width, height, &surface);
                ScopePainter::paint(&frame, &mut surface);

                if response.clicked() {
                    if let Some(pointer) = response.interact_pointer_pos() {
                        let local = pointer - rect.min;
                        self.select_at(&frame, (f64::from(local.x), f64::from(local.y)));
                    }
                }
                self.last_notification = frame.notification;
            });

        ctx.request_repaint();
    }
}

/// [`RenderSurface`] over an egui painter, in coordinates local to `origin`.
pub struct EguiSurface<'a> {
    painter: &'a egui::Painter,
    origin: egui::Pos2,
    size: egui::Vec2,
}

#[allow(clippy::cast_possible_truncation)]
impl EguiSurface<'_> {
    fn pos(&self, point: (f64, f64)) -> egui::Pos2 {
        self.origin + egui::vec2(point.0 as f32, point.1 as f32)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_color32(color: Color) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(
        color.r,
        color.g,
        color.b,
        (color.a.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

fn to_align(align: TextAlign) -> egui::Align2 {
    match align {
        TextAlign::Left => egui::Align2::LEFT_CENTER,
        TextAlign::Center => egui::Align2::CENTER_CENTER,
        TextAlign::Right => egui::Align2::RIGHT_CENTER,
    }
}

impl TextMeasure for EguiSurface<'_> {
    #[allow(clippy::cast_possible_truncation)]
    fn measure(&self, text: &str) -> (f64, f64) {
        let galley = self.painter.layout_no_wrap(
            text.to_string(),
            egui::FontId::monospace(CALLOUT_TEXT_PX as f32),
            egui::Color32::WHITE,
        );
        let size = galley.size();
        (f64::from(size.x), f64::from(size.y))
    }
}

#[allow(clippy::cast_possible_truncation)]
impl RenderSurface for EguiSurface<'_> {
    fn size(&self) -> (f64, f64) {
        (f64::from(self.size.x), f64::from(self.size.y))
    }

    fn clear(&mut self) {
        self.painter.rect_filled(
            egui::Rect::from_min_size(self.origin, self.size),
            0.0,
            SCOPE_BACKGROUND,
        );
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Color) {
        self.painter.line_segment(
            [self.pos(from), self.pos(to)],
            egui::Stroke::new(width as f32, to_color32(color)),
        );
    }

    fn circle(
        &mut self,
        center: (f64, f64),
        radius: f64,
        fill: Option<Color>,
        stroke: Option<(f64, Color)>,
    ) {
        let fill = fill.map_or(egui::Color32::TRANSPARENT, to_color32);
        let stroke = stroke.map_or(egui::Stroke::NONE, |(width, color)| {
            egui::Stroke::new(width as f32, to_color32(color))
        });
        self.painter
            .circle(self.pos(center), radius as f32, fill, stroke);
    }

    #[allow(clippy::cast_sign_loss)]
    fn wedge(&mut self, center: (f64, f64), radius: f64, start_deg: f64, end_deg: f64, color: Color) {
        let span = end_deg - start_deg;
        let steps = ((span * WEDGE_POINTS_PER_DEG).ceil() as usize).max(1);
        let mut points = Vec::with_capacity(steps + 2);
        points.push(self.pos(center));
        for step in 0..=steps {
            #[allow(clippy::cast_precision_loss)]
            let bearing = (start_deg + span * step as f64 / steps as f64).to_radians();
            points.push(self.pos((
                center.0 + bearing.sin() * radius,
                center.1 - bearing.cos() * radius,
            )));
        }
        self.painter.add(egui::Shape::convex_polygon(
            points,
            to_color32(color),
            egui::Stroke::NONE,
        ));
    }

    fn polygon(&mut self, points: &[(f64, f64)], fill: Color) {
        let points = points.iter().map(|&point| self.pos(point)).collect();
        self.painter.add(egui::Shape::convex_polygon(
            points,
            to_color32(fill),
            egui::Stroke::NONE,
        ));
    }

    fn text(&mut self, position: (f64, f64), text: &str, size_px: f64, align: TextAlign, color: Color) {
        self.painter.text(
            self.pos(position),
            to_align(align),
            text,
            egui::FontId::monospace(size_px as f32),
            to_color32(color),
        );
    }

    fn marker(&mut self, center: (f64, f64), size: f64, heading_deg: f64, color: Color) {
        let aircraft_shape = apply_shape_on_point(
            self.pos(center),
            &AIRCRAFT_REFERENCE_SHAPE,
            size as f32 / AIRCRAFT_REFERENCE_EXTENT,
            egui::emath::Rot2::from_angle(heading_deg.to_radians() as f32),
        );
        let color = to_color32(color);
        self.painter.add(egui::Shape::convex_polygon(
            aircraft_shape,
            color,
            epaint::PathStroke::new(1.0, color),
        ));
    }
}

fn apply_shape_on_point(
    center_point: egui::Pos2,
    raw_shape: &[egui::Pos2],
    scale: f32,
    rotation: egui::emath::Rot2,
) -> Vec<egui::Pos2> {
    raw_shape
        .iter()
        .map(|&shape_point| center_point + rotation * (shape_point.to_vec2() * scale))
        .collect::<Vec<egui::Pos2>>()
}
