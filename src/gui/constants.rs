use eframe::egui;

pub const AIRCRAFT_REFERENCE_SHAPE: [egui::Pos2; 4] = [
    egui::pos2(0.0, -10.0), // Nose
    egui::pos2(7.0, 8.0),   // Right Wing tip
    egui::pos2(0.0, 2.0),   // Tail center indentation
    egui::pos2(-7.0, 8.0),  // Left Wing tip
];
/// Height of [`AIRCRAFT_REFERENCE_SHAPE`].
pub const AIRCRAFT_REFERENCE_EXTENT: f32 = 20.0;

pub const SCOPE_BACKGROUND: egui::Color32 = egui::Color32::from_rgb(11, 14, 23);
pub const WINDOW_SIZE: [f32; 2] = [1100.0, 800.0];
pub const SIDE_PANEL_WIDTH: f32 = 240.0;

pub const ALERT_RADIUS_STEP_KM: f64 = 1.0;
/// Wedge outline resolution, in points per degree.
pub const WEDGE_POINTS_PER_DEG: f64 = 0.5;
