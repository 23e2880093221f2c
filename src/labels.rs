/// Axis-aligned rectangle in surface pixels; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn from_center(center: (f64, f64), width: f64, height: f64) -> Self {
        Rect::new(center.0 - width / 2.0, center.1 - height / 2.0, width, height)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Touching edges do not count as overlap.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    #[must_use]
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Shifts `self` the least amount needed to lie inside `bounds`, or `None`
    /// when it is larger than `bounds`.
    #[must_use]
    pub fn clamp_within(&self, bounds: &Rect) -> Option<Rect> {
        if self.width > bounds.width || self.height > bounds.height {
            return None;
        }
        let x = self.x.clamp(bounds.x, bounds.right() - self.width);
        let y = self.y.clamp(bounds.y, bounds.bottom() - self.height);
        Some(Rect::new(x, y, self.width, self.height))
    }

    /// Point of the rectangle closest to `point`.
    #[must_use]
    pub fn nearest_point(&self, point: (f64, f64)) -> (f64, f64) {
        (
            point.0.clamp(self.x, self.right()),
            point.1.clamp(self.y, self.bottom()),
        )
    }
}

/// Bounding box of a `width`×`height` marker centred on `center` and rotated by
/// `heading_deg` clockwise.
#[must_use]
pub fn marker_footprint(center: (f64, f64), width: f64, height: f64, heading_deg: f64) -> Rect {
    let heading = if heading_deg.is_finite() {
        heading_deg.to_radians()
    } else {
        0.0
    };
    let (sin, cos) = (heading.sin().abs(), heading.cos().abs());
    Rect::from_center(center, width * cos + height * sin, width * sin + height * cos)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub rect: Rect,
    /// Top-left of `rect` relative to the anchor.
    pub offset: (f64, f64),
    pub align: TextAlign,
    /// Leader line from the anchor to the nearest point of `rect`.
    pub leader: ((f64, f64), (f64, f64)),
}

impl Placement {
    fn at(anchor: (f64, f64), rect: Rect, align: TextAlign) -> Self {
        Placement {
            rect,
            offset: (rect.x - anchor.0, rect.y - anchor.1),
            align,
            leader: (anchor, rect.nearest_point(anchor)),
        }
    }

    #[must_use]
    pub fn leader_length(&self) -> f64 {
        let ((x1, y1), (x2, y2)) = self.leader;
        (x2 - x1).hypot(y2 - y1)
    }
}

/// One direction and distance to try, in search order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelCandidate {
    /// Unit vector in screen space (y grows downwards).
    pub direction: (f64, f64),
    pub radius_factor: f64,
}

/// Diagonals, then cardinals, then the in-between directions (compass degrees).
const CANDIDATE_DIRECTIONS_DEG: [f64; 16] = [
    45.0, 315.0, 135.0, 225.0, 90.0, 270.0, 0.0, 180.0, 22.5, 337.5, 67.5, 292.5, 112.5, 247.5,
    157.5, 202.5,
];
const CANDIDATE_RADIUS_FACTORS: [f64; 3] = [1.0, 1.6, 2.4];

/// Below this magnitude a direction component does not push the label off-centre.
const AXIS_THRESHOLD: f64 = 0.2;

const SCORE_EPSILON: f64 = 1e-9;

pub static RANKED_CANDIDATES: once_cell::sync::Lazy<Vec<LabelCandidate>> =
    once_cell::sync::Lazy::new(|| {
        CANDIDATE_RADIUS_FACTORS
            .iter()
            .flat_map(|radius_factor| {
                CANDIDATE_DIRECTIONS_DEG.iter().map(move |degrees| {
                    let radians = degrees.to_radians();
                    LabelCandidate {
                        direction: (radians.sin(), -radians.cos()),
                        radius_factor: *radius_factor,
                    }
                })
            })
            .collect()
    });

/// Everything a candidate rectangle must stay clear of.
#[derive(Debug, Clone, Copy)]
pub struct PlacementConstraints<'a> {
    pub surface: Rect,
    pub own_marker: Rect,
    pub other_markers: &'a [Rect],
    pub placed: &'a [Rect],
}

impl PlacementConstraints<'_> {
    #[must_use]
    pub fn accepts(&self, rect: &Rect) -> bool {
        self.surface.contains(rect)
            && !rect.intersects(&self.own_marker)
            && !self.other_markers.iter().any(|marker| rect.intersects(marker))
            && !self.placed.iter().any(|placed| rect.intersects(placed))
    }
}

fn signed_half(component: f64, half: f64) -> f64 {
    if component > AXIS_THRESHOLD {
        half
    } else if component < -AXIS_THRESHOLD {
        -half
    } else {
        0.0
    }
}

fn align_for(direction: (f64, f64)) -> TextAlign {
    if direction.0 > AXIS_THRESHOLD {
        TextAlign::Left
    } else if direction.0 < -AXIS_THRESHOLD {
        TextAlign::Right
    } else {
        TextAlign::Center
    }
}

/// Rectangle whose side facing the anchor sits `gap` pixels out along the candidate direction.
fn candidate_rect(anchor: (f64, f64), size: (f64, f64), gap: f64, candidate: &LabelCandidate) -> Rect {
    let (dx, dy) = candidate.direction;
    let center = (
        anchor.0 + dx * gap + signed_half(dx, size.0 / 2.0),
        anchor.1 + dy * gap + signed_half(dy, size.1 / 2.0),
    );
    Rect::from_center(center, size.0, size.1)
}

/// Finds the closest valid position for a `size` label around `anchor`.
///
/// Every candidate is clamped into the surface and checked against the
/// constraints; the one with the shortest leader wins, ties going to the
/// earlier candidate.
#[must_use]
pub fn place_label(
    anchor: (f64, f64),
    size: (f64, f64),
    base_radius: f64,
    candidates: &[LabelCandidate],
    constraints: &PlacementConstraints,
) -> Option<Placement> {
    let mut best: Option<(f64, Placement)> = None;
    for candidate in candidates {
        let gap = base_radius * candidate.radius_factor;
        let Some(rect) = candidate_rect(anchor, size, gap, candidate).clamp_within(&constraints.surface)
        else {
            continue;
        };
        if !constraints.accepts(&rect) {
            continue;
        }
        let placement = Placement::at(anchor, rect, align_for(candidate.direction));
        let score = placement.leader_length();
        if best
            .as_ref()
            .map_or(true, |(best_score, _)| score < best_score - SCORE_EPSILON)
        {
            best = Some((score, placement));
        }
    }
    best.map(|(_, placement)| placement)
}

/// Width and height of rendered text.
pub trait TextMeasure {
    fn measure(&self, text: &str) -> (f64, f64);
}

/// Fixed advance per character; good enough for the headless scope and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasure {
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        MonospaceMeasure {
            char_width: 7.0,
            line_height: 14.0,
        }
    }
}

impl TextMeasure for MonospaceMeasure {
    #[allow(clippy::cast_precision_loss)]
    fn measure(&self, text: &str) -> (f64, f64) {
        let lines: Vec<&str> = text.lines().collect();
        let widest = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
        (
            widest as f64 * self.char_width,
            lines.len().max(1) as f64 * self.line_height,
        )
    }
}

/// A label that wants a position this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CalloutRequest {
    pub key: String,
    pub anchor: (f64, f64),
    pub marker: Rect,
    pub text: String,
    pub size: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedCallout {
    pub key: String,
    pub text: String,
    pub placement: Placement,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StoredCallout {
    offset: (f64, f64),
    align: TextAlign,
}

/// Last good label offset per track key.
#[derive(Debug, Default)]
pub struct CalloutStore {
    placements: std::collections::HashMap<String, StoredCallout>,
}

impl CalloutStore {
    #[must_use]
    pub fn new() -> Self {
        CalloutStore::default()
    }

    /// Places every requested callout in order. `reserved` holds rectangles
    /// claimed before any callout, such as static map labels.
    pub fn layout(
        &mut self,
        requests: &[CalloutRequest],
        reserved: &[Rect],
        surface: Rect,
        base_radius: f64,
    ) -> Vec<PlacedCallout> {
        let markers: Vec<Rect> = requests.iter().map(|request| request.marker).collect();
        let mut placed: Vec<Rect> = reserved.to_vec();
        let mut callouts = Vec::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            let other_markers: Vec<Rect> = markers
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .map(|(_, marker)| *marker)
                .collect();
            let constraints = PlacementConstraints {
                surface,
                own_marker: request.marker,
                other_markers: &other_markers,
                placed: &placed,
            };
            if let Some(placement) = self.place(request, base_radius, &constraints) {
                placed.push(placement.rect);
                callouts.push(PlacedCallout {
                    key: request.key.clone(),
                    text: request.text.clone(),
                    placement,
                });
            }
        }
        callouts
    }

    /// Reuses the stored offset when it still satisfies `constraints`,
    /// otherwise searches afresh and remembers the result.
    pub fn place(
        &mut self,
        request: &CalloutRequest,
        base_radius: f64,
        constraints: &PlacementConstraints,
    ) -> Option<Placement> {
        if let Some(stored) = self.placements.get(&request.key) {
            let rect = Rect::new(
                request.anchor.0 + stored.offset.0,
                request.anchor.1 + stored.offset.1,
                request.size.0,
                request.size.1,
            );
            if constraints.accepts(&rect) {
                return Some(Placement::at(request.anchor, rect, stored.align));
            }
        }

        match place_label(
            request.anchor,
            request.size,
            base_radius,
            &RANKED_CANDIDATES,
            constraints,
        ) {
            Some(placement) => {
                self.placements.insert(
                    request.key.clone(),
                    StoredCallout {
                        offset: placement.offset,
                        align: placement.align,
                    },
                );
                Some(placement)
            }
            None => {
                log::debug!("No room for callout {}", request.key);
                self.placements.remove(&request.key);
                None
            }
        }
    }

    pub fn retain(&mut self, keys: &std::collections::HashSet<&str>) {
        self.placements.retain(|key, _| keys.contains(key.as_str()));
    }

    pub fn clear(&mut self) {
        self.placements.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}
