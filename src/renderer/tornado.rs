//! Orbital tornado visualization.
//!
//! A ring of orbiting particles whose spin, spread, and connectivity follow
//! the spectrum byte bins, over a pulsing center mass and an energy-driven
//! background gradient.

use super::Visualization;
use nannou::prelude::*;
use rand::Rng;

use crate::audio::SpectrumFrame;

/// Number of orbiting particles
pub const PARTICLE_COUNT: usize = 200;

/// Particles closer than this (pixels) get connected by a line
const LINK_DISTANCE: f32 = 100.0;

/// On-screen particle disc radius (pixels)
const PARTICLE_SIZE: f32 = 3.0;

const CORE_BASE_RADIUS: f32 = 150.0;
const CORE_MAX_RADIUS: f32 = 400.0;

/// Base gradient anchors: top, mid, bottom
const GRADIENT_PALETTE: [[f32; 3]; 3] = [
    [15.0, 32.0, 39.0],
    [32.0, 58.0, 67.0],
    [44.0, 83.0, 100.0],
];

#[derive(Clone)]
struct Particle {
    /// Current position around the center
    pos: Vec2,
    /// Orbital radius assigned at spawn; the anchor the drive expands from
    base_radius: f32,
    /// Current orbital radius
    radius: f32,
    /// Cumulative rotation; unbounded, only cos/sin consume it
    angle: f32,
    /// Base angular speed per frame
    speed: f32,
    color: Srgba<u8>,
}

impl Particle {
    /// Advance one frame from the drive value (0-255) of this particle's bin.
    ///
    /// Spin rate and orbital radius both scale with the same drive so the
    /// swarm breathes outward and speeds up together on loud passages.
    fn update(&mut self, center: Vec2, drive: f32) {
        let speed_factor = drive / 256.0;
        self.angle += self.speed * (1.0 + speed_factor);
        self.radius = self.base_radius + drive * 0.5;
        self.pos = center + vec2(self.angle.cos(), self.angle.sin()) * self.radius;
    }

    fn draw(&self, draw: &Draw) {
        draw.ellipse()
            .xy(self.pos)
            .w_h(PARTICLE_SIZE * 2.0, PARTICLE_SIZE * 2.0)
            .color(self.color);
    }
}

/// Builds a fresh particle batch.
///
/// The randomness source is injected so tests can seed it; production passes
/// `rand::rng()`.
fn spawn_particles<R: Rng>(rng: &mut R, count: usize) -> Vec<Particle> {
    (0..count)
        .map(|_| {
            let radius = rng.random_range(50.0..200.0);
            let color = srgba(
                rng.random_range(0..=255u8),
                rng.random_range(0..=255u8),
                rng.random_range(0..=255u8),
                (0.8 * 255.0) as u8,
            );

            Particle {
                pos: Vec2::ZERO,
                base_radius: radius,
                radius,
                angle: rng.random_range(0.0..std::f32::consts::TAU),
                speed: rng.random_range(0.01..0.03),
                color,
            }
        })
        .collect()
}

/// The ordered particle batch. Replaced wholesale at activation and on every
/// surface resize; no particle is ever added or removed individually.
struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    fn new() -> Self {
        Self {
            particles: Vec::new(),
        }
    }

    fn spawn(&mut self) {
        let mut rng = rand::rng();
        self.particles = spawn_particles(&mut rng, PARTICLE_COUNT);
    }

    /// Feed every particle the spectrum bin at its wrapped index.
    ///
    /// The bin sequence (128) is shorter than the particle sequence (200), so
    /// indices wrap and every particle still receives a drive value.
    fn update_all(&mut self, center: Vec2, frame: &SpectrumFrame) {
        for (i, particle) in self.particles.iter_mut().enumerate() {
            let drive = frame.bins[i % frame.bins.len()] as f32;
            particle.update(center, drive);
        }
    }
}

pub struct Tornado {
    field: ParticleField,
    /// Aggregate energy of the last spectrum frame (0-255)
    aggregate: f32,
}

impl Tornado {
    pub fn new() -> Self {
        Self {
            field: ParticleField::new(),
            aggregate: 0.0,
        }
    }
}

impl Visualization for Tornado {
    fn update(&mut self, frame: &SpectrumFrame, bounds: Rect) {
        self.aggregate = frame.aggregate;
        self.field.update_all(bounds.xy(), frame);
    }

    fn draw(&self, draw: &Draw, bounds: Rect) {
        // Fixed frame order: the gradient covers the whole surface (clear and
        // background in one step), then particles, links, and the core on top.
        paint_background(draw, bounds, self.aggregate);

        for particle in &self.field.particles {
            particle.draw(draw);
        }

        draw_links(draw, &self.field.particles, self.aggregate);
        draw_core(draw, bounds.xy(), self.aggregate);
    }

    fn on_resize(&mut self, _bounds: Rect) {
        self.field.spawn();
    }
}

/// Line alpha for a particle pair, or None when they are too far apart.
fn link_alpha(distance: f32) -> Option<f32> {
    if distance < LINK_DISTANCE {
        Some(1.0 - distance / LINK_DISTANCE)
    } else {
        None
    }
}

fn link_weight(aggregate: f32) -> f32 {
    1.0 + aggregate * 0.01
}

fn draw_links(draw: &Draw, particles: &[Particle], aggregate: f32) {
    let weight = link_weight(aggregate);

    // Brute-force pair scan, ~20k checks at 200 particles. The self-pair is
    // a zero-length segment and draws nothing visible.
    for i in 0..particles.len() {
        for j in i..particles.len() {
            let distance = (particles[i].pos - particles[j].pos).length();
            if let Some(alpha) = link_alpha(distance) {
                draw.line()
                    .start(particles[i].pos)
                    .end(particles[j].pos)
                    .weight(weight)
                    .color(rgba(1.0, 1.0, 1.0, alpha));
            }
        }
    }
}

fn core_radius(aggregate: f32) -> f32 {
    (CORE_BASE_RADIUS + aggregate).min(CORE_MAX_RADIUS)
}

/// Center disc fill. The channel arithmetic runs unclamped in f32 and only
/// the conversion to byte channels saturates.
fn core_color(aggregate: f32) -> Srgba<u8> {
    srgba(
        channel(aggregate * 2.0),
        channel(255.0 - aggregate),
        channel(aggregate * 3.0),
        (0.5 * 255.0) as u8,
    )
}

fn draw_core(draw: &Draw, center: Vec2, aggregate: f32) {
    let radius = core_radius(aggregate);
    draw.ellipse()
        .xy(center)
        .w_h(radius * 2.0, radius * 2.0)
        .color(core_color(aggregate));
}

/// The three gradient stop colors for a frame, raw (pre-saturation) channels.
///
/// Each anchor channel combines with `aggregate % 255` by addition or
/// subtraction (channel-specific), wrapped in abs so subtraction can never
/// produce a negative channel.
fn gradient_stops(aggregate: f32) -> [[f32; 3]; 3] {
    let d = aggregate % 255.0;
    let [top, mid, bottom] = GRADIENT_PALETTE;

    [
        [(top[0] + d).abs(), (top[1] - d).abs(), top[2].abs()],
        [(mid[0] - d).abs(), (mid[1] + d).abs(), mid[2].abs()],
        [bottom[0].abs(), (bottom[1] - d).abs(), (bottom[2] + d).abs()],
    ]
}

/// Samples the piecewise-linear gradient at offset `t` in [0, 1].
fn stop_color(stops: &[[f32; 3]; 3], t: f32) -> Srgba<u8> {
    let (from, to, local) = if t <= 0.5 {
        (stops[0], stops[1], t * 2.0)
    } else {
        (stops[1], stops[2], (t - 0.5) * 2.0)
    };

    srgba(
        channel(from[0] + (to[0] - from[0]) * local),
        channel(from[1] + (to[1] - from[1]) * local),
        channel(from[2] + (to[2] - from[2]) * local),
        255,
    )
}

fn channel(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// Fills the surface with the three-stop gradient running from the top-left
/// to the bottom-right corner.
///
/// The rectangle is split along the line where the diagonal projection
/// reaches 0.5. Each half then spans a single palette segment, where the
/// gradient is linear in position, so two vertex-colored quads reproduce it
/// exactly.
fn paint_background(draw: &Draw, bounds: Rect, aggregate: f32) {
    let stops = gradient_stops(aggregate);

    let tl = bounds.top_left();
    let tr = bounds.top_right();
    let br = bounds.bottom_right();
    let bl = bounds.bottom_left();

    let axis = br - tl;
    let len_sq = axis.length_squared();
    if len_sq <= f32::EPSILON {
        // Zero-area surface: nothing meaningful to span, flat-fill instead.
        draw.background().color(stop_color(&stops, 0.0));
        return;
    }

    let t_of = |p: Vec2| (p - tl).dot(axis) / len_sq;
    let t_tr = t_of(tr);
    let t_bl = t_of(bl);

    // t(tr) + t(bl) == 1, so the midline crosses either the horizontal or the
    // vertical edge pair depending on the aspect ratio.
    let (half_a, half_b) = if t_tr >= 0.5 {
        let p_top = point_at_half(tl, tr, 0.0, t_tr);
        let p_bottom = point_at_half(bl, br, t_bl, 1.0);
        (
            [(tl, 0.0), (p_top, 0.5), (p_bottom, 0.5), (bl, t_bl)],
            [(p_top, 0.5), (tr, t_tr), (br, 1.0), (p_bottom, 0.5)],
        )
    } else {
        let p_left = point_at_half(tl, bl, 0.0, t_bl);
        let p_right = point_at_half(tr, br, t_tr, 1.0);
        (
            [(tl, 0.0), (tr, t_tr), (p_right, 0.5), (p_left, 0.5)],
            [(p_left, 0.5), (p_right, 0.5), (br, 1.0), (bl, t_bl)],
        )
    };

    for quad in [half_a, half_b] {
        draw.polygon()
            .points_colored(quad.iter().map(|&(p, t)| (p, stop_color(&stops, t))));
    }
}

/// Point on the edge `a`-`b` where the diagonal projection reaches 0.5.
/// Callers guarantee `ta < 0.5 <= tb`.
fn point_at_half(a: Vec2, b: Vec2, ta: f32, tb: f32) -> Vec2 {
    a + (b - a) * ((0.5 - ta) / (tb - ta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn frame(bins: Vec<u8>) -> SpectrumFrame {
        SpectrumFrame::new(bins)
    }

    #[test]
    fn spawn_draws_from_configured_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        let particles = spawn_particles(&mut rng, PARTICLE_COUNT);

        assert_eq!(particles.len(), PARTICLE_COUNT);
        for p in &particles {
            assert!(p.base_radius >= 50.0 && p.base_radius < 200.0);
            assert!(p.angle >= 0.0 && p.angle < std::f32::consts::TAU);
            assert!(p.speed >= 0.01 && p.speed < 0.03);
            assert_eq!(p.color.alpha, 204);
            assert_eq!(p.radius, p.base_radius);
        }
    }

    #[test]
    fn respawn_keeps_count_and_replaces_state() {
        let mut field = ParticleField::new();
        field.spawn();
        assert_eq!(field.particles.len(), PARTICLE_COUNT);

        // Resize-style respawn: same count, fresh batch.
        field.spawn();
        assert_eq!(field.particles.len(), PARTICLE_COUNT);

        // Two batches from one seeded source diverge.
        let mut rng = StdRng::seed_from_u64(7);
        let first = spawn_particles(&mut rng, 4);
        let second = spawn_particles(&mut rng, 4);
        assert_ne!(first[0].angle, second[0].angle);
    }

    #[test]
    fn update_with_zero_drive_orbits_at_base_radius() {
        let mut p = Particle {
            pos: Vec2::ZERO,
            base_radius: 100.0,
            radius: 100.0,
            angle: 0.0,
            speed: 0.02,
            color: srgba(255, 255, 255, 204),
        };

        p.update(Vec2::ZERO, 0.0);

        assert!((p.angle - 0.02).abs() < 1e-6);
        assert_eq!(p.radius, 100.0);
        assert!((p.pos.x - p.angle.cos() * 100.0).abs() < 1e-4);
        assert!((p.pos.y - p.angle.sin() * 100.0).abs() < 1e-4);
    }

    #[test]
    fn update_scales_radius_and_spin_with_drive() {
        let mut p = Particle {
            pos: Vec2::ZERO,
            base_radius: 60.0,
            radius: 60.0,
            angle: 1.0,
            speed: 0.01,
            color: srgba(255, 255, 255, 204),
        };

        p.update(Vec2::ZERO, 128.0);

        assert_eq!(p.radius, 60.0 + 128.0 * 0.5);
        let expected_angle = 1.0 + 0.01 * (1.0 + 128.0 / 256.0);
        assert!((p.angle - expected_angle).abs() < 1e-6);
    }

    #[test]
    fn drive_wraps_across_short_spectrum() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut field = ParticleField {
            particles: spawn_particles(&mut rng, 3),
        };

        // One bin drives every particle.
        field.update_all(Vec2::ZERO, &frame(vec![100]));
        for p in &field.particles {
            assert_eq!(p.radius, p.base_radius + 50.0);
        }

        // Two bins alternate across the batch: 0, 1, 0.
        field.update_all(Vec2::ZERO, &frame(vec![0, 200]));
        assert_eq!(field.particles[0].radius, field.particles[0].base_radius);
        assert_eq!(
            field.particles[1].radius,
            field.particles[1].base_radius + 100.0
        );
        assert_eq!(field.particles[2].radius, field.particles[2].base_radius);
    }

    #[test]
    fn link_alpha_fades_with_distance() {
        assert_eq!(link_alpha(0.0), Some(1.0));
        assert_eq!(link_alpha(50.0), Some(0.5));
        assert_eq!(link_alpha(100.0), None);
        assert_eq!(link_alpha(250.0), None);

        // Strictly decreasing over the linked range.
        let mut prev = f32::INFINITY;
        for d in 0..100 {
            let alpha = link_alpha(d as f32).unwrap();
            assert!(alpha < prev);
            prev = alpha;
        }
    }

    #[test]
    fn link_weight_follows_aggregate() {
        assert_eq!(link_weight(0.0), 1.0);
        assert!((link_weight(255.0) - 3.55).abs() < 1e-6);
    }

    #[test]
    fn core_radius_is_bounded() {
        assert_eq!(core_radius(0.0), 150.0);
        assert_eq!(core_radius(100.0), 250.0);
        assert_eq!(core_radius(255.0), 400.0);
        assert_eq!(core_radius(10_000.0), 400.0);
    }

    #[test]
    fn core_color_saturates_at_paint_boundary() {
        let quiet = core_color(0.0);
        assert_eq!(
            (quiet.red, quiet.green, quiet.blue, quiet.alpha),
            (0, 255, 0, 127)
        );

        // 255 * 2 and 255 * 3 overflow the byte range and clamp to 255.
        let loud = core_color(255.0);
        assert_eq!((loud.red, loud.green, loud.blue), (255, 0, 255));
    }

    #[test]
    fn gradient_stops_match_anchors_at_zero_drive() {
        assert_eq!(gradient_stops(0.0), GRADIENT_PALETTE);
    }

    #[test]
    fn gradient_channels_never_go_negative() {
        for drive in 0..=255 {
            for stop in gradient_stops(drive as f32) {
                for ch in stop {
                    assert!(ch >= 0.0);
                }
            }
        }
    }

    #[test]
    fn stop_color_interpolates_between_stops() {
        let stops = gradient_stops(0.0);

        let top = stop_color(&stops, 0.0);
        assert_eq!((top.red, top.green, top.blue), (15, 32, 39));

        let mid = stop_color(&stops, 0.5);
        assert_eq!((mid.red, mid.green, mid.blue), (32, 58, 67));

        let bottom = stop_color(&stops, 1.0);
        assert_eq!((bottom.red, bottom.green, bottom.blue), (44, 83, 100));

        // Quarter offset sits halfway between top and mid.
        let quarter = stop_color(&stops, 0.25);
        assert_eq!(quarter.red, channel((15.0 + 32.0) / 2.0));
    }

    #[test]
    fn midline_split_lands_on_half_projection() {
        let bounds: Rect = Rect::from_w_h(800.0, 600.0);
        let tl = bounds.top_left();
        let axis = bounds.bottom_right() - tl;

        let p = point_at_half(tl, bounds.top_right(), 0.0, 0.64);
        let t = (p - tl).dot(axis) / axis.length_squared();
        assert!((t - 0.5).abs() < 1e-3);
    }
}
