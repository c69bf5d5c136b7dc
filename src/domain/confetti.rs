/// Confetti: a continuous rain of colored discs over the whole surface.
///
/// Units are abstract "pixels"; the renderer maps them onto terminal cells.
/// Motion is expressed per 60 Hz frame and scaled by the real frame time,
/// so a slow terminal still rains at the same speed.

use rand::Rng;

/// Reference frame length the per-frame speeds are tuned for.
const FRAME_MS: f32 = 1000.0 / 60.0;
const RADIUS_MIN: f32 = 5.0;
const RADIUS_SPAN: f32 = 10.0;
const SPEED_MIN: f32 = 2.0;
const SPEED_SPAN: f32 = 3.0;
const ANGLE_MAX: f32 = 6.2;
const DRIFT: f32 = 2.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parse `#rrggbb` or `#rgb`.
    pub fn from_hex(s: &str) -> Option<Rgb> {
        let hex = s.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).ok();
        match hex.len() {
            6 => Some(Rgb {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            3 => {
                let r = channel(&hex[0..1])?;
                let g = channel(&hex[1..2])?;
                let b = channel(&hex[2..3])?;
                Some(Rgb { r: r * 17, g: g * 17, b: b * 17 })
            }
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub color: Rgb,
    pub radius: f32,
    pub speed: f32,
    pub angle: f32,
}

#[derive(Default)]
pub struct Confetti {
    particles: Vec<Particle>,
    canvas: Option<Canvas>,
    remaining_ms: u64,
}

impl Confetti {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a burst, replacing any burst still in the air.
    pub fn launch<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        palette: &[Rgb],
        canvas: Canvas,
        duration_ms: u64,
        rng: &mut R,
    ) {
        self.particles.clear();
        if palette.is_empty() || count == 0 {
            self.stop();
            return;
        }
        let width = canvas.width.max(1.0);
        let height = canvas.height.max(1.0);
        self.particles.extend((0..count).map(|_| Particle {
            x: rng.random_range(0.0..width),
            y: rng.random_range(-height..0.0),
            color: palette[rng.random_range(0..palette.len())],
            radius: RADIUS_MIN + rng.random::<f32>() * RADIUS_SPAN,
            speed: SPEED_MIN + rng.random::<f32>() * SPEED_SPAN,
            angle: rng.random::<f32>() * ANGLE_MAX,
        }));
        self.canvas = Some(Canvas { width, height });
        self.remaining_ms = duration_ms;
    }

    /// Advance the rain by `dt_ms`. Returns false once the burst is over.
    pub fn step<R: Rng + ?Sized>(&mut self, dt_ms: u64, rng: &mut R) -> bool {
        let canvas = match self.canvas {
            Some(c) => c,
            None => return false,
        };
        if dt_ms >= self.remaining_ms {
            self.stop();
            return false;
        }
        self.remaining_ms -= dt_ms;

        let frames = dt_ms as f32 / FRAME_MS;
        for p in &mut self.particles {
            p.y += p.speed * frames;
            p.x += p.angle.sin() * DRIFT * frames;
            if p.y > canvas.height {
                // Back above the top edge for another pass.
                p.x = rng.random_range(0.0..canvas.width);
                p.y = -p.radius - rng.random::<f32>() * canvas.height * 0.25;
            }
        }
        true
    }

    /// Clear the surface immediately.
    pub fn stop(&mut self) {
        self.particles.clear();
        self.canvas = None;
        self.remaining_ms = 0;
    }

    pub fn is_active(&self) -> bool { self.canvas.is_some() }
    pub fn particles(&self) -> &[Particle] { &self.particles }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const GOLD: Rgb = Rgb { r: 0xd4, g: 0xaf, b: 0x37 };
    const CREAM: Rgb = Rgb { r: 0xfd, g: 0xfb, b: 0xf7 };

    fn canvas() -> Canvas {
        Canvas { width: 640.0, height: 384.0 }
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(Rgb::from_hex("#d4af37"), Some(GOLD));
        assert_eq!(Rgb::from_hex("#333"), Some(Rgb { r: 0x33, g: 0x33, b: 0x33 }));
        assert_eq!(Rgb::from_hex("d4af37"), None);
        assert_eq!(Rgb::from_hex("#12345"), None);
        assert_eq!(Rgb::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn launch_seeds_particles_above_viewport() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut c = Confetti::new();
        c.launch(50, &[GOLD, CREAM], canvas(), 5000, &mut rng);
        assert!(c.is_active());
        assert_eq!(c.particles().len(), 50);
        for p in c.particles() {
            assert!(p.y < 0.0 && p.y >= -384.0);
            assert!(p.x >= 0.0 && p.x < 640.0);
            assert!(p.radius >= 5.0 && p.radius < 15.0);
            assert!(p.speed >= 2.0 && p.speed < 5.0);
            assert!(p.color == GOLD || p.color == CREAM);
        }
    }

    #[test]
    fn particle_count_is_constant_while_raining() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut c = Confetti::new();
        c.launch(150, &[GOLD], canvas(), 9000, &mut rng);
        // 8 seconds at ~60fps: every particle falls off the bottom several times.
        for _ in 0..480 {
            assert!(c.step(16, &mut rng));
            assert_eq!(c.particles().len(), 150);
        }
    }

    #[test]
    fn fallen_particles_are_recycled_above_the_top() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut c = Confetti::new();
        c.launch(1, &[GOLD], Canvas { width: 100.0, height: 10.0 }, 60_000, &mut rng);
        let mut wrapped = false;
        let mut prev_y = c.particles()[0].y;
        for _ in 0..200 {
            c.step(16, &mut rng);
            let y = c.particles()[0].y;
            if y < prev_y {
                wrapped = true;
                assert!(y < 0.0);
            }
            assert!(y <= 10.0);
            prev_y = y;
        }
        assert!(wrapped);
    }

    #[test]
    fn burst_ends_after_duration() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut c = Confetti::new();
        c.launch(10, &[GOLD], canvas(), 100, &mut rng);
        assert!(c.step(60, &mut rng));
        assert!(!c.step(60, &mut rng));
        assert!(!c.is_active());
        assert!(c.particles().is_empty());
    }

    #[test]
    fn new_launch_replaces_running_burst() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut c = Confetti::new();
        c.launch(50, &[GOLD], canvas(), 5000, &mut rng);
        c.step(16, &mut rng);
        c.launch(150, &[CREAM], canvas(), 5000, &mut rng);
        assert_eq!(c.particles().len(), 150);
        assert!(c.particles().iter().all(|p| p.color == CREAM));
    }

    #[test]
    fn empty_palette_launches_nothing() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut c = Confetti::new();
        c.launch(50, &[], canvas(), 5000, &mut rng);
        assert!(!c.is_active());
    }
}
