// crates/trimline-core/src/animation.rs
//
// Transient animation state. None of this is shared: the view owns at most
// one zoom animation and one scroll animation, advances them from `tick`, and
// hands the renderer a `ZoomVisual` value for the frame being drawn.

use std::time::Duration;

/// Decelerating ease: fast start, slow finish.
///
/// ```
/// use trimline_core::animation::decelerate;
/// assert_eq!(decelerate(0.0), 0.0);
/// assert_eq!(decelerate(1.0), 1.0);
/// assert!(decelerate(0.5) > 0.5);
/// ```
pub fn decelerate(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Visual scale applied to the strip about `focal_x` while a zoom animates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomVisual {
    pub scale:   f32,
    pub focal_x: f32,
}

impl ZoomVisual {
    pub const IDENTITY: Self = Self { scale: 1.0, focal_x: 0.0 };

    /// Where an unscaled view x lands on screen.
    pub fn apply(&self, x: f32) -> f32 {
        self.focal_x + (x - self.focal_x) * self.scale
    }

    /// Inverse of `apply`.
    pub fn invert(&self, x: f32) -> f32 {
        self.focal_x + (x - self.focal_x) / self.scale
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoomAnimation {
    pub from_level:  usize,
    pub to_level:    usize,
    pub focal_x:     f32,
    /// Timestamp that must stay under `focal_x`.
    pub anchor_ms:   i64,
    pub start_scale: f32,
    pub end_scale:   f32,
    elapsed:         Duration,
    duration:        Duration,
}

impl ZoomAnimation {
    pub fn new(
        from_level:  usize,
        to_level:    usize,
        focal_x:     f32,
        anchor_ms:   i64,
        start_scale: f32,
        end_scale:   f32,
        duration:    Duration,
    ) -> Self {
        Self {
            from_level,
            to_level,
            focal_x,
            anchor_ms,
            start_scale,
            end_scale,
            elapsed: Duration::ZERO,
            duration,
        }
    }

    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn visual(&self) -> ZoomVisual {
        let k = decelerate(self.progress());
        ZoomVisual {
            scale:   self.start_scale + (self.end_scale - self.start_scale) * k,
            focal_x: self.focal_x,
        }
    }

    /// Advances the clock. Returns true once the animation has finished.
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Programmatic scroll motion driven by `tick`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollAnimation {
    /// Free scroll seeded by release velocity (px/s), decaying exponentially.
    Fling { velocity: f32, friction: f32, stop_velocity: f32 },
    /// Eased scroll to a target offset, used by tap-to-seek.
    Seek { from: f32, to: f32, elapsed: Duration, duration: Duration },
}

impl ScrollAnimation {
    pub fn seek(from: f32, to: f32, duration: Duration) -> Self {
        Self::Seek { from, to, elapsed: Duration::ZERO, duration }
    }

    /// Returns the new offset and whether the animation is still running.
    pub fn step(&mut self, offset: f32, dt: Duration) -> (f32, bool) {
        let secs = dt.as_secs_f32();
        match self {
            Self::Fling { velocity, friction, stop_velocity } => {
                // Content moves opposite to the finger.
                let next = offset - *velocity * secs;
                *velocity *= (-*friction * secs).exp();
                (next, velocity.abs() >= *stop_velocity)
            }
            Self::Seek { from, to, elapsed, duration } => {
                *elapsed = (*elapsed + dt).min(*duration);
                let t = if duration.is_zero() {
                    1.0
                } else {
                    elapsed.as_secs_f32() / duration.as_secs_f32()
                };
                let k = decelerate(t);
                (*from + (*to - *from) * k, *elapsed < *duration)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_visual_keeps_the_focal_point_fixed() {
        let v = ZoomVisual { scale: 2.0, focal_x: 300.0 };
        assert_eq!(v.apply(300.0), 300.0);
        assert_eq!(v.apply(350.0), 400.0);
        assert_eq!(v.invert(v.apply(123.0)), 123.0);
    }

    #[test]
    fn zoom_animation_reaches_end_scale() {
        let mut anim = ZoomAnimation::new(0, 1, 100.0, 5000, 1.0, 2.0, Duration::from_millis(250));
        assert!(!anim.advance(Duration::from_millis(100)));
        let mid = anim.visual().scale;
        assert!(mid > 1.0 && mid < 2.0);
        assert!(anim.advance(Duration::from_millis(200)));
        assert_eq!(anim.visual().scale, 2.0);
    }

    #[test]
    fn fling_decays_and_stops() {
        let mut fling = ScrollAnimation::Fling { velocity: 1000.0, friction: 4.0, stop_velocity: 20.0 };
        let mut offset = 0.0;
        let mut steps = 0;
        loop {
            let (next, running) = fling.step(offset, Duration::from_millis(16));
            assert!(next < offset);
            offset = next;
            steps += 1;
            if !running {
                break;
            }
            assert!(steps < 1000);
        }
        assert!(offset < -100.0);
    }

    #[test]
    fn seek_lands_exactly_on_target() {
        let mut seek = ScrollAnimation::seek(0.0, 500.0, Duration::from_millis(200));
        let (mid, running) = seek.step(0.0, Duration::from_millis(100));
        assert!(running && mid > 250.0);
        let (end, running) = seek.step(mid, Duration::from_millis(150));
        assert!(!running);
        assert_eq!(end, 500.0);
    }
}
