//! Critically-damped spring primitives: `ScalarSpring` and `VectorSpring<N>`.
//!
//! Both share one law — `F = -k(x - target) - c*v` — integrated the same
//! semi-implicit-Euler way the physics engine steps bodies. A spring is not
//! self-driving: the runtime's ticker calls [`ScalarSpring::step`] once per
//! tick, exactly as it calls into the physics world's integration loop.

use std::f64::consts::PI;
use tracing::trace;

/// Positional settle threshold, in spring units.
pub const EPS_POS: f64 = 0.01;
/// Velocity settle threshold, in spring units per millisecond.
pub const EPS_VEL: f64 = 0.01;
/// Number of consecutive under-threshold ticks required before a spring is
/// considered settled.
const SETTLE_TICKS: u8 = 2;

/// Tension/friction/mass triple. `friction` is the damping ratio `ζ`:
/// `ζ=1` is critical damping, `ζ<1` underdamped (single bounded overshoot),
/// `ζ>1` overdamped (monotonic approach).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringConfig {
    pub tension: f64,
    pub friction: f64,
    pub mass: f64,
}

impl SpringConfig {
    pub fn new(tension: f64, friction: f64) -> Self {
        Self {
            tension,
            friction,
            mass: 1.0,
        }
    }

    fn damping_coefficient(&self) -> f64 {
        self.friction * 2.0 * (self.mass * self.tension).sqrt()
    }

    /// Bound on the first overshoot past `target`, as a fraction of the
    /// step magnitude. Only meaningful when `friction < 1` (underdamped);
    /// overdamped/critical springs never overshoot.
    pub fn overshoot_bound(&self) -> f64 {
        if self.friction >= 1.0 {
            return 0.0;
        }
        let zeta = self.friction;
        (-zeta * PI / (1.0 - zeta * zeta).sqrt()).exp()
    }
}

/// Same tension/friction pair as [`presets::default`], reachable through
/// `SpringConfig::default()` for callers (and derives) that want `Default`
/// rather than the `presets` path.
impl Default for SpringConfig {
    fn default() -> Self {
        presets::default()
    }
}

/// Published presets, tension/friction pairs matching the UI-motion
/// vocabulary this runtime's callers already use.
pub mod presets {
    use super::SpringConfig;

    pub fn default() -> SpringConfig {
        SpringConfig::new(170.0, 26.0 / (2.0 * 170.0_f64.sqrt()))
    }
    pub fn gentle() -> SpringConfig {
        SpringConfig::new(120.0, 14.0 / (2.0 * 120.0_f64.sqrt()))
    }
    pub fn wobbly() -> SpringConfig {
        SpringConfig::new(180.0, 12.0 / (2.0 * 180.0_f64.sqrt()))
    }
    pub fn stiff() -> SpringConfig {
        SpringConfig::new(210.0, 20.0 / (2.0 * 210.0_f64.sqrt()))
    }
    pub fn slow() -> SpringConfig {
        SpringConfig::new(280.0, 60.0 / (2.0 * 280.0_f64.sqrt()))
    }
    pub fn modal() -> SpringConfig {
        SpringConfig::new(300.0, 30.0 / (2.0 * 300.0_f64.sqrt()))
    }
    pub fn press() -> SpringConfig {
        SpringConfig::new(500.0, 30.0 / (2.0 * 500.0_f64.sqrt()))
    }
}

/// Optional per-call overrides to [`ScalarSpring::update`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOpts {
    pub config: Option<SpringConfig>,
}

/// A single critically-damped scalar spring.
pub struct ScalarSpring {
    config: SpringConfig,
    current: f64,
    target: f64,
    velocity: f64,
    settled_ticks: u8,
    stopped: bool,
    on_rest: Option<Box<dyn FnMut(f64) + Send>>,
}

impl ScalarSpring {
    pub fn new(config: SpringConfig) -> Self {
        Self {
            config,
            current: 0.0,
            target: 0.0,
            velocity: 0.0,
            settled_ticks: SETTLE_TICKS,
            stopped: true,
            on_rest: None,
        }
    }

    /// Register a callback invoked exactly once when the spring settles.
    pub fn on_rest(&mut self, cb: impl FnMut(f64) + Send + 'static) {
        self.on_rest = Some(Box::new(cb));
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn is_settled(&self) -> bool {
        self.settled_ticks >= SETTLE_TICKS
    }

    /// Instantaneous jump: `current == target == value`, velocity zeroed,
    /// never emits `onRest`.
    pub fn set(&mut self, value: f64) {
        self.current = value;
        self.target = value;
        self.velocity = 0.0;
        self.settled_ticks = SETTLE_TICKS;
        self.stopped = true;
    }

    /// Drive the spring toward a new target, optionally reconfiguring it
    /// for this run. Resumes stepping if the spring was stopped/settled.
    pub fn update(&mut self, target: f64, opts: UpdateOpts) {
        if let Some(cfg) = opts.config {
            self.config = cfg;
        }
        self.target = target;
        self.settled_ticks = 0;
        self.stopped = false;
    }

    /// Halt in place. No further motion until the next `update`/`set`.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.velocity = 0.0;
    }

    /// Advance by `dt_ms`. Returns `true` if this call just transitioned
    /// the spring into the settled state (the tick `onRest` fires on).
    pub fn step(&mut self, dt_ms: u64) -> bool {
        if self.stopped || self.is_settled() {
            return false;
        }
        let dt = dt_ms as f64 / 1000.0;
        let displacement = self.current - self.target;
        let force = -self.config.tension * displacement - self.config.damping_coefficient() * self.velocity;
        let accel = force / self.config.mass;
        self.velocity += accel * dt;
        self.current += self.velocity * dt;

        let under_threshold =
            (self.current - self.target).abs() < EPS_POS && self.velocity.abs() < EPS_VEL;
        if under_threshold {
            self.settled_ticks = self.settled_ticks.saturating_add(1);
        } else {
            self.settled_ticks = 0;
        }

        trace!(current = self.current, velocity = self.velocity, "spring step");

        if self.is_settled() {
            if let Some(cb) = self.on_rest.as_mut() {
                cb(self.current);
            }
            true
        } else {
            false
        }
    }
}

/// `N` independent scalar springs sharing one configuration. Settles (and
/// fires `onRest`) only once every component has settled.
pub struct VectorSpring<const N: usize> {
    axes: [ScalarSpring; N],
}

impl<const N: usize> VectorSpring<N> {
    pub fn new(config: SpringConfig) -> Self {
        Self {
            axes: std::array::from_fn(|_| ScalarSpring::new(config)),
        }
    }

    pub fn set(&mut self, values: [f64; N]) {
        for (axis, v) in self.axes.iter_mut().zip(values) {
            axis.set(v);
        }
    }

    pub fn update(&mut self, targets: [f64; N], opts: UpdateOpts) {
        for (axis, t) in self.axes.iter_mut().zip(targets) {
            axis.update(t, opts);
        }
    }

    pub fn stop(&mut self) {
        for axis in &mut self.axes {
            axis.stop();
        }
    }

    pub fn current(&self) -> [f64; N] {
        std::array::from_fn(|i| self.axes[i].current())
    }

    pub fn is_settled(&self) -> bool {
        self.axes.iter().all(|a| a.is_settled())
    }

    /// Advance every axis by `dt_ms`. Returns `true` exactly on the tick
    /// where the last still-moving axis settles.
    pub fn step(&mut self, dt_ms: u64) -> bool {
        let was_settled = self.is_settled();
        let mut any_stepped = false;
        for axis in &mut self.axes {
            any_stepped |= axis.step(dt_ms);
        }
        !was_settled && self.is_settled() && any_stepped
    }
}
