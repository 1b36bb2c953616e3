//! 2D rigid-body physics: bodies, forces, constraints, broad/narrow-phase
//! collision, and collision response.
//!
//! The body table is keyed by an opaque string id and owned exclusively by
//! [`PhysicsEngine`] — constraints reference bodies by that id, never by a
//! direct back-reference, so there is no cyclic ownership between the two
//! tables (see the crate's design notes on that point). Broad phase reuses
//! [`spatial_hash::SpatialHash`], generalized here from this workspace's 3D
//! AABB idiom down to 2D; narrow phase narrows on the shape tag rather than
//! any structural typing, exactly as `shape::Shape` is defined.

pub mod body;
pub mod collision;
pub mod constraint;
pub mod shape;
pub mod spatial_hash;

#[cfg(feature = "profiling")]
use galileo_profiling::{plot, span};

pub use body::{BodyId, BodyOptions, BodyValidationError, CollisionFilter, Force, PhysicsBody};
pub use collision::{CollisionEvent, CollisionPhase};
pub use constraint::{Constraint, ConstraintId, ConstraintValidationError};
pub use shape::Shape;
pub use spatial_hash::{SpatialHash, SpatialHashStats, AABB};

use galileo_events::EventBus;
use glam::Vec2;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Fixed sub-step size in milliseconds (1/60s), used to split a large tick
/// `dt` into numerically stable sub-steps.
pub const DEFAULT_FIXED_STEP_MS: f64 = 1000.0 / 60.0;
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 10;

/// Below this linear speed (units/s) and angular speed (rad/s), sustained
/// for [`T_SLEEP_MS`], a body is put to sleep.
pub const V_SLEEP: f32 = 0.05;
pub const OMEGA_SLEEP: f32 = 0.05;
pub const T_SLEEP_MS: u64 = 500;

/// Optional world AABB. Bodies crossing a boundary either clamp-and-bounce
/// (`bounce = Some(e)`) or are left alone for the caller's
/// `on_bounds_exceeded` callback to handle (`bounce = None`).
#[derive(Debug, Clone, Copy)]
pub struct WorldBounds {
    pub min: Vec2,
    pub max: Vec2,
    pub bounce: Option<f32>,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub gravity: Vec2,
    pub bounds: Option<WorldBounds>,
    pub fixed_step_ms: f64,
    pub solver_iterations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::ZERO,
            bounds: None,
            fixed_step_ms: DEFAULT_FIXED_STEP_MS,
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
        }
    }
}

/// Partial update for [`PhysicsEngine::update_body`] — an unsafe direct poke
/// limited to velocity and position, per spec.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyPatch {
    pub position: Option<Vec2>,
    pub velocity: Option<Vec2>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Idle,
    Running,
    Paused,
    Stopped,
}

struct CollisionStart(CollisionEvent);
struct CollisionActive(CollisionEvent);
struct CollisionEnd(CollisionEvent);

type ContactKey = (BodyId, BodyId);

fn contact_key(a: &BodyId, b: &BodyId) -> ContactKey {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// The physics engine: owns the body table, the constraint table, and the
/// collision event bus, and runs the 8-step integration loop in
/// [`PhysicsEngine::step`].
pub struct PhysicsEngine {
    config: EngineConfig,
    bodies: FxHashMap<BodyId, PhysicsBody>,
    order: Vec<BodyId>,
    constraints: FxHashMap<ConstraintId, Constraint>,
    events: EventBus,
    prev_contacts: FxHashMap<ContactKey, CollisionEvent>,
    current_contacts: Vec<(ContactKey, CollisionEvent)>,
    state: EngineState,
    next_body_seq: u64,
    next_constraint_seq: u64,
}

impl PhysicsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            bodies: FxHashMap::default(),
            order: Vec::new(),
            constraints: FxHashMap::default(),
            events: EventBus::new(),
            prev_contacts: FxHashMap::default(),
            current_contacts: Vec::new(),
            state: EngineState::Idle,
            next_body_seq: 0,
            next_constraint_seq: 0,
        }
    }

    /// Physics tuning is read-only after construction except gravity.
    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.config.gravity = gravity;
    }

    pub fn gravity(&self) -> Vec2 {
        self.config.gravity
    }

    fn mint_body_id(&mut self) -> BodyId {
        loop {
            let candidate = format!("body-{}", self.next_body_seq);
            self.next_body_seq += 1;
            if !self.bodies.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn mint_constraint_id(&mut self) -> ConstraintId {
        let id = format!("constraint-{}", self.next_constraint_seq);
        self.next_constraint_seq += 1;
        id
    }

    /// Validated construction; the engine mints `id` when the caller omits
    /// one. Rejects negative mass, out-of-range friction/restitution, and
    /// duplicate ids.
    pub fn add_body(&mut self, opts: BodyOptions) -> Result<BodyId, BodyValidationError> {
        opts.validate()?;
        let id = match &opts.id {
            Some(id) => {
                if self.bodies.contains_key(id) {
                    return Err(BodyValidationError::DuplicateId(id.clone()));
                }
                id.clone()
            }
            None => self.mint_body_id(),
        };
        let body = PhysicsBody::from_options(id.clone(), opts);
        self.bodies.insert(id.clone(), body);
        self.order.push(id.clone());
        Ok(id)
    }

    /// Idempotent: removing an unknown or already-removed id is a no-op.
    pub fn remove_body(&mut self, id: &str) {
        if self.bodies.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
            self.constraints.retain(|_, c| {
                let (a, b) = c.body_ids();
                a != id && b != id
            });
        }
    }

    pub fn get_body(&self, id: &str) -> Option<PhysicsBody> {
        self.bodies.get(id).cloned()
    }

    pub fn get_all(&self) -> FxHashMap<BodyId, PhysicsBody> {
        self.bodies.clone()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Unsafe direct poke — velocity and position only. Invalid ids are
    /// silently ignored (logged in debug).
    pub fn update_body(&mut self, id: &str, patch: BodyPatch) {
        let Some(body) = self.bodies.get_mut(id) else {
            debug!(id, "update_body: unknown body id");
            return;
        };
        if let Some(pos) = patch.position {
            body.position = pos;
        }
        if let Some(vel) = patch.velocity {
            if !body.is_static {
                body.velocity = vel;
            }
        }
        body.wake();
    }

    /// Continuous force, accumulated into acceleration every sub-step of
    /// this tick, then cleared. `point` is accepted and stored but ignored
    /// (torque is unsupported — see crate docs).
    pub fn apply_force(&mut self, id: &str, force: Vec2, point: Option<Vec2>) {
        let Some(body) = self.bodies.get_mut(id) else {
            debug!(id, "apply_force: unknown body id");
            return;
        };
        if body.is_static {
            return;
        }
        body.pending_forces.push(Force {
            force,
            point,
            one_shot: false,
        });
        body.wake();
    }

    /// Mutates velocity directly, once, before this tick's integration.
    pub fn apply_impulse(&mut self, id: &str, impulse: Vec2, point: Option<Vec2>) {
        let Some(body) = self.bodies.get_mut(id) else {
            debug!(id, "apply_impulse: unknown body id");
            return;
        };
        if body.is_static {
            return;
        }
        body.pending_forces.push(Force {
            force: impulse,
            point,
            one_shot: true,
        });
        body.wake();
    }

    /// Rejected (not added) if either referenced body is unknown.
    pub fn add_constraint(
        &mut self,
        constraint: Constraint,
    ) -> Result<ConstraintId, ConstraintValidationError> {
        let (a, b) = constraint.body_ids();
        if !self.bodies.contains_key(a) {
            return Err(ConstraintValidationError::UnknownBody(a.clone()));
        }
        if !self.bodies.contains_key(b) {
            return Err(ConstraintValidationError::UnknownBody(b.clone()));
        }
        let id = self.mint_constraint_id();
        self.constraints.insert(id.clone(), constraint);
        Ok(id)
    }

    pub fn remove_constraint(&mut self, id: &str) {
        self.constraints.remove(id);
    }

    pub fn on_collision_start(
        &mut self,
        cb: impl FnMut(&CollisionEvent) + Send + 'static,
    ) -> galileo_events::SubscriptionId {
        self.events.on::<CollisionStart>(move |e| cb(&e.0))
    }

    pub fn on_collision_active(
        &mut self,
        cb: impl FnMut(&CollisionEvent) + Send + 'static,
    ) -> galileo_events::SubscriptionId {
        self.events.on::<CollisionActive>(move |e| cb(&e.0))
    }

    pub fn on_collision_end(
        &mut self,
        cb: impl FnMut(&CollisionEvent) + Send + 'static,
    ) -> galileo_events::SubscriptionId {
        self.events.on::<CollisionEnd>(move |e| cb(&e.0))
    }

    pub fn off_collision_start(&mut self, id: galileo_events::SubscriptionId) {
        self.events.off::<CollisionStart>(id);
    }

    pub fn off_collision_active(&mut self, id: galileo_events::SubscriptionId) {
        self.events.off::<CollisionActive>(id);
    }

    pub fn off_collision_end(&mut self, id: galileo_events::SubscriptionId) {
        self.events.off::<CollisionEnd>(id);
    }

    pub fn start(&mut self) {
        if self.state != EngineState::Stopped {
            self.state = EngineState::Running;
        }
    }

    pub fn pause(&mut self) {
        self.state = EngineState::Paused;
    }

    pub fn resume(&mut self) {
        if self.state == EngineState::Paused {
            self.state = EngineState::Running;
        }
    }

    /// Synchronous cancellation: after `stop()` returns, no further
    /// `step()` call produces side effects until a new engine is built.
    pub fn stop(&mut self) {
        self.state = EngineState::Stopped;
    }

    pub fn is_stopped(&self) -> bool {
        self.state == EngineState::Stopped
    }

    /// Advance the simulation by `dt_ms`, already clamped by the timing
    /// provider. No-op if the engine is paused or stopped.
    pub fn step(&mut self, dt_ms: u64) {
        #[cfg(feature = "profiling")]
        span!("PhysicsEngine::step");

        if matches!(self.state, EngineState::Paused | EngineState::Stopped) {
            return;
        }

        let dt_total = dt_ms as f64 / 1000.0;
        let fixed_step = (self.config.fixed_step_ms / 1000.0).max(1e-6);
        let num_substeps = (dt_total / fixed_step).ceil().max(1.0) as u32;
        let sub_dt = (dt_total / num_substeps as f64) as f32;

        for i in 0..num_substeps {
            self.substep(sub_dt, i == 0);
        }

        self.clear_consumed_forces();
        self.apply_sleep_policy(dt_ms);
        self.diff_and_emit_contacts();
    }

    fn substep(&mut self, dt: f32, is_first: bool) {
        #[cfg(feature = "profiling")]
        plot!("PhysicsEngine::body_count", self.bodies.len() as u64);

        if is_first {
            self.apply_one_shot_impulses();
        }
        self.integrate_bodies(dt);
        self.solve_constraints();
        self.resolve_collisions();
        self.enforce_bounds(dt);
    }

    fn apply_one_shot_impulses(&mut self) {
        for id in &self.order {
            let Some(body) = self.bodies.get_mut(id) else {
                continue;
            };
            if body.is_static {
                continue;
            }
            let inv_mass = body.inv_mass();
            let mut remaining = Vec::with_capacity(body.pending_forces.len());
            for f in body.pending_forces.drain(..) {
                if f.one_shot {
                    body.velocity += f.force * inv_mass;
                } else {
                    remaining.push(f);
                }
            }
            body.pending_forces = remaining;
        }
    }

    fn integrate_bodies(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        for id in &self.order {
            let Some(body) = self.bodies.get_mut(id) else {
                continue;
            };
            if body.is_static || body.is_sleeping {
                continue;
            }
            let inv_mass = body.inv_mass();
            let mut accel = gravity;
            for f in &body.pending_forces {
                accel += f.force * inv_mass;
            }
            body.velocity += accel * dt;
            body.position += body.velocity * dt;
            body.angle += body.angular_velocity * dt;
        }
    }

    fn clear_consumed_forces(&mut self) {
        for body in self.bodies.values_mut() {
            body.pending_forces.clear();
        }
    }

    fn solve_constraints(&mut self) {
        let ids: Vec<(ConstraintId, Constraint)> = self
            .constraints
            .iter()
            .map(|(id, c)| (id.clone(), c.clone()))
            .collect();
        for _ in 0..self.config.solver_iterations {
            for (_, constraint) in &ids {
                match constraint {
                    Constraint::Distance {
                        body_a,
                        body_b,
                        target_distance,
                        stiffness,
                        damping,
                        anchor_a,
                        anchor_b,
                    } => {
                        self.with_body_pair(body_a, body_b, |a, b| {
                            constraint::solve_distance(
                                a,
                                b,
                                *target_distance,
                                *stiffness,
                                *damping,
                                *anchor_a,
                                *anchor_b,
                            );
                        });
                    }
                    Constraint::Hinge {
                        body_a,
                        body_b,
                        anchor_a,
                        anchor_b,
                        motor_torque,
                        limits,
                    } => {
                        self.with_body_pair(body_a, body_b, |a, b| {
                            constraint::solve_hinge(
                                a,
                                b,
                                *anchor_a,
                                *anchor_b,
                                *motor_torque,
                                *limits,
                            );
                        });
                    }
                }
            }
        }
    }

    /// Borrow two distinct bodies mutably at once. Wakes both: a constraint
    /// impulse counts as "applied force" for sleep purposes.
    fn with_body_pair(&mut self, a: &str, b: &str, f: impl FnOnce(&mut PhysicsBody, &mut PhysicsBody)) {
        if a == b {
            return;
        }
        // FxHashMap has no get_many_mut; split via remove/reinsert to keep
        // this engine's single-owner-per-table model simple.
        let Some(mut body_a) = self.bodies.remove(a) else {
            return;
        };
        let Some(body_b) = self.bodies.get_mut(b) else {
            self.bodies.insert(a.to_string(), body_a);
            return;
        };
        f(&mut body_a, body_b);
        body_a.wake();
        body_b.wake();
        self.bodies.insert(a.to_string(), body_a);
    }

    fn resolve_collisions(&mut self) {
        let candidates = self.broad_phase_pairs();
        let mut current_contacts = Vec::new();

        for (a_id, b_id) in candidates {
            let prelude = {
                let (Some(a), Some(b)) = (self.bodies.get(&a_id), self.bodies.get(&b_id)) else {
                    continue;
                };
                if a.is_static && b.is_static {
                    continue;
                }
                if a.is_sleeping && b.is_sleeping {
                    continue;
                }
                if !collision::filters_collide(&a.collision_filter, &b.collision_filter) {
                    continue;
                }
                let Some(contact) = collision::narrow_phase(a, b) else {
                    continue;
                };
                (
                    contact,
                    b.velocity - a.velocity,
                    a.user_data.clone(),
                    b.user_data.clone(),
                )
            };
            let (contact, relative_velocity, a_user_data, b_user_data) = prelude;

            let impulse_mag = self.apply_collision_response(&a_id, &b_id, &contact);

            current_contacts.push((
                contact_key(&a_id, &b_id),
                CollisionEvent {
                    body_a_id: a_id.clone(),
                    body_b_id: b_id.clone(),
                    point: contact.point,
                    normal: contact.normal,
                    depth: contact.depth,
                    relative_velocity,
                    impulse: impulse_mag,
                    body_a_user_data: a_user_data,
                    body_b_user_data: b_user_data,
                },
            ));

            if let Some(body) = self.bodies.get_mut(&a_id) {
                body.wake();
            }
            if let Some(body) = self.bodies.get_mut(&b_id) {
                body.wake();
            }
        }

        self.current_contacts = current_contacts;
    }

    fn broad_phase_pairs(&self) -> Vec<(BodyId, BodyId)> {
        let max_radius = self
            .bodies
            .values()
            .map(|b| b.shape.bounding_radius())
            .fold(0.5_f32, f32::max);
        let mut grid = SpatialHash::<usize>::new((max_radius * 2.0).max(0.1));
        let indexed: Vec<&PhysicsBody> = self.order.iter().filter_map(|id| self.bodies.get(id)).collect();
        for (i, body) in indexed.iter().enumerate() {
            let r = body.shape.bounding_radius();
            grid.insert(i, AABB::from_sphere(body.position, r));
        }

        let mut pairs = FxHashSet::default();
        for (i, body) in indexed.iter().enumerate() {
            let r = body.shape.bounding_radius();
            for &j in &grid.query_unique(AABB::from_sphere(body.position, r)) {
                if j > i {
                    pairs.insert((i, j));
                }
            }
        }

        pairs
            .into_iter()
            .map(|(i, j)| (indexed[i].id.clone(), indexed[j].id.clone()))
            .collect()
    }

    /// Returns the magnitude of the normal impulse applied, for the
    /// collision event's `impulse` field.
    fn apply_collision_response(&mut self, a_id: &str, b_id: &str, contact: &collision::Contact) -> f32 {
        let mut impulse_mag = 0.0;
        self.with_body_pair(a_id, b_id, |a, b| {
            let inv_a = a.inv_mass();
            let inv_b = b.inv_mass();
            let total_inv = inv_a + inv_b;
            if total_inv <= 0.0 {
                return;
            }

            let normal = contact.normal;
            let rel_vel = b.velocity - a.velocity;
            let vel_along_normal = rel_vel.dot(normal);

            let restitution = a.restitution.max(b.restitution);
            if vel_along_normal <= 0.0 {
                let j = -(1.0 + restitution) * vel_along_normal / total_inv;
                let impulse = normal * j;
                a.velocity -= impulse * inv_a;
                b.velocity += impulse * inv_b;
                impulse_mag = j.abs();

                let tangent = (rel_vel - normal * vel_along_normal).normalize_or_zero();
                if tangent != Vec2::ZERO {
                    let vt = rel_vel.dot(tangent);
                    let mu = (a.friction * b.friction).sqrt();
                    let jt = (-vt / total_inv).clamp(-j * mu, j * mu);
                    let friction_impulse = tangent * jt;
                    a.velocity -= friction_impulse * inv_a;
                    b.velocity += friction_impulse * inv_b;
                }
            }

            const SLOP: f32 = 0.01;
            const PERCENT: f32 = 0.8;
            let correction_mag = (contact.depth - SLOP).max(0.0) / total_inv * PERCENT;
            let correction = normal * correction_mag;
            if !a.is_static {
                a.position -= correction * inv_a;
            }
            if !b.is_static {
                b.position += correction * inv_b;
            }
        });
        impulse_mag
    }

    /// Below this incoming speed along a boundary normal, a contact is
    /// treated as resting rather than bouncing: velocity is clamped to zero
    /// on that axis instead of reflected, and the contact does not wake the
    /// body. Without this, a body resting exactly on a bounce boundary
    /// would be re-accelerated by gravity every sub-step, reflected back by
    /// `bounce`, and re-woken forever — never settling into
    /// [`PhysicsBody::is_sleeping`], which spec's bouncing-ball scenario
    /// requires. The threshold scales with how much speed gravity can add
    /// in a single sub-step, so it stays correct across configured gravity
    /// strengths and step sizes rather than hard-coding one scenario's
    /// numbers.
    const REST_VELOCITY_MARGIN: f32 = 2.0;

    fn enforce_bounds(&mut self, dt: f32) {
        let Some(bounds) = self.config.bounds else {
            return;
        };
        let rest_velocity = (self.config.gravity.length() * dt * Self::REST_VELOCITY_MARGIN).max(V_SLEEP);
        for body in self.bodies.values_mut() {
            if body.is_static {
                continue;
            }
            let r = body.shape.bounding_radius();
            let mut should_wake = false;

            if body.position.x - r < bounds.min.x {
                body.position.x = bounds.min.x + r;
                if let Some(bounce) = bounds.bounce {
                    if body.velocity.x.abs() <= rest_velocity {
                        body.velocity.x = 0.0;
                    } else {
                        body.velocity.x = body.velocity.x.abs() * bounce;
                        should_wake = true;
                    }
                }
            } else if body.position.x + r > bounds.max.x {
                body.position.x = bounds.max.x - r;
                if let Some(bounce) = bounds.bounce {
                    if body.velocity.x.abs() <= rest_velocity {
                        body.velocity.x = 0.0;
                    } else {
                        body.velocity.x = -body.velocity.x.abs() * bounce;
                        should_wake = true;
                    }
                }
            }

            if body.position.y - r < bounds.min.y {
                body.position.y = bounds.min.y + r;
                if let Some(bounce) = bounds.bounce {
                    if body.velocity.y.abs() <= rest_velocity {
                        body.velocity.y = 0.0;
                    } else {
                        body.velocity.y = body.velocity.y.abs() * bounce;
                        should_wake = true;
                    }
                }
            } else if body.position.y + r > bounds.max.y {
                body.position.y = bounds.max.y - r;
                if let Some(bounce) = bounds.bounce {
                    if body.velocity.y.abs() <= rest_velocity {
                        body.velocity.y = 0.0;
                    } else {
                        body.velocity.y = -body.velocity.y.abs() * bounce;
                        should_wake = true;
                    }
                }
            }

            if should_wake {
                body.wake();
            }
        }
    }

    fn apply_sleep_policy(&mut self, dt_ms: u64) {
        for body in self.bodies.values_mut() {
            if body.is_static {
                continue;
            }
            let below_threshold =
                body.velocity.length_squared() < V_SLEEP * V_SLEEP && body.angular_velocity.abs() < OMEGA_SLEEP;
            if below_threshold {
                body.sleep_timer_ms = body.sleep_timer_ms.saturating_add(dt_ms);
                if body.sleep_timer_ms >= T_SLEEP_MS {
                    body.is_sleeping = true;
                    body.velocity = Vec2::ZERO;
                    body.angular_velocity = 0.0;
                }
            } else {
                body.sleep_timer_ms = 0;
                body.is_sleeping = false;
            }
        }
    }

    fn diff_and_emit_contacts(&mut self) {
        let current: FxHashMap<ContactKey, CollisionEvent> = std::mem::take(&mut self.current_contacts)
            .into_iter()
            .collect();

        for (key, event) in &current {
            if self.prev_contacts.contains_key(key) {
                self.events.enqueue(CollisionActive(event.clone()));
            } else {
                self.events.enqueue(CollisionStart(event.clone()));
            }
        }
        for (key, last_event) in &self.prev_contacts {
            if !current.contains_key(key) {
                self.events.enqueue(CollisionEnd(last_event.clone()));
            }
        }

        self.prev_contacts = current;
        self.events.drain_queue::<CollisionStart>();
        self.events.drain_queue::<CollisionActive>();
        self.events.drain_queue::<CollisionEnd>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(id: &str, pos: Vec2, restitution: f32) -> BodyOptions {
        BodyOptions {
            id: Some(id.to_string()),
            shape: Shape::Circle { radius: 20.0 },
            position: pos,
            restitution,
            friction: 0.1,
            mass: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn static_body_never_moves_regardless_of_gravity() {
        let mut engine = PhysicsEngine::new(EngineConfig {
            gravity: Vec2::new(0.0, 200.0),
            ..Default::default()
        });
        let id = engine
            .add_body(BodyOptions {
                is_static: true,
                mass: 0.0,
                position: Vec2::new(1.0, 2.0),
                ..Default::default()
            })
            .unwrap();

        for _ in 0..120 {
            engine.step(16);
        }

        let body = engine.get_body(&id).unwrap();
        assert_eq!(body.position, Vec2::new(1.0, 2.0));
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn round_trip_add_then_get_matches_written_state() {
        let mut engine = PhysicsEngine::new(EngineConfig::default());
        let opts = ball("b1", Vec2::new(5.0, 5.0), 0.5);
        let id = engine.add_body(opts.clone()).unwrap();
        let body = engine.get_body(&id).unwrap();
        assert_eq!(body.position, opts.position);
        assert_eq!(body.restitution, opts.restitution);
        assert_eq!(body.mass, opts.mass);
    }

    #[test]
    fn remove_body_is_idempotent() {
        let mut engine = PhysicsEngine::new(EngineConfig::default());
        let id = engine.add_body(BodyOptions::default()).unwrap();
        engine.remove_body(&id);
        engine.remove_body(&id);
        assert!(engine.get_body(&id).is_none());
    }

    #[test]
    fn apply_force_to_unknown_id_is_silently_ignored() {
        let mut engine = PhysicsEngine::new(EngineConfig::default());
        engine.apply_force("missing", Vec2::X, None);
        engine.step(16);
    }

    #[test]
    fn add_constraint_with_unknown_body_is_rejected() {
        let mut engine = PhysicsEngine::new(EngineConfig::default());
        let a = engine.add_body(BodyOptions::default()).unwrap();
        let result = engine.add_constraint(Constraint::Distance {
            body_a: a,
            body_b: "ghost".to_string(),
            target_distance: 1.0,
            stiffness: 1.0,
            damping: 0.0,
            anchor_a: None,
            anchor_b: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn sleeping_body_stops_integrating() {
        let mut engine = PhysicsEngine::new(EngineConfig::default());
        let id = engine
            .add_body(BodyOptions {
                velocity: Vec2::ZERO,
                ..Default::default()
            })
            .unwrap();

        for _ in 0..(T_SLEEP_MS / 16 + 10) {
            engine.step(16);
        }

        assert!(engine.get_body(&id).unwrap().is_sleeping);
    }

    #[test]
    fn bouncing_ball_settles_with_decreasing_peak_heights() {
        let mut engine = PhysicsEngine::new(EngineConfig {
            gravity: Vec2::new(0.0, 200.0),
            bounds: Some(WorldBounds {
                min: Vec2::new(-1000.0, 0.0),
                max: Vec2::new(1000.0, 400.0),
                bounce: Some(0.7),
            }),
            ..Default::default()
        });
        let id = engine.add_body(ball("ball", Vec2::new(300.0, 50.0), 0.7)).unwrap();

        let mut last_y = 50.0_f32;
        let mut rising = false;
        let mut peaks = Vec::new();

        // 400 steps of 16ms each is 6.4s of simulated time, comfortably
        // past the 5s the scenario requires the ball to have settled by.
        for _ in 0..400 {
            engine.step(16);
            let body = engine.get_body(&id).unwrap();
            if body.velocity.y < 0.0 {
                rising = true;
            } else if rising && body.velocity.y >= 0.0 {
                peaks.push(last_y);
                rising = false;
            }
            last_y = body.position.y;
        }

        assert!(peaks.len() >= 1, "expected at least one bounce peak");
        for w in peaks.windows(2) {
            assert!(w[1] <= w[0] + 1.0, "peaks should not grow: {:?}", peaks);
        }

        let body = engine.get_body(&id).unwrap();
        assert!(
            body.is_sleeping,
            "ball resting on the bounce boundary must settle and sleep within 5s"
        );
        assert!(body.velocity.length() < V_SLEEP);
    }

    #[test]
    fn distance_constraint_holds_bodies_at_target_distance() {
        let mut engine = PhysicsEngine::new(EngineConfig::default());
        let a = engine
            .add_body(BodyOptions {
                position: Vec2::ZERO,
                is_static: true,
                mass: 0.0,
                ..Default::default()
            })
            .unwrap();
        let b = engine
            .add_body(BodyOptions {
                position: Vec2::new(10.0, 0.0),
                ..Default::default()
            })
            .unwrap();
        engine
            .add_constraint(Constraint::Distance {
                body_a: a.clone(),
                body_b: b.clone(),
                target_distance: 5.0,
                stiffness: 1.0,
                damping: 0.2,
                anchor_a: None,
                anchor_b: None,
            })
            .unwrap();

        for _ in 0..120 {
            engine.step(16);
        }

        let dist = (engine.get_body(&b).unwrap().position - engine.get_body(&a).unwrap().position).length();
        assert!((dist - 5.0).abs() < 0.5, "settled distance {dist}");
    }

    #[test]
    fn collision_start_fires_once_per_new_contact() {
        let mut engine = PhysicsEngine::new(EngineConfig::default());
        let starts = std::sync::Arc::new(std::sync::Mutex::new(0));
        let s = starts.clone();
        engine.on_collision_start(move |_| *s.lock().unwrap() += 1);

        engine
            .add_body(BodyOptions {
                id: Some("a".into()),
                shape: Shape::Circle { radius: 5.0 },
                position: Vec2::new(0.0, 0.0),
                velocity: Vec2::new(10.0, 0.0),
                mass: 1.0,
                ..Default::default()
            })
            .unwrap();
        engine
            .add_body(BodyOptions {
                id: Some("b".into()),
                shape: Shape::Circle { radius: 5.0 },
                position: Vec2::new(8.0, 0.0),
                mass: 1.0,
                ..Default::default()
            })
            .unwrap();

        for _ in 0..5 {
            engine.step(16);
        }

        assert!(*starts.lock().unwrap() >= 1);
    }

    #[test]
    fn stop_then_step_is_a_noop() {
        let mut engine = PhysicsEngine::new(EngineConfig {
            gravity: Vec2::new(0.0, 200.0),
            ..Default::default()
        });
        let id = engine.add_body(BodyOptions::default()).unwrap();
        engine.stop();
        engine.step(16);
        let body = engine.get_body(&id).unwrap();
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn filtered_bodies_never_collide() {
        let mut engine = PhysicsEngine::new(EngineConfig::default());
        engine
            .add_body(BodyOptions {
                id: Some("a".into()),
                shape: Shape::Circle { radius: 5.0 },
                position: Vec2::ZERO,
                collision_filter: CollisionFilter {
                    category: 0b01,
                    mask: 0b01,
                },
                ..Default::default()
            })
            .unwrap();
        engine
            .add_body(BodyOptions {
                id: Some("b".into()),
                shape: Shape::Circle { radius: 5.0 },
                position: Vec2::new(2.0, 0.0),
                collision_filter: CollisionFilter {
                    category: 0b10,
                    mask: 0b10,
                },
                ..Default::default()
            })
            .unwrap();

        let hits = std::sync::Arc::new(std::sync::Mutex::new(0));
        let h = hits.clone();
        engine.on_collision_start(move |_| *h.lock().unwrap() += 1);
        for _ in 0..10 {
            engine.step(16);
        }
        assert_eq!(*hits.lock().unwrap(), 0);
    }
}
