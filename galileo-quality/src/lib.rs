//! Quality detector (C8): one process-wide probe, cached and re-sampled on
//! visibility or configuration change, consulted (never driven) by
//! C5/C6/C7. Treats quality detection the way `galileo-observability`
//! treats a metrics signal: sample → cache → expose.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Minimal,
    Low,
    Medium,
    High,
    Ultra,
}

impl QualityTier {
    fn step_down(self) -> Self {
        match self {
            QualityTier::Ultra => QualityTier::High,
            QualityTier::High => QualityTier::Medium,
            QualityTier::Medium => QualityTier::Low,
            QualityTier::Low | QualityTier::Minimal => QualityTier::Minimal,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Minimal => "minimal",
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
            QualityTier::Ultra => "ultra",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "minimal" => QualityTier::Minimal,
            "low" => QualityTier::Low,
            "medium" => QualityTier::Medium,
            "high" => QualityTier::High,
            "ultra" => QualityTier::Ultra,
            _ => return None,
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CapabilityFlags: u8 {
        const BLUR         = 0b0001;
        const PARALLAX     = 0b0010;
        const PARTICLES    = 0b0100;
        const HEAVY_EASING = 0b1000;
    }
}

fn capabilities_for(tier: QualityTier) -> CapabilityFlags {
    match tier {
        QualityTier::Ultra => CapabilityFlags::all(),
        QualityTier::High => {
            CapabilityFlags::BLUR | CapabilityFlags::PARALLAX | CapabilityFlags::PARTICLES
        }
        QualityTier::Medium => CapabilityFlags::BLUR | CapabilityFlags::PARALLAX,
        QualityTier::Low => CapabilityFlags::BLUR,
        QualityTier::Minimal => CapabilityFlags::empty(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEffectiveType {
    Slow2g,
    Slow3g,
    ThreeG,
    FourG,
}

/// Environment signals this crate never samples itself — every bit of
/// platform detail arrives through this trait, matching spec's "must be
/// injected, not sniffed globally" rule for `networkInfo`/`batteryInfo`.
pub trait EnvironmentProbe: Send {
    /// Result of a benchmark microtask run at startup, normalized to
    /// `0.0..=1.0` (higher is faster hardware).
    fn hardware_score(&self) -> f32;
    fn battery_saver(&self) -> bool;
    fn data_saver(&self) -> bool;
    fn network_effective_type(&self) -> NetworkEffectiveType;
}

/// A fixed-signal probe for tests and hosts that already know their
/// environment rather than wanting to benchmark it each run.
#[derive(Debug, Clone, Copy)]
pub struct StaticEnvironmentProbe {
    pub hardware_score: f32,
    pub battery_saver: bool,
    pub data_saver: bool,
    pub network_effective_type: NetworkEffectiveType,
}

impl Default for StaticEnvironmentProbe {
    fn default() -> Self {
        Self {
            hardware_score: 1.0,
            battery_saver: false,
            data_saver: false,
            network_effective_type: NetworkEffectiveType::FourG,
        }
    }
}

impl EnvironmentProbe for StaticEnvironmentProbe {
    fn hardware_score(&self) -> f32 {
        self.hardware_score
    }
    fn battery_saver(&self) -> bool {
        self.battery_saver
    }
    fn data_saver(&self) -> bool {
        self.data_saver
    }
    fn network_effective_type(&self) -> NetworkEffectiveType {
        self.network_effective_type
    }
}

/// A probe whose signals can be changed after construction through shared
/// atomics — the `TestClock` idiom from `galileo-timing`, applied here so
/// tests can flip a signal and call [`QualityDetector::resample`] without
/// needing mutable access to the detector's stored probe.
#[derive(Clone, Default)]
pub struct SharedEnvironmentProbe {
    hardware_score_bits: std::sync::Arc<std::sync::atomic::AtomicU32>,
    battery_saver: std::sync::Arc<std::sync::atomic::AtomicBool>,
    data_saver: std::sync::Arc<std::sync::atomic::AtomicBool>,
    network_effective_type: std::sync::Arc<std::sync::atomic::AtomicU8>,
}

impl SharedEnvironmentProbe {
    pub fn new() -> Self {
        let probe = Self::default();
        probe.set_hardware_score(1.0);
        probe.set_network_effective_type(NetworkEffectiveType::FourG);
        probe
    }

    pub fn set_hardware_score(&self, v: f32) {
        self.hardware_score_bits.store(v.to_bits(), std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_battery_saver(&self, v: bool) {
        self.battery_saver.store(v, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_data_saver(&self, v: bool) {
        self.data_saver.store(v, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_network_effective_type(&self, v: NetworkEffectiveType) {
        self.network_effective_type.store(v as u8, std::sync::atomic::Ordering::SeqCst);
    }
}

impl EnvironmentProbe for SharedEnvironmentProbe {
    fn hardware_score(&self) -> f32 {
        f32::from_bits(self.hardware_score_bits.load(std::sync::atomic::Ordering::SeqCst))
    }
    fn battery_saver(&self) -> bool {
        self.battery_saver.load(std::sync::atomic::Ordering::SeqCst)
    }
    fn data_saver(&self) -> bool {
        self.data_saver.load(std::sync::atomic::Ordering::SeqCst)
    }
    fn network_effective_type(&self) -> NetworkEffectiveType {
        match self.network_effective_type.load(std::sync::atomic::Ordering::SeqCst) {
            0 => NetworkEffectiveType::Slow2g,
            1 => NetworkEffectiveType::Slow3g,
            2 => NetworkEffectiveType::ThreeG,
            _ => NetworkEffectiveType::FourG,
        }
    }
}

/// Injection seam for the manual-override persistence spec calls for.
/// `galileo-runtime` supplies whatever storage the host has (local
/// storage, a config file, an in-memory map for tests).
pub trait KvStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// A `KvStore` backed by nothing but process memory — the one this crate's
/// own tests drive, and a reasonable default for hosts with no durable
/// storage of their own.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: std::collections::HashMap<String, String>,
}

impl KvStore for InMemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

const OVERRIDE_KEY: &str = "galileo.quality.override";

fn compute_tier(probe: &dyn EnvironmentProbe) -> QualityTier {
    if probe.battery_saver() || probe.data_saver() {
        return QualityTier::Minimal;
    }
    let base = match probe.hardware_score() {
        s if s >= 0.85 => QualityTier::Ultra,
        s if s >= 0.65 => QualityTier::High,
        s if s >= 0.4 => QualityTier::Medium,
        s if s >= 0.2 => QualityTier::Low,
        _ => QualityTier::Minimal,
    };
    let slow_network = matches!(
        probe.network_effective_type(),
        NetworkEffectiveType::Slow2g | NetworkEffectiveType::Slow3g
    );
    if slow_network {
        base.step_down()
    } else {
        base
    }
}

/// Single global probe with cache. Re-sample explicitly with
/// [`Self::resample`] on visibility or configuration change — this type
/// never polls on its own, matching the cooperative-scheduling rule
/// elsewhere in this workspace.
pub struct QualityDetector<P: EnvironmentProbe, S: KvStore> {
    probe: P,
    store: S,
    override_tier: Option<QualityTier>,
    cached_tier: QualityTier,
    listeners: Vec<Box<dyn FnMut(QualityTier) + Send>>,
}

impl<P: EnvironmentProbe, S: KvStore> QualityDetector<P, S> {
    pub fn new(probe: P, store: S) -> Self {
        let override_tier = store.get(OVERRIDE_KEY).and_then(|s| QualityTier::from_str(&s));
        let cached_tier = override_tier.unwrap_or_else(|| compute_tier(&probe));
        debug!(?cached_tier, has_override = override_tier.is_some(), "quality detector initialized");
        Self {
            probe,
            store,
            override_tier,
            cached_tier,
            listeners: Vec::new(),
        }
    }

    pub fn tier(&self) -> QualityTier {
        self.override_tier.unwrap_or(self.cached_tier)
    }

    pub fn capabilities(&self) -> CapabilityFlags {
        capabilities_for(self.tier())
    }

    /// Re-run detection against the current probe signals. A no-op for the
    /// reported tier while a manual override is active, but the detected
    /// tier is still refreshed so it's ready the moment the override is
    /// cleared.
    pub fn resample(&mut self) {
        let previous = self.tier();
        self.cached_tier = compute_tier(&self.probe);
        let current = self.tier();
        if current != previous {
            self.notify(current);
        }
    }

    /// `Some(tier)` pins the reported tier regardless of detection;
    /// `None` restores automatic detection. Persisted through the injected
    /// [`KvStore`] so it survives whatever this process's host considers a
    /// restart boundary.
    pub fn force_tier(&mut self, tier: Option<QualityTier>) {
        let previous = self.tier();
        match tier {
            Some(t) => self.store.set(OVERRIDE_KEY, t.as_str()),
            None => self.store.remove(OVERRIDE_KEY),
        }
        self.override_tier = tier;
        let current = self.tier();
        if current != previous {
            self.notify(current);
        }
    }

    pub fn on_quality_change(&mut self, cb: impl FnMut(QualityTier) + Send + 'static) {
        self.listeners.push(Box::new(cb));
    }

    fn notify(&mut self, tier: QualityTier) {
        for listener in &mut self.listeners {
            listener(tier);
        }
    }
}
