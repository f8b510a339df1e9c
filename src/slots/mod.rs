//! Notification-timing optimizer.
//!
//! Learns, per (category, day-of-week, 30-minute bin), how likely and how
//! quickly the user reacts to a delivered reminder, then ranks candidate
//! future slots. All state lives in the injected [`EngineDb`]; two engines
//! over different databases share nothing.

pub mod context;
pub mod decay;
mod focus;
mod scorer;
mod snooze;
mod stats;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EngineConfig;
use crate::db::EngineDb;
use crate::types::EngagementOverview;

pub struct SlotEngine<'a> {
    db: &'a EngineDb,
    cfg: EngineConfig,
    rng: StdRng,
}

impl<'a> SlotEngine<'a> {
    /// Production constructor: exploration draws are seeded from the OS.
    pub fn new(db: &'a EngineDb, cfg: EngineConfig) -> Self {
        let seed = rand::rng().next_u64();
        Self::with_seed(db, cfg, seed)
    }

    /// Deterministic constructor for tests and replay.
    pub fn with_seed(db: &'a EngineDb, cfg: EngineConfig, seed: u64) -> Self {
        Self {
            db,
            cfg,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Overall engagement readout from the global aggregate.
    pub fn engagement_overview(&self) -> EngagementOverview {
        let global = self.db.global_stats_or_default();
        EngagementOverview {
            p_open_5m: global.p_open_5m(),
            p_open_30m: global.p_open_30m(),
            median_rt_ms: global.median_rt_ms(),
            delivered: global.delivered,
            opened: global.opened,
            ignored: global.ignored,
        }
    }
}
