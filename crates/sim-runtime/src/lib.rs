#![deny(warnings)]

//! Simulation runtime for Rent Tycoon.
//!
//! The market is driven by four named periodic rules plus five player actions,
//! all funnelled through a single writer. Two drive modes are provided:
//!
//! - [`Simulation`] with [`Scheduler`]: virtual time, fully deterministic from
//!   a seed, used by tests and fast-forward runs.
//! - [`SimulationHandle`]: wall-clock timers on tokio, one interval task per
//!   rule, with rules and actions serialized over a single command channel.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use sim_core::{BrokenItem, GameState, House, HouseId, SimConfig, Tenant};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Probability that an intact house breaks per breakage tick.
const BREAKAGE_PROBABILITY: f64 = 0.3;

/// The four periodic rules of the simulation clock.
///
/// Each rule is an independent timer: breakage attempts run more often than
/// financial settlement, and market churn is slower than both. Rules always
/// read the latest committed state at fire time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    /// Intact houses spontaneously break a random fixture.
    SpontaneousBreakage,
    /// Tenants break fixtures in proportion to their damage propensity.
    TenantDamage,
    /// Rent is credited, then upset tenants (broken house) move out.
    RentAndChurn,
    /// Non-owned houses churn off the market; one new listing appears.
    MarketTurnover,
}

impl Rule {
    /// Every rule, in the order used to break scheduling ties.
    pub const ALL: [Rule; 4] = [
        Rule::SpontaneousBreakage,
        Rule::TenantDamage,
        Rule::RentAndChurn,
        Rule::MarketTurnover,
    ];

    /// Wall-clock firing period of this rule.
    pub fn period(self) -> Duration {
        match self {
            Rule::SpontaneousBreakage => Duration::from_millis(5_000),
            Rule::TenantDamage => Duration::from_millis(10_000),
            Rule::RentAndChurn => Duration::from_millis(10_000),
            Rule::MarketTurnover => Duration::from_millis(15_000),
        }
    }

    /// Apply one tick of this rule to the state.
    pub fn apply<R: Rng + ?Sized>(self, state: &mut GameState, rng: &mut R) {
        match self {
            Rule::SpontaneousBreakage => spontaneous_breakage(state, rng),
            Rule::TenantDamage => tenant_damage(state, rng),
            Rule::RentAndChurn => collect_rent_and_churn(state),
            Rule::MarketTurnover => market_turnover(state, rng),
        }
    }
}

/// Breakage tick: each intact house breaks a uniformly random fixture with
/// probability [`BREAKAGE_PROBABILITY`]. Draws are independent per house.
pub fn spontaneous_breakage<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) {
    for house in &mut state.houses {
        if house.broken_item.is_none() && rng.gen_bool(BREAKAGE_PROBABILITY) {
            let item = BrokenItem::random(rng);
            debug!(house = %house.id, %item, "fixture broke");
            house.broken_item = Some(item);
        }
    }
}

/// Damage tick: each tenanted house breaks a random fixture with probability
/// `damage / 10`, overwriting any fixture already broken.
pub fn tenant_damage<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) {
    for house in &mut state.houses {
        if let Some(tenant) = house.tenant {
            if rng.gen_bool(f64::from(tenant.damage) / 10.0) {
                let item = BrokenItem::random(rng);
                debug!(house = %house.id, %item, "tenant broke a fixture");
                house.broken_item = Some(item);
            }
        }
    }
}

/// Settlement tick: credit the rent due across the market (computed with the
/// rating as of this call), then clear every tenancy whose house is broken.
/// The departure of an upset tenant does not touch the rating.
pub fn collect_rent_and_churn(state: &mut GameState) {
    let due = sim_econ::total_rent_due(state);
    state.money += due;
    if due > Decimal::ZERO {
        debug!(%due, balance = %state.money, "collected rent");
    }
    for house in &mut state.houses {
        if house.tenant.is_some() && house.is_broken() {
            debug!(house = %house.id, "upset tenant moved out");
            house.tenant = None;
        }
    }
}

/// Turnover tick: owned houses always stay listed; each non-owned house
/// survives with probability 2/3; one fresh listing is appended, so the
/// market never empties.
pub fn market_turnover<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) {
    let before = state.houses.len();
    state.houses.retain(|house| house.owner || rng.gen_range(0..3) != 0);
    let dropped = before - state.houses.len();
    let newcomer = House::random(rng, &state.taken_ids());
    debug!(house = %newcomer.id, dropped, "market turnover");
    state.houses.push(newcomer);
}

/// Why a player action was rejected. Rejection leaves state untouched;
/// callers wanting silent no-op semantics just discard the error.
#[derive(Debug, Error, PartialEq)]
pub enum ActionError {
    /// No house with this id is on the market.
    #[error("no house with id {0}")]
    UnknownHouse(HouseId),
    /// Fix was requested but nothing is broken.
    #[error("nothing is broken in house {0}")]
    NothingBroken(HouseId),
    /// Evict was requested for a vacant house.
    #[error("house {0} has no tenant")]
    NoTenant(HouseId),
    /// Let was requested for an occupied house.
    #[error("house {0} is already let")]
    AlreadyLet(HouseId),
    /// The wallet cannot cover the price or the rolled cost.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },
}

/// Call a contractor: roll a cost and delegate to [`fix_with_cost`].
pub fn fix<R: Rng + ?Sized>(
    state: &mut GameState,
    id: HouseId,
    rng: &mut R,
) -> Result<(), ActionError> {
    let cost = sim_econ::roll_repair_cost(rng);
    fix_with_cost(state, id, cost)
}

/// Repair a house at a known cost: clears the breakage, bumps the rating by
/// one, debits the wallet. Rejected when nothing is broken or the cost
/// exceeds the balance; the rolled cost is discarded on rejection.
pub fn fix_with_cost(state: &mut GameState, id: HouseId, cost: Decimal) -> Result<(), ActionError> {
    let available = state.money;
    let house = state.house_mut(id).ok_or(ActionError::UnknownHouse(id))?;
    if house.broken_item.is_none() {
        return Err(ActionError::NothingBroken(id));
    }
    if cost > available {
        return Err(ActionError::InsufficientFunds {
            needed: cost,
            available,
        });
    }
    house.broken_item = None;
    state.rating += 1;
    state.money -= cost;
    info!(house = %id, %cost, rating = state.rating, "contractor fixed the house");
    Ok(())
}

/// Evict the tenant: clears the tenancy and costs one rating point.
pub fn evict(state: &mut GameState, id: HouseId) -> Result<(), ActionError> {
    let house = state.house_mut(id).ok_or(ActionError::UnknownHouse(id))?;
    if house.tenant.is_none() {
        return Err(ActionError::NoTenant(id));
    }
    house.tenant = None;
    state.rating -= 1;
    info!(house = %id, rating = state.rating, "tenant evicted");
    Ok(())
}

/// Let a vacant house to a fresh random tenant. Ownership is not checked
/// here; front ends only offer the action for owned, vacant houses.
pub fn let_house<R: Rng + ?Sized>(
    state: &mut GameState,
    id: HouseId,
    rng: &mut R,
) -> Result<(), ActionError> {
    let house = state.house_mut(id).ok_or(ActionError::UnknownHouse(id))?;
    if house.tenant.is_some() {
        return Err(ActionError::AlreadyLet(id));
    }
    let tenant = Tenant::random(rng);
    info!(house = %id, damage = tenant.damage, "house let to new tenant");
    house.tenant = Some(tenant);
    Ok(())
}

/// Buy a house at its listed value. Rejected when the wallet cannot cover the
/// price; the balance never goes negative.
pub fn buy(state: &mut GameState, id: HouseId) -> Result<(), ActionError> {
    let available = state.money;
    let house = state.house_mut(id).ok_or(ActionError::UnknownHouse(id))?;
    if house.value > available {
        return Err(ActionError::InsufficientFunds {
            needed: house.value,
            available,
        });
    }
    house.owner = true;
    let value = house.value;
    state.money -= value;
    info!(house = %id, %value, balance = %state.money, "house bought");
    Ok(())
}

/// Sell a house at its listed value. Ownership is not checked here; front
/// ends only offer the action for owned houses.
pub fn sell(state: &mut GameState, id: HouseId) -> Result<(), ActionError> {
    let house = state.house_mut(id).ok_or(ActionError::UnknownHouse(id))?;
    house.owner = false;
    let value = house.value;
    state.money += value;
    info!(house = %id, %value, balance = %state.money, "house sold");
    Ok(())
}

/// A player action addressed to one house.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Fix(HouseId),
    Evict(HouseId),
    Let(HouseId),
    Buy(HouseId),
    Sell(HouseId),
}

/// Virtual-time scheduler for the periodic rules.
///
/// Tracks each rule's next due instant on a virtual clock starting at zero.
/// [`Scheduler::advance_by`] fires every rule that comes due in chronological
/// order, ties broken by [`Rule::ALL`] order, each applied to the state as of
/// its own firing instant.
#[derive(Clone, Debug)]
pub struct Scheduler {
    now: Duration,
    next_due: [(Rule, Duration); 4],
}

impl Scheduler {
    /// Fresh scheduler: every rule first fires one period after start.
    pub fn new() -> Self {
        Scheduler {
            now: Duration::ZERO,
            next_due: Rule::ALL.map(|rule| (rule, rule.period())),
        }
    }

    /// Virtual time elapsed since the simulation started.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Advance the virtual clock by `dt`, applying every rule firing in the
    /// window to `state`.
    pub fn advance_by<R: Rng + ?Sized>(
        &mut self,
        dt: Duration,
        state: &mut GameState,
        rng: &mut R,
    ) {
        let target = self.now + dt;
        loop {
            let mut earliest: Option<usize> = None;
            for (i, entry) in self.next_due.iter().enumerate() {
                if entry.1 <= target && earliest.map_or(true, |j| entry.1 < self.next_due[j].1) {
                    earliest = Some(i);
                }
            }
            let Some(i) = earliest else { break };
            let (rule, due) = self.next_due[i];
            self.now = due;
            rule.apply(state, rng);
            self.next_due[i].1 = due + rule.period();
        }
        self.now = target;
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// The simulation controller: owns the state, the seeded RNG, and the
/// scheduler. All mutation goes through `&mut self`, which is the
/// single-writer discipline the rules rely on.
#[derive(Clone, Debug)]
pub struct Simulation {
    state: GameState,
    rng: ChaCha8Rng,
    scheduler: Scheduler,
}

impl Simulation {
    /// Start a run from the fixed initial distribution, seeded from `config`.
    pub fn new(config: SimConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        let state = GameState::new(&mut rng);
        info!(seed = config.rng_seed, "simulation created");
        Simulation {
            state,
            rng,
            scheduler: Scheduler::new(),
        }
    }

    /// Read-only view of the current state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Owned snapshot of the current state, for render loops.
    pub fn snapshot(&self) -> GameState {
        self.state.clone()
    }

    /// Virtual time elapsed since the run started.
    pub fn elapsed(&self) -> Duration {
        self.scheduler.now()
    }

    /// Advance virtual time, firing due rules in order.
    pub fn advance_by(&mut self, dt: Duration) {
        self.scheduler
            .advance_by(dt, &mut self.state, &mut self.rng);
    }

    /// Apply a single rule tick immediately, outside the schedule.
    pub fn apply_rule(&mut self, rule: Rule) {
        rule.apply(&mut self.state, &mut self.rng);
    }

    /// Apply a player action against the current state.
    pub fn apply(&mut self, action: Action) -> Result<(), ActionError> {
        match action {
            Action::Fix(id) => fix(&mut self.state, id, &mut self.rng),
            Action::Evict(id) => evict(&mut self.state, id),
            Action::Let(id) => let_house(&mut self.state, id, &mut self.rng),
            Action::Buy(id) => buy(&mut self.state, id),
            Action::Sell(id) => sell(&mut self.state, id),
        }
    }
}

enum Command {
    Rule(Rule),
    Action(Action),
    Snapshot(oneshot::Sender<GameState>),
}

/// Wall-clock driver for a [`Simulation`].
///
/// [`SimulationHandle::start`] spawns one tokio interval task per rule and a
/// single actor task that owns the simulation; rule ticks and player actions
/// arrive over one channel, so every mutation is serialized. Must be called
/// from within a tokio runtime.
pub struct SimulationHandle {
    tx: mpsc::Sender<Command>,
    tasks: Vec<JoinHandle<()>>,
}

impl SimulationHandle {
    /// Begin the four periodic rules against a fresh simulation.
    pub fn start(config: SimConfig) -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(64);
        let mut tasks: Vec<JoinHandle<()>> = Vec::with_capacity(Rule::ALL.len() + 1);
        for rule in Rule::ALL {
            let tx = tx.clone();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(rule.period());
                // interval yields immediately on the first tick
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if tx.send(Command::Rule(rule)).await.is_err() {
                        break;
                    }
                }
            }));
        }
        let mut sim = Simulation::new(config);
        tasks.push(tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    Command::Rule(rule) => sim.apply_rule(rule),
                    Command::Action(action) => {
                        if let Err(err) = sim.apply(action) {
                            info!(%err, "action rejected");
                        }
                    }
                    Command::Snapshot(reply) => {
                        let _ = reply.send(sim.snapshot());
                    }
                }
            }
        }));
        Self { tx, tasks }
    }

    /// Enqueue a player action. Rejections are logged by the actor, matching
    /// the silent-no-op contract of the game.
    pub async fn act(&self, action: Action) {
        let _ = self.tx.send(Command::Action(action)).await;
    }

    /// Request a snapshot of the current state. Returns `None` once the
    /// simulation has been stopped.
    pub async fn snapshot(&self) -> Option<GameState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(Command::Snapshot(reply_tx)).await.ok()?;
        reply_rx.await.ok()
    }

    /// Cancel every timer task and the actor. Idempotent; also runs on drop,
    /// so no timer outlives the handle.
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
