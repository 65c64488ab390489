//! Match session: the action API callers use
//!
//! A session owns one peer's `GameState` and exposes the action API humans
//! and controllers call. Offline, an action mutates the state directly.
//! Networked, the action is first tried on a throwaway copy of the state; if
//! the rules accept it, exactly one event is enqueued and nothing changes
//! locally until that event comes back through `sync`.
//!
//! After every change the session reconciles its deferred tasks: automated
//! seats get their next step scheduled, unblockable combats get their
//! resolution pause, and timers of a pending action that went away are
//! dropped. Transitions nobody chooses (starting the blocking stage,
//! resolving an unblocked combat) are emitted by the attacking seat's peer.

use crate::core::{EffectDef, InstanceId, Seat, Target, TemplateId};
use crate::game::controller::{AutomationHooks, Controller, GameStateView, PlayerAction};
use crate::game::pacing::{DeferredTask, Pacer, TaskOwner};
use crate::game::pending::PendingKind;
use crate::game::setup::MatchSetup;
use crate::game::state_hash::compute_state_hash;
use crate::game::{GameLogger, GameState, PhaseAdvance, RulesConfig, VerbosityLevel};
use crate::loader::CardCatalog;
use crate::replication::{CardRef, EventPayload, IngestReport, ReplayMode, ReplicationClient};
use crate::targeting::{build_requirements, Requirement};
use crate::zones::Zone;
use crate::{ClashError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Failed automated steps in a row before `run_automation` gives up
const MAX_AUTOMATION_FAILURES: u32 = 8;

pub struct MatchSession {
    catalog: Arc<CardCatalog>,
    rules: RulesConfig,
    game: Option<GameState>,
    /// `None` when offline
    client: Option<ReplicationClient>,
    local: [bool; 2],
    pacer: Pacer,
    controllers: [Option<Box<dyn Controller>>; 2],
    replay_mode: ReplayMode,
    /// Copied onto the match state when it is created
    logger: GameLogger,
    tracked_pending: Option<u64>,
    automation_failures: u32,
}

impl MatchSession {
    /// Both seats play on this machine; actions apply immediately
    pub fn offline(catalog: Arc<CardCatalog>, rules: RulesConfig) -> Self {
        MatchSession {
            catalog,
            rules,
            game: None,
            client: None,
            local: [true, true],
            pacer: Pacer::new(),
            controllers: [None, None],
            replay_mode: ReplayMode::Idle,
            logger: GameLogger::new(),
            tracked_pending: None,
            automation_failures: 0,
        }
    }

    /// One peer of a replicated match, acting for `local_seats`
    pub fn networked(
        catalog: Arc<CardCatalog>,
        rules: RulesConfig,
        client: ReplicationClient,
        local_seats: &[Seat],
    ) -> Self {
        let mut session = Self::offline(catalog, rules);
        session.client = Some(client);
        session.local = [false, false];
        for seat in local_seats {
            session.local[seat.index()] = true;
        }
        session
    }

    /// Logger settings (verbosity, output, prefix) for this peer
    pub fn set_logger(&mut self, logger: GameLogger) {
        if let Some(game) = self.game.as_mut() {
            game.logger = logger.clone();
        }
        self.logger = logger;
    }

    pub fn set_controller(&mut self, seat: Seat, controller: Box<dyn Controller>) {
        self.controllers[seat.index()] = Some(controller);
        self.after_change();
    }

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    pub fn client(&self) -> Option<&ReplicationClient> {
        self.client.as_ref()
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn is_networked(&self) -> bool {
        self.client.is_some()
    }

    pub fn is_local(&self, seat: Seat) -> bool {
        self.local[seat.index()]
    }

    pub fn state_hash(&self) -> Option<u64> {
        self.game.as_ref().map(compute_state_hash)
    }

    /// Notifications of newly visible events (networked only)
    pub async fn subscribe(&self) -> Option<broadcast::Receiver<u64>> {
        let client = self.client.as_ref()?;
        Some(client.store().subscribe(client.match_id()).await)
    }

    /// Start the match described by `setup`
    ///
    /// Networked, this only enqueues `MATCH_STARTED`; the state exists once
    /// the event has been synced back.
    pub fn start_match(&mut self, setup: MatchSetup) -> Result<()> {
        if self.game.is_some() {
            return Err(ClashError::InvalidAction("match already started".into()));
        }
        let mut quiet = GameLogger::with_verbosity(VerbosityLevel::Silent);
        quiet.enable_capture();
        let game = GameState::from_setup_logged(
            &setup,
            self.rules.clone(),
            Arc::clone(&self.catalog),
            if self.client.is_some() { quiet } else { self.logger.clone() },
        )?;

        match self.client.as_mut() {
            None => {
                self.game = Some(game);
                self.after_change();
            }
            Some(client) => {
                let dice = setup.roll_dice();
                let payload = EventPayload::MatchStarted {
                    first_player: game.current_player,
                    rules: self.rules.clone(),
                    dice,
                    setup,
                };
                client.enqueue_event(self.replay_mode, payload)?;
            }
        }
        Ok(())
    }

    /// Flush our unwritten events, then replay whatever the store has
    ///
    /// A failed write is returned after the replay so the peer still catches
    /// up; the failed action counts as never sent.
    pub async fn sync(&mut self) -> Result<IngestReport> {
        let Some(client) = self.client.as_mut() else {
            return Ok(IngestReport::default());
        };
        let flushed = client.flush().await;
        if let Err(e) = &flushed {
            self.logger_ref()
                .warn("replication", &format!("event write failed: {e}"));
        }

        let Some(client) = self.client.as_mut() else {
            return Ok(IngestReport::default());
        };
        let store = Arc::clone(client.store());
        let events = store.snapshot(client.match_id()).await?;

        self.replay_mode = ReplayMode::Replaying;
        let report = match self.client.as_mut() {
            Some(client) => client.ingest(&mut self.game, events, &self.catalog, &self.logger),
            None => IngestReport::default(),
        };
        self.replay_mode = ReplayMode::Idle;

        if report.applied > 0 {
            self.automation_failures = 0;
        }
        self.after_change();
        flushed?;
        Ok(report)
    }

    /// Feed `elapsed_ms` to the pacer and run every task that fell due
    pub fn tick(&mut self, elapsed_ms: u64) {
        for task in self.pacer.advance(elapsed_ms) {
            self.fire(task);
        }
    }

    /// Fast-forward through scheduled tasks until nothing is left to do
    ///
    /// Stops at the end of the match, past `max_turns`, or when automated
    /// seats keep choosing rejected actions. Returns the simulated time spent.
    pub fn run_automation(&mut self) -> u64 {
        let mut elapsed = 0;
        loop {
            let Some(game) = self.game.as_ref() else { break };
            if game.is_finished() {
                break;
            }
            if self.automation_failures >= MAX_AUTOMATION_FAILURES {
                self.logger_ref()
                    .warn("automation", "automated seats keep failing, stopping");
                break;
            }
            let Some(due_in) = self.pacer.next_due_in() else { break };
            elapsed += due_in;
            self.tick(due_in);
        }
        elapsed
    }

    /// Execute one action value through the action API
    pub fn perform(&mut self, seat: Seat, action: PlayerAction) -> Result<()> {
        match action {
            PlayerAction::PlayCard(card) => self.play_card(seat, card),
            PlayerAction::PrepareSpell(card) => self.prepare_spell(seat, card),
            PlayerAction::SelectTarget(target) => self.select_target(seat, target),
            PlayerAction::ConfirmPending => self.confirm_pending(seat),
            PlayerAction::CancelPending => self.cancel_pending(seat),
            PlayerAction::DeclareAttacker(card) => self.declare_attacker(seat, card),
            PlayerAction::ConfirmAttackers => self.confirm_attackers(seat),
            PlayerAction::SkipCombat => self.skip_combat(seat),
            PlayerAction::SelectBlocker(card) => self.select_blocker(seat, card),
            PlayerAction::AssignBlocker(attacker) => self.assign_blocker(seat, attacker),
            PlayerAction::DeclareBlockersDone => self.declare_blockers_done(seat),
            PlayerAction::AdvancePhase => self.advance_phase(seat),
            PlayerAction::ActivateAbility(card) => self.activate_ability(seat, card),
        }
    }

    // Action API

    pub fn play_card(&mut self, seat: Seat, card: InstanceId) -> Result<()> {
        let payload = self.card_ref(card).and_then(|card_ref| {
            Ok(if self.running()?.card(card)?.is_creature() {
                EventPayload::CardPlayed {
                    seat,
                    card: card_ref,
                    zone: Zone::Battlefield,
                }
            } else {
                EventPayload::PendingCreated {
                    seat,
                    kind: PendingKind::Spell,
                    card: card_ref,
                }
            })
        });
        self.submit("play card", Some(seat), payload, |g| {
            g.play_card(seat, card).map(drop)
        })
    }

    pub fn prepare_spell(&mut self, seat: Seat, card: InstanceId) -> Result<()> {
        let payload = self.card_ref(card).map(|card| EventPayload::PendingCreated {
            seat,
            kind: PendingKind::Spell,
            card,
        });
        self.submit("prepare spell", Some(seat), payload, |g| {
            g.prepare_spell(seat, card).map(drop)
        })
    }

    pub fn activate_ability(&mut self, seat: Seat, card: InstanceId) -> Result<()> {
        let payload = self.card_ref(card).map(|card| EventPayload::PendingCreated {
            seat,
            kind: PendingKind::Ability,
            card,
        });
        self.submit("activate ability", Some(seat), payload, |g| {
            g.activate_ability(seat, card).map(drop)
        })
    }

    pub fn select_target(&mut self, seat: Seat, target: Target) -> Result<()> {
        let payload = self.pending_id().map(|pending_id| EventPayload::PendingUpdated {
            seat,
            pending_id,
            target,
        });
        self.submit("select target", Some(seat), payload, |g| {
            g.select_target(seat, target)
        })
    }

    pub fn confirm_pending(&mut self, seat: Seat) -> Result<()> {
        let pending_id = self.pending_id();
        let payload = pending_id
            .as_ref()
            .map(|&pending_id| EventPayload::PendingResolved { seat, pending_id })
            .map_err(clone_error);
        self.submit("confirm", Some(seat), payload, |g| g.confirm_pending(seat))?;
        if let Ok(id) = pending_id {
            self.pacer.cancel_owned(TaskOwner::Pending(id));
        }
        Ok(())
    }

    /// Cancel the pending action; its scheduled tasks are dropped right away
    pub fn cancel_pending(&mut self, seat: Seat) -> Result<()> {
        let pending_id = self.pending_id();
        let payload = pending_id
            .as_ref()
            .map(|&pending_id| EventPayload::PendingCancelled { seat, pending_id })
            .map_err(clone_error);
        self.submit("cancel", Some(seat), payload, |g| g.cancel_pending(seat))?;
        if let Ok(id) = pending_id {
            self.pacer.cancel_owned(TaskOwner::Pending(id));
        }
        Ok(())
    }

    pub fn declare_attacker(&mut self, seat: Seat, attacker: InstanceId) -> Result<()> {
        let payload = self
            .card_ref(attacker)
            .map(|attacker| EventPayload::AttackerToggled { seat, attacker });
        self.submit("declare attacker", Some(seat), payload, |g| {
            g.declare_attacker(seat, attacker).map(drop)
        })
    }

    pub fn confirm_attackers(&mut self, seat: Seat) -> Result<()> {
        let payload = Ok(EventPayload::AttackersConfirmed { seat });
        self.submit("confirm attackers", Some(seat), payload, |g| {
            g.confirm_attackers(seat)
        })
    }

    pub fn skip_combat(&mut self, seat: Seat) -> Result<()> {
        let payload = Ok(EventPayload::PhaseChanged {
            seat,
            phase: crate::game::Phase::Main2,
        });
        self.submit("skip combat", Some(seat), payload, |g| g.skip_combat(seat))
    }

    pub fn select_blocker(&mut self, seat: Seat, blocker: InstanceId) -> Result<()> {
        let payload = self
            .card_ref(blocker)
            .map(|blocker| EventPayload::BlockerSelected { seat, blocker });
        self.submit("select blocker", Some(seat), payload, |g| {
            g.select_blocker(seat, blocker)
        })
    }

    pub fn assign_blocker(&mut self, seat: Seat, attacker: InstanceId) -> Result<()> {
        let payload = self
            .card_ref(attacker)
            .map(|attacker| EventPayload::BlockerAssigned { seat, attacker });
        self.submit("assign blocker", Some(seat), payload, |g| {
            g.assign_blocker(seat, attacker)
        })
    }

    /// The defender is done; the defender's peer computes the combat report
    pub fn declare_blockers_done(&mut self, seat: Seat) -> Result<()> {
        let payload = self.running().and_then(|g| {
            g.can_resolve_combat(Some(seat))?;
            Ok(EventPayload::CombatResolved {
                report: g.compute_combat_report()?,
            })
        });
        self.submit("declare blockers done", Some(seat), payload, |g| {
            g.declare_blockers_done(seat).map(drop)
        })
    }

    pub fn advance_phase(&mut self, seat: Seat) -> Result<()> {
        let payload = self
            .running()
            .and_then(|g| g.next_phase_transition(seat))
            .map(|transition| match transition {
                PhaseAdvance::CombatStarted => EventPayload::CombatStarted { seat },
                PhaseAdvance::Changed(phase) => EventPayload::PhaseChanged { seat, phase },
                PhaseAdvance::TurnStarted { seat, turn } => {
                    EventPayload::TurnStarted { seat, turn }
                }
            });
        self.submit("advance phase", Some(seat), payload, |g| {
            g.advance_phase(seat).map(drop)
        })
    }

    pub fn concede(&mut self, seat: Seat) -> Result<()> {
        let payload = Ok(EventPayload::GameEnded { conceded_by: seat });
        self.submit("concede", Some(seat), payload, |g| g.concede(seat))
    }

    pub fn create_token(&mut self, seat: Seat, template: TemplateId) -> Result<()> {
        let printed = self.catalog.require(&template);
        let payload = printed.as_ref().map(|_| EventPayload::TokenCreated {
            seat,
            template: template.clone(),
        });
        let payload = payload.map_err(clone_error);
        self.submit("create token", Some(seat), payload, move |g| {
            g.create_token(seat, printed?);
            Ok(())
        })
    }

    /// Destroy a creature on `seat`'s behalf
    pub fn destroy_creature(&mut self, seat: Seat, creature: InstanceId) -> Result<()> {
        let payload = self
            .card_ref(creature)
            .map(|card| EventPayload::CreatureDestroyed { card });
        self.submit("destroy creature", Some(seat), payload, |g| {
            g.destroy_creature(creature)
        })
    }

    pub fn adjust_life(&mut self, seat: Seat, delta: i32) -> Result<()> {
        let payload = Ok(EventPayload::LifeChanged { seat, delta });
        self.submit("adjust life", Some(seat), payload, |g| {
            g.adjust_life(seat, delta);
            Ok(())
        })
    }

    /// The running match, or an error before one has started
    fn running(&self) -> Result<&GameState> {
        self.game
            .as_ref()
            .ok_or_else(|| ClashError::InvalidAction("no match is running".into()))
    }

    fn card_ref(&self, id: InstanceId) -> Result<CardRef> {
        Ok(CardRef::of(self.running()?.card(id)?))
    }

    fn pending_id(&self) -> Result<u64> {
        self.running()?
            .pending
            .as_ref()
            .map(|p| p.id)
            .ok_or_else(|| ClashError::InvalidAction("nothing is pending".into()))
    }

    fn logger_ref(&self) -> &GameLogger {
        self.game.as_ref().map(|g| &g.logger).unwrap_or(&self.logger)
    }

    fn settled(&self) -> bool {
        self.client.as_ref().map_or(true, ReplicationClient::is_settled)
    }

    fn is_automated(&self, seat: Seat) -> bool {
        self.is_local(seat) && self.controllers[seat.index()].is_some()
    }

    /// Run one action: directly offline, or as a single event when networked
    ///
    /// Rejections are logged and returned; the state is left untouched.
    fn submit<F>(
        &mut self,
        what: &str,
        seat: Option<Seat>,
        payload: Result<EventPayload>,
        act: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut GameState) -> Result<()>,
    {
        let result = self.submit_inner(seat, payload, act);
        match &result {
            Ok(()) => self.after_change(),
            Err(ClashError::ProtocolViolation(reason)) => {
                self.logger_ref()
                    .warn("replication", &format!("{what} dropped: {reason}"));
            }
            Err(e) => {
                let who = seat.map(|s| s.to_string()).unwrap_or_default();
                self.logger_ref()
                    .normal(&format!("Rejected {what} {who}: {e}"));
            }
        }
        result
    }

    fn submit_inner<F>(
        &mut self,
        seat: Option<Seat>,
        payload: Result<EventPayload>,
        act: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut GameState) -> Result<()>,
    {
        let game = self
            .game
            .as_mut()
            .ok_or_else(|| ClashError::InvalidAction("no match is running".into()))?;
        let Some(client) = self.client.as_mut() else {
            return act(game);
        };

        if let Some(seat) = seat {
            if !self.local[seat.index()] {
                return Err(ClashError::InvalidAction(format!(
                    "{seat} is not played from this peer"
                )));
            }
        }
        let payload = payload?;

        // Dry run on a copy: only rule-accepted actions reach the log
        let mut trial = game.clone();
        trial.logger = GameLogger::with_verbosity(VerbosityLevel::Silent);
        act(&mut trial)?;

        client.enqueue_event(self.replay_mode, payload)?;
        Ok(())
    }

    /// Bring deferred tasks in line with the current state
    fn after_change(&mut self) {
        let Some(game) = self.game.as_ref() else { return };
        if game.is_over() {
            self.pacer.clear();
            self.tracked_pending = None;
            return;
        }

        let pending = game.pending.as_ref().map(|p| (p.id, p.controller));
        let current = pending.map(|(id, _)| id);
        if self.tracked_pending != current {
            if let Some(old) = self.tracked_pending {
                self.pacer.cancel_owned(TaskOwner::Pending(old));
            }
            self.tracked_pending = current;
        }
        if !self.settled() {
            return;
        }

        let rules = &game.rules;
        let automation_delay = rules.automation_delay_ms;
        let block_skip_delay = rules.block_skip_delay_ms;
        let active = game.current_player;

        if let Some((id, controller)) = pending {
            if self.is_automated(controller) && !self.pacer.has_owned(TaskOwner::Pending(id)) {
                self.pacer.schedule(
                    automation_delay,
                    TaskOwner::Pending(id),
                    DeferredTask::AutoResolvePending(id),
                );
            }
            return;
        }

        if game.ready_for_blockers() {
            if self.is_local(active) {
                // A rejection is already logged by `submit` and changes nothing
                let _ = self.begin_blocking(active);
            }
            return;
        }

        let blocking = game
            .blocking
            .as_ref()
            .map(|b| (b.defending_seat, b.awaiting_defender));
        let actor = match blocking {
            Some((_, false)) => {
                if self.is_local(active)
                    && !self.pacer.is_scheduled(DeferredTask::ResolveUnblockedCombat)
                {
                    self.pacer.schedule(
                        block_skip_delay,
                        TaskOwner::Combat,
                        DeferredTask::ResolveUnblockedCombat,
                    );
                }
                return;
            }
            Some((defender, true)) => defender,
            None => active,
        };

        if self.is_automated(actor) && !self.pacer.is_scheduled(DeferredTask::AutomatedStep(actor))
        {
            self.pacer.schedule(
                automation_delay,
                TaskOwner::Automation,
                DeferredTask::AutomatedStep(actor),
            );
        }
    }

    /// Hand combat to the defender once attack triggers are done
    fn begin_blocking(&mut self, seat: Seat) -> Result<()> {
        let payload = Ok(EventPayload::BlockingStarted { seat });
        self.submit("start blocking", Some(seat), payload, |g| {
            g.begin_blocking(seat)
        })
    }

    /// The defender had nothing to block with; damage goes through
    fn resolve_unblocked_combat(&mut self) -> Result<()> {
        let payload = self.running().and_then(|g| {
            g.can_resolve_combat(None)?;
            if g.blocking.as_ref().is_some_and(|b| b.awaiting_defender) {
                return Err(ClashError::InvalidAction(
                    "the defender is still choosing blockers".into(),
                ));
            }
            Ok(EventPayload::CombatResolved {
                report: g.compute_combat_report()?,
            })
        });
        let seat = self.running()?.current_player;
        self.submit("resolve combat", Some(seat), payload, |g| {
            g.resolve_combat().map(drop)
        })
    }

    fn fire(&mut self, task: DeferredTask) {
        if !self.settled() || self.game.as_ref().map_or(true, GameState::is_over) {
            return;
        }
        match task {
            DeferredTask::ResolveUnblockedCombat => {
                // Logged by `submit` when rejected
                let _ = self.resolve_unblocked_combat();
            }
            DeferredTask::AutomatedStep(seat) => self.automated_step(seat),
            DeferredTask::AutoResolvePending(id) => {
                let owner = self
                    .game
                    .as_ref()
                    .and_then(|g| g.pending.as_ref())
                    .filter(|p| p.id == id)
                    .map(|p| p.controller);
                if let Some(seat) = owner {
                    self.automated_step(seat);
                }
            }
        }
        self.after_change();
    }

    /// Ask `seat`'s controller for one action and perform it
    fn automated_step(&mut self, seat: Seat) {
        if !self.is_local(seat) {
            return;
        }
        let Some(mut controller) = self.controllers[seat.index()].take() else {
            return;
        };
        let action = self
            .game
            .as_ref()
            .and_then(|game| controller.next_action(&GameStateView::new(game, seat)));
        let name = controller.name().to_string();
        self.controllers[seat.index()] = Some(controller);

        let Some(action) = action else {
            // Scheduled but idle: counts against the stall guard
            self.automation_failures += 1;
            return;
        };
        self.logger_ref()
            .category("automation", &format!("{name} ({seat}) chooses {action:?}"));
        match self.perform(seat, action) {
            Ok(()) => self.automation_failures = 0,
            Err(_) => self.automation_failures += 1,
        }
    }
}

/// Errors are not `Clone`; keep the message for a second use
fn clone_error(e: &ClashError) -> ClashError {
    match e {
        ClashError::InvalidAction(s) => ClashError::InvalidAction(s.clone()),
        ClashError::EntityNotFound(id) => ClashError::EntityNotFound(*id),
        ClashError::UnknownTemplate(s) => ClashError::UnknownTemplate(s.clone()),
        other => ClashError::InvalidAction(other.to_string()),
    }
}

impl AutomationHooks for MatchSession {
    fn advance_phase(&mut self, seat: Seat) -> Result<()> {
        MatchSession::advance_phase(self, seat)
    }

    fn play_creature(&mut self, seat: Seat, card: InstanceId) -> Result<()> {
        let payload = self.card_ref(card).map(|card| EventPayload::CardPlayed {
            seat,
            card,
            zone: Zone::Battlefield,
        });
        self.submit("play creature", Some(seat), payload, |g| {
            g.play_creature(seat, card).map(drop)
        })
    }

    fn prepare_spell(&mut self, seat: Seat, card: InstanceId) -> Result<()> {
        MatchSession::prepare_spell(self, seat, card)
    }

    fn compute_requirements(&self, effects: &[EffectDef]) -> Vec<Requirement> {
        build_requirements(effects)
    }

    fn remove_from_hand(&mut self, seat: Seat, card: InstanceId) -> Result<()> {
        let payload = self.card_ref(card).map(|card| EventPayload::CardPlayed {
            seat,
            card,
            zone: Zone::Graveyard,
        });
        self.submit("remove from hand", Some(seat), payload, |g| {
            g.discard(seat, card)
        })
    }

    fn spend_mana(&mut self, seat: Seat, amount: u32) -> Result<()> {
        let payload = Ok(EventPayload::ManaSpent { seat, amount });
        self.submit("spend mana", Some(seat), payload, |g| g.pay_mana(seat, amount))
    }

    fn resolve_effects(
        &mut self,
        seat: Seat,
        source: Option<InstanceId>,
        effects: Vec<EffectDef>,
        targets: BTreeMap<usize, Vec<Target>>,
    ) -> Result<()> {
        let payload = Ok(EventPayload::EffectsResolved {
            seat,
            source,
            effects: effects.clone(),
            targets: targets.clone(),
        });
        self.submit("resolve effects", Some(seat), payload, move |g| {
            g.resolve_effects(seat, source, &effects, &targets);
            Ok(())
        })
    }

    fn draw(&mut self, seat: Seat, count: u32) -> Result<()> {
        let payload = Ok(EventPayload::Draw { seat, count });
        self.submit("draw", Some(seat), payload, |g| {
            g.draw_cards(seat, count);
            Ok(())
        })
    }

    fn log(&mut self, message: &str) {
        let text = message.to_string();
        let payload = Ok(EventPayload::LogLine { text: text.clone() });
        // Logged by `submit` when rejected; the hook has no error channel
        let _ = self.submit("log", None, payload, move |g| {
            g.record(text);
            Ok(())
        });
    }

    fn can_play(&self, seat: Seat, card: InstanceId) -> bool {
        self.game
            .as_ref()
            .is_some_and(|g| g.can_play(seat, card))
    }
}
