//! The buzz-in game show: the reference implementation of the per-game
//! protocol contract. Demonstrates the phase/lock/timeout discipline every
//! game on this platform follows.

use std::{
    sync::{Arc, OnceLock},
    time::SystemTime,
};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tokio::task::AbortHandle;
use tracing::warn;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::ws::{GameNotice, ServerMessage},
    events::EventRouter,
    games::{Game, GameContext, GameEvent, GameTimer, catalog, catalog::Question},
    state::{connections::ConnectionId, rooms::Room},
};

/// Points awarded for a correct answer.
pub const CORRECT_POINTS: i64 = 100;
/// Points deducted for a wrong answer.
pub const WRONG_PENALTY: i64 = 50;
/// Points deducted when the answer window times out.
pub const TIMEOUT_PENALTY: i64 = 25;

/// Internal phase of one buzz-in session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuzzPhase {
    /// Waiting for the host to start the game.
    Lobby,
    /// A question is queued but not yet revealed, so the host can read it
    /// aloud first.
    Waiting,
    /// The question is visible and the buzzer is open.
    Question,
    /// A player holds the buzzer; the answer timer is running.
    Buzzed,
    /// The buzzing player submitted; the host should judge now.
    Answering,
    /// Judgment is in; waiting for the host to advance.
    Result,
    /// The question sequence is exhausted.
    End,
}

/// Single-writer lock recording who holds the buzzer right now.
#[derive(Debug, Default)]
struct BuzzState {
    locked: bool,
    buzzed_player: Option<ConnectionId>,
    timestamp: Option<SystemTime>,
}

/// One live buzz-in session, bound to a room. All state is owned here and
/// mutated only through the handler entry points.
pub struct BuzzinGame {
    room_code: String,
    config: Arc<AppConfig>,
    phase: BuzzPhase,
    questions: Vec<Question>,
    /// Absent before the first question (-1 in views).
    current_question_index: Option<usize>,
    /// Monotonically updated by scoring events, never removed once created.
    scores: IndexMap<ConnectionId, i64>,
    buzz: BuzzState,
    /// Cancelable handle for the per-buzz answer timer.
    answer_timer: Option<AbortHandle>,
}

static ROUTER: OnceLock<EventRouter<BuzzinGame>> = OnceLock::new();

fn router() -> &'static EventRouter<BuzzinGame> {
    ROUTER.get_or_init(|| {
        let mut router = EventRouter::new();
        router.register("host:startGame", BuzzinGame::on_start_game);
        router.register("host:showQuestion", BuzzinGame::on_show_question);
        router.register("player:buzz", BuzzinGame::on_buzz);
        router.register("player:submitAnswer", BuzzinGame::on_submit_answer);
        router.register("host:judgeAnswer", BuzzinGame::on_judge_answer);
        router.register("host:nextQuestion", BuzzinGame::on_next_question);
        router.register("host:overrideScore", BuzzinGame::on_override_score);
        router
    })
}

impl BuzzinGame {
    /// Create a session for a room, scoring everyone already seated from zero.
    pub fn new(room: &Room, config: Arc<AppConfig>) -> Self {
        let scores = room.players.keys().map(|id| (*id, 0)).collect();
        Self {
            room_code: room.code.clone(),
            config,
            phase: BuzzPhase::Lobby,
            questions: Vec::new(),
            current_question_index: None,
            scores,
            buzz: BuzzState::default(),
            answer_timer: None,
        }
    }

    fn on_start_game(&mut self, ctx: &GameContext<'_>, event: &GameEvent<'_>) {
        if !self.require_host(ctx, event) {
            return;
        }
        if self.phase != BuzzPhase::Lobby {
            return;
        }
        let Some(room) = ctx.rooms.get_room(&self.room_code) else {
            return;
        };
        if room.players.len() < 2 {
            self.error_to(ctx, event.connection_id, "Need at least two players to start.");
            return;
        }

        let categories: Vec<String> = event
            .payload
            .get("categories")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if categories.is_empty() {
            self.error_to(ctx, event.connection_id, "Select at least one category.");
            return;
        }

        let count = catalog::clamp_question_count(
            event.payload.get("questionCount").and_then(Value::as_u64),
        );
        self.questions = catalog::select_questions(&self.config.questions, &categories, count);
        self.current_question_index = None;
        self.advance_question(ctx);
    }

    fn on_show_question(&mut self, ctx: &GameContext<'_>, event: &GameEvent<'_>) {
        if !self.require_host(ctx, event) {
            return;
        }
        if self.phase != BuzzPhase::Waiting {
            return;
        }
        self.phase = BuzzPhase::Question;
        self.buzz.locked = false;
        self.notice_all(ctx, GameNotice::QuestionShown);
        self.broadcast_state(ctx);
    }

    fn on_buzz(&mut self, ctx: &GameContext<'_>, event: &GameEvent<'_>) {
        // First valid buzz wins; everything else here is a raced duplicate.
        if self.phase != BuzzPhase::Question || self.buzz.locked {
            return;
        }
        let seated = ctx
            .rooms
            .get_room(&self.room_code)
            .is_some_and(|room| room.players.contains_key(&event.connection_id));
        if !seated {
            return;
        }

        self.phase = BuzzPhase::Buzzed;
        self.buzz = BuzzState {
            locked: true,
            buzzed_player: Some(event.connection_id),
            timestamp: Some(SystemTime::now()),
        };

        self.broadcast_state(ctx);
        self.notice_all(
            ctx,
            GameNotice::Buzz {
                player_id: event.connection_id,
            },
        );

        self.cancel_answer_timer();
        self.answer_timer = Some(ctx.timers.schedule(
            &self.room_code,
            GameTimer::AnswerTimeout {
                connection_id: event.connection_id,
            },
            self.config.answer_timeout,
        ));
    }

    fn on_submit_answer(&mut self, ctx: &GameContext<'_>, event: &GameEvent<'_>) {
        if self.phase != BuzzPhase::Buzzed
            || self.buzz.buzzed_player != Some(event.connection_id)
        {
            return;
        }
        self.cancel_answer_timer();
        self.phase = BuzzPhase::Answering;
        self.broadcast_state(ctx);
    }

    fn on_judge_answer(&mut self, ctx: &GameContext<'_>, event: &GameEvent<'_>) {
        if !self.require_host(ctx, event) {
            return;
        }
        if !matches!(self.phase, BuzzPhase::Buzzed | BuzzPhase::Answering) {
            return;
        }
        let Some(buzzer) = self.buzz.buzzed_player else {
            return;
        };
        // Judgment must be an explicit boolean; anything else is a full no-op.
        let Some(correct) = event.payload.get("correct").and_then(Value::as_bool) else {
            return;
        };

        self.cancel_answer_timer();
        if correct {
            *self.scores.entry(buzzer).or_insert(0) += CORRECT_POINTS;
            self.notice_all(
                ctx,
                GameNotice::Correct {
                    player_id: buzzer,
                    points: CORRECT_POINTS,
                },
            );
        } else {
            *self.scores.entry(buzzer).or_insert(0) -= WRONG_PENALTY;
            self.notice_all(
                ctx,
                GameNotice::Wrong {
                    player_id: buzzer,
                    points: -WRONG_PENALTY,
                },
            );
        }
        self.phase = BuzzPhase::Result;
        self.broadcast_state(ctx);
    }

    fn on_next_question(&mut self, ctx: &GameContext<'_>, event: &GameEvent<'_>) {
        if !self.require_host(ctx, event) {
            return;
        }
        // Buzzed is allowed so the host can skip a stuck question.
        if !matches!(self.phase, BuzzPhase::Result | BuzzPhase::Buzzed) {
            return;
        }
        self.advance_question(ctx);
    }

    fn on_override_score(&mut self, ctx: &GameContext<'_>, event: &GameEvent<'_>) {
        if !self.require_host(ctx, event) {
            return;
        }
        let Some(player) = event
            .payload
            .get("playerId")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
        else {
            return;
        };
        let Some(delta) = event.payload.get("delta").and_then(Value::as_i64) else {
            return;
        };
        *self.scores.entry(player).or_insert(0) += delta;
        self.broadcast_state(ctx);
    }

    /// Advance to the next question, or end the game when the sequence is
    /// exhausted. Entering `waiting` is deliberate: the host reveals the
    /// question explicitly with `host:showQuestion`.
    fn advance_question(&mut self, ctx: &GameContext<'_>) {
        self.cancel_answer_timer();

        let next = self.current_question_index.map_or(0, |index| index + 1);
        self.current_question_index = Some(next);

        if next >= self.questions.len() {
            self.phase = BuzzPhase::End;
            self.broadcast_state(ctx);
            return;
        }

        self.phase = BuzzPhase::Waiting;
        self.buzz = BuzzState {
            locked: true,
            buzzed_player: None,
            timestamp: None,
        };
        self.notice_all(ctx, GameNotice::NewQuestion);
        self.broadcast_state(ctx);
    }

    fn require_host(&self, ctx: &GameContext<'_>, event: &GameEvent<'_>) -> bool {
        let is_host = ctx
            .rooms
            .get_room(&self.room_code)
            .is_some_and(|room| room.host_connection_id == event.connection_id);
        if !is_host {
            self.error_to(ctx, event.connection_id, "Only the host can do that.");
        }
        is_host
    }

    fn error_to(&self, ctx: &GameContext<'_>, id: ConnectionId, message: &str) {
        ctx.connections.send(
            id,
            &ServerMessage::GameEvent(GameNotice::Error {
                message: message.to_string(),
            }),
        );
    }

    fn notice_all(&self, ctx: &GameContext<'_>, notice: GameNotice) {
        ctx.connections
            .broadcast(&self.room_code, &ServerMessage::GameEvent(notice));
    }

    fn broadcast_state(&self, ctx: &GameContext<'_>) {
        ctx.connections
            .broadcast(&self.room_code, &ServerMessage::GameState(self.state(ctx)));
    }

    fn cancel_answer_timer(&mut self) {
        if let Some(handle) = self.answer_timer.take() {
            handle.abort();
        }
    }

    fn view(&self, ctx: &GameContext<'_>) -> StateView {
        let current_question = self
            .current_question_index
            .and_then(|index| self.questions.get(index))
            .cloned();

        StateView {
            phase: self.phase,
            current_question,
            current_question_index: self
                .current_question_index
                .map_or(-1, |index| index as i64),
            total_questions: self.questions.len(),
            scores: self
                .scores
                .iter()
                .map(|(id, score)| ScoreEntry {
                    connection_id: *id,
                    name: ctx.rooms.player_name(*id).map(str::to_string),
                    score: *score,
                })
                .collect(),
            buzz_state: BuzzStateView {
                locked: self.buzz.locked,
                buzzed_player_id: self.buzz.buzzed_player,
                buzzed_player_name: self
                    .buzz
                    .buzzed_player
                    .and_then(|id| ctx.rooms.player_name(id))
                    .map(str::to_string),
                buzzed_at: self.buzz.timestamp.map(crate::dto::format_system_time),
            },
        }
    }
}

impl Game for BuzzinGame {
    fn handle_event(&mut self, ctx: &GameContext<'_>, event: &GameEvent<'_>) {
        // Late joiners are scored from zero on their first event.
        self.scores.entry(event.connection_id).or_insert(0);

        if !router().dispatch(self, ctx, event) {
            warn!(room = %self.room_code, event = event.name, "unhandled buzz-in event dropped");
        }
    }

    fn handle_timer(&mut self, ctx: &GameContext<'_>, timer: &GameTimer) {
        let GameTimer::AnswerTimeout { connection_id } = timer;
        // A stale timer from an earlier buzz cycle must not act: re-validate
        // phase and buzzer identity at fire time.
        if self.phase != BuzzPhase::Buzzed || self.buzz.buzzed_player != Some(*connection_id) {
            return;
        }

        self.answer_timer = None;
        *self.scores.entry(*connection_id).or_insert(0) -= TIMEOUT_PENALTY;
        self.phase = BuzzPhase::Result;
        self.notice_all(
            ctx,
            GameNotice::Timeout {
                player_id: *connection_id,
                points: -TIMEOUT_PENALTY,
            },
        );
        self.broadcast_state(ctx);
    }

    fn state(&self, ctx: &GameContext<'_>) -> Value {
        serde_json::to_value(self.view(ctx)).unwrap_or(Value::Null)
    }

    fn finished(&self) -> bool {
        self.phase == BuzzPhase::End
    }

    fn teardown(&mut self) {
        self.cancel_answer_timer();
        self.questions.clear();
        self.scores.clear();
    }
}

/// Full state snapshot broadcast after every mutation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateView {
    phase: BuzzPhase,
    current_question: Option<Question>,
    current_question_index: i64,
    total_questions: usize,
    scores: Vec<ScoreEntry>,
    buzz_state: BuzzStateView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreEntry {
    connection_id: Uuid,
    name: Option<String>,
    score: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BuzzStateView {
    locked: bool,
    buzzed_player_id: Option<Uuid>,
    buzzed_player_name: Option<String>,
    buzzed_at: Option<String>,
}
