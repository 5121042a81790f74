//! TurnOrchestrator - drives one play session turn by turn
//!
//! PERCEIVE -> MAYBE_COMPACT -> MAYBE_REFLECT -> DECIDE -> SANITIZE -> ACT -> RECORD,
//! repeated until a quit command, the turn limit, an interrupt or a fatal
//! surface error. RECORD is followed by the optional world-state and plan
//! updates. Whatever ends the loop, even a panic inside it, `run` closes the
//! surface and writes the report exactly once.

use std::any::Any;
use std::future::Future;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use eyre::{Context, Result};
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::command::{is_quit_command, sanitize_command};
use super::state::{SessionOutcome, StopReason, TurnState};
use crate::config::{AgentConfig, Config};
use crate::domain::{StateSnapshot, TurnRecord};
use crate::llm::ReasoningClient;
use crate::memory::SessionMemory;
use crate::perception::{IncrementalExtractor, PERCEPTION_FAILED, StatusParser, StatusView};
use crate::progress::{Journal, ProgressTracker, TurnUpdate};
use crate::prompts::PromptSet;
use crate::transcript::{TranscriptError, TranscriptSource};

/// Characters of the observation shown in the per-turn log line
const OBSERVATION_PREVIEW: usize = 150;

/// Owns every per-session component; consumed by [`run`](Self::run)
pub struct TurnOrchestrator {
    source: Box<dyn TranscriptSource>,
    reasoner: ReasoningClient,
    prompts: PromptSet,
    extractor: IncrementalExtractor,
    parser: StatusParser,
    memory: SessionMemory,
    tracker: ProgressTracker,
    settings: AgentConfig,
    report_path: PathBuf,
    shutdown: watch::Receiver<bool>,
    state: TurnState,
    turns_played: u32,
    last_score: Option<i64>,
}

impl TurnOrchestrator {
    pub fn new(
        config: &Config,
        source: Box<dyn TranscriptSource>,
        reasoner: ReasoningClient,
        prompts: PromptSet,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        debug!(
            memory_limit = config.agent.memory_limit,
            use_reflection = config.agent.use_reflection,
            "TurnOrchestrator::new: called"
        );
        let extractor = IncrementalExtractor::new(&config.game.marker_class)?;
        let parser = StatusParser::with_pattern(&config.game.status_pattern)?;

        let mut tracker = ProgressTracker::new(&config.agent.entity_keyword)?;
        if let Some(path) = &config.report.journal_path {
            let journal = Journal::open(path).context(format!("Failed to open journal {}", path.display()))?;
            tracker = tracker.with_journal(journal);
        }

        Ok(Self {
            source,
            reasoner,
            prompts,
            extractor,
            parser,
            memory: SessionMemory::new(config.agent.memory_limit),
            tracker,
            settings: config.agent.clone(),
            report_path: config.report.path.clone(),
            shutdown,
            state: TurnState::Init,
            turns_played: 0,
            last_score: None,
        })
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    /// Play until something stops the loop, then finalize
    pub async fn run(mut self) -> Result<SessionOutcome> {
        info!("Starting session");
        let stop = match AssertUnwindSafe(self.play()).catch_unwind().await {
            Ok(stop) => stop,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%message, "Turn loop panicked");
                StopReason::Fatal(format!("turn loop panicked: {}", message))
            }
        };
        self.finish(stop).await
    }

    async fn play(&mut self) -> StopReason {
        match until_interrupted(&mut self.shutdown, self.source.start()).await {
            None => return StopReason::Interrupted,
            Some(Err(e)) => {
                error!(error = %e, "Could not start the game surface");
                return StopReason::Fatal(e.to_string());
            }
            Some(Ok(())) => {}
        }

        loop {
            if let Some(max) = self.settings.max_turns
                && self.turns_played >= max
            {
                info!(max, "Turn limit reached");
                return StopReason::MaxTurns;
            }
            if let ControlFlow::Break(stop) = self.play_turn().await {
                return stop;
            }
            self.turns_played += 1;
        }
    }

    fn enter(&mut self, state: TurnState) {
        debug!(from = %self.state, to = %state, "enter: transition");
        self.state = state;
    }

    /// One full traversal of the turn states
    async fn play_turn(&mut self) -> ControlFlow<StopReason> {
        let turn = self.memory.next_index();

        self.enter(TurnState::Perceive);
        let (observation, snapshot) = self.perceive().await?;
        let preview: String = observation.chars().take(OBSERVATION_PREVIEW).collect();
        info!("--- Turn {} --- [{} | {}] Observation: {}...", turn, snapshot.location, snapshot.score, preview);

        self.enter(TurnState::MaybeCompact);
        if self.memory.needs_compaction() {
            let compaction = self.memory.maybe_compact(&self.reasoner, &self.prompts.summary);
            let outcome = until_interrupted(&mut self.shutdown, compaction).await;
            let outcome = interrupted_if_none(outcome)?;
            debug!(?outcome, "play_turn: compaction attempted");
        }

        let context = format!("{}\n\nCurrent Observation: {}", self.memory.context_view(), observation);

        self.enter(TurnState::MaybeReflect);
        let mut reflection = None;
        let mut command_context = context.clone();
        if self.settings.use_reflection {
            let answer = self.ask(&self.prompts.reflection.clone(), &context).await?;
            if answer.is_empty() {
                warn!("No reflection this turn; continuing without one");
            } else {
                info!("Reflection: {}", answer);
                command_context.push_str(&format!("\nReflection: {}", answer));
                reflection = Some(answer);
            }
        }

        self.enter(TurnState::Decide);
        let raw = self.ask(&self.prompts.command.clone(), &command_context).await?;

        self.enter(TurnState::Sanitize);
        if raw.trim().is_empty() {
            warn!(idle = %self.settings.idle_command, "No command decided; using idle command");
        }
        let command = sanitize_command(&raw, &self.settings.idle_command);
        info!("Command: {}", command);

        self.enter(TurnState::Act);
        if is_quit_command(&command, &self.settings.quit_keywords) {
            info!(%command, "Termination keyword received");
            return ControlFlow::Break(StopReason::QuitCommand);
        }
        let sent = until_interrupted(&mut self.shutdown, self.source.send_command(&command)).await;
        match interrupted_if_none(sent)? {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return ControlFlow::Break(fatal(e)),
            Err(e) => warn!(error = %e, %command, "Command submission failed; continuing"),
        }

        self.enter(TurnState::Record);
        let index = self.memory.next_index();
        self.memory.append_turn(TurnRecord::new(
            index,
            observation.clone(),
            reflection.clone(),
            command.clone(),
        ));
        self.tracker.update(TurnUpdate {
            snapshot,
            observation,
            reflection: reflection.unwrap_or_default(),
            command,
        });

        if self.settings.use_world_state {
            self.update_world_state().await?;
        }
        if self.settings.use_planning {
            self.update_plan().await?;
        }
        ControlFlow::Continue(())
    }

    /// Observation and snapshot for this turn; only a lost session stops the loop
    async fn perceive(&mut self) -> ControlFlow<StopReason, (String, StateSnapshot)> {
        let markup = until_interrupted(&mut self.shutdown, self.source.transcript_markup()).await;
        let markup = match interrupted_if_none(markup)? {
            Ok(markup) => Some(markup),
            Err(e) if e.is_fatal() => return ControlFlow::Break(fatal(e)),
            Err(e) => {
                warn!(error = %e, "Transcript unavailable; using sentinel observation");
                None
            }
        };
        let observation = match &markup {
            Some(markup) => self.extractor.extract(markup),
            None => PERCEPTION_FAILED.to_string(),
        };

        let status = until_interrupted(&mut self.shutdown, self.source.status_line()).await;
        let status_line = match interrupted_if_none(status)? {
            Ok(line) => line,
            Err(e) if e.is_fatal() => return ControlFlow::Break(fatal(e)),
            Err(e) => {
                debug!(error = %e, "perceive: status line unavailable");
                None
            }
        };
        let view = StatusView {
            status_line,
            emphasis: markup.as_deref().and_then(|m| self.extractor.last_emphasis(m)),
        };

        let parsed = self.parser.parse_status(&view);
        let mut snapshot = parsed.snapshot;
        if !parsed.score_found
            && self.settings.carry_score_on_parse_failure
            && let Some(last) = self.last_score
        {
            debug!(last, "perceive: carrying previous score forward");
            snapshot.score = last;
        }
        self.last_score = Some(snapshot.score);

        ControlFlow::Continue((observation, snapshot))
    }

    /// Ask for a world-state patch and merge it if it validates
    async fn update_world_state(&mut self) -> ControlFlow<StopReason> {
        let instruction = self.prompts.world_state.clone();
        let context = self.memory.context_view();
        let answer = self.ask(&instruction, &context).await?;
        if answer.is_empty() {
            debug!("update_world_state: no answer");
            return ControlFlow::Continue(());
        }
        match self.memory.world_mut().apply_answer(&answer) {
            Ok(()) => debug!("update_world_state: patch merged"),
            Err(e) => warn!(error = %e, "Rejected world-state update"),
        }
        ControlFlow::Continue(())
    }

    /// Ask for a revised goal list; an empty or unusable answer keeps the old plan
    async fn update_plan(&mut self) -> ControlFlow<StopReason> {
        let instruction = self.prompts.planning.clone();
        let context = self.memory.context_view();
        let answer = self.ask(&instruction, &context).await?;
        if self.memory.plan_mut().revise(&answer) {
            info!("Plan: {:?}", self.memory.plan().goals());
        } else {
            warn!("No usable plan this turn; keeping the previous one");
        }
        ControlFlow::Continue(())
    }

    /// Reasoning call raced against the interrupt
    async fn ask(&mut self, instruction: &str, context: &str) -> ControlFlow<StopReason, String> {
        let answer = until_interrupted(&mut self.shutdown, self.reasoner.call(instruction, context)).await;
        interrupted_if_none(answer)
    }

    /// Close the surface and persist the report
    async fn finish(mut self, stop: StopReason) -> Result<SessionOutcome> {
        self.enter(TurnState::Terminated);
        info!(turns = self.turns_played, "Session ended: {}", stop);

        if let Err(e) = self.source.close().await {
            warn!(error = %e, "Failed to close the game surface");
        }

        let report = self.tracker.finalize(&self.report_path)?;
        Ok(SessionOutcome { stop, report })
    }
}

fn fatal(e: TranscriptError) -> StopReason {
    error!(error = %e, "Game surface lost");
    StopReason::Fatal(e.to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn interrupted_if_none<T>(value: Option<T>) -> ControlFlow<StopReason, T> {
    match value {
        Some(v) => ControlFlow::Continue(v),
        None => {
            info!("Interrupt received");
            ControlFlow::Break(StopReason::Interrupted)
        }
    }
}

/// Run `fut` unless the shutdown flag is (or becomes) set; `None` means interrupted
async fn until_interrupted<F: Future>(shutdown: &mut watch::Receiver<bool>, fut: F) -> Option<F::Output> {
    if *shutdown.borrow() {
        return None;
    }
    tokio::select! {
        out = fut => Some(out),
        _ = wait_for_shutdown(shutdown) => None,
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        // Sender gone: nobody can interrupt any more
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::llm::client::mock::MockLlmClient;

    /// Scripted surface: each read pops the next render; records submitted commands
    #[derive(Clone, Default)]
    struct FakeTranscript {
        renders: Arc<Mutex<VecDeque<Result<String, TranscriptError>>>>,
        status: Arc<Mutex<Option<String>>>,
        sent: Arc<Mutex<Vec<String>>>,
        closes: Arc<Mutex<u32>>,
        panic_on_send: bool,
    }

    impl FakeTranscript {
        fn with_renders(renders: Vec<Result<String, TranscriptError>>) -> Self {
            let fake = Self::default();
            *fake.renders.lock().unwrap() = renders.into();
            fake
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        fn closes(&self) -> u32 {
            *self.closes.lock().unwrap()
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeTranscript {
        async fn start(&mut self) -> Result<(), TranscriptError> {
            Ok(())
        }

        async fn transcript_markup(&mut self) -> Result<String, TranscriptError> {
            self.renders
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("<div><p>Nothing happens.</p></div>".to_string()))
        }

        async fn status_line(&mut self) -> Result<Option<String>, TranscriptError> {
            Ok(self.status.lock().unwrap().clone())
        }

        async fn send_command(&mut self, command: &str) -> Result<(), TranscriptError> {
            if self.panic_on_send {
                panic!("driver bug while typing '{}'", command);
            }
            self.sent.lock().unwrap().push(command.to_string());
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TranscriptError> {
            *self.closes.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.report.path = dir.path().join("report.json");
        config
    }

    fn orchestrator(
        config: &Config,
        fake: &FakeTranscript,
        mock: Arc<MockLlmClient>,
    ) -> (TurnOrchestrator, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let reasoner = ReasoningClient::new(mock, 1, Duration::ZERO, Duration::from_secs(5));
        let orch = TurnOrchestrator::new(config, Box::new(fake.clone()), reasoner, PromptSet::embedded(), rx).unwrap();
        (orch, tx)
    }

    #[tokio::test]
    async fn test_quit_command_ends_session_without_submitting() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let fake = FakeTranscript::default();
        let mock = Arc::new(MockLlmClient::with_answers(&["\"north\"", "  QUIT "]));
        let (orch, _tx) = orchestrator(&config, &fake, mock);

        let outcome = orch.run().await.unwrap();
        assert_eq!(outcome.stop, StopReason::QuitCommand);
        assert_eq!(fake.sent(), vec!["north"]);
        assert_eq!(outcome.report.meta.total_steps, 1);
        assert_eq!(fake.closes(), 1);
        assert!(config.report.path.exists());
    }

    #[tokio::test]
    async fn test_empty_decision_submits_idle_command() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.agent.max_turns = Some(1);
        let fake = FakeTranscript::default();
        let (orch, _tx) = orchestrator(&config, &fake, Arc::new(MockLlmClient::failing()));

        let outcome = orch.run().await.unwrap();
        assert_eq!(outcome.stop, StopReason::MaxTurns);
        assert_eq!(fake.sent(), vec!["look"]);
    }

    #[tokio::test]
    async fn test_perception_failure_uses_sentinel() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.agent.max_turns = Some(1);
        let fake = FakeTranscript::with_renders(vec![Err(TranscriptError::NotReady {
            selector: "#content".to_string(),
            waited_ms: 10,
        })]);
        let (orch, _tx) = orchestrator(&config, &fake, Arc::new(MockLlmClient::with_answers(&["look"])));

        let outcome = orch.run().await.unwrap();
        assert_eq!(outcome.report.timeline[0].observation, PERCEPTION_FAILED);
    }

    #[tokio::test]
    async fn test_session_loss_is_fatal_and_still_finalizes() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let fake = FakeTranscript::with_renders(vec![
            Ok("<div><p>A cell.</p></div>".to_string()),
            Err(TranscriptError::SessionLost("browser closed".to_string())),
        ]);
        let (orch, _tx) = orchestrator(&config, &fake, Arc::new(MockLlmClient::with_answers(&["wait"])));

        let outcome = orch.run().await.unwrap();
        assert!(outcome.stop.is_fatal());
        assert_eq!(outcome.report.meta.total_steps, 1);
        assert_eq!(fake.closes(), 1);
        assert!(config.report.path.exists());
    }

    #[tokio::test]
    async fn test_interrupt_before_start_finalizes() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let fake = FakeTranscript::default();
        let (orch, tx) = orchestrator(&config, &fake, Arc::new(MockLlmClient::with_answers(&["north"])));
        tx.send(true).unwrap();

        let outcome = orch.run().await.unwrap();
        assert_eq!(outcome.stop, StopReason::Interrupted);
        assert!(fake.sent().is_empty());
        assert_eq!(fake.closes(), 1);
        assert_eq!(outcome.report.meta.total_steps, 0);
    }

    #[tokio::test]
    async fn test_reflection_is_recorded_and_forwarded() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.agent.use_reflection = true;
        config.agent.max_turns = Some(1);
        let fake = FakeTranscript::default();
        let mock = Arc::new(MockLlmClient::with_answers(&["We are stuck.", "wait"]));
        let (orch, _tx) = orchestrator(&config, &fake, mock.clone());

        let outcome = orch.run().await.unwrap();
        assert_eq!(outcome.report.timeline[0].reflection, "We are stuck.");

        let reqs = mock.requests();
        assert!(reqs[0].input.contains("Current Observation: Nothing happens."));
        assert!(reqs[1].input.ends_with("\nReflection: We are stuck."));
    }

    #[tokio::test]
    async fn test_score_carry_forward_is_configurable() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.agent.max_turns = Some(2);
        config.agent.carry_score_on_parse_failure = true;
        let fake = FakeTranscript::default();
        *fake.status.lock().unwrap() = Some("Cell 3 of 7".to_string());
        let mock = Arc::new(MockLlmClient::with_answers(&["wait", "wait"]));
        let (mut orch, _tx) = orchestrator(&config, &fake, mock);

        orch.source.start().await.unwrap();
        let ControlFlow::Continue((_, first)) = orch.perceive().await else {
            panic!("perceive stopped");
        };
        assert_eq!(first.score, 3);

        *fake.status.lock().unwrap() = Some("garbled".to_string());
        let ControlFlow::Continue((_, second)) = orch.perceive().await else {
            panic!("perceive stopped");
        };
        assert_eq!(second, StateSnapshot::new("garbled", 3));
    }

    #[tokio::test]
    async fn test_world_state_patch_merged_into_context() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.agent.use_world_state = true;
        config.agent.max_turns = Some(1);
        let fake = FakeTranscript::default();
        let mock = Arc::new(MockLlmClient::with_answers(&[
            "take lamp",
            r#"{"inventory": ["lamp"], "current_location": "Cell"}"#,
        ]));
        let (mut orch, _tx) = orchestrator(&config, &fake, mock);

        orch.source.start().await.unwrap();
        assert!(orch.play_turn().await.is_continue());
        assert_eq!(orch.memory().world().inventory, vec!["lamp"]);
        assert!(orch.memory().context_view().contains("KNOWN WORLD STATE"));
    }

    #[tokio::test]
    async fn test_plan_revised_after_record_and_shown_to_next_decision() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.agent.use_planning = true;
        config.agent.max_turns = Some(2);
        let fake = FakeTranscript::default();
        let mock = Arc::new(MockLlmClient::with_answers(&[
            "look",
            "1. Examine the pool\n2. Go north",
            "examine pool",
        ]));
        let (mut orch, _tx) = orchestrator(&config, &fake, mock.clone());

        orch.source.start().await.unwrap();
        assert!(orch.play_turn().await.is_continue());
        assert_eq!(orch.memory().plan().next_goal(), Some("Examine the pool"));

        // Planner saw the just-recorded turn
        let reqs = mock.requests();
        assert_eq!(reqs[1].instructions, orch.prompts.planning);
        assert!(reqs[1].input.contains("Turn 1:\nObs: Nothing happens.\nCmd: look"));

        // Next decision sees the plan; a failed revision keeps it
        assert!(orch.play_turn().await.is_continue());
        let reqs = mock.requests();
        assert!(reqs[2].input.contains("CURRENT PLAN:\n1. Examine the pool\n2. Go north"));
        assert_eq!(orch.memory().plan().goals().len(), 2);
    }

    #[tokio::test]
    async fn test_world_state_request_holds_latest_observation() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.agent.use_world_state = true;
        let fake = FakeTranscript::with_renders(vec![Ok("<div><p>A silver lamp lies here.</p></div>".to_string())]);
        let mock = Arc::new(MockLlmClient::with_answers(&["take lamp", "{}"]));
        let (mut orch, _tx) = orchestrator(&config, &fake, mock.clone());

        orch.source.start().await.unwrap();
        assert!(orch.play_turn().await.is_continue());

        let reqs = mock.requests();
        assert_eq!(reqs[1].instructions, orch.prompts.world_state);
        assert!(reqs[1].input.ends_with("Obs: A silver lamp lies here.\nCmd: take lamp\n"));
    }

    #[tokio::test]
    async fn test_panic_in_turn_loop_still_finalizes() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let fake = FakeTranscript {
            panic_on_send: true,
            ..FakeTranscript::default()
        };
        let (orch, _tx) = orchestrator(&config, &fake, Arc::new(MockLlmClient::with_answers(&["north"])));

        let outcome = orch.run().await.unwrap();
        assert!(matches!(&outcome.stop, StopReason::Fatal(m) if m.contains("driver bug")));
        assert_eq!(fake.closes(), 1);
        assert_eq!(outcome.report.meta.total_steps, 0);
        assert!(config.report.path.exists());
    }
}
