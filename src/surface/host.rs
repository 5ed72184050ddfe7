//! Host Driver
//!
//! Glue between a [`Race`] and the collaborators a real front end supplies:
//! a quiz provider for checkpoint questions and a sink for sound cues. The
//! race itself never knows about either.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::game::checkpoint::AnswerOutcome;
use crate::game::events::{HostInput, RaceEvent};
use crate::game::race::{Race, StepResult};
use crate::game::state::RacePhase;

// =============================================================================
// COLLABORATORS
// =============================================================================

/// A multiple-choice arithmetic question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathProblem {
    /// Text shown to the player, e.g. "7 + 5".
    pub prompt: String,
    /// Candidate answers in display order.
    pub choices: Vec<i64>,
    /// The right answer.
    pub answer: i64,
}

impl MathProblem {
    /// Whether `choice` is the right answer.
    #[inline]
    pub fn is_correct(&self, choice: i64) -> bool {
        choice == self.answer
    }
}

/// Source of checkpoint questions.
pub trait QuizProvider {
    /// Produce the question for the given checkpoint.
    fn next_problem(&mut self, checkpoint_index: usize) -> MathProblem;
}

/// Sound cues a front end may play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cue {
    /// Countdown number announced.
    CountdownTick,
    /// Countdown reached zero.
    Go,
    /// Controlled racer stopped at a checkpoint.
    Checkpoint,
    /// Quiz answered correctly.
    CorrectAnswer,
    /// Quiz answered wrongly.
    WrongAnswer,
    /// Controlled racer crossed the line.
    Finish,
}

/// Receiver for sound cues.
pub trait CueSink {
    /// Play a cue.
    fn play(&mut self, cue: Cue);
}

/// Sink that plays nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentCues;

impl CueSink for SilentCues {
    fn play(&mut self, _cue: Cue) {}
}

/// Question the race is currently waiting on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingQuiz {
    /// Checkpoint being answered.
    pub checkpoint_index: usize,
    /// The question itself.
    pub problem: MathProblem,
}

// =============================================================================
// HOST
// =============================================================================

/// Drives a race on behalf of a front end.
pub struct RaceHost<Q: QuizProvider, C: CueSink = SilentCues> {
    race: Race,
    quiz: Q,
    cues: C,
    pending: Option<PendingQuiz>,
}

impl<Q: QuizProvider> RaceHost<Q, SilentCues> {
    /// Host with no sound.
    pub fn silent(race: Race, quiz: Q) -> Self {
        Self::new(race, quiz, SilentCues)
    }
}

impl<Q: QuizProvider, C: CueSink> RaceHost<Q, C> {
    /// Wrap a race with its collaborators.
    pub fn new(race: Race, quiz: Q, cues: C) -> Self {
        Self {
            race,
            quiz,
            cues,
            pending: None,
        }
    }

    /// Forward a tap.
    pub fn tap(&mut self) -> Vec<RaceEvent> {
        let events = self.race.tap();
        self.observe(&events);
        events
    }

    /// Forward a restart, dropping any open question.
    pub fn restart(&mut self) -> Vec<RaceEvent> {
        let events = self.race.restart();
        self.observe(&events);
        events
    }

    /// Advance the race one frame.
    pub fn step(&mut self, delta_seconds: f64) -> StepResult {
        let result = self.race.step(delta_seconds);
        self.observe(&result.events);
        result
    }

    /// Answer the open question with `choice`.
    ///
    /// Returns whether the choice was correct, or `None` if no question is
    /// open.
    pub fn answer(&mut self, choice: i64, time_taken_ms: u64) -> Option<bool> {
        let Some(quiz) = self.pending.take() else {
            debug!(choice, "answer with no open question ignored");
            return None;
        };

        let correct = quiz.problem.is_correct(choice);
        self.cues.play(if correct { Cue::CorrectAnswer } else { Cue::WrongAnswer });
        info!(
            checkpoint = quiz.checkpoint_index,
            prompt = %quiz.problem.prompt,
            choice,
            correct,
            "quiz answered"
        );

        let events = self.race.handle_input(HostInput::answer(AnswerOutcome { correct, time_taken_ms }));
        self.observe(&events);
        Some(correct)
    }

    /// Question waiting for an answer, if any.
    pub fn pending_quiz(&self) -> Option<&PendingQuiz> {
        self.pending.as_ref()
    }

    /// The driven race.
    pub fn race(&self) -> &Race {
        &self.race
    }

    /// The driven race, mutably.
    pub fn race_mut(&mut self) -> &mut Race {
        &mut self.race
    }

    /// Release the race.
    pub fn into_race(self) -> Race {
        self.race
    }

    fn observe(&mut self, events: &[RaceEvent]) {
        for event in events {
            match event {
                RaceEvent::CountdownTick { count: 0 } => self.cues.play(Cue::Go),
                RaceEvent::CountdownTick { .. } => self.cues.play(Cue::CountdownTick),
                RaceEvent::QuizRequested { checkpoint_index } => {
                    let problem = self.quiz.next_problem(*checkpoint_index);
                    debug!(checkpoint = checkpoint_index, prompt = %problem.prompt, "quiz opened");
                    self.pending = Some(PendingQuiz {
                        checkpoint_index: *checkpoint_index,
                        problem,
                    });
                    self.cues.play(Cue::Checkpoint);
                }
                RaceEvent::StateChanged { state: RacePhase::Ready } => self.pending = None,
                RaceEvent::Finished => self.cues.play(Cue::Finish),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::RaceConfig;

    struct FixedQuiz;

    impl QuizProvider for FixedQuiz {
        fn next_problem(&mut self, checkpoint_index: usize) -> MathProblem {
            let n = checkpoint_index as i64;
            MathProblem {
                prompt: format!("{} + 1", n),
                choices: vec![n, n + 1, n + 2],
                answer: n + 1,
            }
        }
    }

    #[derive(Default)]
    struct CueLog(Vec<Cue>);

    impl CueSink for CueLog {
        fn play(&mut self, cue: Cue) {
            self.0.push(cue);
        }
    }

    fn paused_host() -> RaceHost<FixedQuiz, CueLog> {
        let race = Race::with_seed(RaceConfig::default(), 4).unwrap();
        let mut host = RaceHost::new(race, FixedQuiz, CueLog::default());
        host.tap();
        for _ in 0..3 {
            host.step(1.0);
        }
        while host.pending_quiz().is_none() {
            host.tap();
            host.step(0.1);
        }
        host
    }

    #[test]
    fn test_countdown_cues() {
        let race = Race::with_seed(RaceConfig::default(), 4).unwrap();
        let mut host = RaceHost::new(race, FixedQuiz, CueLog::default());
        host.tap();
        for _ in 0..3 {
            host.step(1.0);
        }
        assert_eq!(
            host.cues.0,
            vec![Cue::CountdownTick, Cue::CountdownTick, Cue::CountdownTick, Cue::Go]
        );
    }

    #[test]
    fn test_quiz_opened_at_checkpoint() {
        let host = paused_host();
        let quiz = host.pending_quiz().unwrap();
        assert_eq!(quiz.checkpoint_index, 0);
        assert_eq!(quiz.problem.prompt, "0 + 1");
        assert_eq!(host.race().phase(), RacePhase::Paused);
        assert_eq!(host.cues.0.last(), Some(&Cue::Checkpoint));
    }

    #[test]
    fn test_correct_answer_resumes_fast() {
        let mut host = paused_host();
        assert_eq!(host.answer(1, 800), Some(true));
        assert!(host.pending_quiz().is_none());
        assert_eq!(host.race().phase(), RacePhase::Racing);
        assert_eq!(host.race().controlled().velocity, 50.0);
        assert_eq!(host.cues.0.last(), Some(&Cue::CorrectAnswer));
    }

    #[test]
    fn test_wrong_answer_resumes_stopped() {
        let mut host = paused_host();
        assert_eq!(host.answer(7, 800), Some(false));
        assert_eq!(host.race().phase(), RacePhase::Racing);
        assert_eq!(host.race().controlled().velocity, 0.0);
    }

    #[test]
    fn test_answer_without_question() {
        let race = Race::with_seed(RaceConfig::default(), 4).unwrap();
        let mut host = RaceHost::silent(race, FixedQuiz);
        assert_eq!(host.answer(1, 100), None);
        assert_eq!(host.race().phase(), RacePhase::Ready);
    }

    #[test]
    fn test_driving_host_leaves_no_backlog() {
        let race = Race::with_seed(RaceConfig::default(), 4).unwrap();
        let mut host = RaceHost::silent(race, FixedQuiz);
        for _ in 0..1000 {
            host.tap();
            host.step(1.0);
            host.restart();
        }
        assert!(host.race_mut().take_events().is_empty());
    }

    #[test]
    fn test_restart_drops_question() {
        let mut host = paused_host();
        host.restart();
        assert!(host.pending_quiz().is_none());
        assert_eq!(host.race().phase(), RacePhase::Ready);
    }
}
