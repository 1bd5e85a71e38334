//! The interview session controller: an explicit state machine driving
//! permission acquisition, profile collection, question delivery, answer
//! capture, evaluation handoff, and result assembly.
//!
//! The transition function [`reduce`] is pure and exhaustively matched; the
//! async driver [`InterviewSession::run`] performs the effects for the current
//! state, dispatches the resulting event, and stops on a terminal state. The
//! only suspension points are `speak`, `listen`, and the evaluator call.

use crate::config::SessionConfig;
use crate::error::{VoiceError, VoiceResult};
use crate::exchange::{ExchangeOutcome, ExchangePolicy};
use crate::normalize::{normalize_age_group, normalize_gender, normalize_name};
use crate::permission::MicrophonePermission;
use crate::speech::{GrammarHints, SpeechCapability};
use cogniscreen_core::{
    Answer, AnswerEvaluator, Evaluation, ProfileDraft, Question, QuestionBank, ResultStore,
    TestResult, NO_ANSWER_TRANSCRIPT,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const PROMPT_NAME: &str = "테스트를 시작하겠습니다. 먼저 성함을 말씀해주세요.";
const PROMPT_GENDER: &str = "성별을 말씀해주세요. 예를 들어, 남성 또는 여성.";
const PROMPT_AGE_GROUP: &str = "연령대를 말씀해주세요. 예를 들어, 10대, 20대.";
const SKIP_QUESTION: &str = "답변이 없어 이 문항을 건너뛰겠습니다.";
const NO_ANSWER_EXPLANATION: &str = "사용자가 답변하지 않았습니다.";
const EVALUATOR_FAILURE_EXPLANATION: &str = "답변 평가 중 오류가 발생했습니다.";

/// Profile fields, collected in this fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStage {
    Name,
    Gender,
    AgeGroup,
}

/// The single active state of a session. `Completed` and `Failed` are
/// terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    RequestingPermission,
    CollectingProfile { stage: ProfileStage },
    PreparingTest,
    AskingQuestion { index: usize },
    ListeningForAnswer { index: usize },
    EvaluatingAnswer { index: usize },
    Completed,
    Failed { message: String },
}

/// Events dispatched by the driver after each state's effects.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Start,
    PermissionGranted,
    PermissionDenied,
    ProfileFieldCaptured,
    QuestionsLoaded,
    QuestionAsked,
    AnswerCaptured,
    AnswerRecorded,
    Fatal { message: String },
}

/// Pure transition function: the next state is a total function of
/// (state, event). Events that do not apply to the current state leave it
/// unchanged.
pub fn reduce(state: &SessionState, event: SessionEvent, total_questions: usize) -> SessionState {
    match (state, event) {
        (_, SessionEvent::Fatal { message }) => SessionState::Failed { message },
        (SessionState::Idle, SessionEvent::Start) => SessionState::RequestingPermission,
        (SessionState::RequestingPermission, SessionEvent::PermissionGranted) => {
            SessionState::CollectingProfile {
                stage: ProfileStage::Name,
            }
        }
        (SessionState::RequestingPermission, SessionEvent::PermissionDenied) => {
            SessionState::Failed {
                message: VoiceError::PermissionDenied.to_string(),
            }
        }
        (
            SessionState::CollectingProfile { stage },
            SessionEvent::ProfileFieldCaptured,
        ) => match stage {
            ProfileStage::Name => SessionState::CollectingProfile {
                stage: ProfileStage::Gender,
            },
            ProfileStage::Gender => SessionState::CollectingProfile {
                stage: ProfileStage::AgeGroup,
            },
            ProfileStage::AgeGroup => SessionState::PreparingTest,
        },
        (SessionState::PreparingTest, SessionEvent::QuestionsLoaded) => {
            SessionState::AskingQuestion { index: 0 }
        }
        (SessionState::AskingQuestion { index }, SessionEvent::QuestionAsked) => {
            SessionState::ListeningForAnswer { index: *index }
        }
        (SessionState::ListeningForAnswer { index }, SessionEvent::AnswerCaptured) => {
            SessionState::EvaluatingAnswer { index: *index }
        }
        // Recorded directly (skip) or after evaluation: advance or finish.
        (SessionState::ListeningForAnswer { index }, SessionEvent::AnswerRecorded)
        | (SessionState::EvaluatingAnswer { index }, SessionEvent::AnswerRecorded) => {
            let next = index + 1;
            if next < total_questions {
                SessionState::AskingQuestion { index: next }
            } else {
                SessionState::Completed
            }
        }
        (state, _) => state.clone(),
    }
}

/// Terminal outcome of [`InterviewSession::run`].
#[derive(Debug)]
pub enum SessionOutcome {
    Completed(TestResult),
    Failed(String),
}

/// Snapshot pushed to the presentation layer on every transition and
/// transcript.
#[derive(Debug, Clone)]
pub struct SessionNotice {
    pub state: SessionState,
    /// The question in play, so the presentation can show prompts and picture
    /// aids.
    pub question: Option<Question>,
    pub transcript: Option<String>,
    pub speaking: bool,
    pub listening: bool,
}

/// One interview session. Owns its collaborators for the duration of the run;
/// nothing is shared across sessions.
pub struct InterviewSession<S, B, E, R, P> {
    speech: S,
    bank: B,
    evaluator: E,
    store: R,
    permission: P,
    config: SessionConfig,
    policy: ExchangePolicy,
    state: SessionState,
    draft: ProfileDraft,
    questions: Vec<Question>,
    answers: Vec<Answer>,
    pending_transcript: Option<String>,
    notice_tx: Option<mpsc::UnboundedSender<SessionNotice>>,
}

impl<S, B, E, R, P> InterviewSession<S, B, E, R, P>
where
    S: SpeechCapability,
    B: QuestionBank,
    E: AnswerEvaluator,
    R: ResultStore,
    P: MicrophonePermission,
{
    pub fn new(
        speech: S,
        bank: B,
        evaluator: E,
        store: R,
        permission: P,
        config: SessionConfig,
    ) -> Self {
        let policy = ExchangePolicy::from_config(&config);
        Self {
            speech,
            bank,
            evaluator,
            store,
            permission,
            config,
            policy,
            state: SessionState::Idle,
            draft: ProfileDraft::new(),
            questions: Vec::new(),
            answers: Vec::new(),
            pending_transcript: None,
            notice_tx: None,
        }
    }

    /// Attach the presentation layer. Call before `run`; one receiver per
    /// session.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionNotice> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.notice_tx = Some(tx);
        rx
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Drive the session from `Idle` to a terminal state. This is the single
    /// external command ("start session").
    pub async fn run(&mut self) -> VoiceResult<SessionOutcome> {
        info!("session starting");
        self.apply(SessionEvent::Start);

        loop {
            match self.state.clone() {
                SessionState::Idle => self.apply(SessionEvent::Start),
                SessionState::RequestingPermission => {
                    let event = if self.permission.request_access() {
                        SessionEvent::PermissionGranted
                    } else {
                        warn!("microphone permission denied");
                        SessionEvent::PermissionDenied
                    };
                    self.apply(event);
                }
                SessionState::CollectingProfile { stage } => {
                    match self.collect_profile_field(stage).await {
                        Ok(event) => self.apply(event),
                        Err(err) => self.fail(err).await,
                    }
                }
                SessionState::PreparingTest => match self.prepare_test().await {
                    Ok(event) => self.apply(event),
                    Err(err) => self.fail(err).await,
                },
                SessionState::AskingQuestion { index } => {
                    match self.ask_question(index).await {
                        Ok(event) => self.apply(event),
                        Err(err) => self.fail(err).await,
                    }
                }
                SessionState::ListeningForAnswer { index } => {
                    match self.listen_for_answer(index).await {
                        Ok(event) => self.apply(event),
                        Err(err) => self.fail(err).await,
                    }
                }
                SessionState::EvaluatingAnswer { index } => {
                    match self.evaluate_answer(index).await {
                        Ok(event) => self.apply(event),
                        Err(err) => self.fail(err).await,
                    }
                }
                SessionState::Completed => match self.finish().await {
                    Ok(result) => {
                        info!(id = %result.id, total_score = result.total_score, "session completed");
                        return Ok(SessionOutcome::Completed(result));
                    }
                    Err(err) => self.fail(err).await,
                },
                SessionState::Failed { message } => {
                    return Ok(SessionOutcome::Failed(message));
                }
            }
        }
    }

    fn apply(&mut self, event: SessionEvent) {
        self.state = reduce(&self.state, event, self.questions.len());
        self.notify(None);
    }

    /// Fatal path: best-effort spoken apology, then transition to `Failed`.
    async fn fail(&mut self, err: VoiceError) {
        let message = err.to_string();
        error!("session failed: {}", message);
        let _ = self
            .speech
            .speak(&format!("오류가 발생했습니다: {}", message))
            .await;
        self.apply(SessionEvent::Fatal { message });
    }

    fn notify(&self, transcript: Option<&str>) {
        let Some(tx) = self.notice_tx.as_ref() else {
            return;
        };
        let question = match &self.state {
            SessionState::AskingQuestion { index }
            | SessionState::ListeningForAnswer { index }
            | SessionState::EvaluatingAnswer { index } => self.questions.get(*index).cloned(),
            _ => None,
        };
        let _ = tx.send(SessionNotice {
            state: self.state.clone(),
            question,
            transcript: transcript.map(str::to_string),
            speaking: self.speech.is_speaking(),
            listening: self.speech.is_listening(),
        });
    }

    fn gender_hints() -> GrammarHints {
        GrammarHints::new(["남성", "여성", "남자", "여자", "기타", "남자입니다", "여자입니다"])
    }

    fn age_group_hints() -> GrammarHints {
        GrammarHints::new([
            "10대", "20대", "30대", "40대", "50대", "60대", "70대", "80대", "90대",
            "십대", "이십대", "삼십대", "사십대", "오십대", "육십대", "칠십대",
            "열살", "스무살", "서른살", "마흔살", "쉰살", "예순살", "일흔살",
            "열", "스물", "서른", "마흔", "쉰", "예순", "일흔",
            "십", "이십", "삼십", "사십", "오십", "육십", "칠십",
            "팔십", "구십", "여든", "아흔", "70대 이상",
        ])
    }

    /// One mandatory profile exchange. Exhaustion here is fatal.
    async fn collect_profile_field(&mut self, stage: ProfileStage) -> VoiceResult<SessionEvent> {
        let tx = self.notice_tx.clone();
        let state = self.state.clone();
        let publish = |text: &str| {
            if let Some(tx) = tx.as_ref() {
                let _ = tx.send(SessionNotice {
                    state: state.clone(),
                    question: None,
                    transcript: Some(text.to_string()),
                    speaking: false,
                    listening: false,
                });
            }
        };

        match stage {
            ProfileStage::Name => {
                let outcome = self
                    .policy
                    .run(&self.speech, PROMPT_NAME, None, normalize_name, publish)
                    .await?;
                match outcome {
                    ExchangeOutcome::Captured { value, .. } => {
                        self.draft.set_name(value);
                        Ok(SessionEvent::ProfileFieldCaptured)
                    }
                    ExchangeOutcome::Exhausted => Err(VoiceError::ProfileCollectionExhausted),
                }
            }
            ProfileStage::Gender => {
                let hints = Self::gender_hints();
                let outcome = self
                    .policy
                    .run(
                        &self.speech,
                        PROMPT_GENDER,
                        Some(&hints),
                        normalize_gender,
                        publish,
                    )
                    .await?;
                match outcome {
                    ExchangeOutcome::Captured { value, .. } => {
                        self.draft.set_gender(value);
                        Ok(SessionEvent::ProfileFieldCaptured)
                    }
                    ExchangeOutcome::Exhausted => Err(VoiceError::ProfileCollectionExhausted),
                }
            }
            ProfileStage::AgeGroup => {
                let hints = Self::age_group_hints();
                let outcome = self
                    .policy
                    .run(
                        &self.speech,
                        PROMPT_AGE_GROUP,
                        Some(&hints),
                        normalize_age_group,
                        publish,
                    )
                    .await?;
                match outcome {
                    ExchangeOutcome::Captured { value, .. } => {
                        self.draft.set_age_group(value);
                        Ok(SessionEvent::ProfileFieldCaptured)
                    }
                    ExchangeOutcome::Exhausted => Err(VoiceError::ProfileCollectionExhausted),
                }
            }
        }
    }

    /// Announce the session and load the fixed question sequence.
    async fn prepare_test(&mut self) -> VoiceResult<SessionEvent> {
        let name = self.draft.name().unwrap_or_default().to_string();
        let greeting = format!(
            "{}님, 반갑습니다. 지금부터 인지 능력 평가를 시작하겠습니다. 총 {}개의 문항이 제시됩니다.",
            name, self.config.total_questions
        );
        self.speech.speak(&greeting).await?;

        let questions = self.bank.session_questions();
        if questions.is_empty() {
            return Err(VoiceError::Config(
                "question bank returned no questions".to_string(),
            ));
        }
        if questions.len() != self.config.total_questions {
            warn!(
                configured = self.config.total_questions,
                loaded = questions.len(),
                "question bank length differs from configured total"
            );
        }
        self.questions = questions;
        Ok(SessionEvent::QuestionsLoaded)
    }

    async fn ask_question(&mut self, index: usize) -> VoiceResult<SessionEvent> {
        let prompt = self.questions[index].prompt.clone();
        info!(question = index + 1, total = self.questions.len(), "asking");
        self.speech.speak(&prompt).await?;
        tokio::time::sleep(self.config.inter_prompt_pause).await;
        Ok(SessionEvent::QuestionAsked)
    }

    /// Bounded listen loop for one answer. Exhaustion is non-fatal: a
    /// zero-score no-answer record is appended and the session moves on.
    async fn listen_for_answer(&mut self, index: usize) -> VoiceResult<SessionEvent> {
        let question = self.questions[index].clone();
        let tx = self.notice_tx.clone();
        let state = self.state.clone();
        let publish = |text: &str| {
            if let Some(tx) = tx.as_ref() {
                let _ = tx.send(SessionNotice {
                    state: state.clone(),
                    question: Some(question.clone()),
                    transcript: Some(text.to_string()),
                    speaking: false,
                    listening: false,
                });
            }
        };

        // The prompt was already spoken in AskingQuestion; retries re-speak it.
        let outcome = self
            .policy
            .run_after_prompt(&self.speech, &question.prompt, None, normalize_name, publish)
            .await?;

        match outcome {
            ExchangeOutcome::Captured { transcript, .. } => {
                self.pending_transcript = Some(transcript);
                Ok(SessionEvent::AnswerCaptured)
            }
            ExchangeOutcome::Exhausted => {
                warn!(question = index + 1, "no answer; recording zero score");
                self.speech.speak(SKIP_QUESTION).await?;
                self.record_answer(
                    index,
                    NO_ANSWER_TRANSCRIPT.to_string(),
                    Evaluation {
                        score: 0,
                        explanation: NO_ANSWER_EXPLANATION.to_string(),
                    },
                );
                Ok(SessionEvent::AnswerRecorded)
            }
        }
    }

    /// Hand the transcript to the evaluator. Evaluator failure is absorbed
    /// into a zero score; the session never aborts here.
    async fn evaluate_answer(&mut self, index: usize) -> VoiceResult<SessionEvent> {
        let question = self.questions[index].clone();
        let transcript = self
            .pending_transcript
            .take()
            .unwrap_or_else(|| NO_ANSWER_TRANSCRIPT.to_string());

        let evaluation = match self.evaluator.evaluate(&question, &transcript).await {
            Ok(evaluation) => evaluation,
            Err(err) => {
                warn!(question = index + 1, "evaluator failed: {}", err);
                Evaluation {
                    score: 0,
                    explanation: EVALUATOR_FAILURE_EXPLANATION.to_string(),
                }
            }
        };
        self.record_answer(index, transcript, evaluation);
        Ok(SessionEvent::AnswerRecorded)
    }

    fn record_answer(&mut self, index: usize, transcript: String, evaluation: Evaluation) {
        // One answer per question, in question order.
        debug_assert_eq!(self.answers.len(), index);
        self.answers.push(Answer {
            question_id: self.questions[index].id,
            transcript,
            score: evaluation.score.min(1),
            explanation: evaluation.explanation,
        });
    }

    /// Closing summary, result assembly, and handoff to the store.
    async fn finish(&mut self) -> VoiceResult<TestResult> {
        let profile = self
            .draft
            .finish()
            .ok_or_else(|| VoiceError::Config("profile incomplete at completion".to_string()))?;
        debug_assert_eq!(self.answers.len(), self.questions.len());

        let result = TestResult::new(profile, self.answers.clone());
        let closing = format!(
            "모든 테스트가 완료되었습니다. 잠시 후 결과 페이지로 이동합니다. 총점은 {}점 입니다.",
            result.total_score
        );
        self.speech.speak(&closing).await?;
        self.store.save(&result)?;
        self.notify(None);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOTAL: usize = 3;

    #[test]
    fn start_requests_permission() {
        let next = reduce(&SessionState::Idle, SessionEvent::Start, TOTAL);
        assert_eq!(next, SessionState::RequestingPermission);
    }

    #[test]
    fn permission_outcome_branches() {
        let granted = reduce(
            &SessionState::RequestingPermission,
            SessionEvent::PermissionGranted,
            TOTAL,
        );
        assert_eq!(
            granted,
            SessionState::CollectingProfile {
                stage: ProfileStage::Name
            }
        );

        let denied = reduce(
            &SessionState::RequestingPermission,
            SessionEvent::PermissionDenied,
            TOTAL,
        );
        assert!(matches!(denied, SessionState::Failed { .. }));
    }

    #[test]
    fn profile_stages_advance_in_order() {
        let mut state = SessionState::CollectingProfile {
            stage: ProfileStage::Name,
        };
        state = reduce(&state, SessionEvent::ProfileFieldCaptured, TOTAL);
        assert_eq!(
            state,
            SessionState::CollectingProfile {
                stage: ProfileStage::Gender
            }
        );
        state = reduce(&state, SessionEvent::ProfileFieldCaptured, TOTAL);
        assert_eq!(
            state,
            SessionState::CollectingProfile {
                stage: ProfileStage::AgeGroup
            }
        );
        state = reduce(&state, SessionEvent::ProfileFieldCaptured, TOTAL);
        assert_eq!(state, SessionState::PreparingTest);
    }

    #[test]
    fn question_loop_advances_and_completes() {
        let mut state = reduce(&SessionState::PreparingTest, SessionEvent::QuestionsLoaded, TOTAL);
        assert_eq!(state, SessionState::AskingQuestion { index: 0 });

        for index in 0..TOTAL {
            state = reduce(&state, SessionEvent::QuestionAsked, TOTAL);
            assert_eq!(state, SessionState::ListeningForAnswer { index });
            state = reduce(&state, SessionEvent::AnswerCaptured, TOTAL);
            assert_eq!(state, SessionState::EvaluatingAnswer { index });
            state = reduce(&state, SessionEvent::AnswerRecorded, TOTAL);
        }
        assert_eq!(state, SessionState::Completed);
    }

    #[test]
    fn skip_path_advances_without_evaluation() {
        let state = SessionState::ListeningForAnswer { index: 0 };
        let next = reduce(&state, SessionEvent::AnswerRecorded, TOTAL);
        assert_eq!(next, SessionState::AskingQuestion { index: 1 });
    }

    #[test]
    fn fatal_wins_from_any_state() {
        for state in [
            SessionState::Idle,
            SessionState::PreparingTest,
            SessionState::EvaluatingAnswer { index: 1 },
        ] {
            let next = reduce(
                &state,
                SessionEvent::Fatal {
                    message: "boom".to_string(),
                },
                TOTAL,
            );
            assert!(matches!(next, SessionState::Failed { .. }));
        }
    }

    #[test]
    fn terminal_states_do_not_advance() {
        let completed = reduce(&SessionState::Completed, SessionEvent::AnswerRecorded, TOTAL);
        assert_eq!(completed, SessionState::Completed);

        let failed = SessionState::Failed {
            message: "done".to_string(),
        };
        let still_failed = reduce(&failed, SessionEvent::Start, TOTAL);
        assert_eq!(still_failed, failed);
    }

    #[test]
    fn irrelevant_events_leave_state_unchanged() {
        let state = SessionState::AskingQuestion { index: 2 };
        let next = reduce(&state, SessionEvent::PermissionGranted, TOTAL);
        assert_eq!(next, state);
    }
}
