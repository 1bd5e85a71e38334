//! End-to-end session tests against a scripted speech capability.
//!
//! No audio hardware involved: the fake pops pre-seeded listen outcomes and
//! records everything spoken, so each test asserts both the terminal outcome
//! and the exact spoken dialogue.

use cogniscreen_core::{
    AnswerEvaluator, BuiltinQuestionBank, CoreError, CoreResult, Evaluation, Gender,
    KeywordEvaluator, MemoryResultStore, Question, ResultStore, NO_ANSWER_TRANSCRIPT,
};
use cogniscreen_voice::{
    AlwaysDenied, AlwaysGranted, GrammarHints, InterviewSession, ListenError, SessionConfig,
    SessionOutcome, SpeakError, SpeechCapability, Transcript,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const NAME_PROMPT: &str = "테스트를 시작하겠습니다. 먼저 성함을 말씀해주세요.";
const GENDER_PROMPT: &str = "성별을 말씀해주세요. 예를 들어, 남성 또는 여성.";

/// Speech fake: pops scripted listen outcomes in order, records every spoken
/// utterance. An empty script reports no-speech, like a dead microphone.
#[derive(Default)]
struct ScriptedSpeech {
    listens: Mutex<VecDeque<Result<Transcript, ListenError>>>,
    spoken: Mutex<Vec<String>>,
}

impl ScriptedSpeech {
    fn new<I>(listens: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Result<Transcript, ListenError>>,
    {
        Arc::new(Self {
            listens: Mutex::new(listens.into_iter().collect()),
            spoken: Mutex::new(Vec::new()),
        })
    }

    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    fn times_spoken(&self, text: &str) -> usize {
        self.spoken().iter().filter(|s| s.as_str() == text).count()
    }
}

#[async_trait::async_trait(?Send)]
impl SpeechCapability for ScriptedSpeech {
    async fn speak(&self, text: &str) -> Result<(), SpeakError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn listen(
        &self,
        _timeout: Duration,
        _hints: Option<&GrammarHints>,
    ) -> Result<Transcript, ListenError> {
        self.listens
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ListenError::NoSpeech))
    }

    fn is_speaking(&self) -> bool {
        false
    }

    fn is_listening(&self) -> bool {
        false
    }
}

/// Evaluator fake that always errors, to exercise the absorb-into-zero policy.
struct FailingEvaluator;

#[async_trait::async_trait]
impl AnswerEvaluator for FailingEvaluator {
    async fn evaluate(&self, _question: &Question, _transcript: &str) -> CoreResult<Evaluation> {
        Err(CoreError::Evaluator("scoring service unreachable".to_string()))
    }
}

fn test_config(total_questions: usize) -> SessionConfig {
    SessionConfig {
        total_questions,
        answer_timeout: Duration::from_secs(1),
        max_attempts: 3,
        inter_prompt_pause: Duration::ZERO,
    }
}

fn ok(text: &str) -> Result<Transcript, ListenError> {
    Ok(Transcript::new(text, 0.9))
}

/// Name, gender, and age-group exchanges, each succeeding first try.
fn profile_listens() -> Vec<Result<Transcript, ListenError>> {
    vec![ok("김철수"), ok("남자입니다"), ok("칠십대")]
}

#[tokio::test]
async fn completes_full_interview_and_saves_result() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut listens = profile_listens();
    listens.push(ok("2026년입니다")); // correct
    listens.push(ok("겨울입니다")); // wrong (expected 여름)
    let speech = ScriptedSpeech::new(listens);
    let store = Arc::new(MemoryResultStore::new());

    let mut session = InterviewSession::new(
        Arc::clone(&speech),
        BuiltinQuestionBank::with_total(2),
        KeywordEvaluator,
        Arc::clone(&store),
        AlwaysGranted,
        test_config(2),
    );
    let outcome = session.run().await.unwrap();

    let result = match outcome {
        SessionOutcome::Completed(result) => result,
        SessionOutcome::Failed(message) => panic!("session failed: {}", message),
    };
    assert_eq!(result.profile.name, "김철수");
    assert_eq!(result.profile.gender, Gender::Male);
    assert_eq!(result.answers.len(), 2);
    assert_eq!(result.answers[0].score, 1);
    assert_eq!(result.answers[1].score, 0);
    assert_eq!(result.total_score, 1);

    let saved = store.list_all().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, result.id);

    let spoken = speech.spoken();
    assert!(spoken.iter().any(|s| s.contains("반갑습니다")));
    assert!(spoken.iter().any(|s| s.contains("총점은 1점")));
}

#[tokio::test]
async fn profile_exhaustion_aborts_without_saving() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let speech = ScriptedSpeech::new(vec![
        Err(ListenError::Timeout),
        Err(ListenError::Timeout),
        Err(ListenError::Timeout),
    ]);
    let store = Arc::new(MemoryResultStore::new());

    let mut session = InterviewSession::new(
        Arc::clone(&speech),
        BuiltinQuestionBank::with_total(2),
        KeywordEvaluator,
        Arc::clone(&store),
        AlwaysGranted,
        test_config(2),
    );
    let outcome = session.run().await.unwrap();

    match outcome {
        SessionOutcome::Failed(message) => {
            assert!(message.contains("테스트를 중단합니다"));
        }
        SessionOutcome::Completed(_) => panic!("session should have failed"),
    }
    assert!(store.list_all().unwrap().is_empty());

    // Initial ask plus one re-ask per apologized failure; the final failure
    // exhausts the budget without another apology.
    assert_eq!(speech.times_spoken(NAME_PROMPT), 3);
    assert_eq!(
        speech.times_spoken("답변 시간이 초과되었습니다. 다시 한 번 말씀해주시겠어요?"),
        2
    );
}

#[tokio::test]
async fn unanswered_question_scores_zero_and_moves_on() {
    let mut listens = profile_listens();
    listens.push(Err(ListenError::NoSpeech)); // q1: all three attempts fail
    listens.push(Err(ListenError::NoSpeech));
    listens.push(Err(ListenError::NoSpeech));
    listens.push(ok("여름입니다")); // q2: answered
    let speech = ScriptedSpeech::new(listens);
    let store = Arc::new(MemoryResultStore::new());

    let mut session = InterviewSession::new(
        Arc::clone(&speech),
        BuiltinQuestionBank::with_total(2),
        KeywordEvaluator,
        Arc::clone(&store),
        AlwaysGranted,
        test_config(2),
    );
    let outcome = session.run().await.unwrap();

    let result = match outcome {
        SessionOutcome::Completed(result) => result,
        SessionOutcome::Failed(message) => panic!("session failed: {}", message),
    };
    assert_eq!(result.answers.len(), 2);
    assert_eq!(result.answers[0].transcript, NO_ANSWER_TRANSCRIPT);
    assert_eq!(result.answers[0].score, 0);
    assert_eq!(result.answers[0].explanation, "사용자가 답변하지 않았습니다.");
    assert_eq!(result.answers[1].score, 1);
    assert_eq!(result.total_score, 1);

    let spoken = speech.spoken();
    assert!(spoken.iter().any(|s| s.contains("이 문항을 건너뛰겠습니다")));
    // The second question was still asked after the skip.
    assert!(spoken.iter().any(|s| s.contains("어느 계절입니까")));
}

#[tokio::test]
async fn low_confidence_consumes_attempt_and_reprompts() {
    let mut listens = vec![
        Err(ListenError::LowConfidence { confidence: 0.3 }),
        ok("김철수"),
    ];
    listens.push(ok("남자입니다"));
    listens.push(ok("칠십대"));
    listens.push(ok("2026년"));
    let speech = ScriptedSpeech::new(listens);

    let mut session = InterviewSession::new(
        Arc::clone(&speech),
        BuiltinQuestionBank::with_total(1),
        KeywordEvaluator,
        MemoryResultStore::new(),
        AlwaysGranted,
        test_config(1),
    );
    let outcome = session.run().await.unwrap();
    assert!(matches!(outcome, SessionOutcome::Completed(_)));

    assert_eq!(speech.times_spoken(NAME_PROMPT), 2);
    assert_eq!(
        speech.times_spoken(
            "죄송합니다, 답변이 명확하게 들리지 않았습니다. 다시 한 번 말씀해주시겠어요?"
        ),
        1
    );
}

#[tokio::test]
async fn repeat_request_does_not_consume_an_attempt() {
    // Gender stage: one free repeat, then two real failures, then success.
    // With max_attempts = 3 this only completes if the repeat was free.
    let listens = vec![
        ok("김철수"),
        ok("다시"),
        Err(ListenError::NoSpeech),
        Err(ListenError::NoSpeech),
        ok("여성입니다"),
        ok("칠십대"),
        ok("2026년"),
    ];
    let speech = ScriptedSpeech::new(listens);

    let mut session = InterviewSession::new(
        Arc::clone(&speech),
        BuiltinQuestionBank::with_total(1),
        KeywordEvaluator,
        MemoryResultStore::new(),
        AlwaysGranted,
        test_config(1),
    );
    let outcome = session.run().await.unwrap();

    let result = match outcome {
        SessionOutcome::Completed(result) => result,
        SessionOutcome::Failed(message) => panic!("session failed: {}", message),
    };
    assert_eq!(result.profile.gender, Gender::Female);
    assert_eq!(speech.times_spoken("네, 다시 질문해 드릴게요."), 1);
    // Initial ask, repeat re-ask, and two failure re-asks.
    assert_eq!(speech.times_spoken(GENDER_PROMPT), 4);
}

#[tokio::test]
async fn unparsable_profile_answer_apologizes_and_retries() {
    let listens = vec![
        ok("김철수"),
        ok("글쎄요"), // parses as neither gender nor repeat
        ok("남성"),
        ok("이십대"),
        ok("2026년"),
    ];
    let speech = ScriptedSpeech::new(listens);

    let mut session = InterviewSession::new(
        Arc::clone(&speech),
        BuiltinQuestionBank::with_total(1),
        KeywordEvaluator,
        MemoryResultStore::new(),
        AlwaysGranted,
        test_config(1),
    );
    let outcome = session.run().await.unwrap();
    assert!(matches!(outcome, SessionOutcome::Completed(_)));

    assert_eq!(
        speech.times_spoken("죄송합니다, 잘 이해하지 못했어요. 다시 말씀해주세요."),
        1
    );
    assert_eq!(speech.times_spoken(GENDER_PROMPT), 2);
}

#[tokio::test]
async fn evaluator_failure_is_absorbed_as_zero_score() {
    let mut listens = profile_listens();
    listens.push(ok("2026년입니다"));
    let speech = ScriptedSpeech::new(listens);
    let store = Arc::new(MemoryResultStore::new());

    let mut session = InterviewSession::new(
        Arc::clone(&speech),
        BuiltinQuestionBank::with_total(1),
        FailingEvaluator,
        Arc::clone(&store),
        AlwaysGranted,
        test_config(1),
    );
    let outcome = session.run().await.unwrap();

    let result = match outcome {
        SessionOutcome::Completed(result) => result,
        SessionOutcome::Failed(message) => panic!("session failed: {}", message),
    };
    assert_eq!(result.answers[0].score, 0);
    assert_eq!(result.answers[0].explanation, "답변 평가 중 오류가 발생했습니다.");
    assert_eq!(result.total_score, 0);
    // An evaluator outage still yields a saved (zero-score) result.
    assert_eq!(store.list_all().unwrap().len(), 1);
}

#[tokio::test]
async fn permission_denied_ends_session_before_any_prompt() {
    let speech = ScriptedSpeech::new(vec![]);
    let store = Arc::new(MemoryResultStore::new());

    let mut session = InterviewSession::new(
        Arc::clone(&speech),
        BuiltinQuestionBank::with_total(2),
        KeywordEvaluator,
        Arc::clone(&store),
        AlwaysDenied,
        test_config(2),
    );
    let outcome = session.run().await.unwrap();

    match outcome {
        SessionOutcome::Failed(message) => {
            assert!(message.contains("마이크 사용 권한"));
        }
        SessionOutcome::Completed(_) => panic!("session should have failed"),
    }
    assert!(speech.spoken().is_empty());
    assert!(store.list_all().unwrap().is_empty());
}

#[tokio::test]
async fn notices_surface_transcripts_and_picture_questions() {
    let mut listens = profile_listens();
    for _ in 0..7 {
        listens.push(ok("답변입니다"));
    }
    let speech = ScriptedSpeech::new(listens);

    let mut session = InterviewSession::new(
        Arc::clone(&speech),
        BuiltinQuestionBank::with_total(7), // includes the first picture item
        KeywordEvaluator,
        MemoryResultStore::new(),
        AlwaysGranted,
        test_config(7),
    );
    let mut notices = session.subscribe();
    let outcome = session.run().await.unwrap();
    assert!(matches!(outcome, SessionOutcome::Completed(_)));

    let mut transcripts = Vec::new();
    let mut saw_picture_question = false;
    while let Ok(notice) = notices.try_recv() {
        if let Some(text) = notice.transcript {
            transcripts.push(text);
        }
        if let Some(question) = notice.question {
            if question.image_ref.is_some() {
                saw_picture_question = true;
            }
        }
    }
    assert!(transcripts.iter().any(|t| t == "김철수"));
    assert!(saw_picture_question, "picture item never surfaced to the presentation");
}
