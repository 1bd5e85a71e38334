//! Interview demo — a full voice assessment session with optional production
//! TTS/STT/evaluator backends.
//!
//! - **TTS**: remote synthesis if `TTS_API_KEY` is set, else silent.
//! - **STT**: remote transcription if `STT_API_KEY` is set, else scripted
//!   (which reports no-speech, so without keys the session fails fast during
//!   profile collection).
//! - **Evaluator**: remote scoring if `EVAL_API_KEY` is set, else keyword
//!   matching against each question's expected answer.
//!
//! Results are persisted under `./data/cogniscreen`. Set keys in `.env`.

use cogniscreen_core::{
    BuiltinQuestionBank, KeywordEvaluator, RemoteEvaluator, SledResultStore,
};
use cogniscreen_voice::{
    DeviceSpeech, InterviewSession, PlatformPermission, SessionConfig, SessionOutcome,
};
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Interview demo — permission → profile → questions → evaluation → store");
    info!("Set TTS_API_KEY / STT_API_KEY / EVAL_API_KEY for production backends.\n");

    let config = SessionConfig::from_env();
    let speech = DeviceSpeech::from_env()?;
    let bank = BuiltinQuestionBank::with_total(config.total_questions);
    let store = SledResultStore::open_path(Path::new("./data/cogniscreen"))?;

    let outcome = match RemoteEvaluator::from_env() {
        Some(evaluator) => {
            info!("Evaluator: remote scoring model.");
            let mut session = InterviewSession::new(
                speech,
                bank,
                evaluator,
                store,
                PlatformPermission,
                config,
            );
            run_with_notices(&mut session).await?
        }
        None => {
            info!("Evaluator: keyword matching (set EVAL_API_KEY for model scoring).");
            let mut session = InterviewSession::new(
                speech,
                bank,
                KeywordEvaluator,
                store,
                PlatformPermission,
                config,
            );
            run_with_notices(&mut session).await?
        }
    };

    match outcome {
        SessionOutcome::Completed(result) => {
            info!(
                "Session complete: {}점 / {} answers (result id {})",
                result.total_score,
                result.answers.len(),
                result.id
            );
        }
        SessionOutcome::Failed(message) => {
            info!("Session failed: {}", message);
        }
    }
    Ok(())
}

async fn run_with_notices<S, B, E, R, P>(
    session: &mut InterviewSession<S, B, E, R, P>,
) -> Result<SessionOutcome, Box<dyn std::error::Error>>
where
    S: cogniscreen_voice::SpeechCapability,
    B: cogniscreen_core::QuestionBank,
    E: cogniscreen_core::AnswerEvaluator,
    R: cogniscreen_core::ResultStore,
    P: cogniscreen_voice::MicrophonePermission,
{
    let mut notices = session.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            match notice.transcript {
                Some(text) => info!("heard: {}", text),
                None => info!("state: {:?}", notice.state),
            }
        }
    });

    let outcome = session.run().await?;
    printer.abort();
    Ok(outcome)
}
