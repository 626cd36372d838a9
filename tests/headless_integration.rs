use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use gincana::comprehension::{Question, Quiz};
use gincana::runtime::{ChannelEventSource, FixedTicker, GincanaEvent, Runner};
use gincana::store::{MemoryResultStore, ResultStore};
use gincana::timer::ManualClock;
use gincana::{Exercise, SaveOutcome, SessionConfig, SessionPhase};

fn key(c: char) -> GincanaEvent {
    GincanaEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

// Drives an exercise through the runtime without a TTY, the same way the
// binary's event loop does.
#[test]
fn headless_typing_flow_completes() {
    let config = SessionConfig::typing_only("hola", Duration::from_secs(30));
    let mut exercise = Exercise::new(config).unwrap();
    exercise.set_agent_id("agente-01").unwrap();
    exercise.start().unwrap();

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        ChannelEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    for c in "hola".chars() {
        tx.send(key(c)).unwrap();
    }
    tx.send(GincanaEvent::Key(KeyEvent::new(
        KeyCode::Enter,
        KeyModifiers::NONE,
    )))
    .unwrap();

    for _ in 0..100u32 {
        match runner.step() {
            GincanaEvent::Tick => {
                exercise.tick();
            }
            GincanaEvent::Resize => {}
            GincanaEvent::Key(key) => match key.code {
                KeyCode::Char(c) => exercise.type_char(c).unwrap(),
                KeyCode::Enter => {
                    exercise.finish_typing().unwrap();
                }
                _ => {}
            },
        }
        if exercise.phase() == SessionPhase::Results {
            break;
        }
    }

    assert_eq!(exercise.phase(), SessionPhase::Results);
    let record = exercise.record().unwrap();
    assert_eq!(record.agent_id, "agente-01");
    assert_eq!(record.accuracy, 100.0);
    assert_eq!(record.errors, 0);
    assert_eq!(record.submitted, "hola");
}

#[test]
fn headless_timed_session_finishes_by_time() {
    let config = SessionConfig::typing_only("hola mundo", Duration::from_millis(200));
    let mut exercise = Exercise::new(config).unwrap();
    exercise.set_agent_id("agente-02").unwrap();
    exercise.start().unwrap();
    exercise.type_char('h').unwrap();

    let (_tx, rx) = mpsc::channel();
    let runner = Runner::new(
        ChannelEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(10)),
    );

    for _ in 0..100u32 {
        if let GincanaEvent::Tick = runner.step() {
            exercise.tick();
        }
        if exercise.phase() == SessionPhase::Results {
            break;
        }
    }

    assert_eq!(
        exercise.phase(),
        SessionPhase::Results,
        "timed session should finish by timeout"
    );
    // Elapsed time is clamped to the one-second floor
    assert_eq!(exercise.record().unwrap().typing_secs, 1.0);
}

#[test]
fn headless_full_path_with_manual_clock() {
    let quiz = Quiz::new(vec![
        Question {
            prompt: "¿Color del cielo?".into(),
            options: vec!["verde".into(), "azul".into()],
            correct: 1,
        },
        Question {
            prompt: "¿Cuántas patas tiene un gato?".into(),
            options: vec!["cuatro".into(), "dos".into()],
            correct: 0,
        },
    ]);
    let config = SessionConfig {
        reference_text: "el cielo es azul".into(),
        typing_duration: Duration::from_secs(60),
        countdown: Some(Duration::from_secs(3)),
        reading: true,
        quiz: Some(quiz),
    };
    let clock = ManualClock::new();
    let mut exercise = Exercise::with_clock(config, clock.clone()).unwrap();

    exercise.set_agent_id("  ana  ").unwrap();
    assert_eq!(exercise.start().unwrap(), SessionPhase::Countdown);

    clock.advance_secs(3.0);
    assert_eq!(exercise.tick(), Some(SessionPhase::Reading));

    clock.advance_secs(8.0);
    assert_eq!(exercise.finish_reading().unwrap(), SessionPhase::Typing);

    exercise.set_submitted("el cielo es azul").unwrap();
    clock.advance_secs(16.0);
    assert_eq!(exercise.finish_typing().unwrap(), SessionPhase::Comprehension);

    exercise.select_answer(0, 1).unwrap();
    exercise.select_answer(1, 1).unwrap();
    assert_eq!(exercise.submit_answers().unwrap(), SessionPhase::Results);

    let record = exercise.record().unwrap().clone();
    assert_eq!(record.agent_id, "ana");
    assert_eq!(record.typing_secs, 16.0);
    assert_eq!(record.wpm, 12.0);
    assert_eq!(record.reading_secs, Some(8.0));
    assert_eq!(record.reading_wpm, Some(30.0));
    assert_eq!(record.comprehension_correct, Some(1));
    assert_eq!(record.comprehension_total, Some(2));

    let mut store = MemoryResultStore::default();
    assert_eq!(exercise.save(&mut store).unwrap(), SaveOutcome::Saved);
    assert_eq!(exercise.save(&mut store).unwrap(), SaveOutcome::AlreadySaved);
    assert_eq!(store.read_all().unwrap(), vec![record]);
}
