//! Assessment session walk-throughs.

use lifeline_shared::{AssessmentSession, Question, Step, Transition};

fn complete(session: &mut AssessmentSession, answers: (bool, bool, bool)) -> Transition {
    session.answer(Question::Conscious, answers.0).unwrap();
    session.answer(Question::Breathing, answers.1).unwrap();
    session.answer(Question::HeavyBleeding, answers.2).unwrap()
}

#[test]
fn test_three_answers_from_idle_reach_complete() {
    let mut s = AssessmentSession::new();
    assert_eq!(s.step(), Step::Idle);

    assert_eq!(
        s.answer(Question::Conscious, true).unwrap(),
        Transition::Asking(Question::Breathing)
    );
    assert_eq!(s.step(), Step::AskingBreathing);

    assert_eq!(
        s.answer(Question::Breathing, false).unwrap(),
        Transition::Asking(Question::HeavyBleeding)
    );
    assert_eq!(s.step(), Step::AskingBleeding);

    match s.answer(Question::HeavyBleeding, true).unwrap() {
        Transition::Completed(c) => {
            assert!(c.is_conscious);
            assert!(!c.is_breathing);
            assert!(c.has_heavy_bleeding);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(s.step(), Step::Complete);
    assert!(s.completed().is_some());
}

#[test]
fn test_back_from_complete_clears_third_answer() {
    let mut s = AssessmentSession::new();
    complete(&mut s, (false, true, true));

    assert_eq!(s.back(), Step::AskingBleeding);
    assert_eq!(s.assessment().has_heavy_bleeding, None);
    assert_eq!(s.assessment().is_conscious, Some(false));
    assert_eq!(s.assessment().is_breathing, Some(true));

    // Re-answering completes again with the new value
    match s.answer(Question::HeavyBleeding, false).unwrap() {
        Transition::Completed(c) => assert!(!c.has_heavy_bleeding),
        other => panic!("expected completion, got {:?}", other),
    }
}

#[test]
fn test_restart_from_every_state() {
    let prefixes: [&[bool]; 4] = [&[], &[true], &[true, false], &[true, false, true]];
    for answers in prefixes {
        let mut s = AssessmentSession::new();
        for (q, v) in Question::ALL.iter().zip(answers.iter()) {
            s.answer(*q, *v).unwrap();
        }
        let before = s.generation();
        s.restart();
        assert_eq!(s.step(), Step::Idle);
        assert!(s.assessment().is_empty());
        assert!(s.generation() > before);
    }
}

#[test]
fn test_start_resets_previous_answers() {
    let mut s = AssessmentSession::new();
    complete(&mut s, (true, true, true));
    s.start();
    assert_eq!(s.step(), Step::AskingConscious);
    assert!(s.assessment().is_empty());
}
