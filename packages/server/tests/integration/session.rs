use std::collections::HashSet;

use ::common::QuestionCategory;
use chrono::Duration;
use quiz_server::config::QuizConfig;
use quiz_server::entity::{answer, prize_award, quiz_session};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use crate::common::{EventSeed, TestApp, correct_value, routes};

fn always_lucky() -> QuizConfig {
    QuizConfig {
        lucky_weight_percent: 100,
        ..QuizConfig::default()
    }
}

mod starting {
    use super::*;

    #[tokio::test]
    async fn first_round_starts_with_normal_question() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");

        let res = app.start_session(event_id, &token).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["event_id"], event_id);
        assert_eq!(res.body["round"], 1);
        assert_eq!(res.body["first_question"]["category"], "normal");
        assert!(
            res.body["first_question"].get("correct_answer").is_none(),
            "served question must not leak the answer"
        );
    }

    #[tokio::test]
    async fn requires_authentication() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;

        let res = app
            .post_without_token(&routes::event_sessions(event_id), &json!({}))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app.start_session(999_999, &app.token("alice")).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn inactive_event_rejected() {
        let app = TestApp::spawn().await;
        let event_id = app
            .create_standard_event(EventSeed {
                is_active: false,
                ..EventSeed::default()
            })
            .await;

        let res = app.start_session(event_id, &app.token("alice")).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "EVENT_INACTIVE");
    }

    #[tokio::test]
    async fn events_outside_their_window_rejected() {
        let app = TestApp::spawn().await;
        let upcoming = app
            .create_standard_event(EventSeed {
                starts_in: Duration::days(1),
                ends_in: Duration::days(2),
                ..EventSeed::default()
            })
            .await;
        let ended = app
            .create_standard_event(EventSeed {
                starts_in: Duration::days(-3),
                ends_in: Duration::days(-1),
                ..EventSeed::default()
            })
            .await;
        let token = app.token("alice");

        for event_id in [upcoming, ended] {
            let res = app.start_session(event_id, &token).await;
            assert_eq!(res.status, 400, "{}", res.text);
            assert_eq!(res.code(), "EVENT_INACTIVE");
        }
    }

    #[tokio::test]
    async fn too_few_questions_creates_no_session() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event(EventSeed::default()).await;
        app.add_questions(event_id, QuestionCategory::Normal, 4).await;
        app.add_questions(event_id, QuestionCategory::Lucky, 3).await;

        let res = app.start_session(event_id, &app.token("alice")).await;

        assert_eq!(res.status, 500);
        assert_eq!(res.code(), "INSUFFICIENT_QUESTIONS");
        let sessions = quiz_session::Entity::find()
            .filter(quiz_session::Column::EventId.eq(event_id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(sessions, 0);
    }

    #[tokio::test]
    async fn second_start_while_in_progress_conflicts() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");

        let first = app.start_session(event_id, &token).await;
        assert_eq!(first.status, 201);

        let second = app.start_session(event_id, &token).await;
        assert_eq!(second.status, 409);
        assert_eq!(second.code(), "SESSION_IN_PROGRESS");
    }

    #[tokio::test]
    async fn users_play_independently() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;

        let alice = app.start_session(event_id, &app.token("alice")).await;
        let bob = app.start_session(event_id, &app.token("bob")).await;

        assert_eq!(alice.status, 201);
        assert_eq!(bob.status, 201);
        assert_eq!(bob.body["round"], 1);
    }
}

mod answering {
    use super::*;

    #[tokio::test]
    async fn wrong_answer_reveals_correct_answer_and_advances() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        let started = app.start_session(event_id, &token).await;
        let session_id = started.session_id();
        let question = started.body["first_question"].clone();

        let res = app.answer(session_id, &question, false, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_correct"], false);
        assert_eq!(res.body["attempt_number"], 1);
        assert_eq!(res.body["correct_answer"], correct_value(&question));
        assert_eq!(res.body["session_complete"], false);
        assert!(res.body["prize_result"].is_null());
        assert_ne!(res.body["next_question"]["id"], question["id"]);
    }

    #[tokio::test]
    async fn correct_answer_hides_canonical_answer() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        let started = app.start_session(event_id, &token).await;

        let res = app
            .answer(started.session_id(), &started.body["first_question"], true, &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["is_correct"], true);
        assert!(res.body["correct_answer"].is_null());
    }

    #[tokio::test]
    async fn resubmission_keeps_first_attempt_and_does_not_advance() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        let started = app.start_session(event_id, &token).await;
        let session_id = started.session_id();
        let first = started.body["first_question"].clone();

        let res = app.answer(session_id, &first, false, &token).await;
        let pending = res.body["next_question"]["id"].clone();

        let res = app.answer(session_id, &first, true, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_correct"], true);
        assert_eq!(res.body["attempt_number"], 2);
        assert_eq!(res.body["next_question"]["id"], pending);
        assert!(res.body["prize_result"].is_null());

        let rows = answer::Entity::find()
            .filter(answer::Column::SessionId.eq(session_id))
            .all(&app.db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_correct);
        assert!(!rows[0].first_attempt_correct);
        assert_eq!(rows[0].attempt_number, 2);
    }

    #[tokio::test]
    async fn unserved_question_rejected() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event(EventSeed::default()).await;
        let normals = app
            .add_questions(event_id, QuestionCategory::Normal, 6)
            .await;
        let token = app.token("alice");
        let started = app.start_session(event_id, &token).await;
        let served = started.body["first_question"]["id"].as_i64().unwrap() as i32;
        let other = normals.into_iter().find(|id| *id != served).unwrap();

        let res = app
            .post_with_token(
                &routes::session_answers(started.session_id()),
                &json!({"question_id": other, "value": "a"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn null_value_rejected() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        let started = app.start_session(event_id, &token).await;

        let res = app
            .post_with_token(
                &routes::session_answers(started.session_id()),
                &json!({"question_id": started.body["first_question"]["id"].clone(), "value": null}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn other_users_session_forbidden() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let started = app.start_session(event_id, &app.token("alice")).await;
        let bob = app.token("bob");

        let res = app
            .answer(started.session_id(), &started.body["first_question"], true, &bob)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.code(), "PERMISSION_DENIED");

        let res = app
            .get_with_token(&routes::session(started.session_id()), &bob)
            .await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn lucky_questions_stay_locked_without_first_try_hits() {
        let app = TestApp::spawn_with(always_lucky()).await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");

        let served = app.play_round(event_id, &token, false).await;

        assert_eq!(served.len(), 5);
        assert!(served.iter().all(|q| q["category"] == "normal"));
    }

    #[tokio::test]
    async fn lucky_question_served_after_unlock_and_wins() {
        let app = TestApp::spawn_with(always_lucky()).await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        let started = app.start_session(event_id, &token).await;
        let session_id = started.session_id();

        let mut question = started.body["first_question"].clone();
        for _ in 0..3 {
            assert_eq!(question["category"], "normal");
            let res = app.answer(session_id, &question, true, &token).await;
            question = res.body["next_question"].clone();
        }
        assert_eq!(question["category"], "lucky");

        let res = app.answer(session_id, &question, true, &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["prize_result"]["outcome"], "won");
        assert_eq!(res.body["prize_result"]["prize"]["user_id"], "alice");
        assert_eq!(res.body["prize_result"]["prize"]["source"], "instant");
        // Never two lucky-draw questions in a row.
        assert_eq!(res.body["next_question"]["category"], "normal");
    }

    #[tokio::test]
    async fn lucky_question_needs_first_try_to_win() {
        let app = TestApp::spawn_with(always_lucky()).await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        let started = app.start_session(event_id, &token).await;
        let session_id = started.session_id();

        let mut question = started.body["first_question"].clone();
        for _ in 0..3 {
            let res = app.answer(session_id, &question, true, &token).await;
            question = res.body["next_question"].clone();
        }
        assert_eq!(question["category"], "lucky");

        let res = app.answer(session_id, &question, false, &token).await;
        assert_eq!(res.body["correct_answer"], json!(true));
        assert!(res.body["prize_result"].is_null());

        let res = app.answer(session_id, &question, true, &token).await;
        assert_eq!(res.body["attempt_number"], 2);
        assert!(res.body["prize_result"].is_null());

        let awards = prize_award::Entity::find()
            .filter(prize_award::Column::EventId.eq(event_id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(awards, 0);
    }

    #[tokio::test]
    async fn session_view_reports_progress() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        let started = app.start_session(event_id, &token).await;
        let session_id = started.session_id();
        let res = app
            .answer(session_id, &started.body["first_question"], false, &token)
            .await;
        let pending = res.body["next_question"]["id"].clone();

        let res = app.get_with_token(&routes::session(session_id), &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "in_progress");
        assert_eq!(res.body["answered"], 1);
        assert_eq!(res.body["correct"], 0);
        assert_eq!(res.body["current_question"]["id"], pending);
    }
}

mod completing {
    use super::*;

    #[tokio::test]
    async fn complete_requires_every_answer() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        let started = app.start_session(event_id, &token).await;
        app.answer(started.session_id(), &started.body["first_question"], true, &token)
            .await;

        let res = app
            .post_with_token(
                &routes::session_complete(started.session_id()),
                &json!({}),
                &token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.code(), "INVALID_SESSION_STATE");
    }

    #[tokio::test]
    async fn complete_returns_summary() {
        let app = TestApp::spawn_with(always_lucky()).await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        let started = app.start_session(event_id, &token).await;
        let session_id = started.session_id();

        let mut question = started.body["first_question"].clone();
        loop {
            let res = app.answer(session_id, &question, true, &token).await;
            if res.body["session_complete"] == true {
                assert!(res.body["next_question"].is_null());
                break;
            }
            question = res.body["next_question"].clone();
        }

        let res = app
            .post_with_token(&routes::session_complete(session_id), &json!({}), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "completed");
        assert_eq!(res.body["answered"], 5);
        assert_eq!(res.body["correct"], 5);
        assert_eq!(res.body["incorrect"], 0);
        assert_eq!(res.body["first_try_correct"], 5);
        assert_eq!(res.body["lucky_seen"], 1);
        assert_eq!(res.body["lucky_first_try_correct"], 1);
        assert!(!res.body["completed_at"].is_null());
    }

    #[tokio::test]
    async fn completed_session_rejects_answers() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        let served = app.play_round(event_id, &token, true).await;
        let session = quiz_session::Entity::find()
            .filter(quiz_session::Column::UserId.eq("alice"))
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();

        let res = app.answer(session.id, &served[0], true, &token).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.code(), "INVALID_SESSION_STATE");
    }

    #[tokio::test]
    async fn rounds_never_repeat_questions_until_limit() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");

        let mut seen = HashSet::new();
        for _ in 0..3 {
            for question in app.play_round(event_id, &token, true).await {
                assert!(
                    seen.insert(question["id"].as_i64().unwrap()),
                    "question {} served twice",
                    question["id"]
                );
            }
        }
        assert_eq!(seen.len(), 15);

        let res = app.start_session(event_id, &token).await;
        assert_eq!(res.status, 409);
        assert_eq!(res.code(), "ROUND_LIMIT_REACHED");

        let rounds: Vec<i32> = quiz_session::Entity::find()
            .filter(quiz_session::Column::UserId.eq("alice"))
            .all(&app.db)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.round)
            .collect();
        assert_eq!(rounds.len(), 3);
        assert!(rounds.contains(&1) && rounds.contains(&2) && rounds.contains(&3));
    }

    #[tokio::test]
    async fn answer_after_event_end_still_accepted() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        let started = app.start_session(event_id, &token).await;

        app.db
            .execute_unprepared(&format!(
                "UPDATE event SET end_time = NOW() - INTERVAL '1 minute' WHERE id = {event_id}"
            ))
            .await
            .unwrap();

        let res = app
            .answer(started.session_id(), &started.body["first_question"], true, &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
    }
}

mod cancelling {
    use super::*;

    #[tokio::test]
    async fn cancel_discards_answers_and_frees_the_round() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        let started = app.start_session(event_id, &token).await;
        let session_id = started.session_id();
        let res = app
            .answer(session_id, &started.body["first_question"], true, &token)
            .await;
        app.answer(session_id, &res.body["next_question"], true, &token)
            .await;

        let res = app
            .delete_with_token(&routes::session(session_id), &token)
            .await;
        assert_eq!(res.status, 204, "{}", res.text);

        assert!(
            quiz_session::Entity::find_by_id(session_id)
                .one(&app.db)
                .await
                .unwrap()
                .is_none()
        );
        let answers = answer::Entity::find()
            .filter(answer::Column::SessionId.eq(session_id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(answers, 0);

        let res = app.start_session(event_id, &token).await;
        assert_eq!(res.status, 201);
        assert_eq!(res.body["round"], 1);
    }

    #[tokio::test]
    async fn cancel_other_users_session_forbidden() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let started = app.start_session(event_id, &app.token("alice")).await;

        let res = app
            .delete_with_token(&routes::session(started.session_id()), &app.token("bob"))
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn cancel_completed_session_rejected() {
        let app = TestApp::spawn().await;
        let event_id = app.create_standard_event(EventSeed::default()).await;
        let token = app.token("alice");
        app.play_round(event_id, &token, true).await;
        let session = quiz_session::Entity::find()
            .filter(quiz_session::Column::UserId.eq("alice"))
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();

        let res = app
            .delete_with_token(&routes::session(session.id), &token)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.code(), "INVALID_SESSION_STATE");
    }

    #[tokio::test]
    async fn cancel_unknown_session_not_found() {
        let app = TestApp::spawn().await;
        let res = app
            .delete_with_token(&routes::session(424_242), &app.token("alice"))
            .await;
        assert_eq!(res.status, 404);
    }
}
