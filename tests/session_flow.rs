//! End-to-end session tests driving the service layer directly with fake
//! connections, on a paused clock so grace periods and answer timeouts run
//! instantly.

use std::time::Duration;

use axum::extract::ws::Message;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use uuid::Uuid;

use game_night_back::{
    config::AppConfig,
    services::session_service,
    state::{AppState, SharedState},
};

fn test_state() -> SharedState {
    AppState::new(AppConfig::default())
}

/// Register a fake connection and capture its outbound frames.
fn connect(state: &SharedState) -> (Uuid, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = Uuid::new_v4();
    state.connections().register(id, tx);
    (id, rx)
}

/// Pull every frame queued so far, parsed as JSON.
fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Value> {
    let mut out = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Message::Text(text) = message {
            out.push(serde_json::from_str(&text).expect("server frames are JSON"));
        }
    }
    out
}

fn last_of<'a>(messages: &'a [Value], kind: &str) -> Option<&'a Value> {
    messages.iter().rev().find(|m| m["type"] == kind)
}

fn count_of(messages: &[Value], kind: &str) -> usize {
    messages.iter().filter(|m| m["type"] == kind).count()
}

/// Create a room as `host` and return its code from the `room:created` reply.
async fn open_room(
    state: &SharedState,
    host: Uuid,
    rx: &mut mpsc::UnboundedReceiver<Message>,
    game_type: Option<&str>,
) -> String {
    session_service::create_room(state, host, game_type.map(str::to_string))
        .await
        .expect("room creation succeeds");
    let messages = drain(rx);
    last_of(&messages, "room:created").expect("room:created reply")["data"]["code"]
        .as_str()
        .expect("room code")
        .to_string()
}

#[tokio::test(start_paused = true)]
async fn full_buzzin_session_runs_to_completion() {
    let state = test_state();
    let (host, mut host_rx) = connect(&state);
    let (player, mut player_rx) = connect(&state);

    session_service::set_name(&state, host, Some("Quinn".into()))
        .await
        .unwrap();
    let code = open_room(&state, host, &mut host_rx, Some("buzzin")).await;

    // Codes are normalized, so a lowercase padded code still lands.
    session_service::join_room(
        &state,
        player,
        Some(format!("  {} ", code.to_lowercase())),
        Some("Mo".into()),
    )
    .await
    .unwrap();
    let joined = drain(&mut player_rx);
    let room = &last_of(&joined, "room:state").unwrap()["data"];
    assert_eq!(room["code"], code);
    assert_eq!(room["players"].as_array().unwrap().len(), 2);

    session_service::start_game(
        &state,
        host,
        None,
        None,
        json!({"categories": ["science"], "questionCount": 5}),
    )
    .await
    .unwrap();
    let after_start = drain(&mut player_rx);
    assert_eq!(
        last_of(&after_start, "game:started").unwrap()["data"]["gameType"],
        "buzzin"
    );
    let game = &last_of(&after_start, "game:state").unwrap()["data"];
    assert_eq!(game["phase"], "waiting");
    assert_eq!(game["totalQuestions"], 5);

    // First round spelled out: reveal, buzz, judge correct, advance.
    session_service::game_event(&state, host, None, "host:showQuestion", &Value::Null).await;
    session_service::game_event(&state, player, None, "player:buzz", &Value::Null).await;
    let after_buzz = drain(&mut host_rx);
    let buzz = last_of(&after_buzz, "game:event").unwrap();
    assert_eq!(buzz["data"]["type"], "buzz");
    assert_eq!(buzz["data"]["playerId"], player.to_string());

    session_service::game_event(&state, host, None, "host:judgeAnswer", &json!({"correct": true}))
        .await;
    let after_judge = drain(&mut player_rx);
    let correct = last_of(&after_judge, "game:event").unwrap();
    assert_eq!(correct["data"]["type"], "correct");
    assert_eq!(correct["data"]["points"], 100);
    assert_eq!(
        last_of(&after_judge, "game:state").unwrap()["data"]["phase"],
        "result"
    );
    session_service::game_event(&state, host, None, "host:nextQuestion", &Value::Null).await;

    for _ in 1..5 {
        session_service::game_event(&state, host, None, "host:showQuestion", &Value::Null).await;
        session_service::game_event(&state, player, None, "player:buzz", &Value::Null).await;
        session_service::game_event(
            &state,
            host,
            None,
            "host:judgeAnswer",
            &json!({"correct": true}),
        )
        .await;
        session_service::game_event(&state, host, None, "host:nextQuestion", &Value::Null).await;
    }

    let finale = drain(&mut player_rx);
    let ended = last_of(&finale, "game:ended").unwrap();
    assert_eq!(ended["data"]["gameType"], "buzzin");
    assert_eq!(ended["data"]["reason"], "completed");

    let final_state = last_of(&finale, "game:state").unwrap();
    assert_eq!(final_state["data"]["phase"], "end");
    let scores = final_state["data"]["scores"].as_array().unwrap();
    let mo = scores.iter().find(|s| s["name"] == "Mo").unwrap();
    assert_eq!(mo["score"], 500);

    // The room survives the game and returns to a startable state.
    let core = state.core().await;
    let room = core.rooms.get_room(&code).unwrap();
    assert_eq!(
        serde_json::to_value(room.phase).unwrap(),
        json!("ended")
    );
}

#[tokio::test(start_paused = true)]
async fn empty_room_survives_the_grace_period_then_expires() {
    let state = test_state();
    let (host, mut host_rx) = connect(&state);
    let code = open_room(&state, host, &mut host_rx, None).await;

    session_service::disconnect(&state, host).await;
    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(state.room_count().await, 1, "room must outlive 9 seconds");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(state.room_count().await, 0, "room must be gone after 11 seconds");
    let core = state.core().await;
    assert!(core.rooms.get_room(&code).is_none());
}

#[tokio::test(start_paused = true)]
async fn rejoining_within_the_grace_period_rescues_the_room() {
    let state = test_state();
    let (host, mut host_rx) = connect(&state);
    let code = open_room(&state, host, &mut host_rx, None).await;

    session_service::disconnect(&state, host).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let (rejoiner, _rejoiner_rx) = connect(&state);
    session_service::join_room(&state, rejoiner, Some(code.clone()), Some("Back".into()))
        .await
        .unwrap();

    // Well past the original deadline; the join must have disarmed it.
    tokio::time::sleep(Duration::from_secs(20)).await;
    let core = state.core().await;
    let room = core.rooms.get_room(&code).expect("room was rescued");
    assert_eq!(room.host_connection_id, rejoiner);
    assert!(room.players[&rejoiner].is_host);
}

#[tokio::test(start_paused = true)]
async fn host_disconnect_promotes_the_next_player_in_join_order() {
    let state = test_state();
    let (host, mut host_rx) = connect(&state);
    let (second, mut second_rx) = connect(&state);
    let (third, _third_rx) = connect(&state);
    let code = open_room(&state, host, &mut host_rx, None).await;

    session_service::join_room(&state, second, Some(code.clone()), Some("Second".into()))
        .await
        .unwrap();
    session_service::join_room(&state, third, Some(code.clone()), Some("Third".into()))
        .await
        .unwrap();
    drain(&mut second_rx);

    session_service::disconnect(&state, host).await;
    let messages = drain(&mut second_rx);
    let room = &last_of(&messages, "room:state").unwrap()["data"];
    assert_eq!(room["hostConnectionId"], second.to_string());
    assert_eq!(room["players"].as_array().unwrap().len(), 2);
    assert_eq!(count_of(&messages, "room:closed"), 0);
}

#[tokio::test(start_paused = true)]
async fn unanswered_buzz_times_out_with_a_single_penalty() {
    let state = test_state();
    let (host, mut host_rx) = connect(&state);
    let (player, mut player_rx) = connect(&state);
    let code = open_room(&state, host, &mut host_rx, Some("buzzin")).await;
    session_service::join_room(&state, player, Some(code), Some("Mo".into()))
        .await
        .unwrap();
    session_service::start_game(
        &state,
        host,
        None,
        None,
        json!({"categories": ["science"], "questionCount": 5}),
    )
    .await
    .unwrap();

    session_service::game_event(&state, host, None, "host:showQuestion", &Value::Null).await;
    session_service::game_event(&state, player, None, "player:buzz", &Value::Null).await;
    drain(&mut player_rx);

    tokio::time::sleep(Duration::from_secs(31)).await;
    let messages = drain(&mut player_rx);
    let timeout = last_of(&messages, "game:event").unwrap();
    assert_eq!(timeout["data"]["type"], "timeout");
    assert_eq!(timeout["data"]["playerId"], player.to_string());
    assert_eq!(timeout["data"]["points"], -25);
    assert_eq!(count_of(&messages, "game:event"), 1, "penalty fires once");

    let game = &last_of(&messages, "game:state").unwrap()["data"];
    assert_eq!(game["phase"], "result");
    let scores = game["scores"].as_array().unwrap();
    let mo = scores.iter().find(|s| s["name"] == "Mo").unwrap();
    assert_eq!(mo["score"], -25);
}

#[tokio::test(start_paused = true)]
async fn submitting_an_answer_disarms_the_timeout() {
    let state = test_state();
    let (host, mut host_rx) = connect(&state);
    let (player, mut player_rx) = connect(&state);
    let code = open_room(&state, host, &mut host_rx, Some("buzzin")).await;
    session_service::join_room(&state, player, Some(code), Some("Mo".into()))
        .await
        .unwrap();
    session_service::start_game(
        &state,
        host,
        None,
        None,
        json!({"categories": ["science"], "questionCount": 5}),
    )
    .await
    .unwrap();

    session_service::game_event(&state, host, None, "host:showQuestion", &Value::Null).await;
    session_service::game_event(&state, player, None, "player:buzz", &Value::Null).await;
    session_service::game_event(&state, player, None, "player:submitAnswer", &Value::Null).await;
    drain(&mut player_rx);

    tokio::time::sleep(Duration::from_secs(60)).await;
    let messages = drain(&mut player_rx);
    assert_eq!(count_of(&messages, "game:event"), 0, "no timeout after submit");

    // The host can still judge at leisure.
    session_service::game_event(&state, host, None, "host:judgeAnswer", &json!({"correct": true}))
        .await;
    let judged = drain(&mut player_rx);
    assert_eq!(
        last_of(&judged, "game:state").unwrap()["data"]["phase"],
        "result"
    );
}

#[tokio::test(start_paused = true)]
async fn late_joiners_receive_a_private_game_snapshot() {
    let state = test_state();
    let (host, mut host_rx) = connect(&state);
    let (player, _player_rx) = connect(&state);
    let code = open_room(&state, host, &mut host_rx, Some("buzzin")).await;
    session_service::join_room(&state, player, Some(code.clone()), Some("Mo".into()))
        .await
        .unwrap();
    session_service::start_game(
        &state,
        host,
        None,
        None,
        json!({"categories": ["science"], "questionCount": 5}),
    )
    .await
    .unwrap();

    let (late, mut late_rx) = connect(&state);
    session_service::join_room(&state, late, Some(code), Some("Late".into()))
        .await
        .unwrap();
    let messages = drain(&mut late_rx);
    let snapshot = last_of(&messages, "game:state").expect("private snapshot");
    assert_eq!(snapshot["data"]["phase"], "waiting");
    assert_eq!(snapshot["data"]["totalQuestions"], 5);
}

#[tokio::test(start_paused = true)]
async fn caller_errors_use_the_protocol_messages() {
    let state = test_state();
    let (host, mut host_rx) = connect(&state);
    let (outsider, _outsider_rx) = connect(&state);

    let err = session_service::join_room(&state, outsider, Some("   ".into()), None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid room code.");

    let err = session_service::join_room(&state, outsider, Some("QQQQ".into()), None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Room not found.");

    let err = session_service::get_state(&state, outsider).await.unwrap_err();
    assert_eq!(err.to_string(), "You are not in a room.");

    let err = session_service::start_game(&state, outsider, None, None, Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "No room associated with this host.");

    let code = open_room(&state, host, &mut host_rx, Some("buzzin")).await;
    session_service::join_room(&state, outsider, Some(code.clone()), Some("Mo".into()))
        .await
        .unwrap();
    let err = session_service::start_game(&state, outsider, Some(code), None, Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Only the host can start the game.");

    let err = session_service::create_room(&state, host, Some("charades".into()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown game type: charades");
}
