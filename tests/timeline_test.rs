//! Playback reconciliation: board, drawings, narration and pauses at a time.

mod common;

use cmf_core::board::STANDARD_START_FEN;
use cmf_core::move_index::position_at;
use cmf_core::traversal::{compute_state_at_node, find_path_to_node};
use cmf_core::{build_move_index, compute_state_at_time, Annotation, EngineConfig, Timeline};
use common::{document, fen_after, line_nodes, move_event};
use serde_json::json;
use std::collections::HashSet;

fn arrow(from: &str, to: &str) -> Annotation {
    Annotation::Arrow {
        from: from.into(),
        to: to.into(),
        color: "yellow".into(),
    }
}

#[test]
fn test_open_center_scenario() {
    let after_e4 = fen_after(STANDARD_START_FEN, &["e4"]);
    let after_e5 = fen_after(STANDARD_START_FEN, &["e4", "e5"]);
    let graph = document(
        line_nodes(&["e4", "e5"]),
        json!([
            move_event(1000, "e4", "e2", "e4", &after_e4),
            move_event(2000, "e5", "e7", "e5", &after_e5),
            { "type": "annotate", "t": 2500, "fen": after_e5, "arrows": [{ "from": "e2", "to": "e4" }] },
            { "type": "text", "t": 3000, "fen": after_e5, "text": "Open center" },
        ]),
        5000,
    );

    let timeline = Timeline::load(&graph, EngineConfig::default()).unwrap();
    let state = timeline.state_at(3500);
    assert_eq!(state.fen, after_e5);
    assert_eq!(state.active_annotations, vec![arrow("e2", "e4")]);
    assert_eq!(state.active_text.as_deref(), Some("Open center"));
    assert!(!state.is_paused);

    // Before anything happens the board is the starting position.
    let start = timeline.state_at(0);
    assert_eq!(start.fen, STANDARD_START_FEN);
    assert!(start.active_annotations.is_empty());
    assert_eq!(start.active_text, None);
}

#[test]
fn test_same_time_gives_same_state() {
    let after_e4 = fen_after(STANDARD_START_FEN, &["e4"]);
    let graph = document(
        line_nodes(&["e4"]),
        json!([
            move_event(100, "e4", "e2", "e4", &after_e4),
            { "type": "annotate", "t": 200, "fen": after_e4, "circles": ["e4"] },
        ]),
        1000,
    );
    let config = EngineConfig::default();
    let first = compute_state_at_time(&graph, 250, &config);
    let second = compute_state_at_time(&graph, 250, &config);
    assert_eq!(first, second);
}

#[test]
fn test_event_exactly_at_cursor_is_included() {
    let after_e4 = fen_after(STANDARD_START_FEN, &["e4"]);
    let graph = document(
        line_nodes(&["e4"]),
        json!([move_event(1000, "e4", "e2", "e4", &after_e4)]),
        2000,
    );
    let config = EngineConfig::default();
    assert_eq!(compute_state_at_time(&graph, 999, &config).fen, STANDARD_START_FEN);
    assert_eq!(compute_state_at_time(&graph, 1000, &config).fen, after_e4);
}

#[test]
fn test_annotations_only_grow_without_clear() {
    let fen = STANDARD_START_FEN;
    let graph = document(
        line_nodes(&[]),
        json!([
            { "type": "annotate", "t": 100, "fen": fen, "arrows": [["e2", "e4"]] },
            { "type": "annotate", "t": 300, "fen": fen, "highlights": [{ "square": "d4", "color": "green" }] },
            { "type": "text", "t": 400, "fen": fen, "text": "watch d4" },
            { "type": "annotate", "t": 600, "fen": fen, "circles": [{ "square": "f7" }], "arrows": [["g1", "f3", "red"]] },
        ]),
        1000,
    );
    let config = EngineConfig::default();

    let times = [0, 100, 250, 300, 500, 600, 1000];
    for pair in times.windows(2) {
        let earlier: HashSet<Annotation> = compute_state_at_time(&graph, pair[0], &config)
            .active_annotations
            .into_iter()
            .collect();
        let later: HashSet<Annotation> = compute_state_at_time(&graph, pair[1], &config)
            .active_annotations
            .into_iter()
            .collect();
        assert!(earlier.is_subset(&later), "annotations shrank between {pair:?}");
    }

    let end = compute_state_at_time(&graph, 1000, &config);
    assert_eq!(end.active_annotations.len(), 4);
    assert!(end.active_annotations.contains(&Annotation::Arrow {
        from: "g1".into(),
        to: "f3".into(),
        color: "red".into(),
    }));
}

#[test]
fn test_clear_empties_annotations() {
    let fen = STANDARD_START_FEN;
    let graph = document(
        line_nodes(&[]),
        json!([
            { "type": "annotate", "t": 500, "fen": fen, "arrows": [{ "from": "e2", "to": "e4" }] },
            { "type": "clear", "t": 500, "fen": fen },
            { "type": "annotate", "t": 900, "fen": fen, "circles": ["e5"] },
            { "type": "clear", "t": 1200, "fen": fen },
        ]),
        2000,
    );
    let config = EngineConfig::default();

    assert!(compute_state_at_time(&graph, 500, &config).active_annotations.is_empty());
    assert!(compute_state_at_time(&graph, 800, &config).active_annotations.is_empty());
    assert_eq!(compute_state_at_time(&graph, 1000, &config).active_annotations.len(), 1);
    assert!(compute_state_at_time(&graph, 1500, &config).active_annotations.is_empty());
}

#[test]
fn test_text_is_replaced_not_accumulated() {
    let fen = STANDARD_START_FEN;
    let graph = document(
        line_nodes(&[]),
        json!([
            { "type": "text", "t": 100, "fen": fen, "text": "first" },
            { "type": "text", "t": 200, "fen": fen, "text": "second" },
        ]),
        1000,
    );
    let config = EngineConfig::default();
    assert_eq!(compute_state_at_time(&graph, 150, &config).active_text.as_deref(), Some("first"));
    assert_eq!(compute_state_at_time(&graph, 250, &config).active_text.as_deref(), Some("second"));
}

#[test]
fn test_navigate_resets_board() {
    let x = fen_after(STANDARD_START_FEN, &["d4", "d5"]);
    let expected = fen_after(&x, &["e4"]);
    let graph = document(
        line_nodes(&[]),
        json!([
            { "type": "navigate", "t": 100, "fen": x, "navigationType": "to_node" },
            move_event(200, "e4", "e2", "e4", &expected),
        ]),
        1000,
    );
    let config = EngineConfig::default();

    assert_eq!(compute_state_at_time(&graph, 150, &config).fen, x);
    assert_eq!(compute_state_at_time(&graph, 250, &config).fen, expected);
}

#[test]
fn test_illegal_move_is_skipped() {
    let after_e4 = fen_after(STANDARD_START_FEN, &["e4"]);
    let after_e5 = fen_after(STANDARD_START_FEN, &["e4", "e5"]);
    let graph = document(
        line_nodes(&["e4", "e5"]),
        json!([
            move_event(100, "e4", "e2", "e4", &after_e4),
            { "type": "move", "t": 150, "san": "Qh5", "fen": "bogus" },
            { "type": "move", "t": 200, "san": "e5", "fen": after_e5 },
            { "type": "text", "t": 300, "fen": after_e5, "text": "still playing" },
        ]),
        1000,
    );
    let state = compute_state_at_time(&graph, 400, &EngineConfig::default());
    assert_eq!(state.fen, after_e5);
    assert_eq!(state.active_text.as_deref(), Some("still playing"));
}

#[test]
fn test_malformed_events_are_skipped_not_fatal() {
    let after_e4 = fen_after(STANDARD_START_FEN, &["e4"]);
    let after_e5 = fen_after(STANDARD_START_FEN, &["e4", "e5"]);
    let graph = document(
        line_nodes(&["e4", "e5"]),
        json!([
            move_event(1000, "e4", "e2", "e4", &after_e4),
            { "type": "annotate", "t": 1200, "fen": after_e4, "arrows": [["e2", "e4"]] },
            { "type": "annotate", "t": 1300, "fen": after_e4, "circles": { "square": "e4" } },
            { "type": "annotate", "t": 1400, "fen": after_e4, "arrows": null, "circles": ["d4"] },
            { "type": "text", "t": 1500, "fen": after_e4, "text": null },
            { "type": "move", "t": 1600, "san": null, "fen": after_e5 },
            { "type": "text", "t": 1700, "fen": after_e4, "text": "Center pawns" },
            move_event(2000, "e5", "e7", "e5", &after_e5),
        ]),
        3000,
    );

    let report = cmf_core::validate(&graph);
    assert_eq!(report.unknown_event_types, 3);

    let timeline = Timeline::load(&graph, EngineConfig::default()).unwrap();
    let state = timeline.state_at(2500);
    assert_eq!(state.fen, after_e5);
    assert_eq!(
        state.active_annotations,
        vec![
            arrow("e2", "e4"),
            Annotation::Circle {
                square: "d4".into(),
                color: "yellow".into(),
            },
        ]
    );
    assert_eq!(state.active_text.as_deref(), Some("Center pawns"));
}

#[test]
fn test_out_of_order_events_replay_in_time_order() {
    let after_e4 = fen_after(STANDARD_START_FEN, &["e4"]);
    let after_e5 = fen_after(STANDARD_START_FEN, &["e4", "e5"]);
    let graph = document(
        line_nodes(&["e4", "e5"]),
        json!([
            move_event(2000, "e5", "e7", "e5", &after_e5),
            { "type": "text", "t": 2500, "fen": after_e5, "text": "late" },
            move_event(1000, "e4", "e2", "e4", &after_e4),
            { "type": "text", "t": 1500, "fen": after_e4, "text": "early" },
        ]),
        3000,
    );
    assert!(!graph.events_sorted());

    let state = compute_state_at_time(&graph, 3000, &EngineConfig::default());
    assert_eq!(state.fen, after_e5);
    assert_eq!(state.active_text.as_deref(), Some("late"));

    let mut sorted = graph.clone();
    sorted.sort_events();
    assert!(sorted.events_sorted());
    assert_eq!(
        compute_state_at_time(&sorted, 3000, &EngineConfig::default()),
        state
    );
}

#[test]
fn test_pause_window_closes() {
    let fen = STANDARD_START_FEN;
    let graph = document(
        line_nodes(&[]),
        json!([{ "type": "pausepoint", "t": 1000, "id": "p1", "fen": fen, "prompt": "Find the best move" }]),
        5000,
    );
    let config = EngineConfig::default();

    assert!(!compute_state_at_time(&graph, 999, &config).is_paused);
    for t in [1000, 1250, 1500] {
        let state = compute_state_at_time(&graph, t, &config);
        assert!(state.is_paused, "expected pause at {t}");
        assert_eq!(state.pause_prompt.as_deref(), Some("Find the best move"));
    }
    let after = compute_state_at_time(&graph, 1600, &config);
    assert!(!after.is_paused);
    assert_eq!(after.pause_prompt, None);

    let wide = EngineConfig {
        pause_window_ms: 1000,
        ..EngineConfig::default()
    };
    assert!(compute_state_at_time(&graph, 1600, &wide).is_paused);
}

#[test]
fn test_move_index_order() {
    let after_e4 = fen_after(STANDARD_START_FEN, &["e4"]);
    let after_e5 = fen_after(STANDARD_START_FEN, &["e4", "e5"]);
    let after_nf3 = fen_after(STANDARD_START_FEN, &["e4", "e5", "Nf3"]);
    let graph = document(
        line_nodes(&["e4", "e5", "Nf3"]),
        json!([
            move_event(1000, "e4", "e2", "e4", &after_e4),
            // Legacy event without coordinates.
            { "type": "move", "t": 2000, "san": "e5", "fen": after_e5 },
            move_event(3000, "Nf3", "g1", "f3", &after_nf3),
        ]),
        4000,
    );

    let index = build_move_index(&graph).unwrap();
    assert_eq!(index.len(), 4);
    assert_eq!(index[0].t, 0);
    assert_eq!(index[0].move_number, 0);
    assert_eq!(index[0].fen, STANDARD_START_FEN);
    assert!(index.windows(2).all(|w| w[0].t <= w[1].t));
    assert_eq!(index[3].fen, after_nf3);
    assert_eq!(index[3].move_number, 2);

    assert_eq!(position_at(&index, 2500).unwrap().fen, after_e5);
}

#[test]
fn test_move_index_rejects_illegal_mainline() {
    let after_e4 = fen_after(STANDARD_START_FEN, &["e4"]);
    let graph = document(
        line_nodes(&["e4"]),
        json!([{ "type": "move", "t": 1000, "san": "e5", "from": "e2", "to": "e5", "fen": after_e4 }]),
        2000,
    );

    let err = build_move_index(&graph).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("e2e5"), "unexpected error: {message}");
    assert!(Timeline::load(&graph, EngineConfig::default()).is_err());
}

#[test]
fn test_node_state_matches_playback() {
    let after_e4 = fen_after(STANDARD_START_FEN, &["e4"]);
    let graph = document(
        line_nodes(&["e4"]),
        json!([
            move_event(100, "e4", "e2", "e4", &after_e4),
            { "type": "annotate", "t": 200, "fen": after_e4, "arrows": [["d2", "d4"]], "circles": ["e4"] },
            { "type": "clear", "t": 300, "fen": after_e4 },
            { "type": "annotate", "t": 400, "fen": after_e4, "highlights": ["f7"] },
            { "type": "text", "t": 450, "fen": after_e4, "text": "target f7" },
            { "type": "pausepoint", "t": 500, "id": "p", "fen": after_e4 },
        ]),
        1000,
    );
    let config = EngineConfig::default();
    let node = graph.node(&after_e4).unwrap();
    let path = find_path_to_node(&graph, &after_e4).unwrap();

    for t in [150, 250, 350, 450, 700, 1001] {
        let playback = compute_state_at_time(&graph, t, &config);
        let explore = compute_state_at_node(&graph, node, &path, t, &config);
        assert_eq!(explore.active_annotations, playback.active_annotations, "at {t}");
        assert_eq!(explore.active_text, playback.active_text, "at {t}");
        assert_eq!(explore.is_paused, playback.is_paused, "at {t}");
    }
}
