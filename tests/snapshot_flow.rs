use image::{Rgba, RgbaImage};
use sheetforge::config::AppConfig;
use sheetforge::snapshot::OutputPhase;
use sheetforge::Session;
use std::io::Cursor;

fn png_bytes(width: u32, height: u32, tint: u8) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([tint, 50, 50, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png).expect("encode png");
    bytes
}

fn session_with(count: usize) -> Session {
    let mut session = Session::new(AppConfig::default());
    for i in 0..count {
        session.add_image_bytes(format!("img-{i}.png"), png_bytes(20, 20, i as u8 + 1));
    }
    session.resolve_pending_loads();
    session
}

#[test]
fn preview_is_blocked_below_the_minimum() {
    let mut session = session_with(7);
    assert!(session.update_preview_blocked().is_some());
    let err = session.update_preview().unwrap_err();
    assert!(err.to_string().contains("at least 8 images"), "error should carry the reason");
    assert_eq!(session.phase(), OutputPhase::Empty);
}

#[test]
fn live_edits_do_not_touch_the_captured_surface() {
    let mut session = session_with(8);
    session.set_scale(100);
    session.update_preview().expect("update preview");
    let before = session.surface().expect("surface").digest_hex();

    // Continuous UI edits: reorder, slider drags, even removals. None of
    // them may move the output.
    session.reorder_image(0, 7);
    session.set_scale(400);
    session.set_frame_seconds(0.3);
    session.remove_image(0);
    assert_eq!(session.registry().len(), 7);
    let after = session.surface().expect("surface").digest_hex();
    assert_eq!(before, after, "output reflects the snapshot, not live state");

    // The next explicit preview, however, sees the shrunk registry.
    assert!(session.update_preview_blocked().is_some());
}

#[test]
fn reordering_changes_content_but_not_cell_size() {
    let mut session = session_with(8);
    session.set_scale(100);
    session.update_preview().expect("first preview");
    let first_digest = session.surface().expect("surface").digest_hex();
    let first_layout = session.report().expect("report").layout;

    session.reorder_image(0, 7);
    session.update_preview().expect("second preview");
    let second_digest = session.surface().expect("surface").digest_hex();
    let second_layout = session.report().expect("report").layout;

    assert_eq!(first_layout.cell_width, second_layout.cell_width);
    assert_eq!(first_layout.cell_height, second_layout.cell_height);
    assert_ne!(first_digest, second_digest, "cell contents moved with the reorder");
}

#[test]
fn reset_discards_output_but_not_the_registry() {
    let mut session = session_with(10);
    session.update_preview().expect("update preview");
    session.simulate_animation().expect("simulate animation");
    assert_eq!(session.phase(), OutputPhase::Animating);
    assert!(session.animation_result().is_some());

    session.reset_output();
    assert_eq!(session.phase(), OutputPhase::Empty);
    assert!(session.surface().is_none());
    assert!(session.animation_result().is_none());
    assert_eq!(session.registry().len(), 10, "reset must leave the live registry alone");

    // The session recovers with a fresh preview.
    session.update_preview().expect("preview after reset");
    assert_eq!(session.phase(), OutputPhase::StaticReady);
}

#[test]
fn simulation_requires_a_static_snapshot() {
    let mut session = session_with(8);
    let err = session.simulate_animation().unwrap_err();
    assert!(err.to_string().contains("update the preview"), "error should carry the reason");

    session.update_preview().expect("update preview");
    assert!(session.simulate_blocked().is_none());
    session.simulate_animation().expect("simulate animation");
    let result = session.animation_result().expect("animation result");
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.encoded_rows(), 1);
}

#[test]
fn animation_uses_the_snapshot_not_live_sliders() {
    let mut session = session_with(8);
    session.set_frame_seconds(0.2);
    session.update_preview().expect("update preview");
    session.simulate_animation().expect("simulate animation");
    let first = session.animation_result().expect("result").frame_seconds;
    assert!((first - 0.2).abs() < f32::EPSILON);

    // Dragging the speed slider after the fact changes nothing until the
    // next explicit simulation.
    session.set_frame_seconds(0.5);
    let unchanged = session.animation_result().expect("result").frame_seconds;
    assert!((unchanged - 0.2).abs() < f32::EPSILON);

    session.simulate_animation().expect("second simulation");
    let second = session.animation_result().expect("result").frame_seconds;
    assert!((second - 0.5).abs() < f32::EPSILON);
}
