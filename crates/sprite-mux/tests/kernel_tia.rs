//! The kernel driven against the TIA model: placement, drawing, collisions.

use atari_tia::{Tia, argb, regs};
use sprite_mux::hpos::IN_KERNEL;
use sprite_mux::{Background, Engine, Model, ModelCatalog, MuxConfig, PlayfieldRow, Style};

const COLOUR: u8 = 0x1E;

fn engine() -> Engine {
    let catalog = ModelCatalog::new(vec![Model::solid(&[0xFF; 8], COLOUR)]);
    Engine::new(MuxConfig::default(), catalog).expect("valid engine")
}

/// Framebuffer row showing sprite line `y`.
fn row(engine: &Engine, y: u8) -> usize {
    usize::from(y - engine.config().y_offset)
}

fn lit(tia: &Tia, x: usize, row: usize) -> bool {
    tia.pixel(x, row) == argb(COLOUR)
}

#[test]
fn blanking_placement_hits_every_column() {
    for x in [0u8, 1, 3, 7, 11, 40, 79, 80, 133, 152, 159] {
        let mut e = engine();
        e.new_sprite(0, x, 100, Style::empty()).expect("new");
        let mut tia = Tia::new(192);
        e.run_frame(&mut tia);
        assert_eq!(tia.player_position(0), x, "column {x}");
    }
}

#[test]
fn in_kernel_placement_hits_reachable_columns() {
    for x in [0u8, 1, 11, 18, 40, 77, 100, 133, 159] {
        assert!(IN_KERNEL.positioning_for(x).is_some());
        let mut e = engine();
        e.new_sprite(0, 30, 40, Style::empty()).expect("new");
        e.new_sprite(0, 60, 44, Style::empty()).expect("new");
        let late = e.new_sprite(0, x, 120, Style::empty()).expect("new");
        let mut tia = Tia::new(192);
        let report = e.run_frame(&mut tia);
        assert_eq!(report.repositions, 1);
        assert!(report.drawn.contains(&late));
        assert_eq!(tia.player_position(0), x, "column {x}");
    }
}

#[test]
fn sprite_is_drawn_on_exactly_its_lines() {
    let mut e = engine();
    e.new_sprite(0, 50, 100, Style::empty()).expect("new");
    let mut tia = Tia::new(192);
    e.run_frame(&mut tia);

    let top = row(&e, 100);
    for r in top..top + 8 {
        for x in 50..58 {
            assert!(lit(&tia, x, r), "({x}, {r}) should be lit");
        }
        assert!(!lit(&tia, 49, r));
        assert!(!lit(&tia, 58, r));
    }
    assert!((0..160).all(|x| !lit(&tia, x, top - 1)));
    assert!((0..160).all(|x| !lit(&tia, x, top + 8)));
}

#[test]
fn reused_channel_draws_both_occupants() {
    let mut e = engine();
    e.new_sprite(0, 20, 40, Style::empty()).expect("new");
    e.new_sprite(0, 70, 44, Style::empty()).expect("new");
    e.new_sprite(0, 120, 150, Style::empty()).expect("new");
    let mut tia = Tia::new(192);
    e.run_frame(&mut tia);

    assert!(lit(&tia, 20, row(&e, 40)));
    assert!(lit(&tia, 70, row(&e, 44)));
    assert!(lit(&tia, 120, row(&e, 150)));
    assert!(lit(&tia, 127, row(&e, 157)));
    // The old occupant is gone once the channel moved on.
    assert!(!lit(&tia, 20, row(&e, 150)));
}

#[test]
fn partly_visible_sprite_at_the_top_is_clipped() {
    let mut e = engine();
    let y_offset = e.config().y_offset;
    e.new_sprite(0, 60, y_offset - 3, Style::empty()).expect("new");
    let mut tia = Tia::new(192);
    let report = e.run_frame(&mut tia);
    assert_eq!(report.drawn.len(), 1);
    for r in 0..5 {
        assert!(lit(&tia, 60, r));
    }
    assert!(!lit(&tia, 60, 5));
}

#[test]
fn playfield_contact_sets_sticky_flag() {
    let mut e = engine();
    e.init(Background::new(vec![PlayfieldRow::new(0x10, 0x00, 0x00)]));
    let wall = e.new_sprite(0, 0, 80, Style::empty()).expect("new");
    let clear = e.new_sprite(0, 80, 80, Style::empty()).expect("new");
    let mut tia = Tia::new(192);
    e.run_frame(&mut tia);

    assert_eq!(e.take_collisions(wall), Ok(Style::HIT_PLAYFIELD));
    assert_eq!(e.take_collisions(clear), Ok(Style::empty()));
    assert_eq!(e.take_collisions(wall), Ok(Style::empty()));
}

#[test]
fn sprites_touching_each_other_both_record_it() {
    let mut e = engine();
    let a = e.new_sprite(0, 60, 80, Style::empty()).expect("new");
    let b = e.new_sprite(0, 64, 84, Style::empty()).expect("new");
    let far = e.new_sprite(0, 60, 160, Style::empty()).expect("new");
    let mut tia = Tia::new(192);
    e.run_frame(&mut tia);

    assert_eq!(e.take_collisions(a), Ok(Style::HIT_SPRITE));
    assert_eq!(e.take_collisions(b), Ok(Style::HIT_SPRITE));
    assert_eq!(e.take_collisions(far), Ok(Style::empty()));
}

#[test]
fn collisions_survive_until_taken() {
    let mut e = engine();
    e.init(Background::new(vec![PlayfieldRow::new(0x10, 0x00, 0x00)]));
    let wall = e.new_sprite(0, 0, 80, Style::REFLECT).expect("new");
    let mut tia = Tia::new(192);
    e.run_frame(&mut tia);
    e.move_sprite(wall, 80, 80).expect("move");
    e.run_frame(&mut tia);
    assert_eq!(
        e.sprite(wall).map(|s| s.style),
        Ok(Style::REFLECT | Style::HIT_PLAYFIELD)
    );
}

#[test]
fn frame_has_standard_line_counts() {
    let mut e = engine();
    e.new_sprite(0, 50, 100, Style::empty()).expect("new");
    let mut tia = Tia::new(192);
    tia.enable_write_log();
    e.run_frame(&mut tia);

    assert_eq!(tia.rows_rendered(), 192);
    // VSYNC resets the line counter; every other line ends in WSYNC.
    let wsyncs = tia
        .write_log()
        .iter()
        .filter(|w| w.address == regs::WSYNC)
        .count();
    assert_eq!(wsyncs, 3 + 37 + 192 + 30);
    assert_eq!(tia.line(), 3 + 37 + 192 + 30);
}

#[test]
fn every_write_lands_inside_its_line() {
    let mut e = engine();
    for i in 0..8u8 {
        e.new_sprite(0, 15 + i * 17, 40 + i * 19, Style::empty())
            .expect("new");
    }
    let mut tia = Tia::new(192);
    tia.enable_write_log();
    for _ in 0..3 {
        tia.clear_write_log();
        let report = e.run_frame(&mut tia);
        assert_eq!(report.overruns, 0);
        assert!(tia.write_log().iter().all(|w| w.cycle < 76));
    }
}

#[test]
fn double_width_style_reaches_the_tia() {
    let mut e = engine();
    e.new_sprite(0, 40, 100, Style::DOUBLE).expect("new");
    let mut tia = Tia::new(192);
    e.run_frame(&mut tia);
    let r = row(&e, 100);
    assert!(lit(&tia, 40, r));
    assert!(lit(&tia, 55, r));
    assert!(!lit(&tia, 56, r));
}
