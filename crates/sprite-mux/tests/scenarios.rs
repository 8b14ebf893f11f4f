//! Registry, index and scheduling behaviour through the public engine API.

use atari_tia::Tia;
use sprite_mux::overlap::overlap_counts;
use sprite_mux::timing::{LINE_CYCLES, worst_case_line};
use sprite_mux::{Engine, Model, ModelCatalog, MuxConfig, MuxError, SpriteId, Style};

fn engine_with(config: MuxConfig) -> Engine {
    let catalog = ModelCatalog::new(vec![Model::solid(&[0xFF; 8], 0x1E)]);
    Engine::new(config, catalog).expect("valid engine")
}

fn engine() -> Engine {
    engine_with(MuxConfig::default())
}

fn ys(engine: &Engine) -> Vec<u8> {
    engine.yorder().entries().iter().map(|e| e.y).collect()
}

fn overlaps(engine: &Engine) -> Vec<u8> {
    engine
        .yorder()
        .ids()
        .map(|id| engine.overlap(id).expect("live"))
        .collect()
}

/// Overlap straight from its definition: later entries within one interval.
fn overlaps_by_definition(engine: &Engine) -> Vec<u8> {
    let interval = engine.config().interval();
    let entries = engine.yorder().entries();
    entries
        .iter()
        .enumerate()
        .map(|(p, e)| {
            entries[p + 1..]
                .iter()
                .filter(|later| u16::from(later.y) <= u16::from(e.y) + interval)
                .count() as u8
        })
        .collect()
}

/// Small deterministic generator for operation sequences.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.0 >> 8
    }

    fn below(&mut self, n: u32) -> u32 {
        self.next() % n
    }
}

#[test]
fn evenly_spaced_sprites_overlap_their_next_neighbour() {
    let mut e = engine();
    for y in [0, 10, 20, 30] {
        e.new_sprite(0, 40, y, Style::empty()).expect("new");
    }
    e.recompute_overlap();
    assert_eq!(e.config().interval(), 12);
    assert_eq!(overlaps(&e), vec![1, 1, 1, 0]);
}

#[test]
fn moved_sprite_rebubbles_and_overlap_matches_definition() {
    let mut e = engine();
    let ids: Vec<SpriteId> = [0, 10, 20, 30]
        .into_iter()
        .map(|y| e.new_sprite(0, 40, y, Style::empty()).expect("new"))
        .collect();
    e.move_sprite(ids[1], 40, 25).expect("move");
    assert_eq!(ys(&e), vec![0, 20, 25, 30]);
    assert_eq!(
        e.yorder().ids().collect::<Vec<_>>(),
        vec![ids[0], ids[2], ids[1], ids[3]]
    );

    e.recompute_overlap();
    assert_eq!(overlaps(&e), overlaps_by_definition(&e));
    assert_eq!(
        overlaps(&e),
        overlap_counts(e.yorder().entries(), e.config().interval())
    );
    assert_eq!(overlaps(&e).last(), Some(&0));
}

#[test]
fn full_registry_rejects_new_and_is_unchanged() {
    let mut e = engine();
    let capacity = e.config().capacity;
    for i in 0..capacity {
        e.new_sprite(0, 10, (i * 7) as u8, Style::empty()).expect("new");
    }
    let before: Vec<_> = e.yorder().entries().to_vec();
    assert_eq!(
        e.new_sprite(0, 10, 99, Style::empty()),
        Err(MuxError::CapacityExceeded { capacity })
    );
    assert_eq!(e.len(), capacity);
    assert_eq!(e.yorder().entries(), &before[..]);
}

#[test]
fn deleted_handle_is_reused_and_index_holds_survivors() {
    let mut e = engine();
    let a = e.new_sprite(0, 10, 50, Style::empty()).expect("new");
    let b = e.new_sprite(0, 10, 30, Style::empty()).expect("new");
    let c = e.new_sprite(0, 10, 70, Style::empty()).expect("new");
    e.delete_sprite(b).expect("delete");
    assert_eq!(e.yorder().ids().collect::<Vec<_>>(), vec![a, c]);

    let d = e.new_sprite(0, 10, 60, Style::empty()).expect("new");
    assert_eq!(d, b);
    assert_eq!(e.yorder().ids().collect::<Vec<_>>(), vec![a, d, c]);
    assert!(e.yorder().is_sorted());
}

#[test]
fn late_second_candidate_is_deferred_and_considered_first_next_frame() {
    let mut e = engine();
    let a = e.new_sprite(0, 30, 52, Style::empty()).expect("new");
    let b = e.new_sprite(0, 60, 52, Style::empty()).expect("new");
    let c = e.new_sprite(0, 90, 64, Style::empty()).expect("new");
    let d = e.new_sprite(0, 120, 64, Style::empty()).expect("new");
    let mut tia = Tia::new(192);

    // A and B end on the same band; C takes the first free channel and D's
    // first line has passed by the time the second one could be set up.
    let report = e.run_frame(&mut tia);
    assert_eq!(report.considered, vec![a, b, c, d]);
    assert_eq!(report.drawn, vec![a, b, c]);
    assert_eq!(report.deferred, vec![d]);
    assert_eq!(e.is_deferred(d), Ok(true));

    let report = e.run_frame(&mut tia);
    assert_eq!(report.considered.first(), Some(&d));
    assert!(report.drawn.contains(&d));
    assert_eq!(e.is_deferred(d), Ok(false));
}

#[test]
fn random_operations_keep_index_sorted_and_count_conserved() {
    let mut e = engine();
    let mut rng = Lcg(0x2600);
    let mut live: Vec<SpriteId> = Vec::new();
    let mut news = 0usize;
    let mut deletes = 0usize;
    let mut tia = Tia::new(192);

    for round in 0..400 {
        match rng.below(4) {
            0 | 1 => match e.new_sprite(0, rng.below(160) as u8, rng.below(240) as u8, Style::empty()) {
                Ok(id) => {
                    news += 1;
                    live.push(id);
                }
                Err(err) => {
                    assert_eq!(live.len(), e.config().capacity);
                    assert!(matches!(err, MuxError::CapacityExceeded { .. }));
                }
            },
            2 if !live.is_empty() => {
                let id = live.swap_remove(rng.below(live.len() as u32) as usize);
                e.delete_sprite(id).expect("delete live");
                deletes += 1;
            }
            _ if !live.is_empty() => {
                let id = live[rng.below(live.len() as u32) as usize];
                let y = e.sprite(id).expect("live").y;
                let dy = rng.below(9) as i16 - 4;
                let y = (i16::from(y) + dy).clamp(0, 240) as u8;
                e.move_sprite(id, rng.below(160) as u8, y).expect("move live");
            }
            _ => {}
        }

        assert!(e.yorder().is_sorted(), "round {round}");
        assert_eq!(e.len(), news - deletes);
        assert_eq!(e.yorder().len(), e.len());
        assert!(e.len() <= sprite_mux::MAX_SPRITES);
        for id in e.yorder().ids() {
            assert!(live.contains(&id));
        }

        if round % 10 == 0 {
            let report = e.run_frame(&mut tia);
            assert_eq!(report.overruns, 0);
            assert!(report.worst_line_cycles <= LINE_CYCLES.get());
        }
    }
}

#[test]
fn move_leaves_other_sprites_in_relative_order() {
    let mut e = engine();
    let mut rng = Lcg(77);
    let ids: Vec<SpriteId> = (0..10)
        .map(|_| {
            e.new_sprite(0, 0, rng.below(60) as u8, Style::empty())
                .expect("new")
        })
        .collect();

    for _ in 0..200 {
        let mover = ids[rng.below(ids.len() as u32) as usize];
        let others_before: Vec<SpriteId> = e.yorder().ids().filter(|&id| id != mover).collect();
        let y = e.sprite(mover).expect("live").y;
        let y = (i16::from(y) + rng.below(13) as i16 - 6).clamp(0, 80) as u8;
        let x = rng.below(160) as u8;
        e.move_sprite(mover, x, y).expect("move");

        let others_after: Vec<SpriteId> = e.yorder().ids().filter(|&id| id != mover).collect();
        assert_eq!(others_before, others_after);
        assert_eq!(e.sprite(mover).map(|s| (s.x, s.y)), Ok((x, y)));
        assert!(e.yorder().is_sorted());
    }
}

#[test]
fn deferred_sprites_near_the_top_come_first_under_sustained_overload() {
    let mut e = engine();
    // Six sprites packed into 24 lines: two channels cannot show them all.
    for i in 0..6u8 {
        e.new_sprite(0, 20 + i * 20, 80 + i * 4, Style::empty())
            .expect("new");
    }
    let limit = 80 + e.config().interval();
    let mut tia = Tia::new(192);
    let mut previous = e.run_frame(&mut tia);
    assert!(!previous.deferred.is_empty());

    for _ in 0..12 {
        // Deferred sprites that compete with the top one for a channel are
        // bound in blank ahead of it, in Y-order.
        let mut competing: Vec<(u8, SpriteId)> = previous
            .deferred
            .iter()
            .map(|&id| (e.sprite(id).expect("live").y, id))
            .filter(|&(y, _)| u16::from(y) <= limit)
            .collect();
        competing.sort_unstable();
        let expected: Vec<SpriteId> = competing.iter().take(2).map(|&(_, id)| id).collect();

        let report = e.run_frame(&mut tia);
        assert_eq!(report.considered[..expected.len()], expected[..]);
        for id in &report.drawn {
            assert_eq!(e.deferred_streak(*id), Ok(0));
        }
        previous = report;
    }
}

#[test]
fn blank_only_sprite_is_bound_ahead_of_the_top_pair() {
    let mut e = engine();
    let a = e.new_sprite(0, 30, 72, Style::empty()).expect("new");
    let b = e.new_sprite(0, 60, 76, Style::empty()).expect("new");
    // Column 5 is out of in-kernel reach, so C is deferred on the first frame.
    let c = e.new_sprite(0, 5, 150, Style::empty()).expect("new");
    let mut tia = Tia::new(192);
    let report = e.run_frame(&mut tia);
    assert_eq!(report.drawn, vec![a, b]);
    assert_eq!(report.deferred, vec![c]);

    // Only blank can reach C, so it is bound there ahead of A.
    let report = e.run_frame(&mut tia);
    assert_eq!(report.considered[..2], [c, a]);
    assert!(report.drawn.contains(&c));

    // B lost its channel to C and is bound first next frame; C, now in
    // reach, is picked up by the kernel once the top pair is done.
    e.move_sprite(c, 90, 150).expect("move");
    let report = e.run_frame(&mut tia);
    assert_eq!(report.considered, vec![b, a, c]);
    assert_eq!(report.drawn.len(), 3);
    assert!(report.deferred.is_empty());
}

#[test]
fn every_sprite_is_eventually_drawn_when_overload_is_not_sustained() {
    let mut e = engine();
    let ids: Vec<SpriteId> = (0..4u8)
        .map(|i| {
            e.new_sprite(0, 30 + i * 30, 100, Style::empty())
                .expect("new")
        })
        .collect();
    let mut tia = Tia::new(192);
    let mut seen = Vec::new();
    for _ in 0..4 {
        let report = e.run_frame(&mut tia);
        seen.extend(report.drawn);
    }
    for id in ids {
        assert!(seen.contains(&id), "{id} never drawn");
    }
}

#[test]
fn worst_case_line_fits_the_scanline() {
    assert!(worst_case_line().fits_within(LINE_CYCLES));
}

#[test]
fn config_from_json_drives_geometry() {
    let config = MuxConfig::from_json(r#"{"capacity": 4, "visible_lines": 100}"#).expect("json");
    let mut e = engine_with(config);
    for y in 0..4 {
        e.new_sprite(0, 10, 40 + y * 20, Style::empty()).expect("new");
    }
    assert!(matches!(
        e.new_sprite(0, 10, 40, Style::empty()),
        Err(MuxError::CapacityExceeded { capacity: 4 })
    ));
    let mut tia = Tia::new(100);
    let report = e.run_frame(&mut tia);
    assert_eq!(tia.rows_rendered(), 100);
    assert_eq!(report.overruns, 0);
}
