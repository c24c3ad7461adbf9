use super::*;
use crate::state::model::ThumbnailMode;

fn canvas() -> Canvas {
    Canvas::new(64, 48).unwrap()
}

#[test]
fn population_is_deterministic_per_seed() {
    let state = GeneratorState::default();
    assert_eq!(populate(&state, canvas()), populate(&state, canvas()));

    let mut other = state.clone();
    other.seed = "different".to_owned();
    assert_ne!(populate(&state, canvas()).sprites, populate(&other, canvas()).sprites);
}

#[test]
fn density_controls_count_and_keeps_earlier_sprites() {
    let mut state = GeneratorState::default();
    state.density = 0.0;
    assert_eq!(populate(&state, canvas()).sprites.len(), 1);
    state.density = 100.0;
    let full = populate(&state, canvas());
    assert_eq!(full.sprites.len(), MAX_SPRITES as usize);

    state.density = 50.0;
    let half = populate(&state, canvas());
    assert_eq!(half.sprites[..], full.sprites[..half.sprites.len()]);
}

#[test]
fn color_suffix_changes_colors_only() {
    let state = GeneratorState::default();
    let mut recolored = state.clone();
    recolored.color_seed_suffix = "b".to_owned();
    let a = populate(&state, canvas());
    let b = populate(&recolored, canvas());
    for (x, y) in a.sprites.iter().zip(&b.sprites) {
        assert_eq!(x.anchor, y.anchor);
        assert_eq!(x.phase, y.phase);
    }
    assert!(a.sprites.iter().zip(&b.sprites).any(|(x, y)| x.jitter != y.jitter));
}

#[test]
fn layers_stay_in_range() {
    let mut state = GeneratorState::default();
    state.layer_count = 2;
    state.density = 100.0;
    assert!(populate(&state, canvas()).sprites.iter().all(|s| s.layer_index < 2));
}

#[test]
fn thumbnail_mode_overrides_population() {
    let mut state = GeneratorState::default();
    state.thumbnail_mode = Some(ThumbnailMode {
        count: 3,
        color_index: 2,
        primary_scale: 2.0,
        ..ThumbnailMode::default()
    });
    let pop = populate(&state, canvas());
    assert_eq!(pop.sprites.len(), 3);
    assert_eq!(pop.sprites[0].anchor, Vec2::new(0.5, 0.5));
    assert_eq!(pop.sprites[0].size, 2.0);
    assert_eq!(pop.sprites[1].color_index, 3);
}

fn sprite_at_center() -> Sprite {
    Sprite {
        anchor: Vec2::new(0.5, 0.5),
        phase: 0.0,
        layer_index: 0,
        size: 1.0,
        color_index: 0,
        jitter: [0.0; 3],
    }
}

#[test]
fn square_covers_its_box() {
    let patch = rasterize(
        &sprite_at_center(),
        &MotionSample::IDENTITY,
        8.0,
        canvas(),
        SpriteShape::Square,
        Rgb8::WHITE,
    )
    .unwrap();
    assert_eq!((patch.x0, patch.y0, patch.width, patch.height), (28, 20, 8, 8));
    assert!(patch.pixels.iter().all(|p| p[3] == 255));
}

#[test]
fn circle_and_diamond_leave_corners_empty() {
    for shape in [SpriteShape::Circle, SpriteShape::Diamond] {
        let patch = rasterize(
            &sprite_at_center(),
            &MotionSample::IDENTITY,
            8.0,
            canvas(),
            shape,
            Rgb8::WHITE,
        )
        .unwrap();
        assert_eq!(patch.pixels[0][3], 0, "{shape:?}");
        let center = (patch.height / 2 * patch.width + patch.width / 2) as usize;
        assert_eq!(patch.pixels[center][3], 255, "{shape:?}");
    }
}

#[test]
fn motion_offsets_by_min_side_and_scale_resizes() {
    let sample = MotionSample {
        offset: Vec2::new(0.25, 0.0),
        scale: 0.5,
    };
    let patch = rasterize(
        &sprite_at_center(),
        &sample,
        8.0,
        canvas(),
        SpriteShape::Square,
        Rgb8::WHITE,
    )
    .unwrap();
    // center x = 32 + 0.25 * 48 = 44, side 4.
    assert_eq!((patch.x0, patch.width), (42, 4));
}

#[test]
fn vanishing_sprites_are_skipped() {
    let sample = MotionSample {
        offset: Vec2::ZERO,
        scale: 0.0,
    };
    assert!(
        rasterize(
            &sprite_at_center(),
            &sample,
            8.0,
            canvas(),
            SpriteShape::Square,
            Rgb8::WHITE,
        )
        .is_none()
    );
}

#[test]
fn oversized_sprites_are_clipped_to_the_canvas() {
    let sprite = Sprite {
        size: 1e6,
        ..sprite_at_center()
    };
    let patch = rasterize(
        &sprite,
        &MotionSample::IDENTITY,
        8.0,
        canvas(),
        SpriteShape::Square,
        Rgb8::WHITE,
    )
    .unwrap();
    assert_eq!((patch.x0, patch.y0, patch.width, patch.height), (0, 0, 64, 48));
    assert_eq!(patch.pixels.len(), 64 * 48);
}

#[test]
fn sprites_entirely_off_canvas_are_skipped() {
    let sample = MotionSample {
        offset: Vec2::new(1e9, 0.0),
        scale: 1.0,
    };
    assert!(
        rasterize(
            &sprite_at_center(),
            &sample,
            8.0,
            canvas(),
            SpriteShape::Square,
            Rgb8::WHITE,
        )
        .is_none()
    );
}
