//! Effect list management and compositing tests


use image::Rgba;
use live_ar_preview::{
    detection::BoundingBox,
    effects::{apply_effects, clamp_intensity, EffectConfig, EffectList, EffectType, TargetArea},
};
use proptest::prelude::*;
use test_helpers::create_test_frame;

fn face_box() -> BoundingBox {
    BoundingBox::new(20.0, 10.0, 60.0, 60.0)
}

#[test]
fn test_update_intensity_clamps() {
    let mut effects = EffectList::new();
    effects.add(EffectConfig::new(EffectType::Whitening, 0.4));

    assert!(effects.update_intensity(EffectType::Whitening, 1.5));
    assert_eq!(effects.intensity(EffectType::Whitening), Some(1.0));

    assert!(effects.update_intensity(EffectType::Whitening, -1.0));
    assert_eq!(effects.intensity(EffectType::Whitening), Some(0.0));

    assert!(!effects.update_intensity(EffectType::PeelSim, 0.5));
}

#[test]
fn test_effect_list_keeps_insertion_order() {
    let mut effects = EffectList::new();
    effects.add(EffectConfig::new(EffectType::Smoothing, 0.2));
    effects.add(EffectConfig::new(EffectType::BotoxSim, 0.6));
    effects.add(EffectConfig::new(EffectType::Smoothing, 0.9));

    let order: Vec<_> = effects.as_slice().iter().map(|e| e.effect_type).collect();
    assert_eq!(order, vec![EffectType::Smoothing, EffectType::BotoxSim, EffectType::Smoothing]);

    assert_eq!(effects.remove(EffectType::Smoothing), 2);
    assert_eq!(effects.len(), 1);
    assert_eq!(effects.remove(EffectType::Smoothing), 0);
}

#[test]
fn test_add_clamps_out_of_range_intensity() {
    let mut effects = EffectList::new();
    let mut effect = EffectConfig::new(EffectType::FillerSim, 0.5);
    effect.intensity = 7.0;
    effects.add(effect);

    assert_eq!(effects.intensity(EffectType::FillerSim), Some(1.0));
}

#[test]
fn test_smoothing_blends_toward_gray() {
    let mut frame = create_test_frame(100, 80, 228);
    apply_effects(&mut frame, &face_box(), &[EffectConfig::new(EffectType::Smoothing, 1.0)]);

    // 228 + (128 - 228) * 0.3
    assert_eq!(frame.get_pixel(50, 40), &Rgba([198, 198, 198, 255]));
    assert_eq!(frame.get_pixel(5, 5), &Rgba([228, 228, 228, 255]));
}

#[test]
fn test_whitening_saturates() {
    let mut frame = create_test_frame(100, 80, 250);
    apply_effects(&mut frame, &face_box(), &[EffectConfig::new(EffectType::Whitening, 1.0)]);

    assert_eq!(frame.get_pixel(50, 40), &Rgba([255, 255, 255, 255]));
}

#[test]
fn test_target_areas_restrict_region() {
    let mut frame = create_test_frame(100, 80, 100);
    let effect =
        EffectConfig::new(EffectType::Whitening, 1.0).with_target_areas([TargetArea::Chin]);
    apply_effects(&mut frame, &face_box(), &[effect]);

    // Chin band covers the bottom fifth of the box (y 58..70)
    assert_eq!(frame.get_pixel(50, 65).0[0], 120);
    assert_eq!(frame.get_pixel(50, 30).0[0], 100);
}

#[test]
fn test_botox_only_touches_forehead() {
    let mut frame = create_test_frame(100, 80, 100);
    for y in 0..80 {
        for x in (0..100).step_by(2) {
            frame.put_pixel(x, y, Rgba([200, 200, 200, 255]));
        }
    }
    let original = frame.clone();

    apply_effects(&mut frame, &face_box(), &[EffectConfig::new(EffectType::BotoxSim, 1.0)]);

    // Forehead band: y 10..30
    assert_ne!(frame.get_pixel(50, 20), original.get_pixel(50, 20));
    assert_eq!(frame.get_pixel(50, 50), original.get_pixel(50, 50));
    assert_eq!(frame.get_pixel(5, 20), original.get_pixel(5, 20));
}

#[test]
fn test_filler_only_touches_cheeks() {
    let mut frame = create_test_frame(100, 80, 100);
    for y in 0..80 {
        for x in 0..100 {
            let v = if x < 50 { 40 } else { 220 };
            frame.put_pixel(x, y, Rgba([v, v, v, 255]));
        }
    }
    let original = frame.clone();

    apply_effects(&mut frame, &face_box(), &[EffectConfig::new(EffectType::FillerSim, 1.0)]);

    // Cheek band: y 37..58, the edge at x = 50 gets softened
    assert_ne!(frame.get_pixel(50, 45), original.get_pixel(50, 45));
    assert_eq!(frame.get_pixel(50, 20), original.get_pixel(50, 20));
    assert_eq!(frame.get_pixel(50, 70), original.get_pixel(50, 70));
}

#[test]
fn test_unrendered_effects_pass_through() {
    let mut frame = create_test_frame(64, 64, 90);
    let original = frame.clone();
    let effects = [
        EffectConfig::new(EffectType::LaserSim, 1.0),
        EffectConfig::new(EffectType::PeelSim, 1.0),
        EffectConfig::new(EffectType::Whitening, 0.0),
    ];

    apply_effects(&mut frame, &BoundingBox::new(8.0, 8.0, 40.0, 40.0), &effects);

    assert_eq!(frame, original);
}

#[test]
fn test_effects_apply_in_list_order() {
    let effects_a = [
        EffectConfig::new(EffectType::Whitening, 1.0),
        EffectConfig::new(EffectType::Smoothing, 1.0),
    ];
    let effects_b = [
        EffectConfig::new(EffectType::Smoothing, 1.0),
        EffectConfig::new(EffectType::Whitening, 1.0),
    ];

    let mut a = create_test_frame(100, 80, 200);
    let mut b = a.clone();
    apply_effects(&mut a, &face_box(), &effects_a);
    apply_effects(&mut b, &face_box(), &effects_b);

    // (200 + 20) -> 220 - 92 * 0.3 = 192.4; 200 - 72 * 0.3 = 178.4 -> + 20
    assert_eq!(a.get_pixel(50, 40).0[0], 192);
    assert_eq!(b.get_pixel(50, 40).0[0], 198);
}

#[test]
fn test_effect_config_parsing() {
    let effect: EffectConfig = "whitening:0.5".parse().unwrap();
    assert_eq!(effect.effect_type, EffectType::Whitening);
    assert_eq!(effect.intensity, 0.5);

    let effect: EffectConfig = "botoxSim:3".parse().unwrap();
    assert_eq!(effect.effect_type, EffectType::BotoxSim);
    assert_eq!(effect.intensity, 1.0);

    let effect: EffectConfig = "filler_sim".parse().unwrap();
    assert_eq!(effect.effect_type, EffectType::FillerSim);
    assert_eq!(effect.intensity, 1.0);

    assert!("glitter:0.5".parse::<EffectConfig>().is_err());
    assert!("smoothing:lots".parse::<EffectConfig>().is_err());
}

proptest! {
    #[test]
    fn prop_stored_intensity_is_clamped(
        initial in -5.0f64..5.0,
        update in proptest::num::f64::ANY,
    ) {
        let mut effects = EffectList::new();
        effects.add(EffectConfig::new(EffectType::Smoothing, initial));
        effects.update_intensity(EffectType::Smoothing, update);

        let stored = effects.intensity(EffectType::Smoothing).unwrap();
        prop_assert!((0.0..=1.0).contains(&stored));
        prop_assert_eq!(stored, clamp_intensity(update));
    }
}
