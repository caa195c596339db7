//! AR effect configuration and the pixel compositor.
//!
//! Effects are visual approximations driven by the current face box. They
//! run in list order over an RGBA buffer read back from the output surface.
//! Alpha is never modified.

use crate::{
    constants::{
        BOTOX_MAX_BLUR_RADIUS, FILLER_BLUR_RADIUS, FILLER_MAX_EXPANSION, FILLER_MAX_OPACITY,
        SMOOTHING_BLEND_FACTOR, SMOOTHING_TARGET_GRAY, WHITENING_MAX_OFFSET,
    },
    detection::{BoundingBox, PixelRect},
    utils::{
        refine_region,
        safe_cast::{f64_to_i64_round, f64_to_u32_clamp},
        vertical_band,
    },
    Error,
};
use image::{imageops, RgbaImage};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Kind of visual effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectType {
    Smoothing,
    Whitening,
    BotoxSim,
    FillerSim,
    LaserSim,
    PeelSim,
}

impl EffectType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smoothing => "smoothing",
            Self::Whitening => "whitening",
            Self::BotoxSim => "botoxSim",
            Self::FillerSim => "fillerSim",
            Self::LaserSim => "laserSim",
            Self::PeelSim => "peelSim",
        }
    }
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "smoothing" => Ok(Self::Smoothing),
            "whitening" => Ok(Self::Whitening),
            "botoxsim" | "botox" => Ok(Self::BotoxSim),
            "fillersim" | "filler" => Ok(Self::FillerSim),
            "lasersim" | "laser" => Ok(Self::LaserSim),
            "peelsim" | "peel" => Ok(Self::PeelSim),
            _ => Err(Error::InvalidInput(format!("Unknown effect type: {s}"))),
        }
    }
}

/// Face region an effect can be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetArea {
    Forehead,
    UnderEyes,
    Cheeks,
    Chin,
    FullFace,
}

impl TargetArea {
    /// Vertical extent within the face box as `(from, to)` height fractions
    #[must_use]
    pub fn band(&self) -> (f64, f64) {
        match self {
            Self::Forehead => (0.0, 1.0 / 3.0),
            Self::UnderEyes => (1.0 / 3.0, 0.45),
            Self::Cheeks => (0.45, 0.8),
            Self::Chin => (0.8, 1.0),
            Self::FullFace => (0.0, 1.0),
        }
    }
}

/// One active effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    #[serde(rename = "type")]
    pub effect_type: EffectType,
    /// Strength in [0, 1]
    pub intensity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_areas: Option<BTreeSet<TargetArea>>,
}

impl EffectConfig {
    #[must_use]
    pub fn new(effect_type: EffectType, intensity: f64) -> Self {
        Self {
            effect_type,
            intensity: clamp_intensity(intensity),
            target_areas: None,
        }
    }

    #[must_use]
    pub fn with_target_areas<I: IntoIterator<Item = TargetArea>>(mut self, areas: I) -> Self {
        self.target_areas = Some(areas.into_iter().collect());
        self
    }
}

impl FromStr for EffectConfig {
    type Err = Error;

    /// Parse `type` or `type:intensity`, e.g. `whitening:0.5`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, intensity) = match s.split_once(':') {
            Some((name, value)) => {
                let intensity = value
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| Error::InvalidInput(format!("Invalid intensity '{value}': {e}")))?;
                (name, intensity)
            }
            None => (s, 1.0),
        };
        Ok(Self::new(name.trim().parse()?, intensity))
    }
}

/// Clamp an intensity into [0, 1], mapping NaN to 0
#[must_use]
pub fn clamp_intensity(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Ordered list of active effects; insertion order is application order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectList {
    effects: Vec<EffectConfig>,
}

impl EffectList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an effect; duplicates of a type are all applied
    pub fn add(&mut self, mut effect: EffectConfig) {
        effect.intensity = clamp_intensity(effect.intensity);
        debug!("Adding effect {} at intensity {:.2}", effect.effect_type, effect.intensity);
        self.effects.push(effect);
    }

    /// Remove every effect of `effect_type`, returning how many were removed
    pub fn remove(&mut self, effect_type: EffectType) -> usize {
        let before = self.effects.len();
        self.effects.retain(|e| e.effect_type != effect_type);
        let removed = before - self.effects.len();
        debug!("Removed {removed} {effect_type} effect(s)");
        removed
    }

    /// Set the intensity of every effect of `effect_type`, clamped to [0, 1]
    ///
    /// Returns `false` when no such effect is active.
    pub fn update_intensity(&mut self, effect_type: EffectType, value: f64) -> bool {
        let intensity = clamp_intensity(value);
        let mut found = false;
        for effect in self.effects.iter_mut().filter(|e| e.effect_type == effect_type) {
            effect.intensity = intensity;
            found = true;
        }
        if found {
            debug!("Set {effect_type} intensity to {intensity:.2}");
        }
        found
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    /// Intensity of the first effect of `effect_type`
    #[must_use]
    pub fn intensity(&self, effect_type: EffectType) -> Option<f64> {
        self.effects.iter().find(|e| e.effect_type == effect_type).map(|e| e.intensity)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[EffectConfig] {
        &self.effects
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Apply `effects` in order to `buffer` around the pixel-space `face` box
pub fn apply_effects(buffer: &mut RgbaImage, face: &BoundingBox, effects: &[EffectConfig]) {
    let Some(face_rect) = refine_region(face, buffer.width(), buffer.height()) else {
        trace!("Face box {face:?} is off the surface, skipping effects");
        return;
    };

    for effect in effects {
        let intensity = clamp_intensity(effect.intensity);
        if intensity <= 0.0 {
            continue;
        }

        match effect.effect_type {
            EffectType::Smoothing => {
                for rect in target_rects(&face_rect, effect.target_areas.as_ref()) {
                    apply_smoothing(buffer, &rect, intensity);
                }
            }
            EffectType::Whitening => {
                for rect in target_rects(&face_rect, effect.target_areas.as_ref()) {
                    apply_whitening(buffer, &rect, intensity);
                }
            }
            EffectType::BotoxSim => {
                let (from, to) = TargetArea::Forehead.band();
                if let Some(rect) = vertical_band(&face_rect, from, to) {
                    apply_botox(buffer, &rect, intensity);
                }
            }
            EffectType::FillerSim => {
                let (from, to) = TargetArea::Cheeks.band();
                if let Some(rect) = vertical_band(&face_rect, from, to) {
                    apply_filler(buffer, &rect, intensity);
                }
            }
            EffectType::LaserSim | EffectType::PeelSim => {
                trace!("No compositor for {}, passing through", effect.effect_type);
            }
        }
    }
}

fn target_rects(face: &PixelRect, areas: Option<&BTreeSet<TargetArea>>) -> Vec<PixelRect> {
    match areas {
        Some(areas) if !areas.is_empty() && !areas.contains(&TargetArea::FullFace) => areas
            .iter()
            .filter_map(|area| {
                let (from, to) = area.band();
                vertical_band(face, from, to)
            })
            .collect(),
        _ => vec![*face],
    }
}

/// Intersect `rect` with the buffer, `None` when nothing is left
fn clip_rect(buffer: &RgbaImage, rect: &PixelRect) -> Option<PixelRect> {
    let right = rect.x.saturating_add(rect.width).min(buffer.width());
    let bottom = rect.y.saturating_add(rect.height).min(buffer.height());
    if rect.x >= right || rect.y >= bottom {
        return None;
    }
    Some(PixelRect {
        x: rect.x,
        y: rect.y,
        width: right - rect.x,
        height: bottom - rect.y,
    })
}

fn for_each_pixel(
    buffer: &mut RgbaImage,
    rect: &PixelRect,
    mut op: impl FnMut(&mut image::Rgba<u8>),
) {
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            op(buffer.get_pixel_mut(x, y));
        }
    }
}

fn to_channel(value: f64) -> u8 {
    u8::try_from(f64_to_u32_clamp(value.round(), 0, 255)).unwrap_or(u8::MAX)
}

/// Blend each color channel toward mid-gray by `intensity * 0.3`
pub fn apply_smoothing(buffer: &mut RgbaImage, rect: &PixelRect, intensity: f64) {
    let Some(rect) = clip_rect(buffer, rect) else {
        return;
    };
    let blend = intensity * SMOOTHING_BLEND_FACTOR;
    for_each_pixel(buffer, &rect, |px| {
        for c in &mut px.0[..3] {
            let v = f64::from(*c);
            *c = to_channel(v + (SMOOTHING_TARGET_GRAY - v) * blend);
        }
    });
}

/// Add `intensity * 20` to each color channel, saturating at 255
pub fn apply_whitening(buffer: &mut RgbaImage, rect: &PixelRect, intensity: f64) {
    let Some(rect) = clip_rect(buffer, rect) else {
        return;
    };
    let offset = intensity * WHITENING_MAX_OFFSET;
    for_each_pixel(buffer, &rect, |px| {
        for c in &mut px.0[..3] {
            *c = to_channel(f64::from(*c) + offset);
        }
    });
}

/// Blur the region with radius `intensity * 2`
pub fn apply_botox(buffer: &mut RgbaImage, rect: &PixelRect, intensity: f64) {
    #[allow(clippy::cast_possible_truncation)]
    let sigma = (intensity * BOTOX_MAX_BLUR_RADIUS) as f32;
    let Some(rect) = clip_rect(buffer, rect) else {
        return;
    };
    if sigma <= 0.0 {
        return;
    }

    let region = imageops::crop_imm(&*buffer, rect.x, rect.y, rect.width, rect.height).to_image();
    let blurred = imageops::blur(&region, sigma);
    imageops::replace(buffer, &blurred, i64::from(rect.x), i64::from(rect.y));
}

/// Redraw the region widened by `intensity * 4` pixels and blurred
///
/// The overlay is centered on the region and blended at opacity `intensity * 0.3`.
pub fn apply_filler(buffer: &mut RgbaImage, rect: &PixelRect, intensity: f64) {
    let Some(rect) = clip_rect(buffer, rect) else {
        return;
    };
    let expansion = f64_to_i64_round(intensity * FILLER_MAX_EXPANSION).max(0);
    let opacity = (intensity * FILLER_MAX_OPACITY).clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }

    let expanded_width = u32::try_from(i64::from(rect.width) + expansion).unwrap_or(rect.width);
    let region = imageops::crop_imm(&*buffer, rect.x, rect.y, rect.width, rect.height).to_image();
    let widened =
        imageops::resize(&region, expanded_width, rect.height, imageops::FilterType::Triangle);
    let overlay = imageops::blur(&widened, FILLER_BLUR_RADIUS);

    let origin_x = i64::from(rect.x) - expansion / 2;
    let origin_y = i64::from(rect.y);
    let (width, height) = (i64::from(buffer.width()), i64::from(buffer.height()));

    for (ox, oy, src) in overlay.enumerate_pixels() {
        let dx = origin_x + i64::from(ox);
        let dy = origin_y + i64::from(oy);
        if dx < 0 || dy < 0 || dx >= width || dy >= height {
            continue;
        }
        let (Ok(dx), Ok(dy)) = (u32::try_from(dx), u32::try_from(dy)) else {
            continue;
        };
        let dst = buffer.get_pixel_mut(dx, dy);
        for c in 0..3 {
            let blended = f64::from(dst.0[c]) * (1.0 - opacity) + f64::from(src.0[c]) * opacity;
            dst.0[c] = to_channel(blended);
        }
    }
}
