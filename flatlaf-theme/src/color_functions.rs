//! # Color Functions
//!
//! Pure transforms over colors in the HSL color space. A transform is a
//! [ColorFunction]; several of them applied left to right form a chain that
//! derives a new color from a base color. The same chain applied to the same
//! base color always yields the same result.
//!
//! Channels are kept as `[hue, saturation, lightness, alpha]` where hue is in
//! degrees (0-360) and the other three are percentages (0-100). After every
//! step saturation, lightness and alpha are clamped to 0-100 and hue wraps
//! modulo 360.
//!
//! ## Usage Examples
//!
//! ```rust
//! use flatlaf_theme::color::Color;
//! use flatlaf_theme::color_functions::{self, ColorFunction, HslChannel};
//!
//! let base = Color::rgb(0x4b, 0x6e, 0xaf);
//! let hover = color_functions::lighten(base, 10.0);
//!
//! let chain = [
//!     ColorFunction::increase(HslChannel::Lightness, 10.0),
//!     ColorFunction::Fade { amount: 50.0 },
//! ];
//! let translucent = color_functions::apply_functions(base, &chain);
//! assert_eq!(translucent.a, 128);
//! ```

use std::fmt;

use crate::color::Color;

/// The HSL channel a function operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HslChannel {
    /// Hue, in degrees.
    Hue = 0,
    /// Saturation, in percent.
    Saturation = 1,
    /// Lightness, in percent.
    Lightness = 2,
    /// Alpha, in percent of the alpha byte.
    Alpha = 3,
}

impl HslChannel {
    fn index(self) -> usize {
        self as usize
    }
}

/// A single step of a color function chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorFunction {
    /// Increase or decrease a channel by an absolute or relative amount.
    ///
    /// Used by `lighten`, `darken`, `saturate`, `desaturate`, `fadein`,
    /// `fadeout` and (on the hue channel) `spin`.
    IncreaseDecrease {
        /// The channel to change.
        channel: HslChannel,
        /// Whether the amount is added (`true`) or subtracted.
        increase: bool,
        /// The amount in percent (degrees for hue).
        amount: f32,
        /// Multiply the channel by `(100 +- amount) / 100` instead of adding.
        relative: bool,
        /// Flip the direction if the channel is already on the far side of 50.
        auto_inverse: bool,
    },
    /// Set a channel to a fixed value (`changeHue`, `changeLightness`, ...).
    Change {
        /// The channel to set.
        channel: HslChannel,
        /// The new value in percent (degrees for hue).
        value: f32,
    },
    /// Set the alpha to `amount` percent.
    Fade {
        /// The new alpha in percent.
        amount: f32,
    },
    /// Mix the chain's color (first) with a fixed second color.
    Mix {
        /// The second color.
        color2: Color,
        /// Share of the chain's color in percent.
        weight: f32,
    },
    /// Mix a fixed first color with the chain's color (second); used by tint and shade.
    Mix2 {
        /// The first color.
        color1: Color,
        /// Share of the fixed color in percent.
        weight: f32,
    },
}

impl ColorFunction {
    /// An absolute increase of a channel without auto inverse.
    pub fn increase(channel: HslChannel, amount: f32) -> Self {
        Self::IncreaseDecrease {
            channel,
            increase: true,
            amount,
            relative: false,
            auto_inverse: false,
        }
    }

    /// An absolute decrease of a channel without auto inverse.
    pub fn decrease(channel: HslChannel, amount: f32) -> Self {
        Self::IncreaseDecrease {
            channel,
            increase: false,
            amount,
            relative: false,
            auto_inverse: false,
        }
    }

    /// A hue rotation by `degrees`.
    pub fn spin(degrees: f32) -> Self {
        Self::increase(HslChannel::Hue, degrees)
    }

    /// Apply this function to `hsla` in place.
    pub fn apply(&self, hsla: &mut [f32; 4]) {
        match *self {
            Self::IncreaseDecrease {
                channel,
                increase,
                amount,
                relative,
                auto_inverse,
            } => {
                let mut delta = if increase { amount } else { -amount };

                if channel == HslChannel::Hue {
                    hsla[0] = (hsla[0] + delta).rem_euclid(360.0);
                    return;
                }

                let i = channel.index();
                if auto_inverse && should_inverse(hsla[i], increase) {
                    delta = -delta;
                }
                hsla[i] = clamp(if relative {
                    hsla[i] * ((100.0 + delta) / 100.0)
                } else {
                    hsla[i] + delta
                });
            },
            Self::Change { channel, value } => {
                let i = channel.index();
                hsla[i] = if channel == HslChannel::Hue {
                    value.rem_euclid(360.0)
                } else {
                    clamp(value)
                };
            },
            Self::Fade { amount } => {
                hsla[3] = clamp(amount);
            },
            Self::Mix { color2, weight } => {
                let color1 = hsla_to_color(hsla);
                *hsla = color_to_hsla(mix(color1, color2, weight / 100.0));
            },
            Self::Mix2 { color1, weight } => {
                let color2 = hsla_to_color(hsla);
                *hsla = color_to_hsla(mix(color1, color2, weight / 100.0));
            },
        }
    }
}

fn should_inverse(value: f32, increase: bool) -> bool {
    if increase {
        value > 50.0
    } else {
        value < 50.0
    }
}

impl fmt::Display for ColorFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::IncreaseDecrease {
                channel,
                increase,
                amount,
                relative,
                auto_inverse,
            } => {
                let name = match (channel, increase) {
                    (HslChannel::Hue, _) => "spin",
                    (HslChannel::Saturation, true) => "saturate",
                    (HslChannel::Saturation, false) => "desaturate",
                    (HslChannel::Lightness, true) => "lighten",
                    (HslChannel::Lightness, false) => "darken",
                    (HslChannel::Alpha, true) => "fadein",
                    (HslChannel::Alpha, false) => "fadeout",
                };
                let unit = if channel == HslChannel::Hue { "" } else { "%" };
                write!(
                    f,
                    "{}({:.0}{}{}{})",
                    name,
                    amount,
                    unit,
                    if relative { " relative" } else { "" },
                    if auto_inverse { " autoInverse" } else { "" }
                )
            },
            Self::Change { channel, value } => {
                let name = match channel {
                    HslChannel::Hue => "changeHue",
                    HslChannel::Saturation => "changeSaturation",
                    HslChannel::Lightness => "changeLightness",
                    HslChannel::Alpha => "changeAlpha",
                };
                let unit = if channel == HslChannel::Hue { "" } else { "%" };
                write!(f, "{}({:.0}{})", name, value, unit)
            },
            Self::Fade { amount } => write!(f, "fade({:.0}%)", amount),
            Self::Mix { color2, weight } => write!(f, "mix({},{:.0}%)", color2, weight),
            Self::Mix2 { color1, weight } => write!(f, "mix2({},{:.0}%)", color1, weight),
        }
    }
}

/// Clamp a percentage to 0-100.
pub fn clamp(value: f32) -> f32 {
    value.clamp(0.0, 100.0)
}

fn color_to_hsla(color: Color) -> [f32; 4] {
    let [h, s, l] = color.to_hsl();
    [h, s, l, (color.a as f32 / 255.0) * 100.0]
}

fn hsla_to_color(hsla: &[f32; 4]) -> Color {
    Color::from_hsl(hsla[0], hsla[1], hsla[2], hsla[3] / 100.0)
}

/// Apply a chain of functions to a color.
pub fn apply_functions(color: Color, functions: &[ColorFunction]) -> Color {
    // a lone mix works on RGB directly, which avoids two HSL round trips
    match functions {
        [ColorFunction::Mix { color2, weight }] => return mix(color, *color2, weight / 100.0),
        [ColorFunction::Mix2 { color1, weight }] => return mix(*color1, color, weight / 100.0),
        _ => {},
    }

    let mut hsla = color_to_hsla(color);
    for function in functions {
        function.apply(&mut hsla);
    }
    hsla_to_color(&hsla)
}

/// Mix two colors. `weight` (0-1) is the share of `color1`.
pub fn mix(color1: Color, color2: Color, weight: f32) -> Color {
    if weight >= 1.0 || color1 == color2 {
        return color1;
    }
    if weight <= 0.0 {
        return color2;
    }

    let channel = |c1: u8, c2: u8| -> u8 {
        let c1 = c1 as f32;
        let c2 = c2 as f32;
        (c2 + ((c1 - c2) * weight)).round().clamp(0.0, 255.0) as u8
    };

    Color::rgba(
        channel(color1.r, color2.r),
        channel(color1.g, color2.g),
        channel(color1.b, color2.b),
        channel(color1.a, color2.a),
    )
}

/// Mix a color with white. `weight` (0-1) is the share of white.
pub fn tint(color: Color, weight: f32) -> Color {
    mix(Color::WHITE, color, weight)
}

/// Mix a color with black. `weight` (0-1) is the share of black.
pub fn shade(color: Color, weight: f32) -> Color {
    mix(Color::BLACK, color, weight)
}

/// Increase the lightness by an absolute amount (0-100).
pub fn lighten(color: Color, amount: f32) -> Color {
    apply_functions(color, &[ColorFunction::increase(HslChannel::Lightness, amount)])
}

/// Decrease the lightness by an absolute amount (0-100).
pub fn darken(color: Color, amount: f32) -> Color {
    apply_functions(color, &[ColorFunction::decrease(HslChannel::Lightness, amount)])
}

/// Increase the saturation by an absolute amount (0-100).
pub fn saturate(color: Color, amount: f32) -> Color {
    apply_functions(color, &[ColorFunction::increase(HslChannel::Saturation, amount)])
}

/// Decrease the saturation by an absolute amount (0-100).
pub fn desaturate(color: Color, amount: f32) -> Color {
    apply_functions(color, &[ColorFunction::decrease(HslChannel::Saturation, amount)])
}

/// Rotate the hue by `degrees` in either direction.
pub fn spin(color: Color, degrees: f32) -> Color {
    apply_functions(color, &[ColorFunction::spin(degrees)])
}

/// Set the alpha to `amount` percent (0-100).
pub fn fade(color: Color, amount: f32) -> Color {
    color.with_alpha((255.0 * clamp(amount) / 100.0).round() as u8)
}

/// Pick `dark` or `light`, whichever reads better on `color`.
///
/// `threshold` (0-100) is the luma in percent below which `light` is used.
pub fn contrast(color: Color, dark: Color, light: Color, threshold: f32) -> Color {
    if color.luma() * 100.0 < threshold {
        light
    } else {
        dark
    }
}

/// Paint a translucent `foreground` over `background` and return the opaque result.
pub fn over(foreground: Color, background: Color) -> Color {
    if foreground.is_opaque() {
        return foreground;
    }
    let weight = foreground.a as f32 / 255.0;
    mix(foreground.with_alpha(255), background, weight)
}

/// A color that remembers the function chain it was derived with.
///
/// The chain can be replayed against another base color, e.g. when a
/// component's background changes at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedColor {
    color: Color,
    functions: Vec<ColorFunction>,
}

impl DerivedColor {
    /// Create a derived color from its default result and the chain that produced it.
    pub fn new(color: Color, functions: Vec<ColorFunction>) -> Self {
        Self { color, functions }
    }

    /// The color computed from the theme's base color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// The recorded chain.
    pub fn functions(&self) -> &[ColorFunction] {
        &self.functions
    }

    /// Replay the chain against another base color.
    pub fn derive(&self, base: Color) -> Color {
        apply_functions(base, &self.functions)
    }
}

impl fmt::Display for DerivedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.color)?;
        for function in &self.functions {
            write!(f, " {}", function)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_colors() -> Vec<Color> {
        vec![
            Color::RED,
            Color::WHITE,
            Color::BLACK,
            Color::rgb(0x3c, 0x3f, 0x41),
            Color::rgb(0x4b, 0x6e, 0xaf),
            Color::rgba(0x12, 0x34, 0x56, 0x78),
        ]
    }

    #[test]
    fn test_lighten_darken_are_inverse() {
        for color in sample_colors() {
            let [h, s, l] = color.to_hsl();
            for amount in [5.0, 10.0, 25.0] {
                let mut up = [h, s, l, 100.0];
                let mut down = [h, s, l, 100.0];
                ColorFunction::increase(HslChannel::Lightness, amount).apply(&mut up);
                ColorFunction::decrease(HslChannel::Lightness, amount).apply(&mut down);

                assert_eq!(up[2], clamp(l + amount));
                assert_eq!(down[2], clamp(l - amount));
                if l >= amount && l + amount <= 100.0 {
                    assert!((up[2] - l - (l - down[2])).abs() < 0.001);
                }
            }
        }
    }

    #[test]
    fn test_mix_with_itself() {
        for color in sample_colors() {
            for weight in [0.0, 0.25, 0.5, 1.0] {
                assert_eq!(mix(color, color, weight), color);
            }
        }
    }

    #[test]
    fn test_tint_and_shade_endpoints() {
        for color in sample_colors() {
            assert_eq!(tint(color, 0.0), color);
            assert_eq!(shade(color, 0.0), color);
            assert_eq!(tint(color, 1.0), Color::WHITE);
            assert_eq!(shade(color, 1.0), Color::BLACK);
        }
    }

    #[test]
    fn test_mix_halfway() {
        assert_eq!(mix(Color::WHITE, Color::BLACK, 0.5), Color::rgb(128, 128, 128));
        assert_eq!(mix(Color::RED, Color::rgb(0, 0, 255), 0.25), Color::rgb(64, 0, 191));
    }

    #[test]
    fn test_spin_red_gives_cyan() {
        assert_eq!(spin(Color::RED, 180.0), Color::rgb(0, 255, 255));
        assert_eq!(spin(Color::RED, -180.0), Color::rgb(0, 255, 255));
        assert_eq!(spin(Color::RED, 360.0), Color::RED);
    }

    #[test]
    fn test_hue_wraps() {
        let mut hsla = [350.0, 50.0, 50.0, 100.0];
        ColorFunction::spin(20.0).apply(&mut hsla);
        assert_eq!(hsla[0], 10.0);
        ColorFunction::spin(-30.0).apply(&mut hsla);
        assert_eq!(hsla[0], 340.0);
    }

    #[test]
    fn test_channels_clamp() {
        let mut hsla = [0.0, 90.0, 95.0, 100.0];
        ColorFunction::increase(HslChannel::Lightness, 20.0).apply(&mut hsla);
        ColorFunction::increase(HslChannel::Saturation, 20.0).apply(&mut hsla);
        ColorFunction::increase(HslChannel::Alpha, 20.0).apply(&mut hsla);
        assert_eq!(hsla, [0.0, 100.0, 100.0, 100.0]);

        ColorFunction::Change { channel: HslChannel::Lightness, value: -5.0 }.apply(&mut hsla);
        assert_eq!(hsla[2], 0.0);
    }

    #[test]
    fn test_relative_amount() {
        let mut hsla = [0.0, 0.0, 40.0, 100.0];
        ColorFunction::IncreaseDecrease {
            channel: HslChannel::Lightness,
            increase: true,
            amount: 50.0,
            relative: true,
            auto_inverse: false,
        }
        .apply(&mut hsla);
        assert!((hsla[2] - 60.0).abs() < 0.001);
    }

    #[test]
    fn test_auto_inverse() {
        let lighten = ColorFunction::IncreaseDecrease {
            channel: HslChannel::Lightness,
            increase: true,
            amount: 10.0,
            relative: false,
            auto_inverse: true,
        };
        let mut light = [0.0, 0.0, 80.0, 100.0];
        lighten.apply(&mut light);
        assert_eq!(light[2], 70.0);

        let mut dark = [0.0, 0.0, 20.0, 100.0];
        lighten.apply(&mut dark);
        assert_eq!(dark[2], 30.0);

        let darken = ColorFunction::IncreaseDecrease {
            channel: HslChannel::Lightness,
            increase: false,
            amount: 10.0,
            relative: false,
            auto_inverse: true,
        };
        let mut dark = [0.0, 0.0, 20.0, 100.0];
        darken.apply(&mut dark);
        assert_eq!(dark[2], 30.0);
    }

    #[test]
    fn test_fade() {
        assert_eq!(fade(Color::RED, 50.0).a, 128);
        assert_eq!(fade(Color::RED, 0.0).a, 0);
        let faded = apply_functions(Color::RED, &[ColorFunction::Fade { amount: 50.0 }]);
        assert_eq!(faded, Color::rgba(255, 0, 0, 128));
    }

    #[test]
    fn test_contrast() {
        assert_eq!(contrast(Color::BLACK, Color::BLACK, Color::WHITE, 43.0), Color::WHITE);
        assert_eq!(contrast(Color::WHITE, Color::BLACK, Color::WHITE, 43.0), Color::BLACK);
    }

    #[test]
    fn test_over() {
        assert_eq!(over(Color::RED, Color::WHITE), Color::RED);
        assert_eq!(
            over(Color::rgba(0, 0, 0, 128), Color::WHITE),
            mix(Color::BLACK, Color::WHITE, 128.0 / 255.0)
        );
    }

    #[test]
    fn test_chain_is_order_sensitive() {
        let base = Color::rgb(0x4b, 0x6e, 0xaf);
        let a = [
            ColorFunction::Change { channel: HslChannel::Lightness, value: 50.0 },
            ColorFunction::increase(HslChannel::Lightness, 10.0),
        ];
        let b = [a[1].clone(), a[0].clone()];
        assert_ne!(apply_functions(base, &a), apply_functions(base, &b));
    }

    #[test]
    fn test_derived_color_replays_chain() {
        let functions = vec![ColorFunction::decrease(HslChannel::Lightness, 10.0)];
        let base = Color::rgb(0x80, 0x80, 0x80);
        let derived = DerivedColor::new(apply_functions(base, &functions), functions);
        assert_eq!(derived.derive(base), derived.color());
        assert_eq!(derived.derive(Color::WHITE), darken(Color::WHITE, 10.0));
        assert_eq!(derived.to_string(), format!("{} darken(10%)", derived.color()));
    }
}
