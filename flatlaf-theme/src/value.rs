//! Typed values stored in the UI defaults table.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::color::Color;
use crate::color_functions::DerivedColor;

/// Key of the font other font specs derive from unless they name a base font.
pub const DEFAULT_FONT_KEY: &str = "defaultFont";

/// A resolved, typed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Value {
    /// Explicit absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A single character.
    Char(char),
    /// An integer.
    Int(i32),
    /// A float.
    Float(f32),
    /// A string.
    String(String),
    /// A color.
    Color(Color),
    /// A color computed by a function chain that can be replayed.
    DerivedColor(#[serde(serialize_with = "serialize_display")] DerivedColor),
    /// Insets (top, left, bottom, right).
    Insets(Insets),
    /// A dimension (width, height).
    Dimension(Dimension),
    /// A border.
    Border(Border),
    /// A font specification, derived from a base font at read time.
    Font(FontSpec),
    /// An object built by the instance registry.
    Instance(Instance),
    /// A number or geometry scaled by the table's scale factor at read time.
    Scaled(Scaled),
    /// Gray filter parameters for disabled icons.
    GrayFilter(GrayFilter),
}

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl Value {
    /// Short lowercase name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Char(_) => "character",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Color(_) => "color",
            Self::DerivedColor(_) => "derivedColor",
            Self::Insets(_) => "insets",
            Self::Dimension(_) => "dimension",
            Self::Border(_) => "border",
            Self::Font(_) => "font",
            Self::Instance(_) => "instance",
            Self::Scaled(_) => "scaled",
            Self::GrayFilter(_) => "grayFilter",
        }
    }

    /// Whether this is [Value::Null].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The color of a color or derived color value.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(c) => Some(*c),
            Self::DerivedColor(d) => Some(d.color()),
            _ => None,
        }
    }

    /// The value as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Color> for Value {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

impl From<Insets> for Value {
    fn from(value: Insets) -> Self {
        Self::Insets(value)
    }
}

impl From<Dimension> for Value {
    fn from(value: Dimension) -> Self {
        Self::Dimension(value)
    }
}

impl From<FontSpec> for Value {
    fn from(value: FontSpec) -> Self {
        Self::Font(value)
    }
}

impl From<Font> for Value {
    fn from(value: Font) -> Self {
        Self::Font(FontSpec::from(value))
    }
}

/// Scale an integer, rounding to the nearest whole number.
pub fn scale_int(value: i32, factor: f32) -> i32 {
    if factor == 1.0 {
        value
    } else {
        (value as f32 * factor).round() as i32
    }
}

/// Space around a component's content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Insets {
    /// Top inset.
    pub top: i32,
    /// Left inset.
    pub left: i32,
    /// Bottom inset.
    pub bottom: i32,
    /// Right inset.
    pub right: i32,
}

impl Insets {
    /// Create insets.
    pub const fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self { top, left, bottom, right }
    }

    /// The insets scaled by `factor`.
    pub fn scale(&self, factor: f32) -> Self {
        Self::new(
            scale_int(self.top, factor),
            scale_int(self.left, factor),
            scale_int(self.bottom, factor),
            scale_int(self.right, factor),
        )
    }
}

/// Width and height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Dimension {
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Dimension {
    /// Create a dimension.
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// The dimension scaled by `factor`.
    pub fn scale(&self, factor: f32) -> Self {
        Self::new(scale_int(self.width, factor), scale_int(self.height, factor))
    }
}

/// A border around a component.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Border {
    /// Insets only, nothing painted.
    Empty {
        /// Border insets.
        insets: Insets,
    },
    /// A painted line, optionally with rounded corners.
    Line {
        /// Border insets.
        insets: Insets,
        /// Line color; `None` paints with the component's foreground.
        color: Option<Color>,
        /// Line thickness.
        thickness: f32,
        /// Corner arc, `-1` if not rounded.
        arc: i32,
    },
    /// A border painter built by the instance registry.
    Instance {
        /// The constructed painter.
        instance: Instance,
    },
}

impl Border {
    /// The border's insets, if it has fixed ones.
    pub fn insets(&self) -> Option<Insets> {
        match self {
            Self::Empty { insets } | Self::Line { insets, .. } => Some(*insets),
            Self::Instance { .. } => None,
        }
    }
}

bitflags! {
    /// Font style flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
    pub struct FontStyle: u8 {
        /// Bold weight.
        const BOLD = 0b01;
        /// Italic posture.
        const ITALIC = 0b10;
    }
}

/// A concrete font.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    /// Family name.
    pub family: String,
    /// Style flags; empty is plain.
    pub style: FontStyle,
    /// Size in points.
    pub size: f32,
}

impl Font {
    /// Create a font.
    pub fn new(family: impl Into<String>, style: FontStyle, size: f32) -> Self {
        Self {
            family: family.into(),
            style,
            size,
        }
    }
}

impl Default for Font {
    fn default() -> Self {
        Self::new("SansSerif", FontStyle::empty(), 12.0)
    }
}

/// How a font spec changes the size of its base font.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FontSize {
    /// Keep the base size.
    #[default]
    Inherit,
    /// Use this size.
    Absolute(i32),
    /// Add this many points to the base size.
    Relative(i32),
    /// Multiply the base size by this factor.
    Scaled(f32),
}

/// A font description that derives a [Font] from a base font.
///
/// Written in theme files as
/// `[normal] [bold|+bold|-bold] [italic|+italic|-italic] [<size>|+<incr>|-<decr>|<percent>%] [family[, family]] [$baseFontKey]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FontSpec {
    /// Key of the base font; [DEFAULT_FONT_KEY] if `None`.
    pub base_font_key: Option<String>,
    /// Preferred families, first wins.
    pub families: Vec<String>,
    /// Absolute style replacing the base style.
    pub style: Option<FontStyle>,
    /// Styles added to the base style.
    pub add_style: FontStyle,
    /// Styles removed from the base style.
    pub remove_style: FontStyle,
    /// Size change.
    pub size: FontSize,
}

impl FontSpec {
    /// Derive a concrete font from `base`.
    pub fn derive(&self, base: &Font) -> Font {
        let family = self
            .families
            .first()
            .cloned()
            .unwrap_or_else(|| base.family.clone());

        let style = match self.style {
            Some(style) => style,
            None => (base.style | self.add_style) - self.remove_style,
        };

        let size = match self.size {
            FontSize::Inherit => base.size,
            FontSize::Absolute(size) => size as f32,
            FontSize::Relative(delta) => (base.size + delta as f32).max(1.0),
            FontSize::Scaled(factor) => (base.size * factor).round().max(1.0),
        };

        Font { family, style, size }
    }
}

impl From<Font> for FontSpec {
    fn from(font: Font) -> Self {
        Self {
            families: vec![font.family],
            style: Some(font.style),
            size: FontSize::Absolute(font.size.round() as i32),
            ..Self::default()
        }
    }
}

/// Values scaled by the table's scale factor whenever they are read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Scaled {
    /// A scaled integer.
    Int(i32),
    /// A scaled float.
    Float(f32),
    /// Scaled insets.
    Insets(Insets),
    /// A scaled dimension.
    Dimension(Dimension),
}

impl Scaled {
    /// The plain value after scaling by `factor`.
    pub fn scale(&self, factor: f32) -> Value {
        match *self {
            Self::Int(v) => Value::Int(scale_int(v, factor)),
            Self::Float(v) => Value::Float(v * factor),
            Self::Insets(v) => Value::Insets(v.scale(factor)),
            Self::Dimension(v) => Value::Dimension(v.scale(factor)),
        }
    }
}

/// Parameters of the filter that grays out disabled icons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct GrayFilter {
    /// Brightness change, -100 to 100.
    pub brightness: i32,
    /// Contrast change, -100 to 100.
    pub contrast: i32,
    /// Alpha, 0 to 100.
    pub alpha: i32,
}

/// A typed constructor argument of an instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Arg {
    /// `true` or `false`.
    Bool(bool),
    /// An integer.
    Int(i32),
    /// A float.
    Float(f32),
    /// A color or color function.
    Color(Color),
    /// Anything else.
    String(String),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Color(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
        }
    }
}

/// An opaque object built by a registered factory, such as an icon or a border painter.
///
/// If construction failed the instance is a placeholder: it carries no object
/// and consumers should paint it with [Instance::placeholder_color].
#[derive(Clone)]
pub struct Instance {
    name: String,
    args: Vec<Arg>,
    object: Option<Arc<dyn Any + Send + Sync>>,
}

impl Instance {
    /// Wrap a constructed object.
    pub fn new(name: impl Into<String>, args: Vec<Arg>, object: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            name: name.into(),
            args,
            object: Some(object),
        }
    }

    /// A placeholder for an object that could not be constructed.
    pub fn placeholder(name: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            name: name.into(),
            args,
            object: None,
        }
    }

    /// The factory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The constructor arguments.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Whether construction failed.
    pub fn is_placeholder(&self) -> bool {
        self.object.is_none()
    }

    /// The object, if it is of type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.as_ref()?.downcast_ref::<T>()
    }

    /// Solid error marker color painted instead of a missing object.
    pub fn placeholder_color() -> Color {
        Color::RED
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.args == other.args
            && match (&self.object, &other.object) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("placeholder", &self.is_placeholder())
            .finish()
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Instance", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("args", &self.args)?;
        state.serialize_field("placeholder", &self.is_placeholder())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        assert_eq!(Scaled::Int(5).scale(1.5), Value::Int(8));
        assert_eq!(Scaled::Int(5).scale(1.0), Value::Int(5));
        assert_eq!(
            Scaled::Insets(Insets::new(1, 2, 3, 4)).scale(2.0),
            Value::Insets(Insets::new(2, 4, 6, 8))
        );
        assert_eq!(
            Scaled::Dimension(Dimension::new(10, 20)).scale(1.25),
            Value::Dimension(Dimension::new(13, 25))
        );
    }

    #[test]
    fn test_font_derive() {
        let base = Font::new("Inter", FontStyle::ITALIC, 13.0);

        let bold_bigger = FontSpec {
            add_style: FontStyle::BOLD,
            size: FontSize::Relative(2),
            ..FontSpec::default()
        };
        assert_eq!(
            bold_bigger.derive(&base),
            Font::new("Inter", FontStyle::BOLD | FontStyle::ITALIC, 15.0)
        );

        let plain = FontSpec {
            style: Some(FontStyle::empty()),
            families: vec!["Monospaced".to_string()],
            size: FontSize::Scaled(2.0),
            ..FontSpec::default()
        };
        assert_eq!(plain.derive(&base), Font::new("Monospaced", FontStyle::empty(), 26.0));

        let no_italic = FontSpec {
            remove_style: FontStyle::ITALIC,
            ..FontSpec::default()
        };
        assert_eq!(no_italic.derive(&base).style, FontStyle::empty());
    }

    #[test]
    fn test_placeholder_instance() {
        let instance = Instance::placeholder("Missing.icon", vec![Arg::Int(16)]);
        assert!(instance.is_placeholder());
        assert!(instance.downcast_ref::<String>().is_none());
        assert_eq!(Instance::placeholder_color(), Color::RED);

        let real = Instance::new("Text", vec![], Arc::new("hello".to_string()));
        assert_eq!(real.downcast_ref::<String>().map(String::as_str), Some("hello"));
    }

    #[test]
    fn test_value_serializes_tagged() {
        let json = serde_json::to_string(&Value::Insets(Insets::new(1, 2, 3, 4))).unwrap();
        assert_eq!(json, r#"{"type":"insets","value":{"top":1,"left":2,"bottom":3,"right":4}}"#);
        let json = serde_json::to_string(&Value::Color(Color::RED)).unwrap();
        assert_eq!(json, r##"{"type":"color","value":"#ff0000"}"##);
    }
}
