//! # Value Parser
//!
//! Converts resolved raw strings into typed [Value]s.
//!
//! The type of a value is decided in this order:
//!
//! 1. `[style]` keys are kept as strings
//! 2. `null` and empty values are null
//! 3. `if(condition,trueValue,falseValue)` picks a branch
//! 4. `true` and `false` are booleans
//! 5. `lazy(uiKey)` reads another key of the finished table on first use
//! 6. an explicit `{type}` tag at the head of the value
//! 7. a table of well known keys
//! 8. conventions on the key's suffix (`Color`, `Insets`, `Size`, ...)
//! 9. the shape of the value: quoted string, color, number, or plain string
//!
//! Colors are written as `#RRGGBB`, `#RRGGBBAA` or as color functions such as
//! `darken(@background,10%)`, which may be nested.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

use crate::color::Color;
use crate::color_functions::{self, ColorFunction, DerivedColor, HslChannel};
use crate::defaults::Entry;
use crate::error::{ParseError, ThemeError, ThemeResult};
use crate::properties::STYLE_PREFIX;
use crate::registry::InstanceRegistry;
use crate::resolver::{Reference, Resolver, PROPERTY_PREFIX};
use crate::value::{
    Arg, Border, Dimension, FontSize, FontSpec, FontStyle, GrayFilter, Insets, Scaled, Value,
};

/// Asks the host for a platform color by name.
pub type SystemColorGetter = Arc<dyn Fn(&str) -> Option<Color> + Send + Sync>;

/// Deepest allowed nesting of color functions.
const MAX_COLOR_DEPTH: usize = 100;

/// Default threshold of `contrast()` in percent.
const DEFAULT_CONTRAST_THRESHOLD: i32 = 43;

/// Names of all color functions.
pub const COLOR_FUNCTIONS: &[&str] = &[
    "if",
    "lazy",
    "systemColor",
    "rgb",
    "rgba",
    "hsl",
    "hsla",
    "lighten",
    "darken",
    "saturate",
    "desaturate",
    "fadein",
    "fadeout",
    "fade",
    "spin",
    "changeHue",
    "changeSaturation",
    "changeLightness",
    "changeAlpha",
    "mix",
    "tint",
    "shade",
    "contrast",
    "over",
];

/// The type a raw value is parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Decide by the shape of the value.
    Unknown,
    /// String.
    String,
    /// Boolean.
    Boolean,
    /// Single character.
    Character,
    /// Integer.
    Integer,
    /// Integer if possible, float otherwise.
    IntegerOrFloat,
    /// Float.
    Float,
    /// Border.
    Border,
    /// Icon built by the registry.
    Icon,
    /// Insets.
    Insets,
    /// Dimension.
    Dimension,
    /// Color.
    Color,
    /// Font.
    Font,
    /// Scaled integer.
    ScaledInteger,
    /// Scaled float.
    ScaledFloat,
    /// Scaled insets.
    ScaledInsets,
    /// Scaled dimension.
    ScaledDimension,
    /// Object built by the registry.
    Instance,
    /// Name of a registered factory.
    Class,
    /// Gray filter.
    GrayFilter,
    /// Always null.
    Null,
}

impl ValueType {
    /// Parse the name inside a `{type}` tag, ignoring case.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let ty = match tag.to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "boolean" => Self::Boolean,
            "character" => Self::Character,
            "integer" => Self::Integer,
            "integerorfloat" => Self::IntegerOrFloat,
            "float" => Self::Float,
            "border" => Self::Border,
            "icon" => Self::Icon,
            "insets" => Self::Insets,
            "dimension" => Self::Dimension,
            "color" => Self::Color,
            "font" => Self::Font,
            "scaledinteger" => Self::ScaledInteger,
            "scaledfloat" => Self::ScaledFloat,
            "scaledinsets" => Self::ScaledInsets,
            "scaleddimension" => Self::ScaledDimension,
            "instance" => Self::Instance,
            "class" => Self::Class,
            "grayfilter" => Self::GrayFilter,
            "null" => Self::Null,
            _ => return None,
        };
        Some(ty)
    }

    /// Keys whose type does not follow the suffix conventions.
    pub fn for_known_key(key: &str) -> Self {
        match key {
            "activeCaptionBorder" | "inactiveCaptionBorder" | "windowBorder" => Self::Color,
            "SplitPane.dividerSize" | "SplitPaneDivider.gripDotSize" | "dividerSize" | "gripDotSize" => {
                Self::Integer
            },
            "TabbedPane.closeCrossPlainSize"
            | "TabbedPane.closeCrossFilledSize"
            | "closeCrossPlainSize"
            | "closeCrossFilledSize" => Self::Float,
            "Table.intercellSpacing" | "intercellSpacing" => Self::Dimension,
            _ => Self::Unknown,
        }
    }

    /// Infer the type from the key's suffix.
    pub fn infer_from_key(key: &str) -> Self {
        let ends = |suffix: &str| key.ends_with(suffix);

        if ends("UI") {
            Self::String
        } else if ends("Color")
            || ends(".background")
            || ends("Background")
            || key == "background"
            || ends(".foreground")
            || ends("Foreground")
            || key == "foreground"
        {
            Self::Color
        } else if ends(".font") || ends("Font") || key == "font" {
            Self::Font
        } else if ends(".border") || ends("Border") || key == "border" {
            Self::Border
        } else if ends(".icon") || ends("Icon") || key == "icon" {
            Self::Icon
        } else if ends(".margin")
            || key == "margin"
            || ends(".padding")
            || key == "padding"
            || ends("Margins")
            || ends("Insets")
        {
            Self::Insets
        } else if ends("Size") {
            Self::Dimension
        } else if ends("Width") || ends("Height") {
            Self::IntegerOrFloat
        } else if ends("Char") {
            Self::Character
        } else if ends("grayFilter") {
            Self::GrayFilter
        } else {
            Self::Unknown
        }
    }
}

enum Failure {
    Invalid(String),
    Theme(ThemeError),
}

impl From<ParseError> for Failure {
    fn from(e: ParseError) -> Self {
        Self::Invalid(e.0)
    }
}

impl From<ThemeError> for Failure {
    fn from(e: ThemeError) -> Self {
        Self::Theme(e)
    }
}

type Parsed<T> = Result<T, Failure>;

fn invalid<T>(message: impl Into<String>) -> Parsed<T> {
    Err(Failure::Invalid(message.into()))
}

/// Result of a color expression.
enum ColorExpr {
    Color(Color),
    Derived(DerivedColor),
    /// Base color read from the table at first use.
    Lazy { ui_key: String, function: ColorFunction },
    Null,
}

impl ColorExpr {
    fn into_entry(self) -> Entry {
        match self {
            Self::Color(c) => Value::Color(c).into(),
            Self::Derived(d) => Value::DerivedColor(d).into(),
            Self::Null => Value::Null.into(),
            Self::Lazy { ui_key, function } => Entry::lazy(move |defaults| match defaults.get_color(&ui_key) {
                Some(base) => Value::Color(color_functions::apply_functions(
                    base,
                    std::slice::from_ref(&function),
                )),
                None => Value::Null,
            }),
        }
    }
}

/// Options of a color function, e.g. `derived relative`.
#[derive(Default)]
struct ColorOptions {
    relative: bool,
    auto_inverse: bool,
    derived: bool,
    lazy: bool,
}

impl ColorOptions {
    fn parse(options: Option<&str>, derived_implies_auto_inverse: bool) -> Self {
        let Some(options) = options else {
            return Self::default();
        };
        let has = |word: &str| options.split_whitespace().any(|w| w == word);

        let derived = has("derived");
        Self {
            relative: has("relative"),
            auto_inverse: has("autoInverse")
                || (derived_implies_auto_inverse && derived && !has("noAutoInverse")),
            derived,
            lazy: has("lazy"),
        }
    }
}

/// Parameters of a function call, with the whole call kept for messages.
struct Call<'v> {
    value: &'v str,
    params: Vec<&'v str>,
}

impl<'v> Call<'v> {
    fn get(&self, index: usize) -> Parsed<&'v str> {
        match self.params.get(index) {
            Some(param) => Ok(param),
            None => invalid(format!("missing parameters in function '{}'", self.value)),
        }
    }

    fn opt(&self, index: usize) -> Option<&'v str> {
        self.params.get(index).copied()
    }

    fn len(&self) -> usize {
        self.params.len()
    }
}

/// Parses resolved values into typed values.
pub struct ValueParser<'a> {
    resolver: Resolver<'a>,
    registry: Arc<InstanceRegistry>,
    system_colors: Option<SystemColorGetter>,
    system_color_cache: RefCell<HashMap<String, Option<Color>>>,
    color_depth: Cell<usize>,
    /// `if(...)` expressions being evaluated, outermost first.
    if_stack: RefCell<Vec<String>>,
}

impl<'a> ValueParser<'a> {
    /// Create a parser resolving nested references with `resolver`.
    pub fn new(resolver: Resolver<'a>, registry: Arc<InstanceRegistry>) -> Self {
        Self {
            resolver,
            registry,
            system_colors: None,
            system_color_cache: RefCell::new(HashMap::new()),
            color_depth: Cell::new(0),
            if_stack: RefCell::new(Vec::new()),
        }
    }

    /// Use `getter` for `systemColor()`.
    pub fn with_system_colors(mut self, getter: Option<SystemColorGetter>) -> Self {
        self.system_colors = getter;
        self
    }

    /// Parse the resolved `value` of `key`.
    pub fn parse(&self, key: &str, value: &str) -> ThemeResult<Entry> {
        self.parse_value(key, value).map_err(|failure| match failure {
            Failure::Invalid(reason) => ThemeError::invalid_value(key, value, reason),
            Failure::Theme(e) => e,
        })
    }

    /// Parse a color or color function that is not bound to a key.
    pub fn parse_color(&self, value: &str) -> ThemeResult<Option<Color>> {
        let parsed = self
            .parse_color_or_function(value.trim())
            .and_then(|expr| self.concrete(expr));
        match parsed {
            Ok(color) => Ok(color),
            Err(Failure::Invalid(reason)) => Err(ThemeError::invalid_value("", value, reason)),
            Err(Failure::Theme(e)) => Err(e),
        }
    }

    fn parse_value(&self, key: &str, value: &str) -> Parsed<Entry> {
        if key.starts_with(STYLE_PREFIX) {
            return Ok(Value::String(value.to_string()).into());
        }

        let value = value.trim();
        if value.is_empty() || value == "null" {
            return Ok(Value::Null.into());
        }

        if let Some(inner) = function_args(value, "if") {
            let call = Call {
                value,
                params: split_function_params(inner),
            };
            if call.len() != 3 {
                return invalid(format!("missing parameters in function '{}'", value));
            }
            return self.parse_if(key, &call);
        }

        match value {
            "false" => return Ok(Value::Bool(false).into()),
            "true" => return Ok(Value::Bool(true).into()),
            _ => {},
        }

        if let Some(inner) = function_args(value, "lazy") {
            return Ok(lazy_entry(inner.trim()));
        }

        let mut value_type = ValueType::Unknown;
        let mut value = value;

        if let Some(rest) = value.strip_prefix('{') {
            if let Some(end) = rest.find('}') {
                if let Some(ty) = ValueType::from_tag(&rest[..end]) {
                    value_type = ty;
                    value = &rest[end + 1..];
                }
            }
        }

        if value_type == ValueType::Unknown {
            value_type = ValueType::for_known_key(key);
        }
        if value_type == ValueType::Unknown {
            value_type = ValueType::infer_from_key(key);
        }

        let parsed = match value_type {
            ValueType::String => Value::String(value.to_string()),
            ValueType::Boolean => Value::Bool(parse_boolean(value)?),
            ValueType::Character => Value::Char(parse_character(value)?),
            ValueType::Integer => Value::Int(parse_integer(value)?),
            ValueType::IntegerOrFloat => parse_integer_or_float(value)?,
            ValueType::Float => Value::Float(parse_float(value)?),
            ValueType::Border => return self.parse_border(value),
            ValueType::Icon | ValueType::Instance => return self.parse_instance(value, false),
            ValueType::Insets => Value::Insets(parse_insets(value)?),
            ValueType::Dimension => Value::Dimension(parse_dimension(value)?),
            ValueType::Color => return Ok(self.parse_color_or_function(value)?.into_entry()),
            ValueType::Font => Value::Font(parse_font(value)?),
            ValueType::ScaledInteger => Value::Scaled(Scaled::Int(parse_integer(value)?)),
            ValueType::ScaledFloat => Value::Scaled(Scaled::Float(parse_float(value)?)),
            ValueType::ScaledInsets => Value::Scaled(Scaled::Insets(parse_insets(value)?)),
            ValueType::ScaledDimension => Value::Scaled(Scaled::Dimension(parse_dimension(value)?)),
            ValueType::Class => return Ok(self.parse_class(value)),
            ValueType::GrayFilter => Value::GrayFilter(parse_gray_filter(value)?),
            ValueType::Null => Value::Null,
            ValueType::Unknown => return self.parse_by_shape(value),
        };

        Ok(parsed.into())
    }

    fn parse_by_shape(&self, value: &str) -> Parsed<Entry> {
        if let Some(inner) = unquote(value) {
            return Ok(Value::String(inner.to_string()).into());
        }

        if value.starts_with('#') {
            return Ok(match Color::parse_hex(value) {
                Ok(color) => Value::Color(color),
                Err(_) => Value::String(value.to_string()),
            }
            .into());
        }

        if is_color_function(value) {
            return Ok(self.parse_color_or_function(value)?.into_entry());
        }

        if starts_like_number(value) {
            if let Ok(i) = value.parse::<i32>() {
                return Ok(Value::Int(i).into());
            }
            if let Ok(f) = value.parse::<f32>() {
                return Ok(Value::Float(f).into());
            }
        }

        Ok(Value::String(value.to_string()).into())
    }

    /// Evaluate a top level `if(...)`. Reentering an expression that is still
    /// being evaluated is a reference cycle.
    fn parse_if(&self, key: &str, call: &Call<'_>) -> Parsed<Entry> {
        let (condition, when_true, when_false) = (call.get(0)?, call.get(1)?, call.get(2)?);
        {
            let mut stack = self.if_stack.borrow_mut();
            if stack.iter().any(|active| active == call.value) {
                let mut chain = Vec::with_capacity(stack.len() + 2);
                chain.push(key.to_string());
                chain.extend(stack.iter().cloned());
                chain.push(call.value.to_string());
                return Err(ThemeError::ReferenceCycle { chain }.into());
            }
            stack.push(call.value.to_string());
        }

        let result = self.parse_condition(condition).and_then(|condition| {
            let branch = if condition { when_true } else { when_false };
            let resolved = self.resolver.resolve(branch)?;
            self.parse_value(key, &resolved)
        });

        let mut stack = self.if_stack.borrow_mut();
        if let Some(pos) = stack.iter().rposition(|active| active == call.value) {
            stack.truncate(pos);
        }
        result
    }

    fn parse_condition(&self, condition: &str) -> Parsed<bool> {
        let parsed = self
            .resolver
            .resolve(condition)
            .map_err(Failure::from)
            .and_then(|resolved| self.parse_value("", &resolved));

        Ok(match parsed {
            Ok(Entry::Value(value)) => {
                !matches!(value, Value::Null | Value::Bool(false) | Value::Int(0))
            },
            Ok(Entry::Lazy(_)) => true,
            Err(Failure::Theme(e @ ThemeError::ReferenceCycle { .. })) => return Err(e.into()),
            Err(_) => false,
        })
    }

    fn parse_border(&self, value: &str) -> Parsed<Entry> {
        if !value.contains(',') {
            return self.parse_instance(value, true);
        }

        let parts = split_function_params(value);
        let border = (|| -> Parsed<Border> {
            if parts.len() < 4 {
                return invalid("expected top,left,bottom,right");
            }
            let insets = Insets::new(
                parse_integer(parts[0])?,
                parse_integer(parts[1])?,
                parse_integer(parts[2])?,
                parse_integer(parts[3])?,
            );
            let color = match parts.get(4) {
                Some(color) if !color.is_empty() => {
                    let resolved = self.resolver.resolve(color)?;
                    let expr = self.parse_color_or_function(&resolved)?;
                    self.concrete(expr)?
                },
                _ => None,
            };
            let thickness = match parts.get(5) {
                Some(t) if !t.is_empty() => parse_float(t)?,
                _ => 1.0,
            };
            let arc = match parts.get(6) {
                Some(a) if !a.is_empty() => parse_integer(a)?,
                _ => -1,
            };

            Ok(if color.is_some() || arc > 0 {
                Border::Line {
                    insets,
                    color,
                    thickness,
                    arc,
                }
            } else {
                Border::Empty { insets }
            })
        })();

        match border {
            Ok(border) => Ok(Entry::lazy(move |_| Value::Border(border.clone()))),
            Err(Failure::Invalid(reason)) => invalid(format!("invalid border '{}' ({})", value, reason)),
            Err(e) => Err(e),
        }
    }

    fn parse_instance(&self, value: &str, border: bool) -> Parsed<Entry> {
        let parts = split_function_params(value);
        let name = parts[0].to_string();
        if name.is_empty() {
            return invalid(format!("missing name in '{}'", value));
        }

        let mut args = Vec::with_capacity(parts.len() - 1);
        for part in &parts[1..] {
            let resolved = self.resolver.resolve(part)?;
            args.push(self.parse_arg(&resolved));
        }

        let registry = Arc::clone(&self.registry);
        Ok(Entry::lazy(move |_| {
            let instance = registry.create_or_placeholder(&name, &args);
            if border {
                Value::Border(Border::Instance { instance })
            } else {
                Value::Instance(instance)
            }
        }))
    }

    fn parse_arg(&self, value: &str) -> Arg {
        match value {
            "true" => return Arg::Bool(true),
            "false" => return Arg::Bool(false),
            _ => {},
        }
        if let Ok(i) = value.parse::<i32>() {
            return Arg::Int(i);
        }
        if starts_like_number(value) {
            if let Ok(f) = value.parse::<f32>() {
                return Arg::Float(f);
            }
        }
        if value.starts_with('#') || is_color_function(value) {
            let color = self
                .parse_color_or_function(value)
                .and_then(|expr| self.concrete(expr));
            if let Ok(Some(color)) = color {
                return Arg::Color(color);
            }
        }
        match unquote(value) {
            Some(inner) => Arg::String(inner.to_string()),
            None => Arg::String(value.to_string()),
        }
    }

    fn parse_class(&self, value: &str) -> Entry {
        let name = value.to_string();
        let registry = Arc::clone(&self.registry);
        Entry::lazy(move |_| {
            if registry.contains(&name) {
                Value::String(name.clone())
            } else {
                log::error!("Failed to find class '{}'", name);
                Value::Null
            }
        })
    }

    fn concrete(&self, expr: ColorExpr) -> Parsed<Option<Color>> {
        match expr {
            ColorExpr::Color(c) => Ok(Some(c)),
            ColorExpr::Derived(d) => Ok(Some(d.color())),
            ColorExpr::Null => Ok(None),
            ColorExpr::Lazy { .. } => invalid("option 'lazy' is only allowed in the outermost color function"),
        }
    }

    /// Resolve and parse a color parameter, failing on lazy results.
    fn color_param(&self, param: &str) -> Parsed<Option<Color>> {
        let resolved = self.resolver.resolve(param)?;
        let expr = self.parse_color_or_function(&resolved)?;
        self.concrete(expr)
    }

    fn parse_color_or_function(&self, value: &str) -> Parsed<ColorExpr> {
        if value.ends_with(')') {
            return self.parse_color_functions(value);
        }
        Ok(ColorExpr::Color(Color::parse_hex(value)?))
    }

    fn parse_color_functions(&self, value: &str) -> Parsed<ColorExpr> {
        let Some(open) = value.find('(') else {
            return invalid(format!("missing opening parenthesis in function '{}'", value));
        };

        let name = value[..open].trim();
        let params = split_function_params(&value[open + 1..value.len() - 1]);
        if params.iter().all(|p| p.is_empty()) {
            return invalid(format!("missing parameters in function '{}'", value));
        }

        let depth = self.color_depth.get();
        if depth > MAX_COLOR_DEPTH {
            return invalid(format!("endless recursion in color function '{}'", value));
        }

        self.color_depth.set(depth + 1);
        let result = self.call_color_function(name, &Call { value, params });
        self.color_depth.set(depth);
        result
    }

    fn call_color_function(&self, name: &str, call: &Call<'_>) -> Parsed<ColorExpr> {
        use HslChannel::*;

        match name {
            "if" => self.color_if(call),
            "lazy" => self.color_lazy(call),
            "systemColor" => self.color_system(call),
            "rgb" => self.color_rgb(false, call),
            "rgba" => self.color_rgb(true, call),
            "hsl" => self.color_hsl(false, call),
            "hsla" => self.color_hsl(true, call),
            "lighten" => self.color_increase_decrease(Lightness, true, call),
            "darken" => self.color_increase_decrease(Lightness, false, call),
            "saturate" => self.color_increase_decrease(Saturation, true, call),
            "desaturate" => self.color_increase_decrease(Saturation, false, call),
            "fadein" => self.color_increase_decrease(Alpha, true, call),
            "fadeout" => self.color_increase_decrease(Alpha, false, call),
            "fade" => self.color_fade(call),
            "spin" => self.color_spin(call),
            "changeHue" => self.color_change(Hue, call),
            "changeSaturation" => self.color_change(Saturation, call),
            "changeLightness" => self.color_change(Lightness, call),
            "changeAlpha" => self.color_change(Alpha, call),
            "mix" => self.color_mix(None, call),
            "tint" => self.color_mix(Some(Color::WHITE), call),
            "shade" => self.color_mix(Some(Color::BLACK), call),
            "contrast" => self.color_contrast(call),
            "over" => self.color_over(call),
            _ => invalid(format!("unknown color function '{}'", call.value)),
        }
    }

    fn color_if(&self, call: &Call<'_>) -> Parsed<ColorExpr> {
        if call.len() != 3 {
            return invalid(format!("missing parameters in function '{}'", call.value));
        }
        let branch = if self.parse_condition(call.get(0)?)? { call.get(1)? } else { call.get(2)? };
        let resolved = self.resolver.resolve(branch)?;
        self.parse_color_or_function(&resolved)
    }

    /// Inside another function `lazy(key)` is read immediately, like `$key`.
    fn color_lazy(&self, call: &Call<'_>) -> Parsed<ColorExpr> {
        if call.len() != 1 {
            return invalid(format!("missing parameters in function '{}'", call.value));
        }
        let resolved = self
            .resolver
            .resolve(&format!("{}{}", PROPERTY_PREFIX, call.get(0)?))?;
        self.parse_color_or_function(&resolved)
    }

    fn color_system(&self, call: &Call<'_>) -> Parsed<ColorExpr> {
        let name = call.get(0)?;
        if let Some(color) = self.system_color(name) {
            return Ok(ColorExpr::Color(color));
        }

        match call.opt(1) {
            None | Some("") | Some("null") => Ok(ColorExpr::Null),
            Some(default) => {
                let resolved = self.resolver.resolve(default)?;
                self.parse_color_or_function(&resolved)
            },
        }
    }

    fn system_color(&self, name: &str) -> Option<Color> {
        let getter = self.system_colors.as_ref()?;
        if let Some(cached) = self.system_color_cache.borrow().get(name) {
            return *cached;
        }
        let color = getter(name);
        self.system_color_cache
            .borrow_mut()
            .insert(name.to_string(), color);
        color
    }

    fn color_rgb(&self, has_alpha: bool, call: &Call<'_>) -> Parsed<ColorExpr> {
        if has_alpha && call.len() == 2 {
            // rgba(color,alpha), superseded by fade()
            let alpha = parse_integer_in_range(call.get(1)?, 0, 255, true)?;
            return Ok(match self.color_param(call.get(0)?)? {
                Some(color) => ColorExpr::Color(color.with_alpha(alpha as u8)),
                None => ColorExpr::Null,
            });
        }

        let r = parse_integer_in_range(call.get(0)?, 0, 255, true)?;
        let g = parse_integer_in_range(call.get(1)?, 0, 255, true)?;
        let b = parse_integer_in_range(call.get(2)?, 0, 255, true)?;
        let a = if has_alpha {
            parse_integer_in_range(call.get(3)?, 0, 255, true)?
        } else {
            255
        };

        Ok(ColorExpr::Color(Color::rgba(r as u8, g as u8, b as u8, a as u8)))
    }

    fn color_hsl(&self, has_alpha: bool, call: &Call<'_>) -> Parsed<ColorExpr> {
        let hue = parse_integer_in_range(call.get(0)?, 0, 360, false)?;
        let saturation = parse_percentage(call.get(1)?)?;
        let lightness = parse_percentage(call.get(2)?)?;
        let alpha = if has_alpha { parse_percentage(call.get(3)?)? } else { 100 };

        Ok(ColorExpr::Color(Color::from_hsl(
            hue as f32,
            saturation as f32,
            lightness as f32,
            alpha as f32 / 100.0,
        )))
    }

    fn color_increase_decrease(&self, channel: HslChannel, increase: bool, call: &Call<'_>) -> Parsed<ColorExpr> {
        let base = call.get(0)?;
        let amount = parse_percentage(call.get(1)?)?;
        let options = ColorOptions::parse(call.opt(2), true);

        let function = ColorFunction::IncreaseDecrease {
            channel,
            increase,
            amount: amount as f32,
            relative: options.relative,
            auto_inverse: options.auto_inverse,
        };
        self.apply_to_base(base, function, &options)
    }

    fn color_fade(&self, call: &Call<'_>) -> Parsed<ColorExpr> {
        let base = call.get(0)?;
        let amount = parse_percentage(call.get(1)?)?;
        let options = ColorOptions::parse(call.opt(2), false);

        self.apply_to_base(base, ColorFunction::Fade { amount: amount as f32 }, &options)
    }

    fn color_spin(&self, call: &Call<'_>) -> Parsed<ColorExpr> {
        let base = call.get(0)?;
        let degrees = parse_integer(call.get(1)?)?;
        let options = ColorOptions::parse(call.opt(2), false);

        self.apply_to_base(base, ColorFunction::spin(degrees as f32), &options)
    }

    fn color_change(&self, channel: HslChannel, call: &Call<'_>) -> Parsed<ColorExpr> {
        let base = call.get(0)?;
        let value = if channel == HslChannel::Hue {
            parse_integer(call.get(1)?)?
        } else {
            parse_percentage(call.get(1)?)?
        };
        let options = ColorOptions::parse(call.opt(2), false);

        self.apply_to_base(
            base,
            ColorFunction::Change {
                channel,
                value: value as f32,
            },
            &options,
        )
    }

    /// `mix(color1,color2[,weight][,options])`, `tint(color[,weight][,options])`
    /// and `shade(color[,weight][,options])`.
    fn color_mix(&self, fixed: Option<Color>, call: &Call<'_>) -> Parsed<ColorExpr> {
        let mut i = 0;
        let color1 = match fixed {
            Some(color) => Some(color),
            None => {
                i += 1;
                self.color_param(call.get(0)?)?
            },
        };
        let base = call.get(i)?;
        i += 1;

        let mut weight = 50;
        if let Some(w) = call.opt(i) {
            if w.starts_with(|c: char| c.is_ascii_digit()) {
                weight = parse_percentage(w)?;
                i += 1;
            }
        }
        let options = ColorOptions::parse(call.opt(i), false);

        let Some(color1) = color1 else {
            return Ok(ColorExpr::Null);
        };
        let function = ColorFunction::Mix2 {
            color1,
            weight: weight as f32,
        };
        self.apply_to_base(base, function, &options)
    }

    fn color_contrast(&self, call: &Call<'_>) -> Parsed<ColorExpr> {
        let color = call.get(0)?;
        let dark = call.get(1)?;
        let light = call.get(2)?;
        let threshold = match call.opt(3) {
            Some(t) => parse_percentage(t)?,
            None => DEFAULT_CONTRAST_THRESHOLD,
        };

        let Some(color) = self.color_param(color)? else {
            return Ok(ColorExpr::Null);
        };

        let chosen = if color.luma() * 100.0 < threshold as f32 { light } else { dark };
        let resolved = self.resolver.resolve(chosen)?;
        self.parse_color_or_function(&resolved)
    }

    fn color_over(&self, call: &Call<'_>) -> Parsed<ColorExpr> {
        let foreground = call.get(0)?;
        let background = call.get(1)?;

        let Some(foreground) = self.color_param(foreground)? else {
            return Ok(ColorExpr::Null);
        };
        if foreground.is_opaque() {
            return Ok(ColorExpr::Color(foreground));
        }

        Ok(ColorExpr::Color(match self.color_param(background)? {
            Some(background) => color_functions::over(foreground, background),
            None => foreground.with_alpha(255),
        }))
    }

    fn apply_to_base(&self, base: &str, function: ColorFunction, options: &ColorOptions) -> Parsed<ColorExpr> {
        if options.lazy {
            return Ok(ColorExpr::Lazy {
                ui_key: base.trim().to_string(),
                function,
            });
        }

        let resolved = self.resolver.resolve(base)?;
        let (base_color, base_functions) = match self.parse_color_or_function(&resolved)? {
            ColorExpr::Color(c) => (c, None),
            ColorExpr::Derived(d) => (d.color(), Some(d.functions().to_vec())),
            ColorExpr::Null => return Ok(ColorExpr::Null),
            ColorExpr::Lazy { .. } => {
                return invalid("option 'lazy' is only allowed in the outermost color function")
            },
        };

        let color = color_functions::apply_functions(base_color, std::slice::from_ref(&function));
        if !options.derived {
            return Ok(ColorExpr::Color(color));
        }

        // join the chains only if the base function is written inline, not referenced
        let inline = Reference::parse(base.trim()).is_none();
        let functions = match base_functions {
            Some(mut functions) if inline => {
                functions.push(function);
                functions
            },
            _ => vec![function],
        };
        Ok(ColorExpr::Derived(DerivedColor::new(color, functions)))
    }
}

fn lazy_entry(ui_key: &str) -> Entry {
    let (ui_key, optional) = match ui_key.strip_prefix('?') {
        Some(key) => (key.to_string(), true),
        None => (ui_key.to_string(), false),
    };

    Entry::lazy(move |defaults| match defaults.get(&ui_key) {
        Some(value) => value,
        None => {
            if !optional {
                log::warn!("lazy() could not find key '{}'", ui_key);
            }
            Value::Null
        },
    })
}

/// The text between `name(` and the final `)`, if `value` is a call of `name`.
fn function_args<'v>(value: &'v str, name: &str) -> Option<&'v str> {
    value
        .strip_prefix(name)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn is_color_function(value: &str) -> bool {
    value.ends_with(')')
        && value
            .find('(')
            .map(|open| COLOR_FUNCTIONS.contains(&value[..open].trim()))
            .unwrap_or(false)
}

fn starts_like_number(value: &str) -> bool {
    value
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
        .unwrap_or(false)
}

fn unquote(value: &str) -> Option<&str> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Some(&value[1..value.len() - 1])
    } else {
        None
    }
}

/// Split function parameters at commas that are not nested in parentheses.
///
/// Parameters are trimmed. An empty string yields one empty parameter.
pub fn split_function_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in params.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(params[start..i].trim());
                start = i + 1;
            },
            _ => {},
        }
    }
    parts.push(params[start..].trim());

    parts
}

fn split_numbers(value: &str) -> Vec<&str> {
    value.split(',').map(str::trim).collect()
}

/// Parse `top,left,bottom,right`.
pub fn parse_insets(value: &str) -> Result<Insets, ParseError> {
    let invalid = || ParseError::new(format!("invalid insets '{}'", value));
    let numbers = split_numbers(value);
    let [top, left, bottom, right] = numbers.as_slice() else {
        return Err(invalid());
    };
    let n = |s: &str| s.parse::<i32>().map_err(|_| invalid());
    Ok(Insets::new(n(top)?, n(left)?, n(bottom)?, n(right)?))
}

/// Parse `width,height`.
pub fn parse_dimension(value: &str) -> Result<Dimension, ParseError> {
    let invalid = || ParseError::new(format!("invalid size '{}'", value));
    let numbers = split_numbers(value);
    let [width, height] = numbers.as_slice() else {
        return Err(invalid());
    };
    let n = |s: &str| s.parse::<i32>().map_err(|_| invalid());
    Ok(Dimension::new(n(width)?, n(height)?))
}

/// Parse `brightness,contrast,alpha`.
pub fn parse_gray_filter(value: &str) -> Result<GrayFilter, ParseError> {
    let invalid = || ParseError::new(format!("invalid gray filter '{}'", value));
    let numbers = split_numbers(value);
    let [brightness, contrast, alpha] = numbers.as_slice() else {
        return Err(invalid());
    };
    let n = |s: &str| s.parse::<i32>().map_err(|_| invalid());
    Ok(GrayFilter {
        brightness: n(brightness)?,
        contrast: n(contrast)?,
        alpha: n(alpha)?,
    })
}

fn parse_boolean(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::new(format!("invalid boolean '{}'", value))),
    }
}

fn parse_character(value: &str) -> Result<char, ParseError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ParseError::new(format!("invalid character '{}'", value))),
    }
}

fn parse_integer(value: &str) -> Result<i32, ParseError> {
    value
        .parse()
        .map_err(|_| ParseError::new(format!("invalid integer '{}'", value)))
}

fn parse_float(value: &str) -> Result<f32, ParseError> {
    value
        .parse()
        .map_err(|_| ParseError::new(format!("invalid float '{}'", value)))
}

fn parse_integer_or_float(value: &str) -> Result<Value, ParseError> {
    if let Ok(i) = value.parse::<i32>() {
        return Ok(Value::Int(i));
    }
    value
        .parse::<f32>()
        .map(Value::Float)
        .map_err(|_| ParseError::new(format!("invalid integer or float '{}'", value)))
}

fn parse_percentage(value: &str) -> Result<i32, ParseError> {
    let invalid = || ParseError::new(format!("invalid percentage '{}'", value));
    let number = value.strip_suffix('%').ok_or_else(invalid)?;
    let percent: i32 = number.parse().map_err(|_| invalid())?;
    if !(0..=100).contains(&percent) {
        return Err(ParseError::new(format!(
            "percentage out of range (0-100%) '{}'",
            value
        )));
    }
    Ok(percent)
}

fn parse_integer_in_range(value: &str, min: i32, max: i32, allow_percentage: bool) -> Result<i32, ParseError> {
    if allow_percentage && value.ends_with('%') {
        return Ok(max * parse_percentage(value)? / 100);
    }
    let integer = parse_integer(value)?;
    if integer < min || integer > max {
        return Err(ParseError::new(format!(
            "integer '{}' out of range ({}-{})",
            value, min, max
        )));
    }
    Ok(integer)
}

/// Split a font spec into words; quotes group words and commas separate.
fn font_tokens(value: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = value.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || c == ',' {
            chars.next();
        } else if c == '"' || c == '\'' {
            chars.next();
            let word: String = chars.by_ref().take_while(|&ch| ch != c).collect();
            tokens.push(word);
        } else {
            let mut word = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch == ',' || ch == '"' || ch == '\'' {
                    break;
                }
                word.push(ch);
                chars.next();
            }
            tokens.push(word);
        }
    }

    tokens
}

/// Parse a font spec such as `+bold -2 "Segoe UI", Inter $h1.font`.
pub fn parse_font(value: &str) -> Result<FontSpec, ParseError> {
    let invalid = |reason: &str| ParseError::new(format!("invalid font '{}': {}", value, reason));

    let mut spec = FontSpec::default();
    let mut size_set = false;

    for token in font_tokens(value) {
        match token.as_str() {
            "normal" => spec.style = Some(FontStyle::empty()),
            "bold" => spec.style = Some(spec.style.unwrap_or_default() | FontStyle::BOLD),
            "italic" => spec.style = Some(spec.style.unwrap_or_default() | FontStyle::ITALIC),
            "+bold" => spec.add_style |= FontStyle::BOLD,
            "-bold" => spec.remove_style |= FontStyle::BOLD,
            "+italic" => spec.add_style |= FontStyle::ITALIC,
            "-italic" => spec.remove_style |= FontStyle::ITALIC,
            "" => {},
            _ => {
                let first = token.chars().next().unwrap_or(' ');
                if first.is_ascii_digit() || first == '+' || first == '-' {
                    if size_set {
                        return Err(invalid("size specified more than once"));
                    }
                    size_set = true;

                    spec.size = if first == '+' || first == '-' {
                        FontSize::Relative(parse_integer(&token).map_err(|e| invalid(&e.0))?)
                    } else if let Some(percent) = token.strip_suffix('%') {
                        let percent = parse_integer(percent).map_err(|e| invalid(&e.0))?;
                        FontSize::Scaled(percent as f32 / 100.0)
                    } else {
                        FontSize::Absolute(parse_integer(&token).map_err(|e| invalid(&e.0))?)
                    };
                } else if let Some(key) = token.strip_prefix('$') {
                    if spec.base_font_key.is_some() {
                        return Err(invalid("baseFontKey specified more than once"));
                    }
                    spec.base_font_key = Some(key.to_string());
                } else {
                    spec.families.push(token);
                }
            },
        }
    }

    let changes = spec.add_style | spec.remove_style;
    if spec.style.is_some() && !changes.is_empty() {
        return Err(invalid(
            "can not mix absolute style (e.g. 'bold') with derived style (e.g. '+italic')",
        ));
    }
    if !(spec.add_style & spec.remove_style).is_empty() {
        return Err(invalid("can not use '+bold' and '-bold' or '+italic' and '-italic'"));
    }

    Ok(spec)
}
