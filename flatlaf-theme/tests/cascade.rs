use std::fs;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use flatlaf_theme::color::Color;
use flatlaf_theme::defaults::UIDefaults;
use flatlaf_theme::error::ThemeError;
use flatlaf_theme::intellij::IntelliJTheme;
use flatlaf_theme::loader::{DefaultsAddon, DefaultsLoader, FolderAddon};
use flatlaf_theme::manager::ThemeManager;
use flatlaf_theme::theme::{LevelSource, Theme, ThemeLevel};
use flatlaf_theme::value::{Insets, Value};

fn text_theme(levels: &[(&str, &str)]) -> Theme {
    Theme::new(
        "test",
        false,
        levels
            .iter()
            .map(|(name, text)| ThemeLevel::new(*name, LevelSource::Text(text.to_string())))
            .collect(),
    )
}

#[test]
fn test_end_to_end_scenario() {
    let theme = text_theme(&[(
        "Base",
        "@base = #ff0000\n\
         Button.background = @base\n\
         *.background = #00ff00\n\
         Label.background = #0000ff\n",
    )]);

    let defaults = DefaultsLoader::new().load(&theme).unwrap();
    assert_eq!(defaults.get_color("Button.background"), Some(Color::rgb(0, 255, 0)));
    assert_eq!(defaults.get_color("Label.background"), Some(Color::rgb(0, 0, 255)));
    assert!(!defaults.contains_key("*.background"));
}

#[test]
fn test_global_precedence() {
    let mut base = UIDefaults::new();
    base.put("Tree.foo", "base");
    base.put("List.foo", "base");

    let defaults = DefaultsLoader::new()
        .base_defaults(base)
        .load(&text_theme(&[("Base", "*.foo = X\nPanel.foo = Y")]))
        .unwrap();

    assert_eq!(defaults.get_string("Panel.foo").as_deref(), Some("Y"));
    assert_eq!(defaults.get_string("Tree.foo").as_deref(), Some("X"));
    assert_eq!(defaults.get_string("List.foo").as_deref(), Some("X"));
}

#[test]
fn test_cascade_precedence() {
    let defaults = DefaultsLoader::new()
        .load(&text_theme(&[("A", "K = #111111"), ("B", "K = #222222")]))
        .unwrap();
    assert_eq!(defaults.get_color("K"), Some(Color::rgb(0x22, 0x22, 0x22)));
}

#[test]
fn test_reference_cycle_aborts_load() {
    let err = DefaultsLoader::new()
        .load(&text_theme(&[("Base", "@a = @b\n@b = @a\nFoo.background = @a")]))
        .unwrap_err();
    match err {
        ThemeError::ReferenceCycle { chain } => assert_eq!(chain.first(), Some(&"Foo.background".to_string())),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_self_referencing_if_aborts_load() {
    let theme = text_theme(&[("Base", "@x = if(true,@x,#000000)\nFoo.background = @x")]);
    for strict in [true, false] {
        let err = DefaultsLoader::new().strict(strict).load(&theme).unwrap_err();
        assert!(matches!(err, ThemeError::ReferenceCycle { .. }), "strict {}: {:?}", strict, err);
    }
}

#[test]
fn test_intellij_theme_loads_over_darcula() {
    let json = r##"{
        "name": "Deep Ocean",
        "dark": true,
        "colors": { "bg": "#0f111a", "accent": "#84ffff" },
        "ui": {
            "*": { "selectionBackground": "accent" },
            "Panel.background": "bg",
            "ScrollBar.thumbColor": "accent",
            "Table.gridColor": "not a color"
        },
        "icons": { "ColorPalette": { "Checkbox.Border.Default.Dark": "#4b4b4b" } }
    }"##;

    let intellij = IntelliJTheme::parse(json).unwrap();
    let theme = Theme::from_intellij(&intellij, LevelSource::IntelliJJson(json.to_string()));
    assert_eq!(theme.levels().len(), 4);

    let defaults = DefaultsLoader::new().strict(true).load(&theme).unwrap();
    let accent = Color::rgb(0x84, 0xff, 0xff);
    assert_eq!(defaults.get_bool("Component.isIntelliJTheme"), Some(true));
    assert_eq!(defaults.get_color("Panel.background"), Some(Color::rgb(0x0f, 0x11, 0x1a)));
    assert_eq!(defaults.get_color("Button.disabledBackground"), Some(Color::rgb(0x0f, 0x11, 0x1a)));
    assert_eq!(defaults.get_color("List.selectionBackground"), Some(accent));
    assert_eq!(defaults.get_color("ScrollBar.thumb"), Some(accent));
    assert_eq!(defaults.get_color("CheckBox.icon.borderColor"), Some(Color::rgb(0x4b, 0x4b, 0x4b)));
    assert!(defaults.get_color("Desktop.background").is_some());
    assert!(!defaults.contains_key("ScrollBar.thumbColor"));
}

#[test]
fn test_custom_source_folders() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Base.properties"), "Foo.margin = 1,2,3,4\n@accent = #00ff00").unwrap();
    fs::write(dir.path().join("Unrelated.properties"), "Foo.margin = 9,9,9,9").unwrap();

    let theme = text_theme(&[("Base", "@accent = #ff0000\nFoo.margin = 0,0,0,0\nFoo.background = @accent")]);
    let defaults = DefaultsLoader::new().custom_source(dir.path()).load(&theme).unwrap();

    assert_eq!(defaults.get_insets("Foo.margin"), Some(Insets::new(1, 2, 3, 4)));
    assert_eq!(defaults.get_color("Foo.background"), Some(Color::rgb(0, 255, 0)));
}

#[test]
fn test_missing_custom_source_folder_is_skipped() {
    let defaults = DefaultsLoader::new()
        .custom_source("/nonexistent/flatlaf/themes")
        .load(&text_theme(&[("Base", "Foo.bar = 1")]))
        .unwrap();
    assert_eq!(defaults.get_int("Foo.bar"), Some(1));
}

struct BrokenAddon;

impl DefaultsAddon for BrokenAddon {
    fn name(&self) -> &str {
        "broken"
    }

    fn defaults(&self, _level: &ThemeLevel) -> io::Result<Option<String>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
    }

    fn priority(&self) -> i32 {
        1
    }
}

struct HookAddon {
    called: Arc<AtomicBool>,
}

impl DefaultsAddon for HookAddon {
    fn name(&self) -> &str {
        "hook"
    }

    fn defaults(&self, level: &ThemeLevel) -> io::Result<Option<String>> {
        Ok((level.name() == "Base").then(|| "Hook.value = 7".to_string()))
    }

    fn after_defaults_loading(&self, defaults: &mut UIDefaults) {
        self.called.store(true, Ordering::SeqCst);
        defaults.put("Hook.after", Value::Bool(true));
    }
}

#[test]
fn test_failing_addon_does_not_stop_others() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Base.properties"), "Folder.value = 3").unwrap();

    let called = Arc::new(AtomicBool::new(false));
    let defaults = DefaultsLoader::new()
        .addon(BrokenAddon)
        .addon(HookAddon { called: Arc::clone(&called) })
        .addon(FolderAddon::new("folder", dir.path()).with_priority(5))
        .load(&text_theme(&[("Base", "Base.value = 1")]))
        .unwrap();

    assert_eq!(defaults.get_int("Base.value"), Some(1));
    assert_eq!(defaults.get_int("Hook.value"), Some(7));
    assert_eq!(defaults.get_int("Folder.value"), Some(3));
    assert_eq!(defaults.get_bool("Hook.after"), Some(true));
    assert!(called.load(Ordering::SeqCst));
}

#[test]
fn test_manager_keeps_table_when_switch_fails() {
    let manager = ThemeManager::new(DefaultsLoader::new());
    manager.activate_by_name("light").unwrap();
    let light = manager.defaults();

    let broken = text_theme(&[("Base", "Foo.margin = 1,2")]);
    assert!(matches!(manager.activate(broken), Err(ThemeError::Malformed { .. })));

    let current = manager.defaults();
    assert!(Arc::ptr_eq(&light, &current));
    assert_eq!(manager.current_theme().unwrap().name(), "light");
}

#[test]
fn test_reload_picks_up_changed_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Base.properties");
    fs::write(&path, "Foo.bar = 1").unwrap();

    let manager = ThemeManager::new(DefaultsLoader::new().custom_source(dir.path()));
    manager.activate(text_theme(&[("Base", "")])).unwrap();
    assert_eq!(manager.defaults().get_int("Foo.bar"), Some(1));

    fs::write(&path, "Foo.bar = 2").unwrap();
    manager.reload().unwrap();
    assert_eq!(manager.defaults().get_int("Foo.bar"), Some(2));
}
