//! Property-based tests for configuration module

use super::*;
use proptest::prelude::*;

prop_compose! {
    fn valid_window_config()(
        max_default_width in 1i32..4000,
        max_default_height in 1i32..4000,
        empty_window_size in 1i32..1000,
        geometry_widget_probe_size in 1000i32..100_000,
        focus_on_show in any::<bool>(),
        immediate in any::<bool>(),
    ) -> WindowConfig {
        WindowConfig {
            max_default_width,
            max_default_height,
            empty_window_size,
            geometry_widget_probe_size,
            focus_on_show,
            resize_mode: if immediate { ResizeMode::Immediate } else { ResizeMode::Queue },
        }
    }
}

prop_compose! {
    fn valid_display_config()(
        fake_multihead in any::<bool>(),
        builtin_panel_prefix in "[A-Za-z]{1,6}",
        legacy_default_output_name in "[a-z]{1,10}",
    ) -> DisplayConfig {
        DisplayConfig {
            fake_multihead,
            builtin_panel_prefix,
            legacy_default_output_name,
        }
    }
}

proptest! {
    #[test]
    fn test_valid_configs_validate(window in valid_window_config(), display in valid_display_config()) {
        let config = CasementConfig {
            general: GeneralConfig::default(),
            display,
            window,
        };
        prop_assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_preserves_config(window in valid_window_config(), display in valid_display_config()) {
        let config = CasementConfig {
            general: GeneralConfig { debug: true },
            display,
            window,
        };
        let text = toml::to_string(&config).unwrap();
        let parsed: CasementConfig = toml::from_str(&text).unwrap();
        prop_assert_eq!(parsed, config);
    }

    #[test]
    fn test_non_positive_limits_are_rejected(width in -100i32..=0) {
        let mut config = CasementConfig::default();
        config.window.max_default_width = width;
        prop_assert!(config.validate().is_err());
    }
}
