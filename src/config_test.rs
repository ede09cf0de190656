use super::*;

use crate::Error;

#[test]
fn test_config_new() {
    let mut config = Config::new("test-config");
    assert_eq!(config.name, "test-config");
    assert_eq!(config.max_depth, MAX_TREE_DEPTH);
    assert_eq!(config.auto_compact, None);
    assert!(config.check().is_ok());

    config.set_max_depth(20).set_auto_compact(Some(30));
    assert_eq!(config.max_depth, 20);
    assert_eq!(config.auto_compact, Some(30));
    assert!(config.check().is_ok());

    assert_eq!(Config::default().name, "avl-index");
}

#[test]
fn test_config_check() {
    let mut config = Config::new("test-config");
    config.set_max_depth(0);
    assert!(matches!(config.check(), Err(Error::InvalidConfig(_, _))));
    config.set_max_depth(MAX_DEPTH_LIMIT + 1);
    assert!(matches!(config.check(), Err(Error::InvalidConfig(_, _))));
    config.set_max_depth(usize::MAX);
    assert!(matches!(config.check(), Err(Error::InvalidConfig(_, _))));
    config.set_max_depth(MAX_DEPTH_LIMIT);
    assert!(config.check().is_ok());

    let mut config = Config::new("test-config");
    config.set_auto_compact(Some(0));
    assert!(matches!(config.check(), Err(Error::InvalidConfig(_, _))));
    config.set_auto_compact(Some(101));
    assert!(matches!(config.check(), Err(Error::InvalidConfig(_, _))));
    config.set_auto_compact(Some(100));
    assert!(config.check().is_ok());
}

#[test]
fn test_config_from_toml() {
    let config = Config::from_toml(r#"name = "users""#).unwrap();
    assert_eq!(config, Config::new("users"));

    let text = r#"
        name = "users"
        max_depth = 64
        auto_compact = 25
    "#;
    let config = Config::from_toml(text).unwrap();
    assert_eq!(config.name, "users");
    assert_eq!(config.max_depth, 64);
    assert_eq!(config.auto_compact, Some(25));

    let text = r#"max_depth = 64"#;
    assert!(matches!(
        Config::from_toml(text),
        Err(Error::InvalidConfig(_, _))
    ));

    let text = r#"
        name = "users"
        auto_compact = 200
    "#;
    assert!(matches!(
        Config::from_toml(text),
        Err(Error::InvalidConfig(_, _))
    ));
}
