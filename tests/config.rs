use cachesim_rs::{ConfigError, Geometry, SimConfig};
use pretty_assertions::assert_eq;

#[test]
fn default_geometry() {
    let g = SimConfig::default().validate().unwrap();
    assert_eq!(
        g,
        Geometry { words_per_line: 2, lines_per_set: 2, sets: 2, memory_words: 32 }
    );
    assert_eq!(SimConfig::default().cache_bytes(), 64);
}

#[test]
fn rejects_bad_geometry() {
    let base = SimConfig::default();
    let check = |cfg: SimConfig| cfg.validate().unwrap_err();

    assert_eq!(check(SimConfig { sets: 0, ..base }), ConfigError::NotPositive { field: "sets" });
    assert_eq!(
        check(SimConfig { line_bytes: 12, ..base }),
        ConfigError::NotWordMultiple { field: "line_bytes", value: 12 }
    );
    assert_eq!(
        check(SimConfig { line_bytes: 2048, memory_bytes: 1 << 20, ..base }),
        ConfigError::LineTooLarge(2048)
    );
    assert_eq!(
        check(SimConfig { memory_bytes: 260, ..base }),
        ConfigError::NotWordMultiple { field: "memory_bytes", value: 260 }
    );
    assert_eq!(
        check(SimConfig { memory_bytes: 64, ..base }),
        ConfigError::MemoryTooSmall { memory: 64, cache: 64 }
    );
}

#[test]
fn accepts_max_line() {
    let cfg = SimConfig { memory_bytes: 8192, line_bytes: 1024, lines_per_set: 2, sets: 2 };
    assert_eq!(cfg.validate().unwrap().words_per_line, 128);
}

#[test]
fn parses_key_value_file() {
    let text = "# main memory\nmemory_bytes = 1024\n\nline_bytes=32  # per line\nlines_per_set = 4\n";
    let cfg = SimConfig::from_kv_str(text).unwrap();
    assert_eq!(
        cfg,
        SimConfig { memory_bytes: 1024, line_bytes: 32, lines_per_set: 4, sets: 2 }
    );
}

#[test]
fn key_value_errors_carry_line_numbers() {
    assert!(matches!(
        SimConfig::from_kv_str("sets = 2\nways = 4"),
        Err(ConfigError::Parse { line: 2, .. })
    ));
    assert!(matches!(
        SimConfig::from_kv_str("sets = two"),
        Err(ConfigError::Parse { line: 1, .. })
    ));
    assert!(matches!(
        SimConfig::from_kv_str("sets"),
        Err(ConfigError::Parse { line: 1, .. })
    ));
}

#[test]
fn parses_json() {
    let cfg = SimConfig::from_json(r#"{"memory_bytes": 512, "sets": 4}"#).unwrap();
    assert_eq!(
        cfg,
        SimConfig { memory_bytes: 512, line_bytes: 16, lines_per_set: 2, sets: 4 }
    );
    assert!(matches!(SimConfig::from_json("{"), Err(ConfigError::Json(_))));
}

#[test]
fn cache_bytes_saturates_on_huge_geometry() {
    let cfg = SimConfig {
        memory_bytes: 256,
        line_bytes: u64::MAX,
        lines_per_set: 4,
        sets: 4,
    };
    assert_eq!(cfg.cache_bytes(), u64::MAX);
}
