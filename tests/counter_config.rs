use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use insect_counter::{area_fraction_to_pixels, CounterSettings};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "COUNTER_CONFIG",
        "COUNTER_FOLDER",
        "COUNTER_MIN_BRIGHTNESS",
        "COUNTER_MIN_SIZE",
        "COUNTER_MAX_SIZE",
        "COUNTER_RESULT_FILE",
        "COUNTER_VIDEO_INFO_FILE",
        "COUNTER_QUEUE_CAPACITY",
    ] {
        std::env::remove_var(key);
    }
}

fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_toml_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".toml",
        r#"
        [input]
        folder = "/srv/field-cam"
        extension = "avi"

        [detection]
        min_brightness = 18
        min_size = 500
        max_size = 30000

        [output]
        result_file = "counts.csv"
        "#,
    );
    std::env::set_var("COUNTER_MAX_SIZE", "35000");
    std::env::set_var("COUNTER_QUEUE_CAPACITY", "16");

    let cfg = CounterSettings::load(Some(file.path())).expect("load config");
    clear_env();

    assert_eq!(cfg.folder, Some(PathBuf::from("/srv/field-cam")));
    assert_eq!(cfg.extension(), "avi");
    assert_eq!(cfg.min_brightness, 18);
    assert_eq!(cfg.min_size, 500);
    assert_eq!(cfg.max_size, 35_000);
    assert_eq!(cfg.queue_capacity, 16);
    assert_eq!(cfg.result_file, PathBuf::from("counts.csv"));
    assert_eq!(cfg.video_info_file, PathBuf::from("video_info.csv"));
    assert_eq!(cfg.annotate_dir, None);
}

#[test]
fn json_file_is_found_through_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".json",
        r#"{ "detection": { "min_brightness": 30 }, "output": { "annotate_dir": "frames" } }"#,
    );
    std::env::set_var("COUNTER_CONFIG", file.path());
    std::env::set_var("COUNTER_FOLDER", "/data/videos");

    let cfg = CounterSettings::load(None).expect("load config");
    clear_env();

    assert_eq!(cfg.min_brightness, 30);
    assert_eq!(cfg.folder, Some(PathBuf::from("/data/videos")));
    assert_eq!(cfg.annotate_dir, Some(PathBuf::from("frames")));
    assert_eq!(cfg.min_size, 325);
    assert_eq!(cfg.max_size, 40_000);
}

#[test]
fn rejects_bad_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("COUNTER_MIN_BRIGHTNESS", "bright");
    assert!(CounterSettings::load(None).is_err());
    clear_env();

    std::env::set_var("COUNTER_MIN_BRIGHTNESS", "300");
    assert!(CounterSettings::load(None).is_err());
    clear_env();

    std::env::set_var("COUNTER_MIN_SIZE", "50000");
    assert!(CounterSettings::load(None).is_err());
    clear_env();

    let file = config_file(".toml", "[detection]\nthreshold = 4\n");
    assert!(CounterSettings::load(Some(file.path())).is_err());
}

#[test]
fn area_conversion_is_stable() {
    for (millionths, w, h) in [(325, 300, 225), (40_000, 300, 168), (1, 300, 200)] {
        let first = area_fraction_to_pixels(millionths, w, h);
        for _ in 0..10 {
            assert_eq!(area_fraction_to_pixels(millionths, w, h), first);
        }
    }
    assert_eq!(area_fraction_to_pixels(40_000, 300, 168), 2016);
    assert_eq!(area_fraction_to_pixels(1, 300, 200), 0);
}
