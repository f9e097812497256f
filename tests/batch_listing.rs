use std::fs;
use std::path::Path;

use insect_counter::{
    list_videos, Analyzer, CounterSettings, MemorySink, VideoInfoLog, VideoOutcome,
};

fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"not really a video").unwrap();
}

#[test]
fn folder_listing_is_filtered_and_sorted() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["c.mp4", ".b.mp4", "a.mp4", "notes.txt", "d.avi", "e.mp4.part"] {
        touch(dir.path(), name);
    }
    fs::create_dir(dir.path().join("nested")).unwrap();

    let list = list_videos(dir.path(), "mp4").unwrap();
    assert_eq!(list.folder, dir.path());
    assert_eq!(list.files, vec!["a.mp4".to_string(), "c.mp4".to_string()]);
    let paths: Vec<_> = list.paths().collect();
    assert_eq!(paths[1], dir.path().join("c.mp4"));
}

#[test]
fn single_file_lists_itself() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "clip.mp4");

    let list = list_videos(&dir.path().join("clip.mp4"), "mp4").unwrap();
    assert_eq!(list.folder, dir.path());
    assert_eq!(list.files, vec!["clip.mp4".to_string()]);

    let list = list_videos(&dir.path().join("clip.avi"), "mp4").unwrap();
    assert!(list.is_empty());
}

#[test]
fn unreadable_videos_are_logged_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "broken.mp4");
    touch(dir.path(), "empty.mp4");
    let info_path = dir.path().join("info.csv");

    let analyzer = Analyzer::new(CounterSettings::default()).unwrap();
    let list = list_videos(dir.path(), "mp4").unwrap();
    let mut info = VideoInfoLog::open(&info_path).unwrap();
    let mut sink = MemorySink::default();

    for path in list.paths() {
        let outcome = analyzer
            .analyze(path.to_str().unwrap(), Some(&mut info), &mut sink, &mut |_| {
                panic!("no pipeline may start for an invalid video")
            })
            .unwrap();
        assert!(matches!(outcome, VideoOutcome::Skipped(_)));
    }

    assert!(sink.records.is_empty());
    let rows = fs::read_to_string(&info_path).unwrap();
    let names: Vec<&str> = rows
        .lines()
        .map(|line| line.split(',').next().unwrap())
        .collect();
    assert_eq!(names, vec!["broken.mp4", "empty.mp4"]);
    assert!(rows.lines().all(|line| line.contains(",false,")));
}

#[test]
fn synthetic_batch_writes_one_row_per_second() {
    let dir = tempfile::tempdir().unwrap();
    let info_path = dir.path().join("info.csv");
    let analyzer = Analyzer::new(CounterSettings::default()).unwrap();
    let mut info = VideoInfoLog::open(&info_path).unwrap();
    let mut sink = MemorySink::default();

    for path in [
        "stub://first?frames=30&fps=10",
        "stub://none?frames=0",
        "stub://second?frames=50&fps=25",
    ] {
        analyzer
            .analyze(path, Some(&mut info), &mut sink, &mut |_| {})
            .unwrap();
    }

    let per_video = |name: &str| sink.records.iter().filter(|r| r.video == name).count();
    assert_eq!(per_video("first"), 3);
    assert_eq!(per_video("none"), 0);
    assert_eq!(per_video("second"), 2);
    assert_eq!(fs::read_to_string(&info_path).unwrap().lines().count(), 3);
}
