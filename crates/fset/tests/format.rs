use std::cell::RefCell;
use std::io::Cursor;
use std::sync::Arc;
use std::thread;

use fset::{
    BufReadLines, Diagnostic, FieldSet, FieldSetError, Order, ReadOptions, Reader, StrLines,
};

const RECORD: &str = "\
key1=value1
key2.subkey=value2
key2.other=value3a;value3b
End
";

#[test]
fn documented_record_shape() {
    let fs: FieldSet = RECORD.parse().unwrap();
    assert_eq!(fs.get("key1").as_deref(), Some("value1"));
    assert_eq!(fs.get("key2.subkey").as_deref(), Some("value2"));
    assert_eq!(fs.get_all("key2.other").unwrap(), vec!["value3a", "value3b"]);
    assert_eq!(fs.keys().collect::<Vec<_>>(), vec!["key1", "key2.subkey", "key2.other"]);
    assert_eq!(fs.to_string(), RECORD);
}

#[test]
fn blog_settings_example() {
    let fs = FieldSet::parse_str("title=Hello\ncat.1=News\ncat.2=Tech\nEnd\n", false, true).unwrap();
    assert_eq!(fs.get("title").as_deref(), Some("Hello"));
    assert_eq!(fs.get_all("cat.1").unwrap(), vec!["News"]);
    let cat = fs.get_subset("cat").unwrap();
    assert_eq!(cat.top_level_keys(), vec!["1", "2"]);
    assert_eq!(cat.get("2").as_deref(), Some("Tech"));
    assert!(matches!(
        fs.get_subset("tags"),
        Err(FieldSetError::MissingSubset { .. })
    ));
}

#[test]
fn stream_of_records() {
    let data = "a=1\nEnd\nb=2\nEndMessage\n";
    let mut lines = BufReadLines::new(Cursor::new(data));
    let reader = Reader::new(ReadOptions::default());
    let first = reader.read(&mut lines).unwrap();
    let second = reader.read(&mut lines).unwrap();
    assert_eq!(first.to_string(), "a=1\nEnd\n");
    assert_eq!(second.to_string(), "b=2\nEndMessage\n");
    let err = reader.read(&mut lines).unwrap_err();
    assert!(err.is_framing());
}

#[test]
fn tolerant_truncation_keeps_parsed_pairs() {
    let reports = RefCell::new(Vec::new());
    let sink = |d: &Diagnostic| reports.borrow_mut().push(d.to_string());
    let fs = Reader::new(ReadOptions::tolerant())
        .with_diagnostics(&sink)
        .read(&mut StrLines::new("a=1\n\nb.c=2\n"))
        .unwrap();
    assert_eq!(fs.get("a").as_deref(), Some("1"));
    assert_eq!(fs.get("b.c").as_deref(), Some("2"));
    let reports = reports.into_inner();
    assert_eq!(reports.len(), 2);
    assert!(reports[0].contains("blank line"));
    assert!(reports[1].contains("no end marker"));
}

#[test]
fn strict_failure_does_not_touch_other_sets() {
    let good: FieldSet = "a=1\nEnd\n".parse().unwrap();
    let err = FieldSet::parse_str("a=1\na=2\nEnd\n", false, true).unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(good.get("a").as_deref(), Some("1"));
}

#[test]
fn merge_then_serialize_canonically() {
    let defaults: FieldSet = "ui.lang=en\nui.theme=light\nposts.per_page=10\nEnd\n"
        .parse()
        .unwrap();
    let user: FieldSet = "ui.theme=dark\nposts.drafts=true\nEnd\n".parse().unwrap();
    defaults.put_all_overwrite(&user);
    assert_eq!(
        defaults.to_ordered_string(),
        "posts.drafts=true\nposts.per_page=10\nui.lang=en\nui.theme=dark\nEnd\n"
    );
    assert!(defaults.get_boolean("posts.drafts").unwrap());
    assert_eq!(defaults.get_int("posts.per_page").unwrap(), 10);
}

#[test]
fn file_helpers_use_utf8() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("l10n.properties");
    let fs = FieldSet::new();
    fs.put_single("greeting", "Grüß Gott").unwrap();
    fs.put_single("menu.file", "Fichier").unwrap();
    fs.write_file(&path, Order::Insertion).unwrap();

    let raw = std::fs::read(&path).unwrap();
    assert_eq!(raw, "greeting=Grüß Gott\nmenu.file=Fichier\nEnd\n".as_bytes());

    let back = FieldSet::read_file(&path, &ReadOptions::default()).unwrap();
    assert_eq!(back, fs);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = FieldSet::read_file(dir.path().join("absent"), &ReadOptions::default()).unwrap_err();
    assert!(matches!(err, FieldSetError::Io(_)));
}

#[test]
fn concurrent_readers_and_writers() {
    let fs = Arc::new(FieldSet::interned());
    let writers: Vec<_> = (0..4)
        .map(|t| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                for i in 0..100 {
                    fs.put_overwrite(&format!("w{t}.n{}", i % 10), &i.to_string())
                        .unwrap();
                    if i % 7 == 0 {
                        fs.remove_value(&format!("w{t}.n{}", i % 10));
                    }
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                for _ in 0..100 {
                    let text = fs.to_ordered_string();
                    assert!(text.ends_with("End\n"));
                    let _ = fs.keys().count();
                }
            })
        })
        .collect();
    for h in writers.into_iter().chain(readers) {
        h.join().unwrap();
    }
    let text = fs.to_ordered_string();
    let back = FieldSet::parse_str(&text, false, true).unwrap();
    assert_eq!(back, *fs);
}
