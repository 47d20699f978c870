use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use fset::{BufReadLines, FieldSet, Order, ReadOptions, Reader};
use serde_json::json;
use similar::{ChangeTag, TextDiff};
use tracing::debug;
use walkdir::WalkDir;

use crate::cli::*;
use crate::config::CliConfig;

struct Session {
    config: CliConfig,
    format: OutputFormat,
}

impl Session {
    fn json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    fn order(&self, sorted: bool) -> Order {
        if sorted {
            Order::Sorted
        } else {
            self.config.write.order
        }
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?.with_flags(cli.tolerant, cli.multiple);
    debug!(?config, "loaded configuration");
    let session = Session {
        config,
        format: cli.format,
    };
    match cli.command {
        Command::Show(args) => cmd_show(&session, args),
        Command::Get(args) => cmd_get(&session, args),
        Command::Keys(args) => cmd_keys(&session, args),
        Command::Set(args) => cmd_set(&session, args),
        Command::Rm(args) => cmd_rm(&session, args),
        Command::Fmt(args) => cmd_fmt(&session, args),
        Command::Merge(args) => cmd_merge(&session, args),
        Command::Diff(args) => cmd_diff(&session, args),
        Command::Check(args) => cmd_check(&session, args),
    }
}

fn parse_bytes(bytes: &[u8], options: &ReadOptions) -> fset::Result<FieldSet> {
    Reader::new(options.clone()).read(&mut BufReadLines::new(bytes))
}

fn load(path: &Path, options: &ReadOptions) -> anyhow::Result<FieldSet> {
    FieldSet::read_file(path, options).with_context(|| format!("reading {}", path.display()))
}

/// Write through a temporary file in the same directory, then rename.
fn save(fs: &FieldSet, path: &Path, order: Order) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        fs.write_to(&mut w, order)?;
        w.flush()?;
    }
    tmp.persist(path)
        .with_context(|| format!("writing {}", path.display()))?;
    debug!(path = %path.display(), "saved field set");
    Ok(())
}

fn cmd_show(s: &Session, args: ShowArgs) -> anyhow::Result<()> {
    let fs = load(&args.file, &s.config.read)?;
    if s.json() {
        println!("{}", serde_json::to_string_pretty(&fs.snapshot())?);
    } else {
        print!("{}", fs.to_string_in(s.order(args.sorted)));
    }
    Ok(())
}

fn cmd_get(s: &Session, args: GetArgs) -> anyhow::Result<()> {
    let fs = load(&args.file, &s.config.read)?;
    let value = fs.get_string(&args.key)?;
    match (s.json(), args.all) {
        (true, true) => println!("{}", json!(fset::path::split_values(&value))),
        (true, false) => println!("{}", json!(value)),
        (false, true) => {
            for v in fset::path::split_values(&value) {
                println!("{v}");
            }
        }
        (false, false) => println!("{value}"),
    }
    Ok(())
}

fn cmd_keys(s: &Session, args: KeysArgs) -> anyhow::Result<()> {
    let fs = load(&args.file, &s.config.read)?;
    if s.json() {
        let keys: Vec<String> = fs.keys_with_prefix(&args.prefix).collect();
        println!("{}", json!(keys));
    } else {
        for key in fs.keys_with_prefix(&args.prefix) {
            println!("{key}");
        }
    }
    Ok(())
}

fn cmd_set(s: &Session, args: SetArgs) -> anyhow::Result<()> {
    let fs = if args.file.exists() {
        load(&args.file, &s.config.read)?
    } else {
        FieldSet::new()
    };
    if args.append {
        fs.put_append(&args.key, &args.value)?;
    } else {
        fs.put_overwrite(&args.key, &args.value)?;
    }
    save(&fs, &args.file, s.config.write.order)?;
    println!("{} Set {} = {}", "✓".green().bold(), args.key.bold(), args.value);
    Ok(())
}

fn cmd_rm(s: &Session, args: RmArgs) -> anyhow::Result<()> {
    let fs = load(&args.file, &s.config.read)?;
    if args.subset {
        if fs.subset(&args.key).is_none() {
            bail!("no such subset: {}", args.key);
        }
        fs.remove_subset(&args.key);
    } else {
        if fs.get(&args.key).is_none() {
            bail!("no such key: {}", args.key);
        }
        fs.remove_value(&args.key);
    }
    save(&fs, &args.file, s.config.write.order)?;
    println!("{} Removed {}", "✓".green().bold(), args.key.bold());
    Ok(())
}

fn cmd_fmt(s: &Session, args: FmtArgs) -> anyhow::Result<()> {
    let raw = std::fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let fs = parse_bytes(&raw, &s.config.read)
        .with_context(|| format!("parsing {}", args.file.display()))?;
    let canonical = fs.to_ordered_string();
    let is_canonical = raw == canonical.as_bytes();

    if args.check {
        if !is_canonical {
            bail!("{} is not in canonical order", args.file.display());
        }
        println!("{} {} is canonical", "✓".green().bold(), args.file.display());
        return Ok(());
    }
    if is_canonical {
        println!("{} unchanged", args.file.display());
    } else {
        save(&fs, &args.file, Order::Sorted)?;
        println!("{} Formatted {}", "✓".green().bold(), args.file.display());
    }
    Ok(())
}

fn cmd_merge(s: &Session, args: MergeArgs) -> anyhow::Result<()> {
    let base = load(&args.base, &s.config.read)?;
    let overlay = load(&args.overlay, &s.config.read)?;
    base.put_all_overwrite(&overlay);
    let order = s.config.write.order;
    match &args.output {
        Some(out) => {
            save(&base, out, order)?;
            println!(
                "{} Merged {} into {} ({} values)",
                "✓".green().bold(),
                args.overlay.display(),
                out.display(),
                base.len()
            );
        }
        None if s.json() => println!("{}", serde_json::to_string_pretty(&base.snapshot())?),
        None => print!("{}", base.to_string_in(order)),
    }
    Ok(())
}

fn cmd_diff(s: &Session, args: DiffArgs) -> anyhow::Result<()> {
    let a = load(&args.a, &s.config.read)?.to_ordered_string();
    let b = load(&args.b, &s.config.read)?.to_ordered_string();
    let diff = TextDiff::from_lines(&a, &b);

    if s.json() {
        let mut removed = Vec::new();
        let mut added = Vec::new();
        for change in diff.iter_all_changes() {
            let line = change.value().trim_end_matches('\n').to_string();
            match change.tag() {
                ChangeTag::Delete => removed.push(line),
                ChangeTag::Insert => added.push(line),
                ChangeTag::Equal => {}
            }
        }
        let equal = removed.is_empty() && added.is_empty();
        println!("{}", json!({ "equal": equal, "removed": removed, "added": added }));
        return Ok(());
    }

    if a == b {
        println!("No differences.");
        return Ok(());
    }
    println!("{}", format!("--- {}", args.a.display()).red());
    println!("{}", format!("+++ {}", args.b.display()).green());
    for change in diff.iter_all_changes() {
        let line = change.value().trim_end_matches('\n');
        match change.tag() {
            ChangeTag::Delete => println!("{}", format!("-{line}").red()),
            ChangeTag::Insert => println!("{}", format!("+{line}").green()),
            ChangeTag::Equal => println!(" {}", line.dimmed()),
        }
    }
    Ok(())
}

fn cmd_check(s: &Session, args: CheckArgs) -> anyhow::Result<()> {
    let mut reports = Vec::new();
    for entry in WalkDir::new(&args.dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", args.dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches_ext = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| args.ext.iter().any(|want| want == e));
        if !matches_ext {
            continue;
        }
        let result = FieldSet::read_file(entry.path(), &s.config.read);
        reports.push((entry.path().to_path_buf(), result));
    }

    let failures = reports.iter().filter(|(_, r)| r.is_err()).count();
    if s.json() {
        let items: Vec<_> = reports
            .iter()
            .map(|(path, result)| match result {
                Ok(fs) => json!({ "path": path.display().to_string(), "ok": true, "values": fs.len() }),
                Err(e) => json!({ "path": path.display().to_string(), "ok": false, "error": e.to_string() }),
            })
            .collect();
        println!("{}", json!(items));
    } else {
        for (path, result) in &reports {
            match result {
                Ok(fs) => println!("{} {} ({} values)", "✓".green(), path.display(), fs.len()),
                Err(e) => println!("{} {}: {}", "✗".red().bold(), path.display(), e),
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} file(s) failed to parse", reports.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(format: OutputFormat) -> Session {
        Session {
            config: CliConfig::default(),
            format,
        }
    }

    #[test]
    fn save_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.fs");
        std::fs::write(&path, "old=1\nEnd\n").unwrap();

        let fs = FieldSet::new();
        fs.put_single("b", "2").unwrap();
        fs.put_single("a", "1").unwrap();
        save(&fs, &path, Order::Sorted).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a=1\nb=2\nEnd\n");
    }

    #[test]
    fn set_creates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("new.fs");
        let s = session(OutputFormat::Text);
        for value in ["x", "y"] {
            cmd_set(
                &s,
                SetArgs {
                    file: file.clone(),
                    key: "tags.list".into(),
                    value: value.into(),
                    append: true,
                },
            )
            .unwrap();
        }
        let fs = FieldSet::read_file(&file, &ReadOptions::default()).unwrap();
        assert_eq!(fs.get_all("tags.list").unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn rm_missing_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.fs");
        std::fs::write(&file, "a=1\nEnd\n").unwrap();
        let err = cmd_rm(
            &session(OutputFormat::Text),
            RmArgs {
                file: file.clone(),
                key: "b".into(),
                subset: false,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("no such key"));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "a=1\nEnd\n");
    }

    #[test]
    fn fmt_check_detects_non_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.fs");
        std::fs::write(&file, "b=2\na=1\nEnd\n").unwrap();
        let s = session(OutputFormat::Text);
        let check = |file: &Path| {
            cmd_fmt(
                &s,
                FmtArgs {
                    file: file.to_path_buf(),
                    check: true,
                },
            )
        };
        assert!(check(&file).is_err());
        cmd_fmt(
            &s,
            FmtArgs {
                file: file.clone(),
                check: false,
            },
        )
        .unwrap();
        assert!(check(&file).is_ok());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "a=1\nb=2\nEnd\n");
    }

    #[test]
    fn merge_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.fs");
        let overlay = dir.path().join("overlay.fs");
        let out = dir.path().join("out.fs");
        std::fs::write(&base, "ui.theme=light\nui.lang=en\nEnd\n").unwrap();
        std::fs::write(&overlay, "ui.theme=dark\nEnd\n").unwrap();
        cmd_merge(
            &session(OutputFormat::Text),
            MergeArgs {
                base,
                overlay,
                output: Some(out.clone()),
            },
        )
        .unwrap();
        let merged = FieldSet::read_file(&out, &ReadOptions::default()).unwrap();
        assert_eq!(merged.get("ui.theme").as_deref(), Some("dark"));
        assert_eq!(merged.get("ui.lang").as_deref(), Some("en"));
    }

    #[test]
    fn check_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.properties"), "a=1\nEnd\n").unwrap();
        std::fs::write(dir.path().join("bad.properties"), "a=1\n").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "garbage").unwrap();
        let args = || CheckArgs {
            dir: dir.path().to_path_buf(),
            ext: vec!["properties".into()],
        };
        let err = cmd_check(&session(OutputFormat::Json), args()).unwrap_err();
        assert!(err.to_string().contains("1 of 2"));

        let tolerant = Session {
            config: CliConfig::default().with_flags(true, false),
            format: OutputFormat::Text,
        };
        assert!(cmd_check(&tolerant, args()).is_ok());
    }

    #[test]
    fn parse_bytes_respects_options() {
        let strict = parse_bytes(b"k=a\nk=b\nEnd\n", &ReadOptions::default());
        assert!(strict.is_err());
        let multi = parse_bytes(b"k=a\nk=b\nEnd\n", &ReadOptions::multiple()).unwrap();
        assert_eq!(multi.get("k").as_deref(), Some("a;b"));
    }
}
