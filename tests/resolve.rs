//! End-to-end resolution tests
//!
//! Each test builds a throwaway workspace with directory sources and, where
//! remote behaviour matters, a wiremock server standing in for a repository.

use dep_fetch::{
    AcquireError, ArchiveFormat, Config, Manifest, Outcome, Resolver, SetupError, Strategy,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// A directory source under the workspace
    fn source(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join("sources").join(name);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    fn dep_dir(&self) -> PathBuf {
        self.dir.path().join("dep")
    }

    fn staging(&self) -> PathBuf {
        self.dir.path().join("staging")
    }

    fn config(&self, repositories: Vec<String>) -> Config {
        Config {
            repositories,
            dependency_directory: self.dep_dir(),
            seven_zip_executable: self.dir.path().join("no-such-7z"),
            http_timeout: Duration::from_secs(5),
            staging_dir: Some(self.staging()),
        }
    }

    /// Sorted names directly under the dependency directory
    fn installed(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dep_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn staging_is_empty(&self) -> bool {
        match std::fs::read_dir(self.staging()) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }
}

fn src(path: &Path) -> String {
    path.display().to_string()
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    std::fs::write(path, zip_bytes(entries)).unwrap();
}

/// Stand-in 7-Zip that records its arguments into the `-o` directory.
#[cfg(unix)]
fn fake_seven_zip(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("fake-7z");
    std::fs::write(
        &path,
        r#"#!/bin/sh
for a in "$@"; do case "$a" in -o*) out="${a#-o}";; esac; done
echo "$@" > "$out/unpacked.txt"
"#,
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

// =============================================================================
// Disk sources
// =============================================================================

#[test]
fn test_raw_file_is_copied_without_extraction() {
    let ws = Workspace::new();
    let source = ws.source("local");
    std::fs::write(source.join("foo-1.0.0.tar"), b"not extracted").unwrap();

    let config = ws.config(vec![src(&source)]);
    let report = Resolver::new(&config)
        .run(&Manifest::parse("foo 1.0.0\n"))
        .unwrap();

    let foo = report.get("foo").unwrap();
    match &foo.outcome {
        Outcome::Resolved {
            strategy,
            format,
            installed,
            ..
        } => {
            assert_eq!(*strategy, Strategy::DiskCopy);
            assert_eq!(*format, ArchiveFormat::Raw);
            assert_eq!(installed, &ws.dep_dir().join("foo.tar"));
        }
        other => panic!("expected foo to resolve, got {other:?}"),
    }
    assert_eq!(ws.installed(), vec!["foo.tar"]);
    assert_eq!(
        std::fs::read(ws.dep_dir().join("foo.tar")).unwrap(),
        b"not extracted"
    );
}

#[test]
fn test_missing_dependency_does_not_stop_the_run() {
    let ws = Workspace::new();
    let source = ws.source("local");
    write_zip(&source.join("present-1.0.zip"), &[("lib.txt", b"here")]);

    let config = ws.config(vec![src(&source)]);
    let report = Resolver::new(&config)
        .run(&Manifest::parse("absent 9.9\npresent 1.0\n"))
        .unwrap();

    assert_eq!(report.resolutions.len(), 2);
    assert_eq!(report.resolved_count(), 1);

    let absent = report.get("absent").unwrap();
    assert!(!absent.is_resolved());
    assert!(matches!(
        absent.last_error(),
        Some(AcquireError::NotFound { .. })
    ));

    assert!(report.get("present").unwrap().is_resolved());
    assert_eq!(ws.installed(), vec!["present"]);
    assert!(ws.dep_dir().join("present/lib.txt").is_file());
}

#[test]
fn test_later_sources_untouched_after_success() {
    let ws = Workspace::new();
    let first = ws.source("first");
    let second = ws.source("second");
    let third = ws.source("third");
    std::fs::write(second.join("foo-1.0.bin"), b"from second").unwrap();
    std::fs::write(third.join("foo-1.0.bin"), b"from third").unwrap();

    let config = ws.config(vec![src(&first), src(&second), src(&third)]);
    let report = Resolver::new(&config)
        .run(&Manifest::parse("foo 1.0\n"))
        .unwrap();

    let foo = report.get("foo").unwrap();
    assert_eq!(foo.source(), Some(src(&second).as_str()));
    // Every strategy of the first source, then the two remote ones of the second
    assert_eq!(foo.attempts.len(), 5);
    assert!(foo.attempts[..3].iter().all(|a| a.source == src(&first)));
    assert!(foo.attempts.iter().all(|a| a.source != src(&third)));
    assert_eq!(
        std::fs::read(ws.dep_dir().join("foo.bin")).unwrap(),
        b"from second"
    );
}

#[test]
fn test_rerun_is_idempotent() {
    let ws = Workspace::new();
    let source = ws.source("local");
    write_zip(&source.join("alpha-1.0.zip"), &[("a.txt", b"a")]);
    std::fs::write(source.join("beta-2.0.dat"), b"b").unwrap();

    let config = ws.config(vec![src(&source)]);
    let manifest = Manifest::parse("alpha 1.0\nbeta 2.0\ngamma 3.0\n");

    Resolver::new(&config).run(&manifest).unwrap();
    let first = ws.installed();

    // Something left over from outside the tool is wiped by the next run
    std::fs::write(ws.dep_dir().join("stray.txt"), b"stray").unwrap();

    Resolver::new(&config).run(&manifest).unwrap();
    assert_eq!(ws.installed(), first);
    assert_eq!(first, vec!["alpha", "beta.dat"]);
}

#[test]
fn test_corrupt_archive_leaves_nothing_for_later_raw_copy() {
    let ws = Workspace::new();
    let first = ws.source("first");
    let second = ws.source("second");
    std::fs::write(first.join("foo-1.0.0.zip"), b"truncated zip").unwrap();
    std::fs::write(second.join("foo-1.0.0.tar"), b"tar bytes").unwrap();

    let config = ws.config(vec![src(&first), src(&second)]);
    let report = Resolver::new(&config)
        .run(&Manifest::parse("foo 1.0.0\n"))
        .unwrap();

    let foo = report.get("foo").unwrap();
    assert_eq!(foo.source(), Some(src(&second).as_str()));
    assert!(foo.attempts.iter().any(|a| matches!(a.error, AcquireError::Extract { .. })));
    assert_eq!(ws.installed(), vec!["foo.tar"]);
    assert!(ws.staging_is_empty());
}

#[cfg(unix)]
#[test]
fn test_seven_zip_archive_on_disk() {
    let ws = Workspace::new();
    let source = ws.source("local");
    std::fs::write(source.join("foo-1.0.0.7z"), b"7z payload").unwrap();

    let config = Config {
        seven_zip_executable: fake_seven_zip(ws.dir.path()),
        ..ws.config(vec![src(&source)])
    };
    let report = Resolver::new(&config)
        .run(&Manifest::parse("foo 1.0.0\n"))
        .unwrap();

    match &report.get("foo").unwrap().outcome {
        Outcome::Resolved {
            strategy,
            format,
            installed,
            ..
        } => {
            assert_eq!(*strategy, Strategy::DiskCopy);
            assert_eq!(*format, ArchiveFormat::SevenZ);
            assert_eq!(installed, &ws.dep_dir().join("foo"));
        }
        other => panic!("expected foo to resolve, got {other:?}"),
    }
    let args = std::fs::read_to_string(ws.dep_dir().join("foo/unpacked.txt")).unwrap();
    assert!(args.starts_with("e "));
    assert!(args.trim_end().ends_with("-r -t7z -aoa"));
    assert!(source.join("foo-1.0.0.7z").exists());
    assert!(ws.staging_is_empty());
}

#[test]
fn test_dependency_directory_blocked_by_file() {
    let ws = Workspace::new();
    std::fs::write(ws.dep_dir(), b"in the way").unwrap();

    let config = ws.config(Vec::new());
    let err = Resolver::new(&config)
        .run(&Manifest::parse("foo 1.0\n"))
        .unwrap_err();
    assert!(matches!(err, SetupError::NotADirectory(_)));
}

#[test]
fn test_manifest_comments_and_malformed_lines() {
    let ws = Workspace::new();
    let source = ws.source("local");
    std::fs::write(source.join("qux-0.1.txt"), b"q").unwrap();

    let config = ws.config(vec![src(&source)]);
    let report = Resolver::new(&config)
        .run(&Manifest::parse("# see notes\nbaz\nqux 0.1\n"))
        .unwrap();

    assert_eq!(report.resolutions.len(), 1);
    assert!(report.get("qux").unwrap().is_resolved());
    assert!(report.get("baz").is_none());
}

// =============================================================================
// Remote sources
// =============================================================================

#[tokio::test]
async fn test_falls_back_from_404_url_to_directory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let ws = Workspace::new();
    let source_b = ws.source("b");
    write_zip(
        &source_b.join("bar-2.3.1.zip"),
        &[("include/bar.h", b"void bar(void);\n")],
    );

    let source_a = format!("{}/repo", server.uri());
    let config = ws.config(vec![source_a.clone(), src(&source_b)]);
    let report = Resolver::new(&config)
        .run(&Manifest::parse("bar 2.3.1\n"))
        .unwrap();

    let bar = report.get("bar").unwrap();
    assert_eq!(bar.source(), Some(src(&source_b).as_str()));
    match &bar.outcome {
        Outcome::Resolved { strategy, .. } => assert_eq!(*strategy, Strategy::DiskCopy),
        other => panic!("expected bar to resolve, got {other:?}"),
    }
    assert!(ws.dep_dir().join("bar/include/bar.h").is_file());

    let statuses: Vec<_> = bar
        .attempts
        .iter()
        .filter(|a| a.source == source_a)
        .filter_map(|a| match &a.error {
            AcquireError::Status { status, .. } => Some(*status),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec![404, 404]);

    let requested: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(requested, vec!["/repo/bar-2.3.1.zip", "/repo/bar-2.3.1.7z"]);
}

#[tokio::test]
async fn test_remote_zip_preferred_and_later_source_not_contacted() {
    let first = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lib-1.2.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_bytes(&[("lib.so", b"elf")])))
        .mount(&first)
        .await;

    let second = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_bytes(&[("other", b"x")])))
        .mount(&second)
        .await;

    let ws = Workspace::new();
    let config = ws.config(vec![first.uri(), second.uri()]);
    let report = Resolver::new(&config)
        .run(&Manifest::parse("lib 1.2\n"))
        .unwrap();

    let lib = report.get("lib").unwrap();
    assert!(lib.attempts.is_empty());
    match &lib.outcome {
        Outcome::Resolved {
            strategy, location, ..
        } => {
            assert_eq!(*strategy, Strategy::RemoteZip);
            assert_eq!(location, &format!("{}/lib-1.2.zip", first.uri()));
        }
        other => panic!("expected lib to resolve, got {other:?}"),
    }
    assert_eq!(std::fs::read(ws.dep_dir().join("lib/lib.so")).unwrap(), b"elf");
    assert!(second.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_extraction_leaves_no_artifact_or_staging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken-1.0.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"corrupt".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken-1.0.7z"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"corrupt".to_vec()))
        .mount(&server)
        .await;

    let ws = Workspace::new();
    let config = ws.config(vec![server.uri()]);
    let report = Resolver::new(&config)
        .run(&Manifest::parse("broken 1.0\n"))
        .unwrap();

    let broken = report.get("broken").unwrap();
    assert!(!broken.is_resolved());
    assert_eq!(broken.attempts.len(), 3);
    assert!(matches!(
        broken.attempts[0].error,
        AcquireError::Extract { .. }
    ));
    assert!(matches!(
        broken.attempts[1].error,
        AcquireError::Extract { .. }
    ));
    assert!(ws.installed().is_empty());
    assert!(ws.staging_is_empty());
}

#[tokio::test]
async fn test_staging_cleared_after_mixed_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/good-1.0.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_bytes(&[("ok", b"ok")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bad-1.0.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"nope".to_vec()))
        .mount(&server)
        .await;

    let ws = Workspace::new();
    let local = ws.source("local");
    write_zip(&local.join("disk-1.0.zip"), &[("d", b"d")]);

    let config = ws.config(vec![server.uri(), src(&local)]);
    let report = Resolver::new(&config)
        .run(&Manifest::parse("good 1.0\nbad 1.0\ndisk 1.0\n"))
        .unwrap();

    assert_eq!(report.resolved_count(), 2);
    assert_eq!(ws.installed(), vec!["disk", "good"]);
    assert!(ws.staging_is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_remote_seven_zip_after_zip_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/foo-1.0.0.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/foo-1.0.0.7z"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"7z payload".to_vec()))
        .mount(&server)
        .await;

    let ws = Workspace::new();
    let config = Config {
        seven_zip_executable: fake_seven_zip(ws.dir.path()),
        ..ws.config(vec![server.uri()])
    };
    let report = Resolver::new(&config)
        .run(&Manifest::parse("foo 1.0.0\n"))
        .unwrap();

    let foo = report.get("foo").unwrap();
    assert_eq!(foo.attempts.len(), 1);
    assert_eq!(foo.attempts[0].strategy, Strategy::RemoteZip);
    match &foo.outcome {
        Outcome::Resolved {
            strategy,
            format,
            location,
            ..
        } => {
            assert_eq!(*strategy, Strategy::RemoteSevenZ);
            assert_eq!(*format, ArchiveFormat::SevenZ);
            assert_eq!(location, &format!("{}/foo-1.0.0.7z", server.uri()));
        }
        other => panic!("expected foo to resolve, got {other:?}"),
    }

    let unpacked = ws.dep_dir().join("foo");
    assert!(std::fs::read_dir(&unpacked).unwrap().next().is_some());
    let args = std::fs::read_to_string(unpacked.join("unpacked.txt")).unwrap();
    assert!(args.contains(&format!("-o{}", unpacked.display())));
    assert_eq!(ws.installed(), vec!["foo"]);
    assert!(ws.staging_is_empty());
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let ws = Workspace::new();
    let config = Config {
        http_timeout: Duration::from_secs(1),
        ..ws.config(vec![server.uri()])
    };

    let started = std::time::Instant::now();
    let report = Resolver::new(&config)
        .run(&Manifest::parse("slow 1.0\n"))
        .unwrap();

    let slow = report.get("slow").unwrap();
    assert!(!slow.is_resolved());
    assert!(matches!(
        slow.attempts[0].error,
        AcquireError::Transport { .. }
    ));
    assert!(started.elapsed() < Duration::from_secs(10));
}
