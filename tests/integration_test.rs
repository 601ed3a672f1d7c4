use reposift::core::pool::Job;
use reposift::core::{ProgressInfo, WorkerSpawner};
use reposift::format::{OutputFormat, create_formatter, write_records};
use reposift::utils::analysis::build_dependency_graph;
use reposift::{
    FileProcessor, FileScorer, PatternMatcher, ProcessorConfig, ReposiftConfig, ScanError, ScoringConfig,
    Summarizer, SummaryConfig,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Debug)]
struct NoThreads;

impl WorkerSpawner for NoThreads {
    fn spawn(&self, _name: String, _job: Job) -> io::Result<()> {
        Err(io::Error::other("thread limit reached"))
    }
}

fn write(root: &Path, rel: &str, content: &str) -> anyhow::Result<PathBuf> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    Ok(path)
}

fn sample_repo() -> anyhow::Result<TempDir> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    write(root, "README.md", "# Demo\n\nA small demo project.\n")?;
    write(
        root,
        "src/main.cpp",
        "#include \"util.h\"\n\n// entry\nint main() {\n    return run();\n}\n",
    )?;
    write(root, "src/util.h", "int run();\n")?;
    write(root, "build/out.o", "object code")?;
    Ok(temp_dir)
}

#[test]
fn test_end_to_end_scoring() -> anyhow::Result<()> {
    let temp_dir = sample_repo()?;
    let root = temp_dir.path();
    let config = ReposiftConfig::default();
    let scorer = FileScorer::new(config.scoring.clone(), config.build_matcher(root));

    let scored = scorer.score_repository(root)?;
    let paths: Vec<&str> = scored.iter().map(|s| s.path.as_str()).collect();
    assert!(!paths.contains(&"build/out.o"));

    let selected = scorer.get_selected_files(&scored);
    assert!(selected.contains(&PathBuf::from("README.md")));
    assert!(selected.contains(&PathBuf::from("src/main.cpp")));

    let report = scorer.report(&scored);
    assert_eq!(report["summary"]["total"], scored.len());
    Ok(())
}

#[test]
fn test_end_to_end_processing() -> anyhow::Result<()> {
    let temp_dir = sample_repo()?;
    let root = temp_dir.path();
    let config = ReposiftConfig::default();
    let processor = FileProcessor::new(config.build_matcher(root), config.processor.clone());

    let mut records = processor.process_directory(root, true)?;
    records.sort_by(|a, b| a.path.cmp(&b.path));
    let names: Vec<PathBuf> = records
        .iter()
        .map(|r| r.path.strip_prefix(root).map(Path::to_path_buf))
        .collect::<Result<_, _>>()?;
    assert_eq!(
        names,
        vec![
            PathBuf::from("README.md"),
            PathBuf::from("src/main.cpp"),
            PathBuf::from("src/util.h"),
        ]
    );
    assert!(records.iter().all(|r| r.processed && r.error.is_none()));
    assert_eq!(records[1].line_count, 6);

    let sequential = processor.process_directory(root, false)?;
    assert_eq!(sequential.len(), records.len());
    Ok(())
}

#[test]
fn test_thread_failure_falls_back_to_caller() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    for i in 0..12 {
        write(root, &format!("pkg/file_{}.py", i), "x = 1\n")?;
    }
    write(root, "pkg/blob.dat", "\0\0\0binary")?;

    let config = ProcessorConfig {
        threads: 4,
        ..Default::default()
    };
    let seen: Arc<Mutex<Vec<ProgressInfo>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut processor =
        FileProcessor::new(PatternMatcher::with_defaults(), config).with_spawner(Arc::new(NoThreads));
    processor.set_progress_callback(move |info| sink.lock().unwrap().push(info.clone()));

    let records = processor.process_directory(root, true)?;
    assert_eq!(records.len(), 13);
    let processed = records.iter().filter(|r| r.processed).count();
    let skipped = records.iter().filter(|r| r.skipped).count();
    assert_eq!((processed, skipped), (12, 1));

    let seen = seen.lock().unwrap();
    let last = seen.last().expect("progress reported");
    assert!(last.is_complete);
    assert_eq!(last.completed(), 13);
    assert_eq!(last.percentage(), 100.0);
    Ok(())
}

#[test]
fn test_missing_root_is_an_error() {
    let missing = Path::new("/definitely/not/a/repository");
    let processor = FileProcessor::new(PatternMatcher::with_defaults(), ProcessorConfig::default());
    assert!(matches!(
        processor.process_directory(missing, true),
        Err(ScanError::RootNotFound(_))
    ));

    let scorer = FileScorer::new(ScoringConfig::default(), PatternMatcher::with_defaults());
    assert!(matches!(scorer.score_repository(missing), Err(ScanError::RootNotFound(_))));
}

#[test]
fn test_root_that_is_a_file_is_an_error() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let file = write(temp_dir.path(), "plain.txt", "hello")?;
    let processor = FileProcessor::new(PatternMatcher::with_defaults(), ProcessorConfig::default());
    assert!(matches!(
        processor.process_directory(&file, false),
        Err(ScanError::NotADirectory(_))
    ));
    Ok(())
}

#[test]
fn test_empty_repository_is_not_an_error() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let processor = FileProcessor::new(PatternMatcher::with_defaults(), ProcessorConfig::default());
    assert!(processor.process_directory(temp_dir.path(), true)?.is_empty());
    Ok(())
}

#[test]
fn test_relative_import_edge() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    let a = write(root, "a.ts", "import { X } from './b';\n\nexport const y = X;\n")?;
    let b = write(root, "b.ts", "export const X = 1;\n")?;
    let extensions = ScoringConfig::default().source_extensions;

    let graph = build_dependency_graph(root, &[a.clone(), b], &extensions);
    assert_eq!(graph.edges_from("a.ts"), ["b.ts".to_string()]);
    assert_eq!(graph.in_degree("b.ts"), 1);

    fs::remove_file(root.join("b.ts"))?;
    let graph = build_dependency_graph(root, &[a], &extensions);
    assert!(graph.edges_from("a.ts").is_empty());
    assert_eq!(graph.edge_count(), 0);
    Ok(())
}

#[test]
fn test_scoring_is_idempotent_and_size_monotonic() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    let line = "value = compute(value)\n";
    let small = write(root, "small.py", &line.repeat(20))?;
    let large = write(root, "large.py", &line.repeat(2000))?;

    let scorer = FileScorer::new(ScoringConfig::default(), PatternMatcher::with_defaults());
    let first = scorer.score_file(&small, root);
    let second = scorer.score_file(&small, root);
    assert_eq!(first, second);

    let size = reposift::core::component::SIZE;
    let large_scored = scorer.score_file(&large, root);
    assert!(first.component(size) >= large_scored.component(size));
    Ok(())
}

#[test]
fn test_summaries_keep_readme_whole() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    let body = "Some documentation line that goes on for a while.\n".repeat(100);
    write(root, "README.md", &body)?;
    write(root, "notes.md", &body)?;

    let summary = SummaryConfig {
        enabled: true,
        size_threshold: 1024,
        ..Default::default()
    };
    let processor = FileProcessor::new(PatternMatcher::with_defaults(), ProcessorConfig::default())
        .with_summary_config(summary.clone());
    let records = processor.process_directory(root, false)?;
    let summarizer = Summarizer::new(summary);

    for record in &records {
        let out = summarizer.summarized(record);
        if record.file_name() == "README.md" {
            assert!(!out.summarized);
            assert_eq!(out.content, record.content);
        } else {
            assert!(out.summarized);
            assert!(out.text().starts_with("File: "));
            assert_eq!(out.byte_size, record.byte_size);
        }
    }
    Ok(())
}

#[test]
fn test_scan_output_document() -> anyhow::Result<()> {
    let temp_dir = sample_repo()?;
    let root = temp_dir.path();
    let config = ReposiftConfig::default();
    let processor = FileProcessor::new(config.build_matcher(root), config.processor.clone());
    let records = processor.process_directory(root, true)?;

    let mut out = Vec::new();
    let mut formatter = create_formatter(OutputFormat::Json);
    write_records(formatter.as_mut(), &mut out, &records, root)?;
    let value: serde_json::Value = serde_json::from_slice(&out)?;
    assert_eq!(value["total_files"], 3);
    assert_eq!(value["files"][0]["path"], "README.md");
    assert!(value["dropped_files"].as_array().is_some_and(Vec::is_empty));
    Ok(())
}
